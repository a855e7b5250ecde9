//! Hand-written lexer for Jac source.
//!
//! Single forward pass over the bytes of one [`Source`], producing a token
//! list terminated by an `Eof` sentinel. Interpolated strings are scanned
//! with an explicit mode stack: a text mode per (quote, single/triple)
//! combination plus an expression mode that tracks brace nesting on an
//! auxiliary stack. Unknown characters become `Error` tokens; the lexer
//! never aborts mid-stream.

use crate::source::{Source, SourceId, Span};
use crate::token::{Comment, Token, TokenKind};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Mode {
    Normal,
    FstringDq,
    FstringSq,
    FstringTdq,
    FstringTsq,
    FstringExpr,
}

impl Mode {
    fn quote(self) -> u8 {
        match self {
            Mode::FstringDq | Mode::FstringTdq => b'"',
            Mode::FstringSq | Mode::FstringTsq => b'\'',
            _ => 0,
        }
    }

    fn is_triple(self) -> bool {
        matches!(self, Mode::FstringTdq | Mode::FstringTsq)
    }

    fn is_text(self) -> bool {
        matches!(
            self,
            Mode::FstringDq | Mode::FstringSq | Mode::FstringTdq | Mode::FstringTsq
        )
    }

    fn start_kind(self, raw: bool) -> TokenKind {
        match (self, raw) {
            (Mode::FstringDq, false) => TokenKind::FDqStart,
            (Mode::FstringSq, false) => TokenKind::FSqStart,
            (Mode::FstringTdq, false) => TokenKind::FTdqStart,
            (Mode::FstringTsq, false) => TokenKind::FTsqStart,
            (Mode::FstringDq, true) => TokenKind::RfDqStart,
            (Mode::FstringSq, true) => TokenKind::RfSqStart,
            (Mode::FstringTdq, true) => TokenKind::RfTdqStart,
            (Mode::FstringTsq, true) => TokenKind::RfTsqStart,
            _ => TokenKind::Error,
        }
    }

    // Raw f-strings reuse the plain end kinds.
    fn end_kind(self) -> TokenKind {
        match self {
            Mode::FstringDq => TokenKind::FDqEnd,
            Mode::FstringSq => TokenKind::FSqEnd,
            Mode::FstringTdq => TokenKind::FTdqEnd,
            Mode::FstringTsq => TokenKind::FTsqEnd,
            _ => TokenKind::Error,
        }
    }

    fn text_kind(self, raw: bool) -> TokenKind {
        match (self, raw) {
            (Mode::FstringDq, false) => TokenKind::FTextDq,
            (Mode::FstringSq, false) => TokenKind::FTextSq,
            (Mode::FstringTdq, false) => TokenKind::FTextTdq,
            (Mode::FstringTsq, false) => TokenKind::FTextTsq,
            (Mode::FstringDq, true) => TokenKind::RfTextDq,
            (Mode::FstringSq, true) => TokenKind::RfTextSq,
            (Mode::FstringTdq, true) => TokenKind::RfTextTdq,
            (Mode::FstringTsq, true) => TokenKind::RfTextTsq,
            _ => TokenKind::Error,
        }
    }
}

/// Per-interpolation expression state, saved when a nested `{` opens a new
/// replacement field and restored when its `}` closes.
#[derive(Clone, Copy, Default)]
struct ExprFrame {
    brace_depth: u32,
    group_depth: u32,
    in_spec: bool,
}

pub struct Lexer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    src: SourceId,
    pos: usize,
    mode_stack: Vec<Mode>,
    raw_stack: Vec<bool>,
    frame: ExprFrame,
    frame_stack: Vec<ExprFrame>,
    /// Comments captured in source order, for formatter re-injection.
    pub comments: Vec<Comment>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a Source, src: SourceId) -> Self {
        Lexer {
            text: source.text(),
            bytes: source.text().as_bytes(),
            src,
            pos: 0,
            mode_stack: Vec::new(),
            raw_stack: Vec::new(),
            frame: ExprFrame::default(),
            frame_stack: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Tokenize the whole buffer. Deterministic, single pass, ends with Eof.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<Comment>) {
        let mut tokens = Vec::new();
        while let Some(tok) = self.next_token() {
            tokens.push(tok);
        }
        let end = self.pos;
        tokens.push(Token::new(
            TokenKind::Eof,
            "",
            Span::new(self.src, end, end),
        ));
        (tokens, self.comments)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn cur(&self) -> u8 {
        *self.bytes.get(self.pos).unwrap_or(&0)
    }

    fn peek(&self, off: usize) -> u8 {
        *self.bytes.get(self.pos + off).unwrap_or(&0)
    }

    fn starts_with(&self, s: &str) -> bool {
        self.text[self.pos..].starts_with(s)
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(self.src, start, self.pos)
    }

    fn token_from(&self, kind: TokenKind, start: usize) -> Token {
        Token::new(kind, &self.text[start..self.pos], self.span_from(start))
    }

    fn mode(&self) -> Mode {
        *self.mode_stack.last().unwrap_or(&Mode::Normal)
    }

    // ------------------------------------------------------------------
    // Whitespace and comments
    // ------------------------------------------------------------------

    fn skip_whitespace_and_comments(&mut self) {
        while !self.at_end() {
            match self.cur() {
                b' ' | b'\t' | b'\r' | b'\n' | 0x0c => {
                    self.pos += 1;
                }
                b'#' => {
                    let start = self.pos;
                    if self.peek(1) == b'*' {
                        // Nested block comment: #* ... *#
                        self.pos += 2;
                        let mut depth = 1u32;
                        while !self.at_end() && depth > 0 {
                            if self.cur() == b'#' && self.peek(1) == b'*' {
                                self.pos += 2;
                                depth += 1;
                            } else if self.cur() == b'*' && self.peek(1) == b'#' {
                                self.pos += 2;
                                depth -= 1;
                            } else {
                                self.pos += 1;
                            }
                        }
                        self.comments.push(Comment {
                            text: self.text[start..self.pos].to_string(),
                            span: self.span_from(start),
                            is_block: true,
                        });
                    } else {
                        self.pos += 1;
                        while !self.at_end() && self.cur() != b'\n' {
                            self.pos += 1;
                        }
                        self.comments.push(Comment {
                            text: self.text[start..self.pos].to_string(),
                            span: self.span_from(start),
                            is_block: false,
                        });
                    }
                }
                _ => break,
            }
        }
    }

    // ------------------------------------------------------------------
    // Main dispatch
    // ------------------------------------------------------------------

    fn next_token(&mut self) -> Option<Token> {
        if self.mode().is_text() {
            return self.scan_fstring_fragment();
        }
        if self.mode() == Mode::FstringExpr {
            return self.scan_fstring_expr_token();
        }
        self.skip_whitespace_and_comments();
        if self.at_end() {
            return None;
        }
        self.scan_normal_token()
    }

    /// One token inside a `{ … }` replacement field. Normal lexing applies,
    /// except that braces adjust the field's nesting counter and a top-level
    /// `:` switches to format-spec scanning.
    fn scan_fstring_expr_token(&mut self) -> Option<Token> {
        if self.frame.in_spec {
            return self.scan_format_spec();
        }
        self.skip_whitespace_and_comments();
        if self.at_end() {
            return None;
        }
        let c = self.cur();

        // Conversion specifier (!r/!s/!a) directly before `}` or `:`.
        if c == b'!'
            && matches!(self.peek(1), b'r' | b'R' | b's' | b'S' | b'a' | b'A')
            && matches!(self.peek(2), b'}' | b':' | 0)
        {
            let start = self.pos;
            self.pos += 2;
            return Some(self.token_from(TokenKind::Conv, start));
        }

        match c {
            b'}' => {
                self.frame.brace_depth -= 1;
                if self.frame.brace_depth == 0 {
                    // End of the replacement field: pop back into the
                    // surrounding text mode and restore the saved counters.
                    let start = self.pos;
                    self.pos += 1;
                    self.mode_stack.pop();
                    self.frame = self.frame_stack.pop().unwrap_or_default();
                    return Some(self.token_from(TokenKind::Rbrace, start));
                }
            }
            b'{' => {
                self.frame.brace_depth += 1;
            }
            b'(' | b'[' => {
                self.frame.group_depth += 1;
            }
            b')' | b']' => {
                self.frame.group_depth = self.frame.group_depth.saturating_sub(1);
            }
            b':' if self.frame.brace_depth == 1
                && self.frame.group_depth == 0
                && self.peek(1) != b'=' =>
            {
                // Format-spec separator.
                let start = self.pos;
                self.pos += 1;
                self.frame.in_spec = true;
                return Some(self.token_from(TokenKind::Colon, start));
            }
            _ => {}
        }
        self.scan_normal_token()
    }

    /// Literal format-spec text after the separating colon, consuming
    /// balanced inner braces as text, up to the closing `}`.
    fn scan_format_spec(&mut self) -> Option<Token> {
        if self.at_end() {
            return None;
        }
        if self.cur() == b'}' {
            let start = self.pos;
            self.pos += 1;
            self.mode_stack.pop();
            self.frame = self.frame_stack.pop().unwrap_or_default();
            return Some(self.token_from(TokenKind::Rbrace, start));
        }
        let start = self.pos;
        let mut depth = 0u32;
        while !self.at_end() {
            match self.cur() {
                b'{' => depth += 1,
                b'}' => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                b'\n' => break,
                _ => {}
            }
            self.pos += 1;
        }
        if self.pos == start {
            self.pos += 1;
            return Some(self.token_from(TokenKind::Error, start));
        }
        Some(self.token_from(TokenKind::FFormatText, start))
    }

    fn scan_normal_token(&mut self) -> Option<Token> {
        if self.at_end() {
            return None;
        }
        let c = self.cur();

        // Keyword-escaped name: <>name
        if c == b'<'
            && self.peek(1) == b'>'
            && (self.peek(2).is_ascii_alphabetic() || self.peek(2) == b'_')
        {
            return Some(self.scan_kwesc_name());
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            return Some(self.scan_word());
        }

        if c.is_ascii_digit() {
            return Some(self.scan_number());
        }

        // Leading-dot float: .5
        if c == b'.' && self.peek(1).is_ascii_digit() {
            return Some(self.scan_dot_number());
        }

        if c == b'"' || c == b'\'' {
            return Some(self.scan_string(c, self.pos));
        }

        Some(self.scan_operator())
    }

    // ------------------------------------------------------------------
    // Identifiers, keywords, string prefixes
    // ------------------------------------------------------------------

    fn scan_word(&mut self) -> Token {
        let start = self.pos;

        // String prefixes: f, r, b and two-letter combinations, case
        // insensitive, immediately followed by a quote.
        let p0 = self.cur().to_ascii_lowercase();
        let p1 = self.peek(1).to_ascii_lowercase();
        if matches!(p0, b'f' | b'r' | b'b') {
            let two = matches!(
                (p0, p1),
                (b'r', b'f') | (b'f', b'r') | (b'r', b'b') | (b'b', b'r')
            );
            let quote_at = if two { 2 } else { 1 };
            let q = self.peek(quote_at);
            if q == b'"' || q == b'\'' {
                let has_f = p0 == b'f' || (two && p1 == b'f');
                let has_r = p0 == b'r' || (two && p1 == b'r');
                self.pos += quote_at;
                if has_f {
                    return self.scan_fstring_start(has_r, start);
                }
                return self.scan_string(q, start);
            }
        }

        while !self.at_end() && (self.cur().is_ascii_alphanumeric() || self.cur() == b'_') {
            self.pos += 1;
        }
        let word = &self.text[start..self.pos];

        // Combined tokens: `not in` -> KwNin, `is not` -> KwIsn, peeking past
        // whitespace only.
        if word == "not" {
            if let Some(end) = self.peek_word_after_ws("in") {
                self.pos = end;
                return self.token_from(TokenKind::KwNin, start);
            }
        }
        if word == "is" {
            if let Some(end) = self.peek_word_after_ws("not") {
                self.pos = end;
                return self.token_from(TokenKind::KwIsn, start);
            }
        }

        let kind = TokenKind::keyword(word).unwrap_or(TokenKind::Name);
        self.token_from(kind, start)
    }

    /// If `word` follows the cursor after whitespace and ends at a word
    /// boundary, return the offset just past it.
    fn peek_word_after_ws(&self, word: &str) -> Option<usize> {
        let mut p = self.pos;
        while p < self.bytes.len() && matches!(self.bytes[p], b' ' | b'\t' | b'\r' | b'\n' | 0x0c) {
            p += 1;
        }
        if !self.text[p..].starts_with(word) {
            return None;
        }
        let end = p + word.len();
        match self.bytes.get(end) {
            Some(b) if b.is_ascii_alphanumeric() || *b == b'_' => None,
            _ => Some(end),
        }
    }

    fn scan_kwesc_name(&mut self) -> Token {
        let start = self.pos;
        self.pos += 2; // <>
        while !self.at_end() && (self.cur().is_ascii_alphanumeric() || self.cur() == b'_') {
            self.pos += 1;
        }
        self.token_from(TokenKind::KwescName, start)
    }

    // ------------------------------------------------------------------
    // Numbers
    // ------------------------------------------------------------------

    fn scan_number(&mut self) -> Token {
        let start = self.pos;

        if self.cur() == b'0' && matches!(self.peek(1), b'x' | b'X' | b'b' | b'B' | b'o' | b'O') {
            let radix_char = self.peek(1).to_ascii_lowercase();
            self.pos += 2;
            while !self.at_end() && (self.cur().is_ascii_alphanumeric() || self.cur() == b'_') {
                self.pos += 1;
            }
            let kind = match radix_char {
                b'x' => TokenKind::HexInt,
                b'b' => TokenKind::BinInt,
                _ => TokenKind::OctInt,
            };
            return self.token_from(kind, start);
        }

        let mut is_float = false;
        self.eat_digits();
        if self.cur() == b'.' && self.peek(1).is_ascii_digit() {
            is_float = true;
            self.pos += 1;
            self.eat_digits();
        }
        if matches!(self.cur(), b'e' | b'E') {
            let mut p = self.pos + 1;
            if matches!(self.bytes.get(p), Some(b'+') | Some(b'-')) {
                p += 1;
            }
            if self.bytes.get(p).is_some_and(|b| b.is_ascii_digit()) {
                is_float = true;
                self.pos = p;
                self.eat_digits();
            }
        }
        let kind = if is_float {
            TokenKind::Float
        } else {
            TokenKind::Int
        };
        self.token_from(kind, start)
    }

    fn scan_dot_number(&mut self) -> Token {
        let start = self.pos;
        self.pos += 1; // '.'
        self.eat_digits();
        if matches!(self.cur(), b'e' | b'E') {
            let mut p = self.pos + 1;
            if matches!(self.bytes.get(p), Some(b'+') | Some(b'-')) {
                p += 1;
            }
            if self.bytes.get(p).is_some_and(|b| b.is_ascii_digit()) {
                self.pos = p;
                self.eat_digits();
            }
        }
        self.token_from(TokenKind::Float, start)
    }

    fn eat_digits(&mut self) {
        while !self.at_end() && (self.cur().is_ascii_digit() || self.cur() == b'_') {
            self.pos += 1;
        }
    }

    // ------------------------------------------------------------------
    // Plain strings
    // ------------------------------------------------------------------

    /// Scan a string literal. `start` points at the prefix (if any) so the
    /// token text round-trips exactly. Unterminated single-quoted strings
    /// stop at end of line; triple-quoted ones at end of file.
    fn scan_string(&mut self, quote: u8, start: usize) -> Token {
        let triple = self.peek(1) == quote && self.peek(2) == quote;
        self.pos += if triple { 3 } else { 1 };

        while !self.at_end() {
            let c = self.cur();
            if c == b'\\' {
                self.pos += 1;
                if !self.at_end() {
                    self.pos += 1;
                }
                continue;
            }
            if triple {
                if c == quote && self.peek(1) == quote && self.peek(2) == quote {
                    self.pos += 3;
                    break;
                }
                self.pos += 1;
            } else {
                if c == quote {
                    self.pos += 1;
                    break;
                }
                if c == b'\n' {
                    break; // unterminated
                }
                self.pos += 1;
            }
        }
        self.token_from(TokenKind::Str, start)
    }

    // ------------------------------------------------------------------
    // F-strings
    // ------------------------------------------------------------------

    fn scan_fstring_start(&mut self, raw: bool, start: usize) -> Token {
        let quote = self.cur();
        let triple = self.peek(1) == quote && self.peek(2) == quote;
        self.pos += if triple { 3 } else { 1 };

        let mode = match (quote, triple) {
            (b'"', false) => Mode::FstringDq,
            (b'\'', false) => Mode::FstringSq,
            (b'"', true) => Mode::FstringTdq,
            (b'\'', true) => Mode::FstringTsq,
            _ => Mode::FstringDq,
        };
        self.mode_stack.push(mode);
        self.raw_stack.push(raw);
        self.token_from(mode.start_kind(raw), start)
    }

    fn scan_fstring_fragment(&mut self) -> Option<Token> {
        if self.at_end() {
            return None;
        }
        let mode = self.mode();
        let quote = mode.quote();
        let triple = mode.is_triple();
        let raw = *self.raw_stack.last().unwrap_or(&false);
        let c = self.cur();

        // Closing quote pops the mode.
        if c == quote && (!triple || (self.peek(1) == quote && self.peek(2) == quote)) {
            let start = self.pos;
            self.pos += if triple { 3 } else { 1 };
            self.mode_stack.pop();
            self.raw_stack.pop();
            return Some(self.token_from(mode.end_kind(), start));
        }

        // Escaped braces.
        if c == b'{' && self.peek(1) == b'{' {
            let start = self.pos;
            self.pos += 2;
            return Some(self.token_from(TokenKind::DLbrace, start));
        }
        if c == b'}' && self.peek(1) == b'}' {
            let start = self.pos;
            self.pos += 2;
            return Some(self.token_from(TokenKind::DRbrace, start));
        }

        // Single `{` re-enters expression mode with a fresh nesting counter.
        if c == b'{' {
            let start = self.pos;
            self.pos += 1;
            self.frame_stack.push(self.frame);
            self.frame = ExprFrame {
                brace_depth: 1,
                group_depth: 0,
                in_spec: false,
            };
            self.mode_stack.push(Mode::FstringExpr);
            return Some(self.token_from(TokenKind::Lbrace, start));
        }

        // A stray `}` in text mode: emit as Error and continue.
        if c == b'}' {
            let start = self.pos;
            self.pos += 1;
            return Some(self.token_from(TokenKind::Error, start));
        }

        // Literal text up to the next quote/brace boundary.
        let start = self.pos;
        while !self.at_end() {
            let c = self.cur();
            if c == b'{' || c == b'}' {
                break;
            }
            if c == quote {
                if triple {
                    if self.peek(1) == quote && self.peek(2) == quote {
                        break;
                    }
                    self.pos += 1; // lone quote char inside triple text
                    continue;
                }
                break;
            }
            if c == b'\\' && !raw {
                self.pos += 1;
                if !self.at_end() {
                    self.pos += 1;
                }
                continue;
            }
            if c == b'\n' && !triple {
                break; // unterminated single-line f-string
            }
            self.pos += 1;
        }
        if self.pos == start {
            // Unterminated at end of line: pop the mode so normal scanning
            // resumes, surfacing an Error token.
            self.mode_stack.pop();
            self.raw_stack.pop();
            let start = self.pos;
            if !self.at_end() {
                self.pos += 1;
            }
            return Some(self.token_from(TokenKind::Error, start));
        }
        Some(self.token_from(mode.text_kind(raw), start))
    }

    // ------------------------------------------------------------------
    // Operators, longest match over 4/3/2/1-character tables
    // ------------------------------------------------------------------

    fn scan_operator(&mut self) -> Token {
        let start = self.pos;

        const FOUR: [(&str, TokenKind); 2] =
            [("<-->", TokenKind::ArrowBi), ("<++>", TokenKind::CarrowBi)];
        for (text, kind) in FOUR {
            if self.starts_with(text) {
                self.pos += 4;
                return self.token_from(kind, start);
            }
        }

        const THREE: [(&str, TokenKind); 9] = [
            ("**=", TokenKind::StarPowEq),
            ("//=", TokenKind::FloorDivEq),
            ("<<=", TokenKind::LshiftEq),
            (">>=", TokenKind::RshiftEq),
            ("...", TokenKind::Ellipsis),
            ("-->", TokenKind::ArrowR),
            ("<--", TokenKind::ArrowL),
            ("++>", TokenKind::CarrowR),
            ("<++", TokenKind::CarrowL),
        ];
        for (text, kind) in THREE {
            if self.starts_with(text) {
                self.pos += 3;
                return self.token_from(kind, start);
            }
        }

        const TWO: [(&str, TokenKind); 25] = [
            ("**", TokenKind::StarPow),
            ("//", TokenKind::FloorDiv),
            ("<<", TokenKind::Lshift),
            (">>", TokenKind::Rshift),
            ("->", TokenKind::ReturnHint),
            ("+=", TokenKind::AddEq),
            ("-=", TokenKind::SubEq),
            ("*=", TokenKind::MulEq),
            ("/=", TokenKind::DivEq),
            ("%=", TokenKind::ModEq),
            ("&=", TokenKind::BwAndEq),
            ("|=", TokenKind::BwOrEq),
            ("^=", TokenKind::BwXorEq),
            ("@=", TokenKind::MatmulEq),
            ("==", TokenKind::Ee),
            ("!=", TokenKind::Ne),
            ("<=", TokenKind::Lte),
            (">=", TokenKind::Gte),
            (":=", TokenKind::WalrusEq),
            ("|>", TokenKind::PipeFwd),
            ("<|", TokenKind::PipeBkwd),
            (".>", TokenKind::DotFwd),
            ("<.", TokenKind::DotBkwd),
            ("&&", TokenKind::KwAnd),
            ("||", TokenKind::KwOr),
        ];
        for (text, kind) in TWO {
            if self.starts_with(text) {
                self.pos += 2;
                return self.token_from(kind, start);
            }
        }

        let kind = match self.cur() {
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::StarMul,
            b'/' => TokenKind::Div,
            b'%' => TokenKind::Mod,
            b'<' => TokenKind::Lt,
            b'>' => TokenKind::Gt,
            b'=' => TokenKind::Eq,
            b'!' => TokenKind::Not,
            b'&' => TokenKind::BwAnd,
            b'|' => TokenKind::BwOr,
            b'^' => TokenKind::BwXor,
            b'~' => TokenKind::BwNot,
            b'.' => TokenKind::Dot,
            b',' => TokenKind::Comma,
            b':' => TokenKind::Colon,
            b';' => TokenKind::Semi,
            b'(' => TokenKind::Lparen,
            b')' => TokenKind::Rparen,
            b'{' => TokenKind::Lbrace,
            b'}' => TokenKind::Rbrace,
            b'[' => TokenKind::Lsquare,
            b']' => TokenKind::Rsquare,
            b'@' => TokenKind::Decor,
            b'?' => TokenKind::NullOk,
            b'`' => TokenKind::TypeOp,
            _ => TokenKind::Error,
        };
        // Advance over the character even when unknown, consuming the full
        // UTF-8 sequence so the cursor stays on a char boundary.
        if kind == TokenKind::Error {
            let ch_len = self.text[self.pos..]
                .chars()
                .next()
                .map(|c| c.len_utf8())
                .unwrap_or(1);
            self.pos += ch_len;
        } else {
            self.pos += 1;
        }
        self.token_from(kind, start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Source;

    fn lex(text: &str) -> Vec<Token> {
        let src = Source::new(text, "test.jac");
        let (tokens, _) = Lexer::new(&src, SourceId(0)).tokenize();
        tokens
    }

    fn kinds(text: &str) -> Vec<TokenKind> {
        lex(text)
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| *k != TokenKind::Eof)
            .collect()
    }

    #[test]
    fn basic_tokens() {
        assert_eq!(
            kinds("obj Foo { }"),
            vec![
                TokenKind::KwObj,
                TokenKind::Name,
                TokenKind::Lbrace,
                TokenKind::Rbrace
            ]
        );
    }

    #[test]
    fn keywords_classified() {
        assert_eq!(
            kinds("if else while for in return"),
            vec![
                TokenKind::KwIf,
                TokenKind::KwElse,
                TokenKind::KwWhile,
                TokenKind::KwFor,
                TokenKind::KwIn,
                TokenKind::KwReturn
            ]
        );
    }

    #[test]
    fn operators_longest_match() {
        assert_eq!(
            kinds("+ - * / == != <= >= -> // ** **= ..."),
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::StarMul,
                TokenKind::Div,
                TokenKind::Ee,
                TokenKind::Ne,
                TokenKind::Lte,
                TokenKind::Gte,
                TokenKind::ReturnHint,
                TokenKind::FloorDiv,
                TokenKind::StarPow,
                TokenKind::StarPowEq,
                TokenKind::Ellipsis
            ]
        );
    }

    #[test]
    fn graph_arrows() {
        assert_eq!(
            kinds("<--> --> <-- <++>"),
            vec![
                TokenKind::ArrowBi,
                TokenKind::ArrowR,
                TokenKind::ArrowL,
                TokenKind::CarrowBi
            ]
        );
    }

    #[test]
    fn numbers() {
        let toks = lex("42 3.14 1_000 0xFF 0b1010 0o777 1e9 .5");
        let pairs: Vec<(TokenKind, &str)> = toks
            .iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| (t.kind, t.text.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (TokenKind::Int, "42"),
                (TokenKind::Float, "3.14"),
                (TokenKind::Int, "1_000"),
                (TokenKind::HexInt, "0xFF"),
                (TokenKind::BinInt, "0b1010"),
                (TokenKind::OctInt, "0o777"),
                (TokenKind::Float, "1e9"),
                (TokenKind::Float, ".5"),
            ]
        );
    }

    #[test]
    fn comments_skipped_and_captured() {
        let src = Source::new("x # line\n#* block #* nested *# *# y", "t.jac");
        let (tokens, comments) = Lexer::new(&src, SourceId(0)).tokenize();
        let kinds: Vec<TokenKind> = tokens
            .iter()
            .map(|t| t.kind)
            .filter(|k| *k != TokenKind::Eof)
            .collect();
        assert_eq!(kinds, vec![TokenKind::Name, TokenKind::Name]);
        assert_eq!(comments.len(), 2);
        assert!(!comments[0].is_block);
        assert!(comments[1].is_block);
        assert!(comments[1].text.contains("nested"));
    }

    #[test]
    fn not_in_and_is_not_combine() {
        assert_eq!(
            kinds("a not in b"),
            vec![TokenKind::Name, TokenKind::KwNin, TokenKind::Name]
        );
        assert_eq!(
            kinds("a is not b"),
            vec![TokenKind::Name, TokenKind::KwIsn, TokenKind::Name]
        );
        assert_eq!(kinds("not x"), vec![TokenKind::Not, TokenKind::Name]);
        assert_eq!(
            kinds("a is b"),
            vec![TokenKind::Name, TokenKind::KwIs, TokenKind::Name]
        );
    }

    #[test]
    fn kwesc_name() {
        let toks = lex("<>impl");
        assert_eq!(toks[0].kind, TokenKind::KwescName);
        assert_eq!(toks[0].text, "<>impl");
    }

    #[test]
    fn plain_strings() {
        let toks = lex("\"hello\" 'x' \"\"\"tri\nple\"\"\" r\"raw\"");
        let kinds: Vec<TokenKind> = toks
            .iter()
            .map(|t| t.kind)
            .filter(|k| *k != TokenKind::Eof)
            .collect();
        assert_eq!(kinds, vec![TokenKind::Str; 4]);
    }

    #[test]
    fn unterminated_string_stops_at_newline() {
        let toks = lex("\"abc\nx");
        assert_eq!(toks[0].kind, TokenKind::Str);
        assert_eq!(toks[0].text, "\"abc");
        assert_eq!(toks[1].kind, TokenKind::Name);
    }

    #[test]
    fn fstring_simple() {
        assert_eq!(
            kinds(r#"f"hi {name}!""#),
            vec![
                TokenKind::FDqStart,
                TokenKind::FTextDq,
                TokenKind::Lbrace,
                TokenKind::Name,
                TokenKind::Rbrace,
                TokenKind::FTextDq,
                TokenKind::FDqEnd,
            ]
        );
    }

    #[test]
    fn fstring_escaped_braces() {
        assert_eq!(
            kinds(r#"f"{{x}}""#),
            vec![
                TokenKind::FDqStart,
                TokenKind::DLbrace,
                TokenKind::FTextDq,
                TokenKind::DRbrace,
                TokenKind::FDqEnd,
            ]
        );
    }

    #[test]
    fn fstring_nested_dict_expr() {
        // Braces inside the expression adjust the nesting counter; the mode
        // pops only when the counter returns to zero.
        let ks = kinds(r#"f"[{ {'k': n}['k'] }]""#);
        assert_eq!(ks.first(), Some(&TokenKind::FDqStart));
        assert_eq!(ks.last(), Some(&TokenKind::FDqEnd));
        let opens = ks.iter().filter(|k| **k == TokenKind::Lbrace).count();
        let closes = ks.iter().filter(|k| **k == TokenKind::Rbrace).count();
        assert_eq!(opens, closes);
    }

    #[test]
    fn fstring_slice_colon_is_not_format_spec() {
        let ks = kinds(r#"f"{a[1:2]}""#);
        assert!(!ks.contains(&TokenKind::FFormatText));
        assert!(ks.contains(&TokenKind::Colon));
    }

    #[test]
    fn fstring_nested_fstrings_restore_mode_stack() {
        // Eight levels of nested interpolation; the stack must pop cleanly.
        let mut text = String::new();
        for _ in 0..8 {
            text.push_str("f\"{");
        }
        text.push('x');
        for _ in 0..8 {
            text.push_str("}\"");
        }
        let toks = lex(&text);
        assert_eq!(toks.last().unwrap().kind, TokenKind::Eof);
        let starts = toks
            .iter()
            .filter(|t| t.kind == TokenKind::FDqStart)
            .count();
        let ends = toks.iter().filter(|t| t.kind == TokenKind::FDqEnd).count();
        assert_eq!(starts, 8);
        assert_eq!(ends, 8);
    }

    #[test]
    fn raw_fstring_kinds() {
        let ks = kinds(r#"rf"a{b}c""#);
        assert_eq!(ks[0], TokenKind::RfDqStart);
        assert_eq!(ks[1], TokenKind::RfTextDq);
        assert_eq!(*ks.last().unwrap(), TokenKind::FDqEnd);
    }

    #[test]
    fn triple_fstring_allows_newlines_and_lone_quotes() {
        let ks = kinds("f\"\"\"a\nb\"c{d}\"\"\"");
        assert_eq!(ks[0], TokenKind::FTdqStart);
        assert!(ks.contains(&TokenKind::FTextTdq));
        assert_eq!(*ks.last().unwrap(), TokenKind::FTdqEnd);
    }

    #[test]
    fn fstring_conversion_and_format_spec() {
        let ks = kinds(r#"f"{x!r}" f"{y:.2f}""#);
        assert!(ks.contains(&TokenKind::Conv));
        assert!(ks.contains(&TokenKind::Colon));
        assert!(ks.contains(&TokenKind::FFormatText));
    }

    #[test]
    fn walrus_inside_fstring_expr_not_spec() {
        let ks = kinds(r#"f"{(n := 3)}""#);
        assert!(ks.contains(&TokenKind::WalrusEq));
        assert!(!ks.contains(&TokenKind::FFormatText));
    }

    #[test]
    fn unknown_char_is_error_token_and_scanning_continues() {
        let ks = kinds("a $ b");
        assert_eq!(
            ks,
            vec![TokenKind::Name, TokenKind::Error, TokenKind::Name]
        );
    }

    #[test]
    fn token_texts_reproduce_input() {
        let text = "def f(a: int = 3) -> int { return a * 2; } # tail\n";
        let src = Source::new(text, "t.jac");
        let (tokens, comments) = Lexer::new(&src, SourceId(0)).tokenize();
        let mut covered: Vec<(u32, u32)> = tokens
            .iter()
            .map(|t| (t.span.start, t.span.end))
            .chain(comments.iter().map(|c| (c.span.start, c.span.end)))
            .collect();
        covered.sort();
        let mut rebuilt = String::new();
        let mut last = 0u32;
        for (s, e) in covered {
            assert!(s >= last, "overlapping spans");
            rebuilt.push_str(&text[last as usize..s as usize]);
            rebuilt.push_str(&text[s as usize..e as usize]);
            last = e;
        }
        rebuilt.push_str(&text[last as usize..]);
        assert_eq!(rebuilt, text);
        // And the gaps are whitespace only.
        let mut last = 0usize;
        let mut spans: Vec<(usize, usize)> = tokens
            .iter()
            .map(|t| (t.span.start as usize, t.span.end as usize))
            .chain(
                comments
                    .iter()
                    .map(|c| (c.span.start as usize, c.span.end as usize)),
            )
            .collect();
        spans.sort();
        for (s, e) in spans {
            assert!(text[last..s].trim().is_empty());
            last = e;
        }
    }

    #[test]
    fn empty_input_yields_only_eof() {
        let toks = lex("");
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].kind, TokenKind::Eof);
    }
}
