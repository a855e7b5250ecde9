//! Expression grammar: precedence climbing, trailers, atoms, f-strings.

use super::{ParseResult, Parser};
use crate::ast::*;
use crate::source::Span;
use crate::token::{Token, TokenKind};

impl Parser {
    /// Lowest precedence: `value if cond else other`.
    pub(crate) fn parse_expression(&mut self) -> ParseResult<Expr> {
        let start = self.span_start();
        let value = self.parse_or()?;
        if self.at(TokenKind::KwIf) {
            self.advance();
            let cond = self.parse_or()?;
            self.expect(TokenKind::KwElse, "'else' in conditional expression")?;
            let else_value = self.parse_expression()?;
            return Ok(Expr::IfElse(IfElseExpr {
                span: self.span_from(start),
                value: Box::new(value),
                cond: Box::new(cond),
                else_value: Box::new(else_value),
            }));
        }
        Ok(value)
    }

    /// Type annotations are expressions with comma excluded.
    pub(crate) fn parse_type_annotation(&mut self) -> ParseResult<Expr> {
        self.parse_expression()
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let start = self.span_start();
        let first = self.parse_and()?;
        if !self.at(TokenKind::KwOr) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat(TokenKind::KwOr) {
            values.push(self.parse_and()?);
        }
        Ok(Expr::Bool(BoolExpr {
            span: self.span_from(start),
            op: TokenKind::KwOr,
            values,
        }))
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let start = self.span_start();
        let first = self.parse_not()?;
        if !self.at(TokenKind::KwAnd) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat(TokenKind::KwAnd) {
            values.push(self.parse_not()?);
        }
        Ok(Expr::Bool(BoolExpr {
            span: self.span_from(start),
            op: TokenKind::KwAnd,
            values,
        }))
    }

    fn parse_not(&mut self) -> ParseResult<Expr> {
        if self.at(TokenKind::Not) {
            let start = self.span_start();
            self.advance();
            let operand = self.parse_not()?;
            return Ok(Expr::Unary(UnaryExpr {
                span: self.span_from(start),
                op: TokenKind::Not,
                operand: Box::new(operand),
            }));
        }
        self.parse_comparison()
    }

    /// Chained comparison collects `(left, [ops], [rights])` in one node.
    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let start = self.span_start();
        let left = self.parse_bitor()?;
        if !self.cur_kind().is_comparison() {
            return Ok(left);
        }
        let mut ops = Vec::new();
        let mut rights = Vec::new();
        while self.cur_kind().is_comparison() {
            ops.push(self.advance().kind);
            rights.push(self.parse_bitor()?);
        }
        Ok(Expr::Compare(CompareExpr {
            span: self.span_from(start),
            left: Box::new(left),
            ops,
            rights,
        }))
    }

    fn parse_bitor(&mut self) -> ParseResult<Expr> {
        self.parse_left_assoc(&[TokenKind::BwOr], Self::parse_bitxor)
    }

    fn parse_bitxor(&mut self) -> ParseResult<Expr> {
        self.parse_left_assoc(&[TokenKind::BwXor], Self::parse_bitand)
    }

    fn parse_bitand(&mut self) -> ParseResult<Expr> {
        self.parse_left_assoc(&[TokenKind::BwAnd], Self::parse_shift)
    }

    fn parse_shift(&mut self) -> ParseResult<Expr> {
        self.parse_left_assoc(&[TokenKind::Lshift, TokenKind::Rshift], Self::parse_additive)
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        self.parse_left_assoc(&[TokenKind::Plus, TokenKind::Minus], Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        self.parse_left_assoc(
            &[
                TokenKind::StarMul,
                TokenKind::Div,
                TokenKind::FloorDiv,
                TokenKind::Mod,
            ],
            Self::parse_unary,
        )
    }

    fn parse_left_assoc(
        &mut self,
        ops: &[TokenKind],
        next: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let start = self.span_start();
        let mut left = next(self)?;
        while ops.contains(&self.cur_kind()) {
            let op = self.advance().kind;
            let right = next(self)?;
            left = Expr::Binary(BinaryExpr {
                span: self.span_from(start),
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        match self.cur_kind() {
            TokenKind::Minus | TokenKind::Plus | TokenKind::BwNot => {
                let start = self.span_start();
                let op = self.advance().kind;
                let operand = self.parse_unary()?;
                Ok(Expr::Unary(UnaryExpr {
                    span: self.span_from(start),
                    op,
                    operand: Box::new(operand),
                }))
            }
            TokenKind::KwAwait => {
                let start = self.span_start();
                self.advance();
                let value = self.parse_unary()?;
                Ok(Expr::Await(AwaitExpr {
                    span: self.span_from(start),
                    value: Box::new(value),
                }))
            }
            _ => self.parse_power(),
        }
    }

    /// `**` is right-associative.
    fn parse_power(&mut self) -> ParseResult<Expr> {
        let start = self.span_start();
        let base = self.parse_trailer_chain()?;
        if self.at(TokenKind::StarPow) {
            self.advance();
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(BinaryExpr {
                span: self.span_from(start),
                op: TokenKind::StarPow,
                left: Box::new(base),
                right: Box::new(exponent),
            }));
        }
        Ok(base)
    }

    /// Public entry for assignment/loop targets: a trailer chain only.
    pub(crate) fn parse_trailer_chain_expr(&mut self) -> ParseResult<Expr> {
        self.parse_trailer_chain()
    }

    fn parse_trailer_chain(&mut self) -> ParseResult<Expr> {
        let start = self.span_start();
        let mut expr = self.parse_atom()?;
        loop {
            match self.cur_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let attr = self.parse_member_name()?;
                    expr = Expr::AtomTrailer(AtomTrailer {
                        span: self.span_from(start),
                        target: Box::new(expr),
                        attr,
                        null_ok: false,
                    });
                }
                TokenKind::NullOk if self.peek_kind(1) == TokenKind::Dot => {
                    self.advance();
                    self.advance();
                    let attr = self.parse_member_name()?;
                    expr = Expr::AtomTrailer(AtomTrailer {
                        span: self.span_from(start),
                        target: Box::new(expr),
                        attr,
                        null_ok: true,
                    });
                }
                TokenKind::Lparen => {
                    let (args, kwargs) = self.parse_call_args()?;
                    expr = Expr::FuncCall(FuncCall {
                        span: self.span_from(start),
                        target: Box::new(expr),
                        args,
                        kwargs,
                    });
                }
                TokenKind::Lsquare => {
                    expr = self.parse_index_slice(expr, start)?;
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Attribute names may be keywords that double as member names.
    fn parse_member_name(&mut self) -> ParseResult<Ident> {
        match self.cur_kind() {
            TokenKind::Name | TokenKind::KwescName | TokenKind::KwInit | TokenKind::KwPostInit => {
                self.parse_ident("attribute name")
            }
            // Builtin-type keywords appear as method names (`x.list()` is
            // not a thing, but `x.type` style access exists in the wild).
            kind if kind.is_builtin_type() => {
                let tok = self.advance();
                Ok(Ident::new(tok.text, tok.span))
            }
            _ => self.parse_ident("attribute name"),
        }
    }

    fn parse_call_args(&mut self) -> ParseResult<(Vec<Expr>, Vec<KwPair>)> {
        self.expect(TokenKind::Lparen, "'('")?;
        let mut args = Vec::new();
        let mut kwargs = Vec::new();
        while !self.at(TokenKind::Rparen) {
            if self.at(TokenKind::Name) && self.peek_kind(1) == TokenKind::Eq {
                let kw_start = self.span_start();
                let key = self.parse_ident("keyword argument")?;
                self.advance(); // =
                let value = self.parse_expression()?;
                kwargs.push(KwPair {
                    span: self.span_from(kw_start),
                    key,
                    value,
                });
            } else {
                if !kwargs.is_empty() {
                    return Err(self.error_here(
                        "positional argument follows keyword argument".to_string(),
                    ));
                }
                args.push(self.parse_expression()?);
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Rparen, "')' closing arguments")?;
        Ok((args, kwargs))
    }

    fn parse_index_slice(&mut self, target: Expr, start: Span) -> ParseResult<Expr> {
        self.expect(TokenKind::Lsquare, "'['")?;
        let mut first = None;
        if !self.at(TokenKind::Colon) {
            first = Some(Box::new(self.parse_expression()?));
        }
        if self.eat(TokenKind::Colon) {
            let mut stop = None;
            let mut step = None;
            if !self.at(TokenKind::Rsquare) && !self.at(TokenKind::Colon) {
                stop = Some(Box::new(self.parse_expression()?));
            }
            if self.eat(TokenKind::Colon) && !self.at(TokenKind::Rsquare) {
                step = Some(Box::new(self.parse_expression()?));
            }
            self.expect(TokenKind::Rsquare, "']' closing slice")?;
            return Ok(Expr::IndexSlice(IndexSlice {
                span: self.span_from(start),
                target: Box::new(target),
                start: first,
                stop,
                step,
                is_range: true,
            }));
        }
        self.expect(TokenKind::Rsquare, "']' closing index")?;
        Ok(Expr::IndexSlice(IndexSlice {
            span: self.span_from(start),
            target: Box::new(target),
            start: first,
            stop: None,
            step: None,
            is_range: false,
        }))
    }

    // ------------------------------------------------------------------
    // Atoms
    // ------------------------------------------------------------------

    fn parse_atom(&mut self) -> ParseResult<Expr> {
        match self.cur_kind() {
            TokenKind::Int | TokenKind::HexInt | TokenKind::BinInt | TokenKind::OctInt => {
                let tok = self.advance();
                let value = parse_int_text(&tok.text).ok_or_else(|| {
                    self.error_at(tok.span, format!("invalid integer literal '{}'", tok.text))
                })?;
                Ok(Expr::Int(IntLit {
                    span: tok.span,
                    value,
                    text: tok.text,
                }))
            }
            TokenKind::Float => {
                let tok = self.advance();
                let cleaned: String = tok.text.chars().filter(|c| *c != '_').collect();
                let value = cleaned.parse::<f64>().map_err(|_| {
                    self.error_at(tok.span, format!("invalid float literal '{}'", tok.text))
                })?;
                Ok(Expr::Float(FloatLit {
                    span: tok.span,
                    value,
                    text: tok.text,
                }))
            }
            TokenKind::Str => self.parse_string_or_multistring(),
            kind if kind.is_fstring_start() => self.parse_string_or_multistring(),
            TokenKind::Bool => {
                let tok = self.advance();
                Ok(Expr::Bool_(BoolLit {
                    span: tok.span,
                    value: tok.text == "True",
                }))
            }
            TokenKind::Null => {
                let tok = self.advance();
                Ok(Expr::Null(NullLit { span: tok.span }))
            }
            TokenKind::Ellipsis => {
                let tok = self.advance();
                Ok(Expr::Ellipsis(EllipsisLit { span: tok.span }))
            }
            TokenKind::Name | TokenKind::KwescName => {
                let ident = self.parse_ident("name")?;
                Ok(Expr::Name(ident))
            }
            TokenKind::KwSelf => self.parse_special_var(SpecialVar::SelfRef),
            TokenKind::KwSuper => self.parse_special_var(SpecialVar::Super),
            TokenKind::KwInit => self.parse_special_var(SpecialVar::Init),
            TokenKind::KwPostInit => self.parse_special_var(SpecialVar::PostInit),
            TokenKind::KwRoot => self.parse_special_var(SpecialVar::Root),
            TokenKind::KwHere => self.parse_special_var(SpecialVar::Here),
            kind if kind.is_builtin_type() => {
                let tok = self.advance();
                Ok(Expr::BuiltinType(BuiltinTypeAtom {
                    span: tok.span,
                    kind: tok.kind,
                    name: tok.text,
                }))
            }
            TokenKind::KwLambda => self.parse_lambda(),
            TokenKind::Lparen => self.parse_paren(),
            TokenKind::Lsquare => self.parse_list(),
            TokenKind::Lbrace => self.parse_dict(),
            _ => Err(self.error_here(format!(
                "expected expression, found '{}'",
                self.describe_cur()
            ))),
        }
    }

    fn parse_special_var(&mut self, var: SpecialVar) -> ParseResult<Expr> {
        let tok = self.advance();
        Ok(Expr::SpecialVar(SpecialVarRef {
            span: tok.span,
            var,
        }))
    }

    /// `lambda a: int, b: int : a + b`
    fn parse_lambda(&mut self) -> ParseResult<Expr> {
        let start = self.span_start();
        self.advance(); // lambda
        let sig_start = self.span_start();
        let mut params = Vec::new();
        // The annotation colon is consumed inside the loop, so a colon seen
        // here is always the body separator.
        while !self.at(TokenKind::Colon) {
            let param_start = self.span_start();
            let param_id = self.next_id();
            let name = self.parse_ident("lambda parameter")?;
            let ty = if self.eat(TokenKind::Colon) {
                Some(self.parse_type_annotation()?)
            } else {
                None
            };
            let default = if self.eat(TokenKind::Eq) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            params.push(ParamVar {
                id: param_id,
                span: self.span_from(param_start),
                name,
                ty,
                default,
                star: ParamStar::None,
                computed_ty: None,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Colon, "':' before lambda body")?;
        let body = self.parse_expression()?;
        Ok(Expr::Lambda(LambdaExpr {
            span: self.span_from(start),
            signature: FuncSignature {
                span: self.span_from(sig_start),
                params,
                return_ty: None,
            },
            body: Box::new(body),
        }))
    }

    /// `( … )`: unit grouping, walrus, or tuple.
    fn parse_paren(&mut self) -> ParseResult<Expr> {
        let start = self.span_start();
        self.advance(); // (
        if self.at(TokenKind::Rparen) {
            let tok = self.advance();
            return Ok(Expr::Tuple(TupleVal {
                span: start.join(tok.span),
                items: Vec::new(),
            }));
        }

        // Walrus is only legal here, directly inside parentheses.
        if self.at(TokenKind::Name) && self.peek_kind(1) == TokenKind::WalrusEq {
            let target = self.parse_ident("walrus target")?;
            self.advance(); // :=
            let value = self.parse_expression()?;
            self.expect(TokenKind::Rparen, "')' closing walrus expression")?;
            return Ok(Expr::Walrus(WalrusExpr {
                span: self.span_from(start),
                target,
                value: Box::new(value),
            }));
        }

        let first = self.parse_expression()?;
        if self.at(TokenKind::Comma) {
            let mut items = vec![first];
            while self.eat(TokenKind::Comma) {
                if self.at(TokenKind::Rparen) {
                    break;
                }
                items.push(self.parse_expression()?);
            }
            self.expect(TokenKind::Rparen, "')' closing tuple")?;
            return Ok(Expr::Tuple(TupleVal {
                span: self.span_from(start),
                items,
            }));
        }
        self.expect(TokenKind::Rparen, "')' closing expression")?;
        Ok(Expr::AtomUnit(AtomUnit {
            span: self.span_from(start),
            value: Box::new(first),
        }))
    }

    fn parse_list(&mut self) -> ParseResult<Expr> {
        let start = self.span_start();
        self.advance(); // [
        let mut items = Vec::new();
        while !self.at(TokenKind::Rsquare) {
            items.push(self.parse_expression()?);
            if self.at(TokenKind::KwFor) {
                return Err(self.error_here(
                    "comprehensions are not supported; build the list with a loop".to_string(),
                ));
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Rsquare, "']' closing list")?;
        Ok(Expr::List(ListVal {
            span: self.span_from(start),
            items,
        }))
    }

    /// `{ k: v, … }`. Set literals are not part of the language; a brace
    /// group without a colon is rejected.
    fn parse_dict(&mut self) -> ParseResult<Expr> {
        let start = self.span_start();
        self.advance(); // {
        let mut pairs = Vec::new();
        while !self.at(TokenKind::Rbrace) {
            let pair_start = self.span_start();
            if self.eat(TokenKind::StarPow) {
                let value = self.parse_expression()?;
                pairs.push(KvPair {
                    span: self.span_from(pair_start),
                    key: None,
                    value,
                });
            } else {
                let key = self.parse_expression()?;
                if !self.eat(TokenKind::Colon) {
                    return Err(self.error_at(
                        key.span(),
                        "expected ':' after dictionary key (set literals are not supported)"
                            .to_string(),
                    ));
                }
                let value = self.parse_expression()?;
                pairs.push(KvPair {
                    span: self.span_from(pair_start),
                    key: Some(key),
                    value,
                });
            }
            if self.at(TokenKind::KwFor) {
                return Err(self.error_here(
                    "comprehensions are not supported; build the dict with a loop".to_string(),
                ));
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Rbrace, "'}' closing dictionary")?;
        Ok(Expr::Dict(DictVal {
            span: self.span_from(start),
            pairs,
        }))
    }

    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    /// One string literal token unescaped into a StringLit.
    pub(crate) fn parse_string_lit(&mut self) -> ParseResult<StringLit> {
        let tok = self.expect(TokenKind::Str, "string literal")?;
        Ok(string_lit_from_token(&tok))
    }

    /// A string atom: plain string, f-string, or several adjacent ones
    /// concatenated into a MultiString.
    fn parse_string_or_multistring(&mut self) -> ParseResult<Expr> {
        let start = self.span_start();
        let first = self.parse_one_string()?;
        if !self.at(TokenKind::Str) && !self.cur_kind().is_fstring_start() {
            return Ok(first);
        }
        let mut strings = vec![first];
        while self.at(TokenKind::Str) || self.cur_kind().is_fstring_start() {
            strings.push(self.parse_one_string()?);
        }
        Ok(Expr::MultiString(MultiString {
            span: self.span_from(start),
            strings,
        }))
    }

    fn parse_one_string(&mut self) -> ParseResult<Expr> {
        if self.at(TokenKind::Str) {
            let lit = self.parse_string_lit()?;
            return Ok(Expr::String(lit));
        }
        self.parse_fstring()
    }

    /// Fragment loop over the lexer's f-string token kinds.
    fn parse_fstring(&mut self) -> ParseResult<Expr> {
        let start_tok = self.advance();
        debug_assert!(start_tok.kind.is_fstring_start());
        let raw = matches!(
            start_tok.kind,
            TokenKind::RfDqStart
                | TokenKind::RfSqStart
                | TokenKind::RfTdqStart
                | TokenKind::RfTsqStart
        );
        let triple = matches!(
            start_tok.kind,
            TokenKind::FTdqStart
                | TokenKind::FTsqStart
                | TokenKind::RfTdqStart
                | TokenKind::RfTsqStart
        );
        let start = start_tok.span;
        let mut parts = Vec::new();

        loop {
            let kind = self.cur_kind();
            if kind.is_fstring_end() {
                self.advance();
                break;
            }
            if kind == TokenKind::Eof {
                return Err(self.error_at(
                    start,
                    "unterminated f-string".to_string(),
                ));
            }
            if kind.is_fstring_text() {
                let tok = self.advance();
                let value = match tok.kind {
                    TokenKind::DLbrace => "{".to_string(),
                    TokenKind::DRbrace => "}".to_string(),
                    _ if raw => tok.text.clone(),
                    _ => unescape(&tok.text),
                };
                parts.push(FStringPart::Text(StringLit {
                    span: tok.span,
                    value,
                    text: tok.text,
                }));
                continue;
            }
            if kind == TokenKind::Lbrace {
                let fv_start = self.span_start();
                self.advance();
                let value = self.parse_expression()?;
                let conversion = if self.at(TokenKind::Conv) {
                    let tok = self.advance();
                    tok.text.chars().nth(1)
                } else {
                    None
                };
                let format_spec = if self.eat(TokenKind::Colon) {
                    let mut spec = String::new();
                    while self.at(TokenKind::FFormatText) {
                        spec.push_str(&self.advance().text);
                    }
                    Some(spec)
                } else {
                    None
                };
                self.expect(TokenKind::Rbrace, "'}' closing f-string expression")?;
                parts.push(FStringPart::Expr(FormattedValue {
                    span: self.span_from(fv_start),
                    value: Box::new(value),
                    conversion,
                    format_spec,
                }));
                continue;
            }
            return Err(self.error_here(format!(
                "unexpected token in f-string: '{}'",
                self.describe_cur()
            )));
        }

        Ok(Expr::FString(FString {
            span: self.span_from(start),
            parts,
            raw,
            triple,
        }))
    }
}

/// Parse an integer token (decimal, hex, binary, octal, underscores).
fn parse_int_text(text: &str) -> Option<i64> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    if let Some(hex) = cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok();
    }
    if let Some(bin) = cleaned.strip_prefix("0b").or_else(|| cleaned.strip_prefix("0B")) {
        return i64::from_str_radix(bin, 2).ok();
    }
    if let Some(oct) = cleaned.strip_prefix("0o").or_else(|| cleaned.strip_prefix("0O")) {
        return i64::from_str_radix(oct, 8).ok();
    }
    cleaned.parse::<i64>().ok()
}

/// Build a StringLit from a raw string token, handling prefixes, quote
/// styles, and escapes.
pub(crate) fn string_lit_from_token(tok: &Token) -> StringLit {
    let text = tok.text.as_str();
    let mut rest = text;
    let mut raw = false;
    // Strip prefix letters (r/b combinations).
    while let Some(c) = rest.chars().next() {
        match c {
            'r' | 'R' => {
                raw = true;
                rest = &rest[1..];
            }
            'b' | 'B' | 'f' | 'F' => {
                rest = &rest[1..];
            }
            _ => break,
        }
    }
    let quote = rest.chars().next().unwrap_or('"');
    let triple = rest.len() >= 6 && rest.starts_with(&quote.to_string().repeat(3));
    let (open, close) = if triple { (3, 3) } else { (1, 1) };
    let body = if rest.len() >= open + close {
        let inner = &rest[open..];
        // Tolerate unterminated strings: strip the close quote only when
        // present.
        let close_str = quote.to_string().repeat(close);
        inner.strip_suffix(close_str.as_str()).unwrap_or(inner)
    } else {
        ""
    };
    let value = if raw { body.to_string() } else { unescape(body) };
    StringLit {
        span: tok.span,
        value,
        text: tok.text.clone(),
    }
}

/// Process backslash escapes.
pub(crate) fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('{') => out.push('{'),
            Some('}') => out.push('}'),
            Some('x') => {
                let hi = chars.next();
                let lo = chars.next();
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    if let Ok(byte) = u8::from_str_radix(&format!("{hi}{lo}"), 16) {
                        out.push(byte as char);
                        continue;
                    }
                }
                out.push_str("\\x");
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
