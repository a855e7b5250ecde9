//! Recursive-descent parser: token list to unified-tree Module.
//!
//! No backtracking beyond two tokens of lookahead. Any unexpected token
//! produces a positioned SyntaxError and aborts the current production; the
//! driver then synchronizes to the next plausible element start, so a
//! Module always comes back (marked `has_syntax_errors` on failure).

mod decl;
mod expr;
mod stmt;

pub(crate) use expr::unescape as unescape_text;

#[cfg(test)]
mod tests;

use crate::ast::*;
use crate::diag::{Alert, AlertKind};
use crate::source::{Source, SourceId, Span};
use crate::token::{Comment, Token, TokenKind};

pub(crate) type ParseResult<T> = Result<T, Alert>;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    src: SourceId,
    module_name: String,
    ids: NodeIdGen,
    comments: Vec<Comment>,
    pub errors: Vec<Alert>,
}

impl Parser {
    pub fn new(source: &Source, src: SourceId) -> Self {
        let module_name = source
            .path()
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.split('.').next().unwrap_or(s).to_string())
            .unwrap_or_else(|| "module".to_string());
        let (tokens, comments) = crate::lexer::Lexer::new(source, src).tokenize();
        Parser {
            tokens,
            pos: 0,
            src,
            module_name,
            ids: NodeIdGen::new(),
            comments,
            errors: Vec::new(),
        }
    }

    /// Parse a whole module. Never fails: errors land in `self.errors` and
    /// the module is flagged.
    pub fn parse_module(mut self) -> (Module, Vec<Alert>) {
        let end = self
            .tokens
            .last()
            .map(|t| t.span.end as usize)
            .unwrap_or(0);
        let module_id = self.ids.next();

        let mut doc = None;
        if self.at(TokenKind::Str) && self.is_doc_position() {
            if let Ok(lit) = self.parse_string_lit() {
                doc = Some(lit);
            }
        }

        let mut body = Vec::new();
        let mut had_errors = false;
        while !self.at(TokenKind::Eof) {
            let before = self.pos;
            match self.parse_element() {
                Ok(Some(elem)) => body.push(elem),
                Ok(None) => {}
                Err(alert) => {
                    had_errors = true;
                    self.errors.push(alert);
                    self.synchronize();
                }
            }
            if self.pos == before {
                // Safety valve: always make progress.
                self.pos += 1;
            }
        }

        let module = Module {
            id: module_id,
            name: self.module_name.clone(),
            span: Span::new(self.src, 0, end),
            src: self.src,
            doc,
            body,
            has_syntax_errors: had_errors,
            stub_only: false,
            code_context: CodeContext::Default,
            terminals: std::mem::take(&mut self.tokens),
            comments: std::mem::take(&mut self.comments),
            annexed: Vec::new(),
            sym_tab: None,
            gen: Gen::default(),
        };
        (module, self.errors)
    }

    /// A doc string only counts when the next meaningful token starts a
    /// declaration rather than continuing an expression.
    fn is_doc_position(&self) -> bool {
        !matches!(
            self.peek_kind(1),
            TokenKind::Dot
                | TokenKind::Plus
                | TokenKind::Lsquare
                | TokenKind::Lparen
                | TokenKind::Str
        )
    }

    // ------------------------------------------------------------------
    // Cursor helpers
    // ------------------------------------------------------------------

    pub(crate) fn cur(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn cur_kind(&self) -> TokenKind {
        self.cur().kind
    }

    pub(crate) fn peek_kind(&self, off: usize) -> TokenKind {
        self.tokens
            .get(self.pos + off)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.cur_kind() == kind
    }

    pub(crate) fn advance(&mut self) -> Token {
        let tok = self.cur().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, what: &str) -> ParseResult<Token> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!(
                "expected {}, found '{}'",
                what,
                self.describe_cur()
            )))
        }
    }

    pub(crate) fn describe_cur(&self) -> String {
        let tok = self.cur();
        if tok.kind == TokenKind::Eof {
            "end of file".to_string()
        } else {
            tok.text.clone()
        }
    }

    pub(crate) fn error_here(&self, message: String) -> Alert {
        Alert::new(AlertKind::SyntaxError, message, self.cur().span)
    }

    pub(crate) fn error_at(&self, span: Span, message: String) -> Alert {
        Alert::new(AlertKind::SyntaxError, message, span)
    }

    pub(crate) fn next_id(&mut self) -> NodeId {
        self.ids.next()
    }

    pub(crate) fn span_start(&self) -> Span {
        self.cur().span
    }

    pub(crate) fn prev_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }

    pub(crate) fn span_from(&self, start: Span) -> Span {
        start.join(self.prev_span())
    }

    /// Skip ahead to a plausible element start after an error.
    fn synchronize(&mut self) {
        let mut depth = 0i32;
        while !self.at(TokenKind::Eof) {
            match self.cur_kind() {
                TokenKind::Semi if depth <= 0 => {
                    self.advance();
                    return;
                }
                TokenKind::Lbrace => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::Rbrace => {
                    depth -= 1;
                    self.advance();
                    if depth <= 0 {
                        return;
                    }
                }
                TokenKind::KwObj
                | TokenKind::KwClass
                | TokenKind::KwNode
                | TokenKind::KwEdge
                | TokenKind::KwWalker
                | TokenKind::KwEnum
                | TokenKind::KwDef
                | TokenKind::KwCan
                | TokenKind::KwImpl
                | TokenKind::KwImport
                | TokenKind::KwInclude
                | TokenKind::KwGlob
                | TokenKind::KwSem
                | TokenKind::KwTest
                    if depth <= 0 =>
                {
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Top-level elements
    // ------------------------------------------------------------------

    fn parse_element(&mut self) -> ParseResult<Option<ElementStmt>> {
        match self.cur_kind() {
            TokenKind::Semi => {
                self.advance();
                Ok(None)
            }
            TokenKind::KwImport | TokenKind::KwInclude => {
                Ok(Some(ElementStmt::Import(self.parse_import()?)))
            }
            TokenKind::Decor => {
                let decorators = self.parse_decorators()?;
                match self.cur_kind() {
                    TokenKind::KwObj
                    | TokenKind::KwClass
                    | TokenKind::KwNode
                    | TokenKind::KwEdge
                    | TokenKind::KwWalker => Ok(Some(ElementStmt::Archetype(
                        self.parse_archetype(decorators, false)?,
                    ))),
                    TokenKind::KwDef | TokenKind::KwCan | TokenKind::KwAsync => Ok(Some(
                        ElementStmt::Ability(self.parse_ability(decorators, false, false, false)?),
                    )),
                    _ => Err(self.error_here(format!(
                        "expected a declaration after decorator, found '{}'",
                        self.describe_cur()
                    ))),
                }
            }
            TokenKind::KwAsync => {
                let next = self.peek_kind(1);
                match next {
                    TokenKind::KwDef | TokenKind::KwCan => {
                        self.advance();
                        Ok(Some(ElementStmt::Ability(
                            self.parse_ability(Vec::new(), true, false, false)?,
                        )))
                    }
                    TokenKind::KwWalker => {
                        self.advance();
                        Ok(Some(ElementStmt::Archetype(
                            self.parse_archetype(Vec::new(), true)?,
                        )))
                    }
                    _ => Ok(Some(ElementStmt::Stmt(self.parse_statement()?))),
                }
            }
            TokenKind::KwObj
            | TokenKind::KwClass
            | TokenKind::KwNode
            | TokenKind::KwEdge
            | TokenKind::KwWalker => Ok(Some(ElementStmt::Archetype(
                self.parse_archetype(Vec::new(), false)?,
            ))),
            TokenKind::KwEnum => Ok(Some(ElementStmt::Enum(self.parse_enum()?))),
            TokenKind::KwDef | TokenKind::KwCan => Ok(Some(ElementStmt::Ability(
                self.parse_ability(Vec::new(), false, false, false)?,
            ))),
            TokenKind::KwStatic => {
                Err(self.error_here("'static' is only valid inside an archetype".to_string()))
            }
            TokenKind::KwImpl => Ok(Some(ElementStmt::Impl(self.parse_impl()?))),
            TokenKind::KwGlob => Ok(Some(ElementStmt::GlobalVars(self.parse_glob()?))),
            TokenKind::KwSem => Ok(Some(ElementStmt::Sem(self.parse_sem()?))),
            TokenKind::KwTest => Ok(Some(ElementStmt::Test(self.parse_test()?))),
            TokenKind::KwWith
                if matches!(self.peek_kind(1), TokenKind::KwEntry | TokenKind::KwExit) =>
            {
                Ok(Some(ElementStmt::ModuleCode(self.parse_module_code()?)))
            }
            TokenKind::Error => {
                let tok = self.advance();
                Err(self.error_at(
                    tok.span,
                    format!("unknown character '{}'", tok.text),
                ))
            }
            _ => Ok(Some(ElementStmt::Stmt(self.parse_statement()?))),
        }
    }

    pub(crate) fn parse_decorators(&mut self) -> ParseResult<Vec<Expr>> {
        let mut decorators = Vec::new();
        while self.eat(TokenKind::Decor) {
            decorators.push(self.parse_expression()?);
        }
        Ok(decorators)
    }

    /// Optional `:pub` / `:priv` / `:protect` access tag.
    pub(crate) fn parse_access_tag(&mut self) -> Option<AccessTag> {
        if self.at(TokenKind::Colon) {
            let tag = match self.peek_kind(1) {
                TokenKind::KwPub => Some(AccessTag::Pub),
                TokenKind::KwPriv => Some(AccessTag::Priv),
                TokenKind::KwProt => Some(AccessTag::Protect),
                _ => None,
            };
            if tag.is_some() {
                self.advance();
                self.advance();
                return tag;
            }
        }
        None
    }

    /// A plain or keyword-escaped identifier.
    pub(crate) fn parse_ident(&mut self, what: &str) -> ParseResult<Ident> {
        match self.cur_kind() {
            TokenKind::Name => {
                let tok = self.advance();
                Ok(Ident::new(tok.text, tok.span))
            }
            TokenKind::KwescName => {
                let tok = self.advance();
                let mut ident = Ident::new(tok.text.trim_start_matches("<>"), tok.span);
                ident.is_kwesc = true;
                Ok(ident)
            }
            // Special member names usable as declaration names.
            TokenKind::KwInit | TokenKind::KwPostInit => {
                let tok = self.advance();
                Ok(Ident::new(tok.text, tok.span))
            }
            _ => Err(self.error_here(format!(
                "expected {}, found '{}'",
                what,
                self.describe_cur()
            ))),
        }
    }
}
