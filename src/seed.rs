//! The seed compiler (Layer 0): a deliberately minimal, standalone
//! pipeline for the restricted bootstrap subset.
//!
//! One traversal: lex, parse, emit host AST directly, assemble to
//! bytecode. No symbol table, no pass scheduler, no impl files, no
//! diagnostics beyond a positioned syntax error. Anything outside the
//! subset fails loudly rather than miscompiling: no try/except, no sets,
//! no comprehensions, no walrus.

use std::collections::HashMap;
use std::path::Path;

use crate::host::ast::*;
use crate::host::interp::{Interp, Value};
use crate::host::CodeObject;

/// Positioned syntax error, the seed's only diagnostic.
#[derive(Debug, Clone)]
pub struct SeedError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl std::fmt::Display for SeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SyntaxError at {}:{}: {}", self.line, self.col, self.message)
    }
}

impl std::error::Error for SeedError {}

/// Compile seed-subset source to a host code object.
pub fn seed_compile(source: &str, filename: &str) -> Result<CodeObject, SeedError> {
    let tokens = SeedLexer::new(source).tokenize()?;
    let module_name = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.split('.').next().unwrap_or(s).to_string())
        .unwrap_or_else(|| "module".to_string());
    let module = SeedParser::new(tokens, module_name).parse_module()?;
    Ok(CodeObject::new(module, filename))
}

/// Compile a seed-subset file.
pub fn seed_compile_file(path: &Path) -> Result<CodeObject, SeedError> {
    let source = std::fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .map_err(|e| SeedError {
            message: format!("cannot read {}: {}", path.display(), e),
            line: 0,
            col: 0,
        })?;
    seed_compile(&source, &path.display().to_string())
}

#[derive(Debug)]
pub enum SeedExecError {
    Syntax(SeedError),
    Runtime(crate::host::RuntimeError),
}

impl std::fmt::Display for SeedExecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedExecError::Syntax(e) => write!(f, "{e}"),
            SeedExecError::Runtime(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SeedExecError {}

/// Compile and execute; returns the resulting namespace.
pub fn seed_exec(
    source: &str,
    filename: &str,
    globals: Option<HashMap<String, Value>>,
) -> Result<HashMap<String, Value>, SeedExecError> {
    let code = seed_compile(source, filename).map_err(SeedExecError::Syntax)?;
    let mut interp = Interp::new();
    match globals {
        Some(seeded) => {
            let ns: crate::host::Namespace =
                std::rc::Rc::new(std::cell::RefCell::new(seeded));
            interp
                .exec_into(&code, ns.clone())
                .map_err(SeedExecError::Runtime)?;
            let result = ns.borrow().clone();
            Ok(result)
        }
        None => interp.exec(&code).map_err(SeedExecError::Runtime),
    }
}

// ---------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SeedTok {
    KwObj,
    KwClass,
    KwEnum,
    KwDef,
    KwCan,
    KwImpl,
    KwGlob,
    KwHas,
    KwIf,
    KwElif,
    KwElse,
    KwWhile,
    KwFor,
    KwIn,
    KwReturn,
    KwBreak,
    KwContinue,
    KwImport,
    KwFrom,
    KwAs,
    KwGlobalOp,
    KwAnd,
    KwOr,
    KwNot,
    KwIs,
    KwNin,
    KwIsn,
    Bool,
    Null,
    Name,
    Int,
    Float,
    Str,
    /// Whole interpolated literal as a single token; the parser re-scans
    /// its body for embedded expressions.
    FString,
    Plus,
    Minus,
    Star,
    Slash,
    DSlash,
    Percent,
    Pow,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
    EqEq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    Arrow,
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    Lparen,
    Rparen,
    Lbrace,
    Rbrace,
    Lsquare,
    Rsquare,
    Comma,
    Colon,
    Semi,
    Dot,
    Eof,
}

#[derive(Clone, Debug)]
pub struct SeedToken {
    pub kind: SeedTok,
    pub value: String,
    pub line: usize,
    pub col: usize,
}

pub struct SeedLexer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> SeedLexer<'a> {
    pub fn new(text: &'a str) -> Self {
        SeedLexer {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn err(&self, message: impl Into<String>) -> SeedError {
        SeedError {
            message: message.into(),
            line: self.line,
            col: self.col,
        }
    }

    fn cur(&self) -> u8 {
        *self.bytes.get(self.pos).unwrap_or(&0)
    }

    fn peek(&self, off: usize) -> u8 {
        *self.bytes.get(self.pos + off).unwrap_or(&0)
    }

    fn bump(&mut self) -> u8 {
        let c = self.cur();
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        c
    }

    pub fn tokenize(mut self) -> Result<Vec<SeedToken>, SeedError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            if self.pos >= self.bytes.len() {
                break;
            }
            tokens.push(self.next_token()?);
        }
        tokens.push(SeedToken {
            kind: SeedTok::Eof,
            value: String::new(),
            line: self.line,
            col: self.col,
        });
        Ok(tokens)
    }

    fn skip_trivia(&mut self) {
        while self.pos < self.bytes.len() {
            match self.cur() {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.bump();
                }
                b'#' => {
                    while self.pos < self.bytes.len() && self.cur() != b'\n' {
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<SeedToken, SeedError> {
        let (line, col) = (self.line, self.col);
        let c = self.cur();

        if c.is_ascii_alphabetic() || c == b'_' {
            // f-string prefix?
            if (c == b'f' || c == b'F') && matches!(self.peek(1), b'"' | b'\'') {
                self.bump();
                let value = self.read_quoted(true)?;
                return Ok(SeedToken {
                    kind: SeedTok::FString,
                    value: format!("f{value}"),
                    line,
                    col,
                });
            }
            let start = self.pos;
            while self.pos < self.bytes.len()
                && (self.cur().is_ascii_alphanumeric() || self.cur() == b'_')
            {
                self.bump();
            }
            let word = &self.text[start..self.pos];
            let kind = match word {
                "obj" => SeedTok::KwObj,
                "class" => SeedTok::KwClass,
                "enum" => SeedTok::KwEnum,
                "def" => SeedTok::KwDef,
                "can" => SeedTok::KwCan,
                "impl" => SeedTok::KwImpl,
                "glob" => SeedTok::KwGlob,
                "has" => SeedTok::KwHas,
                "if" => SeedTok::KwIf,
                "elif" => SeedTok::KwElif,
                "else" => SeedTok::KwElse,
                "while" => SeedTok::KwWhile,
                "for" => SeedTok::KwFor,
                "in" => SeedTok::KwIn,
                "return" => SeedTok::KwReturn,
                "break" => SeedTok::KwBreak,
                "continue" => SeedTok::KwContinue,
                "import" => SeedTok::KwImport,
                "from" => SeedTok::KwFrom,
                "as" => SeedTok::KwAs,
                "global" => SeedTok::KwGlobalOp,
                "and" => SeedTok::KwAnd,
                "or" => SeedTok::KwOr,
                "not" => {
                    if self.word_follows("in") {
                        return Ok(SeedToken {
                            kind: SeedTok::KwNin,
                            value: "not in".into(),
                            line,
                            col,
                        });
                    }
                    SeedTok::KwNot
                }
                "is" => {
                    if self.word_follows("not") {
                        return Ok(SeedToken {
                            kind: SeedTok::KwIsn,
                            value: "is not".into(),
                            line,
                            col,
                        });
                    }
                    SeedTok::KwIs
                }
                "True" | "False" => SeedTok::Bool,
                "None" => SeedTok::Null,
                _ => SeedTok::Name,
            };
            return Ok(SeedToken {
                kind,
                value: word.to_string(),
                line,
                col,
            });
        }

        if c.is_ascii_digit() {
            let start = self.pos;
            let mut is_float = false;
            while self.pos < self.bytes.len()
                && (self.cur().is_ascii_digit() || self.cur() == b'_')
            {
                self.bump();
            }
            if self.cur() == b'.' && self.peek(1).is_ascii_digit() {
                is_float = true;
                self.bump();
                while self.pos < self.bytes.len()
                    && (self.cur().is_ascii_digit() || self.cur() == b'_')
                {
                    self.bump();
                }
            }
            return Ok(SeedToken {
                kind: if is_float { SeedTok::Float } else { SeedTok::Int },
                value: self.text[start..self.pos].to_string(),
                line,
                col,
            });
        }

        if c == b'"' || c == b'\'' {
            let value = self.read_quoted(false)?;
            return Ok(SeedToken {
                kind: SeedTok::Str,
                value,
                line,
                col,
            });
        }

        let two = &self.text[self.pos..(self.pos + 2).min(self.text.len())];
        let two_kind = match two {
            "**" => Some(SeedTok::Pow),
            "//" => Some(SeedTok::DSlash),
            "<<" => Some(SeedTok::Shl),
            ">>" => Some(SeedTok::Shr),
            "==" => Some(SeedTok::EqEq),
            "!=" => Some(SeedTok::Neq),
            "<=" => Some(SeedTok::Lte),
            ">=" => Some(SeedTok::Gte),
            "->" => Some(SeedTok::Arrow),
            "+=" => Some(SeedTok::PlusEq),
            "-=" => Some(SeedTok::MinusEq),
            "*=" => Some(SeedTok::StarEq),
            "/=" => Some(SeedTok::SlashEq),
            _ => None,
        };
        if let Some(kind) = two_kind {
            self.bump();
            self.bump();
            return Ok(SeedToken {
                kind,
                value: two.to_string(),
                line,
                col,
            });
        }

        let kind = match c {
            b'+' => SeedTok::Plus,
            b'-' => SeedTok::Minus,
            b'*' => SeedTok::Star,
            b'/' => SeedTok::Slash,
            b'%' => SeedTok::Percent,
            b'&' => SeedTok::Amp,
            b'|' => SeedTok::Pipe,
            b'^' => SeedTok::Caret,
            b'~' => SeedTok::Tilde,
            b'<' => SeedTok::Lt,
            b'>' => SeedTok::Gt,
            b'=' => SeedTok::Eq,
            b'(' => SeedTok::Lparen,
            b')' => SeedTok::Rparen,
            b'{' => SeedTok::Lbrace,
            b'}' => SeedTok::Rbrace,
            b'[' => SeedTok::Lsquare,
            b']' => SeedTok::Rsquare,
            b',' => SeedTok::Comma,
            b':' => SeedTok::Colon,
            b';' => SeedTok::Semi,
            b'.' => SeedTok::Dot,
            other => {
                return Err(self.err(format!("unexpected character '{}'", other as char)))
            }
        };
        self.bump();
        return Ok(SeedToken {
            kind,
            value: (c as char).to_string(),
            line,
            col,
        });
    }

    fn word_follows(&mut self, word: &str) -> bool {
        let mut p = self.pos;
        while p < self.bytes.len() && matches!(self.bytes[p], b' ' | b'\t' | b'\r' | b'\n') {
            p += 1;
        }
        if !self.text[p..].starts_with(word) {
            return false;
        }
        let end = p + word.len();
        if self
            .bytes
            .get(end)
            .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_')
        {
            return false;
        }
        while self.pos < end {
            self.bump();
        }
        true
    }

    /// Read a quoted string (single or triple), returning the raw text
    /// including quotes. Braces inside f-strings are left intact for the
    /// parser to split.
    fn read_quoted(&mut self, _interpolated: bool) -> Result<String, SeedError> {
        let start = self.pos;
        let quote = self.cur();
        let triple = self.peek(1) == quote && self.peek(2) == quote;
        if triple {
            self.bump();
            self.bump();
            self.bump();
        } else {
            self.bump();
        }
        loop {
            if self.pos >= self.bytes.len() {
                return Err(self.err("unterminated string literal"));
            }
            let c = self.cur();
            if c == b'\\' {
                self.bump();
                if self.pos < self.bytes.len() {
                    self.bump();
                }
                continue;
            }
            if triple {
                if c == quote && self.peek(1) == quote && self.peek(2) == quote {
                    self.bump();
                    self.bump();
                    self.bump();
                    break;
                }
                self.bump();
            } else {
                if c == quote {
                    self.bump();
                    break;
                }
                if c == b'\n' {
                    return Err(self.err("unterminated string literal"));
                }
                self.bump();
            }
        }
        Ok(self.text[start..self.pos].to_string())
    }
}

// ---------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------

pub struct SeedParser {
    tokens: Vec<SeedToken>,
    pos: usize,
    module_name: String,
    /// Impl attribute assignments waiting for both their target class and
    /// their implementation function: (class name, function name, stmt).
    deferred: Vec<(String, String, HostStmt)>,
}

type SeedResult<T> = Result<T, SeedError>;

impl SeedParser {
    pub fn new(tokens: Vec<SeedToken>, module_name: String) -> Self {
        SeedParser {
            tokens,
            pos: 0,
            module_name,
            deferred: Vec::new(),
        }
    }

    fn cur(&self) -> &SeedToken {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn at(&self, kind: SeedTok) -> bool {
        self.cur().kind == kind
    }

    fn peek_kind(&self, off: usize) -> SeedTok {
        self.tokens
            .get(self.pos + off)
            .map(|t| t.kind)
            .unwrap_or(SeedTok::Eof)
    }

    fn bump(&mut self) -> SeedToken {
        let tok = self.cur().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: SeedTok) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn err(&self, message: impl Into<String>) -> SeedError {
        SeedError {
            message: message.into(),
            line: self.cur().line,
            col: self.cur().col,
        }
    }

    fn expect(&mut self, kind: SeedTok, what: &str) -> SeedResult<SeedToken> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.err(format!("expected {}, found '{}'", what, self.cur().value)))
        }
    }

    fn name(&mut self, what: &str) -> SeedResult<String> {
        let tok = self.expect(SeedTok::Name, what)?;
        Ok(tok.value)
    }

    pub fn parse_module(mut self) -> SeedResult<HostModule> {
        let mut body = Vec::new();
        let mut doc = None;
        if self.at(SeedTok::Str) && self.peek_kind(1) != SeedTok::Semi {
            doc = Some(unquote(&self.bump().value));
        }
        while !self.at(SeedTok::Eof) {
            self.top_level(&mut body)?;
        }
        // Impl assignments land as soon as both the class and the function
        // exist, so an impl may precede or follow its archetype.
        let mut deferred = std::mem::take(&mut self.deferred);
        let mut woven = Vec::with_capacity(body.len() + deferred.len());
        let mut classes: Vec<String> = Vec::new();
        let mut funcs: Vec<String> = Vec::new();
        for stmt in body {
            match &stmt {
                HostStmt::ClassDef { name, .. } => classes.push(name.clone()),
                HostStmt::FuncDef { name, .. } => funcs.push(name.clone()),
                _ => {}
            }
            woven.push(stmt);
            let mut i = 0;
            while i < deferred.len() {
                if classes.contains(&deferred[i].0) && funcs.contains(&deferred[i].1) {
                    let (_, _, assign) = deferred.remove(i);
                    woven.push(assign);
                } else {
                    i += 1;
                }
            }
        }
        woven.extend(deferred.into_iter().map(|(_, _, stmt)| stmt));
        Ok(HostModule {
            name: self.module_name,
            doc,
            body: woven,
        })
    }

    fn top_level(&mut self, out: &mut Vec<HostStmt>) -> SeedResult<()> {
        match self.cur().kind {
            SeedTok::KwObj | SeedTok::KwClass => {
                let class = self.archetype()?;
                out.push(class);
            }
            SeedTok::KwEnum => {
                let en = self.enum_def()?;
                out.push(en);
            }
            SeedTok::KwDef | SeedTok::KwCan => {
                let func = self.ability(false)?;
                out.push(func);
            }
            SeedTok::KwImpl => self.impl_def(out)?,
            SeedTok::KwGlob => self.glob(out)?,
            SeedTok::KwImport => self.import(out)?,
            SeedTok::Semi => {
                self.bump();
            }
            _ => {
                let stmt = self.statement()?;
                out.push(stmt);
            }
        }
        Ok(())
    }

    fn archetype(&mut self) -> SeedResult<HostStmt> {
        self.bump(); // obj / class
        let name = self.name("archetype name")?;
        let mut bases = Vec::new();
        if self.eat(SeedTok::Lparen) {
            while !self.at(SeedTok::Rparen) {
                bases.push(self.name("base name")?);
                if !self.eat(SeedTok::Comma) {
                    break;
                }
            }
            self.expect(SeedTok::Rparen, "')'")?;
        }
        bases.push("Obj".to_string());

        self.expect(SeedTok::Lbrace, "'{' opening archetype body")?;
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.at(SeedTok::Rbrace) {
            match self.cur().kind {
                SeedTok::KwHas => {
                    self.bump();
                    loop {
                        let field_name = self.name("field name")?;
                        self.expect(SeedTok::Colon, "':' before field type")?;
                        let annotation = self.type_text()?;
                        let default = if self.eat(SeedTok::Eq) {
                            Some(self.expression()?)
                        } else {
                            None
                        };
                        let per_instance = default
                            .as_ref()
                            .map(|d| d.is_mutable_literal())
                            .unwrap_or(false);
                        fields.push(HostField {
                            name: field_name,
                            annotation: Some(annotation),
                            default,
                            per_instance,
                        });
                        if !self.eat(SeedTok::Comma) {
                            break;
                        }
                    }
                    self.expect(SeedTok::Semi, "';' after has")?;
                }
                SeedTok::KwDef | SeedTok::KwCan => {
                    methods.push(self.ability(true)?);
                }
                _ => return Err(self.err("expected 'has' or a method in archetype body")),
            }
        }
        self.expect(SeedTok::Rbrace, "'}'")?;
        Ok(HostStmt::ClassDef {
            name,
            bases,
            fields,
            body: methods,
            jac: None,
        })
    }

    fn enum_def(&mut self) -> SeedResult<HostStmt> {
        self.bump(); // enum
        let name = self.name("enum name")?;
        self.expect(SeedTok::Lbrace, "'{'")?;
        let mut members = Vec::new();
        while !self.at(SeedTok::Rbrace) {
            let member = self.name("enum member")?;
            let value = if self.eat(SeedTok::Eq) {
                Some(self.expression()?)
            } else {
                None
            };
            members.push((member, value));
            if !self.eat(SeedTok::Comma) {
                break;
            }
        }
        self.expect(SeedTok::Rbrace, "'}'")?;
        Ok(HostStmt::EnumDef {
            name,
            members,
            jac: None,
        })
    }

    fn ability(&mut self, in_class: bool) -> SeedResult<HostStmt> {
        self.bump(); // def / can
        let name = self.name("ability name")?;
        let mut params = self.params()?;
        let returns = if self.eat(SeedTok::Arrow) {
            Some(self.type_text()?)
        } else {
            None
        };
        if in_class && params.first().map(|p| p.name != "self").unwrap_or(true) {
            params.insert(
                0,
                HostParam {
                    name: "self".into(),
                    annotation: None,
                    default: None,
                    star: HostStar::None,
                },
            );
        }
        let body = self.block()?;
        Ok(HostStmt::FuncDef {
            name,
            params,
            body,
            returns,
            jac: None,
        })
    }

    fn params(&mut self) -> SeedResult<Vec<HostParam>> {
        let mut params = Vec::new();
        if !self.eat(SeedTok::Lparen) {
            return Ok(params);
        }
        while !self.at(SeedTok::Rparen) {
            let name = self.name("parameter name")?;
            let annotation = if self.eat(SeedTok::Colon) {
                Some(self.type_text()?)
            } else {
                None
            };
            let default = if self.eat(SeedTok::Eq) {
                Some(self.expression()?)
            } else {
                None
            };
            params.push(HostParam {
                name,
                annotation,
                default,
                star: HostStar::None,
            });
            if !self.eat(SeedTok::Comma) {
                break;
            }
        }
        self.expect(SeedTok::Rparen, "')'")?;
        Ok(params)
    }

    fn impl_def(&mut self, out: &mut Vec<HostStmt>) -> SeedResult<()> {
        self.bump(); // impl
        let mut target = vec![self.name("impl target")?];
        while self.eat(SeedTok::Dot) {
            target.push(self.name("impl target segment")?);
        }

        if self.at(SeedTok::Lparen) || self.at(SeedTok::Arrow) {
            // impl Target.member(sig) { body }
            if target.len() < 2 {
                return Err(self.err("single-method impl needs Target.member"));
            }
            let member = target.pop().unwrap_or_default();
            let mut params = self.params()?;
            let returns = if self.eat(SeedTok::Arrow) {
                Some(self.type_text()?)
            } else {
                None
            };
            if params.first().map(|p| p.name != "self").unwrap_or(true) {
                params.insert(
                    0,
                    HostParam {
                        name: "self".into(),
                        annotation: None,
                        default: None,
                        star: HostStar::None,
                    },
                );
            }
            let body = self.block()?;
            let func_name = format!("_impl_{}_{}", target.join("_"), member);
            out.push(HostStmt::FuncDef {
                name: func_name.clone(),
                params,
                body,
                returns,
                jac: None,
            });
            self.deferred.push((
                target[0].clone(),
                func_name.clone(),
                HostStmt::Assign {
                    targets: vec![attr_path(&target, &member)],
                    value: HostExpr::Name(func_name),
                    jac: None,
                },
            ));
            return Ok(());
        }

        self.expect(SeedTok::Lbrace, "'{' opening impl body")?;
        while !self.at(SeedTok::Rbrace) {
            match self.cur().kind {
                SeedTok::KwDef | SeedTok::KwCan => {
                    self.bump();
                    let member = self.name("method name")?;
                    let mut params = self.params()?;
                    let returns = if self.eat(SeedTok::Arrow) {
                        Some(self.type_text()?)
                    } else {
                        None
                    };
                    if params.first().map(|p| p.name != "self").unwrap_or(true) {
                        params.insert(
                            0,
                            HostParam {
                                name: "self".into(),
                                annotation: None,
                                default: None,
                                star: HostStar::None,
                            },
                        );
                    }
                    let body = self.block()?;
                    let func_name = format!("_impl_{}_{}", target.join("_"), member);
                    out.push(HostStmt::FuncDef {
                        name: func_name.clone(),
                        params,
                        body,
                        returns,
                        jac: None,
                    });
                    self.deferred.push((
                        target[0].clone(),
                        func_name.clone(),
                        HostStmt::Assign {
                            targets: vec![attr_path(&target, &member)],
                            value: HostExpr::Name(func_name),
                            jac: None,
                        },
                    ));
                }
                _ => return Err(self.err("expected a method in impl body")),
            }
        }
        self.expect(SeedTok::Rbrace, "'}'")?;
        Ok(())
    }

    fn glob(&mut self, out: &mut Vec<HostStmt>) -> SeedResult<()> {
        self.bump(); // glob
        loop {
            let name = self.name("global name")?;
            if self.eat(SeedTok::Colon) {
                self.type_text()?;
            }
            if self.eat(SeedTok::Eq) {
                let value = self.expression()?;
                out.push(HostStmt::Assign {
                    targets: vec![HostExpr::Name(name)],
                    value,
                    jac: None,
                });
            }
            if !self.eat(SeedTok::Comma) {
                break;
            }
        }
        self.expect(SeedTok::Semi, "';' after glob")?;
        Ok(())
    }

    fn import(&mut self, out: &mut Vec<HostStmt>) -> SeedResult<()> {
        self.bump(); // import
        if self.eat(SeedTok::KwFrom) {
            let mut module = self.name("module name")?;
            while self.eat(SeedTok::Dot) {
                module.push('.');
                module.push_str(&self.name("module segment")?);
            }
            self.expect(SeedTok::Lbrace, "'{'")?;
            let mut names = Vec::new();
            while !self.at(SeedTok::Rbrace) {
                let imported = self.name("imported name")?;
                let alias = if self.eat(SeedTok::KwAs) {
                    Some(self.name("alias")?)
                } else {
                    None
                };
                names.push((imported, alias));
                if !self.eat(SeedTok::Comma) {
                    break;
                }
            }
            self.expect(SeedTok::Rbrace, "'}'")?;
            self.expect(SeedTok::Semi, "';'")?;
            out.push(HostStmt::ImportFrom {
                module,
                names,
                reexport: false,
                jac: None,
            });
            return Ok(());
        }
        let mut module = self.name("module name")?;
        while self.eat(SeedTok::Dot) {
            module.push('.');
            module.push_str(&self.name("module segment")?);
        }
        let alias = if self.eat(SeedTok::KwAs) {
            Some(self.name("alias")?)
        } else {
            None
        };
        self.expect(SeedTok::Semi, "';'")?;
        out.push(HostStmt::Import {
            module,
            alias,
            jac: None,
        });
        Ok(())
    }

    // -- statements -----------------------------------------------------

    fn block(&mut self) -> SeedResult<Vec<HostStmt>> {
        self.expect(SeedTok::Lbrace, "'{'")?;
        let mut body = Vec::new();
        while !self.at(SeedTok::Rbrace) && !self.at(SeedTok::Eof) {
            body.push(self.statement()?);
        }
        self.expect(SeedTok::Rbrace, "'}'")?;
        Ok(body)
    }

    fn statement(&mut self) -> SeedResult<HostStmt> {
        match self.cur().kind {
            SeedTok::KwIf => self.if_stmt(),
            SeedTok::KwWhile => {
                self.bump();
                let cond = self.expression()?;
                let body = self.block()?;
                Ok(HostStmt::While {
                    cond,
                    body,
                    jac: None,
                })
            }
            SeedTok::KwFor => {
                self.bump();
                let mut targets = vec![HostExpr::Name(self.name("loop target")?)];
                while self.eat(SeedTok::Comma) {
                    targets.push(HostExpr::Name(self.name("loop target")?));
                }
                self.expect(SeedTok::KwIn, "'in'")?;
                let iter = self.expression()?;
                let body = self.block()?;
                let target = if targets.len() == 1 {
                    targets.pop().unwrap_or(HostExpr::None_)
                } else {
                    HostExpr::Tuple(targets)
                };
                Ok(HostStmt::For {
                    target,
                    iter,
                    body,
                    jac: None,
                })
            }
            SeedTok::KwReturn => {
                self.bump();
                let value = if self.at(SeedTok::Semi) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.expect(SeedTok::Semi, "';' after return")?;
                Ok(HostStmt::Return { value, jac: None })
            }
            SeedTok::KwBreak => {
                self.bump();
                self.expect(SeedTok::Semi, "';'")?;
                Ok(HostStmt::Break)
            }
            SeedTok::KwContinue => {
                self.bump();
                self.expect(SeedTok::Semi, "';'")?;
                Ok(HostStmt::Continue)
            }
            SeedTok::KwGlobalOp => {
                self.bump();
                let mut names = vec![self.name("name")?];
                while self.eat(SeedTok::Comma) {
                    names.push(self.name("name")?);
                }
                self.expect(SeedTok::Semi, "';'")?;
                Ok(HostStmt::Global { names })
            }
            _ => self.expr_or_assign(),
        }
    }

    fn if_stmt(&mut self) -> SeedResult<HostStmt> {
        self.bump(); // if / elif
        let cond = self.expression()?;
        let body = self.block()?;
        let orelse = match self.cur().kind {
            SeedTok::KwElif => vec![self.if_stmt()?],
            SeedTok::KwElse => {
                self.bump();
                self.block()?
            }
            _ => Vec::new(),
        };
        Ok(HostStmt::If {
            cond,
            body,
            orelse,
            jac: None,
        })
    }

    fn expr_or_assign(&mut self) -> SeedResult<HostStmt> {
        let first = self.expression()?;
        let stmt = match self.cur().kind {
            SeedTok::Eq => {
                self.bump();
                let value = self.expression()?;
                HostStmt::Assign {
                    targets: vec![first],
                    value,
                    jac: None,
                }
            }
            SeedTok::Colon => {
                // Typed assignment: target : type = value
                self.bump();
                self.type_text()?;
                self.expect(SeedTok::Eq, "'=' after type annotation")?;
                let value = self.expression()?;
                HostStmt::Assign {
                    targets: vec![first],
                    value,
                    jac: None,
                }
            }
            SeedTok::PlusEq | SeedTok::MinusEq | SeedTok::StarEq | SeedTok::SlashEq => {
                let op = match self.bump().kind {
                    SeedTok::PlusEq => HostBinOp::Add,
                    SeedTok::MinusEq => HostBinOp::Sub,
                    SeedTok::StarEq => HostBinOp::Mul,
                    _ => HostBinOp::Div,
                };
                let value = self.expression()?;
                HostStmt::AugAssign {
                    target: first,
                    op,
                    value,
                    jac: None,
                }
            }
            _ => HostStmt::ExprStmt {
                value: first,
                jac: None,
            },
        };
        self.expect(SeedTok::Semi, "';' after statement")?;
        Ok(stmt)
    }

    // -- expressions ----------------------------------------------------

    /// Textual type annotation; generics like `list[int]` flatten to text.
    fn type_text(&mut self) -> SeedResult<String> {
        let mut text = self.name("type name")?;
        while self.eat(SeedTok::Dot) {
            text.push('.');
            text.push_str(&self.name("type segment")?);
        }
        if self.eat(SeedTok::Lsquare) {
            text.push('[');
            text.push_str(&self.type_text()?);
            while self.eat(SeedTok::Comma) {
                text.push_str(", ");
                text.push_str(&self.type_text()?);
            }
            self.expect(SeedTok::Rsquare, "']'")?;
            text.push(']');
        }
        Ok(text)
    }

    fn expression(&mut self) -> SeedResult<HostExpr> {
        // Conditional: value if cond else other
        let value = self.or_expr()?;
        if self.at(SeedTok::KwIf) {
            self.bump();
            let cond = self.or_expr()?;
            if !self.eat(SeedTok::KwElse) {
                return Err(self.err("expected 'else' in conditional expression"));
            }
            let orelse = self.expression()?;
            return Ok(HostExpr::IfExp {
                cond: Box::new(cond),
                body: Box::new(value),
                orelse: Box::new(orelse),
            });
        }
        Ok(value)
    }

    fn or_expr(&mut self) -> SeedResult<HostExpr> {
        let first = self.and_expr()?;
        if !self.at(SeedTok::KwOr) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat(SeedTok::KwOr) {
            values.push(self.and_expr()?);
        }
        Ok(HostExpr::BoolOp {
            op: HostBoolOp::Or,
            values,
        })
    }

    fn and_expr(&mut self) -> SeedResult<HostExpr> {
        let first = self.not_expr()?;
        if !self.at(SeedTok::KwAnd) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat(SeedTok::KwAnd) {
            values.push(self.not_expr()?);
        }
        Ok(HostExpr::BoolOp {
            op: HostBoolOp::And,
            values,
        })
    }

    fn not_expr(&mut self) -> SeedResult<HostExpr> {
        if self.eat(SeedTok::KwNot) {
            let operand = self.not_expr()?;
            return Ok(HostExpr::UnaryOp {
                op: HostUnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> SeedResult<HostExpr> {
        let left = self.bitor()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        loop {
            let op = match self.cur().kind {
                SeedTok::EqEq => HostCmpOp::Eq,
                SeedTok::Neq => HostCmpOp::NotEq,
                SeedTok::Lt => HostCmpOp::Lt,
                SeedTok::Lte => HostCmpOp::LtE,
                SeedTok::Gt => HostCmpOp::Gt,
                SeedTok::Gte => HostCmpOp::GtE,
                SeedTok::KwIn => HostCmpOp::In,
                SeedTok::KwNin => HostCmpOp::NotIn,
                SeedTok::KwIs => HostCmpOp::Is,
                SeedTok::KwIsn => HostCmpOp::IsNot,
                _ => break,
            };
            self.bump();
            ops.push(op);
            comparators.push(self.bitor()?);
        }
        if ops.is_empty() {
            return Ok(left);
        }
        Ok(HostExpr::Compare {
            left: Box::new(left),
            ops,
            comparators,
        })
    }

    fn bitor(&mut self) -> SeedResult<HostExpr> {
        let mut left = self.bitxor()?;
        while self.at(SeedTok::Pipe) {
            self.bump();
            let right = self.bitxor()?;
            left = bin(HostBinOp::BitOr, left, right);
        }
        Ok(left)
    }

    fn bitxor(&mut self) -> SeedResult<HostExpr> {
        let mut left = self.bitand()?;
        while self.at(SeedTok::Caret) {
            self.bump();
            let right = self.bitand()?;
            left = bin(HostBinOp::BitXor, left, right);
        }
        Ok(left)
    }

    fn bitand(&mut self) -> SeedResult<HostExpr> {
        let mut left = self.shift()?;
        while self.at(SeedTok::Amp) {
            self.bump();
            let right = self.shift()?;
            left = bin(HostBinOp::BitAnd, left, right);
        }
        Ok(left)
    }

    fn shift(&mut self) -> SeedResult<HostExpr> {
        let mut left = self.additive()?;
        loop {
            let op = match self.cur().kind {
                SeedTok::Shl => HostBinOp::LShift,
                SeedTok::Shr => HostBinOp::RShift,
                _ => break,
            };
            self.bump();
            let right = self.additive()?;
            left = bin(op, left, right);
        }
        Ok(left)
    }

    fn additive(&mut self) -> SeedResult<HostExpr> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.cur().kind {
                SeedTok::Plus => HostBinOp::Add,
                SeedTok::Minus => HostBinOp::Sub,
                _ => break,
            };
            self.bump();
            let right = self.multiplicative()?;
            left = bin(op, left, right);
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> SeedResult<HostExpr> {
        let mut left = self.unary()?;
        loop {
            let op = match self.cur().kind {
                SeedTok::Star => HostBinOp::Mul,
                SeedTok::Slash => HostBinOp::Div,
                SeedTok::DSlash => HostBinOp::FloorDiv,
                SeedTok::Percent => HostBinOp::Mod,
                _ => break,
            };
            self.bump();
            let right = self.unary()?;
            left = bin(op, left, right);
        }
        Ok(left)
    }

    fn unary(&mut self) -> SeedResult<HostExpr> {
        match self.cur().kind {
            SeedTok::Minus => {
                self.bump();
                let operand = self.unary()?;
                Ok(HostExpr::UnaryOp {
                    op: HostUnaryOp::Neg,
                    operand: Box::new(operand),
                })
            }
            SeedTok::Plus => {
                self.bump();
                self.unary()
            }
            SeedTok::Tilde => {
                self.bump();
                let operand = self.unary()?;
                Ok(HostExpr::UnaryOp {
                    op: HostUnaryOp::Invert,
                    operand: Box::new(operand),
                })
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> SeedResult<HostExpr> {
        let base = self.trailer()?;
        if self.eat(SeedTok::Pow) {
            let exponent = self.unary()?;
            return Ok(bin(HostBinOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn trailer(&mut self) -> SeedResult<HostExpr> {
        let mut expr = self.atom()?;
        loop {
            match self.cur().kind {
                SeedTok::Dot => {
                    self.bump();
                    let attr = self.name("attribute name")?;
                    expr = HostExpr::Attribute {
                        target: Box::new(expr),
                        attr,
                        null_ok: false,
                    };
                }
                SeedTok::Lparen => {
                    self.bump();
                    let mut args = Vec::new();
                    let mut kwargs = Vec::new();
                    while !self.at(SeedTok::Rparen) {
                        if self.at(SeedTok::Name) && self.peek_kind(1) == SeedTok::Eq {
                            let key = self.name("keyword")?;
                            self.bump(); // =
                            kwargs.push((key, self.expression()?));
                        } else {
                            args.push(self.expression()?);
                        }
                        if !self.eat(SeedTok::Comma) {
                            break;
                        }
                    }
                    self.expect(SeedTok::Rparen, "')'")?;
                    expr = HostExpr::Call {
                        func: Box::new(expr),
                        args,
                        kwargs,
                    };
                }
                SeedTok::Lsquare => {
                    self.bump();
                    let index = self.expression()?;
                    self.expect(SeedTok::Rsquare, "']'")?;
                    expr = HostExpr::Subscript {
                        target: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn atom(&mut self) -> SeedResult<HostExpr> {
        match self.cur().kind {
            SeedTok::Int => {
                let tok = self.bump();
                let cleaned: String = tok.value.chars().filter(|c| *c != '_').collect();
                cleaned.parse::<i64>().map(HostExpr::Int).map_err(|_| {
                    SeedError {
                        message: format!("invalid integer '{}'", tok.value),
                        line: tok.line,
                        col: tok.col,
                    }
                })
            }
            SeedTok::Float => {
                let tok = self.bump();
                let cleaned: String = tok.value.chars().filter(|c| *c != '_').collect();
                cleaned.parse::<f64>().map(HostExpr::Float).map_err(|_| {
                    SeedError {
                        message: format!("invalid float '{}'", tok.value),
                        line: tok.line,
                        col: tok.col,
                    }
                })
            }
            SeedTok::Str => {
                let tok = self.bump();
                Ok(HostExpr::Str(unquote(&tok.value)))
            }
            SeedTok::FString => {
                let tok = self.bump();
                self.fstring(&tok)
            }
            SeedTok::Bool => {
                let tok = self.bump();
                Ok(HostExpr::Bool(tok.value == "True"))
            }
            SeedTok::Null => {
                self.bump();
                Ok(HostExpr::None_)
            }
            SeedTok::Name => {
                let tok = self.bump();
                Ok(HostExpr::Name(tok.value))
            }
            SeedTok::Lparen => {
                self.bump();
                if self.at(SeedTok::Rparen) {
                    self.bump();
                    return Ok(HostExpr::Tuple(Vec::new()));
                }
                let first = self.expression()?;
                if self.at(SeedTok::Comma) {
                    let mut items = vec![first];
                    while self.eat(SeedTok::Comma) {
                        if self.at(SeedTok::Rparen) {
                            break;
                        }
                        items.push(self.expression()?);
                    }
                    self.expect(SeedTok::Rparen, "')'")?;
                    return Ok(HostExpr::Tuple(items));
                }
                self.expect(SeedTok::Rparen, "')'")?;
                Ok(first)
            }
            SeedTok::Lsquare => {
                self.bump();
                let mut items = Vec::new();
                while !self.at(SeedTok::Rsquare) {
                    items.push(self.expression()?);
                    if self.at(SeedTok::KwFor) {
                        return Err(
                            self.err("comprehensions are outside the bootstrap subset")
                        );
                    }
                    if !self.eat(SeedTok::Comma) {
                        break;
                    }
                }
                self.expect(SeedTok::Rsquare, "']'")?;
                Ok(HostExpr::List(items))
            }
            SeedTok::Lbrace => {
                self.bump();
                let mut pairs = Vec::new();
                while !self.at(SeedTok::Rbrace) {
                    let key = self.expression()?;
                    if !self.eat(SeedTok::Colon) {
                        return Err(
                            self.err("set literals are outside the bootstrap subset")
                        );
                    }
                    let value = self.expression()?;
                    pairs.push((Some(key), value));
                    if !self.eat(SeedTok::Comma) {
                        break;
                    }
                }
                self.expect(SeedTok::Rbrace, "'}'")?;
                Ok(HostExpr::Dict(pairs))
            }
            _ => Err(self.err(format!("unexpected token '{}'", self.cur().value))),
        }
    }

    /// Re-scan an FSTRING token body into a joined string. Embedded
    /// expressions are parsed with a fresh sub-parser; conversions and
    /// format specs are outside the subset.
    fn fstring(&mut self, tok: &SeedToken) -> SeedResult<HostExpr> {
        let raw = tok.value.trim_start_matches(['f', 'F']);
        let quote = raw.chars().next().unwrap_or('"');
        let triple = raw.len() >= 6 && raw.starts_with(&quote.to_string().repeat(3));
        let strip = if triple { 3 } else { 1 };
        let body = &raw[strip..raw.len().saturating_sub(strip)];

        let mut parts = Vec::new();
        let mut text = String::new();
        let mut chars = body.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    if !text.is_empty() {
                        parts.push(HostExpr::Str(std::mem::take(&mut text)));
                    }
                    let mut depth = 1;
                    let mut inner = String::new();
                    for c in chars.by_ref() {
                        match c {
                            '{' => {
                                depth += 1;
                                inner.push(c);
                            }
                            '}' => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                                inner.push(c);
                            }
                            _ => inner.push(c),
                        }
                    }
                    if depth != 0 {
                        return Err(SeedError {
                            message: "unbalanced braces in f-string".into(),
                            line: tok.line,
                            col: tok.col,
                        });
                    }
                    let inner_tokens = SeedLexer::new(&inner).tokenize()?;
                    let mut sub = SeedParser::new(inner_tokens, String::new());
                    let value = sub.expression()?;
                    parts.push(HostExpr::FormattedValue {
                        value: Box::new(value),
                        conversion: None,
                        format_spec: None,
                    });
                }
                '\\' => {
                    if let Some(next) = chars.next() {
                        match next {
                            'n' => text.push('\n'),
                            't' => text.push('\t'),
                            '\\' => text.push('\\'),
                            '"' => text.push('"'),
                            '\'' => text.push('\''),
                            other => {
                                text.push('\\');
                                text.push(other);
                            }
                        }
                    }
                }
                _ => text.push(c),
            }
        }
        if !text.is_empty() {
            parts.push(HostExpr::Str(text));
        }
        Ok(HostExpr::JoinedStr(parts))
    }
}

fn bin(op: HostBinOp, left: HostExpr, right: HostExpr) -> HostExpr {
    HostExpr::BinOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn attr_path(container: &[String], member: &str) -> HostExpr {
    let mut expr = HostExpr::Name(container[0].clone());
    for segment in &container[1..] {
        expr = HostExpr::Attribute {
            target: Box::new(expr),
            attr: segment.clone(),
            null_ok: false,
        };
    }
    HostExpr::Attribute {
        target: Box::new(expr),
        attr: member.to_string(),
        null_ok: false,
    }
}

/// Strip quotes and process escapes from a raw string token.
fn unquote(raw: &str) -> String {
    let rest = raw.trim_start_matches(['r', 'R', 'b', 'B', 'f', 'F']);
    let quote = rest.chars().next().unwrap_or('"');
    let triple = rest.len() >= 6 && rest.starts_with(&quote.to_string().repeat(3));
    let strip = if triple { 3 } else { 1 };
    let body = &rest[strip..rest.len().saturating_sub(strip)];
    crate::parser::unescape_text(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<SeedTok> {
        SeedLexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| *k != SeedTok::Eof)
            .collect()
    }

    fn exec(source: &str) -> HashMap<String, Value> {
        seed_exec(source, "<test>", None).unwrap()
    }

    fn int_of(ns: &HashMap<String, Value>, name: &str) -> i64 {
        match &ns[name] {
            Value::Int(n) => *n,
            other => panic!("{} is {:?}", name, other),
        }
    }

    #[test]
    fn lexes_basic_tokens() {
        assert_eq!(
            kinds("obj Foo { }"),
            vec![SeedTok::KwObj, SeedTok::Name, SeedTok::Lbrace, SeedTok::Rbrace]
        );
    }

    #[test]
    fn lexes_operators() {
        assert_eq!(
            kinds("+ - * / == != <= >= -> //"),
            vec![
                SeedTok::Plus,
                SeedTok::Minus,
                SeedTok::Star,
                SeedTok::Slash,
                SeedTok::EqEq,
                SeedTok::Neq,
                SeedTok::Lte,
                SeedTok::Gte,
                SeedTok::Arrow,
                SeedTok::DSlash
            ]
        );
    }

    #[test]
    fn lexes_fstring_as_one_token() {
        let toks = SeedLexer::new("f\"hello {name}\"").tokenize().unwrap();
        assert_eq!(toks[0].kind, SeedTok::FString);
    }

    #[test]
    fn glob_and_function() {
        let ns = exec("glob x: int = 42;\ndef add(a: int, b: int) -> int { return a + b; }\nglob y = add(x, 8);");
        assert_eq!(int_of(&ns, "x"), 42);
        assert_eq!(int_of(&ns, "y"), 50);
    }

    #[test]
    fn default_params() {
        let ns = exec("def inc(n: int, by: int = 1) -> int { return n + by; }\nglob a = inc(4);\nglob b = inc(4, 3);");
        assert_eq!(int_of(&ns, "a"), 5);
        assert_eq!(int_of(&ns, "b"), 7);
    }

    #[test]
    fn obj_with_fields_and_methods() {
        let ns = exec(
            "obj Counter {\n    has count: int = 0;\n    def bump(amount: int = 1) -> int {\n        self.count += amount;\n        return self.count;\n    }\n}\nglob c = Counter();\nglob r1 = c.bump();\nglob r2 = c.bump(4);",
        );
        assert_eq!(int_of(&ns, "r1"), 1);
        assert_eq!(int_of(&ns, "r2"), 5);
    }

    #[test]
    fn mutable_default_fresh_per_instance() {
        let ns = exec(
            "obj Box { has items: list = []; }\nglob a = Box();\nglob b = Box();\nglob _r = a.items.append(1);\nglob alen = len(a.items);\nglob blen = len(b.items);",
        );
        assert_eq!(int_of(&ns, "alen"), 1);
        assert_eq!(int_of(&ns, "blen"), 0);
    }

    #[test]
    fn inheritance() {
        let ns = exec(
            "obj Base { has x: int = 1; def get_x() -> int { return self.x; } }\nobj Child(Base) { has y: int = 2; }\nglob c = Child();\nglob r = c.get_x() + c.y;",
        );
        assert_eq!(int_of(&ns, "r"), 3);
    }

    #[test]
    fn impl_block_and_single_method() {
        let ns = exec(
            "obj Foo { has x: int = 0; }\nimpl Foo { def get() -> int { return self.x; } }\nimpl Foo.double() -> int { return self.x * 2; }\nglob f = Foo(x=7);\nglob a = f.get();\nglob b = f.double();",
        );
        assert_eq!(int_of(&ns, "a"), 7);
        assert_eq!(int_of(&ns, "b"), 14);
    }

    #[test]
    fn impl_before_obj_binds() {
        let ns = exec(
            "impl Foo { def get() -> int { return self.x; } }\nobj Foo { has x: int = 0; }\nglob r = Foo(x=7).get();",
        );
        assert_eq!(int_of(&ns, "r"), 7);
    }

    #[test]
    fn enums() {
        let ns = exec("enum Color { RED = 1, GREEN = 2 }\nglob r = Color.GREEN;");
        assert_eq!(int_of(&ns, "r"), 2);
    }

    #[test]
    fn control_flow() {
        let ns = exec(
            "def collatz_steps(n: int) -> int {\n    steps = 0;\n    while n != 1 {\n        if n % 2 == 0 { n = n // 2; }\n        else { n = 3 * n + 1; }\n        steps += 1;\n    }\n    return steps;\n}\nglob r = collatz_steps(6);",
        );
        assert_eq!(int_of(&ns, "r"), 8);
    }

    #[test]
    fn for_loop_with_tuple_unpack() {
        let ns = exec(
            "glob total = 0;\ndef run() {\n    global total;\n    for k, v in [(1, 10), (2, 20)] {\n        total += k + v;\n    }\n}\nglob _x = run();",
        );
        assert_eq!(int_of(&ns, "total"), 33);
    }

    #[test]
    fn break_and_continue() {
        let ns = exec(
            "def f() -> int {\n    total = 0;\n    for i in [1, 2, 3, 4, 5] {\n        if i == 2 { continue; }\n        if i == 5 { break; }\n        total += i;\n    }\n    return total;\n}\nglob r = f();",
        );
        assert_eq!(int_of(&ns, "r"), 8);
    }

    #[test]
    fn fstring_with_expression() {
        let ns = exec("glob name = \"jac\";\nglob msg = f\"hello {name}!\";");
        match &ns["msg"] {
            Value::Str(s) => assert_eq!(s.as_str(), "hello jac!"),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn fstring_nested_braces() {
        let ns = exec("def msg(n: int) -> str { return f\"[{ {'k': n}['k'] }]\"; }\nglob r = msg(3);");
        match &ns["r"] {
            Value::Str(s) => assert_eq!(s.as_str(), "[3]"),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn ternary_and_membership() {
        let ns = exec(
            "glob a = 1 if 3 in [1, 2, 3] else 0;\nglob b = 1 if 9 not in [1, 2] else 0;",
        );
        assert_eq!(int_of(&ns, "a"), 1);
        assert_eq!(int_of(&ns, "b"), 1);
    }

    #[test]
    fn dict_and_subscript() {
        let ns = exec("glob d = {\"a\": 1, \"b\": 2};\nglob r = d[\"b\"];");
        assert_eq!(int_of(&ns, "r"), 2);
    }

    #[test]
    fn triple_quoted_string() {
        let ns = exec("glob s = \"\"\"line1\nline2\"\"\";");
        match &ns["s"] {
            Value::Str(s) => assert!(s.contains('\n')),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn recursion_factorial() {
        let ns = exec(
            "def fact(n: int) -> int { if n <= 1 { return 1; } return n * fact(n - 1); }\nglob r = fact(5);",
        );
        assert_eq!(int_of(&ns, "r"), 120);
    }

    #[test]
    fn out_of_subset_fails_loudly() {
        // try/except is not part of the bootstrap subset.
        assert!(seed_compile("try { x = 1; } except { }", "<t>").is_err());
        // Comprehensions are rejected, never miscompiled.
        assert!(seed_compile("glob xs = [x for x in ys];", "<t>").is_err());
        // Set literals are rejected.
        assert!(seed_compile("glob s = {1, 2};", "<t>").is_err());
        // Walrus is not in the subset grammar at all.
        assert!(seed_compile("glob x = (n := 1);", "<t>").is_err());
    }

    #[test]
    fn syntax_error_is_positioned() {
        let err = seed_compile("def f( {", "<t>").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.col > 1);
    }

    #[test]
    fn seeded_globals_are_visible() {
        let mut seeded = HashMap::new();
        seeded.insert("base".to_string(), Value::Int(40));
        let ns = seed_exec("glob r = base + 2;", "<t>", Some(seeded)).unwrap();
        assert_eq!(int_of(&ns, "r"), 42);
    }
}
