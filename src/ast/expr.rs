//! Expression variants of the unified tree.

use super::{FuncSignature, Ident};
use crate::source::Span;
use crate::token::TokenKind;

pub enum Expr {
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Bool(BoolExpr),
    Compare(CompareExpr),
    IfElse(IfElseExpr),
    Lambda(LambdaExpr),
    Walrus(WalrusExpr),
    FuncCall(FuncCall),
    AtomTrailer(AtomTrailer),
    IndexSlice(IndexSlice),
    Tuple(TupleVal),
    List(ListVal),
    Dict(DictVal),
    FString(FString),
    MultiString(MultiString),
    Name(Ident),
    Int(IntLit),
    Float(FloatLit),
    String(StringLit),
    Bool_(BoolLit),
    Null(NullLit),
    Ellipsis(EllipsisLit),
    SpecialVar(SpecialVarRef),
    BuiltinType(BuiltinTypeAtom),
    AtomUnit(AtomUnit),
    Await(AwaitExpr),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Binary(n) => n.span,
            Expr::Unary(n) => n.span,
            Expr::Bool(n) => n.span,
            Expr::Compare(n) => n.span,
            Expr::IfElse(n) => n.span,
            Expr::Lambda(n) => n.span,
            Expr::Walrus(n) => n.span,
            Expr::FuncCall(n) => n.span,
            Expr::AtomTrailer(n) => n.span,
            Expr::IndexSlice(n) => n.span,
            Expr::Tuple(n) => n.span,
            Expr::List(n) => n.span,
            Expr::Dict(n) => n.span,
            Expr::FString(n) => n.span,
            Expr::MultiString(n) => n.span,
            Expr::Name(n) => n.span,
            Expr::Int(n) => n.span,
            Expr::Float(n) => n.span,
            Expr::String(n) => n.span,
            Expr::Bool_(n) => n.span,
            Expr::Null(n) => n.span,
            Expr::Ellipsis(n) => n.span,
            Expr::SpecialVar(n) => n.span,
            Expr::BuiltinType(n) => n.span,
            Expr::AtomUnit(n) => n.span,
            Expr::Await(n) => n.span,
        }
    }
}

pub struct BinaryExpr {
    pub span: Span,
    pub op: TokenKind,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

pub struct UnaryExpr {
    pub span: Span,
    pub op: TokenKind,
    pub operand: Box<Expr>,
}

/// `a and b and c` / `a or b` collected flat.
pub struct BoolExpr {
    pub span: Span,
    pub op: TokenKind,
    pub values: Vec<Expr>,
}

/// N-ary chained comparison: `(left, [ops], [rights])`.
pub struct CompareExpr {
    pub span: Span,
    pub left: Box<Expr>,
    pub ops: Vec<TokenKind>,
    pub rights: Vec<Expr>,
}

/// `a if cond else b`
pub struct IfElseExpr {
    pub span: Span,
    pub value: Box<Expr>,
    pub cond: Box<Expr>,
    pub else_value: Box<Expr>,
}

pub struct LambdaExpr {
    pub span: Span,
    pub signature: FuncSignature,
    pub body: Box<Expr>,
}

/// `(n := expr)`; only valid inside parentheses, which the parser enforces.
pub struct WalrusExpr {
    pub span: Span,
    pub target: Ident,
    pub value: Box<Expr>,
}

pub struct FuncCall {
    pub span: Span,
    pub target: Box<Expr>,
    pub args: Vec<Expr>,
    pub kwargs: Vec<KwPair>,
}

/// `name=value` in a call.
pub struct KwPair {
    pub span: Span,
    pub key: Ident,
    pub value: Expr,
}

/// Attribute access, `x.attr` or `x?.attr`.
pub struct AtomTrailer {
    pub span: Span,
    pub target: Box<Expr>,
    pub attr: Ident,
    pub null_ok: bool,
}

/// Subscript `x[i]` or slice `x[a:b:c]`.
pub struct IndexSlice {
    pub span: Span,
    pub target: Box<Expr>,
    pub start: Option<Box<Expr>>,
    pub stop: Option<Box<Expr>>,
    pub step: Option<Box<Expr>>,
    pub is_range: bool,
}

pub struct TupleVal {
    pub span: Span,
    pub items: Vec<Expr>,
}

pub struct ListVal {
    pub span: Span,
    pub items: Vec<Expr>,
}

pub struct DictVal {
    pub span: Span,
    pub pairs: Vec<KvPair>,
}

/// `key: value`; a `None` key is a `**spread` entry.
pub struct KvPair {
    pub span: Span,
    pub key: Option<Expr>,
    pub value: Expr,
}

pub struct FString {
    pub span: Span,
    pub parts: Vec<FStringPart>,
    pub raw: bool,
    pub triple: bool,
}

pub enum FStringPart {
    /// Literal fragment, unescaped. Escaped braces arrive here as `{`/`}`.
    Text(StringLit),
    Expr(FormattedValue),
}

pub struct FormattedValue {
    pub span: Span,
    pub value: Box<Expr>,
    pub conversion: Option<char>,
    pub format_spec: Option<String>,
}

/// Adjacent string/f-string literals concatenated at parse level.
pub struct MultiString {
    pub span: Span,
    pub strings: Vec<Expr>,
}

pub struct IntLit {
    pub span: Span,
    pub value: i64,
    pub text: String,
}

pub struct FloatLit {
    pub span: Span,
    pub value: f64,
    pub text: String,
}

pub struct StringLit {
    pub span: Span,
    /// Unescaped value.
    pub value: String,
    /// Raw token text including quotes/prefixes.
    pub text: String,
}

pub struct BoolLit {
    pub span: Span,
    pub value: bool,
}

pub struct NullLit {
    pub span: Span,
}

pub struct EllipsisLit {
    pub span: Span,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SpecialVar {
    SelfRef,
    Super,
    Init,
    PostInit,
    Root,
    Here,
}

impl SpecialVar {
    pub fn as_str(self) -> &'static str {
        match self {
            SpecialVar::SelfRef => "self",
            SpecialVar::Super => "super",
            SpecialVar::Init => "init",
            SpecialVar::PostInit => "postinit",
            SpecialVar::Root => "root",
            SpecialVar::Here => "here",
        }
    }
}

pub struct SpecialVarRef {
    pub span: Span,
    pub var: SpecialVar,
}

/// `str`, `int`, `list`… used as an expression atom.
pub struct BuiltinTypeAtom {
    pub span: Span,
    pub kind: TokenKind,
    pub name: String,
}

/// A parenthesized expression; the region where walrus is legal.
pub struct AtomUnit {
    pub span: Span,
    pub value: Box<Expr>,
}

pub struct AwaitExpr {
    pub span: Span,
    pub value: Box<Expr>,
}
