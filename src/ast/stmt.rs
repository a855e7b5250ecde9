//! Statement variants of the unified tree.

use super::{Expr, Ident, NodeId};
use crate::source::Span;
use crate::token::TokenKind;

pub enum Stmt {
    If(IfStmt),
    While(WhileStmt),
    ForIn(ForInStmt),
    ForTo(ForToStmt),
    Try(TryStmt),
    With(WithStmt),
    Raise(RaiseStmt),
    Assert(AssertStmt),
    Delete(DeleteStmt),
    Return(ReturnStmt),
    Yield(YieldStmt),
    Ctrl(CtrlStmt),
    Match(MatchStmt),
    GlobalRef(GlobalRefStmt),
    Assignment(Assignment),
    Expr(ExprStmt),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::If(n) => n.span,
            Stmt::While(n) => n.span,
            Stmt::ForIn(n) => n.span,
            Stmt::ForTo(n) => n.span,
            Stmt::Try(n) => n.span,
            Stmt::With(n) => n.span,
            Stmt::Raise(n) => n.span,
            Stmt::Assert(n) => n.span,
            Stmt::Delete(n) => n.span,
            Stmt::Return(n) => n.span,
            Stmt::Yield(n) => n.span,
            Stmt::Ctrl(n) => n.span,
            Stmt::Match(n) => n.span,
            Stmt::GlobalRef(n) => n.span,
            Stmt::Assignment(n) => n.span,
            Stmt::Expr(n) => n.span,
        }
    }
}

pub struct IfStmt {
    pub span: Span,
    pub cond: Expr,
    pub body: Vec<Stmt>,
    pub else_body: Option<ElseBranch>,
}

pub enum ElseBranch {
    Elif(Box<IfStmt>),
    Else(Vec<Stmt>),
}

pub struct WhileStmt {
    pub span: Span,
    pub cond: Expr,
    pub body: Vec<Stmt>,
}

/// `for target in iter { … }`
pub struct ForInStmt {
    pub span: Span,
    pub target: Expr,
    pub iter: Expr,
    pub body: Vec<Stmt>,
    pub is_async: bool,
}

/// `for i = 0 to i < 10 by i += 1 { … }`
pub struct ForToStmt {
    pub span: Span,
    pub init: Box<Stmt>,
    pub cond: Expr,
    pub step: Box<Stmt>,
    pub body: Vec<Stmt>,
}

pub struct TryStmt {
    pub span: Span,
    pub body: Vec<Stmt>,
    pub excepts: Vec<ExceptClause>,
    pub finally: Option<Vec<Stmt>>,
}

pub struct ExceptClause {
    pub span: Span,
    pub ty: Option<Expr>,
    pub alias: Option<Ident>,
    pub body: Vec<Stmt>,
}

pub struct WithStmt {
    pub span: Span,
    pub items: Vec<WithItem>,
    pub body: Vec<Stmt>,
}

pub struct WithItem {
    pub span: Span,
    pub expr: Expr,
    pub alias: Option<Ident>,
}

pub struct RaiseStmt {
    pub span: Span,
    pub exc: Option<Expr>,
    pub from: Option<Expr>,
}

pub struct AssertStmt {
    pub span: Span,
    pub cond: Expr,
    pub msg: Option<Expr>,
}

pub struct DeleteStmt {
    pub span: Span,
    pub target: Expr,
}

pub struct ReturnStmt {
    pub span: Span,
    pub value: Option<Expr>,
}

pub struct YieldStmt {
    pub span: Span,
    pub value: Option<Expr>,
    pub is_from: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CtrlKind {
    Break,
    Continue,
    /// Walker-loop `skip`; maps to `continue` in generated code.
    Skip,
}

pub struct CtrlStmt {
    pub span: Span,
    pub kind: CtrlKind,
}

pub struct MatchStmt {
    pub span: Span,
    pub subject: Expr,
    pub cases: Vec<MatchCase>,
}

pub struct MatchCase {
    pub span: Span,
    pub pattern: Pattern,
    pub guard: Option<Expr>,
    pub body: Vec<Stmt>,
}

pub enum Pattern {
    Literal(Expr),
    Capture(Ident),
    Wildcard(Span),
    Sequence(Span, Vec<Pattern>),
    Or(Span, Vec<Pattern>),
}

impl Pattern {
    pub fn span(&self) -> Span {
        match self {
            Pattern::Literal(e) => e.span(),
            Pattern::Capture(i) => i.span,
            Pattern::Wildcard(s) => *s,
            Pattern::Sequence(s, _) => *s,
            Pattern::Or(s, _) => *s,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GlobalRefKind {
    Global,
    Nonlocal,
}

/// `global a, b;` / `nonlocal x;`
pub struct GlobalRefStmt {
    pub span: Span,
    pub kind: GlobalRefKind,
    pub names: Vec<Ident>,
}

/// Plain, typed, and augmented assignment in one node. An augmented
/// assignment has exactly one target and `aug_op` set to the operator kind.
pub struct Assignment {
    pub span: Span,
    pub id: NodeId,
    pub targets: Vec<Expr>,
    pub ty: Option<Expr>,
    pub value: Option<Expr>,
    pub aug_op: Option<TokenKind>,
}

pub struct ExprStmt {
    pub span: Span,
    pub expr: Expr,
}
