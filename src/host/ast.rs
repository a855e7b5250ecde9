//! The host-language AST the code generator targets.
//!
//! This is the stable contract between the compiler layers: the seed
//! compiler emits it directly, the full pipeline lowers the unified tree
//! into it, and the interpreter executes it. Everything is serde-serialized
//! into the bytecode artifact, so additions must stay backward compatible
//! behind the code-object version.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HostModule {
    pub name: String,
    pub doc: Option<String>,
    pub body: Vec<HostStmt>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum HostBinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitAnd,
    BitOr,
    BitXor,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum HostUnaryOp {
    Neg,
    Pos,
    Not,
    Invert,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum HostBoolOp {
    And,
    Or,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum HostCmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum HostStar {
    #[default]
    None,
    Args,
    Kwargs,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HostParam {
    pub name: String,
    pub annotation: Option<String>,
    pub default: Option<HostExpr>,
    pub star: HostStar,
}

/// A class field descriptor. `per_instance` defaults are re-evaluated at
/// construction so each instance gets a fresh container value.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HostField {
    pub name: String,
    pub annotation: Option<String>,
    pub default: Option<HostExpr>,
    pub per_instance: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HostHandler {
    pub ty: Option<HostExpr>,
    pub name: Option<String>,
    pub body: Vec<HostStmt>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HostCase {
    pub pattern: HostPattern,
    pub guard: Option<HostExpr>,
    pub body: Vec<HostStmt>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum HostPattern {
    Literal(HostExpr),
    Capture(String),
    Wildcard,
    Sequence(Vec<HostPattern>),
    Or(Vec<HostPattern>),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum HostStmt {
    ClassDef {
        name: String,
        bases: Vec<String>,
        fields: Vec<HostField>,
        body: Vec<HostStmt>,
        jac: Option<u32>,
    },
    EnumDef {
        name: String,
        members: Vec<(String, Option<HostExpr>)>,
        jac: Option<u32>,
    },
    FuncDef {
        name: String,
        params: Vec<HostParam>,
        body: Vec<HostStmt>,
        returns: Option<String>,
        jac: Option<u32>,
    },
    Assign {
        targets: Vec<HostExpr>,
        value: HostExpr,
        jac: Option<u32>,
    },
    AugAssign {
        target: HostExpr,
        op: HostBinOp,
        value: HostExpr,
        jac: Option<u32>,
    },
    ExprStmt {
        value: HostExpr,
        jac: Option<u32>,
    },
    If {
        cond: HostExpr,
        body: Vec<HostStmt>,
        orelse: Vec<HostStmt>,
        jac: Option<u32>,
    },
    While {
        cond: HostExpr,
        body: Vec<HostStmt>,
        jac: Option<u32>,
    },
    For {
        target: HostExpr,
        iter: HostExpr,
        body: Vec<HostStmt>,
        jac: Option<u32>,
    },
    Return {
        value: Option<HostExpr>,
        jac: Option<u32>,
    },
    Yield {
        value: Option<HostExpr>,
        is_from: bool,
        jac: Option<u32>,
    },
    Break,
    Continue,
    Try {
        body: Vec<HostStmt>,
        handlers: Vec<HostHandler>,
        finalbody: Vec<HostStmt>,
        jac: Option<u32>,
    },
    Raise {
        exc: Option<HostExpr>,
        jac: Option<u32>,
    },
    Assert {
        cond: HostExpr,
        msg: Option<HostExpr>,
        jac: Option<u32>,
    },
    Delete {
        target: HostExpr,
        jac: Option<u32>,
    },
    Global {
        names: Vec<String>,
    },
    Import {
        module: String,
        alias: Option<String>,
        jac: Option<u32>,
    },
    ImportFrom {
        module: String,
        names: Vec<(String, Option<String>)>,
        /// `include` re-exports every name at the importer's scope.
        reexport: bool,
        jac: Option<u32>,
    },
    With {
        items: Vec<(HostExpr, Option<String>)>,
        body: Vec<HostStmt>,
        jac: Option<u32>,
    },
    Match {
        subject: HostExpr,
        cases: Vec<HostCase>,
        jac: Option<u32>,
    },
    Pass,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum HostExpr {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None_,
    Ellipsis,
    Name(String),
    Attribute {
        target: Box<HostExpr>,
        attr: String,
        null_ok: bool,
    },
    Subscript {
        target: Box<HostExpr>,
        index: Box<HostExpr>,
    },
    Slice {
        start: Option<Box<HostExpr>>,
        stop: Option<Box<HostExpr>>,
        step: Option<Box<HostExpr>>,
    },
    Call {
        func: Box<HostExpr>,
        args: Vec<HostExpr>,
        kwargs: Vec<(String, HostExpr)>,
    },
    BinOp {
        op: HostBinOp,
        left: Box<HostExpr>,
        right: Box<HostExpr>,
    },
    UnaryOp {
        op: HostUnaryOp,
        operand: Box<HostExpr>,
    },
    BoolOp {
        op: HostBoolOp,
        values: Vec<HostExpr>,
    },
    Compare {
        left: Box<HostExpr>,
        ops: Vec<HostCmpOp>,
        comparators: Vec<HostExpr>,
    },
    IfExp {
        cond: Box<HostExpr>,
        body: Box<HostExpr>,
        orelse: Box<HostExpr>,
    },
    Lambda {
        params: Vec<HostParam>,
        body: Box<HostExpr>,
    },
    List(Vec<HostExpr>),
    Tuple(Vec<HostExpr>),
    Dict(Vec<(Option<HostExpr>, HostExpr)>),
    /// F-string: literal `Str` pieces and `FormattedValue`s joined in order.
    JoinedStr(Vec<HostExpr>),
    FormattedValue {
        value: Box<HostExpr>,
        conversion: Option<char>,
        format_spec: Option<String>,
    },
    /// Assignment expression `(n := v)`.
    NamedExpr {
        target: String,
        value: Box<HostExpr>,
    },
}

impl HostExpr {
    /// True for the literal forms whose defaults must be wrapped so each
    /// instance receives a fresh value.
    pub fn is_mutable_literal(&self) -> bool {
        matches!(self, HostExpr::List(_) | HostExpr::Dict(_))
    }
}
