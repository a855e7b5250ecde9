//! The unified tree: every construct the parser (or a foreign front-end)
//! produces, as closed sums.
//!
//! Nodes own their children. Back-references that must outlive a traversal
//! (symbol to declaring node) go through [`NodeId`], never through pointers.
//! Semantic fields (`sym`, `ty`) start empty and are filled by passes.

mod expr;
mod stmt;

pub use expr::*;
pub use stmt::*;

use crate::source::{SourceId, Span};
use crate::symtab::{SymbolId, SymbolTable};
use crate::token::{Comment, Token};

/// Identity of a declaration-bearing node within its module.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(pub u32);

/// Monotonic id allocator, one per parse.
#[derive(Default)]
pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    pub fn new() -> Self {
        NodeIdGen::default()
    }

    pub fn next(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

/// Computed type information attached by the type-check schedule.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TypeInfo {
    pub name: String,
}

/// Access tag on declarations (`:pub`, `:priv`, `:protect`).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AccessTag {
    Pub,
    Priv,
    Protect,
}

/// Code-context tag observed by semantic passes; whole files get coerced via
/// the `.cl.jac` / `.sv.jac` / `.na.jac` extensions.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum CodeContext {
    #[default]
    Default,
    Client,
    Server,
    Native,
}

/// An identifier occurrence. `sym` is the non-owning back-edge filled by
/// semantic analysis.
#[derive(Clone, Debug)]
pub struct Ident {
    pub value: String,
    pub span: Span,
    pub is_kwesc: bool,
    pub sym: Option<SymbolId>,
}

impl Ident {
    pub fn new(value: impl Into<String>, span: Span) -> Self {
        Ident {
            value: value.into(),
            span,
            is_kwesc: false,
            sym: None,
        }
    }
}

/// Generated artifacts attached to a module by the codegen schedule.
#[derive(Default)]
pub struct Gen {
    pub host_ast: Option<crate::host::ast::HostModule>,
    pub bytecode: Option<Vec<u8>>,
    pub es_ast: Option<serde_json::Value>,
    /// Unified-node id -> indices of host statements generated from it.
    pub host_links: std::collections::HashMap<NodeId, Vec<usize>>,
    pub doc_ir: Option<Vec<crate::passes::format::Doc>>,
    pub formatted: Option<String>,
}

/// A whole parsed module.
pub struct Module {
    pub id: NodeId,
    pub name: String,
    pub span: Span,
    pub src: SourceId,
    pub doc: Option<StringLit>,
    pub body: Vec<ElementStmt>,
    pub has_syntax_errors: bool,
    pub stub_only: bool,
    pub code_context: CodeContext,
    /// Every terminal token in source order (round-trip and formatting).
    pub terminals: Vec<Token>,
    pub comments: Vec<Comment>,
    /// Sources of annexed sibling impl files merged into `body`.
    pub annexed: Vec<SourceId>,
    pub sym_tab: Option<SymbolTable>,
    pub gen: Gen,
}

impl Module {
    /// An empty stand-in module, used when parsing fails wholesale or a
    /// pass is cancelled.
    pub fn stub(name: impl Into<String>, src: SourceId) -> Self {
        Module {
            id: NodeId(0),
            name: name.into(),
            span: Span::new(src, 0, 0),
            src,
            doc: None,
            body: Vec::new(),
            has_syntax_errors: false,
            stub_only: true,
            code_context: CodeContext::Default,
            terminals: Vec::new(),
            comments: Vec::new(),
            annexed: Vec::new(),
            sym_tab: None,
            gen: Gen::default(),
        }
    }
}

/// Top-level statements a module body may hold.
pub enum ElementStmt {
    Import(Import),
    Archetype(Archetype),
    Enum(EnumDef),
    Ability(Ability),
    Impl(ImplDef),
    GlobalVars(GlobalVars),
    Sem(SemDef),
    Test(TestBlock),
    ModuleCode(ModuleCode),
    Stmt(Stmt),
}

impl ElementStmt {
    pub fn span(&self) -> Span {
        match self {
            ElementStmt::Import(n) => n.span,
            ElementStmt::Archetype(n) => n.span,
            ElementStmt::Enum(n) => n.span,
            ElementStmt::Ability(n) => n.span,
            ElementStmt::Impl(n) => n.span,
            ElementStmt::GlobalVars(n) => n.span,
            ElementStmt::Sem(n) => n.span,
            ElementStmt::Test(n) => n.span,
            ElementStmt::ModuleCode(n) => n.span,
            ElementStmt::Stmt(n) => n.span(),
        }
    }
}

/// `import M;` / `import M as x;` / `import from M { a, b as c };` /
/// `include M;`
pub struct Import {
    pub id: NodeId,
    pub span: Span,
    pub from_path: Option<ModulePath>,
    pub paths: Vec<ModulePath>,
    pub items: Vec<ModuleItem>,
    pub is_include: bool,
}

/// A dotted module reference with an optional leading-dot count.
#[derive(Clone, Debug)]
pub struct ModulePath {
    pub span: Span,
    pub dots: u16,
    pub segments: Vec<Ident>,
    pub alias: Option<Ident>,
}

impl ModulePath {
    pub fn dotted(&self) -> String {
        let mut s = ".".repeat(self.dots as usize);
        s.push_str(
            &self
                .segments
                .iter()
                .map(|i| i.value.as_str())
                .collect::<Vec<_>>()
                .join("."),
        );
        s
    }
}

/// One imported name inside `import from M { … }`.
#[derive(Clone, Debug)]
pub struct ModuleItem {
    pub span: Span,
    pub name: Ident,
    pub alias: Option<Ident>,
}

/// Archetype discriminator.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ArchKind {
    Obj,
    Class,
    Node,
    Edge,
    Walker,
}

impl ArchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArchKind::Obj => "obj",
            ArchKind::Class => "class",
            ArchKind::Node => "node",
            ArchKind::Edge => "edge",
            ArchKind::Walker => "walker",
        }
    }
}

/// A class-like declaration.
pub struct Archetype {
    pub id: NodeId,
    pub span: Span,
    pub kind: ArchKind,
    pub name: Ident,
    pub access: Option<AccessTag>,
    pub is_async: bool,
    pub is_abstract: bool,
    pub bases: Vec<Expr>,
    pub decorators: Vec<Expr>,
    pub doc: Option<StringLit>,
    /// None for a forward declaration (`obj Foo;`).
    pub body: Option<Vec<ArchItem>>,
    pub semstr: Option<String>,
}

/// Members inside an archetype body.
pub enum ArchItem {
    Has(ArchHas),
    Ability(Ability),
    Nested(Archetype),
}

impl ArchItem {
    pub fn span(&self) -> Span {
        match self {
            ArchItem::Has(n) => n.span,
            ArchItem::Ability(n) => n.span,
            ArchItem::Nested(n) => n.span,
        }
    }
}

/// One `has` statement (possibly several variables).
pub struct ArchHas {
    pub id: NodeId,
    pub span: Span,
    pub is_static: bool,
    pub access: Option<AccessTag>,
    pub vars: Vec<HasVar>,
}

/// A single field inside a `has` statement.
pub struct HasVar {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub ty: Expr,
    pub value: Option<Expr>,
    pub computed_ty: Option<TypeInfo>,
}

/// A function or method, `def` or `can`.
pub struct Ability {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub is_def: bool,
    pub is_async: bool,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_override: bool,
    pub access: Option<AccessTag>,
    pub decorators: Vec<Expr>,
    pub signature: FuncSignature,
    pub doc: Option<StringLit>,
    /// None for a declaration without body (`def f() -> int;`).
    pub body: Option<Vec<Stmt>>,
    pub semstr: Option<String>,
}

/// Parameter list plus return annotation.
#[derive(Default)]
pub struct FuncSignature {
    pub span: Span,
    pub params: Vec<ParamVar>,
    pub return_ty: Option<Box<Expr>>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ParamStar {
    #[default]
    None,
    Args,
    Kwargs,
}

pub struct ParamVar {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub ty: Option<Expr>,
    pub default: Option<Expr>,
    pub star: ParamStar,
    pub computed_ty: Option<TypeInfo>,
}

/// `enum Name { A, B = 2 }`
pub struct EnumDef {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub access: Option<AccessTag>,
    pub bases: Vec<Expr>,
    pub doc: Option<StringLit>,
    pub members: Vec<EnumMember>,
    pub semstr: Option<String>,
}

pub struct EnumMember {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub value: Option<Expr>,
}

/// Which grammatical form an `impl` took.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ImplKind {
    /// `impl Target { members… }`
    Obj,
    /// `impl Target.member(sig) { body }`
    Method,
}

/// A separately written implementation for a previously declared target.
pub struct ImplDef {
    pub id: NodeId,
    pub span: Span,
    pub target: Vec<Ident>,
    pub kind: ImplKind,
    /// Signature of the single-method form.
    pub signature: Option<FuncSignature>,
    /// Members of the `impl Target { … }` form.
    pub members: Vec<ArchItem>,
    /// Body of the single-method form.
    pub body: Vec<Stmt>,
    pub doc: Option<StringLit>,
    /// Which file the impl came from (annexed impls differ from the module).
    pub origin: SourceId,
}

impl ImplDef {
    pub fn dotted_target(&self) -> String {
        self.target
            .iter()
            .map(|i| i.value.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// `glob a = 1, b: int = 2;`
pub struct GlobalVars {
    pub id: NodeId,
    pub span: Span,
    pub access: Option<AccessTag>,
    pub is_frozen: bool,
    pub vars: Vec<GlobVar>,
}

pub struct GlobVar {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub ty: Option<Expr>,
    pub value: Option<Expr>,
}

/// `sem Target.path = "text";`
pub struct SemDef {
    pub id: NodeId,
    pub span: Span,
    pub target: Vec<Ident>,
    pub value: StringLit,
}

/// `test name { … }`
pub struct TestBlock {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub body: Vec<Stmt>,
}

/// `with entry { … }` / `with exit { … }` module-code block.
pub struct ModuleCode {
    pub id: NodeId,
    pub span: Span,
    pub is_entry: bool,
    pub name: Option<Ident>,
    pub body: Vec<Stmt>,
    pub code_context: CodeContext,
}
