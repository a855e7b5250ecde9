//! Symbol table: nested scopes over interned names.
//!
//! Scopes and symbols live in flat arenas indexed by id, so a symbol's
//! back-edge to its declaring node is a plain [`NodeId`] and no ownership
//! cycles arise. `lookup` walks the parent chain exactly once per call;
//! inner definitions shadow outer ones.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::ast::NodeId;
use crate::intern::{Interner, Name};
use crate::source::Span;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ScopeId(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SymbolId(pub u32);

/// What a symbol names.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SymbolKind {
    Module,
    Var,
    Field,
    Param,
    Method,
    Obj,
    Class,
    Enum,
    Member,
    Import,
    Func,
    Walker,
    Node,
    Edge,
    Test,
    Impl,
    Unknown,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Module => "module",
            SymbolKind::Var => "var",
            SymbolKind::Field => "field",
            SymbolKind::Param => "param",
            SymbolKind::Method => "method",
            SymbolKind::Obj => "obj",
            SymbolKind::Class => "class",
            SymbolKind::Enum => "enum",
            SymbolKind::Member => "member",
            SymbolKind::Import => "import",
            SymbolKind::Func => "func",
            SymbolKind::Walker => "walker",
            SymbolKind::Node => "node",
            SymbolKind::Edge => "edge",
            SymbolKind::Test => "test",
            SymbolKind::Impl => "impl",
            SymbolKind::Unknown => "unknown",
        }
    }

    /// Container kinds own a child scope that impls may attach into.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            SymbolKind::Obj
                | SymbolKind::Class
                | SymbolKind::Enum
                | SymbolKind::Node
                | SymbolKind::Edge
                | SymbolKind::Walker
        )
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScopeKind {
    Module,
    Class,
    Func,
    Block,
    Impl,
}

#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: Name,
    pub kind: SymbolKind,
    pub decl: NodeId,
    pub decl_span: Span,
    pub type_name: Option<String>,
    pub access: Option<crate::ast::AccessTag>,
    pub semstr: Option<String>,
    /// False for a bodyless declaration awaiting its impl.
    pub has_body: bool,
    /// Child scope for container symbols (archetype/enum/ability/impl).
    pub child_scope: Option<ScopeId>,
}

pub struct Scope {
    pub name: Name,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    symbols: HashMap<Name, SymbolId>,
    /// Insertion order, for deterministic dumps.
    order: Vec<SymbolId>,
}

/// One module's scopes and symbols.
pub struct SymbolTable {
    pub interner: Interner,
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    root: ScopeId,
}

impl SymbolTable {
    pub fn new(module_name: &str) -> Self {
        let mut interner = Interner::new();
        let name = interner.intern(module_name);
        let root_scope = Scope {
            name,
            kind: ScopeKind::Module,
            parent: None,
            children: Vec::new(),
            symbols: HashMap::new(),
            order: Vec::new(),
        };
        SymbolTable {
            interner,
            scopes: vec![root_scope],
            symbols: Vec::new(),
            root: ScopeId(0),
        }
    }

    pub fn root(&self) -> ScopeId {
        self.root
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    pub fn symbol_name(&self, id: SymbolId) -> &str {
        self.interner.resolve(self.symbols[id.0 as usize].name)
    }

    pub fn push_scope(&mut self, parent: ScopeId, name: &str, kind: ScopeKind) -> ScopeId {
        let name = self.interner.intern(name);
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            name,
            kind,
            parent: Some(parent),
            children: Vec::new(),
            symbols: HashMap::new(),
            order: Vec::new(),
        });
        self.scopes[parent.0 as usize].children.push(id);
        id
    }

    /// Define `name` in `scope`. On a repeat definition the first wins and
    /// the existing symbol id is returned as the error value.
    pub fn define(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: SymbolKind,
        decl: NodeId,
        decl_span: Span,
    ) -> Result<SymbolId, SymbolId> {
        let interned = self.interner.intern(name);
        if let Some(&existing) = self.scopes[scope.0 as usize].symbols.get(&interned) {
            return Err(existing);
        }
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            name: interned,
            kind,
            decl,
            decl_span,
            type_name: None,
            access: None,
            semstr: None,
            has_body: true,
            child_scope: None,
        });
        let scope_data = &mut self.scopes[scope.0 as usize];
        scope_data.symbols.insert(interned, id);
        scope_data.order.push(id);
        Ok(id)
    }

    /// Attach an already defined symbol into another scope under its own
    /// name (impl matching moves method symbols into the target's scope).
    pub fn attach(&mut self, scope: ScopeId, sym: SymbolId) -> Result<(), SymbolId> {
        let name = self.symbols[sym.0 as usize].name;
        let scope_data = &mut self.scopes[scope.0 as usize];
        if let Some(&existing) = scope_data.symbols.get(&name) {
            if existing != sym {
                return Err(existing);
            }
            return Ok(());
        }
        scope_data.symbols.insert(name, sym);
        scope_data.order.push(sym);
        Ok(())
    }

    /// Look `name` up in `scope` only, no parent walk.
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let interned = self.interner.lookup(name)?;
        self.scopes[scope.0 as usize].symbols.get(&interned).copied()
    }

    /// Walk from `scope` outward to the root, innermost match wins.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let interned = self.interner.lookup(name)?;
        let mut cur = Some(scope);
        while let Some(id) = cur {
            let s = &self.scopes[id.0 as usize];
            if let Some(&sym) = s.symbols.get(&interned) {
                return Some(sym);
            }
            cur = s.parent;
        }
        None
    }

    /// Symbols of a scope in definition order.
    pub fn symbols_in(&self, scope: ScopeId) -> impl Iterator<Item = SymbolId> + '_ {
        self.scopes[scope.0 as usize].order.iter().copied()
    }

    /// Indented textual dump of a scope subtree, for debugging.
    pub fn dump_scope(&self, scope: ScopeId) -> String {
        let mut out = String::new();
        self.dump_into(scope, 0, &mut out);
        out
    }

    fn dump_into(&self, scope: ScopeId, depth: usize, out: &mut String) {
        let s = &self.scopes[scope.0 as usize];
        let indent = "  ".repeat(depth);
        let _ = writeln!(
            out,
            "{}scope {} ({:?})",
            indent,
            self.interner.resolve(s.name),
            s.kind
        );
        for sym_id in &s.order {
            let sym = &self.symbols[sym_id.0 as usize];
            let _ = writeln!(
                out,
                "{}  {} [{}]",
                indent,
                self.interner.resolve(sym.name),
                sym.kind.as_str()
            );
            if let Some(child) = sym.child_scope {
                self.dump_into(child, depth + 2, out);
            }
        }
    }
}

/// Sibling impl files for `x.jac`, searched in order:
/// `x.impl.jac` next to it, `*.impl.jac` inside `x.impl/`, then
/// `impl/x.impl.jac`. An impl source never searches for its own siblings.
pub fn discover_impl_files(source_path: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let name = source_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    if name.ends_with(".impl.jac") || !name.ends_with(".jac") {
        return found;
    }
    let stem = name.trim_end_matches(".jac");
    let dir = source_path.parent().unwrap_or(Path::new("."));

    let adjacent = dir.join(format!("{stem}.impl.jac"));
    if adjacent.is_file() {
        found.push(adjacent);
    }

    let impl_dir = dir.join(format!("{stem}.impl"));
    if impl_dir.is_dir() {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(&impl_dir)
            .map(|rd| {
                rd.filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| {
                        p.file_name()
                            .and_then(|n| n.to_str())
                            .is_some_and(|n| n.ends_with(".impl.jac"))
                    })
                    .collect()
            })
            .unwrap_or_default();
        entries.sort();
        found.extend(entries);
    }

    let shared = dir.join("impl").join(format!("{stem}.impl.jac"));
    if shared.is_file() {
        found.push(shared);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SourceId, Span};

    fn span() -> Span {
        Span::new(SourceId(0), 0, 0)
    }

    #[test]
    fn define_and_lookup() {
        let mut st = SymbolTable::new("m");
        let root = st.root();
        let id = st
            .define(root, "x", SymbolKind::Var, NodeId(1), span())
            .unwrap();
        assert_eq!(st.lookup(root, "x"), Some(id));
        assert_eq!(st.lookup(root, "y"), None);
    }

    #[test]
    fn duplicate_definition_reports_first() {
        let mut st = SymbolTable::new("m");
        let root = st.root();
        let first = st
            .define(root, "x", SymbolKind::Var, NodeId(1), span())
            .unwrap();
        let err = st
            .define(root, "x", SymbolKind::Func, NodeId(2), span())
            .unwrap_err();
        assert_eq!(err, first);
        // First one wins.
        assert_eq!(st.symbol(st.lookup(root, "x").unwrap()).kind, SymbolKind::Var);
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut st = SymbolTable::new("m");
        let root = st.root();
        let outer = st
            .define(root, "x", SymbolKind::Var, NodeId(1), span())
            .unwrap();
        let inner_scope = st.push_scope(root, "f", ScopeKind::Func);
        let inner = st
            .define(inner_scope, "x", SymbolKind::Param, NodeId(2), span())
            .unwrap();
        assert_eq!(st.lookup(inner_scope, "x"), Some(inner));
        assert_eq!(st.lookup(root, "x"), Some(outer));
    }

    #[test]
    fn lookup_walks_to_root() {
        let mut st = SymbolTable::new("m");
        let root = st.root();
        let sym = st
            .define(root, "g", SymbolKind::Func, NodeId(1), span())
            .unwrap();
        let a = st.push_scope(root, "A", ScopeKind::Class);
        let b = st.push_scope(a, "m", ScopeKind::Func);
        assert_eq!(st.lookup(b, "g"), Some(sym));
    }

    #[test]
    fn lookup_is_deterministic() {
        let mut st = SymbolTable::new("m");
        let root = st.root();
        st.define(root, "v", SymbolKind::Var, NodeId(1), span())
            .unwrap();
        let scope = st.push_scope(root, "f", ScopeKind::Func);
        let first = st.lookup(scope, "v");
        let second = st.lookup(scope, "v");
        assert_eq!(first, second);
    }

    #[test]
    fn dump_scope_shows_nesting() {
        let mut st = SymbolTable::new("m");
        let root = st.root();
        let obj = st
            .define(root, "Foo", SymbolKind::Obj, NodeId(1), span())
            .unwrap();
        let child = st.push_scope(root, "Foo", ScopeKind::Class);
        st.symbol_mut(obj).child_scope = Some(child);
        st.define(child, "x", SymbolKind::Field, NodeId(2), span())
            .unwrap();
        let dump = st.dump_scope(root);
        assert!(dump.contains("Foo [obj]"));
        assert!(dump.contains("x [field]"));
    }

    #[test]
    fn impl_sources_do_not_discover_siblings() {
        let files = discover_impl_files(Path::new("/nonexistent/x.impl.jac"));
        assert!(files.is_empty());
    }
}
