//! Scope construction: walk a module in source order, registering symbols
//! and creating child scopes for container declarations.

use crate::ast::*;
use crate::diag::{Alert, AlertKind};
use crate::program::Program;
use crate::symtab::{ScopeId, ScopeKind, SymbolId, SymbolKind, SymbolTable};

use super::Pass;

pub struct SymTabBuildPass;

impl Pass for SymTabBuildPass {
    fn name(&self) -> &'static str {
        "SymTabBuildPass"
    }

    fn run(&mut self, module: &mut Module, prog: &mut Program) {
        let mut st = SymbolTable::new(&module.name);
        let root = st.root();
        let mut duplicates = Vec::new();

        for elem in &mut module.body {
            declare_element(elem, &mut st, root, &mut duplicates);
        }

        for alert in duplicates {
            prog.append_alert(alert);
        }
        module.sym_tab = Some(st);
    }
}

fn dup_alert(st: &SymbolTable, existing: SymbolId, name: &Ident) -> Alert {
    Alert::new(
        AlertKind::DuplicateDefinition,
        format!(
            "'{}' is already defined as a {}; first definition wins",
            name.value,
            st.symbol(existing).kind.as_str()
        ),
        name.span,
    )
}

fn declare_element(
    elem: &mut ElementStmt,
    st: &mut SymbolTable,
    scope: ScopeId,
    duplicates: &mut Vec<Alert>,
) {
    match elem {
        ElementStmt::Import(import) => {
            for path in &mut import.paths {
                let bind = match (&path.alias, path.segments.first()) {
                    (Some(alias), _) => Some(alias.clone()),
                    (None, Some(first)) => Some(first.clone()),
                    _ => None,
                };
                if let Some(ident) = bind {
                    match st.define(
                        scope,
                        &ident.value,
                        SymbolKind::Import,
                        import.id,
                        ident.span,
                    ) {
                        Ok(sym) => {
                            if let Some(alias) = &mut path.alias {
                                alias.sym = Some(sym);
                            }
                        }
                        Err(existing) => duplicates.push(dup_alert(st, existing, &ident)),
                    }
                }
            }
            for item in &mut import.items {
                let ident = item.alias.clone().unwrap_or_else(|| item.name.clone());
                match st.define(
                    scope,
                    &ident.value,
                    SymbolKind::Import,
                    import.id,
                    ident.span,
                ) {
                    Ok(sym) => item.name.sym = Some(sym),
                    Err(existing) => duplicates.push(dup_alert(st, existing, &ident)),
                }
            }
        }
        ElementStmt::Archetype(arch) => declare_archetype(arch, st, scope, duplicates),
        ElementStmt::Enum(en) => {
            let kind = SymbolKind::Enum;
            match st.define(scope, &en.name.value, kind, en.id, en.name.span) {
                Ok(sym) => {
                    en.name.sym = Some(sym);
                    let child = st.push_scope(scope, &en.name.value, ScopeKind::Class);
                    st.symbol_mut(sym).child_scope = Some(child);
                    for member in &mut en.members {
                        match st.define(
                            child,
                            &member.name.value,
                            SymbolKind::Member,
                            member.id,
                            member.name.span,
                        ) {
                            Ok(msym) => member.name.sym = Some(msym),
                            Err(existing) => {
                                duplicates.push(dup_alert(st, existing, &member.name))
                            }
                        }
                    }
                }
                Err(existing) => duplicates.push(dup_alert(st, existing, &en.name)),
            }
        }
        ElementStmt::Ability(ability) => {
            declare_ability(ability, st, scope, SymbolKind::Func, duplicates)
        }
        ElementStmt::Impl(im) => {
            // Impls register under a mangled name unique to the node, so
            // several impl blocks for one target coexist; matching attaches
            // their members to the target later.
            let mangled = format!("impl.{}.{}.{}", im.dotted_target(), im.origin.0, im.id.0);
            let span = im
                .target
                .first()
                .map(|t| t.span)
                .unwrap_or(im.span);
            if let Ok(sym) = st.define(scope, &mangled, SymbolKind::Impl, im.id, span) {
                let child = st.push_scope(scope, &mangled, ScopeKind::Impl);
                st.symbol_mut(sym).child_scope = Some(child);
                for member in &mut im.members {
                    declare_arch_item(member, st, child, duplicates);
                }
            }
        }
        ElementStmt::GlobalVars(gv) => {
            for var in &mut gv.vars {
                match st.define(scope, &var.name.value, SymbolKind::Var, var.id, var.name.span)
                {
                    Ok(sym) => var.name.sym = Some(sym),
                    Err(existing) => duplicates.push(dup_alert(st, existing, &var.name)),
                }
            }
        }
        ElementStmt::Sem(_) => {}
        ElementStmt::Test(test) => {
            let mangled = format!("test.{}", test.name.value);
            if let Ok(sym) = st.define(scope, &mangled, SymbolKind::Test, test.id, test.name.span)
            {
                test.name.sym = Some(sym);
                let child = st.push_scope(scope, &mangled, ScopeKind::Func);
                st.symbol_mut(sym).child_scope = Some(child);
            }
        }
        ElementStmt::ModuleCode(_) | ElementStmt::Stmt(_) => {}
    }
}

fn declare_archetype(
    arch: &mut Archetype,
    st: &mut SymbolTable,
    scope: ScopeId,
    duplicates: &mut Vec<Alert>,
) {
    let kind = match arch.kind {
        ArchKind::Obj => SymbolKind::Obj,
        ArchKind::Class => SymbolKind::Class,
        ArchKind::Node => SymbolKind::Node,
        ArchKind::Edge => SymbolKind::Edge,
        ArchKind::Walker => SymbolKind::Walker,
    };
    match st.define(scope, &arch.name.value, kind, arch.id, arch.name.span) {
        Ok(sym) => {
            arch.name.sym = Some(sym);
            if let Some(access) = arch.access {
                st.symbol_mut(sym).access = Some(access);
            }
            let child = st.push_scope(scope, &arch.name.value, ScopeKind::Class);
            st.symbol_mut(sym).child_scope = Some(child);
            if let Some(items) = &mut arch.body {
                for item in items {
                    declare_arch_item(item, st, child, duplicates);
                }
            }
        }
        Err(existing) => duplicates.push(dup_alert(st, existing, &arch.name)),
    }
}

fn declare_arch_item(
    item: &mut ArchItem,
    st: &mut SymbolTable,
    scope: ScopeId,
    duplicates: &mut Vec<Alert>,
) {
    match item {
        ArchItem::Has(has) => {
            for var in &mut has.vars {
                match st.define(
                    scope,
                    &var.name.value,
                    SymbolKind::Field,
                    var.id,
                    var.name.span,
                ) {
                    Ok(sym) => {
                        var.name.sym = Some(sym);
                        if let Some(access) = has.access {
                            st.symbol_mut(sym).access = Some(access);
                        }
                    }
                    Err(existing) => duplicates.push(dup_alert(st, existing, &var.name)),
                }
            }
        }
        ArchItem::Ability(ability) => {
            declare_ability(ability, st, scope, SymbolKind::Method, duplicates)
        }
        ArchItem::Nested(arch) => declare_archetype(arch, st, scope, duplicates),
    }
}

fn declare_ability(
    ability: &mut Ability,
    st: &mut SymbolTable,
    scope: ScopeId,
    kind: SymbolKind,
    duplicates: &mut Vec<Alert>,
) {
    match st.define(
        scope,
        &ability.name.value,
        kind,
        ability.id,
        ability.name.span,
    ) {
        Ok(sym) => {
            ability.name.sym = Some(sym);
            st.symbol_mut(sym).has_body = ability.body.is_some();
            if let Some(access) = ability.access {
                st.symbol_mut(sym).access = Some(access);
            }
            let child = st.push_scope(scope, &ability.name.value, ScopeKind::Func);
            st.symbol_mut(sym).child_scope = Some(child);
            for param in &mut ability.signature.params {
                match st.define(
                    child,
                    &param.name.value,
                    SymbolKind::Param,
                    param.id,
                    param.name.span,
                ) {
                    Ok(psym) => param.name.sym = Some(psym),
                    Err(existing) => duplicates.push(dup_alert(st, existing, &param.name)),
                }
            }
        }
        Err(existing) => duplicates.push(dup_alert(st, existing, &ability.name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Program;
    use crate::source::Source;

    fn build(text: &str) -> (Module, Program) {
        let mut prog = Program::new();
        let src_id = prog.sources.add(Source::new(text, "t.jac"));
        let (mut module, errors) =
            crate::parser::Parser::new(prog.sources.get(src_id), src_id).parse_module();
        for e in errors {
            prog.append_alert(e);
        }
        SymTabBuildPass.run(&mut module, &mut prog);
        (module, prog)
    }

    #[test]
    fn archetype_symbols_and_member_scopes() {
        let (module, _) = build(
            "obj Foo { has x: int = 0; def get() -> int { return self.x; } }\nglob g = 1;",
        );
        let st = module.sym_tab.as_ref().unwrap();
        let root = st.root();
        let foo = st.lookup(root, "Foo").unwrap();
        assert_eq!(st.symbol(foo).kind, SymbolKind::Obj);
        let child = st.symbol(foo).child_scope.unwrap();
        assert!(st.lookup_local(child, "x").is_some());
        assert!(st.lookup_local(child, "get").is_some());
        assert!(st.lookup(root, "g").is_some());
        // Member names do not leak to module scope.
        assert!(st.lookup_local(root, "x").is_none());
    }

    #[test]
    fn duplicate_definition_reported_first_wins() {
        let (module, prog) = build("obj A {}\nobj A {}");
        assert!(prog
            .errors_had
            .iter()
            .any(|a| a.kind == AlertKind::DuplicateDefinition));
        let st = module.sym_tab.as_ref().unwrap();
        assert!(st.lookup(st.root(), "A").is_some());
    }

    #[test]
    fn enum_members_in_child_scope() {
        let (module, _) = build("enum Color { RED, GREEN }");
        let st = module.sym_tab.as_ref().unwrap();
        let color = st.lookup(st.root(), "Color").unwrap();
        let child = st.symbol(color).child_scope.unwrap();
        assert_eq!(
            st.symbol(st.lookup_local(child, "RED").unwrap()).kind,
            SymbolKind::Member
        );
    }

    #[test]
    fn rebuild_is_idempotent() {
        let text = "obj Foo { has x: int = 0; }";
        let (mut module, mut prog) = build(text);
        let dump1 = module
            .sym_tab
            .as_ref()
            .map(|st| st.dump_scope(st.root()))
            .unwrap();
        SymTabBuildPass.run(&mut module, &mut prog);
        let dump2 = module
            .sym_tab
            .as_ref()
            .map(|st| st.dump_scope(st.root()))
            .unwrap();
        assert_eq!(dump1, dump2);
    }

    #[test]
    fn imports_register_symbols() {
        let (module, _) = build("import os;\nimport from utils { helper as h };");
        let st = module.sym_tab.as_ref().unwrap();
        assert!(st.lookup(st.root(), "os").is_some());
        assert!(st.lookup(st.root(), "h").is_some());
    }
}
