//! Declaration/implementation matching.
//!
//! Impl records are collected during the symbol-table walk; this pass
//! resolves each one against the symbol tree and attaches the impl's
//! member symbols into the target's child scope. Unresolved targets are
//! reported with file, span, and the dotted name.

use crate::ast::*;
use crate::diag::{Alert, AlertKind};
use crate::program::Program;
use crate::symtab::{SymbolId, SymbolTable};

use super::Pass;

pub struct DeclImplMatchPass;

impl Pass for DeclImplMatchPass {
    fn name(&self) -> &'static str {
        "DeclImplMatchPass"
    }

    fn run(&mut self, module: &mut Module, prog: &mut Program) {
        let Some(st) = module.sym_tab.as_mut() else {
            prog.append_alert(Alert::new(
                AlertKind::InternalError,
                "decl/impl matching requires a symbol table",
                module.span,
            ));
            return;
        };

        let mut alerts = Vec::new();
        for elem in &module.body {
            let ElementStmt::Impl(im) = elem else {
                continue;
            };
            match_impl(im, st, &mut alerts);
        }
        for alert in alerts {
            prog.append_alert(alert);
        }
    }
}

fn match_impl(im: &ImplDef, st: &mut SymbolTable, alerts: &mut Vec<Alert>) {
    let dotted = im.dotted_target();

    // Walk the dotted path from the module root. For the single-method
    // form the last segment names a member inside the container.
    let (container_path, member): (&[Ident], Option<&Ident>) = match im.kind {
        ImplKind::Method if im.target.len() > 1 => (
            &im.target[..im.target.len() - 1],
            im.target.last(),
        ),
        _ => (&im.target[..], None),
    };

    let mut scope = st.root();
    let mut container_sym: Option<SymbolId> = None;
    for segment in container_path {
        let Some(sym) = st.lookup_local(scope, &segment.value) else {
            alerts.push(Alert::new(
                AlertKind::ResolutionError,
                format!("cannot resolve impl target '{}'", dotted),
                im.span,
            ));
            return;
        };
        let Some(child) = st.symbol(sym).child_scope else {
            alerts.push(Alert::new(
                AlertKind::ResolutionError,
                format!(
                    "impl target '{}' is not a container at '{}'",
                    dotted, segment.value
                ),
                im.span,
            ));
            return;
        };
        container_sym = Some(sym);
        scope = child;
    }

    let Some(container_sym) = container_sym else {
        alerts.push(Alert::new(
            AlertKind::UnmatchedImpl,
            format!("impl target '{}' not found", dotted),
            im.span,
        ));
        return;
    };

    if !st.symbol(container_sym).kind.is_container() {
        alerts.push(Alert::new(
            AlertKind::UnmatchedImpl,
            format!(
                "impl target '{}' is a {}, not an archetype or enum",
                dotted,
                st.symbol(container_sym).kind.as_str()
            ),
            im.span,
        ));
        return;
    }

    match member {
        Some(member) => {
            // Target.member form: the member either matches a declared
            // bodyless slot or becomes a new method symbol.
            if st.lookup_local(scope, &member.value).is_none() {
                let _ = st.define(
                    scope,
                    &member.value,
                    crate::symtab::SymbolKind::Method,
                    im.id,
                    member.span,
                );
            }
        }
        None => {
            // Obj form: move every symbol from the impl's mangled scope
            // into the target scope; first declaration wins on collision.
            let mangled = format!("impl.{}.{}.{}", dotted, im.origin.0, im.id.0);
            let Some(impl_sym) = st.lookup_local(st.root(), &mangled) else {
                return;
            };
            let Some(impl_scope) = st.symbol(impl_sym).child_scope else {
                return;
            };
            let members: Vec<SymbolId> = st.symbols_in(impl_scope).collect();
            for sym in members {
                if let Err(existing) = st.attach(scope, sym) {
                    // A bodyless declared slot is what the impl fills; a
                    // slot that already has a body is a collision and the
                    // first declaration wins.
                    if !st.symbol(existing).has_body {
                        st.symbol_mut(existing).has_body = true;
                        continue;
                    }
                    let name = st.symbol_name(sym).to_string();
                    alerts.push(Alert::new(
                        AlertKind::Warning,
                        format!(
                            "impl '{}' redefines '{}'; first declaration wins",
                            dotted, name
                        ),
                        st.symbol(sym).decl_span,
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::sym_tab_build::SymTabBuildPass;
    use crate::passes::Pass as _;
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
        DeclImplMatchPass.run(&mut module, &mut prog);
        (module, prog)
    }

    #[test]
    fn obj_impl_attaches_methods() {
        let (module, prog) = build(
            "obj Foo { has x: int = 0; }\nimpl Foo { def get() -> int { return self.x; } }",
        );
        assert!(prog.errors_had.is_empty(), "{:?}", prog.errors_had);
        let st = module.sym_tab.as_ref().unwrap();
        let foo = st.lookup(st.root(), "Foo").unwrap();
        let scope = st.symbol(foo).child_scope.unwrap();
        assert!(st.lookup_local(scope, "get").is_some());
    }

    #[test]
    fn impl_before_decl_still_matches() {
        let (module, prog) = build(
            "impl Foo { def get() -> int { return self.x; } }\nobj Foo { has x: int = 0; }",
        );
        assert!(prog.errors_had.is_empty(), "{:?}", prog.errors_had);
        let st = module.sym_tab.as_ref().unwrap();
        let foo = st.lookup(st.root(), "Foo").unwrap();
        let scope = st.symbol(foo).child_scope.unwrap();
        assert!(st.lookup_local(scope, "get").is_some());
    }

    #[test]
    fn method_form_matches_declared_slot() {
        let (module, prog) = build(
            "obj Foo { def get() -> int; }\nimpl Foo.get(self) -> int { return 1; }",
        );
        assert!(prog.errors_had.is_empty(), "{:?}", prog.errors_had);
        let st = module.sym_tab.as_ref().unwrap();
        let foo = st.lookup(st.root(), "Foo").unwrap();
        let scope = st.symbol(foo).child_scope.unwrap();
        assert!(st.lookup_local(scope, "get").is_some());
    }

    #[test]
    fn deep_dotted_target_is_resolution_error() {
        let (_, prog) = build("impl A.B.C(self) { return 1; }");
        let alert = prog
            .errors_had
            .iter()
            .find(|a| a.kind == AlertKind::ResolutionError)
            .expect("expected resolution error");
        assert!(alert.message.contains("A.B.C"));
    }

    #[test]
    fn unmatched_impl_reports_dotted_name() {
        let (_, prog) = build("impl Missing { def get() { return 1; } }");
        assert!(prog
            .errors_had
            .iter()
            .any(|a| a.kind == AlertKind::ResolutionError && a.message.contains("Missing")));
    }

    #[test]
    fn impl_on_non_container_is_unmatched() {
        let (_, prog) = build("glob X = 1;\nimpl X { def get() { return 1; } }");
        assert!(prog
            .errors_had
            .iter()
            .any(|a| a.kind == AlertKind::UnmatchedImpl));
    }
}
