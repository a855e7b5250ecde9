//! Semantic-definition matching: attach `sem Target.path = "text";`
//! strings to the symbols they describe.

use crate::ast::*;
use crate::diag::{Alert, AlertKind};
use crate::program::Program;

use super::Pass;

pub struct SemDefMatchPass;

impl Pass for SemDefMatchPass {
    fn name(&self) -> &'static str {
        "SemDefMatchPass"
    }

    fn run(&mut self, module: &mut Module, prog: &mut Program) {
        let Some(st) = module.sym_tab.as_mut() else {
            return;
        };
        let mut alerts = Vec::new();

        for elem in &module.body {
            let ElementStmt::Sem(sem) = elem else {
                continue;
            };
            let dotted = sem
                .target
                .iter()
                .map(|i| i.value.as_str())
                .collect::<Vec<_>>()
                .join(".");

            let mut scope = st.root();
            let mut found = None;
            for (i, segment) in sem.target.iter().enumerate() {
                let Some(sym) = st.lookup_local(scope, &segment.value) else {
                    found = None;
                    break;
                };
                if i + 1 == sem.target.len() {
                    found = Some(sym);
                    break;
                }
                match st.symbol(sym).child_scope {
                    Some(child) => scope = child,
                    None => {
                        found = None;
                        break;
                    }
                }
            }

            match found {
                Some(sym) => {
                    st.symbol_mut(sym).semstr = Some(sem.value.value.clone());
                }
                None => alerts.push(Alert::new(
                    AlertKind::ResolutionError,
                    format!("sem target '{}' not found", dotted),
                    sem.span,
                )),
            }
        }

        // Mirror matched strings onto the declaration nodes.
        let semstrs: Vec<(String, String)> = {
            let st_ref = module.sym_tab.as_ref().unwrap();
            module
                .body
                .iter()
                .filter_map(|e| match e {
                    ElementStmt::Archetype(a) => {
                        let sym = st_ref.lookup(st_ref.root(), &a.name.value)?;
                        let text = st_ref.symbol(sym).semstr.clone()?;
                        Some((a.name.value.clone(), text))
                    }
                    _ => None,
                })
                .collect()
        };
        for elem in &mut module.body {
            if let ElementStmt::Archetype(a) = elem {
                if let Some((_, text)) = semstrs.iter().find(|(n, _)| *n == a.name.value) {
                    a.semstr = Some(text.clone());
                }
            }
        }

        for alert in alerts {
            prog.append_alert(alert);
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

    fn run(text: &str) -> (Module, Program) {
        let mut prog = Program::new();
        let src_id = prog.sources.add(Source::new(text, "t.jac"));
        let (mut module, errors) =
            crate::parser::Parser::new(prog.sources.get(src_id), src_id).parse_module();
        for e in errors {
            prog.append_alert(e);
        }
        SymTabBuildPass.run(&mut module, &mut prog);
        SemDefMatchPass.run(&mut module, &mut prog);
        (module, prog)
    }

    #[test]
    fn sem_attaches_to_archetype_and_field() {
        let (module, prog) = run(
            "obj Foo { has x: int = 0; }\nsem Foo = \"a container\";\nsem Foo.x = \"the x\";",
        );
        assert!(prog.errors_had.is_empty(), "{:?}", prog.errors_had);
        let st = module.sym_tab.as_ref().unwrap();
        let foo = st.lookup(st.root(), "Foo").unwrap();
        assert_eq!(st.symbol(foo).semstr.as_deref(), Some("a container"));
        let scope = st.symbol(foo).child_scope.unwrap();
        let x = st.lookup_local(scope, "x").unwrap();
        assert_eq!(st.symbol(x).semstr.as_deref(), Some("the x"));
        let ElementStmt::Archetype(a) = &module.body[0] else {
            panic!();
        };
        assert_eq!(a.semstr.as_deref(), Some("a container"));
    }

    #[test]
    fn unresolved_sem_target_reported() {
        let (_, prog) = run("sem Nope.x = \"missing\";");
        assert!(prog
            .errors_had
            .iter()
            .any(|a| a.kind == AlertKind::ResolutionError && a.message.contains("Nope.x")));
    }
}
