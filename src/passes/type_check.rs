//! Type annotation resolution. The full type system lives behind the
//! program's type service; this pass resolves the annotations that can be
//! read straight off the declarations (builtin type names, archetype
//! references) into `TypeInfo` on fields and parameters.

use crate::ast::*;
use crate::program::Program;

use super::Pass;

pub struct TypeCheckPass;

impl Pass for TypeCheckPass {
    fn name(&self) -> &'static str {
        "TypeCheckPass"
    }

    fn run(&mut self, module: &mut Module, prog: &mut Program) {
        prog.ensure_type_service();
        for elem in &mut module.body {
            match elem {
                ElementStmt::Archetype(arch) => {
                    if let Some(items) = &mut arch.body {
                        for item in items {
                            annotate_arch_item(item);
                        }
                    }
                }
                ElementStmt::Ability(ability) => annotate_ability(ability),
                ElementStmt::Impl(im) => {
                    for item in &mut im.members {
                        annotate_arch_item(item);
                    }
                    if let Some(sig) = &mut im.signature {
                        annotate_signature(sig);
                    }
                }
                _ => {}
            }
        }
    }
}

fn annotate_arch_item(item: &mut ArchItem) {
    match item {
        ArchItem::Has(has) => {
            for var in &mut has.vars {
                if var.computed_ty.is_none() {
                    var.computed_ty = type_name_of(&var.ty).map(|name| TypeInfo { name });
                }
            }
        }
        ArchItem::Ability(ability) => annotate_ability(ability),
        ArchItem::Nested(arch) => {
            if let Some(items) = &mut arch.body {
                for item in items {
                    annotate_arch_item(item);
                }
            }
        }
    }
}

fn annotate_ability(ability: &mut Ability) {
    annotate_signature(&mut ability.signature);
}

fn annotate_signature(sig: &mut FuncSignature) {
    for param in &mut sig.params {
        if param.computed_ty.is_none() {
            param.computed_ty = param
                .ty
                .as_ref()
                .and_then(type_name_of)
                .map(|name| TypeInfo { name });
        }
    }
}

/// The printable name of a type annotation, when statically evident.
fn type_name_of(expr: &Expr) -> Option<String> {
    match expr {
        Expr::BuiltinType(b) => Some(b.name.clone()),
        Expr::Name(n) => Some(n.value.clone()),
        Expr::IndexSlice(idx) => {
            let base = type_name_of(&idx.target)?;
            let param = idx.start.as_ref().and_then(|s| type_name_of(s));
            Some(match param {
                Some(p) => format!("{}[{}]", base, p),
                None => base,
            })
        }
        Expr::AtomTrailer(t) => {
            let base = type_name_of(&t.target)?;
            Some(format!("{}.{}", base, t.attr.value))
        }
        Expr::Null(_) => Some("None".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::Pass as _;
    use crate::program::Program;
    use crate::source::Source;

    fn run(text: &str) -> Module {
        let mut prog = Program::new();
        let src_id = prog.sources.add(Source::new(text, "t.jac"));
        let (mut module, _) =
            crate::parser::Parser::new(prog.sources.get(src_id), src_id).parse_module();
        TypeCheckPass.run(&mut module, &mut prog);
        module
    }

    #[test]
    fn builtin_and_generic_annotations_resolve() {
        let module = run("obj Box { has items: list[int] = [], tag: str = \"\"; }");
        let ElementStmt::Archetype(arch) = &module.body[0] else {
            panic!();
        };
        let ArchItem::Has(has) = &arch.body.as_ref().unwrap()[0] else {
            panic!();
        };
        assert_eq!(has.vars[0].computed_ty.as_ref().unwrap().name, "list[int]");
        assert_eq!(has.vars[1].computed_ty.as_ref().unwrap().name, "str");
    }

    #[test]
    fn param_annotations_resolve() {
        let module = run("def f(a: int, b) {}");
        let ElementStmt::Ability(f) = &module.body[0] else {
            panic!();
        };
        assert_eq!(
            f.signature.params[0].computed_ty.as_ref().unwrap().name,
            "int"
        );
        assert!(f.signature.params[1].computed_ty.is_none());
    }
}
