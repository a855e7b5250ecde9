//! ECMAScript AST emission for client-context work: declarations are
//! summarised into an ESTree-shaped JSON program that the front-end
//! bundling toolchain consumes.

use serde_json::{json, Value};

use crate::ast::*;
use crate::program::Program;

use super::Pass;

pub struct EsGenPass;

impl Pass for EsGenPass {
    fn name(&self) -> &'static str {
        "EsGenPass"
    }

    fn run(&mut self, module: &mut Module, _prog: &mut Program) {
        if module.has_syntax_errors {
            return;
        }
        // Only client-context modules feed the front-end toolchain.
        let relevant = module.code_context == CodeContext::Client
            || module
                .body
                .iter()
                .any(|e| matches!(e, ElementStmt::ModuleCode(mc) if mc.code_context == CodeContext::Client));
        if !relevant {
            return;
        }

        let mut body = Vec::new();
        for elem in &module.body {
            if let Some(node) = es_decl(elem) {
                body.push(node);
            }
        }
        module.gen.es_ast = Some(json!({
            "type": "Program",
            "sourceType": "module",
            "body": body,
        }));
    }
}

fn loc(span: crate::source::Span) -> Value {
    json!({ "range": [span.start, span.end] })
}

fn es_decl(elem: &ElementStmt) -> Option<Value> {
    match elem {
        ElementStmt::Archetype(arch) => Some(json!({
            "type": "ClassDeclaration",
            "id": { "type": "Identifier", "name": arch.name.value },
            "loc": loc(arch.span),
        })),
        ElementStmt::Ability(ability) => Some(json!({
            "type": "FunctionDeclaration",
            "id": { "type": "Identifier", "name": ability.name.value },
            "params": ability.signature.params.iter().map(|p| json!({
                "type": "Identifier",
                "name": p.name.value,
            })).collect::<Vec<_>>(),
            "loc": loc(ability.span),
        })),
        ElementStmt::GlobalVars(gv) => Some(json!({
            "type": "VariableDeclaration",
            "kind": "let",
            "declarations": gv.vars.iter().map(|v| json!({
                "type": "VariableDeclarator",
                "id": { "type": "Identifier", "name": v.name.value },
            })).collect::<Vec<_>>(),
            "loc": loc(gv.span),
        })),
        ElementStmt::Enum(en) => Some(json!({
            "type": "TSEnumDeclaration",
            "id": { "type": "Identifier", "name": en.name.value },
            "members": en.members.iter().map(|m| json!({
                "type": "TSEnumMember",
                "id": { "type": "Identifier", "name": m.name.value },
            })).collect::<Vec<_>>(),
            "loc": loc(en.span),
        })),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::Pass as _;
    use crate::program::Program;
    use crate::source::Source;

    #[test]
    fn client_context_module_gets_es_ast() {
        let mut prog = Program::new();
        let src_id = prog
            .sources
            .add(Source::new("obj App { has n: int = 0; }", "app.cl.jac"));
        let (mut module, _) =
            crate::parser::Parser::new(prog.sources.get(src_id), src_id).parse_module();
        module.code_context = CodeContext::Client;
        EsGenPass.run(&mut module, &mut prog);
        let es = module.gen.es_ast.unwrap();
        assert_eq!(es["type"], "Program");
        assert_eq!(es["body"][0]["type"], "ClassDeclaration");
    }

    #[test]
    fn server_module_skips_es_emission() {
        let mut prog = Program::new();
        let src_id = prog.sources.add(Source::new("glob x = 1;", "m.jac"));
        let (mut module, _) =
            crate::parser::Parser::new(prog.sources.get(src_id), src_id).parse_module();
        EsGenPass.run(&mut module, &mut prog);
        assert!(module.gen.es_ast.is_none());
    }
}
