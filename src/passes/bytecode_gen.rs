//! Bytecode assembly: encode the generated host AST into the opaque,
//! versioned artifact stored on the module and in the cache.

use crate::ast::Module;
use crate::host::CodeObject;
use crate::program::Program;

use super::Pass;

pub struct BytecodeGenPass;

impl Pass for BytecodeGenPass {
    fn name(&self) -> &'static str {
        "BytecodeGenPass"
    }

    fn run(&mut self, module: &mut Module, prog: &mut Program) {
        let Some(host) = &module.gen.host_ast else {
            // Earlier syntax errors suppressed generation; nothing to emit.
            return;
        };
        let filename = prog
            .sources
            .try_get(module.src)
            .map(|s| s.path().display().to_string())
            .unwrap_or_else(|| module.name.clone());
        let code = CodeObject::new(host.clone(), filename);
        module.gen.bytecode = Some(code.to_bytes());
        prog.stats.codegens += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::CodeObject;
    use crate::passes::host_gen::HostGenPass;
    use crate::passes::Pass as _;
    use crate::program::Program;
    use crate::source::Source;

    fn compile(text: &str) -> (Module, Program) {
        let mut prog = Program::new();
        let src_id = prog.sources.add(Source::new(text, "t.jac"));
        let (mut module, _) =
            crate::parser::Parser::new(prog.sources.get(src_id), src_id).parse_module();
        HostGenPass.run(&mut module, &mut prog);
        BytecodeGenPass.run(&mut module, &mut prog);
        (module, prog)
    }

    #[test]
    fn artifact_is_decodable_and_reproducible() {
        let (module, _) = compile("glob x = 1;");
        let bytes = module.gen.bytecode.as_ref().unwrap();
        let code = CodeObject::from_bytes(bytes).unwrap();
        assert_eq!(code.module.name, "t");

        let (module2, _) = compile("glob x = 1;");
        assert_eq!(module.gen.bytecode, module2.gen.bytecode);
    }

    #[test]
    fn syntax_errors_produce_no_artifact() {
        let (module, _) = compile("obj {");
        assert!(module.gen.bytecode.is_none());
    }

    #[test]
    fn codegen_counter_increments() {
        let (_, prog) = compile("glob x = 1;");
        assert_eq!(prog.stats.codegens, 1);
    }
}
