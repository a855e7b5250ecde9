//! Host/unified linking: build the reverse index from unified node ids to
//! the host statements generated from them, so tooling can walk from a
//! declaration to its generated code and back.

use crate::ast::{Module, NodeId};
use crate::host::ast::HostStmt;
use crate::program::Program;

use super::Pass;

pub struct HostLinkPass;

impl Pass for HostLinkPass {
    fn name(&self) -> &'static str {
        "HostLinkPass"
    }

    fn run(&mut self, module: &mut Module, _prog: &mut Program) {
        let Some(host) = &module.gen.host_ast else {
            return;
        };
        let mut links: std::collections::HashMap<NodeId, Vec<usize>> =
            std::collections::HashMap::new();
        for (idx, stmt) in host.body.iter().enumerate() {
            if let Some(jac) = stmt_jac(stmt) {
                links.entry(NodeId(jac)).or_default().push(idx);
            }
        }
        module.gen.host_links = links;
    }
}

fn stmt_jac(stmt: &HostStmt) -> Option<u32> {
    match stmt {
        HostStmt::ClassDef { jac, .. }
        | HostStmt::EnumDef { jac, .. }
        | HostStmt::FuncDef { jac, .. }
        | HostStmt::Assign { jac, .. }
        | HostStmt::AugAssign { jac, .. }
        | HostStmt::ExprStmt { jac, .. }
        | HostStmt::If { jac, .. }
        | HostStmt::While { jac, .. }
        | HostStmt::For { jac, .. }
        | HostStmt::Return { jac, .. }
        | HostStmt::Yield { jac, .. }
        | HostStmt::Try { jac, .. }
        | HostStmt::Raise { jac, .. }
        | HostStmt::Assert { jac, .. }
        | HostStmt::Delete { jac, .. }
        | HostStmt::Import { jac, .. }
        | HostStmt::ImportFrom { jac, .. }
        | HostStmt::With { jac, .. }
        | HostStmt::Match { jac, .. } => *jac,
        HostStmt::Break | HostStmt::Continue | HostStmt::Global { .. } | HostStmt::Pass => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::host_gen::HostGenPass;
    use crate::passes::Pass as _;
    use crate::program::Program;
    use crate::source::Source;

    #[test]
    fn impl_links_point_at_function_and_assignment() {
        let text = "impl Foo { def get() -> int { return 1; } }\nobj Foo { has x: int = 0; }";
        let mut prog = Program::new();
        let src_id = prog.sources.add(Source::new(text, "t.jac"));
        let (mut module, _) =
            crate::parser::Parser::new(prog.sources.get(src_id), src_id).parse_module();
        HostGenPass.run(&mut module, &mut prog);
        HostLinkPass.run(&mut module, &mut prog);
        assert!(!module.gen.host_links.is_empty());
        // The impl node links to both its function and the deferred assign.
        let max_links = module
            .gen
            .host_links
            .values()
            .map(|v| v.len())
            .max()
            .unwrap();
        assert!(max_links >= 1);
    }
}
