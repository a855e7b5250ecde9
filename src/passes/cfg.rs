//! Control-flow graph construction: a per-ability basic-block list with
//! branch successors, stored on the program for later analyses.

use crate::ast::*;
use crate::program::Program;

use super::Pass;

/// One basic block: the spans of its straight-line statements plus the
/// indices of successor blocks.
#[derive(Debug, Clone, Default)]
pub struct BasicBlock {
    pub stmts: Vec<crate::source::Span>,
    pub succs: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct AbilityCfg {
    pub name: String,
    pub blocks: Vec<BasicBlock>,
}

pub struct CfgBuildPass;

impl Pass for CfgBuildPass {
    fn name(&self) -> &'static str {
        "CfgBuildPass"
    }

    fn run(&mut self, module: &mut Module, prog: &mut Program) {
        let mut cfgs = Vec::new();
        for elem in &module.body {
            match elem {
                ElementStmt::Ability(ability) => {
                    if let Some(body) = &ability.body {
                        cfgs.push(build_cfg(&ability.name.value, body));
                    }
                }
                ElementStmt::Archetype(arch) => {
                    if let Some(items) = &arch.body {
                        for item in items {
                            if let ArchItem::Ability(ability) = item {
                                if let Some(body) = &ability.body {
                                    cfgs.push(build_cfg(
                                        &format!("{}.{}", arch.name.value, ability.name.value),
                                        body,
                                    ));
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        prog.cfgs.insert(module.name.clone(), cfgs);
    }
}

struct Builder {
    blocks: Vec<BasicBlock>,
    current: usize,
}

impl Builder {
    fn new() -> Self {
        Builder {
            blocks: vec![BasicBlock::default()],
            current: 0,
        }
    }

    fn new_block(&mut self) -> usize {
        self.blocks.push(BasicBlock::default());
        self.blocks.len() - 1
    }

    fn link(&mut self, from: usize, to: usize) {
        if !self.blocks[from].succs.contains(&to) {
            self.blocks[from].succs.push(to);
        }
    }

    fn visit_body(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.visit_stmt(stmt);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::If(s) => self.visit_if(s),
            Stmt::While(s) => {
                let head = self.new_block();
                self.link(self.current, head);
                self.blocks[head].stmts.push(s.cond.span());
                let body = self.new_block();
                let after = self.new_block();
                self.link(head, body);
                self.link(head, after);
                self.current = body;
                self.visit_body(&s.body);
                self.link(self.current, head);
                self.current = after;
            }
            Stmt::ForIn(s) => {
                let head = self.new_block();
                self.link(self.current, head);
                self.blocks[head].stmts.push(s.iter.span());
                let body = self.new_block();
                let after = self.new_block();
                self.link(head, body);
                self.link(head, after);
                self.current = body;
                self.visit_body(&s.body);
                self.link(self.current, head);
                self.current = after;
            }
            Stmt::ForTo(s) => {
                self.blocks[self.current].stmts.push(s.init.span());
                let head = self.new_block();
                self.link(self.current, head);
                self.blocks[head].stmts.push(s.cond.span());
                let body = self.new_block();
                let after = self.new_block();
                self.link(head, body);
                self.link(head, after);
                self.current = body;
                self.visit_body(&s.body);
                self.blocks[self.current].stmts.push(s.step.span());
                self.link(self.current, head);
                self.current = after;
            }
            Stmt::Try(s) => {
                let body = self.new_block();
                self.link(self.current, body);
                self.current = body;
                self.visit_body(&s.body);
                let after = self.new_block();
                self.link(self.current, after);
                for except in &s.excepts {
                    let handler = self.new_block();
                    self.link(body, handler);
                    self.current = handler;
                    self.visit_body(&except.body);
                    self.link(self.current, after);
                }
                if let Some(finally) = &s.finally {
                    let fin = self.new_block();
                    self.link(after, fin);
                    self.current = fin;
                    self.visit_body(finally);
                } else {
                    self.current = after;
                }
            }
            Stmt::Match(s) => {
                let head = self.current;
                self.blocks[head].stmts.push(s.subject.span());
                let after = self.new_block();
                for case in &s.cases {
                    let arm = self.new_block();
                    self.link(head, arm);
                    self.current = arm;
                    self.visit_body(&case.body);
                    self.link(self.current, after);
                }
                self.link(head, after);
                self.current = after;
            }
            other => {
                self.blocks[self.current].stmts.push(other.span());
            }
        }
    }

    fn visit_if(&mut self, s: &IfStmt) {
        let head = self.current;
        self.blocks[head].stmts.push(s.cond.span());
        let then = self.new_block();
        let after = self.new_block();
        self.link(head, then);
        self.current = then;
        self.visit_body(&s.body);
        self.link(self.current, after);
        match &s.else_body {
            Some(ElseBranch::Elif(elif)) => {
                let els = self.new_block();
                self.link(head, els);
                self.current = els;
                self.visit_if(elif);
                self.link(self.current, after);
            }
            Some(ElseBranch::Else(body)) => {
                let els = self.new_block();
                self.link(head, els);
                self.current = els;
                self.visit_body(body);
                self.link(self.current, after);
            }
            None => self.link(head, after),
        }
        self.current = after;
    }
}

fn build_cfg(name: &str, body: &[Stmt]) -> AbilityCfg {
    let mut builder = Builder::new();
    builder.visit_body(body);
    AbilityCfg {
        name: name.to_string(),
        blocks: builder.blocks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::sym_tab_build::SymTabBuildPass;
    use crate::passes::Pass as _;
    use crate::program::Program;
    use crate::source::Source;

    fn run(text: &str) -> Program {
        let mut prog = Program::new();
        let src_id = prog.sources.add(Source::new(text, "t.jac"));
        let (mut module, _) =
            crate::parser::Parser::new(prog.sources.get(src_id), src_id).parse_module();
        SymTabBuildPass.run(&mut module, &mut prog);
        CfgBuildPass.run(&mut module, &mut prog);
        prog
    }

    #[test]
    fn branch_creates_successor_blocks() {
        let prog = run("def f(n: int) -> int { if n > 0 { return 1; } return 0; }");
        let cfgs = &prog.cfgs["t"];
        assert_eq!(cfgs.len(), 1);
        let cfg = &cfgs[0];
        assert!(cfg.blocks.len() >= 3);
        // The entry block has two successors: then and after.
        assert_eq!(cfg.blocks[0].succs.len(), 2);
    }

    #[test]
    fn loop_has_back_edge() {
        let prog = run("def f() { while x { y(); } }");
        let cfg = &prog.cfgs["t"][0];
        // Some block links back to the loop head.
        let has_back_edge = cfg
            .blocks
            .iter()
            .enumerate()
            .any(|(i, b)| b.succs.iter().any(|s| *s < i));
        assert!(has_back_edge);
    }

    #[test]
    fn methods_get_qualified_names() {
        let prog = run("obj A { def m() { return 1; } }");
        let cfg = &prog.cfgs["t"][0];
        assert_eq!(cfg.name, "A.m");
    }
}
