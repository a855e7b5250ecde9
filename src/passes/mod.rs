//! Pass framework and fixed schedules.
//!
//! A pass is a single transform over a module with shared access to the
//! program for diagnostics and cross-module lookup. The scheduler runs an
//! ordered list; diagnostics accumulate and no pass is skipped on error:
//! passes inspect `has_syntax_errors` themselves and may short-circuit.

pub mod bytecode_gen;
pub mod cfg;
pub mod decl_impl;
pub mod es_gen;
pub mod format;
pub mod host_gen;
pub mod host_link;
pub mod sem_def;
pub mod sema;
pub mod sym_tab_build;
pub mod type_check;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::ast::Module;
use crate::program::Program;

/// Cooperative cancellation handle checked by passes before heavy work.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

pub trait Pass {
    fn name(&self) -> &'static str;

    fn run(&mut self, module: &mut Module, prog: &mut Program);
}

/// The fixed schedules. Names are contracts; the pass lists mirror them.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Schedule {
    /// build-scope, match-decl-impl
    SymtabOnly,
    /// symtab-only + semantic-analysis
    MinimalIr,
    /// minimal-ir + semantic-definition-match + control-flow-build
    FullIr,
    /// runs after full-ir, in place
    TypeCheck,
    /// host-AST build, host link, bytecode assembly
    CodegenMinimal,
    /// codegen + ECMAScript AST emission for client-context work
    Codegen,
    /// doc-IR build, comment re-injection, formatter
    Format { auto_lint: bool },
}

pub fn passes_for(schedule: Schedule) -> Vec<Box<dyn Pass>> {
    match schedule {
        Schedule::SymtabOnly => vec![
            Box::new(sym_tab_build::SymTabBuildPass),
            Box::new(decl_impl::DeclImplMatchPass),
        ],
        Schedule::MinimalIr => vec![
            Box::new(sym_tab_build::SymTabBuildPass),
            Box::new(decl_impl::DeclImplMatchPass),
            Box::new(sema::SemanticAnalysisPass),
        ],
        Schedule::FullIr => vec![
            Box::new(sym_tab_build::SymTabBuildPass),
            Box::new(decl_impl::DeclImplMatchPass),
            Box::new(sema::SemanticAnalysisPass),
            Box::new(sem_def::SemDefMatchPass),
            Box::new(cfg::CfgBuildPass),
        ],
        Schedule::TypeCheck => vec![Box::new(type_check::TypeCheckPass)],
        Schedule::CodegenMinimal => vec![
            Box::new(host_gen::HostGenPass),
            Box::new(host_link::HostLinkPass),
            Box::new(bytecode_gen::BytecodeGenPass),
        ],
        Schedule::Codegen => vec![
            Box::new(es_gen::EsGenPass),
            Box::new(host_gen::HostGenPass),
            Box::new(host_link::HostLinkPass),
            Box::new(bytecode_gen::BytecodeGenPass),
        ],
        Schedule::Format { auto_lint } => {
            let mut passes: Vec<Box<dyn Pass>> = Vec::new();
            if auto_lint {
                passes.push(Box::new(format::AutoLintPass));
            }
            passes.push(Box::new(format::DocIrGenPass));
            passes.push(Box::new(format::CommentInjectionPass));
            passes.push(Box::new(format::FormatPass));
            passes
        }
    }
}

/// Run a schedule over one module. Checks cancellation between passes; on
/// cancellation a single `Cancelled` diagnostic is recorded and the module
/// is left as a stub of whatever progress was made.
pub fn run_schedule(
    module: &mut Module,
    prog: &mut Program,
    passes: Vec<Box<dyn Pass>>,
    cancel: Option<&CancelToken>,
) {
    for mut pass in passes {
        if let Some(token) = cancel {
            if token.is_set() {
                prog.append_cancelled(module);
                return;
            }
        }
        pass.run(module, prog);
    }
}
