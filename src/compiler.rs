//! The compiler: stateless orchestration of parsing, schedules, annex
//! discovery, and builds. All program state lives in [`Program`].

use std::path::{Path, PathBuf};

use crate::ast::{CodeContext, ElementStmt, Module};
use crate::diag::{Alert, AlertKind};
use crate::passes::{self, CancelToken, Schedule};
use crate::program::{CompileOptions, Program};
use crate::source::{Source, Span};
use crate::symtab::discover_impl_files;

pub struct Compiler;

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        // The parser-selection toggle is recognised for compatibility; the
        // recursive-descent engine is the only one in this crate.
        let _ = crate::style::rd_parser_enabled();
        Compiler
    }

    /// Parse a source string into a module. Dispatches on extension:
    /// `.jac` through the Jac parser (with sibling impl discovery and
    /// context coercion), TypeScript/JavaScript through the ESTree
    /// front-end, `.py`/`.pyi` into binding stubs.
    pub fn parse_str(
        &self,
        source_str: &str,
        file_path: &Path,
        prog: &mut Program,
        cancel: Option<&CancelToken>,
    ) -> Module {
        let src_id = prog
            .sources
            .add(Source::new(source_str.to_string(), file_path));

        if let Some(token) = cancel {
            if token.is_set() {
                let mut module = Module::stub(module_name_of(file_path), src_id);
                prog.append_cancelled(&mut module);
                return module;
            }
        }

        let path_text = file_path.display().to_string();
        if path_text.ends_with(".js")
            || path_text.ends_with(".ts")
            || path_text.ends_with(".jsx")
            || path_text.ends_with(".tsx")
        {
            return crate::estree::parse_foreign_module(source_str, file_path, src_id, prog);
        }
        if path_text.ends_with(".py") || path_text.ends_with(".pyi") {
            // Host-language binding stubs carry no Jac body.
            let mut module = Module::stub(module_name_of(file_path), src_id);
            module.span = Span::new(src_id, 0, source_str.len());
            return module;
        }

        let (mut module, errors) =
            crate::parser::Parser::new(prog.sources.get(src_id), src_id).parse_module();
        prog.stats.parses += 1;
        for alert in errors {
            prog.append_alert(alert);
        }

        apply_context_coercion(&mut module, &path_text);

        // Annex pass: sibling impl files merge their impls into us.
        if !path_text.ends_with(".impl.jac") {
            for impl_path in discover_impl_files(file_path) {
                self.annex_impl_file(&impl_path, &mut module, prog, cancel);
            }
        }
        module
    }

    fn annex_impl_file(
        &self,
        impl_path: &Path,
        target: &mut Module,
        prog: &mut Program,
        cancel: Option<&CancelToken>,
    ) {
        if let Some(token) = cancel {
            if token.is_set() {
                return;
            }
        }
        let source = match Source::from_file(impl_path) {
            Ok(source) => source,
            Err(err) => {
                prog.append_alert(Alert::new(
                    AlertKind::ResolutionError,
                    format!("cannot read impl file '{}': {}", impl_path.display(), err),
                    target.span,
                ));
                return;
            }
        };
        let src_id = prog.sources.add(source);
        let (annexed, errors) =
            crate::parser::Parser::new(prog.sources.get(src_id), src_id).parse_module();
        prog.stats.parses += 1;
        for alert in errors {
            prog.append_alert(alert);
        }
        if annexed.has_syntax_errors {
            target.has_syntax_errors = true;
        }
        target.annexed.push(src_id);
        for elem in annexed.body {
            match elem {
                ElementStmt::Impl(mut im) => {
                    im.origin = src_id;
                    // Slot the impl right after its target declaration so
                    // generated code binds before module statements run.
                    let root = im.target.first().map(|t| t.value.clone());
                    let insert_at = root
                        .and_then(|root| {
                            target.body.iter().position(|e| match e {
                                ElementStmt::Archetype(a) => a.name.value == root,
                                ElementStmt::Enum(en) => en.name.value == root,
                                _ => false,
                            })
                        })
                        .map(|pos| pos + 1)
                        .unwrap_or(target.body.len());
                    target.body.insert(insert_at, ElementStmt::Impl(im));
                }
                ElementStmt::Sem(sem) => target.body.push(ElementStmt::Sem(sem)),
                // Other content in an impl file is carried along so its
                // declarations participate normally.
                other => target.body.push(other),
            }
        }
    }

    /// Compile a file (or an override string for it) into the program.
    /// The module is registered in the hub after all passes finish and the
    /// canonical path key is returned.
    pub fn compile(
        &self,
        file_path: &Path,
        prog: &mut Program,
        options: CompileOptions,
        use_str: Option<&str>,
        cancel: Option<&CancelToken>,
    ) -> PathBuf {
        let key = file_path
            .canonicalize()
            .unwrap_or_else(|_| file_path.to_path_buf());

        let source_owned;
        let source_str = match use_str {
            Some(text) => text,
            None => match std::fs::read(file_path) {
                Ok(bytes) => {
                    source_owned = String::from_utf8_lossy(&bytes).into_owned();
                    &source_owned
                }
                Err(err) => {
                    let src_id = prog.sources.add(Source::new("", file_path));
                    let mut module = Module::stub(module_name_of(file_path), src_id);
                    module.has_syntax_errors = true;
                    prog.append_alert(Alert::new(
                        AlertKind::ResolutionError,
                        format!("cannot read '{}': {}", file_path.display(), err),
                        module.span,
                    ));
                    prog.register_module(key.clone(), module);
                    return key;
                }
            },
        };

        let mut module = self.parse_str(source_str, file_path, prog, cancel);
        if module.stub_only {
            // Cancelled before parsing: register the stub and stop.
            prog.register_module(key.clone(), module);
            return key;
        }

        if options.symtab_ir_only {
            self.run_schedule(&mut module, prog, Schedule::SymtabOnly, cancel);
        } else if options.minimal {
            self.run_schedule(&mut module, prog, Schedule::MinimalIr, cancel);
        } else {
            self.run_schedule(&mut module, prog, Schedule::FullIr, cancel);
        }

        if options.type_check && !options.minimal {
            self.run_schedule(&mut module, prog, Schedule::TypeCheck, cancel);
        }

        if !module.has_syntax_errors && !options.no_cgen && !module.stub_only {
            let schedule = if options.minimal {
                Schedule::CodegenMinimal
            } else {
                Schedule::Codegen
            };
            self.run_schedule(&mut module, prog, schedule, cancel);
        }

        prog.register_module(key.clone(), module);
        key
    }

    /// Compile a source string under a synthetic path.
    pub fn compile_str(
        &self,
        source_str: &str,
        file_path: &Path,
        prog: &mut Program,
        options: CompileOptions,
        cancel: Option<&CancelToken>,
    ) -> PathBuf {
        self.compile(file_path, prog, options, Some(source_str), cancel)
    }

    pub fn run_schedule(
        &self,
        module: &mut Module,
        prog: &mut Program,
        schedule: Schedule,
        cancel: Option<&CancelToken>,
    ) {
        passes::run_schedule(module, prog, passes::passes_for(schedule), cancel);
    }

    /// Compile with import-dependency resolution: every resolvable Jac
    /// import is compiled into the same program.
    pub fn build(
        &self,
        file_path: &Path,
        prog: &mut Program,
        options: CompileOptions,
        cancel: Option<&CancelToken>,
    ) -> PathBuf {
        let key = self.compile(file_path, prog, options, None, cancel);

        let mut pending: Vec<PathBuf> = Vec::new();
        if let Some(module) = prog.module(&key) {
            collect_import_targets(module, &key, &mut pending);
        }
        let mut seen = std::collections::HashSet::new();
        while let Some(target) = pending.pop() {
            let target_key = target
                .canonicalize()
                .unwrap_or_else(|_| target.clone());
            if !seen.insert(target_key.clone()) || prog.hub.contains_key(&target_key) {
                continue;
            }
            let compiled = self.compile(&target, prog, options, None, cancel);
            if let Some(module) = prog.module(&compiled) {
                collect_import_targets(module, &compiled, &mut pending);
            }
        }
        key
    }

    /// Format a file through the format schedule.
    pub fn format_file(&self, file_path: &Path, auto_lint: bool) -> std::io::Result<String> {
        let source = std::fs::read(file_path)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())?;
        Ok(self.format_str(&source, file_path, auto_lint))
    }

    pub fn format_str(&self, source_str: &str, file_path: &Path, auto_lint: bool) -> String {
        let mut prog = Program::new();
        let mut module = self.parse_str(source_str, file_path, &mut prog, None);
        self.run_schedule(&mut module, &mut prog, Schedule::Format { auto_lint }, None);
        module.gen.formatted.unwrap_or_else(|| source_str.to_string())
    }
}

fn module_name_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.split('.').next().unwrap_or(s).to_string())
        .unwrap_or_else(|| "module".to_string())
}

/// `.cl.jac` / `.sv.jac` / `.na.jac` coerce every top-level statement to
/// one code context.
fn apply_context_coercion(module: &mut Module, path_text: &str) {
    let context = if path_text.ends_with(".cl.jac") {
        CodeContext::Client
    } else if path_text.ends_with(".sv.jac") {
        CodeContext::Server
    } else if path_text.ends_with(".na.jac") {
        CodeContext::Native
    } else {
        return;
    };
    module.code_context = context;
    for elem in &mut module.body {
        if let ElementStmt::ModuleCode(code) = elem {
            if code.code_context == CodeContext::Default {
                code.code_context = context;
            }
        }
    }
}

fn collect_import_targets(module: &Module, module_key: &Path, out: &mut Vec<PathBuf>) {
    for elem in &module.body {
        let ElementStmt::Import(import) = elem else {
            continue;
        };
        let mut paths: Vec<String> = import.paths.iter().map(|p| p.dotted()).collect();
        if let Some(from) = &import.from_path {
            paths.push(from.dotted());
        }
        for dotted in paths {
            if let Some((resolved, crate::resolver::Language::Jac)) =
                crate::resolver::resolve_module(&dotted, module_key, &[])
            {
                out.push(resolved);
            }
        }
    }
}
