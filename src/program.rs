//! The per-compilation-unit state container: module table, diagnostics,
//! shared services, and instrumentation counters.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::ast::Module;
use crate::cache::{BytecodeCache, CacheKey};
use crate::diag::{Alert, AlertKind};
use crate::passes::cfg::AbilityCfg;
use crate::source::SourceMap;

/// The compile-options tuple. Part of the cache key: two option sets are
/// interchangeable iff every field matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct CompileOptions {
    pub minimal: bool,
    pub type_check: bool,
    pub symtab_ir_only: bool,
    pub no_cgen: bool,
    pub skip_native_engine: bool,
}

impl CompileOptions {
    /// Stable text form folded into cache digests.
    pub fn fingerprint(&self) -> String {
        format!(
            "m{}t{}s{}n{}k{}",
            self.minimal as u8,
            self.type_check as u8,
            self.symtab_ir_only as u8,
            self.no_cgen as u8,
            self.skip_native_engine as u8
        )
    }
}

/// Instrumented counters for cache behaviour and pipeline activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompileStats {
    pub parses: u32,
    pub codegens: u32,
    pub cache_mem_hits: u32,
    pub cache_disk_hits: u32,
}

/// Lazily created type service handle. The full evaluator is an external
/// collaborator; the handle tracks lifecycle for test isolation.
#[derive(Default)]
pub struct TypeService {
    pub generation: u32,
}

pub struct Program {
    pub sources: SourceMap,
    /// Canonical file path -> compiled module. Written exactly once per
    /// module, after all passes that produce it.
    pub hub: HashMap<PathBuf, Module>,
    pub errors_had: Vec<Alert>,
    pub warnings_had: Vec<Alert>,
    pub stats: CompileStats,
    pub cache: BytecodeCache,
    /// Control-flow graphs per module name, built by the full-ir schedule.
    pub cfgs: HashMap<String, Vec<AbilityCfg>>,
    type_service: Option<TypeService>,
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Program {
    /// A program with the disk cache disabled; embedders that want
    /// persistence use [`Program::with_cache`].
    pub fn new() -> Self {
        Program {
            sources: SourceMap::new(),
            hub: HashMap::new(),
            errors_had: Vec::new(),
            warnings_had: Vec::new(),
            stats: CompileStats::default(),
            cache: BytecodeCache::disabled(),
            cfgs: HashMap::new(),
            type_service: None,
        }
    }

    pub fn with_cache(cache: BytecodeCache) -> Self {
        Program {
            cache,
            ..Program::new()
        }
    }

    /// Route an alert to the right list by severity.
    pub fn append_alert(&mut self, alert: Alert) {
        if alert.kind.is_error() {
            self.errors_had.push(alert);
        } else {
            self.warnings_had.push(alert);
        }
    }

    /// Record a single Cancelled diagnostic for `module`. Idempotent per
    /// module so a schedule stopping mid-way reports once.
    pub fn append_cancelled(&mut self, module: &mut Module) {
        module.stub_only = true;
        let already = self
            .errors_had
            .iter()
            .any(|a| a.kind == AlertKind::Cancelled && a.span.src == module.src);
        if !already {
            self.errors_had.push(Alert::new(
                AlertKind::Cancelled,
                format!("compilation of '{}' was cancelled", module.name),
                module.span,
            ));
        }
    }

    pub fn register_module(&mut self, path: PathBuf, module: Module) {
        self.hub.insert(path, module);
    }

    pub fn module(&self, path: &Path) -> Option<&Module> {
        self.hub.get(path)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors_had.is_empty()
    }

    pub fn ensure_type_service(&mut self) -> &mut TypeService {
        self.type_service.get_or_insert_with(TypeService::default)
    }

    /// Reset type information, for test isolation. With `clear_hub` the
    /// whole module table is dropped too.
    pub fn clear_type_system(&mut self, clear_hub: bool) {
        self.type_service = None;
        if clear_hub {
            self.hub.clear();
            return;
        }
        for module in self.hub.values_mut() {
            clear_types(module);
        }
    }

    /// Three-tier bytecode lookup: module table, disk store, recompile.
    pub fn get_bytecode(&mut self, full_target: &Path, minimal: bool) -> Option<Vec<u8>> {
        let key_path = full_target
            .canonicalize()
            .unwrap_or_else(|_| full_target.to_path_buf());

        // Tier 1: in-memory module table.
        if let Some(module) = self.hub.get(&key_path) {
            if let Some(bytes) = &module.gen.bytecode {
                self.stats.cache_mem_hits += 1;
                return Some(bytes.clone());
            }
        }

        // Tier 2: disk store.
        let key = CacheKey::for_source(&key_path, minimal);
        if let Some(bytes) = self.cache.get(&key) {
            self.stats.cache_disk_hits += 1;
            return Some(bytes);
        }

        // Tier 3: full pipeline, then write both tiers.
        let compiler = crate::compiler::Compiler::new();
        let options = CompileOptions {
            minimal,
            ..CompileOptions::default()
        };
        let registered = compiler.compile(full_target, self, options, None, None);
        let bytes = self
            .hub
            .get(&registered)
            .and_then(|m| m.gen.bytecode.clone())?;
        let _ = self.cache.put(&key, &bytes);
        Some(bytes)
    }
}

fn clear_types(module: &mut Module) {
    use crate::ast::ElementStmt;
    for elem in &mut module.body {
        match elem {
            ElementStmt::Archetype(arch) => {
                if let Some(items) = &mut arch.body {
                    for item in items {
                        clear_arch_item(item);
                    }
                }
            }
            ElementStmt::Ability(ability) => {
                for param in &mut ability.signature.params {
                    param.computed_ty = None;
                }
            }
            ElementStmt::Impl(im) => {
                for item in &mut im.members {
                    clear_arch_item(item);
                }
            }
            _ => {}
        }
    }
}

fn clear_arch_item(item: &mut crate::ast::ArchItem) {
    use crate::ast::ArchItem;
    match item {
        ArchItem::Has(has) => {
            for var in &mut has.vars {
                var.computed_ty = None;
            }
        }
        ArchItem::Ability(ability) => {
            for param in &mut ability.signature.params {
                param.computed_ty = None;
            }
        }
        ArchItem::Nested(arch) => {
            if let Some(items) = &mut arch.body {
                for item in items {
                    clear_arch_item(item);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SourceId, Span};

    #[test]
    fn options_equality_is_fieldwise() {
        let a = CompileOptions::default();
        let b = CompileOptions {
            minimal: true,
            ..CompileOptions::default()
        };
        assert_eq!(a, CompileOptions::default());
        assert_ne!(a, b);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn alerts_route_by_severity() {
        let mut prog = Program::new();
        prog.append_alert(Alert::new(
            AlertKind::SyntaxError,
            "bad",
            Span::new(SourceId(0), 0, 1),
        ));
        prog.append_alert(Alert::new(
            AlertKind::Warning,
            "meh",
            Span::new(SourceId(0), 0, 1),
        ));
        assert_eq!(prog.errors_had.len(), 1);
        assert_eq!(prog.warnings_had.len(), 1);
    }

    #[test]
    fn cancelled_is_recorded_once() {
        let mut prog = Program::new();
        let mut module = Module::stub("m", SourceId(0));
        prog.append_cancelled(&mut module);
        prog.append_cancelled(&mut module);
        assert_eq!(prog.errors_had.len(), 1);
        assert_eq!(prog.errors_had[0].kind, AlertKind::Cancelled);
        assert!(module.stub_only);
    }

    #[test]
    fn clear_type_system_can_drop_hub() {
        let mut prog = Program::new();
        prog.register_module(PathBuf::from("/x.jac"), Module::stub("x", SourceId(0)));
        prog.ensure_type_service();
        prog.clear_type_system(true);
        assert!(prog.hub.is_empty());
    }
}
