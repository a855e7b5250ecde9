//! Three-tier cache behaviour and cancellation, observed through the
//! program's instrumented counters.

use std::fs;
use std::time::SystemTime;

use jaclang::cache::BytecodeCache;
use jaclang::{AlertKind, CancelToken, CompileOptions, Compiler, Program};

#[test]
fn repeated_get_bytecode_hits_memory_not_the_pipeline() {
    let tmp = tempfile::tempdir().unwrap();
    let source_path = tmp.path().join("m.jac");
    fs::write(&source_path, "def f(n: int) -> int { return n + 1; }").unwrap();

    let mut prog = Program::with_cache(BytecodeCache::new(tmp.path()));
    let first = prog.get_bytecode(&source_path, false).expect("compiles");
    let parses_after_first = prog.stats.parses;
    assert_eq!(prog.stats.codegens, 1);

    let second = prog.get_bytecode(&source_path, false).expect("cached");
    assert_eq!(first, second, "cached artifact is byte-identical");
    // Neither the parser nor the code generator ran again.
    assert_eq!(prog.stats.parses, parses_after_first);
    assert_eq!(prog.stats.codegens, 1);
    assert_eq!(prog.stats.cache_mem_hits, 1);
}

#[test]
fn disk_tier_survives_a_fresh_program() {
    let tmp = tempfile::tempdir().unwrap();
    let source_path = tmp.path().join("m.jac");
    fs::write(&source_path, "glob x = 41 + 1;").unwrap();

    let bytes = {
        let mut prog = Program::with_cache(BytecodeCache::new(tmp.path()));
        prog.get_bytecode(&source_path, false).expect("compiles")
    };

    // A new program (fresh in-memory table) with the same cache directory
    // serves the artifact from disk without recompiling.
    let mut prog = Program::with_cache(BytecodeCache::new(tmp.path()));
    let again = prog.get_bytecode(&source_path, false).expect("disk hit");
    assert_eq!(bytes, again);
    assert_eq!(prog.stats.cache_disk_hits, 1);
    assert_eq!(prog.stats.codegens, 0);
}

#[test]
fn touching_the_source_forces_recompilation() {
    let tmp = tempfile::tempdir().unwrap();
    let source_path = tmp.path().join("m.jac");
    fs::write(&source_path, "glob x = 1;").unwrap();

    let mut prog = Program::with_cache(BytecodeCache::new(tmp.path()));
    prog.get_bytecode(&source_path, false).expect("compiles");

    // New program, touched source: both cache tiers miss.
    let future = SystemTime::now() + std::time::Duration::from_secs(10);
    let file = fs::File::options().write(true).open(&source_path).unwrap();
    file.set_modified(future).unwrap();
    drop(file);

    let mut prog = Program::with_cache(BytecodeCache::new(tmp.path()));
    prog.get_bytecode(&source_path, false).expect("recompiles");
    assert_eq!(prog.stats.cache_disk_hits, 0);
    assert_eq!(prog.stats.codegens, 1);
}

#[test]
fn minimal_and_full_options_cache_separately() {
    let tmp = tempfile::tempdir().unwrap();
    let source_path = tmp.path().join("m.jac");
    fs::write(&source_path, "glob x = 1;").unwrap();

    let mut prog = Program::with_cache(BytecodeCache::new(tmp.path()));
    prog.get_bytecode(&source_path, false).expect("full");

    let mut prog2 = Program::with_cache(BytecodeCache::new(tmp.path()));
    prog2.get_bytecode(&source_path, true).expect("minimal");
    // The options tuple is part of the key: the minimal request did not
    // see the full artifact on disk.
    assert_eq!(prog2.stats.cache_disk_hits, 0);
}

#[test]
fn cancellation_produces_stub_and_single_diagnostic() {
    let tmp = tempfile::tempdir().unwrap();
    let source_path = tmp.path().join("m.jac");
    fs::write(&source_path, "glob x = 1;").unwrap();

    let mut prog = Program::with_cache(BytecodeCache::new(tmp.path()));
    let compiler = Compiler::new();
    let token = CancelToken::new();
    token.cancel();

    let key = compiler.compile(
        &source_path,
        &mut prog,
        CompileOptions::default(),
        None,
        Some(&token),
    );

    let module = prog.module(&key).expect("stub registered");
    assert!(module.stub_only);
    assert!(module.body.is_empty());
    assert_eq!(prog.errors_had.len(), 1);
    assert_eq!(prog.errors_had[0].kind, AlertKind::Cancelled);
    // No other side effects: nothing parsed, generated, or cached.
    assert_eq!(prog.stats.parses, 0);
    assert_eq!(prog.stats.codegens, 0);
    assert!(module.gen.bytecode.is_none());
}

#[test]
fn get_bytecode_returns_none_for_broken_source() {
    let tmp = tempfile::tempdir().unwrap();
    let source_path = tmp.path().join("broken.jac");
    fs::write(&source_path, "obj {").unwrap();

    let mut prog = Program::with_cache(BytecodeCache::new(tmp.path()));
    assert_eq!(prog.get_bytecode(&source_path, false), None);
    assert!(prog.has_errors());
}
