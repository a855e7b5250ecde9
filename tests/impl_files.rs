//! Sibling impl-file discovery and annexing, on a real directory layout.

use std::fs;

use jaclang::host::{CodeObject, Interp, Value};
use jaclang::{discover_impl_files, CompileOptions, Compiler, Program};

#[test]
fn discovery_order_adjacent_folder_shared() {
    let tmp = tempfile::tempdir().unwrap();
    let main = tmp.path().join("widget.jac");
    fs::write(&main, "obj Widget { has n: int = 0; }").unwrap();

    // Adjacent: widget.impl.jac
    fs::write(tmp.path().join("widget.impl.jac"), "").unwrap();
    // Folder: widget.impl/*.impl.jac
    fs::create_dir(tmp.path().join("widget.impl")).unwrap();
    fs::write(tmp.path().join("widget.impl/extra.impl.jac"), "").unwrap();
    fs::write(tmp.path().join("widget.impl/more.impl.jac"), "").unwrap();
    // Shared sibling folder: impl/widget.impl.jac
    fs::create_dir(tmp.path().join("impl")).unwrap();
    fs::write(tmp.path().join("impl/widget.impl.jac"), "").unwrap();

    let found = discover_impl_files(&main);
    assert_eq!(found.len(), 4);
    assert!(found[0].ends_with("widget.impl.jac"));
    assert!(found[1].ends_with("widget.impl/extra.impl.jac"));
    assert!(found[2].ends_with("widget.impl/more.impl.jac"));
    assert!(found[3].ends_with("impl/widget.impl.jac"));
}

#[test]
fn impl_files_do_not_recurse() {
    let tmp = tempfile::tempdir().unwrap();
    let impl_file = tmp.path().join("widget.impl.jac");
    fs::write(&impl_file, "").unwrap();
    // Even with a plausible sibling present, an impl source discovers
    // nothing of its own.
    fs::write(tmp.path().join("widget.impl.impl.jac"), "").unwrap();
    assert!(discover_impl_files(&impl_file).is_empty());
}

#[test]
fn non_jac_files_discover_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let py = tmp.path().join("module.py");
    fs::write(&py, "").unwrap();
    assert!(discover_impl_files(&py).is_empty());
}

#[test]
fn annexed_impl_methods_execute() {
    let tmp = tempfile::tempdir().unwrap();
    let main = tmp.path().join("counter.jac");
    fs::write(
        &main,
        "obj Counter { has n: int = 0; def bump() -> int; }\nglob c = Counter(n=4);\nglob r = c.bump();",
    )
    .unwrap();
    fs::write(
        tmp.path().join("counter.impl.jac"),
        "impl Counter.bump(self) -> int { self.n += 1; return self.n; }",
    )
    .unwrap();

    let mut prog = Program::new();
    let compiler = Compiler::new();
    let key = compiler.compile(&main, &mut prog, CompileOptions::default(), None, None);
    assert!(
        prog.errors_had.is_empty(),
        "{:?}",
        prog.errors_had
            .iter()
            .map(|a| a.message.clone())
            .collect::<Vec<_>>()
    );
    let bytes = prog
        .module(&key)
        .and_then(|m| m.gen.bytecode.clone())
        .expect("bytecode generated");
    let code = CodeObject::from_bytes(&bytes).unwrap();
    let ns = Interp::new().exec(&code).unwrap();
    match &ns["r"] {
        Value::Int(n) => assert_eq!(*n, 5),
        other => panic!("r is {other:?}"),
    }
}

#[test]
fn impl_from_shared_folder_matches_symbols() {
    let tmp = tempfile::tempdir().unwrap();
    let main = tmp.path().join("shape.jac");
    fs::write(&main, "obj Shape { has side: int = 2; }").unwrap();
    fs::create_dir(tmp.path().join("impl")).unwrap();
    fs::write(
        tmp.path().join("impl/shape.impl.jac"),
        "impl Shape { def area() -> int { return self.side * self.side; } }",
    )
    .unwrap();

    let mut prog = Program::new();
    let compiler = Compiler::new();
    let key = compiler.compile(&main, &mut prog, CompileOptions::default(), None, None);
    assert!(prog.errors_had.is_empty(), "{:?}", prog.errors_had);

    let module = prog.module(&key).unwrap();
    assert_eq!(module.annexed.len(), 1);
    let st = module.sym_tab.as_ref().unwrap();
    let shape = st.lookup(st.root(), "Shape").unwrap();
    let scope = st.symbol(shape).child_scope.unwrap();
    assert!(st.lookup_local(scope, "area").is_some());
}

#[test]
fn unmatched_impl_in_sibling_file_is_reported_with_its_origin() {
    let tmp = tempfile::tempdir().unwrap();
    let main = tmp.path().join("app.jac");
    fs::write(&main, "obj App { has n: int = 0; }").unwrap();
    fs::write(
        tmp.path().join("app.impl.jac"),
        "impl Ghost { def boo() { return 1; } }",
    )
    .unwrap();

    let mut prog = Program::new();
    let compiler = Compiler::new();
    compiler.compile(&main, &mut prog, CompileOptions::default(), None, None);
    let alert = prog
        .errors_had
        .iter()
        .find(|a| a.message.contains("Ghost"))
        .expect("unresolved impl reported");
    // The alert's span points into the annexed impl source, not the main
    // module.
    let src = prog.sources.get(alert.span.src);
    assert!(src.path().to_string_lossy().ends_with("app.impl.jac"));
}
