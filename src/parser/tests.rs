use crate::ast::*;
use crate::parser::Parser;
use crate::source::{Source, SourceId};

fn parse(text: &str) -> Module {
    let src = Source::new(text, "test.jac");
    let (module, _) = Parser::new(&src, SourceId(0)).parse_module();
    module
}

fn parse_clean(text: &str) -> Module {
    let src = Source::new(text, "test.jac");
    let (module, errors) = Parser::new(&src, SourceId(0)).parse_module();
    assert!(
        !module.has_syntax_errors,
        "unexpected syntax errors: {:?}",
        errors.iter().map(|e| e.message.clone()).collect::<Vec<_>>()
    );
    module
}

#[test]
fn empty_source_is_empty_module_without_diagnostics() {
    let module = parse_clean("");
    assert!(module.body.is_empty());
    assert!(!module.has_syntax_errors);
}

#[test]
fn module_doc_string() {
    let module = parse_clean("\"\"\"The module doc.\"\"\"\nobj Foo {}");
    assert_eq!(module.doc.as_ref().unwrap().value, "The module doc.");
    assert_eq!(module.body.len(), 1);
}

#[test]
fn archetype_with_has_and_method() {
    let module = parse_clean(
        "obj Counter {\n    has count: int = 0;\n    def bump(amount: int = 1) -> int {\n        self.count += amount;\n        return self.count;\n    }\n}",
    );
    let ElementStmt::Archetype(arch) = &module.body[0] else {
        panic!("expected archetype");
    };
    assert_eq!(arch.kind, ArchKind::Obj);
    assert_eq!(arch.name.value, "Counter");
    let body = arch.body.as_ref().unwrap();
    assert_eq!(body.len(), 2);
    let ArchItem::Has(has) = &body[0] else {
        panic!("expected has");
    };
    assert_eq!(has.vars[0].name.value, "count");
    let ArchItem::Ability(ability) = &body[1] else {
        panic!("expected ability");
    };
    assert!(ability.is_def);
    assert_eq!(ability.signature.params.len(), 1);
    assert!(ability.signature.params[0].default.is_some());
}

#[test]
fn archetype_kinds_and_bases() {
    for (kw, kind) in [
        ("obj", ArchKind::Obj),
        ("class", ArchKind::Class),
        ("node", ArchKind::Node),
        ("edge", ArchKind::Edge),
        ("walker", ArchKind::Walker),
    ] {
        let module = parse_clean(&format!("{kw} Thing(Base) {{}}"));
        let ElementStmt::Archetype(arch) = &module.body[0] else {
            panic!("expected archetype");
        };
        assert_eq!(arch.kind, kind);
        assert_eq!(arch.bases.len(), 1);
    }
}

#[test]
fn enum_with_values() {
    let module = parse_clean("enum Color { RED = 1, GREEN, BLUE = 10 }");
    let ElementStmt::Enum(en) = &module.body[0] else {
        panic!("expected enum");
    };
    assert_eq!(en.members.len(), 3);
    assert!(en.members[0].value.is_some());
    assert!(en.members[1].value.is_none());
}

#[test]
fn impl_obj_form() {
    let module = parse_clean("impl Foo {\n    def get() -> int { return self.x; }\n}");
    let ElementStmt::Impl(im) = &module.body[0] else {
        panic!("expected impl");
    };
    assert_eq!(im.kind, ImplKind::Obj);
    assert_eq!(im.dotted_target(), "Foo");
    assert_eq!(im.members.len(), 1);
}

#[test]
fn impl_single_method_form() {
    let module = parse_clean("impl Foo.get(self) -> int { return self.x; }");
    let ElementStmt::Impl(im) = &module.body[0] else {
        panic!("expected impl");
    };
    assert_eq!(im.kind, ImplKind::Method);
    assert_eq!(im.dotted_target(), "Foo.get");
    assert!(im.signature.is_some());
    assert_eq!(im.body.len(), 1);
}

#[test]
fn import_forms() {
    let module = parse_clean(
        "import os;\nimport a.b as ab;\nimport from utils { helper, thing as t };\ninclude base;",
    );
    assert_eq!(module.body.len(), 4);
    let ElementStmt::Import(plain) = &module.body[0] else {
        panic!();
    };
    assert_eq!(plain.paths[0].dotted(), "os");
    let ElementStmt::Import(aliased) = &module.body[1] else {
        panic!();
    };
    assert_eq!(aliased.paths[0].alias.as_ref().unwrap().value, "ab");
    let ElementStmt::Import(from) = &module.body[2] else {
        panic!();
    };
    assert_eq!(from.from_path.as_ref().unwrap().dotted(), "utils");
    assert_eq!(from.items.len(), 2);
    assert_eq!(from.items[1].alias.as_ref().unwrap().value, "t");
    let ElementStmt::Import(inc) = &module.body[3] else {
        panic!();
    };
    assert!(inc.is_include);
}

#[test]
fn relative_import_dots() {
    let module = parse_clean("import from ..pkg.mod { x };");
    let ElementStmt::Import(im) = &module.body[0] else {
        panic!();
    };
    let path = im.from_path.as_ref().unwrap();
    assert_eq!(path.dots, 2);
    assert_eq!(path.segments.len(), 2);
}

#[test]
fn glob_declaration() {
    let module = parse_clean("glob a = 1, b: int = 2;");
    let ElementStmt::GlobalVars(gv) = &module.body[0] else {
        panic!();
    };
    assert_eq!(gv.vars.len(), 2);
    assert!(gv.vars[1].ty.is_some());
}

#[test]
fn sem_declaration() {
    let module = parse_clean("sem Foo.x = \"the x field\";");
    let ElementStmt::Sem(sem) = &module.body[0] else {
        panic!();
    };
    assert_eq!(sem.target.len(), 2);
    assert_eq!(sem.value.value, "the x field");
}

#[test]
fn test_block_and_module_code() {
    let module = parse_clean("test sums { assert 1 + 1 == 2; }\nwith entry { print(\"go\"); }\nwith exit { print(\"done\"); }");
    assert!(matches!(module.body[0], ElementStmt::Test(_)));
    let ElementStmt::ModuleCode(entry) = &module.body[1] else {
        panic!();
    };
    assert!(entry.is_entry);
    let ElementStmt::ModuleCode(exit) = &module.body[2] else {
        panic!();
    };
    assert!(!exit.is_entry);
}

#[test]
fn control_statements() {
    let module = parse_clean(
        "def f(n: int) {\n    while n > 0 {\n        n -= 1;\n        if n == 3 { continue; }\n        if n == 1 { break; }\n    }\n    for x in [1, 2] { print(x); }\n    for i = 0 to i < 5 by i += 1 { print(i); }\n}",
    );
    let ElementStmt::Ability(f) = &module.body[0] else {
        panic!();
    };
    let body = f.body.as_ref().unwrap();
    assert!(matches!(body[0], Stmt::While(_)));
    assert!(matches!(body[1], Stmt::ForIn(_)));
    assert!(matches!(body[2], Stmt::ForTo(_)));
}

#[test]
fn try_except_finally() {
    let module = parse_clean(
        "def f() {\n    try { risky(); }\n    except ValueError as e { print(e); }\n    except { print(\"other\"); }\n    finally { done(); }\n}",
    );
    let ElementStmt::Ability(f) = &module.body[0] else {
        panic!();
    };
    let Stmt::Try(t) = &f.body.as_ref().unwrap()[0] else {
        panic!();
    };
    assert_eq!(t.excepts.len(), 2);
    assert!(t.excepts[0].alias.is_some());
    assert!(t.excepts[1].ty.is_none());
    assert!(t.finally.is_some());
}

#[test]
fn match_statement() {
    let module = parse_clean(
        "def f(x: int) {\n    match x {\n        case 1 { print(\"one\"); }\n        case [a, b] { print(a); }\n        case other if other > 5 { print(other); }\n        case _ { print(\"any\"); }\n    }\n}",
    );
    let ElementStmt::Ability(f) = &module.body[0] else {
        panic!();
    };
    let Stmt::Match(m) = &f.body.as_ref().unwrap()[0] else {
        panic!();
    };
    assert_eq!(m.cases.len(), 4);
    assert!(matches!(m.cases[0].pattern, Pattern::Literal(_)));
    assert!(matches!(m.cases[1].pattern, Pattern::Sequence(..)));
    assert!(m.cases[2].guard.is_some());
    assert!(matches!(m.cases[3].pattern, Pattern::Wildcard(_)));
}

#[test]
fn chained_comparison_is_one_node() {
    let module = parse_clean("glob ok = 1 < x < 10;");
    let ElementStmt::GlobalVars(gv) = &module.body[0] else {
        panic!();
    };
    let Expr::Compare(cmp) = gv.vars[0].value.as_ref().unwrap() else {
        panic!("expected compare node");
    };
    assert_eq!(cmp.ops.len(), 2);
    assert_eq!(cmp.rights.len(), 2);
}

#[test]
fn precedence_power_right_assoc() {
    let module = parse_clean("glob v = 2 ** 3 ** 2;");
    let ElementStmt::GlobalVars(gv) = &module.body[0] else {
        panic!();
    };
    let Expr::Binary(outer) = gv.vars[0].value.as_ref().unwrap() else {
        panic!();
    };
    // Right side is itself 3 ** 2.
    assert!(matches!(outer.right.as_ref(), Expr::Binary(_)));
}

#[test]
fn ternary_and_bool_ops() {
    let module = parse_clean("glob v = a if x > 0 and y else b;");
    let ElementStmt::GlobalVars(gv) = &module.body[0] else {
        panic!();
    };
    assert!(matches!(
        gv.vars[0].value.as_ref().unwrap(),
        Expr::IfElse(_)
    ));
}

#[test]
fn trailer_chain_and_null_ok() {
    let module = parse_clean("glob v = a?.b.c(1, k=2)[0];");
    let ElementStmt::GlobalVars(gv) = &module.body[0] else {
        panic!();
    };
    let Expr::IndexSlice(idx) = gv.vars[0].value.as_ref().unwrap() else {
        panic!("expected index");
    };
    assert!(!idx.is_range);
    let Expr::FuncCall(call) = idx.target.as_ref() else {
        panic!("expected call");
    };
    assert_eq!(call.args.len(), 1);
    assert_eq!(call.kwargs.len(), 1);
}

#[test]
fn slices() {
    let module = parse_clean("glob v = xs[1:5:2];");
    let ElementStmt::GlobalVars(gv) = &module.body[0] else {
        panic!();
    };
    let Expr::IndexSlice(idx) = gv.vars[0].value.as_ref().unwrap() else {
        panic!();
    };
    assert!(idx.is_range);
    assert!(idx.start.is_some() && idx.stop.is_some() && idx.step.is_some());
}

#[test]
fn fstring_with_conversion_and_spec() {
    let module = parse_clean("glob s = f\"v={x!r:>8}\";");
    let ElementStmt::GlobalVars(gv) = &module.body[0] else {
        panic!();
    };
    let Expr::FString(fs) = gv.vars[0].value.as_ref().unwrap() else {
        panic!("expected fstring");
    };
    let FStringPart::Expr(fv) = &fs.parts[1] else {
        panic!("expected formatted value");
    };
    assert_eq!(fv.conversion, Some('r'));
    assert_eq!(fv.format_spec.as_deref(), Some(">8"));
}

#[test]
fn fstring_nested_braces() {
    let module = parse_clean("def msg(n: int) -> str { return f\"[{ {'k': n}['k'] }]\"; }");
    let ElementStmt::Ability(f) = &module.body[0] else {
        panic!();
    };
    let Stmt::Return(r) = &f.body.as_ref().unwrap()[0] else {
        panic!();
    };
    let Expr::FString(fs) = r.value.as_ref().unwrap() else {
        panic!();
    };
    let exprs = fs
        .parts
        .iter()
        .filter(|p| matches!(p, FStringPart::Expr(_)))
        .count();
    assert_eq!(exprs, 1);
}

#[test]
fn walrus_inside_parens_only() {
    let module = parse_clean("glob v = (n := 5);");
    let ElementStmt::GlobalVars(gv) = &module.body[0] else {
        panic!();
    };
    assert!(matches!(gv.vars[0].value.as_ref().unwrap(), Expr::Walrus(_)));

    // Outside parens it is a syntax error.
    let module = parse("def f() { n := 5; }");
    assert!(module.has_syntax_errors);
}

#[test]
fn lambda_expression() {
    let module = parse_clean("glob f = lambda a: int, b: int : a + b;");
    let ElementStmt::GlobalVars(gv) = &module.body[0] else {
        panic!();
    };
    let Expr::Lambda(lam) = gv.vars[0].value.as_ref().unwrap() else {
        panic!();
    };
    assert_eq!(lam.signature.params.len(), 2);
}

#[test]
fn multistring_concatenation() {
    let module = parse_clean("glob s = \"a\" \"b\" f\"c{d}\";");
    let ElementStmt::GlobalVars(gv) = &module.body[0] else {
        panic!();
    };
    let Expr::MultiString(ms) = gv.vars[0].value.as_ref().unwrap() else {
        panic!("expected multistring");
    };
    assert_eq!(ms.strings.len(), 3);
}

#[test]
fn comprehension_is_rejected_loudly() {
    let module = parse("glob xs = [x for x in ys];");
    assert!(module.has_syntax_errors);
    let module = parse("glob d = {k: v for k in ks};");
    assert!(module.has_syntax_errors);
}

#[test]
fn set_literal_is_rejected() {
    let module = parse("glob s = {1, 2};");
    assert!(module.has_syntax_errors);
}

#[test]
fn syntax_error_recovers_at_next_element() {
    let module = parse("obj Bad {{ }\nobj Good { has x: int = 1; }");
    assert!(module.has_syntax_errors);
    // The parser still sees the second archetype.
    assert!(module
        .body
        .iter()
        .any(|e| matches!(e, ElementStmt::Archetype(a) if a.name.value == "Good")));
}

#[test]
fn unterminated_triple_string_single_error_no_crash() {
    let src = Source::new("glob s = \"\"\"abc", "t.jac");
    let (module, errors) = Parser::new(&src, SourceId(0)).parse_module();
    assert!(module.has_syntax_errors || !errors.is_empty() || !module.body.is_empty());
}

#[test]
fn kwesc_name_usable_as_identifier() {
    let module = parse_clean("glob <>impl = 3;");
    let ElementStmt::GlobalVars(gv) = &module.body[0] else {
        panic!();
    };
    assert_eq!(gv.vars[0].name.value, "impl");
    assert!(gv.vars[0].name.is_kwesc);
}

#[test]
fn leaf_spans_cover_module_span() {
    let text = "obj Foo { has x: int = 1; }\n";
    let module = parse_clean(text);
    // Terminal tokens cover the module span up to whitespace gaps.
    let mut last_end = 0u32;
    for tok in &module.terminals {
        assert!(tok.span.start >= last_end);
        assert!(
            text[last_end as usize..tok.span.start as usize]
                .trim()
                .is_empty(),
            "non-whitespace gap between terminals"
        );
        last_end = tok.span.end;
    }
    assert!(text[last_end as usize..].trim().is_empty());
}

#[test]
fn assignment_chain_and_typed_assignment() {
    let module = parse_clean("def f() { a = b = 1; c: int = 2; d += 3; }");
    let ElementStmt::Ability(f) = &module.body[0] else {
        panic!();
    };
    let body = f.body.as_ref().unwrap();
    let Stmt::Assignment(chain) = &body[0] else {
        panic!();
    };
    assert_eq!(chain.targets.len(), 2);
    let Stmt::Assignment(typed) = &body[1] else {
        panic!();
    };
    assert!(typed.ty.is_some());
    let Stmt::Assignment(aug) = &body[2] else {
        panic!();
    };
    assert!(aug.aug_op.is_some());
}

#[test]
fn static_and_access_modifiers() {
    let module = parse_clean(
        "obj Box {\n    static has count: int = 0;\n    def :pub get() -> int { return 1; }\n}",
    );
    let ElementStmt::Archetype(arch) = &module.body[0] else {
        panic!();
    };
    let body = arch.body.as_ref().unwrap();
    let ArchItem::Has(has) = &body[0] else {
        panic!();
    };
    assert!(has.is_static);
    let ArchItem::Ability(ab) = &body[1] else {
        panic!();
    };
    assert_eq!(ab.access, Some(AccessTag::Pub));
}

#[test]
fn abstract_ability_without_body() {
    let module = parse_clean("obj Shape { def area() -> float abs; }");
    let ElementStmt::Archetype(arch) = &module.body[0] else {
        panic!();
    };
    let ArchItem::Ability(ab) = &arch.body.as_ref().unwrap()[0] else {
        panic!();
    };
    assert!(ab.is_abstract);
    assert!(ab.body.is_none());
}
