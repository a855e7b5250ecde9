//! Semantic analysis: resolve name references to symbols, and flag
//! constructs that are syntactically valid but semantically wrong
//! (`self` outside a method, `return` outside an ability).

use crate::ast::*;
use crate::diag::{Alert, AlertKind};
use crate::program::Program;
use crate::symtab::{ScopeId, SymbolTable};

use super::Pass;

pub struct SemanticAnalysisPass;

impl Pass for SemanticAnalysisPass {
    fn name(&self) -> &'static str {
        "SemanticAnalysisPass"
    }

    fn run(&mut self, module: &mut Module, prog: &mut Program) {
        let Some(st) = module.sym_tab.take() else {
            prog.append_alert(Alert::new(
                AlertKind::InternalError,
                "semantic analysis requires a symbol table",
                module.span,
            ));
            return;
        };

        let mut ctx = Sema {
            st: &st,
            alerts: Vec::new(),
            in_method: false,
            in_ability: false,
        };
        let root = st.root();
        for elem in &mut module.body {
            ctx.visit_element(elem, root);
        }
        for alert in ctx.alerts {
            prog.append_alert(alert);
        }
        module.sym_tab = Some(st);
    }
}

struct Sema<'a> {
    st: &'a SymbolTable,
    alerts: Vec<Alert>,
    in_method: bool,
    in_ability: bool,
}

impl<'a> Sema<'a> {
    fn child_scope_of(&self, scope: ScopeId, name: &str) -> ScopeId {
        self.st
            .lookup_local(scope, name)
            .and_then(|sym| self.st.symbol(sym).child_scope)
            .unwrap_or(scope)
    }

    fn visit_element(&mut self, elem: &mut ElementStmt, scope: ScopeId) {
        match elem {
            ElementStmt::Archetype(arch) => {
                let child = self.child_scope_of(scope, &arch.name.value);
                for base in &mut arch.bases {
                    self.visit_expr(base, scope);
                }
                if let Some(items) = &mut arch.body {
                    for item in items {
                        self.visit_arch_item(item, child);
                    }
                }
            }
            ElementStmt::Enum(en) => {
                let child = self.child_scope_of(scope, &en.name.value);
                for member in &mut en.members {
                    if let Some(value) = &mut member.value {
                        self.visit_expr(value, child);
                    }
                }
            }
            ElementStmt::Ability(ability) => {
                self.visit_ability(ability, scope, false);
            }
            ElementStmt::Impl(im) => {
                let mangled = format!("impl.{}.{}.{}", im.dotted_target(), im.origin.0, im.id.0);
                let child = self.child_scope_of(scope, &mangled);
                let was_method = self.in_method;
                self.in_method = true;
                for item in &mut im.members {
                    self.visit_arch_item(item, child);
                }
                let was_ability = self.in_ability;
                self.in_ability = true;
                for stmt in &mut im.body {
                    self.visit_stmt(stmt, child);
                }
                self.in_ability = was_ability;
                self.in_method = was_method;
            }
            ElementStmt::GlobalVars(gv) => {
                for var in &mut gv.vars {
                    if let Some(value) = &mut var.value {
                        self.visit_expr(value, scope);
                    }
                }
            }
            ElementStmt::Sem(_) => {}
            ElementStmt::Test(test) => {
                let mangled = format!("test.{}", test.name.value);
                let child = self.child_scope_of(scope, &mangled);
                let was = self.in_ability;
                self.in_ability = true;
                for stmt in &mut test.body {
                    self.visit_stmt(stmt, child);
                }
                self.in_ability = was;
            }
            ElementStmt::ModuleCode(code) => {
                for stmt in &mut code.body {
                    self.visit_stmt(stmt, scope);
                }
            }
            ElementStmt::Stmt(stmt) => self.visit_stmt(stmt, scope),
            ElementStmt::Import(_) => {}
        }
    }

    fn visit_arch_item(&mut self, item: &mut ArchItem, scope: ScopeId) {
        match item {
            ArchItem::Has(has) => {
                for var in &mut has.vars {
                    self.visit_expr(&mut var.ty, scope);
                    if let Some(value) = &mut var.value {
                        self.visit_expr(value, scope);
                    }
                }
            }
            ArchItem::Ability(ability) => self.visit_ability(ability, scope, true),
            ArchItem::Nested(arch) => {
                let child = self.child_scope_of(scope, &arch.name.value);
                if let Some(items) = &mut arch.body {
                    for item in items {
                        self.visit_arch_item(item, child);
                    }
                }
            }
        }
    }

    fn visit_ability(&mut self, ability: &mut Ability, scope: ScopeId, is_method: bool) {
        let child = self.child_scope_of(scope, &ability.name.value);
        for param in &mut ability.signature.params {
            if let Some(ty) = &mut param.ty {
                self.visit_expr(ty, scope);
            }
            if let Some(default) = &mut param.default {
                self.visit_expr(default, scope);
            }
        }
        if let Some(ret) = &mut ability.signature.return_ty {
            self.visit_expr(ret, scope);
        }
        let (was_method, was_ability) = (self.in_method, self.in_ability);
        self.in_method = is_method;
        self.in_ability = true;
        if let Some(body) = &mut ability.body {
            for stmt in body {
                self.visit_stmt(stmt, child);
            }
        }
        self.in_method = was_method;
        self.in_ability = was_ability;
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt, scope: ScopeId) {
        match stmt {
            Stmt::If(s) => self.visit_if(s, scope),
            Stmt::While(s) => {
                self.visit_expr(&mut s.cond, scope);
                self.visit_body(&mut s.body, scope);
            }
            Stmt::ForIn(s) => {
                self.visit_expr(&mut s.target, scope);
                self.visit_expr(&mut s.iter, scope);
                self.visit_body(&mut s.body, scope);
            }
            Stmt::ForTo(s) => {
                self.visit_stmt(&mut s.init, scope);
                self.visit_expr(&mut s.cond, scope);
                self.visit_stmt(&mut s.step, scope);
                self.visit_body(&mut s.body, scope);
            }
            Stmt::Try(s) => {
                self.visit_body(&mut s.body, scope);
                for except in &mut s.excepts {
                    if let Some(ty) = &mut except.ty {
                        self.visit_expr(ty, scope);
                    }
                    self.visit_body(&mut except.body, scope);
                }
                if let Some(finally) = &mut s.finally {
                    self.visit_body(finally, scope);
                }
            }
            Stmt::With(s) => {
                for item in &mut s.items {
                    self.visit_expr(&mut item.expr, scope);
                }
                self.visit_body(&mut s.body, scope);
            }
            Stmt::Raise(s) => {
                if let Some(exc) = &mut s.exc {
                    self.visit_expr(exc, scope);
                }
                if let Some(from) = &mut s.from {
                    self.visit_expr(from, scope);
                }
            }
            Stmt::Assert(s) => {
                self.visit_expr(&mut s.cond, scope);
                if let Some(msg) = &mut s.msg {
                    self.visit_expr(msg, scope);
                }
            }
            Stmt::Delete(s) => self.visit_expr(&mut s.target, scope),
            Stmt::Return(s) => {
                if !self.in_ability {
                    self.alerts.push(Alert::new(
                        AlertKind::Warning,
                        "return outside of an ability",
                        s.span,
                    ));
                }
                if let Some(value) = &mut s.value {
                    self.visit_expr(value, scope);
                }
            }
            Stmt::Yield(s) => {
                if let Some(value) = &mut s.value {
                    self.visit_expr(value, scope);
                }
            }
            Stmt::Ctrl(_) => {}
            Stmt::Match(s) => {
                self.visit_expr(&mut s.subject, scope);
                for case in &mut s.cases {
                    if let Some(guard) = &mut case.guard {
                        self.visit_expr(guard, scope);
                    }
                    self.visit_body(&mut case.body, scope);
                }
            }
            Stmt::GlobalRef(_) => {}
            Stmt::Assignment(s) => {
                for target in &mut s.targets {
                    self.visit_expr(target, scope);
                }
                if let Some(ty) = &mut s.ty {
                    self.visit_expr(ty, scope);
                }
                if let Some(value) = &mut s.value {
                    self.visit_expr(value, scope);
                }
            }
            Stmt::Expr(s) => self.visit_expr(&mut s.expr, scope),
        }
    }

    fn visit_if(&mut self, s: &mut IfStmt, scope: ScopeId) {
        self.visit_expr(&mut s.cond, scope);
        self.visit_body(&mut s.body, scope);
        match &mut s.else_body {
            Some(ElseBranch::Elif(elif)) => self.visit_if(elif, scope),
            Some(ElseBranch::Else(body)) => self.visit_body(body, scope),
            None => {}
        }
    }

    fn visit_body(&mut self, body: &mut [Stmt], scope: ScopeId) {
        for stmt in body {
            self.visit_stmt(stmt, scope);
        }
    }

    fn visit_expr(&mut self, expr: &mut Expr, scope: ScopeId) {
        match expr {
            Expr::Name(ident) => {
                // Locals are created at runtime; only link what the table
                // already knows.
                if ident.sym.is_none() {
                    ident.sym = self.st.lookup(scope, &ident.value);
                }
            }
            Expr::SpecialVar(sv) => {
                if sv.var == SpecialVar::SelfRef && !self.in_method {
                    self.alerts.push(Alert::new(
                        AlertKind::Warning,
                        "'self' used outside of a method",
                        sv.span,
                    ));
                }
            }
            Expr::Binary(e) => {
                self.visit_expr(&mut e.left, scope);
                self.visit_expr(&mut e.right, scope);
            }
            Expr::Unary(e) => self.visit_expr(&mut e.operand, scope),
            Expr::Bool(e) => {
                for v in &mut e.values {
                    self.visit_expr(v, scope);
                }
            }
            Expr::Compare(e) => {
                self.visit_expr(&mut e.left, scope);
                for r in &mut e.rights {
                    self.visit_expr(r, scope);
                }
            }
            Expr::IfElse(e) => {
                self.visit_expr(&mut e.value, scope);
                self.visit_expr(&mut e.cond, scope);
                self.visit_expr(&mut e.else_value, scope);
            }
            Expr::Lambda(e) => self.visit_expr(&mut e.body, scope),
            Expr::Walrus(e) => self.visit_expr(&mut e.value, scope),
            Expr::FuncCall(e) => {
                self.visit_expr(&mut e.target, scope);
                for a in &mut e.args {
                    self.visit_expr(a, scope);
                }
                for kw in &mut e.kwargs {
                    self.visit_expr(&mut kw.value, scope);
                }
            }
            Expr::AtomTrailer(e) => self.visit_expr(&mut e.target, scope),
            Expr::IndexSlice(e) => {
                self.visit_expr(&mut e.target, scope);
                if let Some(s) = &mut e.start {
                    self.visit_expr(s, scope);
                }
                if let Some(s) = &mut e.stop {
                    self.visit_expr(s, scope);
                }
                if let Some(s) = &mut e.step {
                    self.visit_expr(s, scope);
                }
            }
            Expr::Tuple(e) => {
                for item in &mut e.items {
                    self.visit_expr(item, scope);
                }
            }
            Expr::List(e) => {
                for item in &mut e.items {
                    self.visit_expr(item, scope);
                }
            }
            Expr::Dict(e) => {
                for pair in &mut e.pairs {
                    if let Some(k) = &mut pair.key {
                        self.visit_expr(k, scope);
                    }
                    self.visit_expr(&mut pair.value, scope);
                }
            }
            Expr::FString(e) => {
                for part in &mut e.parts {
                    if let FStringPart::Expr(fv) = part {
                        self.visit_expr(&mut fv.value, scope);
                    }
                }
            }
            Expr::MultiString(e) => {
                for s in &mut e.strings {
                    self.visit_expr(s, scope);
                }
            }
            Expr::AtomUnit(e) => self.visit_expr(&mut e.value, scope),
            Expr::Await(e) => self.visit_expr(&mut e.value, scope),
            Expr::Int(_)
            | Expr::Float(_)
            | Expr::String(_)
            | Expr::Bool_(_)
            | Expr::Null(_)
            | Expr::Ellipsis(_)
            | Expr::BuiltinType(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::decl_impl::DeclImplMatchPass;
    use crate::passes::sym_tab_build::SymTabBuildPass;
    use crate::passes::Pass as _;
    use crate::program::Program;
    use crate::source::Source;

    fn analyze(text: &str) -> (Module, Program) {
        let mut prog = Program::new();
        let src_id = prog.sources.add(Source::new(text, "t.jac"));
        let (mut module, errors) =
            crate::parser::Parser::new(prog.sources.get(src_id), src_id).parse_module();
        for e in errors {
            prog.append_alert(e);
        }
        SymTabBuildPass.run(&mut module, &mut prog);
        DeclImplMatchPass.run(&mut module, &mut prog);
        SemanticAnalysisPass.run(&mut module, &mut prog);
        (module, prog)
    }

    #[test]
    fn name_references_link_to_symbols() {
        let (module, _) = analyze("glob base = 10;\ndef f() -> int { return base; }");
        let ElementStmt::Ability(f) = &module.body[1] else {
            panic!();
        };
        let Stmt::Return(r) = &f.body.as_ref().unwrap()[0] else {
            panic!();
        };
        let Expr::Name(name) = r.value.as_ref().unwrap() else {
            panic!();
        };
        assert!(name.sym.is_some());
    }

    #[test]
    fn self_outside_method_is_flagged() {
        let (_, prog) = analyze("def f() { return self; }");
        assert!(prog
            .warnings_had
            .iter()
            .any(|a| a.message.contains("'self'")));
    }

    #[test]
    fn self_inside_method_is_fine() {
        let (_, prog) = analyze("obj A { has x: int = 1; def g() { return self.x; } }");
        assert!(!prog
            .warnings_had
            .iter()
            .any(|a| a.message.contains("'self'")));
    }

    #[test]
    fn unknown_names_are_left_unlinked() {
        let (module, prog) = analyze("def f() { return later_local; }");
        let ElementStmt::Ability(f) = &module.body[0] else {
            panic!();
        };
        let Stmt::Return(r) = &f.body.as_ref().unwrap()[0] else {
            panic!();
        };
        let Expr::Name(name) = r.value.as_ref().unwrap() else {
            panic!();
        };
        assert!(name.sym.is_none());
        assert!(prog.errors_had.is_empty());
    }
}
