//! Host-AST generation: lower the unified tree into the host language.
//!
//! Translation contract highlights:
//! - archetypes become host classes with the `Obj` framework base appended;
//! - mutable field defaults (list/dict literals) are marked per-instance so
//!   construction re-evaluates them;
//! - `self` is inserted for methods whose authors omitted it;
//! - post-hoc impls become `_impl_<Target>_<member>` functions plus an
//!   attribute assignment emitted after all class definitions, so an impl
//!   may lexically precede its target;
//! - `with exit` bodies run after everything else in the module.

use crate::ast::{self as uni, ElementStmt, Expr, FStringPart, Pattern, Stmt};
use crate::diag::{Alert, AlertKind};
use crate::host::ast::*;
use crate::program::Program;
use crate::token::TokenKind;

use super::Pass;

pub struct HostGenPass;

impl Pass for HostGenPass {
    fn name(&self) -> &'static str {
        "HostGenPass"
    }

    fn run(&mut self, module: &mut uni::Module, prog: &mut Program) {
        // Syntax errors suppress generation; the pass still runs for
        // schedule consistency and leaves a stub.
        if module.has_syntax_errors {
            module.gen.host_ast = None;
            return;
        }

        let mut gen = Gen {
            alerts: Vec::new(),
            deferred: Vec::new(),
            exits: Vec::new(),
        };
        let mut body = Vec::new();
        for elem in &module.body {
            gen.element(elem, &mut body);
        }
        let mut body = weave_deferred(body, std::mem::take(&mut gen.deferred));
        for mut exit_body in gen.exits.drain(..) {
            body.append(&mut exit_body);
        }

        for alert in gen.alerts {
            prog.append_alert(alert);
        }
        module.gen.host_ast = Some(HostModule {
            name: module.name.clone(),
            doc: module.doc.as_ref().map(|d| d.value.clone()),
            body,
        });
    }
}

struct Gen {
    alerts: Vec<Alert>,
    /// Impl attribute assignments waiting for both their target class and
    /// their implementation function to be defined.
    deferred: Vec<DeferredAssign>,
    /// `with exit` bodies, emitted last.
    exits: Vec<Vec<HostStmt>>,
}

struct DeferredAssign {
    class_root: String,
    func_name: String,
    stmt: HostStmt,
}

/// Place each deferred impl assignment at the earliest point where both
/// its target class and its implementation function exist, so an impl may
/// appear on either side of its archetype.
fn weave_deferred(body: Vec<HostStmt>, mut deferred: Vec<DeferredAssign>) -> Vec<HostStmt> {
    if deferred.is_empty() {
        return body;
    }
    let mut out = Vec::with_capacity(body.len() + deferred.len());
    let mut classes: Vec<String> = Vec::new();
    let mut funcs: Vec<String> = Vec::new();
    for stmt in body {
        match &stmt {
            HostStmt::ClassDef { name, .. } | HostStmt::EnumDef { name, .. } => {
                classes.push(name.clone());
            }
            HostStmt::FuncDef { name, .. } => funcs.push(name.clone()),
            _ => {}
        }
        out.push(stmt);
        let mut i = 0;
        while i < deferred.len() {
            if classes.contains(&deferred[i].class_root) && funcs.contains(&deferred[i].func_name)
            {
                out.push(deferred.remove(i).stmt);
            } else {
                i += 1;
            }
        }
    }
    out.extend(deferred.into_iter().map(|d| d.stmt));
    out
}

impl Gen {
    fn element(&mut self, elem: &ElementStmt, out: &mut Vec<HostStmt>) {
        match elem {
            ElementStmt::Import(import) => self.import(import, out),
            ElementStmt::Archetype(arch) => out.push(self.archetype(arch)),
            ElementStmt::Enum(en) => out.push(HostStmt::EnumDef {
                name: en.name.value.clone(),
                members: en
                    .members
                    .iter()
                    .map(|m| (m.name.value.clone(), m.value.as_ref().map(|v| self.expr(v))))
                    .collect(),
                jac: Some(en.id.0),
            }),
            ElementStmt::Ability(ability) => {
                if let Some(stmt) = self.ability(ability, false) {
                    out.push(stmt);
                }
            }
            ElementStmt::Impl(im) => self.impl_def(im, out),
            ElementStmt::GlobalVars(gv) => {
                for var in &gv.vars {
                    if let Some(value) = &var.value {
                        out.push(HostStmt::Assign {
                            targets: vec![HostExpr::Name(var.name.value.clone())],
                            value: self.expr(value),
                            jac: Some(var.id.0),
                        });
                    }
                }
            }
            ElementStmt::Sem(_) => {}
            ElementStmt::Test(test) => {
                let body = self.body(&test.body);
                out.push(HostStmt::FuncDef {
                    name: format!("test_{}", test.name.value),
                    params: Vec::new(),
                    body,
                    returns: None,
                    jac: Some(test.id.0),
                });
            }
            ElementStmt::ModuleCode(code) => {
                let body = self.body(&code.body);
                if code.is_entry {
                    out.extend(body);
                } else {
                    self.exits.push(body);
                }
            }
            ElementStmt::Stmt(stmt) => {
                let lowered = self.stmt(stmt);
                out.extend(lowered);
            }
        }
    }

    fn import(&mut self, import: &uni::Import, out: &mut Vec<HostStmt>) {
        if let Some(from) = &import.from_path {
            out.push(HostStmt::ImportFrom {
                module: from.dotted(),
                names: import
                    .items
                    .iter()
                    .map(|item| {
                        (
                            item.name.value.clone(),
                            item.alias.as_ref().map(|a| a.value.clone()),
                        )
                    })
                    .collect(),
                reexport: false,
                jac: Some(import.id.0),
            });
            return;
        }
        for path in &import.paths {
            if import.is_include {
                // Absorbing import: every name re-exported at our scope.
                out.push(HostStmt::ImportFrom {
                    module: path.dotted(),
                    names: Vec::new(),
                    reexport: true,
                    jac: Some(import.id.0),
                });
            } else {
                out.push(HostStmt::Import {
                    module: path.dotted(),
                    alias: path.alias.as_ref().map(|a| a.value.clone()),
                    jac: Some(import.id.0),
                });
            }
        }
    }

    fn archetype(&mut self, arch: &uni::Archetype) -> HostStmt {
        let mut bases: Vec<String> = arch
            .bases
            .iter()
            .filter_map(|b| match b {
                Expr::Name(n) => Some(n.value.clone()),
                _ => None,
            })
            .collect();
        // The implementation-framework base class always closes the list.
        bases.push("Obj".to_string());

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        if let Some(items) = &arch.body {
            for item in items {
                self.arch_item(item, &mut fields, &mut methods);
            }
        }
        HostStmt::ClassDef {
            name: arch.name.value.clone(),
            bases,
            fields,
            body: methods,
            jac: Some(arch.id.0),
        }
    }

    fn arch_item(
        &mut self,
        item: &uni::ArchItem,
        fields: &mut Vec<HostField>,
        methods: &mut Vec<HostStmt>,
    ) {
        match item {
            uni::ArchItem::Has(has) => {
                for var in &has.vars {
                    let default = var.value.as_ref().map(|v| self.expr(v));
                    let per_instance = default
                        .as_ref()
                        .map(|d| d.is_mutable_literal())
                        .unwrap_or(false);
                    fields.push(HostField {
                        name: var.name.value.clone(),
                        annotation: annotation_text(&var.ty),
                        default,
                        per_instance,
                    });
                }
            }
            uni::ArchItem::Ability(ability) => {
                if let Some(stmt) = self.ability(ability, true) {
                    methods.push(stmt);
                }
            }
            uni::ArchItem::Nested(arch) => {
                methods.push(self.archetype(arch));
            }
        }
    }

    fn ability(&mut self, ability: &uni::Ability, in_class: bool) -> Option<HostStmt> {
        let body = match &ability.body {
            Some(body) => self.body(body),
            None => return None, // bodyless declaration awaits its impl
        };
        let params = self.params(&ability.signature, in_class && !ability.is_static);
        Some(HostStmt::FuncDef {
            name: ability.name.value.clone(),
            params,
            body,
            returns: ability.signature.return_ty.as_deref().and_then(annotation_text_opt),
            jac: Some(ability.id.0),
        })
    }

    /// Parameter list; `auto_self` inserts the receiver when the author
    /// did not write it.
    fn params(&mut self, sig: &uni::FuncSignature, auto_self: bool) -> Vec<HostParam> {
        let mut params: Vec<HostParam> = sig
            .params
            .iter()
            .map(|p| HostParam {
                name: p.name.value.clone(),
                annotation: p.ty.as_ref().and_then(annotation_text_opt),
                default: p.default.as_ref().map(|d| self.expr(d)),
                star: match p.star {
                    uni::ParamStar::None => HostStar::None,
                    uni::ParamStar::Args => HostStar::Args,
                    uni::ParamStar::Kwargs => HostStar::Kwargs,
                },
            })
            .collect();
        if auto_self && params.first().map(|p| p.name != "self").unwrap_or(true) {
            params.insert(
                0,
                HostParam {
                    name: "self".to_string(),
                    annotation: None,
                    default: None,
                    star: HostStar::None,
                },
            );
        }
        params
    }

    fn impl_def(&mut self, im: &uni::ImplDef, out: &mut Vec<HostStmt>) {
        let target_path: Vec<String> = im.target.iter().map(|t| t.value.clone()).collect();
        match im.kind {
            uni::ImplKind::Method => {
                let Some((member, container)) = target_path.split_last() else {
                    return;
                };
                if container.is_empty() {
                    self.alerts.push(Alert::new(
                        AlertKind::UnmatchedImpl,
                        format!("impl '{}' has no container", im.dotted_target()),
                        im.span,
                    ));
                    return;
                }
                let sig = im.signature.as_ref();
                let func_name = format!("_impl_{}_{}", container.join("_"), member);
                let params = match sig {
                    Some(sig) => self.params(sig, true),
                    None => self.params(&uni::FuncSignature::default(), true),
                };
                let body = self.body(&im.body);
                out.push(HostStmt::FuncDef {
                    name: func_name.clone(),
                    params,
                    body,
                    returns: sig.and_then(|s| s.return_ty.as_deref()).and_then(annotation_text_opt),
                    jac: Some(im.id.0),
                });
                self.deferred.push(DeferredAssign {
                    class_root: container[0].clone(),
                    func_name: func_name.clone(),
                    stmt: HostStmt::Assign {
                        targets: vec![attr_chain(container, member)],
                        value: HostExpr::Name(func_name),
                        jac: Some(im.id.0),
                    },
                });
            }
            uni::ImplKind::Obj => {
                for item in &im.members {
                    let uni::ArchItem::Ability(ability) = item else {
                        continue;
                    };
                    let Some(body) = &ability.body else { continue };
                    let func_name = format!(
                        "_impl_{}_{}",
                        target_path.join("_"),
                        ability.name.value
                    );
                    let params = self.params(&ability.signature, !ability.is_static);
                    let body = self.body(body);
                    out.push(HostStmt::FuncDef {
                        name: func_name.clone(),
                        params,
                        body,
                        returns: ability
                            .signature
                            .return_ty
                            .as_deref()
                            .and_then(annotation_text_opt),
                        jac: Some(ability.id.0),
                    });
                    self.deferred.push(DeferredAssign {
                        class_root: target_path[0].clone(),
                        func_name: func_name.clone(),
                        stmt: HostStmt::Assign {
                            targets: vec![attr_chain(&target_path, &ability.name.value)],
                            value: HostExpr::Name(func_name),
                            jac: Some(im.id.0),
                        },
                    });
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn body(&mut self, body: &[Stmt]) -> Vec<HostStmt> {
        let mut out = Vec::new();
        for stmt in body {
            out.extend(self.stmt(stmt));
        }
        out
    }

    fn stmt(&mut self, stmt: &Stmt) -> Vec<HostStmt> {
        match stmt {
            Stmt::If(s) => vec![self.if_stmt(s)],
            Stmt::While(s) => vec![HostStmt::While {
                cond: self.expr(&s.cond),
                body: self.body(&s.body),
                jac: None,
            }],
            Stmt::ForIn(s) => vec![HostStmt::For {
                target: self.expr(&s.target),
                iter: self.expr(&s.iter),
                body: self.body(&s.body),
                jac: None,
            }],
            Stmt::ForTo(s) => {
                // init; while cond { body; step; }
                let mut lowered = self.stmt(&s.init);
                let mut body = self.body(&s.body);
                body.extend(self.stmt(&s.step));
                lowered.push(HostStmt::While {
                    cond: self.expr(&s.cond),
                    body,
                    jac: None,
                });
                lowered
            }
            Stmt::Try(s) => vec![HostStmt::Try {
                body: self.body(&s.body),
                handlers: s
                    .excepts
                    .iter()
                    .map(|e| HostHandler {
                        ty: e.ty.as_ref().map(|t| self.expr(t)),
                        name: e.alias.as_ref().map(|a| a.value.clone()),
                        body: self.body(&e.body),
                    })
                    .collect(),
                finalbody: s.finally.as_ref().map(|f| self.body(f)).unwrap_or_default(),
                jac: None,
            }],
            Stmt::With(s) => vec![HostStmt::With {
                items: s
                    .items
                    .iter()
                    .map(|i| {
                        (
                            self.expr(&i.expr),
                            i.alias.as_ref().map(|a| a.value.clone()),
                        )
                    })
                    .collect(),
                body: self.body(&s.body),
                jac: None,
            }],
            Stmt::Raise(s) => vec![HostStmt::Raise {
                exc: s.exc.as_ref().map(|e| self.expr(e)),
                jac: None,
            }],
            Stmt::Assert(s) => vec![HostStmt::Assert {
                cond: self.expr(&s.cond),
                msg: s.msg.as_ref().map(|m| self.expr(m)),
                jac: None,
            }],
            Stmt::Delete(s) => vec![HostStmt::Delete {
                target: self.expr(&s.target),
                jac: None,
            }],
            Stmt::Return(s) => vec![HostStmt::Return {
                value: s.value.as_ref().map(|v| self.expr(v)),
                jac: None,
            }],
            Stmt::Yield(s) => vec![HostStmt::Yield {
                value: s.value.as_ref().map(|v| self.expr(v)),
                is_from: s.is_from,
                jac: None,
            }],
            Stmt::Ctrl(s) => vec![match s.kind {
                uni::CtrlKind::Break => HostStmt::Break,
                // `skip` advances the walker loop; in generated code both
                // map onto continue.
                uni::CtrlKind::Continue | uni::CtrlKind::Skip => HostStmt::Continue,
            }],
            Stmt::Match(s) => vec![HostStmt::Match {
                subject: self.expr(&s.subject),
                cases: s
                    .cases
                    .iter()
                    .map(|c| HostCase {
                        pattern: self.pattern(&c.pattern),
                        guard: c.guard.as_ref().map(|g| self.expr(g)),
                        body: self.body(&c.body),
                    })
                    .collect(),
                jac: None,
            }],
            Stmt::GlobalRef(s) => vec![HostStmt::Global {
                names: s.names.iter().map(|n| n.value.clone()).collect(),
            }],
            Stmt::Assignment(s) => {
                match (&s.value, s.aug_op) {
                    (Some(value), Some(op)) => vec![HostStmt::AugAssign {
                        target: self.expr(&s.targets[0]),
                        op: aug_op(op),
                        value: self.expr(value),
                        jac: Some(s.id.0),
                    }],
                    (Some(value), None) => vec![HostStmt::Assign {
                        targets: s.targets.iter().map(|t| self.expr(t)).collect(),
                        value: self.expr(value),
                        jac: Some(s.id.0),
                    }],
                    // A bare typed declaration has no runtime effect.
                    (None, _) => vec![HostStmt::Pass],
                }
            }
            Stmt::Expr(s) => vec![HostStmt::ExprStmt {
                value: self.expr(&s.expr),
                jac: None,
            }],
        }
    }

    fn if_stmt(&mut self, s: &uni::IfStmt) -> HostStmt {
        let orelse = match &s.else_body {
            Some(uni::ElseBranch::Elif(elif)) => vec![self.if_stmt(elif)],
            Some(uni::ElseBranch::Else(body)) => self.body(body),
            None => Vec::new(),
        };
        HostStmt::If {
            cond: self.expr(&s.cond),
            body: self.body(&s.body),
            orelse,
            jac: None,
        }
    }

    fn pattern(&mut self, pattern: &Pattern) -> HostPattern {
        match pattern {
            Pattern::Literal(e) => HostPattern::Literal(self.expr(e)),
            Pattern::Capture(i) => HostPattern::Capture(i.value.clone()),
            Pattern::Wildcard(_) => HostPattern::Wildcard,
            Pattern::Sequence(_, items) => {
                HostPattern::Sequence(items.iter().map(|p| self.pattern(p)).collect())
            }
            Pattern::Or(_, options) => {
                HostPattern::Or(options.iter().map(|p| self.pattern(p)).collect())
            }
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr(&mut self, expr: &Expr) -> HostExpr {
        match expr {
            Expr::Binary(e) => match e.op {
                // Pipe operators rewrite to calls.
                TokenKind::PipeFwd => HostExpr::Call {
                    func: Box::new(self.expr(&e.right)),
                    args: vec![self.expr(&e.left)],
                    kwargs: Vec::new(),
                },
                TokenKind::PipeBkwd => HostExpr::Call {
                    func: Box::new(self.expr(&e.left)),
                    args: vec![self.expr(&e.right)],
                    kwargs: Vec::new(),
                },
                op => HostExpr::BinOp {
                    op: bin_op(op),
                    left: Box::new(self.expr(&e.left)),
                    right: Box::new(self.expr(&e.right)),
                },
            },
            Expr::Unary(e) => HostExpr::UnaryOp {
                op: match e.op {
                    TokenKind::Minus => HostUnaryOp::Neg,
                    TokenKind::Plus => HostUnaryOp::Pos,
                    TokenKind::BwNot => HostUnaryOp::Invert,
                    _ => HostUnaryOp::Not,
                },
                operand: Box::new(self.expr(&e.operand)),
            },
            Expr::Bool(e) => HostExpr::BoolOp {
                op: if e.op == TokenKind::KwAnd {
                    HostBoolOp::And
                } else {
                    HostBoolOp::Or
                },
                values: e.values.iter().map(|v| self.expr(v)).collect(),
            },
            Expr::Compare(e) => HostExpr::Compare {
                left: Box::new(self.expr(&e.left)),
                ops: e.ops.iter().map(|op| cmp_op(*op)).collect(),
                comparators: e.rights.iter().map(|r| self.expr(r)).collect(),
            },
            Expr::IfElse(e) => HostExpr::IfExp {
                cond: Box::new(self.expr(&e.cond)),
                body: Box::new(self.expr(&e.value)),
                orelse: Box::new(self.expr(&e.else_value)),
            },
            Expr::Lambda(e) => HostExpr::Lambda {
                params: self.params(&e.signature, false),
                body: Box::new(self.expr(&e.body)),
            },
            Expr::Walrus(e) => HostExpr::NamedExpr {
                target: e.target.value.clone(),
                value: Box::new(self.expr(&e.value)),
            },
            Expr::FuncCall(e) => HostExpr::Call {
                func: Box::new(self.expr(&e.target)),
                args: e.args.iter().map(|a| self.expr(a)).collect(),
                kwargs: e
                    .kwargs
                    .iter()
                    .map(|kw| (kw.key.value.clone(), self.expr(&kw.value)))
                    .collect(),
            },
            Expr::AtomTrailer(e) => HostExpr::Attribute {
                target: Box::new(self.expr(&e.target)),
                attr: e.attr.value.clone(),
                null_ok: e.null_ok,
            },
            Expr::IndexSlice(e) => {
                let index = if e.is_range {
                    HostExpr::Slice {
                        start: e.start.as_ref().map(|s| Box::new(self.expr(s))),
                        stop: e.stop.as_ref().map(|s| Box::new(self.expr(s))),
                        step: e.step.as_ref().map(|s| Box::new(self.expr(s))),
                    }
                } else {
                    match e.start.as_ref() {
                        Some(key) => self.expr(key),
                        None => HostExpr::None_,
                    }
                };
                HostExpr::Subscript {
                    target: Box::new(self.expr(&e.target)),
                    index: Box::new(index),
                }
            }
            Expr::Tuple(e) => HostExpr::Tuple(e.items.iter().map(|i| self.expr(i)).collect()),
            Expr::List(e) => HostExpr::List(e.items.iter().map(|i| self.expr(i)).collect()),
            Expr::Dict(e) => HostExpr::Dict(
                e.pairs
                    .iter()
                    .map(|p| (p.key.as_ref().map(|k| self.expr(k)), self.expr(&p.value)))
                    .collect(),
            ),
            Expr::FString(e) => HostExpr::JoinedStr(
                e.parts
                    .iter()
                    .map(|part| match part {
                        FStringPart::Text(text) => HostExpr::Str(text.value.clone()),
                        FStringPart::Expr(fv) => HostExpr::FormattedValue {
                            value: Box::new(self.expr(&fv.value)),
                            conversion: fv.conversion,
                            format_spec: fv.format_spec.clone(),
                        },
                    })
                    .collect(),
            ),
            Expr::MultiString(e) => {
                // Adjacent literals join; any interpolated part makes the
                // whole thing a joined string.
                let mut parts = Vec::new();
                for s in &e.strings {
                    match self.expr(s) {
                        HostExpr::JoinedStr(inner) => parts.extend(inner),
                        other => parts.push(other),
                    }
                }
                if parts.iter().all(|p| matches!(p, HostExpr::Str(_))) {
                    let mut merged = String::new();
                    for p in parts {
                        if let HostExpr::Str(s) = p {
                            merged.push_str(&s);
                        }
                    }
                    HostExpr::Str(merged)
                } else {
                    HostExpr::JoinedStr(parts)
                }
            }
            Expr::Name(n) => HostExpr::Name(n.value.clone()),
            Expr::Int(n) => HostExpr::Int(n.value),
            Expr::Float(n) => HostExpr::Float(n.value),
            Expr::String(s) => HostExpr::Str(s.value.clone()),
            Expr::Bool_(b) => HostExpr::Bool(b.value),
            Expr::Null(_) => HostExpr::None_,
            Expr::Ellipsis(_) => HostExpr::Ellipsis,
            Expr::SpecialVar(sv) => HostExpr::Name(sv.var.as_str().to_string()),
            Expr::BuiltinType(b) => HostExpr::Name(b.name.clone()),
            Expr::AtomUnit(e) => self.expr(&e.value),
            Expr::Await(e) => self.expr(&e.value),
        }
    }
}

fn attr_chain(container: &[String], member: &str) -> HostExpr {
    let mut expr = HostExpr::Name(container[0].clone());
    for segment in &container[1..] {
        expr = HostExpr::Attribute {
            target: Box::new(expr),
            attr: segment.clone(),
            null_ok: false,
        };
    }
    HostExpr::Attribute {
        target: Box::new(expr),
        attr: member.to_string(),
        null_ok: false,
    }
}

fn bin_op(op: TokenKind) -> HostBinOp {
    match op {
        TokenKind::Plus => HostBinOp::Add,
        TokenKind::Minus => HostBinOp::Sub,
        TokenKind::StarMul => HostBinOp::Mul,
        TokenKind::Div => HostBinOp::Div,
        TokenKind::FloorDiv => HostBinOp::FloorDiv,
        TokenKind::Mod => HostBinOp::Mod,
        TokenKind::StarPow => HostBinOp::Pow,
        TokenKind::Lshift => HostBinOp::LShift,
        TokenKind::Rshift => HostBinOp::RShift,
        TokenKind::BwAnd => HostBinOp::BitAnd,
        TokenKind::BwOr => HostBinOp::BitOr,
        TokenKind::BwXor => HostBinOp::BitXor,
        _ => HostBinOp::Add,
    }
}

fn aug_op(op: TokenKind) -> HostBinOp {
    match op {
        TokenKind::AddEq => HostBinOp::Add,
        TokenKind::SubEq => HostBinOp::Sub,
        TokenKind::MulEq => HostBinOp::Mul,
        TokenKind::DivEq => HostBinOp::Div,
        TokenKind::ModEq => HostBinOp::Mod,
        TokenKind::FloorDivEq => HostBinOp::FloorDiv,
        TokenKind::StarPowEq => HostBinOp::Pow,
        TokenKind::LshiftEq => HostBinOp::LShift,
        TokenKind::RshiftEq => HostBinOp::RShift,
        TokenKind::BwAndEq => HostBinOp::BitAnd,
        TokenKind::BwOrEq => HostBinOp::BitOr,
        TokenKind::BwXorEq => HostBinOp::BitXor,
        _ => HostBinOp::Add,
    }
}

fn cmp_op(op: TokenKind) -> HostCmpOp {
    match op {
        TokenKind::Ee => HostCmpOp::Eq,
        TokenKind::Ne => HostCmpOp::NotEq,
        TokenKind::Lt => HostCmpOp::Lt,
        TokenKind::Lte => HostCmpOp::LtE,
        TokenKind::Gt => HostCmpOp::Gt,
        TokenKind::Gte => HostCmpOp::GtE,
        TokenKind::KwIn => HostCmpOp::In,
        TokenKind::KwNin => HostCmpOp::NotIn,
        TokenKind::KwIs => HostCmpOp::Is,
        TokenKind::KwIsn => HostCmpOp::IsNot,
        _ => HostCmpOp::Eq,
    }
}

fn annotation_text(expr: &Expr) -> Option<String> {
    annotation_text_opt(expr)
}

fn annotation_text_opt(expr: &Expr) -> Option<String> {
    match expr {
        Expr::BuiltinType(b) => Some(b.name.clone()),
        Expr::Name(n) => Some(n.value.clone()),
        Expr::IndexSlice(idx) => {
            let base = annotation_text_opt(&idx.target)?;
            let inner = idx.start.as_ref().and_then(|s| annotation_text_opt(s));
            Some(match inner {
                Some(p) => format!("{}[{}]", base, p),
                None => base,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::Pass as _;
    use crate::program::Program;
    use crate::source::Source;

    fn lower(text: &str) -> HostModule {
        let mut prog = Program::new();
        let src_id = prog.sources.add(Source::new(text, "t.jac"));
        let (mut module, errors) =
            crate::parser::Parser::new(prog.sources.get(src_id), src_id).parse_module();
        assert!(errors.is_empty(), "{:?}", errors);
        HostGenPass.run(&mut module, &mut prog);
        module.gen.host_ast.unwrap()
    }

    #[test]
    fn archetype_gets_framework_base() {
        let host = lower("obj Foo { has x: int = 0; }");
        let HostStmt::ClassDef { bases, fields, .. } = &host.body[0] else {
            panic!("expected class");
        };
        assert_eq!(bases.last().map(String::as_str), Some("Obj"));
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn mutable_default_is_per_instance() {
        let host = lower("obj C { has items: list[int] = [], n: int = 0; }");
        let HostStmt::ClassDef { fields, .. } = &host.body[0] else {
            panic!();
        };
        assert!(fields[0].per_instance);
        assert!(!fields[1].per_instance);
    }

    #[test]
    fn auto_self_inserted_for_methods() {
        let host = lower("obj A { def m(x: int) -> int { return x; } }");
        let HostStmt::ClassDef { body, .. } = &host.body[0] else {
            panic!();
        };
        let HostStmt::FuncDef { params, .. } = &body[0] else {
            panic!();
        };
        assert_eq!(params[0].name, "self");
        assert_eq!(params[1].name, "x");
    }

    #[test]
    fn explicit_self_not_duplicated() {
        let host = lower("obj A { def m(self, x: int) { return x; } }");
        let HostStmt::ClassDef { body, .. } = &host.body[0] else {
            panic!();
        };
        let HostStmt::FuncDef { params, .. } = &body[0] else {
            panic!();
        };
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn impl_emits_function_and_deferred_assignment() {
        let host = lower(
            "impl Foo { def get() -> int { return self.x; } }\nobj Foo { has x: int = 0; }",
        );
        // Function def comes first (in source position), class second,
        // the attribute assignment last.
        assert!(matches!(host.body[0], HostStmt::FuncDef { ref name, .. } if name == "_impl_Foo_get"));
        assert!(matches!(host.body[1], HostStmt::ClassDef { .. }));
        let HostStmt::Assign { targets, .. } = &host.body[2] else {
            panic!("expected deferred assignment last");
        };
        assert!(matches!(
            &targets[0],
            HostExpr::Attribute { attr, .. } if attr == "get"
        ));
    }

    #[test]
    fn with_exit_runs_last() {
        let host = lower("with exit { print(\"bye\"); }\nglob x = 1;");
        assert!(matches!(host.body[0], HostStmt::Assign { .. }));
        assert!(matches!(host.body[1], HostStmt::ExprStmt { .. }));
    }

    #[test]
    fn enum_lowered_with_members() {
        let host = lower("enum Color { RED = 1, GREEN }");
        let HostStmt::EnumDef { members, .. } = &host.body[0] else {
            panic!();
        };
        assert_eq!(members.len(), 2);
        assert!(members[0].1.is_some());
        assert!(members[1].1.is_none());
    }

    #[test]
    fn counted_for_lowered_to_while() {
        let host = lower("def f() { for i = 0 to i < 3 by i += 1 { print(i); } }");
        let HostStmt::FuncDef { body, .. } = &host.body[0] else {
            panic!();
        };
        assert!(matches!(body[0], HostStmt::Assign { .. }));
        let HostStmt::While { body: wbody, .. } = &body[1] else {
            panic!("expected while");
        };
        assert!(matches!(wbody.last(), Some(HostStmt::AugAssign { .. })));
    }

    #[test]
    fn include_reexports() {
        let host = lower("include base;");
        assert!(matches!(
            host.body[0],
            HostStmt::ImportFrom { reexport: true, .. }
        ));
    }

    #[test]
    fn syntax_errors_suppress_generation() {
        let mut prog = Program::new();
        let src_id = prog.sources.add(Source::new("obj {", "t.jac"));
        let (mut module, _) =
            crate::parser::Parser::new(prog.sources.get(src_id), src_id).parse_module();
        assert!(module.has_syntax_errors);
        HostGenPass.run(&mut module, &mut prog);
        assert!(module.gen.host_ast.is_none());
    }
}
