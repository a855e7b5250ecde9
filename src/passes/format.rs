//! The format schedule: optional auto-lint, document-IR build, comment
//! re-injection, and rendering.
//!
//! The doc IR is line-granular: statements become text runs separated by
//! newline/indent controls, each carrying an anchor back to its source
//! offset so captured comments can be spliced into the right gaps.

use crate::ast::*;
use crate::program::Program;
use crate::token::TokenKind;

use super::Pass;

/// Document-IR atoms.
#[derive(Clone, Debug, PartialEq)]
pub enum Doc {
    Text(String),
    Newline,
    Indent,
    Dedent,
    /// Source-offset anchor for comment injection.
    Anchor(u32),
}

// ---------------------------------------------------------------------
// Auto-lint
// ---------------------------------------------------------------------

/// Normalisations that are provably safe: unwrap doubled parentheses and
/// drop empty module-code blocks.
pub struct AutoLintPass;

impl Pass for AutoLintPass {
    fn name(&self) -> &'static str {
        "AutoLintPass"
    }

    fn run(&mut self, module: &mut Module, _prog: &mut Program) {
        module.body.retain(|elem| {
            !matches!(elem, ElementStmt::ModuleCode(mc) if mc.body.is_empty())
        });
        for elem in &mut module.body {
            if let ElementStmt::GlobalVars(gv) = elem {
                for var in &mut gv.vars {
                    if let Some(value) = &mut var.value {
                        unwrap_double_unit(value);
                    }
                }
            }
        }
    }
}

fn unwrap_double_unit(expr: &mut Expr) {
    loop {
        let doubled = matches!(
            expr,
            Expr::AtomUnit(unit) if matches!(unit.value.as_ref(), Expr::AtomUnit(_))
        );
        if !doubled {
            return;
        }
        let span = expr.span();
        if let Expr::AtomUnit(outer) = std::mem::replace(expr, Expr::Null(NullLit { span })) {
            *expr = *outer.value;
        }
    }
}

// ---------------------------------------------------------------------
// Doc-IR build
// ---------------------------------------------------------------------

pub struct DocIrGenPass;

impl Pass for DocIrGenPass {
    fn name(&self) -> &'static str {
        "DocIrGenPass"
    }

    fn run(&mut self, module: &mut Module, _prog: &mut Program) {
        let mut p = Printer { out: Vec::new() };
        if let Some(doc) = &module.doc {
            p.line(module.span.start, doc.text.clone());
        }
        for elem in &module.body {
            p.element(elem);
        }
        module.gen.doc_ir = Some(p.out);
    }
}

struct Printer {
    out: Vec<Doc>,
}

impl Printer {
    fn line(&mut self, anchor: u32, text: String) {
        self.out.push(Doc::Anchor(anchor));
        self.out.push(Doc::Text(text));
        self.out.push(Doc::Newline);
    }

    fn open(&mut self, anchor: u32, head: String) {
        self.out.push(Doc::Anchor(anchor));
        self.out.push(Doc::Text(format!("{head} {{")));
        self.out.push(Doc::Newline);
        self.out.push(Doc::Indent);
    }

    fn close(&mut self) {
        self.out.push(Doc::Dedent);
        self.out.push(Doc::Text("}".to_string()));
        self.out.push(Doc::Newline);
    }

    fn element(&mut self, elem: &ElementStmt) {
        match elem {
            ElementStmt::Import(import) => {
                if let Some(from) = &import.from_path {
                    let items = import
                        .items
                        .iter()
                        .map(|i| match &i.alias {
                            Some(a) => format!("{} as {}", i.name.value, a.value),
                            None => i.name.value.clone(),
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    self.line(
                        import.span.start,
                        format!("import from {} {{ {} }};", from.dotted(), items),
                    );
                } else {
                    let kw = if import.is_include { "include" } else { "import" };
                    let paths = import
                        .paths
                        .iter()
                        .map(|p| match &p.alias {
                            Some(a) => format!("{} as {}", p.dotted(), a.value),
                            None => p.dotted(),
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    self.line(import.span.start, format!("{kw} {paths};"));
                }
            }
            ElementStmt::Archetype(arch) => self.archetype(arch),
            ElementStmt::Enum(en) => {
                let members = en
                    .members
                    .iter()
                    .map(|m| match &m.value {
                        Some(v) => format!("{} = {}", m.name.value, expr_text(v)),
                        None => m.name.value.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                self.line(
                    en.span.start,
                    format!("enum {} {{ {} }}", en.name.value, members),
                );
            }
            ElementStmt::Ability(ability) => self.ability(ability),
            ElementStmt::Impl(im) => {
                match im.kind {
                    ImplKind::Method => {
                        let sig = im
                            .signature
                            .as_ref()
                            .map(signature_text)
                            .unwrap_or_default();
                        self.open(
                            im.span.start,
                            format!("impl {}{}", im.dotted_target(), sig),
                        );
                        for stmt in &im.body {
                            self.stmt(stmt);
                        }
                        self.close();
                    }
                    ImplKind::Obj => {
                        self.open(im.span.start, format!("impl {}", im.dotted_target()));
                        for member in &im.members {
                            self.arch_item(member);
                        }
                        self.close();
                    }
                }
            }
            ElementStmt::GlobalVars(gv) => {
                let vars = gv
                    .vars
                    .iter()
                    .map(glob_var_text)
                    .collect::<Vec<_>>()
                    .join(", ");
                self.line(gv.span.start, format!("glob {vars};"));
            }
            ElementStmt::Sem(sem) => {
                let target = sem
                    .target
                    .iter()
                    .map(|t| t.value.as_str())
                    .collect::<Vec<_>>()
                    .join(".");
                self.line(sem.span.start, format!("sem {} = {};", target, sem.value.text));
            }
            ElementStmt::Test(test) => {
                self.open(test.span.start, format!("test {}", test.name.value));
                for stmt in &test.body {
                    self.stmt(stmt);
                }
                self.close();
            }
            ElementStmt::ModuleCode(code) => {
                let kw = if code.is_entry { "entry" } else { "exit" };
                let name = code
                    .name
                    .as_ref()
                    .map(|n| format!(":{}", n.value))
                    .unwrap_or_default();
                self.open(code.span.start, format!("with {kw}{name}"));
                for stmt in &code.body {
                    self.stmt(stmt);
                }
                self.close();
            }
            ElementStmt::Stmt(stmt) => self.stmt(stmt),
        }
    }

    fn archetype(&mut self, arch: &Archetype) {
        let bases = if arch.bases.is_empty() {
            String::new()
        } else {
            format!(
                "({})",
                arch.bases
                    .iter()
                    .map(expr_text)
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        };
        match &arch.body {
            None => self.line(
                arch.span.start,
                format!("{} {}{};", arch.kind.as_str(), arch.name.value, bases),
            ),
            Some(items) => {
                self.open(
                    arch.span.start,
                    format!("{} {}{}", arch.kind.as_str(), arch.name.value, bases),
                );
                if let Some(doc) = &arch.doc {
                    self.line(doc.span.start, format!("{};", doc.text));
                }
                for item in items {
                    self.arch_item(item);
                }
                self.close();
            }
        }
    }

    fn arch_item(&mut self, item: &ArchItem) {
        match item {
            ArchItem::Has(has) => {
                let vars = has
                    .vars
                    .iter()
                    .map(|v| {
                        let mut s = format!("{}: {}", v.name.value, expr_text(&v.ty));
                        if let Some(value) = &v.value {
                            s.push_str(&format!(" = {}", expr_text(value)));
                        }
                        s
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                let prefix = if has.is_static { "static has" } else { "has" };
                self.line(has.span.start, format!("{prefix} {vars};"));
            }
            ArchItem::Ability(ability) => self.ability(ability),
            ArchItem::Nested(arch) => self.archetype(arch),
        }
    }

    fn ability(&mut self, ability: &Ability) {
        let kw = if ability.is_def { "def" } else { "can" };
        let head = format!(
            "{}{} {}{}",
            if ability.is_static { "static " } else { "" },
            kw,
            ability.name.value,
            signature_text(&ability.signature),
        );
        match &ability.body {
            None if ability.is_abstract => {
                self.line(ability.span.start, format!("{head} abs;"))
            }
            None => self.line(ability.span.start, format!("{head};")),
            Some(body) => {
                self.open(ability.span.start, head);
                if let Some(doc) = &ability.doc {
                    self.line(doc.span.start, format!("{};", doc.text));
                }
                for stmt in body {
                    self.stmt(stmt);
                }
                self.close();
            }
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::If(s) => self.if_stmt(s, "if"),
            Stmt::While(s) => {
                self.open(s.span.start, format!("while {}", expr_text(&s.cond)));
                for st in &s.body {
                    self.stmt(st);
                }
                self.close();
            }
            Stmt::ForIn(s) => {
                self.open(
                    s.span.start,
                    format!("for {} in {}", expr_text(&s.target), expr_text(&s.iter)),
                );
                for st in &s.body {
                    self.stmt(st);
                }
                self.close();
            }
            Stmt::ForTo(s) => {
                self.open(
                    s.span.start,
                    format!(
                        "for {} to {} by {}",
                        stmt_head_text(&s.init),
                        expr_text(&s.cond),
                        stmt_head_text(&s.step)
                    ),
                );
                for st in &s.body {
                    self.stmt(st);
                }
                self.close();
            }
            Stmt::Try(s) => {
                self.open(s.span.start, "try".to_string());
                for st in &s.body {
                    self.stmt(st);
                }
                self.close();
                for except in &s.excepts {
                    let head = match (&except.ty, &except.alias) {
                        (Some(ty), Some(alias)) => {
                            format!("except {} as {}", expr_text(ty), alias.value)
                        }
                        (Some(ty), None) => format!("except {}", expr_text(ty)),
                        _ => "except".to_string(),
                    };
                    self.open(except.span.start, head);
                    for st in &except.body {
                        self.stmt(st);
                    }
                    self.close();
                }
                if let Some(finally) = &s.finally {
                    self.open(s.span.start, "finally".to_string());
                    for st in finally {
                        self.stmt(st);
                    }
                    self.close();
                }
            }
            Stmt::With(s) => {
                let items = s
                    .items
                    .iter()
                    .map(|i| match &i.alias {
                        Some(a) => format!("{} as {}", expr_text(&i.expr), a.value),
                        None => expr_text(&i.expr),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                self.open(s.span.start, format!("with {items}"));
                for st in &s.body {
                    self.stmt(st);
                }
                self.close();
            }
            Stmt::Raise(s) => {
                let mut text = "raise".to_string();
                if let Some(exc) = &s.exc {
                    text.push_str(&format!(" {}", expr_text(exc)));
                }
                if let Some(from) = &s.from {
                    text.push_str(&format!(" from {}", expr_text(from)));
                }
                self.line(s.span.start, format!("{text};"));
            }
            Stmt::Assert(s) => {
                let mut text = format!("assert {}", expr_text(&s.cond));
                if let Some(msg) = &s.msg {
                    text.push_str(&format!(", {}", expr_text(msg)));
                }
                self.line(s.span.start, format!("{text};"));
            }
            Stmt::Delete(s) => {
                self.line(s.span.start, format!("del {};", expr_text(&s.target)))
            }
            Stmt::Return(s) => match &s.value {
                Some(v) => self.line(s.span.start, format!("return {};", expr_text(v))),
                None => self.line(s.span.start, "return;".to_string()),
            },
            Stmt::Yield(s) => {
                let kw = if s.is_from { "yield from" } else { "yield" };
                match &s.value {
                    Some(v) => self.line(s.span.start, format!("{kw} {};", expr_text(v))),
                    None => self.line(s.span.start, format!("{kw};")),
                }
            }
            Stmt::Ctrl(s) => {
                let kw = match s.kind {
                    CtrlKind::Break => "break",
                    CtrlKind::Continue => "continue",
                    CtrlKind::Skip => "skip",
                };
                self.line(s.span.start, format!("{kw};"));
            }
            Stmt::Match(s) => {
                self.open(s.span.start, format!("match {}", expr_text(&s.subject)));
                for case in &s.cases {
                    let guard = case
                        .guard
                        .as_ref()
                        .map(|g| format!(" if {}", expr_text(g)))
                        .unwrap_or_default();
                    self.open(
                        case.span.start,
                        format!("case {}{}", pattern_text(&case.pattern), guard),
                    );
                    for st in &case.body {
                        self.stmt(st);
                    }
                    self.close();
                }
                self.close();
            }
            Stmt::GlobalRef(s) => {
                let kw = match s.kind {
                    GlobalRefKind::Global => "global",
                    GlobalRefKind::Nonlocal => "nonlocal",
                };
                let names = s
                    .names
                    .iter()
                    .map(|n| n.value.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                self.line(s.span.start, format!("{kw} {names};"));
            }
            Stmt::Assignment(s) => {
                self.line(s.span.start, format!("{};", stmt_head_text(stmt)))
            }
            Stmt::Expr(s) => self.line(s.span.start, format!("{};", expr_text(&s.expr))),
        }
    }

    fn if_stmt(&mut self, s: &IfStmt, kw: &str) {
        self.open(s.span.start, format!("{} {}", kw, expr_text(&s.cond)));
        for st in &s.body {
            self.stmt(st);
        }
        self.close();
        match &s.else_body {
            Some(ElseBranch::Elif(elif)) => self.if_stmt(elif, "elif"),
            Some(ElseBranch::Else(body)) => {
                self.open(s.span.start, "else".to_string());
                for st in body {
                    self.stmt(st);
                }
                self.close();
            }
            None => {}
        }
    }
}

fn glob_var_text(v: &GlobVar) -> String {
    let mut s = v.name.value.clone();
    if let Some(ty) = &v.ty {
        s.push_str(&format!(": {}", expr_text(ty)));
    }
    if let Some(value) = &v.value {
        s.push_str(&format!(" = {}", expr_text(value)));
    }
    s
}

fn stmt_head_text(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Assignment(s) => {
            let targets = s
                .targets
                .iter()
                .map(expr_text)
                .collect::<Vec<_>>()
                .join(" = ");
            match (&s.ty, &s.value, s.aug_op) {
                (_, Some(v), Some(op)) => {
                    format!("{} {} {}", targets, aug_op_text(op), expr_text(v))
                }
                (Some(ty), Some(v), None) => {
                    format!("{}: {} = {}", targets, expr_text(ty), expr_text(v))
                }
                (Some(ty), None, None) => format!("{}: {}", targets, expr_text(ty)),
                (None, Some(v), None) => format!("{} = {}", targets, expr_text(v)),
                (None, None, _) => targets,
                (Some(_), None, Some(_)) => targets,
            }
        }
        Stmt::Expr(s) => expr_text(&s.expr),
        other => format!("<stmt@{}>", other.span().start),
    }
}

fn signature_text(sig: &FuncSignature) -> String {
    let params = sig
        .params
        .iter()
        .map(|p| {
            let mut s = match p.star {
                ParamStar::Args => format!("*{}", p.name.value),
                ParamStar::Kwargs => format!("**{}", p.name.value),
                ParamStar::None => p.name.value.clone(),
            };
            if let Some(ty) = &p.ty {
                s.push_str(&format!(": {}", expr_text(ty)));
            }
            if let Some(default) = &p.default {
                s.push_str(&format!(" = {}", expr_text(default)));
            }
            s
        })
        .collect::<Vec<_>>()
        .join(", ");
    let ret = sig
        .return_ty
        .as_ref()
        .map(|r| format!(" -> {}", expr_text(r)))
        .unwrap_or_default();
    format!("({params}){ret}")
}

fn pattern_text(pattern: &Pattern) -> String {
    match pattern {
        Pattern::Literal(e) => expr_text(e),
        Pattern::Capture(i) => i.value.clone(),
        Pattern::Wildcard(_) => "_".to_string(),
        Pattern::Sequence(_, items) => format!(
            "[{}]",
            items.iter().map(pattern_text).collect::<Vec<_>>().join(", ")
        ),
        Pattern::Or(_, options) => options
            .iter()
            .map(pattern_text)
            .collect::<Vec<_>>()
            .join(" | "),
    }
}

fn op_text(op: TokenKind) -> &'static str {
    match op {
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        TokenKind::StarMul => "*",
        TokenKind::Div => "/",
        TokenKind::FloorDiv => "//",
        TokenKind::Mod => "%",
        TokenKind::StarPow => "**",
        TokenKind::Lshift => "<<",
        TokenKind::Rshift => ">>",
        TokenKind::BwAnd => "&",
        TokenKind::BwOr => "|",
        TokenKind::BwXor => "^",
        TokenKind::BwNot => "~",
        TokenKind::Ee => "==",
        TokenKind::Ne => "!=",
        TokenKind::Lt => "<",
        TokenKind::Lte => "<=",
        TokenKind::Gt => ">",
        TokenKind::Gte => ">=",
        TokenKind::KwIn => "in",
        TokenKind::KwNin => "not in",
        TokenKind::KwIs => "is",
        TokenKind::KwIsn => "is not",
        TokenKind::KwAnd => "and",
        TokenKind::KwOr => "or",
        TokenKind::Not => "not",
        TokenKind::PipeFwd => "|>",
        TokenKind::PipeBkwd => "<|",
        _ => "?",
    }
}

fn aug_op_text(op: TokenKind) -> &'static str {
    match op {
        TokenKind::AddEq => "+=",
        TokenKind::SubEq => "-=",
        TokenKind::MulEq => "*=",
        TokenKind::DivEq => "/=",
        TokenKind::ModEq => "%=",
        TokenKind::FloorDivEq => "//=",
        TokenKind::StarPowEq => "**=",
        TokenKind::LshiftEq => "<<=",
        TokenKind::RshiftEq => ">>=",
        TokenKind::BwAndEq => "&=",
        TokenKind::BwOrEq => "|=",
        TokenKind::BwXorEq => "^=",
        _ => "=",
    }
}

pub(crate) fn expr_text(expr: &Expr) -> String {
    match expr {
        Expr::Binary(e) => format!(
            "{} {} {}",
            expr_text(&e.left),
            op_text(e.op),
            expr_text(&e.right)
        ),
        Expr::Unary(e) => match e.op {
            TokenKind::Not => format!("not {}", expr_text(&e.operand)),
            op => format!("{}{}", op_text(op), expr_text(&e.operand)),
        },
        Expr::Bool(e) => e
            .values
            .iter()
            .map(expr_text)
            .collect::<Vec<_>>()
            .join(&format!(" {} ", op_text(e.op))),
        Expr::Compare(e) => {
            let mut s = expr_text(&e.left);
            for (op, right) in e.ops.iter().zip(&e.rights) {
                s.push_str(&format!(" {} {}", op_text(*op), expr_text(right)));
            }
            s
        }
        Expr::IfElse(e) => format!(
            "{} if {} else {}",
            expr_text(&e.value),
            expr_text(&e.cond),
            expr_text(&e.else_value)
        ),
        Expr::Lambda(e) => {
            let sig = signature_text(&e.signature);
            let inner = sig.trim_start_matches('(').trim_end_matches(')');
            format!("lambda {} : {}", inner, expr_text(&e.body))
        }
        Expr::Walrus(e) => format!("({} := {})", e.target.value, expr_text(&e.value)),
        Expr::FuncCall(e) => {
            let mut args: Vec<String> = e.args.iter().map(expr_text).collect();
            args.extend(
                e.kwargs
                    .iter()
                    .map(|kw| format!("{}={}", kw.key.value, expr_text(&kw.value))),
            );
            format!("{}({})", expr_text(&e.target), args.join(", "))
        }
        Expr::AtomTrailer(e) => format!(
            "{}{}{}",
            expr_text(&e.target),
            if e.null_ok { "?." } else { "." },
            e.attr.value
        ),
        Expr::IndexSlice(e) => {
            if e.is_range {
                let part = |o: &Option<Box<Expr>>| {
                    o.as_ref().map(|x| expr_text(x)).unwrap_or_default()
                };
                let mut s = format!("{}[{}:{}", expr_text(&e.target), part(&e.start), part(&e.stop));
                if e.step.is_some() {
                    s.push_str(&format!(":{}", part(&e.step)));
                }
                s.push(']');
                s
            } else {
                format!(
                    "{}[{}]",
                    expr_text(&e.target),
                    e.start.as_ref().map(|s| expr_text(s)).unwrap_or_default()
                )
            }
        }
        Expr::Tuple(e) => format!(
            "({})",
            e.items.iter().map(expr_text).collect::<Vec<_>>().join(", ")
        ),
        Expr::List(e) => format!(
            "[{}]",
            e.items.iter().map(expr_text).collect::<Vec<_>>().join(", ")
        ),
        Expr::Dict(e) => format!(
            "{{{}}}",
            e.pairs
                .iter()
                .map(|p| match &p.key {
                    Some(k) => format!("{}: {}", expr_text(k), expr_text(&p.value)),
                    None => format!("**{}", expr_text(&p.value)),
                })
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Expr::FString(e) => {
            let quote = if e.triple { "\"\"\"" } else { "\"" };
            let prefix = if e.raw { "rf" } else { "f" };
            let mut s = format!("{prefix}{quote}");
            for part in &e.parts {
                match part {
                    FStringPart::Text(t) => s.push_str(&t.value.replace('{', "{{").replace('}', "}}")),
                    FStringPart::Expr(fv) => {
                        s.push('{');
                        s.push_str(&expr_text(&fv.value));
                        if let Some(conv) = fv.conversion {
                            s.push('!');
                            s.push(conv);
                        }
                        if let Some(spec) = &fv.format_spec {
                            s.push(':');
                            s.push_str(spec);
                        }
                        s.push('}');
                    }
                }
            }
            s.push_str(quote);
            s
        }
        Expr::MultiString(e) => e
            .strings
            .iter()
            .map(expr_text)
            .collect::<Vec<_>>()
            .join(" "),
        Expr::Name(n) => n.value.clone(),
        Expr::Int(n) => n.text.clone(),
        Expr::Float(n) => n.text.clone(),
        Expr::String(s) => s.text.clone(),
        Expr::Bool_(b) => if b.value { "True" } else { "False" }.to_string(),
        Expr::Null(_) => "None".to_string(),
        Expr::Ellipsis(_) => "...".to_string(),
        Expr::SpecialVar(sv) => sv.var.as_str().to_string(),
        Expr::BuiltinType(b) => b.name.clone(),
        Expr::AtomUnit(e) => format!("({})", expr_text(&e.value)),
        Expr::Await(e) => format!("await {}", expr_text(&e.value)),
    }
}

// ---------------------------------------------------------------------
// Comment injection
// ---------------------------------------------------------------------

pub struct CommentInjectionPass;

impl Pass for CommentInjectionPass {
    fn name(&self) -> &'static str {
        "CommentInjectionPass"
    }

    fn run(&mut self, module: &mut Module, _prog: &mut Program) {
        let Some(doc_ir) = module.gen.doc_ir.take() else {
            return;
        };
        let mut comments = module.comments.clone();
        comments.sort_by_key(|c| c.span.start);
        let mut comment_iter = comments.into_iter().peekable();

        let mut out = Vec::with_capacity(doc_ir.len());
        for doc in doc_ir {
            if let Doc::Anchor(offset) = doc {
                while let Some(comment) = comment_iter.peek() {
                    if comment.span.start < offset {
                        out.push(Doc::Text(comment.text.clone()));
                        out.push(Doc::Newline);
                        comment_iter.next();
                    } else {
                        break;
                    }
                }
            }
            out.push(doc);
        }
        // Trailing comments after the last statement.
        for comment in comment_iter {
            out.push(Doc::Text(comment.text));
            out.push(Doc::Newline);
        }
        module.gen.doc_ir = Some(out);
    }
}

// ---------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------

pub struct FormatPass;

impl Pass for FormatPass {
    fn name(&self) -> &'static str {
        "FormatPass"
    }

    fn run(&mut self, module: &mut Module, _prog: &mut Program) {
        let Some(doc_ir) = &module.gen.doc_ir else {
            return;
        };
        let mut out = String::new();
        let mut indent = 0usize;
        let mut at_line_start = true;
        for doc in doc_ir {
            match doc {
                Doc::Text(text) => {
                    if at_line_start {
                        out.push_str(&"    ".repeat(indent));
                        at_line_start = false;
                    }
                    out.push_str(text);
                }
                Doc::Newline => {
                    out.push('\n');
                    at_line_start = true;
                }
                Doc::Indent => indent += 1,
                Doc::Dedent => indent = indent.saturating_sub(1),
                Doc::Anchor(_) => {}
            }
        }
        module.gen.formatted = Some(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::Pass as _;
    use crate::program::Program;
    use crate::source::Source;

    fn format(text: &str, auto_lint: bool) -> String {
        let mut prog = Program::new();
        let src_id = prog.sources.add(Source::new(text, "t.jac"));
        let (mut module, errors) =
            crate::parser::Parser::new(prog.sources.get(src_id), src_id).parse_module();
        assert!(errors.is_empty(), "{:?}", errors);
        if auto_lint {
            AutoLintPass.run(&mut module, &mut prog);
        }
        DocIrGenPass.run(&mut module, &mut prog);
        CommentInjectionPass.run(&mut module, &mut prog);
        FormatPass.run(&mut module, &mut prog);
        module.gen.formatted.unwrap()
    }

    #[test]
    fn formats_archetype_with_indentation() {
        let out = format("obj Foo{has x:int=1;def m(){return self.x;}}", false);
        assert!(out.contains("obj Foo {"));
        assert!(out.contains("    has x: int = 1;"));
        assert!(out.contains("    def m() {"));
        assert!(out.contains("        return self.x;"));
    }

    #[test]
    fn comments_are_reinjected_in_order() {
        let out = format("# leading\nglob x = 1;\n# trailing\n", false);
        let lead = out.find("# leading").unwrap();
        let glob = out.find("glob x = 1;").unwrap();
        let trail = out.find("# trailing").unwrap();
        assert!(lead < glob && glob < trail);
    }

    #[test]
    fn auto_lint_drops_empty_module_code() {
        let out = format("with entry { }\nglob x = 1;", true);
        assert!(!out.contains("with entry"));
        assert!(out.contains("glob x = 1;"));
    }

    #[test]
    fn auto_lint_unwraps_double_parens() {
        let out = format("glob x = ((1 + 2));", true);
        assert!(out.contains("glob x = (1 + 2);"));
    }

    #[test]
    fn format_is_idempotent() {
        let once = format("obj A{has x:int=1;}", false);
        let twice = format(&once, false);
        assert_eq!(once, twice);
    }

    #[test]
    fn fstring_round_trips_escaped_braces() {
        let out = format("glob s = f\"a{{b}}c{d}\";", false);
        assert!(out.contains("f\"a{{b}}c{d}\""));
    }
}
