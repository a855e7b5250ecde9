//! Tree-walking evaluator for compiled host modules.
//!
//! Containers and objects use shared references so mutation through one
//! binding is visible through every alias, matching the semantics the code
//! generator assumes (fresh per-instance defaults, post-hoc method
//! injection via class attribute assignment).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::ast::*;
use super::code::CodeObject;

pub type Namespace = Rc<RefCell<HashMap<String, Value>>>;

/// A raised error travelling up the interpreter stack.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: String,
    pub message: String,
    pub payload: Option<Value>,
}

impl RuntimeError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError {
            kind: kind.into(),
            message: message.into(),
            payload: None,
        }
    }
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RuntimeError {}

type RunResult<T> = Result<T, RuntimeError>;

#[derive(Clone, Debug)]
pub enum FieldDefault {
    /// Evaluated once at class-definition time and shared.
    Shared(Value),
    /// Re-evaluated per construction (wrapped mutable literal).
    Factory(HostExpr),
}

#[derive(Debug)]
pub struct ClassObj {
    pub name: String,
    pub bases: Vec<Rc<RefCell<ClassObj>>>,
    pub fields: Vec<(String, Option<FieldDefault>)>,
    pub dict: HashMap<String, Value>,
    pub globals: Namespace,
    pub is_enum: bool,
}

#[derive(Debug)]
pub struct Instance {
    pub class: Rc<RefCell<ClassObj>>,
    pub fields: HashMap<String, Value>,
}

#[derive(Debug)]
pub struct FuncObj {
    pub name: String,
    pub params: Vec<HostParam>,
    pub body: Vec<HostStmt>,
    pub globals: Namespace,
    pub is_generator: bool,
}

#[derive(Clone, Debug)]
pub enum Value {
    None_,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<String>),
    List(Rc<RefCell<Vec<Value>>>),
    Tuple(Rc<Vec<Value>>),
    Dict(Rc<RefCell<Vec<(Value, Value)>>>),
    Range(i64, i64, i64),
    Class(Rc<RefCell<ClassObj>>),
    Instance(Rc<RefCell<Instance>>),
    Func(Rc<FuncObj>),
    Bound(Rc<FuncObj>, Rc<RefCell<Instance>>),
    Module(Namespace),
    Builtin(&'static str),
    Ellipsis,
}

impl Value {
    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(Rc::new(s.into()))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None_ => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Range(..) => "range",
            Value::Class(_) => "type",
            Value::Instance(_) => "object",
            Value::Func(_) | Value::Bound(..) | Value::Builtin(_) => "function",
            Value::Module(_) => "module",
            Value::Ellipsis => "ellipsis",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None_ => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(v) => !v.borrow().is_empty(),
            Value::Tuple(v) => !v.is_empty(),
            Value::Dict(d) => !d.borrow().is_empty(),
            _ => true,
        }
    }

    /// Structural equality for primitives and containers, identity for
    /// instances and functions.
    pub fn eq_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None_, Value::None_) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.eq_value(y))
            }
            (Value::Tuple(a), Value::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.eq_value(y))
            }
            (Value::Dict(a), Value::Dict(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter().all(|(k, v)| {
                        b.iter().any(|(k2, v2)| k.eq_value(k2) && v.eq_value(v2))
                    })
            }
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None_, Value::None_) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Value::None_ => "None".into(),
            Value::Bool(b) => if *b { "True" } else { "False" }.into(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    format!("{:.1}", f)
                } else {
                    format!("{}", f)
                }
            }
            Value::Str(s) => s.as_ref().clone(),
            Value::List(v) => {
                let parts: Vec<String> = v.borrow().iter().map(|x| x.repr()).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Tuple(v) => {
                let parts: Vec<String> = v.iter().map(|x| x.repr()).collect();
                if parts.len() == 1 {
                    format!("({},)", parts[0])
                } else {
                    format!("({})", parts.join(", "))
                }
            }
            Value::Dict(d) => {
                let parts: Vec<String> = d
                    .borrow()
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Range(a, b, s) => format!("range({}, {}, {})", a, b, s),
            Value::Class(c) => format!("<class '{}'>", c.borrow().name),
            Value::Instance(i) => {
                let inst = i.borrow();
                let class = inst.class.borrow();
                let mut parts = Vec::new();
                for (fname, _) in &class.fields {
                    if let Some(v) = inst.fields.get(fname) {
                        parts.push(format!("{}={}", fname, v.repr()));
                    }
                }
                format!("{}({})", class.name, parts.join(", "))
            }
            Value::Func(f) => format!("<function {}>", f.name),
            Value::Bound(f, _) => format!("<bound method {}>", f.name),
            Value::Module(_) => "<module>".into(),
            Value::Builtin(name) => format!("<builtin {}>", name),
            Value::Ellipsis => "Ellipsis".into(),
        }
    }

    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            _ => self.display(),
        }
    }
}

/// Control-flow signal from statement execution.
enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

struct Frame {
    locals: HashMap<String, Value>,
    globals: Namespace,
    global_names: Vec<String>,
    /// Sink for values produced by `yield` (eagerly collected generators).
    yielded: Option<Vec<Value>>,
}

/// Loads a code object for `import` statements.
pub type ModuleLoader<'a> = Box<dyn FnMut(&str) -> Option<CodeObject> + 'a>;

pub struct Interp<'a> {
    /// Captured `print` output; the runtime never writes to stdout itself.
    pub output: Vec<String>,
    loader: Option<ModuleLoader<'a>>,
    module_cache: HashMap<String, Namespace>,
}

impl<'a> Default for Interp<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Interp<'a> {
    pub fn new() -> Self {
        Interp {
            output: Vec::new(),
            loader: None,
            module_cache: HashMap::new(),
        }
    }

    pub fn with_loader(loader: ModuleLoader<'a>) -> Self {
        Interp {
            output: Vec::new(),
            loader: Some(loader),
            module_cache: HashMap::new(),
        }
    }

    /// Execute a code object into a fresh namespace and return it.
    pub fn exec(&mut self, code: &CodeObject) -> RunResult<HashMap<String, Value>> {
        let globals: Namespace = Rc::new(RefCell::new(HashMap::new()));
        self.exec_into(code, globals.clone())?;
        let result = globals.borrow().clone();
        Ok(result)
    }

    /// Execute a code object into the provided namespace.
    pub fn exec_into(&mut self, code: &CodeObject, globals: Namespace) -> RunResult<()> {
        let mut frame = Frame {
            locals: HashMap::new(),
            globals: globals.clone(),
            global_names: Vec::new(),
            yielded: None,
        };
        for stmt in &code.module.body {
            match self.exec_stmt(stmt, &mut frame, true)? {
                Flow::Normal => {}
                _ => break,
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn exec_block(&mut self, body: &[HostStmt], frame: &mut Frame) -> RunResult<Flow> {
        for stmt in body {
            match self.exec_stmt(stmt, frame, false)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(
        &mut self,
        stmt: &HostStmt,
        frame: &mut Frame,
        at_module: bool,
    ) -> RunResult<Flow> {
        match stmt {
            HostStmt::ClassDef {
                name,
                bases,
                fields,
                body,
                ..
            } => {
                let class = self.build_class(name, bases, fields, body, frame)?;
                self.bind(frame, at_module, name, Value::Class(class));
                Ok(Flow::Normal)
            }
            HostStmt::EnumDef { name, members, .. } => {
                let class = self.build_enum(name, members, frame)?;
                self.bind(frame, at_module, name, Value::Class(class));
                Ok(Flow::Normal)
            }
            HostStmt::FuncDef {
                name, params, body, ..
            } => {
                let func = FuncObj {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    globals: frame.globals.clone(),
                    is_generator: body_contains_yield(body),
                };
                self.bind(frame, at_module, name, Value::Func(Rc::new(func)));
                Ok(Flow::Normal)
            }
            HostStmt::Assign { targets, value, .. } => {
                let value = self.eval(value, frame)?;
                for target in targets {
                    self.assign(target, value.clone(), frame, at_module)?;
                }
                Ok(Flow::Normal)
            }
            HostStmt::AugAssign {
                target, op, value, ..
            } => {
                let current = self.eval(target, frame)?;
                let rhs = self.eval(value, frame)?;
                let result = self.binop(*op, &current, &rhs)?;
                self.assign(target, result, frame, at_module)?;
                Ok(Flow::Normal)
            }
            HostStmt::ExprStmt { value, .. } => {
                self.eval(value, frame)?;
                Ok(Flow::Normal)
            }
            HostStmt::If {
                cond, body, orelse, ..
            } => {
                if self.eval(cond, frame)?.is_truthy() {
                    self.exec_block(body, frame)
                } else {
                    self.exec_block(orelse, frame)
                }
            }
            HostStmt::While { cond, body, .. } => {
                while self.eval(cond, frame)?.is_truthy() {
                    match self.exec_block(body, frame)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        _ => {}
                    }
                }
                Ok(Flow::Normal)
            }
            HostStmt::For {
                target, iter, body, ..
            } => {
                let iter_value = self.eval(iter, frame)?;
                let items = self.iterate(&iter_value)?;
                for item in items {
                    self.assign(target, item, frame, at_module)?;
                    match self.exec_block(body, frame)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        _ => {}
                    }
                }
                Ok(Flow::Normal)
            }
            HostStmt::Return { value, .. } => {
                let v = match value {
                    Some(e) => self.eval(e, frame)?,
                    None => Value::None_,
                };
                Ok(Flow::Return(v))
            }
            HostStmt::Yield { value, is_from, .. } => {
                let v = match value {
                    Some(e) => self.eval(e, frame)?,
                    None => Value::None_,
                };
                let sink = frame.yielded.get_or_insert_with(Vec::new);
                if *is_from {
                    let items = match &v {
                        Value::List(l) => l.borrow().clone(),
                        Value::Tuple(t) => t.as_ref().clone(),
                        other => {
                            return Err(RuntimeError::new(
                                "TypeError",
                                format!("cannot delegate yield to {}", other.type_name()),
                            ))
                        }
                    };
                    sink.extend(items);
                } else {
                    sink.push(v);
                }
                Ok(Flow::Normal)
            }
            HostStmt::Break => Ok(Flow::Break),
            HostStmt::Continue => Ok(Flow::Continue),
            HostStmt::Try {
                body,
                handlers,
                finalbody,
                ..
            } => {
                let result = self.exec_block(body, frame);
                let flow = match result {
                    Ok(flow) => Ok(flow),
                    Err(err) => {
                        let mut handled = None;
                        for handler in handlers {
                            if self.handler_matches(handler, &err, frame)? {
                                if let Some(name) = &handler.name {
                                    let payload = err
                                        .payload
                                        .clone()
                                        .unwrap_or_else(|| Value::str(err.message.clone()));
                                    frame.locals.insert(name.clone(), payload);
                                }
                                handled = Some(self.exec_block(&handler.body, frame)?);
                                break;
                            }
                        }
                        match handled {
                            Some(flow) => Ok(flow),
                            None => Err(err),
                        }
                    }
                };
                // finally runs on every path.
                let fin = self.exec_block(finalbody, frame)?;
                match fin {
                    Flow::Normal => flow,
                    other => Ok(other),
                }
            }
            HostStmt::Raise { exc, .. } => {
                let (kind, message, payload) = match exc {
                    Some(e) => {
                        let v = self.eval(e, frame)?;
                        match &v {
                            // A called exception builtin produced a tagged
                            // (kind, message) pair.
                            Value::Tuple(t)
                                if t.len() == 3
                                    && matches!(t[0], Value::Builtin("__exc__")) =>
                            {
                                let kind = t[1].display();
                                let message = t[2].display();
                                (kind, message.clone(), Some(Value::str(message)))
                            }
                            Value::Instance(i) => {
                                let kind = i.borrow().class.borrow().name.clone();
                                (kind.clone(), kind, Some(v.clone()))
                            }
                            Value::Class(c) => {
                                let kind = c.borrow().name.clone();
                                (kind.clone(), kind, Some(v.clone()))
                            }
                            Value::Builtin(b) => {
                                let kind = b.to_string();
                                (kind.clone(), kind, None)
                            }
                            Value::Str(s) => {
                                (s.as_ref().clone(), s.as_ref().clone(), Some(v.clone()))
                            }
                            other => {
                                let kind = other.type_name().to_string();
                                (kind.clone(), kind, Some(v.clone()))
                            }
                        }
                    }
                    None => (
                        "RuntimeError".to_string(),
                        "RuntimeError".to_string(),
                        None,
                    ),
                };
                let mut err = RuntimeError::new(kind, message);
                err.payload = payload;
                Err(err)
            }
            HostStmt::Assert { cond, msg, .. } => {
                if !self.eval(cond, frame)?.is_truthy() {
                    let message = match msg {
                        Some(m) => self.eval(m, frame)?.display(),
                        None => "assertion failed".to_string(),
                    };
                    return Err(RuntimeError::new("AssertionError", message));
                }
                Ok(Flow::Normal)
            }
            HostStmt::Delete { target, .. } => {
                match target {
                    HostExpr::Name(name) => {
                        if frame.locals.remove(name).is_none() {
                            frame.globals.borrow_mut().remove(name);
                        }
                    }
                    HostExpr::Subscript { target, index } => {
                        let container = self.eval(target, frame)?;
                        let key = self.eval(index, frame)?;
                        match container {
                            Value::List(l) => {
                                let idx = self.index_for(&key, l.borrow().len())?;
                                l.borrow_mut().remove(idx);
                            }
                            Value::Dict(d) => {
                                d.borrow_mut().retain(|(k, _)| !k.eq_value(&key));
                            }
                            other => {
                                return Err(RuntimeError::new(
                                    "TypeError",
                                    format!("cannot delete from {}", other.type_name()),
                                ))
                            }
                        }
                    }
                    HostExpr::Attribute { target, attr, .. } => {
                        let obj = self.eval(target, frame)?;
                        if let Value::Instance(i) = obj {
                            i.borrow_mut().fields.remove(attr);
                        }
                    }
                    _ => {
                        return Err(RuntimeError::new("TypeError", "invalid delete target"));
                    }
                }
                Ok(Flow::Normal)
            }
            HostStmt::Global { names } => {
                frame.global_names.extend(names.iter().cloned());
                Ok(Flow::Normal)
            }
            HostStmt::Import { module, alias, .. } => {
                let ns = self.load_module(module)?;
                let bind_name = alias.clone().unwrap_or_else(|| {
                    module
                        .split('.')
                        .next_back()
                        .unwrap_or(module.as_str())
                        .to_string()
                });
                self.bind(frame, at_module, &bind_name, Value::Module(ns));
                Ok(Flow::Normal)
            }
            HostStmt::ImportFrom {
                module,
                names,
                reexport,
                ..
            } => {
                let ns = self.load_module(module)?;
                if *reexport && names.is_empty() {
                    // `include`: every name lands in the importer's scope.
                    let entries: Vec<(String, Value)> = ns
                        .borrow()
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect();
                    for (k, v) in entries {
                        self.bind(frame, at_module, &k, v);
                    }
                } else {
                    for (name, alias) in names {
                        let value = ns.borrow().get(name).cloned().ok_or_else(|| {
                            RuntimeError::new(
                                "ImportError",
                                format!("cannot import '{}' from '{}'", name, module),
                            )
                        })?;
                        let bind_name = alias.clone().unwrap_or_else(|| name.clone());
                        self.bind(frame, at_module, &bind_name, value);
                    }
                }
                Ok(Flow::Normal)
            }
            HostStmt::With { items, body, .. } => {
                // Context protocol is reduced to evaluate-and-bind.
                for (expr, alias) in items {
                    let v = self.eval(expr, frame)?;
                    if let Some(name) = alias {
                        self.bind(frame, at_module, name, v);
                    }
                }
                self.exec_block(body, frame)
            }
            HostStmt::Match { subject, cases, .. } => {
                let subject = self.eval(subject, frame)?;
                for case in cases {
                    let mut bindings = Vec::new();
                    if self.pattern_matches(&case.pattern, &subject, frame, &mut bindings)? {
                        for (name, value) in bindings {
                            self.bind(frame, at_module, &name, value);
                        }
                        if let Some(guard) = &case.guard {
                            if !self.eval(guard, frame)?.is_truthy() {
                                continue;
                            }
                        }
                        return self.exec_block(&case.body, frame);
                    }
                }
                Ok(Flow::Normal)
            }
            HostStmt::Pass => Ok(Flow::Normal),
        }
    }

    fn handler_matches(
        &mut self,
        handler: &HostHandler,
        err: &RuntimeError,
        frame: &mut Frame,
    ) -> RunResult<bool> {
        let Some(ty) = &handler.ty else {
            return Ok(true); // bare except
        };
        let expected = match self.eval(ty, frame) {
            Ok(Value::Class(c)) => c.borrow().name.clone(),
            Ok(Value::Str(s)) => s.as_ref().clone(),
            Ok(Value::Builtin(name)) => name.to_string(),
            Ok(_) | Err(_) => match ty {
                HostExpr::Name(n) => n.clone(),
                _ => return Ok(false),
            },
        };
        Ok(expected == err.kind || expected == "Exception")
    }

    fn pattern_matches(
        &mut self,
        pattern: &HostPattern,
        subject: &Value,
        frame: &mut Frame,
        bindings: &mut Vec<(String, Value)>,
    ) -> RunResult<bool> {
        match pattern {
            HostPattern::Wildcard => Ok(true),
            HostPattern::Capture(name) => {
                bindings.push((name.clone(), subject.clone()));
                Ok(true)
            }
            HostPattern::Literal(expr) => {
                let expected = self.eval(expr, frame)?;
                Ok(expected.eq_value(subject))
            }
            HostPattern::Sequence(items) => {
                let values = match subject {
                    Value::List(l) => l.borrow().clone(),
                    Value::Tuple(t) => t.as_ref().clone(),
                    _ => return Ok(false),
                };
                if values.len() != items.len() {
                    return Ok(false);
                }
                for (p, v) in items.iter().zip(values.iter()) {
                    if !self.pattern_matches(p, v, frame, bindings)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            HostPattern::Or(options) => {
                for p in options {
                    if self.pattern_matches(p, subject, frame, bindings)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn bind(&mut self, frame: &mut Frame, at_module: bool, name: &str, value: Value) {
        if at_module || frame.global_names.iter().any(|n| n == name) {
            frame.globals.borrow_mut().insert(name.to_string(), value);
        } else {
            frame.locals.insert(name.to_string(), value);
        }
    }

    fn assign(
        &mut self,
        target: &HostExpr,
        value: Value,
        frame: &mut Frame,
        at_module: bool,
    ) -> RunResult<()> {
        match target {
            HostExpr::Name(name) => {
                self.bind(frame, at_module, name, value);
                Ok(())
            }
            HostExpr::Tuple(items) | HostExpr::List(items) => {
                let values = self.iterate(&value)?;
                if values.len() != items.len() {
                    return Err(RuntimeError::new(
                        "ValueError",
                        format!(
                            "cannot unpack {} values into {} targets",
                            values.len(),
                            items.len()
                        ),
                    ));
                }
                for (t, v) in items.iter().zip(values) {
                    self.assign(t, v, frame, at_module)?;
                }
                Ok(())
            }
            HostExpr::Attribute { target, attr, .. } => {
                let obj = self.eval(target, frame)?;
                match obj {
                    Value::Instance(i) => {
                        i.borrow_mut().fields.insert(attr.clone(), value);
                        Ok(())
                    }
                    Value::Class(c) => {
                        c.borrow_mut().dict.insert(attr.clone(), value);
                        Ok(())
                    }
                    Value::Module(ns) => {
                        ns.borrow_mut().insert(attr.clone(), value);
                        Ok(())
                    }
                    other => Err(RuntimeError::new(
                        "AttributeError",
                        format!("cannot set attribute on {}", other.type_name()),
                    )),
                }
            }
            HostExpr::Subscript { target, index } => {
                let container = self.eval(target, frame)?;
                let key = self.eval(index, frame)?;
                match container {
                    Value::List(l) => {
                        let len = l.borrow().len();
                        let idx = self.index_for(&key, len)?;
                        l.borrow_mut()[idx] = value;
                        Ok(())
                    }
                    Value::Dict(d) => {
                        let mut d = d.borrow_mut();
                        if let Some(slot) = d.iter_mut().find(|(k, _)| k.eq_value(&key)) {
                            slot.1 = value;
                        } else {
                            d.push((key, value));
                        }
                        Ok(())
                    }
                    other => Err(RuntimeError::new(
                        "TypeError",
                        format!("{} does not support item assignment", other.type_name()),
                    )),
                }
            }
            _ => Err(RuntimeError::new("SyntaxError", "invalid assignment target")),
        }
    }

    // ------------------------------------------------------------------
    // Classes and enums
    // ------------------------------------------------------------------

    fn build_class(
        &mut self,
        name: &str,
        bases: &[String],
        fields: &[HostField],
        body: &[HostStmt],
        frame: &mut Frame,
    ) -> RunResult<Rc<RefCell<ClassObj>>> {
        let mut base_classes = Vec::new();
        for base in bases {
            match self.load_name(base, frame) {
                Ok(Value::Class(c)) => base_classes.push(c),
                // The implementation-framework base (`Obj`) and the enum
                // base are ambient builtins, not user classes.
                Ok(_) | Err(_) if base == "Obj" || base == "Enum" => {}
                Ok(other) => {
                    return Err(RuntimeError::new(
                        "TypeError",
                        format!("base '{}' is {} not a class", base, other.type_name()),
                    ))
                }
                Err(e) => return Err(e),
            }
        }

        let mut slots: Vec<(String, Option<FieldDefault>)> = Vec::new();
        for field in fields {
            let default = match &field.default {
                None => None,
                Some(expr) if field.per_instance => Some(FieldDefault::Factory(expr.clone())),
                Some(expr) => Some(FieldDefault::Shared(self.eval(expr, frame)?)),
            };
            slots.push((field.name.clone(), default));
        }

        let class = Rc::new(RefCell::new(ClassObj {
            name: name.to_string(),
            bases: base_classes,
            fields: slots,
            dict: HashMap::new(),
            globals: frame.globals.clone(),
            is_enum: false,
        }));

        // Class body: method defs and class-level assignments.
        let mut class_frame = Frame {
            locals: HashMap::new(),
            globals: frame.globals.clone(),
            global_names: Vec::new(),
            yielded: None,
        };
        for stmt in body {
            self.exec_stmt(stmt, &mut class_frame, false)?;
        }
        class.borrow_mut().dict.extend(class_frame.locals);
        Ok(class)
    }

    fn build_enum(
        &mut self,
        name: &str,
        members: &[(String, Option<HostExpr>)],
        frame: &mut Frame,
    ) -> RunResult<Rc<RefCell<ClassObj>>> {
        let class = Rc::new(RefCell::new(ClassObj {
            name: name.to_string(),
            bases: Vec::new(),
            fields: Vec::new(),
            dict: HashMap::new(),
            globals: frame.globals.clone(),
            is_enum: true,
        }));
        let mut auto = 1i64;
        for (member, value) in members {
            let v = match value {
                Some(e) => {
                    let v = self.eval(e, frame)?;
                    if let Value::Int(n) = &v {
                        auto = n + 1;
                    }
                    v
                }
                None => {
                    let v = Value::Int(auto);
                    auto += 1;
                    v
                }
            };
            class.borrow_mut().dict.insert(member.clone(), v);
        }
        Ok(class)
    }

    fn construct(
        &mut self,
        class: &Rc<RefCell<ClassObj>>,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> RunResult<Value> {
        if class.borrow().is_enum {
            return Err(RuntimeError::new("TypeError", "cannot instantiate an enum"));
        }
        // Field order: base fields first, then own, first occurrence wins.
        let mut field_slots: Vec<(String, Option<FieldDefault>)> = Vec::new();
        collect_fields(class, &mut field_slots);

        let globals = class.borrow().globals.clone();
        let mut fields = HashMap::new();
        for (i, (fname, default)) in field_slots.iter().enumerate() {
            let mut value = None;
            if i < args.len() {
                value = Some(args[i].clone());
            }
            if let Some((_, v)) = kwargs.iter().find(|(k, _)| k == fname) {
                value = Some(v.clone());
            }
            let value = match value {
                Some(v) => v,
                None => match default {
                    Some(FieldDefault::Shared(v)) => v.clone(),
                    Some(FieldDefault::Factory(expr)) => {
                        let mut f = Frame {
                            locals: HashMap::new(),
                            globals: globals.clone(),
                            global_names: Vec::new(),
                            yielded: None,
                        };
                        self.eval(expr, &mut f)?
                    }
                    None => {
                        return Err(RuntimeError::new(
                            "TypeError",
                            format!(
                                "missing value for field '{}' of {}",
                                fname,
                                class.borrow().name
                            ),
                        ))
                    }
                },
            };
            fields.insert(fname.clone(), value);
        }
        if args.len() > field_slots.len() {
            return Err(RuntimeError::new(
                "TypeError",
                format!("too many arguments for {}", class.borrow().name),
            ));
        }

        let instance = Rc::new(RefCell::new(Instance {
            class: class.clone(),
            fields,
        }));
        // Post-construction hook, if declared.
        if let Some(postinit) = lookup_class_attr(class, "postinit") {
            if let Value::Func(f) = postinit {
                self.call_function(&f, vec![], vec![], Some(instance.clone()))?;
            }
        }
        Ok(Value::Instance(instance))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn eval(&mut self, expr: &HostExpr, frame: &mut Frame) -> RunResult<Value> {
        match expr {
            HostExpr::Int(n) => Ok(Value::Int(*n)),
            HostExpr::Float(f) => Ok(Value::Float(*f)),
            HostExpr::Str(s) => Ok(Value::str(s.clone())),
            HostExpr::Bool(b) => Ok(Value::Bool(*b)),
            HostExpr::None_ => Ok(Value::None_),
            HostExpr::Ellipsis => Ok(Value::Ellipsis),
            HostExpr::Name(name) => self.load_name(name, frame),
            HostExpr::Attribute { target, attr, null_ok } => {
                let obj = self.eval(target, frame)?;
                if *null_ok && matches!(obj, Value::None_) {
                    return Ok(Value::None_);
                }
                self.get_attr(&obj, attr)
            }
            HostExpr::Subscript { target, index } => {
                let container = self.eval(target, frame)?;
                match index.as_ref() {
                    HostExpr::Slice { start, stop, step } => {
                        let start = self.eval_opt(start, frame)?;
                        let stop = self.eval_opt(stop, frame)?;
                        let step = self.eval_opt(step, frame)?;
                        self.slice(&container, start, stop, step)
                    }
                    _ => {
                        let key = self.eval(index, frame)?;
                        self.subscript(&container, &key)
                    }
                }
            }
            HostExpr::Slice { .. } => Err(RuntimeError::new(
                "SyntaxError",
                "slice outside subscript",
            )),
            HostExpr::Call { func, args, kwargs } => {
                let callee = self.eval(func, frame)?;
                let mut arg_values = Vec::new();
                for a in args {
                    arg_values.push(self.eval(a, frame)?);
                }
                let mut kw_values = Vec::new();
                for (k, v) in kwargs {
                    kw_values.push((k.clone(), self.eval(v, frame)?));
                }
                self.call(&callee, arg_values, kw_values)
            }
            HostExpr::BinOp { op, left, right } => {
                let l = self.eval(left, frame)?;
                let r = self.eval(right, frame)?;
                self.binop(*op, &l, &r)
            }
            HostExpr::UnaryOp { op, operand } => {
                let v = self.eval(operand, frame)?;
                match op {
                    HostUnaryOp::Not => Ok(Value::Bool(!v.is_truthy())),
                    HostUnaryOp::Neg => match v {
                        Value::Int(n) => Ok(Value::Int(-n)),
                        Value::Float(f) => Ok(Value::Float(-f)),
                        other => Err(RuntimeError::new(
                            "TypeError",
                            format!("bad operand for unary -: {}", other.type_name()),
                        )),
                    },
                    HostUnaryOp::Pos => Ok(v),
                    HostUnaryOp::Invert => match v {
                        Value::Int(n) => Ok(Value::Int(!n)),
                        other => Err(RuntimeError::new(
                            "TypeError",
                            format!("bad operand for unary ~: {}", other.type_name()),
                        )),
                    },
                }
            }
            HostExpr::BoolOp { op, values } => {
                let mut last = Value::Bool(matches!(op, HostBoolOp::And));
                for v in values {
                    last = self.eval(v, frame)?;
                    match op {
                        HostBoolOp::And if !last.is_truthy() => return Ok(last),
                        HostBoolOp::Or if last.is_truthy() => return Ok(last),
                        _ => {}
                    }
                }
                Ok(last)
            }
            HostExpr::Compare {
                left,
                ops,
                comparators,
            } => {
                let mut lhs = self.eval(left, frame)?;
                for (op, rhs_expr) in ops.iter().zip(comparators) {
                    let rhs = self.eval(rhs_expr, frame)?;
                    if !self.compare(*op, &lhs, &rhs)? {
                        return Ok(Value::Bool(false));
                    }
                    lhs = rhs;
                }
                Ok(Value::Bool(true))
            }
            HostExpr::IfExp { cond, body, orelse } => {
                if self.eval(cond, frame)?.is_truthy() {
                    self.eval(body, frame)
                } else {
                    self.eval(orelse, frame)
                }
            }
            HostExpr::Lambda { params, body } => {
                let func = FuncObj {
                    name: "<lambda>".into(),
                    params: params.clone(),
                    body: vec![HostStmt::Return {
                        value: Some(body.as_ref().clone()),
                        jac: None,
                    }],
                    globals: frame.globals.clone(),
                    is_generator: false,
                };
                Ok(Value::Func(Rc::new(func)))
            }
            HostExpr::List(items) => {
                let mut out = Vec::new();
                for item in items {
                    out.push(self.eval(item, frame)?);
                }
                Ok(Value::list(out))
            }
            HostExpr::Tuple(items) => {
                let mut out = Vec::new();
                for item in items {
                    out.push(self.eval(item, frame)?);
                }
                Ok(Value::Tuple(Rc::new(out)))
            }
            HostExpr::Dict(pairs) => {
                let mut out = Vec::new();
                for (key, value) in pairs {
                    match key {
                        Some(k) => {
                            let k = self.eval(k, frame)?;
                            let v = self.eval(value, frame)?;
                            out.push((k, v));
                        }
                        None => {
                            // **spread
                            if let Value::Dict(d) = self.eval(value, frame)? {
                                out.extend(d.borrow().iter().cloned());
                            }
                        }
                    }
                }
                Ok(Value::Dict(Rc::new(RefCell::new(out))))
            }
            HostExpr::JoinedStr(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        HostExpr::Str(s) => out.push_str(s),
                        HostExpr::FormattedValue {
                            value,
                            conversion,
                            format_spec,
                        } => {
                            let v = self.eval(value, frame)?;
                            out.push_str(&format_value(&v, *conversion, format_spec.as_deref()));
                        }
                        other => {
                            let v = self.eval(other, frame)?;
                            out.push_str(&v.display());
                        }
                    }
                }
                Ok(Value::str(out))
            }
            HostExpr::FormattedValue {
                value,
                conversion,
                format_spec,
            } => {
                let v = self.eval(value, frame)?;
                Ok(Value::str(format_value(
                    &v,
                    *conversion,
                    format_spec.as_deref(),
                )))
            }
            HostExpr::NamedExpr { target, value } => {
                let v = self.eval(value, frame)?;
                frame.locals.insert(target.clone(), v.clone());
                Ok(v)
            }
        }
    }

    fn eval_opt(
        &mut self,
        expr: &Option<Box<HostExpr>>,
        frame: &mut Frame,
    ) -> RunResult<Option<Value>> {
        match expr {
            Some(e) => Ok(Some(self.eval(e, frame)?)),
            None => Ok(None),
        }
    }

    fn load_name(&mut self, name: &str, frame: &mut Frame) -> RunResult<Value> {
        if let Some(v) = frame.locals.get(name) {
            return Ok(v.clone());
        }
        if let Some(v) = frame.globals.borrow().get(name) {
            return Ok(v.clone());
        }
        // Ambient runtime helpers: the archetype base, the enum base, the
        // field wrapper, and the usual builtins.
        match name {
            "Obj" | "Enum" | "field" | "print" | "len" | "range" | "str" | "int" | "float"
            | "bool" | "list" | "dict" | "tuple" | "repr" | "abs" | "min" | "max" | "sum"
            | "sorted" | "enumerate" | "isinstance" | "Exception" | "ValueError"
            | "TypeError" | "KeyError" | "IndexError" | "RuntimeError" => {
                Ok(Value::Builtin(builtin_static_name(name)))
            }
            _ => Err(RuntimeError::new(
                "NameError",
                format!("name '{}' is not defined", name),
            )),
        }
    }

    fn get_attr(&mut self, obj: &Value, attr: &str) -> RunResult<Value> {
        match obj {
            Value::Instance(inst) => {
                if let Some(v) = inst.borrow().fields.get(attr) {
                    return Ok(v.clone());
                }
                let class = inst.borrow().class.clone();
                if let Some(v) = lookup_class_attr(&class, attr) {
                    return Ok(match v {
                        Value::Func(f) => Value::Bound(f, inst.clone()),
                        other => other,
                    });
                }
                Err(RuntimeError::new(
                    "AttributeError",
                    format!(
                        "'{}' object has no attribute '{}'",
                        class.borrow().name,
                        attr
                    ),
                ))
            }
            Value::Class(class) => lookup_class_attr(class, attr).ok_or_else(|| {
                RuntimeError::new(
                    "AttributeError",
                    format!("class '{}' has no attribute '{}'", class.borrow().name, attr),
                )
            }),
            Value::Module(ns) => ns.borrow().get(attr).cloned().ok_or_else(|| {
                RuntimeError::new(
                    "AttributeError",
                    format!("module has no attribute '{}'", attr),
                )
            }),
            Value::List(_) | Value::Dict(_) | Value::Str(_) => {
                // Bound container method, dispatched at call time.
                Ok(Value::Tuple(Rc::new(vec![
                    Value::Builtin("__method__"),
                    obj.clone(),
                    Value::str(attr),
                ])))
            }
            other => Err(RuntimeError::new(
                "AttributeError",
                format!("{} has no attribute '{}'", other.type_name(), attr),
            )),
        }
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    fn call(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> RunResult<Value> {
        match callee {
            Value::Func(f) => self.call_function(f, args, kwargs, None),
            Value::Bound(f, recv) => self.call_function(f, args, kwargs, Some(recv.clone())),
            Value::Class(c) => self.construct(c, args, kwargs),
            Value::Builtin(name) => {
                let name = *name;
                self.call_builtin(name, args)
            }
            Value::Tuple(t)
                if t.len() == 3
                    && matches!(t[0], Value::Builtin("__method__")) =>
            {
                let receiver = t[1].clone();
                let method = match &t[2] {
                    Value::Str(s) => s.as_ref().clone(),
                    _ => String::new(),
                };
                self.call_container_method(&receiver, &method, args)
            }
            other => Err(RuntimeError::new(
                "TypeError",
                format!("{} is not callable", other.type_name()),
            )),
        }
    }

    fn call_function(
        &mut self,
        func: &Rc<FuncObj>,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        receiver: Option<Rc<RefCell<Instance>>>,
    ) -> RunResult<Value> {
        let mut frame = Frame {
            locals: HashMap::new(),
            globals: func.globals.clone(),
            global_names: Vec::new(),
            yielded: if func.is_generator {
                Some(Vec::new())
            } else {
                None
            },
        };

        let mut params = func.params.as_slice();
        if let Some(inst) = receiver {
            if let Some(first) = params.first() {
                frame
                    .locals
                    .insert(first.name.clone(), Value::Instance(inst));
                params = &params[1..];
            }
        }

        let mut arg_iter = args.into_iter();
        for param in params {
            match param.star {
                HostStar::Args => {
                    let rest: Vec<Value> = arg_iter.by_ref().collect();
                    frame.locals.insert(param.name.clone(), Value::list(rest));
                    continue;
                }
                HostStar::Kwargs => {
                    let pairs: Vec<(Value, Value)> = kwargs
                        .iter()
                        .filter(|(k, _)| !frame.locals.contains_key(k))
                        .map(|(k, v)| (Value::str(k.clone()), v.clone()))
                        .collect();
                    frame
                        .locals
                        .insert(param.name.clone(), Value::Dict(Rc::new(RefCell::new(pairs))));
                    continue;
                }
                HostStar::None => {}
            }
            let by_kw = kwargs.iter().find(|(k, _)| *k == param.name).map(|(_, v)| v);
            let value = match (arg_iter.next(), by_kw) {
                (Some(v), _) => v,
                (None, Some(v)) => v.clone(),
                (None, None) => match &param.default {
                    Some(d) => {
                        let mut dframe = Frame {
                            locals: HashMap::new(),
                            globals: func.globals.clone(),
                            global_names: Vec::new(),
                            yielded: None,
                        };
                        self.eval(d, &mut dframe)?
                    }
                    None => {
                        return Err(RuntimeError::new(
                            "TypeError",
                            format!("{}() missing argument '{}'", func.name, param.name),
                        ))
                    }
                },
            };
            frame.locals.insert(param.name.clone(), value);
        }

        let flow = self.exec_block(&func.body, &mut frame)?;
        if func.is_generator {
            return Ok(Value::list(frame.yielded.take().unwrap_or_default()));
        }
        Ok(match flow {
            Flow::Return(v) => v,
            _ => Value::None_,
        })
    }

    fn call_builtin(&mut self, name: &str, args: Vec<Value>) -> RunResult<Value> {
        match name {
            "print" => {
                let line = args
                    .iter()
                    .map(|v| v.display())
                    .collect::<Vec<_>>()
                    .join(" ");
                self.output.push(line);
                Ok(Value::None_)
            }
            "len" => match args.first() {
                Some(Value::Str(s)) => Ok(Value::Int(s.chars().count() as i64)),
                Some(Value::List(l)) => Ok(Value::Int(l.borrow().len() as i64)),
                Some(Value::Tuple(t)) => Ok(Value::Int(t.len() as i64)),
                Some(Value::Dict(d)) => Ok(Value::Int(d.borrow().len() as i64)),
                _ => Err(RuntimeError::new("TypeError", "len() needs a container")),
            },
            "range" => {
                let nums: Vec<i64> = args
                    .iter()
                    .map(|v| match v {
                        Value::Int(n) => Ok(*n),
                        _ => Err(RuntimeError::new("TypeError", "range() needs ints")),
                    })
                    .collect::<RunResult<_>>()?;
                match nums.as_slice() {
                    [stop] => Ok(Value::Range(0, *stop, 1)),
                    [start, stop] => Ok(Value::Range(*start, *stop, 1)),
                    [start, stop, step] if *step != 0 => Ok(Value::Range(*start, *stop, *step)),
                    _ => Err(RuntimeError::new("TypeError", "bad range() arguments")),
                }
            }
            "str" => Ok(Value::str(
                args.first().map(|v| v.display()).unwrap_or_default(),
            )),
            "repr" => Ok(Value::str(
                args.first().map(|v| v.repr()).unwrap_or_default(),
            )),
            "int" => match args.first() {
                Some(Value::Int(n)) => Ok(Value::Int(*n)),
                Some(Value::Float(f)) => Ok(Value::Int(*f as i64)),
                Some(Value::Str(s)) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| RuntimeError::new("ValueError", "invalid int literal")),
                Some(Value::Bool(b)) => Ok(Value::Int(*b as i64)),
                _ => Ok(Value::Int(0)),
            },
            "float" => match args.first() {
                Some(Value::Int(n)) => Ok(Value::Float(*n as f64)),
                Some(Value::Float(f)) => Ok(Value::Float(*f)),
                Some(Value::Str(s)) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| RuntimeError::new("ValueError", "invalid float literal")),
                _ => Ok(Value::Float(0.0)),
            },
            "bool" => Ok(Value::Bool(
                args.first().map(|v| v.is_truthy()).unwrap_or(false),
            )),
            "list" => match args.first() {
                Some(v) => Ok(Value::list(self.iterate(v)?)),
                None => Ok(Value::list(Vec::new())),
            },
            "tuple" => match args.first() {
                Some(v) => Ok(Value::Tuple(Rc::new(self.iterate(v)?))),
                None => Ok(Value::Tuple(Rc::new(Vec::new()))),
            },
            "dict" => Ok(Value::Dict(Rc::new(RefCell::new(Vec::new())))),
            "abs" => match args.first() {
                Some(Value::Int(n)) => Ok(Value::Int(n.abs())),
                Some(Value::Float(f)) => Ok(Value::Float(f.abs())),
                _ => Err(RuntimeError::new("TypeError", "abs() needs a number")),
            },
            "min" | "max" => {
                let items = if args.len() == 1 {
                    self.iterate(&args[0])?
                } else {
                    args
                };
                let mut best: Option<Value> = None;
                for item in items {
                    best = Some(match best {
                        None => item,
                        Some(b) => {
                            let take = self.compare(
                                if name == "min" {
                                    HostCmpOp::Lt
                                } else {
                                    HostCmpOp::Gt
                                },
                                &item,
                                &b,
                            )?;
                            if take {
                                item
                            } else {
                                b
                            }
                        }
                    });
                }
                best.ok_or_else(|| RuntimeError::new("ValueError", "empty sequence"))
            }
            "sum" => {
                let items = match args.first() {
                    Some(v) => self.iterate(v)?,
                    None => Vec::new(),
                };
                let mut total = Value::Int(0);
                for item in items {
                    total = self.binop(HostBinOp::Add, &total, &item)?;
                }
                Ok(total)
            }
            "sorted" => {
                let mut items = match args.first() {
                    Some(v) => self.iterate(v)?,
                    None => Vec::new(),
                };
                items.sort_by(|a, b| match (a, b) {
                    (Value::Int(x), Value::Int(y)) => x.cmp(y),
                    (Value::Str(x), Value::Str(y)) => x.cmp(y),
                    (Value::Float(x), Value::Float(y)) => {
                        x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal)
                    }
                    _ => std::cmp::Ordering::Equal,
                });
                Ok(Value::list(items))
            }
            "enumerate" => {
                let items = match args.first() {
                    Some(v) => self.iterate(v)?,
                    None => Vec::new(),
                };
                Ok(Value::list(
                    items
                        .into_iter()
                        .enumerate()
                        .map(|(i, v)| Value::Tuple(Rc::new(vec![Value::Int(i as i64), v])))
                        .collect(),
                ))
            }
            "isinstance" => match (args.first(), args.get(1)) {
                (Some(Value::Instance(inst)), Some(Value::Class(c))) => {
                    let mut cur = vec![inst.borrow().class.clone()];
                    while let Some(k) = cur.pop() {
                        if Rc::ptr_eq(&k, c) {
                            return Ok(Value::Bool(true));
                        }
                        cur.extend(k.borrow().bases.iter().cloned());
                    }
                    Ok(Value::Bool(false))
                }
                _ => Ok(Value::Bool(false)),
            },
            "field" => {
                // Runtime marker used by emitted code; returns its argument.
                Ok(args.into_iter().next().unwrap_or(Value::None_))
            }
            "Obj" | "Enum" => Err(RuntimeError::new(
                "TypeError",
                format!("'{}' base class is not directly callable", name),
            )),
            "Exception" | "ValueError" | "TypeError" | "KeyError" | "IndexError"
            | "RuntimeError" => {
                // Calling an exception builtin produces a raisable tagged
                // value carrying its kind and message.
                let message = args.first().map(|v| v.display()).unwrap_or_default();
                Ok(Value::Tuple(Rc::new(vec![
                    Value::Builtin("__exc__"),
                    Value::str(name),
                    Value::str(message),
                ])))
            }
            other => Err(RuntimeError::new(
                "NameError",
                format!("unknown builtin '{}'", other),
            )),
        }
    }

    fn call_container_method(
        &mut self,
        receiver: &Value,
        method: &str,
        args: Vec<Value>,
    ) -> RunResult<Value> {
        match (receiver, method) {
            (Value::List(l), "append") => {
                l.borrow_mut()
                    .push(args.into_iter().next().unwrap_or(Value::None_));
                Ok(Value::None_)
            }
            (Value::List(l), "extend") => {
                if let Some(arg) = args.first() {
                    let items = self.iterate(arg)?;
                    l.borrow_mut().extend(items);
                }
                Ok(Value::None_)
            }
            (Value::List(l), "pop") => {
                let mut list = l.borrow_mut();
                match args.first() {
                    Some(Value::Int(i)) => {
                        let idx = self.index_for(&Value::Int(*i), list.len())?;
                        Ok(list.remove(idx))
                    }
                    None => list
                        .pop()
                        .ok_or_else(|| RuntimeError::new("IndexError", "pop from empty list")),
                    _ => Err(RuntimeError::new("TypeError", "pop index must be int")),
                }
            }
            (Value::List(l), "insert") => {
                if let (Some(Value::Int(i)), Some(v)) = (args.first(), args.get(1)) {
                    let mut list = l.borrow_mut();
                    let idx = (*i).clamp(0, list.len() as i64) as usize;
                    list.insert(idx, v.clone());
                }
                Ok(Value::None_)
            }
            (Value::List(l), "remove") => {
                if let Some(target) = args.first() {
                    let mut list = l.borrow_mut();
                    if let Some(pos) = list.iter().position(|x| x.eq_value(target)) {
                        list.remove(pos);
                        return Ok(Value::None_);
                    }
                }
                Err(RuntimeError::new("ValueError", "value not in list"))
            }
            (Value::List(l), "reverse") => {
                l.borrow_mut().reverse();
                Ok(Value::None_)
            }
            (Value::Dict(d), "get") => {
                let key = args.first().cloned().unwrap_or(Value::None_);
                let fallback = args.get(1).cloned().unwrap_or(Value::None_);
                Ok(d.borrow()
                    .iter()
                    .find(|(k, _)| k.eq_value(&key))
                    .map(|(_, v)| v.clone())
                    .unwrap_or(fallback))
            }
            (Value::Dict(d), "keys") => Ok(Value::list(
                d.borrow().iter().map(|(k, _)| k.clone()).collect(),
            )),
            (Value::Dict(d), "values") => Ok(Value::list(
                d.borrow().iter().map(|(_, v)| v.clone()).collect(),
            )),
            (Value::Dict(d), "items") => Ok(Value::list(
                d.borrow()
                    .iter()
                    .map(|(k, v)| Value::Tuple(Rc::new(vec![k.clone(), v.clone()])))
                    .collect(),
            )),
            (Value::Str(s), "upper") => Ok(Value::str(s.to_uppercase())),
            (Value::Str(s), "lower") => Ok(Value::str(s.to_lowercase())),
            (Value::Str(s), "strip") => Ok(Value::str(s.trim())),
            (Value::Str(s), "startswith") => match args.first() {
                Some(Value::Str(p)) => Ok(Value::Bool(s.starts_with(p.as_str()))),
                _ => Ok(Value::Bool(false)),
            },
            (Value::Str(s), "endswith") => match args.first() {
                Some(Value::Str(p)) => Ok(Value::Bool(s.ends_with(p.as_str()))),
                _ => Ok(Value::Bool(false)),
            },
            (Value::Str(s), "split") => {
                let parts: Vec<Value> = match args.first() {
                    Some(Value::Str(sep)) => {
                        s.split(sep.as_str()).map(Value::str).collect()
                    }
                    _ => s.split_whitespace().map(Value::str).collect(),
                };
                Ok(Value::list(parts))
            }
            (Value::Str(s), "join") => {
                let items = match args.first() {
                    Some(v) => self.iterate(v)?,
                    None => Vec::new(),
                };
                let parts: Vec<String> = items.iter().map(|v| v.display()).collect();
                Ok(Value::str(parts.join(s.as_str())))
            }
            (Value::Str(s), "replace") => {
                if let (Some(Value::Str(from)), Some(Value::Str(to))) =
                    (args.first(), args.get(1))
                {
                    Ok(Value::str(s.replace(from.as_str(), to.as_str())))
                } else {
                    Ok(Value::str(s.as_ref().clone()))
                }
            }
            (recv, m) => Err(RuntimeError::new(
                "AttributeError",
                format!("{} has no method '{}'", recv.type_name(), m),
            )),
        }
    }

    // ------------------------------------------------------------------
    // Operators and iteration
    // ------------------------------------------------------------------

    fn binop(&mut self, op: HostBinOp, l: &Value, r: &Value) -> RunResult<Value> {
        use HostBinOp::*;
        match (op, l, r) {
            (Add, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
            (Sub, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a - b)),
            (Mul, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a * b)),
            (Div, Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    Err(RuntimeError::new("ZeroDivisionError", "division by zero"))
                } else {
                    Ok(Value::Float(*a as f64 / *b as f64))
                }
            }
            (FloorDiv, Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    Err(RuntimeError::new("ZeroDivisionError", "division by zero"))
                } else {
                    Ok(Value::Int(a.div_euclid(*b)))
                }
            }
            (Mod, Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    Err(RuntimeError::new("ZeroDivisionError", "modulo by zero"))
                } else {
                    Ok(Value::Int(a.rem_euclid(*b)))
                }
            }
            (Pow, Value::Int(a), Value::Int(b)) => {
                if *b >= 0 {
                    Ok(Value::Int(a.pow(*b as u32)))
                } else {
                    Ok(Value::Float((*a as f64).powi(*b as i32)))
                }
            }
            (LShift, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a << b)),
            (RShift, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a >> b)),
            (BitAnd, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a & b)),
            (BitOr, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a | b)),
            (BitXor, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a ^ b)),
            (Add, Value::Str(a), Value::Str(b)) => {
                Ok(Value::str(format!("{}{}", a, b)))
            }
            (Mul, Value::Str(a), Value::Int(n)) | (Mul, Value::Int(n), Value::Str(a)) => {
                Ok(Value::str(a.repeat((*n).max(0) as usize)))
            }
            (Add, Value::List(a), Value::List(b)) => {
                let mut out = a.borrow().clone();
                out.extend(b.borrow().iter().cloned());
                Ok(Value::list(out))
            }
            (Add, Value::Tuple(a), Value::Tuple(b)) => {
                let mut out = a.as_ref().clone();
                out.extend(b.iter().cloned());
                Ok(Value::Tuple(Rc::new(out)))
            }
            _ => {
                // Numeric promotion to float.
                let lf = match l {
                    Value::Int(n) => Some(*n as f64),
                    Value::Float(f) => Some(*f),
                    _ => None,
                };
                let rf = match r {
                    Value::Int(n) => Some(*n as f64),
                    Value::Float(f) => Some(*f),
                    _ => None,
                };
                match (lf, rf) {
                    (Some(a), Some(b)) => match op {
                        Add => Ok(Value::Float(a + b)),
                        Sub => Ok(Value::Float(a - b)),
                        Mul => Ok(Value::Float(a * b)),
                        Div => Ok(Value::Float(a / b)),
                        FloorDiv => Ok(Value::Float((a / b).floor())),
                        Mod => Ok(Value::Float(a.rem_euclid(b))),
                        Pow => Ok(Value::Float(a.powf(b))),
                        _ => Err(RuntimeError::new(
                            "TypeError",
                            "bitwise operator needs integers",
                        )),
                    },
                    _ => Err(RuntimeError::new(
                        "TypeError",
                        format!(
                            "unsupported operand types: {} and {}",
                            l.type_name(),
                            r.type_name()
                        ),
                    )),
                }
            }
        }
    }

    fn compare(&mut self, op: HostCmpOp, l: &Value, r: &Value) -> RunResult<bool> {
        use HostCmpOp::*;
        match op {
            Eq => Ok(l.eq_value(r)),
            NotEq => Ok(!l.eq_value(r)),
            Is => Ok(l.is_identical(r)),
            IsNot => Ok(!l.is_identical(r)),
            In | NotIn => {
                let found = match r {
                    Value::List(v) => v.borrow().iter().any(|x| x.eq_value(l)),
                    Value::Tuple(v) => v.iter().any(|x| x.eq_value(l)),
                    Value::Dict(d) => d.borrow().iter().any(|(k, _)| k.eq_value(l)),
                    Value::Str(s) => match l {
                        Value::Str(sub) => s.contains(sub.as_str()),
                        _ => false,
                    },
                    Value::Range(a, b, step) => match l {
                        Value::Int(n) => {
                            (*step > 0 && n >= a && n < b && (n - a) % step == 0)
                                || (*step < 0 && n <= a && n > b && (a - n) % -step == 0)
                        }
                        _ => false,
                    },
                    _ => {
                        return Err(RuntimeError::new(
                            "TypeError",
                            format!("argument of 'in' is not iterable: {}", r.type_name()),
                        ))
                    }
                };
                Ok(if matches!(op, In) { found } else { !found })
            }
            Lt | LtE | Gt | GtE => {
                let ord = match (l, r) {
                    (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
                    (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
                    (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
                    (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
                    (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                    _ => None,
                };
                let ord = ord.ok_or_else(|| {
                    RuntimeError::new(
                        "TypeError",
                        format!(
                            "'<' not supported between {} and {}",
                            l.type_name(),
                            r.type_name()
                        ),
                    )
                })?;
                Ok(match op {
                    Lt => ord.is_lt(),
                    LtE => ord.is_le(),
                    Gt => ord.is_gt(),
                    GtE => ord.is_ge(),
                    _ => unreachable!(),
                })
            }
        }
    }

    fn iterate(&mut self, value: &Value) -> RunResult<Vec<Value>> {
        match value {
            Value::List(l) => Ok(l.borrow().clone()),
            Value::Tuple(t) => Ok(t.as_ref().clone()),
            Value::Dict(d) => Ok(d.borrow().iter().map(|(k, _)| k.clone()).collect()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::str(c.to_string())).collect()),
            Value::Range(start, stop, step) => {
                let mut out = Vec::new();
                let mut cur = *start;
                if *step > 0 {
                    while cur < *stop {
                        out.push(Value::Int(cur));
                        cur += step;
                    }
                } else {
                    while cur > *stop {
                        out.push(Value::Int(cur));
                        cur += step;
                    }
                }
                Ok(out)
            }
            other => Err(RuntimeError::new(
                "TypeError",
                format!("{} is not iterable", other.type_name()),
            )),
        }
    }

    fn index_for(&self, key: &Value, len: usize) -> RunResult<usize> {
        let idx = match key {
            Value::Int(n) => *n,
            _ => {
                return Err(RuntimeError::new(
                    "TypeError",
                    "index must be an integer",
                ))
            }
        };
        let idx = if idx < 0 { idx + len as i64 } else { idx };
        if idx < 0 || idx as usize >= len {
            return Err(RuntimeError::new("IndexError", "index out of range"));
        }
        Ok(idx as usize)
    }

    fn subscript(&mut self, container: &Value, key: &Value) -> RunResult<Value> {
        match container {
            Value::List(l) => {
                let list = l.borrow();
                let idx = self.index_for(key, list.len())?;
                Ok(list[idx].clone())
            }
            Value::Tuple(t) => {
                let idx = self.index_for(key, t.len())?;
                Ok(t[idx].clone())
            }
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let idx = self.index_for(key, chars.len())?;
                Ok(Value::str(chars[idx].to_string()))
            }
            Value::Dict(d) => d
                .borrow()
                .iter()
                .find(|(k, _)| k.eq_value(key))
                .map(|(_, v)| v.clone())
                .ok_or_else(|| RuntimeError::new("KeyError", key.repr())),
            other => Err(RuntimeError::new(
                "TypeError",
                format!("{} is not subscriptable", other.type_name()),
            )),
        }
    }

    fn slice(
        &mut self,
        container: &Value,
        start: Option<Value>,
        stop: Option<Value>,
        step: Option<Value>,
    ) -> RunResult<Value> {
        let as_int = |v: &Option<Value>| -> RunResult<Option<i64>> {
            match v {
                None => Ok(None),
                Some(Value::Int(n)) => Ok(Some(*n)),
                Some(Value::None_) => Ok(None),
                Some(_) => Err(RuntimeError::new("TypeError", "slice index must be int")),
            }
        };
        let (start, stop, step) = (as_int(&start)?, as_int(&stop)?, as_int(&step)?);
        let step = step.unwrap_or(1);
        if step == 0 {
            return Err(RuntimeError::new("ValueError", "slice step cannot be zero"));
        }

        let pick = |items: &[Value]| -> Vec<Value> {
            let len = items.len() as i64;
            let norm = |v: i64| -> i64 {
                if v < 0 {
                    (v + len).max(0)
                } else {
                    v.min(len)
                }
            };
            let mut out = Vec::new();
            if step > 0 {
                let mut i = norm(start.unwrap_or(0));
                let end = norm(stop.unwrap_or(len));
                while i < end {
                    out.push(items[i as usize].clone());
                    i += step;
                }
            } else {
                let mut i = start.map(norm).unwrap_or(len - 1).min(len - 1);
                let end = stop.map(norm).unwrap_or(-1);
                while i > end && i >= 0 {
                    out.push(items[i as usize].clone());
                    i += step;
                }
            }
            out
        };

        match container {
            Value::List(l) => Ok(Value::list(pick(&l.borrow()))),
            Value::Tuple(t) => Ok(Value::Tuple(Rc::new(pick(t)))),
            Value::Str(s) => {
                let chars: Vec<Value> = s.chars().map(|c| Value::str(c.to_string())).collect();
                let picked = pick(&chars);
                Ok(Value::str(
                    picked.iter().map(|v| v.display()).collect::<String>(),
                ))
            }
            other => Err(RuntimeError::new(
                "TypeError",
                format!("{} cannot be sliced", other.type_name()),
            )),
        }
    }

    fn load_module(&mut self, module: &str) -> RunResult<Namespace> {
        if let Some(ns) = self.module_cache.get(module) {
            return Ok(ns.clone());
        }
        let Some(loader) = self.loader.as_mut() else {
            return Err(RuntimeError::new(
                "ImportError",
                format!("no module loader installed; cannot import '{}'", module),
            ));
        };
        let Some(code) = loader(module) else {
            return Err(RuntimeError::new(
                "ImportError",
                format!("no module named '{}'", module),
            ));
        };
        let ns: Namespace = Rc::new(RefCell::new(HashMap::new()));
        self.module_cache.insert(module.to_string(), ns.clone());
        self.exec_into(&code, ns.clone())?;
        Ok(ns)
    }
}

fn collect_fields(
    class: &Rc<RefCell<ClassObj>>,
    out: &mut Vec<(String, Option<FieldDefault>)>,
) {
    let class = class.borrow();
    for base in &class.bases {
        collect_fields(base, out);
    }
    for (name, default) in &class.fields {
        if !out.iter().any(|(n, _)| n == name) {
            out.push((name.clone(), default.clone()));
        }
    }
}

fn lookup_class_attr(class: &Rc<RefCell<ClassObj>>, attr: &str) -> Option<Value> {
    let c = class.borrow();
    if let Some(v) = c.dict.get(attr) {
        return Some(v.clone());
    }
    for base in &c.bases {
        if let Some(v) = lookup_class_attr(base, attr) {
            return Some(v);
        }
    }
    None
}

fn body_contains_yield(body: &[HostStmt]) -> bool {
    body.iter().any(|stmt| match stmt {
        HostStmt::Yield { .. } => true,
        HostStmt::If { body, orelse, .. } => {
            body_contains_yield(body) || body_contains_yield(orelse)
        }
        HostStmt::While { body, .. } | HostStmt::For { body, .. } => body_contains_yield(body),
        HostStmt::Try {
            body,
            handlers,
            finalbody,
            ..
        } => {
            body_contains_yield(body)
                || handlers.iter().any(|h| body_contains_yield(&h.body))
                || body_contains_yield(finalbody)
        }
        HostStmt::With { body, .. } => body_contains_yield(body),
        HostStmt::Match { cases, .. } => cases.iter().any(|c| body_contains_yield(&c.body)),
        _ => false,
    })
}

fn builtin_static_name(name: &str) -> &'static str {
    match name {
        "Obj" => "Obj",
        "Enum" => "Enum",
        "field" => "field",
        "print" => "print",
        "len" => "len",
        "range" => "range",
        "str" => "str",
        "int" => "int",
        "float" => "float",
        "bool" => "bool",
        "list" => "list",
        "dict" => "dict",
        "tuple" => "tuple",
        "repr" => "repr",
        "abs" => "abs",
        "min" => "min",
        "max" => "max",
        "sum" => "sum",
        "sorted" => "sorted",
        "enumerate" => "enumerate",
        "isinstance" => "isinstance",
        "Exception" => "Exception",
        "ValueError" => "ValueError",
        "TypeError" => "TypeError",
        "KeyError" => "KeyError",
        "IndexError" => "IndexError",
        _ => "RuntimeError",
    }
}

/// Apply an f-string conversion and format spec.
fn format_value(value: &Value, conversion: Option<char>, spec: Option<&str>) -> String {
    let base = match conversion {
        Some('r') | Some('R') | Some('a') | Some('A') => value.repr(),
        _ => value.display(),
    };
    let Some(spec) = spec else {
        return base;
    };
    // `.Nf` float precision.
    if let Some(rest) = spec.strip_prefix('.') {
        if let Some(digits) = rest.strip_suffix('f') {
            if let Ok(prec) = digits.parse::<usize>() {
                let num = match value {
                    Value::Int(n) => Some(*n as f64),
                    Value::Float(f) => Some(*f),
                    _ => None,
                };
                if let Some(num) = num {
                    return format!("{:.*}", prec, num);
                }
            }
        }
    }
    // Plain width: right-align.
    if let Ok(width) = spec.parse::<usize>() {
        return format!("{:>width$}", base, width = width);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ast::HostExpr as E;
    use crate::host::ast::HostStmt as S;

    fn exec(body: Vec<S>) -> HashMap<String, Value> {
        let code = CodeObject::new(
            HostModule {
                name: "t".into(),
                doc: None,
                body,
            },
            "t.jac",
        );
        Interp::new().exec(&code).unwrap()
    }

    #[test]
    fn assign_and_arithmetic() {
        let ns = exec(vec![S::Assign {
            targets: vec![E::Name("x".into())],
            value: E::BinOp {
                op: HostBinOp::Add,
                left: Box::new(E::Int(40)),
                right: Box::new(E::Int(2)),
            },
            jac: None,
        }]);
        assert!(matches!(ns["x"], Value::Int(42)));
    }

    #[test]
    fn function_call_with_default() {
        let ns = exec(vec![
            S::FuncDef {
                name: "inc".into(),
                params: vec![
                    HostParam {
                        name: "n".into(),
                        annotation: None,
                        default: None,
                        star: HostStar::None,
                    },
                    HostParam {
                        name: "by".into(),
                        annotation: None,
                        default: Some(E::Int(1)),
                        star: HostStar::None,
                    },
                ],
                body: vec![S::Return {
                    value: Some(E::BinOp {
                        op: HostBinOp::Add,
                        left: Box::new(E::Name("n".into())),
                        right: Box::new(E::Name("by".into())),
                    }),
                    jac: None,
                }],
                returns: None,
                jac: None,
            },
            S::Assign {
                targets: vec![E::Name("r".into())],
                value: E::Call {
                    func: Box::new(E::Name("inc".into())),
                    args: vec![E::Int(5)],
                    kwargs: vec![],
                },
                jac: None,
            },
        ]);
        assert!(matches!(ns["r"], Value::Int(6)));
    }

    #[test]
    fn per_instance_default_is_fresh() {
        let class = S::ClassDef {
            name: "Box".into(),
            bases: vec!["Obj".into()],
            fields: vec![HostField {
                name: "items".into(),
                annotation: Some("list".into()),
                default: Some(E::List(vec![])),
                per_instance: true,
            }],
            body: vec![],
            jac: None,
        };
        let make = |name: &str| S::Assign {
            targets: vec![E::Name(name.into())],
            value: E::Call {
                func: Box::new(E::Name("Box".into())),
                args: vec![],
                kwargs: vec![],
            },
            jac: None,
        };
        let append = S::ExprStmt {
            value: E::Call {
                func: Box::new(E::Attribute {
                    target: Box::new(E::Attribute {
                        target: Box::new(E::Name("a".into())),
                        attr: "items".into(),
                        null_ok: false,
                    }),
                    attr: "append".into(),
                    null_ok: false,
                }),
                args: vec![E::Int(1)],
                kwargs: vec![],
            },
            jac: None,
        };
        let ns = exec(vec![class, make("a"), make("b"), append]);
        let get_items = |name: &str| -> Vec<Value> {
            match &ns[name] {
                Value::Instance(i) => match &i.borrow().fields["items"] {
                    Value::List(l) => l.borrow().clone(),
                    _ => panic!("items is not a list"),
                },
                _ => panic!("{} is not an instance", name),
            }
        };
        assert_eq!(get_items("a").len(), 1);
        assert_eq!(get_items("b").len(), 0);
    }

    #[test]
    fn class_attribute_assignment_injects_method() {
        // Foo defined with a field, then a free function assigned as method.
        let ns = exec(vec![
            S::ClassDef {
                name: "Foo".into(),
                bases: vec!["Obj".into()],
                fields: vec![HostField {
                    name: "x".into(),
                    annotation: None,
                    default: Some(E::Int(0)),
                    per_instance: false,
                }],
                body: vec![],
                jac: None,
            },
            S::FuncDef {
                name: "_impl_Foo_get".into(),
                params: vec![HostParam {
                    name: "self".into(),
                    annotation: None,
                    default: None,
                    star: HostStar::None,
                }],
                body: vec![S::Return {
                    value: Some(E::Attribute {
                        target: Box::new(E::Name("self".into())),
                        attr: "x".into(),
                        null_ok: false,
                    }),
                    jac: None,
                }],
                returns: None,
                jac: None,
            },
            S::Assign {
                targets: vec![E::Attribute {
                    target: Box::new(E::Name("Foo".into())),
                    attr: "get".into(),
                    null_ok: false,
                }],
                value: E::Name("_impl_Foo_get".into()),
                jac: None,
            },
            S::Assign {
                targets: vec![E::Name("r".into())],
                value: E::Call {
                    func: Box::new(E::Attribute {
                        target: Box::new(E::Call {
                            func: Box::new(E::Name("Foo".into())),
                            args: vec![],
                            kwargs: vec![("x".into(), E::Int(7))],
                        }),
                        attr: "get".into(),
                        null_ok: false,
                    }),
                    args: vec![],
                    kwargs: vec![],
                },
                jac: None,
            },
        ]);
        assert!(matches!(ns["r"], Value::Int(7)));
    }

    #[test]
    fn fstring_joins_and_formats() {
        let ns = exec(vec![S::Assign {
            targets: vec![E::Name("s".into())],
            value: E::JoinedStr(vec![
                E::Str("v=".into()),
                E::FormattedValue {
                    value: Box::new(E::Float(2.5)),
                    conversion: None,
                    format_spec: Some(".1f".into()),
                },
            ]),
            jac: None,
        }]);
        match &ns["s"] {
            Value::Str(s) => assert_eq!(s.as_str(), "v=2.5"),
            _ => panic!("not a string"),
        }
    }

    #[test]
    fn print_is_captured_not_written() {
        let code = CodeObject::new(
            HostModule {
                name: "t".into(),
                doc: None,
                body: vec![S::ExprStmt {
                    value: E::Call {
                        func: Box::new(E::Name("print".into())),
                        args: vec![E::Str("hello".into()), E::Int(3)],
                        kwargs: vec![],
                    },
                    jac: None,
                }],
            },
            "t.jac",
        );
        let mut interp = Interp::new();
        interp.exec(&code).unwrap();
        assert_eq!(interp.output, vec!["hello 3"]);
    }

    #[test]
    fn try_except_finally_runs() {
        let ns = exec(vec![
            S::Assign {
                targets: vec![E::Name("log".into())],
                value: E::List(vec![]),
                jac: None,
            },
            S::Try {
                body: vec![S::Raise {
                    exc: Some(E::Call {
                        func: Box::new(E::Name("ValueError".into())),
                        args: vec![E::Str("boom".into())],
                        kwargs: vec![],
                    }),
                    jac: None,
                }],
                handlers: vec![HostHandler {
                    ty: Some(E::Name("ValueError".into())),
                    name: None,
                    body: vec![S::ExprStmt {
                        value: E::Call {
                            func: Box::new(E::Attribute {
                                target: Box::new(E::Name("log".into())),
                                attr: "append".into(),
                                null_ok: false,
                            }),
                            args: vec![E::Str("caught".into())],
                            kwargs: vec![],
                        },
                        jac: None,
                    }],
                }],
                finalbody: vec![S::ExprStmt {
                    value: E::Call {
                        func: Box::new(E::Attribute {
                            target: Box::new(E::Name("log".into())),
                            attr: "append".into(),
                            null_ok: false,
                        }),
                        args: vec![E::Str("finally".into())],
                        kwargs: vec![],
                    },
                    jac: None,
                }],
                jac: None,
            },
        ]);
        match &ns["log"] {
            Value::List(l) => {
                let items: Vec<String> = l.borrow().iter().map(|v| v.display()).collect();
                assert_eq!(items, vec!["caught", "finally"]);
            }
            _ => panic!("log is not a list"),
        }
    }

    #[test]
    fn generator_collects_yields() {
        let ns = exec(vec![
            S::FuncDef {
                name: "g".into(),
                params: vec![],
                body: vec![
                    S::Yield {
                        value: Some(E::Int(1)),
                        is_from: false,
                        jac: None,
                    },
                    S::Yield {
                        value: Some(E::Int(2)),
                        is_from: false,
                        jac: None,
                    },
                ],
                returns: None,
                jac: None,
            },
            S::Assign {
                targets: vec![E::Name("r".into())],
                value: E::Call {
                    func: Box::new(E::Name("g".into())),
                    args: vec![],
                    kwargs: vec![],
                },
                jac: None,
            },
        ]);
        match &ns["r"] {
            Value::List(l) => assert_eq!(l.borrow().len(), 2),
            _ => panic!("generator did not collect"),
        }
    }

    #[test]
    fn raise_without_handler_escapes() {
        let code = CodeObject::new(
            HostModule {
                name: "t".into(),
                doc: None,
                body: vec![S::Assert {
                    cond: E::Bool(false),
                    msg: Some(E::Str("nope".into())),
                    jac: None,
                }],
            },
            "t.jac",
        );
        let err = Interp::new().exec(&code).unwrap_err();
        assert_eq!(err.kind, "AssertionError");
        assert_eq!(err.message, "nope");
    }
}
