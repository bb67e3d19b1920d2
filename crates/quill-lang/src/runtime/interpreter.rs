//! Tree-walking interpreter.
//!
//! Statements evaluate to a [`Completion`], expressions to a [`Value`].
//! The current scope is swapped in around blocks and calls and put back on
//! every exit path, failures included, so an instance stays usable after
//! an uncaught error.

use std::rc::Rc;

use log::{Level, debug, error, info, trace, warn};

use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::runtime::builtins;
use crate::runtime::function::Function;
use crate::runtime::methods::MethodRegistry;
use crate::runtime::scope::Scope;
use crate::runtime::value::{Object, Value};
use crate::syntax::ast::{BinOp, Expr, ForEachKind, FunctionBody, FunctionDef, LogicalOp, Stmt, UnaryOp, UpdateOp};

type Sink = Box<dyn FnMut(&str)>;

/// Nested script calls allowed before a call fails instead of recursing.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1000;

// Deep evaluation moves onto a fresh stack segment once less than
// `RED_ZONE` bytes remain.
const RED_ZONE: usize = 128 * 1024;
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

/// How a statement finished.
#[derive(Debug, Clone)]
pub(crate) enum Completion {
    Normal(Value),
    Return(Value),
    Break,
    Continue,
}

/// A writable location resolved once, read and written by `++`/`--` and
/// compound assignment.
enum Place {
    Var(String),
    Member(Value, String),
    Index(Value, Value),
}

// ─── Interpreter ──────────────────────────────────────────────────────────────

pub struct Interpreter {
    globals: Scope,
    scope: Scope,
    loop_depth: usize,
    call_depth: usize,
    max_call_depth: usize,
    methods: MethodRegistry,
    logs: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    log_sink: Option<Sink>,
    warn_sink: Option<Sink>,
    error_sink: Option<Sink>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// A fresh instance with the built-in globals installed.
    pub fn new() -> Self {
        let globals = Scope::new();
        builtins::install(&globals);
        Self {
            scope: globals.clone(),
            globals,
            loop_depth: 0,
            call_depth: 0,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            methods: MethodRegistry::default(),
            logs: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            log_sink: None,
            warn_sink: None,
            error_sink: None,
        }
    }

    /// The root scope. Hosts inject their own names here before `execute`.
    pub fn global_scope(&self) -> &Scope {
        &self.globals
    }

    /// Cap on nested user function calls. Exceeding it raises a catchable
    /// `CallStackOverflow` failure.
    pub fn set_max_call_depth(&mut self, depth: usize) {
        self.max_call_depth = depth;
    }

    // ─── Entry points ─────────────────────────────────────────────────────────

    /// Run top-level statements in the current scope. Yields the value of the
    /// last statement, or the value of a top-level `return`.
    pub fn execute(&mut self, statements: &[Stmt]) -> Result<Value, RuntimeError> {
        debug!("executing {} statement(s)", statements.len());
        let saved_scope = self.scope.clone();
        let saved_depth = self.loop_depth;
        let saved_calls = self.call_depth;
        match self.exec_stmts(statements) {
            Ok(completion) => {
                debug!("execution finished");
                Ok(match completion {
                    Completion::Normal(v) | Completion::Return(v) => v,
                    Completion::Break | Completion::Continue => Value::Null,
                })
            }
            Err(e) => {
                self.scope = saved_scope;
                self.loop_depth = saved_depth;
                self.call_depth = saved_calls;
                warn!("uncaught {e}");
                Err(e)
            }
        }
    }

    /// Invoke a script or native function from host code.
    pub fn call_function(&mut self, callee: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
        match callee {
            Value::Function(f) => f.call(self, args),
            other => Err(RuntimeError::new(0, RuntimeErrorKind::NotCallable { value: other.as_string() })),
        }
    }

    fn call_value(&mut self, callee: &Value, args: &[Value], line: usize) -> Result<Value, RuntimeError> {
        self.call_function(callee, args).map_err(|e| e.at_line(line))
    }

    pub(crate) fn call_user(&mut self, def: &FunctionDef, closure: &Scope, args: &[Value]) -> Result<Value, RuntimeError> {
        trace!("call {}/{}", def.name.as_deref().unwrap_or("<anonymous>"), args.len());
        if self.call_depth >= self.max_call_depth {
            return Err(RuntimeError::new(0, RuntimeErrorKind::CallStackOverflow));
        }
        let frame = closure.child();
        for (i, param) in def.params.iter().enumerate() {
            frame.define(param.clone(), args.get(i).cloned().unwrap_or(Value::Null));
        }
        // `break` inside a callback must not reach a loop in the caller.
        let saved_depth = std::mem::replace(&mut self.loop_depth, 0);
        self.call_depth += 1;
        let result = self.with_scope(frame, |interp| match &def.body {
            FunctionBody::Block(body) => interp.exec_stmts(body).map(|c| match c {
                Completion::Normal(v) | Completion::Return(v) => v,
                Completion::Break | Completion::Continue => Value::Null,
            }),
            FunctionBody::Expr(expr) => interp.eval_expr(expr),
        });
        self.call_depth -= 1;
        self.loop_depth = saved_depth;
        result
    }

    // ─── Script output ────────────────────────────────────────────────────────

    pub fn set_log_sink(&mut self, sink: impl FnMut(&str) + 'static) {
        self.log_sink = Some(Box::new(sink));
    }

    pub fn set_warn_sink(&mut self, sink: impl FnMut(&str) + 'static) {
        self.warn_sink = Some(Box::new(sink));
    }

    pub fn set_error_sink(&mut self, sink: impl FnMut(&str) + 'static) {
        self.error_sink = Some(Box::new(sink));
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn clear_logs(&mut self) {
        self.logs.clear();
        self.warnings.clear();
        self.errors.clear();
    }

    /// Retain a script message and forward it to the matching sink. Without
    /// a sink the message goes to the `log` facade instead.
    pub(crate) fn record(&mut self, level: Level, message: String) {
        match level {
            Level::Error => {
                match &mut self.error_sink {
                    Some(sink) => sink(&format!("ERROR: {message}")),
                    None => error!("{message}"),
                }
                self.errors.push(message);
            }
            Level::Warn => {
                match &mut self.warn_sink {
                    Some(sink) => sink(&format!("WARN: {message}")),
                    None => warn!("{message}"),
                }
                self.warnings.push(message);
            }
            _ => {
                match &mut self.log_sink {
                    Some(sink) => sink(&message),
                    None => info!("{message}"),
                }
                self.logs.push(message);
            }
        }
    }

    // ─── Scope helpers ────────────────────────────────────────────────────────

    fn with_scope<T>(&mut self, scope: Scope, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.scope, scope);
        let out = f(self);
        self.scope = saved;
        out
    }

    fn in_loop(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<Completion, RuntimeError>,
    ) -> Result<Completion, RuntimeError> {
        self.loop_depth += 1;
        let out = f(self);
        self.loop_depth -= 1;
        out
    }

    fn closure(&self, def: &Rc<FunctionDef>) -> Value {
        Value::function(Function::User { def: def.clone(), closure: self.scope.clone() })
    }

    // ─── Statements ───────────────────────────────────────────────────────────

    /// Last normal value, or the first abrupt completion.
    fn exec_stmts(&mut self, stmts: &[Stmt]) -> Result<Completion, RuntimeError> {
        let mut last = Value::Null;
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Completion::Normal(v) => last = v,
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Completion::Normal(last))
    }

    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<Completion, RuntimeError> {
        let child = self.scope.child();
        self.with_scope(child, |interp| interp.exec_stmts(stmts))
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Completion, RuntimeError> {
        stacker::maybe_grow(RED_ZONE, STACK_SEGMENT, || self.exec_stmt_inner(stmt))
    }

    fn exec_stmt_inner(&mut self, stmt: &Stmt) -> Result<Completion, RuntimeError> {
        match stmt {
            Stmt::Expr(expr) => Ok(Completion::Normal(self.eval_expr(expr)?)),

            Stmt::VarDecl { name, is_const, initializer, .. } => {
                let value = match initializer {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Null,
                };
                if *is_const {
                    self.scope.define_constant(name.clone(), value.clone());
                } else {
                    self.scope.define(name.clone(), value.clone());
                }
                Ok(Completion::Normal(value))
            }

            Stmt::If { condition, then_branch, else_branch, .. } => {
                if self.eval_expr(condition)?.as_boolean() {
                    self.exec_stmt(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_stmt(else_branch)
                } else {
                    Ok(Completion::Normal(Value::Null))
                }
            }

            Stmt::Return(expr, _) => {
                let value = match expr {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Null,
                };
                Ok(Completion::Return(value))
            }

            Stmt::Block(stmts, _) => self.exec_block(stmts),

            Stmt::While { condition, body, .. } => self.in_loop(|interp| {
                while interp.eval_expr(condition)?.as_boolean() {
                    if let Some(done) = loop_exit(interp.exec_stmt(body)?) {
                        return Ok(done);
                    }
                }
                Ok(Completion::Normal(Value::Null))
            }),

            Stmt::DoWhile { body, condition, .. } => self.in_loop(|interp| loop {
                if let Some(done) = loop_exit(interp.exec_stmt(body)?) {
                    return Ok(done);
                }
                if !interp.eval_expr(condition)?.as_boolean() {
                    return Ok(Completion::Normal(Value::Null));
                }
            }),

            Stmt::For { init, condition, update, body, .. } => {
                let scope = self.scope.child();
                self.with_scope(scope, |interp| -> Result<Completion, RuntimeError> {
                    if let Some(init) = init {
                        interp.exec_stmt(init)?;
                    }
                    interp.in_loop(|interp| {
                        loop {
                            if let Some(condition) = condition {
                                if !interp.eval_expr(condition)?.as_boolean() {
                                    break;
                                }
                            }
                            if let Some(done) = loop_exit(interp.exec_stmt(body)?) {
                                return Ok(done);
                            }
                            if let Some(update) = update {
                                interp.eval_expr(update)?;
                            }
                        }
                        Ok(Completion::Normal(Value::Null))
                    })
                })
            }

            Stmt::ForEach { name, is_const, kind, iterable, body, .. } => {
                let iterable = self.eval_expr(iterable)?;
                let items = iteration_values(&iterable, *kind);
                self.in_loop(|interp| {
                    for item in items {
                        let frame = interp.scope.child();
                        if *is_const {
                            frame.define_constant(name.clone(), item);
                        } else {
                            frame.define(name.clone(), item);
                        }
                        let completion = interp.with_scope(frame, |interp| interp.exec_stmt(body))?;
                        if let Some(done) = loop_exit(completion) {
                            return Ok(done);
                        }
                    }
                    Ok(Completion::Normal(Value::Null))
                })
            }

            Stmt::Break(span) => {
                if self.loop_depth == 0 {
                    return Err(RuntimeError::new(span.line, RuntimeErrorKind::BreakOutsideLoop));
                }
                Ok(Completion::Break)
            }

            Stmt::Continue(span) => {
                if self.loop_depth == 0 {
                    return Err(RuntimeError::new(span.line, RuntimeErrorKind::ContinueOutsideLoop));
                }
                Ok(Completion::Continue)
            }

            Stmt::Try { block, catch, finally, .. } => {
                let mut outcome = self.exec_block(block);
                let caught = match (&outcome, catch) {
                    (Err(err), Some(clause)) => Some((err.message(), clause)),
                    _ => None,
                };
                if let Some((message, clause)) = caught {
                    let frame = self.scope.child();
                    frame.define(clause.param.clone(), Value::from(message));
                    outcome = self.with_scope(frame, |interp| interp.exec_stmts(&clause.body));
                }
                match finally {
                    // An abrupt completion or failure in `finally` replaces
                    // whatever the try/catch produced.
                    Some(stmts) => match self.exec_block(stmts) {
                        Ok(Completion::Normal(_)) => outcome,
                        overriding => overriding,
                    },
                    None => outcome,
                }
            }

            Stmt::Throw(expr, span) => {
                let value = self.eval_expr(expr)?;
                Err(RuntimeError::new(span.line, RuntimeErrorKind::Thrown(value.as_string())))
            }

            Stmt::Function(def) => {
                let f = self.closure(def);
                if let Some(name) = &def.name {
                    self.scope.define(name.clone(), f);
                }
                Ok(Completion::Normal(Value::Null))
            }
        }
    }

    // ─── Expressions ──────────────────────────────────────────────────────────

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        stacker::maybe_grow(RED_ZONE, STACK_SEGMENT, || self.eval_expr_inner(expr))
    }

    fn eval_expr_inner(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Number(n, _) => Ok(Value::Number(*n)),
            Expr::Str(s, _)    => Ok(Value::from(s.as_str())),
            Expr::Bool(b, _)   => Ok(Value::Bool(*b)),
            Expr::Null(_)      => Ok(Value::Null),

            Expr::Ident(name, span) => self.scope.get(name).ok_or_else(|| {
                RuntimeError::new(span.line, RuntimeErrorKind::UnboundVariable { name: name.clone() })
            }),

            Expr::Array(items, _) => {
                let values = items.iter().map(|e| self.eval_expr(e)).collect::<Result<Vec<_>, _>>()?;
                Ok(Value::array(values))
            }

            Expr::Object(entries, _) => {
                let mut obj = Object::new();
                for (key, expr) in entries {
                    let value = self.eval_expr(expr)?;
                    obj.set(key.clone(), value);
                }
                Ok(Value::object(obj))
            }

            Expr::Binary { left, op, right, .. } => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                Ok(binary(*op, &l, &r))
            }

            Expr::Logical { left, op, right, .. } => {
                let l = self.eval_expr(left)?;
                match op {
                    LogicalOp::And if l.as_boolean() => Ok(Value::Bool(self.eval_expr(right)?.as_boolean())),
                    LogicalOp::And => Ok(Value::Bool(false)),
                    LogicalOp::Or if l.as_boolean() => Ok(l),
                    LogicalOp::Or => self.eval_expr(right),
                }
            }

            Expr::Unary { op, operand, .. } => {
                let v = self.eval_expr(operand)?;
                Ok(match op {
                    UnaryOp::Neg => Value::Number(-v.as_number()),
                    UnaryOp::Not => Value::Bool(!v.as_boolean()),
                })
            }

            Expr::Call { callee, args, span } => self.eval_call(callee, args, span.line),

            Expr::Member { object, property, optional, .. } => {
                let obj = self.eval_expr(object)?;
                if *optional && obj.is_null() {
                    return Ok(Value::Null);
                }
                Ok(self.get_member(&obj, property))
            }

            Expr::Index { object, index, .. } => {
                let container = self.eval_expr(object)?;
                let key = self.eval_expr(index)?;
                Ok(read_index(&container, &key))
            }

            Expr::Ternary { condition, then_expr, else_expr, .. } => {
                if self.eval_expr(condition)?.as_boolean() {
                    self.eval_expr(then_expr)
                } else {
                    self.eval_expr(else_expr)
                }
            }

            Expr::Update { op, prefix, target, span } => self.eval_update(*op, *prefix, target, span.line),

            Expr::Assign { target, value, span } => {
                let value = self.eval_expr(value)?;
                self.assign(target, value.clone(), span.line)?;
                Ok(value)
            }

            Expr::CompoundAssign { target, op, value, span } => {
                let place = self.resolve_place(target, RuntimeErrorKind::InvalidAssignmentTarget, span.line)?;
                let current = self.load(&place, span.line)?;
                let rhs = self.eval_expr(value)?;
                let result = binary(*op, &current, &rhs);
                self.store(place, result.clone(), span.line)?;
                Ok(result)
            }

            Expr::Function(def) => Ok(self.closure(def)),
        }
    }

    fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>, RuntimeError> {
        args.iter().map(|a| self.eval_expr(a)).collect()
    }

    /// `recv.method(args)` dispatches straight to the built-in method table
    /// without materialising a bound function.
    fn eval_call(&mut self, callee: &Expr, args: &[Expr], line: usize) -> Result<Value, RuntimeError> {
        if let Expr::Member { object, property, optional, .. } = callee {
            let recv = self.eval_expr(object)?;
            if *optional && recv.is_null() {
                return Ok(Value::Null);
            }
            let args = self.eval_args(args)?;
            if let Some(method) = self.methods.lookup(&recv, property) {
                return method.call(self, &recv, &args).map_err(|e| e.at_line(line));
            }
            let f = self.get_member(&recv, property);
            return self.call_value(&f, &args, line);
        }

        let f = self.eval_expr(callee)?;
        let args = self.eval_args(args)?;
        self.call_value(&f, &args, line)
    }

    fn get_member(&self, obj: &Value, name: &str) -> Value {
        match obj {
            Value::Object(o) => o.borrow().get(name).cloned().unwrap_or(Value::Null),
            Value::Str(_) | Value::Array(_) => {
                if let Some(field) = self.methods.field(obj, name) {
                    return field;
                }
                match self.methods.lookup(obj, name) {
                    Some(method) => {
                        let recv = obj.clone();
                        Value::function(Function::native(name, move |interp, args| method.call(interp, &recv, args)))
                    }
                    None => Value::Null,
                }
            }
            _ => Value::Null,
        }
    }

    // ─── Assignment ───────────────────────────────────────────────────────────

    fn assign(&mut self, target: &Expr, value: Value, line: usize) -> Result<(), RuntimeError> {
        match target {
            Expr::Ident(name, _) => self.scope.assign(name, value).map_err(|k| RuntimeError::new(line, k)),
            Expr::Member { object, property, .. } => {
                // Writes to anything but an object are dropped.
                if let Value::Object(o) = self.eval_expr(object)? {
                    o.borrow_mut().set(property.clone(), value);
                }
                Ok(())
            }
            Expr::Index { object, index, .. } => {
                let container = self.eval_expr(object)?;
                let key = self.eval_expr(index)?;
                write_index(&container, &key, value).map_err(|k| RuntimeError::new(line, k))
            }
            _ => Err(RuntimeError::new(line, RuntimeErrorKind::InvalidAssignmentTarget)),
        }
    }

    fn eval_update(&mut self, op: UpdateOp, prefix: bool, target: &Expr, line: usize) -> Result<Value, RuntimeError> {
        let place = self.resolve_place(target, RuntimeErrorKind::InvalidUpdateOperand { op: op.symbol() }, line)?;
        let old = self.load(&place, line)?.as_number();
        let new = match op {
            UpdateOp::Increment => old + 1.0,
            UpdateOp::Decrement => old - 1.0,
        };
        self.store(place, Value::Number(new), line)?;
        Ok(Value::Number(if prefix { new } else { old }))
    }

    /// Evaluate the container and key of `target` once. `invalid` is raised
    /// for targets that cannot be written.
    fn resolve_place(&mut self, target: &Expr, invalid: RuntimeErrorKind, line: usize) -> Result<Place, RuntimeError> {
        match target {
            Expr::Ident(name, _) => Ok(Place::Var(name.clone())),
            Expr::Member { object, property, optional: false, .. } => {
                Ok(Place::Member(self.eval_expr(object)?, property.clone()))
            }
            Expr::Index { object, index, .. } => {
                let container = self.eval_expr(object)?;
                let key = self.eval_expr(index)?;
                match container {
                    Value::Array(_) | Value::Object(_) => Ok(Place::Index(container, key)),
                    _ => Err(RuntimeError::new(line, invalid)),
                }
            }
            _ => Err(RuntimeError::new(line, invalid)),
        }
    }

    fn load(&self, place: &Place, line: usize) -> Result<Value, RuntimeError> {
        match place {
            Place::Var(name) => self.scope.get(name).ok_or_else(|| {
                RuntimeError::new(line, RuntimeErrorKind::UnboundVariable { name: name.clone() })
            }),
            Place::Member(obj, name) => Ok(self.get_member(obj, name)),
            Place::Index(Value::Array(items), key) => {
                let items = items.borrow();
                let index = key.as_number() as i64;
                usize::try_from(index)
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .ok_or_else(|| {
                        RuntimeError::new(line, RuntimeErrorKind::IndexOutOfBounds { index, len: items.len() })
                    })
            }
            Place::Index(container, key) => Ok(read_index(container, key)),
        }
    }

    fn store(&mut self, place: Place, value: Value, line: usize) -> Result<(), RuntimeError> {
        match place {
            Place::Var(name) => self.scope.assign(&name, value).map_err(|k| RuntimeError::new(line, k)),
            Place::Member(Value::Object(o), name) => {
                o.borrow_mut().set(name, value);
                Ok(())
            }
            Place::Member(..) => Ok(()),
            Place::Index(container, key) => {
                write_index(&container, &key, value).map_err(|k| RuntimeError::new(line, k))
            }
        }
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// `None` keeps the loop going; `Some` is the loop's own completion.
fn loop_exit(completion: Completion) -> Option<Completion> {
    match completion {
        Completion::Normal(_) | Completion::Continue => None,
        Completion::Break => Some(Completion::Normal(Value::Null)),
        Completion::Return(v) => Some(Completion::Return(v)),
    }
}

fn binary(op: BinOp, l: &Value, r: &Value) -> Value {
    use std::cmp::Ordering::*;
    match op {
        BinOp::Add   => l.add(r),
        BinOp::Sub   => l.sub(r),
        BinOp::Mul   => l.mul(r),
        BinOp::Div   => l.div(r),
        BinOp::Mod   => l.rem(r),
        BinOp::Eq    => Value::Bool(l.strict_equals(r)),
        BinOp::NotEq => Value::Bool(!l.strict_equals(r)),
        BinOp::Lt    => Value::Bool(l.compare(r) == Less),
        BinOp::LtEq  => Value::Bool(l.compare(r) != Greater),
        BinOp::Gt    => Value::Bool(l.compare(r) == Greater),
        BinOp::GtEq  => Value::Bool(l.compare(r) != Less),
    }
}

/// The sequence a for-each walks, taken as a snapshot before the first pass.
fn iteration_values(iterable: &Value, kind: ForEachKind) -> Vec<Value> {
    let indices = |n: usize| -> Vec<Value> { (0..n).map(|i| Value::Number(i as f64)).collect() };
    match (iterable, kind) {
        (Value::Array(items), ForEachKind::Of) => items.borrow().clone(),
        (Value::Array(items), ForEachKind::In) => indices(items.borrow().len()),
        (Value::Object(obj), ForEachKind::Of)  => obj.borrow().values().cloned().collect(),
        (Value::Object(obj), ForEachKind::In)  => obj.borrow().keys().map(Value::from).collect(),
        (Value::Str(s), ForEachKind::Of)       => s.chars().map(|c| Value::from(c.to_string())).collect(),
        (Value::Str(s), ForEachKind::In)       => indices(s.chars().count()),
        _ => Vec::new(),
    }
}

fn read_index(container: &Value, key: &Value) -> Value {
    let position = || usize::try_from(key.as_number() as i64).ok();
    match container {
        Value::Array(items) => position().and_then(|i| items.borrow().get(i).cloned()).unwrap_or(Value::Null),
        Value::Str(s) => position()
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::from(c.to_string()))
            .unwrap_or(Value::Null),
        Value::Object(o) => o.borrow().get(&key.as_string()).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Largest run of nulls a single index write may add past the end of an array.
const MAX_ARRAY_GAP: usize = 1 << 16;

/// Arrays grow with nulls to fit the index, up to `MAX_ARRAY_GAP` past the
/// end; objects take any key.
fn write_index(container: &Value, key: &Value, value: Value) -> Result<(), RuntimeErrorKind> {
    match container {
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            let len = items.len();
            let index = key.as_number() as i64;
            let i = match usize::try_from(index) {
                Ok(i) if i.saturating_sub(len) <= MAX_ARRAY_GAP => i,
                _ => return Err(RuntimeErrorKind::IndexOutOfBounds { index, len }),
            };
            if i >= len {
                items.resize(i + 1, Value::Null);
            }
            items[i] = value;
            Ok(())
        }
        Value::Object(o) => {
            o.borrow_mut().set(key.as_string(), value);
            Ok(())
        }
        _ => Err(RuntimeErrorKind::InvalidAssignmentTarget),
    }
}
