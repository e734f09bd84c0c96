use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{AssignOp, BinaryOp, Expr, ExprKind, Program, Stmt, StmtKind, UnaryOp};
use crate::diagnostic::{BoaError, Loc};
use crate::lexer::Lexer;
use crate::value::{values_equal, Builtin, Function, Module, Value};

use super::builtins;
use super::control_flow::Flow;
use super::environment::{EnvRef, Environment};
use super::error::RuntimeError;
use super::parser::Parser;

enum OutputSink {
    Stdout,
    Capture(Rc<RefCell<String>>),
}

/// Tree-walking evaluator. Owns the global scope (pre-seeded with the
/// built-in functions), the module cache (pre-seeded with `io` and `fs`),
/// the import base directory, and the output sink `print` writes to.
pub struct Interpreter {
    globals: EnvRef,
    base_dir: PathBuf,
    current_file: String,
    module_cache: HashMap<String, Value>,
    output: OutputSink,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Environment::new();
        builtins::globals::register(&globals);

        let mut module_cache = HashMap::new();
        module_cache.insert("io".to_string(), builtins::io::module());
        module_cache.insert("fs".to_string(), builtins::fs::module());

        Self {
            globals,
            base_dir: PathBuf::from("."),
            current_file: "<stdin>".to_string(),
            module_cache,
            output: OutputSink::Stdout,
        }
    }

    /// Base directory for `imp` resolution of `<name>.boa` files.
    pub fn set_base_dir(&mut self, dir: impl Into<PathBuf>) {
        self.base_dir = dir.into();
    }

    pub fn globals(&self) -> &EnvRef {
        &self.globals
    }

    pub fn current_file(&self) -> &str {
        &self.current_file
    }

    /// Redirect output into a buffer and return a handle to it.
    pub fn capture_output(&mut self) -> Rc<RefCell<String>> {
        let buffer = Rc::new(RefCell::new(String::new()));
        self.output = OutputSink::Capture(buffer.clone());
        buffer
    }

    pub fn write_output(&mut self, text: &str) {
        match &self.output {
            OutputSink::Stdout => {
                print!("{}", text);
                std::io::stdout().flush().ok();
            }
            OutputSink::Capture(buffer) => buffer.borrow_mut().push_str(text),
        }
    }

    /// Lex, parse, and execute a source string against the global scope,
    /// returning the value of the last statement.
    pub fn run(&mut self, source: &str, filename: &str) -> Result<Value, BoaError> {
        self.current_file = filename.to_string();
        let tokens = Lexer::new(source).tokenize()?;
        let program = Parser::new(tokens).parse_program()?;
        let globals = self.globals.clone();
        Ok(self.exec_top_level(&program.statements, &globals)?)
    }

    pub fn exec(&mut self, program: &Program) -> Result<Value, RuntimeError> {
        let globals = self.globals.clone();
        self.exec_top_level(&program.statements, &globals)
    }

    // -----------------------------------------------------------------
    // Statement execution
    // -----------------------------------------------------------------

    fn exec_top_level(&mut self, stmts: &[Stmt], env: &EnvRef) -> Result<Value, RuntimeError> {
        match self.exec_block(stmts, env)? {
            Flow::Value(value) => Ok(value),
            Flow::Return(_) => Err(RuntimeError::new("'ret' outside of a function")),
            Flow::Break => Err(RuntimeError::new("'break' outside of a loop")),
            Flow::Continue => Err(RuntimeError::new("'continue' outside of a loop")),
        }
    }

    /// A body's value is its last statement's value; unwinds pass through.
    fn exec_block(&mut self, stmts: &[Stmt], env: &EnvRef) -> Result<Flow, RuntimeError> {
        let mut last = Value::None;
        for stmt in stmts {
            match self.exec_stmt(stmt, env)? {
                Flow::Value(value) => last = value,
                unwind => return Ok(unwind),
            }
        }
        Ok(Flow::Value(last))
    }

    fn exec_stmt(&mut self, stmt: &Stmt, env: &EnvRef) -> Result<Flow, RuntimeError> {
        match &stmt.kind {
            StmtKind::Expr(expr) => Ok(Flow::Value(self.eval_expr(expr, env)?)),

            StmtKind::Assign { target, op, value } => {
                let val = self.eval_expr(value, env)?;
                self.assign_target(target, *op, val.clone(), env)?;
                Ok(Flow::Value(val))
            }

            StmtKind::Pass => Ok(Flow::Value(Value::None)),

            StmtKind::Return(value) => {
                let val = match value {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::None,
                };
                Ok(Flow::Return(val))
            }

            StmtKind::FnDef { name, params, body } => {
                let func = Value::Function(Rc::new(Function {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    closure: env.clone(),
                }));
                env.define(name, func.clone());
                Ok(Flow::Value(func))
            }

            StmtKind::If {
                condition,
                body,
                elifs,
                else_body,
            } => {
                if self.eval_expr(condition, env)?.is_truthy() {
                    return self.exec_block(body, env);
                }
                for (elif_cond, elif_body) in elifs {
                    if self.eval_expr(elif_cond, env)?.is_truthy() {
                        return self.exec_block(elif_body, env);
                    }
                }
                match else_body {
                    Some(body) => self.exec_block(body, env),
                    None => Ok(Flow::Value(Value::None)),
                }
            }

            StmtKind::For {
                var,
                iterable,
                body,
            } => {
                let iter_val = self.eval_expr(iterable, env)?;
                let items = match &iter_val {
                    Value::List(list) => list.borrow().clone(),
                    _ => {
                        return Err(RuntimeError::at(
                            "for: can only iterate over lists",
                            stmt.loc,
                        ))
                    }
                };

                let mut last = Value::None;
                for item in items {
                    env.assign(var, item);
                    match self.exec_block(body, env)? {
                        Flow::Value(value) => last = value,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Break => break,
                        Flow::Continue => continue,
                    }
                }
                Ok(Flow::Value(last))
            }

            StmtKind::While { condition, body } => {
                let mut last = Value::None;
                while self.eval_expr(condition, env)?.is_truthy() {
                    match self.exec_block(body, env)? {
                        Flow::Value(value) => last = value,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Break => break,
                        Flow::Continue => continue,
                    }
                }
                Ok(Flow::Value(last))
            }

            StmtKind::Import(names) => {
                for name in names {
                    self.import_module(name, env, stmt.loc)?;
                }
                Ok(Flow::Value(Value::None))
            }

            StmtKind::Try {
                body,
                except_var,
                except_body,
                finally_body,
            } => self.exec_try(body, except_var, except_body, finally_body, env),

            // Accepted by the grammar, ignored by the evaluator
            StmtKind::ClassDef { .. } => Ok(Flow::Value(Value::None)),
        }
    }

    fn exec_try(
        &mut self,
        body: &[Stmt],
        except_var: &Option<Rc<str>>,
        except_body: &Option<Vec<Stmt>>,
        finally_body: &Option<Vec<Stmt>>,
        env: &EnvRef,
    ) -> Result<Flow, RuntimeError> {
        match self.exec_block(body, env) {
            Ok(flow) => {
                // finally runs on success and when a return unwinds past us
                if let Some(unwind) = self.exec_finally(finally_body, env)? {
                    return Ok(unwind);
                }
                Ok(flow)
            }
            Err(err) => match except_body {
                Some(handler) => {
                    if let Some(var) = except_var {
                        env.assign(var, err.except_value());
                    }
                    match self.exec_block(handler, env) {
                        Ok(flow) => {
                            if let Some(unwind) = self.exec_finally(finally_body, env)? {
                                return Ok(unwind);
                            }
                            Ok(flow)
                        }
                        Err(handler_err) => {
                            self.exec_finally(finally_body, env)?;
                            Err(handler_err)
                        }
                    }
                }
                None => {
                    if let Some(unwind) = self.exec_finally(finally_body, env)? {
                        return Ok(unwind);
                    }
                    Err(err)
                }
            },
        }
    }

    /// Runs a finally body for its effects. A non-value unwind from the
    /// finally body replaces whatever outcome was in flight.
    fn exec_finally(
        &mut self,
        finally_body: &Option<Vec<Stmt>>,
        env: &EnvRef,
    ) -> Result<Option<Flow>, RuntimeError> {
        match finally_body {
            None => Ok(None),
            Some(body) => match self.exec_block(body, env)? {
                Flow::Value(_) => Ok(None),
                unwind => Ok(Some(unwind)),
            },
        }
    }

    fn import_module(&mut self, name: &str, env: &EnvRef, loc: Loc) -> Result<(), RuntimeError> {
        if let Some(module) = self.module_cache.get(name) {
            env.define(name, module.clone());
            return Ok(());
        }

        let path = self.base_dir.join(format!("{}.boa", name));
        let source = std::fs::read_to_string(&path).map_err(|_| {
            RuntimeError::at(
                format!("Cannot find module '{}' (looked in {})", name, path.display()),
                loc,
            )
        })?;
        let tokens = Lexer::new(&source)
            .tokenize()
            .map_err(|e| RuntimeError::at(format!("Cannot load module '{}': {}", name, e), loc))?;
        let program = Parser::new(tokens)
            .parse_program()
            .map_err(|e| RuntimeError::at(format!("Cannot load module '{}': {}", name, e), loc))?;

        // Cache before executing so a recursive import observes a partial
        // module instead of recursing forever.
        let module = Module::new(name, IndexMap::new());
        self.module_cache.insert(name.to_string(), module.clone());

        let module_env = Environment::with_parent(self.globals.clone());
        if let Err(err) = self.exec_top_level(&program.statements, &module_env) {
            self.module_cache.remove(name);
            return Err(err);
        }

        if let Value::Module(m) = &module {
            *m.members.borrow_mut() = module_env.snapshot();
        }
        env.define(name, module);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Expression evaluation
    // -----------------------------------------------------------------

    fn eval_expr(&mut self, expr: &Expr, env: &EnvRef) -> Result<Value, RuntimeError> {
        match &expr.kind {
            // A numerically integral literal becomes an Int
            ExprKind::Number(n) => {
                let v = *n;
                if v == v.trunc() && (-9e18..=9e18).contains(&v) {
                    Ok(Value::Int(v as i64))
                } else {
                    Ok(Value::Float(v))
                }
            }

            ExprKind::Str(s) => Ok(Value::str(s)),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::None => Ok(Value::None),

            ExprKind::Identifier(name) => env.get(name).ok_or_else(|| {
                RuntimeError::at(format!("Undefined variable '{}'", name), expr.loc)
            }),

            ExprKind::Binary { left, op, right } => match op {
                // Short-circuit: the deciding operand is the result
                BinaryOp::And => {
                    let left_val = self.eval_expr(left, env)?;
                    if !left_val.is_truthy() {
                        Ok(left_val)
                    } else {
                        self.eval_expr(right, env)
                    }
                }
                BinaryOp::Or => {
                    let left_val = self.eval_expr(left, env)?;
                    if left_val.is_truthy() {
                        Ok(left_val)
                    } else {
                        self.eval_expr(right, env)
                    }
                }
                _ => {
                    let left_val = self.eval_expr(left, env)?;
                    let right_val = self.eval_expr(right, env)?;
                    eval_binary_op(&left_val, *op, &right_val, expr.loc)
                }
            },

            ExprKind::Unary { op, operand } => {
                let val = self.eval_expr(operand, env)?;
                match op {
                    UnaryOp::Neg => match val {
                        Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
                        Value::Float(f) => Ok(Value::Float(-f)),
                        other => Err(RuntimeError::at(
                            format!("Cannot negate {}", other.type_name()),
                            expr.loc,
                        )),
                    },
                    UnaryOp::Pos => match val {
                        Value::Int(_) | Value::Float(_) => Ok(val),
                        other => Err(RuntimeError::at(
                            format!("Cannot apply unary + to {}", other.type_name()),
                            expr.loc,
                        )),
                    },
                    UnaryOp::Not => Ok(Value::Bool(!val.is_truthy())),
                }
            }

            ExprKind::List(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval_expr(element, env)?);
                }
                Ok(Value::list(values))
            }

            ExprKind::Dict(entries) => {
                let mut values = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let k = self.eval_expr(key, env)?;
                    let v = self.eval_expr(value, env)?;
                    values.push((k, v));
                }
                Ok(Value::dict(values))
            }

            ExprKind::Index { object, index } => {
                let obj = self.eval_expr(object, env)?;
                let idx = self.eval_expr(index, env)?;
                self.index_value(&obj, &idx, expr.loc)
            }

            ExprKind::Member { object, name } => {
                let obj = self.eval_expr(object, env)?;
                self.member_access(&obj, name, expr.loc)
            }

            ExprKind::Call { callee, args } => {
                let callee_val = self.eval_expr(callee, env)?;
                let mut arg_vals = Vec::with_capacity(args.len());
                for arg in args {
                    arg_vals.push(self.eval_expr(arg, env)?);
                }
                self.call_value(callee_val, arg_vals, expr.loc)
            }
        }
    }

    fn index_value(&self, obj: &Value, idx: &Value, loc: Loc) -> Result<Value, RuntimeError> {
        match obj {
            Value::List(list) => {
                let items = list.borrow();
                let i = resolve_index(idx, items.len(), loc)?
                    .ok_or_else(|| RuntimeError::at("Index out of range", loc))?;
                Ok(items[i].clone())
            }
            Value::Str(s) => {
                let bytes = s.as_bytes();
                let i = resolve_index(idx, bytes.len(), loc)?
                    .ok_or_else(|| RuntimeError::at("String index out of range", loc))?;
                Ok(Value::str((bytes[i] as char).to_string()))
            }
            Value::Dict(dict) => {
                for (key, value) in dict.borrow().iter() {
                    if values_equal(key, idx) {
                        return Ok(value.clone());
                    }
                }
                Err(RuntimeError::at("Key not found in dict", loc))
            }
            other => Err(RuntimeError::at(
                format!("Cannot index {}", other.type_name()),
                loc,
            )),
        }
    }

    fn member_access(&mut self, obj: &Value, name: &str, loc: Loc) -> Result<Value, RuntimeError> {
        match obj {
            Value::Module(module) => module.get(name).ok_or_else(|| {
                RuntimeError::at(
                    format!("Module '{}' has no member '{}'", module.name, name),
                    loc,
                )
            }),

            Value::List(list) => match name {
                "length" => Ok(Value::Int(list.borrow().len() as i64)),
                "append" => {
                    let list_ref = list.clone();
                    Ok(Builtin::new("append", move |_interp, args: Vec<Value>| {
                        if args.len() != 1 {
                            return Err(RuntimeError::new("append: expected 1 argument"));
                        }
                        list_ref.borrow_mut().push(args[0].clone());
                        Ok(Value::None)
                    }))
                }
                _ => Err(member_error(obj, name, loc)),
            },

            Value::Str(s) => match name {
                "length" => Ok(Value::Int(s.len() as i64)),
                "upper" => {
                    let text = s.clone();
                    Ok(Builtin::new("upper", move |_interp, _args| {
                        Ok(Value::str(text.to_ascii_uppercase()))
                    }))
                }
                "lower" => {
                    let text = s.clone();
                    Ok(Builtin::new("lower", move |_interp, _args| {
                        Ok(Value::str(text.to_ascii_lowercase()))
                    }))
                }
                _ => Err(member_error(obj, name, loc)),
            },

            _ => Err(member_error(obj, name, loc)),
        }
    }

    fn call_value(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        loc: Loc,
    ) -> Result<Value, RuntimeError> {
        match callee {
            Value::Builtin(builtin) => (builtin.func)(self, args).map_err(|e| e.with_loc(loc)),

            Value::Function(func) => {
                if args.len() != func.params.len() {
                    return Err(RuntimeError::at(
                        format!(
                            "Function '{}' expected {} arguments, got {}",
                            func.name,
                            func.params.len(),
                            args.len()
                        ),
                        loc,
                    ));
                }

                let fn_env = Environment::with_parent(func.closure.clone());
                for (param, arg) in func.params.iter().zip(args) {
                    fn_env.define(param, arg);
                }

                match self.exec_block(&func.body, &fn_env)? {
                    // Implicit return: the value of the last statement
                    Flow::Value(value) | Flow::Return(value) => Ok(value),
                    Flow::Break => Err(RuntimeError::new("'break' outside of a loop")),
                    Flow::Continue => Err(RuntimeError::new("'continue' outside of a loop")),
                }
            }

            _ => Err(RuntimeError::at("Object is not callable", loc)),
        }
    }

    // -----------------------------------------------------------------
    // Assignment targets
    // -----------------------------------------------------------------

    fn assign_target(
        &mut self,
        target: &Expr,
        op: AssignOp,
        value: Value,
        env: &EnvRef,
    ) -> Result<(), RuntimeError> {
        match &target.kind {
            ExprKind::Identifier(name) => {
                let stored = match op.binary_op() {
                    None => value,
                    // Compound assignment requires an existing binding
                    Some(bin) => {
                        let existing = env.get(name).ok_or_else(|| {
                            RuntimeError::at(format!("Undefined variable '{}'", name), target.loc)
                        })?;
                        eval_binary_op(&existing, bin, &value, target.loc)?
                    }
                };
                env.assign(name, stored);
                Ok(())
            }

            ExprKind::Index { object, index } => {
                let obj = self.eval_expr(object, env)?;
                let idx = self.eval_expr(index, env)?;
                match &obj {
                    Value::List(list) => {
                        let stored = match op.binary_op() {
                            None => value,
                            Some(bin) => {
                                let current = self.index_value(&obj, &idx, target.loc)?;
                                eval_binary_op(&current, bin, &value, target.loc)?
                            }
                        };
                        let mut items = list.borrow_mut();
                        let i = resolve_index(&idx, items.len(), target.loc)?
                            .ok_or_else(|| RuntimeError::at("Index out of range", target.loc))?;
                        items[i] = stored;
                        Ok(())
                    }
                    Value::Dict(dict) => {
                        let stored = match op.binary_op() {
                            None => value,
                            Some(bin) => {
                                let current = self.index_value(&obj, &idx, target.loc)?;
                                eval_binary_op(&current, bin, &value, target.loc)?
                            }
                        };
                        let mut entries = dict.borrow_mut();
                        for (key, slot) in entries.iter_mut() {
                            if values_equal(key, &idx) {
                                *slot = stored;
                                return Ok(());
                            }
                        }
                        // New keys append, preserving insertion order
                        entries.push((idx, stored));
                        Ok(())
                    }
                    other => Err(RuntimeError::at(
                        format!("Cannot index {}", other.type_name()),
                        target.loc,
                    )),
                }
            }

            ExprKind::Member { object, name } => {
                let obj = self.eval_expr(object, env)?;
                match &obj {
                    Value::Module(module) => {
                        let stored = match op.binary_op() {
                            None => value,
                            Some(bin) => {
                                let current = module.get(name).ok_or_else(|| {
                                    RuntimeError::at(
                                        format!(
                                            "Module '{}' has no member '{}'",
                                            module.name, name
                                        ),
                                        target.loc,
                                    )
                                })?;
                                eval_binary_op(&current, bin, &value, target.loc)?
                            }
                        };
                        module.members.borrow_mut().insert(name.to_string(), stored);
                        Ok(())
                    }
                    other => Err(RuntimeError::at(
                        format!("Cannot set member on {}", other.type_name()),
                        target.loc,
                    )),
                }
            }

            _ => Err(RuntimeError::at("Invalid assignment target", target.loc)),
        }
    }
}

fn member_error(obj: &Value, name: &str, loc: Loc) -> RuntimeError {
    RuntimeError::at(
        format!(
            "Cannot access member '{}' on {}",
            name,
            obj.type_name()
        ),
        loc,
    )
}

/// A list/string index: any numeric value, truncated; negative indices add
/// the length. `None` means out of range.
fn resolve_index(idx: &Value, len: usize, loc: Loc) -> Result<Option<usize>, RuntimeError> {
    let mut i = number_operand(idx, loc)? as i64;
    if i < 0 {
        i += len as i64;
    }
    if i < 0 || i >= len as i64 {
        return Ok(None);
    }
    Ok(Some(i as usize))
}

fn number_operand(value: &Value, loc: Loc) -> Result<f64, RuntimeError> {
    value.as_number().ok_or_else(|| {
        RuntimeError::at(
            format!("Expected numeric value, got {}", value.type_name()),
            loc,
        )
    })
}

// ---------------------------------------------------------------------
// Operator dispatch
// ---------------------------------------------------------------------

fn eval_binary_op(
    left: &Value,
    op: BinaryOp,
    right: &Value,
    loc: Loc,
) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Add => add(left, right, loc),
        BinaryOp::Sub => subtract(left, right, loc),
        BinaryOp::Mul => multiply(left, right, loc),
        BinaryOp::Div => divide(left, right, loc),
        BinaryOp::Mod => modulo(left, right, loc),
        BinaryOp::Pow => power(left, right, loc),
        BinaryOp::Eq => Ok(Value::Bool(values_equal(left, right))),
        BinaryOp::NotEq => Ok(Value::Bool(!values_equal(left, right))),
        BinaryOp::Less => Ok(Value::Bool(compare(left, right, loc)? == Ordering::Less)),
        BinaryOp::LessEq => Ok(Value::Bool(compare(left, right, loc)? != Ordering::Greater)),
        BinaryOp::Greater => Ok(Value::Bool(compare(left, right, loc)? == Ordering::Greater)),
        BinaryOp::GreaterEq => Ok(Value::Bool(compare(left, right, loc)? != Ordering::Less)),
        // Non-short-circuit fallback for the compound-assignment path; the
        // expression evaluator handles these before operand evaluation
        BinaryOp::And => Ok(if left.is_truthy() {
            right.clone()
        } else {
            left.clone()
        }),
        BinaryOp::Or => Ok(if left.is_truthy() {
            left.clone()
        } else {
            right.clone()
        }),
    }
}

fn add(left: &Value, right: &Value, loc: Loc) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{}{}", a, b))),
        (Value::List(a), Value::List(b)) => {
            let mut out = a.borrow().clone();
            out.extend(b.borrow().iter().cloned());
            Ok(Value::list(out))
        }
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(*b))),
        _ => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => Ok(Value::Float(a + b)),
            _ => Err(RuntimeError::at(
                format!("Cannot add {} and {}", left.type_name(), right.type_name()),
                loc,
            )),
        },
    }
}

fn subtract(left: &Value, right: &Value, loc: Loc) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_sub(*b))),
        _ => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => Ok(Value::Float(a - b)),
            _ => Err(RuntimeError::at(
                format!(
                    "Cannot subtract {} and {}",
                    left.type_name(),
                    right.type_name()
                ),
                loc,
            )),
        },
    }
}

fn multiply(left: &Value, right: &Value, loc: Loc) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_mul(*b))),
        // String repetition: string * int only
        (Value::Str(s), Value::Int(n)) => Ok(Value::str(s.repeat((*n).max(0) as usize))),
        _ => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => Ok(Value::Float(a * b)),
            _ => Err(RuntimeError::at(
                format!(
                    "Cannot multiply {} and {}",
                    left.type_name(),
                    right.type_name()
                ),
                loc,
            )),
        },
    }
}

fn divide(left: &Value, right: &Value, loc: Loc) -> Result<Value, RuntimeError> {
    let r = number_operand(right, loc)?;
    if r == 0.0 {
        return Err(RuntimeError::at("Division by zero", loc));
    }
    match (left, right) {
        // Integer division truncates toward zero
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_div(*b))),
        _ => {
            let l = number_operand(left, loc)?;
            Ok(Value::Float(l / r))
        }
    }
}

fn modulo(left: &Value, right: &Value, loc: Loc) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                return Err(RuntimeError::at("Modulo by zero", loc));
            }
            Ok(Value::Int(a.wrapping_rem(*b)))
        }
        _ => {
            let r = number_operand(right, loc)?;
            if r == 0.0 {
                return Err(RuntimeError::at("Modulo by zero", loc));
            }
            let l = number_operand(left, loc)?;
            Ok(Value::Float(l % r))
        }
    }
}

fn power(left: &Value, right: &Value, loc: Loc) -> Result<Value, RuntimeError> {
    match (left, right) {
        // Repeated squaring keeps int ** non-negative-int in the int domain
        (Value::Int(a), Value::Int(b)) if *b >= 0 => {
            let mut result: i64 = 1;
            let mut base = *a;
            let mut exp = *b;
            while exp > 0 {
                if exp % 2 == 1 {
                    result = result.wrapping_mul(base);
                }
                base = base.wrapping_mul(base);
                exp /= 2;
            }
            Ok(Value::Int(result))
        }
        _ => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => Ok(Value::Float(a.powf(b))),
            _ => Err(RuntimeError::at(
                format!("Cannot exponentiate {}", left.type_name()),
                loc,
            )),
        },
    }
}

/// Ordering is defined for two numerics or two strings (byte-wise).
fn compare(left: &Value, right: &Value, loc: Loc) -> Result<Ordering, RuntimeError> {
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal));
    }
    if let (Value::Str(a), Value::Str(b)) = (left, right) {
        return Ok(a.as_bytes().cmp(b.as_bytes()));
    }
    Err(RuntimeError::at(
        format!(
            "Cannot compare {} and {}",
            left.type_name(),
            right.type_name()
        ),
        loc,
    ))
}

// ---------------------------------------------------------------------
// Host conveniences
// ---------------------------------------------------------------------

/// Run a source string in a fresh interpreter with a captured output sink
/// and return everything it printed.
pub fn run_and_capture(source: &str) -> Result<String, BoaError> {
    let mut interp = Interpreter::new();
    let buffer = interp.capture_output();
    interp.run(source, "<test>")?;
    let output = buffer.borrow().clone();
    Ok(output)
}

/// Convenience used by the CLI: execute a file with its parent directory as
/// the import base.
pub fn base_dir_for(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> String {
        run_and_capture(source).expect("program failed")
    }

    fn run_value(source: &str) -> Value {
        let mut interp = Interpreter::new();
        interp.capture_output();
        interp.run(source, "<test>").expect("program failed")
    }

    fn run_err(source: &str) -> RuntimeError {
        let mut interp = Interpreter::new();
        interp.capture_output();
        match interp.run(source, "<test>") {
            Err(BoaError::Runtime(e)) => e,
            other => panic!("expected runtime error, got {:?}", other),
        }
    }

    #[test]
    fn arithmetic() {
        assert_eq!(run("print(2 + 3)\n"), "5\n");
        assert_eq!(run("print(10 - 3)\n"), "7\n");
        assert_eq!(run("print(4 * 5)\n"), "20\n");
        assert_eq!(run("print(10 / 3)\n"), "3\n");
        assert_eq!(run("print(10 % 3)\n"), "1\n");
        assert_eq!(run("print(2 ** 10)\n"), "1024\n");
    }

    #[test]
    fn operator_precedence() {
        assert_eq!(run("print(2 + 3 * 4)\n"), "14\n");
        assert_eq!(run("print((2 + 3) * 4)\n"), "20\n");
    }

    #[test]
    fn variables_and_compound_assignment() {
        assert_eq!(run("x = 42\nprint(x)\n"), "42\n");
        assert_eq!(run("x = 1\nx += 2\nprint(x)\n"), "3\n");
        assert_eq!(run("x = 10\nx -= 3\nx *= 2\nx /= 7\nprint(x)\n"), "2\n");
    }

    #[test]
    fn compound_assignment_requires_existing_binding() {
        let err = run_err("y += 1\n");
        assert_eq!(err.message, "Undefined variable 'y'");
    }

    #[test]
    fn strings() {
        assert_eq!(run("print(\"hello\" + \" world\")\n"), "hello world\n");
        assert_eq!(run("print(\"ab\" * 3)\n"), "ababab\n");
        assert_eq!(run("print(len(\"hello\"))\n"), "5\n");
        assert_eq!(run("print(\"hello\"[0])\n"), "h\n");
        assert_eq!(run("print(\"hello\"[-1])\n"), "o\n");
    }

    #[test]
    fn bool_ops_return_deciding_operand() {
        assert_eq!(run("print(true and false)\n"), "false\n");
        assert_eq!(run("print(true or false)\n"), "true\n");
        assert_eq!(run("print(not true)\n"), "false\n");
        assert_eq!(run("print(0 or \"fallback\")\n"), "fallback\n");
        assert_eq!(run("print(1 and 2)\n"), "2\n");
        assert_eq!(run("print(none or none)\n"), "none\n");
    }

    #[test]
    fn short_circuit_skips_the_right_operand() {
        let src = "fn boom():\n    1 / 0\nprint(false and boom())\nprint(true or boom())\n";
        assert_eq!(run(src), "false\ntrue\n");
    }

    #[test]
    fn comparisons() {
        assert_eq!(run("print(1 < 2)\n"), "true\n");
        assert_eq!(run("print(2 <= 2)\n"), "true\n");
        assert_eq!(run("print(3 > 2)\n"), "true\n");
        assert_eq!(run("print(2 == 2)\n"), "true\n");
        assert_eq!(run("print(2 != 3)\n"), "true\n");
        assert_eq!(run("print(1 == 1.0)\n"), "true\n");
        assert_eq!(run("print(2 > 1.5)\n"), "true\n");
        assert_eq!(run("print(\"abc\" < \"abd\")\n"), "true\n");
    }

    #[test]
    fn if_elif_else() {
        let src = "x = 5\nif x > 10:\n    print(\"a\")\nelif x > 3:\n    print(\"b\")\nelse:\n    print(\"c\")\n";
        assert_eq!(run(src), "b\n");
    }

    #[test]
    fn for_loop_over_range() {
        assert_eq!(run("for i in range(5):\n    print(i)\n"), "0\n1\n2\n3\n4\n");
    }

    #[test]
    fn while_loop() {
        let src = "x = 0\nwhile x < 3:\n    print(x)\n    x += 1\n";
        assert_eq!(run(src), "0\n1\n2\n");
    }

    #[test]
    fn function_implicit_return() {
        let src = "fn add(a, b):\n    a + b\nprint(add(3, 4))\n";
        assert_eq!(run(src), "7\n");
    }

    #[test]
    fn function_explicit_return() {
        let src = "fn max_val(a, b):\n    if a > b:\n        ret a\n    ret b\nprint(max_val(3, 7))\n";
        assert_eq!(run(src), "7\n");
    }

    #[test]
    fn recursion() {
        let src = "fn fib(n):\n    if n < 2:\n        n\n    else:\n        fib(n - 1) + fib(n - 2)\nprint(fib(10))\n";
        assert_eq!(run(src), "55\n");
    }

    #[test]
    fn nested_function_closure() {
        let src = "fn outer(x):\n    fn inner(y):\n        x + y\n    inner(10)\nprint(outer(5))\n";
        assert_eq!(run(src), "15\n");
    }

    #[test]
    fn closure_mutates_enclosing_scope_by_reference() {
        let src = "counter = 0\nfn bump():\n    counter = counter + 1\nbump()\nbump()\nprint(counter)\n";
        assert_eq!(run(src), "2\n");
    }

    #[test]
    fn assignment_updates_enclosing_binding() {
        let src = "x = 1\nfn f():\n    x = 2\n    x\nprint(f())\nprint(x)\n";
        assert_eq!(run(src), "2\n2\n");
    }

    #[test]
    fn try_except_catches_runtime_error() {
        let src = "try:\n    x = 1 / 0\nexcept e:\n    print(\"caught\")\n";
        assert_eq!(run(src), "caught\n");
    }

    #[test]
    fn except_var_binds_the_message() {
        let src = "try:\n    1 / 0\nexcept e:\n    print(e)\n";
        assert_eq!(run(src), "Division by zero\n");
    }

    #[test]
    fn finally_runs_on_success_and_on_error() {
        let src = "try:\n    print(\"body\")\nfinally:\n    print(\"cleanup\")\n";
        assert_eq!(run(src), "body\ncleanup\n");

        let src = "try:\n    1 / 0\nexcept:\n    print(\"caught\")\nfinally:\n    print(\"cleanup\")\n";
        assert_eq!(run(src), "caught\ncleanup\n");
    }

    #[test]
    fn finally_without_except_reraises() {
        let mut interp = Interpreter::new();
        let buffer = interp.capture_output();
        let src = "try:\n    1 / 0\nfinally:\n    print(\"cleanup\")\n";
        let err = interp.run(src, "<test>").expect_err("should propagate");
        assert_eq!(*buffer.borrow(), "cleanup\n");
        assert!(err.to_string().contains("Division by zero"));
    }

    #[test]
    fn finally_runs_when_return_unwinds_past_it() {
        let src = "fn f():\n    try:\n        ret 1\n    finally:\n        print(\"cleanup\")\nprint(f())\n";
        assert_eq!(run(src), "cleanup\n1\n");
    }

    #[test]
    fn list_operations() {
        assert_eq!(run("x = [1, 2, 3]\nprint(len(x))\n"), "3\n");
        assert_eq!(run("x = [1, 2, 3]\nprint(x[0])\n"), "1\n");
        assert_eq!(run("x = [1, 2, 3]\nprint(x[-1])\n"), "3\n");
        assert_eq!(run("print([1, 2, 3] + [4, 5])\n"), "[1, 2, 3, 4, 5]\n");
        assert_eq!(run("x = [1, 2, 3]\nx[1] = 20\nprint(x)\n"), "[1, 20, 3]\n");
    }

    #[test]
    fn list_aliasing_shares_mutation() {
        let src = "a = [1, 2]\nb = a\nappend(b, 3)\nprint(a)\n";
        assert_eq!(run(src), "[1, 2, 3]\n");
    }

    #[test]
    fn list_member_methods() {
        assert_eq!(run("x = [1, 2]\nprint(x.length)\n"), "2\n");
        assert_eq!(run("x = [1, 2]\nx.append(3)\nprint(x)\n"), "[1, 2, 3]\n");
    }

    #[test]
    fn string_member_methods() {
        assert_eq!(run("print(\"hi\".length)\n"), "2\n");
        assert_eq!(run("print(\"hi\".upper())\n"), "HI\n");
        assert_eq!(run("print(\"Hi\".lower())\n"), "hi\n");
    }

    #[test]
    fn dict_operations() {
        let src = "d = {\"a\": 1, \"b\": 2}\nprint(d[\"a\"])\n";
        assert_eq!(run(src), "1\n");
        let src = "d = {\"a\": 1}\nd[\"b\"] = 2\nd[\"a\"] = 10\nprint(d)\n";
        assert_eq!(run(src), "{a: 10, b: 2}\n");
    }

    #[test]
    fn builtin_conversions() {
        assert_eq!(run("print(int(3.7))\n"), "3\n");
        assert_eq!(run("print(float(3))\n"), "3\n");
        assert_eq!(run("print(str(42))\n"), "42\n");
        assert_eq!(run("print(int(\"12\"))\n"), "12\n");
        assert_eq!(run("print(int(true))\n"), "1\n");
    }

    #[test]
    fn string_conversions_take_the_leading_numeric_prefix() {
        // Trailing garbage is ignored, as with stoll/stod
        assert_eq!(run("print(int(\"12.5\"))\n"), "12\n");
        assert_eq!(run("print(int(\"42abc\"))\n"), "42\n");
        assert_eq!(run("print(int(\"  -7xyz\"))\n"), "-7\n");
        assert_eq!(run("print(float(\"3abc\"))\n"), "3\n");
        assert_eq!(run("print(float(\"2.5e2x\"))\n"), "250\n");
        assert_eq!(run("print(float(\"12e\"))\n"), "12\n");
    }

    #[test]
    fn string_conversions_need_a_numeric_prefix() {
        assert_eq!(
            run_err("int(\"abc\")\n").message,
            "int: cannot convert 'abc' to int"
        );
        assert_eq!(
            run_err("int(\"\")\n").message,
            "int: cannot convert '' to int"
        );
        assert_eq!(
            run_err("float(\"x1\")\n").message,
            "float: cannot convert 'x1' to float"
        );
    }

    #[test]
    fn builtin_type() {
        assert_eq!(run("print(type(42))\n"), "int\n");
        assert_eq!(run("print(type(3.14))\n"), "float\n");
        assert_eq!(run("print(type(\"hi\"))\n"), "string\n");
        assert_eq!(run("print(type(true))\n"), "bool\n");
        assert_eq!(run("print(type(none))\n"), "none\n");
        assert_eq!(run("print(type([]))\n"), "list\n");
        assert_eq!(run("print(type({}))\n"), "dict\n");
    }

    #[test]
    fn builtin_range_variants() {
        assert_eq!(run("print(range(5))\n"), "[0, 1, 2, 3, 4]\n");
        assert_eq!(run("print(range(2, 5))\n"), "[2, 3, 4]\n");
        assert_eq!(run("print(range(0, 10, 3))\n"), "[0, 3, 6, 9]\n");
        assert_eq!(run("print(range(5, 0, -2))\n"), "[5, 3, 1]\n");
        assert_eq!(run("print(range(3, 3))\n"), "[]\n");
    }

    #[test]
    fn multiple_print_arguments() {
        assert_eq!(run("print(1, 2, 3)\n"), "1 2 3\n");
        assert_eq!(run("print()\n"), "\n");
    }

    #[test]
    fn unary_operators() {
        assert_eq!(run("print(-5)\n"), "-5\n");
        assert_eq!(run("print(+5)\n"), "5\n");
        assert_eq!(run("print(-2 ** 2)\n"), "-4\n");
    }

    #[test]
    fn float_arithmetic() {
        assert_eq!(run("print(1.5 + 2.5)\n"), "4\n");
        assert_eq!(run("print(3.0 * 2.0)\n"), "6\n");
        assert_eq!(run("print(7.5 / 2)\n"), "3.75\n");
    }

    #[test]
    fn integral_float_literal_is_an_int() {
        assert_eq!(run("print(type(2.0))\n"), "int\n");
        assert_eq!(run("print(type(2.5))\n"), "float\n");
    }

    #[test]
    fn pass_statement() {
        let src = "fn empty():\n    pass\nempty()\nprint(\"ok\")\n";
        assert_eq!(run(src), "ok\n");
    }

    #[test]
    fn class_def_is_ignored() {
        let src = "class Point:\n    pass\nprint(\"ok\")\n";
        assert_eq!(run(src), "ok\n");
    }

    #[test]
    fn loop_yields_last_body_value() {
        assert_eq!(run_value("for i in range(3):\n    i * 10\n"), Value::Int(20));
        assert_eq!(
            run_value("x = 0\nwhile x < 3:\n    x += 1\n    x * 2\n"),
            Value::Int(6)
        );
    }

    #[test]
    fn undefined_variable_error() {
        let err = run_err("print(missing)\n");
        assert_eq!(err.message, "Undefined variable 'missing'");
        assert_eq!(err.loc, Some(Loc::new(1, 7)));
    }

    #[test]
    fn division_by_zero_error() {
        assert_eq!(run_err("1 / 0\n").message, "Division by zero");
        assert_eq!(run_err("1.5 / 0\n").message, "Division by zero");
        assert_eq!(run_err("1 % 0\n").message, "Modulo by zero");
    }

    #[test]
    fn index_errors() {
        assert_eq!(run_err("[1, 2][5]\n").message, "Index out of range");
        assert_eq!(run_err("[1, 2][-3]\n").message, "Index out of range");
        assert_eq!(run_err("{\"a\": 1}[\"b\"]\n").message, "Key not found in dict");
        assert_eq!(run_err("42[0]\n").message, "Cannot index int");
    }

    #[test]
    fn arity_mismatch_error() {
        let err = run_err("fn f(a, b):\n    a + b\nf(1)\n");
        assert_eq!(err.message, "Function 'f' expected 2 arguments, got 1");
    }

    #[test]
    fn non_callable_error() {
        assert_eq!(run_err("x = 1\nx()\n").message, "Object is not callable");
    }

    #[test]
    fn for_requires_a_list() {
        let err = run_err("for x in 42:\n    x\n");
        assert_eq!(err.message, "for: can only iterate over lists");
    }

    #[test]
    fn type_mismatch_errors() {
        assert_eq!(run_err("1 + \"a\"\n").message, "Cannot add int and string");
        assert_eq!(
            run_err("[1] < [2]\n").message,
            "Cannot compare list and list"
        );
        assert_eq!(run_err("-\"a\"\n").message, "Cannot negate string");
    }

    #[test]
    fn invalid_assignment_target() {
        let err = run_err("1 + 2 = 3\n");
        assert_eq!(err.message, "Invalid assignment target");
    }

    #[test]
    fn ret_outside_function_is_an_error() {
        let err = run_err("ret 1\n");
        assert_eq!(err.message, "'ret' outside of a function");
    }

    #[test]
    fn collection_equality_is_false() {
        assert_eq!(run("print([1] == [1])\n"), "false\n");
        assert_eq!(run("print({} == {})\n"), "false\n");
    }

    #[test]
    fn power_identity() {
        assert_eq!(run("print(3 ** 0)\n"), "1\n");
        assert_eq!(run("print(3 ** 1)\n"), "3\n");
        assert_eq!(run("print(3 ** 4)\n"), "81\n");
        assert_eq!(run("print(2 ** -1)\n"), "0.5\n");
    }

    #[test]
    fn range_length_law() {
        for (a, b, s) in [(0i64, 10i64, 1i64), (0, 10, 3), (10, 0, -1), (5, 5, 1), (0, 7, 2)] {
            let expected = if s > 0 {
                ((b - a).max(0) + s - 1) / s
            } else {
                ((a - b).max(0) + (-s) - 1) / (-s)
            };
            let src = format!("print(len(range({}, {}, {})))\n", a, b, s);
            assert_eq!(run(&src), format!("{}\n", expected));
        }
    }

    #[test]
    fn index_symmetry() {
        let src = "xs = [4, 5, 6]\nprint(xs[-1] == xs[len(xs) - 1])\n";
        assert_eq!(run(src), "true\n");
    }

    #[test]
    fn statement_value_of_assignment_is_the_rhs() {
        assert_eq!(run_value("x = 5\n"), Value::Int(5));
        assert_eq!(run_value("x = 1\nx += 4\n"), Value::Int(4));
    }
}

