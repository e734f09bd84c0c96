//! Global built-in functions, defined in the global scope before execution.

use crate::interpreter::environment::EnvRef;
use crate::interpreter::error::RuntimeError;
use crate::interpreter::evaluator::Interpreter;
use crate::value::{Builtin, Value};

use super::expect_args;

pub fn register(env: &EnvRef) {
    env.define("len", Builtin::new("len", builtin_len));
    env.define("str", Builtin::new("str", builtin_str));
    env.define("int", Builtin::new("int", builtin_int));
    env.define("float", Builtin::new("float", builtin_float));
    env.define("type", Builtin::new("type", builtin_type));
    env.define("range", Builtin::new("range", builtin_range));
    env.define("append", Builtin::new("append", builtin_append));
    env.define("print", Builtin::new("print", builtin_print));
}

fn builtin_len(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    expect_args!(args, 1, "len");
    match &args[0] {
        Value::Str(s) => Ok(Value::Int(s.len() as i64)),
        Value::List(l) => Ok(Value::Int(l.borrow().len() as i64)),
        Value::Dict(d) => Ok(Value::Int(d.borrow().len() as i64)),
        other => Err(RuntimeError::new(format!(
            "len: unsupported type {}",
            other.type_name()
        ))),
    }
}

fn builtin_str(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    expect_args!(args, 1, "str");
    Ok(Value::str(args[0].to_string()))
}

fn builtin_int(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    expect_args!(args, 1, "int");
    match &args[0] {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(f) => Ok(Value::Int(*f as i64)),
        Value::Str(s) => parse_int_prefix(s).map(Value::Int).ok_or_else(|| {
            RuntimeError::new(format!("int: cannot convert '{}' to int", s))
        }),
        Value::Bool(b) => Ok(Value::Int(if *b { 1 } else { 0 })),
        other => Err(RuntimeError::new(format!(
            "int: unsupported type {}",
            other.type_name()
        ))),
    }
}

fn builtin_float(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    expect_args!(args, 1, "float");
    match &args[0] {
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::Str(s) => parse_float_prefix(s).map(Value::Float).ok_or_else(|| {
            RuntimeError::new(format!("float: cannot convert '{}' to float", s))
        }),
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        other => Err(RuntimeError::new(format!(
            "float: unsupported type {}",
            other.type_name()
        ))),
    }
}

/// Longest leading integer prefix after optional whitespace and sign;
/// trailing text is ignored. `None` when no digits lead the string or the
/// value overflows i64.
fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(&b'+') | Some(&b'-')) {
        end += 1;
    }
    let digits_start = end;
    while bytes.get(end).is_some_and(|b| b.is_ascii_digit()) {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    s[..end].parse().ok()
}

/// Longest leading floating-point prefix: optional sign, digits with an
/// optional fraction, and an exponent only when it has digits of its own.
fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(&b'+') | Some(&b'-')) {
        end += 1;
    }
    let mut saw_digit = false;
    while bytes.get(end).is_some_and(|b| b.is_ascii_digit()) {
        end += 1;
        saw_digit = true;
    }
    if bytes.get(end) == Some(&b'.') {
        end += 1;
        while bytes.get(end).is_some_and(|b| b.is_ascii_digit()) {
            end += 1;
            saw_digit = true;
        }
    }
    if !saw_digit {
        return None;
    }
    if matches!(bytes.get(end), Some(&b'e') | Some(&b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(&b'+') | Some(&b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while bytes.get(exp_end).is_some_and(|b| b.is_ascii_digit()) {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    s[..end].parse().ok()
}

fn builtin_type(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    expect_args!(args, 1, "type");
    Ok(Value::str(args[0].type_name()))
}

/// `range(stop)`, `range(start, stop)`, or `range(start, stop, step)`;
/// materialises the list eagerly.
fn builtin_range(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    fn as_int(value: &Value) -> Result<i64, RuntimeError> {
        value.as_number().map(|n| n as i64).ok_or_else(|| {
            RuntimeError::new(format!(
                "Expected numeric value, got {}",
                value.type_name()
            ))
        })
    }

    let (start, stop, step) = match args.len() {
        1 => (0, as_int(&args[0])?, 1),
        2 => (as_int(&args[0])?, as_int(&args[1])?, 1),
        3 => (as_int(&args[0])?, as_int(&args[1])?, as_int(&args[2])?),
        _ => return Err(RuntimeError::new("range: expected 1-3 arguments")),
    };
    if step == 0 {
        return Err(RuntimeError::new("range: step cannot be zero"));
    }

    let mut result = Vec::new();
    let mut i = start;
    if step > 0 {
        while i < stop {
            result.push(Value::Int(i));
            i += step;
        }
    } else {
        while i > stop {
            result.push(Value::Int(i));
            i += step;
        }
    }
    Ok(Value::list(result))
}

fn builtin_append(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    if args.len() != 2 {
        return Err(RuntimeError::new("append: expected 2 arguments (list, value)"));
    }
    match &args[0] {
        Value::List(list) => {
            list.borrow_mut().push(args[1].clone());
            Ok(Value::None)
        }
        _ => Err(RuntimeError::new("append: first argument must be a list")),
    }
}

/// Space-separated renderings of the arguments, then a newline, written to
/// the interpreter's output sink. Shared with the `io` module.
pub(crate) fn builtin_print(
    interp: &mut Interpreter,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&arg.to_string());
    }
    out.push('\n');
    interp.write_output(&out);
    Ok(Value::None)
}
