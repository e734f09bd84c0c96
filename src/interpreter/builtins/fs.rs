//! The `fs` built-in module. File handles are scoped to each call: they are
//! opened, used, and closed before the builtin returns.

use indexmap::IndexMap;

use crate::interpreter::error::RuntimeError;
use crate::interpreter::evaluator::Interpreter;
use crate::value::{Builtin, Module, Value};

pub fn module() -> Value {
    let mut members = IndexMap::new();
    members.insert(
        "read_all_bytes".to_string(),
        Builtin::new("read_all_bytes", read_all_bytes),
    );
    members.insert(
        "write_all_bytes".to_string(),
        Builtin::new("write_all_bytes", write_all_bytes),
    );
    members.insert("read_text".to_string(), Builtin::new("read_text", read_text));
    members.insert(
        "write_text".to_string(),
        Builtin::new("write_text", write_text),
    );
    Module::new("fs", members)
}

fn path_arg<'a>(args: &'a [Value], who: &str) -> Result<&'a str, RuntimeError> {
    match args.first() {
        Some(Value::Str(path)) => Ok(path),
        _ => Err(RuntimeError::new(format!("{}: expected string argument", who))),
    }
}

fn read_all_bytes(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let path = path_arg(&args, "fs.read_all_bytes")?;
    let bytes = std::fs::read(path).map_err(|_| {
        RuntimeError::new(format!("fs.read_all_bytes: cannot open file '{}'", path))
    })?;
    // Strings are UTF-8; refuse content we cannot hold rather than
    // substituting replacement characters and corrupting a round trip
    let text = String::from_utf8(bytes).map_err(|_| {
        RuntimeError::new(format!(
            "fs.read_all_bytes: file '{}' is not valid UTF-8",
            path
        ))
    })?;
    Ok(Value::str(text))
}

fn write_all_bytes(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    if args.len() < 2 || !matches!(args[0], Value::Str(_)) {
        return Err(RuntimeError::new(
            "fs.write_all_bytes: expected (filename, data)",
        ));
    }
    let path = path_arg(&args, "fs.write_all_bytes")?;
    std::fs::write(path, args[1].to_string().as_bytes()).map_err(|_| {
        RuntimeError::new(format!("fs.write_all_bytes: cannot open file '{}'", path))
    })?;
    Ok(Value::None)
}

fn read_text(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let path = path_arg(&args, "fs.read_text")?;
    let text = std::fs::read_to_string(path).map_err(|_| {
        RuntimeError::new(format!("fs.read_text: cannot open file '{}'", path))
    })?;
    Ok(Value::str(text))
}

fn write_text(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    if args.len() < 2 {
        return Err(RuntimeError::new("fs.write_text: expected (filename, text)"));
    }
    let path = path_arg(&args, "fs.write_text")?;
    std::fs::write(path, args[1].to_string().as_bytes()).map_err(|_| {
        RuntimeError::new(format!("fs.write_text: cannot open file '{}'", path))
    })?;
    Ok(Value::None)
}
