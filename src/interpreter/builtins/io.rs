//! The `io` built-in module.

use std::io::BufRead;

use indexmap::IndexMap;

use crate::interpreter::error::RuntimeError;
use crate::interpreter::evaluator::Interpreter;
use crate::value::{Builtin, Module, Value};

use super::globals::builtin_print;

pub fn module() -> Value {
    let mut members = IndexMap::new();
    let print = Builtin::new("print", builtin_print);
    members.insert("print".to_string(), print.clone());
    members.insert("println".to_string(), print);
    members.insert("input".to_string(), Builtin::new("input", builtin_input));
    Module::new("io", members)
}

/// Reads one line from stdin, stripping the trailing newline. An optional
/// argument is rendered as a prompt first.
fn builtin_input(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    if let Some(prompt) = args.first() {
        interp.write_output(&prompt.to_string());
    }
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| RuntimeError::new(format!("input: failed to read line: {}", e)))?;
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Value::str(line))
}
