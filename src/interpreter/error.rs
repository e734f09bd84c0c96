use std::fmt;

use crate::diagnostic::Loc;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub message: String,
    pub loc: Option<Loc>,
    /// Set when the error carries a raised Boa value (the reserved raise
    /// channel); `except var` then binds the value instead of a string.
    pub thrown: Option<Value>,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            loc: None,
            thrown: None,
        }
    }

    pub fn at(message: impl Into<String>, loc: Loc) -> Self {
        Self {
            message: message.into(),
            loc: Some(loc),
            thrown: None,
        }
    }

    pub fn raised(value: Value) -> Self {
        Self {
            message: value.to_string(),
            loc: None,
            thrown: Some(value),
        }
    }

    /// Attach a location if the error does not already carry one.
    pub fn with_loc(mut self, loc: Loc) -> Self {
        self.loc.get_or_insert(loc);
        self
    }

    /// The value `except var` binds: the thrown value, or the bare message.
    pub fn except_value(&self) -> Value {
        match &self.thrown {
            Some(value) => value.clone(),
            None => Value::str(&self.message),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(loc) = self.loc {
            write!(f, " at {}", loc)?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}
