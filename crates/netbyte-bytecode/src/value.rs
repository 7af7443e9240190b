//! Runtime values.
//!
//! `Value` is the closed tagged union every other component operates on.
//! There is no implicit promotion between tags; the arithmetic expcodes in
//! the runtime define the only Int/Float coercion that exists.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reference to a named function.
///
/// Carries only the name and arity. Function bodies are owned by the
/// runtime's function table; call sites always resolve by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncRef {
    /// Registered function name.
    pub name: String,
    /// Declared positional parameter count.
    pub arity: usize,
}

/// Dynamic runtime value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absence of a value. The implicit result of a sequence without `RETURN`.
    Null,
    /// Signed 64-bit integer.
    Int(i64),
    /// IEEE double.
    Float(f64),
    /// Boolean, produced by the comparison expcodes.
    Bool(bool),
    /// UTF-8 string with explicit length.
    Str(String),
    /// Reference to a registered function.
    Func(FuncRef),
    /// Ordered sequence of values.
    List(Vec<Value>),
}

impl Value {
    /// Tag name, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Func(_) => "function",
            Value::List(_) => "list",
        }
    }

    /// Truthiness as used by `JUMPIF` and `IFELSE`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
            Value::Func(_) => true,
            Value::List(v) => !v.is_empty(),
        }
    }

    /// Attempt to get the value as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempt to get the value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
            Value::Func(r) => write!(f, "<fn {}/{}>", r.name, r.arity),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}
