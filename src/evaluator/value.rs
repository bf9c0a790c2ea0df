// File: src/evaluator/value.rs
//
// Runtime value types for the Omelet evaluator.
// Defines all value types an expression node can evaluate to.

use crate::ast::Node;
use ahash::AHashMap;
use std::fmt;

/// Runtime values in the Omelet evaluator
///
/// Output is produced by string-coercing values via `Display`, so every
/// variant has a textual form. `Object` only enters a render through the
/// external context (or `from_json`); templates cannot construct one.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Omelet numbers are 64-bit signed integers
    Number(i64),
    Bool(bool),
    Str(String),
    /// Ordered sequence, the result of an Array or Range expression
    List(Vec<Value>),
    /// Keyed context data, traversed by interpolation accessors
    Object(AHashMap<String, Value>),
    /// A named, parameterized template fragment. The body stays
    /// unevaluated until the macro is invoked.
    Macro { params: Vec<String>, body: Box<Node> },
}

impl Value {
    /// Human-readable type name, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
            Value::Macro { .. } => "macro",
        }
    }

    /// Converts a JSON document into a context value. Numbers truncate to
    /// integers (Omelet has no fractional numbers) and null becomes the
    /// empty string.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Str(String::new()),
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                Value::Number(n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64))
            }
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.iter().map(|(key, value)| (key.clone(), Value::from_json(value))).collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Object(_) => write!(f, "[object]"),
            Value::Macro { .. } => write!(f, "[macro]"),
        }
    }
}
