//! Token writer trait and the value-assembling stream shim

use serde_json::{Map, Number, Value};

use crate::error::{BindError, Result};

/// Push interface emitting a JSON token stream
pub trait TokenWriter {
    /// Emit an object-start token
    fn begin_object(&mut self) -> Result<()>;
    /// Emit an object-end token
    fn end_object(&mut self) -> Result<()>;
    /// Emit an array-start token
    fn begin_array(&mut self) -> Result<()>;
    /// Emit an array-end token
    fn end_array(&mut self) -> Result<()>;
    /// Emit a member name inside an object
    fn write_name(&mut self, name: &str) -> Result<()>;
    /// Emit a string value
    fn write_string(&mut self, value: &str) -> Result<()>;
    /// Emit an integer value
    fn write_i64(&mut self, value: i64) -> Result<()>;
    /// Emit a float value
    fn write_f64(&mut self, value: f64) -> Result<()>;
    /// Emit a boolean value
    fn write_bool(&mut self, value: bool) -> Result<()>;
    /// Emit a null value
    fn write_null(&mut self) -> Result<()>;
}

enum Slot {
    Root(Option<Value>),
    Array(Vec<Value>),
    Object {
        members: Map<String, Value>,
        pending: Option<String>,
    },
}

/// Token writer assembling a `serde_json::Value` tree
///
/// Member order of written objects is emission order. Printing stays in
/// `serde_json`.
pub struct ValueWriter {
    stack: Vec<Slot>,
}

impl ValueWriter {
    /// Create a writer for a single top-level value
    pub fn new() -> Self {
        Self {
            stack: vec![Slot::Root(None)],
        }
    }

    /// Finish writing and return the assembled value
    pub fn into_value(mut self) -> Result<Value> {
        match self.stack.pop() {
            Some(Slot::Root(Some(value))) if self.stack.is_empty() => Ok(value),
            _ => Err(BindError::Internal(
                "writer finished mid-value".to_string(),
            )),
        }
    }

    fn push_value(&mut self, value: Value) -> Result<()> {
        match self.stack.last_mut() {
            Some(Slot::Root(root)) => {
                if root.is_some() {
                    return Err(BindError::Internal(
                        "more than one top-level value".to_string(),
                    ));
                }
                *root = Some(value);
                Ok(())
            }
            Some(Slot::Array(items)) => {
                items.push(value);
                Ok(())
            }
            Some(Slot::Object { members, pending }) => match pending.take() {
                // Repeated member names overwrite: last value wins
                Some(name) => {
                    members.insert(name, value);
                    Ok(())
                }
                None => Err(BindError::Internal(
                    "member value emitted without a name".to_string(),
                )),
            },
            None => Err(BindError::Internal("writer used after finish".to_string())),
        }
    }
}

impl Default for ValueWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenWriter for ValueWriter {
    fn begin_object(&mut self) -> Result<()> {
        self.stack.push(Slot::Object {
            members: Map::new(),
            pending: None,
        });
        Ok(())
    }

    fn end_object(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Slot::Object {
                members,
                pending: None,
            }) => self.push_value(Value::Object(members)),
            Some(Slot::Object {
                pending: Some(name),
                ..
            }) => Err(BindError::Internal(format!(
                "object ended with dangling member name '{name}'"
            ))),
            _ => Err(BindError::Internal(
                "end_object outside an object".to_string(),
            )),
        }
    }

    fn begin_array(&mut self) -> Result<()> {
        self.stack.push(Slot::Array(Vec::new()));
        Ok(())
    }

    fn end_array(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Slot::Array(items)) => self.push_value(Value::Array(items)),
            _ => Err(BindError::Internal(
                "end_array outside an array".to_string(),
            )),
        }
    }

    fn write_name(&mut self, name: &str) -> Result<()> {
        match self.stack.last_mut() {
            Some(Slot::Object { pending, .. }) => {
                if pending.is_some() {
                    return Err(BindError::Internal(
                        "member name emitted twice".to_string(),
                    ));
                }
                *pending = Some(name.to_string());
                Ok(())
            }
            _ => Err(BindError::Internal(
                "member name outside an object".to_string(),
            )),
        }
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.push_value(Value::String(value.to_string()))
    }

    fn write_i64(&mut self, value: i64) -> Result<()> {
        self.push_value(Value::Number(value.into()))
    }

    fn write_f64(&mut self, value: f64) -> Result<()> {
        let number = Number::from_f64(value).ok_or(BindError::NonFiniteNumber(value))?;
        self.push_value(Value::Number(number))
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.push_value(Value::Bool(value))
    }

    fn write_null(&mut self) -> Result<()> {
        self.push_value(Value::Null)
    }
}
