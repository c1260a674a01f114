//! Dynamically shaped values passed into and returned from operations.
//!
//! An operation in a decoration chain is invoked through a uniform signature, so
//! its arguments and result are carried as [`Value`]s. Hint-style decorations
//! inspect the [`Shape`] of each value before the operation runs.

use crate::Fault;
use std::fmt;
use std::sync::Arc;

/// A value handed to, or returned from, an operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    /// Returns the runtime shape of this value
    pub fn shape(&self) -> Shape {
        match self {
            Value::Nil => Shape::Nil,
            Value::Bool(_) => Shape::Bool,
            Value::Int(_) => Shape::Int,
            Value::Float(_) => Shape::Float,
            Value::Str(_) => Shape::Str,
            Value::List(_) => Shape::List,
        }
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(list) => Some(list.as_slice()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(list) => {
                f.write_str("[")?;
                for (index, item) in list.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Nil
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Nil, Into::into)
    }
}

/// The runtime shape of a [`Value`], or of the trailing block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Nil,
    Bool,
    Int,
    Float,
    /// either an `Int` or a `Float`
    Number,
    Str,
    List,
    /// accepts every value
    Any,
    Block,
}

impl Shape {
    /// Returns true if `value` conforms to this shape
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Shape::Any => true,
            Shape::Number => matches!(value, Value::Int(_) | Value::Float(_)),
            Shape::Block => false,
            shape => shape == value.shape(),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::Nil => "Nil",
            Shape::Bool => "Bool",
            Shape::Int => "Int",
            Shape::Float => "Float",
            Shape::Number => "Number",
            Shape::Str => "Str",
            Shape::List => "List",
            Shape::Any => "Any",
            Shape::Block => "Block",
        };
        f.write_str(name)
    }
}

type BlockFn = dyn Fn(&[Value]) -> Result<Value, Fault> + Send + Sync;

/// The optional trailing block handed to an operation alongside its arguments.
#[derive(Clone)]
pub struct Block {
    f: Arc<BlockFn>,
}

impl Block {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Yields `args` to the block
    pub fn call(&self, args: &[Value]) -> Result<Value, Fault> {
        (self.f)(args)
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Block")
    }
}
