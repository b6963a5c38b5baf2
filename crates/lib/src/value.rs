//! Value types for model nodes.
//!
//! This module provides the [`Value`] enum that represents everything a node can
//! hold or be assigned. Values are classified once, when data crosses into the
//! tree, so the rest of the crate dispatches on the tag instead of inspecting
//! shapes.

use std::{fmt, rc::Rc};

use crate::document::Document;

type CallableFn = dyn Fn(&[Value]) -> Value;

/// An opaque, shared function reference.
///
/// Callables compare by identity: two handles are equal only if they were
/// cloned from the same original. They are never serialized to JSON.
///
/// ```
/// # use canopy::{Callable, Value};
/// let greet = Callable::new(|_| Value::from("hello"));
/// assert_eq!(greet.call(&[]), "hello");
///
/// let positive = Callable::predicate(|v| v.as_int().is_some_and(|n| n > 0));
/// assert!(positive.call(&[Value::Int(3)]).is_truthy());
/// ```
#[derive(Clone)]
pub struct Callable(Rc<CallableFn>);

impl Callable {
    /// Wrap a function taking positional arguments.
    pub fn new(f: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Wrap a predicate over a single value, as used by validators.
    ///
    /// The predicate sees the first argument, or [`Value::Undefined`] when
    /// called without arguments.
    pub fn predicate(f: impl Fn(&Value) -> bool + 'static) -> Self {
        Self::new(move |args| Value::Bool(f(args.first().unwrap_or(&Value::Undefined))))
    }

    /// Invoke the function.
    pub fn call(&self, args: &[Value]) -> Value {
        (self.0)(args)
    }

    /// Returns true if both handles refer to the same function.
    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// Values that can be stored in, or assigned to, model nodes.
///
/// # Value Types
///
/// ## Leaf Values
/// - [`Value::Undefined`] - Only valid when a leaf is first created
/// - [`Value::Null`] - Null value
/// - [`Value::Bool`], [`Value::Int`], [`Value::Float`], [`Value::Text`] - Scalars
/// - [`Value::Callable`] - Opaque function reference
///
/// ## Branch Values
/// - [`Value::Doc`] - A nested document; only composites accept these
///
/// # Equality
///
/// Scalars compare by value, with `Int` and `Float` compared numerically and
/// `NaN` never equal to itself. Callables compare by identity and documents
/// compare structurally.
///
/// ```
/// # use canopy::Value;
/// assert!(Value::Int(1) == Value::Float(1.0));
/// assert!(Value::Float(f64::NAN) != Value::Float(f64::NAN));
/// assert!(Value::from("a") == "a");
/// ```
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value; can be created but never assigned
    #[default]
    Undefined,
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text string value
    Text(String),
    /// Opaque function reference
    Callable(Callable),
    /// Nested document
    Doc(Document),
}

impl Value {
    /// Returns true if this is a nested document
    pub fn is_document(&self) -> bool {
        matches!(self, Value::Doc(_))
    }

    /// Returns true if this is the undefined value
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns true if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Callable(_) => "callable",
            Value::Doc(_) => "doc",
        }
    }

    /// Truthiness as seen by validators: empty, zero, null and undefined are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0 && !x.is_nan(),
            Value::Text(s) => !s.is_empty(),
            Value::Callable(_) | Value::Doc(_) => true,
        }
    }

    /// Attempts to convert to a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to convert to an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to convert to a float, widening integers
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Attempts to convert to a string
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to convert to a callable
    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Value::Callable(c) => Some(c),
            _ => None,
        }
    }

    /// Attempts to convert to a document
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Doc(doc) => Some(doc),
            _ => None,
        }
    }

    /// Converts into a JSON value.
    ///
    /// Returns `None` for values JSON cannot carry (undefined and callables).
    /// Non-finite floats become `null`.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Value::Undefined | Value::Callable(_) => None,
            Value::Null => Some(serde_json::Value::Null),
            Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
            Value::Int(n) => Some(serde_json::Value::from(*n)),
            Value::Float(x) => Some(
                serde_json::Number::from_f64(*x)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null),
            ),
            Value::Text(s) => Some(serde_json::Value::String(s.clone())),
            Value::Doc(doc) => Some(doc.to_json()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a.ptr_eq(b),
            (Value::Doc(a), Value::Doc(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Callable(_) => write!(f, "<callable>"),
            Value::Text(s) => write!(f, "{s}"),
            other => match other.to_json() {
                Some(json) => write!(f, "{json}"),
                None => write!(f, "{}", other.type_name()),
            },
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            json @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                Value::Doc(Document::from_json_container(json))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Callable> for Value {
    fn from(c: Callable) -> Self {
        Value::Callable(c)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Doc(doc)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

// Direct comparisons with primitives

impl PartialEq<bool> for Value {
    fn eq(&self, other: &bool) -> bool {
        self.as_bool() == Some(*other)
    }
}

impl PartialEq<i64> for Value {
    fn eq(&self, other: &i64) -> bool {
        *self == Value::Int(*other)
    }
}

impl PartialEq<i32> for Value {
    fn eq(&self, other: &i32) -> bool {
        *self == Value::Int(*other as i64)
    }
}

impl PartialEq<f64> for Value {
    fn eq(&self, other: &f64) -> bool {
        *self == Value::Float(*other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_text() == Some(*other)
    }
}

impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        self.as_text() == Some(other)
    }
}
