//! The rendering context and the objects templates can call into.
//!
//! A [`Context`] is an insertion-ordered map from name to [`ContextValue`].
//! Plain values (strings, integers, booleans, structured JSON) are handed to
//! the engine as data. [`ContextObject`] values are additionally callable:
//! the Tera adapter registers each object as a function named after its
//! context key, so `{{ strings(method="upper", text=name) }}` invokes
//! [`ContextObject::invoke`] on the object bound as `strings`.
//!
//! # Layering
//!
//! [`ContextBuilder`] assembles a run's context in a fixed order, later layers
//! overwriting earlier ones key by key:
//!
//! 1. generator defaults (`generator`, `outputDirectory`)
//! 2. registered context objects named by `context.objects.*` properties
//! 3. values supplied by the caller
//! 4. typed properties coerced from `contextProperties` files

mod builder;
mod objects;

pub use builder::{ContextBuilder, RESERVED_KEYS, coerce_property};
pub use objects::{FileUtil, InstantiationError, ObjectFactory, ObjectRegistry, StringUtils};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use serde_json::Value;
use thiserror::Error;

use crate::utils::OrderedMap;

/// An object bound into the context whose methods templates may call.
pub trait ContextObject: Send + Sync {
    /// Name of the registered type, used in logs and error messages.
    fn type_name(&self) -> &str;

    /// Data exposed when the object is used as a plain variable.
    fn snapshot(&self) -> Value {
        Value::Null
    }

    /// Call `method` with named arguments.
    fn invoke(&self, method: &str, args: &HashMap<String, Value>) -> Result<Value>;
}

/// Raised from inside a template when a context object method fails.
#[derive(Debug, Clone, Error)]
#[error("Invocation of '{reference}.{method}' failed: {cause}")]
pub struct MethodInvocationError {
    /// Context key the object is bound under.
    pub reference: String,
    pub method: String,
    #[source]
    pub cause: Arc<dyn std::error::Error + Send + Sync>,
}

impl MethodInvocationError {
    pub fn new(reference: &str, method: &str, error: anyhow::Error) -> Self {
        let boxed: Box<dyn std::error::Error + Send + Sync> = error.into();
        Self {
            reference: reference.to_string(),
            method: method.to_string(),
            cause: Arc::from(boxed),
        }
    }
}

#[derive(Clone)]
pub enum ContextValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    /// Structured data, e.g. a map handed over from a template loop.
    Value(Value),
    Object(Arc<dyn ContextObject>),
}

impl ContextValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<dyn ContextObject>> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Convert a value received from a template call.
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(text) => Self::String(text),
            Value::Bool(flag) => Self::Boolean(flag),
            Value::Number(number) => match number.as_i64() {
                Some(integer) => Self::Integer(integer),
                None => Self::Value(Value::Number(number)),
            },
            other => Self::Value(other),
        }
    }

    /// The data form handed to the template engine.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(value) => Value::String(value.clone()),
            Self::Integer(value) => Value::from(*value),
            Self::Boolean(value) => Value::Bool(*value),
            Self::Value(value) => value.clone(),
            Self::Object(object) => object.snapshot(),
        }
    }
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => f.debug_tuple("String").field(value).finish(),
            Self::Integer(value) => f.debug_tuple("Integer").field(value).finish(),
            Self::Boolean(value) => f.debug_tuple("Boolean").field(value).finish(),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Object(object) => f.debug_tuple("Object").field(&object.type_name()).finish(),
        }
    }
}

impl PartialEq for ContextValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            _ => false,
        }
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ContextValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for ContextValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Arc<dyn ContextObject>> for ContextValue {
    fn from(object: Arc<dyn ContextObject>) -> Self {
        Self::Object(object)
    }
}

/// Name to value environment visible to templates during a render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: OrderedMap<ContextValue>,
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key`, returning the value it replaced.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ContextValue>,
    ) -> Option<ContextValue> {
        self.values.insert(key, value.into())
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ContextValue> {
        self.values.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextValue)> {
        self.values.iter()
    }

    /// Callable objects in the context, with the key each is bound under.
    pub fn objects(&self) -> impl Iterator<Item = (&str, &Arc<dyn ContextObject>)> {
        self.iter().filter_map(|(key, value)| value.as_object().map(|object| (key, object)))
    }

    /// Copy every binding of `other` into this context; `other` wins.
    pub fn extend(&mut self, other: Context) {
        for (key, value) in other.values {
            self.values.insert(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Fetch a required named argument as text.
///
/// Numbers and booleans are accepted and rendered as text.
pub fn required_str(args: &HashMap<String, Value>, name: &str) -> Result<String> {
    optional_str(args, name).ok_or_else(|| anyhow!("missing required argument '{}'", name))
}

/// Fetch an optional named argument as text. `null` counts as absent.
pub fn optional_str(args: &HashMap<String, Value>, name: &str) -> Option<String> {
    match args.get(name)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
