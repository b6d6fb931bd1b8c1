//! Typed values at the store boundary.
//!
//! Storage is purely textual. Reads coerce text into a [`TypedValue`]
//! (integer first, then boolean, then string); writes take a [`ConfigValue`]
//! and store its canonical text.

use std::fmt;

use cfgstack_backend::{format_bool, format_int64, parse_bool, parse_int64};
use serde::Serialize;

/// A value read from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    Integer(i64),
    Boolean(bool),
    String(String),
}

impl TypedValue {
    /// Coerce stored text. Integer parsing is tried strictly before boolean
    /// parsing, so `"1"` is `Integer(1)`.
    pub fn coerce(text: &str) -> Self {
        if let Ok(n) = parse_int64(text) {
            TypedValue::Integer(n)
        } else if let Ok(b) = parse_bool(text) {
            TypedValue::Boolean(b)
        } else {
            TypedValue::String(text.to_string())
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TypedValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Integer(n) => write!(f, "{}", n),
            TypedValue::Boolean(b) => write!(f, "{}", b),
            TypedValue::String(s) => write!(f, "{}", s),
        }
    }
}

/// A value to write, resolved once at the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    /// Remove the entry instead of writing.
    Delete,
}

impl ConfigValue {
    /// Canonical text to store, or `None` for [`ConfigValue::Delete`].
    pub fn to_text(&self) -> Option<String> {
        match self {
            ConfigValue::String(s) => Some(s.clone()),
            ConfigValue::Integer(n) => Some(format_int64(*n)),
            ConfigValue::Boolean(b) => Some(format_bool(*b)),
            ConfigValue::Delete => None,
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Integer(value)
    }
}

impl From<i32> for ConfigValue {
    fn from(value: i32) -> Self {
        ConfigValue::Integer(i64::from(value))
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Boolean(value)
    }
}

impl From<TypedValue> for ConfigValue {
    fn from(value: TypedValue) -> Self {
        match value {
            TypedValue::Integer(n) => ConfigValue::Integer(n),
            TypedValue::Boolean(b) => ConfigValue::Boolean(b),
            TypedValue::String(s) => ConfigValue::String(s),
        }
    }
}

impl<T: Into<ConfigValue>> From<Option<T>> for ConfigValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ConfigValue::Delete, Into::into)
    }
}
