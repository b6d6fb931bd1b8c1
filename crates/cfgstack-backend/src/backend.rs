//! The backend seam consumed by the config store.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::str::Utf8Error;

use regex_lite::Regex;

use crate::error::BackendError;

/// A `(name, value)` pair produced by a backend.
///
/// The name is normalized. The value is kept as raw bytes; it only has to be
/// valid UTF-8 once somebody reads it as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub value: Vec<u8>,
}

impl Entry {
    pub fn new(name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The value as text.
    pub fn value_str(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.value)
    }

    /// The value as text, with invalid sequences replaced.
    pub fn value_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}

/// One source of config entries: a parsed file or an in-memory table.
///
/// Keys passed to these methods are normalized by the backend, so callers
/// may use any casing for the section and variable parts.
pub trait Backend: fmt::Debug {
    /// File backing this backend, if any.
    fn path(&self) -> Option<&Path> {
        None
    }

    /// Whether mutations are accepted.
    fn is_writable(&self) -> bool {
        true
    }

    /// The effective value of `key` within this backend (the last one wins).
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError>;

    /// Every entry in insertion order.
    fn entries(&self) -> Box<dyn Iterator<Item = Entry> + '_>;

    /// Every value of `name` in insertion order.
    fn multivar(&self, name: &str) -> Result<Vec<Vec<u8>>, BackendError>;

    /// Set a single-valued entry, creating it if needed.
    fn set(&mut self, key: &str, value: &str) -> Result<(), BackendError>;

    /// Remove a single-valued entry.
    fn delete(&mut self, key: &str) -> Result<(), BackendError>;

    /// Replace each value of `name` matching `pattern`; append when none match.
    ///
    /// Returns the number of values replaced (zero means appended).
    fn set_multivar(&mut self, name: &str, pattern: &Regex, value: &str)
        -> Result<usize, BackendError>;

    /// Append a value to `name` without touching existing values.
    fn add_multivar(&mut self, name: &str, value: &str) -> Result<(), BackendError>;

    /// Remove each value of `name` matching `pattern`.
    fn delete_multivar(&mut self, name: &str, pattern: &Regex) -> Result<usize, BackendError>;

    /// Reload from the underlying storage. Returns true if anything changed.
    fn refresh(&mut self) -> Result<bool, BackendError> {
        Ok(false)
    }

    /// A read-only in-memory copy of the current contents.
    fn snapshot(&self) -> Box<dyn Backend>;
}

/// Compile a value-matching pattern.
pub fn compile_pattern(pattern: &str) -> Result<Regex, BackendError> {
    Regex::new(pattern).map_err(|e| BackendError::InvalidRegex {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}
