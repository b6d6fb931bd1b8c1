//! Multi-valued entries.
//!
//! A name may hold several values within one backend. Reads walk the whole
//! stack (lowest level first, then insertion order); writes target the top
//! writable backend.

use std::slice;

use cfgstack_backend::{compile_pattern, normalize_key, BackendError};
use regex_lite::Regex;
use tracing::debug;

use crate::error::ConfigError;
use crate::store::{ConfigStore, Layer};

/// Lazy iterator over the values of one multivar.
///
/// Each item is either a value or the error that stopped materializing it.
pub struct Multivar<'a> {
    name: String,
    pattern: Option<Regex>,
    layers: slice::Iter<'a, Layer>,
    pending: std::vec::IntoIter<Vec<u8>>,
}

impl Iterator for Multivar<'_> {
    type Item = Result<String, ConfigError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            for raw in self.pending.by_ref() {
                if let Some(pattern) = &self.pattern {
                    if !pattern.is_match(&String::from_utf8_lossy(&raw)) {
                        continue;
                    }
                }
                return Some(String::from_utf8(raw).map_err(|e| ConfigError::InvalidUtf8 {
                    name: self.name.clone(),
                    source: e.utf8_error(),
                }));
            }

            let layer = self.layers.next()?;
            match layer.backend.multivar(&self.name) {
                Ok(values) => self.pending = values.into_iter(),
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

impl ConfigStore {
    /// Iterate the values of `name`, optionally filtered by `regex`.
    pub fn multivar(&self, name: &str, regex: Option<&str>) -> Result<Multivar<'_>, ConfigError> {
        self.ensure_open()?;
        let pattern = regex.map(compile_pattern).transpose()?;
        Ok(Multivar {
            name: normalize_key(name)?,
            pattern,
            layers: self.layers.iter(),
            pending: Vec::new().into_iter(),
        })
    }

    /// Every value of `name` across the stack, optionally filtered by
    /// `regex`. No match is an empty list.
    ///
    /// A value that cannot be materialized fails the whole call with
    /// [`ConfigError::MultivarInterrupted`], even if earlier values were
    /// collected.
    pub fn get_multivar(&self, name: &str, regex: Option<&str>) -> Result<Vec<String>, ConfigError> {
        let mut values = Vec::new();
        for item in self.multivar(name, regex)? {
            match item {
                Ok(value) => values.push(value),
                Err(ConfigError::InvalidUtf8 { name, source }) => {
                    return Err(ConfigError::MultivarInterrupted {
                        name,
                        collected: values.len(),
                        source,
                    })
                }
                Err(e) => return Err(e),
            }
        }
        Ok(values)
    }

    /// Replace each value of `name` matching `regex` with `value`, in the
    /// top writable backend. When nothing matches, `value` is appended.
    ///
    /// Fails with [`ConfigError::KeyNotFound`] when no backend can take the
    /// value. Any other failure is reported as
    /// [`ConfigError::MultivarWrite`], whatever its cause.
    pub fn set_multivar(&mut self, name: &str, regex: &str, value: &str) -> Result<(), ConfigError> {
        self.ensure_open()?;
        let classify = |source: BackendError| match source {
            BackendError::NotFound(key) => ConfigError::KeyNotFound(key),
            source => ConfigError::MultivarWrite {
                name: name.to_string(),
                source,
            },
        };

        normalize_key(name).map_err(classify)?;
        let pattern = compile_pattern(regex).map_err(classify)?;
        let index = self.multivar_target(name)?;
        let layer = &mut self.layers[index];
        let replaced = layer
            .backend
            .set_multivar(name, &pattern, value)
            .map_err(classify)?;

        debug!(name, regex, replaced, level = %layer.level, "set multivar");
        Ok(())
    }

    /// Append `value` to `name` in the top writable backend.
    pub fn add_multivar(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        self.ensure_open()?;
        let write_error = |source| ConfigError::MultivarWrite {
            name: name.to_string(),
            source,
        };

        normalize_key(name).map_err(write_error)?;
        let index = self.multivar_target(name)?;
        let layer = &mut self.layers[index];
        layer.backend.add_multivar(name, value).map_err(write_error)?;
        debug!(name, level = %layer.level, "added multivar value");
        Ok(())
    }

    /// Remove every value of `name` matching `regex` from every writable
    /// backend. Returns how many values were removed.
    pub fn delete_multivar(&mut self, name: &str, regex: &str) -> Result<usize, ConfigError> {
        self.ensure_open()?;
        let pattern = compile_pattern(regex)?;
        let mut removed = 0;

        for layer in self.layers.iter_mut().filter(|l| l.backend.is_writable()) {
            match layer.backend.delete_multivar(name, &pattern) {
                Ok(count) => {
                    debug!(name, regex, count, level = %layer.level, "deleted multivar values");
                    removed += count;
                }
                Err(BackendError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        if removed == 0 {
            return Err(ConfigError::KeyNotFound(name.to_string()));
        }
        Ok(removed)
    }

    fn multivar_target(&mut self, name: &str) -> Result<usize, ConfigError> {
        match self.write_target() {
            Ok(index) => Ok(index),
            Err(ConfigError::ReadOnly) => Err(ConfigError::KeyNotFound(name.to_string())),
            Err(e) => Err(e),
        }
    }
}
