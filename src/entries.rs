//! Enumeration of every entry in the stack.
//!
//! Shadowed entries are included: the walk visits each backend in stack
//! order (lowest level first) and each backend in insertion order.

use std::slice;

use cfgstack_backend::{compile_pattern, Entry};
use tracing::debug;

use crate::error::ConfigError;
use crate::level::ConfigLevel;
use crate::store::{ConfigEntry, ConfigStore, Layer};

/// Lazy iterator over every entry of a store.
pub struct Entries<'a> {
    layers: slice::Iter<'a, Layer>,
    current: Option<(ConfigLevel, Box<dyn Iterator<Item = Entry> + 'a>)>,
}

impl Iterator for Entries<'_> {
    type Item = Result<ConfigEntry, ConfigError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((level, entries)) = &mut self.current {
                if let Some(entry) = entries.next() {
                    return Some(decode(entry, *level));
                }
            }
            let layer = self.layers.next()?;
            self.current = Some((layer.level, layer.backend.entries()));
        }
    }
}

fn decode(entry: Entry, level: ConfigLevel) -> Result<ConfigEntry, ConfigError> {
    let Entry { name, value } = entry;
    match String::from_utf8(value) {
        Ok(value) => Ok(ConfigEntry { name, value, level }),
        Err(e) => Err(ConfigError::InvalidUtf8 {
            name,
            source: e.utf8_error(),
        }),
    }
}

impl ConfigStore {
    /// Iterate every entry. Calling this again restarts from the bottom of
    /// the stack.
    pub fn entries(&self) -> Result<Entries<'_>, ConfigError> {
        self.ensure_open()?;
        Ok(Entries {
            layers: self.layers.iter(),
            current: None,
        })
    }

    /// Call `visitor` with the name and value of every entry.
    ///
    /// Enumeration stops at the first non-zero return, which becomes the
    /// result; `Ok(0)` means every entry was visited. An error from the
    /// visitor is returned as is.
    pub fn foreach<F, E>(&self, mut visitor: F) -> Result<i32, E>
    where
        F: FnMut(&str, &str) -> Result<i32, E>,
        E: From<ConfigError>,
    {
        for entry in self.entries()? {
            let entry = entry?;
            let code = visitor(&entry.name, &entry.value)?;
            if code != 0 {
                debug!(code, name = %entry.name, "enumeration stopped by visitor");
                return Ok(code);
            }
        }
        Ok(0)
    }

    /// [`ConfigStore::foreach`] with a payload handed to every call.
    pub fn foreach_with<P, F, E>(&self, payload: &mut P, mut visitor: F) -> Result<i32, E>
    where
        F: FnMut(&str, &str, &mut P) -> Result<i32, E>,
        E: From<ConfigError>,
    {
        self.foreach(|name, value| visitor(name, value, payload))
    }

    /// [`ConfigStore::foreach`] restricted to names matching `regex`.
    pub fn foreach_match<F, E>(&self, regex: &str, mut visitor: F) -> Result<i32, E>
    where
        F: FnMut(&str, &str) -> Result<i32, E>,
        E: From<ConfigError>,
    {
        let pattern = compile_pattern(regex).map_err(ConfigError::from)?;
        self.foreach(|name, value| {
            if pattern.is_match(name) {
                visitor(name, value)
            } else {
                Ok(0)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgstack_backend::MemoryBackend;

    fn store() -> ConfigStore {
        let mut store = ConfigStore::new();
        store
            .add_backend(
                Box::new(MemoryBackend::from_text("[core]\n\teditor = vim\n\tpager = less\n").unwrap()),
                ConfigLevel::Local,
                false,
            )
            .unwrap();
        store
            .add_backend(
                Box::new(MemoryBackend::from_text("[core]\n\teditor = nano\n[user]\n\tname = Ada\n").unwrap()),
                ConfigLevel::System,
                false,
            )
            .unwrap();
        store
    }

    #[test]
    fn test_entries_include_shadowed_in_stack_order() {
        let store = store();
        let seen: Vec<(String, String, ConfigLevel)> = store
            .entries()
            .unwrap()
            .map(|e| e.unwrap())
            .map(|e| (e.name, e.value, e.level))
            .collect();
        assert_eq!(
            seen,
            vec![
                ("core.editor".into(), "nano".into(), ConfigLevel::System),
                ("user.name".into(), "Ada".into(), ConfigLevel::System),
                ("core.editor".into(), "vim".into(), ConfigLevel::Local),
                ("core.pager".into(), "less".into(), ConfigLevel::Local),
            ]
        );
    }

    #[test]
    fn test_entries_restartable() {
        let store = store();
        let first = store.entries().unwrap().count();
        let second = store.entries().unwrap().count();
        assert_eq!(first, 4);
        assert_eq!(first, second);
    }

    #[test]
    fn test_foreach_visits_everything() {
        let store = store();
        let mut names = Vec::new();
        let result = store.foreach(|name, _| {
            names.push(name.to_string());
            Ok::<_, ConfigError>(0)
        });
        assert_eq!(result.unwrap(), 0);
        assert_eq!(names, vec!["core.editor", "user.name", "core.editor", "core.pager"]);
    }

    #[test]
    fn test_foreach_short_circuits_with_visitor_value() {
        let store = store();
        let mut calls = 0;
        let result = store.foreach(|_, _| {
            calls += 1;
            Ok::<_, ConfigError>(if calls == 2 { 3 } else { 0 })
        });
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 2);
    }

    #[derive(Debug, PartialEq)]
    enum VisitError {
        Refused(String),
        Store(String),
    }

    impl From<ConfigError> for VisitError {
        fn from(err: ConfigError) -> Self {
            VisitError::Store(err.to_string())
        }
    }

    #[test]
    fn test_foreach_visitor_error_is_returned_unwrapped() {
        let store = store();
        let mut calls = 0;
        let result = store.foreach(|name, _| {
            calls += 1;
            if name == "user.name" {
                Err(VisitError::Refused(name.to_string()))
            } else {
                Ok(0)
            }
        });
        assert_eq!(result, Err(VisitError::Refused("user.name".into())));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_foreach_stops_at_undecodable_value() {
        let document =
            cfgstack_backend::ConfigDocument::parse(b"[a]\n\tfirst = 1\n\tbad = \xff\n\tlast = 2\n")
                .unwrap();
        let mut store = ConfigStore::new();
        store
            .add_backend(Box::new(MemoryBackend::read_only(document)), ConfigLevel::Local, false)
            .unwrap();

        let mut visited = Vec::new();
        let result = store.foreach(|name, _| {
            visited.push(name.to_string());
            Ok::<_, VisitError>(0)
        });

        match result {
            Err(VisitError::Store(message)) => {
                assert!(message.starts_with("value of 'a.bad' is not valid UTF-8"), "{}", message)
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(visited, vec!["a.first"]);
    }

    #[test]
    fn test_foreach_on_closed_store() {
        let mut store = store();
        store.close();
        let result = store.foreach(|_, _| Ok::<_, VisitError>(0));
        assert_eq!(result, Err(VisitError::Store("config store is closed".into())));
    }

    #[test]
    fn test_foreach_with_payload() {
        let store = store();
        let mut count = 0usize;
        let result = store.foreach_with(&mut count, |_, value, count| {
            *count += value.len();
            Ok::<_, ConfigError>(0)
        });
        assert_eq!(result.unwrap(), 0);
        assert_eq!(count, "nano".len() + "Ada".len() + "vim".len() + "less".len());
    }

    #[test]
    fn test_foreach_match() {
        let store = store();
        let mut values = Vec::new();
        store
            .foreach_match("^core\\.editor$", |_, value| {
                values.push(value.to_string());
                Ok::<_, ConfigError>(0)
            })
            .unwrap();
        assert_eq!(values, vec!["nano", "vim"]);
    }
}
