//! The config store: an ordered stack of backends with precedence-based
//! resolution and typed access.

use std::path::{Path, PathBuf};

use cfgstack_backend::{
    normalize_key, parse_bool, parse_int64, Backend, BackendError, FileBackend, MemoryBackend,
};
use serde::Serialize;
use tracing::{debug, trace};

use crate::discovery::PathResolver;
use crate::error::ConfigError;
use crate::level::ConfigLevel;
use crate::value::{ConfigValue, TypedValue};

/// One backend in the stack together with its precedence.
#[derive(Debug)]
pub(crate) struct Layer {
    pub(crate) level: ConfigLevel,
    pub(crate) backend: Box<dyn Backend>,
}

/// A resolved `(name, value)` pair and the level it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEntry {
    pub name: String,
    pub value: String,
    pub level: ConfigLevel,
}

/// A layered, mutable key/value config store.
///
/// Backends are kept in ascending level order. Lookups scan from the top
/// (highest level) down; enumeration walks the stack from the bottom up.
/// Writes apply immediately to the backend that owns the key.
#[derive(Debug, Default)]
pub struct ConfigStore {
    pub(crate) layers: Vec<Layer>,
    closed: bool,
}

impl ConfigStore {
    /// An empty store. It behaves as an empty writable in-memory config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Alias for [`ConfigStore::new`].
    pub fn open_empty() -> Self {
        Self::new()
    }

    /// Open exactly one existing file as the sole backend, at
    /// [`ConfigLevel::Local`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let backend = FileBackend::open(path).map_err(|e| {
            if e.is_not_found() {
                ConfigError::FileNotFound(path.to_path_buf())
            } else {
                ConfigError::from(e)
            }
        })?;

        let mut store = Self::new();
        store.add_backend(Box::new(backend), ConfigLevel::Local, false)?;
        Ok(store)
    }

    /// Open the global config file located by `resolver`.
    pub fn open_global<R: PathResolver + ?Sized>(resolver: &R) -> Result<Self, ConfigError> {
        Self::open(resolver.find(ConfigLevel::Global)?)
    }

    /// Open the system config file located by `resolver`.
    pub fn open_system<R: PathResolver + ?Sized>(resolver: &R) -> Result<Self, ConfigError> {
        Self::open(resolver.find(ConfigLevel::System)?)
    }

    /// Stack every discoverable system, xdg and global file at its level.
    /// Files that do not exist are skipped.
    pub fn open_default<R: PathResolver + ?Sized>(resolver: &R) -> Result<Self, ConfigError> {
        let mut store = Self::new();
        for level in [ConfigLevel::System, ConfigLevel::Xdg, ConfigLevel::Global] {
            match resolver.find(level) {
                Ok(path) => store.add_file(&path, level, false)?,
                Err(e) if e.is_not_found() => {
                    debug!(%level, "no config file for level, skipping");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(store)
    }

    /// Parse `path` and attach it at `level`.
    ///
    /// The file does not have to exist yet; it is created on the first write
    /// that targets it. If a backend already occupies `level`, this fails with
    /// [`ConfigError::LevelOccupied`] unless `force` is set, in which case the
    /// existing backend is replaced.
    pub fn add_file(
        &mut self,
        path: impl AsRef<Path>,
        level: ConfigLevel,
        force: bool,
    ) -> Result<(), ConfigError> {
        self.ensure_open()?;
        // Check before parsing so a conflicting call leaves no trace.
        if !force && self.position(level).is_some() {
            return Err(ConfigError::LevelOccupied(level));
        }
        let backend = FileBackend::open_or_create(path.as_ref())?;
        self.add_backend(Box::new(backend), level, force)
    }

    /// Attach an arbitrary backend at `level`, with the same occupancy rules
    /// as [`ConfigStore::add_file`].
    pub fn add_backend(
        &mut self,
        backend: Box<dyn Backend>,
        level: ConfigLevel,
        force: bool,
    ) -> Result<(), ConfigError> {
        self.ensure_open()?;
        let path = backend.path().map(|p| p.display().to_string());

        match self.position(level) {
            Some(_) if !force => return Err(ConfigError::LevelOccupied(level)),
            Some(index) => {
                debug!(%level, path = ?path, "replacing config backend");
                self.layers[index].backend = backend;
            }
            None => {
                let index = self.layers.partition_point(|layer| layer.level < level);
                debug!(%level, path = ?path, "attaching config backend");
                self.layers.insert(index, Layer { level, backend });
            }
        }
        Ok(())
    }

    /// Release every backend. Later calls fail with [`ConfigError::Closed`];
    /// closing twice is a no-op.
    pub fn close(&mut self) {
        if !self.closed {
            debug!(backends = self.layers.len(), "closing config store");
            self.layers.clear();
            self.closed = true;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Levels in stack order, lowest first.
    pub fn levels(&self) -> Vec<ConfigLevel> {
        self.layers.iter().map(|layer| layer.level).collect()
    }

    /// Backing file of each level, in stack order.
    pub fn backend_paths(&self) -> Vec<(ConfigLevel, Option<PathBuf>)> {
        self.layers
            .iter()
            .map(|layer| (layer.level, layer.backend.path().map(Path::to_path_buf)))
            .collect()
    }

    /// A read-only copy of the current state, with the same levels.
    pub fn snapshot(&self) -> Result<ConfigStore, ConfigError> {
        self.ensure_open()?;
        Ok(ConfigStore {
            layers: self
                .layers
                .iter()
                .map(|layer| Layer {
                    level: layer.level,
                    backend: layer.backend.snapshot(),
                })
                .collect(),
            closed: false,
        })
    }

    /// Re-read file backends whose contents changed on disk.
    pub fn refresh(&mut self) -> Result<bool, ConfigError> {
        self.ensure_open()?;
        let mut changed = false;
        for layer in &mut self.layers {
            changed |= layer.backend.refresh()?;
        }
        Ok(changed)
    }

    /// Whether any backend defines `key`. A value that is not valid UTF-8
    /// fails with [`ConfigError::InvalidUtf8`], as it does for `get`.
    pub fn contains(&self, key: &str) -> Result<bool, ConfigError> {
        match self.get_entry(key) {
            Ok(_) => Ok(true),
            Err(ConfigError::KeyNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// The highest-precedence entry for `key`.
    pub fn get_entry(&self, key: &str) -> Result<ConfigEntry, ConfigError> {
        let (level, name, value) = self
            .lookup(key)?
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;
        let value = String::from_utf8(value).map_err(|e| ConfigError::InvalidUtf8 {
            name: name.clone(),
            source: e.utf8_error(),
        })?;
        Ok(ConfigEntry { name, value, level })
    }

    /// The highest-precedence value for `key`, as stored.
    pub fn get_raw(&self, key: &str) -> Result<String, ConfigError> {
        self.get_entry(key).map(|entry| entry.value)
    }

    /// The highest-precedence value for `key`, coerced to integer, then
    /// boolean, then string.
    pub fn get(&self, key: &str) -> Result<TypedValue, ConfigError> {
        Ok(TypedValue::coerce(&self.get_raw(key)?))
    }

    pub fn get_i64(&self, key: &str) -> Result<i64, ConfigError> {
        let raw = self.get_raw(key)?;
        parse_int64(&raw).map_err(|_| ConfigError::TypeMismatch {
            key: key.to_string(),
            expected: "integer",
            value: raw,
        })
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, ConfigError> {
        let raw = self.get_raw(key)?;
        parse_bool(&raw).map_err(|_| ConfigError::TypeMismatch {
            key: key.to_string(),
            expected: "boolean",
            value: raw,
        })
    }

    pub fn get_string(&self, key: &str) -> Result<String, ConfigError> {
        self.get_raw(key)
    }

    /// Write `value` under `key`, or delete the key for
    /// [`ConfigValue::Delete`].
    ///
    /// The write goes to the highest writable backend that already defines
    /// the key, or to the top writable backend for a new key.
    pub fn set(&mut self, key: &str, value: impl Into<ConfigValue>) -> Result<(), ConfigError> {
        let Some(text) = value.into().to_text() else {
            return self.delete(key);
        };

        self.ensure_open()?;
        let name = normalize_key(key)?;
        let index = match self.owning_writable(&name)?.last() {
            Some(&index) => index,
            None => self.write_target()?,
        };

        let layer = &mut self.layers[index];
        layer.backend.set(&name, &text)?;
        debug!(key = %name, level = %layer.level, "set config value");
        Ok(())
    }

    /// Remove `key` from every writable backend that defines it.
    ///
    /// Nothing is removed if any owner holds several values for `key`.
    pub fn delete(&mut self, key: &str) -> Result<(), ConfigError> {
        self.ensure_open()?;
        let name = normalize_key(key)?;
        let owners = self.owning_writable(&name)?;
        if owners.is_empty() {
            return Err(ConfigError::KeyNotFound(key.to_string()));
        }

        for &index in &owners {
            if self.layers[index].backend.multivar(&name)?.len() > 1 {
                return Err(BackendError::MultivarConflict(name).into());
            }
        }

        for &index in owners.iter().rev() {
            let layer = &mut self.layers[index];
            layer.backend.delete(&name)?;
            debug!(key = %name, level = %layer.level, "deleted config value");
        }
        Ok(())
    }

    pub(crate) fn ensure_open(&self) -> Result<(), ConfigError> {
        if self.closed {
            return Err(ConfigError::Closed);
        }
        Ok(())
    }

    fn position(&self, level: ConfigLevel) -> Option<usize> {
        self.layers.iter().position(|layer| layer.level == level)
    }

    fn lookup(&self, key: &str) -> Result<Option<(ConfigLevel, String, Vec<u8>)>, ConfigError> {
        self.ensure_open()?;
        let name = normalize_key(key)?;
        for layer in self.layers.iter().rev() {
            if let Some(value) = layer.backend.get(&name)? {
                trace!(key = %name, level = %layer.level, "resolved config value");
                return Ok(Some((layer.level, name, value)));
            }
        }
        trace!(key = %name, "config value not found");
        Ok(None)
    }

    /// Indices of writable layers defining `name`, lowest first.
    fn owning_writable(&self, name: &str) -> Result<Vec<usize>, ConfigError> {
        let mut owners = Vec::new();
        for (index, layer) in self.layers.iter().enumerate() {
            if layer.backend.is_writable() && layer.backend.get(name)?.is_some() {
                owners.push(index);
            }
        }
        Ok(owners)
    }

    /// Index of the top writable layer, attaching an in-memory table when
    /// the store has no backends at all.
    pub(crate) fn write_target(&mut self) -> Result<usize, ConfigError> {
        if let Some(index) = self.top_writable() {
            return Ok(index);
        }
        if self.layers.is_empty() {
            self.add_backend(Box::new(MemoryBackend::new()), ConfigLevel::Memory, false)?;
            return Ok(0);
        }
        Err(ConfigError::ReadOnly)
    }

    pub(crate) fn top_writable(&self) -> Option<usize> {
        self.layers
            .iter()
            .rposition(|layer| layer.backend.is_writable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn memory(text: &str) -> Box<dyn Backend> {
        Box::new(MemoryBackend::from_text(text).unwrap())
    }

    fn stacked() -> ConfigStore {
        let mut store = ConfigStore::new();
        store
            .add_backend(memory("[core]\n\teditor = nano\n\tpager = less\n"), ConfigLevel::System, false)
            .unwrap();
        store
            .add_backend(memory("[core]\n\teditor = vim\n"), ConfigLevel::Local, false)
            .unwrap();
        store
    }

    #[test]
    fn test_empty_store_is_writable() {
        let mut store = ConfigStore::open_empty();
        assert!(!store.contains("a.b").unwrap());
        store.set("a.b", "c").unwrap();
        assert_eq!(store.get_raw("a.b").unwrap(), "c");
        assert_eq!(store.levels(), vec![ConfigLevel::Memory]);
    }

    #[test]
    fn test_highest_level_wins() {
        let store = stacked();
        assert_eq!(store.get("core.editor").unwrap(), TypedValue::String("vim".into()));
        assert_eq!(store.get_entry("core.pager").unwrap().level, ConfigLevel::System);
    }

    #[test]
    fn test_stack_kept_in_level_order() {
        let mut store = ConfigStore::new();
        store.add_backend(memory(""), ConfigLevel::Local, false).unwrap();
        store.add_backend(memory(""), ConfigLevel::System, false).unwrap();
        store.add_backend(memory(""), ConfigLevel::Global, false).unwrap();
        assert_eq!(
            store.levels(),
            vec![ConfigLevel::System, ConfigLevel::Global, ConfigLevel::Local]
        );
    }

    #[test]
    fn test_level_conflict_requires_force() {
        let mut store = stacked();
        let err = store
            .add_backend(memory("[core]\n\teditor = ed\n"), ConfigLevel::Local, false)
            .unwrap_err();
        assert!(matches!(err, ConfigError::LevelOccupied(ConfigLevel::Local)));
        assert_eq!(store.get_raw("core.editor").unwrap(), "vim");

        store
            .add_backend(memory("[core]\n\teditor = ed\n"), ConfigLevel::Custom(5), true)
            .unwrap();
        assert_eq!(store.get_raw("core.editor").unwrap(), "ed");
        assert_eq!(store.levels().len(), 2);
    }

    #[test]
    fn test_missing_key() {
        let store = stacked();
        let err = store.get("core.nothing").unwrap_err();
        assert!(matches!(err, ConfigError::KeyNotFound(ref k) if k == "core.nothing"));
        assert!(!store.contains("core.nothing").unwrap());
    }

    #[test]
    fn test_invalid_key_propagates() {
        let store = stacked();
        assert!(matches!(store.contains("nodot"), Err(ConfigError::InvalidKey(_))));
    }

    #[test]
    fn test_set_updates_owning_backend() {
        let mut store = stacked();
        store.set("core.pager", "more").unwrap();
        let entry = store.get_entry("core.pager").unwrap();
        assert_eq!(entry.value, "more");
        assert_eq!(entry.level, ConfigLevel::System);
    }

    #[test]
    fn test_new_key_goes_to_top() {
        let mut store = stacked();
        store.set("user.name", "Ada").unwrap();
        assert_eq!(store.get_entry("user.name").unwrap().level, ConfigLevel::Local);
    }

    #[test]
    fn test_typed_writes_round_trip() {
        let mut store = ConfigStore::new();
        store.set("a.int", 42i64).unwrap();
        store.set("a.flag", true).unwrap();
        store.set("a.text", "hello").unwrap();

        assert_eq!(store.get("a.int").unwrap(), TypedValue::Integer(42));
        assert_eq!(store.get("a.flag").unwrap(), TypedValue::Boolean(true));
        assert_eq!(store.get("a.text").unwrap(), TypedValue::String("hello".into()));
        assert_eq!(store.get_raw("a.flag").unwrap(), "true");
    }

    #[test]
    fn test_typed_getters() {
        let mut store = ConfigStore::new();
        store.set("a.size", "2k").unwrap();
        store.set("a.on", "yes").unwrap();

        assert_eq!(store.get_i64("a.size").unwrap(), 2048);
        assert!(store.get_bool("a.on").unwrap());
        assert_eq!(store.get_string("a.on").unwrap(), "yes");

        let err = store.get_i64("a.on").unwrap_err();
        assert!(matches!(err, ConfigError::TypeMismatch { expected: "integer", .. }));
    }

    #[test]
    fn test_delete_removes_from_every_writable_backend() {
        let mut store = stacked();
        store.set("core.editor", None::<&str>).unwrap();
        assert!(!store.contains("core.editor").unwrap());

        let err = store.delete("core.editor").unwrap_err();
        assert!(matches!(err, ConfigError::KeyNotFound(_)));
    }

    #[test]
    fn test_delete_refused_when_any_owner_has_multiple_values() {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("config");
        fs::write(&local, "[a]\n\tb = local\n").unwrap();

        let mut store = ConfigStore::new();
        store
            .add_backend(memory("[a]\n\tb = 1\n\tb = 2\n"), ConfigLevel::Global, false)
            .unwrap();
        store.add_file(&local, ConfigLevel::Local, false).unwrap();

        let err = store.delete("a.b").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Backend(BackendError::MultivarConflict(ref name)) if name == "a.b"
        ));
        assert_eq!(store.get_multivar("a.b", None).unwrap(), vec!["1", "2", "local"]);
        assert_eq!(fs::read_to_string(&local).unwrap(), "[a]\n\tb = local\n");
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut store = stacked();
        store.close();
        store.close();
        assert!(store.is_closed());
        assert!(matches!(store.get("core.editor"), Err(ConfigError::Closed)));
        assert!(matches!(store.set("a.b", 1i64), Err(ConfigError::Closed)));
        assert!(store.levels().is_empty());
    }

    #[test]
    fn test_snapshot_is_read_only() {
        let mut store = stacked();
        let mut snapshot = store.snapshot().unwrap();
        store.set("core.editor", "emacs").unwrap();

        assert_eq!(snapshot.get_raw("core.editor").unwrap(), "vim");
        assert!(matches!(snapshot.set("core.editor", "x"), Err(ConfigError::ReadOnly)));
        assert!(matches!(snapshot.delete("core.editor"), Err(ConfigError::KeyNotFound(_))));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");
        let err = ConfigStore::open(&path).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(ref p) if *p == path));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_open_parse_error_is_backend_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");
        fs::write(&path, "[core\n").unwrap();
        let err = ConfigStore::open(&path).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Backend);
    }

    #[test]
    fn test_add_file_and_write_through() {
        let dir = TempDir::new().unwrap();
        let global = dir.path().join("global");
        let local = dir.path().join("local");
        fs::write(&global, "[user]\n\tname = Global\n").unwrap();

        let mut store = ConfigStore::new();
        store.add_file(&global, ConfigLevel::Global, false).unwrap();
        store.add_file(&local, ConfigLevel::Local, false).unwrap();

        store.set("user.email", "me@example.com").unwrap();
        assert_eq!(fs::read_to_string(&local).unwrap(), "[user]\n\temail = me@example.com\n");

        store.set("user.name", "Renamed").unwrap();
        assert_eq!(fs::read_to_string(&global).unwrap(), "[user]\n\tname = Renamed\n");

        let paths = store.backend_paths();
        assert_eq!(paths[0], (ConfigLevel::Global, Some(global)));
        assert_eq!(paths[1], (ConfigLevel::Local, Some(local)));
    }

    #[test]
    fn test_refresh() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");
        fs::write(&path, "[a]\n\tb = 1\n").unwrap();

        let mut store = ConfigStore::open(&path).unwrap();
        fs::write(&path, "[a]\n\tb = 2\n\tc = 3\n").unwrap();
        assert!(store.refresh().unwrap());
        assert_eq!(store.get("a.b").unwrap(), TypedValue::Integer(2));
    }

    #[test]
    fn test_non_utf8_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");
        fs::write(&path, b"[a]\n\tb = \xff\n").unwrap();

        let store = ConfigStore::open(&path).unwrap();
        let err = store.contains("a.b").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUtf8 { ref name, .. } if name == "a.b"));
        let err = store.get("a.b").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUtf8 { ref name, .. } if name == "a.b"));
    }
}
