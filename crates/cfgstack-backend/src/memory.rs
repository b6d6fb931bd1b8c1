//! In-memory backend.

use regex_lite::Regex;

use crate::backend::{Backend, Entry};
use crate::document::ConfigDocument;
use crate::error::BackendError;

/// A config table held purely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    document: ConfigDocument,
    read_only: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from config text.
    pub fn from_text(text: &str) -> Result<Self, BackendError> {
        let document = ConfigDocument::parse(text.as_bytes()).map_err(|e| BackendError::Parse {
            path: None,
            line: e.line,
            message: e.message,
        })?;
        Ok(Self {
            document,
            read_only: false,
        })
    }

    /// A frozen copy of `document`; every mutation fails with `ReadOnly`.
    pub fn read_only(document: ConfigDocument) -> Self {
        Self {
            document,
            read_only: true,
        }
    }

    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }

    fn writable(&mut self) -> Result<&mut ConfigDocument, BackendError> {
        if self.read_only {
            return Err(BackendError::ReadOnly);
        }
        Ok(&mut self.document)
    }
}

impl Backend for MemoryBackend {
    fn is_writable(&self) -> bool {
        !self.read_only
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        self.document.get(key)
    }

    fn entries(&self) -> Box<dyn Iterator<Item = Entry> + '_> {
        Box::new(self.document.entries())
    }

    fn multivar(&self, name: &str) -> Result<Vec<Vec<u8>>, BackendError> {
        self.document.multivar(name)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), BackendError> {
        self.writable()?.set(key, value)
    }

    fn delete(&mut self, key: &str) -> Result<(), BackendError> {
        self.writable()?.delete(key)
    }

    fn set_multivar(
        &mut self,
        name: &str,
        pattern: &Regex,
        value: &str,
    ) -> Result<usize, BackendError> {
        self.writable()?.set_multivar(name, pattern, value)
    }

    fn add_multivar(&mut self, name: &str, value: &str) -> Result<(), BackendError> {
        self.writable()?.add_multivar(name, value)
    }

    fn delete_multivar(&mut self, name: &str, pattern: &Regex) -> Result<usize, BackendError> {
        self.writable()?.delete_multivar(name, pattern)
    }

    fn snapshot(&self) -> Box<dyn Backend> {
        Box::new(Self::read_only(self.document.clone()))
    }
}
