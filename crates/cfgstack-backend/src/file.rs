//! On-disk backend.
//!
//! Every mutation is written through immediately: the new contents go to
//! `<path>.lock`, created exclusively, which is then renamed over the file.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use regex_lite::Regex;
use tracing::debug;

use crate::backend::{Backend, Entry};
use crate::document::ConfigDocument;
use crate::error::BackendError;
use crate::memory::MemoryBackend;

/// Identity of the file contents last read or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

/// A config file on disk.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    document: ConfigDocument,
    stamp: Option<FileStamp>,
}

impl FileBackend {
    /// Open an existing file.
    ///
    /// A missing file is reported as [`BackendError::Io`] with
    /// [`io::ErrorKind::NotFound`].
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let path = path.into();
        let bytes = fs::read(&path).map_err(|e| BackendError::io(&path, e))?;
        Self::from_bytes(path, &bytes)
    }

    /// Open a file that may not exist yet. It is created on the first write.
    pub fn open_or_create(path: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let path = path.into();
        match fs::read(&path) {
            Ok(bytes) => Self::from_bytes(path, &bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "config file does not exist yet");
                Ok(Self {
                    path,
                    document: ConfigDocument::new(),
                    stamp: None,
                })
            }
            Err(e) => Err(BackendError::io(&path, e)),
        }
    }

    fn from_bytes(path: PathBuf, bytes: &[u8]) -> Result<Self, BackendError> {
        let document = parse_document(&path, bytes)?;
        let stamp = read_stamp(&path)?;
        debug!(path = %path.display(), entries = document.len(), "loaded config file");
        Ok(Self {
            path,
            document,
            stamp,
        })
    }

    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }

    /// Apply `edit` to a copy of the document, persist it, then keep it.
    ///
    /// The in-memory document only changes once the file was written.
    fn update<T>(
        &mut self,
        edit: impl FnOnce(&mut ConfigDocument) -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        let mut next = self.document.clone();
        let result = edit(&mut next)?;
        self.persist(&next)?;
        self.document = next;
        self.stamp = read_stamp(&self.path)?;
        Ok(result)
    }

    fn persist(&self, document: &ConfigDocument) -> Result<(), BackendError> {
        let lock = lock_path(&self.path);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock)
            .map_err(|e| BackendError::io(&lock, e))?;

        let written = file
            .write_all(&document.to_bytes())
            .and_then(|()| file.sync_all());
        drop(file);

        if let Err(e) = written {
            let _ = fs::remove_file(&lock);
            return Err(BackendError::io(&lock, e));
        }

        if let Err(e) = fs::rename(&lock, &self.path) {
            let _ = fs::remove_file(&lock);
            return Err(BackendError::io(&self.path, e));
        }

        debug!(path = %self.path.display(), entries = document.len(), "wrote config file");
        Ok(())
    }
}

impl Backend for FileBackend {
    fn path(&self) -> Option<&Path> {
        Some(&self.path)
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
        self.update(|doc| doc.set(key, value))
    }

    fn delete(&mut self, key: &str) -> Result<(), BackendError> {
        self.update(|doc| doc.delete(key))
    }

    fn set_multivar(
        &mut self,
        name: &str,
        pattern: &Regex,
        value: &str,
    ) -> Result<usize, BackendError> {
        self.update(|doc| doc.set_multivar(name, pattern, value))
    }

    fn add_multivar(&mut self, name: &str, value: &str) -> Result<(), BackendError> {
        self.update(|doc| doc.add_multivar(name, value))
    }

    fn delete_multivar(&mut self, name: &str, pattern: &Regex) -> Result<usize, BackendError> {
        self.update(|doc| doc.delete_multivar(name, pattern))
    }

    fn refresh(&mut self) -> Result<bool, BackendError> {
        let current = read_stamp(&self.path)?;
        if current == self.stamp {
            return Ok(false);
        }

        self.document = match fs::read(&self.path) {
            Ok(bytes) => parse_document(&self.path, &bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => ConfigDocument::new(),
            Err(e) => return Err(BackendError::io(&self.path, e)),
        };
        self.stamp = current;
        debug!(path = %self.path.display(), "reloaded changed config file");
        Ok(true)
    }

    fn snapshot(&self) -> Box<dyn Backend> {
        Box::new(MemoryBackend::read_only(self.document.clone()))
    }
}

fn parse_document(path: &Path, bytes: &[u8]) -> Result<ConfigDocument, BackendError> {
    ConfigDocument::parse(bytes).map_err(|e| BackendError::Parse {
        path: Some(path.to_path_buf()),
        line: e.line,
        message: e.message,
    })
}

fn read_stamp(path: &Path) -> Result<Option<FileStamp>, BackendError> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(FileStamp {
            modified: meta.modified().ok(),
            len: meta.len(),
        })),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(BackendError::io(path, e)),
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}
