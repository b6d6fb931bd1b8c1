//! Error taxonomy for the config store.

use std::io;
use std::path::PathBuf;
use std::str::Utf8Error;

use cfgstack_backend::BackendError;

use crate::level::ConfigLevel;

/// Stable error classes.
///
/// Callers that only care about the class of a failure (fall back on
/// not-found, report I/O, and so on) should match on this rather than on
/// [`ConfigError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Key absent from every backend, or a discovery path absent on the host.
    NotFound,
    /// A config file could not be read or written.
    Io,
    /// Conflicting level without force, invalid key or regex, read-only target.
    InvalidArgument,
    /// A value could not be coerced, or a multivar write failed for an
    /// unspecified reason.
    TypeMismatch,
    /// Enumeration stopped because a value could not be materialized.
    Interrupted,
    /// Any other backend failure (parse errors).
    Backend,
    /// The store was closed.
    Closed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Io => "IO_ERROR",
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::TypeMismatch => "TYPE_MISMATCH",
            ErrorKind::Interrupted => "INTERRUPTED",
            ErrorKind::Backend => "BACKEND",
            ErrorKind::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Config store error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config value '{0}' was not found")]
    KeyNotFound(String),

    #[error("{0} config file not found")]
    DiscoveryNotFound(ConfigLevel),

    #[error("config file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("a config backend is already registered at level {0}")]
    LevelOccupied(ConfigLevel),

    #[error("invalid config key: '{0}'")]
    InvalidKey(String),

    #[error("invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("no writable config backend accepts this change")]
    ReadOnly,

    #[error("config value '{key}' is not a valid {expected}: '{value}'")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        value: String,
    },

    #[error("failed to set multivar '{name}': {source}")]
    MultivarWrite {
        name: String,
        #[source]
        source: BackendError,
    },

    #[error("reading multivar '{name}' stopped after {collected} value(s): {source}")]
    MultivarInterrupted {
        name: String,
        collected: usize,
        #[source]
        source: Utf8Error,
    },

    #[error("value of '{name}' is not valid UTF-8: {source}")]
    InvalidUtf8 {
        name: String,
        #[source]
        source: Utf8Error,
    },

    #[error(transparent)]
    Backend(BackendError),

    #[error("config store is closed")]
    Closed,
}

impl ConfigError {
    /// Returns the error class for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::KeyNotFound(_)
            | ConfigError::DiscoveryNotFound(_)
            | ConfigError::FileNotFound(_) => ErrorKind::NotFound,
            ConfigError::Io { .. } => ErrorKind::Io,
            ConfigError::LevelOccupied(_)
            | ConfigError::InvalidKey(_)
            | ConfigError::InvalidRegex { .. }
            | ConfigError::ReadOnly => ErrorKind::InvalidArgument,
            ConfigError::TypeMismatch { .. } | ConfigError::MultivarWrite { .. } => {
                ErrorKind::TypeMismatch
            }
            ConfigError::MultivarInterrupted { .. } | ConfigError::InvalidUtf8 { .. } => {
                ErrorKind::Interrupted
            }
            ConfigError::Backend(_) => ErrorKind::Backend,
            ConfigError::Closed => ErrorKind::Closed,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<BackendError> for ConfigError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(key) => ConfigError::KeyNotFound(key),
            BackendError::Io { path, source } => ConfigError::Io { path, source },
            BackendError::InvalidKey(key) => ConfigError::InvalidKey(key),
            BackendError::InvalidRegex { pattern, message } => {
                ConfigError::InvalidRegex { pattern, message }
            }
            BackendError::ReadOnly => ConfigError::ReadOnly,
            other => ConfigError::Backend(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_errors_are_classified() {
        let cases: Vec<(BackendError, ErrorKind)> = vec![
            (BackendError::NotFound("a.b".into()), ErrorKind::NotFound),
            (
                BackendError::Io {
                    path: PathBuf::from("/x"),
                    source: io::Error::from(io::ErrorKind::PermissionDenied),
                },
                ErrorKind::Io,
            ),
            (BackendError::InvalidKey("nodot".into()), ErrorKind::InvalidArgument),
            (BackendError::ReadOnly, ErrorKind::InvalidArgument),
            (
                BackendError::Parse {
                    path: None,
                    line: 1,
                    message: "bad".into(),
                },
                ErrorKind::Backend,
            ),
            (BackendError::MultivarConflict("a.b".into()), ErrorKind::Backend),
        ];

        for (backend, expected) in cases {
            let err = ConfigError::from(backend);
            assert_eq!(err.kind(), expected, "for {:?}", err);
        }
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ConfigError::KeyNotFound("core.bare".into()).to_string(),
            "config value 'core.bare' was not found"
        );
        assert_eq!(
            ConfigError::DiscoveryNotFound(ConfigLevel::Global).to_string(),
            "global config file not found"
        );
        assert_eq!(
            ConfigError::LevelOccupied(ConfigLevel::Local).to_string(),
            "a config backend is already registered at level local"
        );
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(ErrorKind::NotFound.to_string(), "NOT_FOUND");
        assert_eq!(ErrorKind::TypeMismatch.as_str(), "TYPE_MISMATCH");
    }
}
