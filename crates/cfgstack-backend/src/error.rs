//! Error types for backend operations.

use std::io;
use std::path::PathBuf;

/// Errors raised by a [`crate::Backend`] or by the grammar helpers.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config entry not found: {0}")]
    NotFound(String),

    #[error("failed to parse config file {}: line {line}: {message}", display_path(.path))]
    Parse {
        path: Option<PathBuf>,
        line: usize,
        message: String,
    },

    #[error("invalid config key: '{0}'")]
    InvalidKey(String),

    #[error("invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("entry '{0}' has multiple values")]
    MultivarConflict(String),

    #[error("backend is read-only")]
    ReadOnly,

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => p.display().to_string(),
        None => "<memory>".to_string(),
    }
}

impl BackendError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the error means "nothing there", as opposed to a failure.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
