//! Locating the global, xdg and system config files.
//!
//! Search locations are an injected value rather than process-global state:
//! build a [`SearchPaths`] from the environment, from a TOML file, or by
//! hand in tests, and pass it to the store constructors.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::level::ConfigLevel;

/// Default system-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/gitconfig";

/// Environment variable overriding the global config file.
pub const GLOBAL_OVERRIDE_VAR: &str = "CFGSTACK_CONFIG_GLOBAL";

/// Environment variable overriding the system config file.
pub const SYSTEM_OVERRIDE_VAR: &str = "CFGSTACK_CONFIG_SYSTEM";

/// Strategy for finding the config file of a level.
pub trait PathResolver {
    /// Path of the existing config file for `level`, or
    /// [`ConfigError::DiscoveryNotFound`].
    fn find(&self, level: ConfigLevel) -> Result<PathBuf, ConfigError>;
}

/// Candidate locations for the well-known config files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPaths {
    #[serde(default)]
    pub global: Option<PathBuf>,
    #[serde(default)]
    pub xdg: Option<PathBuf>,
    #[serde(default)]
    pub system: Option<PathBuf>,
}

/// Errors that can occur when loading search paths from a file
#[derive(Debug, thiserror::Error)]
pub enum SearchPathsError {
    #[error("Failed to read search paths file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

impl SearchPaths {
    /// Locations derived from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Locations derived from an arbitrary variable lookup.
    ///
    /// Global: `$CFGSTACK_CONFIG_GLOBAL`, else `$HOME/.gitconfig`.
    /// Xdg: `$XDG_CONFIG_HOME/git/config`, else `$HOME/.config/git/config`.
    /// System: `$CFGSTACK_CONFIG_SYSTEM`, else `/etc/gitconfig`.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| var(name).filter(|v| !v.is_empty());
        let home = non_empty("HOME").map(PathBuf::from);

        let global = non_empty(GLOBAL_OVERRIDE_VAR)
            .map(PathBuf::from)
            .or_else(|| home.as_ref().map(|h| h.join(".gitconfig")));

        let xdg = non_empty("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| home.as_ref().map(|h| h.join(".config")))
            .map(|base| base.join("git").join("config"));

        let system = Some(
            non_empty(SYSTEM_OVERRIDE_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(SYSTEM_CONFIG_PATH)),
        );

        Self {
            global,
            xdg,
            system,
        }
    }

    /// Load search paths from a TOML file. A leading `~/` is expanded
    /// against `$HOME`.
    pub fn load(path: &Path) -> Result<Self, SearchPathsError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse search paths from a TOML string
    pub fn parse(content: &str) -> Result<Self, SearchPathsError> {
        let paths: SearchPaths = toml::from_str(content)?;
        Ok(Self {
            global: paths.global.map(expand_home),
            xdg: paths.xdg.map(expand_home),
            system: paths.system.map(expand_home),
        })
    }

    pub fn find_global(&self) -> Result<PathBuf, ConfigError> {
        self.find(ConfigLevel::Global)
    }

    pub fn find_xdg(&self) -> Result<PathBuf, ConfigError> {
        self.find(ConfigLevel::Xdg)
    }

    pub fn find_system(&self) -> Result<PathBuf, ConfigError> {
        self.find(ConfigLevel::System)
    }
}

impl PathResolver for SearchPaths {
    fn find(&self, level: ConfigLevel) -> Result<PathBuf, ConfigError> {
        let candidate = match level {
            ConfigLevel::Global => self.global.as_ref(),
            ConfigLevel::Xdg => self.xdg.as_ref(),
            ConfigLevel::System => self.system.as_ref(),
            _ => None,
        };
        match candidate {
            Some(path) if path.is_file() => Ok(path.clone()),
            _ => Err(ConfigError::DiscoveryNotFound(level)),
        }
    }
}

fn expand_home(path: PathBuf) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path
}
