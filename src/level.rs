//! Precedence levels for config backends.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Precedence of a backend in the stack. Higher levels shadow lower ones on
/// single-value lookup and receive new keys on write.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ConfigLevel {
    /// Table created implicitly when an empty store is first written.
    Memory,
    System,
    Xdg,
    Global,
    Local,
    App,
    /// Above every named level.
    Highest,
    /// Explicit numeric priority.
    Custom(i32),
}

impl ConfigLevel {
    pub fn priority(&self) -> i32 {
        match self {
            ConfigLevel::Memory => 0,
            ConfigLevel::System => 2,
            ConfigLevel::Xdg => 3,
            ConfigLevel::Global => 4,
            ConfigLevel::Local => 5,
            ConfigLevel::App => 6,
            ConfigLevel::Highest => i32::MAX,
            ConfigLevel::Custom(p) => *p,
        }
    }

    /// Canonical level for a priority, so `Custom(5)` and `Local` coincide.
    pub fn from_priority(priority: i32) -> Self {
        match priority {
            0 => ConfigLevel::Memory,
            2 => ConfigLevel::System,
            3 => ConfigLevel::Xdg,
            4 => ConfigLevel::Global,
            5 => ConfigLevel::Local,
            6 => ConfigLevel::App,
            i32::MAX => ConfigLevel::Highest,
            p => ConfigLevel::Custom(p),
        }
    }
}

impl PartialEq for ConfigLevel {
    fn eq(&self, other: &Self) -> bool {
        self.priority() == other.priority()
    }
}

impl Eq for ConfigLevel {}

impl PartialOrd for ConfigLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ConfigLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority().cmp(&other.priority())
    }
}

impl fmt::Display for ConfigLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match ConfigLevel::from_priority(self.priority()) {
            ConfigLevel::Memory => write!(f, "memory"),
            ConfigLevel::System => write!(f, "system"),
            ConfigLevel::Xdg => write!(f, "xdg"),
            ConfigLevel::Global => write!(f, "global"),
            ConfigLevel::Local => write!(f, "local"),
            ConfigLevel::App => write!(f, "app"),
            ConfigLevel::Highest => write!(f, "highest"),
            ConfigLevel::Custom(p) => write!(f, "{}", p),
        }
    }
}

impl FromStr for ConfigLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(ConfigLevel::Memory),
            "system" => Ok(ConfigLevel::System),
            "xdg" => Ok(ConfigLevel::Xdg),
            "global" => Ok(ConfigLevel::Global),
            "local" => Ok(ConfigLevel::Local),
            "app" => Ok(ConfigLevel::App),
            "highest" => Ok(ConfigLevel::Highest),
            other => other
                .parse::<i32>()
                .map(ConfigLevel::from_priority)
                .map_err(|_| format!("unknown config level '{}'", s)),
        }
    }
}

impl From<ConfigLevel> for String {
    fn from(level: ConfigLevel) -> Self {
        level.to_string()
    }
}

impl TryFrom<String> for ConfigLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
