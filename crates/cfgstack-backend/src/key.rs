//! Config key normalization.
//!
//! A key has the form `section[.subsection].variable`. Section and variable
//! names are case-insensitive and stored lowercased; the subsection keeps its
//! case and may itself contain dots.

use crate::error::BackendError;

/// A key split into its three components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyParts {
    pub section: String,
    pub subsection: Option<String>,
    pub variable: String,
}

impl KeyParts {
    /// Split and normalize `name`.
    pub fn parse(name: &str) -> Result<Self, BackendError> {
        let invalid = || BackendError::InvalidKey(name.to_string());

        let first_dot = name.find('.').ok_or_else(invalid)?;
        let last_dot = name.rfind('.').ok_or_else(invalid)?;

        let section = &name[..first_dot];
        let variable = &name[last_dot + 1..];
        let subsection = if first_dot == last_dot {
            None
        } else {
            Some(&name[first_dot + 1..last_dot])
        };

        if !is_valid_section(section) || !is_valid_variable(variable) {
            return Err(invalid());
        }
        if let Some(sub) = subsection {
            if sub.contains(['\n', '\0']) {
                return Err(invalid());
            }
        }

        Ok(Self {
            section: section.to_ascii_lowercase(),
            subsection: subsection.map(str::to_string),
            variable: variable.to_ascii_lowercase(),
        })
    }

    /// The section part of the normalized key (`section` or `section.subsection`).
    pub fn section_key(&self) -> String {
        match &self.subsection {
            Some(sub) => format!("{}.{}", self.section, sub),
            None => self.section.clone(),
        }
    }

    /// The full normalized key.
    pub fn to_key(&self) -> String {
        format!("{}.{}", self.section_key(), self.variable)
    }
}

/// Normalize a key so it compares equal across every backend.
pub fn normalize_key(name: &str) -> Result<String, BackendError> {
    KeyParts::parse(name).map(|parts| parts.to_key())
}

pub(crate) fn is_valid_section(section: &str) -> bool {
    !section.is_empty()
        && section
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

pub(crate) fn is_valid_variable(variable: &str) -> bool {
    let mut chars = variable.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}
