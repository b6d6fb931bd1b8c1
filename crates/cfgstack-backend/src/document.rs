//! Editable in-memory model of a config file.

use regex_lite::Regex;

use crate::backend::Entry;
use crate::error::BackendError;
use crate::key::KeyParts;
use crate::parse::{parse_lines, render_entry, render_header, Line, ParseError};

/// Text a bare `name` line materializes as.
const IMPLICIT_TRUE: &[u8] = b"true";

/// A parsed config file that can be edited and written back.
///
/// Lines that are not touched by an edit are written back byte for byte, so
/// comments, blank lines and indentation survive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    lines: Vec<Line>,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(input: &[u8]) -> Result<Self, ParseError> {
        Ok(Self {
            lines: parse_lines(input)?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.lines.iter().flat_map(|l| l.raw().iter().copied()).collect()
    }

    /// Number of entries (not lines).
    pub fn len(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| matches!(l, Line::Entry { .. }))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every entry in file order.
    pub fn entries(&self) -> impl Iterator<Item = Entry> + '_ {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry {
                section,
                variable,
                value,
                ..
            } => Some(Entry::new(
                format!("{}.{}", section, variable),
                value.as_deref().unwrap_or(IMPLICIT_TRUE),
            )),
            _ => None,
        })
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let parts = KeyParts::parse(key)?;
        Ok(self
            .matching(&parts)
            .last()
            .map(|&i| self.value_at(i).to_vec()))
    }

    pub fn multivar(&self, name: &str) -> Result<Vec<Vec<u8>>, BackendError> {
        let parts = KeyParts::parse(name)?;
        Ok(self
            .matching(&parts)
            .into_iter()
            .map(|i| self.value_at(i).to_vec())
            .collect())
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), BackendError> {
        let parts = KeyParts::parse(key)?;
        match self.matching(&parts).as_slice() {
            [] => self.insert(&parts, value.as_bytes()),
            [index] => self.replace(*index, &parts, value.as_bytes()),
            _ => return Err(BackendError::MultivarConflict(parts.to_key())),
        }
        Ok(())
    }

    pub fn delete(&mut self, key: &str) -> Result<(), BackendError> {
        let parts = KeyParts::parse(key)?;
        match self.matching(&parts).as_slice() {
            [] => Err(BackendError::NotFound(parts.to_key())),
            [index] => {
                self.lines.remove(*index);
                Ok(())
            }
            _ => Err(BackendError::MultivarConflict(parts.to_key())),
        }
    }

    pub fn set_multivar(
        &mut self,
        name: &str,
        pattern: &Regex,
        value: &str,
    ) -> Result<usize, BackendError> {
        let parts = KeyParts::parse(name)?;
        let hits = self.matching_values(&parts, pattern);

        if hits.is_empty() {
            self.insert(&parts, value.as_bytes());
        }
        for &index in &hits {
            self.replace(index, &parts, value.as_bytes());
        }
        Ok(hits.len())
    }

    pub fn add_multivar(&mut self, name: &str, value: &str) -> Result<(), BackendError> {
        let parts = KeyParts::parse(name)?;
        self.insert(&parts, value.as_bytes());
        Ok(())
    }

    pub fn delete_multivar(&mut self, name: &str, pattern: &Regex) -> Result<usize, BackendError> {
        let parts = KeyParts::parse(name)?;
        let hits = self.matching_values(&parts, pattern);
        if hits.is_empty() {
            return Err(BackendError::NotFound(parts.to_key()));
        }
        // Remove from the back so earlier indices stay valid.
        for &index in hits.iter().rev() {
            self.lines.remove(index);
        }
        Ok(hits.len())
    }

    fn matching(&self, parts: &KeyParts) -> Vec<usize> {
        let section_key = parts.section_key();
        self.lines
            .iter()
            .enumerate()
            .filter_map(|(i, line)| match line {
                Line::Entry {
                    section, variable, ..
                } if *section == section_key && *variable == parts.variable => Some(i),
                _ => None,
            })
            .collect()
    }

    fn matching_values(&self, parts: &KeyParts, pattern: &Regex) -> Vec<usize> {
        self.matching(parts)
            .into_iter()
            .filter(|&i| pattern.is_match(&String::from_utf8_lossy(self.value_at(i))))
            .collect()
    }

    fn value_at(&self, index: usize) -> &[u8] {
        match &self.lines[index] {
            Line::Entry { value, .. } => value.as_deref().unwrap_or(IMPLICIT_TRUE),
            _ => &[],
        }
    }

    fn replace(&mut self, index: usize, parts: &KeyParts, value: &[u8]) {
        self.lines[index] = Line::Entry {
            section: parts.section_key(),
            variable: parts.variable.clone(),
            value: Some(value.to_vec()),
            raw: render_entry(&parts.variable, value),
        };
    }

    /// Append after the last line of the matching section, or add a new
    /// section at the end of the document.
    fn insert(&mut self, parts: &KeyParts, value: &[u8]) {
        let section_key = parts.section_key();
        let anchor = self.lines.iter().rposition(|line| match line {
            Line::Section { section, .. } | Line::Entry { section, .. } => *section == section_key,
            Line::Other { .. } => false,
        });

        let entry = Line::Entry {
            section: section_key.clone(),
            variable: parts.variable.clone(),
            value: Some(value.to_vec()),
            raw: render_entry(&parts.variable, value),
        };

        match anchor {
            Some(index) => {
                self.terminate_line(index);
                self.lines.insert(index + 1, entry);
            }
            None => {
                if let Some(last) = self.lines.len().checked_sub(1) {
                    self.terminate_line(last);
                }
                self.lines.push(Line::Section {
                    section: section_key,
                    raw: render_header(&parts.section, parts.subsection.as_deref()),
                });
                self.lines.push(entry);
            }
        }
    }

    /// Make sure the line at `index` ends with a newline before text is
    /// inserted after it.
    fn terminate_line(&mut self, index: usize) {
        let raw = match &mut self.lines[index] {
            Line::Section { raw, .. } | Line::Entry { raw, .. } | Line::Other { raw } => raw,
        };
        if raw.last() != Some(&b'\n') {
            raw.push(b'\n');
        }
    }
}
