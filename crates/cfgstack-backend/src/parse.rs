//! Parser for the git-style config text format.
//!
//! The parser keeps the raw bytes of every line so that a document can be
//! written back with its comments and layout intact. Names are decoded as
//! UTF-8; values stay raw bytes until somebody asks for text.

/// One logical line of a config file.
///
/// A logical line can span several physical lines when a value ends with a
/// backslash continuation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Line {
    /// `[section]` or `[section "subsection"]`.
    Section { section: String, raw: Vec<u8> },
    /// `name = value` or a bare `name` (value `None`, implicitly true).
    Entry {
        section: String,
        variable: String,
        value: Option<Vec<u8>>,
        raw: Vec<u8>,
    },
    /// Blank line or comment.
    Other { raw: Vec<u8> },
}

impl Line {
    pub(crate) fn raw(&self) -> &[u8] {
        match self {
            Line::Section { raw, .. } | Line::Entry { raw, .. } | Line::Other { raw } => raw,
        }
    }
}

/// Error produced while parsing config text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

const BOM: &[u8] = b"\xEF\xBB\xBF";

struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_blank(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r')) {
            self.pos += 1;
        }
    }

    fn skip_to_line_end(&mut self) {
        while let Some(c) = self.bump() {
            if c == b'\n' {
                break;
            }
        }
    }

    fn at_comment_or_end(&self) -> bool {
        matches!(self.peek(), None | Some(b'\n' | b'#' | b';'))
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: self.line,
            message: message.into(),
        }
    }
}

/// Parse config text into logical lines.
pub(crate) fn parse_lines(input: &[u8]) -> Result<Vec<Line>, ParseError> {
    let input = input.strip_prefix(BOM).unwrap_or(input);
    let mut cursor = Cursor::new(input);
    let mut lines = Vec::new();
    let mut current: Option<String> = None;

    while cursor.peek().is_some() {
        let start = cursor.pos;
        cursor.skip_blank();

        match cursor.peek() {
            None | Some(b'\n' | b'#' | b';') => {
                cursor.skip_to_line_end();
                lines.push(Line::Other {
                    raw: input[start..cursor.pos].to_vec(),
                });
            }
            Some(b'[') => {
                let section = parse_header(&mut cursor)?;
                let header_end = cursor.pos;
                cursor.skip_blank();

                if cursor.at_comment_or_end() {
                    cursor.skip_to_line_end();
                    lines.push(Line::Section {
                        section: section.clone(),
                        raw: input[start..cursor.pos].to_vec(),
                    });
                } else {
                    // `[core] bare = true`: split into a header and an entry.
                    let mut raw = input[start..header_end].to_vec();
                    raw.push(b'\n');
                    lines.push(Line::Section {
                        section: section.clone(),
                        raw,
                    });

                    let entry_start = cursor.pos;
                    let (variable, value) = parse_entry(&mut cursor)?;
                    lines.push(Line::Entry {
                        section: section.clone(),
                        variable,
                        value,
                        raw: input[entry_start..cursor.pos].to_vec(),
                    });
                }
                current = Some(section);
            }
            Some(_) => {
                let section = current
                    .clone()
                    .ok_or_else(|| cursor.error("entry outside of any section"))?;
                let (variable, value) = parse_entry(&mut cursor)?;
                lines.push(Line::Entry {
                    section,
                    variable,
                    value,
                    raw: input[start..cursor.pos].to_vec(),
                });
            }
        }
    }

    Ok(lines)
}

/// Parse a section header, returning the normalized section key.
fn parse_header(cursor: &mut Cursor<'_>) -> Result<String, ParseError> {
    cursor.bump(); // '['
    let mut name = String::new();

    loop {
        match cursor.peek() {
            Some(c) if c.is_ascii_alphanumeric() || c == b'-' || c == b'.' => {
                name.push(char::from(c));
                cursor.bump();
            }
            Some(b']') => {
                cursor.bump();
                return plain_section(cursor, name);
            }
            Some(b' ' | b'\t') => break,
            _ => return Err(cursor.error("invalid section header")),
        }
    }

    if name.is_empty() || name.contains('.') {
        return Err(cursor.error("invalid section name"));
    }

    cursor.skip_blank();
    if cursor.peek() != Some(b'"') {
        return Err(cursor.error("expected quoted subsection name"));
    }
    cursor.bump();

    let mut subsection = Vec::new();
    loop {
        match cursor.peek() {
            None | Some(b'\n') => return Err(cursor.error("unterminated subsection name")),
            Some(b'"') => {
                cursor.bump();
                break;
            }
            Some(b'\\') => {
                cursor.bump();
                match cursor.peek() {
                    None | Some(b'\n') => {
                        return Err(cursor.error("unterminated subsection name"))
                    }
                    Some(c) => {
                        subsection.push(c);
                        cursor.bump();
                    }
                }
            }
            Some(c) => {
                subsection.push(c);
                cursor.bump();
            }
        }
    }

    if cursor.peek() != Some(b']') {
        return Err(cursor.error("expected ']' after subsection name"));
    }
    cursor.bump();

    let subsection = String::from_utf8(subsection)
        .map_err(|_| cursor.error("subsection name is not valid UTF-8"))?;
    Ok(format!("{}.{}", name.to_ascii_lowercase(), subsection))
}

/// `[section]` or the legacy `[section.subsection]`, both fully lowercased.
fn plain_section(cursor: &Cursor<'_>, name: String) -> Result<String, ParseError> {
    if name.is_empty() || name.starts_with('.') || name.ends_with('.') {
        return Err(cursor.error("invalid section name"));
    }
    Ok(name.to_ascii_lowercase())
}

fn parse_entry(cursor: &mut Cursor<'_>) -> Result<(String, Option<Vec<u8>>), ParseError> {
    match cursor.peek() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return Err(cursor.error("invalid variable name")),
    }

    let mut variable = String::new();
    while let Some(c) = cursor.peek() {
        if c.is_ascii_alphanumeric() || c == b'-' {
            variable.push(char::from(c.to_ascii_lowercase()));
            cursor.bump();
        } else {
            break;
        }
    }

    cursor.skip_blank();
    if cursor.at_comment_or_end() {
        cursor.skip_to_line_end();
        return Ok((variable, None));
    }
    if cursor.peek() != Some(b'=') {
        return Err(cursor.error("expected '=' after variable name"));
    }
    cursor.bump();

    let value = parse_value(cursor)?;
    Ok((variable, Some(value)))
}

fn parse_value(cursor: &mut Cursor<'_>) -> Result<Vec<u8>, ParseError> {
    let mut value = Vec::new();
    let mut pending_spaces = 0usize;
    let mut quoted = false;

    while let Some(c) = cursor.peek() {
        match c {
            b'\n' => {
                if quoted {
                    return Err(cursor.error("unterminated quoted value"));
                }
                cursor.bump();
                break;
            }
            b' ' | b'\t' | b'\r' if !quoted => {
                cursor.bump();
                if !value.is_empty() {
                    pending_spaces += 1;
                }
                continue;
            }
            b'#' | b';' if !quoted => {
                cursor.skip_to_line_end();
                break;
            }
            _ => {}
        }

        value.resize(value.len() + pending_spaces, b' ');
        pending_spaces = 0;
        cursor.bump();

        match c {
            b'\\' => match cursor.peek() {
                None => {}
                Some(b'\n') => {
                    cursor.bump();
                }
                Some(b'\r') if cursor.peek_at(1) == Some(b'\n') => {
                    cursor.bump();
                    cursor.bump();
                }
                Some(escaped) => {
                    let decoded = match escaped {
                        b'n' => b'\n',
                        b't' => b'\t',
                        b'b' => 0x08,
                        b'\\' => b'\\',
                        b'"' => b'"',
                        _ => return Err(cursor.error("invalid escape sequence in value")),
                    };
                    value.push(decoded);
                    cursor.bump();
                }
            },
            b'"' => quoted = !quoted,
            other => value.push(other),
        }
    }

    if quoted {
        return Err(cursor.error("unterminated quoted value"));
    }
    Ok(value)
}

/// Render a section header line for `section_key`.
pub(crate) fn render_header(section: &str, subsection: Option<&str>) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(b'[');
    out.extend_from_slice(section.as_bytes());
    if let Some(sub) = subsection {
        out.extend_from_slice(b" \"");
        for &b in sub.as_bytes() {
            if b == b'"' || b == b'\\' {
                out.push(b'\\');
            }
            out.push(b);
        }
        out.push(b'"');
    }
    out.extend_from_slice(b"]\n");
    out
}

/// Render an entry line, quoting and escaping the value as needed.
pub(crate) fn render_entry(variable: &str, value: &[u8]) -> Vec<u8> {
    let needs_quotes = value.first() == Some(&b' ')
        || value.last() == Some(&b' ')
        || value.iter().any(|&b| matches!(b, b'#' | b';' | b'\r'));

    let mut out = Vec::with_capacity(variable.len() + value.len() + 8);
    out.push(b'\t');
    out.extend_from_slice(variable.as_bytes());
    out.extend_from_slice(b" = ");
    if needs_quotes {
        out.push(b'"');
    }
    for &b in value {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'"' => out.extend_from_slice(b"\\\""),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x08 => out.extend_from_slice(b"\\b"),
            _ => out.push(b),
        }
    }
    if needs_quotes {
        out.push(b'"');
    }
    out.push(b'\n');
    out
}
