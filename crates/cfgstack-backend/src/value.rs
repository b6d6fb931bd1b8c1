//! Integer and boolean value grammar.
//!
//! Config values are always stored as text. These helpers implement the
//! coercions the store applies at its typed-access boundary, and the
//! canonical text written for typed input.

use crate::error::BackendError;

/// Parse a signed 64-bit integer with an optional `k`/`m`/`g` unit suffix.
///
/// Accepts decimal, `0x` hexadecimal and leading-zero octal, as `strtoll`
/// does with base 0. Suffixes multiply by powers of 1024.
pub fn parse_int64(text: &str) -> Result<i64, BackendError> {
    let invalid = || BackendError::InvalidValue(format!("failed to parse '{}' as an integer", text));

    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let (radix, digits_and_suffix) = if let Some(hex) = rest
        .strip_prefix("0x")
        .or_else(|| rest.strip_prefix("0X"))
    {
        (16, hex)
    } else if rest.len() > 1 && rest.starts_with('0') && rest.as_bytes()[1].is_ascii_digit() {
        (8, &rest[1..])
    } else {
        (10, rest)
    };

    let digits_end = digits_and_suffix
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits_and_suffix.len());
    let (digits, suffix) = digits_and_suffix.split_at(digits_end);
    if digits.is_empty() {
        return Err(invalid());
    }

    let multiplier: i64 = match suffix {
        "" => 1,
        "k" | "K" => 1024,
        "m" | "M" => 1024 * 1024,
        "g" | "G" => 1024 * 1024 * 1024,
        _ => return Err(invalid()),
    };

    // Parse the magnitude as u64 so that i64::MIN round-trips.
    let magnitude = u64::from_str_radix(digits, radix).map_err(|_| invalid())?;
    let magnitude = i128::from(magnitude) * i128::from(multiplier);
    let signed = if negative { -magnitude } else { magnitude };

    i64::try_from(signed).map_err(|_| {
        BackendError::InvalidValue(format!("integer '{}' is out of range", text))
    })
}

/// Parse a boolean.
///
/// `true`/`yes`/`on` and `false`/`no`/`off` are accepted case-insensitively;
/// an empty value is false; anything else must be a 32-bit integer, where
/// non-zero is true.
pub fn parse_bool(text: &str) -> Result<bool, BackendError> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => return Ok(true),
        "false" | "no" | "off" | "" => return Ok(false),
        _ => {}
    }

    match parse_int64(text) {
        Ok(n) if i32::try_from(n).is_ok() => Ok(n != 0),
        _ => Err(BackendError::InvalidValue(format!(
            "failed to parse '{}' as a boolean",
            text
        ))),
    }
}

/// Canonical text for a boolean.
pub fn format_bool(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}

/// Canonical text for an integer.
pub fn format_int64(value: i64) -> String {
    value.to_string()
}
