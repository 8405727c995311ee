//! Parsing of an ICAP response head from the text returned by the head decoder.
//!
//! The grammar is small: a status line `ICAP/1.0 <3-digit> <reason>` followed by
//! `<token>: <value>` lines. Lines that do not have the field shape, such as the
//! closing empty line, are skipped.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use http::StatusCode;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, ResponseHead, ICAP_VERSION};

/// Parses a response head.
///
/// # Errors
///
/// - [`ParseError::InvalidStatusLine`] if the first line is not an ICAP/1.0 status line
/// - [`ParseError::DuplicateHeader`] if a header name occurs twice
pub fn parse_head(text: &str) -> Result<ResponseHead, ParseError> {
    let mut lines = text.split("\r\n");
    // split always yields at least one item
    let status_line = lines.next().unwrap_or_default();
    let (status, reason) = parse_status_line(status_line)?;

    let mut headers = HashMap::new();
    for (name, value) in lines.filter_map(parse_header_line) {
        match headers.entry(name.to_string()) {
            Entry::Occupied(_) => return Err(ParseError::duplicate_header(name)),
            Entry::Vacant(entry) => {
                entry.insert(value.to_string());
            }
        }
    }

    trace!(status = status.as_u16(), header_count = headers.len(), "parsed response head");
    Ok(ResponseHead::new(status, reason, headers))
}

fn parse_status_line(line: &str) -> Result<(StatusCode, &str), ParseError> {
    let rest = line
        .strip_prefix(ICAP_VERSION)
        .and_then(|rest| rest.strip_prefix(' '))
        .ok_or_else(|| ParseError::invalid_status_line(line))?;
    let (code, reason) = rest.split_once(' ').ok_or_else(|| ParseError::invalid_status_line(line))?;

    ensure!(code.len() == 3 && code.bytes().all(|b| b.is_ascii_digit()), ParseError::invalid_status_line(line));
    ensure!(!reason.trim().is_empty(), ParseError::invalid_status_line(line));

    let status = StatusCode::from_bytes(code.as_bytes()).map_err(|e| ParseError::invalid_status_line(format!("{line} ({e})")))?;
    Ok((status, reason.trim()))
}

fn parse_header_line(line: &str) -> Option<(&str, &str)> {
    let (name, rest) = line.split_once(':')?;
    if name.is_empty() || !name.bytes().all(is_token) {
        return None;
    }
    if !rest.starts_with(|c: char| c == ' ' || c == '\t') {
        return None;
    }

    let value = rest.trim();
    (!value.is_empty()).then_some((name, value))
}

fn is_token(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
