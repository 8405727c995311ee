//! ICAP response head.

use std::collections::HashMap;

use http::StatusCode;

/// A parsed ICAP response head: the status line and the header fields.
///
/// Header names are kept as received. A compliant server never repeats a name, and
/// the parser rejects a head that does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    status: StatusCode,
    reason: String,
    headers: HashMap<String, String>,
}

impl ResponseHead {
    pub fn new(status: StatusCode, reason: impl Into<String>, headers: HashMap<String, String>) -> Self {
        Self { status, reason: reason.into(), headers }
    }

    /// Returns the response status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the reason phrase of the status line.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns all header fields.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Looks up a header value, preferring an exact name match and falling back to
    /// an ASCII case-insensitive one.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .or_else(|| self.headers.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, value)| value))
            .map(String::as_str)
    }
}
