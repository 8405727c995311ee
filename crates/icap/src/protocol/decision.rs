//! Status policy of a scan.
//!
//! A scan reaches up to two decision points: after the preview (only when the payload
//! did not fit into it) and after the whole body. Both are pure functions of the status
//! code; an ambiguous `200` at the end is settled by [`inspect_embedded`].

use http::StatusCode;

const TITLE_OPEN: &str = "<title>";
const TITLE_CLOSE: &str = "</title>";

/// Outcome of interpreting a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Server wants the rest of the body
    Continue,
    /// Verdict: content allowed
    Allowed,
    /// Verdict: content blocked
    Blocked,
    /// Verdict depends on the embedded HTTP response
    Inspect,
    /// The ICAP service does not exist on the server
    ServiceMissing,
    /// No policy for this status
    Unrecognized,
}

/// Decision for the response that follows a preview which did not hold the whole body.
pub fn preview_decision(status: StatusCode) -> Decision {
    match status.as_u16() {
        100 => Decision::Continue,
        200 => Decision::Blocked,
        204 => Decision::Allowed,
        404 => Decision::ServiceMissing,
        _ => Decision::Unrecognized,
    }
}

/// Decision for the response to a completely sent body.
pub fn final_decision(status: StatusCode) -> Decision {
    match status.as_u16() {
        200 => Decision::Inspect,
        204 => Decision::Allowed,
        404 => Decision::ServiceMissing,
        _ => Decision::Unrecognized,
    }
}

/// Returns the text between the first `<title>` and the `</title>` after it.
pub fn embedded_title(text: &str) -> Option<&str> {
    let start = text.find(TITLE_OPEN)? + TITLE_OPEN.len();
    let end = start + text[start..].find(TITLE_CLOSE)?;
    Some(&text[start..end])
}

/// Settles a final `200` by looking for the denial page title.
///
/// This is an exact match against one known denial page. A server that words its
/// page differently yields [`Decision::Unrecognized`], never a default verdict.
pub fn inspect_embedded(text: &str, denial_marker: &str) -> Decision {
    match embedded_title(text) {
        Some(title) if title == denial_marker => Decision::Blocked,
        _ => Decision::Unrecognized,
    }
}
