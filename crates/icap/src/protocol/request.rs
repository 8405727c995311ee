//! ICAP request head.
//!
//! Only the two methods this client speaks are modelled: `OPTIONS` for capability
//! discovery and `RESPMOD` for scanning a payload wrapped in a minimal HTTP response.

use std::fmt;

use http::Uri;

/// ICAP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Options,
    Respmod,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Options => "OPTIONS",
            Method::Respmod => "RESPMOD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the request carries after its head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encapsulated {
    /// `Encapsulated: null-body=0`
    NullBody,
    /// A synthetic HTTP response header `Content-Length: <content_length>` followed by
    /// the chunked body.
    ResBody { content_length: u64 },
}

impl Encapsulated {
    /// The encapsulated HTTP response header, empty when there is no body.
    pub fn http_header(&self) -> String {
        match self {
            Encapsulated::NullBody => String::new(),
            Encapsulated::ResBody { content_length } => format!("Content-Length: {content_length}\r\n\r\n"),
        }
    }
}

/// An ICAP request head, serialized by [`crate::codec::HeaderEncoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    method: Method,
    uri: Uri,
    user_agent: String,
    allow_204: bool,
    preview: Option<usize>,
    encapsulated: Encapsulated,
}

impl RequestHead {
    /// Capability discovery request, no body.
    pub fn options(uri: Uri, user_agent: impl Into<String>) -> Self {
        Self {
            method: Method::Options,
            uri,
            user_agent: user_agent.into(),
            allow_204: false,
            preview: None,
            encapsulated: Encapsulated::NullBody,
        }
    }

    /// Response modification request for a payload of `content_length` bytes, of which
    /// the first `preview` bytes are sent up front.
    pub fn respmod(uri: Uri, user_agent: impl Into<String>, preview: usize, content_length: u64) -> Self {
        Self {
            method: Method::Respmod,
            uri,
            user_agent: user_agent.into(),
            allow_204: true,
            preview: Some(preview),
            encapsulated: Encapsulated::ResBody { content_length },
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn allow_204(&self) -> bool {
        self.allow_204
    }

    pub fn preview(&self) -> Option<usize> {
        self.preview
    }

    pub fn encapsulated(&self) -> Encapsulated {
        self.encapsulated
    }

    /// Returns true if a chunked body follows the head.
    pub fn has_body(&self) -> bool {
        matches!(self.encapsulated, Encapsulated::ResBody { .. })
    }
}
