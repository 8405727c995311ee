use std::io;
use thiserror::Error;

/// Coarse classification of an [`IcapError`], for callers that decide
/// fail-open or fail-closed policy per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The OPTIONS handshake did not yield a usable preview size
    Initialization,
    /// Connecting, sending or receiving failed, including timeouts and early EOF, or an
    /// earlier failure left the connection mid-exchange
    Transport,
    /// A response head was malformed or never terminated within bounds
    ProtocolParse,
    /// The server answered with a status this client has no policy for
    UnrecognizedStatus,
    /// The server reported the ICAP service as missing (404)
    ServiceNotFound,
    /// The payload source could not be read
    Source,
}

#[derive(Debug, Error)]
pub enum IcapError {
    #[error("icap initialization error: {reason}")]
    Initialization { reason: String },

    #[error("connect error: {source}")]
    Connect { source: io::Error },

    #[error("payload source error: {source}")]
    Source { source: io::Error },

    #[error("request error: {source}")]
    Request {
        #[from]
        source: SendError,
    },

    #[error("response error: {source}")]
    Response {
        #[from]
        source: ParseError,
    },

    #[error("connection left in the middle of an earlier exchange, reconnect")]
    Interrupted,

    #[error("404: icap service not found")]
    ServiceNotFound,

    #[error("unrecognized status code in response header: {status}")]
    UnrecognizedStatus { status: u16 },
}

impl IcapError {
    pub fn initialization<S: ToString>(str: S) -> Self {
        Self::Initialization { reason: str.to_string() }
    }

    pub fn connect<E: Into<io::Error>>(e: E) -> Self {
        Self::Connect { source: e.into() }
    }

    pub fn payload_source<E: Into<io::Error>>(e: E) -> Self {
        Self::Source { source: e.into() }
    }

    pub fn unrecognized_status(status: u16) -> Self {
        Self::UnrecognizedStatus { status }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            IcapError::Initialization { .. } => ErrorKind::Initialization,
            IcapError::Connect { .. } | IcapError::Request { .. } | IcapError::Interrupted => ErrorKind::Transport,
            IcapError::Source { .. } => ErrorKind::Source,
            IcapError::Response { source: ParseError::Io { .. } } => ErrorKind::Transport,
            IcapError::Response { .. } => ErrorKind::ProtocolParse,
            IcapError::ServiceNotFound => ErrorKind::ServiceNotFound,
            IcapError::UnrecognizedStatus { .. } => ErrorKind::UnrecognizedStatus,
        }
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header not found within {max_size} bytes, current: {current_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("invalid status line: {line:?}")]
    InvalidStatusLine { line: String },

    #[error("duplicate header: {name}")]
    DuplicateHeader { name: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn invalid_status_line<S: ToString>(str: S) -> Self {
        Self::InvalidStatusLine { line: str.to_string() }
    }

    pub fn duplicate_header<S: ToString>(str: S) -> Self {
        Self::DuplicateHeader { name: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
