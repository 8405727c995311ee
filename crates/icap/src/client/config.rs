use std::time::Duration;

use http::Uri;
use thiserror::Error;

use crate::ensure;

/// Port ICAP servers listen on unless told otherwise
pub const DEFAULT_PORT: u16 = 1344;

/// Service path of the antivirus scan service
pub const DEFAULT_SERVICE: &str = "avscan";

/// Title of the page a ProxyAV server embeds when it blocks content
pub const DEFAULT_DENIAL_MARKER: &str = "ProxyAV: Access Denied";

pub const DEFAULT_USER_AGENT: &str = concat!("micro-icap/", env!("CARGO_PKG_VERSION"));

const DEFAULT_MAX_HEADER_BYTES: usize = 8 * 1024;
const DEFAULT_SEND_CHUNK_SIZE: usize = 8 * 1024;

/// Smallest accepted head bound, enough for any status line
const MIN_HEADER_BYTES: usize = 64;

/// Settings of an [`IcapClient`](crate::client::IcapClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    host: String,
    port: u16,
    uri: Uri,
    user_agent: String,
    max_header_bytes: usize,
    send_chunk_size: usize,
    denial_marker: String,
    timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn builder(host: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder::new(host.into())
    }

    /// Configuration with every default, for the given server.
    pub fn new(host: impl Into<String>) -> Result<Self, ConfigError> {
        Self::builder(host).build()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `icap://<host>[:<port>]/<service>`, the target of every request.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Bound on the bytes read while looking for a head terminator.
    pub fn max_header_bytes(&self) -> usize {
        self.max_header_bytes
    }

    /// Size of the reads the remainder of a payload is sent in.
    pub fn send_chunk_size(&self) -> usize {
        self.send_chunk_size
    }

    pub fn denial_marker(&self) -> &str {
        &self.denial_marker
    }

    /// Deadline for connecting and for each response head, `None` waits forever.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[derive(Debug)]
pub struct ClientConfigBuilder {
    host: String,
    port: u16,
    service: String,
    user_agent: String,
    max_header_bytes: usize,
    send_chunk_size: usize,
    denial_marker: String,
    timeout: Option<Duration>,
}

impl ClientConfigBuilder {
    fn new(host: String) -> Self {
        Self {
            host,
            port: DEFAULT_PORT,
            service: DEFAULT_SERVICE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            send_chunk_size: DEFAULT_SEND_CHUNK_SIZE,
            denial_marker: DEFAULT_DENIAL_MARKER.to_string(),
            timeout: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn max_header_bytes(mut self, max_header_bytes: usize) -> Self {
        self.max_header_bytes = max_header_bytes;
        self
    }

    pub fn send_chunk_size(mut self, send_chunk_size: usize) -> Self {
        self.send_chunk_size = send_chunk_size;
        self
    }

    pub fn denial_marker(mut self, denial_marker: impl Into<String>) -> Self {
        self.denial_marker = denial_marker.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let host = self.host.trim().to_string();
        ensure!(!host.is_empty(), ConfigError::MissingHost);
        ensure!(
            self.max_header_bytes >= MIN_HEADER_BYTES,
            ConfigError::invalid_size("max_header_bytes", self.max_header_bytes)
        );
        ensure!(self.send_chunk_size > 0, ConfigError::invalid_size("send_chunk_size", self.send_chunk_size));
        // an empty marker would match any `<title></title>` page as a denial
        ensure!(!self.denial_marker.trim().is_empty(), ConfigError::EmptyDenialMarker);

        // the default port stays implicit so requests read `icap://<host>/<service>`
        let authority = if self.port == DEFAULT_PORT { host.clone() } else { format!("{host}:{}", self.port) };
        let uri = Uri::builder()
            .scheme("icap")
            .authority(authority)
            .path_and_query(format!("/{}", self.service.trim_start_matches('/')))
            .build()
            .map_err(ConfigError::invalid_uri)?;

        Ok(ClientConfig {
            host,
            port: self.port,
            uri,
            user_agent: self.user_agent,
            max_header_bytes: self.max_header_bytes,
            send_chunk_size: self.send_chunk_size,
            denial_marker: self.denial_marker,
            timeout: self.timeout,
        })
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("host must be set")]
    MissingHost,

    #[error("invalid {name}: {value}")]
    InvalidSize { name: &'static str, value: usize },

    #[error("denial marker must not be empty")]
    EmptyDenialMarker,

    #[error("invalid icap uri: {reason}")]
    InvalidUri { reason: String },
}

impl ConfigError {
    pub fn invalid_size(name: &'static str, value: usize) -> Self {
        Self::InvalidSize { name, value }
    }

    pub fn invalid_uri<S: ToString>(str: S) -> Self {
        Self::InvalidUri { reason: str.to_string() }
    }
}
