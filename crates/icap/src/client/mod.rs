//! ICAP scan client
//!
//! - [`IcapClient`]: handshake and scan over one connection
//! - [`ClientConfig`]: server address, service, limits and timeout, built through
//!   [`ClientConfig::builder`]

mod config;
mod icap_client;

pub use config::{ClientConfig, ClientConfigBuilder, ConfigError};
pub use config::{DEFAULT_DENIAL_MARKER, DEFAULT_PORT, DEFAULT_SERVICE, DEFAULT_USER_AGENT};
pub use icap_client::IcapClient;
