//! An asynchronous micro ICAP client
//!
//! This crate submits a payload to an ICAP (RFC 3507) adaptation server, typically an
//! antivirus engine, and turns the answer into an allow/deny verdict. It negotiates the
//! preview size with `OPTIONS`, streams the payload with `RESPMOD` using the
//! preview-then-continue chunked scheme, and interprets both the ICAP status and the
//! HTTP response a server may embed in it.
//!
//! # Example
//!
//! ```no_run
//! use micro_icap::client::{ClientConfig, IcapClient};
//! use tracing::{error, info};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ClientConfig::new("127.0.0.1").expect("valid config");
//!
//!     let mut client = match IcapClient::connect(config).await {
//!         Ok(client) => client,
//!         Err(e) => {
//!             error!(cause = %e, "icap handshake failed");
//!             return;
//!         }
//!     };
//!
//!     match client.scan(b"hello world").await {
//!         Ok(allowed) => info!(allowed, "scan finished"),
//!         Err(e) => error!(kind = ?e.kind(), cause = %e, "scan could not be completed"),
//!     }
//!
//!     let _ = client.shutdown().await;
//! }
//! ```
//!
//! # Architecture
//!
//! - [`client`]: [`IcapClient`](client::IcapClient) and its [`ClientConfig`](client::ClientConfig)
//! - [`connection`]: transport ownership, buffered writes, bounded head reads
//! - [`codec`]: request encoding and response head decoding
//! - [`protocol`]: heads, body items, status policy and error types
//!
//! # Scan Flow
//!
//! 1. `OPTIONS` on connect; the `Preview` header fixes the preview size
//! 2. `RESPMOD` head plus a synthetic `Content-Length` HTTP header, then the preview
//!    chunk, closed with `0; ieof` when it holds the whole payload
//! 3. otherwise the server answers after the preview: `100` asks for the rest,
//!    `204` allows, `200` blocks, `404` means the service is missing
//! 4. the final answer: `204` allows, `200` blocks only if the embedded HTTP page is
//!    the configured denial page
//!
//! # Error Handling
//!
//! Nothing is retried. Every failure surfaces as [`protocol::IcapError`], whose
//! [`kind`](protocol::IcapError::kind) tells initialization, transport, parse, status
//! and service-not-found failures apart. Whether a failed scan means allow or deny is
//! the caller's decision.
//!
//! # Limitations
//!
//! - Only `OPTIONS` and `RESPMOD`; one request at a time per connection
//! - Maximum response head size: 8KB by default
//! - The denial check is an exact match on one page title; a differently worded page
//!   is reported as an unrecognized status, not as a verdict
//! - No deadline unless [`ClientConfigBuilder::timeout`](client::ClientConfigBuilder::timeout) is set

pub mod client;
pub mod codec;
pub mod connection;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
