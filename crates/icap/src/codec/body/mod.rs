//! ICAP body handling module
//!
//! RESPMOD bodies are always sent with chunked framing, first the preview and then,
//! if the server answers `100 Continue`, the remainder.
//!
//! - [`ChunkedEncoder`]: Implements chunked framing including the `ieof` extension

mod chunked_encoder;

pub use chunked_encoder::ChunkedEncoder;
