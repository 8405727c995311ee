//! ICAP head processing: request head encoding and response head decoding
//!
//! # Components
//!
//! - [`HeaderEncoder`]: Encodes a request head, including the encapsulated HTTP
//!   response header of a `RESPMOD`
//! - [`HeadDecoder`]: Finds the end of a response head (or of an embedded HTTP
//!   response) in a byte stream, within a size bound
//! - [`parse_head`]: Turns the decoded text into a [`ResponseHead`](crate::protocol::ResponseHead)

mod head_parser;
mod header_decoder;
mod header_encoder;

pub use head_parser::parse_head;
pub use header_decoder::HeadDecoder;
pub use header_decoder::{HTTP_BODY_TERMINATOR, ICAP_TERMINATOR};
pub use header_encoder::HeaderEncoder;
