//! ICAP codec module for encoding requests and decoding responses
//!
//! # Architecture
//!
//! - Request handling:
//!   - [`RequestEncoder`]: Encodes outgoing ICAP requests, head and chunked body
//!   - Head encoding via [`HeaderEncoder`]
//!   - Body framing via [`ChunkedEncoder`]
//!
//! - Response handling:
//!   - [`HeadDecoder`]: Finds the end of a response head, bounded in size
//!   - [`parse_head`]: Parses status line and header fields
//!
//! # Example
//!
//! ```
//! use micro_icap::codec::{parse_head, HeadDecoder};
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = HeadDecoder::icap(8 * 1024);
//! let mut buffer = BytesMut::from(&b"ICAP/1.0 204 No Content\r\nISTag: \"x\"\r\n\r\n"[..]);
//! let text = decoder.decode(&mut buffer).unwrap().unwrap();
//! let head = parse_head(&text).unwrap();
//! assert_eq!(head.status().as_u16(), 204);
//! ```

mod body;
mod header;
mod request_encoder;

pub use body::ChunkedEncoder;
pub use header::{parse_head, HeadDecoder, HeaderEncoder, HTTP_BODY_TERMINATOR, ICAP_TERMINATOR};
pub use request_encoder::RequestEncoder;
