//! Core ICAP protocol abstractions.
//!
//! This module holds the types exchanged between the codec layer and the client:
//! request and response heads, body items, the status policy and the error types.
//!
//! - **Message Handling** ([`message`]): [`Message`] and [`PayloadItem`], the units
//!   the request encoder consumes
//! - **Request** ([`request`]): [`RequestHead`] for `OPTIONS` and `RESPMOD`
//! - **Response** ([`response`]): [`ResponseHead`], status code plus header fields
//! - **Decision** ([`decision`]): pure status policy producing a [`Decision`]
//! - **Error Handling** ([`error`]): [`IcapError`], [`ParseError`], [`SendError`]

/// Protocol version written in request lines and expected in status lines
pub const ICAP_VERSION: &str = "ICAP/1.0";

mod message;
pub use message::Message;
pub use message::PayloadItem;

mod request;
pub use request::Encapsulated;
pub use request::Method;
pub use request::RequestHead;

mod response;
pub use response::ResponseHead;

pub mod decision;
pub use decision::Decision;

mod error;
pub use error::ErrorKind;
pub use error::IcapError;
pub use error::ParseError;
pub use error::SendError;
