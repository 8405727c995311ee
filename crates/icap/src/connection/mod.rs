//! ICAP connection handling module
//!
//! - [`IcapConnection`]: owns the transport of one client, writes encoded requests
//!   through a buffering [`MessageWriter`] and reads response heads byte by byte into
//!   a bounded, per-read buffer

mod icap_connection;
mod message_writer;

pub use icap_connection::IcapConnection;
pub use message_writer::MessageWriter;
