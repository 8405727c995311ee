//! ICAP request head encoder
//!
//! Serializes a [`RequestHead`] into raw bytes: request line, `Host`, `User-Agent`,
//! the optional `Allow` and `Preview` fields, `Encapsulated`, the empty line, and for
//! `RESPMOD` the encapsulated HTTP response header whose length is the `res-body`
//! offset.

use crate::protocol::{Encapsulated, RequestHead, SendError, ICAP_VERSION};

use bytes::{BufMut, BytesMut};

use std::io;
use std::io::Write;
use tokio_util::codec::Encoder;

/// Initial buffer size allocated for head serialization
const INIT_HEADER_SIZE: usize = 512;

/// Encoder for ICAP request heads implementing the [`Encoder`] trait.
#[derive(Debug)]
pub struct HeaderEncoder;

impl Encoder<RequestHead> for HeaderEncoder {
    type Error = SendError;

    /// Encodes the request head into the provided bytes buffer.
    ///
    /// # Errors
    ///
    /// Returns error if writing to the buffer fails
    fn encode(&mut self, head: RequestHead, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let http_header = head.encapsulated().http_header();

        dst.reserve(INIT_HEADER_SIZE + http_header.len());
        write!(FastWrite(dst), "{} {} {}\r\n", head.method(), head.uri(), ICAP_VERSION)?;

        if let Some(authority) = head.uri().authority() {
            write!(FastWrite(dst), "Host: {authority}\r\n")?;
        }
        write!(FastWrite(dst), "User-Agent: {}\r\n", head.user_agent())?;

        if head.allow_204() {
            dst.put_slice(b"Allow: 204\r\n");
        }
        if let Some(preview) = head.preview() {
            write!(FastWrite(dst), "Preview: {preview}\r\n")?;
        }

        match head.encapsulated() {
            Encapsulated::NullBody => dst.put_slice(b"Encapsulated: null-body=0\r\n"),
            Encapsulated::ResBody { .. } => {
                write!(FastWrite(dst), "Encapsulated: res-hdr=0, res-body={}\r\n", http_header.len())?;
            }
        }
        dst.put_slice(b"\r\n");
        dst.put_slice(http_header.as_bytes());
        Ok(())
    }
}

/// Fast writer implementation for writing to BytesMut.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
