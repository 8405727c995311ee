//! Terminator based head decoder
//!
//! ICAP responses are read until a known byte sequence shows up at the tail of the
//! received data: the empty line closing an ICAP head, or the zero-size chunk closing
//! the HTTP response a server embeds in a `200`. The connection feeds this decoder one
//! byte at a time so it never reads past the end of the message it waits for.
//!
//! # Limits
//!
//! - The terminator must end within `max_size` bytes, otherwise decoding fails. This
//!   keeps a peer that never terminates its head from growing the buffer without bound.
//! - A match is only accepted once more than `terminator + 13` bytes are buffered,
//!   13 being the length of the shortest status line.

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::ParseError;

/// Terminator of an ICAP head
pub const ICAP_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Terminator of the chunked body of an embedded HTTP response
pub const HTTP_BODY_TERMINATOR: &[u8] = b"0\r\n\r\n";

/// Shortest status line, `ICAP/1.0 xxx\r\n` minus its trailing byte
const MIN_STATUS_LINE: usize = 13;

/// Decoder yielding everything up to and including the terminator as text, one `char`
/// per byte.
#[derive(Debug, Clone)]
pub struct HeadDecoder {
    terminator: &'static [u8],
    max_size: usize,
    /// Offset from which the next terminator search starts
    searched: usize,
}

impl HeadDecoder {
    pub fn new(terminator: &'static [u8], max_size: usize) -> Self {
        Self { terminator, max_size, searched: 0 }
    }

    /// Decoder for an ICAP response head.
    pub fn icap(max_size: usize) -> Self {
        Self::new(ICAP_TERMINATOR, max_size)
    }

    /// Decoder for an embedded HTTP response up to its last chunk.
    pub fn http_body(max_size: usize) -> Self {
        Self::new(HTTP_BODY_TERMINATOR, max_size)
    }

    fn find_end(&mut self, src: &[u8]) -> Option<usize> {
        let len = self.terminator.len();
        let min_end = len + MIN_STATUS_LINE + 1;
        if src.len() < min_end {
            return None;
        }

        let from = self.searched.max(min_end - len);
        let found = src[from..].windows(len).position(|window| window == self.terminator).map(|pos| from + pos + len);
        if found.is_none() {
            self.searched = (src.len() + 1).saturating_sub(len).max(from);
        }
        found
    }
}

impl Decoder for HeadDecoder {
    type Item = String;
    type Error = ParseError;

    /// Attempts to find the terminator in the buffered bytes.
    ///
    /// - `Ok(Some(text))` with the bytes up to and including the terminator, which are
    ///   split off `src`
    /// - `Ok(None)` if more data is needed
    /// - `Err(ParseError::TooLargeHeader)` if the bound is reached without a terminator
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(end) = self.find_end(src) {
            ensure!(end <= self.max_size, ParseError::too_large_header(end, self.max_size));

            self.searched = 0;
            let head = src.split_to(end);
            trace!(head_size = end, "found head terminator");
            return Ok(Some(head.iter().copied().map(char::from).collect()));
        }

        ensure!(src.len() < self.max_size, ParseError::too_large_header(src.len(), self.max_size));
        Ok(None)
    }
}
