use std::time::Duration;

use bytes::{Buf, BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::HeadDecoder;
use crate::connection::message_writer::MessageWriter;
use crate::protocol::{Message, ParseError, RequestHead, SendError};

/// Initial capacity of the write buffer
const WRITE_BUFFER_SIZE: usize = 8 * 1024;

/// The transport of one ICAP client: a reader for response heads and a buffered
/// writer for requests.
///
/// Reads go one byte at a time, so a head read never consumes bytes belonging to the
/// message after it, and each read owns its own bounded buffer.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
#[derive(Debug)]
pub struct IcapConnection<R, W> {
    reader: R,
    writer: MessageWriter<W>,
    max_header_bytes: usize,
    timeout: Option<Duration>,
}

impl<R, W> IcapConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, max_header_bytes: usize, timeout: Option<Duration>) -> Self {
        Self { reader, writer: MessageWriter::with_capacity(writer, WRITE_BUFFER_SIZE), max_header_bytes, timeout }
    }

    /// Encodes a request part into the write buffer.
    pub fn write<D: Buf>(&mut self, item: Message<RequestHead, D>) -> Result<(), SendError> {
        self.writer.write(item)
    }

    /// Forgets a request body the server no longer wants.
    pub fn end_body(&mut self) {
        self.writer.end_body();
    }

    /// Writes everything buffered to the transport.
    pub async fn flush(&mut self) -> Result<(), SendError> {
        self.writer.flush().await
    }

    /// Reads until `terminator` ends the received bytes, within the head size bound
    /// and the configured timeout.
    pub async fn read_head(&mut self, terminator: &'static [u8]) -> Result<String, ParseError> {
        match self.timeout {
            Some(duration) => tokio::time::timeout(duration, self.do_read_head(terminator)).await.map_err(ParseError::io)?,
            None => self.do_read_head(terminator).await,
        }
    }

    async fn do_read_head(&mut self, terminator: &'static [u8]) -> Result<String, ParseError> {
        let mut decoder = HeadDecoder::new(terminator, self.max_header_bytes);
        let mut buffer = BytesMut::with_capacity(self.max_header_bytes);

        loop {
            let byte = self.reader.read_u8().await?;
            buffer.put_u8(byte);

            if let Some(head) = decoder.decode(&mut buffer)? {
                trace!(head_size = head.len(), "read response head");
                return Ok(head);
            }
        }
    }

    /// Shuts down the write side of the transport.
    pub async fn shutdown(&mut self) -> Result<(), SendError> {
        self.writer.flush().await?;
        Ok(self.writer.get_mut().shutdown().await?)
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer.into_inner())
    }
}
