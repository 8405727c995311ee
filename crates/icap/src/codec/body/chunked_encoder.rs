use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BufMut, BytesMut};
use std::io::Write;

use tokio_util::codec::Encoder;
use tracing::warn;

/// Zero-size chunk closing a preview or a body
const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

/// Zero-size chunk telling the server the preview held the whole body
const LAST_CHUNK_IEOF: &[u8] = b"0; ieof\r\n\r\n";

/// Encodes body items as `<HEX-SIZE>\r\n<bytes>\r\n` chunks.
///
/// Empty chunks are dropped, a zero-size chunk is only ever written as a terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedEncoder {
    eof: bool,
    send_size: u64,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self { eof: false, send_size: 0 }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }

    /// Payload bytes encoded so far, framing excluded.
    pub fn send_size(&self) -> u64 {
        self.send_size
    }
}

impl Default for ChunkedEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for ChunkedEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.eof {
            warn!("encode payload_item but the body is already finished");
            return Ok(());
        }

        self.eof = item.is_eof();
        match item {
            PayloadItem::Chunk(bytes) => {
                let size = bytes.remaining();
                if size == 0 {
                    return Ok(());
                }
                write!(helper::Writer(dst), "{size:X}\r\n")?;
                dst.reserve(size + 2);
                dst.put(bytes);
                dst.extend_from_slice(b"\r\n");
                self.send_size += size as u64;
                Ok(())
            }
            PayloadItem::PreviewEnd => {
                dst.extend_from_slice(LAST_CHUNK);
                Ok(())
            }
            PayloadItem::Ieof => {
                dst.extend_from_slice(LAST_CHUNK_IEOF);
                Ok(())
            }
            PayloadItem::Eof => {
                dst.extend_from_slice(LAST_CHUNK);
                Ok(())
            }
        }
    }
}

mod helper {
    use bytes::{BufMut, BytesMut};
    use std::io;

    pub struct Writer<'a>(pub &'a mut BytesMut);

    impl io::Write for Writer<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.put_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
