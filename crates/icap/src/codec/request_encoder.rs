//! ICAP request encoder
//!
//! Combines the [`HeaderEncoder`] and the [`ChunkedEncoder`]: a request head opens a
//! chunked body when it carries one, body items are accepted until the body is
//! finished, then the next head may follow.

use crate::codec::body::ChunkedEncoder;
use crate::codec::header::HeaderEncoder;
use crate::protocol::{Message, RequestHead, SendError};
use bytes::{Buf, BytesMut};
use std::io;
use std::io::ErrorKind;
use tokio_util::codec::Encoder;
use tracing::{error, trace};

#[derive(Debug)]
pub struct RequestEncoder {
    header_encoder: HeaderEncoder,
    payload_encoder: Option<ChunkedEncoder>,
}

impl RequestEncoder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Closes a body the server answered before it was finished, so the next head is
    /// accepted. Needed when a verdict arrives right after the preview.
    pub fn end_body(&mut self) {
        if let Some(payload_encoder) = self.payload_encoder.take() {
            trace!(send_size = payload_encoder.send_size(), "body ended by server response");
        }
    }
}

impl Default for RequestEncoder {
    fn default() -> Self {
        Self { header_encoder: HeaderEncoder, payload_encoder: None }
    }
}

impl<D: Buf> Encoder<Message<RequestHead, D>> for RequestEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Message<RequestHead, D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header(head) => {
                if self.payload_encoder.is_some() {
                    error!("expect payload item but receive request head");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                }

                if head.has_body() {
                    self.payload_encoder = Some(ChunkedEncoder::new());
                }
                self.header_encoder.encode(head, dst)
            }

            Message::Payload(payload_item) => {
                let Some(payload_encoder) = &mut self.payload_encoder else {
                    error!("expect request head but receive payload item");
                    return Err(SendError::invalid_body("payload item without a request head carrying a body"));
                };

                let result = payload_encoder.encode(payload_item, dst);

                if payload_encoder.is_finish() {
                    trace!(send_size = payload_encoder.send_size(), "finished encoding body");
                    self.payload_encoder.take();
                }

                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PayloadItem;
    use bytes::Bytes;
    use http::Uri;

    fn uri() -> Uri {
        Uri::from_static("icap://127.0.0.1/avscan")
    }

    #[test]
    fn body_items_follow_a_respmod_head() {
        let mut encoder = RequestEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(Message::<_, Bytes>::Header(RequestHead::respmod(uri(), "t", 3, 3)), &mut dst).unwrap();
        let head_len = dst.len();
        encoder.encode(Message::<RequestHead, _>::Payload(PayloadItem::Chunk(Bytes::from_static(b"abc"))), &mut dst).unwrap();
        encoder.encode(Message::<RequestHead, Bytes>::Payload(PayloadItem::Ieof), &mut dst).unwrap();

        assert_eq!(&dst[head_len..], b"3\r\nabc\r\n0; ieof\r\n\r\n");

        // the body is finished, a new head is accepted
        encoder.encode(Message::<_, Bytes>::Header(RequestHead::options(uri(), "t")), &mut dst).unwrap();
    }

    #[test]
    fn head_while_body_is_open_is_rejected() {
        let mut encoder = RequestEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(Message::<_, Bytes>::Header(RequestHead::respmod(uri(), "t", 0, 10)), &mut dst).unwrap();
        encoder.encode(Message::<RequestHead, Bytes>::Payload(PayloadItem::PreviewEnd), &mut dst).unwrap();

        let result = encoder.encode(Message::<_, Bytes>::Header(RequestHead::options(uri(), "t")), &mut dst);
        assert!(matches!(result, Err(SendError::Io { .. })));
    }

    #[test]
    fn ended_body_accepts_next_head() {
        let mut encoder = RequestEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(Message::<_, Bytes>::Header(RequestHead::respmod(uri(), "t", 3, 10)), &mut dst).unwrap();
        encoder.encode(Message::<RequestHead, _>::Payload(PayloadItem::Chunk(Bytes::from_static(b"abc"))), &mut dst).unwrap();
        encoder.encode(Message::<RequestHead, Bytes>::Payload(PayloadItem::PreviewEnd), &mut dst).unwrap();
        encoder.end_body();
        dst.clear();

        encoder.encode(Message::<_, Bytes>::Header(RequestHead::respmod(uri(), "t", 1, 1)), &mut dst).unwrap();
        encoder.encode(Message::<RequestHead, _>::Payload(PayloadItem::Chunk(Bytes::from_static(b"z"))), &mut dst).unwrap();
        encoder.encode(Message::<RequestHead, Bytes>::Payload(PayloadItem::Ieof), &mut dst).unwrap();

        assert!(dst.starts_with(b"RESPMOD "));
        assert!(dst.ends_with(b"1\r\nz\r\n0; ieof\r\n\r\n"));
    }

    #[test]
    fn payload_without_body_head_is_rejected() {
        let mut encoder = RequestEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(Message::<_, Bytes>::Header(RequestHead::options(uri(), "t")), &mut dst).unwrap();

        let result = encoder.encode(Message::<RequestHead, Bytes>::Payload(PayloadItem::Eof), &mut dst);
        assert!(matches!(result, Err(SendError::InvalidBody { .. })));
    }
}
