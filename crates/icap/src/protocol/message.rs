use bytes::{Buf, Bytes};

/// Represents an outgoing ICAP message part: either the request head or a piece of the
/// encapsulated body.
///
/// The generic parameter `T` is the head type, while `Data` is the type of the payload
/// data (defaults to `Bytes`).
pub enum Message<T, Data: Buf = Bytes> {
    /// Contains the request head of type `T`
    Header(T),
    /// Contains a chunk of payload data or one of the chunk terminators
    Payload(PayloadItem<Data>),
}

/// Represents an item of the chunked encapsulated body.
///
/// A RESPMOD body is sent in two phases. The preview phase ends with either
/// [`PayloadItem::Ieof`] (the preview already carried the whole body) or
/// [`PayloadItem::PreviewEnd`] (more data follows if the server asks for it).
/// The remainder phase ends with [`PayloadItem::Eof`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// A chunk of payload data
    Chunk(Data),
    /// Zero-size chunk closing the preview, the body is not finished yet
    PreviewEnd,
    /// Zero-size chunk with the `ieof` extension, the preview was the whole body
    Ieof,
    /// Zero-size chunk closing the body
    Eof,
}

impl<D: Buf> PayloadItem<D> {
    /// Returns true if no more chunks may follow this item
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof | PayloadItem::Ieof)
    }
}
