use std::path::Path;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, error, info, trace, warn};

use crate::client::ClientConfig;
use crate::codec::{parse_head, HTTP_BODY_TERMINATOR, ICAP_TERMINATOR};
use crate::connection::IcapConnection;
use crate::ensure;
use crate::protocol::decision::{embedded_title, final_decision, inspect_embedded, preview_decision};
use crate::protocol::{Decision, IcapError, Message, PayloadItem, RequestHead, ResponseHead};

/// An ICAP client bound to one server connection.
///
/// Construction connects and performs the `OPTIONS` handshake, which fixes the preview
/// size for the lifetime of the client. Each [`scan`](IcapClient::scan) then runs one
/// `RESPMOD` exchange:
///
/// 1. send the head, the encapsulated HTTP header and the preview chunk
/// 2. if the payload did not fit into the preview, read the server's answer and, on
///    `100 Continue`, send the remainder
/// 3. read the final answer and turn it into a verdict
///
/// `scan` borrows the client mutably, so exchanges on one connection never interleave.
/// An exchange that fails after its request went out but before the server's response
/// was complete leaves the connection unusable, and later scans fail with
/// [`IcapError::Interrupted`]. The connection is released when the client is dropped or
/// [`shutdown`](IcapClient::shutdown).
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
#[derive(Debug)]
pub struct IcapClient<R, W> {
    connection: IcapConnection<R, W>,
    config: ClientConfig,
    preview_size: usize,
    /// An exchange stopped mid-way, the connection can't carry another one
    interrupted: bool,
}

impl IcapClient<OwnedReadHalf, OwnedWriteHalf> {
    /// Connects to `<host>:<port>` over TCP and performs the handshake.
    pub async fn connect(config: ClientConfig) -> Result<Self, IcapError> {
        let address = (config.host(), config.port());
        let stream = match config.timeout() {
            Some(duration) => tokio::time::timeout(duration, TcpStream::connect(address)).await.map_err(IcapError::connect)?,
            None => TcpStream::connect(address).await,
        }
        .map_err(IcapError::connect)?;

        info!(host = config.host(), port = config.port(), "connected to icap server");
        let (reader, writer) = stream.into_split();
        Self::handshake(reader, writer, config).await
    }
}

impl<R, W> IcapClient<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Performs the `OPTIONS` handshake over an already connected transport.
    ///
    /// # Errors
    ///
    /// - transport and head parse errors of the exchange
    /// - [`IcapError::Initialization`] if the response has no usable `Preview` header
    ///
    /// On error the transport is dropped.
    pub async fn handshake(reader: R, writer: W, config: ClientConfig) -> Result<Self, IcapError> {
        let mut connection = IcapConnection::new(reader, writer, config.max_header_bytes(), config.timeout());

        connection.write(Message::<_, Bytes>::Header(RequestHead::options(config.uri().clone(), config.user_agent())))?;
        connection.flush().await?;

        let text = connection.read_head(ICAP_TERMINATOR).await?;
        let head = parse_head(&text)?;
        let preview_size = negotiated_preview(&head)?;

        debug!(status = head.status().as_u16(), preview_size, "icap options negotiated");
        Ok(Self { connection, config, preview_size, interrupted: false })
    }

    /// Preview size the server asked for during the handshake.
    pub fn preview_size(&self) -> usize {
        self.preview_size
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Scans an in-memory payload. `true` means the content is allowed.
    pub async fn scan(&mut self, data: &[u8]) -> Result<bool, IcapError> {
        self.scan_reader(data, data.len() as u64).await
    }

    /// Scans a file, streaming it from disk.
    pub async fn scan_file(&mut self, path: impl AsRef<Path>) -> Result<bool, IcapError> {
        let file = File::open(path.as_ref()).await.map_err(IcapError::payload_source)?;
        let len = file.metadata().await.map_err(IcapError::payload_source)?.len();
        debug!(path = %path.as_ref().display(), len, "scanning file");
        self.scan_reader(file, len).await
    }

    /// Scans `len` bytes read from `payload`.
    ///
    /// # Errors
    ///
    /// - [`IcapError::Source`] if `payload` fails or ends before `len` bytes. Failing while
    ///   the preview is read leaves the connection untouched; failing during the remainder
    ///   interrupts the exchange
    /// - [`IcapError::Interrupted`] if an earlier exchange on this connection was interrupted
    /// - [`IcapError::ServiceNotFound`] if the server answers `404`
    /// - [`IcapError::UnrecognizedStatus`] for any status without a policy, including
    ///   a final `200` whose embedded page is not the denial page
    /// - transport and head parse errors
    pub async fn scan_reader<P>(&mut self, mut payload: P, len: u64) -> Result<bool, IcapError>
    where
        P: AsyncRead + Unpin,
    {
        ensure!(!self.interrupted, IcapError::Interrupted);

        let preview = usize::try_from(len).map_or(self.preview_size, |len| len.min(self.preview_size));
        let mut preview_bytes = vec![0; preview];
        payload.read_exact(&mut preview_bytes).await.map_err(IcapError::payload_source)?;

        self.interrupted = true;
        let result = self.exchange(payload, len, preview_bytes).await;
        // a status error comes from a completely read response
        if matches!(result, Ok(_) | Err(IcapError::ServiceNotFound | IcapError::UnrecognizedStatus { .. })) {
            self.interrupted = false;
        } else {
            warn!("icap exchange interrupted, connection is no longer usable");
        }
        result
    }

    async fn exchange<P>(&mut self, payload: P, len: u64, preview_bytes: Vec<u8>) -> Result<bool, IcapError>
    where
        P: AsyncRead + Unpin,
    {
        let preview = preview_bytes.len();
        let fits_preview = len <= preview as u64;

        let head = RequestHead::respmod(self.config.uri().clone(), self.config.user_agent(), preview, len);
        self.connection.write(Message::<_, Bytes>::Header(head))?;
        self.connection.write(Message::<RequestHead, _>::Payload(PayloadItem::Chunk(Bytes::from(preview_bytes))))?;
        let terminator = if fits_preview { PayloadItem::Ieof } else { PayloadItem::PreviewEnd };
        self.connection.write(Message::<RequestHead, Bytes>::Payload(terminator))?;
        self.connection.flush().await?;
        trace!(preview, len, fits_preview, "sent preview");

        if !fits_preview {
            let head = self.read_response().await?;
            let decision = preview_decision(head.status());
            if decision != Decision::Continue {
                // the server answered early, the remainder is never sent
                self.connection.end_body();
            }
            match decision {
                Decision::Continue => self.send_remainder(payload, len - preview as u64).await?,
                Decision::Allowed => return Ok(true),
                Decision::Blocked => return Ok(false),
                Decision::ServiceMissing => return Err(IcapError::ServiceNotFound),
                Decision::Inspect | Decision::Unrecognized => return Err(unrecognized(&head)),
            }
        }

        let head = self.read_response().await?;
        match final_decision(head.status()) {
            Decision::Allowed => Ok(true),
            Decision::Inspect => self.inspect_embedded_response(&head).await,
            Decision::ServiceMissing => Err(IcapError::ServiceNotFound),
            Decision::Continue | Decision::Blocked | Decision::Unrecognized => Err(unrecognized(&head)),
        }
    }

    async fn send_remainder<P>(&mut self, payload: P, remaining: u64) -> Result<(), IcapError>
    where
        P: AsyncRead + Unpin,
    {
        let mut payload = payload.take(remaining);
        let mut buffer = vec![0; self.config.send_chunk_size()];
        let mut sent = 0_u64;

        loop {
            let n = payload.read(&mut buffer).await.map_err(IcapError::payload_source)?;
            if n == 0 {
                break;
            }
            sent += n as u64;
            self.connection.write(Message::<RequestHead, _>::Payload(PayloadItem::Chunk(&buffer[..n])))?;
            self.connection.flush().await?;
        }

        if sent != remaining {
            error!(sent, remaining, "payload ended before its declared length");
            return Err(IcapError::payload_source(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("payload ended after {sent} of {remaining} remaining bytes"),
            )));
        }

        self.connection.write(Message::<RequestHead, Bytes>::Payload(PayloadItem::Eof))?;
        self.connection.flush().await?;
        trace!(sent, "sent remainder");
        Ok(())
    }

    async fn read_response(&mut self) -> Result<ResponseHead, IcapError> {
        let text = self.connection.read_head(ICAP_TERMINATOR).await?;
        let head = parse_head(&text)?;
        debug!(status = head.status().as_u16(), reason = head.reason(), "received icap response");
        Ok(head)
    }

    /// A final `200` carries the server's HTTP response. Only the known denial page
    /// counts as a verdict.
    async fn inspect_embedded_response(&mut self, head: &ResponseHead) -> Result<bool, IcapError> {
        let embedded = self.connection.read_head(HTTP_BODY_TERMINATOR).await?;
        match inspect_embedded(&embedded, self.config.denial_marker()) {
            Decision::Blocked => Ok(false),
            _ => {
                warn!(title = ?embedded_title(&embedded), "embedded response is not the denial page");
                Err(unrecognized(head))
            }
        }
    }

    /// Flushes pending data and shuts down the write side of the connection.
    pub async fn shutdown(mut self) -> Result<(), IcapError> {
        self.connection.shutdown().await?;
        debug!("icap connection shutdown");
        Ok(())
    }

    /// Consumes the client, returning the transport halves.
    pub fn into_parts(self) -> (R, W) {
        self.connection.into_parts()
    }
}

fn negotiated_preview(head: &ResponseHead) -> Result<usize, IcapError> {
    let value = head.header("Preview").ok_or_else(|| IcapError::initialization("no preview size in options response"))?;
    value.trim().parse::<usize>().map_err(|e| IcapError::initialization(format!("invalid preview size {value:?}: {e}")))
}

fn unrecognized(head: &ResponseHead) -> IcapError {
    warn!(status = head.status().as_u16(), reason = head.reason(), "unrecognized icap status");
    IcapError::unrecognized_status(head.status().as_u16())
}
