use std::time::Duration;

use indoc::{formatdoc, indoc};
use micro_icap::client::{ClientConfig, IcapClient};
use micro_icap::protocol::{ErrorKind, IcapError, ParseError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const HOST: &str = "127.0.0.1";

const CONTINUE: &str = "ICAP/1.0 100 Continue\r\n\r\n";

const NO_CONTENT: &str = "ICAP/1.0 204 No Content\r\nISTag: \"test-1\"\r\nEncapsulated: null-body=0\r\n\r\n";

const NOT_FOUND: &str = "ICAP/1.0 404 ICAP Service Not Found\r\nISTag: \"test-1\"\r\nEncapsulated: null-body=0\r\n\r\n";

const SERVER_ERROR: &str = "ICAP/1.0 500 Server Error\r\nISTag: \"test-1\"\r\nEncapsulated: null-body=0\r\n\r\n";

const OK_HEAD: &str = "ICAP/1.0 200 OK\r\nISTag: \"test-1\"\r\nEncapsulated: res-hdr=0, res-body=76\r\n\r\n";

fn crlf(text: &str) -> String {
    text.replace('\n', "\r\n")
}

fn options_response(preview: usize) -> String {
    crlf(&formatdoc! {r#"
    ICAP/1.0 200 OK
    Methods: RESPMOD
    Service: Test AV 1.0
    ISTag: "test-1"
    Max-Connections: 100
    Options-TTL: 3600
    Allow: 204
    Preview: {preview}
    Transfer-Preview: *
    Encapsulated: null-body=0

    "#})
}

fn embedded_page(title: &str) -> String {
    crlf(&formatdoc! {"
    HTTP/1.1 403 Forbidden
    Content-Type: text/html
    Cache-Control: no-cache

    5F
    <html><head><title>{title}</title></head><body>Virus found</body></html>
    0

    "})
}

fn config() -> ClientConfig {
    ClientConfig::builder(HOST).user_agent("scan-test").build().unwrap()
}

fn options_request() -> Vec<u8> {
    crlf(indoc! {"
    OPTIONS icap://127.0.0.1/avscan ICAP/1.0
    Host: 127.0.0.1
    User-Agent: scan-test
    Encapsulated: null-body=0

    "})
    .into_bytes()
}

fn respmod_head(preview: usize, len: usize) -> Vec<u8> {
    let http_header = format!("Content-Length: {len}\r\n\r\n");
    let head = crlf(&formatdoc! {"
    RESPMOD icap://127.0.0.1/avscan ICAP/1.0
    Host: 127.0.0.1
    User-Agent: scan-test
    Allow: 204
    Preview: {preview}
    Encapsulated: res-hdr=0, res-body={}

    ", http_header.len()});
    [head.into_bytes(), http_header.into_bytes()].concat()
}

fn chunk(bytes: &[u8]) -> Vec<u8> {
    [format!("{:X}\r\n", bytes.len()).into_bytes(), bytes.to_vec(), b"\r\n".to_vec()].concat()
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Runs one scan against canned server responses, returning the verdict and the bytes
/// sent after the OPTIONS request.
async fn scan_with(config: ClientConfig, responses: &str, data: &[u8]) -> (Result<bool, IcapError>, Vec<u8>) {
    let mut client = IcapClient::handshake(responses.as_bytes(), Vec::new(), config).await.unwrap();
    let result = client.scan(data).await;

    let (_, written) = client.into_parts();
    let options_request = options_request();
    assert_eq!(&written[..options_request.len()], &options_request[..]);
    (result, written[options_request.len()..].to_vec())
}

#[tokio::test]
async fn small_payload_fits_preview() {
    let data = payload(500);
    let responses = options_response(1024) + NO_CONTENT;

    let (result, sent) = scan_with(config(), &responses, &data).await;

    assert!(result.unwrap());
    let expected = [respmod_head(500, 500), chunk(&data), b"0; ieof\r\n\r\n".to_vec()].concat();
    assert_eq!(sent, expected);
}

#[tokio::test]
async fn large_payload_continues_after_preview() {
    let data = payload(4096);
    let responses = options_response(1024) + CONTINUE + NO_CONTENT;

    let (result, sent) = scan_with(config(), &responses, &data).await;

    assert!(result.unwrap());
    let expected = [
        respmod_head(1024, 4096),
        chunk(&data[..1024]),
        b"0\r\n\r\n".to_vec(),
        chunk(&data[1024..]),
        b"0\r\n\r\n".to_vec(),
    ]
    .concat();
    assert_eq!(sent, expected);
}

#[tokio::test]
async fn remainder_is_split_into_send_sized_chunks() {
    let data = payload(4096);
    let responses = options_response(1024) + CONTINUE + NO_CONTENT;
    let config = ClientConfig::builder(HOST).user_agent("scan-test").send_chunk_size(1000).build().unwrap();

    let (result, sent) = scan_with(config, &responses, &data).await;

    assert!(result.unwrap());
    let expected = [
        respmod_head(1024, 4096),
        chunk(&data[..1024]),
        b"0\r\n\r\n".to_vec(),
        chunk(&data[1024..2024]),
        chunk(&data[2024..3024]),
        chunk(&data[3024..4024]),
        chunk(&data[4024..]),
        b"0\r\n\r\n".to_vec(),
    ]
    .concat();
    assert_eq!(sent, expected);
}

#[tokio::test]
async fn denial_page_blocks_after_remainder() {
    let data = payload(4096);
    let responses = options_response(1024) + CONTINUE + OK_HEAD + &embedded_page("ProxyAV: Access Denied");

    let (result, _) = scan_with(config(), &responses, &data).await;

    assert!(!result.unwrap());
}

#[tokio::test]
async fn denial_page_blocks_small_payload() {
    let data = payload(10);
    let responses = options_response(1024) + OK_HEAD + &embedded_page("ProxyAV: Access Denied");

    let (result, _) = scan_with(config(), &responses, &data).await;

    assert!(!result.unwrap());
}

#[tokio::test]
async fn custom_denial_marker() {
    let data = payload(10);
    let responses = options_response(1024) + OK_HEAD + &embedded_page("Blocked by policy");
    let config = ClientConfig::builder(HOST).user_agent("scan-test").denial_marker("Blocked by policy").build().unwrap();

    let (result, _) = scan_with(config, &responses, &data).await;

    assert!(!result.unwrap());
}

#[tokio::test]
async fn preview_ok_blocks_without_sending_remainder() {
    let data = payload(2000);
    let responses = options_response(1024) + OK_HEAD;

    let (result, sent) = scan_with(config(), &responses, &data).await;

    assert!(!result.unwrap());
    let expected = [respmod_head(1024, 2000), chunk(&data[..1024]), b"0\r\n\r\n".to_vec()].concat();
    assert_eq!(sent, expected);
}

#[tokio::test]
async fn preview_no_content_allows_without_sending_remainder() {
    let data = payload(2000);
    let responses = options_response(1024) + NO_CONTENT;

    let (result, sent) = scan_with(config(), &responses, &data).await;

    assert!(result.unwrap());
    let expected = [respmod_head(1024, 2000), chunk(&data[..1024]), b"0\r\n\r\n".to_vec()].concat();
    assert_eq!(sent, expected);
}

#[tokio::test]
async fn payload_of_exactly_preview_size_needs_no_interim_answer() {
    let data = payload(1024);
    let responses = options_response(1024) + NO_CONTENT;

    let (result, sent) = scan_with(config(), &responses, &data).await;

    assert!(result.unwrap());
    assert!(sent.ends_with(b"\r\n0; ieof\r\n\r\n"));
}

#[tokio::test]
async fn one_byte_over_preview_waits_for_interim_answer() {
    let data = payload(1025);
    let responses = options_response(1024) + CONTINUE + NO_CONTENT;

    let (result, sent) = scan_with(config(), &responses, &data).await;

    assert!(result.unwrap());
    let expected =
        [respmod_head(1024, 1025), chunk(&data[..1024]), b"0\r\n\r\n".to_vec(), chunk(&data[1024..]), b"0\r\n\r\n".to_vec()]
            .concat();
    assert_eq!(sent, expected);
}

#[tokio::test]
async fn zero_preview_sends_everything_after_continue() {
    let data = payload(10);
    let responses = options_response(0) + CONTINUE + NO_CONTENT;

    let (result, sent) = scan_with(config(), &responses, &data).await;

    assert!(result.unwrap());
    let expected = [respmod_head(0, 10), b"0\r\n\r\n".to_vec(), chunk(&data), b"0\r\n\r\n".to_vec()].concat();
    assert_eq!(sent, expected);
}

#[tokio::test]
async fn empty_payload() {
    let responses = options_response(1024) + NO_CONTENT;

    let (result, sent) = scan_with(config(), &responses, &[]).await;

    assert!(result.unwrap());
    assert_eq!(sent, [respmod_head(0, 0), b"0; ieof\r\n\r\n".to_vec()].concat());
}

#[tokio::test]
async fn service_not_found_after_preview() {
    let responses = options_response(1024) + NOT_FOUND;

    let (result, _) = scan_with(config(), &responses, &payload(2000)).await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::ServiceNotFound);
}

#[tokio::test]
async fn service_not_found_at_the_end() {
    let responses = options_response(1024) + NOT_FOUND;

    let (result, _) = scan_with(config(), &responses, &payload(10)).await;

    assert!(matches!(result, Err(IcapError::ServiceNotFound)));
}

#[tokio::test]
async fn unknown_status_after_preview() {
    let responses = options_response(1024) + SERVER_ERROR;

    let (result, _) = scan_with(config(), &responses, &payload(2000)).await;

    assert!(matches!(result, Err(IcapError::UnrecognizedStatus { status: 500 })));
}

#[tokio::test]
async fn continue_as_final_answer_is_unrecognized() {
    let responses = options_response(1024) + CONTINUE;

    let (result, _) = scan_with(config(), &responses, &payload(10)).await;

    assert!(matches!(result, Err(IcapError::UnrecognizedStatus { status: 100 })));
}

#[tokio::test]
async fn other_embedded_title_is_not_a_verdict() {
    let responses = options_response(1024) + OK_HEAD + &embedded_page("Access Denied");

    let (result, _) = scan_with(config(), &responses, &payload(10)).await;

    let error = result.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnrecognizedStatus);
    assert!(matches!(error, IcapError::UnrecognizedStatus { status: 200 }));
}

#[tokio::test]
async fn embedded_response_without_title_is_not_a_verdict() {
    let responses = options_response(1024) + OK_HEAD + "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\n2\r\nok\r\n0\r\n\r\n";

    let (result, _) = scan_with(config(), &responses, &payload(10)).await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::UnrecognizedStatus);
}

#[tokio::test]
async fn unterminated_response_hits_the_bound() {
    let responses = options_response(1024) + "ICAP/1.0 204 No Content\r\nX-Filler: " + &"z".repeat(1024);
    let config = ClientConfig::builder(HOST).user_agent("scan-test").max_header_bytes(512).build().unwrap();

    let (result, _) = scan_with(config, &responses, &payload(10)).await;

    let error = result.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ProtocolParse);
    assert!(matches!(error, IcapError::Response { source: ParseError::TooLargeHeader { max_size: 512, .. } }));
}

#[tokio::test]
async fn server_closing_mid_response_is_a_transport_error() {
    let responses = options_response(1024) + "ICAP/1.0 204 No Con";

    let (result, _) = scan_with(config(), &responses, &payload(10)).await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn short_payload_source_is_a_source_error() {
    let responses = options_response(1024) + CONTINUE + NO_CONTENT;
    let mut client = IcapClient::handshake(responses.as_bytes(), Vec::new(), config()).await.unwrap();
    let data = payload(3000);

    let result = client.scan_reader(&data[..], 4096).await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::Source);
}

#[tokio::test]
async fn short_preview_source_is_a_source_error() {
    let responses = options_response(1024);
    let mut client = IcapClient::handshake(responses.as_bytes(), Vec::new(), config()).await.unwrap();
    let data = payload(100);

    let result = client.scan_reader(&data[..], 500).await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::Source);
}

#[tokio::test]
async fn handshake_without_preview_fails_initialization() {
    let responses = crlf(indoc! {r#"
    ICAP/1.0 200 OK
    Methods: RESPMOD
    ISTag: "test-1"
    Encapsulated: null-body=0

    "#});

    let result = IcapClient::handshake(responses.as_bytes(), Vec::new(), config()).await;

    let error = result.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Initialization);
    assert!(matches!(error, IcapError::Initialization { .. }));
}

#[tokio::test]
async fn handshake_with_invalid_preview_fails_initialization() {
    let responses = options_response(1024).replace("Preview: 1024", "Preview: many");

    let result = IcapClient::handshake(responses.as_bytes(), Vec::new(), config()).await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::Initialization);
}

#[tokio::test]
async fn handshake_with_malformed_status_line_fails_parsing() {
    let responses = "HTTP/1.1 200 OK\r\nPreview: 1024\r\n\r\n";

    let result = IcapClient::handshake(responses.as_bytes(), Vec::new(), config()).await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::ProtocolParse);
}

#[tokio::test]
async fn handshake_on_closed_connection_fails_transport() {
    let result = IcapClient::handshake(&b""[..], Vec::new(), config()).await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn sequential_scans_share_the_connection() {
    let responses = options_response(1024) + NO_CONTENT + CONTINUE + OK_HEAD + &embedded_page("ProxyAV: Access Denied");
    let mut client = IcapClient::handshake(responses.as_bytes(), Vec::new(), config()).await.unwrap();

    assert!(client.scan(&payload(10)).await.unwrap());
    assert!(!client.scan(&payload(5000)).await.unwrap());

    let (rest, _) = client.into_parts();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn early_verdict_after_preview_leaves_connection_reusable() {
    let first = [7_u8; 100];
    let second = [7_u8; 4];
    let responses = options_response(16) + NO_CONTENT + OK_HEAD + NOT_FOUND + NO_CONTENT;
    let mut client = IcapClient::handshake(responses.as_bytes(), Vec::new(), config()).await.unwrap();

    assert!(client.scan(&first).await.unwrap());
    assert!(!client.scan(&first).await.unwrap());
    assert_eq!(client.scan(&first).await.unwrap_err().kind(), ErrorKind::ServiceNotFound);
    assert!(client.scan(&second).await.unwrap());

    let (_, written) = client.into_parts();
    let early = [respmod_head(16, 100), chunk(&first[..16]), b"0\r\n\r\n".to_vec()].concat();
    let expected =
        [options_request(), early.clone(), early.clone(), early, respmod_head(4, 4), chunk(&second), b"0; ieof\r\n\r\n".to_vec()]
            .concat();
    assert_eq!(written, expected);
}

#[tokio::test]
async fn source_failure_during_remainder_interrupts_the_connection() {
    let responses = options_response(1024) + CONTINUE + NO_CONTENT;
    let mut client = IcapClient::handshake(responses.as_bytes(), Vec::new(), config()).await.unwrap();
    let data = payload(3000);

    let first = client.scan_reader(&data[..], 4096).await;
    let second = client.scan(&payload(10)).await;

    assert_eq!(first.unwrap_err().kind(), ErrorKind::Source);
    let error = second.unwrap_err();
    assert!(matches!(error, IcapError::Interrupted));
    assert_eq!(error.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn source_failure_during_preview_keeps_the_connection() {
    let responses = options_response(1024) + NO_CONTENT;
    let mut client = IcapClient::handshake(responses.as_bytes(), Vec::new(), config()).await.unwrap();
    let data = payload(100);

    assert_eq!(client.scan_reader(&data[..], 500).await.unwrap_err().kind(), ErrorKind::Source);
    assert!(client.scan(&payload(10)).await.unwrap());
}

#[tokio::test]
async fn scan_file_streams_from_disk() {
    let data = payload(3000);
    let path = std::env::temp_dir().join(format!("micro-icap-scan-{}.bin", std::process::id()));
    tokio::fs::write(&path, &data).await.unwrap();

    let responses = options_response(1024) + CONTINUE + NO_CONTENT;
    let mut client = IcapClient::handshake(responses.as_bytes(), Vec::new(), config()).await.unwrap();
    let result = client.scan_file(&path).await;
    tokio::fs::remove_file(&path).await.unwrap();

    assert!(result.unwrap());
    let (_, written) = client.into_parts();
    let expected = [
        options_request(),
        respmod_head(1024, 3000),
        chunk(&data[..1024]),
        b"0\r\n\r\n".to_vec(),
        chunk(&data[1024..]),
        b"0\r\n\r\n".to_vec(),
    ]
    .concat();
    assert_eq!(written, expected);
}

#[tokio::test]
async fn scan_missing_file_is_a_source_error() {
    let responses = options_response(1024);
    let mut client = IcapClient::handshake(responses.as_bytes(), Vec::new(), config()).await.unwrap();

    let result = client.scan_file("/nonexistent/micro-icap/file.bin").await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::Source);
}

#[tokio::test]
async fn shutdown_closes_the_write_side() {
    let (client_io, mut server_io) = tokio::io::duplex(4096);
    let (reader, writer) = tokio::io::split(client_io);

    let server = tokio::spawn(async move {
        let mut request = Vec::new();
        let mut byte = [0_u8; 1];
        while !request.ends_with(b"\r\n\r\n") {
            server_io.read_exact(&mut byte).await.unwrap();
            request.push(byte[0]);
        }
        server_io.write_all(options_response(512).as_bytes()).await.unwrap();

        // the client shutting down ends the stream
        let mut rest = Vec::new();
        server_io.read_to_end(&mut rest).await.unwrap();
        (request, rest)
    });

    let client = IcapClient::handshake(reader, writer, config()).await.unwrap();
    assert_eq!(client.preview_size(), 512);
    client.shutdown().await.unwrap();

    let (request, rest) = server.await.unwrap();
    assert_eq!(request, options_request());
    assert!(rest.is_empty());
}

#[tokio::test]
async fn scan_over_tcp() {
    let listener = TcpListener::bind((HOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let mut byte = [0_u8; 1];

        while !received.ends_with(b"\r\n\r\n") {
            stream.read_exact(&mut byte).await.unwrap();
            received.push(byte[0]);
        }
        stream.write_all(options_response(1024).as_bytes()).await.unwrap();

        while !received.ends_with(b"0; ieof\r\n\r\n") {
            stream.read_exact(&mut byte).await.unwrap();
            received.push(byte[0]);
        }
        stream.write_all(NO_CONTENT.as_bytes()).await.unwrap();
        received
    });

    let config = ClientConfig::builder(HOST).port(port).timeout(Duration::from_secs(5)).build().unwrap();
    let mut client = IcapClient::connect(config).await.unwrap();
    assert_eq!(client.preview_size(), 1024);
    assert!(client.scan(b"X5O!P%@AP[4\\PZX54(P^)7CC)7}$EICAR").await.unwrap());
    client.shutdown().await.unwrap();

    let received = String::from_utf8(server.await.unwrap()).unwrap();
    assert!(received.starts_with(&format!("OPTIONS icap://127.0.0.1:{port}/avscan ICAP/1.0\r\n")));
    assert!(received.contains(&format!("RESPMOD icap://127.0.0.1:{port}/avscan ICAP/1.0\r\nHost: 127.0.0.1:{port}\r\n")));
    assert!(received.contains("Preview: 33\r\n"));
    assert!(received.ends_with("21\r\nX5O!P%@AP[4\\PZX54(P^)7CC)7}$EICAR\r\n0; ieof\r\n\r\n"));
}

#[tokio::test]
async fn connect_to_closed_port_fails_transport() {
    let listener = TcpListener::bind((HOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = ClientConfig::builder(HOST).port(port).build().unwrap();
    let result = IcapClient::connect(config).await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::Transport);
}
