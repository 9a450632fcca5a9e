//! Integration tests for the HTTP transport.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
    mpsc,
};
use std::thread;
use std::time::Duration;

use native_tls::TlsAcceptor;
use rstest::{fixture, rstest};

use crate::encoder::{FORM_CONTENT_TYPE, JSON_CONTENT_TYPE, PayloadFormat};
use crate::endpoint::Endpoint;
use crate::error::DeliveryError;
use crate::handler::{DeliveryOutcome, Transport};
use crate::level::LogLevel;
use crate::log_record::LogRecord;
use crate::test_utils::{collecting::CollectingReporter, tls::TestCert};
use crate::tls::TlsOptions;

use super::{HTTPHandler, HTTPHandlerConfig, HTTPMethod, HTTPTransport};

fn status_text(code: u16) -> &'static str {
    match code {
        200 => "OK",
        302 => "Found",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

#[derive(Debug)]
struct CapturedRequest {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl CapturedRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Parses a single header line into a key-value pair.
fn parse_header_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    line.split_once(':')
        .map(|(key, value)| (key.trim().to_lowercase(), value.trim().to_string()))
}

fn read_http_request<S: Read>(stream: &mut S) -> CapturedRequest {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader
        .read_line(&mut request_line)
        .expect("read request line");
    let parts: Vec<&str> = request_line.trim().split(' ').collect();
    let method = parts.first().copied().unwrap_or_default().to_string();
    let path = parts.get(1).copied().unwrap_or_default().to_string();

    let mut headers = Vec::new();
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).expect("read header");
        if line.trim().is_empty() {
            break;
        }
        let Some((key, value)) = parse_header_line(&line) else {
            continue;
        };
        if key == "content-length" {
            content_length = value.parse().unwrap_or(0);
        }
        headers.push((key, value));
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).expect("read body");

    CapturedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    }
}

fn respond<S: Write>(stream: &mut S, status: u16) {
    respond_with(stream, status, "close");
}

fn respond_with<S: Write>(stream: &mut S, status: u16, connection: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: 2\r\nConnection: {}\r\n\r\nok",
        status,
        status_text(status),
        connection
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

/// Spawn a mock HTTP server that captures the first request.
fn spawn_mock_server(
    listener: TcpListener,
    response_status: u16,
) -> (SocketAddr, mpsc::Receiver<CapturedRequest>) {
    let addr = listener.local_addr().expect("listener has address");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
        let captured = read_http_request(&mut stream);
        respond(&mut stream, response_status);
        let _ = tx.send(captured);
    });
    (addr, rx)
}

/// Spawn a server that offers keep-alive and serves every request on each
/// connection until the client closes it.
fn spawn_keep_alive_server(
    listener: TcpListener,
) -> (SocketAddr, Arc<AtomicUsize>, mpsc::Receiver<CapturedRequest>) {
    let addr = listener.local_addr().expect("listener has address");
    let accepted = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel();
    let counter = Arc::clone(&accepted);
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let tx = tx.clone();
            thread::spawn(move || {
                let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
                loop {
                    let captured = read_http_request(&mut stream);
                    if captured.method.is_empty() {
                        return;
                    }
                    respond_with(&mut stream, 200, "keep-alive");
                    if tx.send(captured).is_err() {
                        return;
                    }
                }
            });
        }
    });
    (addr, accepted, rx)
}

/// Spawn a TLS server that captures the first request, if the handshake
/// succeeds.
fn spawn_tls_server(
    listener: TcpListener,
    cert: &TestCert,
) -> (SocketAddr, mpsc::Receiver<CapturedRequest>) {
    let identity =
        native_tls::Identity::from_pkcs8(cert.cert_pem.as_bytes(), cert.key_pem.as_bytes())
            .expect("identity");
    let acceptor = TlsAcceptor::new(identity).expect("acceptor");
    let addr = listener.local_addr().expect("listener has address");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let Ok((stream, _)) = listener.accept() else {
            return;
        };
        let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
        let Ok(mut tls) = acceptor.accept(stream) else {
            return;
        };
        let captured = read_http_request(&mut tls);
        respond(&mut tls, 200);
        let _ = tls.shutdown();
        let _ = tx.send(captured);
    });
    (addr, rx)
}

#[fixture]
fn tcp_listener() -> TcpListener {
    TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener")
}

fn plain_config(addr: SocketAddr, url: &str) -> HTTPHandlerConfig {
    HTTPHandlerConfig {
        endpoint: Endpoint::new(addr.ip().to_string(), addr.port()),
        url: url.into(),
        tls: None,
        ..HTTPHandlerConfig::default()
    }
}

fn form_config(addr: SocketAddr, url: &str, method: HTTPMethod) -> HTTPHandlerConfig {
    HTTPHandlerConfig {
        method,
        format: PayloadFormat::UrlEncoded,
        ..plain_config(addr, url)
    }
}

fn record() -> LogRecord {
    LogRecord::new("orders", LogLevel::Info, "Hello World").created_at(1_620_000_000.0)
}

fn deliver(config: HTTPHandlerConfig) -> Result<(), DeliveryError> {
    HTTPTransport::new(config)
        .expect("build transport")
        .deliver(&record())
}

fn recv(rx: &mpsc::Receiver<CapturedRequest>) -> CapturedRequest {
    rx.recv_timeout(Duration::from_secs(5))
        .expect("request captured")
}

#[rstest]
fn posts_form_body_with_headers(tcp_listener: TcpListener) {
    let (addr, rx) = spawn_mock_server(tcp_listener, 200);
    deliver(form_config(addr, "/log", HTTPMethod::POST)).expect("deliver");

    let request = recv(&rx);
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/log");
    assert_eq!(request.header("content-type"), Some(FORM_CONTENT_TYPE));
    assert_eq!(
        request.header("content-length"),
        Some(request.body.len().to_string().as_str())
    );
    assert!(
        request
            .body
            .starts_with("name=orders&msg=Hello+World&levelname=INFO&levelno=20"),
        "unexpected body {:?}",
        request.body
    );
}

#[rstest]
#[case("/log", "/log?name=orders&msg=Hello+World")]
#[case("/log?src=app", "/log?src=app&name=orders&msg=Hello+World")]
fn get_appends_payload_to_query(
    tcp_listener: TcpListener,
    #[case] url: &str,
    #[case] expected_prefix: &str,
) {
    let (addr, rx) = spawn_mock_server(tcp_listener, 200);
    deliver(form_config(addr, url, HTTPMethod::GET)).expect("deliver");

    let request = recv(&rx);
    assert_eq!(request.method, "GET");
    assert!(
        request.path.starts_with(expected_prefix),
        "unexpected target {:?}",
        request.path
    );
    assert!(request.body.is_empty());
}

#[rstest]
fn json_is_posted_even_when_get_is_configured(tcp_listener: TcpListener) {
    let (addr, rx) = spawn_mock_server(tcp_listener, 200);
    let config = HTTPHandlerConfig {
        method: HTTPMethod::GET,
        format: PayloadFormat::Json,
        ..plain_config(addr, "/ingest")
    };
    deliver(config).expect("deliver");

    let request = recv(&rx);
    assert_eq!(request.method, "POST");
    assert_eq!(request.header("content-type"), Some(JSON_CONTENT_TYPE));
    let body: serde_json::Value = serde_json::from_str(&request.body).expect("json body");
    assert_eq!(body["name"], "orders");
    assert_eq!(body["msg"], "Hello World");
    assert_eq!(body["levelname"], "INFO");
    assert_eq!(body["levelno"], 20);
}

#[rstest]
fn host_header_omits_port(tcp_listener: TcpListener) {
    let (addr, rx) = spawn_mock_server(tcp_listener, 200);
    deliver(form_config(addr, "/log", HTTPMethod::POST)).expect("deliver");

    assert_eq!(recv(&rx).header("host"), Some("127.0.0.1"));
}

#[rstest]
#[case(302)]
#[case(404)]
#[case(500)]
fn any_status_counts_as_delivered(tcp_listener: TcpListener, #[case] status: u16) {
    let (addr, rx) = spawn_mock_server(tcp_listener, status);
    deliver(form_config(addr, "/log", HTTPMethod::POST)).expect("status is not a failure");
    recv(&rx);
}

#[rstest]
fn refused_connection_is_reported(tcp_listener: TcpListener) {
    let addr = tcp_listener.local_addr().expect("listener has address");
    drop(tcp_listener);

    let reporter = Arc::new(CollectingReporter::default());
    let transport =
        HTTPTransport::new(form_config(addr, "/log", HTTPMethod::POST)).expect("build transport");
    let handler = HTTPHandler::with_reporter(transport, reporter.clone());

    assert_eq!(handler.emit(&record()), DeliveryOutcome::Refused);
    assert_eq!(reporter.refused.lock().len(), 1);
}

#[rstest]
fn silent_server_times_out(tcp_listener: TcpListener) {
    let addr = tcp_listener.local_addr().expect("listener has address");
    thread::spawn(move || {
        let (stream, _) = tcp_listener.accept().expect("accept connection");
        thread::sleep(Duration::from_secs(2));
        drop(stream);
    });
    let config = HTTPHandlerConfig {
        io_timeout: Some(Duration::from_millis(250)),
        ..form_config(addr, "/log", HTTPMethod::POST)
    };

    let err = deliver(config).expect_err("reply never arrives");
    assert!(matches!(err, DeliveryError::TimedOut { .. }), "got {err:?}");
}

#[rstest]
fn every_record_opens_a_fresh_connection(tcp_listener: TcpListener) {
    let (addr, accepted, rx) = spawn_keep_alive_server(tcp_listener);
    let transport =
        HTTPTransport::new(form_config(addr, "/log", HTTPMethod::POST)).expect("build transport");

    transport.deliver(&record()).expect("first delivery");
    transport.deliver(&record()).expect("second delivery");

    let first = recv(&rx);
    recv(&rx);
    assert_eq!(first.header("connection"), Some("close"));
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

#[rstest]
fn https_posts_over_tls(tcp_listener: TcpListener) {
    let cert = TestCert::generate();
    let (addr, rx) = spawn_tls_server(tcp_listener, &cert);
    let config = HTTPHandlerConfig {
        tls: Some(TlsOptions::strict(false)),
        ..plain_config(addr, "/secure")
    };
    deliver(config).expect("deliver over HTTPS");

    let request = recv(&rx);
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/secure");
}

fn strict_https_config(addr: SocketAddr, tls: TlsOptions) -> HTTPHandlerConfig {
    HTTPHandlerConfig {
        endpoint: Endpoint::new("localhost", addr.port()),
        tls: Some(tls),
        ..plain_config(addr, "/secure")
    }
}

#[rstest]
fn strict_https_rejects_untrusted_certificate(tcp_listener: TcpListener) {
    let cert = TestCert::generate();
    let (addr, rx) = spawn_tls_server(tcp_listener, &cert);

    let err = deliver(strict_https_config(addr, TlsOptions::strict(true)))
        .expect_err("untrusted certificate must fail");

    assert!(matches!(err, DeliveryError::Http { .. }), "got {err:?}");
    assert!(rx.recv_timeout(Duration::from_millis(500)).is_err());
}

#[rstest]
fn strict_https_trusts_supplied_root(tcp_listener: TcpListener) {
    let cert = TestCert::generate();
    let (addr, rx) = spawn_tls_server(tcp_listener, &cert);
    let tls = TlsOptions::strict(true).with_root_certificates(vec![cert.root()]);

    deliver(strict_https_config(addr, tls)).expect("deliver with trusted root");

    let request = recv(&rx);
    assert_eq!(request.path, "/secure");
    assert_eq!(request.header("host"), Some("localhost"));
}
