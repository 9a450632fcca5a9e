//! End-to-end delivery from a socket handler to the accepting listener.

use std::net::SocketAddr;
use std::sync::mpsc;
use std::time::Duration;

use logship::{
    AcceptingListener, DeliveryOutcome, HandlerBuilderTrait, ListenerConfig, LogLevel, LogRecord,
    ServerTls, SocketHandlerBuilder, parse_socket_line,
};
use rcgen::{CertifiedKey, generate_simple_self_signed};
use rstest::{fixture, rstest};

struct Collector {
    handle: logship::ListenerHandle,
    lines: mpsc::Receiver<(String, SocketAddr)>,
    cert_pem: String,
}

#[fixture]
fn collector() -> Collector {
    let CertifiedKey { cert, key_pair } =
        generate_simple_self_signed(vec!["localhost".to_string()]).expect("certificate");
    let cert_pem = cert.pem();
    let tls = ServerTls::from_pkcs8_pem(cert_pem.as_bytes(), key_pair.serialize_pem().as_bytes())
        .expect("server TLS");
    let (tx, lines) = mpsc::channel();
    let config = ListenerConfig::default().with_bind("127.0.0.1:0".parse().expect("addr"));
    let handle = AcceptingListener::bind(config, Some(tls), move |line: String, peer: SocketAddr| {
        let _ = tx.send((line, peer));
    })
    .expect("bind listener")
    .spawn()
    .expect("spawn listener");
    Collector {
        handle,
        lines,
        cert_pem,
    }
}

#[rstest]
fn strict_handler_ships_to_listener(collector: Collector) {
    let handler = SocketHandlerBuilder::new()
        .with_endpoint(format!("localhost:{}", collector.handle.local_addr().port()))
        .with_root_certificate_pem(collector.cert_pem.as_bytes().to_vec())
        .with_path("billing".to_string())
        .with_hostname("web-1".to_string())
        .build()
        .expect("build handler");

    let record = LogRecord::new("billing.invoice", LogLevel::Warning, "late | unpaid")
        .created_at(1_620_000_000.0);
    assert_eq!(handler.handle(&record), DeliveryOutcome::Delivered);

    let (line, peer) = collector
        .lines
        .recv_timeout(Duration::from_secs(5))
        .expect("line received");
    assert!(peer.ip().is_loopback());
    assert_eq!(
        line,
        "1620000000.0|web-1|billing|billing.invoice|WARNING|late \\| unpaid"
    );
    let parsed = parse_socket_line(&line).expect("six fields");
    assert_eq!(parsed.message, "late | unpaid");
    assert_eq!(parsed.created(), Some(1_620_000_000.0));

    collector.handle.shutdown().expect("shutdown");
}

#[rstest]
fn shut_down_collector_refuses_quietly(collector: Collector) {
    let port = collector.handle.local_addr().port();
    collector.handle.shutdown().expect("shutdown");

    let handler = SocketHandlerBuilder::new()
        .with_endpoint(format!("127.0.0.1:{port}"))
        .with_strict(false)
        .build()
        .expect("build handler");
    let record = LogRecord::new("svc", LogLevel::Info, "nobody listening");
    assert_eq!(handler.handle(&record), DeliveryOutcome::Refused);
}
