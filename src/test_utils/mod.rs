//! Test-only helpers shared across crate unit tests.
//!
//! This module is only compiled for unit tests and provides small utilities
//! used by multiple test modules to keep individual test files focused.

pub mod collecting;
pub mod tls;

use std::net::{Ipv4Addr, SocketAddr};

use crate::listener::{AcceptingListener, ListenerConfig, ListenerHandle, ServerTls};

use collecting::CollectingConsumer;

/// Run a listener on an ephemeral loopback port, collecting every line.
pub fn spawn_collecting_listener(
    config: ListenerConfig,
    tls: Option<ServerTls>,
) -> (ListenerHandle, CollectingConsumer) {
    let consumer = CollectingConsumer::new();
    let config = config.with_bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)));
    let handle = AcceptingListener::bind(config, tls, consumer.clone())
        .expect("bind listener")
        .spawn()
        .expect("spawn listener");
    (handle, consumer)
}
