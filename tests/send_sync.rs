//! Send/Sync guarantees for core types.

use logship::{
    AcceptingListener, HTTPHandler, HTTPHandlerBuilder, HTTPTransport, ListenerHandle,
    LogReporter, LogShipAdapter, ServerTls, SocketHandler, SocketHandlerBuilder, SocketTransport,
};
use rstest::rstest;
use static_assertions::assert_impl_all;

#[rstest]
fn builders_are_send_sync() {
    assert_impl_all!(SocketHandlerBuilder: Send, Sync);
    assert_impl_all!(HTTPHandlerBuilder: Send, Sync);
}

#[rstest]
fn transports_are_send_sync() {
    assert_impl_all!(SocketTransport: Send, Sync);
    assert_impl_all!(HTTPTransport: Send, Sync);
    assert_impl_all!(SocketHandler: Send, Sync);
    assert_impl_all!(HTTPHandler: Send, Sync);
    assert_impl_all!(LogReporter: Send, Sync);
    assert_impl_all!(LogShipAdapter: Send, Sync);
}

#[rstest]
fn listener_types_are_send() {
    assert_impl_all!(AcceptingListener: Send);
    assert_impl_all!(ListenerHandle: Send);
    assert_impl_all!(ServerTls: Send, Sync);
}
