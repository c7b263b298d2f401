//! Send/Sync guarantees for core types.

use rstest::rstest;
use static_assertions::assert_impl_all;

use seqlog::{
    BackgroundHandler, CapturedError, DeliveryOptions, HTTPHandlerBuilder, LogDiagnostics,
    RawLogRecord, SeqFormatter, SeqHTTPHandler, SharedFormatter, UreqTransport,
};

#[rstest]
fn builders_are_send_sync() {
    assert_impl_all!(HTTPHandlerBuilder: Send, Sync);
    assert_impl_all!(DeliveryOptions: Send, Sync);
}

#[rstest]
fn components_are_send_sync() {
    assert_impl_all!(SeqFormatter: Send, Sync);
    assert_impl_all!(SharedFormatter: Send, Sync);
    assert_impl_all!(SeqHTTPHandler: Send, Sync);
    assert_impl_all!(BackgroundHandler: Send, Sync);
    assert_impl_all!(UreqTransport: Send, Sync);
    assert_impl_all!(LogDiagnostics: Send, Sync);
}

#[rstest]
fn records_cross_threads() {
    assert_impl_all!(RawLogRecord: Send, Sync);
    assert_impl_all!(CapturedError: Send, Sync);
}
