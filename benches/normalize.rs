//! Benchmarks for record normalization and batch encoding.

use std::sync::Arc;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use serde_json::json;

use seqlog::test_utils::{CollectingDiagnostics, MockTransport};
use seqlog::{
    BatchMode, CapturedError, Context, DeliveryOptions, RawLogRecord, RecordFormatter,
    SeqFormatter, SeqHTTPHandler, level,
};

fn sample_record(i: usize) -> RawLogRecord {
    let context = Context::new()
        .with("request_id", format!("req-{i}"))
        .with("user", json!({"id": i, "roles": ["admin", "ops"]}));
    let extra = Context::new().with("host", "web-01");
    let mut record = RawLogRecord::new("app.http", level::WARNING, "Slow request {request_id}")
        .with_context(context)
        .with_extra(extra);
    if i % 10 == 0 {
        record = record.with_exception(
            CapturedError::new("TimeoutError", "upstream timed out")
                .with_previous(CapturedError::new("IOError", "connection reset")),
        );
    }
    record
}

fn batch(size: usize) -> Vec<RawLogRecord> {
    (0..size).map(sample_record).collect()
}

fn normalize_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    let formatter = SeqFormatter::default();
    group.bench_function("single_record", |b| {
        b.iter_batched(
            || sample_record(0),
            |record| black_box(formatter.normalize(record)),
            BatchSize::SmallInput,
        );
    });

    for mode in [BatchMode::JsonArray, BatchMode::NewlineDelimited] {
        let formatter = SeqFormatter::new(mode);
        group.bench_function(format!("batch_100_{mode:?}"), |b| {
            b.iter_batched(
                || batch(100),
                |records| black_box(formatter.format_batch(records)),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn delivery_benchmarks(c: &mut Criterion) {
    let handler = SeqHTTPHandler::new(DeliveryOptions::with_uri("http://seq.local"))
        .with_transport(Arc::new(MockTransport::new()))
        .with_diagnostics(Arc::new(CollectingDiagnostics::new()));

    c.bench_function("handle_batch_100_mock_transport", |b| {
        b.iter_batched(
            || batch(100),
            |records| black_box(handler.handle_batch(records)),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, normalize_benchmarks, delivery_benchmarks);
criterion_main!(benches);
