//! End-to-end normalization scenarios and properties.

use chrono::{DateTime, FixedOffset};
use proptest::prelude::*;
use rstest::rstest;
use serde_json::{Value, json};

use seqlog::{
    BatchMode, CapturedError, Context, NormalizedEnvelope, RawLogRecord, RecordFormatter,
    SeqFormatter, level,
};

fn instant(secs: i64) -> DateTime<FixedOffset> {
    DateTime::from_timestamp(secs, 0)
        .map(|utc| utc.fixed_offset())
        .expect("timestamp in range")
}

#[rstest]
fn disk_full_record_normalizes_to_expected_envelope() {
    let record = RawLogRecord::at("storage", level::CRITICAL, "Disk full", instant(1_714_564_800))
        .with_exception(CapturedError::new("IOError", "disk full").with_location("/srv/io.rs", 7));

    let body = SeqFormatter::default().format(record).expect("format");
    let value: Value = serde_json::from_str(&body).expect("json");

    assert_eq!(
        value,
        json!({
            "Timestamp": "2024-05-01T12:00:00Z",
            "Level": "Error",
            "MessageTemplate": "Disk full",
            "Properties": {"SourceContext": "storage"},
            "Exception": {
                "class": "IOError",
                "message": "disk full",
                "code": 0,
                "file": "/srv/io.rs:7"
            }
        })
    );
}

#[rstest]
fn std_errors_carry_their_cause_chain() {
    let io = std::io::Error::other("no space left on device");
    let record = RawLogRecord::at("storage", level::ERROR, "Write failed", instant(0))
        .with_exception(CapturedError::from_std(&io));

    let envelope = SeqFormatter::default().normalize(record).expect("normalize");

    let exception = envelope
        .exception
        .as_ref()
        .and_then(|e| e.as_structured())
        .expect("structured exception");
    assert_eq!(exception.class, "Error");
    assert_eq!(exception.message, "no space left on device");
    assert!(exception.file.contains("normalizer_tests.rs"), "{}", exception.file);
}

#[rstest]
fn long_cause_chain_is_cut_once() {
    let mut error = CapturedError::new("Root", "root cause");
    for i in 0..20 {
        error = CapturedError::new(format!("Layer{i}"), "wrapped").with_previous(error);
    }
    let record = RawLogRecord::at("app", level::ERROR, "deep", instant(0)).with_exception(error);

    let body = SeqFormatter::default().format(record).expect("format");

    assert_eq!(
        body.matches("Over 9 levels deep, aborting normalization")
            .count(),
        1
    );
}

#[rstest]
fn json_input_with_non_error_exception_is_left_alone() {
    let envelope = SeqFormatter::default()
        .normalize_json(json!({
            "message": "odd",
            "context": {"exception": {"class": "NotAnError"}},
            "level": 400,
            "channel": "app"
        }))
        .expect("normalize");

    assert!(envelope.exception.is_none());
    assert_eq!(
        envelope.property("exception"),
        Some(&json!({"class": "NotAnError"}))
    );
}

fn level_code() -> impl Strategy<Value = i64> {
    prop_oneof![
        Just(level::DEBUG),
        Just(level::INFO),
        Just(level::NOTICE),
        Just(level::WARNING),
        Just(level::ERROR),
        Just(level::CRITICAL),
        Just(level::ALERT),
        Just(level::EMERGENCY),
        any::<i64>(),
    ]
}

fn property_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[ -~]{0,12}".prop_map(Value::from),
        proptest::collection::vec(any::<i32>(), 0..4).prop_map(|v| json!(v)),
    ]
}

fn raw_record() -> impl Strategy<Value = RawLogRecord> {
    (
        "[a-z][a-z0-9_.]{0,10}",
        level_code(),
        "\\PC{0,24}",
        0i64..4_000_000_000,
        proptest::collection::vec(("[a-z][a-zA-Z0-9]{0,8}", property_value()), 0..5),
    )
        .prop_map(|(channel, code, message, secs, entries)| {
            let context: Context = entries.into_iter().collect();
            RawLogRecord::at(&channel, code, &message, instant(secs)).with_context(context)
        })
}

fn decode(mode: BatchMode, body: &str) -> Vec<NormalizedEnvelope> {
    match mode {
        BatchMode::JsonArray => serde_json::from_str(body).expect("array body"),
        BatchMode::NewlineDelimited => body
            .lines()
            .map(|line| serde_json::from_str(line).expect("clef line"))
            .collect(),
    }
}

proptest! {
    #[test]
    fn normalization_is_deterministic(record in raw_record()) {
        let formatter = SeqFormatter::default();
        let first = formatter.normalize(record.clone()).expect("normalize");
        let second = formatter.normalize(record).expect("normalize");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn batches_survive_encoding(
        records in proptest::collection::vec(raw_record(), 0..6),
        newline in any::<bool>(),
    ) {
        let mode = if newline { BatchMode::NewlineDelimited } else { BatchMode::JsonArray };
        let formatter = SeqFormatter::new(mode);
        let envelopes = formatter.normalize_batch(records).expect("normalize");

        let body = formatter.encode_batch(&envelopes).expect("encode");
        let decoded = decode(mode, &body);

        prop_assert_eq!(decoded, envelopes);
    }

    #[test]
    fn unknown_codes_never_fail(code in any::<i64>()) {
        let envelope = SeqFormatter::default()
            .normalize(RawLogRecord::at("app", code, "m", instant(0)))
            .expect("normalize");
        prop_assert!(envelope.level.is_some());
    }
}
