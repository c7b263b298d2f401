//! Tests for the error model and its serialized form.

use super::*;
use rstest::rstest;
use serde_json::json;
use std::io;

#[derive(Debug)]
struct Wrapped {
    inner: io::Error,
}

impl fmt::Display for Wrapped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("upload failed")
    }
}

impl StdError for Wrapped {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.inner)
    }
}

#[rstest]
fn captured_error_defaults() {
    let error = CapturedError::new("IOError", "disk full");
    assert_eq!(error.class_name(), "IOError");
    assert_eq!(error.message(), "disk full");
    assert_eq!(error.code(), 0);
    assert!(error.file().is_none());
    assert!(error.frames().is_empty());
    assert!(error.previous().is_none());
    assert!(error.fault().is_none());
    assert!(error.as_self_describing().is_none());
}

#[rstest]
fn from_std_walks_source_chain() {
    let err = Wrapped {
        inner: io::Error::other("disk full"),
    };
    let captured = CapturedError::from_std(&err);

    assert_eq!(captured.class, "Wrapped");
    assert_eq!(captured.message, "upload failed");
    assert_eq!(captured.file.as_deref(), Some(file!()));
    assert!(captured.line.is_some());

    let cause = captured.previous.as_deref().expect("source captured");
    assert_eq!(cause.class, "Error");
    assert_eq!(cause.message, "disk full");
    assert!(cause.previous.is_none());
}

#[rstest]
#[case("std::io::error::Error", "Error")]
#[case("alloc::vec::Vec<u8>", "Vec")]
#[case("dyn core::error::Error", "Error")]
#[case("Plain", "Plain")]
fn short_type_name_strips_paths(#[case] full: &str, #[case] expected: &str) {
    assert_eq!(short_type_name(full), expected);
}

#[rstest]
fn stack_frame_location_requires_file() {
    assert_eq!(
        StackFrame::new("src/main.rs", 7).location().as_deref(),
        Some("src/main.rs:7")
    );
    assert!(StackFrame::symbol("main").location().is_none());
}

#[rstest]
fn parses_backtrace_rendering() {
    let text = "\
   0: app::store::write
             at ./src/store.rs:88:13
   1: app::main
             at ./src/main.rs:10:5
   2: std::rt::lang_start_internal
   3: main
";
    let frames = parse_backtrace(text);
    assert_eq!(frames.len(), 4);
    assert_eq!(frames[0].location().as_deref(), Some("./src/store.rs:88"));
    assert_eq!(frames[0].function.as_deref(), Some("app::store::write"));
    assert_eq!(frames[1].location().as_deref(), Some("./src/main.rs:10"));
    assert!(frames[2].file.is_none());
    assert!(frames[3].file.is_none());
}

#[rstest]
#[case("./src/lib.rs:10:5", "./src/lib.rs", 10)]
#[case("./src/lib.rs:10", "./src/lib.rs", 10)]
#[case("C:\\src\\lib.rs:12:1", "C:\\src\\lib.rs", 12)]
#[case("C:\\src\\lib.rs:12", "C:\\src\\lib.rs", 12)]
fn splits_locations(#[case] input: &str, #[case] file: &str, #[case] line: u32) {
    assert_eq!(split_location(input), Some((file.to_owned(), line)));
}

#[rstest]
fn rejects_locations_without_line() {
    assert_eq!(split_location("<unknown>"), None);
    assert_eq!(split_location("src/lib.rs:abc"), None);
}

#[rstest]
fn serialized_exception_omits_absent_fields() {
    let record = ExceptionRecord::Structured(SerializedException {
        class: "IOError".into(),
        message: "disk full".into(),
        code: 0,
        file: "/srv/app/io.rs:12".into(),
        ..SerializedException::default()
    });
    let value = serde_json::to_value(&record).expect("serialize");
    assert_eq!(
        value,
        json!({
            "class": "IOError",
            "message": "disk full",
            "code": 0,
            "file": "/srv/app/io.rs:12"
        })
    );
}

#[rstest]
fn serialized_exception_keeps_field_order() {
    let record = SerializedException {
        class: "SoapFault".into(),
        message: "denied".into(),
        code: 0,
        file: "a.rs:1".into(),
        faultcode: Some("Server".into()),
        trace: vec!["b.rs:2".into()],
        ..SerializedException::default()
    };
    let json = serde_json::to_string(&record).expect("serialize");
    let class = json.find("\"class\"").expect("class");
    let file = json.find("\"file\"").expect("file");
    let fault = json.find("\"faultcode\"").expect("faultcode");
    let trace = json.find("\"trace\"").expect("trace");
    assert!(class < file && file < fault && fault < trace);
}

#[rstest]
fn untagged_record_decodes_each_variant() {
    let structured: ExceptionRecord =
        serde_json::from_value(json!({"class": "E", "message": "m", "code": 1, "file": ""}))
            .expect("structured");
    assert!(structured.as_structured().is_some());

    let truncated: ExceptionRecord =
        serde_json::from_value(json!("Over 9 levels deep, aborting normalization"))
            .expect("truncated");
    assert!(matches!(truncated, ExceptionRecord::Truncated(_)));

    let described: ExceptionRecord =
        serde_json::from_value(json!({"kind": "custom"})).expect("self described");
    assert!(matches!(described, ExceptionRecord::SelfDescribed(_)));
}

#[rstest]
fn chain_helpers_follow_previous_links() {
    let root = ExceptionRecord::Truncated("cut".into());
    let middle = ExceptionRecord::Structured(SerializedException {
        class: "Middle".into(),
        previous: Some(Box::new(root.clone())),
        ..SerializedException::default()
    });
    let top = ExceptionRecord::Structured(SerializedException {
        class: "Top".into(),
        previous: Some(Box::new(middle)),
        ..SerializedException::default()
    });
    assert_eq!(top.chain_len(), 3);
    assert_eq!(top.root_cause(), &root);
}

#[rstest]
fn types_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<CapturedError>();
    assert_send_sync::<ExceptionRecord>();
    assert_send_sync::<std::sync::Arc<dyn LoggableError>>();
}
