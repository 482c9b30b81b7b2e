//! Encoding determinism across key insertion order and modes.

use docpatch_codec::{encode, encode_document, from_json_str, EncodeOptions};
use docpatch_core::{Document, Mode, ObjectId, UtcDateTime, Value};
use rstest::rstest;

fn forward() -> Document {
    let mut doc = Document::new();
    doc.insert("_id", "1");
    doc.insert("b", 2);
    doc.insert("a", 1);
    doc.insert(
        "meta",
        Document::new().with("z", true).with("y", Value::Null),
    );
    doc
}

fn backward() -> Document {
    let mut doc = Document::new();
    doc.insert(
        "meta",
        Document::new().with("y", Value::Null).with("z", true),
    );
    doc.insert("a", 1);
    doc.insert("b", 2);
    doc.insert("_id", "1");
    doc
}

#[rstest]
#[case(Mode::Canonical, true)]
#[case(Mode::Canonical, false)]
#[case(Mode::Relaxed, true)]
#[case(Mode::Relaxed, false)]
#[case(Mode::Shell, true)]
#[case(Mode::Shell, false)]
fn insertion_order_never_changes_output(#[case] mode: Mode, #[case] compact: bool) {
    let opts = EncodeOptions::new(mode, compact);
    let a = encode_document(&forward(), &opts).expect("forward");
    let b = encode_document(&backward(), &opts).expect("backward");
    assert_eq!(a.as_bytes(), b.as_bytes(), "[{mode} compact={compact}]");
}

#[test]
fn json_text_key_order_is_irrelevant() {
    let a = from_json_str(r#"{"_id":"1","b":2,"a":1}"#).expect("a");
    let b = from_json_str(r#"{"a":1,"b":2,"_id":"1"}"#).expect("b");
    let opts = EncodeOptions::canonical_compact();
    assert_eq!(
        encode_document(&a, &opts).expect("a"),
        encode_document(&b, &opts).expect("b")
    );
}

#[test]
fn relaxed_and_canonical_differ_only_in_tagging() {
    let doc = Document::new()
        .with("_id", ObjectId::parse_str("000000000000000000000001").expect("oid"))
        .with("at", Value::DateTime(UtcDateTime::from_millis(0)))
        .with("n", 3);
    let canonical = encode_document(&doc, &EncodeOptions::canonical_compact()).expect("c");
    let relaxed = encode_document(&doc, &EncodeOptions::new(Mode::Relaxed, true)).expect("r");
    assert_eq!(
        canonical,
        r#"{"_id":{"$oid":"000000000000000000000001"},"at":{"$date":{"$numberLong":"0"}},"n":{"$numberInt":"3"}}"#
    );
    assert_eq!(
        relaxed,
        r#"{"_id":{"$oid":"000000000000000000000001"},"at":{"$date":"1970-01-01T00:00:00.000Z"},"n":3}"#
    );
}

#[test]
fn every_mode_rejects_top_level_arrays() {
    for mode in [Mode::Canonical, Mode::Relaxed, Mode::Shell] {
        let result = encode(&Value::Array(vec![]), &EncodeOptions::new(mode, true));
        assert!(result.is_err(), "{mode} accepted a top-level array");
    }
}
