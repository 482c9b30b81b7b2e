//! Text-form roundtrip tests for `docpatch-core` identities.
//!
//! Each `#[case]` is isolated — no shared state.

use docpatch_core::{Fingerprint, IdentifierValue, Identity, ObjectId};
use rstest::rstest;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn string_id(field: &str, value: &str) -> Identity {
    Identity::new(field, IdentifierValue::String(value.to_string()))
}

fn oid_id(field: &str, hex: &str) -> Identity {
    Identity::new(
        field,
        IdentifierValue::ObjectId(ObjectId::parse_str(hex).expect("oid")),
    )
}

const CHECKSUM: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

// ---------------------------------------------------------------------------
// Parameterised roundtrip test
// ---------------------------------------------------------------------------

#[rstest]
#[case("plain_string", string_id("_id", "order-1"))]
#[case("object_id", oid_id("_id", "64b7f0c2a1b2c3d4e5f60718"))]
#[case("alternate_field", string_id("uuid", "5d1c"))]
#[case("empty_string", string_id("_id", ""))]
#[case("embedded_separators", string_id("_id", "a b  c "))]
#[case("quotes_and_newlines", string_id("key", "say \"hi\"\nbye\t!"))]
#[case("unicode_strings", string_id("_id", "アプリ-проект-项目-🚀"))]
fn fingerprint_roundtrip(#[case] label: &str, #[case] identity: Identity) {
    let fp = Fingerprint::new(identity, CHECKSUM);
    let record = fp.to_string();
    assert_eq!(record.lines().count(), 1, "[{label}] record must be one line");
    let back: Fingerprint = record
        .parse()
        .unwrap_or_else(|e| panic!("[{label}] parse failed: {e}"));
    assert_eq!(back, fp, "[{label}] fingerprint");
    assert_eq!(back.identifier(), fp.identifier(), "[{label}] identifier");
}

// ---------------------------------------------------------------------------
// Byte stability of the persisted format
// ---------------------------------------------------------------------------

#[test]
fn record_format_is_byte_stable() {
    let fp = Fingerprint::new(oid_id("_id", "64b7f0c2a1b2c3d4e5f60718"), "00ff");
    assert_eq!(
        fp.to_string(),
        "_id ObjectId(\"64b7f0c2a1b2c3d4e5f60718\") 00ff"
    );
    let fp = Fingerprint::new(string_id("id", "x y"), "abcd");
    assert_eq!(fp.to_string(), "id \"x y\" abcd");
}
