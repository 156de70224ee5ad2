//! Property tests for snapshot redaction

use proptest::prelude::*;
use serde_json::{Map, Value};

use kinoprobe_core::redact::{REDACTED, is_sensitive_key, redact_json};

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        "[a-zA-Z0-9._-]{0,24}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(
                ("[a-zA-Z_]{1,16}|access_token|refresh_token|code|user_code", inner),
                0..6
            )
            .prop_map(|pairs| Value::Object(pairs.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Same keys, same array lengths, same scalar positions
fn same_shape(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(ma), Value::Object(mb)) => {
            ma.len() == mb.len()
                && ma.iter().all(|(k, va)| {
                    mb.get(k).is_some_and(|vb| {
                        // A redacted subtree collapses to the marker string.
                        is_sensitive_key(k) || same_shape(va, vb)
                    })
                })
        }
        (Value::Array(aa), Value::Array(ab)) => {
            aa.len() == ab.len() && aa.iter().zip(ab).all(|(va, vb)| same_shape(va, vb))
        }
        _ => std::mem::discriminant(a) == std::mem::discriminant(b),
    }
}

fn contains_unredacted_sensitive(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.iter().any(|(k, v)| {
            if is_sensitive_key(k) {
                v != &Value::String(REDACTED.to_string())
            } else {
                contains_unredacted_sensitive(v)
            }
        }),
        Value::Array(items) => items.iter().any(contains_unredacted_sensitive),
        _ => false,
    }
}

proptest! {
    #[test]
    fn redaction_preserves_document_shape(doc in arb_json()) {
        let redacted = redact_json(&doc);
        prop_assert!(same_shape(&doc, &redacted));
    }

    #[test]
    fn redaction_leaves_no_sensitive_value_behind(doc in arb_json()) {
        let redacted = redact_json(&doc);
        prop_assert!(!contains_unredacted_sensitive(&redacted));
    }

    #[test]
    fn redaction_is_idempotent(doc in arb_json()) {
        let once = redact_json(&doc);
        let twice = redact_json(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn redaction_does_not_touch_documents_without_sensitive_keys(
        items in prop::collection::vec(any::<i64>(), 0..8)
    ) {
        let doc = serde_json::json!({"items": items, "pagination": {"total": items.len()}});
        prop_assert_eq!(redact_json(&doc), doc);
    }
}
