//! Redaction of credentials in persisted snapshots
//!
//! Snapshots are meant to be inspected and diffed, so every known-sensitive
//! field is replaced with a fixed marker before anything touches disk.
//! Redaction never fails on malformed input and preserves document shape:
//! the same keys stay present and arrays keep their length.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Marker substituted for sensitive values
pub const REDACTED: &str = "<REDACTED>";

/// Keys whose values are replaced wholesale, matched case-insensitively
pub const SENSITIVE_KEYS: [&str; 6] = [
    // OAuth credentials
    "access_token",
    "refresh_token",
    "client_secret",
    "device_token",
    // Device-flow codes
    "code",
    "user_code",
];

static BEARER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Authorization:\s*Bearer\s+[A-Za-z0-9._~+/=-]+").expect("static regex")
});

static TOKEN_PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"access_token=[A-Za-z0-9._~+/=-]+").expect("static regex"));

/// True when `key` names a credential field
pub fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| key.eq_ignore_ascii_case(k))
}

/// Replace sensitive values in a JSON document, recursively
///
/// Matching keys get the [`REDACTED`] marker regardless of their value's
/// type; everything else is copied unchanged. Idempotent.
pub fn redact_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    if is_sensitive_key(k) {
                        (k.clone(), Value::String(REDACTED.to_string()))
                    } else {
                        (k.clone(), redact_json(v))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_json).collect()),
        other => other.clone(),
    }
}

/// Scrub bearer tokens and `access_token=` query values from raw text
///
/// Covers tokens that leak into response bodies or echoed headers.
pub fn redact_text(text: &str) -> String {
    let text = BEARER_RE.replace_all(text, "Authorization: Bearer <REDACTED>");
    TOKEN_PARAM_RE
        .replace_all(&text, "access_token=<REDACTED>")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redacts_sensitive_keys_at_any_depth() {
        let doc = json!({
            "access_token": "secret",
            "nested": {"refresh_token": "also-secret", "title": "ok"},
            "items": [{"user_code": "ABCD"}, {"id": 1}]
        });
        let redacted = redact_json(&doc);
        assert_eq!(redacted["access_token"], REDACTED);
        assert_eq!(redacted["nested"]["refresh_token"], REDACTED);
        assert_eq!(redacted["nested"]["title"], "ok");
        assert_eq!(redacted["items"][0]["user_code"], REDACTED);
        assert_eq!(redacted["items"][1]["id"], 1);
    }

    #[test]
    fn test_redaction_is_case_insensitive() {
        let doc = json!({"Access_Token": "secret", "CODE": "1234"});
        let redacted = redact_json(&doc);
        assert_eq!(redacted["Access_Token"], REDACTED);
        assert_eq!(redacted["CODE"], REDACTED);
    }

    #[test]
    fn test_redaction_preserves_shape() {
        let doc = json!({
            "code": {"inner": "x"},
            "list": [1, 2, 3],
            "keep": null
        });
        let redacted = redact_json(&doc);
        let obj = redacted.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(redacted["list"].as_array().unwrap().len(), 3);
        assert!(redacted["keep"].is_null());
        // An object-valued sensitive key collapses to the marker string.
        assert_eq!(redacted["code"], REDACTED);
    }

    #[test]
    fn test_redaction_is_idempotent() {
        let doc = json!({"access_token": "secret", "items": [{"code": "c"}]});
        let once = redact_json(&doc);
        let twice = redact_json(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_redacts_scalar_root_unchanged() {
        assert_eq!(redact_json(&json!("hello")), json!("hello"));
        assert_eq!(redact_json(&json!(42)), json!(42));
        assert_eq!(redact_json(&Value::Null), Value::Null);
    }

    #[test]
    fn test_redact_text_bearer_header() {
        let text = "Authorization: Bearer abc.DEF-123_xyz~=/+";
        assert_eq!(redact_text(text), "Authorization: Bearer <REDACTED>");
    }

    #[test]
    fn test_redact_text_query_param() {
        let text = "GET /v1/items?access_token=abc123&page=1";
        assert_eq!(redact_text(text), "GET /v1/items?access_token=<REDACTED>&page=1");
    }

    #[test]
    fn test_redact_text_leaves_plain_text_alone() {
        let text = "nothing sensitive here";
        assert_eq!(redact_text(text), text);
    }
}
