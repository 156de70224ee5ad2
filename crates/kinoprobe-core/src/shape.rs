//! Duck-typed shape assertions over untyped JSON
//!
//! The probed API's response shapes are only empirically known and vary
//! between deployments, so validation is cumulative: every assertion appends
//! a descriptive message to a caller-supplied accumulator instead of
//! aborting. Optional or variant fields are validated only when present and
//! non-null; callers skip absent fields.

use serde_json::Value;

/// Name the runtime type of a JSON value for error messages
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn describe(value: Option<&Value>) -> &'static str {
    value.map(type_name).unwrap_or("nothing")
}

/// Append `msg` to the accumulator when `cond` does not hold
pub fn require(cond: bool, msg: impl Into<String>, errors: &mut Vec<String>) {
    if !cond {
        errors.push(msg.into());
    }
}

/// Assert the value is a JSON object
pub fn expect_object(value: Option<&Value>, at: &str, errors: &mut Vec<String>) {
    if !matches!(value, Some(Value::Object(_))) {
        errors.push(format!("{at}: expected object, got {}", describe(value)));
    }
}

/// Assert the value is a JSON array
pub fn expect_array(value: Option<&Value>, at: &str, errors: &mut Vec<String>) {
    if !matches!(value, Some(Value::Array(_))) {
        errors.push(format!("{at}: expected array, got {}", describe(value)));
    }
}

/// Assert the value is a JSON string
pub fn expect_string(value: Option<&Value>, at: &str, errors: &mut Vec<String>) {
    if !matches!(value, Some(Value::String(_))) {
        errors.push(format!("{at}: expected string, got {}", describe(value)));
    }
}

/// Assert the value is an integer (floats do not pass)
pub fn expect_int(value: Option<&Value>, at: &str, errors: &mut Vec<String>) {
    if as_int(value).is_none() {
        errors.push(format!("{at}: expected int, got {}", describe(value)));
    }
}

/// Assert the value is any JSON number
pub fn expect_number(value: Option<&Value>, at: &str, errors: &mut Vec<String>) {
    if !matches!(value, Some(Value::Number(_))) {
        errors.push(format!("{at}: expected number, got {}", describe(value)));
    }
}

/// Assert the value is a boolean
pub fn expect_bool(value: Option<&Value>, at: &str, errors: &mut Vec<String>) {
    if !matches!(value, Some(Value::Bool(_))) {
        errors.push(format!("{at}: expected bool, got {}", describe(value)));
    }
}

/// Extract an integer, or `None` for anything else
pub fn as_int(value: Option<&Value>) -> Option<i64> {
    value.and_then(Value::as_i64)
}

/// Look up a field on a value that may not be an object
///
/// Returns `None` when the value is absent, not an object, or the key is
/// missing, so lookups can be chained without intermediate checks.
pub fn get<'a>(value: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    value.and_then(|v| v.get(key))
}

/// True when the field is present with a non-null value
///
/// Used for optional fields that must only be validated when the server
/// actually returned them.
pub fn is_present(value: Option<&Value>) -> bool {
    matches!(value, Some(v) if !v.is_null())
}
