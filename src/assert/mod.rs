//! Assertion library
//!
//! Stateless comparison, type, and throw checks used by test bodies, plus
//! the fluent [`expect`] wrapper with `.not()` negation. Values are compared
//! as `serde_json::Value`, which gives structural deep equality over nested
//! maps and sequences for free. Cyclic structures cannot be expressed in
//! `Value` and are out of scope.

mod expect;

pub use expect::{expect, Expectation};

use serde_json::Value;
use thiserror::Error;

/// Result of an assertion: `Ok(())` or a diff-carrying error.
pub type AssertResult = Result<(), AssertionError>;

/// An expected-vs-actual mismatch with a human-readable message.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct AssertionError {
    pub message: String,
}

impl AssertionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn mismatch(relation: &str, expected: impl std::fmt::Display, actual: impl std::fmt::Display) -> Self {
        if relation.is_empty() {
            Self::new(format!("expected {expected}, got {actual}"))
        } else {
            Self::new(format!("expected {relation} {expected}, got {actual}"))
        }
    }
}

/// Broad JSON type classification for [`is_instance_of`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn of(value: &Value) -> ValueKind {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Loose equality: numbers compare by numeric value regardless of integer
/// or float representation; everything else compares structurally.
pub fn equal(actual: &Value, expected: &Value) -> AssertResult {
    if loosely_equal(actual, expected) {
        Ok(())
    } else {
        Err(AssertionError::mismatch("", expected, actual))
    }
}

/// Strict equality: same JSON type and same value.
pub fn strict_equal(actual: &Value, expected: &Value) -> AssertResult {
    if ValueKind::of(actual) == ValueKind::of(expected) && actual == expected {
        Ok(())
    } else {
        Err(AssertionError::mismatch("strictly", expected, actual))
    }
}

/// Structural equality over nested maps and sequences.
pub fn deep_equal(actual: &Value, expected: &Value) -> AssertResult {
    if structurally_equal(actual, expected) {
        Ok(())
    } else {
        Err(AssertionError::mismatch("deep-equal", expected, actual))
    }
}

pub fn is_true(actual: &Value) -> AssertResult {
    match actual {
        Value::Bool(true) => Ok(()),
        other => Err(AssertionError::mismatch("", "true", other)),
    }
}

pub fn is_false(actual: &Value) -> AssertResult {
    match actual {
        Value::Bool(false) => Ok(()),
        other => Err(AssertionError::mismatch("", "false", other)),
    }
}

pub fn is_null(actual: &Value) -> AssertResult {
    if actual.is_null() {
        Ok(())
    } else {
        Err(AssertionError::mismatch("", "null", actual))
    }
}

/// Passes when the optional value is present.
pub fn is_defined(actual: Option<&Value>) -> AssertResult {
    match actual {
        Some(_) => Ok(()),
        None => Err(AssertionError::new("expected a defined value, got none")),
    }
}

/// Passes when the optional value is absent.
pub fn is_undefined(actual: Option<&Value>) -> AssertResult {
    match actual {
        None => Ok(()),
        Some(v) => Err(AssertionError::new(format!("expected no value, got {v}"))),
    }
}

/// Passes when the callable returns an error.
pub fn throws<T, E>(f: impl FnOnce() -> Result<T, E>) -> AssertResult {
    match f() {
        Err(_) => Ok(()),
        Ok(_) => Err(AssertionError::new("expected callable to fail, but it succeeded")),
    }
}

/// String match: `^` anchors a prefix, `$` anchors a suffix, both anchor an
/// exact match; an unanchored pattern matches any substring.
pub fn matches(actual: &str, pattern: &str) -> AssertResult {
    let anchored_start = pattern.starts_with('^');
    let anchored_end = pattern.ends_with('$') && pattern.len() > 1;
    let core = &pattern[usize::from(anchored_start)..pattern.len() - usize::from(anchored_end)];

    let matched = match (anchored_start, anchored_end) {
        (true, true) => actual == core,
        (true, false) => actual.starts_with(core),
        (false, true) => actual.ends_with(core),
        (false, false) => actual.contains(core),
    };

    if matched {
        Ok(())
    } else {
        Err(AssertionError::new(format!(
            "expected \"{actual}\" to match \"{pattern}\""
        )))
    }
}

pub fn greater_than(actual: &Value, expected: &Value) -> AssertResult {
    compare(actual, expected, ">", |a, e| a > e)
}

pub fn less_than(actual: &Value, expected: &Value) -> AssertResult {
    compare(actual, expected, "<", |a, e| a < e)
}

pub fn at_least(actual: &Value, expected: &Value) -> AssertResult {
    compare(actual, expected, ">=", |a, e| a >= e)
}

pub fn at_most(actual: &Value, expected: &Value) -> AssertResult {
    compare(actual, expected, "<=", |a, e| a <= e)
}

/// Membership: an array containing the element, a string containing the
/// substring, or an object containing the key.
pub fn contains(haystack: &Value, needle: &Value) -> AssertResult {
    let found = match haystack {
        Value::Array(items) => items.iter().any(|item| structurally_equal(item, needle)),
        Value::String(s) => needle.as_str().map(|n| s.contains(n)).unwrap_or(false),
        Value::Object(map) => needle.as_str().map(|n| map.contains_key(n)).unwrap_or(false),
        _ => false,
    };

    if found {
        Ok(())
    } else {
        Err(AssertionError::new(format!(
            "expected {haystack} to contain {needle}"
        )))
    }
}

/// Length of an array, string (chars), or object (keys).
pub fn has_length(actual: &Value, expected: usize) -> AssertResult {
    let len = match actual {
        Value::Array(items) => Some(items.len()),
        Value::String(s) => Some(s.chars().count()),
        Value::Object(map) => Some(map.len()),
        _ => None,
    };

    match len {
        Some(n) if n == expected => Ok(()),
        Some(n) => Err(AssertionError::new(format!(
            "expected length {expected}, got {n}"
        ))),
        None => Err(AssertionError::new(format!(
            "expected a value with a length, got {actual}"
        ))),
    }
}

pub fn is_instance_of(actual: &Value, kind: ValueKind) -> AssertResult {
    let actual_kind = ValueKind::of(actual);
    if actual_kind == kind {
        Ok(())
    } else {
        Err(AssertionError::mismatch("a value of type", kind, actual_kind))
    }
}

fn compare(actual: &Value, expected: &Value, relation: &str, cmp: impl Fn(f64, f64) -> bool) -> AssertResult {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(e)) if cmp(a, e) => Ok(()),
        (Some(_), Some(_)) => Err(AssertionError::mismatch(relation, expected, actual)),
        _ => Err(AssertionError::new(format!(
            "expected numbers for {relation} comparison, got {actual} and {expected}"
        ))),
    }
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => structurally_equal(a, b),
    }
}

fn structurally_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| structurally_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).map(|y| structurally_equal(x, y)).unwrap_or(false))
        }
        _ => a == b,
    }
}
