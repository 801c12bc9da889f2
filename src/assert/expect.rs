//! Fluent assertion wrapper
//!
//! `expect(value)` captures the actual value; `.not()` toggles the polarity
//! of the next assertion, and `.not().not()` returns to the original
//! polarity.

use serde_json::Value;

use super::{AssertResult, AssertionError, ValueKind};

/// Start a fluent assertion chain.
pub fn expect(actual: impl Into<Value>) -> Expectation {
    Expectation {
        actual: actual.into(),
        negated: false,
    }
}

/// A captured actual value with a negation toggle.
#[derive(Clone, Debug)]
pub struct Expectation {
    actual: Value,
    negated: bool,
}

impl Expectation {
    /// Negate the interpretation of the next assertion.
    #[allow(clippy::should_implement_trait)]
    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn equal(&self, expected: impl Into<Value>) -> AssertResult {
        let expected = expected.into();
        let description = format!("equal to {expected}");
        self.apply(super::equal(&self.actual, &expected), &description)
    }

    pub fn strict_equal(&self, expected: impl Into<Value>) -> AssertResult {
        let expected = expected.into();
        let description = format!("strictly equal to {expected}");
        self.apply(super::strict_equal(&self.actual, &expected), &description)
    }

    pub fn deep_equal(&self, expected: impl Into<Value>) -> AssertResult {
        let expected = expected.into();
        let description = format!("deep-equal to {expected}");
        self.apply(super::deep_equal(&self.actual, &expected), &description)
    }

    pub fn to_be_true(&self) -> AssertResult {
        self.apply(super::is_true(&self.actual), "true")
    }

    pub fn to_be_false(&self) -> AssertResult {
        self.apply(super::is_false(&self.actual), "false")
    }

    pub fn to_be_null(&self) -> AssertResult {
        self.apply(super::is_null(&self.actual), "null")
    }

    pub fn matches(&self, pattern: &str) -> AssertResult {
        let description = format!("matching \"{pattern}\"");
        match self.actual.as_str() {
            Some(s) => self.apply(super::matches(s, pattern), &description),
            None => Err(AssertionError::new(format!(
                "expected a string to match against, got {}",
                self.actual
            ))),
        }
    }

    pub fn contains(&self, needle: impl Into<Value>) -> AssertResult {
        let needle = needle.into();
        let description = format!("containing {needle}");
        self.apply(super::contains(&self.actual, &needle), &description)
    }

    pub fn has_length(&self, expected: usize) -> AssertResult {
        let description = format!("of length {expected}");
        self.apply(super::has_length(&self.actual, expected), &description)
    }

    pub fn greater_than(&self, expected: impl Into<Value>) -> AssertResult {
        let expected = expected.into();
        let description = format!("> {expected}");
        self.apply(super::greater_than(&self.actual, &expected), &description)
    }

    pub fn less_than(&self, expected: impl Into<Value>) -> AssertResult {
        let expected = expected.into();
        let description = format!("< {expected}");
        self.apply(super::less_than(&self.actual, &expected), &description)
    }

    pub fn at_least(&self, expected: impl Into<Value>) -> AssertResult {
        let expected = expected.into();
        let description = format!(">= {expected}");
        self.apply(super::at_least(&self.actual, &expected), &description)
    }

    pub fn at_most(&self, expected: impl Into<Value>) -> AssertResult {
        let expected = expected.into();
        let description = format!("<= {expected}");
        self.apply(super::at_most(&self.actual, &expected), &description)
    }

    pub fn is_instance_of(&self, kind: ValueKind) -> AssertResult {
        let description = format!("of type {kind}");
        self.apply(super::is_instance_of(&self.actual, kind), &description)
    }

    fn apply(&self, result: AssertResult, description: &str) -> AssertResult {
        if !self.negated {
            return result;
        }
        match result {
            Ok(()) => Err(AssertionError::new(format!(
                "expected {} not to be {description}",
                self.actual
            ))),
            Err(_) => Ok(()),
        }
    }
}
