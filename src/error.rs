//! Error taxonomy for the engine and pipeline
//!
//! Failures that occur inside a test run are captured as [`TestFailure`] and
//! converted into test status; they never escape the execution engine.
//! [`PipelineError`] covers the conditions that do propagate to the caller.

use thiserror::Error;

use crate::assert::AssertionError;
use crate::registry::HookKind;

/// A failure captured during a single test attempt.
///
/// All variants are recoverable: the execution engine converts them into a
/// final test status plus a captured message, and retry policy may re-run
/// the attempt.
#[derive(Clone, Debug, Error)]
pub enum TestFailure {
    /// An assertion mismatch raised by the test body.
    #[error("{0}")]
    Assertion(#[from] AssertionError),

    /// The test body did not settle within its timeout.
    #[error("test timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// A lifecycle hook failed, aborting the remaining hooks in its chain.
    #[error("{kind} hook failed: {message}")]
    Hook { kind: HookKind, message: String },

    /// A generic failure raised by the test body.
    #[error("{0}")]
    Failure(String),

    /// The test body panicked. Reported as status `Error` rather than
    /// `Failed`, matching the pass/fail/error split in reports.
    #[error("test body panicked: {0}")]
    Panic(String),
}

impl TestFailure {
    /// Failure message suitable for reports.
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TestFailure::Timeout { .. })
    }

    /// Wrap an arbitrary error value as a generic failure.
    pub fn from_error(err: impl std::fmt::Display) -> Self {
        TestFailure::Failure(err.to_string())
    }
}

/// Errors that escape `PipelineCoordinator::run` to the caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// `run` was called while another run was in flight.
    #[error("pipeline is already running")]
    ConcurrentRun,

    /// Invalid stage or threshold configuration, surfaced before any stage
    /// runs.
    #[error("invalid pipeline configuration: {0}")]
    Configuration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message() {
        let failure = TestFailure::Timeout { timeout_ms: 50 };
        assert!(failure.is_timeout());
        assert_eq!(failure.message(), "test timed out after 50ms");
    }

    #[test]
    fn hook_failure_names_kind() {
        let failure = TestFailure::Hook {
            kind: HookKind::BeforeEach,
            message: "db unavailable".to_string(),
        };
        assert_eq!(failure.message(), "beforeEach hook failed: db unavailable");
    }

    #[test]
    fn assertion_converts() {
        let failure: TestFailure = AssertionError::new("expected 1, got 2").into();
        assert!(matches!(failure, TestFailure::Assertion(_)));
    }
}
