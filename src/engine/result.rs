//! Execution result model
//!
//! A detached summary of one test run, returned by the engine and
//! aggregated into stage result lists. Never a live reference into the
//! registry.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TestFailure;
use crate::pipeline::StageName;
use crate::registry::{TestCase, TestId, TestStatus};

/// Result of a single test execution (or a pseudo-result standing in for a
/// suite-level or stage-level failure).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// `None` for suite- or stage-level pseudo-results.
    pub test_id: Option<TestId>,
    pub name: String,
    pub suite: String,
    pub stage: StageName,
    pub status: TestStatus,
    pub duration_ms: u64,
    pub message: Option<String>,
    /// True when at least one retry was performed.
    pub retried: bool,
    /// Total attempts, at most `max_retries + 1`. Zero for skipped cases.
    pub attempts: u32,
    /// Non-fatal error surfaced alongside the result (afterEach failure on
    /// a passing test).
    pub auxiliary: Option<String>,
}

impl ExecutionResult {
    /// A case excluded from execution, reported without being run.
    pub fn skipped(case: &TestCase, suite_name: &str, reason: impl Into<String>) -> Self {
        Self {
            test_id: Some(case.id),
            name: case.name.clone(),
            suite: suite_name.to_string(),
            stage: case.stage,
            status: TestStatus::Skipped,
            duration_ms: 0,
            message: Some(reason.into()),
            retried: false,
            attempts: 0,
            auxiliary: None,
        }
    }

    /// A case that never ran because its suite's beforeAll failed.
    pub fn blocked(case: &TestCase, suite_name: &str, failure: &TestFailure) -> Self {
        Self {
            test_id: Some(case.id),
            name: case.name.clone(),
            suite: suite_name.to_string(),
            stage: case.stage,
            status: TestStatus::Failed,
            duration_ms: 0,
            message: Some(failure.message()),
            retried: false,
            attempts: 0,
            auxiliary: None,
        }
    }

    /// A suite-level failure with no corresponding test (afterAll).
    pub fn suite_error(
        suite_name: &str,
        stage: StageName,
        message: impl Into<String>,
    ) -> Self {
        Self {
            test_id: None,
            name: format!("{suite_name} afterAll"),
            suite: suite_name.to_string(),
            stage,
            status: TestStatus::Error,
            duration_ms: 0,
            message: Some(message.into()),
            retried: false,
            attempts: 0,
            auxiliary: None,
        }
    }

    /// A stage that exceeded its configured timeout before completing.
    pub fn stage_timeout(stage: StageName, timeout_ms: u64) -> Self {
        Self {
            test_id: None,
            name: format!("{stage} stage"),
            suite: "(stage)".to_string(),
            stage,
            status: TestStatus::Error,
            duration_ms: timeout_ms,
            message: Some(format!("stage timed out after {timeout_ms}ms")),
            retried: false,
            attempts: 0,
            auxiliary: None,
        }
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.status.symbol(),
            self.name,
            self.duration_ms
        )?;
        if self.retried {
            write!(f, " (attempts: {})", self.attempts)?;
        }
        if let Some(msg) = &self.message {
            write!(f, " - {msg}")?;
        }
        if let Some(aux) = &self.auxiliary {
            write!(f, " [aux: {aux}]")?;
        }
        Ok(())
    }
}
