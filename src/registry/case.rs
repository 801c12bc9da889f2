//! Test case model
//!
//! A `TestCase` pairs immutable registration metadata with the mutable run
//! state the execution engine writes while the case is in flight. The engine
//! guarantees at most one in-flight run per case; the mutex only guards
//! snapshot reads from reporters against the single active writer.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::TestFailure;
use crate::pipeline::StageName;

use super::SuiteId;

/// Arena identifier of a registered test case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(pub(crate) usize);

impl TestId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// The callable body of a test: settles with `Ok` on success or a captured
/// failure.
pub type TestBody = Arc<dyn Fn() -> BoxFuture<'static, Result<(), TestFailure>> + Send + Sync>;

/// Execution status of a test case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
    Error,
}

impl TestStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            TestStatus::Pending => "·",
            TestStatus::Running => "…",
            TestStatus::Passed => "✓",
            TestStatus::Failed => "✗",
            TestStatus::Skipped => "○",
            TestStatus::Error => "!",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TestStatus::Passed)
    }

    /// Failed and Error both count against a stage.
    pub fn is_failure(&self) -> bool {
        matches!(self, TestStatus::Failed | TestStatus::Error)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::Pending => write!(f, "PENDING"),
            TestStatus::Running => write!(f, "RUNNING"),
            TestStatus::Passed => write!(f, "PASS"),
            TestStatus::Failed => write!(f, "FAIL"),
            TestStatus::Skipped => write!(f, "SKIP"),
            TestStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Mutable state written by the execution engine during a run.
#[derive(Clone, Debug)]
pub struct RunState {
    pub status: TestStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    pub failure: Option<TestFailure>,
    pub retry_count: u32,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            status: TestStatus::Pending,
            started_at: None,
            finished_at: None,
            duration_ms: 0,
            failure: None,
            retry_count: 0,
        }
    }
}

/// A registered unit of work.
pub struct TestCase {
    pub id: TestId,
    pub name: String,
    /// Owning suite, as an arena id rather than a back-pointer.
    pub suite: SuiteId,
    pub stage: StageName,
    pub timeout: Duration,
    pub max_retries: u32,
    pub skip: bool,
    pub only: bool,
    pub(crate) body: TestBody,
    pub(crate) state: Mutex<RunState>,
}

impl TestCase {
    pub async fn status(&self) -> TestStatus {
        self.state.lock().await.status
    }

    /// Detached copy of the current run state.
    pub async fn snapshot(&self) -> RunState {
        self.state.lock().await.clone()
    }

    pub fn body(&self) -> TestBody {
        self.body.clone()
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("suite", &self.suite)
            .field("stage", &self.stage)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("skip", &self.skip)
            .field("only", &self.only)
            .finish_non_exhaustive()
    }
}
