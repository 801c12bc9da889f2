//! Execution engine
//!
//! Runs one test at a time: resolves the effective hook chains, races the
//! body against its timeout, and retries failed attempts up to the case's
//! retry budget. Every attempt re-runs beforeEach, body, and afterEach.
//!
//! Timeout cancellation is cooperative: the body is spawned as its own task
//! and the engine stops waiting at the deadline. The task's eventual
//! settlement is discarded, not interrupted; a body that never yields keeps
//! running detached. Known limitation of the design.

mod result;

pub use result::ExecutionResult;

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::TestFailure;
use crate::registry::{HookFn, HookKind, RunState, TestCase, TestRegistry, TestStatus};
use crate::utils::Timer;

/// Stateless single-test runner. The pipeline holds one and shares it
/// across concurrent slots.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExecutionEngine;

impl ExecutionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run one test to completion, including hooks and retries, and return
    /// a detached result. The engine is the only writer of the case's run
    /// state while this future is in flight; a retry is a new run of the
    /// same case, strictly sequential with its predecessor.
    pub async fn run(&self, registry: &TestRegistry, case: &Arc<TestCase>) -> ExecutionResult {
        let before = registry.before_each_chain(case.suite);
        let after = registry.after_each_chain(case.suite);
        let suite_name = registry.suite_ref(case.suite).name.clone();

        debug!("running {} ({})", case.name, case.stage);
        let started = Utc::now();
        let timer = Timer::start(&case.name);
        {
            let mut state = case.state.lock().await;
            *state = RunState::default();
            state.status = TestStatus::Running;
            state.started_at = Some(started);
        }

        let mut attempts: u32 = 0;
        let mut auxiliary: Option<String> = None;
        let outcome = loop {
            attempts += 1;
            auxiliary = None;
            let outcome = self.attempt(case, &before, &after, &mut auxiliary).await;
            if outcome.is_ok() {
                break outcome;
            }

            let mut state = case.state.lock().await;
            if state.retry_count < case.max_retries {
                state.retry_count += 1;
                debug!(
                    "retrying {} (attempt {}/{})",
                    case.name,
                    attempts + 1,
                    case.max_retries + 1
                );
            } else {
                break outcome;
            }
        };

        let duration_ms = timer.elapsed_ms();
        let (status, failure) = match outcome {
            Ok(()) => (TestStatus::Passed, None),
            Err(f @ TestFailure::Panic(_)) => (TestStatus::Error, Some(f)),
            Err(f) => (TestStatus::Failed, Some(f)),
        };

        let retry_count = {
            let mut state = case.state.lock().await;
            state.status = status;
            state.finished_at = Some(Utc::now());
            state.duration_ms = duration_ms;
            state.failure = failure.clone();
            state.retry_count
        };

        ExecutionResult {
            test_id: Some(case.id),
            name: case.name.clone(),
            suite: suite_name,
            stage: case.stage,
            status,
            duration_ms,
            message: failure.map(|f| f.message()),
            retried: retry_count > 0,
            attempts,
            auxiliary,
        }
    }

    /// One attempt: beforeEach chain, body under timeout, afterEach chain.
    /// The afterEach chain runs even when setup or the body failed.
    async fn attempt(
        &self,
        case: &Arc<TestCase>,
        before: &[HookFn],
        after: &[HookFn],
        auxiliary: &mut Option<String>,
    ) -> Result<(), TestFailure> {
        let mut result = Ok(());

        for hook in before {
            if let Err(failure) = hook().await {
                result = Err(TestFailure::Hook {
                    kind: HookKind::BeforeEach,
                    message: failure.message(),
                });
                break;
            }
        }

        if result.is_ok() {
            result = self.run_body(case).await;
        }

        for hook in after {
            if let Err(failure) = hook().await {
                match &result {
                    // A passing body stands; the teardown failure is
                    // surfaced as an auxiliary error.
                    Ok(()) => *auxiliary = Some(format!("afterEach hook failed: {}", failure.message())),
                    Err(primary) => {
                        warn!(
                            "afterEach hook failed after {}: {}",
                            primary,
                            failure.message()
                        );
                        *auxiliary = Some(format!("afterEach hook failed: {}", failure.message()));
                    }
                }
                // a failed hook aborts the remainder of its chain
                break;
            }
        }

        result
    }

    /// Race the body against the case timeout. The body is spawned so that
    /// a timed-out body's eventual settlement is discarded rather than
    /// awaited.
    async fn run_body(&self, case: &Arc<TestCase>) -> Result<(), TestFailure> {
        let body = case.body();
        let handle = tokio::spawn(async move { body().await });

        match tokio::time::timeout(case.timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(TestFailure::Panic(join_error.to_string())),
            Err(_elapsed) => Err(TestFailure::Timeout {
                timeout_ms: case.timeout.as_millis() as u64,
            }),
        }
    }
}
