//! testpipe - Embeddable test orchestration and execution engine
//!
//! A self-hosted engine for registering test suites, executing them under
//! timeouts with automatic retry, and coordinating a multi-stage pipeline
//! (setup, unit, integration, e2e, performance, security, teardown) with
//! per-stage concurrency policy and lifecycle-event reporting.
//!
//! ## Features
//!
//! - Nestable suites with beforeAll/beforeEach/afterEach/afterAll hooks
//! - Per-test timeout races with bounded automatic retry
//! - skip/only filtering at registration time
//! - Mock/stub/spy seam with capture-once, restore-idempotent semantics
//! - Assertion library with a fluent negatable `expect` wrapper
//! - Staged pipeline with bail-on-failure, cancellation, and bounded
//!   parallel execution
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use testpipe::{expect, PipelineConfig, PipelineCoordinator, TestRegistry};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let mut registry = TestRegistry::new();
//! registry.suite("math", |r| {
//!     r.test("addition", || async {
//!         expect(2 + 2).equal(4)?;
//!         Ok(())
//!     });
//! });
//!
//! let coordinator = PipelineCoordinator::new(PipelineConfig::default())?;
//! let report = coordinator.run(Arc::new(registry)).await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

pub mod assert;
pub mod config;
pub mod engine;
pub mod error;
pub mod mocks;
pub mod pipeline;
pub mod registry;
pub mod report;
pub mod utils;

pub use assert::{expect, AssertionError, Expectation};
pub use config::PipelineConfig;
pub use engine::{ExecutionEngine, ExecutionResult};
pub use error::{PipelineError, TestFailure};
pub use mocks::{MockHandle, MockRegistry, SpyHandle, StubHandle};
pub use pipeline::{
    CancelHandle, PipelineCoordinator, PipelineEvent, PipelineRun, RunStatus, StageConfig,
    StageName,
};
pub use registry::{HookKind, SuiteId, TestCase, TestId, TestRegistry, TestStatus};
pub use report::{PipelineReport, Reporter, RunSummary};
