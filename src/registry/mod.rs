//! Test registry
//!
//! Owns suites, test cases, and hooks. Suites and cases live in arenas and
//! reference each other by id, never by pointer. The registry is an explicit
//! value handed to the pipeline; no global singleton survives between runs.

mod case;
mod hooks;
mod selection;
mod suite;

pub use case::{RunState, TestBody, TestCase, TestId, TestStatus};
pub use hooks::{HookFn, HookKind, HookSet};
pub use selection::StageSelection;
pub use suite::{SuiteId, TestSuite};

use std::future::Future;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::TestFailure;
use crate::pipeline::StageName;

/// Registry of suites, cases, and hooks for one logical test universe.
pub struct TestRegistry {
    suites: Vec<TestSuite>,
    cases: Vec<Arc<TestCase>>,
    /// Stack of suites opened by in-progress `suite` closures.
    current: Vec<SuiteId>,
    default_timeout: Duration,
    default_max_retries: u32,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::with_defaults(Duration::from_secs(5), 0)
    }

    /// Registry with explicit per-test defaults for timeout and retry.
    pub fn with_defaults(default_timeout: Duration, default_max_retries: u32) -> Self {
        let mut registry = Self {
            suites: Vec::new(),
            cases: Vec::new(),
            current: Vec::new(),
            default_timeout,
            default_max_retries,
        };
        // Synthetic root suite: hooks registered outside any suite attach
        // here and act as the global scope.
        registry
            .suites
            .push(TestSuite::new(SuiteId(0), "(root)", None, StageName::Unit));
        registry
    }

    /// Drop every suite, case, and hook and recreate the root suite.
    pub fn reset(&mut self) {
        let defaults = (self.default_timeout, self.default_max_retries);
        *self = Self::with_defaults(defaults.0, defaults.1);
    }

    pub fn root(&self) -> SuiteId {
        SuiteId(0)
    }

    /// The suite new registrations attach to.
    pub fn current_suite(&self) -> SuiteId {
        self.current.last().copied().unwrap_or(SuiteId(0))
    }

    /// Define a suite nested under the current one, inheriting its stage.
    /// The closure runs with the new suite as current; the previous current
    /// suite is restored afterwards, even if the closure panics.
    pub fn suite(&mut self, name: &str, body: impl FnOnce(&mut Self)) -> SuiteId {
        let stage = self.suite_ref(self.current_suite()).stage;
        self.suite_in(stage, name, body)
    }

    /// Define a suite bound to an explicit pipeline stage.
    pub fn suite_in(
        &mut self,
        stage: StageName,
        name: &str,
        body: impl FnOnce(&mut Self),
    ) -> SuiteId {
        let parent = self.current_suite();
        let id = SuiteId(self.suites.len());
        self.suites
            .push(TestSuite::new(id, name, Some(parent), stage));
        self.current.push(id);
        debug!("defining suite {name} ({stage})");

        let outcome = catch_unwind(AssertUnwindSafe(|| body(self)));
        self.current.pop();
        if let Err(panic) = outcome {
            resume_unwind(panic);
        }
        id
    }

    /// Register a test on the current suite with default timeout and retry.
    pub fn test<F, Fut>(&mut self, name: &str, f: F) -> TestId
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TestFailure>> + Send + 'static,
    {
        self.register(name, self.default_timeout, self.default_max_retries, false, false, f)
    }

    /// Register a test with an explicit timeout and retry budget.
    pub fn test_with<F, Fut>(
        &mut self,
        name: &str,
        timeout: Duration,
        max_retries: u32,
        f: F,
    ) -> TestId
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TestFailure>> + Send + 'static,
    {
        self.register(name, timeout, max_retries, false, false, f)
    }

    /// Register a test that is excluded from every run and reported skipped.
    pub fn skip<F, Fut>(&mut self, name: &str, f: F) -> TestId
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TestFailure>> + Send + 'static,
    {
        self.register(name, self.default_timeout, self.default_max_retries, true, false, f)
    }

    /// Register a focused test: when any only-test exists in a stage's
    /// target set, the run is restricted to the only-tests.
    pub fn only<F, Fut>(&mut self, name: &str, f: F) -> TestId
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TestFailure>> + Send + 'static,
    {
        self.register(name, self.default_timeout, self.default_max_retries, false, true, f)
    }

    fn register<F, Fut>(
        &mut self,
        name: &str,
        timeout: Duration,
        max_retries: u32,
        skip: bool,
        only: bool,
        f: F,
    ) -> TestId
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TestFailure>> + Send + 'static,
    {
        let suite = self.current_suite();
        let stage = self.suite_ref(suite).stage;
        let id = TestId(self.cases.len());

        let body: TestBody = Arc::new(move || Box::pin(f()));
        self.cases.push(Arc::new(TestCase {
            id,
            name: name.to_string(),
            suite,
            stage,
            timeout,
            max_retries,
            skip,
            only,
            body,
            state: Mutex::new(RunState::default()),
        }));
        self.suites[suite.0].tests.push(id);
        id
    }

    /// Mark an already-registered case as skipped. Returns `false` when the
    /// case is already shared with a selection or run and can no longer be
    /// changed.
    pub fn set_skip(&mut self, id: TestId) -> bool {
        match self.cases.get_mut(id.0).and_then(Arc::get_mut) {
            Some(case) => {
                case.skip = true;
                true
            }
            None => {
                debug!("set_skip refused: case {id:?} is shared");
                false
            }
        }
    }

    pub fn before_all<F, Fut>(&mut self, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TestFailure>> + Send + 'static,
    {
        self.add_hook(HookKind::BeforeAll, f);
    }

    pub fn before_each<F, Fut>(&mut self, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TestFailure>> + Send + 'static,
    {
        self.add_hook(HookKind::BeforeEach, f);
    }

    pub fn after_each<F, Fut>(&mut self, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TestFailure>> + Send + 'static,
    {
        self.add_hook(HookKind::AfterEach, f);
    }

    pub fn after_all<F, Fut>(&mut self, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TestFailure>> + Send + 'static,
    {
        self.add_hook(HookKind::AfterAll, f);
    }

    fn add_hook<F, Fut>(&mut self, kind: HookKind, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TestFailure>> + Send + 'static,
    {
        let suite = self.current_suite();
        let hook: HookFn = Arc::new(move || Box::pin(f()));
        self.suites[suite.0].hooks.add(kind, hook);
    }

    pub fn case(&self, id: TestId) -> Option<&Arc<TestCase>> {
        self.cases.get(id.0)
    }

    pub fn suite_ref(&self, id: SuiteId) -> &TestSuite {
        &self.suites[id.0]
    }

    pub fn suite_count(&self) -> usize {
        self.suites.len()
    }

    pub fn test_count(&self) -> usize {
        self.cases.len()
    }

    /// Ancestor chain of a suite, outermost (root) first, ending with the
    /// suite itself.
    pub fn ancestor_chain(&self, suite: SuiteId) -> Vec<SuiteId> {
        let mut chain = Vec::new();
        let mut cursor = Some(suite);
        while let Some(id) = cursor {
            chain.push(id);
            cursor = self.suites[id.0].parent;
        }
        chain.reverse();
        chain
    }

    /// beforeEach hooks for a test's suite and ancestors, outermost-first.
    pub fn before_each_chain(&self, suite: SuiteId) -> Vec<HookFn> {
        self.ancestor_chain(suite)
            .iter()
            .flat_map(|id| self.suites[id.0].hooks.get(HookKind::BeforeEach).iter().cloned())
            .collect()
    }

    /// afterEach hooks for a test's suite and ancestors, innermost-first.
    pub fn after_each_chain(&self, suite: SuiteId) -> Vec<HookFn> {
        self.ancestor_chain(suite)
            .iter()
            .rev()
            .flat_map(|id| self.suites[id.0].hooks.get(HookKind::AfterEach).iter().cloned())
            .collect()
    }

    pub fn before_all_hooks(&self, suite: SuiteId) -> Vec<HookFn> {
        self.suites[suite.0].hooks.get(HookKind::BeforeAll).to_vec()
    }

    pub fn after_all_hooks(&self, suite: SuiteId) -> Vec<HookFn> {
        self.suites[suite.0].hooks.get(HookKind::AfterAll).to_vec()
    }

    /// Effective run set for one stage, in registration order.
    pub fn stage_cases(&self, stage: StageName) -> StageSelection {
        selection::select(self.cases.iter().filter(|c| c.stage == stage))
    }

    /// Effective run set over an explicit, externally-discovered id list.
    pub fn select_ids(&self, ids: &[TestId]) -> StageSelection {
        selection::select(ids.iter().filter_map(|id| self.cases.get(id.0)))
    }
}

impl Default for TestRegistry {
    fn default() -> Self {
        Self::new()
    }
}
