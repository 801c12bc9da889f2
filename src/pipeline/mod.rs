//! Pipeline coordinator
//!
//! Sequences the canonical stages, applies per-stage timeout/parallelism
//! policy, runs the execution engine across each stage's test set, and
//! emits lifecycle events. Stage order is fixed; configuration can only
//! enable or disable stages.

mod events;
mod run;
mod stage;

pub use events::{EventBus, EventListener, PipelineEvent};
pub use run::{PipelineRun, RunStatus};
pub use stage::{StageConfig, StageName};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::engine::{ExecutionEngine, ExecutionResult};
use crate::error::{PipelineError, TestFailure};
use crate::registry::{HookKind, StageSelection, SuiteId, TestRegistry};
use crate::report::PipelineReport;
use crate::utils::Timer;

/// Cloneable handle for cancelling an in-flight pipeline run.
///
/// Cancellation prevents further stages from starting; it does not
/// interrupt the stage currently executing.
#[derive(Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives a registry through the staged pipeline.
pub struct PipelineCoordinator {
    config: PipelineConfig,
    engine: ExecutionEngine,
    events: EventBus,
    last_run: Mutex<PipelineRun>,
    running: AtomicBool,
    cancelled: Arc<AtomicBool>,
}

impl PipelineCoordinator {
    /// Build a coordinator, rejecting invalid configuration before any
    /// stage can run.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            engine: ExecutionEngine::new(),
            events: EventBus::new(),
            last_run: Mutex::new(PipelineRun::idle()),
            running: AtomicBool::new(false),
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Register a lifecycle event listener. Listeners must be registered
    /// before the coordinator is shared.
    pub fn on_event<F>(&mut self, listener: F)
    where
        F: Fn(&PipelineEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(Arc::new(listener));
    }

    /// Handle for cancelling the current (or next) run from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(self.cancelled.clone())
    }

    /// Snapshot of the most recent run.
    pub fn last_run(&self) -> PipelineRun {
        self.last_run.lock().unwrap().clone()
    }

    /// Execute the whole pipeline against a registry.
    ///
    /// Fails immediately with [`PipelineError::ConcurrentRun`] when a run
    /// is already in flight. Test and hook failures never escape here; they
    /// are aggregated into the returned report.
    pub async fn run(&self, registry: Arc<TestRegistry>) -> Result<PipelineReport, PipelineError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PipelineError::ConcurrentRun);
        }
        let _guard = RunningGuard(&self.running);
        self.cancelled.store(false, Ordering::SeqCst);

        let timer = Timer::start("pipeline");
        let mut run = PipelineRun::start();
        info!("pipeline started");
        self.events.emit(&PipelineEvent::PipelineStart);

        let mut bailed = false;
        let mut cancelled = false;
        for stage in StageName::all() {
            let Some(stage_config) = self.config.stage(stage) else {
                self.events.emit(&PipelineEvent::StageSkipped { stage });
                continue;
            };
            if !stage_config.enabled {
                debug!("stage {stage} disabled");
                self.events.emit(&PipelineEvent::StageSkipped { stage });
                continue;
            }
            if self.cancelled.load(Ordering::SeqCst) {
                info!("pipeline cancelled before stage {stage}");
                cancelled = true;
                break;
            }
            if bailed && stage != StageName::Teardown {
                // bail-on-failure skips later stages; teardown still runs
                // as best-effort cleanup
                self.events.emit(&PipelineEvent::StageSkipped { stage });
                continue;
            }

            run.current_stage = Some(stage);
            self.events.emit(&PipelineEvent::StageStart { stage });
            info!("=== stage {stage} ===");

            let selection = registry.stage_cases(stage);
            let results = self.run_stage(&registry, stage_config, selection).await;

            let failed = results.iter().filter(|r| r.status.is_failure()).count();
            let passed = results.iter().filter(|r| r.status.is_success()).count();
            let stage_failed = failed > 0;
            run.stage_results.insert(stage, results);

            if stage_failed {
                warn!("stage {stage} failed ({failed} failing)");
                run.failed_stages.push(stage);
                self.events.emit(&PipelineEvent::StageFail { stage, failed });
                if self.config.bail_on_failure {
                    bailed = true;
                }
            } else {
                info!("stage {stage} complete ({passed} passing)");
                run.completed_stages.push(stage);
                self.events
                    .emit(&PipelineEvent::StageComplete { stage, passed, failed });
            }
        }

        run.finish(cancelled || self.cancelled.load(Ordering::SeqCst));
        info!(
            "pipeline finished: {} in {}ms",
            run.status,
            timer.elapsed_ms()
        );

        let report = PipelineReport::from_run(&run);
        self.events.emit(&PipelineEvent::PipelineComplete {
            status: run.status,
            report: report.clone(),
        });
        *self.last_run.lock().unwrap() = run;
        Ok(report)
    }

    /// Bound a stage by its configured timeout. On expiry the partial
    /// results are discarded and replaced by a single stage-timeout error.
    async fn run_stage(
        &self,
        registry: &Arc<TestRegistry>,
        config: &StageConfig,
        selection: StageSelection,
    ) -> Vec<ExecutionResult> {
        let stage_timeout = Duration::from_millis(config.timeout_ms);
        match tokio::time::timeout(stage_timeout, self.execute_stage(registry, config, selection))
            .await
        {
            Ok(results) => results,
            Err(_) => {
                warn!("stage {} exceeded {}ms", config.stage, config.timeout_ms);
                vec![ExecutionResult::stage_timeout(config.stage, config.timeout_ms)]
            }
        }
    }

    async fn execute_stage(
        &self,
        registry: &Arc<TestRegistry>,
        config: &StageConfig,
        selection: StageSelection,
    ) -> Vec<ExecutionResult> {
        let mut results: Vec<ExecutionResult> = selection
            .excluded
            .iter()
            .map(|(case, reason)| {
                ExecutionResult::skipped(case, &registry.suite_ref(case.suite).name, reason.clone())
            })
            .collect();

        if selection.runnable.is_empty() {
            return results;
        }

        // every suite (and ancestor) with a test in this stage, outer
        // suites before inner ones
        let mut ordered_suites: Vec<SuiteId> = Vec::new();
        for case in &selection.runnable {
            for suite in registry.ancestor_chain(case.suite) {
                if !ordered_suites.contains(&suite) {
                    ordered_suites.push(suite);
                }
            }
        }

        // beforeAll fires exactly once per suite, before any of its tests
        // may start; a failure blocks the suite and its descendants
        let mut blocked: HashMap<SuiteId, TestFailure> = HashMap::new();
        for &suite in &ordered_suites {
            if let Some(parent) = registry.suite_ref(suite).parent {
                if let Some(failure) = blocked.get(&parent) {
                    let inherited = failure.clone();
                    blocked.insert(suite, inherited);
                    continue;
                }
            }
            for hook in registry.before_all_hooks(suite) {
                if let Err(failure) = hook().await {
                    warn!(
                        "beforeAll failed for suite {}: {failure}",
                        registry.suite_ref(suite).name
                    );
                    blocked.insert(
                        suite,
                        TestFailure::Hook {
                            kind: HookKind::BeforeAll,
                            message: failure.message(),
                        },
                    );
                    break;
                }
            }
        }

        let mut ready = Vec::new();
        for case in selection.runnable {
            match blocked.get(&case.suite) {
                Some(failure) => results.push(ExecutionResult::blocked(
                    &case,
                    &registry.suite_ref(case.suite).name,
                    failure,
                )),
                None => ready.push(case),
            }
        }

        if config.parallel {
            // chunks run sequentially; tests within a chunk run
            // concurrently, so at most max_concurrency tests are in flight
            for chunk in ready.chunks(config.max_concurrency) {
                let mut handles = Vec::new();
                for case in chunk {
                    let registry = registry.clone();
                    let case = case.clone();
                    let engine = self.engine;
                    handles.push(tokio::spawn(async move {
                        engine.run(&registry, &case).await
                    }));
                }
                for outcome in join_all(handles).await {
                    match outcome {
                        Ok(result) => results.push(result),
                        Err(join_error) => warn!("test task failed to join: {join_error}"),
                    }
                }
            }
        } else {
            for case in &ready {
                let result = self.engine.run(registry, case).await;
                info!("  {result}");
                results.push(result);
            }
        }

        // afterAll fires exactly once per suite after its last test has
        // completed, innermost suites first
        for &suite in ordered_suites.iter().rev() {
            if blocked.contains_key(&suite) {
                continue;
            }
            for hook in registry.after_all_hooks(suite) {
                if let Err(failure) = hook().await {
                    let name = registry.suite_ref(suite).name.clone();
                    warn!("afterAll failed for suite {name}: {failure}");
                    results.push(ExecutionResult::suite_error(
                        &name,
                        config.stage,
                        failure.message(),
                    ));
                    break;
                }
            }
        }

        results
    }
}

/// Clears the running flag when a run ends, normally or early.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
