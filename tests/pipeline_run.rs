//! End-to-end pipeline scenarios.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use testpipe::{
    expect, MockRegistry, PipelineConfig, PipelineCoordinator, PipelineEvent, RunStatus,
    StageConfig, StageName, TestFailure, TestRegistry, TestStatus,
};

/// Config with only the given stages enabled.
fn config_with(enabled: &[StageName], bail: bool) -> PipelineConfig {
    let mut config = PipelineConfig::default().bail(bail);
    for stage in StageName::all() {
        config.stage_mut(stage).enabled = enabled.contains(&stage);
    }
    config
}

#[tokio::test]
async fn math_suite_reports_retry_and_timeout() {
    let mut registry = TestRegistry::new();
    registry.suite("Math", |r| {
        r.test_with("add passes", Duration::from_millis(50), 0, || async {
            expect(2 + 2).equal(4)?;
            Ok(())
        });
        r.test_with("slow", Duration::from_millis(50), 1, || async {
            // never resolves within the timeout
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        });
    });

    let coordinator = PipelineCoordinator::new(config_with(&[StageName::Unit], false)).unwrap();
    let report = coordinator.run(Arc::new(registry)).await.unwrap();

    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.passed, 1);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.status, RunStatus::Failure);

    let results = &report.stages[&StageName::Unit];
    let slow = results.iter().find(|r| r.name == "slow").unwrap();
    assert_eq!(slow.status, TestStatus::Failed);
    assert_eq!(slow.attempts, 2); // initial + 1 retry
    assert!(slow.retried);
    assert!(slow.message.as_deref().unwrap().contains("timed out"));
}

#[tokio::test]
async fn bail_on_failure_skips_to_teardown() {
    let mut registry = TestRegistry::new();
    registry.test("unit fails", || async {
        Err(TestFailure::Failure("broken".to_string()))
    });
    registry.suite_in(StageName::Integration, "api", |r| {
        r.test("never attempted", || async { Ok(()) });
    });
    registry.suite_in(StageName::Teardown, "cleanup", |r| {
        r.test("release resources", || async { Ok(()) });
    });

    let config = config_with(&[StageName::Unit, StageName::Teardown], true);
    let coordinator = PipelineCoordinator::new(config).unwrap();
    let report = coordinator.run(Arc::new(registry)).await.unwrap();

    assert_eq!(report.status, RunStatus::Failure);
    assert_eq!(report.failed_stages, vec![StageName::Unit]);
    // teardown still runs as best-effort cleanup
    assert_eq!(report.completed_stages, vec![StageName::Teardown]);
    assert!(!report.stages.contains_key(&StageName::Integration));
}

#[tokio::test]
async fn bail_skips_enabled_intermediate_stages() {
    let executed: Arc<Mutex<Vec<StageName>>> = Arc::new(Mutex::new(Vec::new()));

    let mut registry = TestRegistry::new();
    registry.test("unit fails", || async {
        Err(TestFailure::Failure("broken".to_string()))
    });
    let seen = executed.clone();
    registry.suite_in(StageName::E2e, "flows", move |r| {
        let seen = seen.clone();
        r.test("checkout", move || {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(StageName::E2e);
                Ok(())
            }
        });
    });

    let config = config_with(&[StageName::Unit, StageName::E2e], true);
    let coordinator = PipelineCoordinator::new(config).unwrap();
    let report = coordinator.run(Arc::new(registry)).await.unwrap();

    assert_eq!(report.status, RunStatus::Failure);
    assert!(executed.lock().unwrap().is_empty(), "e2e ran despite bail");
}

#[tokio::test]
async fn stages_execute_in_canonical_order() {
    let mut registry = TestRegistry::new();
    registry.suite_in(StageName::Teardown, "cleanup", |r| {
        r.test("drop fixtures", || async { Ok(()) });
    });
    registry.suite_in(StageName::Setup, "bootstrap", |r| {
        r.test("create fixtures", || async { Ok(()) });
    });
    registry.test("unit probe", || async { Ok(()) });

    let order: Arc<Mutex<Vec<StageName>>> = Arc::new(Mutex::new(Vec::new()));
    let config = config_with(&[StageName::Setup, StageName::Unit, StageName::Teardown], false);
    let mut coordinator = PipelineCoordinator::new(config).unwrap();
    let seen = order.clone();
    coordinator.on_event(move |event| {
        if let PipelineEvent::StageStart { stage } = event {
            seen.lock().unwrap().push(*stage);
        }
    });

    let report = coordinator.run(Arc::new(registry)).await.unwrap();

    assert_eq!(report.status, RunStatus::Success);
    // registration order does not matter; configured order does not matter
    assert_eq!(
        *order.lock().unwrap(),
        vec![StageName::Setup, StageName::Unit, StageName::Teardown]
    );
    assert_eq!(
        report.completed_stages,
        vec![StageName::Setup, StageName::Unit, StageName::Teardown]
    );
}

#[tokio::test]
async fn only_tests_exclude_the_rest_as_skipped() {
    let mut registry = TestRegistry::new();
    registry.test("ordinary one", || async { Ok(()) });
    registry.only("focused", || async { Ok(()) });
    registry.test("ordinary two", || async { Ok(()) });

    let coordinator = PipelineCoordinator::new(config_with(&[StageName::Unit], false)).unwrap();
    let report = coordinator.run(Arc::new(registry)).await.unwrap();

    assert_eq!(report.summary.total, 3);
    assert_eq!(report.summary.passed, 1);
    assert_eq!(report.summary.skipped, 2);
    assert_eq!(report.status, RunStatus::Success);

    let skipped: Vec<_> = report.stages[&StageName::Unit]
        .iter()
        .filter(|r| r.status == TestStatus::Skipped)
        .collect();
    assert!(skipped
        .iter()
        .all(|r| r.message.as_deref() == Some("not in only set")));
}

#[tokio::test]
async fn scoped_mocks_do_not_leak_across_tests() {
    let mocks = MockRegistry::new();
    mocks.register("clock", "now", |_| Ok(json!(1_700_000_000)));

    let mut registry = TestRegistry::new();
    let first_mocks = mocks.clone();
    let second_mocks = mocks.clone();
    registry.suite("time-dependent", |r| {
        r.test("with frozen clock", move || {
            let mocks = first_mocks.clone();
            async move {
                // scoped acquisition: acquire at test start, restore before
                // returning
                let handle = mocks.mock("clock", "now", None);
                expect(handle.call_count() as u64).equal(0)?;
                handle.mock_return_value(json!(0));

                let frozen = mocks.invoke("clock", "now", &[]).map_err(TestFailure::Failure)?;
                expect(frozen).equal(0)?;
                expect(handle.call_count() as u64).equal(1)?;

                handle.restore();
                Ok(())
            }
        });
        r.test("sees the real clock", move || {
            let mocks = second_mocks.clone();
            async move {
                let now = mocks.invoke("clock", "now", &[]).map_err(TestFailure::Failure)?;
                expect(now).equal(1_700_000_000)?;
                Ok(())
            }
        });
    });

    let coordinator = PipelineCoordinator::new(config_with(&[StageName::Unit], false)).unwrap();
    let report = coordinator.run(Arc::new(registry)).await.unwrap();
    assert_eq!(report.summary.passed, 2);
    assert_eq!(report.status, RunStatus::Success);
}

#[tokio::test]
async fn retries_are_bounded_by_budget() {
    let attempts = Arc::new(AtomicUsize::new(0));

    let mut registry = TestRegistry::new();
    let counter = attempts.clone();
    registry.test_with("always fails", Duration::from_secs(1), 3, move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(TestFailure::Failure("still broken".to_string()))
        }
    });

    let coordinator = PipelineCoordinator::new(config_with(&[StageName::Unit], false)).unwrap();
    let report = coordinator.run(Arc::new(registry)).await.unwrap();

    // at most max_retries + 1 attempts
    assert_eq!(attempts.load(Ordering::SeqCst), 4);
    let result = &report.stages[&StageName::Unit][0];
    assert_eq!(result.attempts, 4);
    assert_eq!(result.status, TestStatus::Failed);
    // the report reflects the final attempt only
    assert_eq!(result.message.as_deref(), Some("still broken"));
}

#[tokio::test]
async fn registry_reset_between_runs() {
    let coordinator = PipelineCoordinator::new(config_with(&[StageName::Unit], false)).unwrap();

    let mut registry = TestRegistry::new();
    registry.test("first run", || async { Ok(()) });
    let report = coordinator.run(Arc::new(registry)).await.unwrap();
    assert_eq!(report.summary.total, 1);

    let mut registry = TestRegistry::new();
    registry.test("second run a", || async { Ok(()) });
    registry.test("second run b", || async { Ok(()) });
    let report = coordinator.run(Arc::new(registry)).await.unwrap();
    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.passed, 2);
}

#[tokio::test]
async fn parallel_stage_report_covers_every_test() {
    let mut registry = TestRegistry::new();
    registry.suite("mixed", |r| {
        for i in 0..5 {
            r.test(&format!("pass {i}"), || async { Ok(()) });
        }
        r.test("one failure", || async {
            Err(TestFailure::Failure("flaky dependency".to_string()))
        });
    });

    let config = config_with(&[StageName::Unit], false)
        .with_stage(StageConfig::new(StageName::Unit).parallel(3));
    let coordinator = PipelineCoordinator::new(config).unwrap();
    let report = coordinator.run(Arc::new(registry)).await.unwrap();

    assert_eq!(report.summary.total, 6);
    assert_eq!(report.summary.passed, 5);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.status, RunStatus::Failure);
    assert_eq!(report.failed_stages, vec![StageName::Unit]);
}
