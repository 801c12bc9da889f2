//! Report sinks and notification channels
//!
//! Injected delivery targets for a finished run. Sink and channel failures
//! are logged and swallowed: reporting can never change a pipeline's
//! outcome.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::{PipelineReport, RunSummary};

/// Consumer of the full result tree.
pub trait ReportSink: Send + Sync {
    fn name(&self) -> &str;
    fn report(&self, report: &PipelineReport) -> Result<()>;
}

/// Post-hoc notification target receiving only the summary.
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &str;
    fn notify(&self, summary: &RunSummary) -> Result<()>;
}

/// Renders the text report to stdout.
#[derive(Default)]
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn report(&self, report: &PipelineReport) -> Result<()> {
        println!("{report}");
        Ok(())
    }
}

/// Writes the JSON projection of the report to a file.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for JsonFileSink {
    fn name(&self) -> &str {
        "json-file"
    }

    fn report(&self, report: &PipelineReport) -> Result<()> {
        let json = report.to_json().context("Failed to serialize report")?;
        std::fs::write(&self.path, json).context("Failed to write report file")?;
        Ok(())
    }
}

/// Stub notification channel: logs a one-line summary.
#[derive(Default)]
pub struct ConsoleChannel;

impl NotificationChannel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    fn notify(&self, summary: &RunSummary) -> Result<()> {
        info!(
            "run finished: {}/{} passed, {} failed, {} skipped, {} errors in {}ms",
            summary.passed,
            summary.total,
            summary.failed,
            summary.skipped,
            summary.errors,
            summary.duration_ms
        );
        Ok(())
    }
}

/// Fans a finished report out to every registered sink and channel.
#[derive(Default)]
pub struct Reporter {
    sinks: Vec<Box<dyn ReportSink>>,
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(mut self, sink: impl ReportSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn add_channel(mut self, channel: impl NotificationChannel + 'static) -> Self {
        self.channels.push(Box::new(channel));
        self
    }

    /// Deliver the report everywhere. Individual failures are logged and do
    /// not stop delivery to the remaining targets.
    pub fn dispatch(&self, report: &PipelineReport) {
        for sink in &self.sinks {
            if let Err(error) = sink.report(report) {
                warn!("report sink {} failed: {error:#}", sink.name());
            }
        }
        for channel in &self.channels {
            if let Err(error) = channel.notify(&report.summary) {
                warn!("notification channel {} failed: {error:#}", channel.name());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{PipelineRun, StageName};
    use crate::registry::TestStatus;
    use crate::engine::ExecutionResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn sample_report() -> PipelineReport {
        let mut run = PipelineRun::start();
        let mut result = ExecutionResult::stage_timeout(StageName::Unit, 0);
        result.status = TestStatus::Passed;
        result.message = None;
        run.stage_results.insert(StageName::Unit, vec![result]);
        run.completed_stages.push(StageName::Unit);
        run.finish(false);
        PipelineReport::from_run(&run)
    }

    struct FailingSink;

    impl ReportSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        fn report(&self, _report: &PipelineReport) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    struct CountingChannel(Arc<AtomicUsize>);

    impl NotificationChannel for CountingChannel {
        fn name(&self) -> &str {
            "counting"
        }

        fn notify(&self, _summary: &RunSummary) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn json_file_sink_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let sink = JsonFileSink::new(&path);
        sink.report(&sample_report()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: PipelineReport = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.summary.passed, 1);
    }

    #[test]
    fn dispatch_survives_sink_failure() {
        let notified = Arc::new(AtomicUsize::new(0));
        let reporter = Reporter::new()
            .add_sink(FailingSink)
            .add_channel(CountingChannel(notified.clone()));

        // the failing sink must not prevent channel delivery
        reporter.dispatch(&sample_report());
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }
}
