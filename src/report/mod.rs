//! Pipeline reporting
//!
//! Aggregates one run's results into a serializable [`PipelineReport`] and
//! forwards it to injected sinks and notification channels. Export formats
//! are plain projections of the report structure; JSON is provided, other
//! formats are the sink implementor's concern.

mod sinks;

pub use sinks::{
    ConsoleChannel, ConsoleSink, JsonFileSink, NotificationChannel, Reporter, ReportSink,
};

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::ExecutionResult;
use crate::pipeline::{PipelineRun, RunStatus, StageName};
use crate::registry::TestStatus;

/// Aggregate counts for one pipeline run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn from_results<'a>(results: impl Iterator<Item = &'a ExecutionResult>) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.total += 1;
            match result.status {
                TestStatus::Passed => summary.passed += 1,
                TestStatus::Failed => summary.failed += 1,
                TestStatus::Skipped => summary.skipped += 1,
                TestStatus::Error => summary.errors += 1,
                TestStatus::Pending | TestStatus::Running => {}
            }
        }
        summary
    }

    pub fn pass_rate(&self) -> f64 {
        let executed = self.total - self.skipped;
        if executed == 0 {
            0.0
        } else {
            (self.passed as f64 / executed as f64) * 100.0
        }
    }

    pub fn is_all_passed(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }
}

/// The aggregated, serializable result of one pipeline run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineReport {
    pub summary: RunSummary,
    /// Result lists per executed stage, in canonical stage order.
    pub stages: BTreeMap<StageName, Vec<ExecutionResult>>,
    pub completed_stages: Vec<StageName>,
    pub failed_stages: Vec<StageName>,
    pub status: RunStatus,
    pub timestamp: DateTime<Utc>,
}

impl PipelineReport {
    pub fn from_run(run: &PipelineRun) -> Self {
        let mut summary =
            RunSummary::from_results(run.stage_results.values().flat_map(|r| r.iter()));
        summary.duration_ms = run.duration_ms();

        Self {
            summary,
            stages: run.stage_results.clone(),
            completed_stages: run.completed_stages.clone(),
            failed_stages: run.failed_stages.clone(),
            status: run.status,
            timestamp: Utc::now(),
        }
    }

    /// Lossless JSON projection of the report.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut output = String::new();

        writeln!(output, "{:=^70}", " Pipeline Report ")?;
        writeln!(output, "Status: {}", self.status)?;
        writeln!(output, "Timestamp: {}", self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(output)?;

        for (stage, results) in &self.stages {
            writeln!(output, "{:-^70}", format!(" {stage} "))?;
            for result in results {
                writeln!(output, "  {result}")?;
            }
        }

        writeln!(output)?;
        writeln!(
            output,
            "Total: {} | Pass: {} | Fail: {} | Skip: {} | Error: {}",
            self.summary.total,
            self.summary.passed,
            self.summary.failed,
            self.summary.skipped,
            self.summary.errors
        )?;
        writeln!(
            output,
            "Pass Rate: {:.1}% | Duration: {}ms",
            self.summary.pass_rate(),
            self.summary.duration_ms
        )?;

        f.write_str(&output)
    }
}
