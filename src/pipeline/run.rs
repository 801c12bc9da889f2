//! Pipeline run state
//!
//! `PipelineRun` is the aggregate root for one execution of the whole
//! pipeline: the status state machine, stage bookkeeping, and per-stage
//! result lists. It is mutated only by the coordinator while status is
//! `Running` and treated as immutable afterwards.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::ExecutionResult;

use super::StageName;

/// Status of a pipeline run: `Idle -> Running -> {Success, Failure,
/// Cancelled}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Idle,
    Running,
    Success,
    Failure,
    Cancelled,
}

impl RunStatus {
    /// Whether the run has left `Running` and will not change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Success | RunStatus::Failure | RunStatus::Cancelled
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Idle => write!(f, "idle"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Success => write!(f, "success"),
            RunStatus::Failure => write!(f, "failure"),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One execution of the whole pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineRun {
    pub status: RunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Stages that completed without a failing test, in execution order.
    pub completed_stages: Vec<StageName>,
    /// Stages with at least one failed or errored test.
    pub failed_stages: Vec<StageName>,
    /// Result lists per executed stage; map order is canonical stage order.
    pub stage_results: BTreeMap<StageName, Vec<ExecutionResult>>,
    pub current_stage: Option<StageName>,
}

impl PipelineRun {
    pub fn idle() -> Self {
        Self {
            status: RunStatus::Idle,
            started_at: None,
            finished_at: None,
            completed_stages: Vec::new(),
            failed_stages: Vec::new(),
            stage_results: BTreeMap::new(),
            current_stage: None,
        }
    }

    /// Fresh run entering `Running`.
    pub fn start() -> Self {
        Self {
            status: RunStatus::Running,
            started_at: Some(Utc::now()),
            ..Self::idle()
        }
    }

    pub fn duration_ms(&self) -> u64 {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => (end - start).num_milliseconds().max(0) as u64,
            _ => 0,
        }
    }

    /// Close the run: overall success when no stage failed, unless the run
    /// was cancelled first.
    pub fn finish(&mut self, cancelled: bool) {
        self.status = if cancelled {
            RunStatus::Cancelled
        } else if self.failed_stages.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::Failure
        };
        self.finished_at = Some(Utc::now());
        self.current_stage = None;
    }
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::idle()
    }
}
