//! Pipeline stage names and per-stage policy
//!
//! Stage order is fixed: later stages assume earlier ones succeeded, and
//! teardown must run last to release resources. Configuration can enable or
//! disable stages but never reorder them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The canonical stages, in execution order.
///
/// `Ord` follows declaration order and therefore execution order, which lets
/// stage-keyed maps iterate the way the pipeline runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Setup,
    Unit,
    Integration,
    E2e,
    Performance,
    Security,
    Teardown,
}

impl StageName {
    /// All stages in canonical execution order.
    pub fn all() -> [StageName; 7] {
        [
            StageName::Setup,
            StageName::Unit,
            StageName::Integration,
            StageName::E2e,
            StageName::Performance,
            StageName::Security,
            StageName::Teardown,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Setup => "setup",
            StageName::Unit => "unit",
            StageName::Integration => "integration",
            StageName::E2e => "e2e",
            StageName::Performance => "performance",
            StageName::Security => "security",
            StageName::Teardown => "teardown",
        }
    }

    pub fn from_str(s: &str) -> Option<StageName> {
        match s.to_lowercase().as_str() {
            "setup" => Some(StageName::Setup),
            "unit" => Some(StageName::Unit),
            "integration" => Some(StageName::Integration),
            "e2e" => Some(StageName::E2e),
            "performance" | "perf" => Some(StageName::Performance),
            "security" => Some(StageName::Security),
            "teardown" => Some(StageName::Teardown),
            _ => None,
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy for one stage: whether it runs, how long it may take, and how many
/// tests may be in flight at once.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StageConfig {
    pub stage: StageName,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_stage_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_stage_timeout_ms() -> u64 {
    30_000
}

fn default_max_concurrency() -> usize {
    4
}

impl StageConfig {
    pub fn new(stage: StageName) -> Self {
        Self {
            stage,
            enabled: default_enabled(),
            timeout_ms: default_stage_timeout_ms(),
            parallel: false,
            max_concurrency: default_max_concurrency(),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Enable bounded concurrent execution within this stage.
    pub fn parallel(mut self, max_concurrency: usize) -> Self {
        self.parallel = true;
        self.max_concurrency = max_concurrency;
        self
    }
}
