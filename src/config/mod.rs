//! Configuration module
//!
//! The pipeline's configuration surface: per-stage policy plus global
//! bail/timeout/retry defaults. Files load as YAML or JSON by extension.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::pipeline::{StageConfig, StageName};
use crate::registry::TestRegistry;

/// Pipeline configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Per-stage policy. Stages absent from this list are treated as
    /// disabled; order here is irrelevant, execution order is canonical.
    #[serde(default = "default_stages")]
    pub stages: Vec<StageConfig>,

    /// Stop advancing through stages after the first stage failure
    /// (teardown still runs as best-effort cleanup).
    #[serde(default)]
    pub bail_on_failure: bool,

    /// Default per-test timeout in milliseconds.
    #[serde(default = "default_test_timeout_ms")]
    pub default_test_timeout_ms: u64,

    /// Default automatic retry budget per test.
    #[serde(default)]
    pub default_max_retries: u32,
}

fn default_stages() -> Vec<StageConfig> {
    StageName::all().iter().map(|s| StageConfig::new(*s)).collect()
}

fn default_test_timeout_ms() -> u64 {
    5_000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stages: default_stages(),
            bail_on_failure: false,
            default_test_timeout_ms: default_test_timeout_ms(),
            default_max_retries: 0,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;

        let config: Self = if path
            .as_ref()
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false)
        {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON config")?
        };

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = if path
            .as_ref()
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false)
        {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn stage(&self, name: StageName) -> Option<&StageConfig> {
        self.stages.iter().find(|s| s.stage == name)
    }

    /// Mutable access to a stage's policy, creating a default entry if the
    /// stage is not configured yet.
    pub fn stage_mut(&mut self, name: StageName) -> &mut StageConfig {
        if let Some(index) = self.stages.iter().position(|s| s.stage == name) {
            return &mut self.stages[index];
        }
        self.stages.push(StageConfig::new(name));
        self.stages.last_mut().expect("just pushed")
    }

    /// Replace or insert one stage's policy, builder style.
    pub fn with_stage(mut self, config: StageConfig) -> Self {
        match self.stages.iter_mut().find(|s| s.stage == config.stage) {
            Some(slot) => *slot = config,
            None => self.stages.push(config),
        }
        self
    }

    pub fn bail(mut self, bail_on_failure: bool) -> Self {
        self.bail_on_failure = bail_on_failure;
        self
    }

    /// A registry whose per-test defaults follow this configuration.
    pub fn registry(&self) -> TestRegistry {
        TestRegistry::with_defaults(
            Duration::from_millis(self.default_test_timeout_ms),
            self.default_max_retries,
        )
    }

    /// Reject invalid stage or threshold values before any stage runs.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.default_test_timeout_ms == 0 {
            return Err(PipelineError::Configuration(
                "default_test_timeout_ms must be positive".to_string(),
            ));
        }
        for (index, stage) in self.stages.iter().enumerate() {
            if stage.timeout_ms == 0 {
                return Err(PipelineError::Configuration(format!(
                    "stage {} timeout_ms must be positive",
                    stage.stage
                )));
            }
            if stage.max_concurrency == 0 {
                return Err(PipelineError::Configuration(format!(
                    "stage {} max_concurrency must be at least 1",
                    stage.stage
                )));
            }
            if self.stages[..index].iter().any(|s| s.stage == stage.stage) {
                return Err(PipelineError::Configuration(format!(
                    "stage {} configured twice",
                    stage.stage
                )));
            }
        }
        Ok(())
    }
}
