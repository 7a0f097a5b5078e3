//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bound on one run, in seconds.
pub const DEFAULT_TIMEOUT_SECS: f64 = 300.0;

/// Configuration shared by a pipeline and the children it spawns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Bound on `run`, from input binding to output resolution.
    #[serde(default = "default_timeout")]
    pub timeout_secs: f64,
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, seconds: f64) -> Self {
        self.timeout_secs = seconds;
        self
    }

    /// Returns the timeout as a duration. Non-positive values mean the run
    /// times out immediately.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        if self.timeout_secs.is_nan() || self.timeout_secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(self.timeout_secs).unwrap_or(Duration::MAX)
    }
}
