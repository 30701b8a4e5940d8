//! Orchestrator configuration.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// The `[run]` configuration section: global caps and ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Stop the run after this many submitted applications.
    #[serde(default = "default_max_per_run")]
    pub max_applications_per_run: u32,

    /// Per-group cap, unless the group overrides it.
    #[serde(default = "default_max_per_group")]
    pub max_applications_per_group: u32,

    /// Applications allowed per calendar day, counting earlier runs.
    #[serde(default = "default_daily_limit")]
    pub daily_application_limit: u32,

    /// Safety valve against boards that always report more pages.
    #[serde(default = "default_max_pages_per_term")]
    pub max_pages_per_term: u32,

    /// Shuffle group order at the start of each run.
    #[serde(default)]
    pub randomize_search_order: bool,
}

fn default_max_per_run() -> u32 {
    25
}

fn default_max_per_group() -> u32 {
    10
}

fn default_daily_limit() -> u32 {
    50
}

fn default_max_pages_per_term() -> u32 {
    40
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_applications_per_run: default_max_per_run(),
            max_applications_per_group: default_max_per_group(),
            daily_application_limit: default_daily_limit(),
            max_pages_per_term: default_max_pages_per_term(),
            randomize_search_order: false,
        }
    }
}

/// The `[pacing]` configuration section: random pauses between applications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_min_delay")]
    pub min_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

fn default_min_delay() -> u64 {
    3000
}

fn default_max_delay() -> u64 {
    8000
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl PacingConfig {
    /// No pauses at all.
    pub fn disabled() -> Self {
        Self {
            min_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// A random delay within the configured bounds.
    pub fn next_delay(&self) -> Duration {
        if self.max_delay_ms <= self.min_delay_ms {
            return Duration::from_millis(self.min_delay_ms);
        }
        Duration::from_millis(rand::thread_rng().gen_range(self.min_delay_ms..=self.max_delay_ms))
    }
}
