use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ai::AiConfig;
use crate::answers::AnswerConfig;
use crate::application::ApplicationConfig;
use crate::filter::FilterConfig;
use crate::orchestrator::{PacingConfig, RunConfig};
use crate::page::RetryPolicy;
use crate::search::SearchConfig;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    pub search: SearchConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub answers: AnswerConfig,
    #[serde(default)]
    pub application: ApplicationConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub pacing: PacingConfig,
    /// Optional AI fallback for form questions.
    #[serde(default)]
    pub ai: Option<AiConfig>,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// The AI section, if present and enabled.
    pub fn enabled_ai(&self) -> Option<&AiConfig> {
        self.ai.as_ref().filter(|ai| ai.enabled)
    }
}

/// Where persistent state lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_answer_cache_path")]
    pub answer_cache_path: PathBuf,
    #[serde(default = "default_outcome_db_path")]
    pub outcome_db_path: PathBuf,
    /// Capacity of the outcome log channel.
    #[serde(default = "default_outcome_buffer")]
    pub outcome_buffer: usize,
}

fn default_answer_cache_path() -> PathBuf {
    PathBuf::from("easyapply-data/answers.json")
}

fn default_outcome_db_path() -> PathBuf {
    PathBuf::from("easyapply-data/outcomes.db")
}

fn default_outcome_buffer() -> usize {
    256
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            answer_cache_path: default_answer_cache_path(),
            outcome_db_path: default_outcome_db_path(),
            outcome_buffer: default_outcome_buffer(),
        }
    }
}
