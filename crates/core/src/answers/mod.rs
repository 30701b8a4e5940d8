//! Form question answering: cache, rules, option matching and AI fallback.

mod cache;
mod config;
mod engine;
mod options;
mod rules;

pub use cache::{normalize_question, AnswerCache, AnswerCacheEntry, CacheError, CacheStats};
pub use config::{AnswerConfig, Profile};
pub use engine::{Question, QuestionEngine, Resolution, ResolvedBy};
pub use options::{choose_option, choose_options, is_placeholder};
pub use rules::answer_by_rule;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of input a form field expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[serde(alias = "text")]
    ShortText,
    #[serde(alias = "textarea")]
    LongText,
    #[serde(alias = "select")]
    SingleSelect,
    #[serde(alias = "checkbox")]
    MultiSelect,
    Radio,
}

impl FieldType {
    /// Whether the field only accepts one of a fixed set of options.
    pub fn has_options(&self) -> bool {
        matches!(
            self,
            FieldType::SingleSelect | FieldType::MultiSelect | FieldType::Radio
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::ShortText => "short_text",
            FieldType::LongText => "long_text",
            FieldType::SingleSelect => "single_select",
            FieldType::MultiSelect => "multi_select",
            FieldType::Radio => "radio",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a cached answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    /// Derived from the user's configuration.
    UserConfig,
    /// Typed in by the operator during an earlier pause.
    PreviousRun,
    /// Produced by the AI collaborator; subject to expiry.
    AiGenerated,
}

impl AnswerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerSource::UserConfig => "user_config",
            AnswerSource::PreviousRun => "previous_run",
            AnswerSource::AiGenerated => "ai_generated",
        }
    }
}

/// A value entered into a form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Choices(Vec<String>),
}

impl AnswerValue {
    /// Single-line rendering, choices joined with ", ".
    pub fn to_text(&self) -> String {
        match self {
            AnswerValue::Text(text) => text.clone(),
            AnswerValue::Choices(choices) => choices.join(", "),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Text(text) => text.trim().is_empty(),
            AnswerValue::Choices(choices) => choices.is_empty(),
        }
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
