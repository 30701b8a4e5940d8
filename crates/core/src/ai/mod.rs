//! AI collaborator used as the last automatic resort for form questions.
//!
//! The engine only depends on [`AiCollaborator`]. The concrete
//! implementation, [`LlmAnswerer`], turns a question into a prompt for any
//! [`LlmClient`] (Anthropic or an OpenAI-compatible endpoint).

mod answerer;
mod config;
mod llm;

pub use answerer::LlmAnswerer;
pub use config::{create_llm_client, AiConfig, LlmProvider};
pub use llm::{
    AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmUsage,
    OpenAiCompatibleClient,
};

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::answers::{is_placeholder, FieldType, Question};
use crate::search::JobListing;

/// Longest description excerpt handed to the model.
const MAX_DESCRIPTION_CHARS: usize = 3000;

/// Error type for AI operations.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Model returned an empty answer")]
    EmptyAnswer,
}

/// Everything the AI needs to answer one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiQuestion {
    pub question: String,
    pub field_type: FieldType,
    /// Offered options without placeholders; empty for free-text fields.
    pub options: Vec<String>,
    pub job_title: String,
    pub company: String,
    pub description: String,
    pub profile: String,
}

impl AiQuestion {
    pub fn new(question: &Question, listing: &JobListing, profile: String) -> Self {
        Self {
            question: question.text.clone(),
            field_type: question.field_type,
            options: question
                .options
                .iter()
                .filter(|o| !is_placeholder(o))
                .cloned()
                .collect(),
            job_title: listing.title.clone(),
            company: listing.company.clone(),
            description: truncate_chars(&listing.description, MAX_DESCRIPTION_CHARS),
            profile,
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Produces a free-text answer for a form question.
#[async_trait]
pub trait AiCollaborator: Send + Sync {
    /// Collaborator name used in logs.
    fn name(&self) -> &str;

    /// Answer the question. For option fields the reply should name one of
    /// the offered options; the caller maps it back.
    async fn answer(&self, request: &AiQuestion) -> Result<String, AiError>;
}
