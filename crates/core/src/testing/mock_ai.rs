//! Mock AI collaborator for testing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::ai::{AiCollaborator, AiError, AiQuestion};

/// Mock implementation of the AiCollaborator trait.
///
/// Replies are chosen by the first configured substring found in the
/// question text (case-insensitive), then the default reply. Without either
/// the call fails with [`AiError::EmptyAnswer`].
#[derive(Debug)]
pub struct MockAi {
    replies: Arc<RwLock<Vec<(String, String)>>>,
    default_reply: Arc<RwLock<Option<String>>>,
    /// If set, the next call will fail with this error.
    next_error: Arc<RwLock<Option<AiError>>>,
    questions: Arc<RwLock<Vec<AiQuestion>>>,
}

impl Default for MockAi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAi {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(RwLock::new(Vec::new())),
            default_reply: Arc::new(RwLock::new(None)),
            next_error: Arc::new(RwLock::new(None)),
            questions: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Reply with `reply` to questions containing `question_contains`.
    pub async fn set_reply(&self, question_contains: &str, reply: &str) {
        self.replies
            .write()
            .await
            .push((question_contains.to_lowercase(), reply.to_string()));
    }

    pub async fn set_default_reply(&self, reply: &str) {
        *self.default_reply.write().await = Some(reply.to_string());
    }

    /// Make the next call fail.
    pub async fn fail_next(&self, error: AiError) {
        *self.next_error.write().await = Some(error);
    }

    /// Get every question asked so far.
    pub async fn recorded_questions(&self) -> Vec<AiQuestion> {
        self.questions.read().await.clone()
    }
}

#[async_trait]
impl AiCollaborator for MockAi {
    fn name(&self) -> &str {
        "mock"
    }

    async fn answer(&self, request: &AiQuestion) -> Result<String, AiError> {
        self.questions.write().await.push(request.clone());

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let question = request.question.to_lowercase();
        if let Some((_, reply)) = self
            .replies
            .read()
            .await
            .iter()
            .find(|(needle, _)| question.contains(needle.as_str()))
        {
            return Ok(reply.clone());
        }

        self.default_reply
            .read()
            .await
            .clone()
            .ok_or(AiError::EmptyAnswer)
    }
}
