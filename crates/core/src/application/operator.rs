//! Explicit pause/resume interface between the state machine and a human.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::answers::{AnswerValue, FieldType};

/// Why the application paused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PauseReason {
    /// A field could not be answered automatically.
    ManualInput {
        question: String,
        field_type: FieldType,
        options: Vec<String>,
        detail: String,
    },
    /// The form is complete and waits for confirmation before submitting.
    ConfirmSubmit,
}

/// Everything an operator needs to decide how to continue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseRequest {
    pub listing_id: String,
    pub title: String,
    pub company: String,
    pub page_index: u32,
    pub reason: PauseReason,
}

/// The operator's decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PauseResolution {
    /// Continue. For a manual-input pause, `answer` is entered into the field
    /// (and remembered); `None` means the operator filled it on the page.
    Resume { answer: Option<AnswerValue> },
    /// Submit now. Same as `Resume { answer: None }` for manual-input pauses.
    Submit,
    /// Close this form without submitting and move on.
    Discard,
    /// Close this form and stop the run at the next listing boundary.
    Cancel,
}

/// Source of pause resolutions (console, UI, scripted test double).
#[async_trait]
pub trait Operator: Send + Sync {
    async fn resolve(&self, request: &PauseRequest) -> PauseResolution;
}

/// Operator that discards every paused application.
///
/// Used for unattended runs: nothing is ever submitted on a guess.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardingOperator;

#[async_trait]
impl Operator for DiscardingOperator {
    async fn resolve(&self, request: &PauseRequest) -> PauseResolution {
        tracing::info!(
            listing_id = %request.listing_id,
            "No operator attached, discarding paused application"
        );
        PauseResolution::Discard
    }
}
