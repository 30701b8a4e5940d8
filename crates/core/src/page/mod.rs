//! Boundary to the job board page.
//!
//! Everything that touches the board (searching, opening the Easy Apply
//! modal, filling fields, paging through the form) goes through
//! [`PageCollaborator`]. The core never scrapes or drives a browser itself.

mod replay;
mod retry;

pub use replay::{ReplayFixture, ReplayPage, ReplaySearch};
pub use retry::{with_retry, RetryPolicy};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::answers::{AnswerValue, FieldType};
use crate::search::{JobListing, SearchPage, SearchRequest};

/// Errors surfaced by the page collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageError {
    /// Transient load or network failure. Retried.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Expected element missing from the page.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// The board rejected a submitted value.
    #[error("form rejected input: {0}")]
    Validation(String),

    /// Captcha, security check or rate limit.
    #[error("blocked by {kind}")]
    Blocked { kind: String },

    /// Browser closed or authentication lost.
    #[error("browser session lost: {0}")]
    SessionLost(String),
}

impl PageError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PageError::Navigation(_))
    }

    /// Errors that make further work in the current group pointless.
    pub fn is_escalation(&self) -> bool {
        matches!(self, PageError::Blocked { .. } | PageError::SessionLost(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PageError::Navigation(_) => "navigation",
            PageError::ElementNotFound(_) => "element_not_found",
            PageError::Validation(_) => "validation",
            PageError::Blocked { .. } => "blocked",
            PageError::SessionLost(_) => "session_lost",
        }
    }
}

/// One input on an application form page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub id: String,
    /// Visible question text.
    pub label: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    /// Value the board already filled in (e.g. account email).
    #[serde(default)]
    pub prefilled: Option<String>,
}

/// A page of the application form, fields in presented order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormPage {
    pub fields: Vec<FormField>,
    /// Advancing from this page submits the application.
    #[serde(default)]
    pub is_final: bool,
}

/// An open application form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormHandle {
    pub listing_id: String,
    pub page_index: u32,
}

impl FormHandle {
    pub fn new(listing_id: impl Into<String>) -> Self {
        Self {
            listing_id: listing_id.into(),
            page_index: 0,
        }
    }
}

/// Result of advancing past a form page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    NextPage,
    Submitted,
}

/// The job board as seen by the core.
#[async_trait]
pub trait PageCollaborator: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch one page of search results.
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, PageError>;

    /// Open the Easy Apply form of a listing.
    async fn open_application(&self, listing: &JobListing) -> Result<FormHandle, PageError>;

    /// Describe the current form page.
    async fn current_page(&self, form: &FormHandle) -> Result<FormPage, PageError>;

    /// Options offered by a select, radio or checkbox field.
    async fn field_options(
        &self,
        form: &FormHandle,
        field: &FormField,
    ) -> Result<Vec<String>, PageError>;

    /// Enter a value into a field.
    async fn submit_field(
        &self,
        form: &FormHandle,
        field: &FormField,
        value: &AnswerValue,
    ) -> Result<(), PageError>;

    /// Move past the current page; on the final page this submits.
    async fn advance(&self, form: &mut FormHandle) -> Result<Advance, PageError>;

    /// Close the form without submitting.
    async fn discard(&self, form: &FormHandle) -> Result<(), PageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_navigation_is_retryable() {
        assert!(PageError::Navigation("timeout".into()).is_retryable());
        assert!(!PageError::ElementNotFound("#submit".into()).is_retryable());
        assert!(!PageError::Blocked { kind: "captcha".into() }.is_retryable());
        assert!(!PageError::SessionLost("closed".into()).is_retryable());
    }

    #[test]
    fn test_escalations() {
        assert!(PageError::Blocked { kind: "cloudflare".into() }.is_escalation());
        assert!(PageError::SessionLost("logged out".into()).is_escalation());
        assert!(!PageError::Validation("bad phone".into()).is_escalation());
    }

    #[test]
    fn test_form_page_from_json() {
        let page: FormPage = serde_json::from_str(
            r#"{"fields": [{"id": "q1", "label": "Phone", "field_type": "text", "required": true}]}"#,
        )
        .unwrap();
        assert!(!page.is_final);
        assert_eq!(page.fields[0].field_type, FieldType::ShortText);
        assert!(page.fields[0].prefilled.is_none());
    }
}
