//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the collaborator traits
//! (job board page, AI, operator), so whole runs can be exercised without a
//! browser, an LLM or a human at the keyboard.
//!
//! # Example
//!
//! ```rust,ignore
//! use easyapply_core::testing::{fixtures, MockPage, ScriptedOperator};
//!
//! let page = MockPage::new();
//! page.set_search_results(vec![SearchPage {
//!     listings: vec![fixtures::listing("1", "Backend Engineer", "Acme")],
//!     has_more: false,
//! }]).await;
//! page.add_form("1", fixtures::single_page_form()).await;
//!
//! let operator = ScriptedOperator::with_resolutions(vec![PauseResolution::Submit]);
//! ```

mod mock_ai;
mod mock_operator;
mod mock_page;

pub use mock_ai::MockAi;
pub use mock_operator::ScriptedOperator;
pub use mock_page::MockPage;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::answers::FieldType;
    use crate::page::{FormField, FormPage};
    use crate::search::{GroupOverrides, JobListing, SearchGroup};

    /// Create an eligible Easy Apply listing with reasonable defaults.
    pub fn listing(id: &str, title: &str, company: &str) -> JobListing {
        JobListing {
            id: id.to_string(),
            title: title.to_string(),
            company: company.to_string(),
            location: "Remote".to_string(),
            posted: Some("1 hour ago".to_string()),
            description: format!(
                "{} is hiring a {} to build and operate services with a small team.",
                company, title
            ),
            recruiter: None,
            easy_apply: true,
            applicant_count: None,
        }
    }

    /// Create a search group with default overrides.
    pub fn group(id: &str, terms: &[&str]) -> SearchGroup {
        SearchGroup {
            id: id.to_string(),
            terms: terms.iter().map(|t| t.to_string()).collect(),
            location: None,
            category: None,
            overrides: GroupOverrides::default(),
        }
    }

    /// A required form field.
    pub fn field(id: &str, label: &str, field_type: FieldType) -> FormField {
        FormField {
            id: id.to_string(),
            label: label.to_string(),
            field_type,
            required: true,
            prefilled: None,
        }
    }

    /// A field the board has already filled in.
    pub fn prefilled_field(id: &str, label: &str, value: &str) -> FormField {
        FormField {
            prefilled: Some(value.to_string()),
            ..field(id, label, FieldType::ShortText)
        }
    }

    pub fn form_page(fields: Vec<FormField>, is_final: bool) -> FormPage {
        FormPage { fields, is_final }
    }

    /// A one-page form that needs no answers.
    pub fn single_page_form() -> Vec<FormPage> {
        vec![form_page(
            vec![prefilled_field("email", "Email address", "me@example.com")],
            true,
        )]
    }

    /// Options of a typical Yes/No select, placeholder included.
    pub fn yes_no() -> Vec<String> {
        vec![
            "Select an option".to_string(),
            "Yes".to_string(),
            "No".to_string(),
        ]
    }
}
