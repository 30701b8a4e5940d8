//! Page collaborator that replays recorded search results and forms.
//!
//! Used by the command line for dry runs: the fixture describes what the
//! board returns for each search term and what each Easy Apply form looks
//! like, and the replay validates entered values against offered options.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::{Advance, FormField, FormHandle, FormPage, PageCollaborator, PageError};
use crate::answers::AnswerValue;
use crate::search::{JobListing, SearchPage, SearchRequest, TimeFilter};

/// Recorded results for one search term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaySearch {
    pub term: String,
    /// Only serve these pages for this bound; `None` serves any bound.
    #[serde(default)]
    pub time_filter: Option<TimeFilter>,
    #[serde(default)]
    pub pages: Vec<SearchPage>,
}

/// The whole replay document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayFixture {
    #[serde(default)]
    pub searches: Vec<ReplaySearch>,
    /// Form pages per listing id.
    #[serde(default)]
    pub forms: HashMap<String, Vec<FormPage>>,
    /// Offered options per field id.
    #[serde(default)]
    pub field_options: HashMap<String, Vec<String>>,
}

#[derive(Debug, Default)]
struct ReplayState {
    entered: Vec<(String, String, AnswerValue)>,
    submitted: Vec<String>,
    discarded: Vec<String>,
}

pub struct ReplayPage {
    fixture: ReplayFixture,
    state: Mutex<ReplayState>,
}

impl ReplayPage {
    pub fn new(fixture: ReplayFixture) -> Self {
        Self {
            fixture,
            state: Mutex::new(ReplayState::default()),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Listing ids whose application was submitted.
    pub async fn submitted(&self) -> Vec<String> {
        self.state.lock().await.submitted.clone()
    }

    pub async fn discarded(&self) -> Vec<String> {
        self.state.lock().await.discarded.clone()
    }

    /// Every value entered, as (listing id, field id, value).
    pub async fn entered_values(&self) -> Vec<(String, String, AnswerValue)> {
        self.state.lock().await.entered.clone()
    }

    fn find_search(&self, request: &SearchRequest) -> Option<&ReplaySearch> {
        let matches_term = |s: &&ReplaySearch| s.term.eq_ignore_ascii_case(&request.term);
        self.fixture
            .searches
            .iter()
            .filter(matches_term)
            .find(|s| s.time_filter == Some(request.time_filter))
            .or_else(|| {
                self.fixture
                    .searches
                    .iter()
                    .filter(matches_term)
                    .find(|s| s.time_filter.is_none())
            })
    }

    fn form_page(&self, form: &FormHandle) -> Result<&FormPage, PageError> {
        self.fixture
            .forms
            .get(&form.listing_id)
            .and_then(|pages| pages.get(form.page_index as usize))
            .ok_or_else(|| {
                PageError::ElementNotFound(format!(
                    "form page {} of listing {}",
                    form.page_index, form.listing_id
                ))
            })
    }
}

#[async_trait]
impl PageCollaborator for ReplayPage {
    fn name(&self) -> &str {
        "replay"
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, PageError> {
        let page = self
            .find_search(request)
            .and_then(|s| s.pages.get(request.page as usize))
            .cloned()
            .unwrap_or_default();
        debug!(
            term = %request.term,
            time_filter = %request.time_filter,
            page = request.page,
            results = page.listings.len(),
            "Replayed search"
        );
        Ok(page)
    }

    async fn open_application(&self, listing: &JobListing) -> Result<FormHandle, PageError> {
        if !self.fixture.forms.contains_key(&listing.id) {
            return Err(PageError::ElementNotFound(format!(
                "Easy Apply button for listing {}",
                listing.id
            )));
        }
        Ok(FormHandle::new(&listing.id))
    }

    async fn current_page(&self, form: &FormHandle) -> Result<FormPage, PageError> {
        self.form_page(form).cloned()
    }

    async fn field_options(
        &self,
        _form: &FormHandle,
        field: &FormField,
    ) -> Result<Vec<String>, PageError> {
        Ok(self
            .fixture
            .field_options
            .get(&field.id)
            .cloned()
            .unwrap_or_default())
    }

    async fn submit_field(
        &self,
        form: &FormHandle,
        field: &FormField,
        value: &AnswerValue,
    ) -> Result<(), PageError> {
        let page = self.form_page(form)?;
        if !page.fields.iter().any(|f| f.id == field.id) {
            return Err(PageError::ElementNotFound(format!("field {}", field.id)));
        }

        if let Some(options) = self.fixture.field_options.get(&field.id) {
            let values: Vec<String> = match value {
                AnswerValue::Text(text) => vec![text.clone()],
                AnswerValue::Choices(choices) => choices.clone(),
            };
            if let Some(bad) = values.iter().find(|v| !options.contains(v)) {
                return Err(PageError::Validation(format!(
                    "'{}' is not an option of {}",
                    bad, field.id
                )));
            }
        }

        self.state.lock().await.entered.push((
            form.listing_id.clone(),
            field.id.clone(),
            value.clone(),
        ));
        Ok(())
    }

    async fn advance(&self, form: &mut FormHandle) -> Result<Advance, PageError> {
        if self.form_page(form)?.is_final {
            self.state.lock().await.submitted.push(form.listing_id.clone());
            return Ok(Advance::Submitted);
        }
        form.page_index += 1;
        self.form_page(form)?;
        Ok(Advance::NextPage)
    }

    async fn discard(&self, form: &FormHandle) -> Result<(), PageError> {
        self.state.lock().await.discarded.push(form.listing_id.clone());
        Ok(())
    }
}
