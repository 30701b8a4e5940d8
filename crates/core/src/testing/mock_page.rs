//! Mock job board page for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::answers::AnswerValue;
use crate::page::{Advance, FormField, FormHandle, FormPage, PageCollaborator, PageError};
use crate::search::{JobListing, SearchPage, SearchRequest};

/// A search handler that produces a result page for each request.
type SearchHandler = Box<dyn Fn(&SearchRequest) -> SearchPage + Send + Sync>;

/// A value entered into a form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnteredValue {
    pub listing_id: String,
    pub field_id: String,
    pub value: AnswerValue,
}

/// Mock implementation of the PageCollaborator trait.
///
/// Provides controllable behavior for testing:
/// - Search results per result page, or computed per request
/// - Multi-page forms per listing, with options per field
/// - Injected failures for searches, form opening, fields and submission
/// - Recorded searches, entered values, submissions and discards
pub struct MockPage {
    /// Result pages indexed by `SearchRequest::page`.
    pages: Arc<RwLock<Vec<SearchPage>>>,
    search_handler: Arc<RwLock<Option<SearchHandler>>>,
    /// Errors returned by the next searches, in order.
    search_errors: Arc<RwLock<VecDeque<PageError>>>,
    forms: Arc<RwLock<HashMap<String, Vec<FormPage>>>>,
    field_options: Arc<RwLock<HashMap<String, Vec<String>>>>,
    open_errors: Arc<RwLock<HashMap<String, PageError>>>,
    field_errors: Arc<RwLock<HashMap<String, PageError>>>,
    advance_errors: Arc<RwLock<HashMap<String, PageError>>>,

    searches: Arc<RwLock<Vec<SearchRequest>>>,
    entered: Arc<RwLock<Vec<EnteredValue>>>,
    submitted: Arc<RwLock<Vec<String>>>,
    discarded: Arc<RwLock<Vec<String>>>,
}

impl std::fmt::Debug for MockPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPage")
            .field("pages", &"<pages>")
            .field("search_handler", &"<handler>")
            .field("forms", &"<forms>")
            .finish()
    }
}

impl Default for MockPage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPage {
    /// Create a mock page with no listings and no forms.
    pub fn new() -> Self {
        Self {
            pages: Arc::new(RwLock::new(Vec::new())),
            search_handler: Arc::new(RwLock::new(None)),
            search_errors: Arc::new(RwLock::new(VecDeque::new())),
            forms: Arc::new(RwLock::new(HashMap::new())),
            field_options: Arc::new(RwLock::new(HashMap::new())),
            open_errors: Arc::new(RwLock::new(HashMap::new())),
            field_errors: Arc::new(RwLock::new(HashMap::new())),
            advance_errors: Arc::new(RwLock::new(HashMap::new())),
            searches: Arc::new(RwLock::new(Vec::new())),
            entered: Arc::new(RwLock::new(Vec::new())),
            submitted: Arc::new(RwLock::new(Vec::new())),
            discarded: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Result pages returned for every term and time filter, by page index.
    pub async fn set_search_results(&self, pages: Vec<SearchPage>) {
        *self.pages.write().await = pages;
    }

    /// Compute results per request. Takes precedence over `set_search_results`.
    pub async fn set_search_handler<F>(&self, handler: F)
    where
        F: Fn(&SearchRequest) -> SearchPage + Send + Sync + 'static,
    {
        *self.search_handler.write().await = Some(Box::new(handler));
    }

    /// Fail the next search with `error`. Queued errors are consumed in order.
    pub async fn push_search_error(&self, error: PageError) {
        self.search_errors.write().await.push_back(error);
    }

    pub async fn add_form(&self, listing_id: &str, pages: Vec<FormPage>) {
        self.forms.write().await.insert(listing_id.to_string(), pages);
    }

    pub async fn set_field_options(&self, field_id: &str, options: Vec<String>) {
        self.field_options
            .write()
            .await
            .insert(field_id.to_string(), options);
    }

    /// Opening the form of `listing_id` always fails with `error`.
    pub async fn fail_open(&self, listing_id: &str, error: PageError) {
        self.open_errors.write().await.insert(listing_id.to_string(), error);
    }

    /// Entering a value into `field_id` always fails with `error`.
    pub async fn fail_field(&self, field_id: &str, error: PageError) {
        self.field_errors.write().await.insert(field_id.to_string(), error);
    }

    /// Advancing the form of `listing_id` always fails with `error`.
    pub async fn fail_advance(&self, listing_id: &str, error: PageError) {
        self.advance_errors
            .write()
            .await
            .insert(listing_id.to_string(), error);
    }

    /// Get recorded search requests.
    pub async fn searches(&self) -> Vec<SearchRequest> {
        self.searches.read().await.clone()
    }

    pub async fn entered_values(&self) -> Vec<EnteredValue> {
        self.entered.read().await.clone()
    }

    /// Listing ids whose application was submitted, in order.
    pub async fn submitted(&self) -> Vec<String> {
        self.submitted.read().await.clone()
    }

    pub async fn discarded(&self) -> Vec<String> {
        self.discarded.read().await.clone()
    }

    async fn page_of(&self, form: &FormHandle) -> Result<FormPage, PageError> {
        self.forms
            .read()
            .await
            .get(&form.listing_id)
            .and_then(|pages| pages.get(form.page_index as usize))
            .cloned()
            .ok_or_else(|| {
                PageError::ElementNotFound(format!(
                    "form page {} of listing {}",
                    form.page_index, form.listing_id
                ))
            })
    }
}

#[async_trait]
impl PageCollaborator for MockPage {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, PageError> {
        self.searches.write().await.push(request.clone());

        if let Some(error) = self.search_errors.write().await.pop_front() {
            return Err(error);
        }

        if let Some(handler) = self.search_handler.read().await.as_ref() {
            return Ok(handler(request));
        }

        Ok(self
            .pages
            .read()
            .await
            .get(request.page as usize)
            .cloned()
            .unwrap_or_default())
    }

    async fn open_application(&self, listing: &JobListing) -> Result<FormHandle, PageError> {
        if let Some(error) = self.open_errors.read().await.get(&listing.id) {
            return Err(error.clone());
        }
        if !self.forms.read().await.contains_key(&listing.id) {
            return Err(PageError::ElementNotFound(format!(
                "Easy Apply button for listing {}",
                listing.id
            )));
        }
        Ok(FormHandle::new(listing.id.clone()))
    }

    async fn current_page(&self, form: &FormHandle) -> Result<FormPage, PageError> {
        self.page_of(form).await
    }

    async fn field_options(
        &self,
        _form: &FormHandle,
        field: &FormField,
    ) -> Result<Vec<String>, PageError> {
        Ok(self
            .field_options
            .read()
            .await
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
        if let Some(error) = self.field_errors.read().await.get(&field.id) {
            return Err(error.clone());
        }
        self.entered.write().await.push(EnteredValue {
            listing_id: form.listing_id.clone(),
            field_id: field.id.clone(),
            value: value.clone(),
        });
        Ok(())
    }

    async fn advance(&self, form: &mut FormHandle) -> Result<Advance, PageError> {
        if let Some(error) = self.advance_errors.read().await.get(&form.listing_id) {
            return Err(error.clone());
        }
        let page = self.page_of(form).await?;
        if page.is_final {
            self.submitted.write().await.push(form.listing_id.clone());
            Ok(Advance::Submitted)
        } else {
            form.page_index += 1;
            Ok(Advance::NextPage)
        }
    }

    async fn discard(&self, form: &FormHandle) -> Result<(), PageError> {
        self.discarded.write().await.push(form.listing_id.clone());
        Ok(())
    }
}
