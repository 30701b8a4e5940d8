//! Per-listing application state machine.
//!
//! ```text
//! Opened -> Filling(page) -> ReviewPending -> Submitted
//!              |    ^             |
//!              |    +-- resume ---+--------> Discarded
//!              +--------------------------> Failed
//! ```
//!
//! A field the engine cannot answer moves the machine to `ReviewPending`
//! early and waits for the operator. Nothing is ever submitted on a guess.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{ApplicationConfig, Operator, PauseReason, PauseRequest, PauseResolution};
use crate::answers::{AnswerCache, Question, QuestionEngine, Resolution, ResolvedBy};
use crate::outcome::{ApplicationOutcome, OutcomeStatus, SkipReason};
use crate::page::{with_retry, Advance, FormHandle, FormPage, PageCollaborator, PageError, RetryPolicy};
use crate::search::JobListing;

/// Why the machine is waiting in `ReviewPending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewReason {
    ManualInput,
    ConfirmSubmit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ApplicationState {
    Opened,
    Filling { page: u32 },
    ReviewPending { page: u32, reason: ReviewReason },
    Submitted,
    Discarded,
    Failed,
}

impl ApplicationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApplicationState::Submitted | ApplicationState::Discarded | ApplicationState::Failed
        )
    }
}

/// How the fields of one application were answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerTally {
    pub cache: u32,
    pub rule: u32,
    pub ai: u32,
    pub default_option: u32,
    pub operator: u32,
}

impl AnswerTally {
    pub fn record(&mut self, by: ResolvedBy) {
        match by {
            ResolvedBy::Cache => self.cache += 1,
            ResolvedBy::Rule => self.rule += 1,
            ResolvedBy::Ai => self.ai += 1,
            ResolvedBy::DefaultOption => self.default_option += 1,
            ResolvedBy::Operator => self.operator += 1,
        }
    }

    pub fn merge(&mut self, other: &AnswerTally) {
        self.cache += other.cache;
        self.rule += other.rule;
        self.ai += other.ai;
        self.default_option += other.default_option;
        self.operator += other.operator;
    }

    pub fn total(&self) -> u32 {
        self.cache + self.rule + self.ai + self.default_option + self.operator
    }
}

/// Result of driving one listing through the machine.
#[derive(Debug, Clone)]
pub struct ApplicationReport {
    /// Terminal state.
    pub state: ApplicationState,
    /// Every state entered, in order, ending with `state`.
    pub trace: Vec<ApplicationState>,
    pub reason: Option<SkipReason>,
    pub detail: Option<String>,
    /// Blocked/session errors the orchestrator must act on.
    pub escalation: Option<PageError>,
    /// The operator asked to stop the run.
    pub cancel_requested: bool,
    /// Form pages completed.
    pub pages: u32,
    pub answers: AnswerTally,
}

impl ApplicationReport {
    fn new() -> Self {
        Self {
            state: ApplicationState::Opened,
            trace: Vec::new(),
            reason: None,
            detail: None,
            escalation: None,
            cancel_requested: false,
            pages: 0,
            answers: AnswerTally::default(),
        }
    }

    fn enter(&mut self, state: ApplicationState) {
        self.state = state;
        self.trace.push(state);
    }

    pub fn status(&self) -> OutcomeStatus {
        match self.state {
            ApplicationState::Submitted => OutcomeStatus::Applied,
            ApplicationState::Discarded => OutcomeStatus::Discarded,
            _ => OutcomeStatus::Failed,
        }
    }

    pub fn to_outcome(&self, run_id: &str, group_id: &str, listing: &JobListing) -> ApplicationOutcome {
        let mut outcome = ApplicationOutcome::new(run_id, group_id, listing, self.status(), self.reason);
        outcome.detail = self.detail.clone();
        outcome
    }
}

enum Fill {
    Completed,
    Discard,
    Cancel,
}

pub struct ApplicationStateMachine<'a> {
    page: &'a dyn PageCollaborator,
    engine: &'a QuestionEngine,
    operator: &'a dyn Operator,
    config: &'a ApplicationConfig,
    retry: &'a RetryPolicy,
}

impl<'a> ApplicationStateMachine<'a> {
    pub fn new(
        page: &'a dyn PageCollaborator,
        engine: &'a QuestionEngine,
        operator: &'a dyn Operator,
        config: &'a ApplicationConfig,
        retry: &'a RetryPolicy,
    ) -> Self {
        Self {
            page,
            engine,
            operator,
            config,
            retry,
        }
    }

    /// Drive one eligible listing to a terminal state.
    pub async fn run(&self, listing: &JobListing, cache: &mut AnswerCache) -> ApplicationReport {
        let mut report = ApplicationReport::new();
        debug!(listing_id = %listing.id, "Opening application");

        let mut form = match with_retry(self.retry, "open_application", || {
            self.page.open_application(listing)
        })
        .await
        {
            Ok(form) => form,
            Err(e) => return self.fail(report, None, e).await,
        };
        report.enter(ApplicationState::Opened);

        for _ in 0..self.config.max_form_pages {
            let page_index = form.page_index;
            report.enter(ApplicationState::Filling { page: page_index });

            let page = match with_retry(self.retry, "current_page", || self.page.current_page(&form)).await {
                Ok(page) => page,
                Err(e) => return self.fail(report, Some(&form), e).await,
            };

            match self.fill_page(&form, &page, listing, cache, &mut report).await {
                Ok(Fill::Completed) => {}
                Ok(Fill::Discard) => return self.discard(report, &form).await,
                Ok(Fill::Cancel) => {
                    report.cancel_requested = true;
                    return self.discard(report, &form).await;
                }
                Err(e) => return self.fail(report, Some(&form), e).await,
            }
            report.pages += 1;

            if page.is_final {
                report.enter(ApplicationState::ReviewPending {
                    page: page_index,
                    reason: ReviewReason::ConfirmSubmit,
                });
                if self.config.pause_before_submit {
                    match self.pause(listing, page_index, PauseReason::ConfirmSubmit).await {
                        PauseResolution::Resume { .. } | PauseResolution::Submit => {}
                        PauseResolution::Discard => return self.discard(report, &form).await,
                        PauseResolution::Cancel => {
                            report.cancel_requested = true;
                            return self.discard(report, &form).await;
                        }
                    }
                }
            }

            // Submission is never retried: a timeout may still have gone through.
            match self.page.advance(&mut form).await {
                Ok(Advance::Submitted) => {
                    report.enter(ApplicationState::Submitted);
                    info!(
                        listing_id = %listing.id,
                        company = %listing.company,
                        pages = report.pages,
                        "Application submitted"
                    );
                    return report;
                }
                Ok(Advance::NextPage) => {}
                Err(e) => return self.fail(report, Some(&form), e).await,
            }
        }

        let detail = format!("form exceeded {} pages", self.config.max_form_pages);
        self.finish_failed(report, Some(&form), detail, None).await
    }

    async fn fill_page(
        &self,
        form: &FormHandle,
        page: &FormPage,
        listing: &JobListing,
        cache: &mut AnswerCache,
        report: &mut ApplicationReport,
    ) -> Result<Fill, PageError> {
        for field in &page.fields {
            let prefilled = field
                .prefilled
                .as_deref()
                .is_some_and(|value| !value.trim().is_empty());
            if self.config.skip_prefilled && prefilled {
                debug!(field = %field.id, "Keeping prefilled value");
                continue;
            }

            let options = if field.field_type.has_options() {
                with_retry(self.retry, "field_options", || self.page.field_options(form, field)).await?
            } else {
                Vec::new()
            };
            let question = Question::new(field.label.clone(), field.field_type).with_options(options);

            let value = match self.engine.resolve(cache, &question, listing).await {
                Resolution::Answered { value, by } => {
                    report.answers.record(by);
                    debug!(field = %field.id, by = by.as_str(), "Answered field");
                    value
                }
                Resolution::RequiresManualInput { reason } => {
                    report.enter(ApplicationState::ReviewPending {
                        page: form.page_index,
                        reason: ReviewReason::ManualInput,
                    });
                    let pause = PauseReason::ManualInput {
                        question: field.label.clone(),
                        field_type: field.field_type,
                        options: question.options.clone(),
                        detail: reason,
                    };
                    match self.pause(listing, form.page_index, pause).await {
                        PauseResolution::Resume { answer: Some(value) } => {
                            self.engine.remember_manual(cache, &question, &value);
                            report.answers.record(ResolvedBy::Operator);
                            report.enter(ApplicationState::Filling {
                                page: form.page_index,
                            });
                            value
                        }
                        PauseResolution::Resume { answer: None } | PauseResolution::Submit => {
                            report.enter(ApplicationState::Filling {
                                page: form.page_index,
                            });
                            continue;
                        }
                        PauseResolution::Discard => return Ok(Fill::Discard),
                        PauseResolution::Cancel => return Ok(Fill::Cancel),
                    }
                }
            };

            with_retry(self.retry, "submit_field", || {
                self.page.submit_field(form, field, &value)
            })
            .await?;
        }

        Ok(Fill::Completed)
    }

    async fn pause(&self, listing: &JobListing, page_index: u32, reason: PauseReason) -> PauseResolution {
        let request = PauseRequest {
            listing_id: listing.id.clone(),
            title: listing.title.clone(),
            company: listing.company.clone(),
            page_index,
            reason,
        };
        info!(listing_id = %listing.id, page = page_index, "Waiting for operator");

        match self.config.pause_timeout() {
            Some(timeout) => {
                match tokio::time::timeout(timeout, self.operator.resolve(&request)).await {
                    Ok(resolution) => resolution,
                    Err(_) => {
                        warn!(
                            listing_id = %listing.id,
                            timeout_secs = timeout.as_secs(),
                            "Operator did not respond, discarding application"
                        );
                        PauseResolution::Discard
                    }
                }
            }
            None => self.operator.resolve(&request).await,
        }
    }

    async fn discard(&self, mut report: ApplicationReport, form: &FormHandle) -> ApplicationReport {
        if let Err(e) = self.page.discard(form).await {
            warn!(listing_id = %form.listing_id, "Failed to close discarded form: {}", e);
        }
        report.reason = Some(SkipReason::ManualDiscard);
        report.enter(ApplicationState::Discarded);
        info!(listing_id = %form.listing_id, "Application discarded");
        report
    }

    async fn fail(
        &self,
        report: ApplicationReport,
        form: Option<&FormHandle>,
        error: PageError,
    ) -> ApplicationReport {
        let detail = error.to_string();
        let escalation = error.is_escalation().then_some(error);
        self.finish_failed(report, form, detail, escalation).await
    }

    async fn finish_failed(
        &self,
        mut report: ApplicationReport,
        form: Option<&FormHandle>,
        detail: String,
        escalation: Option<PageError>,
    ) -> ApplicationReport {
        if let (Some(form), None) = (form, &escalation) {
            if let Err(e) = self.page.discard(form).await {
                debug!(listing_id = %form.listing_id, "Failed to close broken form: {}", e);
            }
        }
        warn!(
            listing_id = form.map(|f| f.listing_id.as_str()).unwrap_or_default(),
            "Application failed: {}",
            detail
        );
        report.reason = Some(SkipReason::FormError);
        report.detail = Some(detail);
        report.escalation = escalation;
        report.enter(ApplicationState::Failed);
        report
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::answers::AnswerConfig;
    use crate::testing::{fixtures, MockPage, ScriptedOperator};

    /// Operator that never answers.
    struct AbsentOperator;

    #[async_trait]
    impl Operator for AbsentOperator {
        async fn resolve(&self, _request: &PauseRequest) -> PauseResolution {
            std::future::pending().await
        }
    }

    async fn run_with(
        page: &MockPage,
        operator: &dyn Operator,
        config: &ApplicationConfig,
    ) -> ApplicationReport {
        let engine = QuestionEngine::new(AnswerConfig::default());
        let retry = RetryPolicy::none();
        let mut cache = AnswerCache::in_memory();
        let listing = fixtures::listing("1", "Backend Engineer", "Acme");
        ApplicationStateMachine::new(page, &engine, operator, config, &retry)
            .run(&listing, &mut cache)
            .await
    }

    #[tokio::test]
    async fn test_auto_submit_without_pause() {
        let page = MockPage::new();
        page.add_form("1", fixtures::single_page_form()).await;

        let report = run_with(&page, &ScriptedOperator::new(), &ApplicationConfig::default()).await;

        assert_eq!(
            report.trace,
            vec![
                ApplicationState::Opened,
                ApplicationState::Filling { page: 0 },
                ApplicationState::ReviewPending {
                    page: 0,
                    reason: ReviewReason::ConfirmSubmit
                },
                ApplicationState::Submitted,
            ]
        );
        assert_eq!(report.status(), OutcomeStatus::Applied);
        assert!(report.reason.is_none());
    }

    #[tokio::test]
    async fn test_safe_mode_timeout_discards() {
        let page = MockPage::new();
        page.add_form("1", fixtures::single_page_form()).await;
        let config = ApplicationConfig {
            pause_before_submit: true,
            safe_mode: true,
            manual_pause_timeout_secs: Some(1),
            ..Default::default()
        };

        let report = run_with(&page, &AbsentOperator, &config).await;

        assert_eq!(report.state, ApplicationState::Discarded);
        assert!(page.submitted().await.is_empty());
    }

    #[tokio::test]
    async fn test_resume_without_answer_skips_field() {
        let page = MockPage::new();
        page.add_form(
            "1",
            vec![fixtures::form_page(
                vec![fixtures::field(
                    "why",
                    "Describe a project you are proud of",
                    crate::answers::FieldType::LongText,
                )],
                true,
            )],
        )
        .await;
        let operator =
            ScriptedOperator::with_resolutions(vec![PauseResolution::Resume { answer: None }]);

        let report = run_with(&page, &operator, &ApplicationConfig::default()).await;

        assert_eq!(report.state, ApplicationState::Submitted);
        assert!(page.entered_values().await.is_empty());
        assert_eq!(report.answers.total(), 0);
    }

    #[tokio::test]
    async fn test_operator_cancel_discards_and_flags() {
        let page = MockPage::new();
        page.add_form("1", fixtures::single_page_form()).await;
        let config = ApplicationConfig {
            pause_before_submit: true,
            ..Default::default()
        };
        let operator = ScriptedOperator::with_resolutions(vec![PauseResolution::Cancel]);

        let report = run_with(&page, &operator, &config).await;

        assert_eq!(report.state, ApplicationState::Discarded);
        assert!(report.cancel_requested);
        assert_eq!(page.discarded().await, vec!["1".to_string()]);
    }

    #[tokio::test]
    async fn test_blocked_open_escalates() {
        let page = MockPage::new();
        page.add_form("1", fixtures::single_page_form()).await;
        page.fail_open(
            "1",
            PageError::Blocked {
                kind: "captcha".to_string(),
            },
        )
        .await;

        let report = run_with(&page, &ScriptedOperator::new(), &ApplicationConfig::default()).await;

        assert_eq!(report.state, ApplicationState::Failed);
        assert_eq!(report.trace, vec![ApplicationState::Failed]);
        assert!(matches!(report.escalation, Some(PageError::Blocked { .. })));
        assert!(page.discarded().await.is_empty());
    }

    #[test]
    fn test_answer_tally_merge() {
        let mut total = AnswerTally::default();
        let mut one = AnswerTally::default();
        one.record(ResolvedBy::Rule);
        one.record(ResolvedBy::Ai);
        total.merge(&one);
        total.merge(&one);
        assert_eq!(total.rule, 2);
        assert_eq!(total.total(), 4);
    }
}
