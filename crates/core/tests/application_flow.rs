//! Application state machine integration tests.
//!
//! These tests drive single listings through the form flow:
//! Opened -> Filling -> ReviewPending -> Submitted | Discarded | Failed

use std::sync::Arc;

use easyapply_core::{
    ai::AiCollaborator,
    answers::{AnswerCacheEntry, AnswerConfig, AnswerSource, AnswerValue, FieldType},
    application::{
        ApplicationConfig, ApplicationReport, ApplicationState, ApplicationStateMachine,
        PauseReason, ReviewReason,
    },
    page::{PageError, RetryPolicy},
    testing::{fixtures, MockAi, MockPage, ScriptedOperator},
    AnswerCache, OutcomeStatus, PauseResolution, QuestionEngine, SkipReason,
};

struct Flow {
    page: MockPage,
    operator: ScriptedOperator,
    engine: QuestionEngine,
    config: ApplicationConfig,
    cache: AnswerCache,
}

impl Flow {
    fn new(answers: AnswerConfig) -> Self {
        Self {
            page: MockPage::new(),
            operator: ScriptedOperator::new(),
            engine: QuestionEngine::new(answers),
            config: ApplicationConfig::default(),
            cache: AnswerCache::in_memory(),
        }
    }

    fn with_ai(mut self, ai: Arc<dyn AiCollaborator>) -> Self {
        self.engine = self.engine.with_ai(ai);
        self
    }

    async fn apply(&mut self, listing_id: &str) -> ApplicationReport {
        let listing = fixtures::listing(listing_id, "Backend Engineer", "Acme");
        let retry = RetryPolicy::none();
        let machine = ApplicationStateMachine::new(
            &self.page,
            &self.engine,
            &self.operator,
            &self.config,
            &retry,
        );
        machine.run(&listing, &mut self.cache).await
    }
}

fn yes_no_form() -> Vec<easyapply_core::page::FormPage> {
    vec![fixtures::form_page(
        vec![fixtures::field(
            "commute",
            "Are you comfortable commuting to the office?",
            FieldType::SingleSelect,
        )],
        true,
    )]
}

#[tokio::test]
async fn test_unanswerable_select_pauses_and_never_submits() {
    let mut flow = Flow::new(AnswerConfig::default());
    flow.page.add_form("1", yes_no_form()).await;
    flow.page.set_field_options("commute", fixtures::yes_no()).await;

    let report = flow.apply("1").await;

    assert!(report.trace.contains(&ApplicationState::ReviewPending {
        page: 0,
        reason: ReviewReason::ManualInput
    }));
    assert_eq!(report.state, ApplicationState::Discarded);
    assert_eq!(report.reason, Some(SkipReason::ManualDiscard));
    assert!(flow.page.submitted().await.is_empty());

    let requests = flow.operator.recorded_requests().await;
    assert_eq!(requests.len(), 1);
    match &requests[0].reason {
        PauseReason::ManualInput { options, .. } => assert_eq!(options, &fixtures::yes_no()),
        other => panic!("unexpected pause: {:?}", other),
    }
}

#[tokio::test]
async fn test_operator_answer_is_entered_and_remembered() {
    let mut flow = Flow::new(AnswerConfig::default());
    flow.page.add_form("1", yes_no_form()).await;
    flow.page.set_field_options("commute", fixtures::yes_no()).await;
    flow.operator
        .push(PauseResolution::Resume {
            answer: Some(AnswerValue::Text("Yes".to_string())),
        })
        .await;

    let report = flow.apply("1").await;
    assert_eq!(report.state, ApplicationState::Submitted);
    assert_eq!(report.answers.operator, 1);

    let entry = flow
        .cache
        .get("Are you comfortable commuting to the office?")
        .unwrap();
    assert_eq!(entry.source, AnswerSource::PreviousRun);

    // The next listing asking the same question is answered from the cache
    flow.page.add_form("2", yes_no_form()).await;
    let report = flow.apply("2").await;
    assert_eq!(report.state, ApplicationState::Submitted);
    assert_eq!(report.answers.cache, 1);
    assert_eq!(flow.operator.recorded_requests().await.len(), 1);
}

#[tokio::test]
async fn test_operator_answer_keeps_cached_entry_without_overwrite() {
    let mut flow = Flow::new(AnswerConfig::default());
    flow.cache.put(
        "Are you comfortable commuting to the office?",
        AnswerCacheEntry::new(
            FieldType::SingleSelect,
            AnswerValue::Text("Yes".to_string()),
            AnswerSource::PreviousRun,
        ),
        false,
    );
    flow.page.add_form("1", yes_no_form()).await;
    flow.page
        .set_field_options("commute", vec!["Oui".to_string(), "Non".to_string()])
        .await;
    flow.operator
        .push(PauseResolution::Resume {
            answer: Some(AnswerValue::Text("Oui".to_string())),
        })
        .await;

    let report = flow.apply("1").await;
    assert_eq!(report.state, ApplicationState::Submitted);
    assert_eq!(report.answers.operator, 1);
    assert_eq!(
        flow.page.entered_values().await[0].value,
        AnswerValue::Text("Oui".to_string())
    );

    let entry = flow
        .cache
        .get("Are you comfortable commuting to the office?")
        .unwrap();
    assert_eq!(entry.answer, AnswerValue::Text("Yes".to_string()));
}

#[tokio::test]
async fn test_pause_before_submit_discard() {
    let mut flow = Flow::new(AnswerConfig::default());
    flow.config.pause_before_submit = true;
    flow.page.add_form("1", fixtures::single_page_form()).await;
    flow.operator.push(PauseResolution::Discard).await;

    let report = flow.apply("1").await;

    assert_eq!(report.state, ApplicationState::Discarded);
    assert_eq!(report.status(), OutcomeStatus::Discarded);
    assert!(matches!(
        flow.operator.recorded_requests().await[0].reason,
        PauseReason::ConfirmSubmit
    ));
    assert_eq!(flow.page.discarded().await, vec!["1".to_string()]);
}

#[tokio::test]
async fn test_multi_page_form_with_rules() {
    let answers = AnswerConfig {
        years_of_experience: Some(4),
        notice_period_days: Some(30),
        ..Default::default()
    };
    let mut flow = Flow::new(answers);
    flow.page
        .add_form(
            "1",
            vec![
                fixtures::form_page(
                    vec![
                        fixtures::prefilled_field("email", "Email address", "me@example.com"),
                        fixtures::field("years", "Years of experience?", FieldType::ShortText),
                    ],
                    false,
                ),
                fixtures::form_page(
                    vec![fixtures::field(
                        "notice",
                        "What is your notice period in days?",
                        FieldType::ShortText,
                    )],
                    true,
                ),
            ],
        )
        .await;

    let report = flow.apply("1").await;

    assert_eq!(report.state, ApplicationState::Submitted);
    assert_eq!(report.pages, 2);
    assert_eq!(report.answers.rule, 2);
    assert_eq!(
        report.trace.first(),
        Some(&ApplicationState::Opened)
    );
    assert!(report.trace.contains(&ApplicationState::Filling { page: 1 }));

    let entered = flow.page.entered_values().await;
    assert_eq!(entered.len(), 2);
    assert_eq!(entered[0].field_id, "years");
    assert_eq!(entered[0].value, AnswerValue::Text("4".to_string()));
    assert_eq!(entered[1].value, AnswerValue::Text("30".to_string()));
}

#[tokio::test]
async fn test_missing_element_fails_listing() {
    let mut flow = Flow::new(AnswerConfig {
        years_of_experience: Some(4),
        ..Default::default()
    });
    flow.page
        .add_form(
            "1",
            vec![fixtures::form_page(
                vec![fixtures::field("years", "Years of experience?", FieldType::ShortText)],
                true,
            )],
        )
        .await;
    flow.page
        .fail_field("years", PageError::ElementNotFound("#years".to_string()))
        .await;

    let report = flow.apply("1").await;

    assert_eq!(report.state, ApplicationState::Failed);
    assert_eq!(report.reason, Some(SkipReason::FormError));
    assert!(report.escalation.is_none());
    assert!(report.detail.unwrap().contains("#years"));
    assert_eq!(flow.page.discarded().await, vec!["1".to_string()]);
}

#[tokio::test]
async fn test_endless_form_hits_page_limit() {
    let mut flow = Flow::new(AnswerConfig::default());
    flow.config.max_form_pages = 3;
    let pages = (0..5).map(|_| fixtures::form_page(vec![], false)).collect();
    flow.page.add_form("1", pages).await;

    let report = flow.apply("1").await;

    assert_eq!(report.state, ApplicationState::Failed);
    assert_eq!(report.pages, 3);
    assert!(flow.page.submitted().await.is_empty());
}

#[tokio::test]
async fn test_ai_answer_is_cached_for_next_listing() {
    let ai = Arc::new(MockAi::new());
    ai.set_reply("why do you want", "I enjoy building reliable backend systems.")
        .await;
    let mut flow = Flow::new(AnswerConfig::default()).with_ai(ai.clone());
    let form = || {
        vec![fixtures::form_page(
            vec![fixtures::field(
                "motivation",
                "Why do you want to work here?",
                FieldType::LongText,
            )],
            true,
        )]
    };
    flow.page.add_form("1", form()).await;
    flow.page.add_form("2", form()).await;

    let first = flow.apply("1").await;
    let second = flow.apply("2").await;

    assert_eq!(first.answers.ai, 1);
    assert_eq!(second.answers.cache, 1);
    assert_eq!(ai.recorded_questions().await.len(), 1);
    assert_eq!(
        flow.cache.get("Why do you want to work here?").unwrap().source,
        AnswerSource::AiGenerated
    );
}
