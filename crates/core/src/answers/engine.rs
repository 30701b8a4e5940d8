//! Resolution pipeline for a single form question.
//!
//! Order: cache (unless overwriting), configuration rules, configured default
//! option (option fields only), AI collaborator. Anything still unresolved is
//! handed to the operator as [`Resolution::RequiresManualInput`]; the engine
//! never errors.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    answer_by_rule, choose_option, choose_options, is_placeholder, AnswerCache, AnswerCacheEntry,
    AnswerConfig, AnswerSource, AnswerValue, FieldType,
};
use crate::ai::{AiCollaborator, AiQuestion};
use crate::metrics;
use crate::search::JobListing;

/// A form question as presented to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub field_type: FieldType,
    /// Offered options for select/radio/checkbox fields, in page order.
    #[serde(default)]
    pub options: Vec<String>,
}

impl Question {
    pub fn new(text: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            text: text.into(),
            field_type,
            options: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    fn real_options(&self) -> impl Iterator<Item = &String> {
        self.options.iter().filter(|o| !is_placeholder(o))
    }
}

/// Which stage produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedBy {
    Cache,
    Rule,
    Ai,
    DefaultOption,
    Operator,
}

impl ResolvedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolvedBy::Cache => "cache",
            ResolvedBy::Rule => "rule",
            ResolvedBy::Ai => "ai",
            ResolvedBy::DefaultOption => "default_option",
            ResolvedBy::Operator => "operator",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Answered { value: AnswerValue, by: ResolvedBy },
    RequiresManualInput { reason: String },
}

pub struct QuestionEngine {
    config: AnswerConfig,
    ai: Option<Arc<dyn AiCollaborator>>,
}

impl QuestionEngine {
    pub fn new(config: AnswerConfig) -> Self {
        Self { config, ai: None }
    }

    /// Enable the AI fallback.
    pub fn with_ai(mut self, ai: Arc<dyn AiCollaborator>) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn config(&self) -> &AnswerConfig {
        &self.config
    }

    pub fn has_ai(&self) -> bool {
        self.ai.is_some()
    }

    /// Resolve one question, writing newly derived answers back to the cache.
    pub async fn resolve(
        &self,
        cache: &mut AnswerCache,
        question: &Question,
        listing: &JobListing,
    ) -> Resolution {
        let overwrite = self.config.overwrite_previous_answers;
        let cached = cache
            .get(&question.text)
            .and_then(|entry| self.fit(&entry.answer.to_text(), question));

        if !overwrite {
            if let Some(value) = cached.clone() {
                return self.answered(value, ResolvedBy::Cache);
            }
        }

        if let Some(value) = answer_by_rule(question, listing, &self.config)
            .and_then(|preferred| self.fit(&preferred, question))
        {
            self.store(cache, question, &value, AnswerSource::UserConfig);
            return self.answered(value, ResolvedBy::Rule);
        }

        // Option fields fall back to the configured default before the AI.
        if let Some(value) = self.default_option(question) {
            self.store(cache, question, &value, AnswerSource::UserConfig);
            return self.answered(value, ResolvedBy::DefaultOption);
        }

        if let Some(value) = self.ask_ai(question, listing).await {
            self.store(cache, question, &value, AnswerSource::AiGenerated);
            return self.answered(value, ResolvedBy::Ai);
        }

        // Overwrite mode found nothing better; keep the previous answer.
        if let Some(value) = cached {
            return self.answered(value, ResolvedBy::Cache);
        }

        metrics::ANSWERS_RESOLVED.with_label_values(&["manual"]).inc();
        Resolution::RequiresManualInput {
            reason: if self.ai.is_some() {
                format!("no confident answer for '{}'", question.text)
            } else {
                format!("no configured answer for '{}' and AI is disabled", question.text)
            },
        }
    }

    /// Record an operator-provided answer for future runs.
    ///
    /// A live cached entry is only replaced when overwriting is enabled; the
    /// operator's value is still used for the field at hand.
    pub fn remember_manual(&self, cache: &mut AnswerCache, question: &Question, value: &AnswerValue) {
        if value.is_empty() {
            return;
        }
        metrics::ANSWERS_RESOLVED
            .with_label_values(&[ResolvedBy::Operator.as_str()])
            .inc();
        let entry = AnswerCacheEntry::new(question.field_type, value.clone(), AnswerSource::PreviousRun);
        if !cache.put(&question.text, entry, self.config.overwrite_previous_answers) {
            debug!(question = %question.text, "Kept existing cached answer");
        }
    }

    fn answered(&self, value: AnswerValue, by: ResolvedBy) -> Resolution {
        metrics::ANSWERS_RESOLVED.with_label_values(&[by.as_str()]).inc();
        Resolution::Answered { value, by }
    }

    fn store(&self, cache: &mut AnswerCache, question: &Question, value: &AnswerValue, source: AnswerSource) {
        let entry = AnswerCacheEntry::new(question.field_type, value.clone(), source);
        if cache.put(&question.text, entry, self.config.overwrite_previous_answers) {
            debug!(question = %question.text, source = source.as_str(), "Cached answer");
        }
    }

    /// Shape a preferred text answer to what the field accepts.
    fn fit(&self, preferred: &str, question: &Question) -> Option<AnswerValue> {
        let preferred = preferred.trim();
        if preferred.is_empty() {
            return None;
        }

        match question.field_type {
            FieldType::ShortText | FieldType::LongText => Some(AnswerValue::Text(preferred.to_string())),
            FieldType::SingleSelect | FieldType::Radio => {
                choose_option(preferred, &question.options)
                    .map(|i| AnswerValue::Text(question.options[i].clone()))
            }
            FieldType::MultiSelect => {
                let choices = choose_options(preferred, &question.options);
                (!choices.is_empty()).then_some(AnswerValue::Choices(choices))
            }
        }
    }

    async fn ask_ai(&self, question: &Question, listing: &JobListing) -> Option<AnswerValue> {
        let ai = self.ai.as_ref()?;
        let request = AiQuestion::new(question, listing, self.config.profile_context());

        match ai.answer(&request).await {
            Ok(reply) => {
                metrics::AI_CALLS.with_label_values(&["ok"]).inc();
                let fitted = self.fit(&reply, question);
                if fitted.is_none() {
                    warn!(
                        question = %question.text,
                        reply = %reply,
                        "AI reply does not match any offered option"
                    );
                }
                fitted
            }
            Err(e) => {
                metrics::AI_CALLS.with_label_values(&["error"]).inc();
                warn!(question = %question.text, provider = ai.name(), "AI resolution failed: {}", e);
                None
            }
        }
    }

    fn default_option(&self, question: &Question) -> Option<AnswerValue> {
        if !question.field_type.has_options() {
            return None;
        }
        let index = self.config.default_option_index?;
        let option = question.real_options().nth(index)?.clone();
        Some(match question.field_type {
            FieldType::MultiSelect => AnswerValue::Choices(vec![option]),
            _ => AnswerValue::Text(option),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockAi};

    fn yes_no() -> Vec<String> {
        vec![
            "Select an option".to_string(),
            "Yes".to_string(),
            "No".to_string(),
        ]
    }

    fn listing() -> JobListing {
        fixtures::listing("1", "Backend Engineer", "Acme")
    }

    #[tokio::test]
    async fn test_cache_hit_short_circuits() {
        let engine = QuestionEngine::new(AnswerConfig::default());
        let mut cache = AnswerCache::in_memory();
        cache.put(
            "Are you comfortable commuting?",
            AnswerCacheEntry::new(
                FieldType::SingleSelect,
                AnswerValue::Text("Yes".to_string()),
                AnswerSource::PreviousRun,
            ),
            false,
        );

        let question = Question::new("Are you comfortable commuting?", FieldType::SingleSelect)
            .with_options(yes_no());
        let resolution = engine.resolve(&mut cache, &question, &listing()).await;
        assert_eq!(
            resolution,
            Resolution::Answered {
                value: AnswerValue::Text("Yes".to_string()),
                by: ResolvedBy::Cache
            }
        );
    }

    #[tokio::test]
    async fn test_rule_answer_is_cached_as_user_config() {
        let config = AnswerConfig {
            years_of_experience: Some(5),
            ..Default::default()
        };
        let engine = QuestionEngine::new(config);
        let mut cache = AnswerCache::in_memory();
        let question = Question::new("Years of experience?", FieldType::ShortText);

        let resolution = engine.resolve(&mut cache, &question, &listing()).await;
        assert!(matches!(resolution, Resolution::Answered { by: ResolvedBy::Rule, .. }));

        let entry = cache.get("years of experience").unwrap();
        assert_eq!(entry.source, AnswerSource::UserConfig);
        assert_eq!(entry.answer, AnswerValue::Text("5".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_select_without_ai_requires_manual_input() {
        let engine = QuestionEngine::new(AnswerConfig::default());
        let mut cache = AnswerCache::in_memory();
        let question = Question::new("Are you comfortable commuting?", FieldType::SingleSelect)
            .with_options(yes_no());

        let resolution = engine.resolve(&mut cache, &question, &listing()).await;
        assert!(matches!(resolution, Resolution::RequiresManualInput { .. }));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_ai_reply_mapped_onto_option() {
        let ai = Arc::new(MockAi::new());
        ai.set_default_reply("yes, I can commute").await;
        let engine = QuestionEngine::new(AnswerConfig::default()).with_ai(ai.clone());
        let mut cache = AnswerCache::in_memory();
        let question = Question::new("Are you comfortable commuting?", FieldType::Radio)
            .with_options(yes_no());

        let resolution = engine.resolve(&mut cache, &question, &listing()).await;
        assert_eq!(
            resolution,
            Resolution::Answered {
                value: AnswerValue::Text("Yes".to_string()),
                by: ResolvedBy::Ai
            }
        );
        assert_eq!(
            cache.get("Are you comfortable commuting?").unwrap().source,
            AnswerSource::AiGenerated
        );

        let requests = ai.recorded_questions().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].options, vec!["Yes".to_string(), "No".to_string()]);
    }

    #[tokio::test]
    async fn test_ai_failure_falls_through_to_manual() {
        let ai = Arc::new(MockAi::new());
        ai.fail_next(crate::ai::AiError::Timeout(std::time::Duration::from_secs(30)))
            .await;
        let engine = QuestionEngine::new(AnswerConfig::default()).with_ai(ai);
        let mut cache = AnswerCache::in_memory();
        let question = Question::new("Why do you want to join?", FieldType::LongText);

        let resolution = engine.resolve(&mut cache, &question, &listing()).await;
        assert!(matches!(resolution, Resolution::RequiresManualInput { .. }));
    }

    #[tokio::test]
    async fn test_default_option_index() {
        let config = AnswerConfig {
            default_option_index: Some(1),
            ..Default::default()
        };
        let engine = QuestionEngine::new(config);
        let mut cache = AnswerCache::in_memory();
        let question = Question::new("Preferred shift", FieldType::SingleSelect).with_options(vec![
            "Select an option".to_string(),
            "Morning".to_string(),
            "Evening".to_string(),
        ]);

        let resolution = engine.resolve(&mut cache, &question, &listing()).await;
        assert_eq!(
            resolution,
            Resolution::Answered {
                value: AnswerValue::Text("Evening".to_string()),
                by: ResolvedBy::DefaultOption
            }
        );

        let entry = cache.get("Preferred shift").unwrap();
        assert_eq!(entry.source, AnswerSource::UserConfig);
        assert_eq!(entry.answer, AnswerValue::Text("Evening".to_string()));
    }

    #[tokio::test]
    async fn test_default_option_takes_precedence_over_ai() {
        let ai = Arc::new(MockAi::new());
        ai.set_default_reply("Evening").await;
        let config = AnswerConfig {
            default_option_index: Some(0),
            ..Default::default()
        };
        let engine = QuestionEngine::new(config).with_ai(ai.clone());
        let mut cache = AnswerCache::in_memory();
        let question = Question::new("Preferred shift", FieldType::Radio).with_options(vec![
            "Morning".to_string(),
            "Evening".to_string(),
        ]);

        let resolution = engine.resolve(&mut cache, &question, &listing()).await;
        assert_eq!(
            resolution,
            Resolution::Answered {
                value: AnswerValue::Text("Morning".to_string()),
                by: ResolvedBy::DefaultOption
            }
        );
        assert!(ai.recorded_questions().await.is_empty());

        // Free-text fields still reach the AI
        let question = Question::new("Tell us about yourself", FieldType::LongText);
        let resolution = engine.resolve(&mut cache, &question, &listing()).await;
        assert!(matches!(resolution, Resolution::Answered { by: ResolvedBy::Ai, .. }));
    }

    #[tokio::test]
    async fn test_manual_answer_does_not_replace_cached_entry() {
        let engine = QuestionEngine::new(AnswerConfig::default());
        let mut cache = AnswerCache::in_memory();
        cache.put(
            "Are you comfortable commuting?",
            AnswerCacheEntry::new(
                FieldType::SingleSelect,
                AnswerValue::Text("Yes".to_string()),
                AnswerSource::AiGenerated,
            ),
            false,
        );
        let question = Question::new("Are you comfortable commuting?", FieldType::SingleSelect)
            .with_options(vec!["Oui".to_string(), "Non".to_string()]);

        // "Yes" fits none of the offered options
        let resolution = engine.resolve(&mut cache, &question, &listing()).await;
        assert!(matches!(resolution, Resolution::RequiresManualInput { .. }));

        engine.remember_manual(&mut cache, &question, &AnswerValue::Text("Oui".to_string()));
        assert_eq!(
            cache.get("Are you comfortable commuting?").unwrap().answer,
            AnswerValue::Text("Yes".to_string())
        );
    }

    #[tokio::test]
    async fn test_manual_answer_replaces_cached_entry_when_overwriting() {
        let engine = QuestionEngine::new(AnswerConfig {
            overwrite_previous_answers: true,
            ..Default::default()
        });
        let mut cache = AnswerCache::in_memory();
        cache.put(
            "Are you comfortable commuting?",
            AnswerCacheEntry::new(
                FieldType::SingleSelect,
                AnswerValue::Text("Yes".to_string()),
                AnswerSource::AiGenerated,
            ),
            false,
        );
        let question = Question::new("Are you comfortable commuting?", FieldType::SingleSelect);

        engine.remember_manual(&mut cache, &question, &AnswerValue::Text("Oui".to_string()));
        let entry = cache.get("Are you comfortable commuting?").unwrap();
        assert_eq!(entry.answer, AnswerValue::Text("Oui".to_string()));
        assert_eq!(entry.source, AnswerSource::PreviousRun);
    }

    #[tokio::test]
    async fn test_overwrite_re_resolves_cached_answer() {
        let config = AnswerConfig {
            overwrite_previous_answers: true,
            notice_period_days: Some(30),
            ..Default::default()
        };
        let engine = QuestionEngine::new(config);
        let mut cache = AnswerCache::in_memory();
        cache.put(
            "Notice period (days)",
            AnswerCacheEntry::new(
                FieldType::ShortText,
                AnswerValue::Text("90".to_string()),
                AnswerSource::PreviousRun,
            ),
            false,
        );
        let question = Question::new("Notice period (days)", FieldType::ShortText);

        let resolution = engine.resolve(&mut cache, &question, &listing()).await;
        assert_eq!(
            resolution,
            Resolution::Answered {
                value: AnswerValue::Text("30".to_string()),
                by: ResolvedBy::Rule
            }
        );
        assert_eq!(
            cache.get("notice period days").unwrap().answer,
            AnswerValue::Text("30".to_string())
        );
    }

    #[tokio::test]
    async fn test_overwrite_keeps_cached_when_nothing_better() {
        let config = AnswerConfig {
            overwrite_previous_answers: true,
            ..Default::default()
        };
        let engine = QuestionEngine::new(config);
        let mut cache = AnswerCache::in_memory();
        cache.put(
            "Favourite editor",
            AnswerCacheEntry::new(
                FieldType::ShortText,
                AnswerValue::Text("helix".to_string()),
                AnswerSource::PreviousRun,
            ),
            false,
        );
        let question = Question::new("Favourite editor", FieldType::ShortText);

        let resolution = engine.resolve(&mut cache, &question, &listing()).await;
        assert!(matches!(resolution, Resolution::Answered { by: ResolvedBy::Cache, .. }));
    }

    #[tokio::test]
    async fn test_remember_manual_overrides_previous() {
        let engine = QuestionEngine::new(AnswerConfig::default());
        let mut cache = AnswerCache::in_memory();
        let question = Question::new("Favourite editor", FieldType::ShortText);

        engine.remember_manual(&mut cache, &question, &AnswerValue::Text("vim".to_string()));
        engine.remember_manual(&mut cache, &question, &AnswerValue::Text("helix".to_string()));

        let entry = cache.get("favourite editor").unwrap();
        assert_eq!(entry.source, AnswerSource::PreviousRun);
        assert_eq!(entry.answer, AnswerValue::Text("helix".to_string()));
    }
}
