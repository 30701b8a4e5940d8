use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{AiCollaborator, AiError, AiQuestion, CompletionRequest, LlmClient};
use crate::answers::FieldType;
use crate::metrics;

const SYSTEM_PROMPT: &str = "You fill in job application forms on behalf of a candidate. \
Answer with the value to enter in the field and nothing else: no explanations, no quotes, \
no markdown. Numeric questions get a bare number. When options are listed, reply with \
exactly one option (or a comma-separated list for multi-select fields). Never invent \
facts that contradict the candidate profile.";

/// [`AiCollaborator`] backed by an [`LlmClient`].
pub struct LlmAnswerer {
    client: Arc<dyn LlmClient>,
    max_tokens: u32,
    temperature: f32,
}

impl LlmAnswerer {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            max_tokens: 256,
            temperature: 0.0,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn build_prompt(request: &AiQuestion) -> String {
        let mut prompt = format!(
            "Candidate profile:\n{}\n\nJob: {} at {}\n",
            request.profile, request.job_title, request.company
        );
        if !request.description.is_empty() {
            prompt.push_str(&format!("Job description:\n{}\n", request.description));
        }
        prompt.push_str(&format!(
            "\nForm field ({}): {}\n",
            request.field_type, request.question
        ));
        if !request.options.is_empty() {
            prompt.push_str("Options:\n");
            for option in &request.options {
                prompt.push_str(&format!("- {}\n", option));
            }
        }
        if request.field_type == FieldType::LongText {
            prompt.push_str("\nKeep the answer under 120 words.\n");
        }
        prompt
    }
}

/// Strip wrapping quotes, trailing periods and a leading "Answer:" label.
fn clean_reply(reply: &str) -> String {
    let mut text = reply.trim();
    for prefix in ["Answer:", "answer:", "A:"] {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest.trim();
        }
    }
    let text = text
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim();
    if text.split_whitespace().count() <= 3 {
        text.trim_end_matches('.').to_string()
    } else {
        text.to_string()
    }
}

#[async_trait]
impl AiCollaborator for LlmAnswerer {
    fn name(&self) -> &str {
        self.client.provider()
    }

    async fn answer(&self, request: &AiQuestion) -> Result<String, AiError> {
        let completion = CompletionRequest::new(Self::build_prompt(request))
            .with_system(SYSTEM_PROMPT)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature);

        let response = self.client.complete(completion).await?;
        let provider = self.client.provider();
        metrics::LLM_TOKENS
            .with_label_values(&[provider, "input"])
            .inc_by(response.usage.input_tokens as u64);
        metrics::LLM_TOKENS
            .with_label_values(&[provider, "output"])
            .inc_by(response.usage.output_tokens as u64);
        debug!(
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "AI answered form question"
        );

        let answer = clean_reply(&response.text);
        if answer.is_empty() {
            return Err(AiError::EmptyAnswer);
        }
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{CompletionResponse, LlmUsage};
    use tokio::sync::Mutex;

    struct CannedClient {
        reply: String,
        prompts: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl LlmClient for CannedClient {
        fn provider(&self) -> &str {
            "canned"
        }

        fn model(&self) -> &str {
            "canned-1"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AiError> {
            self.prompts.lock().await.push(request);
            Ok(CompletionResponse {
                text: self.reply.clone(),
                usage: LlmUsage::default(),
                model: "canned-1".to_string(),
            })
        }
    }

    fn question(field_type: FieldType, options: &[&str]) -> AiQuestion {
        AiQuestion {
            question: "Can you start within a month?".to_string(),
            field_type,
            options: options.iter().map(|s| s.to_string()).collect(),
            job_title: "Backend Engineer".to_string(),
            company: "Acme".to_string(),
            description: "Build APIs".to_string(),
            profile: "Years of experience: 5".to_string(),
        }
    }

    #[tokio::test]
    async fn test_answer_cleans_reply_and_sends_options() {
        let client = Arc::new(CannedClient {
            reply: "  \"Yes.\"\n".to_string(),
            prompts: Mutex::new(Vec::new()),
        });
        let answerer = LlmAnswerer::new(client.clone());

        let answer = answerer
            .answer(&question(FieldType::Radio, &["Yes", "No"]))
            .await
            .unwrap();
        assert_eq!(answer, "Yes");
        assert_eq!(answerer.name(), "canned");

        let prompts = client.prompts.lock().await;
        assert!(prompts[0].prompt.contains("- Yes\n- No"));
        assert!(prompts[0].prompt.contains("Backend Engineer at Acme"));
        assert!(prompts[0].system.is_some());
    }

    #[tokio::test]
    async fn test_empty_reply_is_an_error() {
        let client = Arc::new(CannedClient {
            reply: " \"\" ".to_string(),
            prompts: Mutex::new(Vec::new()),
        });
        let answerer = LlmAnswerer::new(client);
        let result = answerer.answer(&question(FieldType::ShortText, &[])).await;
        assert!(matches!(result, Err(AiError::EmptyAnswer)));
    }

    #[test]
    fn test_clean_reply_keeps_sentences() {
        assert_eq!(clean_reply("Answer: 5"), "5");
        assert_eq!(
            clean_reply("I enjoy building reliable distributed systems."),
            "I enjoy building reliable distributed systems."
        );
    }
}
