//! Operator that resolves pauses on the terminal.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::warn;

use easyapply_core::answers::{AnswerValue, FieldType};
use easyapply_core::{Operator, PauseReason, PauseRequest, PauseResolution};

const MANUAL_HELP: &str =
    "Type the answer (or an option number), ':done' if you filled it in the browser, \
':discard' to skip this job, ':quit' to stop the run.";

/// Reads decisions from stdin. End of input discards the application.
pub struct ConsoleOperator {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl ConsoleOperator {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    async fn read_line(&self) -> Option<String> {
        match self.lines.lock().await.next_line().await {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read from stdin: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl Operator for ConsoleOperator {
    async fn resolve(&self, request: &PauseRequest) -> PauseResolution {
        println!();
        println!(
            "== {} at {} (listing {}, form page {})",
            request.title,
            request.company,
            request.listing_id,
            request.page_index + 1
        );

        match &request.reason {
            PauseReason::ManualInput {
                question,
                field_type,
                options,
                detail,
            } => {
                println!("Needs your input: {}", detail);
                println!("  {} [{}]", question, field_type);
                for (i, option) in options.iter().enumerate() {
                    println!("    {}) {}", i + 1, option);
                }
                println!("{}", MANUAL_HELP);

                match self.read_line().await {
                    Some(line) => parse_manual_answer(&line, *field_type, options),
                    None => PauseResolution::Discard,
                }
            }
            PauseReason::ConfirmSubmit => {
                println!("Submit this application? [Y]es / [n]o (discard) / [q]uit");
                match self.read_line().await {
                    Some(line) => parse_confirmation(&line),
                    None => PauseResolution::Discard,
                }
            }
        }
    }
}

/// Interpret a reply to a manual-input pause.
pub fn parse_manual_answer(
    line: &str,
    field_type: FieldType,
    options: &[String],
) -> PauseResolution {
    let line = line.trim();
    match line {
        ":done" | "" => return PauseResolution::Resume { answer: None },
        ":discard" => return PauseResolution::Discard,
        ":quit" => return PauseResolution::Cancel,
        _ => {}
    }

    let pick = |token: &str| -> Option<String> {
        let index: usize = token.trim().parse().ok()?;
        options.get(index.checked_sub(1)?).cloned()
    };

    let answer = if field_type == FieldType::MultiSelect {
        let picked: Option<Vec<String>> = line.split(',').map(pick).collect();
        match picked {
            Some(choices) if !choices.is_empty() => AnswerValue::Choices(choices),
            _ => AnswerValue::Choices(
                line.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
        }
    } else {
        AnswerValue::Text(pick(line).unwrap_or_else(|| line.to_string()))
    };

    PauseResolution::Resume {
        answer: Some(answer),
    }
}

/// Interpret a reply to a confirm-submit pause.
pub fn parse_confirmation(line: &str) -> PauseResolution {
    match line.trim().to_lowercase().as_str() {
        "" | "y" | "yes" => PauseResolution::Submit,
        "q" | "quit" => PauseResolution::Cancel,
        _ => PauseResolution::Discard,
    }
}
