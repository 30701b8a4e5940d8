pub mod ai;
pub mod answers;
pub mod application;
pub mod config;
pub mod filter;
pub mod metrics;
pub mod orchestrator;
pub mod outcome;
pub mod page;
pub mod search;
pub mod summary;
pub mod testing;

pub use ai::{create_llm_client, AiCollaborator, AiConfig, AiError, LlmAnswerer};
pub use answers::{AnswerCache, CacheError, QuestionEngine};
pub use application::{
    ApplicationStateMachine, DiscardingOperator, Operator, PauseReason, PauseRequest,
    PauseResolution,
};
pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use orchestrator::{RunContext, RunReport, SearchOrchestrator};
pub use outcome::{
    create_outcome_log, ApplicationOutcome, OutcomeFilter, OutcomeStatus, OutcomeStore,
    SkipReason, SqliteOutcomeStore,
};
pub use page::{PageCollaborator, PageError, ReplayPage};
pub use summary::SessionSummary;
