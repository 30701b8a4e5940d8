//! Filling and submitting a single Easy Apply form.

mod config;
mod machine;
mod operator;

pub use config::ApplicationConfig;
pub use machine::{
    AnswerTally, ApplicationReport, ApplicationState, ApplicationStateMachine, ReviewReason,
};
pub use operator::{DiscardingOperator, Operator, PauseReason, PauseRequest, PauseResolution};
