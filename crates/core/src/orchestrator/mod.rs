//! Search orchestrator.
//!
//! Drives a run group by group:
//! - **Search**: pages through each term, widening the date-posted bound when results run dry
//! - **Triage**: every listing is classified once and gets exactly one outcome
//! - **Apply**: eligible listings go through the application state machine, one at a time

mod config;
mod context;
mod runner;
mod types;

pub use config::{PacingConfig, RunConfig};
pub use context::RunContext;
pub use runner::SearchOrchestrator;
pub use types::{GroupEnd, RunReport};
