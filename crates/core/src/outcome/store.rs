use std::collections::HashSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{ApplicationOutcome, OutcomeFilter};

#[derive(Debug, Error)]
pub enum OutcomeError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Persistent, append-only log of application outcomes.
///
/// The log is the source of the applied set loaded at the start of a run
/// and of the daily application count.
pub trait OutcomeStore: Send + Sync {
    /// Append an outcome, returning its row id.
    fn insert(&self, outcome: &ApplicationOutcome) -> Result<i64, OutcomeError>;

    /// Query outcomes, newest first.
    fn query(&self, filter: &OutcomeFilter) -> Result<Vec<ApplicationOutcome>, OutcomeError>;

    /// Identifiers of every listing ever recorded as applied.
    fn applied_ids(&self) -> Result<HashSet<String>, OutcomeError>;

    /// Number of applied outcomes recorded at or after `since`.
    fn count_applied_since(&self, since: DateTime<Utc>) -> Result<u32, OutcomeError>;
}
