//! Append-only record of what happened to every discovered listing.

mod handle;
mod sqlite;
mod store;
mod types;

pub use handle::{create_outcome_log, OutcomeHandle, OutcomeWriter};
pub use sqlite::SqliteOutcomeStore;
pub use store::{OutcomeError, OutcomeStore};
pub use types::{ApplicationOutcome, OutcomeFilter, OutcomeStatus, SkipReason};
