//! Types for the search orchestrator.

use serde::{Deserialize, Serialize};

use super::RunContext;
use crate::summary::SessionSummary;

/// Why processing of a search group stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "end", content = "reason", rename_all = "snake_case")]
pub enum GroupEnd {
    /// Every term ran out of pages.
    Completed,
    /// Zero results at `Any` for consecutive pages.
    Exhausted,
    /// The group or global application cap was reached.
    CapReached,
    /// The board blocked us or kept failing; move on to the next group.
    Abandoned(String),
    /// The browser session is gone; the run halts.
    SessionLost(String),
    /// The operator stopped the run.
    Cancelled,
}

impl GroupEnd {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupEnd::Completed => "completed",
            GroupEnd::Exhausted => "exhausted",
            GroupEnd::CapReached => "cap_reached",
            GroupEnd::Abandoned(_) => "abandoned",
            GroupEnd::SessionLost(_) => "session_lost",
            GroupEnd::Cancelled => "cancelled",
        }
    }

    /// Whether the run must stop after this group.
    pub fn stops_run(&self) -> bool {
        matches!(self, GroupEnd::SessionLost(_) | GroupEnd::Cancelled)
    }
}

/// Everything a finished run hands back to the caller.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: SessionSummary,
    /// Final run state, including the updated applied set.
    pub context: RunContext,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_end_serialization() {
        let end = GroupEnd::Abandoned("blocked by captcha".to_string());
        let json = serde_json::to_value(&end).unwrap();
        assert_eq!(json["end"], "abandoned");
        assert_eq!(json["reason"], "blocked by captcha");
    }

    #[test]
    fn test_stops_run() {
        assert!(GroupEnd::SessionLost("closed".into()).stops_run());
        assert!(GroupEnd::Cancelled.stops_run());
        assert!(!GroupEnd::Abandoned("captcha".into()).stops_run());
        assert!(!GroupEnd::Exhausted.stops_run());
    }
}
