//! End-of-run session summary.
//!
//! Built only from recorded outcomes and group completions, so it can be
//! produced even when a run halts part-way through.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::AnswerTally;
use crate::outcome::{ApplicationOutcome, OutcomeStatus, SkipReason};
use crate::search::TimeFilter;

/// Counts per outcome status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub applied: u32,
    pub skipped: u32,
    pub failed: u32,
    pub discarded: u32,
}

impl OutcomeCounts {
    fn record(&mut self, status: OutcomeStatus) {
        match status {
            OutcomeStatus::Applied => self.applied += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
            OutcomeStatus::Failed => self.failed += 1,
            OutcomeStatus::Discarded => self.discarded += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.applied + self.skipped + self.failed + self.discarded
    }
}

/// Per-group view of the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    #[serde(flatten)]
    pub counts: OutcomeCounts,
    /// Widest date-posted bound the group reached.
    pub final_time_filter: Option<TimeFilter>,
    /// The group ran out of listings at `Any`.
    pub exhausted: bool,
    pub abandoned: Option<String>,
}

/// A recruiter named on a listing that was applied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecruiterContact {
    pub name: String,
    pub company: String,
    pub listing_id: String,
}

/// A group the run gave up on, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbandonedGroup {
    pub group_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub run_id: String,
    /// Hash of the configuration the run used.
    pub config_hash: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub counts: OutcomeCounts,
    pub skip_reasons: BTreeMap<SkipReason, u32>,
    pub groups: BTreeMap<String, GroupSummary>,
    pub recruiters: Vec<RecruiterContact>,
    pub answers: AnswerTally,
    pub cancelled: bool,
    /// Set when an irrecoverable session error stopped the run.
    pub halted: Option<String>,
    pub abandoned_groups: Vec<AbandonedGroup>,
}

impl SessionSummary {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            config_hash: None,
            started_at: Utc::now(),
            finished_at: None,
            counts: OutcomeCounts::default(),
            skip_reasons: BTreeMap::new(),
            groups: BTreeMap::new(),
            recruiters: Vec::new(),
            answers: AnswerTally::default(),
            cancelled: false,
            halted: None,
            abandoned_groups: Vec::new(),
        }
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Fold one outcome into the counters.
    pub fn record(&mut self, outcome: &ApplicationOutcome) {
        self.counts.record(outcome.status);
        self.groups
            .entry(outcome.group_id.clone())
            .or_default()
            .counts
            .record(outcome.status);

        if let Some(reason) = outcome.reason {
            if outcome.status != OutcomeStatus::Applied {
                *self.skip_reasons.entry(reason).or_insert(0) += 1;
            }
        }

        if outcome.status == OutcomeStatus::Applied {
            if let Some(name) = outcome.recruiter.as_deref().filter(|n| !n.trim().is_empty()) {
                self.recruiters.push(RecruiterContact {
                    name: name.trim().to_string(),
                    company: outcome.company.clone(),
                    listing_id: outcome.listing_id.clone(),
                });
            }
        }
    }

    pub fn record_answers(&mut self, tally: &AnswerTally) {
        self.answers.merge(tally);
    }

    /// Close out a group.
    pub fn finish_group(
        &mut self,
        group_id: &str,
        final_time_filter: TimeFilter,
        exhausted: bool,
        abandoned: Option<String>,
    ) {
        let group = self.groups.entry(group_id.to_string()).or_default();
        group.final_time_filter = Some(final_time_filter);
        group.exhausted = exhausted;
        if let Some(reason) = abandoned {
            group.abandoned = Some(reason.clone());
            self.abandoned_groups.push(AbandonedGroup {
                group_id: group_id.to_string(),
                reason,
            });
        }
    }

    pub fn finalize(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn total(&self) -> u32 {
        self.counts.total()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> u32 {
        self.skip_reasons.get(&reason).copied().unwrap_or(0)
    }
}
