use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::search::{JobListing, TimeFilter};

/// Terminal status of one discovered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Applied,
    Skipped,
    Failed,
    Discarded,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Applied => "applied",
            OutcomeStatus::Skipped => "skipped",
            OutcomeStatus::Failed => "failed",
            OutcomeStatus::Discarded => "discarded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "applied" => Some(OutcomeStatus::Applied),
            "skipped" => Some(OutcomeStatus::Skipped),
            "failed" => Some(OutcomeStatus::Failed),
            "discarded" => Some(OutcomeStatus::Discarded),
            _ => None,
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a listing did not end in `Applied`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyApplied,
    BlacklistedCompany,
    BadWords,
    ExperienceMismatch,
    TitleMismatch,
    TooManyApplicants,
    NotEasyApply,
    LimitReached,
    FormError,
    ManualDiscard,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::AlreadyApplied => "already_applied",
            SkipReason::BlacklistedCompany => "blacklisted_company",
            SkipReason::BadWords => "bad_words",
            SkipReason::ExperienceMismatch => "experience_mismatch",
            SkipReason::TitleMismatch => "title_mismatch",
            SkipReason::TooManyApplicants => "too_many_applicants",
            SkipReason::NotEasyApply => "not_easy_apply",
            SkipReason::LimitReached => "limit_reached",
            SkipReason::FormError => "form_error",
            SkipReason::ManualDiscard => "manual_discard",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The recorded result for one listing, exactly one per discovered listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationOutcome {
    pub run_id: String,
    pub group_id: String,
    pub listing_id: String,
    pub title: String,
    pub company: String,
    pub recruiter: Option<String>,
    pub status: OutcomeStatus,
    pub reason: Option<SkipReason>,
    /// Free-form context, e.g. the page error behind a `FormError`.
    pub detail: Option<String>,
    /// Recency bound in effect when the listing was found.
    pub time_filter: Option<TimeFilter>,
    pub recorded_at: DateTime<Utc>,
}

impl ApplicationOutcome {
    pub fn new(
        run_id: &str,
        group_id: &str,
        listing: &JobListing,
        status: OutcomeStatus,
        reason: Option<SkipReason>,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            group_id: group_id.to_string(),
            listing_id: listing.id.clone(),
            title: listing.title.clone(),
            company: listing.company.clone(),
            recruiter: listing.recruiter.clone(),
            status,
            reason,
            detail: None,
            time_filter: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn applied(run_id: &str, group_id: &str, listing: &JobListing) -> Self {
        Self::new(run_id, group_id, listing, OutcomeStatus::Applied, None)
    }

    pub fn skipped(run_id: &str, group_id: &str, listing: &JobListing, reason: SkipReason) -> Self {
        Self::new(run_id, group_id, listing, OutcomeStatus::Skipped, Some(reason))
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_time_filter(mut self, time_filter: TimeFilter) -> Self {
        self.time_filter = Some(time_filter);
        self
    }
}

/// Filter for querying the outcome log.
#[derive(Debug, Clone, Default)]
pub struct OutcomeFilter {
    pub run_id: Option<String>,
    pub group_id: Option<String>,
    pub status: Option<OutcomeStatus>,
    pub from: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl OutcomeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn with_status(mut self, status: OutcomeStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn since(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
