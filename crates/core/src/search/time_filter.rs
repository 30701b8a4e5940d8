//! Posting-recency bound and its automatic widening.
//!
//! The adjuster watches result counts page by page. Sparse pages widen the
//! bound one step at a time (`PastHour` -> `PastDay` -> ... -> `Any`); once the
//! bound is `Any`, consecutive empty pages exhaust the group. The bound never
//! narrows during a group: narrowing only happens through [`TimeFilterAdjuster::reset`].

use std::fmt;

use serde::{Deserialize, Serialize};

use super::RESULTS_PER_PAGE;

/// Recency bound applied to a search, ordered from narrowest to widest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFilter {
    PastHour,
    PastDay,
    PastWeek,
    PastMonth,
    Any,
}

impl TimeFilter {
    /// The next wider bound, or `None` at `Any`.
    pub fn widen(self) -> Option<TimeFilter> {
        match self {
            TimeFilter::PastHour => Some(TimeFilter::PastDay),
            TimeFilter::PastDay => Some(TimeFilter::PastWeek),
            TimeFilter::PastWeek => Some(TimeFilter::PastMonth),
            TimeFilter::PastMonth => Some(TimeFilter::Any),
            TimeFilter::Any => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFilter::PastHour => "past_hour",
            TimeFilter::PastDay => "past_day",
            TimeFilter::PastWeek => "past_week",
            TimeFilter::PastMonth => "past_month",
            TimeFilter::Any => "any",
        }
    }

    /// Value of the board's `f_TPR` query parameter (seconds, prefixed with `r`).
    pub fn linkedin_param(&self) -> Option<&'static str> {
        match self {
            TimeFilter::PastHour => Some("r3600"),
            TimeFilter::PastDay => Some("r86400"),
            TimeFilter::PastWeek => Some("r604800"),
            TimeFilter::PastMonth => Some("r2592000"),
            TimeFilter::Any => None,
        }
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds driving the adjuster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeFilterConfig {
    /// Bound every group starts from unless overridden.
    #[serde(default = "default_initial")]
    pub initial: TimeFilter,

    /// Listings per page reported by the board.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// A page with fewer results than this counts as sparse.
    #[serde(default = "default_low_threshold")]
    pub low_result_threshold: u32,

    /// A page with at least this many results counts as saturated.
    /// Saturation is tracked but never narrows the bound mid-group.
    #[serde(default = "default_page_size")]
    pub high_result_threshold: u32,

    /// Consecutive sparse pages needed before widening.
    #[serde(default = "default_widen_after")]
    pub widen_after: u32,

    /// Consecutive empty pages at `Any` before the group is exhausted.
    #[serde(default = "default_exhaustion_pages")]
    pub exhaustion_pages: u32,
}

fn default_initial() -> TimeFilter {
    TimeFilter::PastHour
}

fn default_page_size() -> u32 {
    RESULTS_PER_PAGE
}

fn default_low_threshold() -> u32 {
    5
}

fn default_widen_after() -> u32 {
    1
}

fn default_exhaustion_pages() -> u32 {
    2
}

impl Default for TimeFilterConfig {
    fn default() -> Self {
        Self {
            initial: default_initial(),
            page_size: default_page_size(),
            low_result_threshold: default_low_threshold(),
            high_result_threshold: default_page_size(),
            widen_after: default_widen_after(),
            exhaustion_pages: default_exhaustion_pages(),
        }
    }
}

/// What the orchestrator should do after a page has been observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustSignal {
    /// Keep paging with the current bound.
    Keep,
    /// The bound was widened; restart the current term from its first page.
    Widened { from: TimeFilter, to: TimeFilter },
    /// Nothing left to find at `Any`; move on to the next term.
    Exhausted,
}

/// Per-group widening state machine.
#[derive(Debug, Clone)]
pub struct TimeFilterAdjuster {
    config: TimeFilterConfig,
    current: TimeFilter,
    low_streak: u32,
    high_streak: u32,
    empty_at_any: u32,
}

impl TimeFilterAdjuster {
    pub fn new(config: TimeFilterConfig) -> Self {
        let current = config.initial;
        Self {
            config,
            current,
            low_streak: 0,
            high_streak: 0,
            empty_at_any: 0,
        }
    }

    /// Current bound.
    pub fn current(&self) -> TimeFilter {
        self.current
    }

    /// Start a new group, optionally from a group-specific bound.
    ///
    /// This is the only way the bound ever narrows.
    pub fn reset(&mut self, initial: Option<TimeFilter>) {
        self.current = initial.unwrap_or(self.config.initial);
        self.low_streak = 0;
        self.high_streak = 0;
        self.empty_at_any = 0;
    }

    /// Start the next term of the same group. Counters restart, the bound
    /// stays where the previous term left it.
    pub fn next_term(&mut self) {
        self.low_streak = 0;
        self.high_streak = 0;
        self.empty_at_any = 0;
    }

    /// Whether recent pages were saturated.
    pub fn is_saturated(&self) -> bool {
        self.high_streak > 0
    }

    /// Feed the result count of the page just fetched.
    pub fn observe(&mut self, count: usize) -> AdjustSignal {
        let count = count as u32;

        if self.current == TimeFilter::Any {
            if count == 0 {
                self.empty_at_any += 1;
                if self.empty_at_any >= self.config.exhaustion_pages {
                    return AdjustSignal::Exhausted;
                }
            } else {
                self.empty_at_any = 0;
            }
            return AdjustSignal::Keep;
        }

        if count >= self.config.high_result_threshold {
            self.high_streak += 1;
            self.low_streak = 0;
            return AdjustSignal::Keep;
        }
        self.high_streak = 0;

        if count < self.config.low_result_threshold {
            self.low_streak += 1;
            if self.low_streak >= self.config.widen_after {
                if let Some(next) = self.current.widen() {
                    let from = self.current;
                    self.current = next;
                    self.low_streak = 0;
                    return AdjustSignal::Widened { from, to: next };
                }
            }
        } else {
            self.low_streak = 0;
        }

        AdjustSignal::Keep
    }
}
