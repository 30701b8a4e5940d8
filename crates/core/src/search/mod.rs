//! Search groups, listings and the posting-recency adjuster.

mod time_filter;
mod types;

pub use time_filter::{AdjustSignal, TimeFilter, TimeFilterAdjuster, TimeFilterConfig};
pub use types::{GroupOverrides, JobListing, SearchGroup, SearchPage, SearchRequest, RESULTS_PER_PAGE};

use serde::{Deserialize, Serialize};

/// The `[search]` configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Groups processed in order (or shuffled, see `run.randomize_search_order`).
    pub groups: Vec<SearchGroup>,

    #[serde(default)]
    pub time_filter: TimeFilterConfig,
}
