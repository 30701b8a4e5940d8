//! Search domain types shared by the orchestrator, the filter and page collaborators.

use serde::{Deserialize, Serialize};

use super::TimeFilter;

const LINKEDIN_JOBS_URL: &str = "https://www.linkedin.com/jobs/search/";

/// Listings per result page on the job board.
pub const RESULTS_PER_PAGE: u32 = 25;

/// A named bundle of search terms processed as a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchGroup {
    /// Unique identifier, used for per-group caps and reporting.
    pub id: String,
    /// Search terms issued in order.
    pub terms: Vec<String>,
    /// Location passed with every search of this group.
    #[serde(default)]
    pub location: Option<String>,
    /// Free-form category tag (e.g. "backend", "ml"), reported only.
    #[serde(default)]
    pub category: Option<String>,
    /// Settings that replace the global ones for this group only.
    #[serde(default)]
    pub overrides: GroupOverrides,
}

/// Per-group replacements for global run and filter settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupOverrides {
    #[serde(default)]
    pub max_applications: Option<u32>,
    #[serde(default)]
    pub initial_time_filter: Option<TimeFilter>,
    #[serde(default)]
    pub company_blacklist: Option<Vec<String>>,
    #[serde(default)]
    pub bad_words: Option<Vec<String>>,
    #[serde(default)]
    pub current_experience: Option<i32>,
}

/// A single job posting as presented by the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobListing {
    /// Stable external identifier.
    pub id: String,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: String,
    /// Relative posting age as shown by the board ("2 hours ago").
    #[serde(default)]
    pub posted: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Hiring contact shown on the listing, if any.
    #[serde(default)]
    pub recruiter: Option<String>,
    #[serde(default = "default_easy_apply")]
    pub easy_apply: bool,
    #[serde(default)]
    pub applicant_count: Option<u32>,
}

fn default_easy_apply() -> bool {
    true
}

/// Parameters for one result-page fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub term: String,
    pub location: Option<String>,
    pub time_filter: TimeFilter,
    /// Zero-based result page.
    pub page: u32,
}

impl SearchRequest {
    /// Build the Easy Apply search URL for this request.
    pub fn search_url(&self) -> String {
        let mut url = format!(
            "{}?keywords={}&f_AL=true",
            LINKEDIN_JOBS_URL,
            urlencoding::encode(&self.term)
        );
        if let Some(location) = &self.location {
            url.push_str(&format!("&location={}", urlencoding::encode(location)));
        }
        if let Some(param) = self.time_filter.linkedin_param() {
            url.push_str(&format!("&f_TPR={}", param));
        }
        if self.page > 0 {
            url.push_str(&format!("&start={}", self.page * RESULTS_PER_PAGE));
        }
        url
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub listings: Vec<JobListing>,
    /// Whether the board reports further pages for the same request.
    #[serde(default)]
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_first_page() {
        let request = SearchRequest {
            term: "rust developer".to_string(),
            location: Some("Berlin, Germany".to_string()),
            time_filter: TimeFilter::PastDay,
            page: 0,
        };
        let url = request.search_url();
        assert!(url.contains("keywords=rust%20developer"));
        assert!(url.contains("location=Berlin%2C%20Germany"));
        assert!(url.contains("f_TPR=r86400"));
        assert!(url.contains("f_AL=true"));
        assert!(!url.contains("start="));
    }

    #[test]
    fn test_search_url_any_time_has_no_filter() {
        let request = SearchRequest {
            term: "sre".to_string(),
            location: None,
            time_filter: TimeFilter::Any,
            page: 2,
        };
        let url = request.search_url();
        assert!(!url.contains("f_TPR"));
        assert!(url.ends_with("&start=50"));
    }

    #[test]
    fn test_listing_defaults_from_json() {
        let listing: JobListing =
            serde_json::from_str(r#"{"id": "1", "title": "Engineer", "company": "Acme"}"#).unwrap();
        assert!(listing.easy_apply);
        assert!(listing.recruiter.is_none());
        assert_eq!(listing.description, "");
    }

    #[test]
    fn test_group_overrides_default_empty() {
        let group: SearchGroup =
            serde_json::from_str(r#"{"id": "backend", "terms": ["go developer"]}"#).unwrap();
        assert!(group.overrides.max_applications.is_none());
        assert!(group.location.is_none());
    }
}
