//! Listing triage.
//!
//! [`classify`] decides, before any page interaction, whether a listing is
//! worth applying to. Checks run in a fixed order and the first match wins:
//!
//! 1. already applied
//! 2. blacklisted company (never overridden)
//! 3. bad words, unless a good word is also present
//! 4. required experience above the candidate's
//! 5. title keywords
//! 6. applicant count
//! 7. Easy Apply availability

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::outcome::SkipReason;
use crate::search::{GroupOverrides, JobListing};

/// Experience values above this are read as noise ("15+ years in business").
const MAX_PLAUSIBLE_YEARS: u32 = 12;

/// The `[filters]` configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Companies never applied to (case-insensitive substring match).
    #[serde(default)]
    pub company_blacklist: Vec<String>,

    /// Words in title or description that disqualify a listing.
    #[serde(default)]
    pub bad_words: Vec<String>,

    /// Words that cancel a bad-word match.
    #[serde(default)]
    pub good_words: Vec<String>,

    /// Candidate's years of experience; -1 disables the experience check.
    #[serde(default = "default_current_experience")]
    pub current_experience: i32,

    /// If non-empty, the title must contain at least one of these.
    #[serde(default)]
    pub required_title_keywords: Vec<String>,

    /// The title must contain none of these.
    #[serde(default)]
    pub excluded_title_keywords: Vec<String>,

    /// Skip listings reporting more applicants than this.
    #[serde(default = "default_max_applicants")]
    pub max_applicants: Option<u32>,

    /// Skip listings without Easy Apply.
    #[serde(default = "default_require_easy_apply")]
    pub require_easy_apply: bool,
}

fn default_current_experience() -> i32 {
    -1
}

fn default_max_applicants() -> Option<u32> {
    Some(200)
}

fn default_require_easy_apply() -> bool {
    true
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            company_blacklist: Vec::new(),
            bad_words: Vec::new(),
            good_words: Vec::new(),
            current_experience: default_current_experience(),
            required_title_keywords: Vec::new(),
            excluded_title_keywords: Vec::new(),
            max_applicants: default_max_applicants(),
            require_easy_apply: default_require_easy_apply(),
        }
    }
}

impl FilterConfig {
    /// The effective filter for a group after applying its overrides.
    pub fn for_group(&self, overrides: &GroupOverrides) -> FilterConfig {
        let mut config = self.clone();
        if let Some(blacklist) = &overrides.company_blacklist {
            config.company_blacklist = blacklist.clone();
        }
        if let Some(bad_words) = &overrides.bad_words {
            config.bad_words = bad_words.clone();
        }
        if let Some(experience) = overrides.current_experience {
            config.current_experience = experience;
        }
        config
    }
}

/// Decide whether a listing should be skipped.
///
/// Returns `None` for listings eligible for the application flow. Pure: the
/// caller owns both the applied set and any logging.
pub fn classify(
    listing: &JobListing,
    config: &FilterConfig,
    applied: &HashSet<String>,
) -> Option<SkipReason> {
    if applied.contains(&listing.id) {
        return Some(SkipReason::AlreadyApplied);
    }

    if is_blacklisted(&listing.company, &config.company_blacklist) {
        return Some(SkipReason::BlacklistedCompany);
    }

    let text = format!("{} {}", listing.title, listing.description);
    if contains_any_word(&text, &config.bad_words) && !contains_any_word(&text, &config.good_words)
    {
        return Some(SkipReason::BadWords);
    }

    if config.current_experience >= 0 {
        if let Some(required) = required_experience(&listing.description) {
            if required as i64 > config.current_experience as i64 {
                return Some(SkipReason::ExperienceMismatch);
            }
        }
    }

    if !title_matches(
        &listing.title,
        &config.required_title_keywords,
        &config.excluded_title_keywords,
    ) {
        return Some(SkipReason::TitleMismatch);
    }

    if let (Some(max), Some(count)) = (config.max_applicants, listing.applicant_count) {
        if count > max {
            return Some(SkipReason::TooManyApplicants);
        }
    }

    if config.require_easy_apply && !listing.easy_apply {
        return Some(SkipReason::NotEasyApply);
    }

    None
}

fn is_blacklisted(company: &str, blacklist: &[String]) -> bool {
    let company = company.to_lowercase();
    blacklist
        .iter()
        .map(|entry| entry.trim().to_lowercase())
        .any(|entry| !entry.is_empty() && company.contains(&entry))
}

/// Case-insensitive whole-word (or whole-phrase) match.
fn contains_any_word(text: &str, words: &[String]) -> bool {
    let haystack = tokenize(text);
    words.iter().any(|word| {
        let needle = tokenize(word);
        !needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle)
    })
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '+' && c != '#')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn title_matches(title: &str, required: &[String], excluded: &[String]) -> bool {
    let title = title.to_lowercase();
    let has = |keyword: &String| {
        let keyword = keyword.trim().to_lowercase();
        !keyword.is_empty() && title.contains(&keyword)
    };

    if !required.is_empty() && !required.iter().any(has) {
        return false;
    }
    !excluded.iter().any(has)
}

static EXPERIENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:minimum\s+(?:of\s+)?|at\s+least\s+)?\b(\d{1,2})\s*(?:\+|plus)?\s*(?:(?:-|to)\s*(\d{1,2})\s*\+?\s*)?(?:years?|yrs?)",
    )
    .expect("experience pattern is valid")
});

/// Years of experience a description asks for.
///
/// Every "N years" / "N+ years" / "N-M years" mention is considered; the
/// largest plausible lower bound wins.
pub fn required_experience(description: &str) -> Option<u32> {
    EXPERIENCE_RE
        .captures_iter(description)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .filter(|years| *years <= MAX_PLAUSIBLE_YEARS)
        .max()
}
