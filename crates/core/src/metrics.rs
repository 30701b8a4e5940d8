//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Search (result pages, time filter widening)
//! - Applications (outcomes, skip reasons, form pages)
//! - Question answering (resolution stage, AI calls, LLM tokens)
//! - Page collaborator retries

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

// =============================================================================
// Search Metrics
// =============================================================================

/// Result pages fetched, by time filter in effect.
pub static PAGE_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("easyapply_search_pages_total", "Total search result pages fetched"),
        &["time_filter"],
    )
    .unwrap()
});

/// Listings per search result page.
pub static SEARCH_RESULTS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "easyapply_search_results",
            "Number of listings returned per result page",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 15.0, 20.0, 25.0]),
        &[],
    )
    .unwrap()
});

/// Time filter widenings.
pub static TIME_FILTER_WIDENED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "easyapply_time_filter_widened_total",
            "Total time filter widenings",
        ),
        &["to"],
    )
    .unwrap()
});

/// Groups abandoned after blocking errors.
pub static GROUPS_ABANDONED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "easyapply_groups_abandoned_total",
        "Search groups abandoned after the board blocked the session",
    )
    .unwrap()
});

// =============================================================================
// Application Metrics
// =============================================================================

/// Recorded outcomes by status.
pub static APPLICATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("easyapply_outcomes_total", "Total recorded listing outcomes"),
        &["status"], // "applied", "skipped", "failed", "discarded"
    )
    .unwrap()
});

/// Skips and failures by reason.
pub static SKIPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("easyapply_skips_total", "Total listings not applied to, by reason"),
        &["reason"],
    )
    .unwrap()
});

/// Form pages per submitted application.
pub static FORM_PAGES: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "easyapply_form_pages",
            "Number of form pages per submitted application",
        )
        .buckets(vec![1.0, 2.0, 3.0, 4.0, 5.0, 7.0, 10.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Question Answering Metrics
// =============================================================================

/// Answered (or unanswerable) questions by stage.
pub static ANSWERS_RESOLVED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("easyapply_answers_total", "Total form questions resolved"),
        &["by"], // "cache", "rule", "ai", "default_option", "operator", "manual"
    )
    .unwrap()
});

/// AI collaborator calls by result.
pub static AI_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("easyapply_ai_calls_total", "Total AI collaborator calls"),
        &["result"], // "ok", "error"
    )
    .unwrap()
});

/// LLM tokens used.
pub static LLM_TOKENS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("easyapply_llm_tokens_total", "Total LLM tokens used"),
        &["provider", "direction"], // direction: "input", "output"
    )
    .unwrap()
});

// =============================================================================
// Page Collaborator Metrics
// =============================================================================

/// Retried page operations.
pub static PAGE_RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("easyapply_page_retries_total", "Total retried page operations"),
        &["operation"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Search
        Box::new(PAGE_FETCHES.clone()),
        Box::new(SEARCH_RESULTS.clone()),
        Box::new(TIME_FILTER_WIDENED.clone()),
        Box::new(GROUPS_ABANDONED.clone()),
        // Applications
        Box::new(APPLICATIONS.clone()),
        Box::new(SKIPS.clone()),
        Box::new(FORM_PAGES.clone()),
        // Answers
        Box::new(ANSWERS_RESOLVED.clone()),
        Box::new(AI_CALLS.clone()),
        Box::new(LLM_TOKENS.clone()),
        // Page
        Box::new(PAGE_RETRIES.clone()),
    ]
}

/// Register every core metric in `registry`.
pub fn register_metrics(registry: &Registry) -> Result<(), prometheus::Error> {
    for collector in all_metrics() {
        registry.register(collector)?;
    }
    Ok(())
}
