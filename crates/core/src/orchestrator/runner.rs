//! Search orchestrator implementation.
//!
//! Strictly sequential: one search page, one listing, one form at a time.
//! Cancellation is checked between listings, never in the middle of a form.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use super::{GroupEnd, PacingConfig, RunConfig, RunContext, RunReport};
use crate::answers::{AnswerCache, QuestionEngine};
use crate::application::{ApplicationConfig, ApplicationState, ApplicationStateMachine, Operator};
use crate::config::Config;
use crate::filter::{classify, FilterConfig};
use crate::metrics;
use crate::outcome::{ApplicationOutcome, OutcomeHandle, OutcomeStatus, SkipReason};
use crate::page::{with_retry, PageCollaborator, PageError, RetryPolicy};
use crate::search::{
    AdjustSignal, JobListing, SearchConfig, SearchGroup, SearchRequest, TimeFilter,
    TimeFilterAdjuster,
};
use crate::summary::SessionSummary;

/// Result of working through one page of listings.
enum PageEnd {
    Continue,
    Stop(GroupEnd),
}

/// The search orchestrator - turns search groups into outcomes and a summary.
pub struct SearchOrchestrator {
    run: RunConfig,
    search: SearchConfig,
    filters: FilterConfig,
    application: ApplicationConfig,
    retry: RetryPolicy,
    pacing: PacingConfig,

    page: Arc<dyn PageCollaborator>,
    engine: QuestionEngine,
    operator: Arc<dyn Operator>,
    outcomes: Option<OutcomeHandle>,
    config_hash: Option<String>,

    cancel: Arc<AtomicBool>,
}

impl SearchOrchestrator {
    /// Create a new orchestrator from a validated configuration.
    pub fn new(
        config: &Config,
        page: Arc<dyn PageCollaborator>,
        engine: QuestionEngine,
        operator: Arc<dyn Operator>,
    ) -> Self {
        Self {
            run: config.run.clone(),
            search: config.search.clone(),
            filters: config.filters.clone(),
            application: config.application.clone(),
            retry: config.retry.clone(),
            pacing: config.pacing.clone(),
            page,
            engine,
            operator,
            outcomes: None,
            config_hash: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Persist every outcome through the outcome log.
    pub fn with_outcome_log(mut self, handle: OutcomeHandle) -> Self {
        self.outcomes = Some(handle);
        self
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Flag that stops the run at the next listing boundary when set.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Process every search group and produce the session summary.
    ///
    /// Never fails: page, AI and cache errors end up as outcomes, abandoned
    /// groups or a halt reason on the summary.
    pub async fn run(&self, cache: &mut AnswerCache, mut ctx: RunContext) -> RunReport {
        let mut summary = SessionSummary::new(ctx.run_id.clone());
        summary.config_hash = self.config_hash.clone();

        let mut groups: Vec<&SearchGroup> = self.search.groups.iter().collect();
        if self.run.randomize_search_order {
            groups.shuffle(&mut rand::thread_rng());
        }

        info!(
            run_id = %ctx.run_id,
            groups = groups.len(),
            page = self.page.name(),
            ai = self.engine.has_ai(),
            "Starting run"
        );

        let mut adjuster = TimeFilterAdjuster::new(self.search.time_filter.clone());

        for group in groups {
            if self.check_cancelled(&mut ctx) {
                break;
            }
            if ctx.global_cap_reached(&self.run) {
                info!(
                    applied_this_run = ctx.applied_this_run,
                    applied_today = ctx.applied_today,
                    "Application limit reached, stopping run"
                );
                break;
            }

            let end = self
                .run_group(group, &mut adjuster, cache, &mut ctx, &mut summary)
                .await;
            info!(group_id = %group.id, end = end.as_str(), "Finished search group");

            let abandoned = match &end {
                GroupEnd::Abandoned(reason) | GroupEnd::SessionLost(reason) => Some(reason.clone()),
                _ => None,
            };
            summary.finish_group(
                &group.id,
                adjuster.current(),
                end == GroupEnd::Exhausted,
                abandoned,
            );

            if let GroupEnd::SessionLost(reason) = &end {
                warn!(group_id = %group.id, "Browser session lost, halting run: {}", reason);
                summary.halted = Some(reason.clone());
            }
            if end.stops_run() {
                break;
            }
        }

        if let Err(e) = cache.flush() {
            warn!("Failed to flush answer cache: {}", e);
        }

        summary.cancelled = ctx.cancelled;
        summary.finalize();
        info!(
            run_id = %ctx.run_id,
            applied = summary.counts.applied,
            skipped = summary.counts.skipped,
            failed = summary.counts.failed,
            discarded = summary.counts.discarded,
            "Run finished"
        );

        RunReport {
            summary,
            context: ctx,
        }
    }

    async fn run_group(
        &self,
        group: &SearchGroup,
        adjuster: &mut TimeFilterAdjuster,
        cache: &mut AnswerCache,
        ctx: &mut RunContext,
        summary: &mut SessionSummary,
    ) -> GroupEnd {
        let filter = self.filters.for_group(&group.overrides);
        let cap = group
            .overrides
            .max_applications
            .unwrap_or(self.run.max_applications_per_group);
        adjuster.reset(group.overrides.initial_time_filter);

        info!(
            group_id = %group.id,
            category = group.category.as_deref().unwrap_or("-"),
            terms = group.terms.len(),
            cap,
            time_filter = %adjuster.current(),
            "Processing search group"
        );

        let mut last_term_exhausted = false;
        for term in group.terms.iter().filter(|t| !t.trim().is_empty()) {
            let mut page_index = 0;
            last_term_exhausted = false;
            adjuster.next_term();

            loop {
                if self.check_cancelled(ctx) {
                    return GroupEnd::Cancelled;
                }
                if ctx.global_cap_reached(&self.run) || ctx.group_cap_reached(&group.id, cap) {
                    return GroupEnd::CapReached;
                }
                if page_index >= self.run.max_pages_per_term {
                    warn!(
                        group_id = %group.id,
                        term = %term,
                        pages = page_index,
                        "Page limit reached for search term"
                    );
                    break;
                }

                let request = SearchRequest {
                    term: term.clone(),
                    location: group.location.clone(),
                    time_filter: adjuster.current(),
                    page: page_index,
                };
                debug!(url = %request.search_url(), "Fetching search page");

                let page = match with_retry(&self.retry, "search", || self.page.search(&request)).await
                {
                    Ok(page) => page,
                    Err(PageError::SessionLost(reason)) => return GroupEnd::SessionLost(reason),
                    Err(e) => {
                        warn!(group_id = %group.id, term = %term, "Abandoning search group: {}", e);
                        metrics::GROUPS_ABANDONED.inc();
                        return GroupEnd::Abandoned(e.to_string());
                    }
                };

                let count = page.listings.len();
                metrics::PAGE_FETCHES
                    .with_label_values(&[request.time_filter.as_str()])
                    .inc();
                metrics::SEARCH_RESULTS
                    .with_label_values(&[])
                    .observe(count as f64);
                debug!(
                    group_id = %group.id,
                    term = %term,
                    page = page_index,
                    time_filter = %request.time_filter,
                    count,
                    has_more = page.has_more,
                    "Search page fetched"
                );

                let page_end = self
                    .process_listings(
                        group,
                        &filter,
                        cap,
                        &page.listings,
                        request.time_filter,
                        cache,
                        ctx,
                        summary,
                    )
                    .await;
                if let PageEnd::Stop(end) = page_end {
                    return end;
                }

                match adjuster.observe(count) {
                    AdjustSignal::Exhausted => {
                        info!(group_id = %group.id, term = %term, "Search term exhausted");
                        last_term_exhausted = true;
                        break;
                    }
                    AdjustSignal::Widened { from, to } => {
                        info!(
                            group_id = %group.id,
                            term = %term,
                            from = %from,
                            to = %to,
                            count,
                            "Widening time filter"
                        );
                        metrics::TIME_FILTER_WIDENED
                            .with_label_values(&[to.as_str()])
                            .inc();
                        page_index = 0;
                    }
                    AdjustSignal::Keep => {
                        if adjuster.is_saturated() {
                            debug!(
                                group_id = %group.id,
                                time_filter = %adjuster.current(),
                                "Result pages saturated, bound kept for this group"
                            );
                        }
                        // An empty page at Any is confirmed by one more fetch.
                        let confirm_empty = count == 0 && adjuster.current() == TimeFilter::Any;
                        if !page.has_more && !confirm_empty {
                            break;
                        }
                        page_index += 1;
                    }
                }
            }
        }

        if last_term_exhausted {
            info!(group_id = %group.id, "Search group exhausted");
            GroupEnd::Exhausted
        } else {
            GroupEnd::Completed
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_listings(
        &self,
        group: &SearchGroup,
        filter: &FilterConfig,
        cap: u32,
        listings: &[JobListing],
        time_filter: TimeFilter,
        cache: &mut AnswerCache,
        ctx: &mut RunContext,
        summary: &mut SessionSummary,
    ) -> PageEnd {
        let mut cap_reached = false;

        for listing in listings {
            if self.check_cancelled(ctx) {
                return PageEnd::Stop(GroupEnd::Cancelled);
            }
            if !ctx.mark_seen(&listing.id) {
                debug!(listing_id = %listing.id, "Listing already handled this run");
                continue;
            }

            if ctx.global_cap_reached(&self.run) || ctx.group_cap_reached(&group.id, cap) {
                cap_reached = true;
                let outcome =
                    ApplicationOutcome::skipped(&ctx.run_id, &group.id, listing, SkipReason::LimitReached)
                        .with_time_filter(time_filter);
                self.record(outcome, ctx, summary).await;
                continue;
            }

            if let Some(reason) = classify(listing, filter, &ctx.applied) {
                let outcome = ApplicationOutcome::skipped(&ctx.run_id, &group.id, listing, reason)
                    .with_time_filter(time_filter);
                self.record(outcome, ctx, summary).await;
                continue;
            }

            if ctx.attempted > 0 {
                let delay = self.pacing.next_delay();
                if !delay.is_zero() {
                    debug!(delay_ms = delay.as_millis() as u64, "Pacing before next application");
                    tokio::time::sleep(delay).await;
                }
            }
            ctx.attempted += 1;

            let machine = ApplicationStateMachine::new(
                self.page.as_ref(),
                &self.engine,
                self.operator.as_ref(),
                &self.application,
                &self.retry,
            );
            let report = machine.run(listing, cache).await;
            summary.record_answers(&report.answers);
            if report.state == ApplicationState::Submitted {
                metrics::FORM_PAGES
                    .with_label_values(&[])
                    .observe(report.pages as f64);
            }

            let status = report.status();
            let outcome = report
                .to_outcome(&ctx.run_id, &group.id, listing)
                .with_time_filter(time_filter);
            self.record(outcome, ctx, summary).await;

            if matches!(status, OutcomeStatus::Applied | OutcomeStatus::Failed) {
                if let Err(e) = cache.flush() {
                    warn!("Failed to flush answer cache: {}", e);
                }
            }

            if report.cancel_requested {
                info!(listing_id = %listing.id, "Operator cancelled the run");
                self.cancel();
                ctx.cancelled = true;
                return PageEnd::Stop(GroupEnd::Cancelled);
            }

            match report.escalation {
                Some(PageError::SessionLost(reason)) => {
                    return PageEnd::Stop(GroupEnd::SessionLost(reason));
                }
                Some(e) => {
                    warn!(group_id = %group.id, "Abandoning search group: {}", e);
                    metrics::GROUPS_ABANDONED.inc();
                    return PageEnd::Stop(GroupEnd::Abandoned(e.to_string()));
                }
                None => {}
            }
        }

        if cap_reached {
            PageEnd::Stop(GroupEnd::CapReached)
        } else {
            PageEnd::Continue
        }
    }

    async fn record(
        &self,
        outcome: ApplicationOutcome,
        ctx: &mut RunContext,
        summary: &mut SessionSummary,
    ) {
        metrics::APPLICATIONS
            .with_label_values(&[outcome.status.as_str()])
            .inc();

        match (outcome.status, outcome.reason) {
            (OutcomeStatus::Applied, _) => {
                ctx.record_applied(&outcome.listing_id, &outcome.group_id);
                info!(
                    listing_id = %outcome.listing_id,
                    group_id = %outcome.group_id,
                    company = %outcome.company,
                    title = %outcome.title,
                    "Applied"
                );
            }
            (status, Some(reason)) => {
                metrics::SKIPS.with_label_values(&[reason.as_str()]).inc();
                if status == OutcomeStatus::Failed {
                    warn!(
                        listing_id = %outcome.listing_id,
                        group_id = %outcome.group_id,
                        reason = %reason,
                        detail = outcome.detail.as_deref().unwrap_or_default(),
                        "Application failed"
                    );
                } else {
                    info!(
                        listing_id = %outcome.listing_id,
                        group_id = %outcome.group_id,
                        company = %outcome.company,
                        status = %status,
                        reason = %reason,
                        "Listing not applied to"
                    );
                }
            }
            (status, None) => {
                info!(listing_id = %outcome.listing_id, status = %status, "Listing recorded");
            }
        }

        summary.record(&outcome);
        if let Some(log) = &self.outcomes {
            log.record(outcome).await;
        }
    }

    fn check_cancelled(&self, ctx: &mut RunContext) -> bool {
        if self.cancel.load(Ordering::SeqCst) {
            ctx.cancelled = true;
        }
        ctx.cancelled
    }
}
