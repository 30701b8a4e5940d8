use std::collections::{HashMap, HashSet};

use super::RunConfig;

/// Mutable state of one run, threaded through every orchestrator step.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    /// Listings applied to in this or earlier runs.
    pub applied: HashSet<String>,
    /// Listings already given an outcome in this run.
    pub seen: HashSet<String>,
    pub applied_this_run: u32,
    pub applied_per_group: HashMap<String, u32>,
    /// Applications today, earlier runs included.
    pub applied_today: u32,
    /// Application attempts that reached the state machine.
    pub attempted: u32,
    pub cancelled: bool,
}

impl RunContext {
    pub fn new(applied: HashSet<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            applied,
            seen: HashSet::new(),
            applied_this_run: 0,
            applied_per_group: HashMap::new(),
            applied_today: 0,
            attempted: 0,
            cancelled: false,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// Seed today's count from the outcome log.
    pub fn with_applied_today(mut self, count: u32) -> Self {
        self.applied_today = count;
        self
    }

    /// Mark a listing as seen. Returns false if it already was.
    pub fn mark_seen(&mut self, listing_id: &str) -> bool {
        self.seen.insert(listing_id.to_string())
    }

    pub fn record_applied(&mut self, listing_id: &str, group_id: &str) {
        self.applied.insert(listing_id.to_string());
        self.applied_this_run += 1;
        self.applied_today += 1;
        *self.applied_per_group.entry(group_id.to_string()).or_insert(0) += 1;
    }

    pub fn applied_in_group(&self, group_id: &str) -> u32 {
        self.applied_per_group.get(group_id).copied().unwrap_or(0)
    }

    /// Run or daily cap reached.
    pub fn global_cap_reached(&self, run: &RunConfig) -> bool {
        self.applied_this_run >= run.max_applications_per_run
            || self.applied_today >= run.daily_application_limit
    }

    pub fn group_cap_reached(&self, group_id: &str, cap: u32) -> bool {
        self.applied_in_group(group_id) >= cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_seen_once() {
        let mut ctx = RunContext::new(HashSet::new());
        assert!(ctx.mark_seen("42"));
        assert!(!ctx.mark_seen("42"));
    }

    #[test]
    fn test_record_applied_updates_counters() {
        let mut ctx = RunContext::new(HashSet::new()).with_applied_today(3);
        ctx.record_applied("1", "backend");
        ctx.record_applied("2", "backend");

        assert!(ctx.applied.contains("1"));
        assert_eq!(ctx.applied_this_run, 2);
        assert_eq!(ctx.applied_today, 5);
        assert_eq!(ctx.applied_in_group("backend"), 2);
        assert_eq!(ctx.applied_in_group("frontend"), 0);
        assert!(ctx.group_cap_reached("backend", 2));
    }

    #[test]
    fn test_daily_limit_counts_earlier_runs() {
        let run = RunConfig {
            daily_application_limit: 10,
            ..Default::default()
        };
        let ctx = RunContext::new(HashSet::new()).with_applied_today(10);
        assert!(ctx.global_cap_reached(&run));
        assert!(!RunContext::new(HashSet::new()).global_cap_reached(&run));
    }

    #[test]
    fn test_run_ids_are_unique() {
        let a = RunContext::new(HashSet::new());
        let b = RunContext::new(HashSet::new());
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.with_run_id("fixed").run_id, "fixed");
    }
}
