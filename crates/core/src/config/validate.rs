use std::collections::HashSet;

use super::{types::Config, ConfigError};

/// Highest accepted `retry.max_retries`.
const MAX_RETRIES_LIMIT: u32 = 10;

/// Validate configuration before any search starts.
///
/// Rejects:
/// - no search groups, groups without terms, duplicate group ids
/// - zero application caps (global, per group, daily, group overrides)
/// - `low_result_threshold` above `page_size`
/// - `current_experience` below -1
/// - AI enabled without a model
/// - more than 10 retries, or `min_delay_ms` above `max_delay_ms`
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

    if config.search.groups.is_empty() {
        return invalid("search.groups must contain at least one group".to_string());
    }

    let mut ids = HashSet::new();
    for group in &config.search.groups {
        if group.id.trim().is_empty() {
            return invalid("search group id cannot be empty".to_string());
        }
        if !ids.insert(group.id.as_str()) {
            return invalid(format!("duplicate search group id '{}'", group.id));
        }
        if group.terms.iter().all(|t| t.trim().is_empty()) {
            return invalid(format!("search group '{}' has no terms", group.id));
        }
        if group.overrides.max_applications == Some(0) {
            return invalid(format!(
                "search group '{}' overrides max_applications to 0",
                group.id
            ));
        }
        if group.overrides.current_experience.is_some_and(|e| e < -1) {
            return invalid(format!(
                "search group '{}' has current_experience below -1",
                group.id
            ));
        }
    }

    let run = &config.run;
    if run.max_applications_per_run == 0 {
        return invalid("run.max_applications_per_run cannot be 0".to_string());
    }
    if run.max_applications_per_group == 0 {
        return invalid("run.max_applications_per_group cannot be 0".to_string());
    }
    if run.daily_application_limit == 0 {
        return invalid("run.daily_application_limit cannot be 0".to_string());
    }
    if run.max_pages_per_term == 0 {
        return invalid("run.max_pages_per_term cannot be 0".to_string());
    }

    let tf = &config.search.time_filter;
    if tf.page_size == 0 {
        return invalid("search.time_filter.page_size cannot be 0".to_string());
    }
    if tf.low_result_threshold > tf.page_size {
        return invalid(format!(
            "search.time_filter.low_result_threshold ({}) exceeds page_size ({})",
            tf.low_result_threshold, tf.page_size
        ));
    }
    if tf.widen_after == 0 || tf.exhaustion_pages == 0 {
        return invalid(
            "search.time_filter.widen_after and exhaustion_pages must be at least 1".to_string(),
        );
    }

    if config.filters.current_experience < -1 {
        return invalid("filters.current_experience cannot be below -1".to_string());
    }

    if let Some(ai) = config.enabled_ai() {
        if ai.model.trim().is_empty() {
            return invalid("ai.model is required when ai is enabled".to_string());
        }
    }

    if config.retry.max_retries > MAX_RETRIES_LIMIT {
        return invalid(format!(
            "retry.max_retries cannot exceed {}",
            MAX_RETRIES_LIMIT
        ));
    }

    if config.pacing.min_delay_ms > config.pacing.max_delay_ms {
        return invalid("pacing.min_delay_ms exceeds pacing.max_delay_ms".to_string());
    }

    if config.application.max_form_pages == 0 {
        return invalid("application.max_form_pages cannot be 0".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn base() -> Config {
        load_config_from_str(
            r#"
[[search.groups]]
id = "backend"
terms = ["rust developer"]

[[search.groups]]
id = "platform"
terms = ["platform engineer"]
"#,
        )
        .unwrap()
    }

    fn assert_invalid(config: &Config) {
        let result = validate_config(config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))), "{result:?}");
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&base()).is_ok());
    }

    #[test]
    fn test_no_groups() {
        let mut config = base();
        config.search.groups.clear();
        assert_invalid(&config);
    }

    #[test]
    fn test_group_without_terms() {
        let mut config = base();
        config.search.groups[1].terms = vec!["  ".to_string()];
        assert_invalid(&config);
    }

    #[test]
    fn test_duplicate_group_ids() {
        let mut config = base();
        config.search.groups[1].id = "backend".to_string();
        assert_invalid(&config);
    }

    #[test]
    fn test_zero_caps() {
        let mut config = base();
        config.run.max_applications_per_run = 0;
        assert_invalid(&config);

        let mut config = base();
        config.search.groups[0].overrides.max_applications = Some(0);
        assert_invalid(&config);
    }

    #[test]
    fn test_low_threshold_above_page_size() {
        let mut config = base();
        config.search.time_filter.low_result_threshold = 30;
        assert_invalid(&config);
    }

    #[test]
    fn test_experience_below_minus_one() {
        let mut config = base();
        config.filters.current_experience = -2;
        assert_invalid(&config);
    }

    #[test]
    fn test_ai_without_model() {
        let config = load_config_from_str(
            r#"
[[search.groups]]
id = "backend"
terms = ["rust developer"]

[ai]
provider = "ollama"
"#,
        )
        .unwrap();
        assert_invalid(&config);
    }

    #[test]
    fn test_disabled_ai_without_model_is_fine() {
        let config = load_config_from_str(
            r#"
[[search.groups]]
id = "backend"
terms = ["rust developer"]

[ai]
enabled = false
provider = "ollama"
"#,
        )
        .unwrap();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_too_many_retries() {
        let mut config = base();
        config.retry.max_retries = 11;
        assert_invalid(&config);
    }

    #[test]
    fn test_pacing_bounds() {
        let mut config = base();
        config.pacing.min_delay_ms = 10_000;
        config.pacing.max_delay_ms = 1_000;
        assert_invalid(&config);
    }
}
