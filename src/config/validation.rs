use super::models::Config;
use crate::money::Usd;
use crate::triggers::{MAX_PRIORITY, MIN_PRIORITY};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Budget must be positive: {field} = {value}")]
    NonPositiveBudget { field: String, value: Usd },

    #[error("Monthly budget ({monthly}) is below the daily budget ({daily})")]
    MonthlyBelowDaily { daily: Usd, monthly: Usd },

    #[error("discovery.batch_size must be at least 1")]
    ZeroBatchSize,

    #[error("discovery.poll_interval_secs must be at least 1")]
    ZeroPollInterval,

    #[error("Trigger '{name}' has priority {priority}, expected {min}..={max}")]
    InvalidTriggerPriority {
        name: String,
        priority: u8,
        min: u8,
        max: u8,
    },

    #[error("Trigger name must not be empty")]
    EmptyTriggerName,

    #[error("Duplicate trigger name '{0}'")]
    DuplicateTrigger(String),

    #[error("Court '{0}' is both allowed and excluded")]
    CourtAllowedAndExcluded(String),

    #[error("Invalid backoff settings: {0}")]
    InvalidBackoff(String),

    #[error("Invalid billing settings: {0}")]
    InvalidBilling(String),

    #[error("pacer.login_attempts must be at least 1")]
    ZeroLoginAttempts,

    #[error("Invalid URL for {field}: {value}")]
    InvalidUrl { field: String, value: String },

    #[error("pacer.browser_login is enabled but this build lacks the `browser` feature")]
    BrowserLoginUnavailable,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_budgets(config)?;
    validate_discovery(config)?;
    validate_triggers(config)?;
    validate_backoff(config)?;
    validate_billing(config)?;
    validate_pacer(config)?;
    Ok(())
}

fn validate_budgets(config: &Config) -> Result<(), ValidationError> {
    let d = &config.discovery;
    for (field, value) in [
        ("discovery.daily_budget", d.daily_budget),
        ("discovery.monthly_budget", d.monthly_budget),
    ] {
        if !value.is_positive() {
            return Err(ValidationError::NonPositiveBudget {
                field: field.to_string(),
                value,
            });
        }
    }

    if d.monthly_budget < d.daily_budget {
        return Err(ValidationError::MonthlyBelowDaily {
            daily: d.daily_budget,
            monthly: d.monthly_budget,
        });
    }

    if d.default_estimate.cents() < 0 {
        return Err(ValidationError::NonPositiveBudget {
            field: "discovery.default_estimate".to_string(),
            value: d.default_estimate,
        });
    }

    Ok(())
}

fn validate_discovery(config: &Config) -> Result<(), ValidationError> {
    let d = &config.discovery;
    if d.batch_size == 0 {
        return Err(ValidationError::ZeroBatchSize);
    }
    if d.poll_interval_secs == 0 {
        return Err(ValidationError::ZeroPollInterval);
    }

    let excluded: HashSet<String> = d
        .excluded_courts
        .iter()
        .map(|c| c.trim().to_lowercase())
        .collect();
    for court in &d.allowed_courts {
        let court = court.trim().to_lowercase();
        if excluded.contains(&court) {
            return Err(ValidationError::CourtAllowedAndExcluded(court));
        }
    }
    Ok(())
}

fn validate_triggers(config: &Config) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    if config.discovery.use_default_triggers {
        for t in crate::triggers::default_triggers() {
            seen.insert(t.name);
        }
    }

    for trigger in &config.discovery.triggers {
        if trigger.name.trim().is_empty() {
            return Err(ValidationError::EmptyTriggerName);
        }
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&trigger.priority) {
            return Err(ValidationError::InvalidTriggerPriority {
                name: trigger.name.clone(),
                priority: trigger.priority,
                min: MIN_PRIORITY,
                max: MAX_PRIORITY,
            });
        }
        if !seen.insert(trigger.name.clone()) {
            return Err(ValidationError::DuplicateTrigger(trigger.name.clone()));
        }
    }
    Ok(())
}

fn validate_backoff(config: &Config) -> Result<(), ValidationError> {
    let b = &config.backoff;
    let finite = [b.initial_secs, b.max_secs, b.multiplier, b.jitter]
        .iter()
        .all(|v| v.is_finite());
    if !finite {
        return Err(ValidationError::InvalidBackoff("values must be finite".into()));
    }
    if b.initial_secs < 0.0 || b.max_secs < b.initial_secs {
        return Err(ValidationError::InvalidBackoff(format!(
            "need 0 <= initial_secs ({}) <= max_secs ({})",
            b.initial_secs, b.max_secs
        )));
    }
    if b.multiplier < 1.0 {
        return Err(ValidationError::InvalidBackoff(format!(
            "multiplier {} is below 1.0",
            b.multiplier
        )));
    }
    if !(0.0..=1.0).contains(&b.jitter) {
        return Err(ValidationError::InvalidBackoff(format!(
            "jitter {} outside 0.0..=1.0",
            b.jitter
        )));
    }
    Ok(())
}

fn validate_billing(config: &Config) -> Result<(), ValidationError> {
    let c = &config.billing;
    if !c.per_page_rate.is_positive() || !c.max_charge.is_positive() {
        return Err(ValidationError::InvalidBilling(
            "per_page_rate and max_charge must be positive".into(),
        ));
    }
    if c.bytes_per_page == 0 || c.entries_per_page == 0 {
        return Err(ValidationError::InvalidBilling(
            "bytes_per_page and entries_per_page must be positive".into(),
        ));
    }
    Ok(())
}

fn validate_pacer(config: &Config) -> Result<(), ValidationError> {
    let p = &config.pacer;
    if p.login_attempts == 0 {
        return Err(ValidationError::ZeroLoginAttempts);
    }

    for (field, value) in [
        ("pacer.login_base_url", p.login_base_url.clone()),
        ("pacer.ecf_base_url", p.ecf_base(&p.validation_court)),
    ] {
        if url::Url::parse(&value).is_err() {
            return Err(ValidationError::InvalidUrl {
                field: field.to_string(),
                value,
            });
        }
    }

    if p.browser_login && !cfg!(feature = "browser") {
        return Err(ValidationError::BrowserLoginUnavailable);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triggers::Trigger;

    fn create_test_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_valid_config() {
        let config = create_test_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_budget() {
        let mut config = create_test_config();
        config.discovery.daily_budget = Usd::ZERO;

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::NonPositiveBudget { .. })));
    }

    #[test]
    fn test_monthly_below_daily() {
        let mut config = create_test_config();
        config.discovery.daily_budget = Usd::from_cents(5_000);

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::MonthlyBelowDaily { .. })));
    }

    #[test]
    fn test_zero_batch_size() {
        let mut config = create_test_config();
        config.discovery.batch_size = 0;
        assert!(matches!(validate(&config), Err(ValidationError::ZeroBatchSize)));
    }

    #[test]
    fn test_trigger_priority_range() {
        let mut config = create_test_config();
        config
            .discovery
            .triggers
            .push(Trigger::builder().name("loud").priority(11).build());

        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidTriggerPriority { priority: 11, .. })
        ));
    }

    #[test]
    fn test_duplicate_trigger_with_defaults() {
        let mut config = create_test_config();
        config
            .discovery
            .triggers
            .push(Trigger::builder().name("antitrust").priority(3).build());
        assert!(matches!(
            validate(&config),
            Err(ValidationError::DuplicateTrigger(name)) if name == "antitrust"
        ));

        config.discovery.use_default_triggers = false;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_court_allowed_and_excluded() {
        let mut config = create_test_config();
        config.discovery.allowed_courts = vec!["CACD".into()];
        config.discovery.excluded_courts = vec!["cacd".into()];
        assert!(matches!(
            validate(&config),
            Err(ValidationError::CourtAllowedAndExcluded(_))
        ));
    }

    #[test]
    fn test_invalid_backoff() {
        let mut config = create_test_config();
        config.backoff.jitter = 1.5;
        assert!(matches!(validate(&config), Err(ValidationError::InvalidBackoff(_))));

        let mut config = create_test_config();
        config.backoff.max_secs = 1.0;
        assert!(matches!(validate(&config), Err(ValidationError::InvalidBackoff(_))));
    }

    #[test]
    fn test_invalid_url() {
        let mut config = create_test_config();
        config.pacer.login_base_url = "not a url".into();
        assert!(matches!(validate(&config), Err(ValidationError::InvalidUrl { .. })));
    }

    #[cfg(not(feature = "browser"))]
    #[test]
    fn test_browser_login_requires_feature() {
        let mut config = create_test_config();
        config.pacer.browser_login = true;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::BrowserLoginUnavailable)
        ));
    }
}
