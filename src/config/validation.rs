use super::{Config, ConfigError};

/// Validates a loaded [`Config`], catching mistakes that would otherwise
/// surface much later as a confusing runtime error (spec §6, CLI/environment
/// validation).
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.kv.url.trim().is_empty() {
        return Err(ConfigError::Validation("kv.url must not be empty".into()));
    }
    if config.kv.shard_count == 0 {
        return Err(ConfigError::Validation(
            "kv.shard_count must be at least 1".into(),
        ));
    }

    if config.orchestrator.max_workers == 0 {
        return Err(ConfigError::Validation(
            "orchestrator.max-workers must be at least 1".into(),
        ));
    }
    if config.orchestrator.poll_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "orchestrator.poll-interval-secs must be at least 1".into(),
        ));
    }

    if config.politeness.robots_cache_capacity == 0 {
        return Err(ConfigError::Validation(
            "politeness.robots-cache-capacity must be at least 1".into(),
        ));
    }

    if config.user_agent.crawler_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent.crawler-name must not be empty".into(),
        ));
    }
    if config.user_agent.contact_email.trim().is_empty()
        || !config.user_agent.contact_email.contains('@')
    {
        return Err(ConfigError::InvalidUrl(format!(
            "user-agent.contact-email looks invalid: {}",
            config.user_agent.contact_email
        )));
    }

    Ok(())
}
