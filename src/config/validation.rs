use crate::config::types::{Config, EngineConfig, OutputConfig, RateLimitConfig, TargetEntry};
use crate::platform::TargetKind;
use crate::url::{resolve_post_url, validate_username};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_engine_config(&config.engine)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_output_config(&config.output)?;
    for target in &config.targets {
        validate_target(target)?;
    }
    Ok(())
}

/// Validates extraction and pagination tuning
fn validate_engine_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.max_scroll_attempts < 1 || config.max_scroll_attempts > 500 {
        return Err(ConfigError::Validation(format!(
            "max_scroll_attempts must be between 1 and 500, got {}",
            config.max_scroll_attempts
        )));
    }

    if config.stability_threshold < 1 {
        return Err(ConfigError::Validation(
            "stability_threshold must be >= 1".to_string(),
        ));
    }

    // A threshold above the cap could never be reached
    if config.stability_threshold > config.max_scroll_attempts {
        return Err(ConfigError::Validation(format!(
            "stability_threshold ({}) cannot exceed max_scroll_attempts ({})",
            config.stability_threshold, config.max_scroll_attempts
        )));
    }

    if config.locator_timeout < 1 {
        return Err(ConfigError::Validation(
            "locator_timeout must be >= 1ms".to_string(),
        ));
    }

    if config.field_budget < config.locator_timeout {
        return Err(ConfigError::Validation(format!(
            "field_budget ({}ms) must be >= locator_timeout ({}ms)",
            config.field_budget, config.locator_timeout
        )));
    }

    Ok(())
}

/// Validates rate limiting configuration
fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_pages < 1 || config.max_concurrent_pages > 32 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_pages must be between 1 and 32, got {}",
            config.max_concurrent_pages
        )));
    }

    if config.max_requests_per_origin < 1 {
        return Err(ConfigError::Validation(format!(
            "max_requests_per_origin must be >= 1, got {}",
            config.max_requests_per_origin
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty".to_string(),
        ));
    }

    if matches!(config.json_dir.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "json_dir cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates a single target entry
fn validate_target(target: &TargetEntry) -> Result<(), ConfigError> {
    match target.kind {
        TargetKind::Profile => {
            let username = target.username.as_deref().ok_or_else(|| {
                ConfigError::InvalidTarget(format!(
                    "{} profile target requires a username",
                    target.platform
                ))
            })?;
            validate_username(username)
                .map_err(|e| ConfigError::InvalidTarget(e.to_string()))?;
        }
        TargetKind::Post => {
            let url = target.url.as_deref().ok_or_else(|| {
                ConfigError::InvalidTarget(format!(
                    "{} post target requires a url",
                    target.platform
                ))
            })?;
            resolve_post_url(target.platform, url)
                .map_err(|e| ConfigError::InvalidUrl(format!("Invalid post url '{}': {}", url, e)))?;
        }
    }

    if target.snapshots.iter().any(|s| s.trim().is_empty()) {
        return Err(ConfigError::InvalidTarget(format!(
            "{} has an empty snapshot path",
            target.label()
        )));
    }

    if target
        .post_snapshots
        .values()
        .flatten()
        .any(|s| s.trim().is_empty())
    {
        return Err(ConfigError::InvalidTarget(format!(
            "{} has an empty post snapshot path",
            target.label()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;

    fn output() -> OutputConfig {
        OutputConfig {
            database_path: "./db".to_string(),
            summary_path: "./summary.md".to_string(),
            json_dir: None,
        }
    }

    fn profile(username: Option<&str>) -> TargetEntry {
        TargetEntry {
            platform: Platform::TikTok,
            kind: TargetKind::Profile,
            username: username.map(str::to_string),
            url: None,
            snapshots: vec![],
            post_snapshots: Default::default(),
        }
    }

    #[test]
    fn test_default_engine_config_is_valid() {
        assert!(validate_engine_config(&EngineConfig::default()).is_ok());
        assert!(validate_rate_limit_config(&RateLimitConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config = EngineConfig {
            stability_threshold: 0,
            ..EngineConfig::default()
        };
        assert!(validate_engine_config(&config).is_err());
    }

    #[test]
    fn test_field_budget_below_locator_timeout_rejected() {
        let config = EngineConfig {
            locator_timeout: 500,
            field_budget: 100,
            ..EngineConfig::default()
        };
        assert!(validate_engine_config(&config).is_err());
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut config = RateLimitConfig::default();
        config.max_concurrent_pages = 0;
        assert!(validate_rate_limit_config(&config).is_err());
        config.max_concurrent_pages = 33;
        assert!(validate_rate_limit_config(&config).is_err());
        config.max_concurrent_pages = 8;
        assert!(validate_rate_limit_config(&config).is_ok());
    }

    #[test]
    fn test_output_paths() {
        assert!(validate_output_config(&output()).is_ok());

        let mut bad = output();
        bad.database_path.clear();
        assert!(validate_output_config(&bad).is_err());

        let mut bad = output();
        bad.json_dir = Some(String::new());
        assert!(validate_output_config(&bad).is_err());
    }

    #[test]
    fn test_profile_target_requires_username() {
        assert!(validate_target(&profile(Some("creator_01"))).is_ok());
        assert!(validate_target(&profile(None)).is_err());
        assert!(validate_target(&profile(Some("bad name"))).is_err());
    }

    #[test]
    fn test_post_target_requires_url() {
        let mut target = TargetEntry {
            platform: Platform::Instagram,
            kind: TargetKind::Post,
            username: None,
            url: None,
            snapshots: vec![],
            post_snapshots: Default::default(),
        };
        assert!(validate_target(&target).is_err());

        target.url = Some("/p/ABC123/".to_string());
        assert!(validate_target(&target).is_ok());

        target.url = Some("ftp://www.instagram.com/p/ABC123/".to_string());
        assert!(validate_target(&target).is_err());
    }

    #[test]
    fn test_empty_snapshot_path_rejected() {
        let mut target = profile(Some("creator"));
        target.snapshots = vec!["ok.html".to_string(), " ".to_string()];
        assert!(validate_target(&target).is_err());
    }

    #[test]
    fn test_empty_post_snapshot_path_rejected() {
        let mut target = profile(Some("creator"));
        target
            .post_snapshots
            .insert("/p/AAA/".to_string(), vec!["".to_string()]);
        assert!(validate_target(&target).is_err());
    }
}
