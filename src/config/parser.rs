use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use tidemark::config::load_config;
///
/// let config = load_config(Path::new("tidemark.toml")).unwrap();
/// println!("Max items: {}", config.engine.max_items);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Stored with every run so reports can be traced back to the tuning that
/// produced them.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Platform, TargetKind};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID: &str = r#"
[engine]
max-items = 10
max-scroll-attempts = 25
stability-threshold = 3
inter-attempt-delay = 1000
guest-mode = true

[rate-limit]
minimum-interval = 1500
max-concurrent-pages = 4

[output]
database-path = "./test.db"
summary-path = "./summary.md"
json-dir = "./out"

[[target]]
platform = "tiktok"
username = "some.creator"
snapshots = ["a.html", "b.html"]

[[target]]
platform = "instagram"
kind = "post"
url = "/p/ABC123/"
"#;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.engine.max_items, 10);
        assert_eq!(config.engine.max_scroll_attempts, 25);
        assert_eq!(config.engine.stability_threshold, 3);
        assert!(config.engine.guest_mode);
        assert_eq!(config.rate_limit.minimum_interval, 1500);
        assert_eq!(config.rate_limit.max_concurrent_pages, 4);
        assert_eq!(config.output.json_dir.as_deref(), Some("./out"));
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[0].platform, Platform::TikTok);
        assert_eq!(config.targets[0].kind, TargetKind::Profile);
        assert_eq!(config.targets[0].snapshots.len(), 2);
        assert_eq!(config.targets[1].kind, TargetKind::Post);
    }

    #[test]
    fn test_omitted_sections_use_defaults() {
        let config = parse_config(
            r#"
[output]
database-path = "./test.db"
summary-path = "./summary.md"
"#,
        )
        .unwrap();

        assert_eq!(config.engine.max_items, 12);
        assert_eq!(config.engine.stability_threshold, 2);
        assert_eq!(config.rate_limit.max_block_retries, 2);
        assert!(config.targets.is_empty());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/tidemark.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unreachable_threshold_is_rejected() {
        let file = create_temp_config(&VALID.replace("stability-threshold = 3", "stability-threshold = 30"));
        assert!(matches!(load_config(file.path()), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_unknown_platform_is_a_parse_error() {
        let result = parse_config(&VALID.replace("\"tiktok\"", "\"myspace\""));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_hash_tracks_tuning_changes() {
        let original = create_temp_config(VALID);
        let retuned = create_temp_config(&VALID.replace("max-items = 10", "max-items = 40"));

        let (config, hash) = load_config_with_hash(original.path()).unwrap();
        assert_eq!(config.engine.max_items, 10);
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, compute_config_hash(original.path()).unwrap());

        let (_, retuned_hash) = load_config_with_hash(retuned.path()).unwrap();
        assert_ne!(hash, retuned_hash);
    }

    #[test]
    fn test_post_snapshots_table() {
        let config = parse_config(
            r#"
[engine]
post-details = false

[output]
database-path = "./test.db"
summary-path = "./summary.md"

[[target]]
platform = "instagram"
username = "someone"
snapshots = ["grid.html"]

[target.post-snapshots]
"/p/AAA/" = ["aaa.html"]
"#,
        )
        .unwrap();

        assert!(!config.engine.post_details);
        let target = &config.targets[0];
        let post = target.post_target("/p/AAA/");
        assert_eq!(post.kind, TargetKind::Post);
        assert_eq!(post.snapshots, vec!["aaa.html".to_string()]);
        assert!(target.post_target("/p/BBB/").snapshots.is_empty());
    }
}
