use super::{validate, Config, ConfigError};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and validates a TOML configuration file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let raw = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&raw)?;
    validate(&config)?;
    Ok(config)
}

/// Loads a config and returns it alongside a hex-encoded SHA-256 hash of the
/// raw file contents, so a resumed run can detect whether the configuration
/// changed since the last run (teacher's `compute_config_hash`, reused to
/// guard resume safety the same way).
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let raw = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&raw)?;
    validate(&config)?;
    Ok((config, compute_config_hash(&raw)))
}

/// Hashes the raw config file contents.
pub fn compute_config_hash(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
seed-file = "seeds.txt"

[kv]
url = "redis://127.0.0.1:6379"

[frontier]
data-dir = "/tmp/ripplefront-data"

[user-agent]
crawler-name = "Ripplefront"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "crawl@example.com"
"#;

    #[test]
    fn loads_minimal_config_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.kv.shard_count, 16);
        assert_eq!(config.orchestrator.max_workers, 500);
        assert_eq!(config.politeness.min_crawl_delay_secs, 70);
    }

    #[test]
    fn same_contents_hash_identically() {
        assert_eq!(compute_config_hash(SAMPLE), compute_config_hash(SAMPLE));
        assert_ne!(compute_config_hash(SAMPLE), compute_config_hash("different"));
    }

    #[test]
    fn rejects_missing_file() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }
}
