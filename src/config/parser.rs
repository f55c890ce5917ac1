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
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// This is used to detect if the configuration has changed between crawl runs.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
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
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID_CONFIG: &str = r#"
[crawler]
max-depth = 2
max-friends-to-load = 5000
stale-after-days = 7
call-ceiling = 50000

[api]
base-url = "https://api.example.com/1.1"

[resolver]
max-hops = 10
max-in-flight = 100

[store]
database-path = "./graph.db"

[[accounts]]
name = "primary"
consumer-key = "ck1"
consumer-secret = "cs1"
access-token = "at1"
access-token-secret = "ats1"

[[accounts]]
name = "secondary"
consumer-key = "ck2"
consumer-secret = "cs2"
access-token = "at2"
access-token-secret = "ats2"
"#;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_depth, 2);
        assert_eq!(config.crawler.max_friends_to_load, 5000);
        assert_eq!(config.accounts.len(), 2);
        assert_eq!(config.accounts[1].name, "secondary");
        assert_eq!(config.resolver.max_in_flight, 100);
        // unspecified knobs keep their defaults
        assert_eq!(config.api.reset_pad_secs, 20);
        assert_eq!(config.api.cooldown_secs, 1200);
        assert_eq!(config.resolver.max_per_host, 50);
    }

    #[test]
    fn test_defaults_without_resolver_section() {
        let slim = VALID_CONFIG.replace("[resolver]\nmax-hops = 10\nmax-in-flight = 100\n", "");
        let file = create_temp_config(&slim);
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.resolver.max_hops, 10);
        assert_eq!(config.resolver.max_in_flight, 500);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let config_content = "this is not valid TOML {{{";
        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let no_accounts = VALID_CONFIG
            .split("[[accounts]]")
            .next()
            .unwrap()
            .to_string();
        let file = create_temp_config(&no_accounts);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        // Same content should produce same hash
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA-256 produces 64 hex characters
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
