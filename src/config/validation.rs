use crate::config::types::{ApiConfig, Config, CrawlerConfig, ResolverConfig, StoreConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_api_config(&config.api)?;
    validate_resolver_config(&config.resolver)?;
    validate_store_config(&config.store)?;
    validate_accounts(config)?;
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_friends_to_load < 1 {
        return Err(ConfigError::Validation(format!(
            "max_friends_to_load must be >= 1, got {}",
            config.max_friends_to_load
        )));
    }

    if config.stale_after_days < 1 {
        return Err(ConfigError::Validation(format!(
            "stale_after_days must be >= 1, got {}",
            config.stale_after_days
        )));
    }

    if config.call_ceiling < 1 {
        return Err(ConfigError::Validation(format!(
            "call_ceiling must be >= 1, got {}",
            config.call_ceiling
        )));
    }

    Ok(())
}

fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must be http(s), got '{}'",
            config.base_url
        )));
    }

    if config.reset_pad_secs < 0 {
        return Err(ConfigError::Validation(format!(
            "reset_pad_secs must be >= 0, got {}",
            config.reset_pad_secs
        )));
    }

    if config.cooldown_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "cooldown_secs must be >= 1, got {}",
            config.cooldown_secs
        )));
    }

    Ok(())
}

fn validate_resolver_config(config: &ResolverConfig) -> Result<(), ConfigError> {
    if config.max_hops < 1 {
        return Err(ConfigError::Validation(format!(
            "max_hops must be >= 1, got {}",
            config.max_hops
        )));
    }

    if config.max_in_flight < 1 || config.max_in_flight > 2000 {
        return Err(ConfigError::Validation(format!(
            "max_in_flight must be between 1 and 2000, got {}",
            config.max_in_flight
        )));
    }

    if config.max_per_host < 1 {
        return Err(ConfigError::Validation(format!(
            "max_per_host must be >= 1, got {}",
            config.max_per_host
        )));
    }

    if config.max_url_length < 1 {
        return Err(ConfigError::Validation(format!(
            "max_url_length must be >= 1, got {}",
            config.max_url_length
        )));
    }

    Ok(())
}

fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_accounts(config: &Config) -> Result<(), ConfigError> {
    if config.accounts.is_empty() {
        return Err(ConfigError::Validation(
            "at least one account is required".to_string(),
        ));
    }

    for account in &config.accounts {
        if account.name.is_empty() {
            return Err(ConfigError::Validation(
                "account name cannot be empty".to_string(),
            ));
        }

        if account.consumer_key.is_empty()
            || account.consumer_secret.is_empty()
            || account.access_token.is_empty()
            || account.access_token_secret.is_empty()
        {
            return Err(ConfigError::Validation(format!(
                "account '{}' has an empty credential field",
                account.name
            )));
        }
    }

    Ok(())
}
