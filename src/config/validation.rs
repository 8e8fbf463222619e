use crate::config::types::{
    Config, ExtractorConfig, FieldRule, SourceConfig, StoreConfig, TestConfig, WorkerConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_worker_config(&config.workers)?;

    if config.refill.chunk_size < 1 {
        return Err(ConfigError::Validation(format!(
            "refill chunk_size must be >= 1, got {}",
            config.refill.chunk_size
        )));
    }

    if config.output.bucket.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output bucket cannot be empty".to_string(),
        ));
    }

    validate_store_config("local", &config.store.local)?;
    validate_store_config("remote", &config.store.remote)?;
    validate_test_config(&config.test)?;
    validate_extractor_config(&config.extractor)?;
    Ok(())
}

/// Validates the source name and retailer
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    if config.name.is_empty() {
        return Err(ConfigError::Validation(
            "source name cannot be empty".to_string(),
        ));
    }

    // The name becomes the first segment of every object key
    if !config
        .name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "source name must contain only ASCII alphanumerics, '-' and '_', got '{}'",
            config.name
        )));
    }

    if config.retailer.trim().is_empty() {
        return Err(ConfigError::Validation(
            "retailer cannot be empty".to_string(),
        ));
    }

    for (label, key) in [
        ("master-queue", &config.master_queue),
        ("working-queue", &config.working_queue),
        ("state-key", &config.state_key),
    ] {
        if matches!(key, Some(k) if k.trim().is_empty()) {
            return Err(ConfigError::Validation(format!("{} cannot be empty", label)));
        }
    }

    Ok(())
}

/// Validates worker pool tunables
fn validate_worker_config(config: &WorkerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 256 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 256, got {}",
            config.concurrency
        )));
    }

    if config.urls_per_batch < 1 {
        return Err(ConfigError::Validation(format!(
            "urls_per_batch must be >= 1, got {}",
            config.urls_per_batch
        )));
    }

    if config.bulk_size < 1 {
        return Err(ConfigError::Validation(format!(
            "bulk_size must be >= 1, got {}",
            config.bulk_size
        )));
    }

    if config.fetch_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch_timeout_secs must be >= 1, got {}",
            config.fetch_timeout_secs
        )));
    }

    Ok(())
}

/// Validates a queue store connection
fn validate_store_config(label: &str, config: &StoreConfig) -> Result<(), ConfigError> {
    match config {
        StoreConfig::Sqlite { path } if path.trim().is_empty() => Err(ConfigError::Validation(
            format!("{} store path cannot be empty", label),
        )),
        StoreConfig::Redis { url } => {
            let parsed = Url::parse(url).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid {} store url: {}", label, e))
            })?;
            if parsed.scheme() != "redis" && parsed.scheme() != "rediss" {
                return Err(ConfigError::Validation(format!(
                    "{} store url must use redis:// or rediss://, got '{}'",
                    label, url
                )));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Validates test-mode settings
fn validate_test_config(config: &TestConfig) -> Result<(), ConfigError> {
    if config.sample_size < 1 {
        return Err(ConfigError::Validation(format!(
            "test sample_size must be >= 1, got {}",
            config.sample_size
        )));
    }

    if let Some(proxy) = &config.proxy {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid test proxy: {}", e)))?;
    }

    for url in &config.urls {
        validate_http_url(url)?;
    }

    Ok(())
}

/// Validates that every extraction selector parses
fn validate_extractor_config(config: &ExtractorConfig) -> Result<(), ConfigError> {
    for rule in [
        &config.price,
        &config.title,
        &config.brand,
        &config.mpn,
        &config.upc,
        &config.image,
        &config.rating,
        &config.review_count,
    ] {
        validate_field_rule(rule)?;
    }
    Ok(())
}

fn validate_field_rule(rule: &FieldRule) -> Result<(), ConfigError> {
    scraper::Selector::parse(&rule.selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", rule.selector, e)))?;

    if matches!(&rule.attr, Some(a) if a.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "attribute for selector '{}' cannot be empty",
            rule.selector
        )));
    }

    Ok(())
}

/// Validates an absolute http(s) URL
fn validate_http_url(url: &str) -> Result<(), ConfigError> {
    let parsed =
        Url::parse(url).map_err(|e| ConfigError::InvalidUrl(format!("'{}': {}", url, e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "URL '{}' must use http or https",
            url
        )));
    }

    Ok(())
}
