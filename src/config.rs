//! Runtime configuration from environment variables

use std::env;

/// Configuration for the ingestion runtime
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for dedup marker files (content store)
    pub cache_dir: String,

    /// Directory the published CSV/README outputs are written into
    pub output_dir: String,

    /// Sleep between fetch cycles, seconds
    pub cooldown_secs: u64,

    /// Maximum attempts per fetch (and per git push)
    pub max_retries: u32,

    /// Wait between retry attempts, seconds
    pub retry_delay_secs: u64,

    /// Per-attempt HTTP timeout, seconds
    pub http_timeout_secs: u64,

    /// Whether to run git commit/push after publishing
    pub git_enabled: bool,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `COVIDFLOW_CACHE_DIR` (default: system temp dir)
    /// - `COVIDFLOW_OUTPUT_DIR` (default: current directory)
    /// - `COVIDFLOW_COOLDOWN_SECS` (default: 3600)
    /// - `COVIDFLOW_MAX_RETRIES` (default: 10)
    /// - `COVIDFLOW_RETRY_DELAY_SECS` (default: 6)
    /// - `COVIDFLOW_HTTP_TIMEOUT_SECS` (default: 30)
    /// - `COVIDFLOW_GIT_ENABLED` (default: true)
    pub fn from_env() -> Self {
        Self {
            cache_dir: env::var("COVIDFLOW_CACHE_DIR")
                .unwrap_or_else(|_| env::temp_dir().to_string_lossy().into_owned()),

            output_dir: env::var("COVIDFLOW_OUTPUT_DIR").unwrap_or_else(|_| ".".to_string()),

            cooldown_secs: env::var("COVIDFLOW_COOLDOWN_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3_600),

            max_retries: env::var("COVIDFLOW_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),

            retry_delay_secs: env::var("COVIDFLOW_RETRY_DELAY_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(6),

            http_timeout_secs: env::var("COVIDFLOW_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),

            git_enabled: env::var("COVIDFLOW_GIT_ENABLED")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidValue(
                "COVIDFLOW_MAX_RETRIES must be at least 1".to_string(),
            ));
        }

        if self.cache_dir.is_empty() {
            return Err(ConfigError::InvalidValue(
                "COVIDFLOW_CACHE_DIR cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Test: Default configuration when no env vars set
        env::remove_var("COVIDFLOW_COOLDOWN_SECS");
        env::remove_var("COVIDFLOW_MAX_RETRIES");
        env::remove_var("COVIDFLOW_RETRY_DELAY_SECS");

        let config = Config::from_env();

        assert_eq!(config.cooldown_secs, 3_600);
        assert_eq!(config.max_retries, 10);
        assert_eq!(config.retry_delay_secs, 6);
        assert_eq!(config.http_timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_custom_config() {
        // Test: Custom configuration from env vars
        env::set_var("COVIDFLOW_OUTPUT_DIR", "/tmp/covidflow-out");
        env::set_var("COVIDFLOW_GIT_ENABLED", "false");

        let config = Config::from_env();

        assert_eq!(config.output_dir, "/tmp/covidflow-out");
        assert!(!config.git_enabled);

        // Cleanup
        env::remove_var("COVIDFLOW_OUTPUT_DIR");
        env::remove_var("COVIDFLOW_GIT_ENABLED");
    }

    #[test]
    fn test_zero_retries_rejected() {
        let config = Config {
            cache_dir: "/tmp".to_string(),
            output_dir: ".".to_string(),
            cooldown_secs: 3_600,
            max_retries: 0,
            retry_delay_secs: 6,
            http_timeout_secs: 30,
            git_enabled: false,
        };

        assert!(config.validate().is_err());
    }
}
