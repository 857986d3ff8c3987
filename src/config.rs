use crate::error::ConfigError;
use crate::source::{OutputSize, Provider};
use crate::store::DEFAULT_BENCHMARK;
use crate::throttle::FetchPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const APP_NAME: &str = "portfolio_bench";
const CONFIG_NAME: &str = "config";

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV: &str = "ALPHA_VANTAGE_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Benchmark used until one is chosen and stored in the database.
    pub benchmark: String,
    pub provider: Provider,
    pub api_key: Option<String>,
    pub database_path: String,
    pub request_spacing_ms: u64,
    pub max_concurrent_requests: usize,
    pub history_output_size: OutputSize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            benchmark: DEFAULT_BENCHMARK.to_string(),
            provider: Provider::default(),
            api_key: None,
            database_path: "database".to_string(),
            request_spacing_ms: 1200,
            max_concurrent_requests: 1,
            history_output_size: OutputSize::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let cfg: Config = confy::load(APP_NAME, CONFIG_NAME)?;
        Ok(cfg.with_env_key(std::env::var(API_KEY_ENV).ok()))
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)?)
    }

    fn with_env_key(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        self
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            spacing: Duration::from_millis(self.request_spacing_ms),
            max_concurrent: self.max_concurrent_requests.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_conservative() {
        let cfg = Config::default();
        assert_eq!(cfg.benchmark, "SPY");
        assert_eq!(cfg.fetch_policy(), FetchPolicy::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let cfg: Config = serde_json::from_str(r#"{"provider": "yahoo", "max_concurrent_requests": 0}"#).unwrap();
        assert_eq!(cfg.provider, Provider::Yahoo);
        assert_eq!(cfg.request_spacing_ms, 1200);
        assert_eq!(cfg.fetch_policy().max_concurrent, 1);
    }

    #[test]
    fn test_env_key_overrides() {
        let cfg = Config {
            api_key: Some("file-key".to_string()),
            ..Config::default()
        };
        assert_eq!(
            cfg.clone().with_env_key(Some("env-key".to_string())).api_key.as_deref(),
            Some("env-key")
        );
        assert_eq!(
            cfg.with_env_key(Some(" ".to_string())).api_key.as_deref(),
            Some("file-key")
        );
    }
}
