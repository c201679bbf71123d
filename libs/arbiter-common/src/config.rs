// Judge connection configuration
// Read once at process start and handed to the execution client

use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_JUDGE_URL: &str = "http://localhost:2358";

#[derive(Debug, Clone, PartialEq)]
pub struct JudgeConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Upper bound for one HTTP call, connect through body
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Longest gap between reads on an open connection
    pub read_timeout: Duration,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    /// Extra attempts after the first on transient transport failures
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub base64_encoded: bool,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
}

/// Poll loop parameters, split out so the coordinator does not need the
/// whole connection config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_JUDGE_URL.to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_millis(1000),
            max_poll_attempts: 30,
            max_retries: 3,
            retry_delay: Duration::from_millis(2000),
            base64_encoded: true,
            pool_max_idle_per_host: 20,
            pool_idle_timeout: Duration::from_secs(30),
        }
    }
}

impl JudgeConfig {
    /// Load from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source. Unset variables fall back to
    /// defaults; set-but-invalid ones are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let base_url = get("JUDGE0_URL")
            .unwrap_or(defaults.base_url)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            base_url,
            api_key: get("JUDGE0_API_KEY"),
            request_timeout: parsed(&get, "JUDGE0_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            connect_timeout: parsed(&get, "JUDGE0_CONNECT_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            read_timeout: parsed(&get, "JUDGE0_READ_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.read_timeout),
            poll_interval: parsed(&get, "JUDGE0_POLL_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            max_poll_attempts: parsed(&get, "JUDGE0_MAX_POLL_ATTEMPTS")?
                .unwrap_or(defaults.max_poll_attempts),
            max_retries: parsed(&get, "JUDGE0_MAX_RETRIES")?.unwrap_or(defaults.max_retries),
            retry_delay: parsed(&get, "JUDGE0_RETRY_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
            base64_encoded: parsed(&get, "JUDGE0_BASE64")?.unwrap_or(defaults.base64_encoded),
            pool_max_idle_per_host: parsed(&get, "JUDGE0_POOL_MAX_IDLE")?
                .unwrap_or(defaults.pool_max_idle_per_host),
            pool_idle_timeout: parsed(&get, "JUDGE0_POOL_IDLE_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.pool_idle_timeout),
        })
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: self.poll_interval,
            max_attempts: self.max_poll_attempts,
        }
    }

    /// RapidAPI-hosted judges authenticate with their own header pair
    pub fn is_rapidapi(&self) -> bool {
        self.host().is_some_and(|h| h.ends_with("rapidapi.com"))
    }

    /// Host part of `base_url`, without scheme, port or path
    pub fn host(&self) -> Option<&str> {
        let rest = self
            .base_url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.base_url);
        let authority = rest.split('/').next()?;
        let host = authority.split(':').next()?;
        (!host.is_empty()).then_some(host)
    }
}

fn parsed<T, G>(get: &G, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.parse::<T>()
                .with_context(|| format!("Invalid value for {}: {:?}", key, raw))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = JudgeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, JudgeConfig::default());
        assert_eq!(config.base_url, DEFAULT_JUDGE_URL);
        assert!(config.base64_encoded);
    }

    #[test]
    fn test_overrides() {
        let config = JudgeConfig::from_lookup(lookup(&[
            ("JUDGE0_URL", "https://judge.example.com/"),
            ("JUDGE0_API_KEY", "secret"),
            ("JUDGE0_TIMEOUT_SECS", "5"),
            ("JUDGE0_READ_TIMEOUT_SECS", "3"),
            ("JUDGE0_POLL_INTERVAL_MS", "250"),
            ("JUDGE0_MAX_POLL_ATTEMPTS", "12"),
            ("JUDGE0_MAX_RETRIES", "1"),
            ("JUDGE0_RETRY_DELAY_MS", "100"),
            ("JUDGE0_BASE64", "false"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "https://judge.example.com");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.read_timeout, Duration::from_secs(3));
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.max_poll_attempts, 12);
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.retry_delay, Duration::from_millis(100));
        assert!(!config.base64_encoded);
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = JudgeConfig::from_lookup(lookup(&[("JUDGE0_API_KEY", "  "), ("JUDGE0_URL", "")])).unwrap();
        assert_eq!(config.api_key, None);
        assert_eq!(config.base_url, DEFAULT_JUDGE_URL);
    }

    #[test]
    fn test_invalid_value_names_variable() {
        let err = JudgeConfig::from_lookup(lookup(&[("JUDGE0_MAX_POLL_ATTEMPTS", "lots")])).unwrap_err();
        assert!(err.to_string().contains("JUDGE0_MAX_POLL_ATTEMPTS"));
    }

    #[test]
    fn test_poll_settings() {
        let config = JudgeConfig::default();
        let poll = config.poll_settings();
        assert_eq!(poll.interval, config.poll_interval);
        assert_eq!(poll.max_attempts, config.max_poll_attempts);
    }

    #[test]
    fn test_rapidapi_detection() {
        let mut config = JudgeConfig::default();
        assert!(!config.is_rapidapi());
        assert_eq!(config.host(), Some("localhost"));

        config.base_url = "https://judge0-ce.p.rapidapi.com".to_string();
        assert!(config.is_rapidapi());
        assert_eq!(config.host(), Some("judge0-ce.p.rapidapi.com"));
    }
}
