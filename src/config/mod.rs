use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::fetch::FetchPolicy;

pub const DEFAULT_SUMMARIZER_URL: &str = "https://r.jina.ai";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub is_production: bool,
    pub summarizer_url: String,
    pub summarizer_timeout: Duration,
    pub fetch_timeout: Duration,
    pub fetch_max_retries: u32,
    pub fetch_retry_delay: Duration,
    pub allow_private_targets: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Missing keys take their
    /// defaults; present keys must parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = FetchPolicy::default();

        Ok(Config {
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            server_port: parse_or(&lookup, "SERVER_PORT", 8080)?,
            is_production: lookup("APP_ENV").as_deref() == Some("production"),
            summarizer_url: lookup("SUMMARIZER_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| DEFAULT_SUMMARIZER_URL.to_string()),
            summarizer_timeout: Duration::from_secs(parse_or(
                &lookup,
                "SUMMARIZER_TIMEOUT_SECS",
                30,
            )?),
            fetch_timeout: Duration::from_secs(parse_or(
                &lookup,
                "FETCH_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
            )?),
            fetch_max_retries: parse_or(&lookup, "FETCH_MAX_RETRIES", defaults.max_retries)?,
            fetch_retry_delay: Duration::from_millis(parse_or(
                &lookup,
                "FETCH_RETRY_DELAY_MS",
                defaults.retry_delay.as_millis() as u64,
            )?),
            allow_private_targets: parse_or(&lookup, "ALLOW_PRIVATE_TARGETS", false)?,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            timeout: self.fetch_timeout,
            max_retries: self.fetch_max_retries,
            retry_delay: self.fetch_retry_delay,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
