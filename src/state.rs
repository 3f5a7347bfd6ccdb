use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::config::Config;
use crate::fetch::{self, FetchPolicy};

/// Shared application state passed to all handlers.
/// `http_client` talks to the summarizer; `fetch_client` fetches user-supplied
/// pages and, unless private targets are allowed, refuses private addresses
/// on every redirect hop and DNS answer.
#[derive(Clone)]
pub struct AppState {
    pub http_client: Client,
    pub fetch_client: Client,
    pub fetch_policy: FetchPolicy,
    pub summarizer_url: Arc<str>,
    pub summarizer_timeout: Duration,
    pub allow_private_targets: bool,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(AppState {
            http_client: Client::builder().build()?,
            fetch_client: fetch::client_builder(config.allow_private_targets).build()?,
            fetch_policy: config.fetch_policy(),
            summarizer_url: Arc::from(config.summarizer_url.as_str()),
            summarizer_timeout: config.summarizer_timeout,
            allow_private_targets: config.allow_private_targets,
        })
    }
}
