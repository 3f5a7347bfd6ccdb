//! Direct page fetching under one overall deadline with bounded retries.
//!
//! Only transport failures (timeouts, connection errors) and 5xx responses are
//! retried, and only while the deadline leaves room for the retry delay. Any
//! other non-success status fails the fetch immediately.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use hyper::client::connect::dns::Name;
use reqwest::dns::{Addrs, Resolve, Resolving};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::{Host, Url};

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Bodies are cut off here; the metadata we read lives in the `<head>`.
pub const MAX_DOCUMENT_BYTES: usize = 2 * 1024 * 1024;
pub const MAX_REDIRECTS: usize = 10;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Budget for the whole fetch: every attempt and every retry delay.
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server error: HTTP {0}")]
    ServerError(u16),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("target {0} resolves to a private or reserved address")]
    Blocked(String),

    #[error("redirect refused: {0}")]
    Redirect(String),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout(_) | FetchError::Network(_) | FetchError::ServerError(_)
        )
    }
}

/// State carried across the attempts of one fetch.
#[derive(Debug)]
pub struct RetryableRequest<'a> {
    pub url: &'a Url,
    pub attempt: u32,
    pub retries_left: u32,
    retry_delay: Duration,
    started: Instant,
    deadline: Instant,
}

impl<'a> RetryableRequest<'a> {
    pub fn new(url: &'a Url, policy: &FetchPolicy) -> Self {
        let started = Instant::now();
        Self {
            url,
            attempt: 0,
            retries_left: policy.max_retries,
            retry_delay: policy.retry_delay,
            started,
            deadline: started + policy.timeout,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    fn begin_attempt(&mut self) {
        self.attempt += 1;
    }

    /// Consume one retry if the failure allows it and the next attempt would
    /// still start before the deadline.
    fn take_retry(&mut self, err: &FetchError) -> bool {
        if !err.is_retryable() || self.retries_left == 0 {
            return false;
        }
        if Instant::now() + self.retry_delay >= self.deadline {
            return false;
        }
        self.retries_left -= 1;
        true
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert("dnt", HeaderValue::from_static("1"));
    headers.insert("upgrade-insecure-requests", HeaderValue::from_static("1"));
    headers
}

/// GET `url` and return its body, retrying per `policy`.
pub async fn fetch_document(
    client: &Client,
    url: &Url,
    policy: &FetchPolicy,
) -> Result<String, FetchError> {
    let mut request = RetryableRequest::new(url, policy);

    loop {
        request.begin_attempt();
        match attempt(client, url, request.deadline(), policy.timeout).await {
            Ok(body) => {
                debug!(
                    url = %request.url,
                    attempt = request.attempt,
                    elapsed_ms = request.elapsed().as_millis() as u64,
                    bytes = body.len(),
                    "Fetched document"
                );
                return Ok(body);
            }
            Err(e) if request.take_retry(&e) => {
                warn!(
                    url = %request.url,
                    attempt = request.attempt,
                    retries_left = request.retries_left,
                    error = %e,
                    "Fetch attempt failed, retrying"
                );
                tokio::time::sleep(policy.retry_delay).await;
            }
            Err(e) => {
                warn!(
                    url = %request.url,
                    attempts = request.attempt,
                    elapsed_ms = request.elapsed().as_millis() as u64,
                    error = %e,
                    "Fetch failed"
                );
                return Err(e);
            }
        }
    }
}

async fn attempt(
    client: &Client,
    url: &Url,
    deadline: Instant,
    budget: Duration,
) -> Result<String, FetchError> {
    let send_and_read = async {
        let mut response = client
            .get(url.clone())
            .headers(browser_headers())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(FetchError::ServerError(status.as_u16()));
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let room = MAX_DOCUMENT_BYTES - body.len();
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                debug!(url = %url, limit = MAX_DOCUMENT_BYTES, "Document cut at size limit");
                break;
            }
            body.extend_from_slice(&chunk);
        }
        Ok::<String, FetchError>(String::from_utf8_lossy(&body).into_owned())
    };

    // Dropping the future at the deadline abandons the in-flight request.
    tokio::time::timeout_at(deadline, send_and_read)
        .await
        .map_err(|_| FetchError::Timeout(budget))?
}

/// Map a send failure, surfacing refusals from the redirect policy or the
/// resolver instead of treating them as retryable network errors.
fn classify(err: reqwest::Error) -> FetchError {
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        if let Some(FetchError::Blocked(host)) = cause.downcast_ref::<FetchError>() {
            return FetchError::Blocked(host.clone());
        }
        source = cause.source();
    }
    if err.is_redirect() {
        return FetchError::Redirect(err.to_string());
    }
    FetchError::Network(err)
}

/// Returns `true` if `ip` is a private, loopback, or link-local address.
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            matches!(
                o,
                [127, ..]
                    | [10, ..]
                    | [169, 254, ..]
                    | [192, 168, ..]
                    | [0, ..]
                    | [255, 255, 255, 255]
            ) || (o[0] == 172 && (16..=31).contains(&o[1]))
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xfe00 == 0xfc00)
                || (v6.segments()[0] & 0xffc0 == 0xfe80)
                || v6
                    .to_ipv4_mapped()
                    .is_some_and(|v4| is_private_ip(IpAddr::V4(v4)))
        }
    }
}

/// Whether the host of `url` is private on its face: an IP literal in a
/// private range, or `localhost`. Other names are checked when they resolve.
pub fn is_private_host(url: &Url) -> bool {
    match url.host() {
        Some(Host::Ipv4(ip)) => is_private_ip(IpAddr::V4(ip)),
        Some(Host::Ipv6(ip)) => is_private_ip(IpAddr::V6(ip)),
        Some(Host::Domain(name)) => {
            let name = name.trim_end_matches('.').to_ascii_lowercase();
            name == "localhost" || name.ends_with(".localhost")
        }
        None => true,
    }
}

/// Refuse a target whose host is private on its face.
pub fn ensure_public_target(url: &Url) -> Result<(), FetchError> {
    if is_private_host(url) {
        return Err(FetchError::Blocked(
            url.host_str().unwrap_or_default().to_string(),
        ));
    }
    Ok(())
}

/// Resolver that fails for any name with a private address, so the address
/// that was checked is the address that gets connected to.
#[derive(Clone, Copy, Debug, Default)]
pub struct PublicResolver;

impl Resolve for PublicResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let host = name.as_str().to_string();
        Box::pin(async move {
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0))
                .await?
                .collect();
            if addrs.iter().any(|addr| is_private_ip(addr.ip())) {
                return Err(FetchError::Blocked(host).into());
            }
            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok::<Addrs, BoxError>(addrs)
        })
    }
}

fn public_redirects() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        if is_private_host(attempt.url()) {
            let host = attempt.url().host_str().unwrap_or_default().to_string();
            return attempt.error(FetchError::Blocked(host));
        }
        attempt.follow()
    })
}

/// Builder for the page-fetch client. Unless private targets are allowed,
/// every redirect hop and every resolved address must be public.
pub fn client_builder(allow_private_targets: bool) -> ClientBuilder {
    let builder = Client::builder();
    if allow_private_targets {
        return builder;
    }
    builder
        .redirect(public_redirects())
        .dns_resolver(Arc::new(PublicResolver))
}
