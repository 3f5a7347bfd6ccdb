// Each integration test file is a separate binary; helpers not used in every
// binary would otherwise trigger dead_code warnings from clippy.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode, Uri},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use bookmark_server::{
    fetch::{self, FetchPolicy},
    routes,
    state::AppState,
};

/// An address nothing listens on; connections are refused.
pub const DEAD_URL: &str = "http://127.0.0.1:9";

/// Retry policy with the production shape but short delays.
pub fn fast_policy() -> FetchPolicy {
    FetchPolicy {
        timeout: Duration::from_secs(2),
        max_retries: 2,
        retry_delay: Duration::from_millis(50),
    }
}

pub fn test_state(summarizer_url: &str, fetch_policy: FetchPolicy) -> AppState {
    AppState {
        http_client: reqwest::Client::builder()
            .no_proxy()
            .build()
            .expect("Failed to build test HTTP client"),
        fetch_client: fetch::client_builder(true)
            .no_proxy()
            .build()
            .expect("Failed to build test fetch client"),
        fetch_policy,
        summarizer_url: Arc::from(summarizer_url),
        summarizer_timeout: Duration::from_secs(5),
        allow_private_targets: true,
    }
}

/// Build the full application router around the given state.
pub fn create_test_app(state: AppState) -> Router {
    routes::router(state)
}

// ── Stand-in upstream servers ────────────────────────────────────────────────

/// Canned reply served for every request to a stand-in upstream.
#[derive(Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
    pub delay: Duration,
    pub location: Option<String>,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Reply {
            status: StatusCode::OK,
            body: body.into(),
            delay: Duration::ZERO,
            location: None,
        }
    }

    pub fn status(status: StatusCode) -> Self {
        Reply {
            status,
            body: String::new(),
            delay: Duration::ZERO,
            location: None,
        }
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Reply {
            location: Some(location.into()),
            ..Reply::status(StatusCode::FOUND)
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Requests seen by a stand-in upstream: arrival time and raw request target.
#[derive(Clone, Default)]
pub struct Recorder {
    hits: Arc<Mutex<Vec<(Instant, String)>>>,
}

impl Recorder {
    fn record(&self, target: String) {
        self.hits.lock().unwrap().push((Instant::now(), target));
    }

    pub fn count(&self) -> usize {
        self.hits.lock().unwrap().len()
    }

    pub fn times(&self) -> Vec<Instant> {
        self.hits.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    pub fn targets(&self) -> Vec<String> {
        self.hits
            .lock()
            .unwrap()
            .iter()
            .map(|(_, p)| p.clone())
            .collect()
    }
}

/// Serve `reply` for every request on a fresh loopback port.
/// Returns the base URL (`http://127.0.0.1:<port>`) and the request recorder.
pub async fn spawn_upstream(reply: Reply) -> (String, Recorder) {
    let recorder = Recorder::default();
    let seen = recorder.clone();

    let app = Router::new().fallback(move |uri: Uri| {
        let seen = seen.clone();
        let reply = reply.clone();
        async move {
            seen.record(uri.to_string());
            if !reply.delay.is_zero() {
                tokio::time::sleep(reply.delay).await;
            }
            let mut headers = HeaderMap::new();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            );
            if let Some(location) = &reply.location {
                headers.insert(header::LOCATION, HeaderValue::from_str(location).unwrap());
            }
            (reply.status, headers, reply.body)
        }
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind upstream listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), recorder)
}

// ── Request helpers ──────────────────────────────────────────────────────────

pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_raw(app, uri, &body.to_string()).await
}

pub async fn post_raw(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap();
    let (status, _, bytes) = send(app, req).await;
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub async fn send(app: Router, req: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, bytes.to_vec())
}
