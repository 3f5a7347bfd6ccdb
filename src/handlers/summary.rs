use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::AppResult;
use crate::handlers::shared::{parse_target_url, read_body, require_url};
use crate::models::{SummaryResult, UrlRequest};
use crate::sanitize::sanitize_summary;
use crate::state::AppState;

const FAILED: &str = "Failed to generate summary";
const UNAVAILABLE: &str = "Unable to generate summary";
const NO_CONTENT: &str = "No summary content received";

/// Ask the summarizer for `raw_url`'s content and clean it up.
///
/// Only an invalid URL is an error; every upstream problem comes back as
/// [`SummaryResult::Fallback`]. The summarizer is called once, never retried.
pub async fn generate_summary(state: &AppState, raw_url: &str) -> AppResult<SummaryResult> {
    let target = parse_target_url(raw_url)?;
    let endpoint = summarizer_endpoint(&state.summarizer_url, &target);
    info!(url = %target, "Requesting summary");

    let response = match state
        .http_client
        .get(&endpoint)
        .timeout(state.summarizer_timeout)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!(url = %target, error = %e, "Summarizer request failed");
            return Ok(SummaryResult::fallback(FAILED, e.to_string()));
        }
    };

    let status = response.status();
    info!(url = %target, status = status.as_u16(), "Summarizer responded");
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(url = %target, status = status.as_u16(), body = %body, "Summarizer error");
        return Ok(SummaryResult::fallback(
            UNAVAILABLE,
            format!("Service returned status {}", status.as_u16()),
        ));
    }

    let raw = match response.text().await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(url = %target, error = %e, "Failed to read summarizer body");
            return Ok(SummaryResult::fallback(FAILED, e.to_string()));
        }
    };
    if raw.trim().is_empty() {
        return Ok(SummaryResult::fallback(
            NO_CONTENT,
            "Summarizer returned an empty body",
        ));
    }

    let summary = sanitize_summary(&raw);
    if summary.is_empty() {
        return Ok(SummaryResult::fallback(
            NO_CONTENT,
            "Summary was empty after cleanup",
        ));
    }

    debug!(
        url = %target,
        raw_len = raw.len(),
        summary_len = summary.len(),
        "Summary sanitized"
    );
    Ok(SummaryResult::Summary { summary })
}

/// `{base}/{percent-encoded target}`.
pub fn summarizer_endpoint(base: &str, target: &Url) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        urlencoding::encode(target.as_str())
    )
}

/// POST /generate-summary `{ "url": "..." }`
pub async fn create_summary(
    State(state): State<AppState>,
    payload: Result<Json<UrlRequest>, JsonRejection>,
) -> AppResult<Json<SummaryResult>> {
    let UrlRequest { url } = read_body(payload)?;
    let url = require_url(url)?;
    Ok(Json(generate_summary(&state, &url).await?))
}
