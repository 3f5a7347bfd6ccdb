use axum::extract::rejection::JsonRejection;
use axum::Json;
use url::Url;

use crate::error::{AppError, AppResult, INVALID_BODY};

/// Unwrap a JSON body, turning any rejection into a 400 with a JSON error.
pub fn read_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload.map(|Json(body)| body).map_err(|e| {
        tracing::debug!(error = %e, "Rejected request body");
        AppError::Validation(INVALID_BODY.into())
    })
}

/// A missing or empty `url` field is a 400 "URL is required".
pub fn require_url(url: Option<String>) -> AppResult<String> {
    url.filter(|u| !u.is_empty())
        .ok_or_else(AppError::url_required)
}

/// Parse and normalize the target URL.
///
/// Only absolute `http`/`https` URLs with a host are accepted; anything else
/// is a 400 "Invalid URL format" and no request is made.
pub fn parse_target_url(raw: &str) -> AppResult<Url> {
    let parsed = Url::parse(raw.trim()).map_err(|_| AppError::invalid_url())?;

    match parsed.scheme() {
        "http" | "https" => {}
        _ => return Err(AppError::invalid_url()),
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(AppError::invalid_url());
    }

    Ok(parsed)
}

/// `scheme://host[:port]/` of `url`, the base relative metadata URLs resolve against.
pub fn origin_of(url: &Url) -> Option<Url> {
    Url::parse(&url.origin().ascii_serialization()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_valid_url() {
        let url = parse_target_url("  https://Example.com  ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_target_url("not-a-url").is_err());
        assert!(parse_target_url("").is_err());
        assert!(parse_target_url("http://").is_err());
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(parse_target_url("ftp://example.com").is_err());
        assert!(parse_target_url("mailto:someone@example.com").is_err());
        assert!(parse_target_url("javascript:alert(1)").is_err());
    }

    #[test]
    fn empty_url_is_required_error() {
        let err = require_url(Some(String::new())).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "URL is required"));
        assert!(require_url(None).is_err());
    }

    #[test]
    fn origin_drops_path_and_query() {
        let url = Url::parse("http://example.com:8080/a/b?c=d#e").unwrap();
        assert_eq!(origin_of(&url).unwrap().as_str(), "http://example.com:8080/");
    }
}
