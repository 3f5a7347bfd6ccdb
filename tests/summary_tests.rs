mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{Reply, DEAD_URL};

const TARGET: &str = "https://example.com/post?id=1";

#[tokio::test]
async fn summary_requires_url() {
    let app = common::create_test_app(common::test_state(DEAD_URL, common::fast_policy()));
    let (status, body) = common::post_json(app, "/generate-summary", json!({ "url": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "URL is required");
}

#[tokio::test]
async fn summary_rejects_invalid_url_without_calling_upstream() {
    let (base, upstream) = common::spawn_upstream(Reply::ok("never used")).await;

    let app = common::create_test_app(common::test_state(&base, common::fast_policy()));
    let (status, body) =
        common::post_json(app, "/generate-summary", json!({ "url": "definitely not a url" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid URL format");
    assert_eq!(upstream.count(), 0);
}

#[tokio::test]
async fn summary_sanitizes_upstream_text() {
    let raw = "Title: Example\n\nSkip to main content.\n\n\
               # A guide to careful extraction of page metadata today.\n\n\
               The pipeline fetches the page and extracts metadata from it. \
               We use cookies to improve your experience. \
               It then asks the summarizer for a readable version of the content.\n\n\
               [Home](/) [About](/about)";
    let (base, upstream) = common::spawn_upstream(Reply::ok(raw)).await;

    let app = common::create_test_app(common::test_state(&base, common::fast_policy()));
    let (status, body) = common::post_json(app, "/generate-summary", json!({ "url": TARGET })).await;

    assert_eq!(status, StatusCode::OK, "unexpected body: {body}");
    assert_eq!(
        body["summary"],
        "## A guide to careful extraction of page metadata today.\n\n\
         The pipeline fetches the page and extracts metadata from it.\n\
         It then asks the summarizer for a readable version of the content."
    );
    assert!(body.get("fallback").is_none());
    assert_eq!(
        upstream.targets(),
        vec!["/https%3A%2F%2Fexample.com%2Fpost%3Fid%3D1".to_string()]
    );
}

#[tokio::test]
async fn summary_empty_body_is_soft_failure() {
    let (base, _upstream) = common::spawn_upstream(Reply::ok("")).await;

    let app = common::create_test_app(common::test_state(&base, common::fast_policy()));
    let (status, body) = common::post_json(app, "/generate-summary", json!({ "url": TARGET })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fallback"], true);
    assert_eq!(body["error"], "No summary content received");
    assert!(body.get("summary").is_none());
}

#[tokio::test]
async fn summary_noise_only_body_is_soft_failure() {
    let (base, _upstream) = common::spawn_upstream(Reply::ok("Menu\n\nSign up\n\nFooter")).await;

    let app = common::create_test_app(common::test_state(&base, common::fast_policy()));
    let (status, body) = common::post_json(app, "/generate-summary", json!({ "url": TARGET })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fallback"], true);
    assert_eq!(body["details"], "Summary was empty after cleanup");
}

#[tokio::test]
async fn summary_upstream_error_is_not_retried() {
    let (base, upstream) = common::spawn_upstream(Reply::status(StatusCode::BAD_GATEWAY)).await;

    let app = common::create_test_app(common::test_state(&base, common::fast_policy()));
    let (status, body) = common::post_json(app, "/generate-summary", json!({ "url": TARGET })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fallback"], true);
    assert_eq!(body["error"], "Unable to generate summary");
    assert_eq!(body["details"], "Service returned status 502");
    assert_eq!(upstream.count(), 1);
}

#[tokio::test]
async fn summary_unreachable_upstream_is_soft_failure() {
    let app = common::create_test_app(common::test_state(DEAD_URL, common::fast_policy()));
    let (status, body) = common::post_json(app, "/generate-summary", json!({ "url": TARGET })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fallback"], true);
    assert_eq!(body["error"], "Failed to generate summary");
    assert!(body["details"].as_str().is_some_and(|d| !d.is_empty()));
}
