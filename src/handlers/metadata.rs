use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::AppResult;
use crate::fetch::{ensure_public_target, fetch_document, FetchError};
use crate::handlers::shared::{origin_of, parse_target_url, read_body, require_url};
use crate::models::{MetadataResult, UrlRequest};
use crate::state::AppState;

const FAVICON_RELS: [&str; 3] = ["icon", "shortcut icon", "apple-touch-icon"];

static META: Lazy<Selector> = Lazy::new(|| Selector::parse("meta[content]").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("link[rel][href]").unwrap());

// ── Extraction ─────────────────────────────────────────────────────────────

/// Fetch `raw_url` and extract its metadata.
///
/// Only an invalid URL is an error. When the page cannot be fetched the
/// result is built from the URL alone (see [`fallback_metadata`]).
pub async fn extract_metadata(state: &AppState, raw_url: &str) -> AppResult<MetadataResult> {
    let target = parse_target_url(raw_url)?;
    info!(url = %target, "Fetching metadata");

    let metadata = match fetch_target(state, &target).await {
        Ok(html) => extract_from_html(&html, &target),
        Err(e) => {
            warn!(url = %target, error = %e, "Returning fallback metadata");
            fallback_metadata(&target)
        }
    };

    debug!(
        url = %metadata.url,
        title = %metadata.title,
        image = %metadata.image,
        favicon = %metadata.favicon,
        "Extracted metadata"
    );
    Ok(metadata)
}

async fn fetch_target(state: &AppState, target: &Url) -> Result<String, FetchError> {
    if !state.allow_private_targets {
        ensure_public_target(target)?;
    }
    fetch_document(&state.fetch_client, target, &state.fetch_policy).await
}

/// Metadata for a page that could not be fetched.
pub fn fallback_metadata(page_url: &Url) -> MetadataResult {
    let base = origin_of(page_url);
    MetadataResult {
        title: hostname(page_url),
        description: String::new(),
        image: String::new(),
        favicon: default_favicon(base.as_ref()),
        url: page_url.to_string(),
    }
}

/// Build metadata from fetched markup. Each field falls back independently:
/// Open Graph, then Twitter Card, then the plain HTML tag, then a default.
pub fn extract_from_html(html: &str, page_url: &Url) -> MetadataResult {
    let document = Html::parse_document(html);
    let base = origin_of(page_url);

    MetadataResult {
        title: extract_title(&document).unwrap_or_else(|| hostname(page_url)),
        description: extract_description(&document).unwrap_or_default(),
        image: extract_image(&document, base.as_ref()).unwrap_or_default(),
        favicon: extract_favicon(&document, base.as_ref())
            .unwrap_or_else(|| default_favicon(base.as_ref())),
        url: page_url.to_string(),
    }
}

fn extract_title(doc: &Html) -> Option<String> {
    get_meta(doc, "og:title")
        .or_else(|| get_meta(doc, "twitter:title"))
        .or_else(|| get_title_tag(doc))
        .map(|t| collapse_whitespace(&t))
        .filter(|t| !t.is_empty())
}

fn extract_description(doc: &Html) -> Option<String> {
    get_meta(doc, "og:description")
        .or_else(|| get_meta(doc, "twitter:description"))
        .or_else(|| get_meta(doc, "description"))
        .map(|d| collapse_whitespace(&d))
        .filter(|d| !d.is_empty())
}

fn extract_image(doc: &Html, base: Option<&Url>) -> Option<String> {
    let image = get_meta(doc, "og:image").or_else(|| get_meta(doc, "twitter:image"))?;
    resolve(base?, &image)
}

fn extract_favicon(doc: &Html, base: Option<&Url>) -> Option<String> {
    let href = doc.select(&LINK).find_map(|el| {
        let rel = el.value().attr("rel")?.trim().to_ascii_lowercase();
        if !FAVICON_RELS.contains(&rel.as_str()) {
            return None;
        }
        el.value()
            .attr("href")
            .map(str::trim)
            .filter(|h| !h.is_empty())
    })?;
    resolve(base?, href)
}

/// First non-empty `content` of a `<meta>` keyed by `property` or `name`.
fn get_meta(doc: &Html, key: &str) -> Option<String> {
    doc.select(&META).find_map(|el| {
        let meta = el.value();
        if meta.attr("property") != Some(key) && meta.attr("name") != Some(key) {
            return None;
        }
        meta.attr("content")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

fn get_title_tag(doc: &Html) -> Option<String> {
    doc.select(&TITLE)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    base.join(href).ok().map(String::from)
}

fn default_favicon(base: Option<&Url>) -> String {
    base.and_then(|b| resolve(b, "/favicon.ico"))
        .unwrap_or_default()
}

fn hostname(url: &Url) -> String {
    url.host_str().unwrap_or_default().to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Handler ────────────────────────────────────────────────────────────────

/// POST /fetch-metadata `{ "url": "..." }`
///
/// 400 for a missing or malformed URL. Unreachable pages still answer 200
/// with hostname-based fallback metadata.
pub async fn fetch_metadata(
    State(state): State<AppState>,
    payload: Result<Json<UrlRequest>, JsonRejection>,
) -> AppResult<Json<MetadataResult>> {
    let UrlRequest { url } = read_body(payload)?;
    let url = require_url(url)?;
    Ok(Json(extract_metadata(&state, &url).await?))
}

// ── Unit tests ─────────────────────────────────────────────────────────────
