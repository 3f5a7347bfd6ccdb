use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request bodies
// ============================================================================

/// Body accepted by both extraction endpoints. `url` is optional here so a
/// missing field maps to "URL is required" rather than a parse failure.
#[derive(Debug, Default, Deserialize)]
pub struct UrlRequest {
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DraftRequest {
    pub url: Option<String>,
    /// Comma-separated, as typed into the bookmark form.
    pub tags: Option<String>,
}

// ============================================================================
// Metadata
// ============================================================================

/// Page metadata returned by `POST /fetch-metadata`.
///
/// `title` is never empty (falls back to the hostname). `image` and `favicon`
/// are absolute URLs; `image` may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataResult {
    pub title: String,
    pub description: String,
    pub image: String,
    pub favicon: String,
    pub url: String,
}

// ============================================================================
// Summary
// ============================================================================

/// Response of `POST /generate-summary`. Both shapes are sent with status 200;
/// `fallback: true` means no summary is available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SummaryResult {
    Summary {
        summary: String,
    },
    Fallback {
        error: String,
        details: String,
        fallback: bool,
    },
}

impl SummaryResult {
    pub fn fallback(error: impl Into<String>, details: impl Into<String>) -> Self {
        SummaryResult::Fallback {
            error: error.into(),
            details: details.into(),
            fallback: true,
        }
    }

    pub fn summary(&self) -> Option<&str> {
        match self {
            SummaryResult::Summary { summary } => Some(summary),
            SummaryResult::Fallback { .. } => None,
        }
    }
}

// ============================================================================
// Bookmark draft
// ============================================================================

/// Metadata, summary and tags merged into the record the client stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkDraft {
    pub url: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub favicon: String,
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl BookmarkDraft {
    pub fn assemble(
        url: String,
        metadata: MetadataResult,
        summary: SummaryResult,
        tags: Vec<String>,
    ) -> Self {
        BookmarkDraft {
            url,
            title: metadata.title,
            description: metadata.description,
            image: metadata.image,
            favicon: metadata.favicon,
            summary: summary.summary().map(str::to_string),
            tags,
            created_at: Utc::now(),
        }
    }
}

/// Split a comma-separated tag string, dropping blanks and repeats.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|seen| seen == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}
