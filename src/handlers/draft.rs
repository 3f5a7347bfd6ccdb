use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::error::AppResult;
use crate::handlers::metadata::extract_metadata;
use crate::handlers::shared::{read_body, require_url};
use crate::handlers::summary::generate_summary;
use crate::models::{parse_tags, BookmarkDraft, DraftRequest};
use crate::state::AppState;

/// POST /bookmarks/draft `{ "url": "...", "tags": "a, b" }`
///
/// Runs metadata extraction and summary generation side by side and merges
/// them with the submitted URL and tags. Nothing is persisted here.
pub async fn create_draft(
    State(state): State<AppState>,
    payload: Result<Json<DraftRequest>, JsonRejection>,
) -> AppResult<Json<BookmarkDraft>> {
    let DraftRequest { url, tags } = read_body(payload)?;
    let url = require_url(url)?;

    let (metadata, summary) = tokio::join!(
        extract_metadata(&state, &url),
        generate_summary(&state, &url)
    );

    let tags = tags.as_deref().map(parse_tags).unwrap_or_default();
    Ok(Json(BookmarkDraft::assemble(url, metadata?, summary?, tags)))
}
