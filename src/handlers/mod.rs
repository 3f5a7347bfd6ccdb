pub mod draft;
pub mod metadata;
pub mod shared;
pub mod summary;

use axum::Json;
use serde_json::{json, Value};

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "bookmark-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
