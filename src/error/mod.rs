use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub const URL_REQUIRED: &str = "URL is required";
pub const INVALID_URL: &str = "Invalid URL format";
pub const INVALID_BODY: &str = "Invalid JSON body";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn url_required() -> Self {
        AppError::Validation(URL_REQUIRED.into())
    }

    pub fn invalid_url() -> Self {
        AppError::Validation(INVALID_URL.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message): (StatusCode, String) = match self {
            AppError::Validation(msg) => {
                tracing::debug!(error = %msg, "Rejected request");
                (StatusCode::BAD_REQUEST, msg)
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
