//! HTTP request handlers

pub mod data;
pub mod radar;
pub mod system;

use axum::http::Uri;

use crate::error::ApiError;

/// Fallback for paths outside the API
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}
