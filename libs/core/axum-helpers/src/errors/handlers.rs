use axum::{http::StatusCode, response::Response};

use super::ErrorResponse;

/// Handler for 404 Not Found errors.
///
/// This can be used as a fallback handler in your router.
pub async fn not_found() -> Response {
    ErrorResponse::new("NotFound")
        .with_message("The requested resource was not found")
        .into_response_with(StatusCode::NOT_FOUND)
}
