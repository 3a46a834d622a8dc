use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_helpers::ErrorResponse;
use thiserror::Error;

/// Result type for finops operations
pub type FinopsResult<T> = Result<T, FinopsError>;

/// Errors surfaced by the chat and diagnostics endpoints
#[derive(Debug, Error)]
pub enum FinopsError {
    /// Body missing, not JSON, or not an object
    #[error("Empty or invalid JSON data")]
    EmptyBody,

    /// `messages` absent or empty
    #[error("No messages provided")]
    NoMessages,

    /// Well-formed JSON that does not describe a chat request
    #[error("Invalid chat request: {0}")]
    InvalidInput(String),
}

/// Every variant is a client error; upstream failures never reach this type.
impl IntoResponse for FinopsError {
    fn into_response(self) -> Response {
        ErrorResponse::new(self.to_string()).into_response_with(StatusCode::BAD_REQUEST)
    }
}
