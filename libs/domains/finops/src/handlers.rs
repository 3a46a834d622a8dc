//! HTTP handlers for the chat assistant and AWS diagnostics

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use axum_helpers::errors::responses::BadRequestResponse;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::{OpenApi, ToSchema};

use crate::agent::ChatOrchestrator;
use crate::billing::BillingService;
use crate::error::{FinopsError, FinopsResult};
use crate::models::{
    CallerIdentity, ChatMessage, ChatRequest, ChatResponse, FunctionCall, MessageRole, ToolCall,
};

const USE_POST_REPLY: &str =
    "Please use a POST request with proper JSON payload containing messages.";
const AWS_TEST_HELP: &str =
    "Please check your AWS credentials and ensure you have the required permissions.";

/// Shared state for handlers
#[derive(Clone)]
pub struct FinopsState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub billing: Arc<BillingService>,
}

impl FinopsState {
    pub fn new(orchestrator: ChatOrchestrator, billing: Arc<BillingService>) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            billing,
        }
    }
}

/// Successful `/test-aws` body
#[derive(Debug, Serialize, ToSchema)]
pub struct AwsTestSuccess {
    pub status: &'static str,
    pub message: &'static str,
    pub identity: CallerIdentity,
    pub cost_explorer: &'static str,
}

/// Failed `/test-aws` body
#[derive(Debug, Serialize, ToSchema)]
pub struct AwsTestFailure {
    pub status: &'static str,
    pub message: String,
    pub help: &'static str,
}

/// OpenAPI documentation for the FinOps API
#[derive(OpenApi)]
#[openapi(
    paths(chat_info, chat_handler, test_aws),
    components(
        schemas(
            ChatRequest,
            ChatResponse,
            ChatMessage,
            MessageRole,
            ToolCall,
            FunctionCall,
            CallerIdentity,
            AwsTestSuccess,
            AwsTestFailure,
        ),
        responses(BadRequestResponse)
    ),
    tags(
        (name = "finops-chat", description = "AWS cost assistant chat"),
        (name = "finops-aws", description = "AWS credential diagnostics")
    )
)]
pub struct ApiDoc;

/// Create the finops router with all HTTP endpoints
pub fn router(state: FinopsState) -> Router {
    Router::new()
        .route("/chat", get(chat_info).post(chat_handler))
        .route("/test-aws", get(test_aws))
        .with_state(state)
}

// =============================================================================
// Chat Endpoints
// =============================================================================

/// Explain that the chat endpoint expects a POST
#[utoipa::path(
    get,
    path = "/chat",
    tag = "finops-chat",
    responses((status = 200, description = "Usage hint", body = ChatResponse))
)]
async fn chat_info() -> Json<ChatResponse> {
    info!("Received GET request to /api/chat");
    Json(ChatResponse {
        message: ChatMessage::assistant(USE_POST_REPLY),
    })
}

/// Send a conversation and get the assistant's reply
///
/// Upstream failures are reported as a 200 with an apologetic assistant
/// message; only malformed requests are rejected.
#[utoipa::path(
    post,
    path = "/chat",
    tag = "finops-chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, response = BadRequestResponse)
    )
)]
async fn chat_handler(
    State(state): State<FinopsState>,
    body: Bytes,
) -> FinopsResult<Json<ChatResponse>> {
    let request = parse_chat_request(&body).inspect_err(|e| {
        warn!(error = %e, "Rejected chat request");
    })?;

    let message = state.orchestrator.chat(request.messages).await?;
    Ok(Json(ChatResponse { message }))
}

/// Validate a raw chat body.
///
/// Order matters: a body that is not a non-empty JSON object is "empty or
/// invalid", then missing or empty `messages`, then message shape problems.
fn parse_chat_request(body: &[u8]) -> FinopsResult<ChatRequest> {
    let value: Value = serde_json::from_slice(body).map_err(|_| FinopsError::EmptyBody)?;
    let object = value
        .as_object()
        .filter(|object| !object.is_empty())
        .ok_or(FinopsError::EmptyBody)?;

    match object.get("messages") {
        None | Some(Value::Null) => return Err(FinopsError::NoMessages),
        Some(Value::Array(messages)) if messages.is_empty() => {
            return Err(FinopsError::NoMessages);
        }
        _ => {}
    }

    serde_json::from_value(value).map_err(|e| FinopsError::InvalidInput(e.to_string()))
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Verify AWS credentials and Cost Explorer permissions
#[utoipa::path(
    get,
    path = "/test-aws",
    tag = "finops-aws",
    responses(
        (status = 200, description = "Credentials work", body = AwsTestSuccess),
        (status = 400, description = "Credentials or permissions missing", body = AwsTestFailure)
    )
)]
async fn test_aws(State(state): State<FinopsState>) -> Response {
    info!("Testing AWS credentials");

    match state.billing.verify_access().await {
        Ok(identity) => Json(AwsTestSuccess {
            status: "success",
            message: "AWS credentials and permissions are working correctly",
            identity,
            cost_explorer: "Access confirmed",
        })
        .into_response(),
        Err(failure) => {
            error!(error = %failure, "AWS test failed");
            (
                StatusCode::BAD_REQUEST,
                Json(AwsTestFailure {
                    status: "error",
                    message: format!("AWS test failed: {}", failure.error),
                    help: AWS_TEST_HELP,
                }),
            )
                .into_response()
        }
    }
}
