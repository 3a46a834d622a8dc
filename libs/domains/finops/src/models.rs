//! Domain models for the FinOps chat assistant.
//!
//! Chat types mirror the chat-completions wire format so that messages can be
//! passed between the browser and the model without re-shaping. Billing
//! payloads are what the model receives as tool output.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};
use utoipa::ToSchema;

// =============================================================================
// Chat
// =============================================================================

/// Role of a chat message
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageRole {
    System,
    #[default]
    User,
    Assistant,
    Tool,
}

/// One message of a conversation.
///
/// `content` is nullable because assistant messages that carry tool calls may
/// come back from the model without text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    pub role: MessageRole,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Provider-specific fields (e.g. Mistral's `prefix`), passed through untouched
    #[serde(flatten)]
    #[schema(ignore)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    fn text(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
            extra: Map::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(MessageRole::Assistant, content)
    }

    /// Tool output answering the tool call `tool_call_id`
    pub fn tool(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: MessageRole::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
            extra: Map::new(),
        }
    }

    /// Tool calls requested by this message, empty when there are none
    pub fn requested_tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }
}

/// A function invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: function_kind(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

fn function_kind() -> String {
    "function".to_string()
}

/// Name and JSON-encoded arguments of a requested function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default, deserialize_with = "arguments_as_string")]
    pub arguments: String,
}

/// Accept `arguments` either as a JSON-encoded string or as an inline object.
fn arguments_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Response of `/api/chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub message: ChatMessage,
}

// =============================================================================
// Billing
// =============================================================================

/// Time bucketing of billing data
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Granularity {
    Daily,
    Monthly,
}

/// Inclusive-start, exclusive-end date window used by Cost Explorer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Resolve optional user dates against `today`.
    ///
    /// - no start date: trailing 30 days ending today (an end date on its own is ignored)
    /// - start date only: from the start date until today
    /// - both: used as given
    pub fn resolve(start: Option<NaiveDate>, end: Option<NaiveDate>, today: NaiveDate) -> Self {
        match (start, end) {
            (None, _) => Self {
                start: today - chrono::Duration::days(DEFAULT_LOOKBACK_DAYS),
                end: today,
            },
            (Some(start), None) => Self { start, end: today },
            (Some(start), Some(end)) => Self { start, end },
        }
    }

    /// Forward window from `today` spanning `days`, or `None` past the calendar range
    pub fn forward(today: NaiveDate, days: u32) -> Option<Self> {
        let end = today.checked_add_days(Days::new(u64::from(days)))?;
        Some(Self { start: today, end })
    }
}

/// Length of the default reporting window in days
pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;

/// Currency reported when the upstream response carries none
pub const DEFAULT_CURRENCY: &str = "USD";

/// Cost of one service over the reporting window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceCost {
    pub service_name: String,
    pub cost: f64,
    pub currency: String,
}

/// Result of `get_aws_cost_summary`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostSummary {
    pub total_cost: f64,
    pub currency: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub granularity: Granularity,
    pub services: Vec<ServiceCost>,
}

/// One forecast period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPeriod {
    pub start: String,
    pub end: String,
    pub amount: f64,
    pub currency: String,
}

/// Result of `get_aws_cost_forecast`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostForecast {
    pub forecast_total: f64,
    pub currency: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub granularity: Granularity,
    pub forecast_by_time: Vec<ForecastPeriod>,
}

/// Cost of one usage type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageTypeCost {
    pub usage_type: String,
    pub cost: f64,
}

/// Usage-type breakdown of one time period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodCost {
    pub start: String,
    pub end: String,
    pub cost: f64,
    pub usage_types: Vec<UsageTypeCost>,
}

/// Result of `get_aws_service_costs`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceCostBreakdown {
    pub service_name: String,
    pub total_cost: f64,
    pub currency: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub granularity: Granularity,
    pub time_series: Vec<PeriodCost>,
    pub usage_details: Vec<UsageTypeCost>,
}

/// Identity returned by STS, serialized with the AWS field names
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct CallerIdentity {
    pub account: Option<String>,
    pub arn: Option<String>,
    pub user_id: Option<String>,
}

/// Round a monetary figure to cents
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
