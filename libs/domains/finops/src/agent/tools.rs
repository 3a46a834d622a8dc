//! Billing functions the model may call.
//!
//! Declarations are sent with every completion request; calls coming back
//! are dispatched through [`BillingFunction`]. Every outcome, including bad
//! arguments and billing failures, is rendered as a JSON value for the model.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{info, warn};

use crate::billing::{
    BillingFailure, BillingService, CREDENTIALS_HELP, ForecastArgs, MAX_FORECAST_DAYS,
    ServiceCostsArgs, SummaryArgs,
};

pub const COST_SUMMARY: &str = "get_aws_cost_summary";
pub const COST_FORECAST: &str = "get_aws_cost_forecast";
pub const SERVICE_COSTS: &str = "get_aws_service_costs";

/// Closed set of functions the backend executes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingFunction {
    CostSummary,
    CostForecast,
    ServiceCosts,
    Unknown(String),
}

impl BillingFunction {
    pub const SUPPORTED: [BillingFunction; 3] = [
        BillingFunction::CostSummary,
        BillingFunction::CostForecast,
        BillingFunction::ServiceCosts,
    ];

    pub fn from_name(name: &str) -> Self {
        match name {
            COST_SUMMARY => Self::CostSummary,
            COST_FORECAST => Self::CostForecast,
            SERVICE_COSTS => Self::ServiceCosts,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::CostSummary => COST_SUMMARY,
            Self::CostForecast => COST_FORECAST,
            Self::ServiceCosts => SERVICE_COSTS,
            Self::Unknown(name) => name,
        }
    }

    /// Metric label; model-invented names collapse to `unknown`
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::CostSummary => COST_SUMMARY,
            Self::CostForecast => COST_FORECAST,
            Self::ServiceCosts => SERVICE_COSTS,
            Self::Unknown(_) => "unknown",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::CostSummary => "Retrieves a summary of AWS costs for a specified time period",
            Self::CostForecast => "Get a forecast of AWS costs for future periods",
            Self::ServiceCosts => "Get detailed costs for a specific AWS service",
            Self::Unknown(_) => "",
        }
    }

    /// JSON schema for the function's parameters
    fn parameters_schema(&self) -> Value {
        match self {
            Self::CostSummary => json!({
                "type": "object",
                "properties": {
                    "start_date": {
                        "type": "string",
                        "description": "Start date in YYYY-MM-DD format"
                    },
                    "end_date": {
                        "type": "string",
                        "description": "End date in YYYY-MM-DD format"
                    },
                    "granularity": {
                        "type": "string",
                        "enum": ["DAILY", "MONTHLY"],
                        "description": "Time granularity for the report"
                    }
                },
                "required": []
            }),
            Self::CostForecast => json!({
                "type": "object",
                "properties": {
                    "days": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": MAX_FORECAST_DAYS,
                        "description": "Number of days to forecast"
                    },
                    "granularity": {
                        "type": "string",
                        "enum": ["DAILY", "MONTHLY"],
                        "description": "Time granularity for the forecast"
                    }
                },
                "required": []
            }),
            Self::ServiceCosts => json!({
                "type": "object",
                "properties": {
                    "service_name": {
                        "type": "string",
                        "description": "AWS service name (e.g., Amazon EC2, Amazon S3)"
                    },
                    "start_date": {
                        "type": "string",
                        "description": "Start date in YYYY-MM-DD format"
                    },
                    "end_date": {
                        "type": "string",
                        "description": "End date in YYYY-MM-DD format"
                    },
                    "granularity": {
                        "type": "string",
                        "enum": ["DAILY", "MONTHLY"],
                        "description": "Time granularity for the report"
                    }
                },
                "required": ["service_name"]
            }),
            Self::Unknown(_) => json!({ "type": "object", "properties": {} }),
        }
    }

    /// Declaration in chat-completions `tools` format
    pub fn declaration(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name(),
                "description": self.description(),
                "parameters": self.parameters_schema()
            }
        })
    }
}

/// Declarations of every supported function, in a fixed order
pub fn declarations() -> Vec<Value> {
    BillingFunction::SUPPORTED
        .iter()
        .map(BillingFunction::declaration)
        .collect()
}

/// Parse a model-supplied argument string.
///
/// Anything that is not a JSON object degrades to an empty argument map.
pub fn parse_arguments(raw: &str) -> Map<String, Value> {
    if raw.trim().is_empty() {
        return Map::new();
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            warn!(arguments = %other, "Tool arguments are not an object, using empty arguments");
            Map::new()
        }
        Err(e) => {
            warn!(error = %e, arguments = raw, "Failed to parse tool arguments, using empty arguments");
            Map::new()
        }
    }
}

/// Executes billing functions on behalf of the model
#[derive(Clone)]
pub struct BillingTools {
    billing: Arc<BillingService>,
}

impl BillingTools {
    pub fn new(billing: Arc<BillingService>) -> Self {
        Self { billing }
    }

    /// Run `function` with `arguments` and render the outcome as JSON
    pub async fn execute(&self, function: &BillingFunction, arguments: Map<String, Value>) -> Value {
        info!(function = function.name(), ?arguments, "Executing billing function");

        match function {
            BillingFunction::CostSummary => match typed_args::<SummaryArgs>(function, arguments) {
                Ok(args) => render(self.billing.cost_summary(args).await),
                Err(failure) => failure_value(&failure),
            },
            BillingFunction::CostForecast => {
                let args = typed_args::<ForecastArgs>(function, arguments).and_then(|args| {
                    args.validate()
                        .map(|_| args)
                        .map_err(|detail| invalid_arguments(function, detail))
                });
                match args {
                    Ok(args) => render(self.billing.cost_forecast(args).await),
                    Err(failure) => failure_value(&failure),
                }
            }
            BillingFunction::ServiceCosts => {
                match typed_args::<ServiceCostsArgs>(function, arguments) {
                    Ok(args) => render(self.billing.service_costs(args).await),
                    Err(failure) => failure_value(&failure),
                }
            }
            BillingFunction::Unknown(name) => {
                warn!(function = %name, "Model requested an unknown function");
                json!({ "error": format!("Unknown function: {name}") })
            }
        }
    }
}

fn invalid_arguments(function: &BillingFunction, detail: impl std::fmt::Display) -> BillingFailure {
    BillingFailure {
        error: format!("Invalid arguments for {}: {detail}", function.name()),
        help: Some(CREDENTIALS_HELP.to_string()),
    }
}

fn typed_args<T: DeserializeOwned>(
    function: &BillingFunction,
    arguments: Map<String, Value>,
) -> Result<T, BillingFailure> {
    serde_json::from_value(Value::Object(arguments)).map_err(|e| invalid_arguments(function, e))
}

fn render<T: serde::Serialize>(result: Result<T, BillingFailure>) -> Value {
    match result {
        Ok(payload) => serde_json::to_value(payload)
            .unwrap_or_else(|e| json!({ "error": format!("Failed to serialize result: {e}") })),
        Err(failure) => failure_value(&failure),
    }
}

fn failure_value(failure: &BillingFailure) -> Value {
    serde_json::to_value(failure).unwrap_or_else(|_| json!({ "error": failure.error }))
}
