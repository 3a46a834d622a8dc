//! AWS billing queries exposed to the model as functions.

mod aws;
mod explorer;
mod service;

pub use aws::AwsCostExplorer;
pub use explorer::{
    CostExplorer, CostGroup, CostQuery, Dimension, ExplorerError, ExplorerResult, ForecastBucket,
    ForecastData, ForecastQuery, TimeBucket,
};
#[cfg(test)]
pub use explorer::MockCostExplorer;
pub use service::{
    BillingService, ForecastArgs, MAX_FORECAST_DAYS, ServiceCostsArgs,
    SummaryArgs,
};

use serde::Serialize;
use thiserror::Error;

pub const CREDENTIALS_HELP: &str =
    "Please ensure your AWS credentials are properly configured with Cost Explorer access permissions.";

/// Billing failure reported to the model as data.
///
/// Serializes to `{"error": ..., "help": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{error}")]
pub struct BillingFailure {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl BillingFailure {
    /// Failure carrying the credentials hint
    pub fn with_help(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            help: Some(CREDENTIALS_HELP.to_string()),
        }
    }

    /// Failure without a hint
    pub fn bare(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            help: None,
        }
    }
}

pub type BillingResult<T> = Result<T, BillingFailure>;
