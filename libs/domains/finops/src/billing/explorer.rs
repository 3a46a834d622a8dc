use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{CallerIdentity, DateWindow, Granularity};

pub type ExplorerResult<T> = Result<T, ExplorerError>;

/// Failures talking to Cost Explorer or STS
#[derive(Debug, Error)]
pub enum ExplorerError {
    /// Request rejected or not delivered (credentials, permissions, network)
    #[error("{0}")]
    Request(String),

    /// Upstream answered with something we cannot interpret
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Cost Explorer dimension used for grouping and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Service,
    UsageType,
}

/// A `GetCostAndUsage` request
#[derive(Debug, Clone, PartialEq)]
pub struct CostQuery {
    pub window: DateWindow,
    pub granularity: Granularity,
    pub group_by: Option<Dimension>,
    /// Restrict results to one service
    pub service: Option<String>,
}

/// A `GetCostForecast` request for unblended cost
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastQuery {
    pub window: DateWindow,
    pub granularity: Granularity,
}

/// Unblended cost of one group within a time bucket
#[derive(Debug, Clone, PartialEq)]
pub struct CostGroup {
    pub key: String,
    pub amount: f64,
    pub unit: String,
}

/// One entry of `ResultsByTime`
#[derive(Debug, Clone, PartialEq)]
pub struct TimeBucket {
    pub start: String,
    pub end: String,
    pub groups: Vec<CostGroup>,
}

/// One entry of `ForecastResultsByTime`
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastBucket {
    pub start: String,
    pub end: String,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForecastData {
    pub total: Option<f64>,
    pub unit: Option<String>,
    pub buckets: Vec<ForecastBucket>,
}

/// Read access to AWS billing data.
///
/// Implementations return raw upstream figures; shaping and rounding happen
/// in [`super::BillingService`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CostExplorer: Send + Sync {
    async fn cost_and_usage(&self, query: CostQuery) -> ExplorerResult<Vec<TimeBucket>>;

    async fn cost_forecast(&self, query: ForecastQuery) -> ExplorerResult<ForecastData>;

    async fn caller_identity(&self) -> ExplorerResult<CallerIdentity>;
}

/// Format a date the way Cost Explorer expects it
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
