//! Cost Explorer and STS clients backed by the AWS SDK.
//!
//! Credentials come from the configured key pair when both halves are set,
//! otherwise from the standard AWS SDK chain:
//! - Environment variables (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`)
//! - Web identity token (EKS IRSA)
//! - IAM instance profile (EC2)
//! - Shared credentials file

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_costexplorer::error::DisplayErrorContext;
use aws_sdk_costexplorer::types::{
    DateInterval, Dimension as CeDimension, DimensionValues, Expression, ForecastResult,
    Granularity as CeGranularity, GroupDefinition, GroupDefinitionType, Metric, ResultByTime,
};
use tracing::debug;

use super::explorer::{
    CostExplorer, CostGroup, CostQuery, Dimension, ExplorerError, ExplorerResult, ForecastBucket,
    ForecastData, ForecastQuery, TimeBucket, format_date,
};
use crate::config::AwsConfig;
use crate::models::{CallerIdentity, DateWindow, Granularity};

const UNBLENDED_COST: &str = "UnblendedCost";
const USAGE_QUANTITY: &str = "UsageQuantity";

/// [`CostExplorer`] talking to the real AWS APIs
#[derive(Clone)]
pub struct AwsCostExplorer {
    cost_explorer: aws_sdk_costexplorer::Client,
    sts: aws_sdk_sts::Client,
}

impl AwsCostExplorer {
    pub fn new(cost_explorer: aws_sdk_costexplorer::Client, sts: aws_sdk_sts::Client) -> Self {
        Self { cost_explorer, sts }
    }

    /// Build both clients from configuration
    pub async fn from_config(config: &AwsConfig) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

        if let Some((access_key_id, secret_access_key)) = config.static_credentials() {
            let credentials = aws_sdk_costexplorer::config::Credentials::new(
                access_key_id,
                secret_access_key,
                None, // session token
                None, // expiry
                "finops-config",
            );
            loader = loader.credentials_provider(credentials);
        } else {
            debug!("no static AWS keys configured, using default credential chain");
        }

        let sdk_config = loader.load().await;

        Self::new(
            aws_sdk_costexplorer::Client::new(&sdk_config),
            aws_sdk_sts::Client::new(&sdk_config),
        )
    }
}

#[async_trait]
impl CostExplorer for AwsCostExplorer {
    async fn cost_and_usage(&self, query: CostQuery) -> ExplorerResult<Vec<TimeBucket>> {
        let mut request = self
            .cost_explorer
            .get_cost_and_usage()
            .time_period(date_interval(query.window)?)
            .granularity(ce_granularity(query.granularity))
            .metrics(UNBLENDED_COST)
            .metrics(USAGE_QUANTITY);

        if let Some(dimension) = query.group_by {
            request = request.group_by(
                GroupDefinition::builder()
                    .r#type(GroupDefinitionType::Dimension)
                    .key(ce_dimension(dimension).as_str())
                    .build(),
            );
        }

        if let Some(service) = query.service {
            request = request.filter(
                Expression::builder()
                    .dimensions(
                        DimensionValues::builder()
                            .key(CeDimension::Service)
                            .values(service)
                            .build(),
                    )
                    .build(),
            );
        }

        let output = request
            .send()
            .await
            .map_err(|e| ExplorerError::Request(DisplayErrorContext(&e).to_string()))?;

        output.results_by_time().iter().map(time_bucket).collect()
    }

    async fn cost_forecast(&self, query: ForecastQuery) -> ExplorerResult<ForecastData> {
        let output = self
            .cost_explorer
            .get_cost_forecast()
            .time_period(date_interval(query.window)?)
            .metric(Metric::UnblendedCost)
            .granularity(ce_granularity(query.granularity))
            .send()
            .await
            .map_err(|e| ExplorerError::Request(DisplayErrorContext(&e).to_string()))?;

        let total = output
            .total()
            .and_then(|t| t.amount())
            .map(parse_amount)
            .transpose()?;
        let unit = output.total().and_then(|t| t.unit()).map(str::to_string);

        let buckets = output
            .forecast_results_by_time()
            .iter()
            .map(forecast_bucket)
            .collect::<ExplorerResult<Vec<_>>>()?;

        Ok(ForecastData {
            total,
            unit,
            buckets,
        })
    }

    async fn caller_identity(&self) -> ExplorerResult<CallerIdentity> {
        let output = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| ExplorerError::Request(DisplayErrorContext(&e).to_string()))?;

        Ok(CallerIdentity {
            account: output.account().map(str::to_string),
            arn: output.arn().map(str::to_string),
            user_id: output.user_id().map(str::to_string),
        })
    }
}

fn date_interval(window: DateWindow) -> ExplorerResult<DateInterval> {
    DateInterval::builder()
        .start(format_date(window.start))
        .end(format_date(window.end))
        .build()
        .map_err(|e| ExplorerError::Request(e.to_string()))
}

fn ce_granularity(granularity: Granularity) -> CeGranularity {
    match granularity {
        Granularity::Daily => CeGranularity::Daily,
        Granularity::Monthly => CeGranularity::Monthly,
    }
}

fn ce_dimension(dimension: Dimension) -> CeDimension {
    match dimension {
        Dimension::Service => CeDimension::Service,
        Dimension::UsageType => CeDimension::UsageType,
    }
}

fn parse_amount(raw: &str) -> ExplorerResult<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ExplorerError::Malformed(format!("amount '{raw}' is not a number")))
}

fn period_bounds(period: Option<&DateInterval>) -> ExplorerResult<(String, String)> {
    let period = period.ok_or_else(|| ExplorerError::Malformed("missing TimePeriod".into()))?;
    Ok((period.start().to_string(), period.end().to_string()))
}

fn time_bucket(result: &ResultByTime) -> ExplorerResult<TimeBucket> {
    let (start, end) = period_bounds(result.time_period())?;

    let groups = result
        .groups()
        .iter()
        .map(|group| {
            let key = group
                .keys()
                .first()
                .cloned()
                .ok_or_else(|| ExplorerError::Malformed("group without keys".into()))?;
            let cost = group
                .metrics()
                .and_then(|m| m.get(UNBLENDED_COST))
                .ok_or_else(|| ExplorerError::Malformed(format!("no {UNBLENDED_COST} for {key}")))?;
            let amount = parse_amount(cost.amount().unwrap_or("0"))?;
            let unit = cost.unit().unwrap_or(crate::models::DEFAULT_CURRENCY).to_string();

            Ok(CostGroup { key, amount, unit })
        })
        .collect::<ExplorerResult<Vec<_>>>()?;

    Ok(TimeBucket { start, end, groups })
}

fn forecast_bucket(result: &ForecastResult) -> ExplorerResult<ForecastBucket> {
    let (start, end) = period_bounds(result.time_period())?;
    let mean = parse_amount(result.mean_value().unwrap_or("0"))?;
    Ok(ForecastBucket { start, end, mean })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_costexplorer::types::{Group, MetricValue};

    fn interval(start: &str, end: &str) -> DateInterval {
        DateInterval::builder().start(start).end(end).build().unwrap()
    }

    fn cost(amount: &str) -> MetricValue {
        MetricValue::builder().amount(amount).unit("USD").build()
    }

    #[test]
    fn test_time_bucket_maps_groups() {
        let result = ResultByTime::builder()
            .time_period(interval("2024-03-01", "2024-04-01"))
            .groups(
                Group::builder()
                    .keys("Amazon Elastic Compute Cloud - Compute")
                    .metrics(UNBLENDED_COST, cost("12.3456"))
                    .metrics(USAGE_QUANTITY, cost("720"))
                    .build(),
            )
            .build();

        let bucket = time_bucket(&result).unwrap();
        assert_eq!(bucket.start, "2024-03-01");
        assert_eq!(bucket.end, "2024-04-01");
        assert_eq!(
            bucket.groups,
            vec![CostGroup {
                key: "Amazon Elastic Compute Cloud - Compute".into(),
                amount: 12.3456,
                unit: "USD".into(),
            }]
        );
    }

    #[test]
    fn test_time_bucket_without_unblended_cost_is_malformed() {
        let result = ResultByTime::builder()
            .time_period(interval("2024-03-01", "2024-03-02"))
            .groups(
                Group::builder()
                    .keys("AWS Lambda")
                    .metrics(USAGE_QUANTITY, cost("3"))
                    .build(),
            )
            .build();

        assert!(matches!(time_bucket(&result), Err(ExplorerError::Malformed(_))));
    }

    #[test]
    fn test_time_bucket_without_period_is_malformed() {
        let result = ResultByTime::builder().build();
        assert!(matches!(time_bucket(&result), Err(ExplorerError::Malformed(_))));
    }

    #[test]
    fn test_forecast_bucket_parses_mean() {
        let result = ForecastResult::builder()
            .time_period(interval("2024-04-01", "2024-05-01"))
            .mean_value("321.987")
            .build();

        let bucket = forecast_bucket(&result).unwrap();
        assert_eq!(bucket.mean, 321.987);
        assert_eq!(bucket.start, "2024-04-01");
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert_eq!(parse_amount(" 1.25 ").unwrap(), 1.25);
        assert!(parse_amount("n/a").is_err());
    }

    #[test]
    fn test_sdk_enum_mapping() {
        assert_eq!(ce_granularity(Granularity::Daily), CeGranularity::Daily);
        assert_eq!(ce_dimension(Dimension::UsageType).as_str(), "USAGE_TYPE");
        assert_eq!(ce_dimension(Dimension::Service).as_str(), "SERVICE");
    }
}
