use chrono::{NaiveDate, Utc};
use observability::BillingTimer;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use super::explorer::{CostExplorer, CostQuery, Dimension, ForecastQuery, TimeBucket};
use super::{BillingFailure, BillingResult};
use crate::models::{
    CallerIdentity, CostForecast, CostSummary, DEFAULT_CURRENCY, DateWindow, ForecastPeriod,
    Granularity, PeriodCost, ServiceCost, ServiceCostBreakdown, UsageTypeCost, round_cents,
};

/// Forecast horizon used when none is requested
pub const DEFAULT_FORECAST_DAYS: u32 = 30;

/// Longest horizon Cost Explorer forecasts (18 months)
pub const MAX_FORECAST_DAYS: u32 = 548;

/// Arguments of `get_aws_cost_summary`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SummaryArgs {
    #[serde(default, deserialize_with = "optional_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "optional_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub granularity: Option<Granularity>,
}

/// Arguments of `get_aws_cost_forecast`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ForecastArgs {
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub granularity: Option<Granularity>,
}

impl ForecastArgs {
    pub fn validate(&self) -> Result<(), String> {
        match self.days {
            Some(0) => Err("days must be at least 1".to_string()),
            Some(days) if days > MAX_FORECAST_DAYS => {
                Err(format!("days must be at most {MAX_FORECAST_DAYS}"))
            }
            _ => Ok(()),
        }
    }
}

/// Arguments of `get_aws_service_costs`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceCostsArgs {
    pub service_name: String,
    #[serde(default, deserialize_with = "optional_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "optional_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub granularity: Option<Granularity>,
}

/// Blank strings count as "not provided"; anything else must be `YYYY-MM-DD`.
fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid date '{value}': {e}"))),
    }
}

fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Billing queries over a [`CostExplorer`].
///
/// Every query returns either its payload or a [`BillingFailure`] meant to
/// be handed to the model as-is.
#[derive(Clone)]
pub struct BillingService {
    explorer: Arc<dyn CostExplorer>,
    today: fn() -> NaiveDate,
}

impl BillingService {
    pub fn new(explorer: Arc<dyn CostExplorer>) -> Self {
        Self {
            explorer,
            today: utc_today,
        }
    }

    /// Use a fixed notion of "today"
    pub fn with_clock(explorer: Arc<dyn CostExplorer>, today: fn() -> NaiveDate) -> Self {
        Self { explorer, today }
    }

    /// Total and per-service cost over a window
    pub async fn cost_summary(&self, args: SummaryArgs) -> BillingResult<CostSummary> {
        let window = DateWindow::resolve(args.start_date, args.end_date, (self.today)());
        let granularity = args.granularity.unwrap_or(Granularity::Monthly);

        info!(
            start = %window.start,
            end = %window.end,
            granularity = %granularity,
            "Getting cost summary"
        );

        let timer = BillingTimer::start("cost_summary");
        let result = self
            .explorer
            .cost_and_usage(CostQuery {
                window,
                granularity,
                group_by: Some(Dimension::Service),
                service: None,
            })
            .await;
        timer.finish(result.is_ok());

        let buckets = result.map_err(|e| {
            error!(error = %e, "Error getting AWS cost summary");
            BillingFailure::with_help(format!("Failed to retrieve AWS cost data: {e}"))
        })?;

        Ok(summarize(window, granularity, &buckets))
    }

    /// Forecast of unblended cost from today forward
    pub async fn cost_forecast(&self, args: ForecastArgs) -> BillingResult<CostForecast> {
        let days = args.days.unwrap_or(DEFAULT_FORECAST_DAYS);
        let granularity = args.granularity.unwrap_or(Granularity::Monthly);
        let window = DateWindow::forward((self.today)(), days).ok_or_else(|| {
            BillingFailure::with_help(format!(
                "Failed to retrieve AWS cost forecast: {days} days from today is out of range"
            ))
        })?;

        info!(
            start = %window.start,
            end = %window.end,
            granularity = %granularity,
            "Getting cost forecast"
        );

        let timer = BillingTimer::start("cost_forecast");
        let result = self
            .explorer
            .cost_forecast(ForecastQuery {
                window,
                granularity,
            })
            .await;
        timer.finish(result.is_ok());

        let data = result.map_err(|e| {
            error!(error = %e, "Error getting AWS cost forecast");
            BillingFailure::with_help(format!("Failed to retrieve AWS cost forecast: {e}"))
        })?;

        let currency = data.unit.unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        let forecast_by_time = data
            .buckets
            .into_iter()
            .map(|bucket| ForecastPeriod {
                start: bucket.start,
                end: bucket.end,
                amount: round_cents(bucket.mean),
                currency: currency.clone(),
            })
            .collect();

        Ok(CostForecast {
            forecast_total: round_cents(data.total.unwrap_or(0.0)),
            currency,
            start_date: window.start,
            end_date: window.end,
            granularity,
            forecast_by_time,
        })
    }

    /// Usage-type breakdown of a single service
    pub async fn service_costs(&self, args: ServiceCostsArgs) -> BillingResult<ServiceCostBreakdown> {
        let window = DateWindow::resolve(args.start_date, args.end_date, (self.today)());
        let granularity = args.granularity.unwrap_or(Granularity::Daily);
        let service_name = args.service_name;

        info!(
            service = %service_name,
            start = %window.start,
            end = %window.end,
            "Getting service costs"
        );

        let timer = BillingTimer::start("service_costs");
        let result = self
            .explorer
            .cost_and_usage(CostQuery {
                window,
                granularity,
                group_by: Some(Dimension::UsageType),
                service: Some(service_name.clone()),
            })
            .await;
        timer.finish(result.is_ok());

        let buckets = result.map_err(|e| {
            error!(error = %e, service = %service_name, "Error getting AWS service costs");
            BillingFailure::with_help(format!("Failed to retrieve costs for {service_name}: {e}"))
        })?;

        Ok(breakdown(service_name, window, granularity, &buckets))
    }

    /// Check STS identity and Cost Explorer reachability
    pub async fn verify_access(&self) -> BillingResult<CallerIdentity> {
        let identity = self
            .explorer
            .caller_identity()
            .await
            .map_err(|e| BillingFailure::bare(e.to_string()))?;
        info!(account = ?identity.account, arn = ?identity.arn, "AWS identity resolved");

        let today = (self.today)();
        let window = DateWindow {
            start: today - chrono::Duration::days(1),
            end: today,
        };
        info!(start = %window.start, end = %window.end, "Testing Cost Explorer access");

        self.explorer
            .cost_and_usage(CostQuery {
                window,
                granularity: Granularity::Daily,
                group_by: None,
                service: None,
            })
            .await
            .map_err(|e| BillingFailure::bare(e.to_string()))?;

        Ok(identity)
    }
}

/// Ordered accumulator keyed by group name; keeps first-seen order.
#[derive(Default)]
struct Totals {
    order: Vec<(String, f64)>,
    index: HashMap<String, usize>,
}

impl Totals {
    fn add(&mut self, key: &str, amount: f64) {
        match self.index.get(key) {
            Some(&i) => self.order[i].1 += amount,
            None => {
                self.index.insert(key.to_string(), self.order.len());
                self.order.push((key.to_string(), amount));
            }
        }
    }

    /// Entries rounded to cents, most expensive first
    fn into_sorted(self) -> Vec<(String, f64)> {
        let mut entries: Vec<(String, f64)> = self
            .order
            .into_iter()
            .map(|(key, amount)| (key, round_cents(amount)))
            .collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));
        entries
    }
}

fn first_currency(buckets: &[TimeBucket]) -> String {
    buckets
        .iter()
        .flat_map(|b| b.groups.iter())
        .map(|g| g.unit.clone())
        .next()
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
}

fn summarize(window: DateWindow, granularity: Granularity, buckets: &[TimeBucket]) -> CostSummary {
    let mut totals = Totals::default();
    let mut total = 0.0;

    for group in buckets.iter().flat_map(|b| b.groups.iter()) {
        total += group.amount;
        totals.add(&group.key, group.amount);
    }

    let currency = first_currency(buckets);
    let services = totals
        .into_sorted()
        .into_iter()
        .map(|(service_name, cost)| ServiceCost {
            service_name,
            cost,
            currency: currency.clone(),
        })
        .collect();

    CostSummary {
        total_cost: round_cents(total),
        currency,
        start_date: window.start,
        end_date: window.end,
        granularity,
        services,
    }
}

fn breakdown(
    service_name: String,
    window: DateWindow,
    granularity: Granularity,
    buckets: &[TimeBucket],
) -> ServiceCostBreakdown {
    let mut totals = Totals::default();
    let mut total = 0.0;

    let time_series = buckets
        .iter()
        .map(|bucket| {
            let mut period_total = 0.0;
            let usage_types = bucket
                .groups
                .iter()
                .map(|group| {
                    period_total += group.amount;
                    totals.add(&group.key, group.amount);
                    UsageTypeCost {
                        usage_type: group.key.clone(),
                        cost: round_cents(group.amount),
                    }
                })
                .collect();
            total += period_total;

            PeriodCost {
                start: bucket.start.clone(),
                end: bucket.end.clone(),
                cost: round_cents(period_total),
                usage_types,
            }
        })
        .collect();

    let usage_details = totals
        .into_sorted()
        .into_iter()
        .map(|(usage_type, cost)| UsageTypeCost { usage_type, cost })
        .collect();

    ServiceCostBreakdown {
        service_name,
        total_cost: round_cents(total),
        currency: first_currency(buckets),
        start_date: window.start,
        end_date: window.end,
        granularity,
        time_series,
        usage_details,
    }
}
