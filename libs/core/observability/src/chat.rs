//! Metrics for the chat orchestration loop.

use metrics::{counter, histogram};
use std::time::Duration;

/// Chat orchestration metrics recorder
pub struct ChatMetrics;

impl ChatMetrics {
    /// Record one round trip to the LLM endpoint.
    ///
    /// `round` is `initial` or `follow_up`; `outcome` is `success`,
    /// `timeout`, `transport_error`, `upstream_error` or `invalid_response`.
    pub fn record_round_trip(round: &'static str, outcome: &'static str, duration: Duration) {
        counter!("llm_round_trips_total", "round" => round, "outcome" => outcome).increment(1);
        histogram!("llm_round_trip_duration_seconds", "round" => round)
            .record(duration.as_secs_f64());

        tracing::debug!(
            round = round,
            outcome = outcome,
            duration_ms = duration.as_millis() as u64,
            "LLM round trip finished"
        );
    }

    /// Record one executed tool call.
    ///
    /// `function` must come from a fixed set of names.
    pub fn record_tool_call(function: &'static str, outcome: &'static str) {
        counter!("tool_calls_total", "function" => function, "outcome" => outcome).increment(1);
    }
}
