//! Metrics for Cost Explorer queries.

use metrics::{counter, histogram};
use std::time::Instant;

/// Billing query metrics recorder
pub struct BillingMetrics;

impl BillingMetrics {
    /// Record a finished billing query
    pub fn record_query(operation: &'static str, success: bool, duration_secs: f64) {
        let outcome = if success { "success" } else { "failure" };

        counter!(
            "billing_queries_total",
            "operation" => operation,
            "outcome" => outcome
        )
        .increment(1);
        histogram!("billing_query_duration_seconds", "operation" => operation)
            .record(duration_secs);
    }
}

/// Timer guard for a billing query.
///
/// Records a failure when dropped without [`BillingTimer::finish`].
pub struct BillingTimer {
    start: Instant,
    operation: &'static str,
    finished: bool,
}

impl BillingTimer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
            finished: false,
        }
    }

    /// Stop the timer and record the outcome. Returns elapsed milliseconds.
    pub fn finish(mut self, success: bool) -> u64 {
        self.record(success)
    }

    fn record(&mut self, success: bool) -> u64 {
        if self.finished {
            return 0;
        }
        self.finished = true;

        let elapsed = self.start.elapsed();
        BillingMetrics::record_query(self.operation, success, elapsed.as_secs_f64());
        elapsed.as_millis() as u64
    }
}

impl Drop for BillingTimer {
    fn drop(&mut self) {
        if !self.finished {
            self.record(false);
        }
    }
}
