use crate::classifier::Label;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing prediction traffic.
#[derive(Debug, Default)]
pub struct PredictionMetrics {
    served: AtomicU64,
    real: AtomicU64,
    fake: AtomicU64,
    rejected: AtomicU64,
    failed: AtomicU64,
}

impl PredictionMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful prediction.
    pub fn record_prediction(&self, label: Label) {
        self.served.fetch_add(1, Ordering::Relaxed);
        let counter = match label {
            Label::Real => &self.real,
            Label::Fake => &self.fake,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request refused before inference (model not loaded or invalid input).
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an inference failure or timeout.
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            predictions_served: self.served.load(Ordering::Relaxed),
            predicted_real: self.real.load(Ordering::Relaxed),
            predicted_fake: self.fake.load(Ordering::Relaxed),
            requests_rejected: self.rejected.load(Ordering::Relaxed),
            inference_failures: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of prediction counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Successful predictions since startup.
    pub predictions_served: u64,
    /// Predictions labeled real.
    pub predicted_real: u64,
    /// Predictions labeled fake.
    pub predicted_fake: u64,
    /// Requests refused before inference.
    pub requests_rejected: u64,
    /// Inference errors and timeouts.
    pub inference_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_predictions_by_label() {
        let metrics = PredictionMetrics::new();
        metrics.record_prediction(Label::Real);
        metrics.record_prediction(Label::Fake);
        metrics.record_prediction(Label::Real);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.predictions_served, 3);
        assert_eq!(snapshot.predicted_real, 2);
        assert_eq!(snapshot.predicted_fake, 1);
    }

    #[test]
    fn rejections_and_failures_do_not_count_as_served() {
        let metrics = PredictionMetrics::new();
        metrics.record_rejected();
        metrics.record_failed();
        metrics.record_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.predictions_served, 0);
        assert_eq!(snapshot.requests_rejected, 1);
        assert_eq!(snapshot.inference_failures, 2);
    }
}
