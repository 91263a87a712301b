use super::context::ServingContext;
use super::types::{Health, Prediction, PredictionError};
use crate::metrics::{MetricsSnapshot, PredictionMetrics};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Abstraction over the prediction pipeline used by the HTTP surface.
#[async_trait]
pub trait PredictionApi: Send + Sync {
    /// Classify one article.
    async fn predict(&self, text: String) -> Result<Prediction, PredictionError>;

    /// Current readiness.
    fn health(&self) -> Health;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Production [`PredictionApi`] backed by a [`ServingContext`].
///
/// Inference runs on Tokio's blocking pool and is bounded by a timeout.
pub struct PredictionService {
    context: Arc<ServingContext>,
    metrics: Arc<PredictionMetrics>,
    timeout: Duration,
}

impl PredictionService {
    /// Wrap a context with a per-request inference budget.
    pub fn new(context: ServingContext, timeout: Duration) -> Self {
        Self {
            context: Arc::new(context),
            metrics: Arc::new(PredictionMetrics::new()),
            timeout,
        }
    }
}

#[async_trait]
impl PredictionApi for PredictionService {
    async fn predict(&self, text: String) -> Result<Prediction, PredictionError> {
        if let Err(err) = self.context.validate(&text) {
            self.metrics.record_rejected();
            tracing::debug!(reason = %err, "Prediction request rejected");
            return Err(err);
        }

        let context = Arc::clone(&self.context);
        let chars = text.chars().count();
        let task = tokio::task::spawn_blocking(move || context.predict_request(&text));
        let outcome = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(PredictionError::Inference(format!(
                "inference task failed: {join_error}"
            ))),
            Err(_) => Err(PredictionError::Timeout(self.timeout)),
        };

        match &outcome {
            Ok(prediction) => {
                self.metrics.record_prediction(prediction.label);
                tracing::info!(
                    label = %prediction.label,
                    confidence = prediction.confidence,
                    source = ?prediction.source,
                    chars,
                    "Prediction served"
                );
            }
            Err(err) if err.is_rejection() => self.metrics.record_rejected(),
            Err(err) => {
                self.metrics.record_failed();
                tracing::error!(error = %err, chars, "Prediction failed");
            }
        }
        outcome
    }

    fn health(&self) -> Health {
        self.context.health()
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
