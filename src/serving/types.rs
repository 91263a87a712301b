//! Prediction results and errors shared by the serving context and the HTTP layer.

use crate::classifier::Label;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Minimum trimmed length, in characters, of an article accepted for prediction.
pub const MIN_TEXT_CHARS: usize = 10;

/// Where a prediction's confidence figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceSource {
    /// Probability of the predicted class reported by the classifier.
    Probability,
    /// Configured constant used for classifiers without probabilities.
    Fallback,
}

/// Outcome of classifying one article.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    /// Predicted class.
    pub label: Label,
    /// Confidence as a percentage in `[0, 100]`.
    pub confidence: f64,
    /// Origin of `confidence`.
    pub source: ConfidenceSource,
}

impl Prediction {
    /// Raw numeric label (`0` fake, `1` real).
    pub fn raw_label(&self) -> u8 {
        self.label.as_raw()
    }

    /// Confidence rounded to two decimals.
    pub fn rounded_confidence(&self) -> f64 {
        (self.confidence * 100.0).round() / 100.0
    }
}

/// Why a prediction request produced no result.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PredictionError {
    /// Artifacts were not loaded at startup.
    #[error("model not loaded")]
    NotReady,
    /// Article text is too short to classify.
    #[error("article text must contain at least 10 characters")]
    InvalidInput,
    /// Vectorization or classification failed.
    #[error("{0}")]
    Inference(String),
    /// Inference exceeded the configured budget.
    #[error("prediction timed out after {} ms", .0.as_millis())]
    Timeout(Duration),
}

impl PredictionError {
    /// Whether the request was refused before reaching the model.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::NotReady | Self::InvalidInput)
    }
}

/// Readiness report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Health {
    /// Whether both artifacts are loaded and paired.
    pub ready: bool,
}
