//! Online prediction: the loaded model, request validation, and the async service used by HTTP.

mod context;
mod service;
mod types;

pub use context::{ArtifactPaths, ServingContext};
pub use service::{PredictionApi, PredictionService};
pub use types::{ConfidenceSource, Health, MIN_TEXT_CHARS, Prediction, PredictionError};
