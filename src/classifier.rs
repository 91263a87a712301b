//! Binary news classifiers.
//!
//! The serving layer only talks to the [`Classifier`] trait. Whether a model exposes calibrated
//! probabilities is a static capability ([`Capabilities::probability`]) that callers check once
//! at load time, rather than probing per request.

pub mod grid_search;
pub mod logistic;

pub use grid_search::{CandidateScore, GridSearch, GridSearchOutcome, stratified_folds};
pub use logistic::{FitSummary, LogisticParams, LogisticRegression, Solver};

use crate::features::{FeatureMatrix, FeatureVector};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Article label: `0` for fake news, `1` for real news.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    /// Fabricated or unreliable article (`0`).
    Fake,
    /// Reliable article (`1`).
    Real,
}

impl Label {
    /// Parse the raw dataset value.
    pub fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Fake),
            1 => Some(Self::Real),
            _ => None,
        }
    }

    /// Raw numeric label.
    pub fn as_raw(self) -> u8 {
        match self {
            Self::Fake => 0,
            Self::Real => 1,
        }
    }

    /// Human-readable label shown to users.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Fake => "Fake News",
            Self::Real => "Real News",
        }
    }

    /// Regression target used by the training objective.
    pub(crate) fn target(self) -> f64 {
        f64::from(self.as_raw())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Errors raised by classifiers during fitting or inference.
#[derive(Debug, Error, PartialEq)]
pub enum ClassifierError {
    /// Inference was attempted before the model was fitted.
    #[error("classifier is not initialized: fit it or load a trained artifact first")]
    NotFitted,
    /// Feature vector does not fit the model's input dimension.
    #[error("feature dimension mismatch: model expects {expected} columns, got {actual}")]
    DimensionMismatch {
        /// Number of columns the model was fitted on.
        expected: usize,
        /// Columns required by the supplied vector or matrix.
        actual: usize,
    },
    /// Feature rows and labels differ in length.
    #[error("got {features} feature rows but {labels} labels")]
    LengthMismatch {
        /// Number of feature rows.
        features: usize,
        /// Number of labels.
        labels: usize,
    },
    /// No training rows were supplied.
    #[error("cannot fit a classifier on an empty training set")]
    EmptyTrainingSet,
    /// Training labels contain only one class.
    #[error("training labels contain a single class; both fake and real examples are required")]
    SingleClass,
    /// A hyperparameter is out of range.
    #[error("invalid classifier parameter: {0}")]
    InvalidParameter(String),
}

/// Static features a trained classifier supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// Whether [`Classifier::predict_proba`] returns calibrated probabilities.
    pub probability: bool,
}

/// Trained binary classifier over TF-IDF feature vectors.
pub trait Classifier: Send + Sync {
    /// Short model family name used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Number of input columns the model was trained on.
    fn n_features(&self) -> Result<usize, ClassifierError>;

    /// Signed decision value; positive means [`Label::Real`].
    fn decision(&self, x: &FeatureVector) -> Result<f64, ClassifierError>;

    /// Static capabilities of this model.
    fn capabilities(&self) -> Capabilities;

    /// Probability of the predicted class, or `None` when the model is not probabilistic.
    fn predict_proba(&self, _x: &FeatureVector) -> Result<Option<f64>, ClassifierError> {
        Ok(None)
    }

    /// Predicted label for one row.
    fn predict(&self, x: &FeatureVector) -> Result<Label, ClassifierError> {
        Ok(if self.decision(x)? > 0.0 {
            Label::Real
        } else {
            Label::Fake
        })
    }

    /// Predicted labels for every row in `x`.
    fn predict_batch(&self, x: &FeatureMatrix) -> Result<Vec<Label>, ClassifierError> {
        x.rows().iter().map(|row| self.predict(row)).collect()
    }
}
