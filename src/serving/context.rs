//! Immutable holder of the loaded vectorizer and classifier.

use super::types::{ConfidenceSource, Health, MIN_TEXT_CHARS, Prediction, PredictionError};
use crate::artifacts::{self, ArtifactError};
use crate::classifier::Classifier;
use crate::features::TfidfVectorizer;
use crate::text;
use std::path::PathBuf;

/// Locations of the two artifact files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Classifier artifact.
    pub model: PathBuf,
    /// Vectorizer artifact.
    pub vectorizer: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ConfidenceMode {
    Probability,
    Fallback(f64),
}

struct LoadedModel {
    vectorizer: TfidfVectorizer,
    classifier: Box<dyn Classifier>,
    confidence: ConfidenceMode,
}

enum State {
    NotReady { reason: String },
    Ready(Box<LoadedModel>),
}

/// Serving state, fixed at construction: either READY with a paired vectorizer and classifier,
/// or NOT_READY with the reason it failed to load.
pub struct ServingContext {
    state: State,
}

impl ServingContext {
    /// Load both artifacts. Every failure is logged and yields a NOT_READY context.
    pub fn load(paths: &ArtifactPaths, fallback_confidence: f64) -> Self {
        match load_pair(paths) {
            Ok((vectorizer, classifier)) => {
                Self::from_parts(vectorizer, Box::new(classifier), fallback_confidence)
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    model = %paths.model.display(),
                    vectorizer = %paths.vectorizer.display(),
                    "Failed to load model artifacts; serving without a model"
                );
                Self::not_ready(err.to_string())
            }
        }
    }

    /// Assemble a context from in-memory components.
    ///
    /// The classifier's probability capability is resolved here, once. Components that do not
    /// agree on the feature dimension yield a NOT_READY context.
    pub fn from_parts(
        vectorizer: TfidfVectorizer,
        classifier: Box<dyn Classifier>,
        fallback_confidence: f64,
    ) -> Self {
        let vocabulary = match vectorizer.n_features() {
            Ok(size) => size,
            Err(err) => return Self::refuse(format!("vectorizer unusable: {err}")),
        };
        match classifier.n_features() {
            Ok(expected) if expected == vocabulary => {}
            Ok(expected) => {
                return Self::refuse(format!(
                    "classifier expects {expected} features, vectorizer produces {vocabulary}"
                ));
            }
            Err(err) => return Self::refuse(format!("classifier unusable: {err}")),
        }

        let confidence = if classifier.capabilities().probability {
            ConfidenceMode::Probability
        } else {
            tracing::warn!(
                classifier = classifier.name(),
                fallback_confidence,
                "Classifier exposes no probabilities; reporting fallback confidence"
            );
            ConfidenceMode::Fallback(fallback_confidence)
        };
        tracing::info!(
            classifier = classifier.name(),
            vocabulary,
            "Model artifacts loaded"
        );

        Self {
            state: State::Ready(Box::new(LoadedModel {
                vectorizer,
                classifier,
                confidence,
            })),
        }
    }

    /// A context that refuses every prediction.
    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self {
            state: State::NotReady {
                reason: reason.into(),
            },
        }
    }

    fn refuse(reason: String) -> Self {
        tracing::error!(reason = %reason, "Model artifacts are inconsistent; serving without a model");
        Self::not_ready(reason)
    }

    /// Whether predictions can be served.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    /// Readiness report.
    pub fn health(&self) -> Health {
        Health {
            ready: self.is_ready(),
        }
    }

    /// Why the context is NOT_READY, if it is.
    pub fn not_ready_reason(&self) -> Option<&str> {
        match &self.state {
            State::NotReady { reason } => Some(reason.as_str()),
            State::Ready(_) => None,
        }
    }

    /// Vocabulary size of the loaded vectorizer.
    pub fn vocabulary_size(&self) -> Option<usize> {
        match &self.state {
            State::Ready(model) => model.vectorizer.n_features().ok(),
            State::NotReady { .. } => None,
        }
    }

    /// Model family name of the loaded classifier.
    pub fn classifier_name(&self) -> Option<&str> {
        match &self.state {
            State::Ready(model) => Some(model.classifier.name()),
            State::NotReady { .. } => None,
        }
    }

    /// Cheap pre-inference checks: readiness first, then input length.
    pub fn validate(&self, text: &str) -> Result<(), PredictionError> {
        if !self.is_ready() {
            return Err(PredictionError::NotReady);
        }
        if text.trim().chars().count() < MIN_TEXT_CHARS {
            return Err(PredictionError::InvalidInput);
        }
        Ok(())
    }

    /// Classify one article.
    pub fn predict_request(&self, text: &str) -> Result<Prediction, PredictionError> {
        self.validate(text)?;
        let State::Ready(model) = &self.state else {
            return Err(PredictionError::NotReady);
        };
        model.classify(text).map_err(|err| {
            tracing::error!(error = %err, "Inference failed");
            err
        })
    }
}

impl LoadedModel {
    fn classify(&self, text: &str) -> Result<Prediction, PredictionError> {
        let normalized = text::normalize(text);
        let features = self
            .vectorizer
            .transform_one(&normalized)
            .map_err(|err| PredictionError::Inference(err.to_string()))?;
        let inference = |err: crate::classifier::ClassifierError| {
            PredictionError::Inference(err.to_string())
        };
        let label = self.classifier.predict(&features).map_err(inference)?;

        let (confidence, source) = match self.confidence {
            ConfidenceMode::Probability => {
                let probability = self
                    .classifier
                    .predict_proba(&features)
                    .map_err(inference)?
                    .ok_or_else(|| {
                        PredictionError::Inference(
                            "classifier reported no probability despite advertising one".into(),
                        )
                    })?;
                (probability * 100.0, ConfidenceSource::Probability)
            }
            ConfidenceMode::Fallback(value) => (value, ConfidenceSource::Fallback),
        };

        Ok(Prediction {
            label,
            confidence,
            source,
        })
    }
}

fn load_pair(
    paths: &ArtifactPaths,
) -> Result<(TfidfVectorizer, crate::classifier::LogisticRegression), ArtifactError> {
    let vectorizer = artifacts::load_vectorizer(&paths.vectorizer)?;
    let classifier = artifacts::load_classifier(&paths.model)?;
    classifier.ensure_compatible(&vectorizer, &paths.model)?;
    Ok((vectorizer, classifier.model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Capabilities, ClassifierError, Label};
    use crate::features::{FeatureVector, VectorizerParams};

    /// Fixed-verdict classifier without probabilities.
    struct Verdict {
        n_features: usize,
        label: Label,
    }

    impl Classifier for Verdict {
        fn name(&self) -> &str {
            "verdict"
        }

        fn n_features(&self) -> Result<usize, ClassifierError> {
            Ok(self.n_features)
        }

        fn decision(&self, _x: &FeatureVector) -> Result<f64, ClassifierError> {
            Ok(match self.label {
                Label::Real => 1.0,
                Label::Fake => -1.0,
            })
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities { probability: false }
        }
    }

    fn vectorizer() -> TfidfVectorizer {
        let mut vectorizer = TfidfVectorizer::new(VectorizerParams {
            min_df: 1,
            max_df: 1.0,
            ..VectorizerParams::default()
        });
        vectorizer
            .fit(&["stock market ralli", "alien invas secret"])
            .unwrap();
        vectorizer
    }

    fn ready_context(label: Label) -> ServingContext {
        let vectorizer = vectorizer();
        let n_features = vectorizer.n_features().unwrap();
        ServingContext::from_parts(
            vectorizer,
            Box::new(Verdict { n_features, label }),
            85.0,
        )
    }

    #[test]
    fn not_ready_context_refuses_every_request() {
        let context = ServingContext::not_ready("no artifacts");
        assert!(!context.health().ready);
        assert_eq!(context.not_ready_reason(), Some("no artifacts"));
        assert_eq!(
            context.predict_request("A perfectly long article body").unwrap_err(),
            PredictionError::NotReady
        );
        assert_eq!(context.predict_request("").unwrap_err(), PredictionError::NotReady);
    }

    #[test]
    fn short_text_is_rejected_before_inference() {
        let context = ready_context(Label::Real);
        for text in ["", "short", "   nine char  ", "123456789"] {
            assert_eq!(
                context.predict_request(text).unwrap_err(),
                PredictionError::InvalidInput,
                "{text:?}"
            );
        }
        assert!(context.predict_request("0123456789").is_ok());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let context = ready_context(Label::Real);
        assert_eq!(
            context.predict_request("ééééééééé").unwrap_err(),
            PredictionError::InvalidInput
        );
    }

    #[test]
    fn fallback_confidence_applies_without_probabilities() {
        let context = ready_context(Label::Fake);
        let prediction = context
            .predict_request("Aliens have secretly invaded the stock market")
            .unwrap();
        assert_eq!(prediction.label, Label::Fake);
        assert_eq!(prediction.confidence, 85.0);
        assert_eq!(prediction.source, ConfidenceSource::Fallback);
    }

    #[test]
    fn text_without_known_terms_still_predicts() {
        let context = ready_context(Label::Real);
        let prediction = context.predict_request("!!!!!!!!!!!!!!").unwrap();
        assert_eq!(prediction.label, Label::Real);
    }

    #[test]
    fn mismatched_dimensions_leave_context_not_ready() {
        let context = ServingContext::from_parts(
            vectorizer(),
            Box::new(Verdict {
                n_features: 3,
                label: Label::Real,
            }),
            85.0,
        );
        assert!(!context.is_ready());
        assert!(context.not_ready_reason().unwrap().contains("features"));
    }

    #[test]
    fn unfitted_vectorizer_leaves_context_not_ready() {
        let context = ServingContext::from_parts(
            TfidfVectorizer::default(),
            Box::new(Verdict {
                n_features: 3,
                label: Label::Real,
            }),
            85.0,
        );
        assert!(!context.is_ready());
    }

    #[test]
    fn missing_artifacts_leave_context_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let context = ServingContext::load(
            &ArtifactPaths {
                model: dir.path().join("model.bin"),
                vectorizer: dir.path().join("vectorizer.bin"),
            },
            85.0,
        );
        assert!(!context.is_ready());
        assert!(context.not_ready_reason().unwrap().contains("not found"));
    }
}
