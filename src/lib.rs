#![deny(missing_docs)]

//! Core library for Rusty News, a TF-IDF + logistic regression fake news classifier.

/// HTTP routing, the HTML form, and the JSON API.
pub mod api;
/// Versioned artifact files for the trained vectorizer and classifier.
pub mod artifacts;
/// Classifier trait, labels, logistic regression, and grid search.
pub mod classifier;
/// Environment-driven configuration management.
pub mod config;
/// Labeled CSV corpus loading.
pub mod dataset;
/// Accuracy, confusion matrix, and classification report.
pub mod evaluation;
/// TF-IDF vectorizer and sparse feature vectors.
pub mod features;
/// Structured logging and tracing setup.
pub mod logging;
/// Prediction metrics helpers.
pub mod metrics;
/// Loaded model state and the prediction service.
pub mod serving;
/// Text normalization shared by training and serving.
pub mod text;
/// End-to-end training pipeline.
pub mod training;
