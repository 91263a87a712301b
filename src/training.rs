//! Offline training pipeline: corpus → normalized documents → TF-IDF → grid-searched logistic
//! regression → evaluation → artifacts.

use crate::artifacts::{self, ArtifactError, ClassifierArtifact};
use crate::classifier::{
    CandidateScore, Classifier, ClassifierError, GridSearch, Label, LogisticParams,
};
use crate::dataset::{Dataset, DatasetError};
use crate::evaluation::{ClassificationReport, accuracy};
use crate::features::{TfidfVectorizer, VectorizerError, VectorizerParams};
use crate::text;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Stage count reported in the progress logs.
pub const STAGES: usize = 7;

/// Errors that abort a training run.
#[derive(Debug, Error)]
pub enum TrainingError {
    /// The corpus could not be read.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    /// Vocabulary construction failed.
    #[error("vectorization failed: {0}")]
    Vectorizer(#[from] VectorizerError),
    /// Model fitting failed.
    #[error("model fitting failed: {0}")]
    Classifier(#[from] ClassifierError),
    /// Artifacts could not be written.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    /// The train/test split is impossible for this corpus.
    #[error("invalid train/test split: {0}")]
    InvalidSplit(String),
}

/// Inputs and knobs for a training run.
#[derive(Debug, Clone)]
pub struct TrainingOptions {
    /// Labeled CSV corpus.
    pub dataset_path: PathBuf,
    /// Output path for the classifier artifact.
    pub model_path: PathBuf,
    /// Output path for the vectorizer artifact.
    pub vectorizer_path: PathBuf,
    /// Append the article body to `author + " " + title`.
    pub include_body: bool,
    /// Fraction of each class held out for evaluation.
    pub test_size: f64,
    /// Seed for the train/test shuffle.
    pub seed: u64,
    /// Vectorizer hyperparameters.
    pub vectorizer: VectorizerParams,
    /// Classifier hyperparameter grid.
    pub grid: GridSearch,
}

impl TrainingOptions {
    /// Default knobs for the given paths.
    pub fn new(dataset_path: PathBuf, model_path: PathBuf, vectorizer_path: PathBuf) -> Self {
        Self {
            dataset_path,
            model_path,
            vectorizer_path,
            include_body: false,
            test_size: 0.2,
            seed: 42,
            vectorizer: VectorizerParams::default(),
            grid: GridSearch::default(),
        }
    }
}

/// Summary of a completed training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    /// Usable articles in the corpus.
    pub n_articles: usize,
    /// Rows skipped for an unusable label.
    pub skipped_rows: usize,
    /// `(fake, real)` article counts.
    pub class_counts: (usize, usize),
    /// Vocabulary size.
    pub n_features: usize,
    /// Training rows after the split.
    pub train_size: usize,
    /// Held-out rows after the split.
    pub test_size: usize,
    /// Winning hyperparameters.
    pub best_params: LogisticParams,
    /// Winning mean cross-validated accuracy.
    pub best_cv_score: f64,
    /// Every grid candidate's score.
    pub candidates: Vec<CandidateScore>,
    /// Accuracy of the final model on its own training rows.
    pub train_accuracy: f64,
    /// Held-out evaluation.
    pub test_report: ClassificationReport,
}

/// In-memory result of fitting, before anything is written.
#[derive(Debug, Clone)]
pub struct TrainedModels {
    /// Fitted vectorizer.
    pub vectorizer: TfidfVectorizer,
    /// Fitted classifier bound to `vectorizer`.
    pub classifier: ClassifierArtifact,
    /// Run summary.
    pub report: TrainingReport,
}

/// Run every stage and write both artifacts.
pub fn run(options: &TrainingOptions) -> Result<TrainingReport, TrainingError> {
    stage(1, "Loading dataset");
    let dataset = Dataset::load(&options.dataset_path)?;
    tracing::info!(
        path = %options.dataset_path.display(),
        articles = dataset.len(),
        skipped = dataset.skipped(),
        "Dataset loaded"
    );

    let trained = fit(&dataset, options)?;

    stage(7, "Saving model and vectorizer");
    artifacts::save_classifier(&options.model_path, &trained.classifier)?;
    tracing::info!(path = %options.model_path.display(), "Model saved");
    artifacts::save_vectorizer(&options.vectorizer_path, &trained.vectorizer)?;
    tracing::info!(path = %options.vectorizer_path.display(), "Vectorizer saved");

    Ok(trained.report)
}

/// Stages 2 through 6: preprocess, vectorize, split, search, evaluate.
pub fn fit(dataset: &Dataset, options: &TrainingOptions) -> Result<TrainedModels, TrainingError> {
    stage(2, "Preprocessing data");
    let documents: Vec<String> = dataset
        .contents(options.include_body)
        .par_iter()
        .map(|content| text::normalize(content))
        .collect();
    let labels = dataset.labels();
    let class_counts = dataset.class_counts();
    tracing::info!(
        fake = class_counts.0,
        real = class_counts.1,
        include_body = options.include_body,
        "Preprocessing complete"
    );

    stage(3, "Creating TF-IDF features");
    let mut vectorizer = TfidfVectorizer::new(options.vectorizer.clone());
    let features = vectorizer.fit_transform(&documents)?;
    let n_features = features.n_features();
    tracing::info!(features = n_features, "TF-IDF vectorization complete");

    stage(4, "Splitting data");
    let (train_indices, test_indices) =
        stratified_split(&labels, options.test_size, options.seed)?;
    let pick = |indices: &[usize]| indices.iter().map(|&i| labels[i]).collect::<Vec<Label>>();
    let (train_x, train_y) = (features.select(&train_indices), pick(&train_indices));
    let (test_x, test_y) = (features.select(&test_indices), pick(&test_indices));
    tracing::info!(
        train = train_indices.len(),
        test = test_indices.len(),
        "Split complete"
    );

    stage(5, "Training logistic regression with grid search");
    let outcome = options.grid.fit(&train_x, &train_y)?;
    let train_accuracy = accuracy(&train_y, &outcome.best_model.predict_batch(&train_x)?);
    tracing::info!(
        c = outcome.best_params.c,
        solver = %outcome.best_params.solver,
        best_cv_score = outcome.best_score,
        train_accuracy,
        "Grid search complete"
    );

    stage(6, "Evaluating model");
    let predicted = outcome.best_model.predict_batch(&test_x)?;
    let test_report = ClassificationReport::from_labels(&test_y, &predicted);
    tracing::info!(test_accuracy = test_report.accuracy, "Evaluation complete");

    let classifier = ClassifierArtifact::new(outcome.best_model, &vectorizer)?;
    let report = TrainingReport {
        n_articles: dataset.len(),
        skipped_rows: dataset.skipped(),
        class_counts,
        n_features,
        train_size: train_indices.len(),
        test_size: test_indices.len(),
        best_params: outcome.best_params,
        best_cv_score: outcome.best_score,
        candidates: outcome.candidates,
        train_accuracy,
        test_report,
    };

    Ok(TrainedModels {
        vectorizer,
        classifier,
        report,
    })
}

fn stage(index: usize, description: &str) {
    tracing::info!("[{index}/{STAGES}] {description}");
}

/// Split indices into `(train, test)`, holding out `round(test_size · n_class)` of each class.
///
/// Each class is shuffled independently with a generator seeded from `seed`, so the split is
/// reproducible. Both returned lists are sorted ascending.
pub fn stratified_split(
    labels: &[Label],
    test_size: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), TrainingError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(TrainingError::InvalidSplit(format!(
            "test_size must be within (0, 1), got {test_size}"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();
    for class in [Label::Fake, Label::Real] {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, label)| **label == class)
            .map(|(index, _)| index)
            .collect();
        members.shuffle(&mut rng);
        let held_out = (test_size * members.len() as f64).round() as usize;
        test.extend_from_slice(&members[..held_out]);
        train.extend_from_slice(&members[held_out..]);
    }

    if train.is_empty() || test.is_empty() {
        return Err(TrainingError::InvalidSplit(format!(
            "{} articles are too few to hold out {test_size}",
            labels.len()
        )));
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use Label::{Fake, Real};

    #[test]
    fn split_is_stratified_disjoint_and_reproducible() {
        let labels: Vec<Label> = (0..50).map(|i| if i % 5 == 0 { Fake } else { Real }).collect();
        let (train, test) = stratified_split(&labels, 0.2, 42).unwrap();

        assert_eq!(train.len() + test.len(), labels.len());
        assert!(train.iter().all(|i| !test.contains(i)));
        assert_eq!(test.iter().filter(|&&i| labels[i] == Fake).count(), 2);
        assert_eq!(test.iter().filter(|&&i| labels[i] == Real).count(), 8);

        assert_eq!(stratified_split(&labels, 0.2, 42).unwrap(), (train, test));
    }

    #[test]
    fn split_rejects_out_of_range_fractions() {
        let labels = vec![Real, Fake, Real, Fake];
        assert!(matches!(
            stratified_split(&labels, 0.0, 42),
            Err(TrainingError::InvalidSplit(_))
        ));
        assert!(stratified_split(&labels, 1.0, 42).is_err());
    }

    #[test]
    fn split_rejects_corpora_too_small_to_hold_out() {
        let labels = vec![Real, Fake];
        assert!(matches!(
            stratified_split(&labels, 0.2, 42),
            Err(TrainingError::InvalidSplit(_))
        ));
    }
}
