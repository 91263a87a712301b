//! Exhaustive hyperparameter search with stratified k-fold cross-validation.

use super::{Classifier, ClassifierError, Label, LogisticParams, LogisticRegression, Solver};
use crate::evaluation::accuracy;
use crate::features::FeatureMatrix;
use rayon::prelude::*;
use serde::Serialize;

/// Cross-validated score of one hyperparameter combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore {
    /// Candidate hyperparameters.
    pub params: LogisticParams,
    /// Accuracy on each held-out fold, in fold order.
    pub fold_accuracies: Vec<f64>,
    /// Mean of `fold_accuracies`.
    pub mean_accuracy: f64,
}

/// Result of [`GridSearch::fit`]: the refitted winner plus every candidate's score.
#[derive(Debug, Clone)]
pub struct GridSearchOutcome {
    /// Best candidate refitted on the full training set.
    pub best_model: LogisticRegression,
    /// Winning hyperparameters.
    pub best_params: LogisticParams,
    /// Winning mean cross-validated accuracy.
    pub best_score: f64,
    /// All candidates in grid order.
    pub candidates: Vec<CandidateScore>,
}

/// Grid over inverse regularization strength and solver.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSearch {
    /// Candidate `C` values, searched in order.
    pub c_values: Vec<f64>,
    /// Candidate solvers, searched in order within each `C`.
    pub solvers: Vec<Solver>,
    /// Number of stratified folds.
    pub folds: usize,
    /// Iteration cap passed to every candidate.
    pub max_iter: usize,
    /// Gradient tolerance passed to every candidate.
    pub tol: f64,
}

impl Default for GridSearch {
    fn default() -> Self {
        let base = LogisticParams::default();
        Self {
            c_values: vec![0.1, 1.0, 10.0],
            solvers: vec![Solver::Lbfgs, Solver::GradientDescent],
            folds: 3,
            max_iter: base.max_iter,
            tol: base.tol,
        }
    }
}

impl GridSearch {
    /// Every combination in search order: `C` outer, solver inner.
    pub fn candidates(&self) -> Vec<LogisticParams> {
        self.c_values
            .iter()
            .flat_map(|&c| {
                self.solvers.iter().map(move |&solver| LogisticParams {
                    c,
                    solver,
                    max_iter: self.max_iter,
                    tol: self.tol,
                })
            })
            .collect()
    }

    /// Score every candidate by mean fold accuracy, then refit the best on all of `x`.
    ///
    /// Candidates are evaluated in parallel. Ties go to the earliest candidate in grid order.
    pub fn fit(&self, x: &FeatureMatrix, y: &[Label]) -> Result<GridSearchOutcome, ClassifierError> {
        if x.len() != y.len() {
            return Err(ClassifierError::LengthMismatch {
                features: x.len(),
                labels: y.len(),
            });
        }
        let candidates = self.candidates();
        if candidates.is_empty() {
            return Err(ClassifierError::InvalidParameter(
                "grid search needs at least one C value and one solver".to_string(),
            ));
        }
        let folds = stratified_folds(y, self.folds)?;
        let splits: Vec<(Vec<usize>, Vec<usize>)> = folds
            .iter()
            .map(|test| (complement(test, y.len()), test.clone()))
            .collect();

        let scores = candidates
            .par_iter()
            .map(|params| score_candidate(*params, x, y, &splits))
            .collect::<Result<Vec<_>, _>>()?;

        let mut best = 0;
        for (index, score) in scores.iter().enumerate() {
            tracing::debug!(
                c = score.params.c,
                solver = %score.params.solver,
                mean_accuracy = score.mean_accuracy,
                "Grid search candidate scored"
            );
            if score.mean_accuracy > scores[best].mean_accuracy {
                best = index;
            }
        }

        let best_params = scores[best].params;
        let best_score = scores[best].mean_accuracy;
        let mut best_model = LogisticRegression::new(best_params);
        best_model.fit(x, y)?;

        Ok(GridSearchOutcome {
            best_model,
            best_params,
            best_score,
            candidates: scores,
        })
    }
}

fn score_candidate(
    params: LogisticParams,
    x: &FeatureMatrix,
    y: &[Label],
    splits: &[(Vec<usize>, Vec<usize>)],
) -> Result<CandidateScore, ClassifierError> {
    let mut fold_accuracies = Vec::with_capacity(splits.len());
    for (train, test) in splits {
        let train_y: Vec<Label> = train.iter().map(|&i| y[i]).collect();
        let test_y: Vec<Label> = test.iter().map(|&i| y[i]).collect();

        let mut model = LogisticRegression::new(params);
        model.fit(&x.select(train), &train_y)?;
        let predicted = model.predict_batch(&x.select(test))?;
        fold_accuracies.push(accuracy(&test_y, &predicted));
    }
    let mean_accuracy = fold_accuracies.iter().sum::<f64>() / fold_accuracies.len() as f64;
    Ok(CandidateScore {
        params,
        fold_accuracies,
        mean_accuracy,
    })
}

fn complement(test: &[usize], n: usize) -> Vec<usize> {
    let mut held_out = vec![false; n];
    for &i in test {
        held_out[i] = true;
    }
    (0..n).filter(|&i| !held_out[i]).collect()
}

/// Assign sample indices to `k` folds so each fold keeps the overall class ratio.
///
/// Within each class, samples are dealt to folds round-robin in index order. Each returned
/// fold lists its held-out indices in ascending order. Fails when `k < 2` or when a class has
/// fewer than `k` members.
pub fn stratified_folds(labels: &[Label], k: usize) -> Result<Vec<Vec<usize>>, ClassifierError> {
    if k < 2 {
        return Err(ClassifierError::InvalidParameter(format!(
            "cross-validation needs at least 2 folds, got {k}"
        )));
    }
    let mut folds = vec![Vec::new(); k];
    for class in [Label::Fake, Label::Real] {
        let members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, label)| **label == class)
            .map(|(index, _)| index)
            .collect();
        if members.len() < k {
            return Err(ClassifierError::InvalidParameter(format!(
                "{k} folds need at least {k} samples of every class; {class} has {}",
                members.len()
            )));
        }
        for (rank, index) in members.into_iter().enumerate() {
            folds[rank % k].push(index);
        }
    }
    for fold in &mut folds {
        fold.sort_unstable();
    }
    Ok(folds)
}
