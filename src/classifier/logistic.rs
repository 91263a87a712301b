//! L2-regularized binary logistic regression.
//!
//! Minimizes the sample-averaged objective
//!
//! ```text
//! J(w, b) = (1/n) Σ log(1 + exp(-s_i (w·x_i + b))) + ‖w‖² / (2 C n)
//! ```
//!
//! which has the same minimizer as `½‖w‖² + C Σ logloss`. The intercept is not penalized.

use super::{Capabilities, Classifier, ClassifierError, Label};
use crate::features::{FeatureMatrix, FeatureVector};
use ndarray::{Array1, s};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

const LBFGS_HISTORY: usize = 10;
const ARMIJO_C1: f64 = 1e-4;
const MIN_STEP: f64 = 1e-12;

/// Optimization routine used by [`LogisticRegression::fit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Solver {
    /// Limited-memory BFGS with Armijo backtracking.
    Lbfgs,
    /// Full-batch gradient descent with a fixed `1/L` step.
    GradientDescent,
}

impl Solver {
    /// Stable identifier used in logs and training reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lbfgs => "lbfgs",
            Self::GradientDescent => "gradient-descent",
        }
    }
}

impl fmt::Display for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hyperparameters for logistic regression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Inverse regularization strength; larger values fit the training data more closely.
    pub c: f64,
    /// Optimization routine.
    pub solver: Solver,
    /// Iteration cap.
    pub max_iter: usize,
    /// Convergence threshold on the gradient's max-norm.
    pub tol: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            solver: Solver::Lbfgs,
            max_iter: 1000,
            tol: 1e-4,
        }
    }
}

/// Diagnostics from a completed fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    /// Iterations performed.
    pub iterations: usize,
    /// Whether the gradient tolerance was reached before `max_iter`.
    pub converged: bool,
    /// Objective value at the returned weights.
    pub final_loss: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedWeights {
    weights: Array1<f64>,
    intercept: f64,
    summary: FitSummary,
}

/// Logistic regression classifier with an explicit unfitted state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    params: LogisticParams,
    fitted: Option<FittedWeights>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(LogisticParams::default())
    }
}

impl LogisticRegression {
    /// Create an unfitted model.
    pub fn new(params: LogisticParams) -> Self {
        Self {
            params,
            fitted: None,
        }
    }

    /// Hyperparameters of this model.
    pub fn params(&self) -> &LogisticParams {
        &self.params
    }

    /// Whether weights have been learned.
    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Learned coefficient vector.
    pub fn weights(&self) -> Result<&Array1<f64>, ClassifierError> {
        self.fitted
            .as_ref()
            .map(|fitted| &fitted.weights)
            .ok_or(ClassifierError::NotFitted)
    }

    /// Learned intercept.
    pub fn intercept(&self) -> Result<f64, ClassifierError> {
        self.fitted
            .as_ref()
            .map(|fitted| fitted.intercept)
            .ok_or(ClassifierError::NotFitted)
    }

    /// Diagnostics from the last fit.
    pub fn fit_summary(&self) -> Option<FitSummary> {
        self.fitted.as_ref().map(|fitted| fitted.summary)
    }

    /// Fit weights on `x` and `y`, replacing any previous fit.
    pub fn fit(&mut self, x: &FeatureMatrix, y: &[Label]) -> Result<FitSummary, ClassifierError> {
        if x.len() != y.len() {
            return Err(ClassifierError::LengthMismatch {
                features: x.len(),
                labels: y.len(),
            });
        }
        if x.is_empty() {
            return Err(ClassifierError::EmptyTrainingSet);
        }
        if y.iter().all(|label| *label == y[0]) {
            return Err(ClassifierError::SingleClass);
        }
        if !(self.params.c.is_finite() && self.params.c > 0.0) {
            return Err(ClassifierError::InvalidParameter(format!(
                "C must be positive, got {}",
                self.params.c
            )));
        }
        if !(self.params.tol.is_finite() && self.params.tol > 0.0) {
            return Err(ClassifierError::InvalidParameter(format!(
                "tol must be positive, got {}",
                self.params.tol
            )));
        }

        let objective = Objective::new(x, y, self.params.c);
        let (theta, summary) = match self.params.solver {
            Solver::Lbfgs => minimize_lbfgs(&objective, self.params.max_iter, self.params.tol),
            Solver::GradientDescent => {
                minimize_gradient_descent(&objective, self.params.max_iter, self.params.tol)
            }
        };

        if !summary.converged {
            tracing::warn!(
                solver = %self.params.solver,
                c = self.params.c,
                iterations = summary.iterations,
                "Logistic regression did not converge; consider raising max_iter"
            );
        }

        let d = x.n_features();
        self.fitted = Some(FittedWeights {
            weights: theta.slice(s![..d]).to_owned(),
            intercept: theta[d],
            summary,
        });
        Ok(summary)
    }

    /// Positive-class probability for one row.
    pub fn probability_real(&self, x: &FeatureVector) -> Result<f64, ClassifierError> {
        self.decision(x).map(sigmoid)
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &str {
        "logistic-regression"
    }

    fn n_features(&self) -> Result<usize, ClassifierError> {
        self.weights().map(|weights| weights.len())
    }

    fn decision(&self, x: &FeatureVector) -> Result<f64, ClassifierError> {
        let fitted = self.fitted.as_ref().ok_or(ClassifierError::NotFitted)?;
        if x.min_dimension() > fitted.weights.len() {
            return Err(ClassifierError::DimensionMismatch {
                expected: fitted.weights.len(),
                actual: x.min_dimension(),
            });
        }
        Ok(x.dot(&fitted.weights) + fitted.intercept)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { probability: true }
    }

    fn predict_proba(&self, x: &FeatureVector) -> Result<Option<f64>, ClassifierError> {
        let p = self.probability_real(x)?;
        Ok(Some(p.max(1.0 - p)))
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `log(1 + exp(z)) - y z`, computed without overflow.
fn log_loss(z: f64, y: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p() - y * z
}

/// Averaged regularized log-loss over a fixed training matrix.
///
/// Parameters are packed as `θ = [w_0, …, w_{d-1}, b]`.
struct Objective<'a> {
    x: &'a FeatureMatrix,
    targets: Vec<f64>,
    lambda: f64,
}

impl<'a> Objective<'a> {
    fn new(x: &'a FeatureMatrix, y: &[Label], c: f64) -> Self {
        Self {
            x,
            targets: y.iter().map(|label| label.target()).collect(),
            lambda: 1.0 / (c * x.len() as f64),
        }
    }

    fn dimension(&self) -> usize {
        self.x.n_features() + 1
    }

    fn evaluate(&self, theta: &Array1<f64>) -> (f64, Array1<f64>) {
        let d = self.x.n_features();
        let n = self.x.len() as f64;
        let mut gradient = Array1::<f64>::zeros(d + 1);
        let mut loss = 0.0;

        for (row, &y) in self.x.rows().iter().zip(&self.targets) {
            let z = row.dot(theta) + theta[d];
            loss += log_loss(z, y);
            let residual = sigmoid(z) - y;
            for (index, value) in row.iter() {
                gradient[index] += residual * value;
            }
            gradient[d] += residual;
        }

        loss /= n;
        gradient /= n;

        let weights = theta.slice(s![..d]);
        loss += 0.5 * self.lambda * weights.dot(&weights);
        gradient
            .slice_mut(s![..d])
            .scaled_add(self.lambda, &weights);

        (loss, gradient)
    }

    /// Upper bound on the gradient's Lipschitz constant.
    fn lipschitz(&self) -> f64 {
        let max_row = self
            .x
            .rows()
            .iter()
            .map(|row| row.norm_squared() + 1.0)
            .fold(0.0, f64::max);
        0.25 * max_row + self.lambda
    }
}

fn max_abs(values: &Array1<f64>) -> f64 {
    values.iter().fold(0.0, |acc, value| acc.max(value.abs()))
}

fn minimize_gradient_descent(
    objective: &Objective<'_>,
    max_iter: usize,
    tol: f64,
) -> (Array1<f64>, FitSummary) {
    let step = 1.0 / objective.lipschitz();
    let mut theta = Array1::<f64>::zeros(objective.dimension());
    let (mut loss, mut gradient) = objective.evaluate(&theta);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iter {
        if max_abs(&gradient) < tol {
            converged = true;
            break;
        }
        theta.scaled_add(-step, &gradient);
        (loss, gradient) = objective.evaluate(&theta);
        iterations += 1;
    }
    converged |= max_abs(&gradient) < tol;

    (
        theta,
        FitSummary {
            iterations,
            converged,
            final_loss: loss,
        },
    )
}

fn minimize_lbfgs(
    objective: &Objective<'_>,
    max_iter: usize,
    tol: f64,
) -> (Array1<f64>, FitSummary) {
    let mut theta = Array1::<f64>::zeros(objective.dimension());
    let (mut loss, mut gradient) = objective.evaluate(&theta);
    // (s, y, 1 / s·y) pairs, oldest first.
    let mut history: VecDeque<(Array1<f64>, Array1<f64>, f64)> = VecDeque::new();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iter {
        if max_abs(&gradient) < tol {
            converged = true;
            break;
        }

        let mut direction = two_loop_direction(&gradient, &history);
        let mut slope = gradient.dot(&direction);
        if slope >= 0.0 {
            history.clear();
            direction = gradient.mapv(|g| -g);
            slope = -gradient.dot(&gradient);
        }

        let mut step = 1.0;
        let accepted = loop {
            let mut candidate = theta.clone();
            candidate.scaled_add(step, &direction);
            let (candidate_loss, candidate_gradient) = objective.evaluate(&candidate);
            if candidate_loss <= loss + ARMIJO_C1 * step * slope {
                break Some((candidate, candidate_loss, candidate_gradient));
            }
            step *= 0.5;
            if step < MIN_STEP {
                break None;
            }
        };
        iterations += 1;

        let Some((candidate, candidate_loss, candidate_gradient)) = accepted else {
            tracing::debug!(iterations, loss, "L-BFGS line search stalled");
            break;
        };

        let s_k = &candidate - &theta;
        let y_k = &candidate_gradient - &gradient;
        let curvature = s_k.dot(&y_k);
        if curvature > 1e-10 {
            history.push_back((s_k, y_k, 1.0 / curvature));
            if history.len() > LBFGS_HISTORY {
                history.pop_front();
            }
        }

        theta = candidate;
        loss = candidate_loss;
        gradient = candidate_gradient;
    }
    converged |= max_abs(&gradient) < tol;

    (
        theta,
        FitSummary {
            iterations,
            converged,
            final_loss: loss,
        },
    )
}

/// Approximate `-H⁻¹ g` from the stored curvature pairs.
fn two_loop_direction(
    gradient: &Array1<f64>,
    history: &VecDeque<(Array1<f64>, Array1<f64>, f64)>,
) -> Array1<f64> {
    let mut q = gradient.clone();
    let mut alphas = Vec::with_capacity(history.len());
    for (s_k, y_k, rho) in history.iter().rev() {
        let alpha = rho * s_k.dot(&q);
        q.scaled_add(-alpha, y_k);
        alphas.push(alpha);
    }

    let gamma = match history.back() {
        Some((s_k, y_k, _)) => s_k.dot(y_k) / y_k.dot(y_k),
        None => {
            let norm = gradient.dot(gradient).sqrt();
            if norm > 0.0 { 1.0 / norm } else { 1.0 }
        }
    };
    let mut r = q * gamma;

    for ((s_k, y_k, rho), alpha) in history.iter().zip(alphas.iter().rev()) {
        let beta = rho * y_k.dot(&r);
        r.scaled_add(alpha - beta, s_k);
    }

    r.mapv_into(|value| -value)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Column 0 marks real articles, column 1 marks fake ones, column 2 is shared noise.
    fn toy_problem() -> (FeatureMatrix, Vec<Label>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            let noise = 0.1 * f64::from(i % 3);
            if i % 2 == 0 {
                rows.push(FeatureVector::from_pairs([(0, 0.9), (2, noise)]));
                labels.push(Label::Real);
            } else {
                rows.push(FeatureVector::from_pairs([(1, 0.9), (2, noise)]));
                labels.push(Label::Fake);
            }
        }
        (FeatureMatrix::new(rows, 3), labels)
    }

    fn fitted(solver: Solver) -> LogisticRegression {
        let (x, y) = toy_problem();
        let mut model = LogisticRegression::new(LogisticParams {
            c: 10.0,
            solver,
            ..LogisticParams::default()
        });
        model.fit(&x, &y).expect("fit succeeds");
        model
    }

    #[test]
    fn both_solvers_separate_the_toy_problem() {
        let (x, y) = toy_problem();
        for solver in [Solver::Lbfgs, Solver::GradientDescent] {
            let model = fitted(solver);
            assert_eq!(model.predict_batch(&x).unwrap(), y, "solver {solver}");
        }
    }

    #[test]
    fn lbfgs_converges_and_agrees_with_gradient_descent_direction() {
        let lbfgs = fitted(Solver::Lbfgs);
        let summary = lbfgs.fit_summary().unwrap();
        assert!(summary.converged);
        assert!(summary.iterations < 1000);

        let weights = lbfgs.weights().unwrap();
        assert!(weights[0] > 0.0);
        assert!(weights[1] < 0.0);

        let gd = fitted(Solver::GradientDescent);
        assert!(gd.weights().unwrap()[0] > 0.0);
        assert!(gd.fit_summary().unwrap().final_loss >= summary.final_loss - 1e-4);
    }

    #[test]
    fn probability_is_for_the_predicted_class() {
        let model = fitted(Solver::Lbfgs);
        let fake_row = FeatureVector::from_pairs([(1, 0.9)]);
        assert_eq!(model.predict(&fake_row).unwrap(), Label::Fake);
        let confidence = model.predict_proba(&fake_row).unwrap().unwrap();
        assert!(confidence > 0.5 && confidence <= 1.0);
        assert!(model.capabilities().probability);
    }

    #[test]
    fn unfitted_model_refuses_to_predict() {
        let model = LogisticRegression::default();
        let row = FeatureVector::from_pairs([(0, 1.0)]);
        assert_eq!(model.predict(&row).unwrap_err(), ClassifierError::NotFitted);
        assert_eq!(model.n_features().unwrap_err(), ClassifierError::NotFitted);
    }

    #[test]
    fn rejects_degenerate_training_sets() {
        let (x, y) = toy_problem();
        let mut model = LogisticRegression::default();
        assert_eq!(
            model.fit(&x, &y[..3]).unwrap_err(),
            ClassifierError::LengthMismatch {
                features: 20,
                labels: 3
            }
        );
        let single = vec![Label::Real; x.len()];
        assert_eq!(model.fit(&x, &single).unwrap_err(), ClassifierError::SingleClass);

        let mut negative = LogisticRegression::new(LogisticParams {
            c: -1.0,
            ..LogisticParams::default()
        });
        assert!(matches!(
            negative.fit(&x, &y),
            Err(ClassifierError::InvalidParameter(_))
        ));
    }

    #[test]
    fn oversized_rows_are_a_dimension_mismatch() {
        let model = fitted(Solver::Lbfgs);
        let row = FeatureVector::from_pairs([(7, 1.0)]);
        assert_eq!(
            model.decision(&row).unwrap_err(),
            ClassifierError::DimensionMismatch {
                expected: 3,
                actual: 8
            }
        );
    }

    #[test]
    fn log_loss_is_stable_for_large_margins() {
        assert!(log_loss(800.0, 1.0).abs() < 1e-12);
        assert!((log_loss(-800.0, 1.0) - 800.0).abs() < 1e-9);
        assert!((sigmoid(0.0) - 0.5).abs() < f64::EPSILON);
    }
}
