//! Held-out evaluation: accuracy, confusion matrix, and a per-class report.

use crate::classifier::Label;
use serde::Serialize;
use std::fmt;

/// Fraction of positions where `predicted` matches `expected`. Empty input scores zero.
pub fn accuracy(expected: &[Label], predicted: &[Label]) -> f64 {
    debug_assert_eq!(expected.len(), predicted.len());
    if expected.is_empty() {
        return 0.0;
    }
    let correct = expected
        .iter()
        .zip(predicted)
        .filter(|(truth, guess)| truth == guess)
        .count();
    correct as f64 / expected.len() as f64
}

/// 2×2 confusion counts with [`Label::Real`] as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    /// Real articles predicted real.
    pub true_positive: usize,
    /// Fake articles predicted real.
    pub false_positive: usize,
    /// Fake articles predicted fake.
    pub true_negative: usize,
    /// Real articles predicted fake.
    pub false_negative: usize,
}

impl ConfusionMatrix {
    /// Tally paired labels.
    pub fn from_labels(expected: &[Label], predicted: &[Label]) -> Self {
        let mut matrix = Self::default();
        for (truth, guess) in expected.iter().zip(predicted) {
            match (truth, guess) {
                (Label::Real, Label::Real) => matrix.true_positive += 1,
                (Label::Fake, Label::Real) => matrix.false_positive += 1,
                (Label::Fake, Label::Fake) => matrix.true_negative += 1,
                (Label::Real, Label::Fake) => matrix.false_negative += 1,
            }
        }
        matrix
    }

    /// Total number of tallied samples.
    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    fn stats_for(&self, label: Label) -> ClassStats {
        let (tp, fp, fn_) = match label {
            Label::Real => (self.true_positive, self.false_positive, self.false_negative),
            Label::Fake => (self.true_negative, self.false_negative, self.false_positive),
        };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        ClassStats {
            label,
            precision,
            recall,
            f1,
            support: tp + fn_,
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Precision, recall, and F1 for one class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassStats {
    /// Class the figures describe.
    pub label: Label,
    /// Share of predictions for this class that were correct.
    pub precision: f64,
    /// Share of this class's samples that were found.
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
    /// Number of true samples of this class.
    pub support: usize,
}

/// Averaged precision, recall, and F1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AveragedStats {
    /// Averaged precision.
    pub precision: f64,
    /// Averaged recall.
    pub recall: f64,
    /// Averaged F1.
    pub f1: f64,
    /// Total support.
    pub support: usize,
}

/// Per-class metrics plus macro and support-weighted averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    /// Overall accuracy.
    pub accuracy: f64,
    /// Confusion counts the report was derived from.
    pub confusion: ConfusionMatrix,
    /// Figures for fake (first) and real (second).
    pub classes: [ClassStats; 2],
    /// Unweighted mean over classes.
    pub macro_avg: AveragedStats,
    /// Support-weighted mean over classes.
    pub weighted_avg: AveragedStats,
}

impl ClassificationReport {
    /// Build a report from paired labels.
    pub fn from_labels(expected: &[Label], predicted: &[Label]) -> Self {
        let confusion = ConfusionMatrix::from_labels(expected, predicted);
        let classes = [
            confusion.stats_for(Label::Fake),
            confusion.stats_for(Label::Real),
        ];
        let support = confusion.total();

        let macro_avg = AveragedStats {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / 2.0,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / 2.0,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / 2.0,
            support,
        };
        let weighted = |metric: fn(&ClassStats) -> f64| {
            if support == 0 {
                0.0
            } else {
                classes
                    .iter()
                    .map(|c| metric(c) * c.support as f64)
                    .sum::<f64>()
                    / support as f64
            }
        };
        let weighted_avg = AveragedStats {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
            support,
        };

        Self {
            accuracy: accuracy(expected, predicted),
            confusion,
            classes,
            macro_avg,
            weighted_avg,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for class in &self.classes {
            writeln!(
                f,
                "{:>14} {:>9.4} {:>9.4} {:>9.4} {:>9}",
                class.label.display_name(),
                class.precision,
                class.recall,
                class.f1,
                class.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9.4} {:>9}",
            "accuracy", "", "", self.accuracy, self.confusion.total()
        )?;
        for (name, avg) in [
            ("macro avg", &self.macro_avg),
            ("weighted avg", &self.weighted_avg),
        ] {
            writeln!(
                f,
                "{:>14} {:>9.4} {:>9.4} {:>9.4} {:>9}",
                name, avg.precision, avg.recall, avg.f1, avg.support
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Label::{Fake, Real};

    #[test]
    fn accuracy_counts_matches() {
        assert_eq!(accuracy(&[Real, Fake, Real, Fake], &[Real, Fake, Fake, Fake]), 0.75);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn confusion_matrix_uses_real_as_positive() {
        let matrix = ConfusionMatrix::from_labels(
            &[Real, Real, Fake, Fake, Fake],
            &[Real, Fake, Real, Fake, Fake],
        );
        assert_eq!(
            matrix,
            ConfusionMatrix {
                true_positive: 1,
                false_positive: 1,
                true_negative: 2,
                false_negative: 1,
            }
        );
        assert_eq!(matrix.total(), 5);
    }

    #[test]
    fn report_matches_hand_computed_figures() {
        let report = ClassificationReport::from_labels(
            &[Real, Real, Fake, Fake, Fake],
            &[Real, Fake, Real, Fake, Fake],
        );
        let [fake, real] = report.classes;
        assert_eq!(fake.support, 3);
        assert!((fake.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((fake.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(real.support, 2);
        assert!((real.precision - 0.5).abs() < 1e-12);
        assert!((real.recall - 0.5).abs() < 1e-12);
        assert!((report.macro_avg.f1 - (2.0 / 3.0 + 0.5) / 2.0).abs() < 1e-12);
        assert!((report.weighted_avg.recall - 0.6).abs() < 1e-12);
        assert!((report.accuracy - 0.6).abs() < 1e-12);

        let rendered = report.to_string();
        assert!(rendered.contains("Fake News"));
        assert!(rendered.contains("weighted avg"));
    }

    #[test]
    fn missing_class_scores_zero_instead_of_nan() {
        let report = ClassificationReport::from_labels(&[Fake, Fake], &[Fake, Fake]);
        let real = report.classes[1];
        assert_eq!(real.precision, 0.0);
        assert_eq!(real.f1, 0.0);
        assert_eq!(real.support, 0);
    }
}
