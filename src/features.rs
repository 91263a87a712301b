//! TF-IDF feature extraction over normalized documents.
//!
//! [`TfidfVectorizer`] is fit once on the training corpus and then frozen. Its vocabulary mixes
//! unigrams and adjacent-word bigrams; term weights use sublinear term frequency
//! (`1 + ln(count)`) times smoothed inverse document frequency, and each row is L2-normalized.
//!
//! Vocabulary pruning keeps terms whose document frequency lies within
//! `[min_df, max_df * n_documents]`. When more than `max_features` terms survive, the ones with
//! the largest total count across the corpus are kept (ties resolved alphabetically). Column
//! indices are assigned in alphabetical term order.

mod sparse;

pub use sparse::{FeatureMatrix, FeatureVector};

use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;
use thiserror::Error;

/// Default cap on vocabulary size.
pub const DEFAULT_MAX_FEATURES: usize = 20_000;
/// Default minimum number of documents a term must appear in.
pub const DEFAULT_MIN_DF: usize = 2;
/// Default maximum share of documents a term may appear in.
pub const DEFAULT_MAX_DF: f64 = 0.9;

/// Errors raised while fitting or applying the vectorizer.
#[derive(Debug, Error, PartialEq)]
pub enum VectorizerError {
    /// `transform` was called before `fit` or before an artifact was loaded.
    #[error("vectorizer is not initialized: fit it or load a trained artifact first")]
    NotFitted,
    /// `fit` received no documents.
    #[error("cannot fit a vectorizer on an empty corpus")]
    EmptyCorpus,
    /// `max_df` admits fewer documents than `min_df` requires.
    #[error("max_df admits at most {max_doc_count:.1} documents, fewer than min_df = {min_df}")]
    InvalidDfBounds {
        /// Upper document-count bound derived from `max_df`.
        max_doc_count: f64,
        /// Lower document-count bound.
        min_df: usize,
    },
    /// The n-gram range is empty or starts at zero.
    #[error("invalid n-gram range ({0}, {1})")]
    InvalidNgramRange(usize, usize),
    /// Pruning removed every candidate term.
    #[error("no terms remain after pruning; lower min_df or raise max_df")]
    NoTermsRemain,
}

/// Hyperparameters controlling vocabulary construction and weighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizerParams {
    /// Maximum vocabulary size, or `None` for no cap.
    pub max_features: Option<usize>,
    /// Minimum document frequency (absolute count).
    pub min_df: usize,
    /// Maximum document frequency as a fraction of the corpus.
    pub max_df: f64,
    /// Inclusive `(min, max)` n-gram lengths.
    pub ngram_range: (usize, usize),
    /// Replace raw counts with `1 + ln(count)`.
    pub sublinear_tf: bool,
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            max_features: Some(DEFAULT_MAX_FEATURES),
            min_df: DEFAULT_MIN_DF,
            max_df: DEFAULT_MAX_DF,
            ngram_range: (1, 2),
            sublinear_tf: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedVocabulary {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
    n_documents: usize,
}

/// TF-IDF vectorizer with an explicit unfitted state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    params: VectorizerParams,
    fitted: Option<FittedVocabulary>,
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new(VectorizerParams::default())
    }
}

impl TfidfVectorizer {
    /// Create an unfitted vectorizer.
    pub fn new(params: VectorizerParams) -> Self {
        Self {
            params,
            fitted: None,
        }
    }

    /// Hyperparameters this vectorizer was configured with.
    pub fn params(&self) -> &VectorizerParams {
        &self.params
    }

    /// Whether a vocabulary has been learned.
    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Number of output columns.
    pub fn n_features(&self) -> Result<usize, VectorizerError> {
        self.vocabulary().map(|vocabulary| vocabulary.len())
    }

    /// Learned term → column mapping.
    pub fn vocabulary(&self) -> Result<&BTreeMap<String, usize>, VectorizerError> {
        self.fitted
            .as_ref()
            .map(|fitted| &fitted.vocabulary)
            .ok_or(VectorizerError::NotFitted)
    }

    /// Learned inverse document frequencies, indexed by column.
    pub fn idf(&self) -> Result<&[f64], VectorizerError> {
        self.fitted
            .as_ref()
            .map(|fitted| fitted.idf.as_slice())
            .ok_or(VectorizerError::NotFitted)
    }

    /// Number of documents the vocabulary was learned from.
    pub fn n_documents(&self) -> Result<usize, VectorizerError> {
        self.fitted
            .as_ref()
            .map(|fitted| fitted.n_documents)
            .ok_or(VectorizerError::NotFitted)
    }

    /// Learn the vocabulary and IDF table from `corpus`, replacing any previous fit.
    pub fn fit<S: AsRef<str> + Sync>(&mut self, corpus: &[S]) -> Result<(), VectorizerError> {
        let (min_n, max_n) = self.params.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(VectorizerError::InvalidNgramRange(min_n, max_n));
        }
        if corpus.is_empty() {
            return Err(VectorizerError::EmptyCorpus);
        }

        let n_documents = corpus.len();
        let max_doc_count = self.params.max_df * n_documents as f64;
        if max_doc_count < self.params.min_df as f64 {
            return Err(VectorizerError::InvalidDfBounds {
                max_doc_count,
                min_df: self.params.min_df,
            });
        }

        let ngram_range = self.params.ngram_range;
        let per_document: Vec<HashMap<String, usize>> = corpus
            .par_iter()
            .map(|document| count_terms(document.as_ref(), ngram_range))
            .collect();

        // term -> (document frequency, total count)
        let mut stats: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for counts in per_document {
            for (term, count) in counts {
                let entry = stats.entry(term).or_insert((0, 0));
                entry.0 += 1;
                entry.1 += count;
            }
        }

        let mut kept: Vec<(String, usize, usize)> = stats
            .into_iter()
            .filter(|(_, (df, _))| *df >= self.params.min_df && *df as f64 <= max_doc_count)
            .map(|(term, (df, total))| (term, df, total))
            .collect();

        if let Some(limit) = self.params.max_features {
            if kept.len() > limit {
                // Stable sort keeps alphabetical order among equal totals.
                kept.sort_by(|a, b| b.2.cmp(&a.2));
                kept.truncate(limit);
                kept.sort_by(|a, b| a.0.cmp(&b.0));
            }
        }

        if kept.is_empty() {
            return Err(VectorizerError::NoTermsRemain);
        }

        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(kept.len());
        for (index, (term, df, _)) in kept.into_iter().enumerate() {
            idf.push(((1.0 + n_documents as f64) / (1.0 + df as f64)).ln() + 1.0);
            vocabulary.insert(term, index);
        }

        tracing::debug!(
            documents = n_documents,
            features = vocabulary.len(),
            "Fitted TF-IDF vocabulary"
        );

        self.fitted = Some(FittedVocabulary {
            vocabulary,
            idf,
            n_documents,
        });
        Ok(())
    }

    /// Fit on `corpus` and return its feature matrix.
    pub fn fit_transform<S: AsRef<str> + Sync>(
        &mut self,
        corpus: &[S],
    ) -> Result<FeatureMatrix, VectorizerError> {
        self.fit(corpus)?;
        self.transform(corpus)
    }

    /// Map documents onto the frozen vocabulary. Unknown terms are ignored.
    pub fn transform<S: AsRef<str> + Sync>(
        &self,
        documents: &[S],
    ) -> Result<FeatureMatrix, VectorizerError> {
        let fitted = self.fitted.as_ref().ok_or(VectorizerError::NotFitted)?;
        let rows = documents
            .par_iter()
            .map(|document| self.vectorize(fitted, document.as_ref()))
            .collect();
        Ok(FeatureMatrix::new(rows, fitted.idf.len()))
    }

    /// Convenience wrapper for a batch of one.
    pub fn transform_one(&self, document: &str) -> Result<FeatureVector, VectorizerError> {
        let fitted = self.fitted.as_ref().ok_or(VectorizerError::NotFitted)?;
        Ok(self.vectorize(fitted, document))
    }

    /// SHA-256 over the vocabulary and IDF table, hex encoded.
    ///
    /// A classifier records the fingerprint of the vectorizer that produced its training matrix so
    /// the two artifacts can be checked for consistency at load time.
    pub fn fingerprint(&self) -> Result<String, VectorizerError> {
        let fitted = self.fitted.as_ref().ok_or(VectorizerError::NotFitted)?;
        let mut hasher = Sha256::new();
        hasher.update((fitted.vocabulary.len() as u64).to_le_bytes());
        for (term, &index) in &fitted.vocabulary {
            hasher.update(term.as_bytes());
            hasher.update([0u8]);
            hasher.update((index as u64).to_le_bytes());
            hasher.update(fitted.idf[index].to_bits().to_le_bytes());
        }
        Ok(hex::encode(hasher.finalize()))
    }

    fn vectorize(&self, fitted: &FittedVocabulary, document: &str) -> FeatureVector {
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for_each_term(document, self.params.ngram_range, |term| {
            if let Some(&index) = fitted.vocabulary.get(term) {
                *counts.entry(index).or_insert(0) += 1;
            }
        });

        let weighted: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(index, count)| {
                let tf = if self.params.sublinear_tf {
                    1.0 + (count as f64).ln()
                } else {
                    count as f64
                };
                (index, tf * fitted.idf[index])
            })
            .collect();

        let norm = weighted
            .iter()
            .map(|(_, weight)| weight * weight)
            .sum::<f64>()
            .sqrt();
        if norm > 0.0 {
            FeatureVector::from_sorted(
                weighted
                    .into_iter()
                    .map(|(index, weight)| (index, weight / norm)),
            )
        } else {
            FeatureVector::from_sorted(weighted)
        }
    }
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("static pattern is valid"))
}

/// Words of two or more word characters, lowercased.
fn tokenize(document: &str) -> Vec<String> {
    let lowered = document.to_lowercase();
    token_pattern()
        .find_iter(&lowered)
        .map(|token| token.as_str().to_string())
        .collect()
}

fn for_each_term(document: &str, (min_n, max_n): (usize, usize), mut visit: impl FnMut(&str)) {
    let tokens = tokenize(document);
    for n in min_n..=max_n {
        if n == 1 {
            tokens.iter().for_each(|token| visit(token));
        } else {
            for window in tokens.windows(n) {
                visit(&window.join(" "));
            }
        }
    }
}

fn count_terms(document: &str, ngram_range: (usize, usize)) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for_each_term(document, ngram_range, |term| {
        *counts.entry(term.to_string()).or_insert(0) += 1;
    });
    counts
}
