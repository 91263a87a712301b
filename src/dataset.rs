//! Labeled CSV corpus loading.

use crate::classifier::Label;
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const REQUIRED_COLUMNS: [&str; 3] = ["author", "title", "label"];

/// Errors raised while reading the training corpus.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The dataset file could not be opened.
    #[error("failed to open dataset {}: {source}", path.display())]
    Open {
        /// Dataset path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The CSV could not be parsed.
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    /// A required column is absent from the header row.
    #[error("dataset is missing the required `{0}` column")]
    MissingColumn(&'static str),
    /// No row carried a usable label.
    #[error("dataset contains no labeled articles")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct ArticleRecord {
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    label: Option<String>,
}

/// One labeled article. Missing cells are empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Byline.
    pub author: String,
    /// Headline.
    pub title: String,
    /// Article body.
    pub text: String,
    /// Ground-truth label.
    pub label: Label,
}

impl Article {
    /// Raw training document: `author + " " + title`, with `" " + text` appended when
    /// `include_body` is set.
    ///
    /// Serving receives free-form article text, so training on the headline fields alone is a
    /// deliberate skew kept for parity with the published model.
    pub fn content(&self, include_body: bool) -> String {
        let mut content = format!("{} {}", self.author, self.title);
        if include_body {
            content.push(' ');
            content.push_str(&self.text);
        }
        content
    }
}

/// A loaded corpus.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    articles: Vec<Article>,
    skipped: usize,
}

impl Dataset {
    /// Read a CSV corpus from disk.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let file = File::open(path).map_err(|source| DatasetError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Read a CSV corpus from any reader.
    ///
    /// Rows whose label is missing or not `0`/`1` are skipped with a warning.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, DatasetError> {
        let mut reader = ReaderBuilder::new().trim(Trim::Headers).from_reader(reader);
        let headers = reader.headers()?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|header| header == column) {
                return Err(DatasetError::MissingColumn(column));
            }
        }

        let mut articles = Vec::new();
        let mut skipped = 0;
        for (row, record) in reader.deserialize::<ArticleRecord>().enumerate() {
            let record = record?;
            let raw_label = record.label.unwrap_or_default();
            let Some(label) = parse_label(&raw_label) else {
                tracing::warn!(row = row + 1, label = %raw_label, "Skipping row with unusable label");
                skipped += 1;
                continue;
            };
            articles.push(Article {
                author: record.author.unwrap_or_default(),
                title: record.title.unwrap_or_default(),
                text: record.text.unwrap_or_default(),
                label,
            });
        }

        if articles.is_empty() {
            return Err(DatasetError::Empty);
        }
        Ok(Self { articles, skipped })
    }

    /// Loaded articles in file order.
    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    /// Number of usable articles.
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    /// Whether no articles were loaded.
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Rows dropped for an unusable label.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// `(fake, real)` article counts.
    pub fn class_counts(&self) -> (usize, usize) {
        let real = self
            .articles
            .iter()
            .filter(|article| article.label == Label::Real)
            .count();
        (self.articles.len() - real, real)
    }

    /// Labels in file order.
    pub fn labels(&self) -> Vec<Label> {
        self.articles.iter().map(|article| article.label).collect()
    }

    /// Raw training documents in file order.
    pub fn contents(&self, include_body: bool) -> Vec<String> {
        self.articles
            .iter()
            .map(|article| article.content(include_body))
            .collect()
    }
}

fn parse_label(raw: &str) -> Option<Label> {
    raw.trim().parse::<u8>().ok().and_then(Label::from_raw)
}
