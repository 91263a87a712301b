//! Versioned binary artifact files for the trained vectorizer and classifier.
//!
//! Each file is a `bincode` header followed by a `bincode` payload. The header carries a magic
//! tag, the schema version, the artifact kind, and an RFC 3339 creation timestamp, so loaders can
//! reject foreign or stale files before touching the payload.

use crate::classifier::{Classifier, LogisticRegression};
use crate::features::TfidfVectorizer;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const MAGIC: [u8; 8] = *b"RNEWSART";

/// Current on-disk schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors raised while saving or loading artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The artifact file does not exist.
    #[error("artifact not found at {}", path.display())]
    Missing {
        /// Path that was probed.
        path: PathBuf,
    },
    /// Filesystem failure other than a missing file.
    #[error("I/O error on artifact {}: {source}", path.display())]
    Io {
        /// Artifact path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The file exists but could not be decoded.
    #[error("artifact {} is corrupt: {reason}", path.display())]
    Corrupt {
        /// Artifact path.
        path: PathBuf,
        /// Decoder detail.
        reason: String,
    },
    /// The file decoded but belongs to another kind, schema version, or vectorizer.
    #[error("artifact {} is incompatible: {reason}", path.display())]
    Incompatible {
        /// Artifact path.
        path: PathBuf,
        /// What did not match.
        reason: String,
    },
    /// A component without learned state was saved or loaded.
    #[error("{0} has not been fitted")]
    Unfitted(&'static str),
    /// Serialization failed while saving.
    #[error("failed to encode artifact: {0}")]
    Encode(String),
}

/// Which component an artifact file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// A fitted [`TfidfVectorizer`].
    Vectorizer,
    /// A [`ClassifierArtifact`].
    Classifier,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vectorizer => "tfidf-vectorizer",
            Self::Classifier => "logistic-regression",
        })
    }
}

/// Header fields shared by every artifact file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    magic: [u8; 8],
    /// Schema version the file was written with.
    pub version: u32,
    /// Stored component.
    pub kind: ArtifactKind,
    /// RFC 3339 timestamp of when the file was written.
    pub created_at: String,
}

/// Trained classifier bound to the vectorizer it was fitted against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierArtifact {
    /// Fitted model, including the hyperparameters that produced it.
    pub model: LogisticRegression,
    /// [`TfidfVectorizer::fingerprint`] of the paired vectorizer.
    pub vectorizer_fingerprint: String,
    /// Column count the model expects.
    pub n_features: usize,
}

impl ClassifierArtifact {
    /// Bind a fitted model to its vectorizer.
    pub fn new(
        model: LogisticRegression,
        vectorizer: &TfidfVectorizer,
    ) -> Result<Self, ArtifactError> {
        let n_features = model
            .n_features()
            .map_err(|_| ArtifactError::Unfitted("classifier"))?;
        let vectorizer_fingerprint = vectorizer
            .fingerprint()
            .map_err(|_| ArtifactError::Unfitted("vectorizer"))?;
        Ok(Self {
            model,
            vectorizer_fingerprint,
            n_features,
        })
    }

    /// Confirm this classifier was trained on `vectorizer`'s output.
    pub fn ensure_compatible(
        &self,
        vectorizer: &TfidfVectorizer,
        path: &Path,
    ) -> Result<(), ArtifactError> {
        let fingerprint = vectorizer
            .fingerprint()
            .map_err(|_| ArtifactError::Unfitted("vectorizer"))?;
        if fingerprint != self.vectorizer_fingerprint {
            return Err(ArtifactError::Incompatible {
                path: path.to_path_buf(),
                reason: "classifier was trained against a different vectorizer".to_string(),
            });
        }
        let vocabulary_size = vectorizer
            .n_features()
            .map_err(|_| ArtifactError::Unfitted("vectorizer"))?;
        if vocabulary_size != self.n_features {
            return Err(ArtifactError::Incompatible {
                path: path.to_path_buf(),
                reason: format!(
                    "classifier expects {} features, vectorizer produces {vocabulary_size}",
                    self.n_features
                ),
            });
        }
        Ok(())
    }
}

/// Persist a fitted vectorizer.
pub fn save_vectorizer(path: &Path, vectorizer: &TfidfVectorizer) -> Result<(), ArtifactError> {
    if !vectorizer.is_fitted() {
        return Err(ArtifactError::Unfitted("vectorizer"));
    }
    write_artifact(path, ArtifactKind::Vectorizer, vectorizer)
}

/// Load a fitted vectorizer.
pub fn load_vectorizer(path: &Path) -> Result<TfidfVectorizer, ArtifactError> {
    let vectorizer: TfidfVectorizer = read_artifact(path, ArtifactKind::Vectorizer)?.1;
    if !vectorizer.is_fitted() {
        return Err(ArtifactError::Unfitted("vectorizer"));
    }
    Ok(vectorizer)
}

/// Persist a classifier artifact.
pub fn save_classifier(path: &Path, artifact: &ClassifierArtifact) -> Result<(), ArtifactError> {
    if !artifact.model.is_fitted() {
        return Err(ArtifactError::Unfitted("classifier"));
    }
    write_artifact(path, ArtifactKind::Classifier, artifact)
}

/// Load a classifier artifact.
pub fn load_classifier(path: &Path) -> Result<ClassifierArtifact, ArtifactError> {
    let artifact: ClassifierArtifact = read_artifact(path, ArtifactKind::Classifier)?.1;
    if !artifact.model.is_fitted() {
        return Err(ArtifactError::Unfitted("classifier"));
    }
    Ok(artifact)
}

/// Read and validate only the header of an artifact file.
pub fn read_metadata(path: &Path) -> Result<ArtifactMetadata, ArtifactError> {
    let bytes = read_bytes(path)?;
    decode_header(path, &bytes).map(|(metadata, _)| metadata)
}

fn write_artifact<T: Serialize>(
    path: &Path,
    kind: ArtifactKind,
    payload: &T,
) -> Result<(), ArtifactError> {
    let created_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|err| ArtifactError::Encode(err.to_string()))?;
    let header = ArtifactMetadata {
        magic: MAGIC,
        version: SCHEMA_VERSION,
        kind,
        created_at,
    };

    let config = bincode::config::standard();
    let mut bytes = bincode::serde::encode_to_vec(&header, config)
        .map_err(|err| ArtifactError::Encode(err.to_string()))?;
    bytes.extend(
        bincode::serde::encode_to_vec(payload, config)
            .map_err(|err| ArtifactError::Encode(err.to_string()))?,
    );

    let io_error = |source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let staging = path.with_extension("partial");
    fs::write(&staging, &bytes).map_err(io_error)?;
    fs::rename(&staging, path).map_err(io_error)?;

    tracing::debug!(path = %path.display(), %kind, bytes = bytes.len(), "Wrote artifact");
    Ok(())
}

fn read_artifact<T: DeserializeOwned>(
    path: &Path,
    expected: ArtifactKind,
) -> Result<(ArtifactMetadata, T), ArtifactError> {
    let bytes = read_bytes(path)?;
    let (metadata, offset) = decode_header(path, &bytes)?;
    if metadata.kind != expected {
        return Err(ArtifactError::Incompatible {
            path: path.to_path_buf(),
            reason: format!("expected a {expected} artifact, found {}", metadata.kind),
        });
    }

    let (payload, consumed) =
        bincode::serde::decode_from_slice::<T, _>(&bytes[offset..], bincode::config::standard())
            .map_err(|err| ArtifactError::Corrupt {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
    if offset + consumed != bytes.len() {
        return Err(ArtifactError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("{} trailing bytes", bytes.len() - offset - consumed),
        });
    }
    Ok((metadata, payload))
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ArtifactError::Missing {
            path: path.to_path_buf(),
        },
        _ => ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

fn decode_header(path: &Path, bytes: &[u8]) -> Result<(ArtifactMetadata, usize), ArtifactError> {
    if !bytes.starts_with(&MAGIC) {
        return Err(ArtifactError::Incompatible {
            path: path.to_path_buf(),
            reason: "missing artifact magic; not a rustynews artifact".to_string(),
        });
    }
    let (metadata, offset) =
        bincode::serde::decode_from_slice::<ArtifactMetadata, _>(bytes, bincode::config::standard())
            .map_err(|err| ArtifactError::Corrupt {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
    if metadata.version != SCHEMA_VERSION {
        return Err(ArtifactError::Incompatible {
            path: path.to_path_buf(),
            reason: format!(
                "schema version {} is not supported (expected {SCHEMA_VERSION})",
                metadata.version
            ),
        });
    }
    Ok((metadata, offset))
}
