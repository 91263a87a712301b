use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

/// Default location of the classifier artifact.
pub const DEFAULT_MODEL_PATH: &str = "model/fake_news_model.bin";
/// Default location of the vectorizer artifact.
pub const DEFAULT_VECTORIZER_PATH: &str = "model/tfidf_vectorizer.bin";
/// Default training corpus.
pub const DEFAULT_DATASET_PATH: &str = "train.csv";
/// Confidence reported when the classifier exposes no probabilities.
pub const DEFAULT_FALLBACK_CONFIDENCE: f64 = 85.0;
/// Upper bound on a single inference.
pub const DEFAULT_PREDICTION_TIMEOUT_MS: u64 = 5_000;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed or is out of range.
    #[error("Invalid value for environment variable {key}: {reason}")]
    InvalidValue {
        /// Offending variable.
        key: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

/// Runtime configuration shared by the server and the command-line tools.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Classifier artifact path (`MODEL_PATH`).
    pub model_path: PathBuf,
    /// Vectorizer artifact path (`VECTORIZER_PATH`).
    pub vectorizer_path: PathBuf,
    /// Training corpus (`TRAINING_DATASET_PATH`).
    pub training_dataset_path: PathBuf,
    /// Percentage reported for non-probabilistic classifiers (`FALLBACK_CONFIDENCE`).
    pub fallback_confidence: f64,
    /// Per-request inference budget in milliseconds (`PREDICTION_TIMEOUT_MS`).
    pub prediction_timeout_ms: u64,
    /// Optional override for the HTTP server port (`SERVER_PORT`).
    pub server_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            vectorizer_path: PathBuf::from(DEFAULT_VECTORIZER_PATH),
            training_dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            fallback_confidence: DEFAULT_FALLBACK_CONFIDENCE,
            prediction_timeout_ms: DEFAULT_PREDICTION_TIMEOUT_MS,
            server_port: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(load_env_optional)
    }

    /// Build configuration from an arbitrary key lookup. Unset or blank keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let fallback_confidence = parse_optional(&lookup, "FALLBACK_CONFIDENCE")?
            .unwrap_or(defaults.fallback_confidence);
        if !(0.0..=100.0).contains(&fallback_confidence) {
            return Err(ConfigError::InvalidValue {
                key: "FALLBACK_CONFIDENCE",
                reason: format!("{fallback_confidence} is outside 0-100"),
            });
        }

        let prediction_timeout_ms = parse_optional(&lookup, "PREDICTION_TIMEOUT_MS")?
            .unwrap_or(defaults.prediction_timeout_ms);
        if prediction_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PREDICTION_TIMEOUT_MS",
                reason: "must be greater than zero".into(),
            });
        }

        Ok(Self {
            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            vectorizer_path: lookup("VECTORIZER_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.vectorizer_path),
            training_dataset_path: lookup("TRAINING_DATASET_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.training_dataset_path),
            fallback_confidence,
            prediction_timeout_ms,
            server_port: parse_optional(&lookup, "SERVER_PORT")?,
        })
    }
}

fn parse_optional<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|value| {
            value.trim().parse().map_err(|err: T::Err| ConfigError::InvalidValue {
                key,
                reason: format!("{value:?}: {err}"),
            })
        })
        .transpose()
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load `.env` and the environment, then install the result in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        model_path = %config.model_path.display(),
        vectorizer_path = %config.vectorizer_path.display(),
        fallback_confidence = config.fallback_confidence,
        prediction_timeout_ms = config.prediction_timeout_ms,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}
