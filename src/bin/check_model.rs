use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use rustynews::artifacts;
use rustynews::serving::{ArtifactPaths, ServingContext};
use rustynews::{config, logging};

const SAMPLE_TEXT: &str = "This is a test news article about politics and current events";

#[derive(Parser)]
#[command(
    name = "check-model",
    about = "Load the trained artifacts and run one sample prediction"
)]
struct Cli {
    /// Classifier artifact (defaults to `MODEL_PATH`).
    #[arg(long)]
    model_path: Option<PathBuf>,
    /// Vectorizer artifact (defaults to `VECTORIZER_PATH`).
    #[arg(long)]
    vectorizer_path: Option<PathBuf>,
    /// Text to classify instead of the built-in sample.
    #[arg(long)]
    text: Option<String>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::init_config().context("Failed to load configuration")?;
    logging::init_tracing();
    let paths = ArtifactPaths {
        model: cli.model_path.unwrap_or_else(|| config.model_path.clone()),
        vectorizer: cli
            .vectorizer_path
            .unwrap_or_else(|| config.vectorizer_path.clone()),
    };

    for path in [&paths.model, &paths.vectorizer] {
        let metadata = artifacts::read_metadata(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        println!(
            "{}: {} (schema v{}, created {})",
            path.display(),
            metadata.kind,
            metadata.version,
            metadata.created_at
        );
    }

    let context = ServingContext::load(&paths, config.fallback_confidence);
    if !context.is_ready() {
        bail!(
            "model is not usable: {}",
            context.not_ready_reason().unwrap_or("unknown reason")
        );
    }
    println!(
        "Loaded {} with {} features",
        context.classifier_name().unwrap_or("classifier"),
        context.vocabulary_size().unwrap_or_default()
    );

    let text = cli.text.unwrap_or_else(|| SAMPLE_TEXT.to_string());
    let prediction = context
        .predict_request(&text)
        .context("Sample prediction failed")?;
    println!(
        "Prediction: {} (confidence {:.2}%, {:?})",
        prediction.label,
        prediction.confidence,
        prediction.source
    );
    Ok(())
}
