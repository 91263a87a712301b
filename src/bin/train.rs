use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rustynews::training::{self, TrainingOptions};
use rustynews::{config, logging};

#[derive(Parser)]
#[command(
    name = "train",
    about = "Train the TF-IDF vectorizer and logistic regression classifier"
)]
struct Cli {
    /// Labeled CSV corpus (defaults to `TRAINING_DATASET_PATH` or `train.csv`).
    #[arg(long)]
    dataset: Option<PathBuf>,
    /// Output path for the classifier artifact (defaults to `MODEL_PATH`).
    #[arg(long)]
    model_path: Option<PathBuf>,
    /// Output path for the vectorizer artifact (defaults to `VECTORIZER_PATH`).
    #[arg(long)]
    vectorizer_path: Option<PathBuf>,
    /// Also train on the article body, not just author and title.
    #[arg(long)]
    include_body: bool,
    /// Seed for the train/test split.
    #[arg(long, default_value_t = 42)]
    seed: u64,
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

    let mut options = TrainingOptions::new(
        cli.dataset
            .unwrap_or_else(|| config.training_dataset_path.clone()),
        cli.model_path.unwrap_or_else(|| config.model_path.clone()),
        cli.vectorizer_path
            .unwrap_or_else(|| config.vectorizer_path.clone()),
    );
    options.include_body = cli.include_body;
    options.seed = cli.seed;

    let report = training::run(&options)
        .with_context(|| format!("Training on {} failed", options.dataset_path.display()))?;

    let (fake, real) = report.class_counts;
    let confusion = report.test_report.confusion;
    println!(
        "Articles: {} (fake {fake}, real {real}, skipped {})",
        report.n_articles, report.skipped_rows
    );
    println!("Features: {}", report.n_features);
    println!(
        "Best parameters: C={} solver={} (CV accuracy {:.4})",
        report.best_params.c, report.best_params.solver, report.best_cv_score
    );
    println!("Training accuracy: {:.4}", report.train_accuracy);
    println!("Test accuracy: {:.4}", report.test_report.accuracy);
    println!();
    println!("Classification report:");
    print!("{}", report.test_report);
    println!();
    println!("Confusion matrix:");
    for (description, count) in [
        ("True negatives (fake identified as fake)", confusion.true_negative),
        ("False positives (fake predicted as real)", confusion.false_positive),
        ("False negatives (real predicted as fake)", confusion.false_negative),
        ("True positives (real identified as real)", confusion.true_positive),
    ] {
        println!("  {description}: {count}");
    }
    println!();
    println!("Model saved to {}", options.model_path.display());
    println!("Vectorizer saved to {}", options.vectorizer_path.display());
    println!("Start the server with `cargo run --release`.");
    Ok(())
}
