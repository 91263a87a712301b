//! Train on a small corpus, then serve the resulting artifacts through the real stack.

use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use rustynews::api::create_router;
use rustynews::classifier::Label;
use rustynews::serving::{
    ArtifactPaths, ConfidenceSource, PredictionError, PredictionService, ServingContext,
};
use rustynews::training::{self, TrainingOptions, TrainingReport};
use serde_json::json;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

const REAL_TITLES: [&str; 5] = [
    "Senate approves federal budget after long debate",
    "Central bank holds interest rates steady",
    "Stock market closes higher on strong earnings",
    "Government announces new infrastructure spending plan",
    "Supreme court rules on election law challenge",
];
const FAKE_TITLES: [&str; 5] = [
    "Shocking secret cure doctors hide from you",
    "Aliens spotted controlling world leaders",
    "Miracle pill melts belly fat overnight",
    "Celebrity clone conspiracy finally exposed",
    "Hidden truth they never want you to know",
];
const REAL_AUTHORS: [&str; 2] = ["Reuters Staff", "Michelle Smith"];
const FAKE_AUTHORS: [&str; 2] = ["Anonymous Patriot", "Truth Seeker"];

fn write_corpus(path: &Path) {
    let mut csv = String::from("id,title,author,text,label\n");
    let mut id = 0;
    for round in 0..4 {
        for (i, title) in REAL_TITLES.iter().enumerate() {
            let author = REAL_AUTHORS[(i + round) % 2];
            writeln!(
                csv,
                "{id},{title},{author},\"Officials confirmed the report on Tuesday, round {round}.\",1"
            )
            .unwrap();
            id += 1;
        }
        for (i, title) in FAKE_TITLES.iter().enumerate() {
            let author = FAKE_AUTHORS[(i + round) % 2];
            writeln!(
                csv,
                "{id},{title},{author},\"Share before they delete this! Part {round}.\",0"
            )
            .unwrap();
            id += 1;
        }
    }
    // Unlabeled rows are skipped.
    csv.push_str("99,Orphan headline,Nobody,No label,\n");
    fs::write(path, csv).unwrap();
}

struct Trained {
    dir: TempDir,
    paths: ArtifactPaths,
    report: TrainingReport,
}

fn train(include_body: bool) -> Trained {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("train.csv");
    write_corpus(&dataset);

    let paths = ArtifactPaths {
        model: dir.path().join("model/fake_news_model.bin"),
        vectorizer: dir.path().join("model/tfidf_vectorizer.bin"),
    };
    let mut options =
        TrainingOptions::new(dataset, paths.model.clone(), paths.vectorizer.clone());
    options.include_body = include_body;
    let report = training::run(&options).expect("training succeeds");
    Trained { dir, paths, report }
}

#[test]
fn training_reports_every_stage_outcome() {
    let trained = train(false);
    let report = &trained.report;

    assert_eq!(report.n_articles, 40);
    assert_eq!(report.skipped_rows, 1);
    assert_eq!(report.class_counts, (20, 20));
    assert_eq!(report.train_size, 32);
    assert_eq!(report.test_size, 8);
    assert_eq!(report.candidates.len(), 6);
    assert!(report.n_features > 0);
    assert!(report.test_report.accuracy >= 0.75);
    assert!(trained.paths.model.exists());
    assert!(trained.paths.vectorizer.exists());
}

#[test]
fn trained_artifacts_classify_deterministically() {
    let trained = train(false);
    let context = ServingContext::load(&trained.paths, 85.0);
    assert!(context.is_ready());

    let real = context
        .predict_request("Senate approves federal budget after a long debate")
        .unwrap();
    assert_eq!(real.label, Label::Real);
    assert_eq!(real.source, ConfidenceSource::Probability);
    assert!(real.confidence >= 50.0 && real.confidence <= 100.0);

    let fake = context
        .predict_request("Shocking secret cure that doctors hide from you")
        .unwrap();
    assert_eq!(fake.label, Label::Fake);

    let reloaded = ServingContext::load(&trained.paths, 85.0);
    let again = reloaded
        .predict_request("Senate approves federal budget after a long debate")
        .unwrap();
    assert_eq!(again, real);

    assert_eq!(
        context.predict_request("too short").unwrap_err(),
        PredictionError::InvalidInput
    );
}

#[test]
fn classifier_paired_with_another_vectorizer_is_refused() {
    let headlines = train(false);
    let with_body = train(true);
    let mixed = ArtifactPaths {
        model: headlines.paths.model.clone(),
        vectorizer: with_body.paths.vectorizer.clone(),
    };

    let context = ServingContext::load(&mixed, 85.0);
    assert!(!context.is_ready());
    assert!(context.not_ready_reason().unwrap().contains("incompatible"));
}

#[test]
fn corrupted_model_file_is_refused() {
    let trained = train(false);
    let bytes = fs::read(&trained.paths.model).unwrap();
    fs::write(&trained.paths.model, &bytes[..bytes.len() - 16]).unwrap();

    let context = ServingContext::load(&trained.paths, 85.0);
    assert!(!context.is_ready());
    assert!(trained.dir.path().exists());
}

#[tokio::test]
async fn http_api_serves_trained_model() {
    let trained = train(false);
    let service = PredictionService::new(
        ServingContext::load(&trained.paths, 85.0),
        Duration::from_secs(5),
    );
    let app = create_router(Arc::new(service));

    let (status, body) = post_json(
        app.clone(),
        json!({ "text": "Stock market closes higher on strong earnings" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], "Real News");
    assert_eq!(body["label"], 1);
    let confidence = body["confidence"].as_f64().unwrap();
    assert!((50.0..=100.0).contains(&confidence));

    let (status, body) = post_json(app.clone(), json!({ "text": "short" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Please provide valid news article text (at least 10 characters)"
    );

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router response");
    let metrics: serde_json::Value =
        serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(metrics["predictions_served"], 1);
    assert_eq!(metrics["predicted_real"], 1);
    assert_eq!(metrics["requests_rejected"], 1);
}

#[tokio::test]
async fn http_api_without_artifacts_returns_503() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths {
        model: dir.path().join("missing-model.bin"),
        vectorizer: dir.path().join("missing-vectorizer.bin"),
    };
    let service = PredictionService::new(ServingContext::load(&paths, 85.0), Duration::from_secs(1));
    let app = create_router(Arc::new(service));

    let (status, body) = post_json(
        app.clone(),
        json!({ "text": "A perfectly valid and long article body" }),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Model not loaded. Please retrain the model.");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router response");
    let health: serde_json::Value =
        serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(health, json!({ "status": "healthy", "model_loaded": false }));
}

async fn post_json(app: axum::Router, payload: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/predict")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request"),
        )
        .await
        .expect("router response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    (status, serde_json::from_slice(&body).expect("json body"))
}
