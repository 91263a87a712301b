//! HTTP surface for Rusty News.
//!
//! - `GET /` – Browser page with the article form and model status.
//! - `POST /predict` – Form submission (`news_text`). Always answers `200` with an HTML page that
//!   carries either the verdict or an error message.
//! - `POST /api/predict` – JSON `{"text": "..."}` returning `{prediction, confidence, label}`.
//!   Errors map to `503` (model not loaded, checked first), `400` (text missing or shorter than
//!   10 characters), or `500` (undecodable body, inference failure, timeout).
//! - `GET /health` – `{"status": "healthy", "model_loaded": bool}`.
//! - `GET /metrics` – Prediction counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.

mod page;

use crate::serving::{PredictionApi, PredictionError};
use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::{State, rejection::FormRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use page::Outcome;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const FORM_NOT_LOADED: &str =
    "Error: Model not loaded. Please retrain the model by running: cargo run --release --bin train";
const FORM_TOO_SHORT: &str = "Error: Please enter a valid news article (at least 10 characters)";
const FORM_FAILED: &str = "Error: Unable to process the article.";
const API_NOT_LOADED: &str = "Model not loaded. Please retrain the model.";
const API_TOO_SHORT: &str = "Please provide valid news article text (at least 10 characters)";

/// Build the HTTP router exposing the prediction surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: PredictionApi + 'static,
{
    Router::new()
        .route("/", get(home::<S>))
        .route("/predict", post(predict_form::<S>))
        .route("/api/predict", post(predict_api::<S>))
        .route("/health", get(health::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

async fn home<S>(State(service): State<Arc<S>>) -> Html<String>
where
    S: PredictionApi,
{
    page::render(service.health().ready, &Outcome::Empty)
}

/// Form body for `POST /predict`.
#[derive(Deserialize)]
struct PredictForm {
    #[serde(default)]
    news_text: Option<String>,
}

/// Handle the browser form. Every outcome renders the page with HTTP 200.
async fn predict_form<S>(
    State(service): State<Arc<S>>,
    form: Result<Form<PredictForm>, FormRejection>,
) -> Html<String>
where
    S: PredictionApi,
{
    if !service.health().ready {
        return page::render(false, &Outcome::Message(FORM_NOT_LOADED.into()));
    }

    let text = match form {
        Ok(Form(PredictForm {
            news_text: Some(text),
        })) => text,
        Ok(Form(PredictForm { news_text: None })) => {
            return page::render(
                true,
                &Outcome::Message(format!("{FORM_FAILED} missing form field `news_text`")),
            );
        }
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Rejected form submission");
            return page::render(
                true,
                &Outcome::Message(format!("{FORM_FAILED} {}", rejection.body_text())),
            );
        }
    };

    let outcome = match service.predict(text).await {
        Ok(prediction) => Outcome::Verdict {
            label: prediction.label.display_name(),
            confidence: prediction.rounded_confidence(),
        },
        Err(PredictionError::NotReady) => Outcome::Message(FORM_NOT_LOADED.into()),
        Err(PredictionError::InvalidInput) => Outcome::Message(FORM_TOO_SHORT.into()),
        Err(err) => Outcome::Message(format!("{FORM_FAILED} {err}")),
    };
    page::render(service.health().ready, &outcome)
}

/// Request body for `POST /api/predict`.
#[derive(Deserialize)]
struct PredictRequest {
    #[serde(default)]
    text: Option<String>,
}

/// Success response for `POST /api/predict`.
#[derive(Serialize)]
struct PredictResponse {
    prediction: &'static str,
    confidence: f64,
    label: u8,
}

/// Classify an article submitted as JSON.
async fn predict_api<S>(
    State(service): State<Arc<S>>,
    body: Bytes,
) -> Result<Json<PredictResponse>, ApiError>
where
    S: PredictionApi,
{
    if !service.health().ready {
        return Err(ApiError::Prediction(PredictionError::NotReady));
    }
    let request: PredictRequest =
        serde_json::from_slice(&body).map_err(|err| ApiError::MalformedBody(err.to_string()))?;

    let prediction = service
        .predict(request.text.unwrap_or_default())
        .await
        .map_err(ApiError::Prediction)?;
    Ok(Json(PredictResponse {
        prediction: prediction.label.display_name(),
        confidence: prediction.rounded_confidence(),
        label: prediction.raw_label(),
    }))
}

/// Response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
}

async fn health<S>(State(service): State<Arc<S>>) -> Json<HealthResponse>
where
    S: PredictionApi,
{
    Json(HealthResponse {
        status: "healthy",
        model_loaded: service.health().ready,
    })
}

/// Return the prediction counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> impl IntoResponse
where
    S: PredictionApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery by tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "home",
                method: "GET",
                path: "/",
                description: "HTML page with the article form and current model status.",
                request_example: None,
            },
            CommandDescriptor {
                name: "predict_form",
                method: "POST",
                path: "/predict",
                description: "Classify the form field `news_text` and render the verdict as HTML.",
                request_example: Some(json!({ "news_text": "Full article text" })),
            },
            CommandDescriptor {
                name: "predict",
                method: "POST",
                path: "/api/predict",
                description: "Classify an article. Response returns { \"prediction\": \"Real News\" | \"Fake News\", \"confidence\": number, \"label\": 0 | 1 }.",
                request_example: Some(json!({ "text": "Full article text" })),
            },
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/health",
                description: "Report liveness and whether the model artifacts are loaded.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return prediction counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

enum ApiError {
    Prediction(PredictionError),
    MalformedBody(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Prediction(PredictionError::NotReady) => {
                (StatusCode::SERVICE_UNAVAILABLE, API_NOT_LOADED.to_string())
            }
            Self::Prediction(PredictionError::InvalidInput) => {
                (StatusCode::BAD_REQUEST, API_TOO_SHORT.to_string())
            }
            Self::Prediction(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            Self::MalformedBody(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::classifier::Label;
    use crate::metrics::MetricsSnapshot;
    use crate::serving::{
        ConfidenceSource, Health, MIN_TEXT_CHARS, Prediction, PredictionApi, PredictionError,
    };
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    #[tokio::test]
    async fn commands_catalog_exposes_predict_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let predict = commands
            .iter()
            .find(|cmd| cmd.name == "predict")
            .expect("predict command present");

        assert_eq!(predict.method, "POST");
        assert_eq!(predict.path, "/api/predict");
        assert!(commands.iter().any(|cmd| cmd.path == "/health"));
    }

    #[tokio::test]
    async fn api_predict_returns_verdict() {
        let service = Arc::new(StubPredictionService::ready(Ok(real_prediction())));
        let response = post_json(&service, json!({ "text": "Stocks rallied on strong earnings" })).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["prediction"], "Real News");
        assert_eq!(json["label"], 1);
        assert_eq!(json["confidence"], 91.24);

        let calls = service.recorded_calls().await;
        assert_eq!(calls, vec!["Stocks rallied on strong earnings".to_string()]);
    }

    #[tokio::test]
    async fn api_predict_rejects_short_or_missing_text() {
        let service = Arc::new(StubPredictionService::ready(Ok(real_prediction())));
        for payload in [json!({ "text": "short" }), json!({}), json!({ "text": null })] {
            let response = post_json(&service, payload).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let json = json_body(response).await;
            assert_eq!(
                json["error"],
                "Please provide valid news article text (at least 10 characters)"
            );
        }
    }

    #[tokio::test]
    async fn api_predict_reports_unloaded_model_first() {
        let service = Arc::new(StubPredictionService::not_ready());
        let response = post_raw(&service, "/api/predict", "application/json", "not json").await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = json_body(response).await;
        assert_eq!(json["error"], "Model not loaded. Please retrain the model.");
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn api_predict_maps_failures_to_500() {
        let service = Arc::new(StubPredictionService::ready(Ok(real_prediction())));
        let response = post_raw(&service, "/api/predict", "application/json", "{not json").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json_body(response).await["error"].is_string());

        let failing = Arc::new(StubPredictionService::ready(Err(PredictionError::Inference(
            "vectorizer exploded".into(),
        ))));
        let response = post_json(&failing, json!({ "text": "A long enough article" })).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "vectorizer exploded");
    }

    #[tokio::test]
    async fn form_predict_renders_verdict() {
        let service = Arc::new(StubPredictionService::ready(Ok(real_prediction())));
        let response = post_form(&service, "news_text=Stocks+rallied+on+strong+earnings").await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = text_body(response).await;
        assert!(html.contains("Real News"));
        assert!(html.contains("91.24%"));
    }

    #[tokio::test]
    async fn form_predict_always_answers_200_with_messages() {
        let not_ready = Arc::new(StubPredictionService::not_ready());
        let response = post_form(&not_ready, "news_text=Stocks+rallied+on+strong+earnings").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(text_body(response).await.contains(
            "Error: Model not loaded. Please retrain the model by running: cargo run --release --bin train"
        ));

        let service = Arc::new(StubPredictionService::ready(Ok(real_prediction())));
        let response = post_form(&service, "news_text=tiny").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(text_body(response).await.contains(
            "Error: Please enter a valid news article (at least 10 characters)"
        ));

        let response = post_form(&service, "other_field=value").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(text_body(response).await.contains("Error: Unable to process the article."));

        let failing = Arc::new(StubPredictionService::ready(Err(PredictionError::Inference(
            "boom".into(),
        ))));
        let response = post_form(&failing, "news_text=A+long+enough+article").await;
        assert!(text_body(response).await.contains("Error: Unable to process the article. boom"));
    }

    #[tokio::test]
    async fn health_reports_model_state() {
        for (service, loaded) in [
            (StubPredictionService::ready(Ok(real_prediction())), true),
            (StubPredictionService::not_ready(), false),
        ] {
            let response = create_router(Arc::new(service))
                .oneshot(
                    Request::builder()
                        .uri("/health")
                        .body(Body::empty())
                        .expect("request"),
                )
                .await
                .expect("router response");
            assert_eq!(response.status(), StatusCode::OK);
            let json = json_body(response).await;
            assert_eq!(json["status"], "healthy");
            assert_eq!(json["model_loaded"], loaded);
        }
    }

    #[tokio::test]
    async fn home_page_shows_form() {
        let response = create_router(Arc::new(StubPredictionService::not_ready()))
            .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
        let html = text_body(response).await;
        assert!(html.contains(r#"name="news_text""#));
        assert!(html.contains("NOT LOADED"));
    }

    fn real_prediction() -> Prediction {
        Prediction {
            label: Label::Real,
            confidence: 91.2381,
            source: ConfidenceSource::Probability,
        }
    }

    async fn post_json(service: &Arc<StubPredictionService>, payload: serde_json::Value) -> Response {
        post_raw(service, "/api/predict", "application/json", &payload.to_string()).await
    }

    async fn post_form(service: &Arc<StubPredictionService>, body: &str) -> Response {
        post_raw(service, "/predict", "application/x-www-form-urlencoded", body).await
    }

    async fn post_raw(
        service: &Arc<StubPredictionService>,
        uri: &str,
        content_type: &str,
        body: &str,
    ) -> Response {
        create_router(service.clone())
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(uri)
                    .header("content-type", content_type)
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response")
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    async fn text_body(response: Response) -> String {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        String::from_utf8(body.to_vec()).expect("utf-8 body")
    }

    /// Validates like the real service, then returns a canned outcome.
    struct StubPredictionService {
        ready: bool,
        outcome: Result<Prediction, PredictionError>,
        calls: Mutex<Vec<String>>,
    }

    impl StubPredictionService {
        fn ready(outcome: Result<Prediction, PredictionError>) -> Self {
            Self {
                ready: true,
                outcome,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn not_ready() -> Self {
            Self {
                ready: false,
                outcome: Err(PredictionError::NotReady),
                calls: Mutex::new(Vec::new()),
            }
        }

        async fn recorded_calls(&self) -> Vec<String> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl PredictionApi for StubPredictionService {
        async fn predict(&self, text: String) -> Result<Prediction, PredictionError> {
            if !self.ready {
                return Err(PredictionError::NotReady);
            }
            let too_short = text.trim().chars().count() < MIN_TEXT_CHARS;
            self.calls.lock().await.push(text);
            if too_short {
                return Err(PredictionError::InvalidInput);
            }
            self.outcome.clone()
        }

        fn health(&self) -> Health {
            Health { ready: self.ready }
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot::default()
        }
    }
}
