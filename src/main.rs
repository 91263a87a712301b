use rustynews::serving::{ArtifactPaths, PredictionService, ServingContext};
use rustynews::{api, config, logging};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!(error = %err, "Server exited with an error");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = config::init_config()?;
    logging::init_tracing();
    let paths = ArtifactPaths {
        model: config.model_path.clone(),
        vectorizer: config.vectorizer_path.clone(),
    };
    let context = ServingContext::load(&paths, config.fallback_confidence);
    if context.is_ready() {
        tracing::info!("Model status: READY");
    } else {
        tracing::warn!(
            reason = context.not_ready_reason().unwrap_or("unknown"),
            "Model status: NOT LOADED. Train it with `cargo run --release --bin train`; predictions are refused until then"
        );
    }

    let service = PredictionService::new(
        context,
        Duration::from_millis(config.prediction_timeout_ms),
    );
    let app = api::create_router(Arc::new(service));

    let (listener, port) = bind_listener().await?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn bind_listener() -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    let config = config::get_config();
    if let Some(port) = config.server_port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 5000..=5099;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 5000-5099",
    ))
}
