//! HTTP server
//!
//! Exposes the classifier over two routes:
//!
//! - `GET /` — liveness message
//! - `POST /predict` — multipart upload (field `file`) → label + confidence

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use state::AppState;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::application::predict_use_case::PredictUseCase;
use crate::domain::traits::WeightsStatus;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_size: 20 * 1024 * 1024, // 20MB
        }
    }
}

/// Serve `predictor` until ctrl+c. The model must already be loaded.
pub async fn run_server(config: ServerConfig, predictor: PredictUseCase) -> anyhow::Result<()> {
    match predictor.weights_status() {
        WeightsStatus::Loaded { path } => {
            info!(weights = %path.display(), "Serving trained weights");
        }
        WeightsStatus::Random { reason } => {
            warn!(%reason, "Serving predictions from RANDOM weights");
        }
    }

    let state = Arc::new(AppState::new(predictor));
    let app = create_router(Arc::clone(&state), &config);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Cannot bind {}:{}", config.host, config.port))?;
    let addr = listener.local_addr()?;
    info!(
        address = %addr,
        max_upload_size_mb = config.max_upload_size / 1024 / 1024,
        pid = std::process::id(),
        "Server listening and ready to accept connections"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    drop(state);
    info!("Server shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, stopping server gracefully"),
        Err(e) => {
            // Without a signal handler the server simply runs until killed.
            warn!(error = %e, "Cannot install ctrl+c handler");
            std::future::pending::<()>().await;
        }
    }
}
