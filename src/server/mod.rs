// src/server/mod.rs
// =============================================================================
// HTTP front end for the verification engine.
//
// Routes:
//   POST /links       - verify a list of links, returns statuses + batch ID
//   POST /links/list  - render a report over previously created batches
//   GET  /health      - liveness probe for orchestrators
//
// `run` wires everything together: builds the engine from the config,
// starts the background revalidator, serves until Ctrl+C/SIGTERM, then
// drains requests and stops the revalidator.
// =============================================================================

mod handlers;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::signal;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::engine::VerificationEngine;
use crate::error::Error;
use crate::revalidate::Revalidator;

pub use handlers::{LinksReportRequest, VerifyLinksRequest, VerifyLinksResponse};

/// How long we give the revalidator to accept its stop signal
const REVALIDATOR_SHUTDOWN_DEADLINE: Duration = Duration::from_secs(10);

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<VerificationEngine>,
    /// Cleared once shutdown starts; new requests then get 503
    pub accepting: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(engine: Arc<VerificationEngine>) -> Self {
        Self {
            engine,
            accepting: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }
}

/// Error type that implements IntoResponse
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn unavailable() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: "service is shutting down".to_string(),
        }
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::EmptyInput | Error::Decoding(_) => StatusCode::BAD_REQUEST,
            Error::BatchNotFound(_) => StatusCode::NOT_FOUND,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::Render(_) | Error::Configuration(_) | Error::ShutdownTimeout(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.message, "request failed");
        } else {
            warn!(status = %self.status, error = %self.message, "request rejected");
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Builds the router over an existing state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/links", post(handlers::verify_links))
        .route("/links/list", post(handlers::links_report))
        .route("/health", get(handlers::health_check))
        .with_state(state)
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}

/// Entry point for `link-vigil serve`
pub async fn run(config: Config) -> Result<()> {
    let engine = Arc::new(
        VerificationEngine::from_config(&config).context("failed to build verification engine")?,
    );

    let revalidator = Revalidator::spawn(
        Arc::clone(engine.cache()),
        Arc::clone(engine.prober()),
        config.revalidator_config(),
    );

    let state = AppState::new(Arc::clone(&engine));
    let accepting = Arc::clone(&state.accepting);
    let app = router(state);

    let addr = config.server.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(
        cache_size = config.storage.cache_size,
        revalidate_interval_secs = config.checker.revalidate_interval_secs,
        "link-vigil listening on http://{}",
        addr
    );
    info!("  POST http://{}/links      - verify links", addr);
    info!("  POST http://{}/links/list - report on batches", addr);
    info!("  GET  http://{}/health     - health check", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            accepting.store(false, Ordering::SeqCst);
        })
        .await
        .context("Server error")?;

    info!("Server is down");

    match revalidator.shutdown(REVALIDATOR_SHUTDOWN_DEADLINE).await {
        Ok(()) => {
            revalidator.join().await;
            info!("Revalidator is down");
        }
        Err(e) => error!(error = %e, "revalidator did not stop cleanly"),
    }

    Ok(())
}
