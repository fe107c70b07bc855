use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{EntriesConfig, Settings};
use crate::files::LogDirectory;

/// State shared across all web request handlers
pub struct AppState {
    pub logs: LogDirectory,
    pub entries: EntriesConfig,
}

/// Create the axum router for the API
pub fn create_router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    Router::new()
        .merge(super::api::api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
}

/// Start the web server and run until SIGINT or SIGTERM.
///
/// In-flight requests get `shutdown_timeout` to finish before the remaining
/// connections are dropped.
pub async fn start_web_server(settings: &Settings) -> Result<()> {
    let log_dir = settings.log_dir();
    let logs = LogDirectory::new(&log_dir)
        .with_context(|| format!("Cannot serve log directory {}", log_dir.display()))?;
    let root = logs.root().to_path_buf();

    let state = Arc::new(AppState {
        logs,
        entries: settings.entries.clone(),
    });
    let app = create_router(state, settings.server.request_timeout());

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(addr = %addr, log_path = %root.display(), "Web server listening");

    let (stopping_tx, mut stopping_rx) = watch::channel(false);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = stopping_tx.send(true);
        })
        .into_future();
    tokio::pin!(server);

    let shutdown_timeout = settings.server.shutdown_timeout();
    let deadline = async {
        if stopping_rx.wait_for(|stopping| *stopping).await.is_err() {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = &mut server => {
            result.context("Web server error")?;
            tracing::info!("Graceful shutdown completed");
        }
        _ = deadline => {
            tracing::warn!(
                timeout_secs = shutdown_timeout.as_secs(),
                "Graceful shutdown timed out, closing remaining connections"
            );
        }
    }

    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Received shutdown signal");
}
