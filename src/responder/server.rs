//! Mock responder HTTP server

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{info, warn};

use super::MockResponder;
use crate::profile::FileSystemSource;
use crate::settings::Settings;
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Create the router serving the mock endpoint at `mock_path`
pub fn create_router(responder: Arc<MockResponder>, mock_path: &str) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(mock_path, get(mock_handler).post(mock_handler))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(responder)
}

async fn mock_handler(
    State(responder): State<Arc<MockResponder>>,
    Query(query): Query<TokenQuery>,
) -> Response {
    // A raw '+' in an unencoded query string arrives as a space
    let token = query.token.map(|t| t.replace(' ', "+"));
    let rendered = responder.respond(token.as_deref()).await;
    (rendered.status, rendered.body).into_response()
}

async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

/// Mock responder server
pub struct MockServer {
    settings: Settings,
    responder: Arc<MockResponder>,
    cancel: CancellationToken,
}

impl MockServer {
    /// Server reading profiles from the configured directory
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        let cancel = CancellationToken::new();
        let source = Arc::new(FileSystemSource::new(settings.profiles.directory.clone()));
        let responder = Arc::new(MockResponder::new(source).with_cancellation(cancel.clone()));
        Self {
            settings,
            responder,
            cancel,
        }
    }

    /// Serve a custom responder
    #[must_use]
    pub fn with_responder(settings: Settings, responder: MockResponder) -> Self {
        let cancel = CancellationToken::new();
        Self {
            settings,
            responder: Arc::new(responder.with_cancellation(cancel.clone())),
            cancel,
        }
    }

    /// Run until Ctrl+C or SIGTERM
    pub async fn run(self) -> Result<()> {
        let server = &self.settings.server;
        let addr = SocketAddr::new(
            server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            server.port,
        );

        let app = create_router(Arc::clone(&self.responder), &server.mock_path);
        let listener = TcpListener::bind(addr).await?;

        info!("============================================================");
        info!("DR. SQUID MOCK RESPONDER v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(host = %server.host, port = %server.port, "Listening");
        info!(
            directory = %self.settings.profiles.directory.display(),
            "Reading fault profiles"
        );
        info!("  GET|POST http://{}:{}{}?token=...", server.host, server.port, server.mock_path);
        info!("============================================================");

        let signal_cancel = self.cancel.clone();
        let mut serving = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_signal().await;
                    // Release responses sleeping on a configured delay
                    signal_cancel.cancel();
                })
                .await
        });

        tokio::select! {
            joined = &mut serving => return finished(joined),
            () = self.cancel.cancelled() => {}
        }

        match tokio::time::timeout(server.shutdown_timeout, serving).await {
            Ok(joined) => finished(joined)?,
            Err(_) => warn!(
                timeout = ?server.shutdown_timeout,
                "Graceful shutdown timed out, dropping open connections"
            ),
        }
        info!("Mock responder stopped");
        Ok(())
    }
}

fn finished(joined: std::result::Result<std::io::Result<()>, JoinError>) -> Result<()> {
    joined
        .map_err(|e| Error::Transport(format!("Server task failed: {e}")))?
        .map_err(Error::from)
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
