//! Binds and runs the HTTP tracker until interrupted.
use std::net::SocketAddr;
use std::sync::Arc;

use super::routes::router;
use super::AppState;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not bind to {addr}: {source}")]
    Bind { addr: SocketAddr, source: std::io::Error },

    #[error("server error: {source}")]
    Serve { source: std::io::Error },
}

/// Binds `addr` and serves the tracker until `ctrl_c`/`SIGTERM`.
///
/// # Errors
///
/// Returns [`Error::Bind`] if the address is already in use, or
/// [`Error::Serve`] if the server exits with an I/O error.
pub async fn run(state: Arc<AppState>, addr: SocketAddr) -> Result<(), Error> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Bind { addr, source })?;

    let local_addr = listener.local_addr().map_err(|source| Error::Bind { addr, source })?;
    tracing::info!(bind_address = %local_addr, "http tracker listening");

    axum::serve(listener, router(state).into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|source| Error::Serve { source })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
