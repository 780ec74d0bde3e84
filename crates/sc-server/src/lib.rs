//! sc-server: the HTTP surface of shardcast.
//!
//! Serves the assembled output of finished transcoding jobs at
//! `/download/{id}`, reading chunk bytes from the content-addressable store
//! through [`sc_stream`]:
//!
//! - [`router`]: routes plus request-id, CORS, and trace layers
//! - [`range_writer`]: status/header strategy and body for each response mode
//! - [`error`]: JSON error responses
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod middleware;
pub mod range_writer;
pub mod router;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use sc_core::config::Config;
use sc_stream::GatewayFetcher;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;

/// Start the shardcast server.
///
/// Opens the database, connects the gateway fetcher, and serves until a
/// shutdown signal arrives.
pub async fn start(config: Config) -> sc_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let db_path = &config.server.db_path;
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            tracing::info!("Created database directory {}", parent.display());
        }
    }
    let db_str = db_path.to_string_lossy();
    let db = sc_db::pool::init_pool(&db_str)?;
    tracing::info!("Database opened at {db_str}");

    let fetcher = Arc::new(GatewayFetcher::new(&config.gateway));
    tracing::info!(
        gateway = %config.gateway.url,
        prefix = %config.gateway.path_prefix,
        "Chunk store gateway configured"
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| sc_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| sc_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    let ctx = AppContext::new(db, config, fetcher);
    tracing::info!("Starting server on {addr}");
    serve(listener, ctx).await
}

/// Serve the router on an already bound listener until shutdown.
///
/// Cancelling `ctx.shutdown` stops the server and every in-flight fetch.
pub async fn serve(listener: TcpListener, ctx: AppContext) -> sc_core::Result<()> {
    let shutdown = ctx.shutdown.clone();
    let app = router::build_router(ctx);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for SIGINT, SIGTERM, or cancellation of `cancel`, then cancel it.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
    cancel.cancel();
}
