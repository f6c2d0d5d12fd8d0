//! HTTP listener: upgrades worker connections to WebSocket sessions.
//!
//! Every accepted connection gets its own [`WorkerSession`] task. A session
//! ending, for any reason, never affects the listener or other sessions.
//!
//! [`WorkerSession`]: crate::dispatch::WorkerSession

mod ws;

pub use ws::WsChannel;

use crate::lease::LeaseConfig;
use crate::queue::WorkQueue;
use axum::Router;
use axum::routing::get;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared state handed to every connection.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<dyn WorkQueue>,
    pub lease: LeaseConfig,
}

/// Routes: `/ws` for workers, `/health` for liveness probes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Serve until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> crate::error::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "dispatcher listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("dispatcher stopped");
    Ok(())
}
