//! herald-gateway: HTTP control surface.
//!
//! Thin REST layer over the running system:
//! - `GET /status` — transport state
//! - `GET /qr` — pairing QR payload, if any
//! - `GET /groups` — group chats of the paired account
//! - `GET /config` / `POST /config` — read / partially update the
//!   broadcast config (multipart; may replace the media attachment)
//! - `POST /broadcast` — manual fire-and-forget trigger

pub mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tracing::info;

use herald_broadcast::BroadcastHandle;
use herald_config::BroadcastStore;
use herald_transport::Transport;

/// Shared gateway state.
pub struct GatewayState {
    pub transport: Arc<dyn Transport>,
    pub store: BroadcastStore,
    pub broadcaster: BroadcastHandle,
    /// Directory media uploads are written into.
    pub uploads_dir: PathBuf,
}

/// Build the control-surface router.
pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/status", get(routes::status))
        .route("/qr", get(routes::qr))
        .route("/groups", get(routes::groups))
        .route("/config", get(routes::get_config).post(routes::update_config))
        .route("/broadcast", post(routes::trigger_broadcast))
        .with_state(state)
}

/// Bind and serve the control surface. Runs until the server errors.
pub async fn start_gateway(
    host: &str,
    port: u16,
    state: Arc<GatewayState>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(state);
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    info!("Control surface listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
