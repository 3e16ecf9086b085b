//! Control-surface route handlers.

use std::path::Path;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use serde_json::{Value, json};
use tracing::warn;

use herald_config::ConfigError;
use herald_types::{BroadcastConfig, BroadcastConfigPatch, TriggerOrigin};

use crate::GatewayState;

/// GET /status — transport state, read-only.
pub async fn status(State(state): State<Arc<GatewayState>>) -> (StatusCode, Json<Value>) {
    let link = state.transport.state();
    (
        StatusCode::OK,
        Json(json!({ "state": link, "ready": link.is_ready() })),
    )
}

/// GET /qr — pairing QR payload; null unless pairing is in progress.
pub async fn qr(State(state): State<Arc<GatewayState>>) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "qr": state.transport.qr_code() })))
}

/// GET /groups — group chats of the paired account. An unpaired
/// transport yields an empty list, not an error.
pub async fn groups(State(state): State<Arc<GatewayState>>) -> (StatusCode, Json<Value>) {
    if !state.transport.ready() {
        return (StatusCode::OK, Json(json!([])));
    }
    match state.transport.list_groups().await {
        Ok(groups) => (StatusCode::OK, Json(json!(groups))),
        Err(e) => {
            warn!("Failed to fetch groups: {e}");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "failed to fetch groups" })),
            )
        }
    }
}

/// GET /config — the stored broadcast config.
pub async fn get_config(State(state): State<Arc<GatewayState>>) -> (StatusCode, Json<Value>) {
    match state.store.load() {
        Ok(config) => (StatusCode::OK, Json(json!(config))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}

/// POST /config — multipart partial update. The `data` field is a JSON
/// object merged field-wise over the stored config; an optional `media`
/// file part replaces the attachment.
pub async fn update_config(
    State(state): State<Arc<GatewayState>>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let mut patch = BroadcastConfigPatch::default();
    let mut upload: Option<(Option<String>, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("malformed multipart body: {e}") })),
                );
            }
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("data") => {
                let text = match field.text().await {
                    Ok(text) => text,
                    Err(e) => {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(json!({ "error": format!("unreadable data field: {e}") })),
                        );
                    }
                };
                patch = match serde_json::from_str(&text) {
                    Ok(patch) => patch,
                    Err(e) => {
                        return (
                            StatusCode::UNPROCESSABLE_ENTITY,
                            Json(json!({ "error": format!("invalid config: {e}") })),
                        );
                    }
                };
            }
            Some("media") => {
                let file_name = field.file_name().map(str::to_string);
                match field.bytes().await {
                    Ok(bytes) => upload = Some((file_name, bytes.to_vec())),
                    Err(e) => {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(json!({ "error": format!("unreadable media field: {e}") })),
                        );
                    }
                }
            }
            _ => {}
        }
    }

    match apply_config_update(&state, patch, upload) {
        Ok(config) => (
            StatusCode::OK,
            Json(json!({ "success": true, "config": config })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}

/// Merge a patch (and an optional media upload) over the stored config
/// and persist atomically. The upload keeps a fixed name so the config
/// keeps pointing at one well-known file.
fn apply_config_update(
    state: &GatewayState,
    patch: BroadcastConfigPatch,
    upload: Option<(Option<String>, Vec<u8>)>,
) -> Result<BroadcastConfig, ConfigError> {
    let mut config = state.store.load()?;
    config.apply(patch);

    if let Some((file_name, bytes)) = upload {
        std::fs::create_dir_all(&state.uploads_dir)?;
        let ext = file_name
            .as_deref()
            .and_then(|n| Path::new(n).extension())
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let path = state.uploads_dir.join(format!("broadcast_media.{ext}"));
        std::fs::write(&path, &bytes)?;
        config.media_path = Some(path);
    }

    state.store.save(&config)?;
    Ok(config)
}

/// POST /broadcast — manual fire-and-forget trigger. "Accepted", never
/// "completed".
pub async fn trigger_broadcast(State(state): State<Arc<GatewayState>>) -> (StatusCode, Json<Value>) {
    if !state.transport.ready() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "transport not ready" })),
        );
    }
    match state.broadcaster.submit(TriggerOrigin::Manual) {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({ "accepted": true }))),
        Err(e) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}
