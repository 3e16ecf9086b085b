//! Bridge HTTP API types (minimal subset).

use herald_types::{LinkState, MediaPayload, MessageId};
use serde::{Deserialize, Serialize};

/// Generic bridge API response wrapper.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(default)]
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Session snapshot returned by `GET /session`.
#[derive(Debug, Deserialize)]
pub struct SessionInfo {
    pub state: LinkState,
    /// QR payload to scan; present only while pairing.
    #[serde(default)]
    pub qr: Option<String>,
}

/// Request body for `POST /messages`.
#[derive(Debug, Serialize)]
pub struct SendMessageParams {
    pub to: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

/// Response body for `POST /messages`.
#[derive(Debug, Deserialize)]
pub struct SentMessage {
    pub message_id: MessageId,
}

/// Query parameters for `GET /events`.
#[derive(Debug, Serialize)]
pub struct EventsParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// One long-poll batch.
#[derive(Debug, Deserialize)]
pub struct EventBatch {
    pub cursor: u64,
    #[serde(default)]
    pub events: Vec<BridgeEvent>,
}

/// A single event reported by the bridge.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    /// A reaction landed on a previously sent message.
    Reaction {
        message_id: MessageId,
        emoji: String,
        sender: String,
        timestamp: i64,
    },
    /// The bridge session changed state.
    Session {
        state: LinkState,
        #[serde(default)]
        qr: Option<String>,
    },
    /// Event kinds this client does not consume.
    #[serde(other)]
    Unknown,
}
