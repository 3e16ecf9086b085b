//! herald-transport: the messaging transport boundary.
//!
//! The actual WhatsApp-web session lives in an external bridge daemon
//! (pairing, session persistence, protocol). This crate defines the
//! [`Transport`] trait the core works against and ships
//! [`BridgeTransport`], a thin HTTP client for that daemon.
//!
//! # Architecture
//!
//! ```text
//! Bridge daemon (owns the WhatsApp session)
//!     ↓ (REST + long-poll)
//! BridgeTransport::spawn_event_pump()
//!     ↓ (TransportEvent via mpsc)
//! confirmation gate / state watchers
//! ```

pub mod api;
pub mod events;
pub mod types;

use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use herald_types::{GroupInfo, LinkState, MessageId, OutboundContent, SendOptions, TransportEvent};

use api::BridgeApi;
use types::SendMessageParams;

/// Trait for the messaging transport the scheduler, gate, and executor
/// work against.
///
/// Use `&self` for all methods — implementations keep mutable session
/// state behind interior mutability, updated by their event pump.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Current session state.
    fn state(&self) -> LinkState;

    /// Whether messages can be sent right now.
    fn ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Send one message; returns the transport-assigned id. Callers must
    /// treat failure as per-call — one failed send says nothing about the
    /// next destination.
    async fn send_message(
        &self,
        destination: &str,
        content: &OutboundContent,
        options: &SendOptions,
    ) -> anyhow::Result<MessageId>;

    /// List the group chats of the paired account.
    async fn list_groups(&self) -> anyhow::Result<Vec<GroupInfo>>;

    /// QR payload to scan; `None` unless pairing is in progress.
    fn qr_code(&self) -> Option<String>;
}

/// Link state shared between the event pump and `Transport` readers.
pub struct SharedLink {
    state: RwLock<LinkState>,
    qr: RwLock<Option<String>>,
}

impl SharedLink {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LinkState::Disconnected),
            qr: RwLock::new(None),
        }
    }

    /// Record a session snapshot. Returns true when the state changed.
    /// The QR payload is only meaningful while the session is pairing;
    /// outside that window any stored QR is stale and dropped.
    pub fn update(&self, state: LinkState, qr: Option<String>) -> bool {
        let changed = {
            let mut current = self.state.write().expect("link state lock poisoned");
            let changed = *current != state;
            *current = state;
            changed
        };

        let mut stored = self.qr.write().expect("qr lock poisoned");
        match state {
            LinkState::Initializing | LinkState::AwaitingPairing => {
                if let Some(qr) = qr {
                    *stored = Some(qr);
                }
            }
            LinkState::Ready | LinkState::Disconnected => *stored = None,
        }

        changed
    }

    pub fn state(&self) -> LinkState {
        *self.state.read().expect("link state lock poisoned")
    }

    pub fn qr(&self) -> Option<String> {
        self.qr.read().expect("qr lock poisoned").clone()
    }
}

impl Default for SharedLink {
    fn default() -> Self {
        Self::new()
    }
}

/// [`Transport`] implementation backed by the bridge daemon.
pub struct BridgeTransport {
    api: Arc<BridgeApi>,
    shared: Arc<SharedLink>,
}

impl BridgeTransport {
    pub fn new(base_url: &str, auth_token: Option<String>) -> Self {
        Self {
            api: Arc::new(BridgeApi::new(base_url, auth_token)),
            shared: Arc::new(SharedLink::new()),
        }
    }

    /// Spawn the long-poll event pump feeding `sender`.
    pub fn spawn_event_pump(
        &self,
        sender: mpsc::Sender<TransportEvent>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let api = self.api.clone();
        let shared = self.shared.clone();
        tokio::spawn(async move {
            events::run_event_pump(&api, shared, sender, cancel).await;
        })
    }
}

#[async_trait::async_trait]
impl Transport for BridgeTransport {
    fn state(&self) -> LinkState {
        self.shared.state()
    }

    async fn send_message(
        &self,
        destination: &str,
        content: &OutboundContent,
        options: &SendOptions,
    ) -> anyhow::Result<MessageId> {
        let params = SendMessageParams {
            to: destination.to_string(),
            text: content.text.clone(),
            media: content.media.clone(),
            background_color: options.background_color.clone(),
        };
        let sent = self.api.send_message(&params).await?;
        Ok(sent.message_id)
    }

    async fn list_groups(&self) -> anyhow::Result<Vec<GroupInfo>> {
        self.api.groups().await
    }

    fn qr_code(&self) -> Option<String> {
        self.shared.qr()
    }
}
