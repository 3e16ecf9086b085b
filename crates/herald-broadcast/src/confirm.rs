//! Confirmation gate: single owner of the pending-confirmation state.
//!
//! Two concurrent call sites mutate that state — the scheduler tick
//! issuing a prompt and the reaction callback resolving one — so both
//! operations run under the gate's lock and the raw field is never
//! exposed. There is deliberately no timeout: an unresolved request
//! persists until it is superseded or acknowledged.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use herald_types::{
    MessageId, OutboundContent, ReactionEvent, SendOptions, TransportEvent, TriggerOrigin,
};
use herald_transport::Transport;

use crate::executor::BroadcastHandle;

/// Confirmation settings fixed at startup.
#[derive(Debug, Clone)]
pub struct GateSettings {
    /// Recipient of the confirmation prompt. Without one, requests are
    /// logged no-ops.
    pub approver: Option<String>,
    /// Reaction emoji that approves the pending broadcast.
    pub approve_emoji: String,
    /// Prompt text.
    pub prompt: String,
}

impl From<&herald_config::BroadcastSettings> for GateSettings {
    fn from(settings: &herald_config::BroadcastSettings) -> Self {
        Self {
            approver: settings.approver.clone(),
            approve_emoji: settings.approve_emoji.clone(),
            prompt: settings.prompt.clone(),
        }
    }
}

/// The one outstanding confirmation request, if any.
#[derive(Debug, Clone)]
struct PendingConfirmation {
    request_id: MessageId,
    issued_at: DateTime<Utc>,
}

/// Issues confirmation prompts and resolves them against inbound
/// reactions. At most one request is live; issuing a new one supersedes
/// the previous (last-writer-wins).
pub struct ConfirmationGate {
    transport: Arc<dyn Transport>,
    executor: BroadcastHandle,
    settings: GateSettings,
    pending: Mutex<Option<PendingConfirmation>>,
}

impl ConfirmationGate {
    pub fn new(
        transport: Arc<dyn Transport>,
        executor: BroadcastHandle,
        settings: GateSettings,
    ) -> Self {
        Self {
            transport,
            executor,
            settings,
            pending: Mutex::new(None),
        }
    }

    /// Send the confirmation prompt and record the returned message id as
    /// the new pending request, overwriting any prior one. A transport
    /// that is not ready, a missing approver, or a failed send all reduce
    /// to a logged no-op; a failed send leaves the previous pending
    /// request (still outstanding) in place.
    pub async fn request_confirmation(&self) {
        if !self.transport.ready() {
            warn!("Transport not ready, cannot send confirmation request");
            return;
        }
        let Some(approver) = &self.settings.approver else {
            warn!("No approver configured, cannot send confirmation request");
            return;
        };

        // Hold the lock across the send: issuing is atomic with respect
        // to resolution.
        let mut pending = self.pending.lock().await;
        let content = OutboundContent::text(self.settings.prompt.clone());
        match self
            .transport
            .send_message(approver, &content, &SendOptions::default())
            .await
        {
            Ok(id) => {
                if let Some(previous) = pending.as_ref() {
                    info!(
                        superseded = %previous.request_id,
                        outstanding_since = %previous.issued_at,
                        "Previous confirmation request superseded"
                    );
                }
                info!(message_id = %id, "Confirmation request sent");
                *pending = Some(PendingConfirmation {
                    request_id: id,
                    issued_at: Utc::now(),
                });
            }
            Err(e) => warn!("Failed to send confirmation request: {e}"),
        }
    }

    /// Resolve an inbound reaction against the pending request. A
    /// non-matching message id is stale or unrelated; a non-approve emoji
    /// on the matching message is ignored (there is no rejection path).
    /// On a match the pending state is cleared before dispatch, so a
    /// second reaction on the same message can never re-trigger.
    pub async fn handle_reaction(&self, event: &ReactionEvent) {
        let mut pending = self.pending.lock().await;
        let Some(current) = pending.as_ref() else {
            return;
        };
        if current.request_id != event.target_message_id {
            debug!(target = %event.target_message_id, "Ignoring reaction to unrelated message");
            return;
        }
        if event.emoji != self.settings.approve_emoji {
            debug!(emoji = %event.emoji, "Ignoring non-approve reaction");
            return;
        }

        *pending = None;
        drop(pending);

        info!(sender = %event.sender, "Broadcast confirmed");
        if let Err(e) = self.executor.submit(TriggerOrigin::Scheduled) {
            warn!("Confirmed broadcast rejected by executor: {e}");
        }
    }

    /// Id of the outstanding request, if any.
    pub async fn pending_request(&self) -> Option<MessageId> {
        self.pending
            .lock()
            .await
            .as_ref()
            .map(|p| p.request_id.clone())
    }
}

/// Drive the gate from the transport's event stream. Exits when the
/// stream closes.
pub async fn run_reaction_router(
    mut events: mpsc::Receiver<TransportEvent>,
    gate: Arc<ConfirmationGate>,
) {
    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::Reaction(reaction) => gate.handle_reaction(&reaction).await,
            TransportEvent::StateChanged(state) => info!(state = %state, "Transport state changed"),
        }
    }
    info!("Event stream closed, reaction router stopped");
}
