//! Bridge long-poll event pump.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use herald_types::{LinkState, ReactionEvent, TransportEvent};

use crate::SharedLink;
use crate::api::BridgeApi;
use crate::types::{BridgeEvent, EventsParams};

/// Run the long-poll loop, converting bridge events to [`TransportEvent`]s
/// and keeping the shared link state current.
///
/// Exits when `cancel` is cancelled or the `sender` is closed.
pub async fn run_event_pump(
    api: &BridgeApi,
    shared: Arc<SharedLink>,
    sender: mpsc::Sender<TransportEvent>,
    cancel: CancellationToken,
) {
    let mut cursor: Option<u64> = None;
    let mut backoff = Duration::from_secs(1);
    let max_backoff = Duration::from_secs(30);
    // After startup or an outage the session snapshot must be re-fetched;
    // the next event batch is not guaranteed to carry a session event.
    let mut resync = true;

    info!("Bridge event pump started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        if resync {
            match api.session().await {
                Ok(session) => {
                    resync = false;
                    let changed = shared.update(session.state, session.qr);
                    if changed
                        && sender
                            .send(TransportEvent::StateChanged(session.state))
                            .await
                            .is_err()
                    {
                        info!("Event channel closed, stopping pump");
                        return;
                    }
                }
                Err(e) => {
                    warn!(backoff_secs = backoff.as_secs(), "session resync failed: {e}");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {},
                    }
                    backoff = (backoff * 2).min(max_backoff);
                    continue;
                }
            }
        }

        let params = EventsParams {
            cursor,
            timeout_secs: Some(30),
        };

        let batch = tokio::select! {
            _ = cancel.cancelled() => break,
            result = api.events(&params) => result,
        };

        match batch {
            Ok(batch) => {
                backoff = Duration::from_secs(1);
                cursor = Some(batch.cursor);

                for event in batch.events {
                    let outbound = match event {
                        BridgeEvent::Reaction {
                            message_id,
                            emoji,
                            sender: reactor,
                            timestamp,
                        } => {
                            debug!(message_id = %message_id, emoji, "Forwarding reaction");
                            TransportEvent::Reaction(ReactionEvent {
                                target_message_id: message_id,
                                emoji,
                                sender: reactor,
                                timestamp,
                            })
                        }
                        BridgeEvent::Session { state, qr } => {
                            if !shared.update(state, qr) {
                                continue;
                            }
                            info!(state = %state, "Bridge session state changed");
                            TransportEvent::StateChanged(state)
                        }
                        BridgeEvent::Unknown => continue,
                    };

                    if sender.send(outbound).await.is_err() {
                        info!("Event channel closed, stopping pump");
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(backoff_secs = backoff.as_secs(), "events poll error: {e}");

                // Conservative readiness: an unreachable bridge cannot send.
                if shared.update(LinkState::Disconnected, None) {
                    if sender
                        .send(TransportEvent::StateChanged(LinkState::Disconnected))
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
                resync = true;

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {},
                }

                backoff = (backoff * 2).min(max_backoff);
            }
        }
    }

    info!("Bridge event pump stopped");
}
