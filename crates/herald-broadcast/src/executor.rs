//! Broadcast fan-out executor.
//!
//! One worker owns every run. Scheduled (confirmed) and manual triggers
//! both submit through [`BroadcastHandle`], so overlapping starts are
//! serialized rather than racing: the bounded queue holds the active run
//! plus at most one follow-up, and saturation is rejected with
//! [`BroadcastBusy`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use herald_config::BroadcastStore;
use herald_types::{MediaPayload, OutboundContent, SendOptions, TriggerOrigin};
use herald_transport::Transport;

/// The executor queue is saturated: a run is active and one is queued.
#[derive(Debug, thiserror::Error)]
#[error("a broadcast is already running and one is queued")]
pub struct BroadcastBusy;

/// Submission handle for the executor worker. Fire-and-forget: a
/// successful submit means "accepted", never "completed".
#[derive(Clone)]
pub struct BroadcastHandle {
    pub(crate) tx: mpsc::Sender<TriggerOrigin>,
}

impl BroadcastHandle {
    pub fn submit(&self, origin: TriggerOrigin) -> Result<(), BroadcastBusy> {
        self.tx.try_send(origin).map_err(|_| BroadcastBusy)
    }
}

/// Fan-out settings fixed at startup.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// The distinguished status/story destination.
    pub status_destination: String,
    /// Background color for a text-only status post.
    pub status_background: String,
    /// Delay between destination sends.
    pub pacing: Duration,
}

impl From<&herald_config::BroadcastSettings> for ExecutorSettings {
    fn from(settings: &herald_config::BroadcastSettings) -> Self {
        Self {
            status_destination: settings.status_destination.clone(),
            status_background: settings.status_background.clone(),
            pacing: settings.pacing(),
        }
    }
}

/// Runs one broadcast at a time: load config fresh, resolve media, fan
/// out to every destination, then post to status.
pub struct BroadcastExecutor {
    transport: Arc<dyn Transport>,
    store: BroadcastStore,
    settings: ExecutorSettings,
}

impl BroadcastExecutor {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: BroadcastStore,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            transport,
            store,
            settings,
        }
    }

    /// Spawn the worker task; returns the submission handle.
    pub fn spawn(self) -> (BroadcastHandle, JoinHandle<()>) {
        // Capacity 1: the active run plus at most one queued submission.
        let (tx, mut rx) = mpsc::channel(1);
        let handle = tokio::spawn(async move {
            info!("Broadcast worker started");
            while let Some(origin) = rx.recv().await {
                self.run_broadcast(origin).await;
            }
            info!("Broadcast worker stopped");
        });
        (BroadcastHandle { tx }, handle)
    }

    /// Execute one full run. Per-destination failures are logged and
    /// skipped; the status send is isolated from the group loop. Nothing
    /// is returned to the trigger.
    pub async fn run_broadcast(&self, origin: TriggerOrigin) {
        let config = match self.store.load() {
            Ok(config) => config,
            Err(e) => {
                error!(origin = %origin, "Aborting broadcast, cannot load config: {e}");
                return;
            }
        };

        let media = config.media_path.as_deref().and_then(|path| {
            if !path.exists() {
                warn!(path = %path.display(), "Media file missing, sending text-only");
                return None;
            }
            match MediaPayload::from_file(path) {
                Ok(media) => Some(media),
                Err(e) => {
                    warn!(path = %path.display(), "Failed to read media, sending text-only: {e}");
                    None
                }
            }
        });

        let content = OutboundContent {
            text: config.message.clone(),
            media,
        };

        info!(
            origin = %origin,
            destinations = config.destinations.len(),
            media = content.media.is_some(),
            "Starting broadcast"
        );

        let mut delivered = 0usize;
        for destination in &config.destinations {
            match self
                .transport
                .send_message(destination, &content, &SendOptions::default())
                .await
            {
                Ok(id) => {
                    info!(destination, message_id = %id, "Sent");
                    delivered += 1;
                }
                Err(e) => warn!(destination, "Failed to send: {e}"),
            }
            // Pacing between sends reduces anti-spam detection risk.
            tokio::time::sleep(self.settings.pacing).await;
        }

        // Text-only status posts need a background color; media posts
        // carry their own visual.
        let status_options = if content.media.is_none() {
            SendOptions {
                background_color: Some(self.settings.status_background.clone()),
            }
        } else {
            SendOptions::default()
        };
        match self
            .transport
            .send_message(&self.settings.status_destination, &content, &status_options)
            .await
        {
            Ok(id) => info!(message_id = %id, "Posted to status"),
            Err(e) => warn!(
                destination = %self.settings.status_destination,
                "Failed to post to status: {e}"
            ),
        }

        info!(
            origin = %origin,
            delivered,
            total = config.destinations.len(),
            "Broadcast finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingTransport;
    use herald_types::BroadcastConfig;

    fn settings() -> ExecutorSettings {
        ExecutorSettings::from(&herald_config::BroadcastSettings::default())
    }

    fn store_with(dir: &std::path::Path, config: &BroadcastConfig) -> BroadcastStore {
        let store = BroadcastStore::in_dir(dir);
        store.save(config).unwrap();
        store
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_destination_does_not_block_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BroadcastConfig::default();
        config.destinations = vec!["a@g.us".into(), "b@g.us".into(), "c@g.us".into()];
        let store = store_with(dir.path(), &config);

        let transport = Arc::new(RecordingTransport::ready());
        transport.fail_on("b@g.us");

        let executor = BroadcastExecutor::new(transport.clone(), store, settings());
        executor.run_broadcast(TriggerOrigin::Manual).await;

        assert_eq!(
            transport.sent_destinations().await,
            vec![
                "a@g.us".to_string(),
                "c@g.us".to_string(),
                "status@broadcast".to_string()
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_media_falls_back_to_text_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BroadcastConfig::default();
        config.destinations = vec!["a@g.us".into()];
        config.media_path = Some(dir.path().join("gone.png"));
        let store = store_with(dir.path(), &config);

        let transport = Arc::new(RecordingTransport::ready());
        let executor = BroadcastExecutor::new(transport.clone(), store, settings());
        executor.run_broadcast(TriggerOrigin::Scheduled).await;

        let sent = transport.sent().await;
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|r| r.content.media.is_none()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_media_attached_when_file_exists() {
        let dir = tempfile::tempdir().unwrap();
        let media_path = dir.path().join("pic.png");
        std::fs::write(&media_path, b"\x89PNG fake").unwrap();

        let mut config = BroadcastConfig::default();
        config.destinations = vec!["a@g.us".into()];
        config.media_path = Some(media_path);
        let store = store_with(dir.path(), &config);

        let transport = Arc::new(RecordingTransport::ready());
        let executor = BroadcastExecutor::new(transport.clone(), store, settings());
        executor.run_broadcast(TriggerOrigin::Manual).await;

        let sent = transport.sent().await;
        let media = sent[0].content.media.as_ref().expect("media attached");
        assert_eq!(media.mime_type, "image/png");
        // A media status post needs no background color.
        let status = sent.last().unwrap();
        assert_eq!(status.destination, "status@broadcast");
        assert!(status.options.background_color.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_only_status_carries_background_color() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(dir.path(), &BroadcastConfig::default());

        let transport = Arc::new(RecordingTransport::ready());
        let executor = BroadcastExecutor::new(transport.clone(), store, settings());
        executor.run_broadcast(TriggerOrigin::Manual).await;

        let sent = transport.sent().await;
        assert_eq!(sent.len(), 1); // no destinations configured
        assert_eq!(sent[0].destination, "status@broadcast");
        assert_eq!(sent[0].options.background_color.as_deref(), Some("#FF0000"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_send_attempted_even_if_every_group_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BroadcastConfig::default();
        config.destinations = vec!["a@g.us".into(), "b@g.us".into()];
        let store = store_with(dir.path(), &config);

        let transport = Arc::new(RecordingTransport::ready());
        transport.fail_on("a@g.us");
        transport.fail_on("b@g.us");

        let executor = BroadcastExecutor::new(transport.clone(), store, settings());
        executor.run_broadcast(TriggerOrigin::Scheduled).await;

        assert_eq!(
            transport.sent_destinations().await,
            vec!["status@broadcast".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_is_read_at_run_time_not_trigger_time() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BroadcastConfig::default();
        config.message = "stale".into();
        config.destinations = vec!["a@g.us".into()];
        let store = store_with(dir.path(), &config);

        let transport = Arc::new(RecordingTransport::ready());
        let executor = BroadcastExecutor::new(transport.clone(), store.clone(), settings());

        // Edited after the trigger decision, before the run.
        config.message = "fresh".into();
        store.save(&config).unwrap();

        executor.run_broadcast(TriggerOrigin::Scheduled).await;
        assert_eq!(transport.sent().await[0].content.text, "fresh");
    }

    #[tokio::test(start_paused = true)]
    async fn test_corrupt_config_aborts_run_without_sends() {
        let dir = tempfile::tempdir().unwrap();
        let store = BroadcastStore::in_dir(dir.path());
        std::fs::write(store.path(), "{ nope").unwrap();

        let transport = Arc::new(RecordingTransport::ready());
        let executor = BroadcastExecutor::new(transport.clone(), store, settings());
        executor.run_broadcast(TriggerOrigin::Manual).await;

        assert!(transport.sent().await.is_empty());
    }

    #[test]
    fn test_submit_rejected_when_saturated() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = BroadcastHandle { tx };

        handle.submit(TriggerOrigin::Manual).unwrap();
        assert!(handle.submit(TriggerOrigin::Manual).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_drains_submissions() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BroadcastConfig::default();
        config.destinations = vec!["a@g.us".into()];
        let store = store_with(dir.path(), &config);

        let transport = Arc::new(RecordingTransport::ready());
        let executor = BroadcastExecutor::new(transport.clone(), store, settings());
        let (handle, worker) = executor.spawn();

        handle.submit(TriggerOrigin::Manual).unwrap();
        drop(handle); // close the queue so the worker exits after draining
        worker.await.unwrap();

        assert_eq!(
            transport.sent_destinations().await,
            vec!["a@g.us".to_string(), "status@broadcast".to_string()]
        );
    }
}
