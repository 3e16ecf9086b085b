//! In-memory transport for gate and executor tests.

use std::collections::HashSet;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::bail;

use herald_types::{GroupInfo, LinkState, MessageId, OutboundContent, SendOptions};
use herald_transport::Transport;

/// One recorded send.
#[derive(Debug, Clone)]
pub struct SentRecord {
    pub destination: String,
    pub content: OutboundContent,
    pub options: SendOptions,
    pub id: MessageId,
}

/// A [`Transport`] that records sends and can fail selected destinations.
pub struct RecordingTransport {
    state: RwLock<LinkState>,
    fail_destinations: RwLock<HashSet<String>>,
    sent: tokio::sync::Mutex<Vec<SentRecord>>,
    counter: AtomicU64,
}

impl RecordingTransport {
    pub fn ready() -> Self {
        Self::with_state(LinkState::Ready)
    }

    pub fn disconnected() -> Self {
        Self::with_state(LinkState::Disconnected)
    }

    fn with_state(state: LinkState) -> Self {
        Self {
            state: RwLock::new(state),
            fail_destinations: RwLock::new(HashSet::new()),
            sent: tokio::sync::Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// Make every send to `destination` fail.
    pub fn fail_on(&self, destination: &str) {
        self.fail_destinations
            .write()
            .unwrap()
            .insert(destination.to_string());
    }

    pub async fn sent(&self) -> Vec<SentRecord> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_destinations(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|r| r.destination.clone())
            .collect()
    }

    pub async fn last_id(&self) -> Option<MessageId> {
        self.sent.lock().await.last().map(|r| r.id.clone())
    }
}

#[async_trait::async_trait]
impl Transport for RecordingTransport {
    fn state(&self) -> LinkState {
        *self.state.read().unwrap()
    }

    async fn send_message(
        &self,
        destination: &str,
        content: &OutboundContent,
        options: &SendOptions,
    ) -> anyhow::Result<MessageId> {
        if self.fail_destinations.read().unwrap().contains(destination) {
            bail!("simulated send failure to {destination}");
        }
        let id = MessageId::from(format!(
            "msg-{}",
            self.counter.fetch_add(1, Ordering::SeqCst)
        ));
        self.sent.lock().await.push(SentRecord {
            destination: destination.to_string(),
            content: content.clone(),
            options: options.clone(),
            id: id.clone(),
        });
        Ok(id)
    }

    async fn list_groups(&self) -> anyhow::Result<Vec<GroupInfo>> {
        Ok(Vec::new())
    }

    fn qr_code(&self) -> Option<String> {
        None
    }
}
