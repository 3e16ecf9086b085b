//! Bridge HTTP client.
//!
//! The bridge daemon owns the WhatsApp-web session (pairing, persistence,
//! protocol); this client only wraps its REST surface.

use std::time::Duration;

use anyhow::{Context, bail};
use reqwest::Client;

use herald_types::GroupInfo;

use crate::types::{ApiResponse, EventBatch, EventsParams, SendMessageParams, SentMessage, SessionInfo};

/// HTTP client for the bridge API.
pub struct BridgeApi {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl BridgeApi {
    /// Create a new API client for the given bridge base URL.
    pub fn new(base_url: &str, auth_token: Option<String>) -> Self {
        // Client timeout must outlast the long-poll window (30s).
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .expect("failed to build reqwest client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.get(format!("{}{path}", self.base_url)))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.post(format!("{}{path}", self.base_url)))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Current session state and, while pairing, the QR payload.
    pub async fn session(&self) -> anyhow::Result<SessionInfo> {
        let resp: ApiResponse<SessionInfo> = self
            .get("/session")
            .send()
            .await
            .context("session request failed")?
            .json()
            .await
            .context("session response parse failed")?;

        if !resp.ok {
            bail!(
                "session failed: {}",
                resp.description.unwrap_or_else(|| "unknown error".into())
            );
        }
        resp.result.context("session returned no result")
    }

    /// Send a message; returns the transport-assigned message id.
    pub async fn send_message(&self, params: &SendMessageParams) -> anyhow::Result<SentMessage> {
        let resp: ApiResponse<SentMessage> = self
            .post("/messages")
            .json(params)
            .send()
            .await
            .context("send request failed")?
            .json()
            .await
            .context("send response parse failed")?;

        if !resp.ok {
            bail!(
                "send failed: {}",
                resp.description.unwrap_or_else(|| "unknown error".into())
            );
        }
        resp.result.context("send returned no result")
    }

    /// List the group chats of the paired account.
    pub async fn groups(&self) -> anyhow::Result<Vec<GroupInfo>> {
        let resp: ApiResponse<Vec<GroupInfo>> = self
            .get("/groups")
            .send()
            .await
            .context("groups request failed")?
            .json()
            .await
            .context("groups response parse failed")?;

        if !resp.ok {
            bail!(
                "groups failed: {}",
                resp.description.unwrap_or_else(|| "unknown error".into())
            );
        }
        Ok(resp.result.unwrap_or_default())
    }

    /// Long-poll for events after `cursor`.
    pub async fn events(&self, params: &EventsParams) -> anyhow::Result<EventBatch> {
        let resp: ApiResponse<EventBatch> = self
            .get("/events")
            .query(params)
            .send()
            .await
            .context("events request failed")?
            .json()
            .await
            .context("events response parse failed")?;

        if !resp.ok {
            bail!(
                "events failed: {}",
                resp.description.unwrap_or_else(|| "unknown error".into())
            );
        }
        resp.result.context("events returned no result")
    }
}
