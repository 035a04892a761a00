//! REST implementation of [`RemoteEndpoint`].
//!
//! Mutations map onto `{base_url}/sync/{record_type}`: `create` is a POST,
//! `update` a PUT and `delete` a DELETE, each carrying the JSON payload.
//! The queue entry id travels in the `Idempotency-Key` header so the server
//! can discard redeliveries.

use crate::error::{RemoteError, SyncError, SyncResult};
use crate::remote::{RemoteEndpoint, RemoteMutation};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use sehat_types::SyncAction;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Header carrying the request identity.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";
/// Header carrying the affected record id.
pub const RECORD_ID_HEADER: &str = "X-Record-Id";

/// Configuration for [`HttpRemote`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRemoteConfig {
    /// Base URL of the sync API (e.g. `https://api.example.org`).
    pub base_url: String,
    /// Per-request timeout (ms).
    pub request_timeout_ms: u64,
    /// Optional bearer token.
    pub auth_token: Option<String>,
}

impl Default for HttpRemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout_ms: 30_000,
            auth_token: None,
        }
    }
}

/// Delivers mutations over HTTP.
pub struct HttpRemote {
    client: Client,
    config: HttpRemoteConfig,
}

impl HttpRemote {
    pub fn new(config: HttpRemoteConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpRemoteConfig {
        &self.config
    }

    fn url_for(&self, mutation: &RemoteMutation) -> String {
        format!(
            "{}/sync/{}",
            self.config.base_url.trim_end_matches('/'),
            mutation.record_type
        )
    }
}

#[async_trait]
impl RemoteEndpoint for HttpRemote {
    fn name(&self) -> &str {
        "http"
    }

    async fn deliver(&self, mutation: &RemoteMutation) -> Result<(), RemoteError> {
        let url = self.url_for(mutation);
        let request = match mutation.action {
            SyncAction::Create => self.client.post(&url),
            SyncAction::Update => self.client.put(&url),
            SyncAction::Delete => self.client.delete(&url),
        };
        let mut request = request
            .header(IDEMPOTENCY_HEADER, mutation.request_id.to_string())
            .header(RECORD_ID_HEADER, mutation.record_id.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(mutation.body.clone());
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RemoteError::Timeout
            } else {
                RemoteError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            debug!("{} {} accepted with {}", mutation.action, url, status);
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(RemoteError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
