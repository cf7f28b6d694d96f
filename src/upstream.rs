//! Upstream football statistics source
//!
//! The coordinator only needs "give me the raw JSON for this key". The HTTP
//! client below is the production implementation; tests substitute closures
//! or in-memory sources.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::key::{escape_part, EntityKey, EntityType};

/// Errors that can occur when fetching from the upstream provider
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("Upstream returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// The request did not complete in time
    #[error("Upstream request timed out")]
    Timeout,

    /// Any other fetch failure
    #[error("{0}")]
    Other(String),
}

/// A source of raw upstream payloads
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    /// Fetches the raw payload for `key`
    async fn fetch(&self, key: &EntityKey) -> Result<Value, UpstreamError>;
}

/// Returns the request path for a key, relative to the API base URL
pub fn request_path(key: &EntityKey) -> String {
    let parts: Vec<String> = key.parts().iter().map(|p| escape_part(p)).collect();
    match key.entity() {
        EntityType::Squad => format!("squads/teams/{}", parts[0]),
        EntityType::TeamStats => format!("teams/{}/statistics/{}", parts[0], parts[1]),
        EntityType::MatchStats => format!("fixtures/{}/statistics", parts[0]),
        EntityType::Standings => format!("standings/leagues/{}", parts[0]),
        EntityType::Fixtures => format!("fixtures/leagues/{}", parts[0]),
        EntityType::Commentary => format!("commentaries/fixtures/{}", parts[0]),
    }
}

/// Fetches payloads over HTTP from the football statistics API
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpUpstream {
    /// Creates a client with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates an HttpUpstream with a custom HTTP client
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: None,
        }
    }

    /// Sends `token` in the `Authorization` header
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Full URL for a key
    pub fn url_for(&self, key: &EntityKey) -> String {
        format!("{}/{}", self.base_url, request_path(key))
    }
}

#[async_trait]
impl UpstreamSource for HttpUpstream {
    async fn fetch(&self, key: &EntityKey) -> Result<Value, UpstreamError> {
        let url = self.url_for(key);
        debug!(key = %key, url = %url, "fetching from upstream");

        let mut request = self.client.get(&url);
        if let Some(ref token) = self.api_token {
            request = request.header(reqwest::header::AUTHORIZATION, token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout
            } else {
                UpstreamError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                url,
            });
        }

        Ok(response.json::<Value>().await?)
    }
}
