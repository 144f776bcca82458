//! HTTP transport abstraction for the metadata endpoint.
//!
//! The fetcher is generic over [`HttpTransport`] so tests can script
//! responses without a network. The production implementation wraps a
//! `reqwest::Client` configured with bearer auth and a per-request timeout.

use std::time::Duration;

use async_trait::async_trait;

use super::error::FetchError;

/// Airtable API root.
pub const API_ROOT: &str = "https://api.airtable.com/v0";

/// A raw HTTP response: status plus body text. Interpretation (JSON
/// parsing, status classification) is the fetcher's job.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Connection-level failures. Both kinds count as transient for retry
/// purposes.
#[derive(Debug, Clone)]
pub enum TransportError {
    /// The request exceeded the configured timeout.
    Timeout,
    /// DNS failure, refused connection, reset, or similar.
    Connect(String),
}

/// Issues a single authenticated GET against the metadata endpoint.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<TransportResponse, TransportError>;
}

/// Production transport backed by `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
    access_token: String,
    root: String,
}

impl ReqwestTransport {
    /// Build a transport with bearer authentication and a per-request
    /// timeout.
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            access_token: access_token.into(),
            root: API_ROOT.to_string(),
        })
    }

    /// Override the API root (used by integration tests pointed at a
    /// local server).
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<TransportResponse, TransportError> {
        let url = format!("{}{}", self.root, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Connect(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        Ok(TransportResponse { status, body })
    }
}
