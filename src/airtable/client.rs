//! Client for retrieving Airtable base schemas.
//!
//! The fetcher paginates through the metadata endpoint, retries transient
//! failures with exponential backoff, and validates every page's shape
//! before accepting it. It holds no state between calls; each
//! [`SchemaFetcher::fetch_base_schema`] invocation owns its own
//! accumulation buffer, so independent base analyses can run concurrently.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::error::{FetchError, FetchResult};
use super::transport::{HttpTransport, ReqwestTransport, TransportError};
use super::types::{RawSchema, RawTable};
use crate::config::AirtableSettings;

/// Upper bound on a single backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Client responsible for retrieving Airtable metadata.
pub struct SchemaFetcher<T: HttpTransport> {
    transport: T,
    max_retry_attempts: u32,
    initial_backoff: Duration,
}

impl SchemaFetcher<ReqwestTransport> {
    /// Build a production fetcher from settings.
    ///
    /// The access token must already be resolved; see
    /// [`crate::config::AirtableSettings::resolved_access_token`].
    pub fn from_settings(settings: &AirtableSettings, access_token: &str) -> FetchResult<Self> {
        let transport = ReqwestTransport::new(
            access_token,
            Duration::from_secs(settings.timeout_seconds),
        )?;
        Ok(Self::new(
            transport,
            settings.max_retry_attempts,
            Duration::from_secs_f64(settings.initial_backoff_seconds),
        ))
    }
}

impl<T: HttpTransport> SchemaFetcher<T> {
    /// Create a fetcher over an arbitrary transport.
    pub fn new(transport: T, max_retry_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            transport,
            max_retry_attempts,
            initial_backoff,
        }
    }

    /// Access the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Retrieve the full base schema, including tables, fields, and views.
    ///
    /// # Errors
    ///
    /// * [`FetchError::Auth`] - credentials rejected (never retried)
    /// * [`FetchError::NotFound`] - unknown base id (never retried)
    /// * [`FetchError::RateLimitExceeded`] - rate limited on every attempt
    /// * [`FetchError::RetriesExhausted`] - other transient failure persisted
    /// * [`FetchError::Validation`] - response shape mismatch (never retried)
    pub async fn fetch_base_schema(&self, base_id: &str) -> FetchResult<RawSchema> {
        tracing::info!(base_id, "fetching airtable base schema");

        let info = self.fetch_base_info(base_id).await?;
        let tables: Vec<RawTable> = self
            .fetch_paginated(&format!("/meta/bases/{}/tables", base_id), "tables")
            .await?;

        let id = info.id.unwrap_or_else(|| base_id.to_string());
        let name = info.name.unwrap_or_else(|| id.clone());

        tracing::info!(
            base_id = %id,
            tables = tables.len(),
            "base schema fetched"
        );

        Ok(RawSchema { id, name, tables })
    }

    async fn fetch_base_info(&self, base_id: &str) -> FetchResult<BaseInfo> {
        let body = self.request(&format!("/meta/bases/{}", base_id), &[]).await?;
        // Some deployments wrap the payload in a "base" envelope.
        let inner = body.get("base").cloned().unwrap_or(body);
        serde_json::from_value(inner)
            .map_err(|e| FetchError::Validation(format!("malformed base information: {}", e)))
    }

    /// Follow the opaque `offset` cursor until the server signals the last
    /// page, accumulating every record under `collection_key`.
    async fn fetch_paginated<R: DeserializeOwned>(
        &self,
        path: &str,
        collection_key: &str,
    ) -> FetchResult<Vec<R>> {
        let mut items: Vec<R> = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut query: Vec<(String, String)> = Vec::new();
            if let Some(cursor) = &offset {
                query.push(("offset".to_string(), cursor.clone()));
            }

            let payload = self.request(path, &query).await?;

            let batch = payload
                .get(collection_key)
                .and_then(|v| v.as_array())
                .ok_or_else(|| {
                    FetchError::Validation(format!(
                        "unexpected response format: '{}' is not a list",
                        collection_key
                    ))
                })?;

            for record in batch {
                let item: R = serde_json::from_value(record.clone()).map_err(|e| {
                    FetchError::Validation(format!(
                        "malformed '{}' record: {}",
                        collection_key, e
                    ))
                })?;
                items.push(item);
            }

            offset = payload
                .get("offset")
                .and_then(|v| v.as_str())
                .map(String::from);
            if offset.is_none() {
                break;
            }
        }

        Ok(items)
    }

    /// Issue one logical request, retrying transient failures.
    ///
    /// Delay before retry n (1-based) is `initial_backoff * 2^(n-1)`,
    /// capped at [`MAX_BACKOFF`].
    async fn request(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> FetchResult<serde_json::Value> {
        let mut attempt: u32 = 0;

        loop {
            let error = match self.transport.get(path, query).await {
                Ok(response) => match response.status {
                    200..=299 => {
                        return serde_json::from_str(&response.body).map_err(|e| {
                            FetchError::Validation(format!(
                                "response is not valid JSON: {}",
                                e
                            ))
                        });
                    }
                    429 => FetchError::RateLimitExceeded { attempts: attempt },
                    401 | 403 => FetchError::Auth,
                    404 => FetchError::NotFound,
                    status => FetchError::Api {
                        status,
                        message: truncate(&response.body, 512),
                    },
                },
                Err(TransportError::Timeout) => FetchError::Timeout,
                Err(TransportError::Connect(message)) => FetchError::Transport(message),
            };

            if !error.is_transient() {
                return Err(error);
            }

            if attempt >= self.max_retry_attempts {
                return Err(match error {
                    FetchError::RateLimitExceeded { .. } => {
                        FetchError::RateLimitExceeded { attempts: attempt }
                    }
                    other => FetchError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(other),
                    },
                });
            }

            let delay = backoff_delay(self.initial_backoff, attempt);
            tracing::debug!(
                path,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                cause = %error,
                "transient failure, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Base-level metadata returned alongside the table listing.
#[derive(Debug, Deserialize)]
struct BaseInfo {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

fn backoff_delay(initial: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    std::cmp::min(initial.saturating_mul(factor), MAX_BACKOFF)
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}
