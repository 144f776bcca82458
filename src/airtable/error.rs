//! Fetcher-specific error types.

use thiserror::Error;

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while fetching a base schema.
///
/// Transient variants (rate limit, 5xx, timeout, connection failure) are
/// resolved locally via retry with exponential backoff and only surface
/// after the configured attempts are exhausted. Everything else fails
/// immediately.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Credentials were rejected. Never retried.
    #[error("airtable authentication failed; verify the access token and scopes")]
    Auth,

    /// The base (or another resource) does not exist. Never retried.
    #[error("airtable resource not found; verify the base identifier")]
    NotFound,

    /// Rate limited on every attempt, retries exhausted.
    #[error("airtable rate limit exceeded after {attempts} retries")]
    RateLimitExceeded { attempts: u32 },

    /// Non-2xx response other than the cases above.
    #[error("airtable api error ({status}): {message}")]
    Api { status: u16, message: String },

    /// An individual request exceeded the configured timeout.
    #[error("airtable api request timed out")]
    Timeout,

    /// Connection-level failure (DNS, refused, reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// A transient failure persisted through every retry attempt.
    #[error("retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<FetchError>,
    },

    /// The response body did not match the expected shape. Never retried;
    /// malformed data will not fix itself.
    #[error("invalid airtable response: {0}")]
    Validation(String),
}

impl FetchError {
    /// Would retrying this failure plausibly succeed?
    ///
    /// Retryable server errors are exactly 500, 502, 503, and 504; other
    /// 5xx statuses (501, 505, ...) indicate a request the server will
    /// never accept.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::RateLimitExceeded { .. }
                | FetchError::Timeout
                | FetchError::Transport(_)
                | FetchError::Api {
                    status: 500 | 502 | 503 | 504,
                    ..
                }
        )
    }
}
