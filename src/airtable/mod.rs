//! Airtable Metadata API client.
//!
//! This module owns everything that talks to the remote endpoint:
//! authenticated requests, pagination cursor handling, retry/backoff for
//! transient failures, and structural validation of each page.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                 SchemaFetcher                          │
//! │  - pagination loop over the opaque offset cursor       │
//! │  - retry w/ exponential backoff (429, 5xx, timeout)    │
//! │  - per-page shape validation                           │
//! └────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼  HttpTransport (trait seam)
//! ┌────────────────────────────────────────────────────────┐
//! │     ReqwestTransport  (bearer auth, request timeout)   │
//! └────────────────────────────────────────────────────────┘
//! ```

mod client;
mod error;
mod transport;
mod types;

pub use client::SchemaFetcher;
pub use error::{FetchError, FetchResult};
pub use transport::{HttpTransport, ReqwestTransport, TransportError, TransportResponse, API_ROOT};
pub use types::{FieldType, RawField, RawSchema, RawTable, RawView};
