//! airlens: Airtable base schema acquisition and analysis.
//!
//! Fetches a base's table metadata from the Airtable Metadata API,
//! normalizes it into a typed schema model with classified relationships
//! and a dependency-respecting creation order, and renders a markdown
//! guide for recreating the base.
//!
//! ```text
//! Airtable Metadata API
//!         |
//!         v
//!   SchemaFetcher ──> RawSchema ──> normalize() ──> NormalizedSchema
//!   (retry/backoff,                  (links, cardinality,     |
//!    pagination)                      creation order)         v
//!                                                      report::render
//!                                                            |
//!                                                            v
//!                                                      markdown guide
//! ```

pub mod airtable;
pub mod config;
pub mod report;
pub mod schema;
pub mod service;

pub use airtable::{FetchError, SchemaFetcher};
pub use config::Settings;
pub use schema::{normalize, Cardinality, NormalizeError, NormalizedSchema};
pub use service::{AnalysisService, AnalyzeError};
