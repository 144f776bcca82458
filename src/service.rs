//! End-to-end analysis pipeline: fetch, normalize, render, write.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;

use crate::airtable::{FetchError, HttpTransport, SchemaFetcher};
use crate::config::{Settings, SettingsError};
use crate::report;
use crate::schema::{normalize, NormalizeError, NormalizedSchema};

/// Errors from the analysis pipeline.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("Configuration error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Schema fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Schema normalization failed: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a completed analysis run.
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub schema: NormalizedSchema,
    pub report_path: PathBuf,
}

/// Orchestrates a full base analysis against configured settings.
pub struct AnalysisService {
    settings: Settings,
}

impl AnalysisService {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Analyze a base end to end using the real HTTP transport.
    ///
    /// `base_override` takes precedence over the configured base id.
    pub async fn analyze(
        &self,
        base_override: Option<&str>,
    ) -> Result<AnalysisOutcome, AnalyzeError> {
        let token = self.settings.airtable.resolved_access_token()?;
        let base_id = self.settings.airtable.resolved_base_id(base_override)?;
        let fetcher = SchemaFetcher::from_settings(&self.settings.airtable, &token)?;

        self.run(&fetcher, &base_id).await
    }

    /// Analyze a base with a caller-supplied fetcher.
    pub async fn run<T: HttpTransport>(
        &self,
        fetcher: &SchemaFetcher<T>,
        base_id: &str,
    ) -> Result<AnalysisOutcome, AnalyzeError> {
        let raw = fetcher.fetch_base_schema(base_id).await?;
        let schema = normalize(&raw)?;
        let markdown = report::render(&schema);

        let report_path = self.write_report(&schema, &markdown)?;
        tracing::info!(path = %report_path.display(), "wrote schema guide");

        Ok(AnalysisOutcome {
            schema,
            report_path,
        })
    }

    fn write_report(
        &self,
        schema: &NormalizedSchema,
        markdown: &str,
    ) -> Result<PathBuf, std::io::Error> {
        let dir = &self.settings.report.output_dir;
        fs::create_dir_all(dir)?;

        let timestamp = Utc::now().format("%Y-%m-%d_%H-%M-%S");
        let filename = format!("{}_{timestamp}.md", sanitize_name(&schema.base_name));
        let path = dir.join(filename);
        fs::write(&path, markdown)?;

        Ok(path)
    }
}

/// Reduce a base name to a safe filename stem.
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        "base".to_string()
    } else {
        trimmed.to_string()
    }
}
