//! TOML-based configuration for airlens.
//!
//! Supports a config file (airlens.toml) with environment variable
//! expansion, plus plain environment variable fallbacks so the tool runs
//! with no config file at all.
//!
//! Example configuration:
//! ```toml
//! [airtable]
//! access_token = "${AIRTABLE_ACCESS_TOKEN}"
//! base_id = "appXXXXXXXXXXXXXX"
//! timeout_seconds = 30
//! max_retry_attempts = 5
//! initial_backoff_seconds = 0.5
//!
//! [report]
//! output_dir = "reports"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming the access token when no config file sets it.
pub const TOKEN_ENV_VAR: &str = "AIRTABLE_ACCESS_TOKEN";

/// Environment variable naming the base id when no config file sets it.
pub const BASE_ID_ENV_VAR: &str = "AIRTABLE_BASE_ID";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("No Airtable access token configured; set [airtable].access_token or {TOKEN_ENV_VAR}")]
    MissingToken,

    #[error("No Airtable base id configured; set [airtable].base_id, {BASE_ID_ENV_VAR}, or pass --base")]
    MissingBaseId,

    #[error("initial_backoff_seconds must be a finite, non-negative number, got {0}")]
    InvalidBackoff(f64),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Airtable API access.
    pub airtable: AirtableSettings,

    /// Report output.
    pub report: ReportSettings,
}

/// Airtable API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AirtableSettings {
    /// Personal access token with metadata scope
    /// (supports ${ENV_VAR} expansion).
    pub access_token: String,

    /// Base to analyze when none is given on the command line.
    pub base_id: Option<String>,

    /// Per-request HTTP timeout.
    pub timeout_seconds: u64,

    /// Maximum retry attempts for transient failures.
    pub max_retry_attempts: u32,

    /// Initial backoff delay; doubles on each retry.
    pub initial_backoff_seconds: f64,
}

impl Default for AirtableSettings {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            base_id: None,
            timeout_seconds: 30,
            max_retry_attempts: 5,
            initial_backoff_seconds: 0.5,
        }
    }
}

impl AirtableSettings {
    /// Get the access token with environment variables expanded, falling
    /// back to [`TOKEN_ENV_VAR`]. A missing credential is a configuration
    /// error, not a runtime error.
    pub fn resolved_access_token(&self) -> Result<String, SettingsError> {
        if !self.access_token.is_empty() {
            let token = expand_env_vars(&self.access_token)?;
            if !token.is_empty() {
                return Ok(token);
            }
        }
        match env::var(TOKEN_ENV_VAR) {
            Ok(token) if !token.is_empty() => Ok(token),
            _ => Err(SettingsError::MissingToken),
        }
    }

    /// Resolve the base id from an explicit override, the config file, or
    /// [`BASE_ID_ENV_VAR`], in that precedence order.
    pub fn resolved_base_id(&self, override_id: Option<&str>) -> Result<String, SettingsError> {
        if let Some(id) = override_id {
            return Ok(id.to_string());
        }
        if let Some(id) = &self.base_id {
            return expand_env_vars(id);
        }
        match env::var(BASE_ID_ENV_VAR) {
            Ok(id) if !id.is_empty() => Ok(id),
            _ => Err(SettingsError::MissingBaseId),
        }
    }
}

/// Report output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Directory where generated reports are written.
    pub output_dir: PathBuf,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that type-check as TOML but cannot be used, such as a
    /// backoff that has no `Duration` representation.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let backoff = self.airtable.initial_backoff_seconds;
        if !backoff.is_finite() || backoff < 0.0 {
            return Err(SettingsError::InvalidBackoff(backoff));
        }
        Ok(())
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `AIRLENS_CONFIG`
    /// 2. `./airlens.toml`
    /// 3. `~/.config/airlens/config.toml`
    ///
    /// Falls back to defaults (environment variables still supply the
    /// credential) when no config file exists.
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("AIRLENS_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("airlens.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("airlens").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' {
            // Check for ${VAR} or $VAR
            if chars.peek() == Some(&'{') {
                chars.next(); // consume '{'
                let mut var_name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch == '}' {
                        chars.next(); // consume '}'
                        break;
                    }
                    var_name.push(chars.next().unwrap());
                }
                let value = env::var(&var_name)
                    .map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
                result.push_str(&value);
            } else {
                // $VAR (ends at non-alphanumeric/underscore)
                let mut var_name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        var_name.push(chars.next().unwrap());
                    } else {
                        break;
                    }
                }
                if var_name.is_empty() {
                    // Just a lone $, keep it
                    result.push('$');
                } else {
                    let value = env::var(&var_name)
                        .map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
                    result.push_str(&value);
                }
            }
        } else {
            result.push(c);
        }
    }

    Ok(result)
}
