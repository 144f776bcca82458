//! Configuration loading and validation.

mod settings;

pub use settings::{
    expand_env_vars, AirtableSettings, ReportSettings, Settings, SettingsError, BASE_ID_ENV_VAR,
    TOKEN_ENV_VAR,
};
