//! Settings for the `cascade-config` binary

use cascade::env_name_provider;
use clap::ValueEnum;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings file read from the working directory when present
pub const DEFAULT_SETTINGS_FILE: &str = "cascade-config.yaml";

/// Environment prefix for settings overrides
pub const SETTINGS_ENV_PREFIX: &str = "CASCADE_CONFIG_";

/// How the resolved tree is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Cascade manifest to resolve
    pub manifest: PathBuf,
    /// Overrides the manifest's environment name; read from `CASCADE_ENV`
    pub env_name: Option<String>,
    /// Overrides the manifest's file roots
    pub file_roots: Option<Vec<PathBuf>>,
    pub output_format: OutputFormat,
    pub log_level: String,
    pub log_format: String,
    /// Request timeout for remote documents
    pub store_timeout_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from("cascade.yaml"),
            env_name: None,
            file_roots: None,
            output_format: OutputFormat::Json,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
            store_timeout_seconds: 30,
        }
    }
}

/// Command-line values that take precedence over every other layer
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<OutputFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Settings {
    /// Defaults, then the settings file, then `CASCADE_CONFIG_*` and
    /// `CASCADE_ENV`, then `overrides`
    pub fn load(settings_file: &Path, overrides: &Overrides) -> figment::Result<Self> {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Yaml::file(settings_file))
            .merge(Env::prefixed(SETTINGS_ENV_PREFIX).ignore(&["env_name"]))
            .merge(env_name_provider())
            .merge(Serialized::defaults(overrides))
            .extract()
    }
}
