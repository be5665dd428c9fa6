use std::path::PathBuf;

use anyhow::{Context, Result};
use config::Config;
use serde::Deserialize;

pub const DEFAULT_TEMPLATE: &str = "legal";

/// Converter settings: defaults, then `convert.toml`, then `CONVERT_*` env vars.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub template_dir: PathBuf,
    pub stylesheet: PathBuf,
    pub default_template: String,
    /// Explicit pandoc binary; looked up on PATH when unset.
    #[serde(default)]
    pub pandoc: Option<PathBuf>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Config::builder()
            .set_default("template_dir", "templates")?
            .set_default("stylesheet", "styles/professional.css")?
            .set_default("default_template", DEFAULT_TEMPLATE)?
            .add_source(config::File::with_name("convert").required(false))
            .add_source(config::Environment::with_prefix("CONVERT"))
            .build()
            .context("Failed to load converter settings")?
            .try_deserialize()
            .context("Invalid converter settings")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("templates"),
            stylesheet: PathBuf::from("styles/professional.css"),
            default_template: DEFAULT_TEMPLATE.to_string(),
            pandoc: None,
        }
    }
}
