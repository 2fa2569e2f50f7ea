use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Format assumed for spec files whose extension is not recognized:
    /// "auto", "yaml", or "json".
    #[serde(default = "default_format")]
    pub default_format: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            default_format: default_format(),
        }
    }
}

fn default_format() -> String {
    "auto".to_string()
}

impl Config {
    /// Config pointing at the given database, defaults for the rest.
    /// Used when the database path comes from the CLI instead of a file.
    pub fn with_db_path(path: PathBuf) -> Self {
        Self {
            db: DbConfig { path },
            ingest: IngestConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.db.path.as_os_str().is_empty() {
        anyhow::bail!("db.path must not be empty");
    }

    match config.ingest.default_format.as_str() {
        "auto" | "yaml" | "json" => {}
        other => anyhow::bail!(
            "Unknown ingest.default_format: '{}'. Must be auto, yaml, or json.",
            other
        ),
    }

    Ok(())
}
