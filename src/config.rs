//! YAML configuration.
//!
//! ```yaml
//! extraction:
//!   endpoint: "http://localhost:8888/.netlify/functions/process-transcript"
//!   api_key: "YOUR_KEY"      # optional, DVR_API_KEY overrides
//!   schema: flat             # flat | conversational
//!   timeout_secs: 60
//! export:
//!   timezone: "Europe/Rome"
//!   format: markdown         # markdown | text
//! ```

use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api_types::ExtractionSchema;
use crate::render::ExportFormat;

pub const EXAMPLE_CONFIG: &str = "extraction:\n  endpoint: \"http://localhost:8888/.netlify/functions/process-transcript\"\n  schema: flat\n";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub schema: ExtractionSchema,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub format: ExportFormat,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            format: ExportFormat::default(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_timezone() -> String {
    "Europe/Rome".to_string()
}

impl ExportConfig {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("export.timezone {:?}: {}", self.timezone, e))
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let ep = &self.extraction.endpoint;
        if !(ep.starts_with("http://") || ep.starts_with("https://")) {
            bail!("extraction.endpoint must be an http(s) URL (got {:?})", ep);
        }
        if self.extraction.timeout_secs == 0 {
            bail!("extraction.timeout_secs must be > 0");
        }
        self.export.tz()?;
        Ok(())
    }

    /// Environment overrides, looked up through `get` so tests stay hermetic.
    pub fn apply_env_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(key) = get("DVR_API_KEY").filter(|k| !k.is_empty()) {
            self.extraction.api_key = Some(key);
        }
        if let Some(ep) = get("DVR_ENDPOINT").filter(|e| !e.is_empty()) {
            self.extraction.endpoint = ep;
        }
    }
}

pub fn parse_config(yaml: &str) -> Result<Config> {
    let cfg: Config = serde_yaml::from_str(yaml).context("parsing config YAML")?;
    Ok(cfg)
}

/// Loads, applies process environment overrides and validates.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        bail!(
            "config not found at {}\n\
             Use --config to specify a config file, or set DVR_CONFIG environment variable.\n\
             Example config.yaml:\n{}",
            path.display(),
            EXAMPLE_CONFIG
        );
    }
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut cfg = parse_config(&raw).with_context(|| format!("in {}", path.display()))?;
    cfg.apply_env_overrides(|k| std::env::var(k).ok());
    cfg.validate()?;
    Ok(cfg)
}

/// `--config` flag, else `DVR_CONFIG`, else `<DVR_CONFIG_DIR or .segretario>/config.yaml`.
pub fn resolve_config_path(flag: Option<&Path>, get: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(p) = flag {
        return p.to_path_buf();
    }
    if let Some(p) = get("DVR_CONFIG") {
        return PathBuf::from(p);
    }
    let base = get("DVR_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".segretario"));
    base.join("config.yaml")
}
