use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::ensure_spotlight_home;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Overrides `analyzer.base_url` from config.toml.
pub const BASE_URL_ENV: &str = "SPOTLIGHT_ANALYZER_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub analyzer: AnalyzerSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerSection {
    /// Scheme + host (+ port) of the analyzer; paths are fixed.
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// `EnvFilter` directive used by the wizard's log file.
    pub filter: String,
    /// Log file for the wizard (default: ~/.spotlight/spotlight.log)
    pub file: Option<String>,
}

impl Default for AnalyzerSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Analyzer URL by precedence: flag, then environment, then file.
    pub fn resolve_base_url(&self, flag: Option<&str>, env: Option<&str>) -> String {
        flag.or(env)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.analyzer.base_url)
            .to_string()
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_spotlight_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config_to(cfg: &Config, p: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config_to(&Config::default(), &p)?;
    println!("Wrote {}", p.display());
    Ok(())
}
