use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

pub fn spotlight_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".spotlight"))
}

pub fn ensure_spotlight_home() -> Result<PathBuf> {
    let dir = spotlight_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn default_log_path() -> Result<PathBuf> {
    Ok(ensure_spotlight_home()?.join("spotlight.log"))
}
