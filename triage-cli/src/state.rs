use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$TRIAGE_HOME`, or `~/.triage` when unset.
pub fn triage_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("TRIAGE_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".triage"))
}

pub fn ensure_triage_home() -> Result<PathBuf> {
    let dir = triage_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}
