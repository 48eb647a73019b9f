use anyhow::{Context, Result};
use expenseiq_client::{SessionHandle, SessionStore};
use std::fs;
use std::path::PathBuf;

/// `$EXPENSEIQ_HOME`, or `~/.expenseiq`.
pub fn expenseiq_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("EXPENSEIQ_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".expenseiq"))
}

pub fn ensure_expenseiq_home() -> Result<PathBuf> {
    let dir = expenseiq_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn session_path() -> Result<PathBuf> {
    Ok(ensure_expenseiq_home()?.join("session.json"))
}

/// Session handle backed by `~/.expenseiq/session.json`.
pub fn open_sessions() -> Result<SessionHandle> {
    let p = session_path()?;
    SessionHandle::with_store(SessionStore::new(&p)).with_context(|| format!("read {}", p.display()))
}
