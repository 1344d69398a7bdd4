//! Local presentation cache: the signed-in identity and the last sync time.
//!
//! Sessions themselves are never written here. Every read-modify-write goes
//! through [`with_state_lock`] so concurrent `wtally` processes serialize on
//! one lock file.

use crate::identity::Identity;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use tracing::warn;

pub const STATE_VERSION: &str = "1.0.0";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct State {
    pub version: String,
    #[serde(default)]
    pub identity: Option<Identity>,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            identity: None,
            last_sync: None,
        }
    }
}

impl State {
    /// Read the state file. A missing or blank file is a fresh state.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let state: State = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        if state.version != STATE_VERSION {
            warn!(found = %state.version, expected = STATE_VERSION, "state file version differs");
        }
        Ok(state)
    }

    /// Replace the state file atomically through a sibling temp file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize state")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = path.with_extension("json.partial");
        fs::write(&staging, json)
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        fs::rename(&staging, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

/// Exclusive hold on the lock file, released on drop.
struct StateLock {
    file: File,
}

impl StateLock {
    fn acquire(lock_path: &Path) -> Result<Self> {
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)
            .with_context(|| format!("Failed to open lock file {}", lock_path.display()))?;
        file.lock_exclusive()
            .context("Failed to acquire state lock")?;
        Ok(Self { file })
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(error = %e, "failed to release state lock");
        }
    }
}

/// Run `f` on the state while holding the lock. The state is saved only if `f` succeeds.
pub fn with_state_lock<F, R>(lock_path: &Path, state_path: &Path, f: F) -> Result<R>
where
    F: FnOnce(&mut State) -> Result<R>,
{
    let _lock = StateLock::acquire(lock_path)?;

    let mut state = State::load(state_path)?;
    let value = f(&mut state)?;
    state.save(state_path)?;
    Ok(value)
}
