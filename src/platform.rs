//! Where worktally keeps its local files.
//!
//! The state directory is picked from, in order: an explicit override, the
//! home directory (`~/.worktally`), the platform data directory, and finally
//! `./.worktally`. The first candidate that is writable wins.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const DIR_NAME: &str = "worktally";

/// Lock and state file locations inside the state directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    pub dir: PathBuf,
    pub lock: PathBuf,
    pub state: PathBuf,
}

impl StatePaths {
    pub fn in_dir(dir: PathBuf) -> Self {
        Self {
            lock: dir.join("state.lock"),
            state: dir.join("state.json"),
            dir,
        }
    }

    /// Resolve the state directory, honouring `override_dir` first.
    pub fn resolve(override_dir: Option<&Path>) -> Result<Self> {
        get_state_dir(override_dir).map(Self::in_dir)
    }
}

pub fn get_state_dir(override_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = override_dir {
        ensure_writable(dir)?;
        return Ok(dir.to_path_buf());
    }

    let candidates = [
        home::home_dir().map(|home| home.join(format!(".{}", DIR_NAME))),
        dirs::data_local_dir().map(|data| data.join(DIR_NAME)),
    ];
    for dir in candidates.into_iter().flatten() {
        match ensure_writable(&dir) {
            Ok(()) => return Ok(dir),
            Err(e) => warn!(dir = %dir.display(), error = %e, "state directory not writable"),
        }
    }

    let dir = PathBuf::from(format!(".{}", DIR_NAME));
    ensure_writable(&dir).context(
        "Cannot create state directory in any location. \
         Check file permissions or set state.state_dir_override in config.",
    )?;
    Ok(dir)
}

/// Create `dir` if needed and prove it accepts writes.
pub fn ensure_writable(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let probe = dir.join(".write_test");
    fs::write(&probe, b"test")
        .with_context(|| format!("Directory {} is not writable", dir.display()))?;
    // Antivirus may hold the probe open on Windows.
    let _ = fs::remove_file(&probe);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_override_dir_takes_priority() {
        let temp = TempDir::new().unwrap();

        let dir = get_state_dir(Some(temp.path())).unwrap();
        assert_eq!(dir, temp.path());
    }

    #[test]
    fn test_ensure_writable_creates_nested_dir() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");

        ensure_writable(&nested).unwrap();
        assert!(nested.exists());
        assert!(!nested.join(".write_test").exists());
    }

    #[test]
    fn test_state_paths_with_override() {
        let temp = TempDir::new().unwrap();

        let paths = StatePaths::resolve(Some(temp.path())).unwrap();
        assert_eq!(paths.lock, temp.path().join("state.lock"));
        assert_eq!(paths.state, temp.path().join("state.json"));
    }
}
