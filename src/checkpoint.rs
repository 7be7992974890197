//! Policy checkpointing.
//!
//! The harness treats policy state as opaque bytes (see
//! [`crate::policy::PolicySnapshot`]); a [`CheckpointStore`] persists those
//! bytes at configured intervals and at run boundaries. The file-backed
//! store keeps a bounded history and can locate the most recent snapshot
//! for restore-on-start.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Error type for checkpointing operations.
#[derive(Debug)]
pub enum CheckpointError {
    /// IO error during save/load.
    Io(io::Error),
    /// A snapshot could not be decoded by the policy.
    Decode(String),
    /// No checkpoints found.
    NoCheckpoints,
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointError::Io(e) => write!(f, "IO error: {}", e),
            CheckpointError::Decode(e) => write!(f, "decode error: {}", e),
            CheckpointError::NoCheckpoints => write!(f, "no checkpoints found"),
        }
    }
}

impl std::error::Error for CheckpointError {}

impl From<io::Error> for CheckpointError {
    fn from(e: io::Error) -> Self {
        CheckpointError::Io(e)
    }
}

/// Persistence seam for policy snapshots, opaque to the core loop.
pub trait CheckpointStore {
    /// Persist a snapshot taken at the given cumulative environment step.
    fn save(&mut self, snapshot: &[u8], step: u64) -> Result<(), CheckpointError>;

    /// Retrieve the most recent snapshot and the step it was taken at, if
    /// any snapshot exists.
    fn latest(&self) -> Result<Option<(Vec<u8>, u64)>, CheckpointError>;
}

/// Checkpoint metadata.
#[derive(Debug, Clone)]
pub struct CheckpointInfo {
    /// Path to the checkpoint file.
    pub path: PathBuf,
    /// Step at which the checkpoint was saved.
    pub step: u64,
}

/// File-backed checkpoint store.
///
/// Snapshots are written as `checkpoint_{step:08}.bin` inside the store
/// directory. At most `keep_last_n` files are retained (0 keeps all).
pub struct FileCheckpointStore {
    dir: PathBuf,
    keep_last_n: usize,
    history: Vec<CheckpointInfo>,
}

impl FileCheckpointStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            keep_last_n: 5,
            history: Vec::new(),
        })
    }

    /// Set how many recent checkpoints to retain (0 = keep all).
    pub fn with_keep_last_n(mut self, n: usize) -> Self {
        self.keep_last_n = n;
        self
    }

    /// Store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List all checkpoints in the directory, sorted by step.
    pub fn list_checkpoints(&self) -> Result<Vec<CheckpointInfo>, CheckpointError> {
        let mut checkpoints: Vec<CheckpointInfo> = fs::read_dir(&self.dir)?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let path = e.path();
                let filename = path.file_name()?.to_str()?;
                let step = filename
                    .strip_prefix("checkpoint_")?
                    .strip_suffix(".bin")?
                    .parse()
                    .ok()?;
                Some(CheckpointInfo { path, step })
            })
            .collect();

        checkpoints.sort_by_key(|c| c.step);
        Ok(checkpoints)
    }

    fn checkpoint_path(&self, step: u64) -> PathBuf {
        self.dir.join(format!("checkpoint_{:08}.bin", step))
    }

    fn prune(&mut self) {
        if self.keep_last_n == 0 {
            return;
        }
        while self.history.len() > self.keep_last_n {
            let old = self.history.remove(0);
            let _ = fs::remove_file(&old.path);
        }
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&mut self, snapshot: &[u8], step: u64) -> Result<(), CheckpointError> {
        let path = self.checkpoint_path(step);
        fs::write(&path, snapshot)?;
        self.history.push(CheckpointInfo { path, step });
        self.prune();
        Ok(())
    }

    fn latest(&self) -> Result<Option<(Vec<u8>, u64)>, CheckpointError> {
        let checkpoints = self.list_checkpoints()?;
        match checkpoints.last() {
            Some(info) => {
                let bytes = fs::read(&info.path)?;
                Ok(Some((bytes, info.step)))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_store_creates_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested/checkpoints");
        let _store = FileCheckpointStore::new(&nested).unwrap();
        assert!(nested.exists());
    }

    #[test]
    fn test_save_uses_step_naming() {
        let dir = tempdir().unwrap();
        let mut store = FileCheckpointStore::new(dir.path()).unwrap();

        store.save(b"abc", 1600).unwrap();

        assert!(dir.path().join("checkpoint_00001600.bin").exists());
    }

    #[test]
    fn test_latest_returns_most_recent() {
        let dir = tempdir().unwrap();
        let mut store = FileCheckpointStore::new(dir.path()).unwrap();

        store.save(b"first", 100).unwrap();
        store.save(b"second", 200).unwrap();

        let (bytes, step) = store.latest().unwrap().unwrap();
        assert_eq!(bytes, b"second");
        assert_eq!(step, 200);
    }

    #[test]
    fn test_latest_empty_store() {
        let dir = tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path()).unwrap();
        assert!(store.latest().unwrap().is_none());
    }

    #[test]
    fn test_prune_keeps_last_n() {
        let dir = tempdir().unwrap();
        let mut store = FileCheckpointStore::new(dir.path()).unwrap().with_keep_last_n(2);

        store.save(b"a", 1).unwrap();
        store.save(b"b", 2).unwrap();
        store.save(b"c", 3).unwrap();

        let checkpoints = store.list_checkpoints().unwrap();
        let steps: Vec<u64> = checkpoints.iter().map(|c| c.step).collect();
        assert_eq!(steps, vec![2, 3]);
    }
}
