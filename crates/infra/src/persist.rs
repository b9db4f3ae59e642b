//! Saving and loading [`AccessSnapshot`]s as JSON files.

use std::path::Path;

use anyhow::Context;

use crate::access::{AccessControl, AccessSnapshot};

impl AccessSnapshot {
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), anyhow::Error> {
        let path = path.as_ref();
        let bytes = serde_json::to_vec_pretty(self).context("serialize access snapshot")?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes)
            .with_context(|| format!("write access snapshot to {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("move access snapshot into {}", path.display()))?;
        Ok(())
    }

    /// Load a snapshot; grids are validated (total, known keys) on the way in.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("read access snapshot from {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("parse access snapshot {}", path.display()))
    }
}

impl AccessControl {
    /// Restore from a file if it exists; returns whether anything was loaded.
    pub fn load_if_present(&self, path: impl AsRef<Path>) -> Result<bool, anyhow::Error> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(false);
        }
        let snapshot = AccessSnapshot::load_from_path(path)?;
        let users = snapshot.users.len();
        self.restore(snapshot);
        tracing::info!(users, path = %path.display(), "access state restored");
        Ok(true)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), anyhow::Error> {
        self.snapshot().save_to_path(path)
    }
}
