//! Snapshot loading boundary.
//!
//! Snapshots are exported by the external front end, one per rewrite level;
//! loading is the only blocking I/O before classification starts.

use async_trait::async_trait;
use protoscan_core::error::{Error, Result};
use protoscan_core::program::Snapshot;
use std::path::PathBuf;
use tracing::debug;

/// Provides the type-checked program representation of one snapshot
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Human-readable description, used in failure reports
    fn describe(&self) -> String;

    /// Loads the snapshot; failure here aborts only this level's pass
    async fn load(&self) -> Result<Snapshot>;
}

/// Loads a snapshot from a JSON export file
pub struct JsonSnapshotSource {
    path: PathBuf,
}

impl JsonSnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotSource for JsonSnapshotSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> Result<Snapshot> {
        debug!(path = %self.path.display(), "loading snapshot");
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::invalid_input(format!("{}: {e}", self.path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::invalid_input(format!("{}: {e}", self.path.display())))
    }
}

/// Serves an already materialized snapshot; useful for tests and embedding
pub struct StaticSnapshotSource {
    snapshot: Snapshot,
}

impl StaticSnapshotSource {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl SnapshotSource for StaticSnapshotSource {
    fn describe(&self) -> String {
        self.snapshot.module.clone()
    }

    async fn load(&self) -> Result<Snapshot> {
        Ok(self.snapshot.clone())
    }
}
