//! In-memory sink for tests and embedding.

use crate::EntrySink;
use async_trait::async_trait;
use protoscan_core::{Entry, Error};
use tokio::sync::Mutex;

/// Collects emitted entries in memory
#[derive(Default)]
pub struct MemorySink {
    entries: Mutex<Vec<Entry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far
    pub async fn entries(&self) -> Vec<Entry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl EntrySink for MemorySink {
    async fn emit(&self, entry: &Entry) -> Result<(), Error> {
        self.entries.lock().await.push(entry.clone());
        Ok(())
    }

    async fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}
