//! Newline-delimited JSON sink backed by a file.

use crate::EntrySink;
use async_trait::async_trait;
use protoscan_core::{Entry, Error};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

/// Writes one JSON object per line to a file
pub struct JsonlSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonlSink {
    /// Creates the output file, truncating any existing content
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = File::create(path.as_ref()).await?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

#[async_trait]
impl EntrySink for JsonlSink {
    async fn emit(&self, entry: &Entry) -> Result<(), Error> {
        let mut line = serde_json::to_string(entry)
            .map_err(|e| Error::sink(format!("serializing entry: {e}")))?;
        line.push('\n');
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), Error> {
        let mut writer = self.writer.lock().await;
        writer.flush().await?;
        writer.get_ref().sync_all().await?;
        Ok(())
    }
}
