//! Sink that streams entries to standard output.

use crate::EntrySink;
use async_trait::async_trait;
use protoscan_core::{Entry, Error};
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

/// Writes one JSON object per line to stdout
pub struct StdoutSink {
    out: Mutex<Stdout>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            out: Mutex::new(tokio::io::stdout()),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntrySink for StdoutSink {
    async fn emit(&self, entry: &Entry) -> Result<(), Error> {
        let mut line = serde_json::to_string(entry)
            .map_err(|e| Error::sink(format!("serializing entry: {e}")))?;
        line.push('\n');
        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes()).await?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), Error> {
        let mut out = self.out.lock().await;
        out.flush().await?;
        Ok(())
    }
}
