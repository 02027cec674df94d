use crate::{EntrySink, JsonlSink, MemorySink, StdoutSink};
use protoscan_core::{config::OutputConfig, Error};
use std::sync::Arc;
use tracing::debug;

/// Creates an entry sink based on configuration.
///
/// Returns a trait object so the analysis pipeline stays independent of the
/// concrete stream backing it.
///
/// # Errors
/// Returns an error for an unknown provider, or when a file-backed sink
/// cannot be created.
pub async fn create_sink(config: &OutputConfig) -> Result<Arc<dyn EntrySink>, Error> {
    debug!(provider = %config.provider, "creating entry sink");
    match config.provider.as_str() {
        "jsonl" => {
            let path = config
                .path
                .as_deref()
                .ok_or_else(|| Error::config("sink provider 'jsonl' requires output.path"))?;
            let sink = JsonlSink::create(path).await?;
            Ok(Arc::new(sink) as Arc<dyn EntrySink>)
        }
        "stdout" => Ok(Arc::new(StdoutSink::new()) as Arc<dyn EntrySink>),
        "memory" => Ok(Arc::new(MemorySink::new()) as Arc<dyn EntrySink>),
        other => Err(Error::config(format!("unknown sink provider '{other}'"))),
    }
}
