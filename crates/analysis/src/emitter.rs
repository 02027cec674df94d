//! Entry construction and forwarding.
//!
//! Wraps a classification outcome into the output record and forwards it to
//! the sink. Records are immutable after construction; sink failures
//! propagate to the caller and are never retried here.

use crate::classify::Classification;
use protoscan_core::entry::{Entry, EntryBuilder, Location, RewriteLevel, Source};
use protoscan_core::error::{Error, Result};
use protoscan_sink::EntrySink;
use std::sync::Arc;
use tracing::warn;

pub struct EntryEmitter {
    sink: Arc<dyn EntrySink>,
    /// Provenance recorded on successful entries
    source_file: String,
}

impl EntryEmitter {
    pub fn new(sink: Arc<dyn EntrySink>, source_file: String) -> Self {
        Self { sink, source_file }
    }

    /// Emits a successful classification
    pub async fn emit_classified(
        &self,
        level: RewriteLevel,
        location: Location,
        classification: Classification,
    ) -> Result<()> {
        let entry = EntryBuilder::default()
            .location(location)
            .level(level)
            .type_name(Some(classification.type_name))
            .expr(Some(classification.expr))
            .usage(Some(classification.usage))
            .source(Some(Source {
                file: self.source_file.clone(),
            }))
            .build()
            .map_err(|e| Error::classify(format!("building entry: {e}")))?;
        debug_assert!(entry.validate().is_ok());
        self.sink.emit(&entry).await
    }

    /// Emits a SKIP status entry for an intentionally unanalyzable location
    pub async fn emit_skip(
        &self,
        level: RewriteLevel,
        location: Location,
        reason: impl Into<String>,
    ) -> Result<()> {
        let entry = Entry::skip(location, level, reason);
        self.sink.emit(&entry).await
    }

    /// Emits a FAIL status entry scoped to one location
    pub async fn emit_failure(
        &self,
        level: RewriteLevel,
        location: Location,
        error: impl Into<String>,
    ) -> Result<()> {
        let message = error.into();
        warn!(package = %location.package, file = %location.file, %message, "emitting failure entry");
        let entry = Entry::failure(location, level, message);
        self.sink.emit(&entry).await
    }
}
