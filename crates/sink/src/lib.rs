//! Entry sinks: the append-only streams classification records are
//! forwarded to.
//!
//! Sinks never mutate a record and never retry; retry policy, if any,
//! belongs to whatever consumes the stream.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

mod factory;
mod jsonl;
mod memory;
mod stdout;

pub use factory::create_sink;
pub use jsonl::JsonlSink;
pub use memory::MemorySink;
pub use stdout::StdoutSink;

use async_trait::async_trait;
use protoscan_core::{Entry, Error};

/// An append-only stream of entries
#[async_trait]
pub trait EntrySink: Send + Sync {
    /// Forwards one record to the stream
    async fn emit(&self, entry: &Entry) -> Result<(), Error>;

    /// Persists buffered records and diagnostics; called at end of run
    async fn flush(&self) -> Result<(), Error>;
}
