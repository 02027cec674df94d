//! Classification engine for generated-type usage.
//!
//! Runs the use classifier over the four rewrite-level snapshots of a
//! codebase, reconstructs call stacks for reflective accesses, and streams
//! one entry per observed use to a sink. Per-call-site failures become
//! status entries; a bad file never aborts a codebase-wide run.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod callgraph;
pub mod classify;
pub mod correlator;
pub mod emitter;
pub mod resolver;
pub mod snapshot_source;
pub mod tracer;

#[cfg(test)]
pub(crate) mod testutil;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// Re-export error types from core
pub use protoscan_core::error::{Error, Result};

// Re-export the main pipeline types
pub use callgraph::CallGraphIndex;
pub use classify::{Classification, Classifier};
pub use correlator::{correlate, Correlator, SnapshotSet};
pub use emitter::EntryEmitter;
pub use resolver::TypeResolver;
pub use snapshot_source::{JsonSnapshotSource, SnapshotSource, StaticSnapshotSource};
pub use tracer::ReflectTracer;

use protoscan_core::RewriteLevel;

/// A localized failure or skip recorded during a pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryError {
    /// Package of the affected location
    pub package: String,
    /// File of the affected location, when known
    pub file: String,
    /// The status message
    pub message: String,
}

impl EntryError {
    pub fn new(package: String, file: String, message: String) -> Self {
        Self {
            package,
            file,
            message,
        }
    }
}

/// Statistics for one rewrite-level pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelStats {
    total_files: usize,
    failed_files: usize,
    entries_emitted: usize,
    failed_nodes: usize,
    skipped_locations: usize,
    processing_time_ms: u64,
}

impl LevelStats {
    /// Number of files seen in the snapshot
    pub fn total_files(&self) -> usize {
        self.total_files
    }

    /// Number of files that could not be analyzed
    pub fn failed_files(&self) -> usize {
        self.failed_files
    }

    /// Number of entries emitted, including status entries
    pub fn entries_emitted(&self) -> usize {
        self.entries_emitted
    }

    /// Number of nodes whose classification failed
    pub fn failed_nodes(&self) -> usize {
        self.failed_nodes
    }

    /// Number of SKIP entries emitted
    pub fn skipped_locations(&self) -> usize {
        self.skipped_locations
    }

    /// Wall-clock time of the pass in milliseconds
    pub fn processing_time_ms(&self) -> u64 {
        self.processing_time_ms
    }

    pub(crate) fn record_file(&mut self) {
        self.total_files += 1;
    }

    pub(crate) fn record_file_failure(&mut self) {
        self.failed_files += 1;
    }

    pub(crate) fn record_entry(&mut self) {
        self.entries_emitted += 1;
    }

    pub(crate) fn record_node_failure(&mut self) {
        self.failed_nodes += 1;
    }

    pub(crate) fn record_skip(&mut self) {
        self.skipped_locations += 1;
    }

    pub(crate) fn set_processing_time_ms(&mut self, ms: u64) {
        self.processing_time_ms = ms;
    }
}

/// Result of one rewrite-level pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelReport {
    level: RewriteLevel,
    /// Set when the whole snapshot could not be loaded; distinct from
    /// per-node status entries
    load_error: Option<String>,
    stats: LevelStats,
    fail_locations: Vec<EntryError>,
    skip_locations: Vec<EntryError>,
    #[serde(skip)]
    site_keys: BTreeSet<String>,
}

impl LevelReport {
    pub(crate) fn new(level: RewriteLevel) -> Self {
        Self {
            level,
            load_error: None,
            stats: LevelStats::default(),
            fail_locations: Vec::new(),
            skip_locations: Vec::new(),
            site_keys: BTreeSet::new(),
        }
    }

    pub(crate) fn load_failure(level: RewriteLevel, message: String) -> Self {
        let mut report = Self::new(level);
        report.load_error = Some(message);
        report
    }

    pub fn level(&self) -> RewriteLevel {
        self.level
    }

    /// The top-level failure that aborted this pass, if any
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn stats(&self) -> &LevelStats {
        &self.stats
    }

    pub fn fail_locations(&self) -> &[EntryError] {
        &self.fail_locations
    }

    pub fn skip_locations(&self) -> &[EntryError] {
        &self.skip_locations
    }

    pub(crate) fn stats_mut(&mut self) -> &mut LevelStats {
        &mut self.stats
    }

    pub(crate) fn record_fail_location(&mut self, err: EntryError) {
        self.fail_locations.push(err);
    }

    pub(crate) fn record_skip_location(&mut self, err: EntryError) {
        self.skip_locations.push(err);
    }

    pub(crate) fn record_site(&mut self, key: String) {
        self.site_keys.insert(key);
    }

    pub(crate) fn site_keys(&self) -> &BTreeSet<String> {
        &self.site_keys
    }
}

/// Result of a full analysis run across rewrite levels.
///
/// A run always completes with partial results plus an explicit account of
/// FAIL and SKIP locations; no location is silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    run_id: String,
    reports: Vec<LevelReport>,
}

impl RunSummary {
    pub(crate) fn new(run_id: String, reports: Vec<LevelReport>) -> Self {
        Self { run_id, reports }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Per-level reports, in migration-progress order
    pub fn reports(&self) -> &[LevelReport] {
        &self.reports
    }

    /// Total FAIL locations across all levels
    pub fn fail_count(&self) -> usize {
        self.reports.iter().map(|r| r.fail_locations().len()).sum()
    }

    /// Total SKIP locations across all levels
    pub fn skip_count(&self) -> usize {
        self.reports.iter().map(|r| r.skip_locations().len()).sum()
    }

    /// Total entries emitted across all levels
    pub fn entries_emitted(&self) -> usize {
        self.reports
            .iter()
            .map(|r| r.stats().entries_emitted())
            .sum()
    }

    /// Number of distinct logical call sites observed across levels
    pub fn distinct_sites(&self) -> usize {
        let mut keys = BTreeSet::new();
        for report in &self.reports {
            keys.extend(report.site_keys().iter().cloned());
        }
        keys.len()
    }
}
