//! Rewrite-level correlation.
//!
//! Drives one classifier pass per rewrite-level snapshot and merges the
//! emitted entries by concatenation; each entry is self-describing via its
//! level tag. Every pass gets a fresh call-graph index and type resolver
//! scoped to its snapshot, so the passes are independent and run as
//! concurrent tasks. Failures are isolated per call site: a bad node or a
//! bad file becomes a status entry and the pass continues. Only a snapshot
//! that cannot be loaded at all aborts its own pass, reported as a
//! top-level failure distinct from per-node status records.

use crate::callgraph::CallGraphIndex;
use crate::classify::Classifier;
use crate::emitter::EntryEmitter;
use crate::resolver::TypeResolver;
use crate::snapshot_source::SnapshotSource;
use crate::{EntryError, LevelReport, RunSummary};
use indicatif::{ProgressBar, ProgressStyle};
use protoscan_core::config::AnalysisConfig;
use protoscan_core::entry::{Entry, Location, RewriteLevel};
use protoscan_core::error::{Error, Result, ResultExt};
use protoscan_core::program::{Node, SourceFile};
use protoscan_sink::EntrySink;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{error, info};
use uuid::Uuid;

/// The snapshots of one analysis run, keyed by rewrite level
#[derive(Default)]
pub struct SnapshotSet {
    sources: Vec<(RewriteLevel, Arc<dyn SnapshotSource>)>,
}

impl SnapshotSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one level's snapshot source
    pub fn with(mut self, level: RewriteLevel, source: Arc<dyn SnapshotSource>) -> Self {
        self.sources.push((level, source));
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Drives the per-level passes and the merge
pub struct Correlator {
    config: AnalysisConfig,
    sink: Arc<dyn EntrySink>,
    cancel: Arc<AtomicBool>,
}

impl Correlator {
    pub fn new(config: AnalysisConfig, sink: Arc<dyn EntrySink>) -> Self {
        Self {
            config,
            sink,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag that aborts in-flight passes at the next file boundary,
    /// downgrading the remainder to FAIL entries
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Runs one classifier pass per snapshot and flushes the sink.
    ///
    /// Always completes with partial results; only sink failures and task
    /// panics propagate as errors.
    pub async fn run_all(&self, snapshots: SnapshotSet) -> Result<RunSummary> {
        let run_id = Uuid::new_v4().to_string();
        info!(run_id = %run_id, levels = snapshots.len(), "starting analysis run");

        let mut tasks = JoinSet::new();
        for (level, source) in snapshots.sources {
            let config = self.config.clone();
            let sink = Arc::clone(&self.sink);
            let cancel = Arc::clone(&self.cancel);
            tasks.spawn(async move { run_level(level, source, config, sink, cancel).await });
        }

        let mut reports = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let report = joined.context("level pass task failed")??;
            reports.push(report);
        }
        reports.sort_by_key(|r| r.level());

        self.sink.flush().await?;

        let summary = RunSummary::new(run_id, reports);
        info!(
            entries = summary.entries_emitted(),
            fails = summary.fail_count(),
            skips = summary.skip_count(),
            sites = summary.distinct_sites(),
            "analysis run complete"
        );
        Ok(summary)
    }
}

/// Groups entries by stable location identity so one logical call site can
/// be tracked as it evolves across rewrite levels
pub fn correlate(entries: &[Entry]) -> HashMap<String, Vec<&Entry>> {
    let mut sites: HashMap<String, Vec<&Entry>> = HashMap::new();
    for entry in entries {
        sites
            .entry(entry.location.identity())
            .or_default()
            .push(entry);
    }
    sites
}

async fn run_level(
    level: RewriteLevel,
    source: Arc<dyn SnapshotSource>,
    config: AnalysisConfig,
    sink: Arc<dyn EntrySink>,
    cancel: Arc<AtomicBool>,
) -> Result<LevelReport> {
    let started = Instant::now();

    let snapshot = match source.load().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            let failure = Error::snapshot_load(level.to_string(), e.to_string());
            error!(%level, source = %source.describe(), "{failure}");
            return Ok(LevelReport::load_failure(level, failure.to_string()));
        }
    };

    // Fresh per-snapshot context objects; passed explicitly, never ambient.
    let resolver = TypeResolver::new(&snapshot);
    let index = CallGraphIndex::build(&snapshot);
    let classifier = Classifier::new(&resolver, &index, &config);
    let emitter = EntryEmitter::new(sink, source.describe());

    let mut report = LevelReport::new(level);
    let progress = ProgressBar::new(snapshot.files.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{prefix} [{bar:30}] {pos}/{len} files") {
        progress.set_style(style);
    }
    progress.set_prefix(level.to_string());

    for file in &snapshot.files {
        report.stats_mut().record_file();
        if cancel.load(Ordering::Relaxed) {
            let message = "analysis cancelled";
            emitter
                .emit_failure(level, file_location(file), message)
                .await?;
            report.stats_mut().record_entry();
            report.stats_mut().record_file_failure();
            report.record_fail_location(EntryError::new(
                file.package.clone(),
                file.path.clone(),
                message.to_string(),
            ));
            progress.inc(1);
            continue;
        }
        process_file(level, file, &classifier, &emitter, &config, &mut report).await?;
        progress.inc(1);
    }
    progress.finish_and_clear();

    report
        .stats_mut()
        .set_processing_time_ms(started.elapsed().as_millis() as u64);
    info!(
        %level,
        files = report.stats().total_files(),
        entries = report.stats().entries_emitted(),
        "level pass complete"
    );
    Ok(report)
}

async fn process_file(
    level: RewriteLevel,
    file: &SourceFile,
    classifier: &Classifier<'_>,
    emitter: &EntryEmitter,
    config: &AnalysisConfig,
    report: &mut LevelReport,
) -> Result<()> {
    if let Some(message) = &file.error {
        emitter
            .emit_failure(level, file_location(file), message.clone())
            .await?;
        report.stats_mut().record_entry();
        report.stats_mut().record_file_failure();
        report.record_fail_location(EntryError::new(
            file.package.clone(),
            file.path.clone(),
            message.clone(),
        ));
        return Ok(());
    }

    if file.generated && config.skip_generated_files {
        let reason = "generated file excluded by policy";
        emitter
            .emit_skip(level, file_location(file), reason)
            .await?;
        report.stats_mut().record_entry();
        report.stats_mut().record_skip();
        report.record_skip_location(EntryError::new(
            file.package.clone(),
            file.path.clone(),
            reason.to_string(),
        ));
        return Ok(());
    }

    for node in classifier.collect_candidates(file) {
        let location = node_location(file, node);
        let site_key = location.identity();
        match classifier.classify(file, node) {
            Ok(classification) => {
                emitter.emit_classified(level, location, classification).await?;
                report.stats_mut().record_entry();
                report.record_site(site_key);
            }
            Err(e) if e.is_unclassifiable() => {
                emitter
                    .emit_skip(level, location, e.to_string())
                    .await?;
                report.stats_mut().record_entry();
                report.stats_mut().record_skip();
                report.record_skip_location(EntryError::new(
                    file.package.clone(),
                    file.path.clone(),
                    e.to_string(),
                ));
            }
            Err(e) => {
                emitter
                    .emit_failure(level, location, e.to_string())
                    .await?;
                report.stats_mut().record_entry();
                report.stats_mut().record_node_failure();
                report.record_fail_location(EntryError::new(
                    file.package.clone(),
                    file.path.clone(),
                    e.to_string(),
                ));
            }
        }
    }
    Ok(())
}

fn file_location(file: &SourceFile) -> Location {
    Location {
        package: file.package.clone(),
        file: file.path.clone(),
        is_generated_file: file.generated,
        ..Location::default()
    }
}

fn node_location(file: &SourceFile, node: &Node) -> Location {
    Location {
        package: file.package.clone(),
        file: file.path.clone(),
        is_generated_file: file.generated,
        start: node.start,
        end: node.end,
    }
}
