//! The analyze command: run the classifier across rewrite-level snapshots.

use anyhow::{bail, Context, Result};
use protoscan_analysis::{Correlator, JsonSnapshotSource, RunSummary, SnapshotSet};
use protoscan_core::config::Config;
use protoscan_core::entry::RewriteLevel;
use protoscan_sink::create_sink;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Inputs of one analysis run
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Snapshot export of the unmodified baseline
    pub none: Option<PathBuf>,
    /// Snapshot exports of the staged rewrites
    pub green: Option<PathBuf>,
    pub yellow: Option<PathBuf>,
    pub red: Option<PathBuf>,
    /// Write entries to this JSONL file instead of the configured sink
    pub out: Option<PathBuf>,
    /// Configuration file path
    pub config: Option<PathBuf>,
}

/// Runs the correlator over the provided snapshots and returns the summary
pub async fn run_analyze(opts: AnalyzeOptions) -> Result<RunSummary> {
    let mut config = load_config(opts.config.as_deref())?;
    if let Some(out) = &opts.out {
        config.output.provider = "jsonl".to_string();
        config.output.path = Some(out.display().to_string());
    }
    config.validate().context("invalid configuration")?;

    let mut snapshots = SnapshotSet::new();
    let inputs = [
        (RewriteLevel::None, &opts.none),
        (RewriteLevel::Green, &opts.green),
        (RewriteLevel::Yellow, &opts.yellow),
        (RewriteLevel::Red, &opts.red),
    ];
    for (level, path) in inputs {
        if let Some(path) = path {
            snapshots = snapshots.with(level, Arc::new(JsonSnapshotSource::new(path.clone())));
        }
    }
    if snapshots.is_empty() {
        bail!("at least one snapshot export (--none/--green/--yellow/--red) is required");
    }

    info!(levels = snapshots.len(), "starting analyze");
    let sink = create_sink(&config.output)
        .await
        .context("creating entry sink")?;
    let correlator = Correlator::new(config.analysis.clone(), sink);
    let summary = correlator.run_all(snapshots).await?;
    Ok(summary)
}

/// Prints the run summary with the explicit FAIL and SKIP account
pub fn print_summary(summary: &RunSummary) {
    println!("run {}", summary.run_id());
    for report in summary.reports() {
        match report.load_error() {
            Some(err) => println!("{}: snapshot load failed: {err}", report.level()),
            None => {
                let stats = report.stats();
                println!(
                    "{}: {} files, {} entries, {} failed, {} skipped ({} ms)",
                    report.level(),
                    stats.total_files(),
                    stats.entries_emitted(),
                    stats.failed_files() + stats.failed_nodes(),
                    stats.skipped_locations(),
                    stats.processing_time_ms()
                );
            }
        }
    }
    println!(
        "{} distinct call sites, {} FAIL, {} SKIP",
        summary.distinct_sites(),
        summary.fail_count(),
        summary.skip_count()
    );
    for report in summary.reports() {
        for err in report.fail_locations() {
            println!(
                "  FAIL [{}] {} {}: {}",
                report.level(),
                err.package,
                err.file,
                err.message
            );
        }
        for err in report.skip_locations() {
            println!(
                "  SKIP [{}] {} {}: {}",
                report.level(),
                err.package,
                err.file,
                err.message
            );
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_file(Path::new("protoscan.toml"))?,
    };
    Ok(config)
}
