//! Protoscan CLI - generated-type usage analysis across rewrite levels
//!
//! This binary classifies every use of a generated data-interchange type in
//! up to four rewrite-level snapshots of a codebase and streams one entry
//! per observed use to the configured sink.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use anyhow::Result;
use clap::{Parser, Subcommand};
use protoscan::analyze::{print_summary, run_analyze, AnalyzeOptions};
use protoscan::diagnostics;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "protoscan")]
#[command(about = "Generated-type usage classification for staged API migrations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify generated-type usage across rewrite-level snapshots
    Analyze {
        /// Snapshot export for the unmodified baseline
        #[arg(long, value_name = "FILE")]
        none: Option<PathBuf>,

        /// Snapshot export for the green rewrite level
        #[arg(long, value_name = "FILE")]
        green: Option<PathBuf>,

        /// Snapshot export for the yellow rewrite level
        #[arg(long, value_name = "FILE")]
        yellow: Option<PathBuf>,

        /// Snapshot export for the red rewrite level
        #[arg(long, value_name = "FILE")]
        red: Option<PathBuf>,

        /// Write entries to this JSONL file instead of the configured sink
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Analyze {
            none,
            green,
            yellow,
            red,
            out,
        }) => {
            let opts = AnalyzeOptions {
                none,
                green,
                yellow,
                red,
                out,
                config: cli.config,
            };
            match run_analyze(opts).await {
                Ok(summary) => {
                    print_summary(&summary);
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
        None => {
            println!("Run 'protoscan analyze' to classify snapshots, or --help for options");
            Ok(())
        }
    };

    // buffered diagnostics are persisted even on failure paths
    diagnostics::flush();
    result
}

/// Initialize logging system
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "protoscan={level},protoscan_core={level},protoscan_analysis={level},protoscan_sink={level}"
        ))
        .init();
}
