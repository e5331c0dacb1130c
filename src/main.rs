//! pcap-slicer CLI entry point.

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pcap_slicer::cli::Args;
use pcap_slicer::{Dispatcher, FragmentPlanner};

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr, stdout is kept for --plan-only
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| args.log_level().into()))
        .with_writer(io::stderr)
        .init();

    let config = args.config();

    let plan = FragmentPlanner::open(&args.infile, config.max_gap)
        .and_then(|mut planner| planner.plan(config.fragments))
        .with_context(|| format!("Failed to plan {}", args.infile.display()))?;

    if args.plan_only {
        let mut stdout = io::stdout().lock();
        for fragment in &plan {
            writeln!(stdout, "{} {} {}", fragment.index, fragment.offset, fragment.size)?;
        }
        return Ok(());
    }

    let runs = Dispatcher::new(&args.infile, args.template())
        .with_parallelism(config.parallelism)
        .with_exec_mode(config.exec_mode)
        .dispatch(&plan)
        .into_result()
        .with_context(|| format!("Failed to process {}", args.infile.display()))?;

    tracing::info!(fragments = runs.len(), "all fragments processed");

    Ok(())
}
