//! Command-line argument definitions.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{ExecMode, Parallelism, SliceConfig, DEFAULT_FRAGMENTS, DEFAULT_MAX_GAP};
use crate::template::CommandTemplate;

/// Slice a pcap file into record-aligned fragments and process them in parallel.
///
/// Each fragment is written, as a standalone pcap stream, to the stdin of its own COMMAND.
/// `{OFFSET}`, `{SIZE}` and `{FRAGMENT_INDEX}` are substituted in every COMMAND token.
#[derive(Parser, Debug)]
#[command(name = "pcap-slicer")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Source pcap file
    #[arg(short = 'r', long = "infile", value_name = "FILE")]
    pub infile: PathBuf,

    /// Number of fragments
    #[arg(short = 'n', long = "number", value_name = "N", default_value_t = DEFAULT_FRAGMENTS, value_parser = parse_fragments)]
    pub fragments: usize,

    /// Maximum packet interval, in seconds, accepted while validating record headers
    #[arg(short = 'g', long = "maxgap", value_name = "SECS", default_value_t = DEFAULT_MAX_GAP)]
    pub max_gap: u32,

    /// Number of commands run at the same time, or "auto" for one per CPU
    #[arg(short = 'p', long = "parallelism", value_name = "N|auto", default_value = "auto")]
    pub parallelism: Parallelism,

    /// Run COMMAND directly instead of through `sh -c` (no shell expansion)
    #[arg(long = "no-shell")]
    pub no_shell: bool,

    /// Print the fragment plan (index, offset, size) and exit without running anything
    #[arg(long = "plan-only")]
    pub plan_only: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Command run for every fragment
    #[arg(value_name = "COMMAND", required_unless_present = "plan_only", trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl Args {
    /// The run configuration selected by the arguments.
    pub fn config(&self) -> SliceConfig {
        SliceConfig {
            fragments: self.fragments,
            max_gap: self.max_gap,
            parallelism: self.parallelism,
            exec_mode: if self.no_shell { ExecMode::Direct } else { ExecMode::Shell },
        }
    }

    pub fn template(&self) -> CommandTemplate {
        CommandTemplate::new(self.command.iter().cloned())
    }

    /// Default log filter for the `-v` count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

fn parse_fragments(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) | Err(_) => Err(format!("expected a positive integer, got {s:?}")),
        Ok(n) => Ok(n),
    }
}
