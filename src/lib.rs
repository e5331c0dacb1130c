//! Splits a classic pcap capture into record-aligned fragments and streams each fragment,
//! as a standalone capture, into its own external command.
//!
//! Planning is sequential: [`FragmentPlanner`] guesses evenly spaced offsets and lets the
//! [`BoundaryLocator`] snap each one to the nearest plausible record header, carrying a
//! [`TimeAnchor`] from one fragment to the next. Dispatching is parallel: [`Dispatcher`] runs one
//! command per fragment, at most `parallelism` at a time, and feeds it the global header followed
//! by the fragment's bytes.
//!
//! # Examples
//!
//! ```no_run
//! use pcap_slicer::{CommandTemplate, SliceConfig};
//!
//! let config = SliceConfig { fragments: 4, ..Default::default() };
//! let template = CommandTemplate::new(["cat", ">", "part{FRAGMENT_INDEX}.pcap"]);
//!
//! let runs = pcap_slicer::run("capture.pcap", &config, &template).unwrap();
//! assert_eq!(runs.len(), 4);
//! ```

use std::path::Path;

pub mod errors;
pub mod pcap;
pub mod locate;
pub mod plan;
pub mod template;
pub mod dispatch;
pub mod config;
pub mod cli;
mod common;

pub use common::*;
pub use config::{ExecMode, Parallelism, SliceConfig};
pub use dispatch::{write_fragment_stream, DispatchReport, Dispatcher, FragmentRun};
pub use errors::*;
pub use locate::{BoundaryLocator, TimeAnchor};
pub use pcap::{GlobalHeader, RecordHeader};
pub use plan::{Fragment, FragmentPlan, FragmentPlanner};
pub use template::CommandTemplate;

/// Plans the capture at `path` and dispatches every fragment to `template`.
///
/// Planning errors abort the run before any command is started. Dispatch waits for every
/// command; if any fragment failed, all failures are returned in `SliceError::Dispatch`.
pub fn run<P: AsRef<Path>>(path: P, config: &SliceConfig, template: &CommandTemplate) -> SliceResult<Vec<FragmentRun>> {
    let path = path.as_ref();
    let plan = FragmentPlanner::open(path, config.max_gap)?.plan(config.fragments)?;

    Dispatcher::new(path, template.clone())
        .with_parallelism(config.parallelism)
        .with_exec_mode(config.exec_mode)
        .dispatch(&plan)
        .into_result()
}
