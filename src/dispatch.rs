//! Parallel hand-off of fragments to external commands.
//!
//! Every fragment gets its own command, its own read handle on the capture and its own pipe.
//! The command reads a standalone capture on stdin: the global header followed by exactly the
//! fragment's bytes. At most `parallelism` commands run at once, the other fragments wait in a
//! queue. A failing fragment never stops its siblings; the dispatcher waits for every command
//! and reports all failures together.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use crossbeam::channel;
use tracing::{debug, info, warn};

use crate::config::{ExecMode, Parallelism};
use crate::errors::{DispatchError, SliceError, SliceResult, StreamError};
use crate::pcap::{GlobalHeader, GLOBAL_HEADER_LEN};
use crate::plan::{Fragment, FragmentPlan};
use crate::template::CommandTemplate;

/// Size of the chunks copied from the capture into a command's stdin.
pub const CHUNK_SIZE: usize = 8192;


/// Writes the standalone capture of `fragment` into `sink`.
///
/// The encoded `header` comes first, then exactly `fragment.size` bytes read from `capture`
/// starting at `fragment.offset`, copied in chunks of [`CHUNK_SIZE`]. Returns the number of
/// bytes written, `24 + fragment.size` on success.
pub fn write_fragment_stream<R, W>(
    capture: &mut R,
    header: &GlobalHeader,
    fragment: &Fragment,
    sink: &mut W,
) -> Result<u64, StreamError>
where
    R: Read + Seek,
    W: Write,
{
    header.write_to(sink).map_err(StreamError::WriteFailed)?;

    capture
        .seek(SeekFrom::Start(fragment.offset))
        .map_err(|source| StreamError::ReadFailed { offset: fragment.offset, source })?;

    let mut chunk = [0_u8; CHUNK_SIZE];
    let mut copied = 0_u64;

    while copied < fragment.size {
        let wanted = (fragment.size - copied).min(CHUNK_SIZE as u64) as usize;

        let nb_read = match capture.read(&mut chunk[..wanted]) {
            Ok(0) => {
                return Err(StreamError::ShortRead {
                    offset: fragment.offset,
                    expected: fragment.size,
                    got: copied,
                })
            },
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(StreamError::ReadFailed {
                    offset: fragment.offset + copied,
                    source,
                })
            },
        };

        sink.write_all(&chunk[..nb_read]).map_err(StreamError::WriteFailed)?;
        copied += nb_read as u64;
    }

    sink.flush().map_err(StreamError::WriteFailed)?;

    Ok(GLOBAL_HEADER_LEN as u64 + copied)
}


/// A fragment whose command ran and exited successfully.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FragmentRun {
    pub index: usize,
    /// The rendered command line
    pub command: String,
    /// Bytes written to the command's stdin, global header included
    pub bytes_written: u64,
}


/// Outcome of a whole dispatch, ordered by fragment index.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub completed: Vec<FragmentRun>,
    pub failures: Vec<DispatchError>,
}

impl DispatchReport {
    /// Number of fragments dispatched.
    pub fn total(&self) -> usize {
        self.completed.len() + self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// `Ok` with the completed runs if no fragment failed, `SliceError::Dispatch` otherwise.
    pub fn into_result(self) -> SliceResult<Vec<FragmentRun>> {
        if self.failures.is_empty() {
            return Ok(self.completed);
        }

        let total = self.total();
        Err(SliceError::Dispatch {
            failures: self.failures,
            total,
        })
    }
}


/// Runs one command per fragment with bounded parallelism.
///
/// # Examples
///
/// ```rust,no_run
/// use pcap_slicer::{CommandTemplate, Dispatcher, FragmentPlanner};
///
/// let plan = FragmentPlanner::open("capture.pcap", 3600).unwrap().plan(4).unwrap();
///
/// let template = CommandTemplate::new(["tcpdump", "-r", "-", "-w", "part{FRAGMENT_INDEX}.pcap"]);
/// let report = Dispatcher::new("capture.pcap", template).dispatch(&plan);
///
/// assert!(report.is_success());
/// ```
#[derive(Clone, Debug)]
pub struct Dispatcher {
    path: PathBuf,
    template: CommandTemplate,
    parallelism: NonZeroUsize,
    exec_mode: ExecMode,
}

impl Dispatcher {
    /// Creates a dispatcher reading fragments from the capture at `path`.
    ///
    /// Defaults to one concurrent command per CPU and to shell execution.
    pub fn new<P: Into<PathBuf>>(path: P, template: CommandTemplate) -> Dispatcher {
        Dispatcher {
            path: path.into(),
            template,
            parallelism: Parallelism::Auto.resolve(),
            exec_mode: ExecMode::Shell,
        }
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Dispatcher {
        self.parallelism = parallelism.resolve();
        self
    }

    pub fn with_exec_mode(mut self, exec_mode: ExecMode) -> Dispatcher {
        self.exec_mode = exec_mode;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn parallelism(&self) -> NonZeroUsize {
        self.parallelism
    }

    /// Dispatches every fragment of `plan` and waits for all commands to exit.
    pub fn dispatch(&self, plan: &FragmentPlan) -> DispatchReport {
        let header = plan.header();
        let workers = self.parallelism.get().min(plan.len());

        info!(fragments = plan.len(), workers, mode = ?self.exec_mode, "dispatching fragments");

        let (job_tx, job_rx) = channel::unbounded::<&Fragment>();
        let (result_tx, result_rx) = channel::unbounded();

        for fragment in plan {
            // The receiver lives until the end of this function
            let _ = job_tx.send(fragment);
        }
        drop(job_tx);

        thread::scope(|scope| {
            for _ in 0..workers {
                let jobs = job_rx.clone();
                let results = result_tx.clone();

                scope.spawn(move || {
                    for fragment in jobs.iter() {
                        let outcome = self.dispatch_one(header, fragment);
                        if results.send(outcome).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut report = DispatchReport::default();
        for outcome in result_rx.iter() {
            match outcome {
                Ok(run) => report.completed.push(run),
                Err(e) => {
                    warn!(fragment = e.index(), error = %e, "fragment dispatch failed");
                    report.failures.push(e);
                },
            }
        }
        report.completed.sort_by_key(|run| run.index);
        report.failures.sort_by_key(DispatchError::index);

        info!(
            completed = report.completed.len(),
            failed = report.failures.len(),
            "dispatch finished"
        );

        report
    }

    /// Runs the command of a single fragment and waits for it.
    ///
    /// The capture is opened before the command is started, so a missing capture never leaves
    /// a command waiting on an empty pipe. The pipe is closed once the stream is written (or
    /// failed), then the command is waited for.
    pub fn dispatch_one(&self, header: &GlobalHeader, fragment: &Fragment) -> Result<FragmentRun, DispatchError> {
        let index = fragment.index;
        let tokens = self.template.render(fragment);
        let command_line = tokens.join(" ");

        let mut command = match self.exec_mode {
            ExecMode::Shell => {
                if command_line.trim().is_empty() {
                    return Err(DispatchError::EmptyCommand { index });
                }
                shell_command(&command_line)
            },
            ExecMode::Direct => {
                let (program, args) = tokens.split_first().ok_or(DispatchError::EmptyCommand { index })?;
                let mut command = Command::new(program);
                command.args(args);
                command
            },
        };

        let mut capture = File::open(&self.path).map_err(|source| DispatchError::Open {
            index,
            path: self.path.clone(),
            source,
        })?;

        let mut child = command
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|source| DispatchError::Spawn {
                index,
                command: command_line.clone(),
                source,
            })?;

        debug!(index, pid = child.id(), offset = fragment.offset, size = fragment.size, command = %command_line, "spawned command");

        let streamed = match child.stdin.take() {
            Some(mut stdin) => write_fragment_stream(&mut capture, header, fragment, &mut stdin),
            None => Err(StreamError::WriteFailed(io::Error::new(io::ErrorKind::BrokenPipe, "stdin was not captured"))),
        };

        let status = child.wait().map_err(|source| DispatchError::Wait {
            index,
            command: command_line.clone(),
            source,
        })?;

        let bytes_written = streamed.map_err(|source| DispatchError::Stream {
            index,
            command: command_line.clone(),
            source,
        })?;

        if !status.success() {
            return Err(DispatchError::ExitStatus {
                index,
                command: command_line,
                status,
            });
        }

        debug!(index, bytes_written, "command finished");

        Ok(FragmentRun {
            index,
            command: command_line,
            bytes_written,
        })
    }
}

#[cfg(not(windows))]
fn shell_command(command_line: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(command_line);
    command
}

#[cfg(windows)]
fn shell_command(command_line: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(command_line);
    command
}
