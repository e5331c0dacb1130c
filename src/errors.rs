use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type SliceResult<T> = Result<T, SliceError>;

/* ----- enum SliceError ----- */

/// Errors that can abort a slicing run.
#[derive(Debug, Error)]
pub enum SliceError {
    /// The global header of the capture is malformed or unsupported.
    #[error(transparent)]
    Format(#[from] FormatError),
    /// No plausible record header was found in the scan window.
    /// # Fields
    /// - fragment_index: fragment whose start was being located
    /// - offset: requested (guessed) byte position
    /// - window_len: number of bytes scanned from `offset`
    #[error("could not find a record header for fragment {fragment_index} at or after offset {offset} ({window_len}B scanned)")]
    BoundaryNotFound {
        fragment_index: usize,
        offset: u64,
        window_len: usize,
    },
    /// The requested plan cannot be built for this capture.
    #[error(transparent)]
    Planning(#[from] PlanningError),
    /// At least one fragment failed to dispatch. Sibling fragments still ran to completion.
    #[error("{} of {total} fragment(s) failed to dispatch", .failures.len())]
    Dispatch {
        failures: Vec<DispatchError>,
        total: usize,
    },
    /// An I/O error occurred while opening or inspecting the capture.
    #[error("I/O error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// An I/O error occurred while reading a scan window.
    #[error("I/O error while reading the capture at offset {offset}")]
    ReadFailed {
        offset: u64,
        #[source]
        source: io::Error,
    },
}


/* ----- enum FormatError ----- */

/// Errors that can occur while decoding the global header.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FormatError {
    /// Less than 24 bytes were available.
    #[error("global header truncated: need 24B, got {0}B")]
    Truncated(usize),
    /// The first four bytes are not a classic pcap magic value.
    #[error("unrecognized magic value: {0:02x?}")]
    BadMagic([u8; 4]),
    /// Only version 2.4 is supported.
    #[error("unsupported pcap version {major}.{minor}, only 2.4 is supported")]
    UnsupportedVersion { major: u16, minor: u16 },
}


/* ----- enum PlanningError ----- */

/// Errors that prevent a fragment plan from being built.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum PlanningError {
    /// At least one fragment must be requested.
    #[error("the number of fragments must be at least 1")]
    ZeroFragments,
    /// The capture is too small to hold the requested number of fragments.
    #[error("capture of {size}B is too small to be split into {fragments} fragment(s)")]
    FileTooSmall { size: u64, fragments: usize },
    /// Two guesses resolved to the same boundary, or a guess resolved before its predecessor.
    #[error("fragment {fragment_index} resolved to offset {offset}, which does not advance past the previous boundary at {previous}")]
    NotEnoughBoundaries {
        fragment_index: usize,
        offset: u64,
        previous: u64,
    },
}


/* ----- enum StreamError ----- */

/// Errors that can occur while copying one fragment into a sink.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Seeking or reading the capture failed.
    #[error("failed to read the capture at offset {offset}")]
    ReadFailed {
        offset: u64,
        #[source]
        source: io::Error,
    },
    /// The capture ended before the whole fragment was read.
    #[error("capture ended early: {got}B of {expected}B read from offset {offset}")]
    ShortRead { offset: u64, expected: u64, got: u64 },
    /// Writing to the sink failed (e.g. broken pipe).
    #[error("failed to write to the sink")]
    WriteFailed(#[source] io::Error),
}


/* ----- enum DispatchError ----- */

/// Errors attached to a single fragment's external command.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The rendered command has no program to run.
    #[error("fragment {index}: command template rendered to an empty command")]
    EmptyCommand { index: usize },
    /// The capture could not be opened for this fragment.
    #[error("fragment {index}: failed to open {}", .path.display())]
    Open {
        index: usize,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The command could not be started.
    #[error("fragment {index}: failed to spawn `{command}`")]
    Spawn {
        index: usize,
        command: String,
        #[source]
        source: io::Error,
    },
    /// Streaming the fragment into the command's stdin failed.
    #[error("fragment {index}: failed to stream into `{command}`")]
    Stream {
        index: usize,
        command: String,
        #[source]
        source: StreamError,
    },
    /// Waiting for the command failed.
    #[error("fragment {index}: failed to wait for `{command}`")]
    Wait {
        index: usize,
        command: String,
        #[source]
        source: io::Error,
    },
    /// The command exited unsuccessfully.
    #[error("fragment {index}: `{command}` exited with {status}")]
    ExitStatus {
        index: usize,
        command: String,
        status: ExitStatus,
    },
}

impl DispatchError {
    /// Index of the fragment this error belongs to.
    pub fn index(&self) -> usize {
        match self {
            DispatchError::EmptyCommand { index }
            | DispatchError::Open { index, .. }
            | DispatchError::Spawn { index, .. }
            | DispatchError::Stream { index, .. }
            | DispatchError::Wait { index, .. }
            | DispatchError::ExitStatus { index, .. } => *index,
        }
    }
}
