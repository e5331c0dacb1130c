//! Recovery of record boundaries from approximate byte offsets.
//!
//! There is no index in a classic pcap file, so a position picked by arithmetic almost never
//! falls on a record header. The locator reads a window starting at the guessed position and
//! slides a 16-byte probe over it one byte at a time, accepting the first position whose
//! decoded fields look like a real record header:
//!
//! 1. its timestamp is not older than the [`TimeAnchor`],
//! 2. it is at most `max_gap` seconds newer than the anchor,
//! 3. its captured length does not exceed the capture's snaplen.
//!
//! This is a heuristic. Arbitrary bytes can pass all three checks, and the larger `max_gap`
//! is the more likely that becomes.

use std::io::{self, Read, Seek, SeekFrom};

use byteorder_slice::byteorder::{BigEndian, ByteOrder, LittleEndian};
use tracing::{debug, trace};

use crate::errors::{SliceError, SliceResult};
use crate::pcap::{GlobalHeader, RecordHeader, RECORD_HEADER_LEN};
use crate::Endianness;

/// Bytes read past `snaplen` so that a window always holds one whole record and its header.
pub const SCAN_MARGIN: usize = 1000;


/// Timestamp of the most recently accepted record header.
///
/// Candidates are only accepted if they do not go back in time relative to the anchor, so the
/// anchor must be threaded through the fragments in index order.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TimeAnchor {
    /// Timestamp in seconds
    pub ts_sec: u32,
    /// Microsecond part of the timestamp
    pub ts_usec: u32,
}

impl TimeAnchor {
    pub fn new(ts_sec: u32, ts_usec: u32) -> TimeAnchor {
        TimeAnchor { ts_sec, ts_usec }
    }

    /// True if `record`'s seconds are within `[self.ts_sec, self.ts_sec + max_gap]`.
    pub fn admits(&self, record: &RecordHeader, max_gap: u32) -> bool {
        record.ts_sec >= self.ts_sec && record.ts_sec - self.ts_sec <= max_gap
    }
}

impl From<&RecordHeader> for TimeAnchor {
    fn from(record: &RecordHeader) -> Self {
        TimeAnchor::new(record.ts_sec, record.ts_usec)
    }
}


/// Limits a candidate record header must respect.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Plausibility {
    /// Captured lengths above this are rejected
    pub snaplen: u32,
    /// Forward timestamp jumps above this many seconds are rejected
    pub max_gap: u32,
}

impl Plausibility {
    /// True if `record` could start at the probed position given the current `anchor`.
    #[inline]
    pub fn accepts(&self, record: &RecordHeader, anchor: &TimeAnchor) -> bool {
        anchor.admits(record, self.max_gap) && record.caplen <= self.snaplen
    }
}


/// Returns the first position of `window` holding a plausible record header, with the header.
///
/// Every position `d` with `d + 16 <= window.len()` is probed, so the scan never decodes
/// bytes past the end of the window.
pub fn scan_window(
    window: &[u8],
    endianness: Endianness,
    anchor: &TimeAnchor,
    rules: &Plausibility,
) -> Option<(usize, RecordHeader)> {
    return match endianness {
        Endianness::Big => scan::<BigEndian>(window, anchor, rules),
        Endianness::Little => scan::<LittleEndian>(window, anchor, rules),
    };

    fn scan<B: ByteOrder>(window: &[u8], anchor: &TimeAnchor, rules: &Plausibility) -> Option<(usize, RecordHeader)> {
        let last = window.len().checked_sub(RECORD_HEADER_LEN)?;

        // Inclusive: a header ending exactly at the window end is a candidate
        (0..=last).find_map(|d| {
            let record = RecordHeader::decode_as::<B>(&window[d..d + RECORD_HEADER_LEN]);
            rules.accepts(&record, anchor).then_some((d, record))
        })
    }
}


/// Finds record boundaries in a seekable capture.
#[derive(Debug)]
pub struct BoundaryLocator<R: Read + Seek> {
    reader: R,
    endianness: Endianness,
    rules: Plausibility,
    window: Vec<u8>,
}

impl<R: Read + Seek> BoundaryLocator<R> {
    /// Creates a locator for a capture whose global header is `header`.
    pub fn new(reader: R, header: &GlobalHeader, max_gap: u32) -> BoundaryLocator<R> {
        BoundaryLocator {
            reader,
            endianness: header.endianness,
            rules: Plausibility { snaplen: header.snaplen, max_gap },
            window: Vec::new(),
        }
    }

    /// Number of bytes read from each guessed position.
    pub fn window_len(&self) -> usize {
        self.rules.snaplen as usize + SCAN_MARGIN
    }

    /// Locates the first plausible record header at or after `guess`.
    ///
    /// On success the anchor is moved to the accepted record's timestamp and the absolute
    /// offset of the record is returned.
    ///
    /// # Errors
    /// - `SliceError::BoundaryNotFound` if no position of the window is plausible
    /// - `SliceError::ReadFailed` if the window cannot be read
    pub fn locate(&mut self, fragment_index: usize, guess: u64, anchor: &mut TimeAnchor) -> SliceResult<u64> {
        let window_len = self.window_len();
        self.fill_window(guess, window_len)
            .map_err(|source| SliceError::ReadFailed { offset: guess, source })?;

        match scan_window(&self.window, self.endianness, anchor, &self.rules) {
            Some((skipped, record)) => {
                let offset = guess + skipped as u64;
                if skipped > 0 {
                    trace!(fragment_index, guess, skipped, "skipped implausible positions");
                }
                debug!(
                    fragment_index,
                    offset,
                    ts_sec = record.ts_sec,
                    ts_usec = record.ts_usec,
                    caplen = record.caplen,
                    "located record boundary"
                );

                *anchor = TimeAnchor::from(&record);
                Ok(offset)
            },
            None => Err(SliceError::BoundaryNotFound {
                fragment_index,
                offset: guess,
                window_len: self.window.len(),
            }),
        }
    }

    /// Consumes the `BoundaryLocator`, returning the wrapped reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    // Reads up to `len` bytes from `offset`, fewer at the end of the capture
    fn fill_window(&mut self, offset: u64, len: usize) -> io::Result<()> {
        self.window.clear();
        self.reader.seek(SeekFrom::Start(offset))?;
        self.reader.by_ref().take(len as u64).read_to_end(&mut self.window)?;

        Ok(())
    }
}
