//! Partitioning of a capture into record-aligned fragments.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::iter;
use std::path::Path;

use tracing::{debug, info};

use crate::errors::{PlanningError, SliceError, SliceResult};
use crate::locate::{BoundaryLocator, TimeAnchor};
use crate::pcap::{GlobalHeader, RecordHeader, GLOBAL_HEADER_LEN, RECORD_HEADER_LEN};


/// A contiguous byte range of the capture, starting on a record header.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Fragment {
    /// Zero-based position of the fragment in the plan
    pub index: usize,
    /// Offset of the first record header of the fragment
    pub offset: u64,
    /// Length of the fragment in bytes
    pub size: u64,
}

impl Fragment {
    /// Offset one past the last byte of the fragment.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}


/// The ordered, immutable result of planning.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FragmentPlan {
    header: GlobalHeader,
    total_size: u64,
    fragments: Vec<Fragment>,
}

impl FragmentPlan {
    /// Builds a plan from located offsets.
    ///
    /// Every fragment but the last ends where the next one starts, the last one runs to the
    /// end of the capture. `offsets` must be strictly increasing and below `total_size`.
    pub fn from_offsets(header: GlobalHeader, offsets: &[u64], total_size: u64) -> FragmentPlan {
        let ends = offsets.iter().skip(1).copied().chain(iter::once(total_size));

        let fragments = offsets
            .iter()
            .zip(ends)
            .enumerate()
            .map(|(index, (&offset, end))| Fragment {
                index,
                offset,
                size: end - offset,
            })
            .collect();

        FragmentPlan {
            header,
            total_size,
            fragments,
        }
    }

    /// Global header re-sent in front of every fragment.
    pub fn header(&self) -> &GlobalHeader {
        &self.header
    }

    /// Size of the whole capture in bytes.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Start offsets of the fragments, in order.
    pub fn offsets(&self) -> impl Iterator<Item = u64> + '_ {
        self.fragments.iter().map(|f| f.offset)
    }

    /// Sizes of the fragments, in order.
    pub fn sizes(&self) -> impl Iterator<Item = u64> + '_ {
        self.fragments.iter().map(|f| f.size)
    }
}

impl<'a> IntoIterator for &'a FragmentPlan {
    type Item = &'a Fragment;
    type IntoIter = std::slice::Iter<'a, Fragment>;

    fn into_iter(self) -> Self::IntoIter {
        self.fragments.iter()
    }
}


/// Splits a capture into fragments starting on located record boundaries.
///
/// # Examples
///
/// ```rust,no_run
/// use pcap_slicer::FragmentPlanner;
///
/// let mut planner = FragmentPlanner::open("capture.pcap", 3600).unwrap();
/// let plan = planner.plan(4).unwrap();
///
/// for fragment in &plan {
///     println!("{} {} {}", fragment.index, fragment.offset, fragment.size);
/// }
/// ```
#[derive(Debug)]
pub struct FragmentPlanner<R: Read + Seek> {
    locator: BoundaryLocator<R>,
    header: GlobalHeader,
    first_record: Option<RecordHeader>,
    total_size: u64,
}

impl FragmentPlanner<File> {
    /// Opens the capture at `path` and decodes its global header.
    pub fn open<P: AsRef<Path>>(path: P, max_gap: u32) -> SliceResult<FragmentPlanner<File>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SliceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        FragmentPlanner::new(file, max_gap)
    }
}

impl<R: Read + Seek> FragmentPlanner<R> {
    /// Creates a planner over `reader`, decoding the global header and the first record header.
    ///
    /// # Errors
    /// Returns `SliceError::Format` if the global header is malformed or unsupported, before
    /// anything else is read.
    pub fn new(mut reader: R, max_gap: u32) -> SliceResult<FragmentPlanner<R>> {
        let read_failed = |source| SliceError::ReadFailed { offset: 0, source };

        let total_size = reader.seek(SeekFrom::End(0)).map_err(read_failed)?;
        reader.seek(SeekFrom::Start(0)).map_err(read_failed)?;

        let mut head = [0_u8; GLOBAL_HEADER_LEN + RECORD_HEADER_LEN];
        let filled = read_up_to(&mut reader, &mut head).map_err(read_failed)?;

        let header = GlobalHeader::decode(&head[..filled])?;
        let first_record = RecordHeader::from_slice(&head[GLOBAL_HEADER_LEN..filled], header.endianness);

        info!(
            total_size,
            endianness = %header.endianness,
            snaplen = header.snaplen,
            datalink = ?header.datalink,
            "decoded global header"
        );

        Ok(FragmentPlanner {
            locator: BoundaryLocator::new(reader, &header, max_gap),
            header,
            first_record,
            total_size,
        })
    }

    pub fn header(&self) -> &GlobalHeader {
        &self.header
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Locates `count` fragments and derives their sizes.
    ///
    /// Guesses are spread evenly (`i * total_size / count`, never inside the global header) and
    /// resolved strictly in index order, each one starting from the anchor left by the previous
    /// one. The anchor starts at the first record of the capture, so planning the same capture
    /// twice gives the same plan.
    ///
    /// # Errors
    /// - `PlanningError::ZeroFragments` if `count` is 0
    /// - `PlanningError::FileTooSmall` if the capture holds no record header or less than one
    ///   byte per fragment
    /// - `SliceError::BoundaryNotFound` as soon as one fragment cannot be located
    /// - `PlanningError::NotEnoughBoundaries` if a fragment does not start after its predecessor
    pub fn plan(&mut self, count: usize) -> SliceResult<FragmentPlan> {
        if count == 0 {
            return Err(PlanningError::ZeroFragments.into());
        }

        let too_small = PlanningError::FileTooSmall {
            size: self.total_size,
            fragments: count,
        };
        let first_record = self.first_record.ok_or_else(|| too_small.clone())?;
        let base_size = self.total_size / count as u64;
        if base_size == 0 {
            return Err(too_small.into());
        }

        let mut anchor = TimeAnchor::from(&first_record);
        let mut offsets: Vec<u64> = Vec::with_capacity(count);

        for index in 0..count {
            let guess = (index as u64 * base_size).max(GLOBAL_HEADER_LEN as u64);
            let offset = self.locator.locate(index, guess, &mut anchor)?;

            if let Some(&previous) = offsets.last() {
                if offset <= previous {
                    return Err(PlanningError::NotEnoughBoundaries {
                        fragment_index: index,
                        offset,
                        previous,
                    }
                    .into());
                }
            }

            debug!(index, guess, offset, "fragment start settled");
            offsets.push(offset);
        }

        let plan = FragmentPlan::from_offsets(self.header, &offsets, self.total_size);
        info!(fragments = plan.len(), base_size, "fragment plan ready");

        Ok(plan)
    }

    /// Consumes the `FragmentPlanner`, returning the wrapped reader.
    pub fn into_inner(self) -> R {
        self.locator.into_inner()
    }
}

// Fills as much of `buf` as the reader allows, returns the number of bytes read
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(filled)
}
