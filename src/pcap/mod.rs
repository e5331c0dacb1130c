//! Classic pcap header codec: the 24-byte global header and the 16-byte record header.

mod header;
mod record;

pub use header::*;
pub use record::*;

/// Size of the global header at the start of every capture.
pub const GLOBAL_HEADER_LEN: usize = 24;

/// Size of the header in front of every captured packet.
pub const RECORD_HEADER_LEN: usize = 16;

/// Snaplen used when a capture declares 0.
///
/// A conservative jumbo-frame size, not derived from the link type.
pub const DEFAULT_SNAPLEN: u32 = 9000;

/// Magic value of a big endian, microsecond resolution capture.
pub const MAGIC_BIG: [u8; 4] = [0xa1, 0xb2, 0xc3, 0xd4];

/// Magic value of a little endian, microsecond resolution capture.
pub const MAGIC_LITTLE: [u8; 4] = [0xd4, 0xc3, 0xb2, 0xa1];

/// The only (major, minor) version accepted.
pub const SUPPORTED_VERSION: (u16, u16) = (2, 4);
