//! Types shared by the header codec and the rest of the crate.

use std::fmt;

/// Byte order of a capture, derived from its magic number.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Endianness {
    /// Big endian (`a1 b2 c3 d4` on disk)
    Big,
    /// Little endian (`d4 c3 b2 a1` on disk)
    Little,
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endianness::Big => f.write_str("big-endian"),
            Endianness::Little => f.write_str("little-endian"),
        }
    }
}

/// Link-layer type declared in the global header.
///
/// Only the common types are named; everything else is carried as `Unknown` so that
/// a header always re-encodes to the exact value it was decoded from.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DataLink {
    NULL,
    ETHERNET,
    RAW,
    IEEE802_11,
    LOOP,
    LINUX_SLL,
    IEEE802_11_RADIOTAP,
    LINUX_SLL2,
    Unknown(u32),
}

impl From<u32> for DataLink {
    fn from(link: u32) -> DataLink {
        match link {
            0 => DataLink::NULL,
            1 => DataLink::ETHERNET,
            101 => DataLink::RAW,
            105 => DataLink::IEEE802_11,
            108 => DataLink::LOOP,
            113 => DataLink::LINUX_SLL,
            127 => DataLink::IEEE802_11_RADIOTAP,
            276 => DataLink::LINUX_SLL2,
            t => DataLink::Unknown(t),
        }
    }
}

impl From<DataLink> for u32 {
    fn from(link: DataLink) -> u32 {
        match link {
            DataLink::NULL => 0,
            DataLink::ETHERNET => 1,
            DataLink::RAW => 101,
            DataLink::IEEE802_11 => 105,
            DataLink::LOOP => 108,
            DataLink::LINUX_SLL => 113,
            DataLink::IEEE802_11_RADIOTAP => 127,
            DataLink::LINUX_SLL2 => 276,
            DataLink::Unknown(t) => t,
        }
    }
}
