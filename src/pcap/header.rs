//! This module contains the `GlobalHeader` struct which represents a global pcap header.

use std::io::{self, Write};

use byteorder_slice::byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::{DEFAULT_SNAPLEN, GLOBAL_HEADER_LEN, MAGIC_BIG, MAGIC_LITTLE, SUPPORTED_VERSION};
use crate::errors::FormatError;
use crate::{DataLink, Endianness};


/// Pcap Global Header
///
/// Decoded once from the first 24 bytes of the capture and re-encoded in front of every
/// fragment, so that each fragment is a standalone capture.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GlobalHeader {
    /// Byte order, derived from the magic value
    pub endianness: Endianness,

    /// Major version number
    pub version_major: u16,

    /// Minor version number
    pub version_minor: u16,

    /// GMT to local timezone correction
    pub ts_correction: i32,

    /// Timestamp accuracy (sigfigs)
    pub ts_accuracy: u32,

    /// Max length of captured packet, never 0 once decoded
    pub snaplen: u32,

    /// DataLink type (first layer in the packet)
    pub datalink: DataLink,
}

impl GlobalHeader {
    /// Decodes a `GlobalHeader` from the first 24 bytes of `slice`.
    ///
    /// A declared snaplen of 0 is replaced by [`DEFAULT_SNAPLEN`].
    ///
    /// # Errors
    /// - `FormatError::Truncated` if less than 24 bytes are given
    /// - `FormatError::BadMagic` if the magic value is not one of the two classic pcap values
    /// - `FormatError::UnsupportedVersion` if the version is not 2.4
    pub fn decode(slice: &[u8]) -> Result<GlobalHeader, FormatError> {
        if slice.len() < GLOBAL_HEADER_LEN {
            return Err(FormatError::Truncated(slice.len()));
        }

        let magic = [slice[0], slice[1], slice[2], slice[3]];
        let body = &slice[4..GLOBAL_HEADER_LEN];

        let header = match magic {
            MAGIC_BIG => decode_fields::<BigEndian>(body, Endianness::Big),
            MAGIC_LITTLE => decode_fields::<LittleEndian>(body, Endianness::Little),
            _ => return Err(FormatError::BadMagic(magic)),
        };

        if (header.version_major, header.version_minor) != SUPPORTED_VERSION {
            return Err(FormatError::UnsupportedVersion {
                major: header.version_major,
                minor: header.version_minor,
            });
        }

        return Ok(header);

        // Inner function used for the decoding of the fields following the magic value
        fn decode_fields<B: ByteOrder>(body: &[u8], endianness: Endianness) -> GlobalHeader {
            let snaplen = match B::read_u32(&body[12..16]) {
                0 => DEFAULT_SNAPLEN,
                snaplen => snaplen,
            };

            GlobalHeader {
                endianness,
                version_major: B::read_u16(&body[0..2]),
                version_minor: B::read_u16(&body[2..4]),
                ts_correction: B::read_i32(&body[4..8]),
                ts_accuracy: B::read_u32(&body[8..12]),
                snaplen,
                datalink: DataLink::from(B::read_u32(&body[16..20])),
            }
        }
    }

    /// The magic value matching this header's byte order.
    pub fn magic(&self) -> [u8; 4] {
        match self.endianness {
            Endianness::Big => MAGIC_BIG,
            Endianness::Little => MAGIC_LITTLE,
        }
    }

    /// Encodes the header in its own byte order, magic value first.
    pub fn encode(&self) -> [u8; GLOBAL_HEADER_LEN] {
        return match self.endianness {
            Endianness::Big => encode_fields::<BigEndian>(self),
            Endianness::Little => encode_fields::<LittleEndian>(self),
        };

        fn encode_fields<B: ByteOrder>(header: &GlobalHeader) -> [u8; GLOBAL_HEADER_LEN] {
            let mut out = [0_u8; GLOBAL_HEADER_LEN];

            // The magic value is stored as raw bytes, its order is what defines B
            out[0..4].copy_from_slice(&header.magic());
            B::write_u16(&mut out[4..6], header.version_major);
            B::write_u16(&mut out[6..8], header.version_minor);
            B::write_i32(&mut out[8..12], header.ts_correction);
            B::write_u32(&mut out[12..16], header.ts_accuracy);
            B::write_u32(&mut out[16..20], header.snaplen);
            B::write_u32(&mut out[20..24], header.datalink.into());

            out
        }
    }

    /// Write the encoded header to a writer.
    ///
    /// Writes 24B in the writer on success.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.encode())
    }
}

/// Creates a new `GlobalHeader` with the default parameters:
///
/// ```rust,ignore
/// GlobalHeader {
///     endianness: Endianness::Big,
///     version_major: 2,
///     version_minor: 4,
///     ts_correction: 0,
///     ts_accuracy: 0,
///     snaplen: 65535,
///     datalink: DataLink::ETHERNET,
/// };
/// ```
impl Default for GlobalHeader {
    fn default() -> Self {
        GlobalHeader {
            endianness: Endianness::Big,
            version_major: 2,
            version_minor: 4,
            ts_correction: 0,
            ts_accuracy: 0,
            snaplen: 65535,
            datalink: DataLink::ETHERNET,
        }
    }
}
