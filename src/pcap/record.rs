use std::io::{self, Write};

use byteorder_slice::byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};

use super::RECORD_HEADER_LEN;
use crate::Endianness;


/// Pcap record (packet) header.
///
/// Decoding never validates anything: candidate positions are judged by the boundary locator.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
pub struct RecordHeader {
    /// Timestamp in seconds
    pub ts_sec: u32,
    /// Microsecond part of the timestamp
    pub ts_usec: u32,
    /// Number of octets of the packet saved in file
    pub caplen: u32,
    /// Original length of the packet on the wire
    pub orig_len: u32,
}

impl RecordHeader {
    /// Creates a new `RecordHeader` with `caplen == orig_len == len`.
    pub fn new(ts_sec: u32, ts_usec: u32, len: u32) -> RecordHeader {
        RecordHeader {
            ts_sec,
            ts_usec,
            caplen: len,
            orig_len: len,
        }
    }

    /// Decodes the 16 bytes of `bytes` in the given byte order.
    pub fn decode(bytes: &[u8; RECORD_HEADER_LEN], endianness: Endianness) -> RecordHeader {
        match endianness {
            Endianness::Big => RecordHeader::decode_as::<BigEndian>(bytes),
            Endianness::Little => RecordHeader::decode_as::<LittleEndian>(bytes),
        }
    }

    /// Decodes a header from the start of `slice`, or `None` if it holds less than 16 bytes.
    pub fn from_slice(slice: &[u8], endianness: Endianness) -> Option<RecordHeader> {
        let bytes: &[u8; RECORD_HEADER_LEN] = slice.get(..RECORD_HEADER_LEN)?.try_into().ok()?;
        Some(RecordHeader::decode(bytes, endianness))
    }

    #[inline]
    pub(crate) fn decode_as<B: ByteOrder>(bytes: &[u8]) -> RecordHeader {
        RecordHeader {
            ts_sec: B::read_u32(&bytes[0..4]),
            ts_usec: B::read_u32(&bytes[4..8]),
            caplen: B::read_u32(&bytes[8..12]),
            orig_len: B::read_u32(&bytes[12..16]),
        }
    }

    /// Write a `RecordHeader` to a writer in the given byte order.
    ///
    /// Writes 16B in the writer on success.
    pub fn write_to<W: Write>(&self, writer: &mut W, endianness: Endianness) -> io::Result<()> {
        return match endianness {
            Endianness::Big => write_fields::<_, BigEndian>(self, writer),
            Endianness::Little => write_fields::<_, LittleEndian>(self, writer),
        };

        fn write_fields<W: Write, B: ByteOrder>(header: &RecordHeader, writer: &mut W) -> io::Result<()> {
            writer.write_u32::<B>(header.ts_sec)?;
            writer.write_u32::<B>(header.ts_usec)?;
            writer.write_u32::<B>(header.caplen)?;
            writer.write_u32::<B>(header.orig_len)?;

            Ok(())
        }
    }
}
