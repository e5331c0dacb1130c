//! Builders for synthetic captures.

#![allow(dead_code)]

use pcap_slicer::pcap::{GLOBAL_HEADER_LEN, RECORD_HEADER_LEN};
use pcap_slicer::{Endianness, GlobalHeader, RecordHeader};

/// Timestamp of the first record of synthetic captures.
pub const T0: u32 = 1_700_000_000;

/// A capture made of `header` followed by each record and its payload.
pub fn capture(header: &GlobalHeader, records: &[(RecordHeader, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    header.write_to(&mut out).unwrap();

    for (record, payload) in records {
        record.write_to(&mut out, header.endianness).unwrap();
        out.extend_from_slice(payload);
    }

    out
}

/// `count` records of `caplen` zero bytes, the n-th one stamped `ts0 + n * step` seconds.
pub fn uniform(endianness: Endianness, count: usize, ts0: u32, step: u32, caplen: u32) -> Vec<u8> {
    let header = GlobalHeader {
        endianness,
        ..Default::default()
    };

    let records: Vec<_> = (0..count as u32)
        .map(|n| (RecordHeader::new(ts0 + n * step, 0, caplen), vec![0_u8; caplen as usize]))
        .collect();

    capture(&header, &records)
}

/// Big endian, snaplen 65535, ethernet, 6 records with `caplen == len == 10` one second apart.
pub fn six_records() -> Vec<u8> {
    uniform(Endianness::Big, 6, T0, 1, 10)
}

/// Like [`six_records`] with the given timestamps.
pub fn with_timestamps(timestamps: &[u32]) -> Vec<u8> {
    let records: Vec<_> = timestamps
        .iter()
        .map(|&ts| (RecordHeader::new(ts, 0, 10), vec![0_u8; 10]))
        .collect();

    capture(&GlobalHeader::default(), &records)
}

/// Offsets of every record of a well formed capture, found by walking the caplens.
pub fn record_starts(data: &[u8]) -> Vec<u64> {
    let header = GlobalHeader::decode(data).unwrap();
    let mut starts = Vec::new();
    let mut pos = GLOBAL_HEADER_LEN;

    while pos + RECORD_HEADER_LEN <= data.len() {
        let record = RecordHeader::from_slice(&data[pos..], header.endianness).unwrap();
        starts.push(pos as u64);
        pos += RECORD_HEADER_LEN + record.caplen as usize;
    }

    starts
}

/// Every record header of a standalone capture stream.
pub fn records_of(stream: &[u8]) -> Vec<RecordHeader> {
    let header = GlobalHeader::decode(stream).unwrap();
    let mut records = Vec::new();
    let mut pos = GLOBAL_HEADER_LEN;

    while pos < stream.len() {
        let record = RecordHeader::from_slice(&stream[pos..], header.endianness).expect("truncated record header");
        pos += RECORD_HEADER_LEN + record.caplen as usize;
        assert!(pos <= stream.len(), "truncated record payload");
        records.push(record);
    }

    records
}
