#![no_main]
use libfuzzer_sys::fuzz_target;
use pcap_slicer::locate::{scan_window, Plausibility};
use pcap_slicer::{Endianness, RecordHeader, TimeAnchor};

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }

    let (params, window) = data.split_at(8);
    let anchor = TimeAnchor::new(u32::from_le_bytes([params[0], params[1], params[2], params[3]]), 0);
    let rules = Plausibility {
        snaplen: u16::from_le_bytes([params[4], params[5]]) as u32,
        max_gap: params[6] as u32 * 60,
    };
    let endianness = if params[7] & 1 == 0 { Endianness::Big } else { Endianness::Little };

    if let Some((d, record)) = scan_window(window, endianness, &anchor, &rules) {
        assert!(d + 16 <= window.len());
        assert_eq!(RecordHeader::from_slice(&window[d..], endianness), Some(record));
        assert!(rules.accepts(&record, &anchor));
    }
});
