#![no_main]
use libfuzzer_sys::fuzz_target;
use pcap_slicer::GlobalHeader;

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = GlobalHeader::decode(data) {
        assert_ne!(header.snaplen, 0);

        let encoded = header.encode();
        if data[16..20] != [0; 4] {
            assert_eq!(&encoded[..], &data[..24]);
        }
    }
});
