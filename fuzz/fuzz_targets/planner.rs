#![no_main]
use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use pcap_slicer::FragmentPlanner;

fuzz_target!(|data: &[u8]| {
    if let Ok(mut planner) = FragmentPlanner::new(Cursor::new(data), 3600) {
        for count in 1..=4 {
            if let Ok(plan) = planner.plan(count) {
                assert_eq!(plan.len(), count);
                assert_eq!(plan.fragments()[0].offset + plan.sizes().sum::<u64>(), data.len() as u64);
            }
        }
    }
});
