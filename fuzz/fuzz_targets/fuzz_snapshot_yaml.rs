#![no_main]
use chrono::FixedOffset;
use cottage_booking::adapters::snapshot_store::Snapshot;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml) = std::str::from_utf8(data) {
        if let Some(utc) = FixedOffset::east_opt(0) {
            if let Ok(snapshot) = Snapshot::from_yaml(yaml, utc, false) {
                for occupancy in &snapshot.occupancies {
                    assert!(occupancy.range.start() < occupancy.range.end());
                }
            }
        }
    }
});
