#![no_main]
use chrono::FixedOffset;
use cottage_booking::domain::date_range::{DateInput, parse_day, parse_stay};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let _ = parse_day(text);
    if let Some((checkin, checkout)) = text.split_once('|') {
        if let Ok(range) = parse_stay(checkin, checkout) {
            assert!(range.start() < range.end());
        }
    }
    if let Ok(input) = serde_json::from_str::<DateInput>(text) {
        for hours in [-12, 0, 14] {
            if let Some(offset) = FixedOffset::east_opt(hours * 3600) {
                let _ = input.to_calendar_day(offset);
            }
        }
    }
});
