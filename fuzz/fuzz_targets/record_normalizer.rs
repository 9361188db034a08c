#![no_main]

use chrono::NaiveDate;
use libfuzzer_sys::fuzz_target;
use llamada::record::{normalize, RawRecord};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as a JSON row: deserialization may fail, but
    // neither parsing nor normalization may panic.
    if let Ok(raw) = serde_json::from_slice::<RawRecord>(data) {
        let today = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let _ = normalize(&raw, today);
    }
});
