#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Oracle output is decoded lossily before parsing
    let report = String::from_utf8_lossy(data);

    for entry in dutype::index::oracle::parse_report(&report) {
        assert!(!entry.path.is_empty());
    }
    let _ = dutype::index::oracle::parse_coverage(&report);
});
