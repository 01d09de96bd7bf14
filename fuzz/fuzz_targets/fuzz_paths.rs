#![no_main]

use dutype::utils::paths::{normalize_with, separator_count, strip_last_segment};
use libfuzzer_sys::fuzz_target;
use std::path::Path;

fuzz_target!(|input: &str| {
    let normalized = normalize_with(input, Path::new("/work/dir"));

    // Backoff must terminate within one step per separator
    let mut working = normalized.as_str();
    let mut steps = 0;
    while let Some(parent) = strip_last_segment(working) {
        assert!(parent.len() < working.len());
        working = parent;
        steps += 1;
    }
    assert!(steps <= separator_count(&normalized));
});
