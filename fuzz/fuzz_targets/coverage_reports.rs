//! Fuzz target for the CSV and JaCoCo XML coverage providers.
//!
//! Both providers must reject malformed input with an error, never a panic,
//! and merging whatever they accept must keep one record per class.

#![no_main]

use libfuzzer_sys::fuzz_target;

use deltacov_coverage::{CoverageFormat, load_coverage, merge_coverage};

fuzz_target!(|data: &[u8]| {
    let csv = load_coverage(CoverageFormat::Csv, data);
    let xml = load_coverage(CoverageFormat::JacocoXml, data);

    let sets: Vec<_> = [csv, xml].into_iter().filter_map(Result::ok).collect();
    let merged = merge_coverage(sets);
    for pair in merged.windows(2) {
        assert!(pair[0].class_name < pair[1].class_name);
    }
});
