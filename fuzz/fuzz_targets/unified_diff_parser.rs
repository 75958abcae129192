#![no_main]

use libfuzzer_sys::fuzz_target;

use deltacov_diff::{parse_unified_diff, parse_unified_diffs};

fuzz_target!(|data: &[u8]| {
    let s = String::from_utf8_lossy(data);
    if let Ok(index) = parse_unified_diff(&s) {
        for (path, lines) in index.iter() {
            assert!(!path.is_empty());
            assert!(lines.iter().all(|&l| l > 0));
        }
        // Unioning a diff with itself changes nothing.
        let twice = parse_unified_diffs([&*s, &*s]).expect("same input parses");
        assert_eq!(twice, index);
    }
});
