//! Fuzz target for class path resolution against arbitrary diff paths.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use deltacov_domain::{PathIndex, PathQuery, resolve_class_path};

#[derive(Arbitrary, Debug)]
struct Input {
    diff_paths: Vec<String>,
    source_file: String,
    class_name: String,
}

fuzz_target!(|input: Input| {
    let resolved = resolve_class_path(&input.source_file, &input.class_name);
    let index = PathIndex::new(input.diff_paths.iter().map(String::as_str));

    for query in [PathQuery::path(&resolved), PathQuery::stem(&resolved)] {
        let first = index.lookup(&query).map(str::to_string);
        // Lookups are deterministic and only return indexed paths.
        assert_eq!(index.lookup(&query).map(str::to_string), first);
        if let Some(found) = first {
            assert!(input.diff_paths.contains(&found));
        }
    }
});
