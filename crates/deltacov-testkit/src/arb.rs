//! Proptest strategies for generating valid test inputs.
//!
//! Strategies are constructive: every generated config, class name and diff
//! is valid without filtering.
//!
//! # Bounds
//!
//! - Max files per diff: 5
//! - Max hunks per file: 5
//! - Max lines per hunk: 20
//! - Max line length: 200 bytes

use deltacov_types::{
    ConfigFile, Counter, CoverageCounters, CoverageEntity, Defaults, MethodAttribution,
    ViolationRule,
};
use proptest::prelude::*;

use crate::diff_builder::{DiffBuilder, FileBuilder, HunkBuilder};

pub const MAX_FILES: usize = 5;

pub const MAX_HUNKS_PER_FILE: usize = 5;

pub const MAX_LINES_PER_HUNK: usize = 20;

pub const MAX_LINE_LENGTH: usize = 200;

/// Upper bound for generated counter components, small enough that sums of
/// many counters never saturate.
pub const MAX_COUNTER_VALUE: u32 = 10_000;

// =============================================================================
// Rules and config
// =============================================================================

pub fn arb_entity() -> impl Strategy<Value = CoverageEntity> {
    prop::sample::select(CoverageEntity::ALL.to_vec())
}

pub fn arb_attribution() -> impl Strategy<Value = MethodAttribution> {
    prop_oneof![
        Just(MethodAttribution::AnyLine),
        Just(MethodAttribution::AllLines),
    ]
}

/// Ratios on a 1/100 grid, exact through TOML and JSON.
pub fn arb_ratio() -> impl Strategy<Value = f64> {
    (0u32..=100).prop_map(|n| f64::from(n) / 100.0)
}

pub fn arb_rule() -> impl Strategy<Value = ViolationRule> {
    (arb_entity(), arb_ratio()).prop_map(|(entity, min_ratio)| ViolationRule { entity, min_ratio })
}

/// Class-exclusion globs built from known-valid pieces.
pub fn arb_class_glob() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_package().prop_map(|p| format!("{p}.*")),
        arb_package().prop_map(|p| format!("{}/**", p.replace('.', "/"))),
        arb_simple_class_name().prop_map(|c| format!("**/{c}")),
        Just("**/generated/**".to_string()),
    ]
}

pub fn arb_defaults() -> impl Strategy<Value = Defaults> {
    (
        prop::option::of(any::<bool>()),
        prop::option::of(arb_ratio()),
        prop::option::of(arb_attribution()),
        prop::collection::vec(arb_class_glob(), 0..3),
    )
        .prop_map(
            |(fail_on_violation, fail_if_coverage_less_than, method_attribution, exclude_classes)| {
                Defaults {
                    fail_on_violation,
                    fail_if_coverage_less_than,
                    method_attribution,
                    exclude_classes,
                }
            },
        )
}

pub fn arb_config_file() -> impl Strategy<Value = ConfigFile> {
    (arb_defaults(), prop::collection::vec(arb_rule(), 0..6)).prop_map(|(defaults, rule)| {
        ConfigFile {
            includes: vec![],
            defaults,
            rule,
        }
    })
}

// =============================================================================
// Counters
// =============================================================================

pub fn arb_counter() -> impl Strategy<Value = Counter> {
    (0..MAX_COUNTER_VALUE, 0..MAX_COUNTER_VALUE)
        .prop_map(|(missed, covered)| Counter::new(missed, covered))
}

pub fn arb_counters() -> impl Strategy<Value = CoverageCounters> {
    (
        arb_counter(),
        arb_counter(),
        arb_counter(),
        arb_counter(),
        arb_counter(),
    )
        .prop_map(
            |(instruction, branch, line, complexity, method)| CoverageCounters {
                instruction,
                branch,
                line,
                complexity,
                method,
            },
        )
}

// =============================================================================
// Class names and paths
// =============================================================================

/// Dotted Java package such as `com.acme.billing`.
pub fn arb_package() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9]{0,7}", 1..4).prop_map(|parts| parts.join("."))
}

pub fn arb_simple_class_name() -> impl Strategy<Value = String> {
    "[A-Z][A-Za-z0-9]{0,11}"
}

/// Qualified class name, occasionally nested (`pkg.Outer$Inner`).
pub fn arb_qualified_class() -> impl Strategy<Value = String> {
    (
        arb_package(),
        arb_simple_class_name(),
        prop::option::of(arb_simple_class_name()),
    )
        .prop_map(|(pkg, outer, inner)| match inner {
            Some(inner) => format!("{pkg}.{outer}${inner}"),
            None => format!("{pkg}.{outer}"),
        })
}

/// Repo-relative source path for a qualified class under a Maven-style root.
pub fn source_path_for(class_name: &str) -> String {
    let outer = class_name.split('$').next().unwrap_or(class_name);
    format!("src/main/java/{}.java", outer.replace('.', "/"))
}

// =============================================================================
// Diffs
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum LineOp {
    Context,
    Add,
    Remove,
}

fn arb_line_op() -> impl Strategy<Value = LineOp> {
    prop_oneof![
        2 => Just(LineOp::Context),
        2 => Just(LineOp::Add),
        1 => Just(LineOp::Remove),
    ]
}

fn arb_line_content() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9 ;=(){}]{0,40}"
}

fn arb_hunk() -> impl Strategy<Value = HunkBuilder> {
    (
        1u32..2_000,
        1u32..2_000,
        prop::collection::vec((arb_line_op(), arb_line_content()), 1..MAX_LINES_PER_HUNK),
    )
        .prop_map(|(old_start, new_start, ops)| {
            ops.into_iter()
                .fold(HunkBuilder::new(old_start, new_start), |h, (op, text)| {
                    match op {
                        LineOp::Context => h.context(&text),
                        LineOp::Add => h.add_line(&text),
                        LineOp::Remove => h.remove(&text),
                    }
                })
        })
}

/// Modified source file with one or more hunks.
pub fn arb_file_diff() -> impl Strategy<Value = FileBuilder> {
    (
        arb_qualified_class(),
        prop::collection::vec(arb_hunk(), 1..MAX_HUNKS_PER_FILE),
    )
        .prop_map(|(class_name, hunks)| {
            hunks
                .into_iter()
                .fold(FileBuilder::new(&source_path_for(&class_name)), |f, h| {
                    f.add_hunk(h)
                })
        })
}

/// A whole diff of 1..=`MAX_FILES` modified files.
pub fn arb_diff() -> impl Strategy<Value = DiffBuilder> {
    prop::collection::vec(arb_file_diff(), 1..=MAX_FILES)
        .prop_map(|files| files.into_iter().fold(DiffBuilder::new(), DiffBuilder::add_file))
}
