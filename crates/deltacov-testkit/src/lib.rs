//! Shared test utilities for the deltacov workspace.
//!
//! - **arb**: proptest strategies for configs, counters, class names and diffs
//! - **diff_builder**: fluent unified diff builders that double as oracles
//! - **fixtures**: sample configs, diffs and coverage reports
//! - **schema**: JSON schema validation of serialized DTOs

pub mod arb;
pub mod diff_builder;
pub mod fixtures;
pub mod schema;

pub use arb::{arb_config_file, arb_counters, arb_diff, arb_qualified_class, arb_rule};
pub use diff_builder::{DiffBuilder, FileBuilder, HunkBuilder};
pub use fixtures::{sample_configs, sample_diffs, sample_reports};
pub use schema::{validate_config_file, validate_delta_report};
