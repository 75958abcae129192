//! Domain logic: class path resolution, delta filtering, aggregation and
//! rule evaluation.
//!
//! This crate is designed to be I/O-free and highly testable.

pub mod aggregate;
pub mod exclude;
pub mod filter;
pub mod resolver;
pub mod violations;

pub use aggregate::{aggregate, aggregate_parallel};
pub use exclude::{ClassExclusions, ClassFilterError};
pub use filter::{ClassModifications, DeltaCoverageData, DeltaCoverageFilter, Precision};
pub use resolver::{ClassPathResolver, MatchKind, PathIndex, PathQuery, resolve_class_path};
pub use violations::{
    RuleConfigError, evaluate_violations, format_ratio, summary_line, validate_rules,
    violation_message,
};
