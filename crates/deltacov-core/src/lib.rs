//! Core engine: orchestrates diff parsing, coverage loading, delta
//! filtering, rule evaluation and reporting.

mod check;
mod render;

pub use check::{
    CoverageArtifact, DeltaPlan, DeltaRun, DiffInput, compute_exit_code, run_delta_check,
};
pub use render::render_markdown_for_report;
