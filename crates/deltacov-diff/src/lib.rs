//! Unified diff parsing.
//!
//! This crate parses `git diff` style unified diffs into the set of changed
//! (added) line numbers per file.

mod index;
mod unified;

pub use index::{DiffStats, ModifiedLinesIndex, union_indexes};
pub use unified::{DiffParseError, parse_unified_diff};

/// Parse several diff sources and union their changed lines per file.
///
/// The first malformed source aborts the whole parse.
pub fn parse_unified_diffs<'a>(
    diff_texts: impl IntoIterator<Item = &'a str>,
) -> Result<ModifiedLinesIndex, DiffParseError> {
    let indexes = diff_texts
        .into_iter()
        .map(parse_unified_diff)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(union_indexes(indexes))
}
