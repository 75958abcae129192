use std::collections::BTreeSet;

use deltacov_coverage::{ClassDetail, RawCoverageData};
use deltacov_diff::ModifiedLinesIndex;
use deltacov_types::{CoverageCounters, MethodAttribution};
use rayon::prelude::*;

use crate::resolver::ClassPathResolver;

/// Whether a class's delta counters were computed from changed lines or
/// copied from its whole-class totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    LineLevel,
    ClassLevel,
}

/// Coverage counters restricted to the changed lines of one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaCoverageData {
    pub class_name: String,
    pub group: String,
    /// Diff path the class was matched to.
    pub source_path: String,
    pub counters: CoverageCounters,
    pub precision: Precision,
}

/// Changed lines of the file one class was compiled from.
#[derive(Debug, Clone, Copy)]
pub struct ClassModifications<'a> {
    lines: &'a BTreeSet<u32>,
}

impl<'a> ClassModifications<'a> {
    pub fn new(lines: &'a BTreeSet<u32>) -> Self {
        Self { lines }
    }

    pub fn is_line_modified(&self, line: u32) -> bool {
        self.lines.contains(&line)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Any changed line within `first..=last`.
    pub fn touches_range(&self, first: u32, last: u32) -> bool {
        first <= last && self.lines.range(first..=last).next().is_some()
    }
}

/// Restricts raw class coverage to the lines a diff touched.
pub struct DeltaCoverageFilter<'a> {
    modified: &'a ModifiedLinesIndex,
    resolver: ClassPathResolver,
    attribution: MethodAttribution,
}

impl<'a> DeltaCoverageFilter<'a> {
    pub fn new(modified: &'a ModifiedLinesIndex, attribution: MethodAttribution) -> Self {
        Self {
            modified,
            resolver: ClassPathResolver::for_modified_lines(modified),
            attribution,
        }
    }

    pub fn attribution(&self) -> MethodAttribution {
        self.attribution
    }

    /// Changed lines for the file `raw` resolves to, if any.
    pub fn modifications(&self, raw: &RawCoverageData) -> Option<(String, ClassModifications<'a>)> {
        let path = self.resolver.resolve(raw)?;
        let lines = self.modified.lines_for(&path)?;
        Some((path, ClassModifications::new(lines)))
    }

    /// Delta counters for one class, or `None` when the diff does not touch it.
    pub fn filter(&self, raw: &RawCoverageData) -> Option<DeltaCoverageData> {
        let (source_path, mods) = self.modifications(raw)?;
        if mods.is_empty() {
            return None;
        }

        let (counters, precision) = match &raw.detail {
            Some(detail) => (
                line_level_counters(detail, mods, self.attribution)?,
                Precision::LineLevel,
            ),
            None => (raw.counters, Precision::ClassLevel),
        };

        Some(DeltaCoverageData {
            class_name: raw.class_name.clone(),
            group: raw.group.clone(),
            source_path,
            counters,
            precision,
        })
    }

    /// Filter every record on the rayon pool, keeping input order.
    pub fn filter_all(&self, raws: &[RawCoverageData]) -> Vec<DeltaCoverageData> {
        raws.par_iter().filter_map(|raw| self.filter(raw)).collect()
    }

    pub fn filter_all_sequential(&self, raws: &[RawCoverageData]) -> Vec<DeltaCoverageData> {
        raws.iter().filter_map(|raw| self.filter(raw)).collect()
    }
}

fn line_level_counters(
    detail: &ClassDetail,
    mods: ClassModifications<'_>,
    attribution: MethodAttribution,
) -> Option<CoverageCounters> {
    let mut counters = CoverageCounters::default();
    let mut touched = false;

    for (&nr, line) in &detail.lines {
        if mods.is_line_modified(nr) {
            touched = true;
            counters.instruction += line.instruction;
            counters.branch += line.branch;
            counters.line += line.line_counter();
        }
    }

    for method in &detail.methods {
        let attributed = match attribution {
            MethodAttribution::AnyLine => mods.touches_range(method.first_line, method.last_line),
            MethodAttribution::AllLines => {
                let mut executable = detail
                    .lines
                    .range(method.first_line..=method.last_line)
                    .filter(|(_, l)| l.is_executable())
                    .map(|(nr, _)| *nr)
                    .peekable();
                executable.peek().is_some() && executable.all(|nr| mods.is_line_modified(nr))
            }
        };
        if attributed {
            touched = true;
            counters.complexity += method.complexity;
            counters.method += method.method;
        }
    }

    touched.then_some(counters)
}
