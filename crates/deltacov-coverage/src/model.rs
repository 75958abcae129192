use std::collections::BTreeMap;

use deltacov_types::{Counter, CoverageCounters};

use crate::CoverageParseError;

/// Source of per-class coverage records.
///
/// Any report reader that can produce whole-class counters (and, when it
/// has them, per-line detail) plugs into the engine through this trait.
pub trait RawCoverageDataProvider {
    fn obtain_data(&self) -> Result<Vec<RawCoverageData>, CoverageParseError>;
}

/// Instruction and branch counters recorded for one source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineCounters {
    pub instruction: Counter,
    pub branch: Counter,
}

impl LineCounters {
    /// Lines without instructions (blank, comments, declarations) are not executable.
    pub fn is_executable(&self) -> bool {
        !self.instruction.is_empty()
    }

    /// Line counter contribution: covered if any instruction ran.
    pub fn line_counter(&self) -> Counter {
        if !self.is_executable() {
            Counter::ZERO
        } else if self.instruction.covered > 0 {
            Counter::new(0, 1)
        } else {
            Counter::new(1, 0)
        }
    }

    pub fn merge(self, other: LineCounters) -> LineCounters {
        LineCounters {
            instruction: self.instruction + other.instruction,
            branch: self.branch + other.branch,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCoverage {
    pub name: String,
    pub descriptor: String,
    pub first_line: u32,
    /// Inclusive end of the span attributed to this method.
    pub last_line: u32,
    pub complexity: Counter,
    pub method: Counter,
}

impl MethodCoverage {
    fn key(&self) -> (u32, &str, &str) {
        (self.first_line, &self.name, &self.descriptor)
    }
}

/// Line-level detail for one class.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassDetail {
    pub lines: BTreeMap<u32, LineCounters>,
    /// Ordered by first line.
    pub methods: Vec<MethodCoverage>,
}

impl ClassDetail {
    pub fn merge(mut self, other: ClassDetail) -> ClassDetail {
        for (nr, counters) in other.lines {
            let entry = self.lines.entry(nr).or_default();
            *entry = entry.merge(counters);
        }

        for method in other.methods {
            match self.methods.iter_mut().find(|m| m.key() == method.key()) {
                Some(existing) => {
                    existing.last_line = existing.last_line.max(method.last_line);
                    existing.complexity += method.complexity;
                    existing.method += method.method;
                }
                None => self.methods.push(method),
            }
        }
        self.methods.sort_by(|a, b| a.key().cmp(&b.key()));
        self
    }
}

/// Coverage counters for one class as read from a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCoverageData {
    pub group: String,
    /// Qualified name with `.` package separators; nested classes keep `$`.
    pub class_name: String,
    /// Declared source file name (`Foo.java`), when the report has one.
    pub source_file: Option<String>,
    pub counters: CoverageCounters,
    pub detail: Option<ClassDetail>,
}

impl RawCoverageData {
    /// Aggregate-only record, as produced by summary reports.
    pub fn aggregate(group: &str, class_name: &str, counters: CoverageCounters) -> Self {
        Self {
            group: group.to_string(),
            class_name: class_name.to_string(),
            source_file: None,
            counters,
            detail: None,
        }
    }

    pub fn has_line_detail(&self) -> bool {
        self.detail.is_some()
    }

    /// Simple name of the outermost class (`Outer` for `pkg.Outer$Inner`).
    pub fn outer_simple_name(&self) -> &str {
        let outer = self
            .class_name
            .split('$')
            .next()
            .unwrap_or(&self.class_name);
        outer.rsplit('.').next().unwrap_or(outer)
    }

    /// Combine two records for the same class.
    ///
    /// Counters and detail sum; detail survives only when both sides carry
    /// it. Group and source file keep the lexically smallest value so the
    /// result does not depend on argument order.
    pub fn merge(self, other: RawCoverageData) -> RawCoverageData {
        let source_file = match (self.source_file, other.source_file) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let detail = match (self.detail, other.detail) {
            (Some(a), Some(b)) => Some(a.merge(b)),
            _ => None,
        };
        RawCoverageData {
            group: self.group.min(other.group),
            class_name: self.class_name,
            source_file,
            counters: self.counters + other.counters,
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(name: &str, first: u32, last: u32, complexity: Counter) -> MethodCoverage {
        MethodCoverage {
            name: name.to_string(),
            descriptor: "()V".to_string(),
            first_line: first,
            last_line: last,
            complexity,
            method: Counter::new(0, 1),
        }
    }

    #[test]
    fn line_counter_follows_instruction_coverage() {
        let covered = LineCounters {
            instruction: Counter::new(3, 1),
            branch: Counter::ZERO,
        };
        let missed = LineCounters {
            instruction: Counter::new(2, 0),
            branch: Counter::ZERO,
        };
        assert_eq!(covered.line_counter(), Counter::new(0, 1));
        assert_eq!(missed.line_counter(), Counter::new(1, 0));
        assert_eq!(LineCounters::default().line_counter(), Counter::ZERO);
    }

    #[test]
    fn outer_simple_name_strips_package_and_nesting() {
        let raw = RawCoverageData::aggregate("g", "com.acme.Outer$Inner$1", CoverageCounters::default());
        assert_eq!(raw.outer_simple_name(), "Outer");
        let bare = RawCoverageData::aggregate("g", "Main", CoverageCounters::default());
        assert_eq!(bare.outer_simple_name(), "Main");
    }

    #[test]
    fn detail_merge_sums_lines_and_matching_methods() {
        let mut a = ClassDetail::default();
        a.lines.insert(3, LineCounters { instruction: Counter::new(1, 0), branch: Counter::ZERO });
        a.methods.push(method("run", 3, 4, Counter::new(1, 0)));

        let mut b = ClassDetail::default();
        b.lines.insert(3, LineCounters { instruction: Counter::new(0, 1), branch: Counter::ZERO });
        b.lines.insert(9, LineCounters { instruction: Counter::new(0, 2), branch: Counter::ZERO });
        b.methods.push(method("run", 3, 6, Counter::new(0, 1)));
        b.methods.push(method("stop", 9, 9, Counter::new(0, 1)));

        let merged = a.merge(b);
        assert_eq!(merged.lines[&3].instruction, Counter::new(1, 1));
        assert_eq!(merged.methods.len(), 2);
        assert_eq!(merged.methods[0].last_line, 6);
        assert_eq!(merged.methods[0].complexity, Counter::new(1, 1));
    }

    #[test]
    fn record_merge_drops_detail_when_one_side_is_aggregate() {
        let mut detailed = RawCoverageData::aggregate("b", "p.A", CoverageCounters::default());
        detailed.detail = Some(ClassDetail::default());
        detailed.source_file = Some("A.java".to_string());
        let aggregate = RawCoverageData::aggregate("a", "p.A", CoverageCounters::default());

        let merged = detailed.merge(aggregate);
        assert_eq!(merged.group, "a");
        assert_eq!(merged.source_file.as_deref(), Some("A.java"));
        assert!(merged.detail.is_none());
    }
}
