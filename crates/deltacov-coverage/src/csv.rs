//! JaCoCo CSV summary reports.
//!
//! Columns are located by header name, so their order does not matter and
//! extra columns are ignored.

use deltacov_types::{Counter, CoverageCounters, CoverageEntity};

use crate::model::{RawCoverageData, RawCoverageDataProvider};
use crate::CoverageParseError;

pub const GROUP_COLUMN: &str = "GROUP";
pub const PACKAGE_COLUMN: &str = "PACKAGE";
pub const CLASS_COLUMN: &str = "CLASS";

/// `(entity, missed column, covered column)`.
const COUNTER_COLUMNS: [(CoverageEntity, &str, &str); 5] = [
    (
        CoverageEntity::Instruction,
        "INSTRUCTION_MISSED",
        "INSTRUCTION_COVERED",
    ),
    (CoverageEntity::Branch, "BRANCH_MISSED", "BRANCH_COVERED"),
    (CoverageEntity::Line, "LINE_MISSED", "LINE_COVERED"),
    (
        CoverageEntity::Complexity,
        "COMPLEXITY_MISSED",
        "COMPLEXITY_COVERED",
    ),
    (CoverageEntity::Method, "METHOD_MISSED", "METHOD_COVERED"),
];

/// Reads class-level counters from a JaCoCo CSV report.
#[derive(Debug, Clone, Copy)]
pub struct CsvCoverageProvider<'a> {
    bytes: &'a [u8],
}

impl<'a> CsvCoverageProvider<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }
}

impl RawCoverageDataProvider for CsvCoverageProvider<'_> {
    fn obtain_data(&self) -> Result<Vec<RawCoverageData>, CoverageParseError> {
        let text = std::str::from_utf8(self.bytes).map_err(|_| CoverageParseError::InvalidUtf8)?;
        parse_csv_report(text)
    }
}

#[derive(Debug, Clone, Copy)]
struct Column {
    name: &'static str,
    index: usize,
}

struct ColumnMap {
    width: usize,
    group: usize,
    package: usize,
    class: usize,
    counters: Vec<(CoverageEntity, Column, Column)>,
}

impl ColumnMap {
    fn from_header(header: &[String]) -> Result<Self, CoverageParseError> {
        let find = |name: &'static str| {
            header
                .iter()
                .position(|h| h.trim() == name)
                .map(|index| Column { name, index })
                .ok_or_else(|| CoverageParseError::MissingColumn(name.to_string()))
        };

        let group = find(GROUP_COLUMN)?.index;
        let package = find(PACKAGE_COLUMN)?.index;
        let class = find(CLASS_COLUMN)?.index;
        let counters = COUNTER_COLUMNS
            .into_iter()
            .map(|(entity, missed, covered)| -> Result<_, CoverageParseError> {
                Ok((entity, find(missed)?, find(covered)?))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            width: header.len(),
            group,
            package,
            class,
            counters,
        })
    }
}

fn parse_csv_report(text: &str) -> Result<Vec<RawCoverageData>, CoverageParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rows = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = rows.next().ok_or(CoverageParseError::EmptyReport)?;
    let columns = ColumnMap::from_header(&split_record(header))?;

    let mut out = Vec::new();
    for (row, line) in rows {
        let fields = split_record(line);
        if fields.len() < columns.width {
            return Err(CoverageParseError::TruncatedRow {
                row,
                expected: columns.width,
                found: fields.len(),
            });
        }
        out.push(parse_row(row, &fields, &columns)?);
    }
    Ok(out)
}

fn parse_row(
    row: usize,
    fields: &[String],
    columns: &ColumnMap,
) -> Result<RawCoverageData, CoverageParseError> {
    let mut counters = CoverageCounters::default();
    for &(entity, missed, covered) in &columns.counters {
        *counters.get_mut(entity) = Counter::new(
            parse_counter(row, missed, fields)?,
            parse_counter(row, covered, fields)?,
        );
    }

    let package = fields[columns.package].trim();
    let class = fields[columns.class].trim();
    let class_name = if package.is_empty() {
        class.to_string()
    } else {
        format!("{package}.{class}")
    };

    Ok(RawCoverageData::aggregate(
        fields[columns.group].trim(),
        &class_name,
        counters,
    ))
}

fn parse_counter(row: usize, column: Column, fields: &[String]) -> Result<u32, CoverageParseError> {
    let value = &fields[column.index];
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| CoverageParseError::InvalidCounter {
            row,
            column: column.name.to_string(),
            value: value.to_string(),
        })
}

/// Split one CSV record, honoring double-quoted fields and `""` escapes.
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            ('"', true) => in_quotes = false,
            ('"', false) if field.is_empty() => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "GROUP,PACKAGE,CLASS,INSTRUCTION_MISSED,INSTRUCTION_COVERED,BRANCH_MISSED,BRANCH_COVERED,LINE_MISSED,LINE_COVERED,COMPLEXITY_MISSED,COMPLEXITY_COVERED,METHOD_MISSED,METHOD_COVERED";

    fn parse(text: &str) -> Result<Vec<RawCoverageData>, CoverageParseError> {
        CsvCoverageProvider::new(text.as_bytes()).obtain_data()
    }

    #[test]
    fn single_row_maps_counters_by_column() {
        let data = parse(&format!("{HEADER}\ngroup,package,class,1,2,3,4,5,6,7,8,9,10"))
            .expect("parse");

        assert_eq!(data.len(), 1);
        let rec = &data[0];
        assert_eq!(rec.group, "group");
        assert_eq!(rec.class_name, "package.class");
        assert_eq!(rec.counters.branch.total(), 7);
        assert_eq!(rec.counters.branch.covered, 4);
        assert_eq!(rec.counters.line.total(), 11);
        assert_eq!(rec.counters.line.covered, 6);
        assert_eq!(rec.counters.instruction, Counter::new(1, 2));
        assert_eq!(rec.counters.method, Counter::new(9, 10));
        assert!(rec.source_file.is_none());
        assert!(!rec.has_line_detail());
    }

    #[test]
    fn header_only_is_empty() {
        assert_eq!(parse(HEADER).expect("parse"), vec![]);
    }

    #[test]
    fn no_header_is_an_error() {
        assert_eq!(parse("\n \n"), Err(CoverageParseError::EmptyReport));
    }

    #[test]
    fn column_order_does_not_matter() {
        let text = "CLASS,METHOD_COVERED,METHOD_MISSED,PACKAGE,GROUP,EXTRA,INSTRUCTION_MISSED,INSTRUCTION_COVERED,BRANCH_MISSED,BRANCH_COVERED,LINE_MISSED,LINE_COVERED,COMPLEXITY_MISSED,COMPLEXITY_COVERED\r\n\
                    Foo,3,1,,app,x,0,10,0,0,1,2,0,1\r\n";
        let data = parse(text).expect("parse");

        assert_eq!(data[0].class_name, "Foo");
        assert_eq!(data[0].group, "app");
        assert_eq!(data[0].counters.method, Counter::new(1, 3));
        assert_eq!(data[0].counters.line, Counter::new(1, 2));
    }

    #[test]
    fn missing_column_is_named() {
        let header = HEADER.replace(",BRANCH_COVERED", "");
        let err = parse(&header).expect_err("should fail");
        assert_eq!(err, CoverageParseError::MissingColumn("BRANCH_COVERED".to_string()));
    }

    #[test]
    fn non_numeric_counter_names_row_and_column() {
        let err = parse(&format!("{HEADER}\n\ng,p,C,1,2,x,4,5,6,7,8,9,10")).expect_err("should fail");
        assert_eq!(
            err,
            CoverageParseError::InvalidCounter {
                row: 3,
                column: "BRANCH_MISSED".to_string(),
                value: "x".to_string(),
            }
        );
    }

    #[test]
    fn negative_counter_is_invalid() {
        let err = parse(&format!("{HEADER}\ng,p,C,-1,2,3,4,5,6,7,8,9,10")).expect_err("should fail");
        assert!(matches!(err, CoverageParseError::InvalidCounter { row: 2, .. }));
    }

    #[test]
    fn short_row_is_truncated() {
        let err = parse(&format!("{HEADER}\ng,p,C,1,2,3")).expect_err("should fail");
        assert_eq!(
            err,
            CoverageParseError::TruncatedRow {
                row: 2,
                expected: 13,
                found: 6,
            }
        );
    }

    #[test]
    fn quoted_fields_keep_commas() {
        let data = parse(&format!(
            "{HEADER}\n\"my, group\",com.acme,\"Quoted\"\"Name\",0,1,0,0,0,1,0,1,0,1"
        ))
        .expect("parse");
        assert_eq!(data[0].group, "my, group");
        assert_eq!(data[0].class_name, "com.acme.Quoted\"Name");
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let bytes = [0xff, 0xfe, 0x00];
        assert_eq!(
            CsvCoverageProvider::new(&bytes).obtain_data(),
            Err(CoverageParseError::InvalidUtf8)
        );
    }
}
