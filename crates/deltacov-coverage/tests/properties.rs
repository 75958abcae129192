//! Property-based tests for deltacov-coverage.

use std::collections::BTreeMap;

use deltacov_coverage::{
    ClassDetail, CoverageFormat, LineCounters, MethodCoverage, RawCoverageData, load_coverage,
    merge_coverage,
};
use deltacov_testkit::arb::{arb_counter, arb_counters};
use deltacov_testkit::sample_reports;
use deltacov_types::{CoverageEntity, Counter};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// A small pool of names so that generated sets overlap.
fn arb_class_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "com.acme.A".to_string(),
        "com.acme.B".to_string(),
        "com.acme.B$Inner".to_string(),
        "org.demo.C".to_string(),
    ])
}

fn arb_detail() -> impl Strategy<Value = ClassDetail> {
    (
        prop::collection::btree_map(1u32..60, (arb_counter(), arb_counter()), 0..8),
        prop::collection::btree_map(
            (1u32..60, prop::sample::select(vec!["run", "stop", "<init>"])),
            (0u32..5, arb_counter(), arb_counter()),
            0..4,
        ),
    )
        .prop_map(|(lines, methods)| ClassDetail {
            lines: lines
                .into_iter()
                .map(|(nr, (instruction, branch))| (nr, LineCounters { instruction, branch }))
                .collect(),
            methods: methods
                .into_iter()
                .map(|((first_line, name), (extra, complexity, method))| MethodCoverage {
                    name: name.to_string(),
                    descriptor: "()V".to_string(),
                    first_line,
                    last_line: first_line + extra,
                    complexity,
                    method,
                })
                .collect(),
        })
}

fn arb_record() -> impl Strategy<Value = RawCoverageData> {
    (
        prop::sample::select(vec!["unit", "integration"]),
        arb_class_name(),
        prop::option::of(prop::sample::select(vec!["A.java", "B.java", "C.kt"])),
        arb_counters(),
        prop::option::of(arb_detail()),
    )
        .prop_map(|(group, class_name, source_file, counters, detail)| RawCoverageData {
            group: group.to_string(),
            class_name,
            source_file: source_file.map(str::to_string),
            counters,
            detail,
        })
}

fn arb_set() -> impl Strategy<Value = Vec<RawCoverageData>> {
    prop::collection::vec(arb_record(), 0..6)
}

const COLUMNS: [&str; 13] = [
    "GROUP",
    "PACKAGE",
    "CLASS",
    "INSTRUCTION_MISSED",
    "INSTRUCTION_COVERED",
    "BRANCH_MISSED",
    "BRANCH_COVERED",
    "LINE_MISSED",
    "LINE_COVERED",
    "COMPLEXITY_MISSED",
    "COMPLEXITY_COVERED",
    "METHOD_MISSED",
    "METHOD_COVERED",
];

fn csv_cell(column: &str, package: &str, class: &str, counters: &deltacov_types::CoverageCounters) -> String {
    let counter = |entity: CoverageEntity, covered: bool| {
        let c = counters.get(entity);
        let value = if covered { c.covered } else { c.missed };
        value.to_string()
    };
    match column {
        "GROUP" => "app".to_string(),
        "PACKAGE" => package.to_string(),
        "CLASS" => class.to_string(),
        "INSTRUCTION_MISSED" => counter(CoverageEntity::Instruction, false),
        "INSTRUCTION_COVERED" => counter(CoverageEntity::Instruction, true),
        "BRANCH_MISSED" => counter(CoverageEntity::Branch, false),
        "BRANCH_COVERED" => counter(CoverageEntity::Branch, true),
        "LINE_MISSED" => counter(CoverageEntity::Line, false),
        "LINE_COVERED" => counter(CoverageEntity::Line, true),
        "COMPLEXITY_MISSED" => counter(CoverageEntity::Complexity, false),
        "COMPLEXITY_COVERED" => counter(CoverageEntity::Complexity, true),
        "METHOD_MISSED" => counter(CoverageEntity::Method, false),
        _ => counter(CoverageEntity::Method, true),
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn merge_is_commutative(a in arb_set(), b in arb_set()) {
        prop_assert_eq!(
            merge_coverage([a.clone(), b.clone()]),
            merge_coverage([b, a])
        );
    }

    #[test]
    fn merge_is_associative(a in arb_set(), b in arb_set(), c in arb_set()) {
        let left = merge_coverage([merge_coverage([a.clone(), b.clone()]), c.clone()]);
        let right = merge_coverage([a, merge_coverage([b, c])]);
        prop_assert_eq!(left, right);
    }

    #[test]
    fn merge_keeps_one_record_per_class_and_conserves_totals(a in arb_set(), b in arb_set()) {
        let merged = merge_coverage([a.clone(), b.clone()]);

        let mut names: Vec<&str> = merged.iter().map(|r| r.class_name.as_str()).collect();
        let before = names.len();
        names.dedup();
        prop_assert_eq!(names.len(), before);

        let total = |set: &[RawCoverageData]| -> u64 {
            set.iter().map(|r| u64::from(r.counters.line.total())).sum()
        };
        prop_assert_eq!(total(&merged), total(&a) + total(&b));
    }

    #[test]
    fn csv_columns_may_appear_in_any_order(
        rows in prop::collection::vec(("[a-z]{1,6}(\\.[a-z]{1,6}){0,2}", "[A-Z][a-z]{0,8}", arb_counters()), 1..5),
        order in Just(COLUMNS.to_vec()).prop_shuffle(),
    ) {
        let mut text = order.join(",");
        for (package, class, counters) in &rows {
            text.push('\n');
            let cells: Vec<String> = order
                .iter()
                .map(|col| csv_cell(col, package, class, counters))
                .collect();
            text.push_str(&cells.join(","));
        }

        let parsed = load_coverage(CoverageFormat::Csv, text.as_bytes()).expect("csv should parse");
        prop_assert_eq!(parsed.len(), rows.len());
        for (record, (package, class, counters)) in parsed.iter().zip(&rows) {
            prop_assert_eq!(&record.class_name, &format!("{package}.{class}"));
            prop_assert_eq!(record.counters, *counters);
        }
    }

    #[test]
    fn csv_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..400)) {
        let _ = load_coverage(CoverageFormat::Csv, &bytes);
    }

    #[test]
    fn xml_never_panics(text in "(?s)<report[ a-z=\"]{0,10}>.{0,200}") {
        let _ = load_coverage(CoverageFormat::JacocoXml, text.as_bytes());
    }
}

// ============================================================================
// Fixture checks
// ============================================================================

#[test]
fn csv_and_xml_agree_on_class_totals() {
    let csv = load_coverage(CoverageFormat::Csv, sample_reports::calculator_csv().as_bytes())
        .expect("csv");
    let xml = load_coverage(
        CoverageFormat::JacocoXml,
        sample_reports::calculator_xml().as_bytes(),
    )
    .expect("xml");

    let csv_calc = csv.iter().find(|r| r.class_name == "com.acme.Calculator").expect("csv calc");
    let xml_calc = xml.iter().find(|r| r.class_name == "com.acme.Calculator").expect("xml calc");
    assert_eq!(csv_calc.counters, xml_calc.counters);
    assert!(csv_calc.detail.is_none());
    assert!(xml_calc.detail.is_some());
}

#[test]
fn merging_csv_with_xml_drops_detail() {
    let csv = load_coverage(CoverageFormat::Csv, sample_reports::calculator_csv().as_bytes())
        .expect("csv");
    let xml = load_coverage(
        CoverageFormat::JacocoXml,
        sample_reports::calculator_xml().as_bytes(),
    )
    .expect("xml");

    let merged = merge_coverage([csv, xml]);
    let calc = merged.iter().find(|r| r.class_name == "com.acme.Calculator").expect("calc");
    assert_eq!(calc.counters.instruction, Counter::new(10, 22));
    assert_eq!(calc.source_file.as_deref(), Some("Calculator.java"));
    assert!(calc.detail.is_none());
}

#[test]
fn merging_two_xml_reports_sums_line_detail() {
    let xml = || {
        load_coverage(
            CoverageFormat::JacocoXml,
            sample_reports::calculator_xml().as_bytes(),
        )
        .expect("xml")
    };
    let merged = merge_coverage([xml(), xml()]);
    let calc = merged.iter().find(|r| r.class_name == "com.acme.Calculator").expect("calc");
    let detail = calc.detail.as_ref().expect("detail kept");
    assert_eq!(detail.lines[&10].instruction, Counter::new(10, 0));
    assert_eq!(detail.methods.len(), 3);

    let by_name: BTreeMap<&str, Counter> = detail
        .methods
        .iter()
        .map(|m| (m.name.as_str(), m.complexity))
        .collect();
    assert_eq!(by_name["divide"], Counter::new(2, 2));
}
