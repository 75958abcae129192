use anyhow::Context;
use tracing::{debug, info};

use deltacov_coverage::{CoverageFormat, load_coverage, merge_coverage};
use deltacov_diff::{ModifiedLinesIndex, parse_unified_diff, union_indexes};
use deltacov_domain::{
    ClassExclusions, DeltaCoverageData, DeltaCoverageFilter, Precision, aggregate_parallel,
    evaluate_violations, summary_line, validate_rules,
};
use deltacov_types::{
    ClassDelta, CoverageMeta, DeltaReport, DiffMeta, MethodAttribution,
    REASON_CLASS_LEVEL_APPROXIMATION, REASON_NO_DIFF_INPUT, REASON_NO_MODIFIED_CLASSES,
    REASON_VIOLATIONS, REPORT_SCHEMA_V1, ToolMeta, Verdict, VerdictStatus, ViolationReport,
    ViolationRules,
};

/// One unified diff, labelled by where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffInput {
    pub label: String,
    pub text: String,
}

/// Raw bytes of one coverage report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageArtifact {
    pub label: String,
    pub format: CoverageFormat,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeltaPlan {
    pub rules: ViolationRules,
    pub method_attribution: MethodAttribution,
    /// Globs over class names and resolved source paths.
    pub exclude_classes: Vec<String>,
    /// Keep per-class entries in the report.
    pub include_classes: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeltaRun {
    pub report: DeltaReport,
    pub markdown: String,
    /// `Fail on violations: ... Found violations: ...`
    pub summary: String,
    pub delta_classes: Vec<DeltaCoverageData>,
    pub violations: ViolationReport,
    pub exit_code: i32,
}

pub fn run_delta_check(
    plan: &DeltaPlan,
    diffs: &[DiffInput],
    artifacts: &[CoverageArtifact],
) -> Result<DeltaRun, anyhow::Error> {
    validate_rules(&plan.rules).context("invalid violation rules")?;
    let exclusions = ClassExclusions::compile(&plan.exclude_classes)?;

    let modified = parse_diffs(diffs)?;
    let stats = modified.stats();
    info!(files = stats.files, lines = stats.lines, "parsed diff input");

    let mut sets = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let data = load_coverage(artifact.format, &artifact.bytes).with_context(|| {
            format!(
                "parse {} coverage report {}",
                artifact.format.as_str(),
                artifact.label
            )
        })?;
        debug!(report = %artifact.label, classes = data.len(), "loaded coverage");
        sets.push(data);
    }
    let coverage = merge_coverage(sets);

    let filter = DeltaCoverageFilter::new(&modified, plan.method_attribution);
    let mut delta = filter.filter_all(&coverage);
    let before = delta.len();
    delta.retain(|d| !exclusions.is_excluded(&d.class_name, &d.source_path));
    let excluded = before - delta.len();
    info!(
        analyzed = coverage.len(),
        modified = delta.len(),
        excluded,
        "filtered coverage to changed lines"
    );

    let ratios = aggregate_parallel(&delta);
    let violations = evaluate_violations(&ratios, &plan.rules);
    for v in &violations.violations {
        debug!(entity = v.entity.as_str(), "{}", v.message);
    }

    let class_level = delta
        .iter()
        .filter(|d| d.precision == Precision::ClassLevel)
        .count();

    let mut reasons = Vec::new();
    if diffs.is_empty() {
        reasons.push(REASON_NO_DIFF_INPUT.to_string());
    }
    if delta.is_empty() {
        reasons.push(REASON_NO_MODIFIED_CLASSES.to_string());
    }
    if class_level > 0 {
        reasons.push(REASON_CLASS_LEVEL_APPROXIMATION.to_string());
    }
    if !violations.passed {
        reasons.push(REASON_VIOLATIONS.to_string());
    }

    let status = if violations.passed {
        VerdictStatus::Pass
    } else if violations.should_fail() {
        VerdictStatus::Fail
    } else {
        VerdictStatus::Warn
    };

    let classes = if plan.include_classes {
        delta.iter().map(class_delta).collect()
    } else {
        Vec::new()
    };

    let report = DeltaReport {
        schema: REPORT_SCHEMA_V1.to_string(),
        tool: ToolMeta {
            name: "deltacov".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        diff: DiffMeta {
            source: diff_source_label(diffs),
            files_changed: stats.files,
            lines_changed: stats.lines,
        },
        coverage: CoverageMeta {
            classes_analyzed: saturating_u32(coverage.len()),
            classes_modified: saturating_u32(delta.len()),
            classes_class_level: saturating_u32(class_level),
            classes_excluded: saturating_u32(excluded),
            method_attribution: plan.method_attribution,
        },
        ratios: ratios.entries(),
        classes,
        violations: violations.violations.clone(),
        verdict: Verdict {
            status,
            violation_count: violations.violation_count,
            fail_on_violation: violations.fail_on_violation,
            reasons,
        },
    };

    let markdown = crate::render::render_markdown_for_report(&report);
    let summary = summary_line(&violations);
    let exit_code = compute_exit_code(&violations);

    Ok(DeltaRun {
        report,
        markdown,
        summary,
        delta_classes: delta,
        violations,
        exit_code,
    })
}

fn parse_diffs(diffs: &[DiffInput]) -> Result<ModifiedLinesIndex, anyhow::Error> {
    let mut indexes = Vec::with_capacity(diffs.len());
    for diff in diffs {
        let index = parse_unified_diff(&diff.text)
            .with_context(|| format!("parse unified diff {}", diff.label))?;
        debug!(source = %diff.label, files = index.paths().count(), "parsed diff");
        indexes.push(index);
    }
    Ok(union_indexes(indexes))
}

fn diff_source_label(diffs: &[DiffInput]) -> String {
    if diffs.is_empty() {
        return "none".to_string();
    }
    diffs
        .iter()
        .map(|d| d.label.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn class_delta(d: &DeltaCoverageData) -> ClassDelta {
    ClassDelta {
        class_name: d.class_name.clone(),
        source_path: d.source_path.clone(),
        line_level: d.precision == Precision::LineLevel,
        counters: d.counters,
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// `2` when violations must fail the run, `0` otherwise. Tool errors (`1`)
/// are the caller's concern.
pub fn compute_exit_code(report: &ViolationReport) -> i32 {
    if report.should_fail() { 2 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deltacov_testkit::{sample_configs, sample_diffs, sample_reports};
    use deltacov_types::{Counter, CoverageEntity};

    fn diff(text: &str) -> DiffInput {
        DiffInput {
            label: "change.diff".to_string(),
            text: text.to_string(),
        }
    }

    fn xml() -> CoverageArtifact {
        CoverageArtifact {
            label: "jacoco.xml".to_string(),
            format: CoverageFormat::JacocoXml,
            bytes: sample_reports::calculator_xml().as_bytes().to_vec(),
        }
    }

    fn csv() -> CoverageArtifact {
        CoverageArtifact {
            label: "jacoco.csv".to_string(),
            format: CoverageFormat::Csv,
            bytes: sample_reports::calculator_csv().into_bytes(),
        }
    }

    fn strict_plan() -> DeltaPlan {
        DeltaPlan {
            rules: ViolationRules::from_config(&sample_configs::blanket_strict()),
            include_classes: true,
            ..DeltaPlan::default()
        }
    }

    #[test]
    fn divide_change_fails_strict_rules() {
        let run = run_delta_check(
            &strict_plan(),
            &[diff(sample_diffs::calculator_divide())],
            &[xml()],
        )
        .expect("run");

        assert_eq!(run.exit_code, 2);
        assert_eq!(run.report.verdict.status, VerdictStatus::Fail);
        assert_eq!(run.report.verdict.reasons, vec![REASON_VIOLATIONS.to_string()]);
        assert_eq!(run.report.coverage.classes_analyzed, 2);
        assert_eq!(run.report.coverage.classes_modified, 1);
        assert_eq!(run.report.diff.files_changed, 1);
        assert_eq!(run.report.diff.lines_changed, 2);

        let messages: Vec<&str> = run
            .report
            .violations
            .iter()
            .map(|v| v.message.as_str())
            .collect();
        assert_eq!(
            messages,
            vec![
                "instructions covered ratio is 0.2857, but expected minimum is 0.7",
                "lines covered ratio is 0.5, but expected minimum is 0.7",
            ]
        );
        assert_eq!(run.summary, "Fail on violations: true. Found violations: 2");
        assert!(run.report.classes[0].line_level);
    }

    #[test]
    fn report_only_rules_warn_with_zero_exit() {
        let plan = DeltaPlan {
            rules: ViolationRules::from_config(&sample_configs::report_only()),
            ..DeltaPlan::default()
        };
        let run = run_delta_check(&plan, &[diff(sample_diffs::calculator_divide())], &[xml()])
            .expect("run");

        assert_eq!(run.exit_code, 0);
        assert_eq!(run.report.verdict.status, VerdictStatus::Warn);
        assert!(run.report.classes.is_empty());
        assert!(run.violations.violation_count > 0);
    }

    #[test]
    fn csv_input_is_marked_as_class_level() {
        let run = run_delta_check(
            &strict_plan(),
            &[diff(sample_diffs::calculator_add())],
            &[csv()],
        )
        .expect("run");

        assert_eq!(run.report.coverage.classes_class_level, 1);
        assert!(
            run.report
                .verdict
                .reasons
                .contains(&REASON_CLASS_LEVEL_APPROXIMATION.to_string())
        );
        assert_eq!(
            run.delta_classes[0].counters.instruction,
            Counter::new(5, 11)
        );
        let entities: Vec<CoverageEntity> = run.report.violations.iter().map(|v| v.entity).collect();
        assert_eq!(entities, vec![CoverageEntity::Instruction, CoverageEntity::Branch]);
    }

    #[test]
    fn untouched_classes_pass_with_reason() {
        let run = run_delta_check(&strict_plan(), &[diff(sample_diffs::docs_only())], &[xml()])
            .expect("run");

        assert_eq!(run.exit_code, 0);
        assert_eq!(run.report.verdict.status, VerdictStatus::Pass);
        assert_eq!(
            run.report.verdict.reasons,
            vec![REASON_NO_MODIFIED_CLASSES.to_string()]
        );
        assert!(run.report.ratios.iter().all(|r| r.ratio == 1.0));
    }

    #[test]
    fn no_diff_input_is_recorded() {
        let run = run_delta_check(&strict_plan(), &[], &[xml()]).expect("run");
        assert_eq!(run.report.diff.source, "none");
        assert!(
            run.report
                .verdict
                .reasons
                .contains(&REASON_NO_DIFF_INPUT.to_string())
        );
    }

    #[test]
    fn excluded_classes_are_counted_and_dropped() {
        let plan = DeltaPlan {
            exclude_classes: vec!["com.acme.Calc*".to_string()],
            ..strict_plan()
        };
        let run = run_delta_check(&plan, &[diff(sample_diffs::calculator_divide())], &[xml()])
            .expect("run");

        assert_eq!(run.report.coverage.classes_excluded, 1);
        assert_eq!(run.report.coverage.classes_modified, 0);
        assert_eq!(run.exit_code, 0);
    }

    #[test]
    fn malformed_diff_is_a_tool_error() {
        let err = run_delta_check(&strict_plan(), &[diff(sample_diffs::malformed_hunk())], &[xml()])
            .expect_err("should fail");
        let chain = format!("{err:#}");
        assert!(chain.contains("change.diff"), "{chain}");
        assert!(chain.contains("line 4"), "{chain}");
    }

    #[test]
    fn malformed_report_is_a_tool_error() {
        let bad = CoverageArtifact {
            label: "broken.csv".to_string(),
            format: CoverageFormat::Csv,
            bytes: b"GROUP,PACKAGE\n".to_vec(),
        };
        let err = run_delta_check(&strict_plan(), &[diff(sample_diffs::calculator_add())], &[bad])
            .expect_err("should fail");
        assert!(format!("{err:#}").contains("broken.csv"));
    }

    #[test]
    fn out_of_range_rule_is_rejected_before_parsing() {
        let mut plan = strict_plan();
        plan.rules.rules[0].min_ratio = 1.5;
        assert!(run_delta_check(&plan, &[], &[]).is_err());
    }

    #[test]
    fn exit_code_semantics() {
        let mut report = ViolationReport {
            violations: vec![],
            violation_count: 1,
            fail_on_violation: true,
            passed: false,
        };
        assert_eq!(compute_exit_code(&report), 2);
        report.fail_on_violation = false;
        assert_eq!(compute_exit_code(&report), 0);
        report.passed = true;
        report.fail_on_violation = true;
        assert_eq!(compute_exit_code(&report), 0);
    }
}
