use deltacov_domain::{format_ratio, summary_line};
use deltacov_types::{
    ClassDelta, DeltaReport, REASON_NO_DIFF_INPUT, REASON_NO_MODIFIED_CLASSES, VerdictStatus,
    ViolationReport,
};

/// Reasons worth surfacing above the ratio table. Violations and class-level
/// approximations get their own sections.
const RENDERABLE_META_REASONS: &[&str] = &[REASON_NO_DIFF_INPUT, REASON_NO_MODIFIED_CLASSES];

pub fn render_markdown_for_report(report: &DeltaReport) -> String {
    let status = match report.verdict.status {
        VerdictStatus::Pass => "PASS",
        VerdictStatus::Warn => "WARN",
        VerdictStatus::Fail => "FAIL",
    };

    let mut out = String::new();
    out.push_str(&format!("## deltacov — {status}\n\n"));

    out.push_str(&format!(
        "Diff touched **{}** file(s), **{}** line(s) (source: `{}`). **{}** of **{}** class(es) modified (attribution: `{}`)\n\n",
        report.diff.files_changed,
        report.diff.lines_changed,
        escape_md(&report.diff.source),
        report.coverage.classes_modified,
        report.coverage.classes_analyzed,
        report.coverage.method_attribution.as_str(),
    ));

    let meta_reasons: Vec<&String> = report
        .verdict
        .reasons
        .iter()
        .filter(|r| RENDERABLE_META_REASONS.contains(&r.as_str()))
        .collect();
    if !meta_reasons.is_empty() {
        out.push_str("**Verdict reasons:**\n");
        for r in &meta_reasons {
            out.push_str(&format!("- {r}\n"));
        }
        out.push('\n');
    }

    if report.coverage.classes_excluded > 0 {
        out.push_str(&format!(
            "**Note:** {} class(es) excluded via `exclude_classes`.\n\n",
            report.coverage.classes_excluded
        ));
    }
    if report.coverage.classes_class_level > 0 {
        out.push_str(&format!(
            "**Note:** {} class(es) had no line detail; whole-class totals were used.\n\n",
            report.coverage.classes_class_level
        ));
    }

    out.push_str("| Entity | Covered | Total | Ratio |\n");
    out.push_str("|---|---:|---:|---:|\n");
    for r in &report.ratios {
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            r.entity.display_name(),
            r.covered,
            r.total,
            format_ratio(r.ratio)
        ));
    }
    out.push('\n');

    if !report.violations.is_empty() {
        out.push_str("**Violations:**\n");
        for v in &report.violations {
            out.push_str(&format!("- {}\n", escape_md(&v.message)));
        }
        out.push('\n');
    }

    if !report.classes.is_empty() {
        out.push_str("| Class | Source | Precision | Instructions | Lines |\n");
        out.push_str("|---|---|---|---:|---:|\n");
        for c in &report.classes {
            out.push_str(&render_class_row(c));
        }
        out.push('\n');
    }

    out.push_str(&summary_line(&violation_report(report)));
    out.push('\n');
    out
}

fn violation_report(report: &DeltaReport) -> ViolationReport {
    ViolationReport {
        violations: report.violations.clone(),
        violation_count: report.verdict.violation_count,
        fail_on_violation: report.verdict.fail_on_violation,
        passed: report.violations.is_empty(),
    }
}

fn render_class_row(c: &ClassDelta) -> String {
    let precision = if c.line_level { "line" } else { "class" };
    format!(
        "| `{class}` | `{path}` | {precision} | {ic}/{it} | {lc}/{lt} |\n",
        class = escape_md(&c.class_name),
        path = escape_md(&c.source_path),
        ic = c.counters.instruction.covered,
        it = c.counters.instruction.total(),
        lc = c.counters.line.covered,
        lt = c.counters.line.total(),
    )
}

fn escape_md(s: &str) -> String {
    s.replace('|', "\\|").replace('`', "\\`")
}
