use assert_cmd::Command;
use assert_cmd::cargo;
use deltacov_testkit::{sample_configs, sample_diffs, sample_reports, validate_delta_report};
use deltacov_types::{DeltaReport, REPORT_SCHEMA_V1, VerdictStatus};
use predicates::prelude::*;
use tempfile::TempDir;

fn deltacov_cmd() -> Command {
    Command::new(cargo::cargo_bin!("deltacov"))
}

/// Temp dir holding the calculator coverage fixtures and one diff.
fn workspace(diff: &str) -> TempDir {
    let td = TempDir::new().expect("temp");
    let dir = td.path();
    std::fs::write(dir.join("jacoco.xml"), sample_reports::calculator_xml()).expect("write xml");
    std::fs::write(dir.join("jacoco.csv"), sample_reports::calculator_csv()).expect("write csv");
    std::fs::write(dir.join("change.diff"), diff).expect("write diff");
    td
}

fn read_report(path: &std::path::Path) -> DeltaReport {
    let text = std::fs::read_to_string(path).expect("read report");
    serde_json::from_str(&text).expect("parse report")
}

#[test]
fn violations_with_fail_flag_exit_two() {
    let td = workspace(sample_diffs::calculator_divide());
    let dir = td.path();

    deltacov_cmd()
        .current_dir(dir)
        .args(["check", "--diff-file", "change.diff", "--coverage", "jacoco.xml"])
        .args(["--fail-if-coverage-less-than", "0.7", "--fail-on-violation"])
        .args(["--md", "artifacts/deltacov/comment.md"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains(
            "instructions covered ratio is 0.2857, but expected minimum is 0.7",
        ))
        .stdout(predicate::str::contains(
            "Fail on violations: true. Found violations: 2",
        ));

    let report = read_report(&dir.join("artifacts/deltacov/report.json"));
    assert_eq!(report.schema, REPORT_SCHEMA_V1);
    assert_eq!(report.verdict.status, VerdictStatus::Fail);
    assert_eq!(report.classes.len(), 1);
    assert!(validate_delta_report(&report).is_ok());

    let md = std::fs::read_to_string(dir.join("artifacts/deltacov/comment.md")).expect("md");
    assert!(md.contains("## deltacov — FAIL"));
}

#[test]
fn violations_without_fail_flag_exit_zero() {
    let td = workspace(sample_diffs::calculator_divide());

    deltacov_cmd()
        .current_dir(td.path())
        .args(["check", "--diff-file", "change.diff", "--coverage", "jacoco.xml"])
        .args(["--min", "instruction=0.7", "--out", "out/report.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Fail on violations: false. Found violations: 1",
        ));

    let report = read_report(&td.path().join("out/report.json"));
    assert_eq!(report.verdict.status, VerdictStatus::Warn);
}

#[test]
fn config_file_is_picked_up_from_working_directory() {
    let td = workspace(sample_diffs::calculator_divide());
    std::fs::write(
        td.path().join("deltacov.toml"),
        sample_configs::BLANKET_STRICT_TOML,
    )
    .expect("write config");

    deltacov_cmd()
        .current_dir(td.path())
        .args(["check", "--diff-file", "change.diff", "--coverage", "jacoco.xml"])
        .assert()
        .code(2);

    deltacov_cmd()
        .current_dir(td.path())
        .args(["check", "--diff-file", "change.diff", "--coverage", "jacoco.xml"])
        .arg("--no-fail-on-violation")
        .assert()
        .code(0);
}

#[test]
fn diff_can_be_read_from_stdin() {
    let td = workspace("");

    deltacov_cmd()
        .current_dir(td.path())
        .args(["check", "--diff-file", "-", "--coverage", "jacoco.csv"])
        .args(["--fail-if-coverage-less-than", "0.7", "--fail-on-violation"])
        .write_stdin(sample_diffs::calculator_add())
        .assert()
        .code(2);

    let report = read_report(&td.path().join("artifacts/deltacov/report.json"));
    assert_eq!(report.diff.source, "(stdin)");
    assert_eq!(report.coverage.classes_class_level, 1);
}

#[test]
fn explicit_format_overrides_extension() {
    let td = workspace(sample_diffs::calculator_divide());
    std::fs::copy(td.path().join("jacoco.xml"), td.path().join("coverage.dat")).expect("copy");

    deltacov_cmd()
        .current_dir(td.path())
        .args(["check", "--diff-file", "change.diff", "--coverage", "coverage.dat"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--coverage-format"));

    deltacov_cmd()
        .current_dir(td.path())
        .args(["check", "--diff-file", "change.diff", "--coverage", "coverage.dat"])
        .args(["--coverage-format", "jacoco-xml"])
        .assert()
        .success();
}

#[test]
fn malformed_diff_is_a_tool_error() {
    let td = workspace(sample_diffs::malformed_hunk());

    deltacov_cmd()
        .current_dir(td.path())
        .args(["check", "--diff-file", "change.diff", "--coverage", "jacoco.xml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("malformed hunk header"));
}

#[test]
fn malformed_report_is_a_tool_error() {
    let td = workspace(sample_diffs::calculator_add());
    std::fs::write(td.path().join("bad.csv"), "GROUP,PACKAGE,CLASS\n").expect("write");

    deltacov_cmd()
        .current_dir(td.path())
        .args(["check", "--diff-file", "change.diff", "--coverage", "bad.csv"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("INSTRUCTION_MISSED"));
}

#[test]
fn excluded_classes_do_not_count() {
    let td = workspace(sample_diffs::calculator_divide());

    deltacov_cmd()
        .current_dir(td.path())
        .args(["check", "--diff-file", "change.diff", "--coverage", "jacoco.xml"])
        .args(["--fail-if-coverage-less-than", "0.7", "--fail-on-violation"])
        .args(["--exclude-classes", "**/acme/**"])
        .assert()
        .success();

    let report = read_report(&td.path().join("artifacts/deltacov/report.json"));
    assert_eq!(report.coverage.classes_excluded, 1);
    assert_eq!(report.coverage.classes_modified, 0);
}

fn run_git(dir: &std::path::Path, args: &[&str]) -> String {
    let out = std::process::Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .expect("git should run");
    assert!(
        out.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

#[test]
fn diffs_base_and_head_with_git() {
    let td = workspace("");
    let dir = td.path();

    run_git(dir, &["init"]);
    run_git(dir, &["config", "user.email", "test@example.com"]);
    run_git(dir, &["config", "user.name", "Test"]);

    let src = dir.join("src/main/java/com/acme");
    std::fs::create_dir_all(&src).expect("mkdir");
    let lines: Vec<String> = (1..=14).map(|i| format!("// line {i}")).collect();
    std::fs::write(src.join("Calculator.java"), lines.join("\n") + "\n").expect("write");
    run_git(dir, &["add", "src"]);
    run_git(dir, &["commit", "-m", "base"]);
    let base = run_git(dir, &["rev-parse", "HEAD"]);

    let mut changed = lines.clone();
    changed[9] = "// changed 10".to_string();
    changed[11] = "// changed 12".to_string();
    std::fs::write(src.join("Calculator.java"), changed.join("\n") + "\n").expect("write");
    run_git(dir, &["commit", "-am", "change"]);

    deltacov_cmd()
        .current_dir(dir)
        .args(["check", "--base", &base, "--coverage", "jacoco.xml"])
        .args(["--min", "line=0.6", "--fail-on-violation"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains(
            "lines covered ratio is 0.5, but expected minimum is 0.6",
        ));

    let report = read_report(&dir.join("artifacts/deltacov/report.json"));
    assert_eq!(report.diff.lines_changed, 2);
    assert_eq!(report.diff.source, format!("{base}...HEAD"));
}
