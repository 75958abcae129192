//! Minimum-ratio rules over aggregated delta coverage.

use deltacov_types::{AggregatedRatios, CoverageEntity, Violation, ViolationReport, ViolationRules};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RuleConfigError {
    #[error("rule for {entity} has min_ratio {value}, expected a value in [0, 1]")]
    RatioOutOfRange { entity: String, value: f64 },
}

/// Reject rules whose minimum is NaN or outside `[0, 1]`.
pub fn validate_rules(rules: &ViolationRules) -> Result<(), RuleConfigError> {
    for rule in &rules.rules {
        if !(0.0..=1.0).contains(&rule.min_ratio) {
            return Err(RuleConfigError::RatioOutOfRange {
                entity: rule.entity.as_str().to_string(),
                value: rule.min_ratio,
            });
        }
    }
    Ok(())
}

/// Check every rule against the aggregated ratios, in rule order.
pub fn evaluate_violations(ratios: &AggregatedRatios, rules: &ViolationRules) -> ViolationReport {
    let violations: Vec<Violation> = rules
        .rules
        .iter()
        .filter_map(|rule| {
            let actual = ratios.ratio(rule.entity);
            (actual < rule.min_ratio).then(|| Violation {
                entity: rule.entity,
                actual,
                expected_min: rule.min_ratio,
                message: violation_message(rule.entity, actual, rule.min_ratio),
            })
        })
        .collect();

    ViolationReport {
        violation_count: u32::try_from(violations.len()).unwrap_or(u32::MAX),
        passed: violations.is_empty(),
        fail_on_violation: rules.fail_on_violation,
        violations,
    }
}

/// The actual ratio is printed with as many decimals as it takes to tell it
/// apart from the minimum, four at least.
pub fn violation_message(entity: CoverageEntity, actual: f64, min: f64) -> String {
    let (actual_text, min_text) = (4..=12)
        .map(|decimals| (format_ratio_to(actual, decimals), format_ratio_to(min, decimals)))
        .find(|(a, m)| a != m)
        .unwrap_or_else(|| (format_ratio(actual), format_ratio(min)));
    format!(
        "{} covered ratio is {actual_text}, but expected minimum is {min_text}",
        entity.display_name(),
    )
}

/// Four decimals at most, trailing zeros dropped: `0.5`, `0.6667`, `1`.
pub fn format_ratio(value: f64) -> String {
    format_ratio_to(value, 4)
}

fn format_ratio_to(value: f64, decimals: usize) -> String {
    let fixed = format!("{value:.decimals$}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-0" => "0".to_string(),
        s => s.to_string(),
    }
}

pub fn summary_line(report: &ViolationReport) -> String {
    format!(
        "Fail on violations: {}. Found violations: {}",
        report.fail_on_violation, report.violation_count
    )
}
