//! Data types (config + receipts) for deltacov.
//!
//! This crate is intentionally "dumb": pure DTOs with serde + schemars.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ── Schema Identifiers ─────────────────────────────────────────
pub const REPORT_SCHEMA_V1: &str = "deltacov.report.v1";

// ── Frozen Vocabulary ──────────────────────────────────────────
// Reason tokens (snake_case)
pub const REASON_NO_DIFF_INPUT: &str = "no_diff_input";
pub const REASON_NO_MODIFIED_CLASSES: &str = "no_modified_classes";
pub const REASON_CLASS_LEVEL_APPROXIMATION: &str = "class_level_approximation";
pub const REASON_VIOLATIONS: &str = "violations";

/// One of the five dimensions coverage is measured in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum CoverageEntity {
    Instruction,
    Branch,
    Line,
    Complexity,
    Method,
}

impl CoverageEntity {
    pub const ALL: [CoverageEntity; 5] = [
        CoverageEntity::Instruction,
        CoverageEntity::Branch,
        CoverageEntity::Line,
        CoverageEntity::Complexity,
        CoverageEntity::Method,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CoverageEntity::Instruction => "instruction",
            CoverageEntity::Branch => "branch",
            CoverageEntity::Line => "line",
            CoverageEntity::Complexity => "complexity",
            CoverageEntity::Method => "method",
        }
    }

    /// Name used in human-facing violation messages.
    pub fn display_name(self) -> &'static str {
        match self {
            CoverageEntity::Instruction => "instructions",
            CoverageEntity::Branch => "branches",
            CoverageEntity::Line => "lines",
            CoverageEntity::Complexity => "complexity",
            CoverageEntity::Method => "methods",
        }
    }

    /// Parses the snake_case token, also accepting the plural display name.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase();
        CoverageEntity::ALL
            .into_iter()
            .find(|e| e.as_str() == s || e.display_name() == s)
    }
}

/// Missed/covered pair for a single coverage entity.
///
/// `covered <= total()` holds by construction since the total is derived.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
pub struct Counter {
    pub missed: u32,
    pub covered: u32,
}

impl Counter {
    pub const ZERO: Counter = Counter {
        missed: 0,
        covered: 0,
    };

    pub fn new(missed: u32, covered: u32) -> Self {
        Self { missed, covered }
    }

    pub fn total(&self) -> u32 {
        self.missed.saturating_add(self.covered)
    }

    /// Covered fraction in `[0, 1]`; `1.0` when there is nothing to cover.
    pub fn ratio(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            1.0
        } else {
            f64::from(self.covered) / f64::from(total)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn merge(self, other: Counter) -> Counter {
        Counter {
            missed: self.missed.saturating_add(other.missed),
            covered: self.covered.saturating_add(other.covered),
        }
    }
}

impl std::ops::Add for Counter {
    type Output = Counter;

    fn add(self, rhs: Counter) -> Counter {
        self.merge(rhs)
    }
}

impl std::ops::AddAssign for Counter {
    fn add_assign(&mut self, rhs: Counter) {
        *self = self.merge(rhs);
    }
}

impl std::iter::Sum for Counter {
    fn sum<I: Iterator<Item = Counter>>(iter: I) -> Counter {
        iter.fold(Counter::ZERO, Counter::merge)
    }
}

/// One counter per coverage entity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
pub struct CoverageCounters {
    pub instruction: Counter,
    pub branch: Counter,
    pub line: Counter,
    pub complexity: Counter,
    pub method: Counter,
}

impl CoverageCounters {
    pub fn get(&self, entity: CoverageEntity) -> Counter {
        match entity {
            CoverageEntity::Instruction => self.instruction,
            CoverageEntity::Branch => self.branch,
            CoverageEntity::Line => self.line,
            CoverageEntity::Complexity => self.complexity,
            CoverageEntity::Method => self.method,
        }
    }

    pub fn get_mut(&mut self, entity: CoverageEntity) -> &mut Counter {
        match entity {
            CoverageEntity::Instruction => &mut self.instruction,
            CoverageEntity::Branch => &mut self.branch,
            CoverageEntity::Line => &mut self.line,
            CoverageEntity::Complexity => &mut self.complexity,
            CoverageEntity::Method => &mut self.method,
        }
    }

    pub fn merge(self, other: CoverageCounters) -> CoverageCounters {
        CoverageCounters {
            instruction: self.instruction + other.instruction,
            branch: self.branch + other.branch,
            line: self.line + other.line,
            complexity: self.complexity + other.complexity,
            method: self.method + other.method,
        }
    }

    pub fn is_empty(&self) -> bool {
        CoverageEntity::ALL.iter().all(|e| self.get(*e).is_empty())
    }
}

impl std::ops::Add for CoverageCounters {
    type Output = CoverageCounters;

    fn add(self, rhs: CoverageCounters) -> CoverageCounters {
        self.merge(rhs)
    }
}

/// Delta counters summed across every surviving class.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema,
)]
pub struct AggregatedRatios {
    pub counters: CoverageCounters,
}

impl AggregatedRatios {
    pub fn new(counters: CoverageCounters) -> Self {
        Self { counters }
    }

    pub fn counter(&self, entity: CoverageEntity) -> Counter {
        self.counters.get(entity)
    }

    pub fn ratio(&self, entity: CoverageEntity) -> f64 {
        self.counters.get(entity).ratio()
    }

    /// Per-entity ratio entries in entity declaration order.
    pub fn entries(&self) -> Vec<EntityRatio> {
        CoverageEntity::ALL
            .iter()
            .map(|e| {
                let c = self.counters.get(*e);
                EntityRatio {
                    entity: *e,
                    covered: c.covered,
                    total: c.total(),
                    ratio: c.ratio(),
                }
            })
            .collect()
    }
}

/// How method/complexity units are attributed to changed lines.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum MethodAttribution {
    /// A method counts as modified when any line of it changed.
    #[default]
    AnyLine,
    /// A method counts as modified only when every executable line changed.
    AllLines,
}

impl MethodAttribution {
    pub fn as_str(self) -> &'static str {
        match self {
            MethodAttribution::AnyLine => "any_line",
            MethodAttribution::AllLines => "all_lines",
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// A minimum ratio for one coverage entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ViolationRule {
    pub entity: CoverageEntity,
    /// Minimum covered ratio in `[0.0, 1.0]`.
    pub min_ratio: f64,
}

/// The on-disk configuration file (`deltacov.toml`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ConfigFile {
    /// Include other config files. Paths are relative to this config file's directory.
    /// Rules are merged: later definitions override earlier ones by entity.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule: Vec<ViolationRule>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Defaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_on_violation: Option<bool>,

    /// Blanket minimum for instructions, branches and lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_if_coverage_less_than: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_attribution: Option<MethodAttribution>,

    /// Globs matched against resolved source paths and class names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_classes: Vec<String>,
}

/// Entities covered by the blanket `fail_if_coverage_less_than` setting.
pub const BLANKET_RULE_ENTITIES: [CoverageEntity; 3] = [
    CoverageEntity::Instruction,
    CoverageEntity::Branch,
    CoverageEntity::Line,
];

/// Ordered rule set plus the process-level fail flag.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ViolationRules {
    pub rules: Vec<ViolationRule>,
    pub fail_on_violation: bool,
}

impl ViolationRules {
    /// Expands the blanket minimum, then lets explicit rules override per entity.
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let mut rules: Vec<ViolationRule> = Vec::new();
        if let Some(min) = cfg.defaults.fail_if_coverage_less_than {
            for entity in BLANKET_RULE_ENTITIES {
                rules.push(ViolationRule {
                    entity,
                    min_ratio: min,
                });
            }
        }
        for rule in &cfg.rule {
            upsert_rule(&mut rules, *rule);
        }
        Self {
            rules,
            fail_on_violation: cfg.defaults.fail_on_violation.unwrap_or(false),
        }
    }

    pub fn rule_for(&self, entity: CoverageEntity) -> Option<&ViolationRule> {
        self.rules.iter().find(|r| r.entity == entity)
    }
}

/// Replaces the rule for the same entity in place, or appends it.
pub fn upsert_rule(rules: &mut Vec<ViolationRule>, rule: ViolationRule) {
    match rules.iter_mut().find(|r| r.entity == rule.entity) {
        Some(existing) => *existing = rule,
        None => rules.push(rule),
    }
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EntityRatio {
    pub entity: CoverageEntity,
    pub covered: u32,
    pub total: u32,
    pub ratio: f64,
}

/// One breached rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Violation {
    pub entity: CoverageEntity,
    pub actual: f64,
    pub expected_min: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ViolationReport {
    /// Breached rules in rule-declaration order.
    pub violations: Vec<Violation>,
    pub violation_count: u32,
    pub fail_on_violation: bool,
    pub passed: bool,
}

impl ViolationReport {
    /// Whether the caller should abort the surrounding process.
    pub fn should_fail(&self) -> bool {
        self.fail_on_violation && !self.passed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Pass,
    /// Violations found but `fail_on_violation` is off.
    Warn,
    Fail,
}

impl VerdictStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VerdictStatus::Pass => "pass",
            VerdictStatus::Warn => "warn",
            VerdictStatus::Fail => "fail",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub violation_count: u32,
    pub fail_on_violation: bool,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ToolMeta {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DiffMeta {
    /// Human label for where the diff came from (file names, `base...head`).
    pub source: String,
    pub files_changed: u32,
    pub lines_changed: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct CoverageMeta {
    /// Distinct classes found across all artifacts (after merging).
    pub classes_analyzed: u32,
    /// Classes that survived delta filtering.
    pub classes_modified: u32,
    /// Modified classes whose totals were passed through without line detail.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub classes_class_level: u32,
    /// Classes dropped by `exclude_classes`.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub classes_excluded: u32,
    pub method_attribution: MethodAttribution,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// Per-class line in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClassDelta {
    pub class_name: String,
    pub source_path: String,
    pub line_level: bool,
    pub counters: CoverageCounters,
}

/// The JSON receipt for one delta-coverage run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DeltaReport {
    pub schema: String,
    pub tool: ToolMeta,
    pub diff: DiffMeta,
    pub coverage: CoverageMeta,
    pub ratios: Vec<EntityRatio>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<ClassDelta>,
    pub violations: Vec<Violation>,
    pub verdict: Verdict,
}
