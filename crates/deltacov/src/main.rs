use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, info, warn};

use deltacov_core::{CoverageArtifact, DeltaPlan, DiffInput, run_delta_check};
use deltacov_coverage::CoverageFormat;
use deltacov_domain::{ClassExclusions, validate_rules};
use deltacov_types::{
    ConfigFile, CoverageEntity, MethodAttribution, ViolationRule, ViolationRules, upsert_rule,
};

mod config_loader;
mod env_expand;

use config_loader::load_config_with_includes;
use env_expand::expand_env_vars;

const DEFAULT_CONFIG: &str = "deltacov.toml";

#[derive(Parser)]
#[command(name = "deltacov")]
#[command(about = "Test coverage of the lines a diff changed", long_about = None)]
struct Cli {
    /// Enable verbose (info-level) logging to stderr.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Enable debug-level logging to stderr.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute delta coverage for a diff and evaluate violation rules.
    Check(Box<CheckArgs>),

    /// Print the effective violation rules.
    Rules(RulesArgs),

    /// Validate the configuration file (rule ratios and exclude globs).
    Validate(ValidateArgs),
}

#[derive(Parser, Debug, Default)]
struct CheckArgs {
    /// Unified diff file, or '-' for stdin (repeatable; sources are unioned).
    #[arg(long, action = clap::ArgAction::Append)]
    diff_file: Vec<PathBuf>,

    /// Base git ref; diffs `base...head` with git.
    #[arg(long)]
    base: Option<String>,

    /// Head git ref used with --base (defaults to HEAD).
    #[arg(long, requires = "base")]
    head: Option<String>,

    /// Coverage report (repeatable; reports are merged per class).
    #[arg(long, required = true, action = clap::ArgAction::Append)]
    coverage: Vec<PathBuf>,

    /// Coverage report format. Inferred from the file extension when omitted.
    #[arg(long, value_enum)]
    coverage_format: Option<CoverageFormatArg>,

    /// Path to a config file. If omitted, uses ./deltacov.toml if present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Blanket minimum ratio for instructions, branches and lines.
    #[arg(long)]
    fail_if_coverage_less_than: Option<f64>,

    /// Minimum ratio for one entity, e.g. `--min branch=0.6` (repeatable).
    #[arg(long = "min", value_parser = parse_min_rule, action = clap::ArgAction::Append)]
    min: Vec<ViolationRule>,

    /// Exit with code 2 when violations are found.
    #[arg(long, overrides_with = "no_fail_on_violation")]
    fail_on_violation: bool,

    /// Report violations without failing.
    #[arg(long, overrides_with = "fail_on_violation")]
    no_fail_on_violation: bool,

    #[arg(long, value_enum)]
    method_attribution: Option<AttributionArg>,

    /// Glob over class names and source paths to leave out (repeatable).
    #[arg(long, action = clap::ArgAction::Append)]
    exclude_classes: Vec<String>,

    /// Where to write the JSON report.
    #[arg(long, default_value = "artifacts/deltacov/report.json")]
    out: PathBuf,

    /// Where to write a markdown summary.
    #[arg(long)]
    md: Option<PathBuf>,

    /// Omit per-class entries from the report.
    #[arg(long)]
    no_class_details: bool,
}

#[derive(Parser, Debug)]
struct RulesArgs {
    /// Path to a config file. If omitted, uses ./deltacov.toml if present.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = RulesFormat::Toml)]
    format: RulesFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RulesFormat {
    Toml,
    Json,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Path to a config file. If omitted, uses ./deltacov.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also warn about configs that can never produce a violation.
    #[arg(long)]
    strict: bool,

    #[arg(long, value_enum, default_value_t = ValidateFormat::Text)]
    format: ValidateFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ValidateFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CoverageFormatArg {
    Csv,
    JacocoXml,
}

impl From<CoverageFormatArg> for CoverageFormat {
    fn from(v: CoverageFormatArg) -> Self {
        match v {
            CoverageFormatArg::Csv => CoverageFormat::Csv,
            CoverageFormatArg::JacocoXml => CoverageFormat::JacocoXml,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AttributionArg {
    AnyLine,
    AllLines,
}

impl From<AttributionArg> for MethodAttribution {
    fn from(v: AttributionArg) -> Self {
        match v {
            AttributionArg::AnyLine => MethodAttribution::AnyLine,
            AttributionArg::AllLines => MethodAttribution::AllLines,
        }
    }
}

/// Effective rules as printed by `deltacov rules`.
#[derive(Debug, Serialize)]
struct EffectiveRules {
    fail_on_violation: bool,
    rule: Vec<ViolationRule>,
}

impl From<ViolationRules> for EffectiveRules {
    fn from(r: ViolationRules) -> Self {
        Self {
            fail_on_violation: r.fail_on_violation,
            rule: r.rules,
        }
    }
}

#[cfg(not(test))]
fn main() -> std::process::ExitCode {
    match run_with_args(std::env::args_os()) {
        Ok(code) => std::process::ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(err) => {
            eprintln!("{err:?}");
            std::process::ExitCode::from(1)
        }
    }
}

fn run_with_args<I, T>(args: I) -> Result<i32>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    init_logging(cli.verbose, cli.debug);

    match cli.command {
        Commands::Check(args) => cmd_check(*args),
        Commands::Rules(args) => {
            cmd_rules(args)?;
            Ok(0)
        }
        Commands::Validate(args) => cmd_validate(args),
    }
}

/// Initialize tracing/logging based on CLI flags.
fn init_logging(verbose: bool, debug: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    debug!("Logging initialized at level: {}", level);
}

fn parse_min_rule(s: &str) -> Result<ViolationRule, String> {
    let (entity, ratio) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ENTITY=RATIO, got '{s}'"))?;
    let entity = CoverageEntity::parse(entity).ok_or_else(|| {
        format!("unknown entity '{entity}' (instruction, branch, line, complexity, method)")
    })?;
    let min_ratio = ratio
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid ratio '{ratio}': {e}"))?;
    Ok(ViolationRule { entity, min_ratio })
}

fn cmd_check(args: CheckArgs) -> Result<i32> {
    info!("Starting deltacov check");

    let mut cfg = load_config(args.config.clone())?;
    apply_cli_overrides(&mut cfg, &args);

    let plan = DeltaPlan {
        rules: ViolationRules::from_config(&cfg),
        method_attribution: cfg.defaults.method_attribution.unwrap_or_default(),
        exclude_classes: cfg.defaults.exclude_classes.clone(),
        include_classes: !args.no_class_details,
    };
    debug!(
        "Check parameters: rules={}, fail_on_violation={}, attribution={}",
        plan.rules.rules.len(),
        plan.rules.fail_on_violation,
        plan.method_attribution.as_str()
    );

    let diffs = collect_diffs(&args)?;
    let artifacts = collect_artifacts(&args)?;

    let run = run_delta_check(&plan, &diffs, &artifacts)?;

    write_json(&args.out, &run.report)?;
    info!("Wrote report to {}", args.out.display());
    if let Some(md) = &args.md {
        write_text(md, &run.markdown)?;
        info!("Wrote markdown summary to {}", md.display());
    }

    for v in &run.report.violations {
        println!("{}", v.message);
    }
    println!("{}", run.summary);

    Ok(run.exit_code)
}

/// CLI flags win over config values.
fn apply_cli_overrides(cfg: &mut ConfigFile, args: &CheckArgs) {
    if let Some(min) = args.fail_if_coverage_less_than {
        cfg.defaults.fail_if_coverage_less_than = Some(min);
    }
    for rule in &args.min {
        upsert_rule(&mut cfg.rule, *rule);
    }
    if args.fail_on_violation {
        cfg.defaults.fail_on_violation = Some(true);
    } else if args.no_fail_on_violation {
        cfg.defaults.fail_on_violation = Some(false);
    }
    if let Some(attribution) = args.method_attribution {
        cfg.defaults.method_attribution = Some(attribution.into());
    }
    for glob in &args.exclude_classes {
        if !cfg.defaults.exclude_classes.contains(glob) {
            cfg.defaults.exclude_classes.push(glob.clone());
        }
    }
}

fn collect_diffs(args: &CheckArgs) -> Result<Vec<DiffInput>> {
    let mut diffs = Vec::new();

    for diff_file in &args.diff_file {
        let input = if diff_file == Path::new("-") {
            info!("Reading unified diff from stdin");
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("read diff from stdin")?;
            DiffInput {
                label: "(stdin)".to_string(),
                text,
            }
        } else {
            info!("Reading unified diff from file: {}", diff_file.display());
            let text = std::fs::read_to_string(diff_file)
                .with_context(|| format!("read diff file {}", diff_file.display()))?;
            DiffInput {
                label: diff_file.display().to_string(),
                text,
            }
        };
        diffs.push(input);
    }

    if let Some(base) = &args.base {
        let head = args.head.as_deref().unwrap_or("HEAD");
        info!("Diffing {}...{}", base, head);
        diffs.push(DiffInput {
            label: format!("{base}...{head}"),
            text: git_diff(base, head)?,
        });
    }

    if diffs.is_empty() {
        warn!("No diff input given (--diff-file or --base); nothing counts as changed");
    }
    Ok(diffs)
}

fn collect_artifacts(args: &CheckArgs) -> Result<Vec<CoverageArtifact>> {
    args.coverage
        .iter()
        .map(|path| {
            let format = match args.coverage_format {
                Some(f) => f.into(),
                None => CoverageFormat::from_path(path).with_context(|| {
                    format!(
                        "cannot infer coverage format of {}; pass --coverage-format",
                        path.display()
                    )
                })?,
            };
            let bytes = std::fs::read(path)
                .with_context(|| format!("read coverage report {}", path.display()))?;
            debug!("Read {} bytes of {} coverage from {}", bytes.len(), format.as_str(), path.display());
            Ok(CoverageArtifact {
                label: path.display().to_string(),
                format,
                bytes,
            })
        })
        .collect()
}

fn cmd_rules(args: RulesArgs) -> Result<()> {
    let cfg = load_config(args.config)?;
    let effective = EffectiveRules::from(ViolationRules::from_config(&cfg));

    match args.format {
        RulesFormat::Toml => {
            let s = toml::to_string_pretty(&effective).context("render toml")?;
            print!("{s}");
        }
        RulesFormat::Json => {
            let s = serde_json::to_string_pretty(&effective).context("render json")?;
            println!("{s}");
        }
    }

    Ok(())
}

fn cmd_validate(args: ValidateArgs) -> Result<i32> {
    info!("Validating configuration file");

    let config_path = args.config.clone().or_else(|| {
        let p = PathBuf::from(DEFAULT_CONFIG);
        if p.exists() { Some(p) } else { None }
    });

    let Some(path) = config_path else {
        bail!("No configuration file found. Specify --config or create {DEFAULT_CONFIG}");
    };

    let cfg = load_config_with_includes(&path, expand_env_vars)?;

    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    if let Some(min) = cfg.defaults.fail_if_coverage_less_than {
        if !(0.0..=1.0).contains(&min) {
            errors.push(format!(
                "fail_if_coverage_less_than is {min}, expected a value in [0, 1]"
            ));
        }
    }
    for rule in &cfg.rule {
        if let Err(e) = validate_rules(&ViolationRules {
            rules: vec![*rule],
            fail_on_violation: false,
        }) {
            errors.push(e.to_string());
        }
    }

    let mut seen = Vec::new();
    for rule in &cfg.rule {
        if seen.contains(&rule.entity) {
            warnings.push(format!(
                "rule for {} is defined more than once; the last one wins",
                rule.entity.as_str()
            ));
        }
        seen.push(rule.entity);
    }

    for glob in &cfg.defaults.exclude_classes {
        if let Err(e) = ClassExclusions::compile(std::slice::from_ref(glob)) {
            errors.push(e.to_string());
        }
    }

    let rules = ViolationRules::from_config(&cfg);
    if args.strict {
        if rules.rules.is_empty() {
            warnings.push("no rules defined; every run passes".to_string());
        }
        if cfg.defaults.fail_on_violation.is_none() {
            warnings.push("fail_on_violation not set; violations are report-only".to_string());
        }
    }

    match args.format {
        ValidateFormat::Json => {
            let result = serde_json::json!({
                "valid": errors.is_empty(),
                "path": path.display().to_string(),
                "rules_count": rules.rules.len(),
                "errors": errors,
                "warnings": warnings,
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        ValidateFormat::Text => {
            println!("Validating {}...", path.display());
            println!();

            if !warnings.is_empty() {
                println!("Warnings ({}):", warnings.len());
                for (i, w) in warnings.iter().enumerate() {
                    println!("  {}. {}", i + 1, w);
                }
                println!();
            }

            if errors.is_empty() {
                println!("Configuration is valid!");
                println!("  {} rule(s) in effect", rules.rules.len());
            } else {
                println!("Configuration has {} error(s):", errors.len());
                println!();
                for (i, e) in errors.iter().enumerate() {
                    println!("  {}. {}", i + 1, e);
                }
            }
        }
    }

    if errors.is_empty() { Ok(0) } else { Ok(1) }
}

fn load_config(path: Option<PathBuf>) -> Result<ConfigFile> {
    let user_path = path.or_else(|| {
        let p = PathBuf::from(DEFAULT_CONFIG);
        if p.exists() { Some(p) } else { None }
    });

    let Some(path) = user_path else {
        debug!("No config file found, using defaults");
        return Ok(ConfigFile::default());
    };

    info!("Loading config from: {}", path.display());
    let parsed = load_config_with_includes(&path, expand_env_vars)?;
    debug!("Loaded {} explicit rule(s) from config", parsed.rule.len());
    Ok(parsed)
}

fn git_diff(base: &str, head: &str) -> Result<String> {
    let range = format!("{base}...{head}");

    let output = Command::new("git")
        .args(["diff", "--unified=0", "--no-color", &range])
        .output()
        .context("run git diff")?;

    if !output.status.success() {
        bail!(
            "git diff failed (exit={}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

fn write_json(path: &Path, value: &impl serde::Serialize) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
    }

    let bytes = serde_json::to_vec_pretty(value).context("serialize report")?;
    std::fs::write(path, bytes).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
    }

    std::fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
