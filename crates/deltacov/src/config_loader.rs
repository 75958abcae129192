//! Configuration loading with include resolution.
//!
//! - `includes` compose a config from other files, resolved relative to the
//!   including file
//! - circular includes and nesting deeper than [`MAX_INCLUDE_DEPTH`] are errors
//! - later definitions override earlier ones; the including file wins

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;

use deltacov_types::{ConfigFile, Defaults, upsert_rule};

pub const MAX_INCLUDE_DEPTH: usize = 10;

/// Load `path`, expanding environment references with `expand_env` before
/// parsing each file.
pub fn load_config_with_includes<F>(path: &Path, expand_env: F) -> Result<ConfigFile>
where
    F: Fn(&str) -> Result<String> + Copy,
{
    let mut visited = HashSet::new();
    load_config_recursive(path, expand_env, &mut visited, 0)
}

fn load_config_recursive<F>(
    path: &Path,
    expand_env: F,
    visited: &mut HashSet<PathBuf>,
    depth: usize,
) -> Result<ConfigFile>
where
    F: Fn(&str) -> Result<String> + Copy,
{
    if depth > MAX_INCLUDE_DEPTH {
        bail!(
            "include depth exceeded maximum of {} levels at '{}'",
            MAX_INCLUDE_DEPTH,
            path.display()
        );
    }

    let canonical = path
        .canonicalize()
        .with_context(|| format!("canonicalize path '{}'", path.display()))?;
    if !visited.insert(canonical.clone()) {
        bail!("circular include detected: '{}'", path.display());
    }

    debug!("loading config from '{}' (depth {})", path.display(), depth);

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config '{}'", path.display()))?;
    let expanded =
        expand_env(&text).with_context(|| format!("expand config '{}'", path.display()))?;
    let config: ConfigFile =
        toml::from_str(&expanded).with_context(|| format!("parse config '{}'", path.display()))?;

    let base_dir = path.parent().unwrap_or(Path::new("."));
    let mut merged = ConfigFile::default();
    for include in &config.includes {
        let full_path = base_dir.join(include);
        if !full_path.exists() {
            bail!(
                "included config file not found: '{}' (resolved from '{}')",
                full_path.display(),
                include
            );
        }
        let included = load_config_recursive(&full_path, expand_env, visited, depth + 1)?;
        merged = merge_configs(merged, included);
    }

    // Siblings may include the same file; only the active chain counts as a cycle.
    visited.remove(&canonical);

    Ok(merge_configs(
        merged,
        ConfigFile {
            includes: vec![],
            ..config
        },
    ))
}

/// Overlay `other` on `base`: set defaults win, rules replace per entity.
pub fn merge_configs(base: ConfigFile, other: ConfigFile) -> ConfigFile {
    let defaults = Defaults {
        fail_on_violation: other
            .defaults
            .fail_on_violation
            .or(base.defaults.fail_on_violation),
        fail_if_coverage_less_than: other
            .defaults
            .fail_if_coverage_less_than
            .or(base.defaults.fail_if_coverage_less_than),
        method_attribution: other
            .defaults
            .method_attribution
            .or(base.defaults.method_attribution),
        exclude_classes: merge_globs(base.defaults.exclude_classes, other.defaults.exclude_classes),
    };

    let mut rule = base.rule;
    for r in other.rule {
        upsert_rule(&mut rule, r);
    }

    ConfigFile {
        includes: vec![],
        defaults,
        rule,
    }
}

fn merge_globs(mut base: Vec<String>, other: Vec<String>) -> Vec<String> {
    for g in other {
        if !base.contains(&g) {
            base.push(g);
        }
    }
    base
}
