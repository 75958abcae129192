use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use schemars::schema_for;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Repo automation tasks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the "CI local" suite: fmt, clippy and test.
    Ci,

    /// Generate JSON Schemas for the report and config into `schemas/`.
    Schema {
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,

        /// Fail instead of writing when the files on disk are stale.
        #[arg(long)]
        check: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Ci => ci(),
        Cmd::Schema { out_dir, check } => schema(&out_dir, check),
    }
}

fn ci() -> Result<()> {
    run("cargo", &["fmt", "--check"])?;
    run(
        "cargo",
        &[
            "clippy",
            "--workspace",
            "--all-targets",
            "--",
            "-D",
            "warnings",
        ],
    )?;
    run("cargo", &["test", "--workspace"])?;
    Ok(())
}

/// `(file name, pretty JSON)` for every published schema.
fn rendered_schemas() -> Result<Vec<(&'static str, Vec<u8>)>> {
    let cfg_schema = schema_for!(deltacov_types::ConfigFile);
    let report_schema = schema_for!(deltacov_types::DeltaReport);

    Ok(vec![
        (
            "deltacov.config.schema.json",
            serde_json::to_vec_pretty(&cfg_schema).context("serialize config schema")?,
        ),
        (
            "deltacov.report.v1.schema.json",
            serde_json::to_vec_pretty(&report_schema).context("serialize report schema")?,
        ),
    ])
}

fn schema(out_dir: &Path, check: bool) -> Result<()> {
    let schemas = rendered_schemas()?;

    if check {
        let stale: Vec<&str> = schemas
            .iter()
            .filter(|(name, bytes)| std::fs::read(out_dir.join(name)).ok().as_ref() != Some(bytes))
            .map(|(name, _)| *name)
            .collect();
        if !stale.is_empty() {
            bail!(
                "stale schemas in {}: {}; run `cargo xtask schema`",
                out_dir.display(),
                stale.join(", ")
            );
        }
        return Ok(());
    }

    std::fs::create_dir_all(out_dir).context("create schema output dir")?;
    for (name, bytes) in &schemas {
        let path = out_dir.join(name);
        std::fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn run(bin: &str, args: &[&str]) -> Result<()> {
    let status = Command::new(bin)
        .args(args)
        .status()
        .with_context(|| format!("run {bin} {args:?}"))?;
    if !status.success() {
        bail!("command failed: {bin} {args:?}");
    }
    Ok(())
}
