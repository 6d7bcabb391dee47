//! quorate-sim: replays a governance scenario and prints its events.
//!
//! Each committed notification is written to stdout as one JSON line,
//! followed by a JSON summary. Logs go to stderr.

mod replay;
mod scenario;

use anyhow::Context;
use clap::Parser;
use quorate_governance::{GovernanceConfig, GovernanceEvent};
use quorate_utils::LogFormat;
use std::path::PathBuf;

use crate::scenario::Scenario;

#[derive(Parser)]
#[command(name = "quorate-sim", about = "Replay a threshold governance scenario")]
struct Cli {
    /// Scenario TOML file.
    scenario: PathBuf,

    /// Governance configuration TOML. Overrides the scenario's own
    /// configuration and the instance preset.
    #[arg(long, env = "QUORATE_CONFIG")]
    config: Option<PathBuf>,

    /// Write the final state snapshot to this file.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, default_value = "warn", env = "QUORATE_LOG_LEVEL")]
    log_level: String,

    /// Log format: "human" or "json".
    #[arg(long, default_value = "human", env = "QUORATE_LOG_FORMAT")]
    log_format: LogFormat,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    quorate_utils::init_logging(cli.log_format, &cli.log_level);

    let mut scenario = Scenario::from_toml_file(&cli.scenario)?;
    if let Some(path) = &cli.config {
        scenario.config = Some(GovernanceConfig::from_toml_file(path)?);
        tracing::info!("Loaded config from {}", path.display());
    }
    tracing::info!(
        instance = ?scenario.instance,
        steps = scenario.steps.len(),
        "replaying scenario"
    );

    let summary = replay::replay(
        &scenario,
        Box::new(|event: &GovernanceEvent| match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!("failed to encode event: {e}"),
        }),
    )?;
    println!("{}", serde_json::to_string(&summary)?);

    if let Some(path) = &cli.snapshot {
        std::fs::write(path, &summary.snapshot)
            .with_context(|| format!("writing snapshot {}", path.display()))?;
        tracing::info!("Snapshot written to {}", path.display());
    }

    let mismatches = summary.mismatches();
    if mismatches > 0 {
        anyhow::bail!("{mismatches} step(s) did not have their expected outcome");
    }
    Ok(())
}
