//! wellplug - Well-Plugging Policy Kernel CLI
//!
//! Builds a plug-and-abandon plan from a normalized facts document and a
//! resolved policy.
//!
//! # Usage
//!
//! ```bash
//! # Generate a plan
//! wellplug plan --facts well.json --policy tx_w3a.json --pretty
//!
//! # Validate an engineering-constants file
//! wellplug check-config kernel_config.toml
//!
//! # Annular capacity in bbl/ft
//! wellplug capacity --outer-id 8.835 --inner-od 5.5
//! ```
//!
//! # Environment Variables
//!
//! - `WELLPLUG_CONFIG`: Path to a kernel config TOML (default: ./kernel_config.toml)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use wellplug::config::{KernelConfig, CONFIG_ENV_VAR};
use wellplug::geometry::annulus_capacity_with;
use wellplug::providers::{read_facts_file, read_policy_file};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "wellplug")]
#[command(about = "Well-plugging policy kernel: deterministic P&A plans from well facts")]
#[command(version)]
struct CliArgs {
    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Generate a plugging plan
    Plan {
        /// Normalized well facts (JSON)
        #[arg(long)]
        facts: PathBuf,
        /// Resolved regulatory policy (JSON)
        #[arg(long)]
        policy: PathBuf,
        /// Kernel config TOML (default: $WELLPLUG_CONFIG, then ./kernel_config.toml)
        #[arg(long, env = CONFIG_ENV_VAR)]
        config: Option<PathBuf>,
        /// Pretty-print the plan JSON
        #[arg(long)]
        pretty: bool,
        /// Write the plan here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Validate a kernel config file and print the effective values
    CheckConfig {
        /// Config TOML to check (default: standard search order)
        path: Option<PathBuf>,
    },

    /// Print annular capacity in bbl/ft
    Capacity {
        /// Outer wall ID (in)
        #[arg(long)]
        outer_id: f64,
        /// Inner pipe OD (in); 0 for an open cylinder
        #[arg(long, default_value = "0")]
        inner_od: f64,
    },
}

// ============================================================================
// Commands
// ============================================================================

fn load_config(path: Option<&Path>) -> Result<KernelConfig> {
    match path {
        Some(p) => KernelConfig::load_from_file(p)
            .with_context(|| format!("Failed to load kernel config {}", p.display())),
        None => Ok(KernelConfig::load()),
    }
}

fn run_plan(
    facts_path: &Path,
    policy_path: &Path,
    config_path: Option<&Path>,
    pretty: bool,
    out: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let facts = read_facts_file(facts_path).context("Failed to read well facts")?;
    let policy = read_policy_file(policy_path).context("Failed to read policy")?;

    let plan = wellplug::generate_plan(&facts, &policy, &config).context("Plan generation failed")?;

    if !plan.policy_complete {
        warn!(policy_id = %plan.policy_id, "Policy incomplete; plan has no steps");
    }
    for v in &plan.violations {
        info!(code = %v.code, severity = %v.severity, "{}", v.message);
    }
    info!(
        steps = plan.steps.len(),
        total_sacks = plan.materials_totals.total_sacks,
        total_bbl = plan.materials_totals.total_bbl,
        "Plan ready"
    );

    let json = if pretty {
        serde_json::to_string_pretty(&plan)
    } else {
        serde_json::to_string(&plan)
    }
    .context("Failed to serialize plan")?;

    match out {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write plan to {}", path.display()))?;
            info!(path = %path.display(), "Plan written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_check_config(path: Option<&Path>) -> Result<()> {
    let (config, explicit) = match path {
        Some(p) => {
            let (config, provenance) = KernelConfig::load_from_file_with_provenance(p)
                .with_context(|| format!("Config check failed for {}", p.display()))?;
            (config, provenance.explicit_keys.len())
        }
        None => {
            let (config, provenance) = KernelConfig::load_with_provenance();
            (config, provenance.explicit_keys.len())
        }
    };
    config.validate().context("Config validation failed")?;
    info!(explicit_keys = explicit, "Config OK");
    print!("{}", config.to_toml().context("Failed to render config")?);
    Ok(())
}

fn run_capacity(outer_id: f64, inner_od: f64) -> Result<()> {
    if !(outer_id.is_finite() && outer_id > 0.0) {
        return Err(anyhow::anyhow!("--outer-id must be a positive diameter (got {outer_id})"));
    }
    if !inner_od.is_finite() || inner_od < 0.0 {
        return Err(anyhow::anyhow!("--inner-od must be >= 0 (got {inner_od})"));
    }
    let config = KernelConfig::default();
    let bbl_per_ft = annulus_capacity_with(outer_id, inner_od, config.materials.capacity_divisor);
    println!(
        "{bbl_per_ft:.5} bbl/ft ({:.4} ft3/ft)",
        bbl_per_ft * config.materials.ft3_per_bbl
    );
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    // Logs go to stderr so plan JSON on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    match args.command {
        SubCommand::Plan {
            facts,
            policy,
            config,
            pretty,
            out,
        } => run_plan(&facts, &policy, config.as_deref(), pretty, out.as_deref()),
        SubCommand::CheckConfig { path } => run_check_config(path.as_deref()),
        SubCommand::Capacity { outer_id, inner_od } => run_capacity(outer_id, inner_od),
    }
}
