//! Rotor CLI — sector-rotation pipeline commands.
//!
//! Commands:
//! - `signal` — compute the momentum signal and print ranked sectors
//! - `rebalance` — preview the trades a run would propose, without executing
//! - `run` — execute the full pipeline (dry run unless `--live`)
//! - `kill` — activate, deactivate, or inspect the kill switch
//! - `history` — show recent journal entries
//! - `export` — flatten the journal into a CSV trade blotter

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use rotor_core::data::{PriceProvider, SyntheticProvider, YahooProvider};
use rotor_core::momentum::generate_signal;
use rotor_core::risk::{FileKillSwitch, KillSwitchStore};
use rotor_core::universe::Universe;
use rotor_engine::engine::ExecutionEngine;
use rotor_engine::export::export_trade_blotter;
use rotor_engine::rebalance::generate_rebalance_preview;
use rotor_engine::report::{
    format_execution_report, format_rebalance_report, format_signal_report,
};
use rotor_engine::{AppConfig, DryRunSubmitter, ExecutionMode, SignalJournal, SnapshotStore};

#[derive(Parser)]
#[command(name = "rotor", about = "Rotor — sector-momentum rotation pipeline")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "config/rotor.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the momentum signal and print ranked sectors.
    Signal {
        /// As-of date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<String>,

        /// Use the deterministic synthetic price provider (no network).
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Preview the trades a run would propose, without executing.
    Rebalance {
        /// Use the deterministic synthetic price provider (no network).
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Execute the full pipeline: signal, sizing, validation, submission.
    Run {
        /// Submit real orders instead of the default dry run.
        #[arg(long, default_value_t = false)]
        live: bool,

        /// Use the deterministic synthetic price provider (no network).
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Kill switch management.
    Kill {
        #[command(subcommand)]
        action: KillAction,
    },
    /// Show recent journal entries, newest first.
    History {
        /// Maximum entries to show.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Flatten the journal into a CSV trade blotter.
    Export {
        /// Output CSV path.
        #[arg(long, default_value = "data/exports/blotter.csv")]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
enum KillAction {
    /// Activate the kill switch with a reason.
    Activate { reason: String },
    /// Deactivate the kill switch.
    Deactivate,
    /// Show kill switch status.
    Status,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Signal { as_of, synthetic } => run_signal(&config, as_of, synthetic),
        Commands::Rebalance { synthetic } => run_rebalance(&config, synthetic),
        Commands::Run { live, synthetic } => run_pipeline(config, live, synthetic),
        Commands::Kill { action } => run_kill(&config, action),
        Commands::History { limit } => run_history(&config, limit),
        Commands::Export { output } => run_export(&config, &output),
    }
}

fn load_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        AppConfig::from_file(path).with_context(|| format!("loading {}", path.display()))
    } else {
        log::info!("{} not found, using defaults", path.display());
        Ok(AppConfig::default())
    }
}

fn load_universe(config: &AppConfig) -> Result<Universe> {
    match &config.paths.universe {
        Some(path) => Universe::from_file(path)
            .with_context(|| format!("loading universe from {}", path.display())),
        None => Ok(Universe::default_uk_sectors()),
    }
}

fn make_provider(synthetic: bool) -> Box<dyn PriceProvider> {
    if synthetic {
        Box::new(SyntheticProvider::new(42))
    } else {
        Box::new(YahooProvider::new())
    }
}

fn run_signal(config: &AppConfig, as_of: Option<String>, synthetic: bool) -> Result<()> {
    let universe = load_universe(config)?;
    let provider = make_provider(synthetic);

    let as_of = match as_of {
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .with_context(|| format!("invalid --as-of date: {s}"))?,
        None => Utc::now().date_naive(),
    };

    let signal = generate_signal(
        provider.as_ref(),
        &universe.symbols(),
        as_of,
        &config.momentum_config(),
    )?;

    // Cash is display-only here; a missing snapshot is fine.
    let cash = SnapshotStore::new(config.paths.snapshots.clone())
        .load_latest()
        .ok()
        .flatten()
        .map(|s| s.cash)
        .unwrap_or(0.0);

    print!("{}", format_signal_report(&signal, &universe, cash));
    Ok(())
}

fn run_rebalance(config: &AppConfig, synthetic: bool) -> Result<()> {
    let universe = load_universe(config)?;
    let provider = make_provider(synthetic);

    let preview = generate_rebalance_preview(config, &universe, provider.as_ref(), Utc::now())?;
    print!("{}", format_rebalance_report(&preview));

    println!("Execute these trades manually, then refresh the snapshot:");
    println!("  rotor run          # or submit via your broker");
    println!();
    Ok(())
}

fn run_pipeline(mut config: AppConfig, live: bool, synthetic: bool) -> Result<()> {
    if live {
        config.execution.mode = ExecutionMode::Live;
    }
    if config.execution.mode == ExecutionMode::Live && synthetic {
        bail!("refusing to run live against the synthetic price provider");
    }

    let universe = load_universe(&config)?;
    let provider = make_provider(synthetic);

    // Live order routing plugs in behind OrderSubmitter; until a venue
    // adapter is configured, live mode runs the same no-op submitter.
    let submitter = Box::new(DryRunSubmitter::new());

    let mut engine = ExecutionEngine::new(config, universe, provider, submitter);
    match engine.run() {
        Ok(report) => {
            print!("{}", format_execution_report(&report));
            if !report.success {
                std::process::exit(1);
            }
            Ok(())
        }
        Err(kill) => bail!("{kill}"),
    }
}

fn run_kill(config: &AppConfig, action: KillAction) -> Result<()> {
    let switch = FileKillSwitch::new(config.paths.kill_switch.clone());

    match action {
        KillAction::Activate { reason } => {
            switch.activate(&reason)?;
            println!("Kill switch ACTIVATED: {reason}");
        }
        KillAction::Deactivate => {
            if switch.deactivate()? {
                println!("Kill switch deactivated.");
            } else {
                println!("Kill switch was not active.");
            }
        }
        KillAction::Status => match switch.reason() {
            Some(reason) => println!("Kill switch ACTIVE:\n{reason}"),
            None => println!("Kill switch inactive."),
        },
    }
    Ok(())
}

fn run_history(config: &AppConfig, limit: usize) -> Result<()> {
    let journal = SignalJournal::new(config.paths.journal.clone());
    let entries = journal.history(limit)?;

    if entries.is_empty() {
        println!("No journal entries.");
        return Ok(());
    }

    for entry in entries {
        let validation = match &entry.validation {
            Some(v) if v.valid => "passed",
            Some(_) => "FAILED",
            None => "-",
        };
        println!(
            "{}  {}  mode={}  trades={}  validation={}  top={}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.signal_date,
            entry.execution_mode.as_str(),
            entry.trade_count,
            validation,
            if entry.top_sectors.is_empty() {
                "(cash)".to_string()
            } else {
                entry.top_sectors.join(",")
            },
        );
    }
    Ok(())
}

fn run_export(config: &AppConfig, output: &Path) -> Result<()> {
    let journal = SignalJournal::new(config.paths.journal.clone());
    let rows = export_trade_blotter(&journal, output)?;
    println!("Exported {rows} trades to {}", output.display());
    Ok(())
}
