//! Tally CLI - Drive and inspect a treasury governance ledger.
//!
//! Runs scenario scripts against a fresh ledger, writes default configs,
//! and checks saved snapshots against their own event history.

pub mod config;
pub mod output;
pub mod scenario;
pub mod telemetry;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tally_governance::{AccountBook, GovernanceLedger, LedgerSnapshot, LedgerState, StaticWeights};
use tracing::info;

use crate::config::{LogFormat, TallyConfig};
use crate::scenario::Script;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Tally - treasury governance ledger")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Config file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level, overrides the config file
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Log format, overrides the config file
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default configuration file
    Init {
        #[arg(short, long, default_value = "tally.toml")]
        out: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Execute a scenario script
    Run {
        script: PathBuf,
        /// Print the event log as JSON lines
        #[arg(long)]
        json: bool,
        /// Save the final ledger to this file
        #[arg(long, value_name = "FILE")]
        snapshot: Option<PathBuf>,
    },
    /// Replay a snapshot's events and compare with its tables
    Replay { snapshot: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => TallyConfig::from_file(path)?,
        None => TallyConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    config.validate()?;
    let log_guard = telemetry::init_from_config(&config.logging)?;

    let result = execute(cli.command, config);
    if let Err(e) = &result {
        output::print_error(&e.to_string());
    }
    // Flush the file writer before the process exits
    drop(log_guard);
    if result.is_err() {
        std::process::exit(1);
    }
    Ok(())
}

fn execute(command: Command, config: TallyConfig) -> anyhow::Result<()> {
    match command {
        Command::Init { out, force } => {
            if out.exists() && !force {
                anyhow::bail!("{} already exists, pass --force to overwrite", out.display());
            }
            config.to_file(&out)?;
            output::print_success(&format!("Wrote {}", out.display()));
        }
        Command::Run { script, json, snapshot } => {
            let script = Script::from_file(&script)?;
            info!("Running {} steps with quorum {}", script.steps.len(), config.ledger.quorum);

            let run = script.run(config.ledger.clone())?;
            if json {
                output::print_events_json(run.ledger.events())?;
            } else {
                for (i, (step, outcome)) in run.outcomes.iter().enumerate() {
                    output::print_outcome(i, step, outcome);
                }
                println!();
                println!("{}", output::proposal_table(run.ledger.state().proposals()));
                let rejected = run.outcomes.iter().filter(|(_, outcome)| outcome.is_rejected()).count();
                output::print_info(&format!(
                    "Treasury {} | paid out {} | {} events | {} of {} steps rejected",
                    run.ledger.treasury_balance(),
                    run.book.total_paid(),
                    run.ledger.events().len(),
                    rejected,
                    run.outcomes.len()
                ));
            }

            if let Some(path) = snapshot {
                run.ledger.state().snapshot().save_json(&path)?;
                output::print_success(&format!("Snapshot saved to {}", path.display()));
            }
        }
        Command::Replay { snapshot } => {
            let snapshot = LedgerSnapshot::load_json(&snapshot)?;
            let events = snapshot.events.len();
            let ledger = rebuild(snapshot)?;

            println!("{}", output::proposal_table(ledger.state().proposals()));
            output::print_success(&format!(
                "{} events replay to the saved state ({} proposals, treasury {})",
                events,
                ledger.proposal_count(),
                ledger.treasury_balance()
            ));
        }
    }
    Ok(())
}

/// Restore a snapshot after checking its tables against its own events.
///
/// The rebuilt ledger has no weights and an empty payout book; it is only
/// good for inspection.
fn rebuild(snapshot: LedgerSnapshot) -> anyhow::Result<GovernanceLedger<StaticWeights>> {
    let mismatches = snapshot.mismatches()?;
    if !mismatches.is_empty() {
        for m in &mismatches {
            output::print_error(m);
        }
        anyhow::bail!("{} mismatches between events and saved state", mismatches.len());
    }

    let state = LedgerState::restore(snapshot, Box::new(AccountBook::new()))?;
    Ok(GovernanceLedger::from_state(state, StaticWeights::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_governance::{Address, Amount, LedgerConfig, ProposalDraft};

    #[test]
    fn test_cli_args() {
        let cli = Cli::parse_from(["tally", "--log-level", "debug", "run", "demo.toml", "--json"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Command::Run { script, json, snapshot } => {
                assert_eq!(script, PathBuf::from("demo.toml"));
                assert!(json);
                assert!(snapshot.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    fn snapshot() -> LedgerSnapshot {
        let owner = Address::from_bytes([1u8; 20]);
        let mut state =
            LedgerState::new(LedgerConfig::new(Amount::from(10u64), owner), Box::new(AccountBook::new())).unwrap();
        state.deposit(owner, Amount::from(15u64)).unwrap();
        let draft = ProposalDraft::new("A", "B", Amount::from(5u64), Address::from_bytes([9u8; 20]));
        let id = state.propose(owner, Amount::from(1u64), draft.clone()).unwrap();
        state.vote(owner, Amount::from(20u64), id, true).unwrap();
        state.finalize(owner, Amount::from(20u64), id).unwrap();
        state.propose(owner, Amount::from(1u64), draft).unwrap();
        state.snapshot()
    }

    #[test]
    fn test_rebuild_consistent_snapshot() {
        let ledger = rebuild(snapshot()).unwrap();
        assert_eq!(ledger.proposal_count(), 2);
        assert_eq!(ledger.treasury_balance(), Amount::from(10u64));
        assert!(ledger.proposal(1).unwrap().finalized);
    }

    #[test]
    fn test_rebuild_detects_tampering() {
        let mut tampered = snapshot();
        tampered.treasury_balance = Amount::from(500u64);
        tampered.proposals[0].net_votes = 1_000;
        assert_eq!(tampered.mismatches().unwrap().len(), 2);
        assert!(rebuild(tampered).is_err());
    }

    #[test]
    fn test_rebuild_detects_dropped_proposal() {
        let mut dropped = snapshot();
        dropped.proposals.remove(1);
        assert_eq!(dropped.mismatches().unwrap().len(), 1);
        assert!(rebuild(dropped).is_err());
    }
}
