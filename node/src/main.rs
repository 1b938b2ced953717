// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # TinyBank Devnet Runner
//!
//! Entry point for the `tinybank-node` binary. Parses CLI arguments,
//! initializes logging, deploys a ledger and vault on an in-process devnet,
//! and drives them.
//!
//! The binary supports three subcommands:
//!
//! - `run`     — replay a JSON script, printing one receipt per line
//! - `demo`    — stake, idle, withdraw, and show the reward
//! - `version` — print build version information

mod cli;
mod logging;
mod metrics;
mod script;

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;

use tinybank_contracts::config::DeploymentConfig;
use tinybank_contracts::units::{format_units, parse_units};
use tinybank_contracts::{Address, Call, Devnet, Receipt};

use cli::{Commands, TinyBankCli};
use metrics::NodeMetrics;
use script::{Script, StepOutcome, DEFAULT_ADMIN, DEFAULT_DEPLOYER};

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "tinybank_node=info,tinybank_contracts=info";

fn main() -> Result<()> {
    let cli = TinyBankCli::parse();
    logging::init_logging(DEFAULT_LOG_FILTER, cli.log_format.into());

    match cli.command {
        Commands::Run(args) => run_script(args, &mut std::io::stdout().lock()),
        Commands::Demo(args) => run_demo(args, &mut std::io::stdout().lock()),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Final state printed after a script run.
#[derive(Debug, Serialize)]
struct RunSummary {
    height: u64,
    total_supply: String,
    total_staked: String,
    transactions: usize,
}

/// One line of `run` output for a `mine` step.
#[derive(Debug, Serialize)]
struct MinedLine {
    mined: u64,
    height: u64,
}

/// Deploys a devnet, replays a script against it, and writes one JSON line
/// per step followed by a summary line.
fn run_script(args: cli::RunArgs, out: &mut impl Write) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let script = load_script(&args.script)?;
    let mut net = deploy(&config)?;
    let node_metrics = NodeMetrics::new().context("failed to register metrics")?;

    tracing::info!(
        script = %args.script.display(),
        steps = script.steps.len(),
        ledger = %net.ledger().address(),
        vault = %net.vault().address(),
        "replaying script"
    );

    let mut write_error: Option<anyhow::Error> = None;
    let result = script.run(&mut net, |outcome, net| {
        if write_error.is_some() {
            return;
        }
        let line = match outcome {
            StepOutcome::Mined { blocks, height } => {
                node_metrics.block_height.set(i64::try_from(*height).unwrap_or(i64::MAX));
                serde_json::to_string(&MinedLine {
                    mined: *blocks,
                    height: *height,
                })
            }
            StepOutcome::Executed(receipt) => {
                node_metrics.observe(receipt, net.height());
                serde_json::to_string(receipt.as_ref())
            }
        };
        let written = line
            .map_err(anyhow::Error::from)
            .and_then(|line| writeln!(out, "{}", line).map_err(anyhow::Error::from));
        if let Err(e) = written {
            write_error = Some(e);
        }
    });

    if let Some(e) = write_error {
        return Err(e).context("failed to write step output");
    }
    result.context("script failed")?;

    let summary = RunSummary {
        height: net.height(),
        total_supply: net.ledger().total_supply().to_string(),
        total_staked: net.vault().total_staked().to_string(),
        transactions: net.receipts().len(),
    };
    writeln!(out, "{}", serde_json::to_string(&summary)?)?;
    tracing::info!(height = summary.height, "script finished");

    if args.metrics {
        write!(out, "{}", node_metrics.encode().context("failed to encode metrics")?)?;
    }
    Ok(())
}

/// Stakes from the deployer, idles, withdraws, and writes the balances.
fn run_demo(args: cli::DemoArgs, out: &mut impl Write) -> Result<()> {
    let mut net = deploy(&DeploymentConfig::default())?;
    let deployer = Address::derive(DEFAULT_DEPLOYER);
    let vault = net.vault().address();
    let decimals = net.ledger().decimals();
    let symbol = net.ledger().symbol().to_string();
    let amount = parse_units(&args.amount, decimals)
        .with_context(|| format!("invalid amount {:?}", args.amount))?;

    let before = net.ledger().balance_of(&deployer);
    writeln!(out, "balance before : {} {}", format_units(before, decimals), symbol)?;

    submit(&mut net, deployer, Call::SetManager { manager: vault })?;
    submit(&mut net, deployer, Call::Approve { spender: vault, amount })?;
    let staked = submit(&mut net, deployer, Call::Stake { amount })?;
    writeln!(
        out,
        "staked         : {} {} at block {}",
        args.amount,
        symbol,
        staked.block.unwrap_or_default()
    )?;

    net.mine(args.blocks);
    let withdrawn = submit(&mut net, deployer, Call::Withdraw { amount })?;

    let after = net.ledger().balance_of(&deployer);
    writeln!(
        out,
        "withdrawn      : at block {}",
        withdrawn.block.unwrap_or_default()
    )?;
    writeln!(out, "balance after  : {} {}", format_units(after, decimals), symbol)?;
    writeln!(
        out,
        "reward         : {} {}",
        format_units(after.saturating_sub(before), decimals),
        symbol
    )?;
    Ok(())
}

/// Executes a call that must succeed.
fn submit(net: &mut Devnet, from: Address, call: Call) -> Result<Receipt> {
    let receipt = net.execute(from, call);
    if let Some(reason) = receipt.revert_reason() {
        bail!("{} reverted: {}", receipt.call.method(), reason);
    }
    Ok(receipt)
}

fn deploy(config: &DeploymentConfig) -> Result<Devnet> {
    Devnet::deploy(
        config,
        Address::derive(DEFAULT_DEPLOYER),
        Address::derive(DEFAULT_ADMIN),
    )
    .context("failed to deploy devnet")
}

/// Reads a deployment config, or the defaults when no path is given.
fn load_config(path: Option<&Path>) -> Result<DeploymentConfig> {
    let Some(path) = path else {
        return Ok(DeploymentConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    DeploymentConfig::from_json(&text)
        .with_context(|| format!("failed to parse config: {}", path.display()))
}

fn load_script(path: &Path) -> Result<Script> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script: {}", path.display()))?;
    Script::from_json(&text).with_context(|| format!("failed to parse script: {}", path.display()))
}

/// Prints version information to stdout.
fn print_version() {
    println!("tinybank-node      {}", env!("CARGO_PKG_VERSION"));
    println!("tinybank-contracts {}", env!("CARGO_PKG_VERSION"));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_config_path_uses_defaults() {
        assert_eq!(load_config(None).unwrap(), DeploymentConfig::default());
    }

    #[test]
    fn loads_partial_config_from_disk() {
        let file = write_temp(r#"{ "token": { "symbol": "TB", "decimals": 6 } }"#);
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.token.symbol, "TB");
        assert_eq!(config.token.decimals, 6);
        assert_eq!(config.token.name, "MyToken");

        let net = deploy(&config).unwrap();
        assert_eq!(net.ledger().total_supply(), 100_000_000);
    }

    #[test]
    fn unreadable_config_reports_path() {
        let err = load_config(Some(Path::new("/nonexistent/tinybank.json"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tinybank.json"));
    }

    #[test]
    fn loads_and_replays_script_from_disk() {
        let file = write_temp(
            r#"{ "steps": [
                { "call": "transfer", "amount": "15.5", "to": "alice" },
                { "mine": 3 },
                { "from": "alice", "call": "mint", "amount": "1", "to": "alice",
                  "expect_revert": "You are not authorized to manage this contract" }
            ] }"#,
        );
        let script = load_script(file.path()).unwrap();
        let mut net = deploy(&DeploymentConfig::default()).unwrap();
        script.run(&mut net, |_, _| {}).unwrap();

        let alice = Address::derive("alice");
        assert_eq!(net.ledger().balance_of(&alice), parse_units("15.5", 18).unwrap());
        assert_eq!(net.height(), 6);
    }

    #[test]
    fn malformed_script_is_rejected() {
        let file = write_temp(r#"{ "steps": [ { "call": "teleport" } ] }"#);
        assert!(load_script(file.path()).is_err());
    }

    #[test]
    fn submit_surfaces_revert_reason() {
        let mut net = deploy(&DeploymentConfig::default()).unwrap();
        let err = submit(&mut net, Address::derive("nobody"), Call::Withdraw { amount: 1 })
            .unwrap_err();
        assert_eq!(err.to_string(), "withdraw reverted: insufficient stake");
    }

    fn run_args(script: &Path, metrics: bool) -> cli::RunArgs {
        cli::RunArgs {
            script: script.to_path_buf(),
            config: None,
            metrics,
        }
    }

    #[test]
    fn run_prints_receipts_summary_and_metrics() {
        let file = write_temp(
            r#"{ "steps": [
                { "call": "set_manager", "manager": "@vault" },
                { "call": "approve", "spender": "@vault", "amount": "50" },
                { "call": "stake", "amount": "50" },
                { "mine": 5 },
                { "call": "withdraw", "amount": "50" },
                { "from": "signer7", "call": "set_reward_per_block", "rate": "1",
                  "expect_revert": "AdminAuthority: Restrict to manager only" }
            ] }"#,
        );
        let mut out = Vec::new();
        run_script(run_args(file.path(), true), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        let receipt: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(receipt["status"], "success");
        assert_eq!(receipt["call"]["call"], "set_manager");

        let mined: serde_json::Value = serde_json::from_str(lines[3]).unwrap();
        assert_eq!(mined["mined"], 5);
        assert_eq!(mined["height"], 10);

        let reverted: serde_json::Value = serde_json::from_str(lines[5]).unwrap();
        assert_eq!(reverted["status"], "reverted");

        // 100 tokens plus a 6-block reward, nothing left staked.
        let summary: serde_json::Value = serde_json::from_str(lines[6]).unwrap();
        assert_eq!(summary["height"], 11);
        assert_eq!(summary["total_supply"], parse_units("106", 18).unwrap().to_string());
        assert_eq!(summary["total_staked"], "0");
        assert_eq!(summary["transactions"], 5);

        assert!(text.contains("tinybank_transactions_total 5"));
        assert!(text.contains("tinybank_transactions_reverted_total 1"));
        assert!(text.contains("tinybank_block_height 11"));
    }

    #[test]
    fn run_without_metrics_ends_with_summary() {
        let file = write_temp(r#"{ "steps": [ { "mine": 2 } ] }"#);
        let mut out = Vec::new();
        run_script(run_args(file.path(), false), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(!text.contains("tinybank_"));
    }

    #[test]
    fn run_fails_on_broken_expectation_after_printing_it() {
        let file = write_temp(
            r#"{ "steps": [ { "from": "nobody", "call": "withdraw", "amount": "1" } ] }"#,
        );
        let mut out = Vec::new();
        let err = run_script(run_args(file.path(), false), &mut out).unwrap_err();
        assert!(format!("{:#}", err).contains("insufficient stake"));
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("\"reverted\""));
    }

    #[test]
    fn demo_reports_reward_for_idle_blocks() {
        let mut out = Vec::new();
        let args = cli::DemoArgs {
            blocks: 5,
            amount: "50".to_string(),
        };
        run_demo(args, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("balance before : 100 MT"));
        assert!(text.contains("staked         : 50 MT at block 5"));
        assert!(text.contains("withdrawn      : at block 11"));
        assert!(text.contains("balance after  : 106 MT"));
        assert!(text.contains("reward         : 6 MT"));
    }

    #[test]
    fn demo_rejects_malformed_amount() {
        let args = cli::DemoArgs {
            blocks: 1,
            amount: "lots".to_string(),
        };
        assert!(run_demo(args, &mut Vec::new()).is_err());
    }
}
