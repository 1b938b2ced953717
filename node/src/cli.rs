//! # CLI Interface
//!
//! Defines the command-line argument structure for `tinybank-node` using
//! `clap` derive. Supports three subcommands: `run`, `demo`, and `version`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// TinyBank devnet runner.
///
/// Deploys an asset ledger and a staking vault on an in-process,
/// auto-mining devnet and drives them from a script or a built-in demo.
#[derive(Parser, Debug)]
#[command(
    name = "tinybank-node",
    about = "TinyBank devnet runner",
    version,
    propagate_version = true
)]
pub struct TinyBankCli {
    /// Log output format. Logs go to stderr.
    #[arg(long, value_enum, global = true, env = "TINYBANK_LOG_FORMAT", default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a JSON script of calls against a fresh devnet.
    Run(RunArgs),
    /// Stake, wait, and withdraw to show reward accrual.
    Demo(DemoArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the script file (JSON).
    #[arg(long, short = 's')]
    pub script: PathBuf,

    /// Path to the deployment configuration (JSON).
    ///
    /// When omitted, the reference deployment is used: MyToken (MT), 18
    /// decimals, 100 tokens minted, 1 token reward per block.
    #[arg(long, short = 'c', env = "TINYBANK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print Prometheus metrics to stdout after the script finishes.
    #[arg(long)]
    pub metrics: bool,
}

/// Arguments for the `demo` subcommand.
#[derive(Parser, Debug)]
pub struct DemoArgs {
    /// Number of idle blocks between stake and withdrawal.
    #[arg(long, default_value_t = 5)]
    pub blocks: u64,

    /// Amount to stake, in whole tokens.
    #[arg(long, default_value = "50")]
    pub amount: String,
}

/// `--log-format` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}
