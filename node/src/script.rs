//! # Devnet Scripts
//!
//! A script is a JSON document listing calls to replay against a fresh
//! devnet, one transaction per step:
//!
//! ```json
//! {
//!   "steps": [
//!     { "from": "deployer", "call": "set_manager", "manager": "@vault" },
//!     { "from": "deployer", "call": "approve", "spender": "@vault", "amount": "50" },
//!     { "from": "deployer", "call": "stake", "amount": "50" },
//!     { "mine": 5 },
//!     { "from": "deployer", "call": "withdraw", "amount": "50" },
//!     { "from": "hacker", "call": "set_reward_per_block", "rate": "1",
//!       "expect_revert": "AdminAuthority: Restrict to manager only" }
//!   ]
//! }
//! ```
//!
//! Accounts are written as `@ledger`, `@vault`, a `0x` address, or a label
//! that is hashed into an address. Amounts are decimal strings in whole
//! tokens.

use serde::Deserialize;
use thiserror::Error;
use tinybank_contracts::units::parse_units;
use tinybank_contracts::{Address, Call, Devnet, Receipt};

/// Label of the account that deploys both contracts.
pub const DEFAULT_DEPLOYER: &str = "deployer";

/// Label of the vault's admin.
pub const DEFAULT_ADMIN: &str = "admin";

/// Failures while loading or replaying a script.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("invalid script: {0}")]
    Parse(#[source] serde_json::Error),

    /// A step referenced a malformed account or amount.
    #[error("step {index}: {reason}")]
    Step { index: usize, reason: String },

    /// A step's outcome contradicted its `expect_revert`.
    #[error("step {index}: expected revert {expected:?}, got {actual:?}")]
    Expectation {
        index: usize,
        expected: Option<String>,
        actual: Option<String>,
    },
}

/// A parsed script.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

/// One script entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Step {
    /// Advance the height without a transaction.
    Mine { mine: u64 },
    /// Send a transaction.
    Call(CallStep),
}

/// A transaction step.
#[derive(Debug, Clone, Deserialize)]
pub struct CallStep {
    /// Sender label or address.
    #[serde(default = "default_sender")]
    pub from: String,
    #[serde(flatten)]
    pub action: Action,
    /// When set, the step must revert with exactly this message.
    #[serde(default)]
    pub expect_revert: Option<String>,
}

/// A call with human-readable arguments.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum Action {
    Mint { amount: String, to: String },
    Transfer { amount: String, to: String },
    Approve { spender: String, amount: String },
    TransferFrom {
        owner: String,
        to: String,
        amount: String,
    },
    SetManager { manager: String },
    Stake { amount: String },
    Withdraw { amount: String },
    SetRewardPerBlock { rate: String },
    SetAdmin { admin: String },
}

fn default_sender() -> String {
    DEFAULT_DEPLOYER.to_string()
}

/// What happened to one step.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    Mined { blocks: u64, height: u64 },
    Executed(Box<Receipt>),
}

impl Script {
    /// Parses a script from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ScriptError> {
        serde_json::from_str(text).map_err(ScriptError::Parse)
    }

    /// Replays every step against `net`, handing each outcome to `observe`
    /// as it happens.
    ///
    /// Stops at the first step whose outcome contradicts its
    /// `expect_revert` (an unexpected revert, a missing revert, or a
    /// different revert message). That step is still observed.
    pub fn run(
        &self,
        net: &mut Devnet,
        mut observe: impl FnMut(&StepOutcome, &Devnet),
    ) -> Result<(), ScriptError> {
        for (index, step) in self.steps.iter().enumerate() {
            match step {
                Step::Mine { mine } => {
                    net.mine(*mine);
                    let outcome = StepOutcome::Mined {
                        blocks: *mine,
                        height: net.height(),
                    };
                    observe(&outcome, net);
                }
                Step::Call(call_step) => {
                    let from = resolve_account(&call_step.from, net)
                        .map_err(|reason| ScriptError::Step { index, reason })?;
                    let call = call_step
                        .action
                        .to_call(net)
                        .map_err(|reason| ScriptError::Step { index, reason })?;
                    let outcome = StepOutcome::Executed(Box::new(net.execute(from, call)));
                    observe(&outcome, net);
                    if let StepOutcome::Executed(receipt) = &outcome {
                        check_expectation(index, call_step, receipt)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl Action {
    /// Resolves accounts and amounts against the devnet's ledger.
    pub fn to_call(&self, net: &Devnet) -> Result<Call, String> {
        let decimals = net.ledger().decimals();
        let amount = |text: &str| {
            parse_units(text, decimals).map_err(|e| format!("amount {:?}: {}", text, e))
        };
        let account = |text: &str| resolve_account(text, net);

        Ok(match self {
            Action::Mint { amount: a, to } => Call::Mint {
                amount: amount(a)?,
                to: account(to)?,
            },
            Action::Transfer { amount: a, to } => Call::Transfer {
                amount: amount(a)?,
                to: account(to)?,
            },
            Action::Approve { spender, amount: a } => Call::Approve {
                spender: account(spender)?,
                amount: amount(a)?,
            },
            Action::TransferFrom {
                owner,
                to,
                amount: a,
            } => Call::TransferFrom {
                owner: account(owner)?,
                to: account(to)?,
                amount: amount(a)?,
            },
            Action::SetManager { manager } => Call::SetManager {
                manager: account(manager)?,
            },
            Action::Stake { amount: a } => Call::Stake { amount: amount(a)? },
            Action::Withdraw { amount: a } => Call::Withdraw { amount: amount(a)? },
            Action::SetRewardPerBlock { rate } => Call::SetRewardPerBlock {
                rate: amount(rate)?,
            },
            Action::SetAdmin { admin } => Call::SetAdmin {
                admin: account(admin)?,
            },
        })
    }
}

/// Maps a script account reference to an address.
pub fn resolve_account(reference: &str, net: &Devnet) -> Result<Address, String> {
    match reference {
        "@ledger" => Ok(net.ledger().address()),
        "@vault" => Ok(net.vault().address()),
        r if r.starts_with("0x") => r
            .parse()
            .map_err(|e| format!("account {:?}: {}", r, e)),
        r if r.is_empty() => Err("empty account label".to_string()),
        label => Ok(Address::derive(label)),
    }
}

fn check_expectation(index: usize, step: &CallStep, receipt: &Receipt) -> Result<(), ScriptError> {
    match (&step.expect_revert, receipt.revert_reason()) {
        (None, None) => Ok(()),
        (Some(expected), Some(actual)) if expected == actual => Ok(()),
        (expected, actual) => Err(ScriptError::Expectation {
            index,
            expected: expected.clone(),
            actual: actual.map(str::to_string),
        }),
    }
}
