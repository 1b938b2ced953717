//! # Devnet Host
//!
//! A single-process, auto-mining host for one [`AssetLedger`] and one
//! [`StakingVault`]. It plays the role a real chain plays for the contracts:
//! it owns the height counter, routes each call from its sender to the right
//! contract, and records a [`Receipt`] per transaction.
//!
//! ## Block Model
//!
//! - Every successful transaction is mined in its own block: a call sent at
//!   height `h` executes with the clock reading `h + 1`, and the height
//!   advances to `h + 1` once it succeeds.
//! - A reverted call is not mined. The height stays put and the receipt
//!   records the revert reason.
//! - [`Devnet::mine`] advances the height without a transaction.
//!
//! Deploying consumes the first two blocks: the ledger lands at height 1 and
//! the vault at height 2.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::address::Address;
use crate::asset_ledger::AssetLedger;
use crate::clock::FixedHeight;
use crate::config::{ConfigError, DeploymentConfig};
use crate::error::ContractError;
use crate::events::Event;
use crate::staking_vault::StakingVault;
use crate::units::amount_string;
use crate::Amount;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while standing up a devnet.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The deployment configuration is invalid.
    #[error("invalid deployment config: {0}")]
    Config(#[from] ConfigError),

    /// A contract constructor rejected its arguments.
    #[error("contract deployment failed: {0}")]
    Contract(#[from] ContractError),
}

// ---------------------------------------------------------------------------
// Calls & receipts
// ---------------------------------------------------------------------------

/// A transaction payload. The sender is supplied separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum Call {
    Mint {
        #[serde(with = "amount_string")]
        amount: Amount,
        to: Address,
    },
    Transfer {
        #[serde(with = "amount_string")]
        amount: Amount,
        to: Address,
    },
    Approve {
        spender: Address,
        #[serde(with = "amount_string")]
        amount: Amount,
    },
    TransferFrom {
        owner: Address,
        to: Address,
        #[serde(with = "amount_string")]
        amount: Amount,
    },
    SetManager {
        manager: Address,
    },
    Stake {
        #[serde(with = "amount_string")]
        amount: Amount,
    },
    Withdraw {
        #[serde(with = "amount_string")]
        amount: Amount,
    },
    SetRewardPerBlock {
        #[serde(with = "amount_string")]
        rate: Amount,
    },
    SetAdmin {
        admin: Address,
    },
}

impl Call {
    /// The call's method name, as it appears in scripts.
    pub fn method(&self) -> &'static str {
        match self {
            Call::Mint { .. } => "mint",
            Call::Transfer { .. } => "transfer",
            Call::Approve { .. } => "approve",
            Call::TransferFrom { .. } => "transfer_from",
            Call::SetManager { .. } => "set_manager",
            Call::Stake { .. } => "stake",
            Call::Withdraw { .. } => "withdraw",
            Call::SetRewardPerBlock { .. } => "set_reward_per_block",
            Call::SetAdmin { .. } => "set_admin",
        }
    }
}

/// Outcome of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TxStatus {
    Success,
    /// The call failed; `reason` is the contract's revert message.
    Reverted { reason: String },
}

/// Record of one executed transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    /// Unique transaction identifier.
    pub tx_id: Uuid,
    /// Block the transaction was mined in, or `None` if it reverted.
    pub block: Option<u64>,
    pub from: Address,
    pub call: Call,
    #[serde(flatten)]
    pub status: TxStatus,
    /// Events emitted, in emission order. Empty for reverts.
    pub events: Vec<Event>,
    pub timestamp: DateTime<Utc>,
}

impl Receipt {
    /// Returns `true` if the call succeeded.
    pub fn is_success(&self) -> bool {
        self.status == TxStatus::Success
    }

    /// The revert message, if the call failed.
    pub fn revert_reason(&self) -> Option<&str> {
        match &self.status {
            TxStatus::Success => None,
            TxStatus::Reverted { reason } => Some(reason),
        }
    }
}

// ---------------------------------------------------------------------------
// Devnet
// ---------------------------------------------------------------------------

/// Revert reason for calls sent once the height can no longer advance.
pub const HEIGHT_EXHAUSTED: &str = "block height exhausted";

/// In-process host for a ledger and its vault.
#[derive(Debug, Clone)]
pub struct Devnet {
    height: u64,
    ledger: AssetLedger,
    vault: StakingVault,
    receipts: Vec<Receipt>,
    /// Events emitted by the constructors.
    genesis_events: Vec<Event>,
}

impl Devnet {
    /// Deploys the ledger (height 1) and the vault (height 2).
    ///
    /// `deployer` receives the initial supply and owns both contracts;
    /// `vault_admin` may change the reward rate. The vault is not made the
    /// ledger's manager: that is an explicit `set_manager` call, as on a
    /// real chain.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError`] if the configuration is invalid or a
    /// constructor fails.
    pub fn deploy(
        config: &DeploymentConfig,
        deployer: Address,
        vault_admin: Address,
    ) -> Result<Self, DeployError> {
        config.validate()?;
        let reward_per_block = config.reward_per_block()?;

        let mut genesis_events = Vec::new();
        let ledger = AssetLedger::deploy(
            Address::contract(&deployer, 0),
            deployer,
            config.token.name.clone(),
            config.token.symbol.clone(),
            config.token.decimals,
            config.token.initial_supply,
            &mut genesis_events,
        )?;
        let vault = StakingVault::deploy(
            Address::contract(&deployer, 1),
            ledger.address(),
            deployer,
            vault_admin,
            reward_per_block,
        );

        debug!(ledger = %ledger.address(), vault = %vault.address(), "devnet deployed");
        Ok(Self {
            height: 2,
            ledger,
            vault,
            receipts: Vec::new(),
            genesis_events,
        })
    }

    /// Executes `call` on behalf of `from` and returns its receipt.
    ///
    /// The receipt is also appended to [`receipts`](Self::receipts). Once
    /// the height has reached `u64::MAX` no further block can be mined and
    /// every call reverts with [`HEIGHT_EXHAUSTED`].
    pub fn execute(&mut self, from: Address, call: Call) -> Receipt {
        let (status, mined, events) = match self.height.checked_add(1) {
            Some(block) => self.dispatch(block, &from, &call),
            None => {
                warn!(%from, method = call.method(), height = self.height, "block height exhausted");
                (
                    TxStatus::Reverted {
                        reason: HEIGHT_EXHAUSTED.to_string(),
                    },
                    None,
                    Vec::new(),
                )
            }
        };

        let receipt = Receipt {
            tx_id: Uuid::new_v4(),
            block: mined,
            from,
            call,
            status,
            events,
            timestamp: Utc::now(),
        };
        self.receipts.push(receipt.clone());
        receipt
    }

    /// Runs `call` in `block`, advancing the height only if it succeeds.
    fn dispatch(
        &mut self,
        block: u64,
        from: &Address,
        call: &Call,
    ) -> (TxStatus, Option<u64>, Vec<Event>) {
        let clock = FixedHeight(block);
        let mut events = Vec::new();

        let result = match call {
            Call::Mint { amount, to } => self.ledger.mint(from, *amount, to, &mut events),
            Call::Transfer { amount, to } => self.ledger.transfer(from, *amount, to, &mut events),
            Call::Approve { spender, amount } => {
                self.ledger.approve(from, spender, *amount, &mut events)
            }
            Call::TransferFrom { owner, to, amount } => {
                self.ledger
                    .transfer_from(from, owner, to, *amount, &mut events)
            }
            Call::SetManager { manager } => self.ledger.set_manager(from, manager, &mut events),
            Call::Stake { amount } => {
                self.vault
                    .stake(&mut self.ledger, &clock, from, *amount, &mut events)
            }
            Call::Withdraw { amount } => self
                .vault
                .withdraw(&mut self.ledger, &clock, from, *amount, &mut events)
                .map(|_| ()),
            Call::SetRewardPerBlock { rate } => {
                self.vault.set_reward_per_block(from, *rate, &mut events)
            }
            Call::SetAdmin { admin } => self.vault.set_admin(from, admin, &mut events),
        };

        match result {
            Ok(()) => {
                self.height = block;
                debug!(
                    block,
                    %from,
                    method = call.method(),
                    events = events.len(),
                    "transaction mined"
                );
                (TxStatus::Success, Some(block), events)
            }
            Err(err) => {
                warn!(%from, method = call.method(), reason = %err, "transaction reverted");
                (
                    TxStatus::Reverted {
                        reason: err.to_string(),
                    },
                    None,
                    Vec::new(),
                )
            }
        }
    }

    /// Advances the height by `blocks` without executing anything.
    pub fn mine(&mut self, blocks: u64) {
        self.height = self.height.saturating_add(blocks);
        debug!(height = self.height, blocks, "mined empty blocks");
    }

    /// Height of the latest mined block.
    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn ledger(&self) -> &AssetLedger {
        &self.ledger
    }

    pub fn vault(&self) -> &StakingVault {
        &self.vault
    }

    /// Every receipt, in execution order.
    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    /// Events emitted while deploying (the initial mint).
    pub fn genesis_events(&self) -> &[Event] {
        &self.genesis_events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devnet() -> (Devnet, Address) {
        let deployer = Address::derive("deployer");
        let net = Devnet::deploy(
            &DeploymentConfig::default(),
            deployer,
            Address::derive("admin"),
        )
        .unwrap();
        (net, deployer)
    }

    #[test]
    fn deploy_consumes_two_blocks() {
        let (net, deployer) = devnet();
        assert_eq!(net.height(), 2);
        assert_eq!(net.ledger().address(), Address::contract(&deployer, 0));
        assert_eq!(net.vault().address(), Address::contract(&deployer, 1));
        assert_eq!(net.vault().ledger(), net.ledger().address());
        assert_eq!(net.genesis_events().len(), 1);
    }

    #[test]
    fn successful_call_mines_a_block() {
        let (mut net, deployer) = devnet();
        let receipt = net.execute(
            deployer,
            Call::Transfer {
                amount: 1,
                to: Address::derive("bob"),
            },
        );
        assert!(receipt.is_success());
        assert_eq!(receipt.block, Some(3));
        assert_eq!(net.height(), 3);
        assert_eq!(receipt.events.len(), 1);
    }

    #[test]
    fn reverted_call_is_not_mined() {
        let (mut net, _) = devnet();
        let mallory = Address::derive("mallory");
        let receipt = net.execute(mallory, Call::Mint { amount: 1, to: mallory });
        assert!(!receipt.is_success());
        assert_eq!(
            receipt.revert_reason(),
            Some("You are not authorized to manage this contract")
        );
        assert_eq!(receipt.block, None);
        assert!(receipt.events.is_empty());
        assert_eq!(net.height(), 2);
        assert_eq!(net.receipts().len(), 1);
    }

    #[test]
    fn mine_advances_height() {
        let (mut net, _) = devnet();
        net.mine(5);
        assert_eq!(net.height(), 7);
    }

    #[test]
    fn call_after_last_height_reverts_instead_of_panicking() {
        let (mut net, deployer) = devnet();
        net.mine(u64::MAX);
        assert_eq!(net.height(), u64::MAX);

        let receipt = net.execute(
            deployer,
            Call::Transfer {
                amount: 1,
                to: Address::derive("bob"),
            },
        );
        assert_eq!(receipt.revert_reason(), Some(HEIGHT_EXHAUSTED));
        assert_eq!(receipt.block, None);
        assert!(receipt.events.is_empty());
        assert_eq!(net.height(), u64::MAX);
        assert_eq!(net.ledger().balance_of(&Address::derive("bob")), 0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = DeploymentConfig::default();
        config.token.name.clear();
        let result = Devnet::deploy(&config, Address::derive("d"), Address::derive("a"));
        assert!(matches!(result, Err(DeployError::Config(ConfigError::EmptyName))));
    }

    #[test]
    fn call_json_uses_snake_case_tag() {
        let call: Call = serde_json::from_str(&format!(
            r#"{{"call": "transfer_from", "owner": "{}", "to": "{}", "amount": "5"}}"#,
            Address::derive("o"),
            Address::derive("t")
        ))
        .unwrap();
        assert_eq!(call.method(), "transfer_from");
    }

    #[test]
    fn receipt_serializes_status_inline() {
        let (mut net, deployer) = devnet();
        let receipt = net.execute(deployer, Call::Withdraw { amount: 1 });
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["status"], "reverted");
        assert_eq!(json["reason"], "insufficient stake");
        assert_eq!(json["call"]["call"], "withdraw");
    }
}
