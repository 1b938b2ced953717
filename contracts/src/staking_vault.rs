//! # Staking Vault Contract
//!
//! Custodies units of an [`AssetLedger`] token and pays a per-block reward
//! to every staker for as long as they keep principal locked.
//!
//! The lifecycle per account is:
//!
//! 1. **Stake** — principal moves from the staker into the vault's custody
//!    account on the ledger (the staker must first approve the vault). The
//!    first stake opens an accrual window at the current height.
//! 2. **Top up** — further stakes add principal and keep the open window.
//! 3. **Withdraw** — the reward for the window is minted to the staker,
//!    principal is released, and the window is either closed (nothing left
//!    staked) or restarted at the current height.
//!
//! ## Reward Rule
//!
//! `reward = reward_per_block × (height − deposit_height)`, evaluated with
//! the rate in force at withdrawal time. The rate is not tracked per
//! interval: changing it mid-stake reprices the whole open window. The
//! reward does not depend on the size of the stake.
//!
//! The vault must hold the ledger's manager role to mint rewards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::address::Address;
use crate::asset_ledger::AssetLedger;
use crate::clock::HeightSource;
use crate::error::{ContractError, Role};
use crate::events::{Event, EventSink};
use crate::Amount;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Per-account staking position. Never deleted, only zeroed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRecord {
    /// Locked principal.
    pub amount: Amount,
    /// Height at which the current accrual window opened. `None` while
    /// nothing is staked.
    pub deposit_height: Option<u64>,
}

/// Whether an account currently has principal locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakeState {
    Unstaked,
    Staked,
}

impl std::fmt::Display for StakeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StakeState::Unstaked => write!(f, "Unstaked"),
            StakeState::Staked => write!(f, "Staked"),
        }
    }
}

/// The staking vault.
#[derive(Debug, Clone)]
pub struct StakingVault {
    /// This contract's address, which is also its custody account.
    address: Address,
    /// The ledger whose token this vault custodies.
    ledger: Address,
    /// Deployer; may reassign `admin`.
    owner: Address,
    /// Sole account allowed to change the reward rate.
    admin: Address,
    reward_per_block: Amount,
    total_staked: Amount,
    stakes: HashMap<Address, StakeRecord>,
}

impl StakingVault {
    /// Deploys a vault at `address` bound to the ledger at `ledger`.
    pub fn deploy(
        address: Address,
        ledger: Address,
        owner: Address,
        admin: Address,
        reward_per_block: Amount,
    ) -> Self {
        debug!(
            vault = %address,
            %ledger,
            %owner,
            %admin,
            reward_per_block = %reward_per_block,
            "staking vault deployed"
        );
        Self {
            address,
            ledger,
            owner,
            admin,
            reward_per_block,
            total_staked: 0,
            stakes: HashMap::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Mutating operations
    // -----------------------------------------------------------------------

    /// Locks `amount` of `caller`'s tokens in the vault.
    ///
    /// The tokens are pulled with `transfer_from`, so `caller` must have
    /// approved the vault for at least `amount`. The first stake opens an
    /// accrual window at the current height; a top-up leaves it as is.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::ZeroAmount`] for a zero stake,
    /// [`ContractError::InsufficientAllowance`] or
    /// [`ContractError::InsufficientBalance`] from the ledger pull, and
    /// [`ContractError::ArithmeticOverflow`] if the totals would overflow.
    pub fn stake(
        &mut self,
        ledger: &mut AssetLedger,
        clock: &dyn HeightSource,
        caller: &Address,
        amount: Amount,
        events: &mut dyn EventSink,
    ) -> Result<(), ContractError> {
        if amount == 0 {
            return Err(ContractError::ZeroAmount);
        }
        self.ensure_ledger(ledger)?;

        let height = clock.current_height();
        let record = self.record(caller);
        let staked = record
            .amount
            .checked_add(amount)
            .ok_or(ContractError::ArithmeticOverflow)?;
        let total = self
            .total_staked
            .checked_add(amount)
            .ok_or(ContractError::ArithmeticOverflow)?;

        let mut staged = Vec::new();
        ledger.transfer_from(&self.address, caller, &self.address, amount, &mut staged)?;

        let entry = self.stakes.entry(*caller).or_default();
        entry.amount = staked;
        entry.deposit_height.get_or_insert(height);
        self.total_staked = total;

        debug!(staker = %caller, amount = %amount, height, "stake locked");
        flush(events, staged);
        events.emit(Event::Staked {
            staker: *caller,
            amount,
        });
        Ok(())
    }

    /// Releases `amount` of `caller`'s principal and pays the reward
    /// accrued since the window opened. Returns the reward minted.
    ///
    /// The height is read once and used both to price the reward and to
    /// restart the window. The mint and the principal transfer run inside a
    /// ledger checkpoint: if either fails, neither happens.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::InsufficientStake`] if `caller` has less than
    /// `amount` staked, [`ContractError::Unauthorized`] if the vault is not
    /// the ledger's manager, and [`ContractError::ArithmeticOverflow`] if
    /// the reward or any resulting balance would overflow.
    pub fn withdraw(
        &mut self,
        ledger: &mut AssetLedger,
        clock: &dyn HeightSource,
        caller: &Address,
        amount: Amount,
        events: &mut dyn EventSink,
    ) -> Result<Amount, ContractError> {
        self.ensure_ledger(ledger)?;

        let record = self.record(caller);
        if record.amount < amount {
            return Err(ContractError::InsufficientStake);
        }

        let height = clock.current_height();
        let reward = self.reward_for(&record, height)?;
        let remaining = record.amount - amount;
        let total = self
            .total_staked
            .checked_sub(amount)
            .ok_or(ContractError::ArithmeticOverflow)?;

        let mut staged = Vec::new();
        let checkpoint = ledger.checkpoint();
        let settled = ledger
            .mint(&self.address, reward, caller, &mut staged)
            .and_then(|()| ledger.transfer(&self.address, amount, caller, &mut staged));
        if let Err(err) = settled {
            ledger.rollback(checkpoint);
            return Err(err);
        }
        ledger.commit(checkpoint);

        if let Some(entry) = self.stakes.get_mut(caller) {
            entry.amount = remaining;
            entry.deposit_height = (remaining > 0).then_some(height);
        }
        self.total_staked = total;

        debug!(
            staker = %caller,
            amount = %amount,
            reward = %reward,
            height,
            "stake withdrawn"
        );
        flush(events, staged);
        events.emit(Event::Withdraw {
            amount,
            staker: *caller,
        });
        Ok(reward)
    }

    /// Changes the reward paid per elapsed block.
    ///
    /// The new rate prices every window still open at its next withdrawal.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Unauthorized`] unless `caller` is the admin.
    pub fn set_reward_per_block(
        &mut self,
        caller: &Address,
        rate: Amount,
        events: &mut dyn EventSink,
    ) -> Result<(), ContractError> {
        if *caller != self.admin {
            return Err(ContractError::Unauthorized(Role::Admin));
        }
        let previous = std::mem::replace(&mut self.reward_per_block, rate);
        debug!(previous = %previous, rate = %rate, "reward rate changed");
        events.emit(Event::RewardPerBlockChanged { previous, rate });
        Ok(())
    }

    /// Hands the admin role to `new_admin`.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Unauthorized`] unless `caller` is the owner.
    pub fn set_admin(
        &mut self,
        caller: &Address,
        new_admin: &Address,
        events: &mut dyn EventSink,
    ) -> Result<(), ContractError> {
        if *caller != self.owner {
            return Err(ContractError::Unauthorized(Role::Owner));
        }
        let previous = std::mem::replace(&mut self.admin, *new_admin);
        debug!(%previous, admin = %new_admin, "admin changed");
        events.emit(Event::AdminChanged {
            previous,
            admin: *new_admin,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Principal currently locked by `account`.
    pub fn staked(&self, account: &Address) -> Amount {
        self.record(account).amount
    }

    pub fn total_staked(&self) -> Amount {
        self.total_staked
    }

    pub fn reward_per_block(&self) -> Amount {
        self.reward_per_block
    }

    /// Height at which `account`'s open window started, if any.
    pub fn deposit_height(&self, account: &Address) -> Option<u64> {
        self.record(account).deposit_height
    }

    pub fn state(&self, account: &Address) -> StakeState {
        if self.staked(account) > 0 {
            StakeState::Staked
        } else {
            StakeState::Unstaked
        }
    }

    /// The reward `account` would receive if it withdrew at `height` under
    /// the current rate.
    pub fn pending_reward(&self, account: &Address, height: u64) -> Result<Amount, ContractError> {
        self.reward_for(&self.record(account), height)
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// This vault's address and custody account.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Address of the ledger this vault is bound to.
    pub fn ledger(&self) -> Address {
        self.ledger
    }

    /// Iterates over every account that has ever staked, including zeroed
    /// positions.
    pub fn positions(&self) -> impl Iterator<Item = (&Address, &StakeRecord)> + '_ {
        self.stakes.iter()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn record(&self, account: &Address) -> StakeRecord {
        self.stakes.get(account).copied().unwrap_or_default()
    }

    /// A height below the deposit height counts as no time elapsed.
    fn reward_for(&self, record: &StakeRecord, height: u64) -> Result<Amount, ContractError> {
        let Some(start) = record.deposit_height else {
            return Ok(0);
        };
        let elapsed = height.saturating_sub(start);
        self.reward_per_block
            .checked_mul(Amount::from(elapsed))
            .ok_or(ContractError::ArithmeticOverflow)
    }

    fn ensure_ledger(&self, ledger: &AssetLedger) -> Result<(), ContractError> {
        if ledger.address() != self.ledger {
            return Err(ContractError::LedgerMismatch {
                expected: self.ledger,
                actual: ledger.address(),
            });
        }
        Ok(())
    }
}

fn flush(events: &mut dyn EventSink, staged: Vec<Event>) {
    for event in staged {
        events.emit(event);
    }
}
