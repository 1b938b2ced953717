//! # Asset Ledger Contract
//!
//! A single fungible token: balances, allowances, and a manager-gated mint.
//! The ledger is deployed with a fixed name, symbol and precision, and mints
//! its initial supply to the deployer.
//!
//! ## Security Model
//!
//! - **Mint gating**: only the current `manager` may mint. The manager starts
//!   as the deployer and is usually handed to the staking vault so it can
//!   pay rewards.
//! - **Manager reassignment**: the current manager or the deployer (`owner`)
//!   may reassign the role. The deployer keeps this power so a manager that
//!   is a contract cannot lock the role forever.
//! - **Supply tracking**: `total_supply` always equals the sum of balances.
//!   Every addition is checked; nothing wraps.
//! - **All-or-nothing**: each operation validates everything before writing
//!   anything. Callers that chain several ledger operations wrap them in a
//!   [`Checkpoint`] so a later failure undoes the earlier writes.

use std::collections::HashMap;

use tracing::debug;

use crate::address::Address;
use crate::error::{ContractError, Role};
use crate::events::{Event, EventSink};
use crate::units::scale;
use crate::Amount;

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

/// One undoable write.
#[derive(Debug, Clone)]
enum JournalEntry {
    Balance { account: Address, previous: Amount },
    Allowance {
        owner: Address,
        spender: Address,
        previous: Amount,
    },
    TotalSupply(Amount),
    Manager(Address),
}

/// Marks a position in the ledger's undo journal.
///
/// Obtained from [`AssetLedger::checkpoint`] and consumed by exactly one of
/// [`AssetLedger::commit`] or [`AssetLedger::rollback`]. Checkpoints nest.
#[must_use = "a checkpoint must be committed or rolled back"]
#[derive(Debug)]
pub struct Checkpoint {
    index: usize,
}

// ---------------------------------------------------------------------------
// AssetLedger
// ---------------------------------------------------------------------------

/// The fungible-asset ledger.
#[derive(Debug, Clone)]
pub struct AssetLedger {
    /// This contract's own address.
    address: Address,
    /// The deploying account.
    owner: Address,
    /// The account allowed to mint.
    manager: Address,
    name: String,
    symbol: String,
    decimals: u8,
    total_supply: Amount,
    /// Non-zero balances only.
    balances: HashMap<Address, Amount>,
    /// Non-zero allowances only, keyed by `(owner, spender)`.
    allowances: HashMap<(Address, Address), Amount>,
    journal: Vec<JournalEntry>,
    open_checkpoints: usize,
}

impl AssetLedger {
    /// Deploys a ledger at `address`, minting `initial_supply` whole tokens
    /// (scaled by `10^decimals`) to `deployer`.
    ///
    /// The deployer becomes both `owner` and the initial `manager`. The
    /// initial mint is reported to `events` as a transfer from the zero
    /// address.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::ArithmeticOverflow`] if the scaled supply
    /// does not fit in a `u128`.
    pub fn deploy(
        address: Address,
        deployer: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
        initial_supply: Amount,
        events: &mut dyn EventSink,
    ) -> Result<Self, ContractError> {
        let minted = scale(decimals)
            .and_then(|unit| initial_supply.checked_mul(unit))
            .ok_or(ContractError::ArithmeticOverflow)?;

        let mut ledger = Self {
            address,
            owner: deployer,
            manager: deployer,
            name: name.into(),
            symbol: symbol.into(),
            decimals,
            total_supply: 0,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            journal: Vec::new(),
            open_checkpoints: 0,
        };
        ledger.mint(&deployer, minted, &deployer, events)?;

        debug!(
            ledger = %address,
            deployer = %deployer,
            symbol = %ledger.symbol,
            supply = %minted,
            "asset ledger deployed"
        );
        Ok(ledger)
    }

    // -----------------------------------------------------------------------
    // Mutating operations
    // -----------------------------------------------------------------------

    /// Mints `amount` new units to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Unauthorized`] if `caller` is not the manager.
    /// Returns [`ContractError::ArithmeticOverflow`] if the supply or the
    /// recipient's balance would overflow.
    pub fn mint(
        &mut self,
        caller: &Address,
        amount: Amount,
        to: &Address,
        events: &mut dyn EventSink,
    ) -> Result<(), ContractError> {
        if *caller != self.manager {
            return Err(ContractError::Unauthorized(Role::Manager));
        }

        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(ContractError::ArithmeticOverflow)?;
        let new_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(ContractError::ArithmeticOverflow)?;

        self.write_total_supply(new_supply);
        self.write_balance(*to, new_balance);

        events.emit(Event::Transfer {
            from: Address::ZERO,
            to: *to,
            value: amount,
        });
        Ok(())
    }

    /// Moves `amount` from `caller` to `to`.
    ///
    /// A transfer to oneself succeeds and leaves balances untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::InsufficientBalance`] if `caller` holds less
    /// than `amount`. Returns [`ContractError::ArithmeticOverflow`] if the
    /// recipient's balance would overflow.
    pub fn transfer(
        &mut self,
        caller: &Address,
        amount: Amount,
        to: &Address,
        events: &mut dyn EventSink,
    ) -> Result<(), ContractError> {
        self.move_balance(caller, to, amount)?;
        events.emit(Event::Transfer {
            from: *caller,
            to: *to,
            value: amount,
        });
        Ok(())
    }

    /// Sets the amount `spender` may pull from `caller`'s balance.
    ///
    /// This overwrites any previous allowance. It does not look at the
    /// caller's balance, so an allowance may exceed it.
    pub fn approve(
        &mut self,
        caller: &Address,
        spender: &Address,
        amount: Amount,
        events: &mut dyn EventSink,
    ) -> Result<(), ContractError> {
        self.write_allowance(*caller, *spender, amount);
        events.emit(Event::Approval {
            owner: *caller,
            spender: *spender,
            value: amount,
        });
        Ok(())
    }

    /// Moves `amount` from `owner` to `to`, spending `caller`'s allowance.
    ///
    /// The allowance is reduced by exactly `amount`; there is no unlimited
    /// allowance.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::InsufficientAllowance`] if the allowance
    /// granted by `owner` to `caller` is below `amount`, then
    /// [`ContractError::InsufficientBalance`] if `owner` holds less than
    /// `amount`.
    pub fn transfer_from(
        &mut self,
        caller: &Address,
        owner: &Address,
        to: &Address,
        amount: Amount,
        events: &mut dyn EventSink,
    ) -> Result<(), ContractError> {
        let allowance = self.allowance(owner, caller);
        if allowance < amount {
            return Err(ContractError::InsufficientAllowance);
        }

        self.move_balance(owner, to, amount)?;
        self.write_allowance(*owner, *caller, allowance - amount);

        events.emit(Event::Transfer {
            from: *owner,
            to: *to,
            value: amount,
        });
        Ok(())
    }

    /// Hands the minting role to `new_manager`.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Unauthorized`] unless `caller` is the current
    /// manager or the deployer.
    pub fn set_manager(
        &mut self,
        caller: &Address,
        new_manager: &Address,
        events: &mut dyn EventSink,
    ) -> Result<(), ContractError> {
        if *caller != self.manager && *caller != self.owner {
            return Err(ContractError::Unauthorized(Role::Manager));
        }

        let previous = self.manager;
        if self.open_checkpoints > 0 {
            self.journal.push(JournalEntry::Manager(previous));
        }
        self.manager = *new_manager;

        debug!(ledger = %self.address, %previous, manager = %new_manager, "manager changed");
        events.emit(Event::ManagerChanged {
            previous,
            manager: *new_manager,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Checkpoints
    // -----------------------------------------------------------------------

    /// Opens an all-or-nothing scope. Every write made until the matching
    /// [`commit`](Self::commit) or [`rollback`](Self::rollback) is journaled.
    pub fn checkpoint(&mut self) -> Checkpoint {
        self.open_checkpoints += 1;
        Checkpoint {
            index: self.journal.len(),
        }
    }

    /// Keeps every write made since `checkpoint`.
    pub fn commit(&mut self, checkpoint: Checkpoint) {
        debug_assert!(checkpoint.index <= self.journal.len());
        self.close_checkpoint();
    }

    /// Undoes every write made since `checkpoint`, newest first.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.index {
            let Some(entry) = self.journal.pop() else {
                break;
            };
            match entry {
                JournalEntry::Balance { account, previous } => {
                    set_or_remove(&mut self.balances, account, previous);
                }
                JournalEntry::Allowance {
                    owner,
                    spender,
                    previous,
                } => {
                    set_or_remove(&mut self.allowances, (owner, spender), previous);
                }
                JournalEntry::TotalSupply(previous) => self.total_supply = previous,
                JournalEntry::Manager(previous) => self.manager = previous,
            }
        }
        self.close_checkpoint();
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Balance of `account`, zero if it never held anything.
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Amount `spender` may still pull from `owner`.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// The account currently allowed to mint.
    pub fn manager(&self) -> Address {
        self.manager
    }

    /// The deploying account.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// This ledger's own address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Iterates over every account holding a non-zero balance.
    pub fn holders(&self) -> impl Iterator<Item = (&Address, Amount)> + '_ {
        self.balances.iter().map(|(a, b)| (a, *b))
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Debits `from` and credits `to`, checking both sides before writing.
    fn move_balance(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), ContractError> {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(ContractError::InsufficientBalance);
        }
        if from == to {
            return Ok(());
        }

        let to_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(ContractError::ArithmeticOverflow)?;

        self.write_balance(*from, from_balance - amount);
        self.write_balance(*to, to_balance);
        Ok(())
    }

    fn write_balance(&mut self, account: Address, value: Amount) {
        if self.open_checkpoints > 0 {
            let previous = self.balance_of(&account);
            self.journal.push(JournalEntry::Balance { account, previous });
        }
        set_or_remove(&mut self.balances, account, value);
    }

    fn write_allowance(&mut self, owner: Address, spender: Address, value: Amount) {
        if self.open_checkpoints > 0 {
            let previous = self.allowance(&owner, &spender);
            self.journal.push(JournalEntry::Allowance {
                owner,
                spender,
                previous,
            });
        }
        set_or_remove(&mut self.allowances, (owner, spender), value);
    }

    fn write_total_supply(&mut self, value: Amount) {
        if self.open_checkpoints > 0 {
            self.journal.push(JournalEntry::TotalSupply(self.total_supply));
        }
        self.total_supply = value;
    }

    fn close_checkpoint(&mut self) {
        self.open_checkpoints = self.open_checkpoints.saturating_sub(1);
        if self.open_checkpoints == 0 {
            self.journal.clear();
        }
    }
}

/// Zero entries are dropped so the maps only hold live positions.
fn set_or_remove<K: std::hash::Hash + Eq>(map: &mut HashMap<K, Amount>, key: K, value: Amount) {
    if value == 0 {
        map.remove(&key);
    } else {
        map.insert(key, value);
    }
}
