//! # Contract Events
//!
//! Each state-changing operation reports what it did through an [`Event`]
//! pushed into an [`EventSink`]. Events are only emitted once an operation
//! has fully succeeded; a failed call emits nothing.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::units::amount_string;
use crate::Amount;

/// A structured log entry emitted by a contract.
///
/// Field order mirrors the argument order observers match on, e.g.
/// `Withdraw(amount, staker)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Event {
    /// Balance moved between accounts. `from` is zero for mints.
    Transfer {
        from: Address,
        to: Address,
        #[serde(with = "amount_string")]
        value: Amount,
    },
    /// An allowance was set.
    Approval {
        owner: Address,
        spender: Address,
        #[serde(with = "amount_string")]
        value: Amount,
    },
    /// The ledger's minting role changed hands.
    ManagerChanged { previous: Address, manager: Address },
    /// Principal was locked in the vault.
    Staked {
        staker: Address,
        #[serde(with = "amount_string")]
        amount: Amount,
    },
    /// Principal was released from the vault.
    Withdraw {
        #[serde(with = "amount_string")]
        amount: Amount,
        staker: Address,
    },
    /// The vault's reward rate was changed.
    RewardPerBlockChanged {
        #[serde(with = "amount_string")]
        previous: Amount,
        #[serde(with = "amount_string")]
        rate: Amount,
    },
    /// The vault's admin role changed hands.
    AdminChanged { previous: Address, admin: Address },
}

impl Event {
    /// The event's name as observers see it.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Transfer { .. } => "Transfer",
            Event::Approval { .. } => "Approval",
            Event::ManagerChanged { .. } => "ManagerChanged",
            Event::Staked { .. } => "Staked",
            Event::Withdraw { .. } => "Withdraw",
            Event::RewardPerBlockChanged { .. } => "RewardPerBlockChanged",
            Event::AdminChanged { .. } => "AdminChanged",
        }
    }
}

/// Receives events from contract operations.
pub trait EventSink {
    /// Records one event.
    fn emit(&mut self, event: Event);
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) {
        self.push(event);
    }
}
