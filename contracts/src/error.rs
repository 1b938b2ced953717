//! # Contract Errors
//!
//! One error type shared by both ledgers, because the vault surfaces ledger
//! failures to its callers unchanged. The rendered messages are part of the
//! public contract: hosts report them verbatim as revert reasons, so they
//! must never be reworded.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;

/// The privileged role a rejected caller was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Ledger role allowed to mint and to reassign itself.
    Manager,
    /// Vault role allowed to change the reward rate.
    Admin,
    /// Vault deployer, allowed to reassign the admin.
    Owner,
}

impl Role {
    /// The stable revert message for a caller lacking this role.
    pub fn denial_message(&self) -> &'static str {
        match self {
            Role::Manager => "You are not authorized to manage this contract",
            Role::Admin => "AdminAuthority: Restrict to manager only",
            Role::Owner => "AdminAuthority: Restrict to owner only",
        }
    }
}

/// Errors raised by [`AssetLedger`](crate::asset_ledger::AssetLedger) and
/// [`StakingVault`](crate::staking_vault::StakingVault) operations.
///
/// Every variant aborts the whole operation: no balance, allowance, stake
/// or event survives a failed call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// The caller does not hold the role the operation requires.
    #[error("{}", .0.denial_message())]
    Unauthorized(Role),

    /// The debited account holds less than the requested amount.
    #[error("insufficient balance")]
    InsufficientBalance,

    /// The spender's allowance is below the requested amount.
    #[error("insufficient allowance")]
    InsufficientAllowance,

    /// The caller tried to withdraw more than they have staked.
    #[error("insufficient stake")]
    InsufficientStake,

    /// An addition or multiplication would leave the `u128` range.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    /// Staking zero units is rejected.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// The vault was handed a ledger other than the one it is bound to.
    #[error("vault is bound to ledger {expected}, got {actual}")]
    LedgerMismatch {
        /// Ledger address fixed at vault construction.
        expected: Address,
        /// Address of the ledger actually supplied.
        actual: Address,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revert_messages_are_stable() {
        assert_eq!(
            ContractError::Unauthorized(Role::Manager).to_string(),
            "You are not authorized to manage this contract"
        );
        assert_eq!(
            ContractError::Unauthorized(Role::Admin).to_string(),
            "AdminAuthority: Restrict to manager only"
        );
        assert_eq!(
            ContractError::InsufficientBalance.to_string(),
            "insufficient balance"
        );
        assert_eq!(
            ContractError::InsufficientAllowance.to_string(),
            "insufficient allowance"
        );
        assert_eq!(ContractError::InsufficientStake.to_string(), "insufficient stake");
        assert_eq!(ContractError::ArithmeticOverflow.to_string(), "arithmetic overflow");
    }
}
