// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # TinyBank Contracts
//!
//! Two cooperating ledgers and the host that runs them:
//!
//! - **Asset Ledger** — a fungible token with balances, allowances and a
//!   manager-gated mint.
//! - **Staking Vault** — custodies ledger tokens and mints a per-block reward
//!   to stakers when they withdraw.
//! - **Devnet** — an auto-mining, single-process host that assigns heights,
//!   dispatches calls and records receipts.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow. `checked_add`,
//!    `checked_sub` and `checked_mul` everywhere; nothing wraps.
//! 2. Every operation is all-or-nothing. A failed call changes no balance,
//!    no stake, and emits no event.
//! 3. Roles are plain fields checked at the top of each privileged
//!    operation, and each role changes only through its one setter.
//! 4. Time is injected. The vault reads heights from a [`HeightSource`] and
//!    never advances them.
//!
//! [`HeightSource`]: clock::HeightSource

pub mod address;
pub mod asset_ledger;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod runtime;
pub mod staking_vault;
pub mod units;

/// Token quantity in base units (`10^decimals` base units per whole token).
pub type Amount = u128;

pub use address::Address;
pub use asset_ledger::AssetLedger;
pub use error::{ContractError, Role};
pub use events::{Event, EventSink};
pub use runtime::{Call, Devnet, Receipt};
pub use staking_vault::StakingVault;
