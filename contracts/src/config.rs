//! # Deployment Configuration & Defaults
//!
//! The defaults reproduce the reference deployment: a token called
//! `MyToken` (`MT`) with 18 decimals, 100 whole tokens minted to the
//! deployer, and a vault paying one whole token per block.
//!
//! Hosts load a [`DeploymentConfig`] from JSON. Every field is optional and
//! falls back to the constants below.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::units::{parse_units, UnitsError};
use crate::Amount;

// ---------------------------------------------------------------------------
// Token defaults
// ---------------------------------------------------------------------------

/// Default token name.
pub const DEFAULT_NAME: &str = "MyToken";

/// Default ticker symbol.
pub const DEFAULT_SYMBOL: &str = "MT";

/// Default fixed-point precision.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Default initial supply, in whole tokens.
pub const DEFAULT_INITIAL_SUPPLY: u128 = 100;

/// Largest precision whose scale factor `10^decimals` fits in a `u128`.
pub const MAX_DECIMALS: u8 = 38;

// ---------------------------------------------------------------------------
// Vault defaults
// ---------------------------------------------------------------------------

/// Default reward per block, in whole tokens.
pub const DEFAULT_REWARD_PER_BLOCK: &str = "1";

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Problems found while validating a [`DeploymentConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("token name must not be empty")]
    EmptyName,

    #[error("token symbol must not be empty")]
    EmptySymbol,

    #[error("decimals must be at most 38, got {0}")]
    DecimalsOutOfRange(u8),

    #[error("invalid reward_per_block: {0}")]
    RewardRate(#[from] UnitsError),
}

/// Parameters for the asset ledger's construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Whole tokens minted to the deployer; scaled by `10^decimals`.
    pub initial_supply: u128,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            symbol: DEFAULT_SYMBOL.to_string(),
            decimals: DEFAULT_DECIMALS,
            initial_supply: DEFAULT_INITIAL_SUPPLY,
        }
    }
}

/// Parameters for the staking vault's construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Reward per elapsed block as a decimal string in whole tokens.
    pub reward_per_block: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            reward_per_block: DEFAULT_REWARD_PER_BLOCK.to_string(),
        }
    }
}

/// Full deployment description for a ledger plus its vault.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    pub token: TokenConfig,
    pub vault: VaultConfig,
}

impl DeploymentConfig {
    /// Parses a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Checks the configuration for values no deployment could accept.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.token.symbol.trim().is_empty() {
            return Err(ConfigError::EmptySymbol);
        }
        if self.token.decimals > MAX_DECIMALS {
            return Err(ConfigError::DecimalsOutOfRange(self.token.decimals));
        }
        self.reward_per_block()?;
        Ok(())
    }

    /// The vault reward rate in base units.
    pub fn reward_per_block(&self) -> Result<Amount, ConfigError> {
        Ok(parse_units(&self.vault.reward_per_block, self.token.decimals)?)
    }
}
