//! # Account Addresses
//!
//! Every participant in TinyBank, externally owned or contract, is named by
//! a 20-byte [`Address`]. Addresses are opaque: the ledgers never look inside
//! them, they only compare and hash them.
//!
//! Two derivations are provided so that hosts and tests can name accounts
//! without carrying key material around:
//!
//! - [`Address::derive`] maps a human label (`"alice"`) to a stable address.
//! - [`Address::contract`] maps `(deployer, nonce)` to the address a contract
//!   deployed by `deployer` at that nonce lives at.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of an address in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// Errors produced when parsing an address from its hex form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The string did not start with `0x`.
    #[error("address must start with 0x")]
    MissingPrefix,

    /// The hex payload was not exactly 40 characters.
    #[error("address must be {expected} hex characters, got {actual}")]
    InvalidLength {
        /// Required number of hex characters.
        expected: usize,
        /// Number of hex characters supplied.
        actual: usize,
    },

    /// The payload contained a non-hex character.
    #[error("invalid hex in address: {0}")]
    InvalidHex(String),
}

/// A 20-byte account identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The zero address. Counterparty of every mint.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Derives a stable address from a label: the last 20 bytes of
    /// `SHA-256("tinybank:account:" || label)`.
    pub fn derive(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"tinybank:account:");
        hasher.update(label.as_bytes());
        Self::from_digest(&hasher.finalize())
    }

    /// Derives the address of a contract deployed by `deployer` at `nonce`.
    pub fn contract(deployer: &Address, nonce: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"tinybank:contract:");
        hasher.update(deployer.0);
        hasher.update(nonce.to_be_bytes());
        Self::from_digest(&hasher.finalize())
    }

    /// Returns `true` for [`Address::ZERO`].
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    fn from_digest(digest: &[u8]) -> Self {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&digest[digest.len() - ADDRESS_LENGTH..]);
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = s.strip_prefix("0x").ok_or(AddressError::MissingPrefix)?;
        if payload.len() != ADDRESS_LENGTH * 2 {
            return Err(AddressError::InvalidLength {
                expected: ADDRESS_LENGTH * 2,
                actual: payload.len(),
            });
        }
        let mut bytes = [0u8; ADDRESS_LENGTH];
        hex::decode_to_slice(payload, &mut bytes)
            .map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
