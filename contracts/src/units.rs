//! # Decimal Units
//!
//! Conversion between human-readable decimal strings (`"15.5"`) and the
//! fixed-point base units the ledger stores. With 18 decimals, one whole
//! token is `10^18` base units.

use thiserror::Error;

use crate::Amount;

/// Errors produced while parsing a decimal amount.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitsError {
    /// The input was empty or consisted only of a decimal point.
    #[error("empty amount")]
    Empty,

    /// The input contained something other than digits and one `.`.
    #[error("invalid character in amount: {0:?}")]
    InvalidCharacter(char),

    /// More fractional digits than the token's precision.
    #[error("too many decimal places: {found} > {allowed}")]
    TooPrecise {
        /// Fractional digits supplied.
        found: usize,
        /// Fractional digits the token supports.
        allowed: u8,
    },

    /// The value does not fit in a `u128` once scaled.
    #[error("amount overflows u128")]
    Overflow,
}

/// Returns `10^decimals`, or `None` if it does not fit.
pub fn scale(decimals: u8) -> Option<Amount> {
    10u128.checked_pow(u32::from(decimals))
}

/// Parses a decimal string into base units.
///
/// ```
/// use tinybank_contracts::units::parse_units;
/// assert_eq!(parse_units("15.5", 2).unwrap(), 1550);
/// ```
pub fn parse_units(input: &str, decimals: u8) -> Result<Amount, UnitsError> {
    let input = input.trim();
    let (whole, fraction) = match input.split_once('.') {
        Some((w, f)) => (w, f),
        None => (input, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(UnitsError::Empty);
    }
    if let Some(c) = whole.chars().chain(fraction.chars()).find(|c| !c.is_ascii_digit()) {
        return Err(UnitsError::InvalidCharacter(c));
    }
    if fraction.len() > usize::from(decimals) {
        return Err(UnitsError::TooPrecise {
            found: fraction.len(),
            allowed: decimals,
        });
    }

    let unit = scale(decimals).ok_or(UnitsError::Overflow)?;
    let whole_units = digits_to_amount(whole)?
        .checked_mul(unit)
        .ok_or(UnitsError::Overflow)?;

    // Right-pad the fraction to `decimals` digits.
    let pad = u32::from(decimals) - fraction.len() as u32;
    let fraction_units = digits_to_amount(fraction)?
        .checked_mul(10u128.pow(pad))
        .ok_or(UnitsError::Overflow)?;

    whole_units
        .checked_add(fraction_units)
        .ok_or(UnitsError::Overflow)
}

/// Renders base units as the shortest exact decimal string.
pub fn format_units(amount: Amount, decimals: u8) -> String {
    let Some(unit) = scale(decimals) else {
        return amount.to_string();
    };
    let whole = amount / unit;
    let fraction = amount % unit;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0width$}", fraction, width = usize::from(decimals));
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

fn digits_to_amount(digits: &str) -> Result<Amount, UnitsError> {
    digits.bytes().try_fold(0u128, |acc, b| {
        acc.checked_mul(10)
            .and_then(|v| v.checked_add(Amount::from(b - b'0')))
            .ok_or(UnitsError::Overflow)
    })
}

/// Serde adapter that writes an [`Amount`] as a decimal string of base
/// units, so values above 2^53 survive JSON consumers intact.
///
/// Usage:
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Foo {
///     #[serde(with = "crate::units::amount_string")]
///     value: Amount,
/// }
/// ```
pub mod amount_string {
    use crate::Amount;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(amount)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const E18: Amount = 1_000_000_000_000_000_000;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(parse_units("100", 18).unwrap(), 100 * E18);
        assert_eq!(parse_units("15.5", 18).unwrap(), 15 * E18 + E18 / 2);
        assert_eq!(parse_units(".5", 1).unwrap(), 5);
        assert_eq!(parse_units("7.", 0).unwrap(), 7);
        assert_eq!(parse_units("0", 18).unwrap(), 0);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(parse_units("", 18), Err(UnitsError::Empty));
        assert_eq!(parse_units(".", 18), Err(UnitsError::Empty));
        assert_eq!(parse_units("1,5", 18), Err(UnitsError::InvalidCharacter(',')));
        assert_eq!(parse_units("-1", 18), Err(UnitsError::InvalidCharacter('-')));
        assert_eq!(
            parse_units("0.001", 2),
            Err(UnitsError::TooPrecise { found: 3, allowed: 2 })
        );
        assert_eq!(
            parse_units("340282366920938463463374607431768211456", 0),
            Err(UnitsError::Overflow)
        );
        assert_eq!(parse_units("1", 39), Err(UnitsError::Overflow));
    }

    #[test]
    fn formats_shortest_decimal() {
        assert_eq!(format_units(84 * E18 + E18 / 2, 18), "84.5");
        assert_eq!(format_units(0, 18), "0");
        assert_eq!(format_units(1, 18), "0.000000000000000001");
        assert_eq!(format_units(1550, 2), "15.5");
        assert_eq!(format_units(42, 0), "42");
    }

    #[test]
    fn amount_string_survives_values_beyond_u64() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "amount_string")]
            value: Amount,
        }
        let json = serde_json::to_string(&Wrapper { value: 100 * E18 }).unwrap();
        assert_eq!(json, r#"{"value":"100000000000000000000"}"#);
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value, 100 * E18);
    }
}
