//! Fixed-point token amounts.
//!
//! Amounts are `u128` base units. CCT uses 18 decimals, so `1 CCT` is
//! `10^18` base units.

use crate::model::ValidationError;

/// Base-unit amount of a fungible token.
pub type Amount = u128;

/// Decimals used by the CarbonCredit token.
pub const TOKEN_DECIMALS: u32 = 18;

/// Converts a whole-token count into base units.
pub fn tokens(whole: u64) -> Amount {
    Amount::from(whole) * 10u128.pow(TOKEN_DECIMALS)
}

/// Parses a decimal string such as `"0.15"` into base units.
pub fn parse_units(value: &str, decimals: u32) -> Result<Amount, ValidationError> {
    let trimmed = value.trim();
    let invalid = || ValidationError::InvalidAmount(trimmed.to_string());
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    if fraction.len() > decimals as usize {
        return Err(invalid());
    }

    let scale = 10u128.checked_pow(decimals).ok_or_else(invalid)?;
    let whole_units = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().map_err(|_| invalid())?
    };
    let fraction_units = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{fraction:0<width$}", width = decimals as usize);
        padded.parse::<u128>().map_err(|_| invalid())?
    };

    whole_units
        .checked_mul(scale)
        .and_then(|value| value.checked_add(fraction_units))
        .ok_or_else(invalid)
}

/// Formats base units as a decimal string without trailing zeros.
pub fn format_units(amount: Amount, decimals: u32) -> String {
    let scale = 10u128.pow(decimals);
    let whole = amount / scale;
    let fraction = amount % scale;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{fraction:0>width$}", width = decimals as usize);
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Serde adapter that writes amounts as decimal strings.
///
/// JSON numbers cannot carry the full `u128` range.
pub mod serde_amount {
    use super::Amount;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<Amount>().map_err(serde::de::Error::custom)
    }
}

/// Parses an amount column persisted as decimal TEXT.
pub(crate) fn amount_from_db(value: &str) -> Option<Amount> {
    value.parse::<Amount>().ok()
}

#[cfg(test)]
mod tests {
    use super::{format_units, parse_units, tokens, TOKEN_DECIMALS};

    #[test]
    fn parses_fractional_ether_style_values() {
        assert_eq!(
            parse_units("0.15", TOKEN_DECIMALS).expect("0.15 should parse"),
            150_000_000_000_000_000
        );
        assert_eq!(
            parse_units("100", TOKEN_DECIMALS).expect("100 should parse"),
            tokens(100)
        );
    }

    #[test]
    fn rejects_excess_precision_and_garbage() {
        assert!(parse_units("1.0000000000000000001", TOKEN_DECIMALS).is_err());
        assert!(parse_units("-1", TOKEN_DECIMALS).is_err());
        assert!(parse_units("1e18", TOKEN_DECIMALS).is_err());
        assert!(parse_units(".", TOKEN_DECIMALS).is_err());
    }

    #[test]
    fn formats_without_trailing_zeros() {
        assert_eq!(format_units(tokens(60), TOKEN_DECIMALS), "60");
        assert_eq!(
            format_units(150_000_000_000_000_000, TOKEN_DECIMALS),
            "0.15"
        );
    }
}
