//! Numeric helpers for on-chain balances.
//!
//! On-chain amounts are always `u128` minimal units. Conversions to and from
//! human amounts go through exact decimal arithmetic, never floats.

use std::num::IntErrorKind;

use rust_decimal::Decimal;
use thiserror::Error;

/// Balance in the chain's minimal unit (planck, wei, ...)
pub type Balance = u128;

/// Largest scale a `Decimal` can carry
const MAX_DISPLAY_SCALE: u32 = 28;

/// Fractional digits shown in fee strings
const FEE_DISPLAY_PRECISION: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("empty amount")]
    Empty,
    #[error("invalid amount: {0}")]
    Invalid(String),
    #[error("amount {amount} has more than {decimals} fractional digits")]
    TooPrecise { amount: String, decimals: u32 },
    #[error("amount {0} does not fit in a 128-bit balance")]
    Overflow(String),
    #[error("{0} decimals cannot be displayed")]
    UnsupportedDecimals(u32),
}

/// Parse a number as returned by chain queries.
///
/// Accepts plain digits, thousands-separated digits (`"1,000,000"`) and
/// hex-encoded values (`"0x0f4240"`).
pub fn parse_raw_number(value: &str) -> Result<Balance, AmountError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return Balance::from_str_radix(hex, 16).map_err(|e| int_error(value, e.kind()));
    }

    let digits: String = trimmed.chars().filter(|c| *c != ',').collect();
    digits.parse::<Balance>().map_err(|e| int_error(value, e.kind()))
}

fn int_error(value: &str, kind: &IntErrorKind) -> AmountError {
    match kind {
        IntErrorKind::PosOverflow => AmountError::Overflow(value.to_string()),
        IntErrorKind::Empty => AmountError::Empty,
        _ => AmountError::Invalid(value.to_string()),
    }
}

/// `10^decimals` as a balance
pub fn unit(decimals: u32) -> Result<Balance, AmountError> {
    10u128
        .checked_pow(decimals)
        .ok_or(AmountError::UnsupportedDecimals(decimals))
}

/// Convert a user-entered amount (`"12.5"`) into minimal units.
pub fn to_minimal_units(amount: &str, decimals: u32) -> Result<Balance, AmountError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction.trim_end_matches('0')),
        None => (trimmed, ""),
    };

    let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(AmountError::Invalid(amount.to_string()));
    }

    if fraction.len() as u32 > decimals {
        return Err(AmountError::TooPrecise {
            amount: amount.to_string(),
            decimals,
        });
    }

    let overflow = || AmountError::Overflow(amount.to_string());

    let whole_units = if whole.is_empty() {
        0
    } else {
        whole.parse::<Balance>().map_err(|_| overflow())?
    };
    let fraction_units = if fraction.is_empty() {
        0
    } else {
        let padding = unit(decimals - fraction.len() as u32)?;
        fraction
            .parse::<Balance>()
            .map_err(|_| overflow())?
            .checked_mul(padding)
            .ok_or_else(overflow)?
    };

    whole_units
        .checked_mul(unit(decimals)?)
        .and_then(|v| v.checked_add(fraction_units))
        .ok_or_else(overflow)
}

/// Divide a minimal-unit amount by `10^decimals` for display.
pub fn to_display(amount: Balance, decimals: u32) -> Result<Decimal, AmountError> {
    if decimals > MAX_DISPLAY_SCALE {
        return Err(AmountError::UnsupportedDecimals(decimals));
    }

    let mantissa = i128::try_from(amount).map_err(|_| AmountError::Overflow(amount.to_string()))?;

    Decimal::try_from_i128_with_scale(mantissa, decimals)
        .map(|d| d.normalize())
        .map_err(|_| AmountError::Overflow(amount.to_string()))
}

/// Format a fee the way the wallet shows it: `"0.0123 GLMR"`.
pub fn format_balance(amount: Balance, decimals: u32, symbol: &str) -> Result<String, AmountError> {
    let display = to_display(amount, decimals)?.round_dp(FEE_DISPLAY_PRECISION);

    Ok(format!(
        "{:.prec$} {}",
        display,
        symbol,
        prec = FEE_DISPLAY_PRECISION as usize
    ))
}

/// Parse a percentage such as `"20.00%"`.
///
/// Bare integers are read as `Perbill` parts (`1_000_000_000` = 100%).
pub fn parse_percentage(value: &str) -> Result<Decimal, AmountError> {
    let trimmed = value.trim();

    if let Some(percent) = trimmed.strip_suffix('%') {
        return percent
            .trim()
            .replace(',', "")
            .parse::<Decimal>()
            .map_err(|_| AmountError::Invalid(value.to_string()));
    }

    let parts = parse_raw_number(trimmed)?;
    perbill_to_percent(parts)
}

/// `Perbill` parts to a percentage
pub fn perbill_to_percent(parts: u128) -> Result<Decimal, AmountError> {
    // 1% == 10_000_000 parts per billion
    to_display(parts, 7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_raw_number_formats() {
        assert_eq!(parse_raw_number("1,000,000").unwrap(), 1_000_000);
        assert_eq!(parse_raw_number("42").unwrap(), 42);
        assert_eq!(parse_raw_number("0x0f4240").unwrap(), 1_000_000);
        assert_eq!(parse_raw_number(""), Err(AmountError::Empty));
        assert!(matches!(
            parse_raw_number("12a"),
            Err(AmountError::Invalid(_))
        ));
        assert!(matches!(
            parse_raw_number("999999999999999999999999999999999999999999"),
            Err(AmountError::Overflow(_))
        ));
    }

    #[test]
    fn test_to_minimal_units_is_exact() {
        assert_eq!(to_minimal_units("1.5", 18).unwrap(), 1_500_000_000_000_000_000);
        assert_eq!(to_minimal_units("0.1", 10).unwrap(), 1_000_000_000);
        assert_eq!(to_minimal_units("7", 0).unwrap(), 7);
        assert_eq!(to_minimal_units(".25", 2).unwrap(), 25);
        assert_eq!(to_minimal_units("3.100", 1).unwrap(), 31);
    }

    #[test]
    fn test_to_minimal_units_rejects_bad_input() {
        assert!(matches!(
            to_minimal_units("0.001", 2),
            Err(AmountError::TooPrecise { .. })
        ));
        assert!(matches!(
            to_minimal_units("-1", 2),
            Err(AmountError::Invalid(_))
        ));
        assert!(matches!(to_minimal_units(".", 2), Err(AmountError::Invalid(_))));
        assert_eq!(to_minimal_units("  ", 2), Err(AmountError::Empty));
    }

    #[test]
    fn test_to_display() {
        assert_eq!(to_display(1_500_000_000_000, 12).unwrap(), dec!(1.5));
        assert_eq!(to_display(0, 18).unwrap(), Decimal::ZERO);
        assert!(to_display(1, 30).is_err());
    }

    #[test]
    fn test_format_balance() {
        assert_eq!(
            format_balance(12_345_678_900_000_000, 18, "GLMR").unwrap(),
            "0.0123 GLMR"
        );
        assert_eq!(format_balance(0, 12, "BNC").unwrap(), "0.0000 BNC");
    }

    #[test]
    fn test_parse_percentage() {
        assert_eq!(parse_percentage("20.00%").unwrap(), dec!(20));
        assert_eq!(parse_percentage("200,000,000").unwrap(), dec!(20));
        assert_eq!(parse_percentage("5.5 %").unwrap(), dec!(5.5));
    }
}
