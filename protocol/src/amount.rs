//! Exact conversion between user-entered decimal amounts and base units
//!
//! Amounts never pass through floating point: `"0.1"` with 18 decimals is
//! exactly `100_000_000_000_000_000` base units.

use crate::error::ProtocolError;

/// Fraction of one unit kept back by [`max_withdrawal`] to pay the network fee
/// (expressed as `10^-RESERVE_FRACTION_DIGITS` units, i.e. 0.01)
pub const RESERVE_FRACTION_DIGITS: u8 = 2;

/// Largest token precision whose unit fits in a `u128` of base units
pub const MAX_DECIMALS: u8 = 38;

/// A validated, strictly positive decimal amount as entered by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalAmount {
    whole: String,
    fraction: String,
}

impl DecimalAmount {
    /// Parse a user-entered amount. Rejects empty, negative, zero and
    /// non-numeric input with [`ProtocolError::InvalidAmount`].
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        let invalid = || ProtocolError::InvalidAmount(input.to_string());
        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);

        let (whole, fraction) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole = whole.trim_start_matches('0').to_string();
        let fraction = fraction.trim_end_matches('0').to_string();

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }

        Ok(Self { whole, fraction })
    }

    /// Convert to base units for a token with `decimals` fractional digits.
    pub fn to_base_units(&self, decimals: u8) -> Result<u128, ProtocolError> {
        let invalid = || ProtocolError::InvalidAmount(self.to_string());

        if self.fraction.len() > decimals as usize {
            return Err(invalid());
        }

        let scale = 10u128.checked_pow(decimals as u32).ok_or_else(invalid)?;
        let whole: u128 = if self.whole.is_empty() {
            0
        } else {
            self.whole.parse().map_err(|_| invalid())?
        };

        let mut fraction_digits = self.fraction.clone();
        while fraction_digits.len() < decimals as usize {
            fraction_digits.push('0');
        }
        let fraction: u128 = if fraction_digits.is_empty() {
            0
        } else {
            fraction_digits.parse().map_err(|_| invalid())?
        };

        whole
            .checked_mul(scale)
            .and_then(|w| w.checked_add(fraction))
            .ok_or_else(invalid)
    }
}

impl std::fmt::Display for DecimalAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let whole = if self.whole.is_empty() { "0" } else { &self.whole };
        if self.fraction.is_empty() {
            write!(f, "{whole}")
        } else {
            write!(f, "{whole}.{}", self.fraction)
        }
    }
}

/// Parse a user amount straight to base units.
pub fn parse_units(input: &str, decimals: u8) -> Result<u128, ProtocolError> {
    DecimalAmount::parse(input)?.to_base_units(decimals)
}

/// Render base units as a decimal string without trailing zeros.
pub fn format_units(base_units: u128, decimals: u8) -> String {
    if decimals == 0 {
        return base_units.to_string();
    }
    // Past 38 decimals every u128 is a pure fraction
    let (whole, fraction) = match 10u128.checked_pow(decimals as u32) {
        Some(scale) => (base_units / scale, base_units % scale),
        None => (0, base_units),
    };
    if fraction == 0 {
        return whole.to_string();
    }
    let padded = format!("{:0width$}", fraction, width = decimals as usize);
    format!("{}.{}", whole, padded.trim_end_matches('0'))
}

/// Fee reserve in base units: 0.01 unit, or one base unit for coarse tokens.
///
/// Saturates at `u128::MAX` when 0.01 unit is not representable, so every
/// balance of such a token counts as below the reserve.
pub fn fee_reserve(decimals: u8) -> u128 {
    if decimals >= RESERVE_FRACTION_DIGITS {
        10u128
            .checked_pow((decimals - RESERVE_FRACTION_DIGITS) as u32)
            .unwrap_or(u128::MAX)
    } else {
        1
    }
}

/// Largest amount that can be withdrawn while leaving the fee reserve.
///
/// Balances at or below the reserve are offered in full.
pub fn max_withdrawal(balance: u128, decimals: u8) -> u128 {
    let reserve = fee_reserve(decimals);
    if balance > reserve {
        balance - reserve
    } else {
        balance
    }
}

/// Reject a spend of `requested` base units from `available`.
///
/// A zero balance is insufficient for any amount.
pub fn ensure_sufficient(available: u128, requested: u128) -> Result<(), ProtocolError> {
    if available == 0 || available < requested {
        return Err(ProtocolError::InsufficientBalance { available, requested });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units_exact() {
        assert_eq!(parse_units("1", 18).unwrap(), 1_000_000_000_000_000_000);
        assert_eq!(parse_units("0.1", 18).unwrap(), 100_000_000_000_000_000);
        assert_eq!(parse_units("1500", 0).unwrap(), 1500);
        assert_eq!(parse_units("12.34", 2).unwrap(), 1234);
        assert_eq!(parse_units(".5", 1).unwrap(), 5);
        assert_eq!(parse_units("5.", 2).unwrap(), 500);
        assert_eq!(parse_units(" 007.50 ", 2).unwrap(), 750);
    }

    #[test]
    fn test_parse_rejects_invalid() {
        for bad in ["-5", "0", "abc", "", "  ", ".", "0.000", "1e5", "1.2.3", "--1", "NaN"] {
            assert!(
                matches!(DecimalAmount::parse(bad), Err(ProtocolError::InvalidAmount(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_too_many_fraction_digits() {
        assert!(matches!(parse_units("0.001", 2), Err(ProtocolError::InvalidAmount(_))));
        // Trailing zeros beyond precision are harmless
        assert_eq!(parse_units("0.0100", 2).unwrap(), 1);
    }

    #[test]
    fn test_overflow_is_invalid() {
        let huge = "9".repeat(60);
        assert!(matches!(parse_units(&huge, 18), Err(ProtocolError::InvalidAmount(_))));
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(4_990_000_000_000_000_000, 18), "4.99");
        assert_eq!(format_units(5_000_000, 6), "5");
        assert_eq!(format_units(5, 3), "0.005");
        assert_eq!(format_units(1500, 0), "1500");
    }

    #[test]
    fn test_max_withdrawal_below_reserve_offers_full_balance() {
        let decimals = 18;
        let balance = parse_units("0.005", decimals).unwrap();
        assert_eq!(format_units(max_withdrawal(balance, decimals), decimals), "0.005");
    }

    #[test]
    fn test_max_withdrawal_subtracts_reserve() {
        let decimals = 18;
        let balance = parse_units("5.0", decimals).unwrap();
        assert_eq!(format_units(max_withdrawal(balance, decimals), decimals), "4.99");
    }

    #[test]
    fn test_max_withdrawal_at_reserve_boundary() {
        assert_eq!(max_withdrawal(100, 4), 100);
        assert_eq!(max_withdrawal(101, 4), 1);
        assert_eq!(max_withdrawal(0, 4), 0);
    }

    #[test]
    fn test_ensure_sufficient() {
        assert!(ensure_sufficient(1000, 1000).is_ok());
        assert!(matches!(
            ensure_sufficient(1000, 1500),
            Err(ProtocolError::InsufficientBalance { available: 1000, requested: 1500 })
        ));
        assert!(ensure_sufficient(0, 0).is_err());
    }

    #[test]
    fn test_precision_beyond_u128_does_not_overflow() {
        assert_eq!(format_units(1, 39), format!("0.{}1", "0".repeat(38)));
        assert_eq!(format_units(0, 41), "0");
        assert_eq!(format_units(u128::MAX, MAX_DECIMALS), format!("3.{}", &u128::MAX.to_string()[1..]));

        assert_eq!(fee_reserve(41), u128::MAX);
        assert_eq!(max_withdrawal(500, 41), 500);
        assert!(matches!(parse_units("1", 41), Err(ProtocolError::InvalidAmount(_))));
    }

    #[test]
    fn test_fee_reserve_coarse_tokens() {
        assert_eq!(fee_reserve(2), 1);
        assert_eq!(fee_reserve(0), 1);
        assert_eq!(fee_reserve(6), 10_000);
    }
}
