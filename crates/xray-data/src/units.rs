//! Base-unit (wei) <-> decimal-string conversion.
//!
//! Rendering rounds half away from zero to a fixed number of fraction digits;
//! parsing truncates digits beyond the unit's precision.

use alloy::primitives::{U256, U512};

use crate::error::UnitsError;

pub const WEI_DECIMALS: u8 = 18;
pub const GWEI_DECIMALS: u8 = 9;
/// Fraction digits used for every rendered amount.
pub const DISPLAY_PRECISION: u8 = 8;

const WEI_PER_GWEI: u64 = 1_000_000_000;

fn pow10(exp: u8) -> U512 {
    U512::from(10u8).pow(U512::from(exp))
}

/// Renders `value / 10^decimals` with exactly `precision` fraction digits.
///
/// Examples:
/// - `format_units(1_500_000_000_000_000_000, 18, 8)` -> `"1.50000000"`
/// - `format_units(5, 9, 8)` -> `"0.00000001"` (rounded up from `0.000000005`)
pub fn format_units(value: U512, decimals: u8, precision: u8) -> String {
    let scaled = if precision >= decimals {
        value * pow10(precision - decimals)
    } else {
        let step = pow10(decimals - precision);
        let (quotient, remainder) = value.div_rem(step);
        if remainder * U512::from(2u8) >= step {
            quotient + U512::from(1u8)
        } else {
            quotient
        }
    };

    if precision == 0 {
        return scaled.to_string();
    }
    let (whole, fraction) = scaled.div_rem(pow10(precision));
    format!(
        "{whole}.{fraction:0>width$}",
        fraction = fraction.to_string(),
        width = usize::from(precision)
    )
}

/// Wei rendered as ether with 8 decimals.
pub fn format_ether(wei: U256) -> String {
    format_units(U512::from(wei), WEI_DECIMALS, DISPLAY_PRECISION)
}

/// Wei rendered as gwei with 8 decimals.
pub fn format_gwei(wei: U256) -> String {
    format_units(U512::from(wei), GWEI_DECIMALS, DISPLAY_PRECISION)
}

/// Parses a non-negative decimal ether amount into wei.
///
/// Digits beyond the 18th decimal place are dropped.
pub fn parse_ether(amount: &str) -> Result<U256, UnitsError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(UnitsError::Empty);
    }

    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
        return Err(UnitsError::Invalid(amount.to_string()));
    }

    let precision = usize::from(WEI_DECIMALS);
    let fraction = &fraction[..fraction.len().min(precision)];
    let digits = format!("{whole}{fraction:0<precision$}");

    U256::from_str_radix(&digits, 10).map_err(|_| UnitsError::Overflow(amount.to_string()))
}

pub fn gwei_to_wei(gwei: u64) -> U256 {
    U256::from(gwei) * U256::from(WEI_PER_GWEI)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn formats_whole_and_fractional_ether() {
        assert_eq!(format_ether(U256::from(ONE_ETHER)), "1.00000000");
        assert_eq!(format_ether(U256::from(123_000_000_000_000u128)), "0.00012300");
        assert_eq!(format_ether(U256::ZERO), "0.00000000");
    }

    #[test]
    fn rounds_half_away_from_zero() {
        // 0.000000005 ether sits exactly on the rounding boundary.
        assert_eq!(format_ether(U256::from(5_000_000_000u64)), "0.00000001");
        assert_eq!(format_ether(U256::from(4_999_999_999u64)), "0.00000000");
        assert_eq!(format_gwei(U256::from(5u8)), "0.00000001");
    }

    #[test]
    fn formats_gas_price_in_gwei() {
        assert_eq!(format_gwei(gwei_to_wei(20)), "20.00000000");
        assert_eq!(format_gwei(U256::from(1_234_567_890u64)), "1.23456789");
    }

    #[test]
    fn formats_beyond_256_bits() {
        let huge = pow10(100);
        let rendered = format_units(huge, WEI_DECIMALS, DISPLAY_PRECISION);
        assert_eq!(rendered, format!("1{}.00000000", "0".repeat(82)));
        assert_eq!(format_units(U512::from(7u8), 0, 2), "7.00");
        assert_eq!(format_units(U512::from(15u8), 1, 0), "2");
    }

    #[test]
    fn parses_ether_amounts() {
        assert_eq!(parse_ether("1"), Ok(U256::from(ONE_ETHER)));
        assert_eq!(parse_ether("0.5"), Ok(U256::from(ONE_ETHER / 2)));
        assert_eq!(parse_ether(".25"), Ok(U256::from(ONE_ETHER / 4)));
        assert_eq!(parse_ether(" 2. "), Ok(U256::from(2 * ONE_ETHER)));
    }

    #[test]
    fn parse_truncates_excess_precision() {
        assert_eq!(parse_ether("0.0000000000000000019"), Ok(U256::from(1u8)));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_ether(""), Err(UnitsError::Empty));
        assert!(matches!(parse_ether("-1"), Err(UnitsError::Invalid(_))));
        assert!(matches!(parse_ether("1.2.3"), Err(UnitsError::Invalid(_))));
        assert!(matches!(parse_ether("abc"), Err(UnitsError::Invalid(_))));
        assert!(matches!(parse_ether("."), Err(UnitsError::Invalid(_))));
        let too_big = "9".repeat(80);
        assert!(matches!(parse_ether(&too_big), Err(UnitsError::Overflow(_))));
    }

    #[test]
    fn round_trips_within_display_precision() {
        for wei in [
            0u128,
            1_000_000_000_000_000_000,
            123_450_000_000_000_000,
            10_000_000_000,
            987_654_321_000_000_000_000,
        ] {
            let value = U256::from(wei);
            assert_eq!(parse_ether(&format_ether(value)), Ok(value), "wei = {wei}");
        }
    }
}
