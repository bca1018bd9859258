//! Fixed-point arithmetic on u128 with 256-bit intermediates.
//!
//! Every division truncates toward zero. Products are formed at full
//! 256-bit width so `a * b / d` only fails when the quotient itself does
//! not fit in a u128.

use crate::constants::{BPS_SCALE, WAD, WAD_DECIMALS};
use crate::error::MathError;

const LO_MASK: u128 = u64::MAX as u128;

/// Full-width product of two u128 values as `(hi, lo)`.
fn wide_mul(a: u128, b: u128) -> (u128, u128) {
    let (a_hi, a_lo) = (a >> 64, a & LO_MASK);
    let (b_hi, b_lo) = (b >> 64, b & LO_MASK);

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    // At most three 64-bit quantities: cannot overflow.
    let mid = (ll >> 64) + (lh & LO_MASK) + (hl & LO_MASK);
    let lo = (ll & LO_MASK) | (mid << 64);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);
    (hi, lo)
}

/// `floor(a * b / denominator)`.
///
/// # Errors
///
/// - [`MathError::DivisionByZero`] if `denominator == 0`
/// - [`MathError::Overflow`] if the quotient exceeds `u128::MAX`
///
/// # Examples
///
/// ```
/// use stakeup_core::math::mul_div;
/// assert_eq!(mul_div(10, 3, 4).unwrap(), 7);
/// assert_eq!(mul_div(u128::MAX, 2, 4).unwrap(), u128::MAX / 2);
/// ```
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }
    let (hi, lo) = wide_mul(a, b);
    if hi == 0 {
        return Ok(lo / denominator);
    }
    if hi >= denominator {
        return Err(MathError::Overflow);
    }

    // Restoring long division of the 256-bit numerator; `rem < denominator`
    // holds at the top of every iteration.
    let mut rem = hi;
    let mut quotient: u128 = 0;
    for bit in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> bit) & 1);
        quotient <<= 1;
        if carry == 1 || rem >= denominator {
            rem = rem.wrapping_sub(denominator);
            quotient |= 1;
        }
    }
    Ok(quotient)
}

/// `a * b / 1e18`.
pub fn mul_wad(a: u128, b: u128) -> Result<u128, MathError> {
    mul_div(a, b, WAD)
}

/// `a * 1e18 / b`.
pub fn div_wad(a: u128, b: u128) -> Result<u128, MathError> {
    mul_div(a, WAD, b)
}

/// `amount * bps / 10_000`, truncated.
///
/// # Examples
///
/// ```
/// use stakeup_core::math::{bps_of, parse_units};
/// let fee = bps_of(parse_units("1000", 18).unwrap(), 1).unwrap();
/// assert_eq!(fee, parse_units("0.1", 18).unwrap());
/// ```
pub fn bps_of(amount: u128, bps: u16) -> Result<u128, MathError> {
    mul_div(amount, u128::from(bps), BPS_SCALE)
}

fn scale_factor(decimals: u8) -> Result<u128, MathError> {
    if decimals > WAD_DECIMALS {
        return Err(MathError::UnsupportedDecimals(decimals));
    }
    Ok(10u128.pow(u32::from(WAD_DECIMALS - decimals)))
}

/// Scale a token-native amount up to 18 decimals.
pub fn normalize(amount: u128, decimals: u8) -> Result<u128, MathError> {
    amount
        .checked_mul(scale_factor(decimals)?)
        .ok_or(MathError::Overflow)
}

/// Scale an 18-decimal value down to token-native decimals, truncating dust.
pub fn denormalize(value: u128, decimals: u8) -> Result<u128, MathError> {
    Ok(value / scale_factor(decimals)?)
}

/// Parse a decimal string into a fixed-point integer with `decimals` places.
///
/// Fractional digits beyond `decimals` are rejected rather than rounded.
///
/// # Examples
///
/// ```
/// use stakeup_core::math::parse_units;
/// assert_eq!(parse_units("1000", 6).unwrap(), 1_000_000_000);
/// assert_eq!(parse_units("1.05", 18).unwrap(), 1_050_000_000_000_000_000);
/// assert!(parse_units("0.0000001", 6).is_err());
/// ```
pub fn parse_units(input: &str, decimals: u8) -> Result<u128, MathError> {
    let invalid = || MathError::InvalidDecimal(input.to_string());
    let s = input.trim();
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac_part.len() > usize::from(decimals) {
        return Err(invalid());
    }

    let unit = 10u128
        .checked_pow(u32::from(decimals))
        .ok_or(MathError::Overflow)?;
    let whole: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| invalid())?
    };
    let frac: u128 = if frac_part.is_empty() {
        0
    } else {
        let digits: u128 = frac_part.parse().map_err(|_| invalid())?;
        digits * 10u128.pow(u32::from(decimals) - frac_part.len() as u32)
    };

    whole
        .checked_mul(unit)
        .and_then(|w| w.checked_add(frac))
        .ok_or(MathError::Overflow)
}

/// Render a fixed-point integer as a decimal string without trailing zeros.
///
/// Fails with [`MathError::Overflow`] when `10^decimals` does not fit a `u128`.
///
/// # Examples
///
/// ```
/// use stakeup_core::math::format_units;
/// assert_eq!(format_units(999_900_000_000_000_000_000, 18).unwrap(), "999.9");
/// assert_eq!(format_units(5_000_000, 6).unwrap(), "5");
/// ```
pub fn format_units(value: u128, decimals: u8) -> Result<String, MathError> {
    let unit = 10u128
        .checked_pow(u32::from(decimals))
        .ok_or(MathError::Overflow)?;
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return Ok(whole.to_string());
    }
    let frac = format!("{frac:0width$}", width = usize::from(decimals));
    Ok(format!("{whole}.{}", frac.trim_end_matches('0')))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // --- mul_div ---

    #[test]
    fn mul_div_small() {
        assert_eq!(mul_div(6, 7, 2).unwrap(), 21);
        assert_eq!(mul_div(1, 1, 3).unwrap(), 0);
    }

    #[test]
    fn mul_div_zero_denominator() {
        assert_eq!(mul_div(1, 1, 0), Err(MathError::DivisionByZero));
    }

    #[test]
    fn mul_div_wide_intermediate() {
        // 2e26 * 1e18 overflows u128 but the quotient does not.
        let total = 200_000_000 * WAD;
        assert_eq!(mul_div(total, WAD, WAD).unwrap(), total);
        assert_eq!(mul_div(u128::MAX, u128::MAX, u128::MAX).unwrap(), u128::MAX);
    }

    #[test]
    fn mul_div_quotient_overflow() {
        assert_eq!(mul_div(u128::MAX, 2, 1), Err(MathError::Overflow));
    }

    #[test]
    fn wad_helpers() {
        let rate = parse_units("1.05", 18).unwrap();
        assert_eq!(mul_wad(1000 * WAD, rate).unwrap(), 1050 * WAD);
        assert_eq!(div_wad(1050 * WAD, 1000 * WAD).unwrap(), rate);
    }

    // --- bps ---

    #[test]
    fn bps_truncates() {
        assert_eq!(bps_of(9_999, 1).unwrap(), 0);
        assert_eq!(bps_of(10_000, 1).unwrap(), 1);
        assert_eq!(bps_of(1000 * WAD, 10_000).unwrap(), 1000 * WAD);
    }

    // --- decimals ---

    #[test]
    fn normalize_six_decimals() {
        assert_eq!(normalize(1_000_000, 6).unwrap(), WAD);
        assert_eq!(denormalize(WAD + 123, 6).unwrap(), 1_000_000);
    }

    #[test]
    fn normalize_rejects_wide_decimals() {
        assert_eq!(normalize(1, 24), Err(MathError::UnsupportedDecimals(24)));
    }

    // --- parsing ---

    #[test]
    fn parse_eth_values() {
        assert_eq!(parse_units("0.1", 18).unwrap(), WAD / 10);
        assert_eq!(parse_units("999.9", 18).unwrap(), 9999 * WAD / 10);
        assert_eq!(parse_units(".5", 18).unwrap(), WAD / 2);
        assert_eq!(parse_units(" 7 ", 0).unwrap(), 7);
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["", ".", "-1", "1e5", "1.2.3", "abc"] {
            assert!(parse_units(bad, 18).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn format_trims() {
        assert_eq!(format_units(0, 18).unwrap(), "0");
        assert_eq!(format_units(WAD / 10, 18).unwrap(), "0.1");
        assert_eq!(format_units(1_050_000, 6).unwrap(), "1.05");
    }

    #[test]
    fn format_rejects_oversized_decimals() {
        assert_eq!(format_units(1, 38).unwrap(), "0.00000000000000000000000000000000000001");
        assert_eq!(format_units(1, 39), Err(MathError::Overflow));
        assert_eq!(format_units(u128::MAX, u8::MAX), Err(MathError::Overflow));
    }

    proptest! {
        #[test]
        fn mul_div_matches_narrow(a in 0u128..=u64::MAX as u128, b in 0u128..=u64::MAX as u128, d in 1u128..=u64::MAX as u128) {
            prop_assert_eq!(mul_div(a, b, d).unwrap(), a * b / d);
        }

        #[test]
        fn mul_div_identity(a: u128, d in 1u128..=u128::MAX) {
            prop_assert_eq!(mul_div(a, d, d).unwrap(), a);
        }

        #[test]
        fn format_then_parse(value in 0u128..(1u128 << 100), decimals in 0u8..=18) {
            let s = format_units(value, decimals).unwrap();
            prop_assert_eq!(parse_units(&s, decimals).unwrap(), value);
        }

        #[test]
        fn denormalize_never_exceeds(value in 0u128..(1u128 << 120)) {
            let native = denormalize(value, 6).unwrap();
            prop_assert!(normalize(native, 6).unwrap() <= value);
        }
    }
}
