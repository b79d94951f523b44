//! Half-to-even rounding over radix [`Decimal`].
//!
//! Products and quotients are taken in [`PreciseDecimal`], which carries 36
//! decimal places, and rounded back to 18 places with ties to even.

use radix_common::math::*;
use thiserror::Error;

/// Decimal places kept by [`Decimal`].
const SCALE: i32 = 18;

/// Errors from decimal arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecimalError {
    #[error("Decimal overflow")]
    Overflow,

    #[error("Decimal division by zero")]
    DivisionByZero,
}

/// `a * b`, rounded half-to-even at 18 decimals.
pub fn mul_half_even(a: Decimal, b: Decimal) -> Result<Decimal, DecimalError> {
    let product = PreciseDecimal::from(a)
        .checked_mul(PreciseDecimal::from(b))
        .ok_or(DecimalError::Overflow)?;
    round_half_even(product)
}

/// `a / b`, rounded half-to-even at 18 decimals.
pub fn div_half_even(a: Decimal, b: Decimal) -> Result<Decimal, DecimalError> {
    if b.is_zero() {
        return Err(DecimalError::DivisionByZero);
    }
    let quotient = PreciseDecimal::from(a)
        .checked_div(PreciseDecimal::from(b))
        .ok_or(DecimalError::Overflow)?;
    round_half_even(quotient)
}

/// Whole units of `value`, fraction discarded.
///
/// Fails for negative values and for values above `u128::MAX`.
pub fn truncate_units(value: Decimal) -> Result<u128, DecimalError> {
    let whole = value.attos() / Decimal::ONE.attos();
    u128::try_from(whole).map_err(|_| DecimalError::Overflow)
}

fn round_half_even(value: PreciseDecimal) -> Result<Decimal, DecimalError> {
    let rounded = value
        .checked_round(SCALE, RoundingMode::ToNearestMidpointToEven)
        .ok_or(DecimalError::Overflow)?;
    Decimal::try_from(rounded).map_err(|_| DecimalError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_ties_round_to_even() {
        let two = Decimal::from(2u32);
        // 0.5, 1.5, 2.5 and 3.5 attos.
        assert_eq!(div_half_even(dec("0.000000000000000001"), two).unwrap(), Decimal::ZERO);
        assert_eq!(
            div_half_even(dec("0.000000000000000003"), two).unwrap(),
            dec("0.000000000000000002")
        );
        assert_eq!(
            div_half_even(dec("0.000000000000000005"), two).unwrap(),
            dec("0.000000000000000002")
        );
        assert_eq!(
            mul_half_even(dec("0.000000000000000007"), dec("0.5")).unwrap(),
            dec("0.000000000000000004")
        );
    }

    #[test]
    fn test_non_ties_round_to_nearest() {
        // 2/3 = 0.666...6|67 rounds up in the last place.
        assert_eq!(
            div_half_even(Decimal::from(2u32), Decimal::from(3u32)).unwrap(),
            dec("0.666666666666666667")
        );
        assert_eq!(
            div_half_even(Decimal::from(1u32), Decimal::from(3u32)).unwrap(),
            dec("0.333333333333333333")
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            div_half_even(Decimal::ONE, Decimal::ZERO).unwrap_err(),
            DecimalError::DivisionByZero
        );
    }

    #[test]
    fn test_amounts_beyond_i128_fixed_point() {
        // 3e20 units is past what an i128 scaled by 1e18 can hold.
        let large = Decimal::from(300_000_000_000_000_000_000u128);
        let half = div_half_even(large, Decimal::from(2u32)).unwrap();
        assert_eq!(truncate_units(half).unwrap(), 150_000_000_000_000_000_000);

        let third = Decimal::from(100_000_000_000_000_000_000u128);
        let proportion = div_half_even(third, large).unwrap();
        assert_eq!(proportion, dec("0.333333333333333333"));
        let share = mul_half_even(large, proportion).unwrap();
        assert_eq!(truncate_units(share).unwrap(), 99_999_999_999_999_999_900);

        assert_eq!(truncate_units(Decimal::from(u128::MAX)).unwrap(), u128::MAX);
    }

    #[test]
    fn test_truncate_units_discards_fraction() {
        assert_eq!(truncate_units(dec("60.999999999999999999")).unwrap(), 60);
        assert_eq!(truncate_units(Decimal::ZERO).unwrap(), 0);
        assert_eq!(truncate_units(dec("-1")).unwrap_err(), DecimalError::Overflow);
    }
}
