//! # Fixed-point math kernel
//!
//! Decimal helpers shared by the den ledger. Amounts are Scrypto `Decimal`s (18 decimals).
//! Intermediate products that would lose precision or overflow go through `PreciseDecimal`
//! (36 decimals) and are narrowed back toward zero.

use scrypto::prelude::*;

/// Scale factor of the nominal collateral ratio, relative to a plain `coll / debt` ratio.
pub const NICR_PRECISION: i64 = 100;

/// Minutes in 1000 years. Upper bound on the exponent accepted by [`dec_pow`].
pub const MAX_DECPOW_MINUTES: u64 = 525_600_000;

pub const SECONDS_IN_ONE_MINUTE: i64 = 60;
pub const SECONDS_IN_YEAR: i64 = 31_536_000;
pub const BASIS_POINTS: i64 = 10_000;

/// Narrows a `PreciseDecimal` to a `Decimal`, rounding toward zero.
pub fn truncate(value: PreciseDecimal) -> Decimal {
    value
        .checked_truncate(RoundingMode::ToZero)
        .expect("Overflow")
}

/// Multiplies two decimals, rounding half up at the 18th decimal.
pub fn dec_mul(x: Decimal, y: Decimal) -> Decimal {
    (PreciseDecimal::from(x) * PreciseDecimal::from(y))
        .checked_truncate(RoundingMode::ToNearestMidpointAwayFromZero)
        .expect("Overflow")
}

/// `x * y / z`, floored, without intermediate loss of precision.
pub fn mul_div(x: Decimal, y: Decimal, z: Decimal) -> Decimal {
    truncate(PreciseDecimal::from(x) * PreciseDecimal::from(y) / PreciseDecimal::from(z))
}

/// Raises `base` to the power `minutes` by repeated squaring.
///
/// The exponent is capped at [`MAX_DECPOW_MINUTES`]; any larger exponent yields the value at
/// the cap. `dec_pow(x, 0)` is `1`.
pub fn dec_pow(base: Decimal, minutes: u64) -> Decimal {
    let mut n = minutes.min(MAX_DECPOW_MINUTES);
    if n == 0 {
        return Decimal::ONE;
    }

    let mut x = base;
    let mut y = Decimal::ONE;
    while n > 1 {
        if n % 2 == 0 {
            x = dec_mul(x, x);
            n /= 2;
        } else {
            y = dec_mul(x, y);
            x = dec_mul(x, x);
            n = (n - 1) / 2;
        }
    }

    dec_mul(x, y)
}

/// Nominal (price-free) collateral ratio used to rank dens.
///
/// A debt-free den is infinitely safe and gets `Decimal::MAX`.
pub fn compute_nominal_cr(coll: Decimal, debt: Decimal) -> Decimal {
    if debt > Decimal::ZERO {
        mul_div(coll, Decimal::from(NICR_PRECISION), debt)
    } else {
        Decimal::MAX
    }
}

/// Price-denominated collateral ratio, `Decimal::MAX` for a debt-free den.
pub fn compute_cr(coll: Decimal, debt: Decimal, price: Decimal) -> Decimal {
    if debt > Decimal::ZERO {
        mul_div(coll, price, debt)
    } else {
        Decimal::MAX
    }
}

/// Whole minutes elapsed between `from` and `to`, zero if time went backwards.
pub fn minutes_between(from: i64, to: i64) -> u64 {
    if to <= from {
        0
    } else {
        ((to - from) / SECONDS_IN_ONE_MINUTE) as u64
    }
}

/// Absolute difference of two decimals.
pub fn abs_diff(a: Decimal, b: Decimal) -> Decimal {
    if a >= b {
        a - b
    } else {
        b - a
    }
}
