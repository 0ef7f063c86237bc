//! # Interest accrual
//!
//! A single compounding index per collateral market. The index only moves when a mutating
//! call touches the market; dens project their nominal debt through it when they are touched.

use crate::math::*;
use scrypto::prelude::*;

#[derive(ScryptoSbor, PartialEq, Clone, Debug)]
pub struct InterestState {
    /// Global compounding index, starting at one.
    pub active_index: PreciseDecimal,
    /// Timestamp (seconds) of the last index update.
    pub last_update: i64,
    /// Per-second interest rate.
    pub rate: PreciseDecimal,
    /// Interest accrued on active debt and not yet minted to the protocol.
    pub payable: Decimal,
}

impl InterestState {
    pub fn new(now: i64) -> Self {
        Self {
            active_index: PreciseDecimal::ONE,
            last_update: now,
            rate: PreciseDecimal::ZERO,
            payable: Decimal::ZERO,
        }
    }

    /// Converts a yearly rate in basis points into the per-second rate.
    pub fn rate_from_bps(bps: u64) -> PreciseDecimal {
        PreciseDecimal::from(bps)
            / (PreciseDecimal::from(BASIS_POINTS) * PreciseDecimal::from(SECONDS_IN_YEAR))
    }

    /// The index as it would be at `now`, along with the interest factor since the last update.
    pub fn calculate_index(&self, now: i64) -> (PreciseDecimal, PreciseDecimal) {
        if self.last_update >= now || self.rate == PreciseDecimal::ZERO {
            return (self.active_index, PreciseDecimal::ZERO);
        }

        let factor = PreciseDecimal::from(now - self.last_update) * self.rate;
        (self.active_index + self.active_index * factor, factor)
    }

    /// Interest `debt` would have accrued by `now`.
    pub fn pending_interest(&self, debt: Decimal, now: i64) -> Decimal {
        let (_, factor) = self.calculate_index(now);
        if factor == PreciseDecimal::ZERO {
            return Decimal::ZERO;
        }
        truncate(PreciseDecimal::from(debt) * factor)
    }

    /// Advances the index to `now` and returns the interest accrued on `accruing_debt`.
    ///
    /// The timestamp is left untouched when there is nothing to accrue.
    pub fn accrue(&mut self, accruing_debt: Decimal, now: i64) -> Decimal {
        let (index, factor) = self.calculate_index(now);
        if factor == PreciseDecimal::ZERO {
            return Decimal::ZERO;
        }

        let interest = truncate(PreciseDecimal::from(accruing_debt) * factor);
        self.payable += interest;
        self.active_index = index;
        self.last_update = now;

        interest
    }

    /// Projects a den's nominal debt from `den_index` to the current index.
    pub fn project(&self, debt: Decimal, den_index: PreciseDecimal) -> Decimal {
        if den_index == PreciseDecimal::ZERO || den_index >= self.active_index {
            return debt;
        }
        truncate(PreciseDecimal::from(debt) * self.active_index / den_index)
    }

    /// Like [`Self::project`], but against the index as it would be at `now`.
    pub fn project_at(&self, debt: Decimal, den_index: PreciseDecimal, now: i64) -> Decimal {
        let (index, _) = self.calculate_index(now);
        if den_index == PreciseDecimal::ZERO || den_index >= index {
            return debt;
        }
        truncate(PreciseDecimal::from(debt) * index / den_index)
    }
}
