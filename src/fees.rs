//! # Fee-rate dynamics
//!
//! A single base rate drives both redemption and borrowing fees. It decays every minute by
//! `minute_decay_factor` and jumps up with each redemption, proportionally to the share of the
//! debt supply that was redeemed.

use crate::math::*;
use scrypto::prelude::*;

/// Dampens the base rate increase caused by a redemption.
pub const BETA: i64 = 2;

#[derive(ScryptoSbor, PartialEq, Clone, Debug)]
pub struct FeeState {
    pub base_rate: Decimal,
    /// Only ever advanced in whole minutes.
    pub last_fee_operation_time: i64,
}

impl FeeState {
    pub fn new(now: i64) -> Self {
        Self {
            base_rate: Decimal::ZERO,
            last_fee_operation_time: now,
        }
    }

    pub fn minutes_passed(&self, now: i64) -> u64 {
        minutes_between(self.last_fee_operation_time, now)
    }

    /// The base rate after decaying it to `now`.
    pub fn decayed_base_rate(&self, minute_decay_factor: Decimal, now: i64) -> Decimal {
        let decay = dec_pow(minute_decay_factor, self.minutes_passed(now));
        self.base_rate * decay
    }

    /// Advances the fee clock by the whole minutes elapsed. Returns the new time if it moved.
    pub fn update_last_fee_op_time(&mut self, now: i64) -> Option<i64> {
        let minutes = self.minutes_passed(now);
        if minutes == 0 {
            return None;
        }
        self.last_fee_operation_time += minutes as i64 * SECONDS_IN_ONE_MINUTE;
        Some(self.last_fee_operation_time)
    }

    /// Persists the decayed base rate.
    pub fn decay_base_rate(&mut self, minute_decay_factor: Decimal, now: i64) -> Decimal {
        let decayed = self.decayed_base_rate(minute_decay_factor, now);
        self.base_rate = decayed;
        decayed
    }

    /// Raises the base rate after a redemption that drew `collateral_drawn` at `price`.
    pub fn update_base_rate_from_redemption(
        &mut self,
        minute_decay_factor: Decimal,
        collateral_drawn: Decimal,
        price: Decimal,
        total_debt_supply: Decimal,
        now: i64,
    ) -> Decimal {
        let decayed = self.decayed_base_rate(minute_decay_factor, now);
        let redeemed_debt_fraction = mul_div(collateral_drawn, price, total_debt_supply);
        let new_base_rate =
            (decayed + redeemed_debt_fraction / Decimal::from(BETA)).min(Decimal::ONE);

        self.base_rate = new_base_rate;
        new_base_rate
    }
}

/// `min(floor + base_rate, max)`, shared by redemption and borrowing rates.
pub fn calc_rate(base_rate: Decimal, floor: Decimal, max: Decimal) -> Decimal {
    (floor + base_rate).min(max)
}

pub fn calc_fee(rate: Decimal, amount: Decimal) -> Decimal {
    rate * amount
}
