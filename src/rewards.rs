//! # Reward redistribution
//!
//! When a liquidated den cannot be absorbed elsewhere, its debt and collateral are spread over
//! all remaining dens pro rata to stake. Instead of touching every den, two accumulators
//! (`l_collateral`, `l_debt`) grow by the reward per unit of stake; each den catches up on its
//! share the next time it is touched by comparing its snapshot against the accumulators.
//!
//! Per-unit rewards are floored to 18 decimals. The floored-away remainder is carried into the
//! next redistribution, so the cumulative loss stays below one atto per unit of stake.

use crate::errors::DenError;
use crate::math::*;
use crate::shared_structs::*;
use scrypto::prelude::*;

#[derive(ScryptoSbor, PartialEq, Clone, Debug)]
pub struct RewardLedger {
    /// Collateral reward per unit of stake, accumulated over all redistributions.
    pub l_collateral: Decimal,
    /// Debt reward per unit of stake, accumulated over all redistributions.
    pub l_debt: Decimal,
    pub last_collateral_error: PreciseDecimal,
    pub last_debt_error: PreciseDecimal,
    pub total_stakes: Decimal,
    /// `total_stakes` as of the last liquidation.
    pub total_stakes_snapshot: Decimal,
    /// Total system collateral as of the last liquidation.
    pub total_collateral_snapshot: Decimal,
}

/// Per-unit increments produced by one redistribution.
#[derive(PartialEq, Clone, Copy, Debug)]
pub struct Redistribution {
    pub collateral_per_unit: Decimal,
    pub debt_per_unit: Decimal,
}

impl RewardLedger {
    pub fn new() -> Self {
        Self {
            l_collateral: Decimal::ZERO,
            l_debt: Decimal::ZERO,
            last_collateral_error: PreciseDecimal::ZERO,
            last_debt_error: PreciseDecimal::ZERO,
            total_stakes: Decimal::ZERO,
            total_stakes_snapshot: Decimal::ZERO,
            total_collateral_snapshot: Decimal::ZERO,
        }
    }

    pub fn snapshot(&self) -> RewardSnapshot {
        RewardSnapshot {
            collateral: self.l_collateral,
            debt: self.l_debt,
        }
    }

    /// Spreads `(debt, coll)` over the current total stakes.
    ///
    /// Returns `None` when there is no debt to redistribute.
    pub fn redistribute(
        &mut self,
        debt: Decimal,
        coll: Decimal,
    ) -> Result<Option<Redistribution>, DenError> {
        if debt == Decimal::ZERO {
            return Ok(None);
        }
        if self.total_stakes == Decimal::ZERO {
            return Err(DenError::NoStakes);
        }

        let stakes = PreciseDecimal::from(self.total_stakes);

        let collateral_numerator = PreciseDecimal::from(coll) + self.last_collateral_error;
        let debt_numerator = PreciseDecimal::from(debt) + self.last_debt_error;

        let collateral_per_unit = truncate(collateral_numerator / stakes);
        let debt_per_unit = truncate(debt_numerator / stakes);

        self.last_collateral_error =
            collateral_numerator - PreciseDecimal::from(collateral_per_unit) * stakes;
        self.last_debt_error = debt_numerator - PreciseDecimal::from(debt_per_unit) * stakes;

        self.l_collateral += collateral_per_unit;
        self.l_debt += debt_per_unit;

        Ok(Some(Redistribution {
            collateral_per_unit,
            debt_per_unit,
        }))
    }

    /// Stake for a den holding `coll`, rebased on the last liquidation snapshot.
    pub fn compute_stake(&self, coll: Decimal) -> Decimal {
        if self.total_collateral_snapshot == Decimal::ZERO {
            coll
        } else {
            mul_div(coll, self.total_stakes_snapshot, self.total_collateral_snapshot)
        }
    }

    /// Replaces `old_stake` by a freshly computed stake in the total. Returns the new stake.
    pub fn update_stake(&mut self, old_stake: Decimal, coll: Decimal) -> Decimal {
        let new_stake = self.compute_stake(coll);
        self.total_stakes = self.total_stakes - old_stake + new_stake;
        new_stake
    }

    pub fn remove_stake(&mut self, stake: Decimal) {
        self.total_stakes -= stake;
    }

    /// Records the system state after a liquidation, used to rebase future stakes.
    pub fn update_system_snapshots(&mut self, total_collateral: Decimal) {
        self.total_stakes_snapshot = self.total_stakes;
        self.total_collateral_snapshot = total_collateral;
    }
}

/// `(collateral, debt)` owed to a den with `stake` whose last catch-up was at `snapshot`.
pub fn pending_rewards(
    l_collateral: Decimal,
    l_debt: Decimal,
    snapshot: &RewardSnapshot,
    stake: Decimal,
) -> (Decimal, Decimal) {
    let pending_collateral = if l_collateral > snapshot.collateral {
        stake * (l_collateral - snapshot.collateral)
    } else {
        Decimal::ZERO
    };
    let pending_debt = if l_debt > snapshot.debt {
        stake * (l_debt - snapshot.debt)
    } else {
        Decimal::ZERO
    };

    (pending_collateral, pending_debt)
}
