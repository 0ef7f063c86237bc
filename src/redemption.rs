//! # Redemption
//!
//! Exchanges debt tokens for collateral at face value, drawn from the riskiest dens whose
//! collateral ratio is still at least 100%. Dens are fully redeemed down to their gas
//! compensation, in which case they are closed and their remaining collateral becomes surplus,
//! or partially redeemed and moved to their new position in the sorted list.
//!
//! A partial redemption comes with a NICR hint computed off-ledger. If the den's resulting NICR
//! has drifted from it, or the den would end up below the minimum net debt, the partial step is
//! skipped and the redemption ends with what was redeemed so far.

use crate::den_ledger::{calc_redemption_fee, listed_nicr, DenLedger};
use crate::errors::DenError;
use crate::events::*;
use crate::math::*;
use crate::shared_structs::*;
use scrypto::prelude::*;

/// Iterations used when the caller passes zero.
pub const DEFAULT_MAX_ITERATIONS: u64 = 100;

/// Largest accepted gap between a partial redemption hint and the den's resulting NICR.
///
/// Absolute, in NICR units (`coll * 100 / debt`).
pub const PARTIAL_HINT_TOLERANCE: Decimal = dec!("0.0005");

/// Whether `hint` is within [`PARTIAL_HINT_TOLERANCE`] of the den's resulting NICR.
pub fn is_valid_partial_hint(new_nicr: Decimal, hint: Decimal) -> bool {
    abs_diff(new_nicr, hint) <= PARTIAL_HINT_TOLERANCE
}

#[derive(ScryptoSbor, Clone, Debug)]
pub struct RedemptionRequest {
    pub debt_amount: Decimal,
    /// Riskiest den with a collateral ratio of at least 100%, if the caller knows it.
    pub first_redemption_hint: Option<DenId>,
    pub upper_partial_redemption_hint: Option<DenId>,
    pub lower_partial_redemption_hint: Option<DenId>,
    pub partial_redemption_hint_nicr: Decimal,
    /// Zero means [`DEFAULT_MAX_ITERATIONS`].
    pub max_iterations: u64,
    pub max_fee_percentage: Decimal,
    /// Debt tokens the redeemer holds.
    pub available_debt: Decimal,
}

/// Outcome of a redemption. The caller burns `total_debt_to_redeem` from the redeemer and
/// `gas_compensation_to_burn` from the gas pool, and pays out `collateral_to_redeemer`.
#[derive(ScryptoSbor, PartialEq, Clone, Debug)]
pub struct RedemptionTotals {
    pub total_debt_to_redeem: Decimal,
    pub total_collateral_drawn: Decimal,
    pub collateral_fee: Decimal,
    pub collateral_to_redeemer: Decimal,
    pub gas_compensation_to_burn: Decimal,
    pub dens_redeemed: u64,
    pub cancelled_partial: bool,
}

#[derive(Clone, Copy, Debug)]
struct SingleRedemption {
    debt_lot: Decimal,
    collateral_lot: Decimal,
    gas_compensation: Decimal,
    cancelled_partial: bool,
}

impl DenLedger {
    /// Redeems `request.debt_amount` of debt against the riskiest dens at `price`.
    pub fn redeem_collateral(
        &mut self,
        request: RedemptionRequest,
        price: Decimal,
        now: i64,
    ) -> Result<RedemptionTotals, DenError> {
        if request.max_fee_percentage < self.parameters.redemption_fee_floor
            || request.max_fee_percentage > Decimal::ONE
        {
            return Err(DenError::InvalidMaxFee);
        }
        if now < self.system_deployment_time + self.parameters.bootstrap_period {
            return Err(DenError::BootstrapPeriod);
        }
        if self.tcr(price, now) < self.parameters.mcr {
            return Err(DenError::TcrBelowMcr);
        }
        if request.debt_amount <= Decimal::ZERO {
            return Err(DenError::ZeroAmount);
        }
        if request.available_debt < request.debt_amount {
            return Err(DenError::InsufficientBalance);
        }

        self.accrue_active_interests(now);
        let total_debt_supply_at_start = self.entire_system_debt(now);

        let mut totals = RedemptionTotals {
            total_debt_to_redeem: Decimal::ZERO,
            total_collateral_drawn: Decimal::ZERO,
            collateral_fee: Decimal::ZERO,
            collateral_to_redeemer: Decimal::ZERO,
            gas_compensation_to_burn: Decimal::ZERO,
            dens_redeemed: 0,
            cancelled_partial: false,
        };
        let mut remaining_debt = request.debt_amount;

        let mut current = match &request.first_redemption_hint {
            Some(hint) if self.is_valid_first_redemption_hint(hint, price, now) => {
                Some(hint.clone())
            }
            _ => {
                let mut candidate = self.sorted_dens.last();
                while let Some(id) = candidate.clone() {
                    if self.current_icr(&id, price, now) >= Decimal::ONE {
                        break;
                    }
                    candidate = self.sorted_dens.prev(&id);
                }
                candidate
            }
        };

        let max_iterations = if request.max_iterations == 0 {
            DEFAULT_MAX_ITERATIONS
        } else {
            request.max_iterations
        };
        let mut iterations = 0;

        loop {
            let Some(borrower) = current.clone() else {
                break;
            };
            if remaining_debt <= Decimal::ZERO || iterations >= max_iterations {
                break;
            }
            iterations += 1;

            // Fetched before the den may be closed or moved
            let next = self.sorted_dens.prev(&borrower);

            self.apply_pending_rewards(&borrower, now)?;

            let single = self.redeem_collateral_from_den(
                &borrower,
                remaining_debt,
                price,
                &request,
            )?;
            if single.cancelled_partial {
                totals.cancelled_partial = true;
                break;
            }

            totals.total_debt_to_redeem += single.debt_lot;
            totals.total_collateral_drawn += single.collateral_lot;
            totals.gas_compensation_to_burn += single.gas_compensation;
            totals.dens_redeemed += 1;
            remaining_debt -= single.debt_lot;

            current = next;
        }

        if totals.total_collateral_drawn <= Decimal::ZERO {
            return Err(DenError::UnableToRedeem);
        }

        totals.collateral_fee = if self.sunsetting {
            Decimal::ZERO
        } else {
            let base_rate = self.fees.update_base_rate_from_redemption(
                self.parameters.minute_decay_factor,
                totals.total_collateral_drawn,
                price,
                total_debt_supply_at_start,
                now,
            );
            self.record(LedgerEvent::BaseRateUpdated(EventBaseRateUpdated { base_rate }));
            self.update_last_fee_op_time(now);

            calc_redemption_fee(self.redemption_rate(), totals.total_collateral_drawn)?
        };

        let fee_percentage = totals.collateral_fee / totals.total_collateral_drawn;
        if fee_percentage > request.max_fee_percentage {
            return Err(DenError::FeeExceedsMaximum);
        }

        self.send_collateral(totals.collateral_fee);
        totals.collateral_to_redeemer = totals.total_collateral_drawn - totals.collateral_fee;

        self.record(LedgerEvent::Redemption(EventRedemption {
            attempted_debt_amount: request.debt_amount,
            actual_debt_amount: totals.total_debt_to_redeem,
            collateral_sent: totals.total_collateral_drawn,
            collateral_fee: totals.collateral_fee,
        }));

        self.total_active_debt -= totals.total_debt_to_redeem;
        self.send_collateral(totals.collateral_to_redeemer);
        self.reset_state(now);

        Ok(totals)
    }

    /// Whether `hint` is the riskiest den with a collateral ratio of at least 100%.
    pub fn is_valid_first_redemption_hint(&self, hint: &DenId, price: Decimal, now: i64) -> bool {
        if !self.sorted_dens.contains(hint) || self.current_icr(hint, price, now) < Decimal::ONE {
            return false;
        }

        match self.sorted_dens.next(hint) {
            None => true,
            Some(riskier) => self.current_icr(&riskier, price, now) < Decimal::ONE,
        }
    }

    // Redeems up to `max_debt` from one den whose pending rewards are already applied.
    fn redeem_collateral_from_den(
        &mut self,
        borrower: &DenId,
        max_debt: Decimal,
        price: Decimal,
        request: &RedemptionRequest,
    ) -> Result<SingleRedemption, DenError> {
        let Some(den) = self.den(borrower) else {
            return Err(DenError::DenNotActive);
        };
        let gas_compensation = self.parameters.debt_gas_compensation;

        let debt_lot = max_debt.min(den.debt - gas_compensation);
        let collateral_lot = debt_lot / price;

        let new_debt = den.debt - debt_lot;
        let new_coll = den.coll - collateral_lot;

        if new_debt == gas_compensation {
            // Only the gas compensation is left, burned from the gas pool
            self.remove_stake(borrower);
            self.close_den(borrower, DenStatus::ClosedByRedemption)?;

            self.total_active_debt -= gas_compensation;
            self.send_collateral(new_coll);
            self.add_collateral_surplus(borrower.clone(), new_coll);

            self.record(LedgerEvent::DenUpdated(EventDenUpdated {
                den_id: borrower.clone(),
                debt: Decimal::ZERO,
                coll: Decimal::ZERO,
                stake: Decimal::ZERO,
                operation: DenOperation::RedeemCollateral,
            }));

            return Ok(SingleRedemption {
                debt_lot,
                collateral_lot,
                gas_compensation,
                cancelled_partial: false,
            });
        }

        let new_nicr = compute_nominal_cr(new_coll, new_debt);
        if !is_valid_partial_hint(new_nicr, request.partial_redemption_hint_nicr)
            || new_debt - gas_compensation < self.parameters.min_net_debt
        {
            return Ok(SingleRedemption {
                debt_lot: Decimal::ZERO,
                collateral_lot: Decimal::ZERO,
                gas_compensation: Decimal::ZERO,
                cancelled_partial: true,
            });
        }

        self.update_den(borrower, |den| {
            den.debt = new_debt;
            den.coll = new_coll;
        });

        let dens = &self.dens;
        let rewards = &self.rewards;
        let interest = &self.interest;
        self.sorted_dens.re_insert(
            borrower.clone(),
            new_nicr,
            request.upper_partial_redemption_hint.clone(),
            request.lower_partial_redemption_hint.clone(),
            &|id| listed_nicr(dens, rewards, interest, id),
        )?;

        let new_stake = self.update_stake_and_total_stakes(borrower);

        self.record(LedgerEvent::DenUpdated(EventDenUpdated {
            den_id: borrower.clone(),
            debt: new_debt,
            coll: new_coll,
            stake: new_stake,
            operation: DenOperation::RedeemCollateral,
        }));

        Ok(SingleRedemption {
            debt_lot,
            collateral_lot,
            gas_compensation: Decimal::ZERO,
            cancelled_partial: false,
        })
    }
}
