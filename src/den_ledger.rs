//! # Den ledger
//!
//! `DenLedger` is the complete accounting state of one collateral market. It is a plain
//! struct: every operation takes the current time (and price, where needed) explicitly and
//! returns what should happen to tokens instead of moving them. The `DenManager` blueprint owns
//! one of these and executes the token movements afterwards.
//!
//! ## Lifecycle
//! `open` creates an active den, `adjust` mutates it, and `close`, `close_by_liquidation` or a
//! full redemption terminate it. Pending interest and redistribution rewards are applied
//! lazily whenever a den is touched. When the last den leaves, the global accumulators are
//! reset.

use crate::den_owners::DenOwners;
use crate::den_store::*;
use crate::errors::DenError;
use crate::events::*;
use crate::fees::*;
use crate::interest::InterestState;
use crate::math::*;
use crate::rewards::{pending_rewards, RewardLedger};
use crate::shared_structs::*;
use crate::sorted_dens::SortedDens;
use scrypto::prelude::*;

/// Yearly interest charged once a market is sunsetting.
pub const SUNSETTING_INTEREST_RATE_BPS: u64 = 5_000;

/// A debt or collateral change requested by borrower operations.
#[derive(ScryptoSbor, Clone, Debug)]
pub struct DenAdjustment {
    pub is_debt_increase: bool,
    /// Debt minted to (or burned from) the borrower.
    pub debt_change: Decimal,
    /// Debt added to the den on an increase, including the borrowing fee. Unused on repayment.
    pub net_debt_change: Decimal,
    pub is_coll_increase: bool,
    pub coll_change: Decimal,
    pub upper_hint: Option<DenId>,
    pub lower_hint: Option<DenId>,
}

#[derive(ScryptoSbor, PartialEq, Clone, Copy, Debug)]
pub struct AdjustedDen {
    pub new_coll: Decimal,
    pub new_debt: Decimal,
    pub new_stake: Decimal,
}

#[derive(ScryptoSbor)]
pub struct DenLedger {
    pub parameters: DenManagerParameters,
    /// Every den ever opened. Closed dens keep their final status with zeroed balances.
    pub dens: DenStore<DenId, Den>,
    pub sorted_dens: SortedDens,
    pub den_owners: DenOwners,
    /// Collateral left over from fully redeemed or liquidated dens, claimable by the borrower.
    pub surplus_balances: DenStore<DenId, Decimal>,
    pub interest: InterestState,
    pub rewards: RewardLedger,
    pub fees: FeeState,
    pub total_active_collateral: Decimal,
    /// Debt of active dens, excluding interest not accrued yet.
    pub total_active_debt: Decimal,
    /// Redistributed collateral not yet applied to any den.
    pub defaulted_collateral: Decimal,
    /// Redistributed debt not yet applied to any den.
    pub defaulted_debt: Decimal,
    /// A protocol-owned den that never accrues interest.
    pub interest_exempt_den: Option<DenId>,
    pub paused: bool,
    pub sunsetting: bool,
    pub system_deployment_time: i64,
    journal: Vec<LedgerEvent>,
}

impl DenLedger {
    pub fn new(parameters: DenManagerParameters, now: i64) -> Self {
        let mut interest = InterestState::new(now);
        interest.rate = InterestState::rate_from_bps(parameters.interest_rate_in_bps);

        Self {
            parameters,
            dens: DenStore::new(),
            sorted_dens: SortedDens::new(),
            den_owners: DenOwners::new(),
            surplus_balances: DenStore::new(),
            interest,
            rewards: RewardLedger::new(),
            fees: FeeState::new(now),
            total_active_collateral: Decimal::ZERO,
            total_active_debt: Decimal::ZERO,
            defaulted_collateral: Decimal::ZERO,
            defaulted_debt: Decimal::ZERO,
            interest_exempt_den: None,
            paused: false,
            sunsetting: false,
            system_deployment_time: now,
            journal: Vec::new(),
        }
    }

    /// Hands out the events recorded since the last call.
    pub fn take_journal(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.journal)
    }

    pub(crate) fn record(&mut self, event: LedgerEvent) {
        self.journal.push(event);
    }

    //LIFECYCLE

    /// Opens a den for `borrower` and returns its stake and owner array slot.
    pub fn open(
        &mut self,
        borrower: DenId,
        coll: Decimal,
        composite_debt: Decimal,
        nicr: Decimal,
        upper_hint: Option<DenId>,
        lower_hint: Option<DenId>,
        now: i64,
    ) -> Result<(Decimal, u64), DenError> {
        if self.paused {
            return Err(DenError::Paused);
        }
        if self.sunsetting {
            return Err(DenError::Sunsetting);
        }
        if self.den_status(&borrower) == DenStatus::Active {
            return Err(DenError::DenActive);
        }
        if nicr <= Decimal::ZERO {
            return Err(DenError::ZeroNominalCr);
        }

        let current_index = self.accrue_active_interests(now);

        let new_total_debt = self.total_active_debt + composite_debt;
        if new_total_debt + self.defaulted_debt > self.parameters.max_system_debt {
            return Err(DenError::DebtLimitReached);
        }

        let den_index = if self.interest_exempt_den.as_ref() == Some(&borrower) {
            PreciseDecimal::ZERO
        } else {
            current_index
        };

        self.dens.insert(
            borrower.clone(),
            Den {
                debt: composite_debt,
                coll,
                stake: Decimal::ZERO,
                status: DenStatus::Active,
                array_index: 0,
                active_interest_index: den_index,
                reward_snapshot: RewardSnapshot::ZERO,
            },
        );
        self.update_den_reward_snapshots(&borrower);
        let stake = self.update_stake_and_total_stakes(&borrower);

        let dens = &self.dens;
        let rewards = &self.rewards;
        let interest = &self.interest;
        self.sorted_dens.insert(
            borrower.clone(),
            nicr,
            upper_hint,
            lower_hint,
            &|id| listed_nicr(dens, rewards, interest, id),
        )?;

        let array_index = self.den_owners.push(borrower.clone());
        self.update_den(&borrower, |den| den.array_index = array_index);

        self.total_active_collateral += coll;
        self.total_active_debt = new_total_debt;

        self.record(LedgerEvent::DenUpdated(EventDenUpdated {
            den_id: borrower,
            debt: composite_debt,
            coll,
            stake,
            operation: DenOperation::Open,
        }));

        Ok((stake, array_index))
    }

    /// Applies a borrower's debt and collateral changes to an active den.
    pub fn adjust(
        &mut self,
        borrower: DenId,
        adjustment: &DenAdjustment,
        now: i64,
    ) -> Result<AdjustedDen, DenError> {
        if adjustment.is_coll_increase || adjustment.is_debt_increase {
            if self.paused {
                return Err(DenError::Paused);
            }
            if self.sunsetting {
                return Err(DenError::Sunsetting);
            }
        }
        if self.den_status(&borrower) != DenStatus::Active {
            return Err(DenError::DenNotActive);
        }

        let (mut new_coll, mut new_debt) = self.apply_pending_rewards(&borrower, now)?;

        if adjustment.debt_change > Decimal::ZERO {
            if adjustment.is_debt_increase {
                let new_total_debt = self.total_active_debt + adjustment.net_debt_change;
                if new_total_debt + self.defaulted_debt > self.parameters.max_system_debt {
                    return Err(DenError::DebtLimitReached);
                }
                self.total_active_debt = new_total_debt;
                new_debt += adjustment.net_debt_change;
            } else {
                // Repayments carry no fee, the den and the total drop by the burned amount
                if adjustment.debt_change > new_debt {
                    return Err(DenError::InsufficientBalance);
                }
                self.total_active_debt -= adjustment.debt_change;
                new_debt -= adjustment.debt_change;
            }
        }

        if adjustment.coll_change > Decimal::ZERO {
            if adjustment.is_coll_increase {
                self.total_active_collateral += adjustment.coll_change;
                new_coll += adjustment.coll_change;
            } else {
                if adjustment.coll_change > new_coll {
                    return Err(DenError::InsufficientBalance);
                }
                self.send_collateral(adjustment.coll_change);
                new_coll -= adjustment.coll_change;
            }
        }

        self.update_den(&borrower, |den| {
            den.debt = new_debt;
            den.coll = new_coll;
        });

        let new_nicr = compute_nominal_cr(new_coll, new_debt);
        let dens = &self.dens;
        let rewards = &self.rewards;
        let interest = &self.interest;
        self.sorted_dens.re_insert(
            borrower.clone(),
            new_nicr,
            adjustment.upper_hint.clone(),
            adjustment.lower_hint.clone(),
            &|id| listed_nicr(dens, rewards, interest, id),
        )?;

        let new_stake = self.update_stake_and_total_stakes(&borrower);

        self.record(LedgerEvent::DenUpdated(EventDenUpdated {
            den_id: borrower,
            debt: new_debt,
            coll: new_coll,
            stake: new_stake,
            operation: DenOperation::Adjust,
        }));

        Ok(AdjustedDen {
            new_coll,
            new_debt,
            new_stake,
        })
    }

    /// Closes a den on behalf of its owner.
    ///
    /// `coll_amount` and `debt_amount` are the den's entire balances, as returned by
    /// [`Self::apply_pending_rewards`]; the collateral is sent back to the owner.
    pub fn close(
        &mut self,
        borrower: DenId,
        coll_amount: Decimal,
        debt_amount: Decimal,
        now: i64,
    ) -> Result<(), DenError> {
        if self.den_status(&borrower) != DenStatus::Active {
            return Err(DenError::DenNotActive);
        }

        self.remove_stake(&borrower);
        self.close_den(&borrower, DenStatus::ClosedByOwner)?;

        self.total_active_debt -= debt_amount;
        self.send_collateral(coll_amount);
        self.reset_state(now);

        self.record(LedgerEvent::DenUpdated(EventDenUpdated {
            den_id: borrower,
            debt: Decimal::ZERO,
            coll: Decimal::ZERO,
            stake: Decimal::ZERO,
            operation: DenOperation::Close,
        }));

        Ok(())
    }

    /// Closes a den the liquidation manager has decided to liquidate.
    pub fn close_by_liquidation(&mut self, borrower: DenId) -> Result<(), DenError> {
        if self.den_status(&borrower) != DenStatus::Active {
            return Err(DenError::DenNotActive);
        }

        self.remove_stake(&borrower);
        self.close_den(&borrower, DenStatus::ClosedByLiquidation)?;

        self.record(LedgerEvent::DenUpdated(EventDenUpdated {
            den_id: borrower,
            debt: Decimal::ZERO,
            coll: Decimal::ZERO,
            stake: Decimal::ZERO,
            operation: DenOperation::Liquidate,
        }));

        Ok(())
    }

    /// Brings an active den up to date with accrued interest and redistribution rewards.
    ///
    /// Returns the den's `(coll, debt)`; zero for a den that is not active.
    pub fn apply_pending_rewards(
        &mut self,
        borrower: &DenId,
        now: i64,
    ) -> Result<(Decimal, Decimal), DenError> {
        if self.den_status(borrower) != DenStatus::Active {
            return Ok((Decimal::ZERO, Decimal::ZERO));
        }

        let current_index = self.accrue_active_interests(now);
        let snapshot = self.rewards.snapshot();

        let Some(mut den) = self.den(borrower) else {
            return Ok((Decimal::ZERO, Decimal::ZERO));
        };

        let mut coll = den.coll;
        let mut debt = den.debt;

        if den.active_interest_index > PreciseDecimal::ZERO
            && den.active_interest_index < current_index
        {
            debt = truncate(PreciseDecimal::from(debt) * current_index / den.active_interest_index);
            den.active_interest_index = current_index;
        }

        let mut applied = None;
        if den.reward_snapshot.collateral < snapshot.collateral
            || den.reward_snapshot.debt < snapshot.debt
        {
            let (pending_coll, pending_debt) = pending_rewards(
                snapshot.collateral,
                snapshot.debt,
                &den.reward_snapshot,
                den.stake,
            );
            coll += pending_coll;
            debt += pending_debt;
            den.reward_snapshot = snapshot;
            applied = Some((pending_coll, pending_debt, den.stake));
        }

        den.coll = coll;
        den.debt = debt;
        self.dens.insert(borrower.clone(), den);

        if let Some((pending_coll, pending_debt, stake)) = applied {
            self.record(LedgerEvent::DenSnapshotsUpdated(EventDenSnapshotsUpdated {
                den_id: borrower.clone(),
                l_collateral: snapshot.collateral,
                l_debt: snapshot.debt,
            }));
            self.move_pending_rewards_to_active(pending_debt, pending_coll)?;
            self.record(LedgerEvent::DenUpdated(EventDenUpdated {
                den_id: borrower.clone(),
                debt,
                coll,
                stake,
                operation: DenOperation::ApplyPendingRewards,
            }));
        }

        Ok((coll, debt))
    }

    /// Moves redistributed balances that have been attributed to a den back into the active totals.
    pub fn move_pending_rewards_to_active(
        &mut self,
        debt: Decimal,
        coll: Decimal,
    ) -> Result<(), DenError> {
        if debt > self.defaulted_debt || coll > self.defaulted_collateral {
            return Err(DenError::DefaultedUnderflow);
        }

        self.defaulted_debt -= debt;
        self.total_active_debt += debt;
        self.defaulted_collateral -= coll;
        self.total_active_collateral += coll;

        Ok(())
    }

    //LIQUIDATION SUPPORT

    /// Credits collateral to a borrower's claimable surplus.
    pub fn add_collateral_surplus(&mut self, borrower: DenId, amount: Decimal) {
        let balance = self.surplus_balance(&borrower);
        self.surplus_balances.insert(borrower, balance + amount);
    }

    /// Settles the system side of a liquidation batch.
    ///
    /// Redistributes `(debt, coll)` over the remaining stakes, takes the surplus out of the
    /// active collateral, rebases the stake snapshots and releases the collateral gas
    /// compensation. The debt gas compensation is returned from the gas pool by the caller.
    pub fn finalize_liquidation(
        &mut self,
        debt: Decimal,
        coll: Decimal,
        coll_surplus: Decimal,
        coll_gas_compensation: Decimal,
    ) -> Result<(), DenError> {
        self.redistribute_debt_and_coll(debt, coll)?;

        if coll_surplus > Decimal::ZERO {
            self.total_active_collateral -= coll_surplus;
        }

        let total_collateral =
            self.total_active_collateral - coll_gas_compensation + self.defaulted_collateral;
        self.rewards.update_system_snapshots(total_collateral);
        self.record(LedgerEvent::SystemSnapshotsUpdated(EventSystemSnapshotsUpdated {
            total_stakes_snapshot: self.rewards.total_stakes_snapshot,
            total_collateral_snapshot: self.rewards.total_collateral_snapshot,
        }));

        self.send_collateral(coll_gas_compensation);

        Ok(())
    }

    /// Spreads `(debt, coll)` over all stakes and moves them into the defaulted balances.
    pub fn redistribute_debt_and_coll(
        &mut self,
        debt: Decimal,
        coll: Decimal,
    ) -> Result<(), DenError> {
        if self.rewards.redistribute(debt, coll)?.is_none() {
            return Ok(());
        }

        self.record(LedgerEvent::LTermsUpdated(EventLTermsUpdated {
            l_collateral: self.rewards.l_collateral,
            l_debt: self.rewards.l_debt,
        }));

        self.total_active_debt -= debt;
        self.defaulted_debt += debt;
        self.total_active_collateral -= coll;
        self.defaulted_collateral += coll;

        Ok(())
    }

    /// Accounts for debt offset by the stability pool and the collateral it receives.
    pub fn decrease_debt_and_send_collateral(&mut self, debt: Decimal, coll: Decimal) {
        self.total_active_debt -= debt;
        self.send_collateral(coll);
    }

    /// Zeroes a borrower's surplus and returns the amount to hand out.
    pub fn claim_collateral(&mut self, borrower: &DenId) -> Result<Decimal, DenError> {
        let amount = self.surplus_balance(borrower);
        if amount <= Decimal::ZERO {
            return Err(DenError::NoSurplus);
        }

        self.surplus_balances.remove(borrower);
        self.record(LedgerEvent::CollateralClaimed(EventCollateralClaimed {
            den_id: borrower.clone(),
            amount,
        }));

        Ok(amount)
    }

    /// Accrues interest and returns everything payable to the protocol, zeroing it.
    pub fn collect_interests(&mut self, now: i64) -> Result<Decimal, DenError> {
        self.accrue_active_interests(now);

        let payable = self.interest.payable;
        if payable <= Decimal::ZERO {
            return Err(DenError::NothingToCollect);
        }

        self.interest.payable = Decimal::ZERO;
        self.record(LedgerEvent::InterestCollected(EventInterestCollected {
            amount: payable,
        }));

        Ok(payable)
    }

    //FEES

    pub fn redemption_rate(&self) -> Decimal {
        calc_rate(
            self.fees.base_rate,
            self.parameters.redemption_fee_floor,
            self.parameters.max_redemption_fee,
        )
    }

    pub fn redemption_rate_with_decay(&self, now: i64) -> Decimal {
        calc_rate(
            self.fees
                .decayed_base_rate(self.parameters.minute_decay_factor, now),
            self.parameters.redemption_fee_floor,
            self.parameters.max_redemption_fee,
        )
    }

    pub fn redemption_fee_with_decay(
        &self,
        collateral_drawn: Decimal,
        now: i64,
    ) -> Result<Decimal, DenError> {
        calc_redemption_fee(self.redemption_rate_with_decay(now), collateral_drawn)
    }

    pub fn borrowing_rate(&self) -> Decimal {
        calc_rate(
            self.fees.base_rate,
            self.parameters.borrowing_fee_floor,
            self.parameters.max_borrowing_fee,
        )
    }

    pub fn borrowing_rate_with_decay(&self, now: i64) -> Decimal {
        calc_rate(
            self.fees
                .decayed_base_rate(self.parameters.minute_decay_factor, now),
            self.parameters.borrowing_fee_floor,
            self.parameters.max_borrowing_fee,
        )
    }

    pub fn borrowing_fee(&self, debt: Decimal) -> Decimal {
        calc_fee(self.borrowing_rate(), debt)
    }

    pub fn borrowing_fee_with_decay(&self, debt: Decimal, now: i64) -> Decimal {
        calc_fee(self.borrowing_rate_with_decay(now), debt)
    }

    /// Persists the decayed base rate and returns the borrowing fee on `debt`.
    pub fn decay_base_rate_and_get_borrowing_fee(&mut self, debt: Decimal, now: i64) -> Decimal {
        let decayed = self.decay_base_rate(now);
        calc_fee(
            calc_rate(
                decayed,
                self.parameters.borrowing_fee_floor,
                self.parameters.max_borrowing_fee,
            ),
            debt,
        )
    }

    pub(crate) fn decay_base_rate(&mut self, now: i64) -> Decimal {
        let decayed = self
            .fees
            .decay_base_rate(self.parameters.minute_decay_factor, now);
        self.record(LedgerEvent::BaseRateUpdated(EventBaseRateUpdated {
            base_rate: decayed,
        }));
        self.update_last_fee_op_time(now);
        decayed
    }

    pub(crate) fn update_last_fee_op_time(&mut self, now: i64) {
        if let Some(time) = self.fees.update_last_fee_op_time(now) {
            self.record(LedgerEvent::LastFeeOpTimeUpdated(EventLastFeeOpTimeUpdated {
                last_fee_operation_time: time,
            }));
        }
    }

    //ADMIN

    /// Validates and applies a new parameter set.
    pub fn set_parameters(
        &mut self,
        parameters: DenManagerParameters,
        now: i64,
    ) -> Result<(), DenError> {
        if self.sunsetting {
            return Err(DenError::Sunsetting);
        }
        if parameters.mcr > dec!("1.5") || parameters.mcr < dec!("1.1") {
            return Err(DenError::InvalidMcr);
        }
        if parameters.minute_decay_factor < dec!("0.977159968434245")
            || parameters.minute_decay_factor > dec!("0.999931237762985")
        {
            return Err(DenError::InvalidDecayFactor);
        }
        if parameters.redemption_fee_floor > parameters.max_redemption_fee
            || parameters.max_redemption_fee > Decimal::ONE
        {
            return Err(DenError::InvalidRedemptionFee);
        }
        if parameters.borrowing_fee_floor > parameters.max_borrowing_fee
            || parameters.max_borrowing_fee > Decimal::ONE
        {
            return Err(DenError::InvalidBorrowingFee);
        }
        // Every open den holds a gas pool reserve minted at the current value
        if parameters.debt_gas_compensation != self.parameters.debt_gas_compensation
            && !self.den_owners.is_empty()
        {
            return Err(DenError::GasCompensationLocked);
        }

        self.decay_base_rate(now);

        let new_rate = InterestState::rate_from_bps(parameters.interest_rate_in_bps);
        if new_rate != self.interest.rate {
            self.accrue_active_interests(now);
            // accrual leaves the clock alone when the old rate was zero
            self.interest.last_update = now;
            self.interest.rate = new_rate;
        }

        self.parameters = parameters.clone();
        self.record(LedgerEvent::ParametersUpdated(EventParametersUpdated { parameters }));

        Ok(())
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Puts the market into its terminal wind-down mode.
    pub fn start_sunset(&mut self, now: i64) {
        self.sunsetting = true;
        self.accrue_active_interests(now);

        self.interest.rate = InterestState::rate_from_bps(SUNSETTING_INTEREST_RATE_BPS);
        self.interest.last_update = now;

        self.parameters.interest_rate_in_bps = SUNSETTING_INTEREST_RATE_BPS;
        self.parameters.redemption_fee_floor = Decimal::ZERO;
        self.parameters.max_system_debt = Decimal::ZERO;

        self.record(LedgerEvent::SunsetStarted(EventSunsetStarted { timestamp: now }));
    }

    /// Sets the den that is exempt from interest. Neither the old nor the new den may be active.
    pub fn set_interest_exempt_den(&mut self, den: Option<DenId>) -> Result<(), DenError> {
        let current_active = self
            .interest_exempt_den
            .as_ref()
            .map_or(false, |id| self.den_status(id) == DenStatus::Active);
        let new_active = den
            .as_ref()
            .map_or(false, |id| self.den_status(id) == DenStatus::Active);
        if current_active || new_active {
            return Err(DenError::ExemptDenActive);
        }

        self.interest_exempt_den = den;
        Ok(())
    }

    //GETTERS

    pub fn den_status(&self, borrower: &DenId) -> DenStatus {
        self.den(borrower)
            .map_or(DenStatus::NonExistent, |den| den.status)
    }

    /// Pending `(collateral, debt)` rewards of a den, zero if it is not active.
    pub fn pending_rewards(&self, borrower: &DenId) -> (Decimal, Decimal) {
        match self.den(borrower) {
            Some(den) if den.status == DenStatus::Active => pending_rewards(
                self.rewards.l_collateral,
                self.rewards.l_debt,
                &den.reward_snapshot,
                den.stake,
            ),
            _ => (Decimal::ZERO, Decimal::ZERO),
        }
    }

    pub fn has_pending_rewards(&self, borrower: &DenId) -> bool {
        match self.den(borrower) {
            Some(den) if den.status == DenStatus::Active => {
                den.reward_snapshot.collateral < self.rewards.l_collateral
                    || den.reward_snapshot.debt < self.rewards.l_debt
            }
            _ => false,
        }
    }

    /// A den's debt and collateral with pending rewards and interest up to `now`.
    pub fn entire_debt_and_coll(&self, borrower: &DenId, now: i64) -> EntireDebtAndColl {
        let Some(den) = self.den(borrower) else {
            return EntireDebtAndColl {
                debt: Decimal::ZERO,
                coll: Decimal::ZERO,
                pending_debt_reward: Decimal::ZERO,
                pending_coll_reward: Decimal::ZERO,
            };
        };

        let (pending_coll, pending_debt) = self.pending_rewards(borrower);
        let debt = self
            .interest
            .project_at(den.debt, den.active_interest_index, now);

        EntireDebtAndColl {
            debt: debt + pending_debt,
            coll: den.coll + pending_coll,
            pending_debt_reward: pending_debt,
            pending_coll_reward: pending_coll,
        }
    }

    pub fn nominal_icr(&self, borrower: &DenId, now: i64) -> Decimal {
        let entire = self.entire_debt_and_coll(borrower, now);
        compute_nominal_cr(entire.coll, entire.debt)
    }

    pub fn current_icr(&self, borrower: &DenId, price: Decimal, now: i64) -> Decimal {
        let entire = self.entire_debt_and_coll(borrower, now);
        compute_cr(entire.coll, entire.debt, price)
    }

    /// Active and defaulted debt, including interest not accrued yet.
    pub fn entire_system_debt(&self, now: i64) -> Decimal {
        let pending_interest = self
            .interest
            .pending_interest(self.accruing_debt(), now);
        self.total_active_debt + pending_interest + self.defaulted_debt
    }

    pub fn entire_system_coll(&self) -> Decimal {
        self.total_active_collateral + self.defaulted_collateral
    }

    /// Total collateral ratio of this market.
    pub fn tcr(&self, price: Decimal, now: i64) -> Decimal {
        compute_cr(self.entire_system_coll(), self.entire_system_debt(now), price)
    }

    pub fn den_owners_count(&self) -> u64 {
        self.den_owners.len()
    }

    pub fn den_from_owners_array(&self, index: u64) -> Option<DenId> {
        self.den_owners.get(index)
    }

    pub fn surplus_balance(&self, borrower: &DenId) -> Decimal {
        load(&self.surplus_balances, borrower).unwrap_or(Decimal::ZERO)
    }

    pub fn den_info(&self, borrower: &DenId, now: i64) -> DenInfo {
        let den = self.den(borrower).unwrap_or_else(Den::empty);
        let entire = self.entire_debt_and_coll(borrower, now);

        DenInfo {
            den_id: borrower.clone(),
            status: den.status,
            stored_debt: den.debt,
            stored_coll: den.coll,
            stake: den.stake,
            entire_debt: entire.debt,
            entire_coll: entire.coll,
            nominal_cr: compute_nominal_cr(entire.coll, entire.debt),
            surplus: self.surplus_balance(borrower),
        }
    }

    /// Walks up to `count` dens from the riskiest end of the sorted list.
    pub fn sorted_dens_info(&self, count: u64, now: i64) -> SortedDensInfo {
        let mut riskiest = Vec::new();
        let mut current = self.sorted_dens.last();
        while let Some(id) = current {
            if riskiest.len() as u64 >= count {
                break;
            }
            current = self.sorted_dens.prev(&id);
            let nicr = self.nominal_icr(&id, now);
            riskiest.push((id, nicr));
        }

        SortedDensInfo {
            size: self.sorted_dens.size(),
            first: self.sorted_dens.first(),
            last: self.sorted_dens.last(),
            riskiest,
        }
    }

    //HELPER METHODS

    /// A copy of the den's stored record.
    pub fn den(&self, borrower: &DenId) -> Option<Den> {
        load(&self.dens, borrower)
    }

    // Rewrites a stored den in place.
    pub(crate) fn update_den(&mut self, borrower: &DenId, change: impl FnOnce(&mut Den)) {
        if let Some(mut den) = self.den(borrower) {
            change(&mut den);
            self.dens.insert(borrower.clone(), den);
        }
    }

    /// Brings the global interest index up to `now` and returns it.
    pub(crate) fn accrue_active_interests(&mut self, now: i64) -> PreciseDecimal {
        let interest = self.interest.accrue(self.accruing_debt(), now);
        self.total_active_debt += interest;
        self.interest.active_index
    }

    // Active debt that bears interest.
    fn accruing_debt(&self) -> Decimal {
        let exempt_debt = self
            .interest_exempt_den
            .as_ref()
            .and_then(|id| self.den(id))
            .filter(|den| den.status == DenStatus::Active)
            .map_or(Decimal::ZERO, |den| den.debt);

        (self.total_active_debt - exempt_debt).max(Decimal::ZERO)
    }

    pub(crate) fn send_collateral(&mut self, amount: Decimal) {
        if amount > Decimal::ZERO {
            self.total_active_collateral -= amount;
        }
    }

    pub(crate) fn update_den_reward_snapshots(&mut self, borrower: &DenId) {
        let snapshot = self.rewards.snapshot();
        self.update_den(borrower, |den| den.reward_snapshot = snapshot);
        self.record(LedgerEvent::DenSnapshotsUpdated(EventDenSnapshotsUpdated {
            den_id: borrower.clone(),
            l_collateral: snapshot.collateral,
            l_debt: snapshot.debt,
        }));
    }

    pub(crate) fn update_stake_and_total_stakes(&mut self, borrower: &DenId) -> Decimal {
        let Some(mut den) = self.den(borrower) else {
            return Decimal::ZERO;
        };

        let new_stake = self.rewards.update_stake(den.stake, den.coll);
        den.stake = new_stake;
        self.dens.insert(borrower.clone(), den);

        self.record(LedgerEvent::TotalStakesUpdated(EventTotalStakesUpdated {
            new_total_stakes: self.rewards.total_stakes,
        }));

        new_stake
    }

    pub(crate) fn remove_stake(&mut self, borrower: &DenId) {
        if let Some(mut den) = self.den(borrower) {
            self.rewards.remove_stake(den.stake);
            den.stake = Decimal::ZERO;
            self.dens.insert(borrower.clone(), den);
        }
    }

    /// Zeroes a den, swap-removes it from the owner array and unlinks it from the sorted list.
    pub(crate) fn close_den(&mut self, borrower: &DenId, status: DenStatus) -> Result<(), DenError> {
        let Some(mut den) = self.den(borrower) else {
            return Err(DenError::DenNotActive);
        };

        let index = den.array_index;
        den.status = status;
        den.coll = Decimal::ZERO;
        den.debt = Decimal::ZERO;
        den.stake = Decimal::ZERO;
        den.active_interest_index = PreciseDecimal::ZERO;
        den.reward_snapshot = RewardSnapshot::ZERO;
        den.array_index = 0;
        self.dens.insert(borrower.clone(), den);

        if let Some((moved, new_index)) = self.den_owners.swap_remove(index) {
            self.update_den(&moved, |moved_den| moved_den.array_index = new_index);
            self.record(LedgerEvent::DenIndexUpdated(EventDenIndexUpdated {
                den_id: moved,
                new_index,
            }));
        }

        self.sorted_dens.remove(borrower)
    }

    /// Resets the global accumulators once no den is left to reconcile them against.
    pub(crate) fn reset_state(&mut self, now: i64) {
        if !self.den_owners.is_empty() {
            return;
        }

        self.interest.active_index = PreciseDecimal::ONE;
        self.interest.last_update = now;
        self.rewards = RewardLedger::new();
        self.total_active_collateral = Decimal::ZERO;
        self.total_active_debt = Decimal::ZERO;
        self.defaulted_collateral = Decimal::ZERO;
        self.defaulted_debt = Decimal::ZERO;
    }
}

/// Redemption fee on `collateral_drawn`; it must leave something for the redeemer.
pub fn calc_redemption_fee(rate: Decimal, collateral_drawn: Decimal) -> Result<Decimal, DenError> {
    let fee = calc_fee(rate, collateral_drawn);
    if fee >= collateral_drawn {
        return Err(DenError::FeeExceedsCollateral);
    }
    Ok(fee)
}

/// Current NICR of a listed den, as seen by the sorted list.
///
/// Reads the stored interest index, so callers accrue interest before touching the list.
pub(crate) fn listed_nicr(
    dens: &DenStore<DenId, Den>,
    rewards: &RewardLedger,
    interest: &InterestState,
    id: &DenId,
) -> Decimal {
    match load(dens, id) {
        Some(den) if den.status == DenStatus::Active => {
            let (pending_coll, pending_debt) =
                pending_rewards(rewards.l_collateral, rewards.l_debt, &den.reward_snapshot, den.stake);
            let debt = interest.project(den.debt, den.active_interest_index) + pending_debt;
            compute_nominal_cr(den.coll + pending_coll, debt)
        }
        _ => Decimal::ZERO,
    }
}
