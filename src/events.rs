//! Defines events emitted by the Den manager.
//!
//! The den ledger records these into a journal while it runs; the blueprint emits the journal
//! once the call's accounting is complete.

use crate::shared_structs::*;
use scrypto::prelude::*;

/// Event emitted whenever a den's stored state changes.
#[derive(ScryptoSbor, ScryptoEvent, PartialEq, Clone, Debug)]
pub struct EventDenUpdated {
    /// The den that changed.
    pub den_id: DenId,
    /// Stored debt after the operation (zero once closed).
    pub debt: Decimal,
    /// Stored collateral after the operation (zero once closed).
    pub coll: Decimal,
    pub stake: Decimal,
    pub operation: DenOperation,
}

/// Event emitted when a den is moved to a new slot of the owner array.
#[derive(ScryptoSbor, ScryptoEvent, PartialEq, Clone, Debug)]
pub struct EventDenIndexUpdated {
    pub den_id: DenId,
    pub new_index: u64,
}

/// Event emitted when a den's reward snapshot is refreshed.
#[derive(ScryptoSbor, ScryptoEvent, PartialEq, Clone, Debug)]
pub struct EventDenSnapshotsUpdated {
    pub den_id: DenId,
    pub l_collateral: Decimal,
    pub l_debt: Decimal,
}

#[derive(ScryptoSbor, ScryptoEvent, PartialEq, Clone, Debug)]
pub struct EventTotalStakesUpdated {
    pub new_total_stakes: Decimal,
}

/// Event emitted when a liquidation rebases the stake snapshots.
#[derive(ScryptoSbor, ScryptoEvent, PartialEq, Clone, Debug)]
pub struct EventSystemSnapshotsUpdated {
    pub total_stakes_snapshot: Decimal,
    pub total_collateral_snapshot: Decimal,
}

/// Event emitted when debt and collateral are redistributed over all stakes.
#[derive(ScryptoSbor, ScryptoEvent, PartialEq, Clone, Debug)]
pub struct EventLTermsUpdated {
    pub l_collateral: Decimal,
    pub l_debt: Decimal,
}

#[derive(ScryptoSbor, ScryptoEvent, PartialEq, Clone, Debug)]
pub struct EventBaseRateUpdated {
    pub base_rate: Decimal,
}

#[derive(ScryptoSbor, ScryptoEvent, PartialEq, Clone, Debug)]
pub struct EventLastFeeOpTimeUpdated {
    pub last_fee_operation_time: i64,
}

/// Event emitted at the end of a redemption.
#[derive(ScryptoSbor, ScryptoEvent, PartialEq, Clone, Debug)]
pub struct EventRedemption {
    /// Debt the redeemer asked to redeem.
    pub attempted_debt_amount: Decimal,
    /// Debt actually redeemed and burned.
    pub actual_debt_amount: Decimal,
    /// Collateral drawn from dens, fee included.
    pub collateral_sent: Decimal,
    pub collateral_fee: Decimal,
}

/// Event emitted when a borrower claims surplus collateral.
#[derive(ScryptoSbor, ScryptoEvent, PartialEq, Clone, Debug)]
pub struct EventCollateralClaimed {
    pub den_id: DenId,
    pub amount: Decimal,
}

/// Event emitted when accrued interest is minted to the protocol.
#[derive(ScryptoSbor, ScryptoEvent, PartialEq, Clone, Debug)]
pub struct EventInterestCollected {
    pub amount: Decimal,
}

#[derive(ScryptoSbor, ScryptoEvent, PartialEq, Clone, Debug)]
pub struct EventParametersUpdated {
    pub parameters: DenManagerParameters,
}

#[derive(ScryptoSbor, ScryptoEvent, PartialEq, Clone, Debug)]
pub struct EventSunsetStarted {
    pub timestamp: i64,
}

/// Events recorded by the den ledger, in the order they happened.
#[derive(ScryptoSbor, PartialEq, Clone, Debug)]
pub enum LedgerEvent {
    DenUpdated(EventDenUpdated),
    DenIndexUpdated(EventDenIndexUpdated),
    DenSnapshotsUpdated(EventDenSnapshotsUpdated),
    TotalStakesUpdated(EventTotalStakesUpdated),
    SystemSnapshotsUpdated(EventSystemSnapshotsUpdated),
    LTermsUpdated(EventLTermsUpdated),
    BaseRateUpdated(EventBaseRateUpdated),
    LastFeeOpTimeUpdated(EventLastFeeOpTimeUpdated),
    Redemption(EventRedemption),
    CollateralClaimed(EventCollateralClaimed),
    InterestCollected(EventInterestCollected),
    ParametersUpdated(EventParametersUpdated),
    SunsetStarted(EventSunsetStarted),
}
