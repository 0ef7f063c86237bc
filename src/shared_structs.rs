//! # Den ledger shared structs
//! Data types used by both the pure den ledger and the `DenManager` blueprint.

use scrypto::prelude::*;

/// Dens are keyed by the local id of the borrower badge that owns them.
pub type DenId = NonFungibleLocalId;

/// Data of a borrower badge. Holding one is what makes an account a borrower in a market.
#[derive(ScryptoSbor, NonFungibleData, Clone, Debug)]
pub struct BorrowerBadge {
    /// Image of the NFT
    #[mutable]
    pub key_image_url: Url,
    /// The collateral market this badge was minted by.
    pub collateral_address: ResourceAddress,
}

/// Lifecycle state of a den.
#[derive(ScryptoSbor, PartialEq, Eq, Clone, Copy, Debug)]
pub enum DenStatus {
    NonExistent,
    Active,
    ClosedByOwner,
    ClosedByLiquidation,
    ClosedByRedemption,
}

/// Values of the global reward accumulators as of a den's last reward application.
#[derive(ScryptoSbor, PartialEq, Clone, Copy, Debug)]
pub struct RewardSnapshot {
    pub collateral: Decimal,
    pub debt: Decimal,
}

impl RewardSnapshot {
    pub const ZERO: Self = Self {
        collateral: Decimal::ZERO,
        debt: Decimal::ZERO,
    };
}

/// A single collateralized debt position.
#[derive(ScryptoSbor, PartialEq, Clone, Debug)]
pub struct Den {
    /// Nominal debt, valid at `active_interest_index`.
    pub debt: Decimal,
    /// Collateral, excluding pending redistribution rewards.
    pub coll: Decimal,
    /// Weight of this den in future redistributions.
    pub stake: Decimal,
    pub status: DenStatus,
    /// Slot of this den in the dense owner array.
    pub array_index: u64,
    /// Interest index captured at the last projection. Zero for the interest exempt den.
    pub active_interest_index: PreciseDecimal,
    pub reward_snapshot: RewardSnapshot,
}

impl Den {
    pub fn empty() -> Self {
        Self {
            debt: Decimal::ZERO,
            coll: Decimal::ZERO,
            stake: Decimal::ZERO,
            status: DenStatus::NonExistent,
            array_index: 0,
            active_interest_index: PreciseDecimal::ZERO,
            reward_snapshot: RewardSnapshot::ZERO,
        }
    }
}

/// Operation tag attached to den update events.
#[derive(ScryptoSbor, PartialEq, Eq, Clone, Copy, Debug)]
pub enum DenOperation {
    Open,
    Adjust,
    Close,
    Liquidate,
    RedeemCollateral,
    ApplyPendingRewards,
}

/// Tunable parameters of a collateral market.
#[derive(ScryptoSbor, PartialEq, Clone, Debug)]
pub struct DenManagerParameters {
    /// Per-minute decay applied to the base rate.
    pub minute_decay_factor: Decimal,
    pub redemption_fee_floor: Decimal,
    pub max_redemption_fee: Decimal,
    pub borrowing_fee_floor: Decimal,
    pub max_borrowing_fee: Decimal,
    /// Yearly interest on active debt, in basis points.
    pub interest_rate_in_bps: u64,
    /// Ceiling on active plus defaulted debt.
    pub max_system_debt: Decimal,
    /// Minimum collateral ratio.
    pub mcr: Decimal,
    /// Smallest debt a den may carry, excluding gas compensation.
    pub min_net_debt: Decimal,
    /// Debt reserved per den in the gas pool.
    pub debt_gas_compensation: Decimal,
    /// Seconds after deployment before redemptions open.
    pub bootstrap_period: i64,
}

impl Default for DenManagerParameters {
    fn default() -> Self {
        Self {
            minute_decay_factor: dec!("0.999037758833783"),
            redemption_fee_floor: dec!("0.005"),
            max_redemption_fee: Decimal::ONE,
            borrowing_fee_floor: dec!("0.005"),
            max_borrowing_fee: dec!("0.05"),
            interest_rate_in_bps: 0,
            max_system_debt: dec!(1000000000),
            mcr: dec!("1.1"),
            min_net_debt: dec!(1800),
            debt_gas_compensation: dec!(200),
            bootstrap_period: 14 * 86400,
        }
    }
}

/// Debt and collateral of a den including pending rewards and interest.
#[derive(ScryptoSbor, PartialEq, Clone, Copy, Debug)]
pub struct EntireDebtAndColl {
    pub debt: Decimal,
    pub coll: Decimal,
    pub pending_debt_reward: Decimal,
    pub pending_coll_reward: Decimal,
}

/// Summary of a den returned by the getters.
#[derive(ScryptoSbor, Clone, Debug)]
pub struct DenInfo {
    pub den_id: DenId,
    pub status: DenStatus,
    pub stored_debt: Decimal,
    pub stored_coll: Decimal,
    pub stake: Decimal,
    pub entire_debt: Decimal,
    pub entire_coll: Decimal,
    pub nominal_cr: Decimal,
    pub surplus: Decimal,
}

/// A page of the sorted den list, walked from the riskiest end.
#[derive(ScryptoSbor, Clone, Debug)]
pub struct SortedDensInfo {
    pub size: u64,
    pub first: Option<DenId>,
    pub last: Option<DenId>,
    /// Up to the requested number of dens, riskiest first, with their nominal CR.
    pub riskiest: Vec<(DenId, Decimal)>,
}
