//! # Den Protocol Crate
//!
//! This crate contains the den manager of a collateralized debt position (CDP) protocol: the
//! per-collateral ledger that tracks every borrower's collateral and debt, accrues interest,
//! socializes liquidation losses over the remaining dens and lets debt token holders redeem
//! collateral at face value.
//!
//! ## Modules
//!
//! - `den_manager_component`: The `DenManager` blueprint. Owns the collateral vaults, the debt
//!   token and borrower badges, reads prices from a price feed and drives the den ledger.
//! - `den_ledger`: `DenLedger`, the complete accounting of one market: den lifecycle,
//!   pending reward application, liquidation plumbing, fees and admin settings.
//! - `redemption`: The redemption walk over the sorted dens.
//! - `sorted_dens`: Doubly linked list of dens ordered by nominal collateral ratio, with hinted inserts.
//! - `den_store`: Keyed storage behind every per-den record.
//! - `den_owners`: Dense array of active dens with O(1) swap-removal.
//! - `interest`: The compounding interest index.
//! - `rewards`: Redistribution accumulators and stakes.
//! - `fees`: The decaying base rate behind redemption and borrowing fees.
//! - `math`: Fixed-point helpers, collateral ratios and the decay exponentiation.
//! - `errors`: `DenError`, the ledger's error type.
//! - `events`: Events emitted by the `DenManager` component.
//! - `shared_structs`: Data structures shared by the ledger and the blueprint, such as `Den` and
//!   `DenManagerParameters`.

pub mod math;
pub mod errors;
pub mod events;
pub mod shared_structs;
pub mod den_store;
pub mod sorted_dens;
pub mod den_owners;
pub mod interest;
pub mod rewards;
pub mod fees;
pub mod den_ledger;
pub mod redemption;
pub mod den_manager_component;
