//! Errors raised by the den ledger.
//!
//! Every variant aborts the calling transaction once it reaches the blueprint; the message is
//! what ends up in the transaction receipt.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenError {
    #[error("Collateral paused")]
    Paused,
    #[error("Not allowed while sunsetting")]
    Sunsetting,
    #[error("Den is already active")]
    DenActive,
    #[error("Den closed or does not exist")]
    DenNotActive,
    #[error("Collateral debt limit reached")]
    DebtLimitReached,
    #[error("No stakes to redistribute over")]
    NoStakes,
    #[error("Nominal collateral ratio must be positive")]
    ZeroNominalCr,
    #[error("Den already in sorted list")]
    AlreadyListed,
    #[error("Den not in sorted list")]
    NotListed,
    #[error("Max fee must be between the redemption fee floor and 100%")]
    InvalidMaxFee,
    #[error("Redemptions are disabled during the bootstrap period")]
    BootstrapPeriod,
    #[error("Cannot redeem when TCR < MCR")]
    TcrBelowMcr,
    #[error("Amount must be greater than zero")]
    ZeroAmount,
    #[error("Insufficient balance")]
    InsufficientBalance,
    #[error("Unable to redeem any amount")]
    UnableToRedeem,
    #[error("Fee exceeds returned collateral")]
    FeeExceedsCollateral,
    #[error("Fee exceeded provided maximum")]
    FeeExceedsMaximum,
    #[error("Nothing to collect")]
    NothingToCollect,
    #[error("No collateral available to claim")]
    NoSurplus,
    #[error("Invalid decay factor")]
    InvalidDecayFactor,
    #[error("Invalid redemption fee floor")]
    InvalidRedemptionFee,
    #[error("Invalid borrowing fee floor")]
    InvalidBorrowingFee,
    #[error("MCR cannot be > CCR or < 110%")]
    InvalidMcr,
    #[error("Gas compensation cannot change while dens are open")]
    GasCompensationLocked,
    #[error("Interest exempt den must be inactive while reassigned")]
    ExemptDenActive,
    #[error("Pending rewards exceed defaulted balances")]
    DefaultedUnderflow,
}

/// Turns a ledger error into a transaction abort carrying its message.
pub trait OrAbort<T> {
    fn or_abort(self) -> T;
}

impl<T> OrAbort<T> for Result<T, DenError> {
    fn or_abort(self) -> T {
        match self {
            Ok(value) => value,
            Err(err) => panic!("{}", err),
        }
    }
}
