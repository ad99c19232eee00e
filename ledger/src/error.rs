use thiserror::Error;

/// Ledger error taxonomy with an HTTP status mapping.
///
/// The mapping lives here, not in the (out-of-scope) web layer, because
/// it's part of the typed error contract the caller consumes.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("activity sign does not match delta sign")]
    ActivityFundMismatch,

    #[error("user is suspended from using coins")]
    UserCoinSuspended,

    #[error("daily coin purchase limit exceeded")]
    CoinPurchaseDailyLimit,

    #[error("no payment method on file for auto-refill")]
    CoinPurchasePaymentNotSet,

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("unknown activity type code: {0}")]
    UnknownActivityType(i32),

    #[error(transparent)]
    Db(#[from] portal_db::error::DbError),
}

impl LedgerError {
    /// HTTP status code.
    pub fn status_code(&self) -> u16 {
        match self {
            LedgerError::ActivityFundMismatch => 400,
            LedgerError::UserCoinSuspended => 403,
            LedgerError::CoinPurchaseDailyLimit => 403,
            LedgerError::CoinPurchasePaymentNotSet => 400,
            LedgerError::InsufficientFunds => 402,
            LedgerError::UnknownActivityType(_) => 500,
            LedgerError::Db(_) => 500,
        }
    }
}
