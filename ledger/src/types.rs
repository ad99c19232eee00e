use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// A user's coin wallet.
#[derive(Debug, Clone)]
pub struct Wallet {
    pub id: i64,
    pub user_id: i64,
    pub balance: Decimal,
    pub auto_refill: bool,
    pub refill_plan_id: Option<i64>,
    pub below_balance: Option<Decimal>,
    pub stripe_customer_id: Option<String>,
    pub created_on: DateTime<Utc>,
    pub modified_on: DateTime<Utc>,
}

/// An applied debit/credit against a user's wallet.
#[derive(Debug, Clone)]
pub struct PointsTransaction {
    pub id: i64,
    pub user_id: i64,
    pub activity_type: i32,
    pub delta: Decimal,
    pub note: Option<String>,
    pub ref_transaction_id: Option<i64>,
    pub created_on: DateTime<Utc>,
    pub survey_id: Option<i64>,
}

/// An internal movement between system accounts.
#[derive(Debug, Clone)]
pub struct SystemCoinsTransaction {
    pub id: i64,
    pub from_account: i64,
    pub to_account: i64,
    pub activity_type: i32,
    pub amount: Decimal,
    pub ref_transaction_id: Option<i64>,
    pub created_on: DateTime<Utc>,
}

/// A purchasable auto-refill plan.
#[derive(Debug, Clone)]
pub struct RefillPlan {
    pub id: i64,
    pub points: Decimal,
    pub price: Decimal,
}

/// Block status, e.g. `block_type = 1` (coin suspension).
#[derive(Debug, Clone)]
pub struct BlockUser {
    pub id: i64,
    pub user_id: i64,
    pub is_deleted: bool,
    pub block_type: i32,
}

/// Escrow account lifecycle: 1 = open, 2 = closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscrowStatus {
    Open,
    Closed,
}

impl EscrowStatus {
    pub fn code(self) -> i32 {
        match self {
            EscrowStatus::Open => 1,
            EscrowStatus::Closed => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EscrowAccount {
    pub id: i64,
    pub user_id: i64,
    pub reservation_id: i64,
    pub offer_id: Option<i64>,
    pub trip_id: Option<i64>,
    pub status: i32,
    pub created_on: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct EscrowDetail {
    pub id: i64,
    pub escrow_id: i64,
    pub activity_type: i32,
    pub fund: Decimal,
    pub offer_id: Option<i64>,
    pub transaction_id: i64,
    pub created_on: DateTime<Utc>,
}

/// Result of a successful `transact` call.
#[derive(Debug, Clone, Copy)]
pub struct TransactResult {
    pub new_balance: Decimal,
    pub transaction_id: i64,
}
