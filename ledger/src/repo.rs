//! Diesel-backed implementation of the ledger `transact` algorithm.

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl, scoped_futures::ScopedFutureExt};
use portal_db::error::DbError;
use portal_db::pool::PgPool;
use portal_db::schema::{points_transactions, refill_plans, system_coins_transactions, wallets};
use rust_decimal::Decimal;

use crate::activity::{ActivityType, SystemAccount};
use crate::error::LedgerError;
use crate::types::{RefillPlan, TransactResult, Wallet};

#[derive(Queryable, Selectable)]
#[diesel(table_name = wallets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct WalletRow {
    id: i64,
    user_id: i64,
    balance: Decimal,
    auto_refill: bool,
    refill_plan_id: Option<i64>,
    below_balance: Option<Decimal>,
    stripe_customer_id: Option<String>,
    created_on: DateTime<Utc>,
    modified_on: DateTime<Utc>,
}

impl From<WalletRow> for Wallet {
    fn from(r: WalletRow) -> Self {
        Wallet {
            id: r.id,
            user_id: r.user_id,
            balance: r.balance,
            auto_refill: r.auto_refill,
            refill_plan_id: r.refill_plan_id,
            below_balance: r.below_balance,
            stripe_customer_id: r.stripe_customer_id,
            created_on: r.created_on,
            modified_on: r.modified_on,
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = refill_plans)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct RefillPlanRow {
    id: i64,
    points: Decimal,
    price: Decimal,
}

impl From<RefillPlanRow> for RefillPlan {
    fn from(r: RefillPlanRow) -> Self {
        RefillPlan { id: r.id, points: r.points, price: r.price }
    }
}

/// Daily USD ceiling on auto-refill purchases.
pub struct LedgerRepo {
    pool: PgPool,
    daily_refill_usd_limit_cents: u32,
}

impl LedgerRepo {
    pub fn new(pool: PgPool, daily_refill_usd_limit_cents: u32) -> Self {
        Self { pool, daily_refill_usd_limit_cents }
    }

    /// Runs the full `transact` contract as a single DB transaction with
    /// the wallet row locked for the duration.
    pub async fn transact(
        &self,
        user_id: i64,
        activity: ActivityType,
        delta: Decimal,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<TransactResult, LedgerError> {
        if !activity.accepts_delta_sign(delta) {
            return Err(LedgerError::ActivityFundMismatch);
        }

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| DbError::Pool(e.to_string()))?;

        let cents_limit = self.daily_refill_usd_limit_cents;

        // The daily-limit outcome must still commit the original debit and
        // the auto_refill=false flip (spec.md §4.1/§8) — it can't be
        // surfaced as an `Err` from inside `conn.transaction`, since
        // diesel-async rolls the whole transaction back on any `Err`. So
        // the closure always resolves `Ok` and carries the outcome out via
        // `TransactOutcome`; only the outer call turns a committed
        // daily-limit hit into the public `Err(CoinPurchaseDailyLimit)`.
        let outcome = conn
            .transaction::<_, LedgerError, _>(|conn| {
                async move {
                    if is_coin_suspended(conn, user_id).await? {
                        return Err(LedgerError::UserCoinSuspended);
                    }

                    let wallet = lock_or_create_wallet(conn, user_id, now).await?;
                    let mut new_balance = wallet.balance + delta;
                    let mut auto_refill_disabled = false;

                    if new_balance < Decimal::ZERO {
                        match try_auto_refill(conn, &wallet, new_balance, now, cents_limit).await? {
                            RefillOutcome::Applied { refilled_balance } => {
                                new_balance = refilled_balance + delta;
                            }
                            RefillOutcome::DailyLimitExceeded => {
                                auto_refill_disabled = true;
                                // Original debit still applies; wallet may go negative.
                            }
                            RefillOutcome::NoPaymentMethod => {
                                return Err(LedgerError::CoinPurchasePaymentNotSet);
                            }
                            RefillOutcome::NotEligible => {
                                return Err(LedgerError::InsufficientFunds);
                            }
                        }
                    }

                    let transaction_id: i64 = diesel::insert_into(points_transactions::table)
                        .values((
                            points_transactions::user_id.eq(user_id),
                            points_transactions::activity_type.eq(activity.code()),
                            points_transactions::delta.eq(delta),
                            points_transactions::note.eq(&note),
                            points_transactions::created_on.eq(now),
                        ))
                        .returning(points_transactions::id)
                        .get_result(conn)
                        .await
                        .map_err(DbError::from)?;

                    diesel::update(wallets::table.filter(wallets::id.eq(wallet.id)))
                        .set((
                            wallets::balance.eq(new_balance),
                            wallets::modified_on.eq(now),
                            wallets::auto_refill.eq(if auto_refill_disabled {
                                false
                            } else {
                                wallet.auto_refill
                            }),
                        ))
                        .execute(conn)
                        .await
                        .map_err(DbError::from)?;

                    Ok(TransactOutcome {
                        result: TransactResult { new_balance, transaction_id },
                        auto_refill_disabled,
                    })
                }
                .scope_boxed()
            })
            .await?;

        if outcome.auto_refill_disabled {
            return Err(LedgerError::CoinPurchaseDailyLimit);
        }

        Ok(outcome.result)
    }
}

/// What a committed `transact` call did, so the daily-limit case can be
/// reported to the caller as an error *after* its debit has already landed.
struct TransactOutcome {
    result: TransactResult,
    auto_refill_disabled: bool,
}

enum RefillOutcome {
    Applied { refilled_balance: Decimal },
    DailyLimitExceeded,
    NoPaymentMethod,
    NotEligible,
}

async fn is_coin_suspended(
    conn: &mut AsyncPgConnection,
    user_id: i64,
) -> Result<bool, DbError> {
    use portal_db::schema::block_users::dsl as bu;

    let count: i64 = bu::block_users
        .filter(bu::user_id.eq(user_id))
        .filter(bu::is_deleted.eq(false))
        .filter(bu::block_type.eq(1))
        .count()
        .get_result(conn)
        .await?;

    Ok(count > 0)
}

async fn lock_or_create_wallet(
    conn: &mut AsyncPgConnection,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<Wallet, DbError> {
    let existing: Option<WalletRow> = wallets::table
        .filter(wallets::user_id.eq(user_id))
        .select(WalletRow::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()?;

    if let Some(row) = existing {
        return Ok(row.into());
    }

    let created: WalletRow = diesel::insert_into(wallets::table)
        .values((
            wallets::user_id.eq(user_id),
            wallets::balance.eq(Decimal::ZERO),
            wallets::auto_refill.eq(false),
            wallets::created_on.eq(now),
            wallets::modified_on.eq(now),
        ))
        .returning(WalletRow::as_returning())
        .get_result(conn)
        .await?;

    Ok(created.into())
}

/// Attempts the auto-refill credit a negative balance can trigger.
async fn try_auto_refill(
    conn: &mut AsyncPgConnection,
    wallet: &Wallet,
    new_balance: Decimal,
    now: DateTime<Utc>,
    daily_limit_cents: u32,
) -> Result<RefillOutcome, LedgerError> {
    if !wallet.auto_refill {
        return Ok(RefillOutcome::NotEligible);
    }

    let Some(plan_id) = wallet.refill_plan_id else {
        return Ok(RefillOutcome::NotEligible);
    };

    let plan: RefillPlanRow = refill_plans::table
        .filter(refill_plans::id.eq(plan_id))
        .select(RefillPlanRow::as_select())
        .first(conn)
        .await
        .map_err(DbError::from)?;

    if new_balance < -plan.points {
        return Ok(RefillOutcome::NotEligible);
    }

    if wallet.stripe_customer_id.is_none() {
        return Ok(RefillOutcome::NoPaymentMethod);
    }

    let refills_today = daily_refill_count(conn, wallet.user_id, now).await?;
    let plan_price_cents = to_cents(plan.price);
    let spent_today_cents = refills_today as u64 * plan_price_cents;

    if spent_today_cents + plan_price_cents > daily_limit_cents as u64 {
        return Ok(RefillOutcome::DailyLimitExceeded);
    }

    diesel::insert_into(points_transactions::table)
        .values((
            points_transactions::user_id.eq(wallet.user_id),
            points_transactions::activity_type.eq(ActivityType::Refill.code()),
            points_transactions::delta.eq(plan.points),
            points_transactions::created_on.eq(now),
        ))
        .execute(conn)
        .await
        .map_err(DbError::from)?;

    diesel::insert_into(system_coins_transactions::table)
        .values((
            system_coins_transactions::from_account.eq(SystemAccount::Budget.id()),
            system_coins_transactions::to_account.eq(SystemAccount::User(wallet.user_id).id()),
            system_coins_transactions::activity_type.eq(ActivityType::Refill.code()),
            system_coins_transactions::amount.eq(plan.points),
            system_coins_transactions::created_on.eq(now),
        ))
        .execute(conn)
        .await
        .map_err(DbError::from)?;

    Ok(RefillOutcome::Applied { refilled_balance: wallet.balance + plan.points })
}

/// Counts auto-refill credits posted for this user in the last 24h. Each
/// refill spends `refill_plan.price` USD, so the daily USD ceiling is
/// enforced as `count * plan.price`, not the points credited.
async fn daily_refill_count(
    conn: &mut AsyncPgConnection,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<i64, LedgerError> {
    use portal_db::schema::points_transactions::dsl as pt;

    let since = now - Duration::hours(24);
    let count: i64 = pt::points_transactions
        .filter(pt::user_id.eq(user_id))
        .filter(pt::activity_type.eq(ActivityType::Refill.code()))
        .filter(pt::created_on.ge(since))
        .count()
        .get_result(conn)
        .await
        .map_err(DbError::from)?;

    Ok(count)
}

fn to_cents(usd: Decimal) -> u64 {
    (usd * Decimal::from(100))
        .round()
        .to_string()
        .parse()
        .unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_cents_converts_whole_dollars() {
        assert_eq!(to_cents(Decimal::from(5)), 500);
    }

    #[test]
    fn to_cents_converts_fractional_dollars() {
        assert_eq!(to_cents(Decimal::new(499, 2)), 499);
    }

    #[test]
    fn to_cents_rounds_to_the_nearest_cent() {
        assert_eq!(to_cents(Decimal::new(1005, 3)), 101);
    }
}
