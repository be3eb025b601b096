use thiserror::Error;
use tracing::info;

use khata_core::{BankTransaction, EntityKind, Expense, MatchStatus, PaymentStatus};

use crate::db::DbPool;
use crate::queries::{get_transaction, insert_expense};

/// Confirmed links always record full confidence; confirmation is a
/// decision, not a fresh score.
const CONFIRMED_CONFIDENCE: i64 = 100;

/// Whether the link came from the auto-match band or a human decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmMode {
    Auto,
    Manual,
}

impl ConfirmMode {
    fn status(self) -> MatchStatus {
        match self {
            ConfirmMode::Auto => MatchStatus::Matched,
            ConfirmMode::Manual => MatchStatus::Manual,
        }
    }
}

/// Validation failures are distinct from storage failures so callers can
/// report "already matched" differently from "database unreachable".
#[derive(Error, Debug)]
pub enum ConfirmError {
    #[error("Transaction {0} not found")]
    NotFound(i64),
    #[error("Transaction {id} is not eligible: status is '{status}'")]
    NotEligible { id: i64, status: MatchStatus },
    #[error("{kind} {id} not found")]
    EntityNotFound { kind: EntityKind, id: i64 },
    #[error("Entity id is required when confirming a {0}")]
    MissingEntityId(EntityKind),
    #[error("Invalid entity id '{0}'")]
    InvalidEntityId(String),
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

async fn eligible_transaction(pool: &DbPool, id: i64) -> Result<BankTransaction, ConfirmError> {
    let tx = get_transaction(pool, id)
        .await?
        .ok_or(ConfirmError::NotFound(id))?;
    if !tx.is_matchable() {
        return Err(ConfirmError::NotEligible {
            id,
            status: tx.match_status,
        });
    }
    Ok(tx)
}

/// Guarded link update. Re-asserts `unmatched` in the WHERE clause so two
/// concurrent confirmations cannot both claim the same transaction. Runs
/// inside the caller's database transaction; a failed guard rolls the
/// caller's entity mutation back with it.
async fn link_transaction(
    conn: &mut sqlx::SqliteConnection,
    tx_id: i64,
    entity: EntityKind,
    entity_id: &str,
    reason: &str,
    mode: ConfirmMode,
) -> Result<(), ConfirmError> {
    let result = sqlx::query(
        "UPDATE bank_transactions \
         SET match_status = ?, matched_entity = ?, matched_entity_id = ?, \
             match_confidence = ?, match_reason = ? \
         WHERE id = ? AND match_status = 'unmatched'",
    )
    .bind(mode.status().as_str())
    .bind(entity.as_str())
    .bind(entity_id)
    .bind(CONFIRMED_CONFIDENCE)
    .bind(reason)
    .bind(tx_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() != 1 {
        // Lost a race: someone confirmed or rejected it since the pre-check.
        let status = sqlx::query_as::<_, (String,)>(
            "SELECT match_status FROM bank_transactions WHERE id = ?",
        )
        .bind(tx_id)
        .fetch_optional(&mut *conn)
        .await?
        .and_then(|(s,)| s.parse().ok())
        .unwrap_or(MatchStatus::Unmatched);
        return Err(ConfirmError::NotEligible { id: tx_id, status });
    }
    info!(tx_id, entity = entity.as_str(), entity_id, "linked transaction");
    Ok(())
}

pub async fn confirm_salary(
    pool: &DbPool,
    tx_id: i64,
    salary_id: i64,
    mode: ConfirmMode,
) -> Result<(), ConfirmError> {
    let tx = eligible_transaction(pool, tx_id).await?;

    // Entity mutation and link commit or roll back together; losing the
    // link race must not leave a salary marked paid with no transaction.
    let mut dbtx = pool.begin().await?;
    let updated = sqlx::query("UPDATE salaries SET status = 'paid', paid_date = ? WHERE id = ?")
        .bind(tx.date)
        .bind(salary_id)
        .execute(&mut *dbtx)
        .await?;
    if updated.rows_affected() != 1 {
        return Err(ConfirmError::EntityNotFound {
            kind: EntityKind::Salary,
            id: salary_id,
        });
    }

    link_transaction(
        &mut dbtx,
        tx_id,
        EntityKind::Salary,
        &salary_id.to_string(),
        "confirmed salary payment",
        mode,
    )
    .await?;
    dbtx.commit().await?;
    Ok(())
}

pub async fn confirm_subscription(
    pool: &DbPool,
    tx_id: i64,
    subscription_id: i64,
    mode: ConfirmMode,
) -> Result<(), ConfirmError> {
    let tx = eligible_transaction(pool, tx_id).await?;

    let exists = sqlx::query_as::<_, (i64,)>("SELECT id FROM subscriptions WHERE id = ?")
        .bind(subscription_id)
        .fetch_optional(pool)
        .await?;
    if exists.is_none() {
        return Err(ConfirmError::EntityNotFound {
            kind: EntityKind::Subscription,
            id: subscription_id,
        });
    }

    // Payment row and link commit or roll back together; a lost link race
    // must not leave an orphan payment record behind.
    let mut dbtx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO subscription_payments \
            (subscription_id, transaction_id, paid_date, amount_cents, payment_method) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(subscription_id)
    .bind(tx_id)
    .bind(tx.date)
    .bind(tx.amount_cents)
    .bind(tx.payment_method.map(|m| m.as_str()))
    .execute(&mut *dbtx)
    .await?;

    link_transaction(
        &mut dbtx,
        tx_id,
        EntityKind::Subscription,
        &subscription_id.to_string(),
        "confirmed subscription payment",
        mode,
    )
    .await?;
    dbtx.commit().await?;
    Ok(())
}

pub async fn confirm_expense(
    pool: &DbPool,
    tx_id: i64,
    expense_id: i64,
    mode: ConfirmMode,
) -> Result<(), ConfirmError> {
    eligible_transaction(pool, tx_id).await?;

    let mut dbtx = pool.begin().await?;
    let updated = sqlx::query("UPDATE expenses SET status = 'paid' WHERE id = ?")
        .bind(expense_id)
        .execute(&mut *dbtx)
        .await?;
    if updated.rows_affected() != 1 {
        return Err(ConfirmError::EntityNotFound {
            kind: EntityKind::Expense,
            id: expense_id,
        });
    }

    link_transaction(
        &mut dbtx,
        tx_id,
        EntityKind::Expense,
        &expense_id.to_string(),
        "confirmed expense payment",
        mode,
    )
    .await?;
    dbtx.commit().await?;
    Ok(())
}

/// Creates an expense from the transaction itself, then links it. Used
/// when a match proposed "create new" (empty entity id).
pub async fn confirm_new_expense(
    pool: &DbPool,
    tx_id: i64,
    category: &str,
    mode: ConfirmMode,
) -> Result<i64, ConfirmError> {
    let tx = eligible_transaction(pool, tx_id).await?;

    let description = tx
        .counterparty
        .clone()
        .unwrap_or_else(|| tx.description.clone());
    let expense = Expense {
        id: 0,
        category: category.to_string(),
        description,
        amount_cents: tx.amount_cents,
        date: tx.date,
        status: PaymentStatus::Paid,
    };
    let mut dbtx = pool.begin().await?;
    let expense_id = insert_expense(&mut *dbtx, &expense).await?;

    link_transaction(
        &mut dbtx,
        tx_id,
        EntityKind::Expense,
        &expense_id.to_string(),
        "created expense from transaction",
        mode,
    )
    .await?;
    dbtx.commit().await?;
    Ok(expense_id)
}

pub async fn confirm_order(
    pool: &DbPool,
    tx_id: i64,
    order_id: i64,
    mode: ConfirmMode,
) -> Result<(), ConfirmError> {
    eligible_transaction(pool, tx_id).await?;

    let mut dbtx = pool.begin().await?;
    let updated = sqlx::query("UPDATE order_payments SET settled = 1 WHERE id = ?")
        .bind(order_id)
        .execute(&mut *dbtx)
        .await?;
    if updated.rows_affected() != 1 {
        return Err(ConfirmError::EntityNotFound {
            kind: EntityKind::OrderPayment,
            id: order_id,
        });
    }

    link_transaction(
        &mut dbtx,
        tx_id,
        EntityKind::OrderPayment,
        &order_id.to_string(),
        "confirmed order payment",
        mode,
    )
    .await?;
    dbtx.commit().await?;
    Ok(())
}

/// Internal transfers have no stored entity; the link is self-referential.
pub async fn confirm_transfer(
    pool: &DbPool,
    tx_id: i64,
    mode: ConfirmMode,
) -> Result<(), ConfirmError> {
    eligible_transaction(pool, tx_id).await?;
    let mut dbtx = pool.begin().await?;
    link_transaction(
        &mut dbtx,
        tx_id,
        EntityKind::InternalTransfer,
        "",
        "confirmed internal transfer",
        mode,
    )
    .await?;
    dbtx.commit().await?;
    Ok(())
}

/// Marks the transaction ignored with a reason. Never deletes it.
pub async fn reject(pool: &DbPool, tx_id: i64, reason: &str) -> Result<(), ConfirmError> {
    eligible_transaction(pool, tx_id).await?;

    let result = sqlx::query(
        "UPDATE bank_transactions SET match_status = 'ignored', match_reason = ? \
         WHERE id = ? AND match_status = 'unmatched'",
    )
    .bind(reason)
    .bind(tx_id)
    .execute(pool)
    .await?;
    if result.rows_affected() != 1 {
        let status = get_transaction(pool, tx_id)
            .await?
            .map(|t| t.match_status)
            .unwrap_or(MatchStatus::Unmatched);
        return Err(ConfirmError::NotEligible { id: tx_id, status });
    }
    Ok(())
}

fn parse_entity_id(kind: EntityKind, id: Option<&str>) -> Result<i64, ConfirmError> {
    let raw = id
        .filter(|s| !s.trim().is_empty())
        .ok_or(ConfirmError::MissingEntityId(kind))?;
    raw.trim()
        .parse()
        .map_err(|_| ConfirmError::InvalidEntityId(raw.to_string()))
}

/// Single entry point used by the bulk path and the CLI: dispatches on
/// entity kind. An absent entity id is only legal for transfers (always
/// synthetic) and expenses (meaning "create new").
pub async fn confirm(
    pool: &DbPool,
    tx_id: i64,
    kind: EntityKind,
    entity_id: Option<&str>,
    mode: ConfirmMode,
) -> Result<(), ConfirmError> {
    match kind {
        EntityKind::InternalTransfer => confirm_transfer(pool, tx_id, mode).await,
        EntityKind::Salary => {
            let id = parse_entity_id(kind, entity_id)?;
            confirm_salary(pool, tx_id, id, mode).await
        }
        EntityKind::Subscription => {
            let id = parse_entity_id(kind, entity_id)?;
            confirm_subscription(pool, tx_id, id, mode).await
        }
        EntityKind::Expense => match entity_id.filter(|s| !s.trim().is_empty()) {
            Some(raw) => {
                let id = raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfirmError::InvalidEntityId(raw.to_string()))?;
                confirm_expense(pool, tx_id, id, mode).await
            }
            None => confirm_new_expense(pool, tx_id, "Uncategorized", mode)
                .await
                .map(|_| ()),
        },
        EntityKind::OrderPayment => {
            let id = parse_entity_id(kind, entity_id)?;
            confirm_order(pool, tx_id, id, mode).await
        }
    }
}

/// One item of a bulk confirmation request.
#[derive(Debug, Clone)]
pub struct ConfirmRequest {
    pub transaction_id: i64,
    pub entity: EntityKind,
    pub entity_id: Option<String>,
}

/// Aggregate result of a bulk confirmation. A bad item never aborts the
/// rest of the batch.
#[derive(Debug, Default)]
pub struct BulkOutcome {
    pub confirmed: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Best-effort: every item is attempted regardless of earlier failures.
pub async fn bulk_confirm(
    pool: &DbPool,
    requests: &[ConfirmRequest],
    mode: ConfirmMode,
) -> BulkOutcome {
    let mut outcome = BulkOutcome::default();
    for req in requests {
        match confirm(
            pool,
            req.transaction_id,
            req.entity,
            req.entity_id.as_deref(),
            mode,
        )
        .await
        {
            Ok(()) => outcome.confirmed += 1,
            Err(e) => {
                outcome.failed += 1;
                outcome
                    .errors
                    .push(format!("transaction {}: {e}", req.transaction_id));
            }
        }
    }
    outcome
}
