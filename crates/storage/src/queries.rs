use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use std::path::Path;

use khata_core::{
    BankCode, BankStatement, BankTransaction, DateRange, Expense, MatchStatus, Month,
    OrderPayment, PaymentStatus, Salary, Subscription, SubscriptionCadence, TransactionType,
};

use crate::db::DbPool;

pub async fn insert_statement(pool: &DbPool, stmt: &BankStatement) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO statements
            (bank, account_number, account_name, period_start, period_end,
             opening_balance_cents, closing_balance_cents, total_debits_cents, total_credits_cents)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(stmt.bank.as_str())
    .bind(&stmt.account_number)
    .bind(&stmt.account_name)
    .bind(stmt.period.start)
    .bind(stmt.period.end)
    .bind(stmt.opening_balance_cents)
    .bind(stmt.closing_balance_cents)
    .bind(stmt.total_debits_cents)
    .bind(stmt.total_credits_cents)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn insert_transaction(
    pool: &DbPool,
    statement_id: i64,
    tx: &BankTransaction,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO bank_transactions
            (statement_id, bank, account_number, date, value_date, posted_date,
             description, reference, amount_cents, tx_type, balance_cents,
             payment_method, counterparty, counterparty_bank, purpose, match_status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(statement_id)
    .bind(tx.bank.as_str())
    .bind(&tx.account_number)
    .bind(tx.date)
    .bind(tx.value_date)
    .bind(tx.posted_date)
    .bind(&tx.description)
    .bind(&tx.reference)
    .bind(tx.amount_cents)
    .bind(tx.tx_type.as_str())
    .bind(tx.balance_cents)
    .bind(tx.payment_method.map(|m| m.as_str()))
    .bind(&tx.counterparty)
    .bind(&tx.counterparty_bank)
    .bind(tx.purpose.map(|p| p.as_str()))
    .bind(tx.match_status.as_str())
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

#[derive(sqlx::FromRow)]
struct TxRow {
    id: i64,
    statement_id: Option<i64>,
    bank: String,
    account_number: String,
    date: NaiveDate,
    value_date: NaiveDate,
    posted_date: Option<NaiveDate>,
    description: String,
    reference: Option<String>,
    amount_cents: i64,
    tx_type: String,
    balance_cents: Option<i64>,
    payment_method: Option<String>,
    counterparty: Option<String>,
    counterparty_bank: Option<String>,
    purpose: Option<String>,
    match_status: String,
    matched_entity: Option<String>,
    matched_entity_id: Option<String>,
    match_confidence: Option<i64>,
    match_reason: Option<String>,
}

const TX_COLUMNS: &str = "id, statement_id, bank, account_number, date, value_date, posted_date, \
     description, reference, amount_cents, tx_type, balance_cents, payment_method, \
     counterparty, counterparty_bank, purpose, match_status, matched_entity, \
     matched_entity_id, match_confidence, match_reason";

fn tx_from_row(r: TxRow) -> BankTransaction {
    BankTransaction {
        id: Some(r.id),
        statement_id: r.statement_id,
        bank: r.bank.parse().unwrap_or(BankCode::Other),
        account_number: r.account_number,
        date: r.date,
        value_date: r.value_date,
        posted_date: r.posted_date,
        description: r.description,
        reference: r.reference,
        amount_cents: r.amount_cents,
        tx_type: r.tx_type.parse().unwrap_or(TransactionType::Debit),
        balance_cents: r.balance_cents,
        payment_method: r.payment_method.and_then(|s| s.parse().ok()),
        counterparty: r.counterparty,
        counterparty_bank: r.counterparty_bank,
        purpose: r.purpose.and_then(|s| s.parse().ok()),
        match_status: r.match_status.parse().unwrap_or(MatchStatus::Unmatched),
        matched_entity: r.matched_entity.and_then(|s| s.parse().ok()),
        matched_entity_id: r.matched_entity_id,
        match_confidence: r.match_confidence.map(|c| c.clamp(0, 100) as u8),
        match_reason: r.match_reason,
    }
}

pub async fn get_transaction(
    pool: &DbPool,
    id: i64,
) -> Result<Option<BankTransaction>, sqlx::Error> {
    let row = sqlx::query_as::<_, TxRow>(&format!(
        "SELECT {TX_COLUMNS} FROM bank_transactions WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(tx_from_row))
}

pub async fn get_unmatched_transactions(
    pool: &DbPool,
) -> Result<Vec<BankTransaction>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TxRow>(&format!(
        "SELECT {TX_COLUMNS} FROM bank_transactions WHERE match_status = 'unmatched' ORDER BY date, id"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(tx_from_row).collect())
}

pub async fn get_transactions_for_statement(
    pool: &DbPool,
    statement_id: i64,
) -> Result<Vec<BankTransaction>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TxRow>(&format!(
        "SELECT {TX_COLUMNS} FROM bank_transactions WHERE statement_id = ? ORDER BY date, id"
    ))
    .bind(statement_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(tx_from_row).collect())
}

pub async fn get_statement(
    pool: &DbPool,
    id: i64,
) -> Result<Option<BankStatement>, sqlx::Error> {
    let row = sqlx::query_as::<_, (i64, String, String, String, NaiveDate, NaiveDate, i64, i64, i64, i64)>(
        "SELECT id, bank, account_number, account_name, period_start, period_end, \
         opening_balance_cents, closing_balance_cents, total_debits_cents, total_credits_cents \
         FROM statements WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| BankStatement {
        id: Some(r.0),
        bank: r.1.parse().unwrap_or(BankCode::Other),
        account_number: r.2,
        account_name: r.3,
        period: DateRange::new(r.4, r.5),
        opening_balance_cents: r.6,
        closing_balance_cents: r.7,
        total_debits_cents: r.8,
        total_credits_cents: r.9,
    }))
}

// ── candidate entity pools ──

pub async fn get_salaries_for_month(
    pool: &DbPool,
    month: Month,
) -> Result<Vec<Salary>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, String, i64, i64, i64, String, Option<NaiveDate>)>(
        "SELECT id, employee_name, year, month, amount_cents, status, paid_date \
         FROM salaries WHERE year = ? AND month = ? ORDER BY employee_name",
    )
    .bind(month.year)
    .bind(month.month as i64)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .filter_map(|r| {
            Some(Salary {
                id: r.0,
                employee_name: r.1,
                month: Month::new(r.2 as i32, r.3 as u32)?,
                amount_cents: r.4,
                status: r.5.parse().unwrap_or(PaymentStatus::Pending),
                paid_date: r.6,
            })
        })
        .collect())
}

pub async fn get_active_subscriptions(pool: &DbPool) -> Result<Vec<Subscription>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (
        i64,
        String,
        String,
        i64,
        Option<i64>,
        Option<String>,
        String,
        i64,
        i64,
        Option<NaiveDate>,
        String,
        Option<String>,
    )>(
        "SELECT id, platform, plan, amount_cents, foreign_amount_cents, foreign_currency, \
         cadence, active, auto_renew, next_renewal, alt_names, match_pattern \
         FROM subscriptions WHERE active = 1 ORDER BY platform",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| Subscription {
            id: r.0,
            platform: r.1,
            plan: r.2,
            amount_cents: r.3,
            foreign_amount_cents: r.4,
            foreign_currency: r.5,
            cadence: r.6.parse().unwrap_or(SubscriptionCadence::Monthly),
            active: r.7 != 0,
            auto_renew: r.8 != 0,
            next_renewal: r.9,
            alt_names: serde_json::from_str(&r.10).unwrap_or_default(),
            match_pattern: r.11,
        })
        .collect())
}

/// Pending expenses inside the date window, the candidate pool for one
/// matching batch.
pub async fn get_pending_expenses(
    pool: &DbPool,
    window: DateRange,
) -> Result<Vec<Expense>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, String, String, i64, NaiveDate, String)>(
        "SELECT id, category, description, amount_cents, date, status \
         FROM expenses WHERE status = 'pending' AND date >= ? AND date <= ? ORDER BY date",
    )
    .bind(window.start)
    .bind(window.end)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| Expense {
            id: r.0,
            category: r.1,
            description: r.2,
            amount_cents: r.3,
            date: r.4,
            status: r.5.parse().unwrap_or(PaymentStatus::Pending),
        })
        .collect())
}

pub async fn get_unsettled_orders(pool: &DbPool) -> Result<Vec<OrderPayment>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, String, i64, Option<NaiveDate>, i64)>(
        "SELECT id, order_ref, amount_cents, expected_date, settled \
         FROM order_payments WHERE settled = 0 ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| OrderPayment {
            id: r.0,
            order_ref: r.1,
            amount_cents: r.2,
            expected_date: r.3,
            settled: r.4 != 0,
        })
        .collect())
}

/// Every account number a statement has ever been imported for. Used for
/// internal-transfer detection.
pub async fn get_own_accounts(pool: &DbPool) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String,)>(
        "SELECT DISTINCT account_number FROM statements ORDER BY account_number",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

// ── import dedup ──

/// SHA-256 of the file contents, hex-encoded. Identical files re-uploaded
/// under different names still collide.
pub fn file_checksum(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

pub async fn find_import_by_checksum(
    pool: &DbPool,
    checksum: &str,
) -> Result<Option<i64>, sqlx::Error> {
    let row = sqlx::query_as::<_, (i64,)>("SELECT id FROM imports WHERE checksum = ?")
        .bind(checksum)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.0))
}

pub async fn record_import(
    pool: &DbPool,
    file_name: &str,
    checksum: &str,
    statement_id: i64,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO imports (file_name, checksum, statement_id) VALUES (?, ?, ?)",
    )
    .bind(file_name)
    .bind(checksum)
    .bind(statement_id)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

// ── entity upkeep used by tests and the CLI ──

pub async fn insert_salary(pool: &DbPool, salary: &Salary) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO salaries (employee_name, year, month, amount_cents, status, paid_date) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&salary.employee_name)
    .bind(salary.month.year)
    .bind(salary.month.month as i64)
    .bind(salary.amount_cents)
    .bind(salary.status.as_str())
    .bind(salary.paid_date)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn insert_subscription(
    pool: &DbPool,
    sub: &Subscription,
) -> Result<i64, sqlx::Error> {
    let alt_names = serde_json::to_string(&sub.alt_names).unwrap_or_else(|_| "[]".to_string());
    let result = sqlx::query(
        "INSERT INTO subscriptions \
            (platform, plan, amount_cents, foreign_amount_cents, foreign_currency, cadence, \
             active, auto_renew, next_renewal, alt_names, match_pattern) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&sub.platform)
    .bind(&sub.plan)
    .bind(sub.amount_cents)
    .bind(sub.foreign_amount_cents)
    .bind(&sub.foreign_currency)
    .bind(sub.cadence.as_str())
    .bind(sub.active as i64)
    .bind(sub.auto_renew as i64)
    .bind(sub.next_renewal)
    .bind(alt_names)
    .bind(&sub.match_pattern)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

// Generic over the executor so confirmation can run it inside its own
// database transaction.
pub async fn insert_expense<'e, E>(executor: E, expense: &Expense) -> Result<i64, sqlx::Error>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "INSERT INTO expenses (category, description, amount_cents, date, status) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&expense.category)
    .bind(&expense.description)
    .bind(expense.amount_cents)
    .bind(expense.date)
    .bind(expense.status.as_str())
    .execute(executor)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn insert_order_payment(
    pool: &DbPool,
    order: &OrderPayment,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO order_payments (order_ref, amount_cents, expected_date, settled) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(&order.order_ref)
    .bind(order.amount_cents)
    .bind(order.expected_date)
    .bind(order.settled as i64)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}
