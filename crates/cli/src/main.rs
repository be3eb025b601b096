use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Duration;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use khata_core::{DateRange, EntityKind, Money, Month};
use khata_match::{CandidatePools, CategoryRuleEngine, MatchEngine, THRESHOLD_HIGH};
use khata_storage::{ConfirmMode, ConfirmRequest, DbPool};

#[derive(Parser, Debug)]
#[command(name = "khata", version, about = "Bank statement ingestion and reconciliation")]
struct Cli {
    /// Path to the SQLite database file.
    #[arg(long, default_value = "khata.db", global = true)]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a bank statement workbook
    Import {
        /// Statement file (.xlsx, .xls, .xlsm)
        file: PathBuf,
    },

    /// Match unmatched transactions against candidate entities
    Match {
        /// Category rules file (TOML)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Auto-confirm matches in the high-confidence band
        #[arg(long)]
        auto: bool,
    },

    /// Show every candidate match for one transaction
    Suggest {
        tx_id: i64,

        /// Category rules file (TOML)
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Confirm a transaction against an entity
    Confirm {
        tx_id: i64,

        /// Entity kind: internal_transfer, salary, subscription, expense, order_payment
        entity: String,

        /// Entity id; omit for transfers and to create a new expense
        #[arg(long)]
        entity_id: Option<String>,
    },

    /// Mark a transaction ignored with a reason
    Reject {
        tx_id: i64,

        #[arg(long)]
        reason: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let pool = khata_storage::create_db(&cli.db)
        .await
        .with_context(|| format!("opening database {}", cli.db.display()))?;

    match cli.command {
        Command::Import { file } => import(&pool, &file).await,
        Command::Match { rules, auto } => run_match(&pool, rules.as_deref(), auto).await,
        Command::Suggest { tx_id, rules } => suggest(&pool, tx_id, rules.as_deref()).await,
        Command::Confirm {
            tx_id,
            entity,
            entity_id,
        } => confirm(&pool, tx_id, &entity, entity_id.as_deref()).await,
        Command::Reject { tx_id, reason } => {
            khata_storage::reject(&pool, tx_id, &reason).await?;
            println!("Transaction {tx_id} ignored: {reason}");
            Ok(())
        }
    }
}

async fn import(pool: &DbPool, file: &std::path::Path) -> Result<()> {
    let checksum = khata_storage::file_checksum(file)
        .with_context(|| format!("reading {}", file.display()))?;
    if let Some(import_id) = khata_storage::find_import_by_checksum(pool, &checksum).await? {
        bail!(
            "{} was already imported (import #{import_id}); identical contents",
            file.display()
        );
    }

    let parsed = khata_ingest::import_statement(file)?;
    let statement_id = khata_storage::insert_statement(pool, &parsed.statement).await?;
    for tx in &parsed.transactions {
        khata_storage::insert_transaction(pool, statement_id, tx).await?;
    }
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());
    khata_storage::record_import(pool, &file_name, &checksum, statement_id).await?;

    println!(
        "Imported {} {} statement: {} transactions ({} to {}), closing balance {}",
        parsed.statement.bank,
        parsed.statement.account_number,
        parsed.transactions.len(),
        parsed.statement.period.start,
        parsed.statement.period.end,
        Money::from_cents(parsed.statement.closing_balance_cents),
    );
    Ok(())
}

fn load_rules(path: Option<&std::path::Path>) -> Result<CategoryRuleEngine> {
    match path {
        Some(p) => {
            let content = std::fs::read_to_string(p)
                .with_context(|| format!("reading rules file {}", p.display()))?;
            let engine = CategoryRuleEngine::from_toml(&content)?;
            info!(rules = engine.len(), "loaded category rules");
            Ok(engine)
        }
        None => Ok(CategoryRuleEngine::empty()),
    }
}

/// One pool fetch covers the whole batch: salaries for every month the
/// batch touches, expenses inside the batch's date window plus matching
/// slack on both sides.
async fn build_pools(
    pool: &DbPool,
    transactions: &[khata_core::BankTransaction],
) -> Result<CandidatePools> {
    let months: BTreeSet<(i32, u32)> = transactions
        .iter()
        .map(|tx| {
            let m = Month::of(tx.date);
            (m.year, m.month)
        })
        .collect();
    let mut salaries = Vec::new();
    for (year, month) in months {
        if let Some(m) = Month::new(year, month) {
            salaries.extend(khata_storage::get_salaries_for_month(pool, m).await?);
        }
    }

    let expenses = match (
        transactions.iter().map(|t| t.date).min(),
        transactions.iter().map(|t| t.date).max(),
    ) {
        (Some(min), Some(max)) => {
            let window = DateRange::new(min - Duration::days(14), max + Duration::days(14));
            khata_storage::get_pending_expenses(pool, window).await?
        }
        _ => Vec::new(),
    };

    Ok(CandidatePools {
        salaries,
        subscriptions: khata_storage::get_active_subscriptions(pool).await?,
        expenses,
        orders: khata_storage::get_unsettled_orders(pool).await?,
        own_accounts: khata_storage::get_own_accounts(pool).await?,
    })
}

async fn run_match(pool: &DbPool, rules: Option<&std::path::Path>, auto: bool) -> Result<()> {
    let engine = MatchEngine::new(load_rules(rules)?);
    let unmatched = khata_storage::get_unmatched_transactions(pool).await?;
    if unmatched.is_empty() {
        println!("No unmatched transactions.");
        return Ok(());
    }

    let pools = build_pools(pool, &unmatched).await?;
    let results = engine.match_batch(&unmatched, &pools);
    println!(
        "{} of {} unmatched transactions have a candidate:",
        results.len(),
        unmatched.len()
    );

    let mut auto_requests = Vec::new();
    for batch_match in &results {
        let m = &batch_match.result;
        let tx_id = batch_match.transaction_id.unwrap_or_default();
        println!(
            "  #{tx_id} -> {} [{}] confidence {} ({})",
            m.description,
            m.entity,
            m.confidence,
            m.kind.as_str()
        );
        for reason in m.reasons() {
            println!("      {reason}");
        }
        if auto && m.confidence >= THRESHOLD_HIGH {
            auto_requests.push(ConfirmRequest {
                transaction_id: tx_id,
                entity: m.entity,
                entity_id: (!m.entity_id.is_empty()).then(|| m.entity_id.clone()),
            });
        }
    }

    if auto {
        let outcome = khata_storage::bulk_confirm(pool, &auto_requests, ConfirmMode::Auto).await;
        println!(
            "Auto-confirmed {} matches ({} failed)",
            outcome.confirmed, outcome.failed
        );
        for err in &outcome.errors {
            warn!("{err}");
        }
    }
    Ok(())
}

async fn suggest(pool: &DbPool, tx_id: i64, rules: Option<&std::path::Path>) -> Result<()> {
    let tx = khata_storage::get_transaction(pool, tx_id)
        .await?
        .with_context(|| format!("transaction {tx_id} not found"))?;
    let engine = MatchEngine::new(load_rules(rules)?);
    let pools = build_pools(pool, std::slice::from_ref(&tx)).await?;

    let suggestions = engine.suggest(&tx, &pools);
    if suggestions.is_empty() {
        println!("No candidates for transaction {tx_id}.");
        return Ok(());
    }
    println!(
        "{}: {} ({} {})",
        tx.date,
        tx.description,
        tx.tx_type,
        Money::from_cents(tx.amount_cents)
    );
    for m in &suggestions {
        println!(
            "  {} [{}] confidence {} ({})",
            m.description,
            m.entity,
            m.confidence,
            m.kind.as_str()
        );
        for reason in m.reasons() {
            println!("      {reason}");
        }
    }
    Ok(())
}

async fn confirm(
    pool: &DbPool,
    tx_id: i64,
    entity: &str,
    entity_id: Option<&str>,
) -> Result<()> {
    let kind: EntityKind = entity
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    khata_storage::confirm(pool, tx_id, kind, entity_id, ConfirmMode::Manual).await?;
    println!("Transaction {tx_id} confirmed as {kind}.");
    Ok(())
}
