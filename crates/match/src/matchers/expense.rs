use khata_core::{BankTransaction, EntityKind, Expense, PaymentStatus};

use crate::score::{amount_signal, date_signal, identity_signal, MultiEntityMatch};

use super::THRESHOLD_LOW;

/// Best pending-expense candidate for a debit, or none. Expenses already
/// marked paid have left the pool.
pub fn match_expense(tx: &BankTransaction, pool: &[Expense]) -> Option<MultiEntityMatch> {
    if !tx.is_debit() {
        return None;
    }

    pool.iter()
        .filter(|exp| exp.status == PaymentStatus::Pending)
        .filter_map(|exp| score_candidate(tx, exp))
        .filter(|m| m.confidence >= THRESHOLD_LOW)
        .max_by_key(|m| m.confidence)
}

fn score_candidate(tx: &BankTransaction, exp: &Expense) -> Option<MultiEntityMatch> {
    let counterparty = tx.counterparty.as_deref().unwrap_or("");
    let texts = [tx.description.as_str(), counterparty];

    let mut signals = Vec::new();
    if let Some(s) = identity_signal(&exp.description, &texts, &[]) {
        signals.push(s);
    }
    if let Some(s) = amount_signal(tx.amount_cents, exp.amount_cents) {
        signals.push(s);
    }
    if let Some(s) = date_signal(tx.date, exp.date) {
        signals.push(s);
    }
    if signals.is_empty() {
        return None;
    }

    Some(MultiEntityMatch::from_signals(
        EntityKind::Expense,
        exp.id.to_string(),
        format!("Expense: {} ({})", exp.description, exp.category),
        signals,
    ))
}
