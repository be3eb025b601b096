use khata_core::{BankTransaction, EntityKind, PaymentStatus, Salary};

use crate::score::{
    amount_signal, date_signal, identity_signal, total, MultiEntityMatch, Signal, SignalKind,
};

use super::{ALREADY_PAID_PENALTY, THRESHOLD_LOW};

/// Best salary candidate for a debit, or none. Salaries already marked
/// paid stay in the running with a penalty so a duplicate payment still
/// surfaces as a low-confidence warning.
pub fn match_salary(tx: &BankTransaction, pool: &[Salary]) -> Option<MultiEntityMatch> {
    if !tx.is_debit() {
        return None;
    }

    pool.iter()
        .filter_map(|salary| score_candidate(tx, salary))
        .filter(|m| m.confidence >= THRESHOLD_LOW)
        .max_by_key(|m| m.confidence)
}

fn score_candidate(tx: &BankTransaction, salary: &Salary) -> Option<MultiEntityMatch> {
    let counterparty = tx.counterparty.as_deref().unwrap_or("");
    let texts = [tx.description.as_str(), counterparty];

    let mut signals = Vec::new();
    if let Some(s) = identity_signal(&salary.employee_name, &texts, &[]) {
        signals.push(s);
    }
    if let Some(s) = amount_signal(tx.amount_cents, salary.amount_cents) {
        signals.push(s);
    }
    // Salaries are due at the end of their period month.
    if let Some(s) = date_signal(tx.date, salary.month.last_day()) {
        signals.push(s);
    }
    if signals.is_empty() {
        return None;
    }

    if salary.status == PaymentStatus::Paid {
        signals.push(Signal::new(
            SignalKind::Adjustment,
            ALREADY_PAID_PENALTY,
            "salary already marked paid",
        ));
    }

    if total(&signals) == 0 {
        return None;
    }

    Some(MultiEntityMatch::from_signals(
        EntityKind::Salary,
        salary.id.to_string(),
        format!("Salary: {} ({})", salary.employee_name, salary.month),
        signals,
    ))
}
