use khata_core::{BankTransaction, EntityKind, OrderPayment};

use crate::score::{date_signal, MultiEntityMatch, Signal, SignalKind};

use super::ORDER_FLOOR;

const ORDER_AMOUNT_EXACT_POINTS: i64 = 50;
const ORDER_AMOUNT_NEAR_POINTS: i64 = 30;
const ORDER_REF_POINTS: i64 = 40;

/// Best unsettled order-payment candidate for an incoming credit, or
/// none. Amount carries more weight here than in the generic model since
/// client remittances rarely name the order in the narration.
pub fn match_order(tx: &BankTransaction, pool: &[OrderPayment]) -> Option<MultiEntityMatch> {
    if !tx.is_credit() {
        return None;
    }

    pool.iter()
        .filter(|order| !order.settled)
        .filter_map(|order| score_candidate(tx, order))
        .filter(|m| m.confidence >= ORDER_FLOOR)
        .max_by_key(|m| m.confidence)
}

fn score_candidate(tx: &BankTransaction, order: &OrderPayment) -> Option<MultiEntityMatch> {
    let mut signals = Vec::new();

    let diff = (tx.amount_cents - order.amount_cents).abs();
    if diff <= 1 {
        signals.push(Signal::new(
            SignalKind::Amount,
            ORDER_AMOUNT_EXACT_POINTS,
            "exact amount match",
        ));
    } else if order.amount_cents > 0 {
        let pct = diff as f64 * 100.0 / order.amount_cents as f64;
        if pct <= 5.0 {
            signals.push(Signal::new(
                SignalKind::Amount,
                ORDER_AMOUNT_NEAR_POINTS,
                format!("amount within 5% ({pct:.1}%)"),
            ));
        }
    }

    let order_ref = order.order_ref.trim();
    if !order_ref.is_empty() && contains_reference(&tx.description, order_ref) {
        signals.push(Signal::new(
            SignalKind::Identity,
            ORDER_REF_POINTS,
            format!("order reference '{order_ref}' in description"),
        ));
    }

    if let Some(expected) = order.expected_date {
        if let Some(s) = date_signal(tx.date, expected) {
            signals.push(s);
        }
    }

    if signals.is_empty() {
        return None;
    }

    Some(MultiEntityMatch::from_signals(
        EntityKind::OrderPayment,
        order.id.to_string(),
        format!("Order payment: {}", order.order_ref),
        signals,
    ))
}

/// Case-insensitive containment on token boundaries: the reference may not
/// continue into adjacent alphanumerics, so `ORD-2` never claims the
/// identity signal from a narration carrying `ORD-2044`.
fn contains_reference(description: &str, order_ref: &str) -> bool {
    let hay = description.to_lowercase();
    let needle = order_ref.to_lowercase();
    let bytes = hay.as_bytes();
    let step = needle.chars().next().map_or(1, char::len_utf8);
    let mut from = 0;
    while let Some(pos) = hay[from..].find(&needle) {
        let at = from + pos;
        let end = at + needle.len();
        let open = at == 0 || !bytes[at - 1].is_ascii_alphanumeric();
        let closed = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
        if open && closed {
            return true;
        }
        from = at + step;
    }
    false
}
