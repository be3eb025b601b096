use khata_core::{BankTransaction, EntityKind, PaymentMethod, PurposeTag};

use crate::score::{MultiEntityMatch, Signal, SignalKind};

use super::TRANSFER_FLOOR;

const TRANSFER_MARKER_POINTS: i64 = 40;
const OWN_ACCOUNT_POINTS: i64 = 40;
const TRANSFER_PURPOSE_POINTS: i64 = 20;

/// Detects a movement between the organization's own accounts. Synthetic:
/// there is no stored entity, so a hit carries an empty entity id. Rests
/// on few signals, hence the higher acceptance floor.
pub fn match_transfer(tx: &BankTransaction, own_accounts: &[String]) -> Option<MultiEntityMatch> {
    if !tx.is_debit() {
        return None;
    }

    let mut signals = Vec::new();

    if tx.payment_method == Some(PaymentMethod::InternalTransfer) {
        signals.push(Signal::new(
            SignalKind::Identity,
            TRANSFER_MARKER_POINTS,
            "internal-transfer rail marker",
        ));
    }

    let desc_lower = tx.description.to_lowercase();
    if let Some(account) = own_accounts
        .iter()
        .filter(|a| a.len() >= 4)
        .find(|a| desc_lower.contains(&a.to_lowercase()))
    {
        signals.push(Signal::new(
            SignalKind::Pattern,
            OWN_ACCOUNT_POINTS,
            format!("own account '{account}' in description"),
        ));
    }

    if tx.purpose == Some(PurposeTag::InternalTransfer) {
        signals.push(Signal::new(
            SignalKind::Adjustment,
            TRANSFER_PURPOSE_POINTS,
            "transfer keywords in description",
        ));
    }

    if signals.is_empty() {
        return None;
    }

    let m = MultiEntityMatch::from_signals(
        EntityKind::InternalTransfer,
        "",
        "Internal transfer between own accounts",
        signals,
    );
    (m.confidence >= TRANSFER_FLOOR).then_some(m)
}
