use khata_core::{BankTransaction, EntityKind, Subscription};

use crate::score::{
    amount_signal, date_signal, identity_signal, pattern_signal, MultiEntityMatch,
};

use super::THRESHOLD_LOW;

/// Best subscription candidate for a debit, or none. Inactive
/// subscriptions are never candidates.
pub fn match_subscription(
    tx: &BankTransaction,
    pool: &[Subscription],
) -> Option<MultiEntityMatch> {
    if !tx.is_debit() {
        return None;
    }

    pool.iter()
        .filter(|sub| sub.active)
        .filter_map(|sub| score_candidate(tx, sub))
        .filter(|m| m.confidence >= THRESHOLD_LOW)
        .max_by_key(|m| m.confidence)
}

fn score_candidate(tx: &BankTransaction, sub: &Subscription) -> Option<MultiEntityMatch> {
    let counterparty = tx.counterparty.as_deref().unwrap_or("");
    let texts = [tx.description.as_str(), counterparty];

    let mut signals = Vec::new();
    if let Some(s) = identity_signal(&sub.platform, &texts, &sub.alt_names) {
        signals.push(s);
    }
    // Foreign-currency charges settle in local currency at a drifting
    // rate, so score against whichever stored amount sits closer.
    let local = amount_signal(tx.amount_cents, sub.amount_cents);
    let foreign = sub
        .foreign_amount_cents
        .and_then(|cents| amount_signal(tx.amount_cents, cents));
    if let Some(s) = [local, foreign]
        .into_iter()
        .flatten()
        .max_by_key(|s| s.points)
    {
        signals.push(s);
    }
    if let Some(renewal) = sub.next_renewal {
        if let Some(s) = date_signal(tx.date, renewal) {
            signals.push(s);
        }
    }
    if let Some(pattern) = &sub.match_pattern {
        if let Some(s) = pattern_signal(pattern, &tx.description) {
            signals.push(s);
        }
    }
    if signals.is_empty() {
        return None;
    }

    Some(MultiEntityMatch::from_signals(
        EntityKind::Subscription,
        sub.id.to_string(),
        format!("Subscription: {} ({})", sub.platform, sub.plan),
        signals,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use khata_core::{BankCode, MatchStatus, SubscriptionCadence, TransactionType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(desc: &str, amount_cents: i64, on: NaiveDate) -> BankTransaction {
        BankTransaction {
            id: Some(1),
            statement_id: None,
            bank: BankCode::Icici,
            account_number: "0042".to_string(),
            date: on,
            value_date: on,
            posted_date: None,
            description: desc.to_string(),
            reference: None,
            amount_cents,
            tx_type: TransactionType::Debit,
            balance_cents: None,
            payment_method: None,
            counterparty: None,
            counterparty_bank: None,
            purpose: None,
            match_status: MatchStatus::Unmatched,
            matched_entity: None,
            matched_entity_id: None,
            match_confidence: None,
            match_reason: None,
        }
    }

    fn sub(id: i64, platform: &str, amount_cents: i64) -> Subscription {
        Subscription {
            id,
            platform: platform.to_string(),
            plan: "Standard".to_string(),
            amount_cents,
            foreign_amount_cents: None,
            foreign_currency: None,
            cadence: SubscriptionCadence::Monthly,
            active: true,
            auto_renew: true,
            next_renewal: None,
            alt_names: Vec::new(),
            match_pattern: None,
        }
    }

    #[test]
    fn exact_platform_and_amount_and_renewal_date_auto_matches() {
        let mut s = sub(7, "Netflix", 64_900);
        s.next_renewal = Some(date(2020, 12, 15));
        let t = tx("ACH D- NETFLIX ENTERTAINMENT", 64_900, date(2020, 12, 16));
        let m = match_subscription(&t, &[s]).unwrap();
        assert!(m.confidence >= 80, "got {}", m.confidence);
    }

    #[test]
    fn alternate_name_carries_the_identity_signal() {
        let mut s = sub(9, "AWS", 310_000);
        s.alt_names = vec!["AMAZON WEB SERVICES".to_string()];
        let t = tx("POS 4160 AMAZON WEB SERVICES", 310_000, date(2020, 12, 3));
        let m = match_subscription(&t, &[s]).unwrap();
        assert!(m.confidence >= 60, "got {}", m.confidence);
    }

    #[test]
    fn foreign_amount_scores_when_closer_than_local() {
        let mut s = sub(4, "Figma", 112_000);
        s.foreign_amount_cents = Some(1_500);
        // Settled near the stored local amount's 5% band.
        let t = tx("POS 9999 FIGMA INC", 114_500, date(2020, 6, 1));
        let m = match_subscription(&t, &[s]).unwrap();
        assert!(m.confidence >= 60, "got {}", m.confidence);
    }

    #[test]
    fn pattern_rule_adds_the_bonus() {
        let mut with_pattern = sub(2, "Spotify", 11_900);
        with_pattern.match_pattern = Some(r"SPOTIFY|SPOT\d+".to_string());
        let plain = sub(3, "Spotify", 11_900);

        let t = tx("ACH D- SPOTIFY SWEDEN", 11_900, date(2020, 5, 4));
        let scored = match_subscription(&t, &[with_pattern]).unwrap();
        let baseline = match_subscription(&t, &[plain]).unwrap();
        assert!(scored.confidence > baseline.confidence);
    }

    #[test]
    fn inactive_subscriptions_are_skipped() {
        let mut s = sub(7, "Netflix", 64_900);
        s.active = false;
        let t = tx("ACH D- NETFLIX ENTERTAINMENT", 64_900, date(2020, 12, 16));
        assert!(match_subscription(&t, &[s]).is_none());
    }

    #[test]
    fn unrelated_debit_yields_nothing() {
        let s = sub(7, "Netflix", 64_900);
        let t = tx("POS GROCERY MART", 4_200, date(2020, 12, 16));
        assert!(match_subscription(&t, &[s]).is_none());
    }
}
