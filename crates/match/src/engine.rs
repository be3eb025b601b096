use khata_core::{BankTransaction, EntityKind, Expense, OrderPayment, Salary, Subscription};
use tracing::debug;

use crate::matchers::{
    match_expense, match_order, match_salary, match_subscription, match_transfer,
    THRESHOLD_MEDIUM,
};
use crate::rules::CategoryRuleEngine;
use crate::score::{MultiEntityMatch, Signal, SignalKind};

/// Read-only snapshot of candidate entities, fetched once per batch and
/// shared by every transaction in it. Scoring never mutates it.
#[derive(Debug, Default, Clone)]
pub struct CandidatePools {
    pub salaries: Vec<Salary>,
    pub subscriptions: Vec<Subscription>,
    pub expenses: Vec<Expense>,
    pub orders: Vec<OrderPayment>,
    /// The organization's own account numbers, for transfer detection.
    pub own_accounts: Vec<String>,
}

/// One proposed match tied back to the transaction it was scored for.
#[derive(Debug, Clone)]
pub struct BatchMatch {
    pub transaction_id: Option<i64>,
    pub result: MultiEntityMatch,
}

/// Default order matchers are tried in for a debit. Used only to break
/// confidence ties; every matcher always runs.
const DEBIT_PRIORITY: [EntityKind; 4] = [
    EntityKind::InternalTransfer,
    EntityKind::Salary,
    EntityKind::Subscription,
    EntityKind::Expense,
];

pub struct MatchEngine {
    rules: CategoryRuleEngine,
}

impl MatchEngine {
    pub fn new(rules: CategoryRuleEngine) -> Self {
        Self { rules }
    }

    pub fn without_rules() -> Self {
        Self {
            rules: CategoryRuleEngine::empty(),
        }
    }

    /// Best match for a single transaction across all applicable entity
    /// kinds, or none. Every matcher runs; the highest confidence wins,
    /// and the per-kind priority order (with a rule hint promoted to the
    /// front) only breaks exact ties.
    pub fn match_one(
        &self,
        tx: &BankTransaction,
        pools: &CandidatePools,
    ) -> Option<MultiEntityMatch> {
        if !tx.is_matchable() {
            return None;
        }

        let hint = self.rules.find_hint(&tx.description);
        let candidates = self.collect_candidates(tx, pools);

        let mut ranked: Vec<(usize, MultiEntityMatch)> = candidates
            .into_iter()
            .map(|m| (self.tie_break_rank(m.entity, hint.and_then(|r| r.entity_hint)), m))
            .collect();
        ranked.sort_by(|a, b| b.1.confidence.cmp(&a.1.confidence).then(a.0.cmp(&b.0)));

        let best = ranked.into_iter().next().map(|(_, m)| m);

        // Nothing reached the suggestion band; a rule that hints "expense"
        // still lets the reviewer create a new expense straight from the
        // transaction. A candidate stuck between its matcher's floor and
        // the band must not swallow that suggestion.
        if best
            .as_ref()
            .map_or(true, |m| m.confidence < THRESHOLD_MEDIUM)
        {
            if let Some(fallback) = self.new_expense_fallback(tx, hint) {
                return Some(fallback);
            }
        }
        best
    }

    /// Batch API: one result per transaction that reached the suggestion
    /// band or better. Below-band transactions stay unmatched and are
    /// simply absent from the output.
    pub fn match_batch(
        &self,
        transactions: &[BankTransaction],
        pools: &CandidatePools,
    ) -> Vec<BatchMatch> {
        let results: Vec<BatchMatch> = transactions
            .iter()
            .filter_map(|tx| {
                self.match_one(tx, pools)
                    .filter(|m| m.confidence >= THRESHOLD_MEDIUM)
                    .map(|result| BatchMatch {
                        transaction_id: tx.id,
                        result,
                    })
            })
            .collect();
        debug!(
            scanned = transactions.len(),
            matched = results.len(),
            "matched transaction batch"
        );
        results
    }

    /// Every candidate that cleared its matcher's floor, best first. For
    /// review screens that show alternatives beside the top pick.
    pub fn suggest(&self, tx: &BankTransaction, pools: &CandidatePools) -> Vec<MultiEntityMatch> {
        if !tx.is_matchable() {
            return Vec::new();
        }
        let hint = self.rules.find_hint(&tx.description);
        let mut ranked: Vec<(usize, MultiEntityMatch)> = self
            .collect_candidates(tx, pools)
            .into_iter()
            .map(|m| (self.tie_break_rank(m.entity, hint.and_then(|r| r.entity_hint)), m))
            .collect();
        ranked.sort_by(|a, b| b.1.confidence.cmp(&a.1.confidence).then(a.0.cmp(&b.0)));
        ranked.into_iter().map(|(_, m)| m).collect()
    }

    fn collect_candidates(
        &self,
        tx: &BankTransaction,
        pools: &CandidatePools,
    ) -> Vec<MultiEntityMatch> {
        if tx.is_debit() {
            [
                match_transfer(tx, &pools.own_accounts),
                match_salary(tx, &pools.salaries),
                match_subscription(tx, &pools.subscriptions),
                match_expense(tx, &pools.expenses),
            ]
            .into_iter()
            .flatten()
            .collect()
        } else {
            match_order(tx, &pools.orders).into_iter().collect()
        }
    }

    fn tie_break_rank(&self, entity: EntityKind, hint: Option<EntityKind>) -> usize {
        if Some(entity) == hint {
            return 0;
        }
        DEBIT_PRIORITY
            .iter()
            .position(|k| *k == entity)
            .map(|p| p + 1)
            .unwrap_or(DEBIT_PRIORITY.len() + 1)
    }

    fn new_expense_fallback(
        &self,
        tx: &BankTransaction,
        hint: Option<&crate::rules::CategoryRule>,
    ) -> Option<MultiEntityMatch> {
        let rule = hint.filter(|r| r.entity_hint == Some(EntityKind::Expense))?;
        if !tx.is_debit() {
            return None;
        }
        let signals = vec![
            Signal::new(
                SignalKind::Pattern,
                THRESHOLD_MEDIUM as i64,
                format!("category rule '{}' ({})", rule.pattern, rule.category),
            ),
        ];
        Some(MultiEntityMatch::from_signals(
            EntityKind::Expense,
            "",
            format!("New expense: {}", rule.category),
            signals,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use khata_core::{
        BankCode, MatchStatus, Month, PaymentStatus, SubscriptionCadence, TransactionType,
    };

    use crate::rules::{CategoryRule, RuleMatchType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(id: i64, desc: &str, amount_cents: i64, on: NaiveDate) -> BankTransaction {
        BankTransaction {
            id: Some(id),
            statement_id: None,
            bank: BankCode::Hdfc,
            account_number: "50100".to_string(),
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

    fn pools() -> CandidatePools {
        CandidatePools {
            salaries: vec![Salary {
                id: 1,
                employee_name: "Net Banking".to_string(),
                month: Month::new(2020, 12).unwrap(),
                amount_cents: 64_900,
                status: PaymentStatus::Pending,
                paid_date: None,
            }],
            subscriptions: vec![Subscription {
                id: 7,
                platform: "Netflix".to_string(),
                plan: "Premium".to_string(),
                amount_cents: 64_900,
                foreign_amount_cents: None,
                foreign_currency: None,
                cadence: SubscriptionCadence::Monthly,
                active: true,
                auto_renew: true,
                next_renewal: Some(date(2020, 12, 15)),
                alt_names: Vec::new(),
                match_pattern: None,
            }],
            expenses: Vec::new(),
            orders: Vec::new(),
            own_accounts: Vec::new(),
        }
    }

    // ── best-across-types orchestration ──

    #[test]
    fn strong_subscription_beats_weak_salary() {
        // The salary's partial name overlap clears the low floor, but the
        // subscription scores far higher; it must win even though salary
        // sits earlier in the priority order.
        let engine = MatchEngine::without_rules();
        let t = tx(1, "ACH D- NETFLIX ENTERTAINMENT NET", 64_900, date(2020, 12, 16));
        let m = engine.match_one(&t, &pools()).unwrap();
        assert_eq!(m.entity, EntityKind::Subscription);
        assert_eq!(m.entity_id, "7");
    }

    #[test]
    fn already_matched_transactions_are_skipped() {
        let engine = MatchEngine::without_rules();
        let mut t = tx(1, "ACH D- NETFLIX", 64_900, date(2020, 12, 16));
        t.match_status = MatchStatus::Matched;
        assert!(engine.match_one(&t, &pools()).is_none());
        t.match_status = MatchStatus::Ignored;
        assert!(engine.match_one(&t, &pools()).is_none());
    }

    #[test]
    fn batch_emits_only_the_suggestion_band_and_above() {
        let engine = MatchEngine::without_rules();
        let batch = vec![
            tx(1, "ACH D- NETFLIX ENTERTAINMENT", 64_900, date(2020, 12, 16)),
            tx(2, "POS GROCERY MART", 4_200, date(2020, 12, 16)),
        ];
        let results = engine.match_batch(&batch, &pools());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].transaction_id, Some(1));
        assert!(results[0].result.confidence >= 60);
    }

    #[test]
    fn matching_is_idempotent_over_a_static_pool() {
        let engine = MatchEngine::without_rules();
        let p = pools();
        let t = tx(1, "ACH D- NETFLIX ENTERTAINMENT", 64_900, date(2020, 12, 16));
        let a = engine.match_one(&t, &p).unwrap();
        let b = engine.match_one(&t, &p).unwrap();
        assert_eq!(a.entity_id, b.entity_id);
        assert_eq!(a.confidence, b.confidence);
    }

    #[test]
    fn suggest_lists_alternatives_best_first() {
        let engine = MatchEngine::without_rules();
        let t = tx(1, "ACH D- NETFLIX ENTERTAINMENT NET BANKING", 64_900, date(2020, 12, 16));
        let suggestions = engine.suggest(&t, &pools());
        assert!(suggestions.len() >= 2);
        assert!(suggestions[0].confidence >= suggestions[1].confidence);
        assert_eq!(suggestions[0].entity, EntityKind::Subscription);
    }

    // ── rule hints ──

    #[test]
    fn expense_hint_creates_a_new_expense_suggestion() {
        let rules = CategoryRuleEngine::new(vec![CategoryRule {
            pattern: "courier".to_string(),
            match_type: RuleMatchType::Contains,
            category: "Logistics".to_string(),
            entity_hint: Some(EntityKind::Expense),
            priority: 5,
            active: true,
        }])
        .unwrap();
        let engine = MatchEngine::new(rules);
        let t = tx(1, "IMPS-502-BLUEDART COURIER", 85_000, date(2020, 12, 9));
        let m = engine.match_one(&t, &CandidatePools::default()).unwrap();
        assert_eq!(m.entity, EntityKind::Expense);
        assert!(m.entity_id.is_empty());
        assert_eq!(m.confidence, 60);
    }

    #[test]
    fn below_band_candidate_does_not_swallow_the_new_expense_suggestion() {
        // An expense candidate on exact amount + 6-day date alone scores in
        // the 40s: above the expense floor, below the suggestion band. The
        // hinted create-new suggestion must still come through.
        let rules = CategoryRuleEngine::new(vec![CategoryRule {
            pattern: "courier".to_string(),
            match_type: RuleMatchType::Contains,
            category: "Logistics".to_string(),
            entity_hint: Some(EntityKind::Expense),
            priority: 5,
            active: true,
        }])
        .unwrap();
        let engine = MatchEngine::new(rules);
        let mut p = CandidatePools::default();
        p.expenses = vec![Expense {
            id: 3,
            category: "Misc".to_string(),
            description: "Vendor advance".to_string(),
            amount_cents: 85_000,
            date: date(2020, 12, 15),
            status: PaymentStatus::Pending,
        }];
        let t = tx(1, "IMPS-502-BLUEDART COURIER", 85_000, date(2020, 12, 9));

        let m = engine.match_one(&t, &p).unwrap();
        assert_eq!(m.entity, EntityKind::Expense);
        assert!(m.entity_id.is_empty());
        assert_eq!(m.confidence, 60);

        let results = engine.match_batch(std::slice::from_ref(&t), &p);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn hint_does_not_suppress_a_stronger_matcher() {
        // Rule says expense, but the subscription evidence is decisive.
        let rules = CategoryRuleEngine::new(vec![CategoryRule {
            pattern: "netflix".to_string(),
            match_type: RuleMatchType::Contains,
            category: "Misc".to_string(),
            entity_hint: Some(EntityKind::Expense),
            priority: 5,
            active: true,
        }])
        .unwrap();
        let engine = MatchEngine::new(rules);
        let t = tx(1, "ACH D- NETFLIX ENTERTAINMENT", 64_900, date(2020, 12, 16));
        let m = engine.match_one(&t, &pools()).unwrap();
        assert_eq!(m.entity, EntityKind::Subscription);
    }

    // ── credits ──

    #[test]
    fn credits_only_consider_order_payments() {
        let engine = MatchEngine::without_rules();
        let mut p = pools();
        p.orders = vec![OrderPayment {
            id: 21,
            order_ref: "ORD-2044".to_string(),
            amount_cents: 64_900,
            expected_date: None,
            settled: false,
        }];
        let mut t = tx(1, "NEFT CR-CLIENT-ORD-2044", 64_900, date(2020, 12, 16));
        t.tx_type = TransactionType::Credit;
        let m = engine.match_one(&t, &p).unwrap();
        assert_eq!(m.entity, EntityKind::OrderPayment);
    }
}
