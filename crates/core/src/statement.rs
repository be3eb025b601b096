use serde::{Deserialize, Serialize};

use super::bank::BankCode;
use super::period::DateRange;

/// One parsed statement file. Created once per successful parse and never
/// mutated afterwards. Totals come from the statement footer, not from
/// summing rows, so dropped malformed rows cannot skew them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankStatement {
    pub id: Option<i64>,
    pub bank: BankCode,
    pub account_number: String,
    pub account_name: String,
    pub period: DateRange,
    pub opening_balance_cents: i64,
    pub closing_balance_cents: i64,
    pub total_debits_cents: i64,
    pub total_credits_cents: i64,
}

impl BankStatement {
    /// Footer self-consistency: opening + credits - debits vs closing.
    /// A non-zero value means the bank's own footer disagrees with itself;
    /// callers log it and carry on.
    pub fn balance_discrepancy_cents(&self) -> i64 {
        let expected =
            self.opening_balance_cents + self.total_credits_cents - self.total_debits_cents;
        expected - self.closing_balance_cents
    }
}
