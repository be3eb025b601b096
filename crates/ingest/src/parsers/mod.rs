use khata_core::{BankCode, BankStatement, BankTransaction, TransactionType};

use crate::IngestError;
use crate::sheet::Grid;

pub mod hdfc;
pub mod icici;

/// Output of one successful file parse: immutable statement metadata plus
/// the unified transaction list, descriptor attributes already filled.
#[derive(Debug, Clone)]
pub struct ParsedStatement {
    pub statement: BankStatement,
    pub transactions: Vec<BankTransaction>,
}

/// The per-bank layout contract. Adding a bank means one fingerprint rule in
/// `detect` and one implementation of this trait; nothing else changes.
pub trait StatementParser {
    fn bank(&self) -> BankCode;

    /// Locate the metadata block, validate the column mapping, scan the
    /// transaction window up to the sentinel row, read footer totals.
    fn parse(&self, grid: &Grid) -> Result<ParsedStatement, IngestError>;
}

pub fn parser_for(bank: BankCode) -> Option<Box<dyn StatementParser>> {
    match bank {
        BankCode::Hdfc => Some(Box::new(hdfc::HdfcParser)),
        BankCode::Icici => Some(Box::new(icici::IciciParser)),
        BankCode::Other => None,
    }
}

/// A row must populate exactly one of withdrawal/deposit. Both-zero and
/// both-nonzero rows are malformed and skipped; statement totals come from
/// the footer so the drop cannot corrupt them.
pub(crate) fn classify_row(
    withdrawal_cents: i64,
    deposit_cents: i64,
) -> Option<(TransactionType, i64)> {
    match (withdrawal_cents, deposit_cents) {
        (0, 0) => None,
        (w, 0) if w > 0 => Some((TransactionType::Debit, w)),
        (0, d) if d > 0 => Some((TransactionType::Credit, d)),
        _ => None,
    }
}

/// The carried-forward balance line is metadata, not a transaction.
pub(crate) fn is_opening_balance_row(description: &str) -> bool {
    let lower = description.to_lowercase();
    lower.contains("opening balance") || lower.contains("b/f") || lower.contains("brought forward")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_exactly_one_side() {
        assert_eq!(classify_row(5000, 0), Some((TransactionType::Debit, 5000)));
        assert_eq!(classify_row(0, 7500), Some((TransactionType::Credit, 7500)));
    }

    #[test]
    fn classify_rejects_contradictory_rows() {
        assert_eq!(classify_row(0, 0), None);
        assert_eq!(classify_row(100, 100), None);
    }

    #[test]
    fn classify_rejects_negative_amounts() {
        assert_eq!(classify_row(-100, 0), None);
        assert_eq!(classify_row(0, -100), None);
    }

    #[test]
    fn opening_balance_variants() {
        assert!(is_opening_balance_row("Opening Balance"));
        assert!(is_opening_balance_row("B/F 12,000.00"));
        assert!(!is_opening_balance_row("NEFT DR-SBIN-ACME"));
    }

    #[test]
    fn no_parser_for_other() {
        assert!(parser_for(BankCode::Other).is_none());
        assert!(parser_for(BankCode::Hdfc).is_some());
    }
}
