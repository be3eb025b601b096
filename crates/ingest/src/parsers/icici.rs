//! ICICI statement layout.
//!
//! ```text
//! row 0   DETAILED STATEMENT
//! row 1   Account Name   | <name>
//! row 2   Account Number | <number>
//! row 3   IFSC Code | <ifsc> | Scheme | <scheme>
//! row 4   Statement Period | <DD/MM/YYYY> | To | <DD/MM/YYYY>
//! row 6   Sl No | Value Date | Transaction Date | Transaction Posted Date |
//!         Cheque no / Ref No | Transaction Remarks | Withdrawal Amt (INR) |
//!         Deposit Amt (INR) | Balance (INR)
//! row 7.. transaction rows (first may be the B/F carried-forward line)
//! ...     sentinel row: "Statement Summary"
//! +1      | | | | | TOTAL | <withdrawals> | <deposits> | <closing>
//! ```
//!
//! Remarks are slash-delimited; see the descriptor tables.

use khata_core::{BankCode, BankStatement, BankTransaction, DateRange, MatchStatus, Month};

use crate::descriptor;
use crate::normalize::{parse_amount_cents, parse_date, try_parse_date};
use crate::parsers::{classify_row, is_opening_balance_row, ParsedStatement, StatementParser};
use crate::sheet::Grid;
use crate::IngestError;

const ACCOUNT_NAME_ROW: usize = 1;
const ACCOUNT_NO_ROW: usize = 2;
const PERIOD_ROW: usize = 4;
const HEADER_ROW: usize = 6;
const SENTINEL: &str = "statement summary";

const COLUMNS: &[(usize, &str)] = &[
    (0, "sl no"),
    (1, "value date"),
    (2, "transaction date"),
    (3, "transaction posted date"),
    (4, "cheque no"),
    (5, "transaction remarks"),
    (6, "withdrawal amt"),
    (7, "deposit amt"),
    (8, "balance"),
];

const COL_VALUE_DATE: usize = 1;
const COL_DATE: usize = 2;
const COL_POSTED: usize = 3;
const COL_REFERENCE: usize = 4;
const COL_REMARKS: usize = 5;
const COL_WITHDRAWAL: usize = 6;
const COL_DEPOSIT: usize = 7;
const COL_BALANCE: usize = 8;

pub struct IciciParser;

impl StatementParser for IciciParser {
    fn bank(&self) -> BankCode {
        BankCode::Icici
    }

    fn parse(&self, grid: &Grid) -> Result<ParsedStatement, IngestError> {
        validate_columns(grid)?;

        let account_name = labelled_value(grid, ACCOUNT_NAME_ROW, "account name")?;
        let account_number = labelled_value(grid, ACCOUNT_NO_ROW, "account number")?;

        let period_start = try_parse_date(&grid.text(PERIOD_ROW, 1))
            .ok_or(IngestError::MissingMetadata("statement period start"))?;
        let period_end = try_parse_date(&grid.text(PERIOD_ROW, 3))
            .ok_or(IngestError::MissingMetadata("statement period end"))?;
        let label_month = Month::of(period_start);

        let sentinel = grid
            .find_row_any_col(SENTINEL, HEADER_ROW + 1)
            .ok_or(IngestError::MissingMetadata("statement summary footer"))?;

        let mut opening_balance_cents = 0;
        let mut transactions = Vec::new();
        for row in (HEADER_ROW + 1)..sentinel {
            let remarks = grid.text(row, COL_REMARKS);
            if remarks.is_empty() && grid.cell(row, COL_DATE).is_empty() {
                continue;
            }
            if is_opening_balance_row(&remarks) {
                opening_balance_cents = parse_amount_cents(&grid.text(row, COL_BALANCE));
                continue;
            }

            let withdrawal = parse_amount_cents(&grid.text(row, COL_WITHDRAWAL));
            let deposit = parse_amount_cents(&grid.text(row, COL_DEPOSIT));
            let Some((tx_type, amount_cents)) = classify_row(withdrawal, deposit) else {
                tracing::debug!(row, "skipping malformed debit/credit row");
                continue;
            };

            let date = parse_date(&grid.text(row, COL_DATE), label_month);
            let value_date = parse_date(&grid.text(row, COL_VALUE_DATE), label_month);
            // Posted column carries a trailing time; keep the date part only.
            let posted_date = grid
                .text(row, COL_POSTED)
                .split_whitespace()
                .next()
                .and_then(try_parse_date);
            let reference = Some(grid.text(row, COL_REFERENCE)).filter(|s| !s.is_empty());
            let balance_text = grid.text(row, COL_BALANCE);
            let balance_cents =
                (!balance_text.is_empty()).then(|| parse_amount_cents(&balance_text));

            let desc = descriptor::extract(BankCode::Icici, &remarks);
            transactions.push(BankTransaction {
                id: None,
                statement_id: None,
                bank: BankCode::Icici,
                account_number: account_number.clone(),
                date,
                value_date,
                posted_date,
                description: remarks,
                reference,
                amount_cents,
                tx_type,
                balance_cents,
                payment_method: desc.payment_method,
                counterparty: desc.counterparty,
                counterparty_bank: desc.counterparty_bank,
                purpose: desc.purpose,
                match_status: MatchStatus::Unmatched,
                matched_entity: None,
                matched_entity_id: None,
                match_confidence: None,
                match_reason: None,
            });
        }

        let totals_row = sentinel + 1;
        let statement = BankStatement {
            id: None,
            bank: BankCode::Icici,
            account_number,
            account_name,
            period: DateRange::new(period_start, period_end),
            opening_balance_cents,
            total_debits_cents: parse_amount_cents(&grid.text(totals_row, COL_WITHDRAWAL)),
            total_credits_cents: parse_amount_cents(&grid.text(totals_row, COL_DEPOSIT)),
            closing_balance_cents: parse_amount_cents(&grid.text(totals_row, COL_BALANCE)),
        };

        Ok(ParsedStatement {
            statement,
            transactions,
        })
    }
}

fn validate_columns(grid: &Grid) -> Result<(), IngestError> {
    for (col, expected) in COLUMNS {
        if !grid.cell_contains(HEADER_ROW, *col, expected) {
            return Err(IngestError::ColumnMismatch {
                bank: BankCode::Icici,
                column: *col,
                expected,
            });
        }
    }
    Ok(())
}

fn labelled_value(grid: &Grid, row: usize, label: &'static str) -> Result<String, IngestError> {
    if !grid.cell_contains(row, 0, label) {
        return Err(IngestError::MissingMetadata(label));
    }
    let value = grid.text(row, 1);
    if value.is_empty() {
        return Err(IngestError::MissingMetadata(label));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Cell;
    use chrono::NaiveDate;
    use khata_core::{PaymentMethod, TransactionType};

    fn t(s: &str) -> Cell {
        Cell::text(s)
    }

    fn header() -> Vec<Cell> {
        vec![
            t("Sl No"),
            t("Value Date"),
            t("Transaction Date"),
            t("Transaction Posted Date"),
            t("Cheque no / Ref No"),
            t("Transaction Remarks"),
            t("Withdrawal Amt (INR)"),
            t("Deposit Amt (INR)"),
            t("Balance (INR)"),
        ]
    }

    fn sample_grid() -> Grid {
        Grid::new(
            "Sheet1",
            vec![
                vec![t("DETAILED STATEMENT")],
                vec![t("Account Name"), t("ACME LABS PVT LTD")],
                vec![t("Account Number"), t("000405001234")],
                vec![t("IFSC Code"), t("ICIC0000004"), t("Scheme"), t("Current Account")],
                vec![t("Statement Period"), t("01/12/2020"), t("To"), t("31/12/2020")],
                vec![],
                header(),
                vec![t(""), t(""), t(""), t(""), t(""), t("B/F"), t(""), t(""), t("2,00,000.00")],
                vec![
                    t("1"),
                    t("03/12/2020"),
                    t("03/12/2020"),
                    t("03/12/2020 11:24:03 AM"),
                    t(""),
                    t("MMT/IMPS/402712345678/Payment/JOHN DOE/SBIN"),
                    t("50,000.00"),
                    t(""),
                    t("1,50,000.00"),
                ],
                vec![
                    t("2"),
                    t("18/12/2020"),
                    t("18/12/2020"),
                    t("18/12/2020 09:01:55 AM"),
                    t("000113"),
                    t("NEFT/HDFC0000240/CLIENT TWO LLP/INV-4431"),
                    t(""),
                    t("3,00,000.00"),
                    t("4,50,000.00"),
                ],
                vec![t(""), t(""), t(""), t(""), t(""), t("Statement Summary")],
                vec![t(""), t(""), t(""), t(""), t(""), t("TOTAL"), t("50,000.00"), t("3,00,000.00"), t("4,50,000.00")],
            ],
        )
    }

    #[test]
    fn parses_metadata() {
        let parsed = IciciParser.parse(&sample_grid()).unwrap();
        let s = &parsed.statement;
        assert_eq!(s.bank, BankCode::Icici);
        assert_eq!(s.account_number, "000405001234");
        assert_eq!(s.account_name, "ACME LABS PVT LTD");
        assert_eq!(s.opening_balance_cents, 20_000_000);
        assert_eq!(s.total_debits_cents, 5_000_000);
        assert_eq!(s.total_credits_cents, 30_000_000);
        assert_eq!(s.closing_balance_cents, 45_000_000);
        assert_eq!(s.balance_discrepancy_cents(), 0);
    }

    #[test]
    fn opening_row_sets_balance_but_emits_no_transaction() {
        let parsed = IciciParser.parse(&sample_grid()).unwrap();
        assert_eq!(parsed.transactions.len(), 2);
        assert!(parsed.transactions.iter().all(|tx| tx.description != "B/F"));
    }

    #[test]
    fn posted_date_keeps_date_part_only() {
        let parsed = IciciParser.parse(&sample_grid()).unwrap();
        assert_eq!(
            parsed.transactions[0].posted_date,
            Some(NaiveDate::from_ymd_opt(2020, 12, 3).unwrap())
        );
    }

    #[test]
    fn rows_become_unified_transactions() {
        let parsed = IciciParser.parse(&sample_grid()).unwrap();
        let imps = &parsed.transactions[0];
        assert_eq!(imps.tx_type, TransactionType::Debit);
        assert_eq!(imps.amount_cents, 5_000_000);
        assert_eq!(imps.payment_method, Some(PaymentMethod::Imps));
        assert_eq!(imps.counterparty.as_deref(), Some("JOHN DOE"));

        let neft = &parsed.transactions[1];
        assert_eq!(neft.tx_type, TransactionType::Credit);
        assert_eq!(neft.reference.as_deref(), Some("000113"));
        assert_eq!(neft.counterparty.as_deref(), Some("CLIENT TWO LLP"));
    }

    #[test]
    fn wrong_header_is_a_format_error() {
        let mut rows: Vec<Vec<Cell>> = vec![
            vec![t("DETAILED STATEMENT")],
            vec![t("Account Name"), t("X")],
            vec![t("Account Number"), t("1")],
            vec![t("IFSC Code"), t("ICIC0"), t("Scheme"), t("CA")],
            vec![t("Statement Period"), t("01/12/2020"), t("To"), t("31/12/2020")],
            vec![],
        ];
        rows.push(vec![t("No"), t("Date"), t("Particulars")]);
        let err = IciciParser.parse(&Grid::new("Sheet1", rows)).unwrap_err();
        assert!(matches!(err, IngestError::ColumnMismatch { .. }));
    }
}
