//! HDFC statement layout.
//!
//! ```text
//! row 0   HDFC BANK Ltd.
//! row 1   <branch line>
//! row 2   Account Name :  | <name>
//! row 3   Account No :    | <number>
//! row 4   Statement From : | <DD/MM/YYYY> | To : | <DD/MM/YYYY>
//! row 6   Date | Narration | Chq./Ref.No. | Value Dt | Withdrawal Amt. | Deposit Amt. | Closing Balance
//! row 7.. transaction rows (first may be the carried-forward opening line)
//! ...     sentinel row: "STATEMENT SUMMARY :-"
//! +2      opening bal | dr count | cr count | total withdrawals | total deposits | closing bal
//! ```
//!
//! Narrations are dash-delimited; see the descriptor tables.

use khata_core::{BankCode, BankStatement, BankTransaction, DateRange, MatchStatus, Month};

use crate::descriptor;
use crate::normalize::{parse_amount_cents, parse_date, try_parse_date};
use crate::parsers::{classify_row, is_opening_balance_row, ParsedStatement, StatementParser};
use crate::sheet::Grid;
use crate::IngestError;

const ACCOUNT_NAME_ROW: usize = 2;
const ACCOUNT_NO_ROW: usize = 3;
const PERIOD_ROW: usize = 4;
const HEADER_ROW: usize = 6;
const SENTINEL: &str = "statement summary";

/// Column mapping for the HDFC layout, validated against the header row
/// before any transaction row is read.
const COLUMNS: &[(usize, &str)] = &[
    (0, "date"),
    (1, "narration"),
    (2, "chq./ref.no."),
    (3, "value dt"),
    (4, "withdrawal amt."),
    (5, "deposit amt."),
    (6, "closing balance"),
];

const COL_DATE: usize = 0;
const COL_NARRATION: usize = 1;
const COL_REFERENCE: usize = 2;
const COL_VALUE_DATE: usize = 3;
const COL_WITHDRAWAL: usize = 4;
const COL_DEPOSIT: usize = 5;
const COL_BALANCE: usize = 6;

pub struct HdfcParser;

impl StatementParser for HdfcParser {
    fn bank(&self) -> BankCode {
        BankCode::Hdfc
    }

    fn parse(&self, grid: &Grid) -> Result<ParsedStatement, IngestError> {
        validate_columns(grid)?;

        let account_name = labelled_value(grid, ACCOUNT_NAME_ROW, "account name")?;
        let account_number = labelled_value(grid, ACCOUNT_NO_ROW, "account no")?;

        let period_start = try_parse_date(&grid.text(PERIOD_ROW, 1))
            .ok_or(IngestError::MissingMetadata("statement period start"))?;
        let period_end = try_parse_date(&grid.text(PERIOD_ROW, 3))
            .ok_or(IngestError::MissingMetadata("statement period end"))?;
        let label_month = Month::of(period_start);

        let sentinel = grid
            .find_row(0, SENTINEL, HEADER_ROW + 1)
            .ok_or(IngestError::MissingMetadata("statement summary footer"))?;

        let mut transactions = Vec::new();
        for row in (HEADER_ROW + 1)..sentinel {
            let narration = grid.text(row, COL_NARRATION);
            if narration.is_empty() && grid.cell(row, COL_DATE).is_empty() {
                continue;
            }
            if is_opening_balance_row(&narration) {
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
            let reference = Some(grid.text(row, COL_REFERENCE)).filter(|s| !s.is_empty());
            let balance_text = grid.text(row, COL_BALANCE);
            let balance_cents =
                (!balance_text.is_empty()).then(|| parse_amount_cents(&balance_text));

            let desc = descriptor::extract(BankCode::Hdfc, &narration);
            transactions.push(BankTransaction {
                id: None,
                statement_id: None,
                bank: BankCode::Hdfc,
                account_number: account_number.clone(),
                date,
                value_date,
                posted_date: None,
                description: narration,
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

        // Footer totals, never recomputed from rows.
        let totals_row = sentinel + 2;
        let statement = BankStatement {
            id: None,
            bank: BankCode::Hdfc,
            account_number,
            account_name,
            period: DateRange::new(period_start, period_end),
            opening_balance_cents: parse_amount_cents(&grid.text(totals_row, 0)),
            total_debits_cents: parse_amount_cents(&grid.text(totals_row, 3)),
            total_credits_cents: parse_amount_cents(&grid.text(totals_row, 4)),
            closing_balance_cents: parse_amount_cents(&grid.text(totals_row, 5)),
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
                bank: BankCode::Hdfc,
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
