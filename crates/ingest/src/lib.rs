//! Statement ingestion: spreadsheet → detected bank layout → unified
//! transactions. One file per call, nothing shared between files, so a batch
//! upload can parse files concurrently and a bad file fails only itself.

pub mod descriptor;
pub mod detect;
pub mod normalize;
pub mod parsers;
pub mod sheet;

use std::path::Path;

use calamine::Reader;
use thiserror::Error;

use khata_core::BankCode;

pub use descriptor::Descriptor;
pub use parsers::{ParsedStatement, StatementParser};
pub use sheet::{Cell, Grid};

const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsm"];

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Unsupported file extension: '{0}' (expected xlsx/xls/xlsm)")]
    UnsupportedExtension(String),
    #[error("Unsupported bank format: no known layout fingerprint matched")]
    UnsupportedBankFormat,
    #[error("Failed to open workbook: {0}")]
    Workbook(String),
    #[error("Workbook has no sheets")]
    EmptyWorkbook,
    #[error("{bank} layout mismatch: column {column} is not '{expected}'")]
    ColumnMismatch {
        bank: BankCode,
        column: usize,
        expected: &'static str,
    },
    #[error("Missing statement metadata: {0}")]
    MissingMetadata(&'static str),
}

/// Parse one statement file end to end: extension gate, workbook open,
/// fingerprint detection, bank parser. Fails fast on anything structural;
/// row-level noise degrades inside the parser instead.
pub fn import_statement(path: &Path) -> Result<ParsedStatement, IngestError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(IngestError::UnsupportedExtension(extension));
    }

    let mut workbook =
        calamine::open_workbook_auto(path).map_err(|e| IngestError::Workbook(e.to_string()))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(IngestError::EmptyWorkbook)?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| IngestError::Workbook(e.to_string()))?;

    let grid = Grid::from_range(&sheet_name, &range);
    import_grid(&grid)
}

/// Same pipeline starting from an already-materialized grid. Split out so
/// detection and parsing stay testable without workbook files.
pub fn import_grid(grid: &Grid) -> Result<ParsedStatement, IngestError> {
    let bank = detect::detect_bank(grid);
    let parser = parsers::parser_for(bank).ok_or(IngestError::UnsupportedBankFormat)?;
    let parsed = parser.parse(grid)?;

    let discrepancy = parsed.statement.balance_discrepancy_cents();
    if discrepancy != 0 {
        tracing::warn!(
            bank = %parsed.statement.bank,
            account = %parsed.statement.account_number,
            discrepancy_cents = discrepancy,
            "statement footer does not reconcile (opening + credits - debits != closing)"
        );
    }
    tracing::info!(
        bank = %parsed.statement.bank,
        account = %parsed.statement.account_number,
        transactions = parsed.transactions.len(),
        "parsed statement"
    );

    Ok(parsed)
}
