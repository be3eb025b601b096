use khata_core::BankCode;

use crate::sheet::Grid;

/// How many leading rows each bank reserves for its metadata block.
/// Fingerprints never look past this window.
const METADATA_ROWS: usize = 12;

/// Identify the bank from structural fingerprints of the sheet itself,
/// never from the filename. Each fingerprint is checked independently;
/// anything other than exactly one hit is `Other` so downstream parsing
/// fails fast instead of guessing a layout.
pub fn detect_bank(grid: &Grid) -> BankCode {
    let mut hits = Vec::new();
    if looks_like_hdfc(grid) {
        hits.push(BankCode::Hdfc);
    }
    if looks_like_icici(grid) {
        hits.push(BankCode::Icici);
    }
    match hits.as_slice() {
        [single] => *single,
        _ => BankCode::Other,
    }
}

/// HDFC export: an `Account No :` label row inside the metadata block and a
/// header row carrying the bank's `Narration` / `Withdrawal Amt.` columns.
fn looks_like_hdfc(grid: &Grid) -> bool {
    let has_account_label = (0..METADATA_ROWS).any(|r| grid.cell_contains(r, 0, "account no"));
    let has_narration_header = (0..METADATA_ROWS + 4).any(|r| {
        grid.cell_contains(r, 1, "narration") && grid.cell_contains(r, 4, "withdrawal amt")
    });
    has_account_label && has_narration_header
}

/// ICICI export: `IFSC Code` and `Scheme` labels co-located on one metadata
/// row. No other supported bank prints either label.
fn looks_like_icici(grid: &Grid) -> bool {
    (0..METADATA_ROWS).any(|r| {
        grid.cell_contains(r, 0, "ifsc code") && grid.cell_contains(r, 2, "scheme")
    })
}
