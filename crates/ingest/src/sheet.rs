use calamine::Data;

/// A spreadsheet cell reduced to what statement layouts actually carry.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    pub fn text(s: &str) -> Self {
        Cell::Text(s.to_string())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Cell content as display text; numbers render the way the bank's
    /// export tool would (no trailing ".0" for integral values).
    pub fn as_text(&self) -> String {
        match self {
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            Cell::Number(n) => format!("{n}"),
            Cell::Empty => String::new(),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(_) | Data::Empty => Cell::Empty,
        }
    }
}

/// In-memory copy of one worksheet. Detectors and parsers work on this
/// instead of calamine types so they stay pure functions of cell content.
#[derive(Debug, Clone)]
pub struct Grid {
    pub sheet_name: String,
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(sheet_name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Grid {
            sheet_name: sheet_name.into(),
            rows,
        }
    }

    pub fn from_range(sheet_name: &str, range: &calamine::Range<Data>) -> Self {
        let rows = range
            .rows()
            .map(|row| row.iter().map(Cell::from).collect())
            .collect();
        Grid::new(sheet_name, rows)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Cell::Empty)
    }

    pub fn text(&self, row: usize, col: usize) -> String {
        self.cell(row, col).as_text()
    }

    /// True when the cell's trimmed text contains `needle` case-insensitively.
    pub fn cell_contains(&self, row: usize, col: usize, needle: &str) -> bool {
        self.text(row, col)
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }

    /// First row index at or after `from` whose cell in `col` contains
    /// `needle` case-insensitively.
    pub fn find_row(&self, col: usize, needle: &str, from: usize) -> Option<usize> {
        (from..self.rows.len()).find(|&r| self.cell_contains(r, col, needle))
    }

    /// First row index at or after `from` where any cell contains `needle`.
    pub fn find_row_any_col(&self, needle: &str, from: usize) -> Option<usize> {
        let needle = needle.to_lowercase();
        (from..self.rows.len()).find(|&r| {
            self.rows[r]
                .iter()
                .any(|c| c.as_text().to_lowercase().contains(&needle))
        })
    }
}
