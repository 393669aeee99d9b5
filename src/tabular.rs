//! Tabular decoding: bytes → grid of cells.
//!
//! The ingestor doesn't care what produced the grid. [`TabularDecoder`] is
//! the seam, with two implementations:
//!
//! - [`CsvDecoder`]: CSV/TSV text, delimiter sniffed from the first line.
//! - [`WorkbookDecoder`]: `.xlsx`, `.xls` and `.ods` workbooks via
//!   `calamine`. The first sheet is the shot list.
//!
//! [`AutoDecoder`] picks between them from the file's leading bytes, which
//! is what the CLI uses.

use calamine::{Data, Range, Reader};
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("Unreadable table: {0}")]
    Unreadable(String),
}

/// A single cell value as the decoder produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// Coerce to text. Whole numbers render without a decimal point.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::from(s.as_str()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Bool(*b),
            // Dates, durations and error cells keep their display text.
            other => Cell::Text(other.to_string()),
        }
    }
}

/// Rows of cells. Rows may have different lengths.
pub type Grid = Vec<Vec<Cell>>;

/// Turns raw file bytes into a grid.
pub trait TabularDecoder {
    /// Decode `bytes` into the first table found.
    ///
    /// Returns `Ok(None)` when the input holds no table at all (empty file,
    /// workbook with no sheets) and `Err` when the input can't be read.
    fn decode(&self, bytes: &[u8]) -> Result<Option<Grid>, DecodeError>;
}

/// CSV/TSV decoder.
///
/// With no explicit delimiter the first line is sniffed: whichever of `,`,
/// `;` or tab appears most often wins, ties going to `,`. Spreadsheet
/// exports in many locales use `;`.
#[derive(Debug, Clone, Default)]
pub struct CsvDecoder {
    delimiter: Option<u8>,
}

impl CsvDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self {
            delimiter: Some(delimiter),
        }
    }
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|&b| b == b'\n').next().unwrap_or_default();
    let count = |d: u8| first_line.iter().filter(|&&b| b == d).count();
    [b';', b'\t']
        .into_iter()
        .map(|d| (d, count(d)))
        .filter(|&(_, n)| n > count(b','))
        .max_by_key(|&(_, n)| n)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

impl TabularDecoder for CsvDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Option<Grid>, DecodeError> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        if is_workbook(bytes) {
            return Err(DecodeError::Unreadable(
                "looks like a spreadsheet workbook, not CSV".into(),
            ));
        }

        let delimiter = self.delimiter.unwrap_or_else(|| sniff_delimiter(bytes));
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(bytes);

        let mut grid = Grid::new();
        for record in reader.records() {
            let record = record?;
            grid.push(record.iter().map(Cell::from).collect());
        }
        Ok(Some(grid))
    }
}

/// Zip container (`.xlsx`, `.ods`) or OLE compound file (`.xls`).
fn is_workbook(bytes: &[u8]) -> bool {
    const ZIP: &[u8] = b"PK\x03\x04";
    const OLE: &[u8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";
    bytes.starts_with(ZIP) || bytes.starts_with(OLE)
}

/// Spreadsheet workbook decoder. Reads the first sheet only.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkbookDecoder;

/// Rows of the sheet's used range, with trailing empty cells dropped so a
/// short row reads as short, the way a CSV export would write it.
fn grid_from_range(range: &Range<Data>) -> Grid {
    range
        .rows()
        .map(|row| {
            let mut cells: Vec<Cell> = row.iter().map(Cell::from).collect();
            while cells.last() == Some(&Cell::Empty) {
                cells.pop();
            }
            cells
        })
        .collect()
}

impl TabularDecoder for WorkbookDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Option<Grid>, DecodeError> {
        let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))?;
        let Some(first) = workbook.sheet_names().into_iter().next() else {
            return Ok(None);
        };
        let range = workbook.worksheet_range(&first)?;
        Ok(Some(grid_from_range(&range)))
    }
}

/// Workbook bytes go to [`WorkbookDecoder`], everything else to a sniffing
/// [`CsvDecoder`].
#[derive(Debug, Clone, Default)]
pub struct AutoDecoder {
    csv: CsvDecoder,
}

impl AutoDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TabularDecoder for AutoDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Option<Grid>, DecodeError> {
        if is_workbook(bytes) {
            WorkbookDecoder.decode(bytes)
        } else {
            self.csv.decode(bytes)
        }
    }
}
