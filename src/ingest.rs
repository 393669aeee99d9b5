//! Shot list ingestion: decoded grid → validated [`ShotList`].
//!
//! The first row is the header. Four columns are required and located by
//! case-insensitive name, in any order:
//!
//! | Logical column | Header text (any case) |
//! |----------------|------------------------|
//! | item id        | `itemID`               |
//! | item color     | `itemColor`            |
//! | view type      | `viewType`             |
//! | filename       | `filename`             |
//!
//! Extra columns are ignored. Rows that are too short to reach every
//! required column, or whose filename is blank, are skipped and reported in
//! [`IngestReport::skipped`]; skipping never fails the whole list. Only when
//! nothing survives does ingestion fail.

use crate::tabular::{Cell, DecodeError, TabularDecoder};
use crate::types::{Shot, ShotList};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("No sheets found in the file")]
    NoData,
    #[error("Sheet appears to be empty or lacks data rows")]
    Empty,
    #[error(
        "Missing required columns: {}. The header row must contain these names (case-insensitive)",
        .0.join(", ")
    )]
    MissingColumns(Vec<String>),
    #[error("No valid shot data found in the file")]
    NoValidRows,
    #[error("Failed to read file: {0}")]
    Decode(#[from] DecodeError),
}

/// Header names of the required columns, in reporting order.
pub const REQUIRED_COLUMNS: [&str; 4] = ["itemID", "itemColor", "viewType", "filename"];

/// Why a data row produced no shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    InsufficientColumns,
    MissingFilename,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsufficientColumns => write!(f, "insufficient columns"),
            SkipReason::MissingFilename => write!(f, "missing filename"),
        }
    }
}

/// A data row that was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    /// 1-based row number as shown in a spreadsheet (header is row 1).
    pub row: usize,
    pub reason: SkipReason,
}

/// Successful ingestion: the shots plus every row that was dropped.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub shots: ShotList,
    pub skipped: Vec<SkippedRow>,
}

/// Resolved positions of the required columns.
#[derive(Debug, Clone, Copy)]
struct Columns {
    item_id: usize,
    item_color: usize,
    view_type: usize,
    filename: usize,
}

impl Columns {
    fn max(&self) -> usize {
        self.item_id
            .max(self.item_color)
            .max(self.view_type)
            .max(self.filename)
    }
}

fn resolve_columns(header: &[Cell]) -> Result<Columns, IngestError> {
    let lowered: Vec<String> = header.iter().map(|c| c.to_text().to_lowercase()).collect();
    let find = |name: &str| lowered.iter().position(|h| *h == name.to_lowercase());

    let found: Vec<Option<usize>> = REQUIRED_COLUMNS.iter().map(|&n| find(n)).collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .zip(&found)
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| name.to_string())
        .collect();

    match *found.as_slice() {
        [Some(item_id), Some(item_color), Some(view_type), Some(filename)] => Ok(Columns {
            item_id,
            item_color,
            view_type,
            filename,
        }),
        _ => {
            let header_text: Vec<String> = header.iter().map(Cell::to_text).collect();
            debug!(?header_text, ?missing, "shot list header rejected");
            Err(IngestError::MissingColumns(missing))
        }
    }
}

fn cell_text(row: &[Cell], idx: usize) -> String {
    row.get(idx)
        .map(|c| c.to_text().trim().to_string())
        .unwrap_or_default()
}

/// Decode and validate a shot list, returning the shots and a skip report.
pub fn ingest_report(
    decoder: &impl TabularDecoder,
    bytes: &[u8],
) -> Result<IngestReport, IngestError> {
    let grid = decoder.decode(bytes)?.ok_or(IngestError::NoData)?;
    if grid.len() < 2 {
        return Err(IngestError::Empty);
    }

    let columns = resolve_columns(&grid[0])?;
    let needed = columns.max();

    let mut shots = Vec::new();
    let mut skipped = Vec::new();
    for (index, row) in grid[1..].iter().enumerate() {
        let sheet_row = index + 2;
        if row.len() <= needed {
            warn!(row = sheet_row, "skipping shot list row: insufficient columns");
            skipped.push(SkippedRow {
                row: sheet_row,
                reason: SkipReason::InsufficientColumns,
            });
            continue;
        }
        let shot = Shot {
            key: format!("shot-{index}"),
            item_id: cell_text(row, columns.item_id),
            item_color: cell_text(row, columns.item_color),
            view_type: cell_text(row, columns.view_type),
            filename: cell_text(row, columns.filename),
        };
        if shot.filename.is_empty() {
            warn!(row = sheet_row, "skipping shot list row: missing filename");
            skipped.push(SkippedRow {
                row: sheet_row,
                reason: SkipReason::MissingFilename,
            });
            continue;
        }
        shots.push(shot);
    }

    if shots.is_empty() {
        return Err(IngestError::NoValidRows);
    }
    debug!(
        shots = shots.len(),
        skipped = skipped.len(),
        "shot list ingested"
    );
    Ok(IngestReport {
        shots: ShotList::new(shots),
        skipped,
    })
}

/// Decode and validate a shot list.
pub fn ingest(decoder: &impl TabularDecoder, bytes: &[u8]) -> Result<ShotList, IngestError> {
    ingest_report(decoder, bytes).map(|report| report.shots)
}
