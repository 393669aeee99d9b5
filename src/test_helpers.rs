//! Shared test utilities for the shot-capture test suite.
//!
//! Provides shot list fixtures, an in-memory decoder so session and ingest
//! tests don't need to round-trip through CSV text, and workbook bytes for
//! the decoders that do read files.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let shots = shot_list(3);
//! assert_eq!(shots.get(0).unwrap().filename, "shot-0.jpg");
//!
//! let decoder = GridDecoder(grid(vec![vec!["ItemID", "Filename"]]));
//! ```

use crate::tabular::{Cell, DecodeError, Grid, TabularDecoder};
use crate::types::{Shot, ShotList};

// =========================================================================
// Fixtures
// =========================================================================

/// Three data rows, one with a blank filename: two shots after ingest,
/// `A1-front.jpg` first.
pub const SHOT_LIST_CSV: &str = "\
ItemID,ItemColor,ViewType,Filename
A1,red,front,A1-front.jpg
A1,red,back,
B2,blue,side,B2-side.jpg
";

/// `n` shots keyed `shot-{i}` and saved as `shot-{i}.jpg`.
pub fn shot_list(n: usize) -> ShotList {
    ShotList::new(
        (0..n)
            .map(|i| Shot {
                key: format!("shot-{i}"),
                item_id: format!("item-{i}"),
                item_color: "black".into(),
                view_type: "front".into(),
                filename: format!("shot-{i}.jpg"),
            })
            .collect(),
    )
}

// =========================================================================
// Decoding
// =========================================================================

/// Build a grid from string rows; `""` becomes an empty cell.
pub fn grid(rows: Vec<Vec<&str>>) -> Grid {
    rows.into_iter()
        .map(|row| row.into_iter().map(Cell::from).collect())
        .collect()
}

/// Decoder that ignores its input and hands back a fixed grid.
pub struct GridDecoder(pub Grid);

impl TabularDecoder for GridDecoder {
    fn decode(&self, _bytes: &[u8]) -> Result<Option<Grid>, DecodeError> {
        Ok(Some(self.0.clone()))
    }
}

// =========================================================================
// Workbooks
// =========================================================================

/// An `.xlsx` shot list with numeric ItemIDs, the way spreadsheet tools
/// store them: `1042` and `2048`, one row with a blank color.
pub fn shot_list_xlsx() -> Vec<u8> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, header) in ["ItemID", "ItemColor", "ViewType", "Filename"]
        .into_iter()
        .enumerate()
    {
        sheet.write_string(0, col as u16, header).unwrap();
    }
    sheet.write_number(1, 0, 1042.0).unwrap();
    sheet.write_string(1, 1, "red").unwrap();
    sheet.write_string(1, 2, "front").unwrap();
    sheet.write_string(1, 3, "1042-front.jpg").unwrap();
    sheet.write_number(2, 0, 2048.0).unwrap();
    sheet.write_string(2, 2, "back").unwrap();
    sheet.write_string(2, 3, "2048-back.jpg").unwrap();
    workbook.save_to_buffer().unwrap()
}

/// A structurally valid `.xlsx` package whose workbook lists no sheets.
pub fn sheetless_xlsx() -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let parts = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#,
        ),
        (
            "xl/workbook.xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheets/></workbook>"#,
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"/>"#,
        ),
    ];
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, body) in parts {
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}
