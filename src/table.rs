//! Loader for the raw source exports.
//!
//! Every source enters the pipeline as a [`RawTable`]: header names exactly as
//! the file spells them (trailing spaces included) and string cells. Typed
//! records are built from these tables once their key column is normalized.
//! Spreadsheets are read from their first worksheet; everything else is
//! delimited text.

use crate::error::{PipelineError, Result};
use calamine::{Data, Range, Reader, open_workbook_auto};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// An untyped, string-valued table as read from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Logical source name, used in error messages.
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(name: &str, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.to_string(),
            headers,
            rows,
        }
    }

    /// Position of `column` in the header row.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::SchemaMismatch`] naming the column if it is absent.
    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| PipelineError::SchemaMismatch {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Renames headers according to `mapping` (`from`, `to`). Headers not in
    /// the mapping are left untouched. Returns how many headers were renamed.
    pub fn rename_columns(&mut self, mapping: &[(&str, &str)]) -> usize {
        let mut renamed = 0;
        for header in &mut self.headers {
            if let Some((_, to)) = mapping.iter().find(|(from, _)| *from == header.as_str()) {
                *header = to.to_string();
                renamed += 1;
            }
        }
        renamed
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Returns the cell at `index`, or `""` for short rows.
pub fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SPREADSHEET_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Reads a source file into a [`RawTable`]. Spreadsheet extensions are
/// opened as workbooks and `delimiter` is ignored for them.
///
/// # Errors
///
/// Fails if the file cannot be opened, the workbook has no worksheet, or the
/// header row is not valid delimited text.
pub fn read_table(path: &Path, name: &str, delimiter: u8) -> Result<RawTable> {
    debug!(path = %path.display(), table = name, "Reading source table");
    if is_spreadsheet(path) {
        return read_spreadsheet(path, name);
    }
    let file = File::open(path)?;
    read_table_from_reader(file, name, delimiter)
}

/// Reads the first worksheet of a workbook into a [`RawTable`].
pub fn read_spreadsheet(path: &Path, name: &str) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PipelineError::EmptyWorkbook {
            path: path.display().to_string(),
        })??;
    Ok(table_from_range(name, &range))
}

fn cell_text(data: &Data) -> String {
    match data {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Converts a worksheet range into a [`RawTable`]; the first row is the header.
pub fn table_from_range(name: &str, range: &Range<Data>) -> RawTable {
    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|header| header.iter().map(cell_text).collect())
        .unwrap_or_default();
    let rows: Vec<Vec<String>> = rows.map(|row| row.iter().map(cell_text).collect()).collect();

    let table = RawTable::new(name, headers, rows);
    debug!(table = name, rows = table.len(), "Worksheet loaded");
    table
}

/// Reads delimited text from any reader into a [`RawTable`].
///
/// Headers must be UTF-8. Cells are decoded lossily, so a stray Latin-1 byte
/// in a column nobody reads does not abort the load.
pub fn read_table_from_reader<R: Read>(reader: R, name: &str, delimiter: u8) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::None)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in rdr.byte_records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect(),
        );
    }

    let table = RawTable::new(name, headers, rows);
    debug!(table = name, rows = table.len(), "Source table loaded");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_keep_trailing_space() {
        let data = "FIPS,Biden ,Trump\n01001,100,200\n";
        let table = read_table_from_reader(data.as_bytes(), "baseline", b',').unwrap();

        assert_eq!(table.headers, vec!["FIPS", "Biden ", "Trump"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0][1], "100");
    }

    #[test]
    fn test_column_index_missing_is_schema_mismatch() {
        let table = RawTable::new("turnout", vec!["year".into()], vec![]);
        let err = table.column_index("stcofips").unwrap_err();

        match err {
            PipelineError::SchemaMismatch { table, column } => {
                assert_eq!(table, "turnout");
                assert_eq!(column, "stcofips");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rename_columns_passes_unmapped_through() {
        let mut table = RawTable::new(
            "baseline",
            vec!["Biden ".into(), "State".into(), "Notes".into()],
            vec![],
        );
        let renamed = table.rename_columns(&[("Biden ", "biden_2020"), ("State", "state")]);

        assert_eq!(renamed, 2);
        assert_eq!(table.headers, vec!["biden_2020", "state", "Notes"]);
    }

    #[test]
    fn test_pipe_delimited_short_rows() {
        let data = "VCF0004|VCF0006|VCF0702\n2016|17|2\n2020|18\n";
        let table = read_table_from_reader(data.as_bytes(), "survey", b'|').unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(cell(&table.rows[1], 2), "");
    }

    #[test]
    fn test_latin1_cell_is_decoded_lossily() {
        let data = b"FIPS|County|Notes\n35013|Do\xf1a Ana|x\n";
        let table = read_table_from_reader(&data[..], "baseline", b'|').unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0][0], "35013");
        assert_eq!(table.rows[0][1], "Do\u{fffd}a Ana");
    }

    #[test]
    fn test_worksheet_first_row_is_header() {
        let mut range = Range::new((0, 0), (2, 2));
        range.set_value((0, 0), Data::String("FIPS".into()));
        range.set_value((0, 1), Data::String("Biden ".into()));
        range.set_value((0, 2), Data::String("2023 Typology".into()));
        range.set_value((1, 0), Data::String("01001".into()));
        range.set_value((1, 1), Data::Int(5496));
        range.set_value((1, 2), Data::String("Exurbs".into()));
        range.set_value((2, 0), Data::Int(1003));

        let table = table_from_range("baseline", &range);

        assert_eq!(table.headers, vec!["FIPS", "Biden ", "2023 Typology"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0], vec!["01001", "5496", "Exurbs"]);
        assert_eq!(table.rows[1], vec!["1003", "", ""]);
    }

    #[test]
    fn test_spreadsheet_extension_is_detected() {
        assert!(is_spreadsheet(Path::new("data/raw/baseline.xlsx")));
        assert!(is_spreadsheet(Path::new("Typology.XLS")));
        assert!(!is_spreadsheet(Path::new("turnout.csv")));
        assert!(!is_spreadsheet(Path::new("anes")));
    }

    #[test]
    fn test_missing_workbook_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_table(&dir.path().join("absent.xlsx"), "baseline", b',').is_err());
    }
}
