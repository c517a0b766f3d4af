//! Persistence for the analysis tables.
//!
//! Every view and subset is written as its own CSV file, next to the
//! descriptive statistics and a JSON manifest describing the run.

use crate::describe::{ColumnSummary, describe};
use crate::error::Result;
use crate::pipeline::AnalysisTables;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

pub const MANIFEST_FILE: &str = "manifest.json";

/// One written table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableEntry {
    pub name: String,
    pub file: String,
    pub rows: usize,
}

/// Index of a run's outputs, written as `manifest.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub generated_at: DateTime<Utc>,
    pub tables: Vec<TableEntry>,
    pub malformed_keys: Vec<String>,
}

/// Serializes `rows` as CSV with a header row.
pub fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Renders `rows` as CSV bytes.
pub fn to_csv_bytes<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_rows(&mut buf, rows)?;
    Ok(buf)
}

fn write_table<T: Serialize>(
    dir: &Path,
    name: &str,
    rows: &[T],
    entries: &mut Vec<TableEntry>,
) -> Result<()> {
    let file = format!("{name}.csv");
    let path = dir.join(&file);
    debug!(path = %path.display(), rows = rows.len(), "Writing table");

    write_rows(File::create(&path)?, rows)?;
    entries.push(TableEntry {
        name: name.to_string(),
        file,
        rows: rows.len(),
    });
    Ok(())
}

/// Writes every table in `tables` into `dir` (created if needed) and returns
/// the manifest that was written alongside them.
#[tracing::instrument(skip(tables), fields(dir = %dir.display()))]
pub fn write_outputs(dir: &Path, tables: &AnalysisTables) -> Result<RunManifest> {
    fs::create_dir_all(dir)?;
    let mut entries = Vec::new();

    write_table(dir, "derived", &tables.derived, &mut entries)?;
    write_table(dir, "presidential", &tables.presidential, &mut entries)?;
    write_table(dir, "urbanicity", &tables.urbanicity, &mut entries)?;
    write_table(dir, "reclassification", &tables.reclassification, &mut entries)?;

    let flips = &tables.flips;
    write_table(dir, "triple_flip", &flips.triple_flip, &mut entries)?;
    write_table(dir, "double_flip", &flips.double_flip, &mut entries)?;
    write_table(
        dir,
        "double_flip_reclassified",
        &flips.double_flip_reclassified,
        &mut entries,
    )?;

    let typology = &tables.typology;
    write_table(dir, "suburbs_democratic", &typology.suburbs_democratic, &mut entries)?;
    write_table(dir, "suburbs_republican", &typology.suburbs_republican, &mut entries)?;
    write_table(dir, "exurbs_democratic", &typology.exurbs_democratic, &mut entries)?;
    write_table(dir, "exurbs_republican", &typology.exurbs_republican, &mut entries)?;

    write_table(dir, "descriptive_statistics", &descriptive_statistics(tables), &mut entries)?;
    if !tables.survey_summary.is_empty() {
        write_table(dir, "survey_summary", &tables.survey_summary, &mut entries)?;
    }

    let manifest = RunManifest {
        generated_at: Utc::now(),
        tables: entries,
        malformed_keys: tables.malformed_keys.clone(),
    };
    fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec_pretty(&manifest)?)?;

    info!(tables = manifest.tables.len(), "Outputs written");
    Ok(manifest)
}

/// Descriptive statistics for the three analysis views.
pub fn descriptive_statistics(tables: &AnalysisTables) -> Vec<ColumnSummary> {
    let mut summary = describe("presidential", &tables.presidential);
    summary.extend(describe("urbanicity", &tables.urbanicity));
    summary.extend(describe("reclassification", &tables.reclassification));
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::PresidentialRow;

    fn row(fips: &str, margin: Option<f64>) -> PresidentialRow {
        PresidentialRow {
            fips: fips.into(),
            state: Some("Ohio".into()),
            county: Some("Lake".into()),
            typology_2018: None,
            typology_2023: Some("Exurbs".into()),
            pop_change_pct: None,
            margin_2012: Some(1.5),
            margin_2016: Some(-3.0),
            margin_2020: margin,
        }
    }

    #[test]
    fn test_missing_values_serialize_as_empty_cells() {
        let bytes = to_csv_bytes(&[row("39085", None)]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(
            lines[0],
            "fips,state,county,typology_2018,typology_2023,pop_change_pct,margin_2012,margin_2016,margin_2020"
        );
        assert_eq!(lines[1], "39085,Ohio,Lake,,Exurbs,,1.5,-3.0,");
    }

    #[test]
    fn test_write_outputs_creates_tables_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let tables = AnalysisTables {
            presidential: vec![row("39085", Some(2.0)), row("39093", Some(-1.0))],
            ..Default::default()
        };

        let manifest = write_outputs(dir.path(), &tables).unwrap();

        assert!(dir.path().join(MANIFEST_FILE).exists());
        assert!(dir.path().join("presidential.csv").exists());
        let presidential = manifest.tables.iter().find(|t| t.name == "presidential").unwrap();
        assert_eq!(presidential.rows, 2);
        assert!(!manifest.tables.iter().any(|t| t.name == "survey_summary"));

        let content = fs::read_to_string(dir.path().join("presidential.csv")).unwrap();
        assert_eq!(content.lines().count(), 3);
    }
}
