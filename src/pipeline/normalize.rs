//! Key normalization: every source's identifier column becomes `Fips`.

use crate::error::Result;
use crate::pipeline::types::Fips;
use crate::pipeline::utility::parse_year;
use crate::table::{RawTable, cell};
use tracing::{debug, warn};

pub const FIPS_COLUMN: &str = "Fips";

/// Granularity of a source's key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyGrain {
    /// 5-digit county code, possibly missing leading zeros.
    County,
    /// 11-digit tract code whose first five digits are the county.
    Tract,
}

/// Renames `key_column` to [`FIPS_COLUMN`] and rewrites every key to a
/// padded county code.
///
/// Keys that cannot be normalized are kept verbatim and logged; they still
/// take part in the joins.
///
/// # Errors
///
/// Returns `SchemaMismatch` if `key_column` is absent. The table is left
/// untouched in that case.
#[tracing::instrument(skip(table), fields(table = %table.name, rows = table.len()))]
pub fn normalize_key(mut table: RawTable, key_column: &str, grain: KeyGrain) -> Result<RawTable> {
    let idx = table.column_index(key_column)?;

    let mut malformed = 0usize;
    for row in &mut table.rows {
        let raw = cell(row, idx);
        let fips = match grain {
            KeyGrain::County => Fips::from_county(raw),
            KeyGrain::Tract => Fips::from_tract(raw),
        };
        if !fips.is_well_formed() {
            malformed += 1;
            debug!(key = raw, "Key is not a 5-digit county code, keeping as-is");
        }
        if row.len() <= idx {
            row.resize(idx + 1, String::new());
        }
        row[idx] = fips.as_str().to_string();
    }
    table.headers[idx] = FIPS_COLUMN.to_string();

    if malformed > 0 {
        warn!(malformed, "Rows retained with malformed FIPS keys");
    }
    Ok(table)
}

/// Keeps rows whose `year_column` is at least `min_year`. Rows with an
/// unreadable year are dropped.
///
/// # Errors
///
/// Returns `SchemaMismatch` if `year_column` is absent.
pub fn filter_min_year(mut table: RawTable, year_column: &str, min_year: i32) -> Result<RawTable> {
    let idx = table.column_index(year_column)?;
    let before = table.len();

    table
        .rows
        .retain(|row| parse_year(cell(row, idx)).is_some_and(|year| year >= min_year));

    debug!(
        table = %table.name,
        before,
        after = table.len(),
        min_year,
        "Filtered rows by year"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    fn turnout() -> RawTable {
        RawTable::new(
            "turnout",
            vec!["stcofips".into(), "year".into(), "reg_voter_turnout_pct".into()],
            vec![
                vec!["1001".into(), "2012".into(), "55.0".into()],
                vec!["1001".into(), "2016".into(), "58.0".into()],
                vec!["53033".into(), "2020".into(), "71.2".into()],
                vec!["53033".into(), "".into(), "70.0".into()],
            ],
        )
    }

    #[test]
    fn test_county_keys_are_renamed_and_padded() {
        let table = normalize_key(turnout(), "stcofips", KeyGrain::County).unwrap();

        assert_eq!(table.headers[0], FIPS_COLUMN);
        assert_eq!(table.rows[0][0], "01001");
        assert_eq!(table.rows[2][0], "53033");
    }

    #[test]
    fn test_tract_keys_are_truncated() {
        let table = RawTable::new(
            "connectivity_2020",
            vec!["tract_fips20".into(), "node_count".into()],
            vec![
                vec!["53033000100".into(), "10".into()],
                vec!["1001020100".into(), "4".into()],
            ],
        );
        let table = normalize_key(table, "tract_fips20", KeyGrain::Tract).unwrap();

        assert_eq!(table.rows[0][0], "53033");
        assert_eq!(table.rows[1][0], "01001");
    }

    #[test]
    fn test_missing_key_column_fails_without_renaming() {
        let err = normalize_key(turnout(), "tract_fips10", KeyGrain::Tract).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::SchemaMismatch { ref column, .. } if column == "tract_fips10"
        ));
    }

    #[test]
    fn test_malformed_keys_are_retained() {
        let table = RawTable::new(
            "urbanicity",
            vec!["stcofips".into()],
            vec![vec!["unknown".into()], vec!["6037".into()]],
        );
        let table = normalize_key(table, "stcofips", KeyGrain::County).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][0], "unknown");
        assert_eq!(table.rows[1][0], "06037");
    }

    #[test]
    fn test_filter_min_year() {
        let table = filter_min_year(turnout(), "year", 2016).unwrap();

        let years: Vec<_> = table.rows.iter().map(|r| r[1].as_str()).collect();
        assert_eq!(years, vec!["2016", "2020"]);
    }
}
