//! Column names for every source table, and conversion of normalized
//! [`RawTable`]s into typed records.
//!
//! Raw headers are only ever looked up here. A missing column is a
//! [`SchemaMismatch`](crate::error::PipelineError::SchemaMismatch); the
//! conversion never falls back to another column.

use crate::error::Result;
use crate::pipeline::normalize::FIPS_COLUMN;
use crate::pipeline::types::{
    CountyBaseline, Fips, Keyed, TractConnectivity, TurnoutObservation, Urbanicity,
};
use crate::pipeline::utility::{parse_numeric, parse_year};
use crate::table::{RawTable, cell};
use tracing::debug;

/// County baseline spreadsheet (typology, population change, election returns).
pub mod baseline {
    pub const KEY: &str = "FIPS";

    pub const STATE: &str = "state";
    pub const COUNTY: &str = "county";
    pub const TYPOLOGY_2018: &str = "typology_2018";
    pub const TYPOLOGY_2023: &str = "typology_2023";
    pub const POP_CHANGE_PCT: &str = "pop_change_pct";
    pub const BIDEN_2020: &str = "biden_2020";
    pub const TRUMP_2020: &str = "trump_2020";
    pub const TOTAL_2020: &str = "total_2020";
    pub const CLINTON_2016: &str = "clinton_2016";
    pub const TRUMP_2016: &str = "trump_2016";
    pub const TOTAL_2016: &str = "total_2016";
    pub const OBAMA_2012: &str = "obama_2012";
    pub const ROMNEY_2012: &str = "romney_2012";

    /// Spreadsheet header → canonical name. Note the trailing space after
    /// `Biden`, which is how the spreadsheet spells it.
    pub const RENAMES: &[(&str, &str)] = &[
        ("State", STATE),
        ("County", COUNTY),
        ("2018 Typology", TYPOLOGY_2018),
        ("2023 Typology", TYPOLOGY_2023),
        ("Pop. Change %", POP_CHANGE_PCT),
        ("Biden ", BIDEN_2020),
        ("Trump", TRUMP_2020),
        ("Total", TOTAL_2020),
        ("Clinton", CLINTON_2016),
        ("Trump 2016", TRUMP_2016),
        ("Total 2016", TOTAL_2016),
        ("Obama 2012", OBAMA_2012),
        ("Romney 2012", ROMNEY_2012),
    ];
}

/// County urbanicity table.
pub mod urbanicity {
    pub const KEY: &str = "stcofips";
    pub const URBAN_PCT: &str = "prop_urban";
    pub const RURAL_PCT: &str = "prop_rural";
}

/// County-year registered voter turnout table.
pub mod turnout {
    pub const KEY: &str = "stcofips";
    pub const YEAR: &str = "year";
    pub const REGISTERED_TURNOUT_PCT: &str = "reg_voter_turnout_pct";
    /// Earliest election year kept.
    pub const MIN_YEAR: i32 = 2016;
}

/// Tract-level street connectivity tables (one per census vintage).
pub mod connectivity {
    pub const KEY_2010: &str = "tract_fips10";
    pub const KEY_2020: &str = "tract_fips20";
    pub const NODE_COUNT: &str = "node_count";
    pub const NETWORK_DENSITY: &str = "network_density";
    pub const CONNECTED_NODE_RATIO: &str = "connected_node_ratio";
    pub const BLOCK_DENSITY: &str = "block_density";
}

/// Reads the key column of an already-normalized table.
fn keys(table: &RawTable) -> Result<Vec<Fips>> {
    let idx = table.column_index(FIPS_COLUMN)?;
    // The normalizer already padded these; from_county is a no-op on well-formed keys.
    Ok(table
        .rows
        .iter()
        .map(|row| Fips::from_county(cell(row, idx)))
        .collect())
}

/// Converts the baseline spreadsheet (renamed to canonical headers) into records.
pub fn baseline_records(table: &RawTable) -> Result<Keyed<CountyBaseline>> {
    use baseline::*;

    let keys = keys(table)?;
    let col = |name: &str| table.column_index(name);
    let (state, county) = (col(STATE)?, col(COUNTY)?);
    let (typology_2018, typology_2023) = (col(TYPOLOGY_2018)?, col(TYPOLOGY_2023)?);
    let pop_change = col(POP_CHANGE_PCT)?;
    let (biden, trump, total) = (col(BIDEN_2020)?, col(TRUMP_2020)?, col(TOTAL_2020)?);
    let (clinton, trump_16, total_16) = (col(CLINTON_2016)?, col(TRUMP_2016)?, col(TOTAL_2016)?);
    let (obama, romney) = (col(OBAMA_2012)?, col(ROMNEY_2012)?);

    let text = |row: &[String], idx: usize| cell(row, idx).trim().to_string();

    let records: Keyed<CountyBaseline> = keys
        .into_iter()
        .zip(&table.rows)
        .map(|(fips, row)| {
            let record = CountyBaseline {
                state: text(row, state),
                county: text(row, county),
                typology_2018: text(row, typology_2018),
                typology_2023: text(row, typology_2023),
                pop_change_pct: text(row, pop_change),
                biden_2020: text(row, biden),
                trump_2020: text(row, trump),
                total_2020: text(row, total),
                clinton_2016: text(row, clinton),
                trump_2016: text(row, trump_16),
                total_2016: text(row, total_16),
                obama_2012: text(row, obama),
                romney_2012: text(row, romney),
            };
            (fips, record)
        })
        .collect();

    debug!(rows = records.len(), "Baseline records built");
    Ok(records)
}

pub fn urbanicity_records(table: &RawTable) -> Result<Keyed<Urbanicity>> {
    let keys = keys(table)?;
    let urban = table.column_index(urbanicity::URBAN_PCT)?;
    let rural = table.column_index(urbanicity::RURAL_PCT)?;

    Ok(keys
        .into_iter()
        .zip(&table.rows)
        .map(|(fips, row)| {
            let record = Urbanicity {
                urban_pct: parse_numeric(cell(row, urban)),
                rural_pct: parse_numeric(cell(row, rural)),
            };
            (fips, record)
        })
        .collect())
}

/// Converts the (year-filtered) turnout table. Rows without a readable year
/// are skipped; the normalizer has already dropped them.
pub fn turnout_records(table: &RawTable) -> Result<Keyed<TurnoutObservation>> {
    let keys = keys(table)?;
    let year = table.column_index(turnout::YEAR)?;
    let pct = table.column_index(turnout::REGISTERED_TURNOUT_PCT)?;

    Ok(keys
        .into_iter()
        .zip(&table.rows)
        .filter_map(|(fips, row)| {
            let year = parse_year(cell(row, year))?;
            let record = TurnoutObservation {
                year,
                registered_turnout_pct: parse_numeric(cell(row, pct)),
            };
            Some((fips, record))
        })
        .collect())
}

pub fn tract_records(table: &RawTable) -> Result<Vec<TractConnectivity>> {
    use connectivity::*;

    let keys = keys(table)?;
    let nodes = table.column_index(NODE_COUNT)?;
    let density = table.column_index(NETWORK_DENSITY)?;
    let ratio = table.column_index(CONNECTED_NODE_RATIO)?;
    let blocks = table.column_index(BLOCK_DENSITY)?;

    Ok(keys
        .into_iter()
        .zip(&table.rows)
        .map(|(fips, row)| TractConnectivity {
            fips,
            node_count: parse_numeric(cell(row, nodes)),
            network_density: parse_numeric(cell(row, density)),
            connected_node_ratio: parse_numeric(cell(row, ratio)),
            block_density: parse_numeric(cell(row, blocks)),
        })
        .collect())
}
