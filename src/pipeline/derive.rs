//! Canonical renames, numeric coercion and the vote-share / margin columns.

use crate::pipeline::schema::baseline;
use crate::pipeline::types::{ConnectivityAverage, CountyRecord, DerivedCounty};
use crate::pipeline::utility::{parse_fraction, parse_numeric, share};
use crate::table::RawTable;
use tracing::{debug, info};

/// Label the 2023 typology vintage spells inconsistently.
pub const MISSPELLED_TYPOLOGY: &str = "Urban Burbs";
pub const URBAN_SUBURBS: &str = "Urban Suburbs";
pub const EXURBS: &str = "Exurbs";

/// Renames the spreadsheet's headers to canonical names. Unmapped headers
/// pass through unchanged.
pub fn canonicalize_baseline(table: &mut RawTable) {
    let renamed = table.rename_columns(baseline::RENAMES);
    debug!(renamed, "Baseline headers canonicalized");
}

/// Corrects the known misspelling. Exact match only: compound labels that
/// merely contain the misspelling are left alone.
pub fn fix_typology_label(label: String) -> String {
    if label == MISSPELLED_TYPOLOGY {
        URBAN_SUBURBS.to_string()
    } else {
        label
    }
}

/// Signed margin in percentage points, positive = Democratic.
pub fn margin(democratic: Option<f64>, republican: Option<f64>) -> Option<f64> {
    Some(democratic? - republican?)
}

/// Margin from fractional (0-1) shares, scaled to percentage points.
pub fn margin_from_fractions(democratic: Option<f64>, republican: Option<f64>) -> Option<f64> {
    margin(democratic, republican).map(|m| m * 100.0)
}

/// Counts cells that were present but failed numeric coercion.
#[derive(Debug, Default)]
struct Coercion {
    failures: usize,
}

impl Coercion {
    fn numeric(&mut self, raw: &str) -> Option<f64> {
        self.count(raw, parse_numeric)
    }

    fn fraction(&mut self, raw: &str) -> Option<f64> {
        self.count(raw, parse_fraction)
    }

    fn count(&mut self, raw: &str, parse: fn(&str) -> Option<f64>) -> Option<f64> {
        let value = parse(raw);
        if value.is_none() && !raw.trim().is_empty() {
            self.failures += 1;
        }
        value
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn derive_one(record: &CountyRecord, coercion: &mut Coercion) -> DerivedCounty {
    let mut row = DerivedCounty {
        fips: record.fips.as_str().to_string(),
        ..Default::default()
    };

    if let Some(b) = &record.baseline {
        row.state = non_empty(&b.state);
        row.county = non_empty(&b.county);
        row.typology_2018 = non_empty(&b.typology_2018);
        row.typology_2023 = non_empty(&b.typology_2023).map(fix_typology_label);
        row.pop_change_pct = coercion.numeric(&b.pop_change_pct);

        row.biden_2020 = coercion.numeric(&b.biden_2020);
        row.trump_2020 = coercion.numeric(&b.trump_2020);
        row.total_2020 = coercion.numeric(&b.total_2020);
        row.clinton_2016 = coercion.numeric(&b.clinton_2016);
        row.trump_2016 = coercion.numeric(&b.trump_2016);
        row.total_2016 = coercion.numeric(&b.total_2016);
        row.obama_2012 = coercion.fraction(&b.obama_2012);
        row.romney_2012 = coercion.fraction(&b.romney_2012);
    }

    row.biden_pct = share(row.biden_2020, row.total_2020);
    row.trump_pct = share(row.trump_2020, row.total_2020);
    row.clinton_pct = share(row.clinton_2016, row.total_2016);
    row.trump_2016_pct = share(row.trump_2016, row.total_2016);

    row.margin_2012 = margin_from_fractions(row.obama_2012, row.romney_2012);
    row.margin_2016 = margin(row.clinton_pct, row.trump_2016_pct);
    row.margin_2020 = margin(row.biden_pct, row.trump_pct);

    if let Some(u) = &record.urbanicity {
        row.urban_pct = u.urban_pct;
        row.rural_pct = u.rural_pct;
    }

    if let Some(ConnectivityAverage {
        node_count,
        network_density,
        connected_node_ratio,
        block_density,
        ..
    }) = record.connectivity_2010
    {
        row.node_count_2010 = node_count;
        row.network_density_2010 = network_density;
        row.connected_node_ratio_2010 = connected_node_ratio;
        row.block_density_2010 = block_density;
    }

    if let Some(ConnectivityAverage {
        node_count,
        network_density,
        connected_node_ratio,
        block_density,
        ..
    }) = record.connectivity_2020
    {
        row.node_count_2020 = node_count;
        row.network_density_2020 = network_density;
        row.connected_node_ratio_2020 = connected_node_ratio;
        row.block_density_2020 = block_density;
    }

    if let Some(t) = &record.turnout {
        row.year = Some(t.year);
        row.registered_turnout_pct = t.registered_turnout_pct;
    }

    row
}

/// Derives the analysis columns for every merged row, preserving order.
#[tracing::instrument(skip_all, fields(rows = records.len()))]
pub fn derive_counties(records: &[CountyRecord]) -> Vec<DerivedCounty> {
    let mut coercion = Coercion::default();
    let derived: Vec<DerivedCounty> = records
        .iter()
        .map(|r| derive_one(r, &mut coercion))
        .collect();

    let undefined_2020 = derived.iter().filter(|d| d.margin_2020.is_none()).count();
    info!(
        rows = derived.len(),
        coercion_failures = coercion.failures,
        undefined_2020,
        "Derived analysis columns"
    );
    derived
}
