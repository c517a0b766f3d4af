//! Record types flowing between pipeline stages.

use serde::Serialize;
use std::fmt;

/// County identifier: five zero-padded digits.
///
/// Keys that cannot be brought into that shape are kept verbatim so the row
/// survives the joins; [`Fips::is_well_formed`] reports them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Fips(String);

impl Fips {
    pub const WIDTH: usize = 5;
    pub const TRACT_WIDTH: usize = 11;

    /// Builds a county key from a raw county code, left-padding short codes.
    pub fn from_county(raw: &str) -> Self {
        match canonical_digits(raw) {
            Some(digits) if digits.len() <= Self::WIDTH => {
                Fips(format!("{:0>width$}", digits, width = Self::WIDTH))
            }
            _ => Fips(raw.trim().to_string()),
        }
    }

    /// Builds a county key from an 11-digit tract code (state + county + tract).
    pub fn from_tract(raw: &str) -> Self {
        match canonical_digits(raw) {
            Some(digits) if digits.len() <= Self::TRACT_WIDTH => {
                let padded = format!("{:0>width$}", digits, width = Self::TRACT_WIDTH);
                Fips(padded[..Self::WIDTH].to_string())
            }
            _ => Fips(raw.trim().to_string()),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.0.len() == Self::WIDTH && self.0.bytes().all(|b| b.is_ascii_digit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fips {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digits of a numeric code, accepting float-style exports such as `1001.0`.
fn canonical_digits(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let integral = match trimmed.split_once('.') {
        Some((int, frac)) if frac.bytes().all(|b| b == b'0') => int,
        Some(_) => return None,
        None => trimmed,
    };
    if integral.is_empty() || !integral.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(integral.to_string())
}

/// Rows keyed by county, in source order.
pub type Keyed<T> = Vec<(Fips, T)>;

/// One row of the county baseline spreadsheet, with canonical field names.
///
/// Vote counts stay as text here; the deriver coerces them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountyBaseline {
    pub state: String,
    pub county: String,
    pub typology_2018: String,
    pub typology_2023: String,
    pub pop_change_pct: String,
    pub biden_2020: String,
    pub trump_2020: String,
    pub total_2020: String,
    pub clinton_2016: String,
    pub trump_2016: String,
    pub total_2016: String,
    /// Fractional (0-1) vote share.
    pub obama_2012: String,
    /// Fractional (0-1) vote share.
    pub romney_2012: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Urbanicity {
    pub urban_pct: Option<f64>,
    pub rural_pct: Option<f64>,
}

/// One county-year of registered voter turnout.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnoutObservation {
    pub year: i32,
    pub registered_turnout_pct: Option<f64>,
}

/// Street network metrics for a single census tract, keyed by its county.
#[derive(Debug, Clone, PartialEq)]
pub struct TractConnectivity {
    pub fips: Fips,
    pub node_count: Option<f64>,
    pub network_density: Option<f64>,
    pub connected_node_ratio: Option<f64>,
    pub block_density: Option<f64>,
}

/// County mean of the tract metrics for one year.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityAverage {
    pub year: u16,
    pub node_count: Option<f64>,
    pub network_density: Option<f64>,
    pub connected_node_ratio: Option<f64>,
    pub block_density: Option<f64>,
}

/// A merged row: one county, plus whatever each source contributed.
#[derive(Debug, Clone, PartialEq)]
pub struct CountyRecord {
    pub fips: Fips,
    pub baseline: Option<CountyBaseline>,
    pub urbanicity: Option<Urbanicity>,
    pub turnout: Option<TurnoutObservation>,
    pub connectivity_2010: Option<ConnectivityAverage>,
    pub connectivity_2020: Option<ConnectivityAverage>,
}

impl CountyRecord {
    pub fn new(fips: Fips) -> Self {
        Self {
            fips,
            baseline: None,
            urbanicity: None,
            turnout: None,
            connectivity_2010: None,
            connectivity_2020: None,
        }
    }
}

/// Fully derived analysis row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivedCounty {
    pub fips: String,
    pub state: Option<String>,
    pub county: Option<String>,
    pub typology_2018: Option<String>,
    pub typology_2023: Option<String>,
    pub pop_change_pct: Option<f64>,

    // vote counts
    pub biden_2020: Option<f64>,
    pub trump_2020: Option<f64>,
    pub total_2020: Option<f64>,
    pub clinton_2016: Option<f64>,
    pub trump_2016: Option<f64>,
    pub total_2016: Option<f64>,
    pub obama_2012: Option<f64>,
    pub romney_2012: Option<f64>,

    // shares (0-100)
    pub biden_pct: Option<f64>,
    pub trump_pct: Option<f64>,
    pub clinton_pct: Option<f64>,
    pub trump_2016_pct: Option<f64>,

    // margins, positive = Democratic
    pub margin_2012: Option<f64>,
    pub margin_2016: Option<f64>,
    pub margin_2020: Option<f64>,

    pub urban_pct: Option<f64>,
    pub rural_pct: Option<f64>,

    pub node_count_2010: Option<f64>,
    pub network_density_2010: Option<f64>,
    pub connected_node_ratio_2010: Option<f64>,
    pub block_density_2010: Option<f64>,
    pub node_count_2020: Option<f64>,
    pub network_density_2020: Option<f64>,
    pub connected_node_ratio_2020: Option<f64>,
    pub block_density_2020: Option<f64>,

    pub year: Option<i32>,
    pub registered_turnout_pct: Option<f64>,
}

/// Row of the presidential view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresidentialRow {
    pub fips: String,
    pub state: Option<String>,
    pub county: Option<String>,
    pub typology_2018: Option<String>,
    pub typology_2023: Option<String>,
    pub pop_change_pct: Option<f64>,
    pub margin_2012: Option<f64>,
    pub margin_2016: Option<f64>,
    pub margin_2020: Option<f64>,
}

/// Row of the urbanicity view (turnout year 2016 only).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrbanicityRow {
    pub fips: String,
    pub state: Option<String>,
    pub county: Option<String>,
    pub typology_2023: Option<String>,
    pub urban_pct: Option<f64>,
    pub rural_pct: Option<f64>,
    pub node_count_2010: Option<f64>,
    pub network_density_2010: Option<f64>,
    pub connected_node_ratio_2010: Option<f64>,
    pub block_density_2010: Option<f64>,
    pub node_count_2020: Option<f64>,
    pub network_density_2020: Option<f64>,
    pub connected_node_ratio_2020: Option<f64>,
    pub block_density_2020: Option<f64>,
    #[serde(rename = "turnout_2016_pct")]
    pub turnout_pct: Option<f64>,
}

/// Row of the reclassification view (typology changed between vintages).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReclassifiedRow {
    pub fips: String,
    pub state: Option<String>,
    pub county: Option<String>,
    pub typology_2018: Option<String>,
    pub typology_2023: Option<String>,
    pub year: Option<i32>,
    pub registered_turnout_pct: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_county_code_is_left_padded() {
        assert_eq!(Fips::from_county("1001").as_str(), "01001");
        assert_eq!(Fips::from_county("53033").as_str(), "53033");
        assert_eq!(Fips::from_county(" 6037 ").as_str(), "06037");
    }

    #[test]
    fn test_float_export_is_accepted() {
        assert_eq!(Fips::from_county("1001.0").as_str(), "01001");
        assert!(Fips::from_county("1001.5").as_str() == "1001.5");
    }

    #[test]
    fn test_tract_code_truncates_to_county() {
        assert_eq!(Fips::from_tract("53033000100").as_str(), "53033");
        // leading zero dropped by a numeric export
        assert_eq!(Fips::from_tract("1001020100").as_str(), "01001");
    }

    #[test]
    fn test_malformed_key_is_kept_and_flagged() {
        let fips = Fips::from_county("12345678");
        assert_eq!(fips.as_str(), "12345678");
        assert!(!fips.is_well_formed());

        let fips = Fips::from_county("n/a");
        assert_eq!(fips.as_str(), "n/a");
        assert!(!fips.is_well_formed());

        assert!(Fips::from_county("42").is_well_formed());
    }
}
