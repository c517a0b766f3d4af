//! Analysis views and named subsets sliced from the derived table.

use crate::pipeline::derive::{EXURBS, URBAN_SUBURBS};
use crate::pipeline::types::{DerivedCounty, PresidentialRow, ReclassifiedRow, UrbanicityRow};
use std::collections::HashSet;

/// Turnout year the urbanicity view is restricted to.
pub const URBANICITY_YEAR: i32 = 2016;

/// Which way a county leaned in one election.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lean {
    Democratic,
    Republican,
    /// Exact tie or undefined margin.
    Neither,
}

impl Lean {
    pub fn of(margin: Option<f64>) -> Self {
        match margin {
            Some(m) if m > 0.0 => Lean::Democratic,
            Some(m) if m < 0.0 => Lean::Republican,
            _ => Lean::Neither,
        }
    }
}

/// Sign changed between two consecutive elections.
fn flipped(before: Lean, after: Lean) -> bool {
    matches!(
        (before, after),
        (Lean::Democratic, Lean::Republican) | (Lean::Republican, Lean::Democratic)
    )
}

impl PresidentialRow {
    fn leans(&self) -> [Lean; 3] {
        [
            Lean::of(self.margin_2012),
            Lean::of(self.margin_2016),
            Lean::of(self.margin_2020),
        ]
    }

    /// Strict alternation across 2012, 2016 and 2020 in either direction.
    pub fn is_triple_flip(&self) -> bool {
        let [a, b, c] = self.leans();
        flipped(a, b) && flipped(b, c)
    }

    /// At least one sign change between adjacent elections.
    pub fn is_double_flip(&self) -> bool {
        let [a, b, c] = self.leans();
        flipped(a, b) || flipped(b, c)
    }

    /// Both typology vintages present and different.
    pub fn is_reclassified(&self) -> bool {
        reclassified(&self.typology_2018, &self.typology_2023)
    }

    fn dedup_key(&self) -> DedupKey {
        let bits = |v: Option<f64>| v.map(f64::to_bits);
        (
            self.fips.clone(),
            self.state.clone(),
            self.county.clone(),
            self.typology_2018.clone(),
            self.typology_2023.clone(),
            bits(self.pop_change_pct),
            bits(self.margin_2012),
            bits(self.margin_2016),
            bits(self.margin_2020),
        )
    }
}

/// Every presidential column, with floats compared by bit pattern.
type DedupKey = (
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<u64>,
    Option<u64>,
    Option<u64>,
    Option<u64>,
);

fn reclassified(typology_2018: &Option<String>, typology_2023: &Option<String>) -> bool {
    matches!((typology_2018, typology_2023), (Some(a), Some(b)) if a != b)
}

/// Identity, typology, population change and margins, exact duplicates removed
/// (first occurrence kept).
pub fn presidential_view(rows: &[DerivedCounty]) -> Vec<PresidentialRow> {
    let mut seen = HashSet::new();
    rows.iter()
        .map(|d| PresidentialRow {
            fips: d.fips.clone(),
            state: d.state.clone(),
            county: d.county.clone(),
            typology_2018: d.typology_2018.clone(),
            typology_2023: d.typology_2023.clone(),
            pop_change_pct: d.pop_change_pct,
            margin_2012: d.margin_2012,
            margin_2016: d.margin_2016,
            margin_2020: d.margin_2020,
        })
        .filter(|row| seen.insert(row.dedup_key()))
        .collect()
}

pub fn urbanicity_view(rows: &[DerivedCounty]) -> Vec<UrbanicityRow> {
    rows.iter()
        .filter(|d| d.year == Some(URBANICITY_YEAR))
        .map(|d| UrbanicityRow {
            fips: d.fips.clone(),
            state: d.state.clone(),
            county: d.county.clone(),
            typology_2023: d.typology_2023.clone(),
            urban_pct: d.urban_pct,
            rural_pct: d.rural_pct,
            node_count_2010: d.node_count_2010,
            network_density_2010: d.network_density_2010,
            connected_node_ratio_2010: d.connected_node_ratio_2010,
            block_density_2010: d.block_density_2010,
            node_count_2020: d.node_count_2020,
            network_density_2020: d.network_density_2020,
            connected_node_ratio_2020: d.connected_node_ratio_2020,
            block_density_2020: d.block_density_2020,
            turnout_pct: d.registered_turnout_pct,
        })
        .collect()
}

pub fn reclassification_view(rows: &[DerivedCounty]) -> Vec<ReclassifiedRow> {
    rows.iter()
        .filter(|d| reclassified(&d.typology_2018, &d.typology_2023))
        .map(|d| ReclassifiedRow {
            fips: d.fips.clone(),
            state: d.state.clone(),
            county: d.county.clone(),
            typology_2018: d.typology_2018.clone(),
            typology_2023: d.typology_2023.clone(),
            year: d.year,
            registered_turnout_pct: d.registered_turnout_pct,
        })
        .collect()
}

/// Counties whose margins flipped, selected from the presidential view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlipSubsets {
    pub triple_flip: Vec<PresidentialRow>,
    pub double_flip: Vec<PresidentialRow>,
    pub double_flip_reclassified: Vec<PresidentialRow>,
}

pub fn flip_subsets(presidential: &[PresidentialRow]) -> FlipSubsets {
    let select = |pred: fn(&PresidentialRow) -> bool| -> Vec<PresidentialRow> {
        presidential.iter().filter(|r| pred(r)).cloned().collect()
    };

    let double_flip = select(PresidentialRow::is_double_flip);
    let double_flip_reclassified = double_flip
        .iter()
        .filter(|r| r.is_reclassified())
        .cloned()
        .collect();

    FlipSubsets {
        triple_flip: select(PresidentialRow::is_triple_flip),
        double_flip,
        double_flip_reclassified,
    }
}

/// Suburban and exurban counties split by their 2020 lean.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypologySubsets {
    pub suburbs_democratic: Vec<PresidentialRow>,
    pub suburbs_republican: Vec<PresidentialRow>,
    pub exurbs_democratic: Vec<PresidentialRow>,
    pub exurbs_republican: Vec<PresidentialRow>,
}

pub fn typology_subsets(presidential: &[PresidentialRow]) -> TypologySubsets {
    let select = |typology: &str, lean: Lean| -> Vec<PresidentialRow> {
        presidential
            .iter()
            .filter(|r| r.typology_2023.as_deref() == Some(typology))
            .filter(|r| Lean::of(r.margin_2020) == lean)
            .cloned()
            .collect()
    };

    TypologySubsets {
        suburbs_democratic: select(URBAN_SUBURBS, Lean::Democratic),
        suburbs_republican: select(URBAN_SUBURBS, Lean::Republican),
        exurbs_democratic: select(EXURBS, Lean::Democratic),
        exurbs_republican: select(EXURBS, Lean::Republican),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fips: &str, margins: (Option<f64>, Option<f64>, Option<f64>)) -> PresidentialRow {
        PresidentialRow {
            fips: fips.into(),
            state: Some("Ohio".into()),
            county: Some(format!("County {fips}")),
            typology_2018: Some("Exurbs".into()),
            typology_2023: Some("Exurbs".into()),
            pop_change_pct: Some(1.0),
            margin_2012: margins.0,
            margin_2016: margins.1,
            margin_2020: margins.2,
        }
    }

    fn derived(fips: &str, year: Option<i32>) -> DerivedCounty {
        DerivedCounty {
            fips: fips.into(),
            typology_2018: Some("Rural Middle America".into()),
            typology_2023: Some("Exurbs".into()),
            margin_2016: Some(-3.0),
            year,
            registered_turnout_pct: Some(64.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_triple_flip() {
        assert!(row("1", (Some(-5.0), Some(5.0), Some(-5.0))).is_triple_flip());
        assert!(row("1", (Some(5.0), Some(-5.0), Some(5.0))).is_triple_flip());
        assert!(!row("1", (Some(-5.0), Some(5.0), Some(0.0))).is_triple_flip());
        assert!(!row("1", (Some(-5.0), Some(5.0), None)).is_triple_flip());
        assert!(!row("1", (Some(-5.0), Some(5.0), Some(5.0))).is_triple_flip());
    }

    #[test]
    fn test_double_flip() {
        assert!(row("1", (Some(-5.0), Some(5.0), Some(0.0))).is_double_flip());
        assert!(row("1", (Some(5.0), Some(5.0), Some(-1.0))).is_double_flip());
        assert!(!row("1", (Some(5.0), Some(0.0), Some(-1.0))).is_double_flip());
        assert!(!row("1", (None, None, None)).is_double_flip());
    }

    #[test]
    fn test_double_flip_contains_triple_flip() {
        let values = [Some(-5.0), Some(0.0), Some(5.0), None];
        let mut rows = Vec::new();
        for a in values {
            for b in values {
                for c in values {
                    rows.push(row("1", (a, b, c)));
                }
            }
        }
        let subsets = flip_subsets(&rows);

        assert!(!subsets.triple_flip.is_empty());
        for r in &subsets.triple_flip {
            assert!(subsets.double_flip.contains(r));
        }
        assert!(rows.iter().filter(|r| r.is_triple_flip()).all(|r| r.is_double_flip()));
    }

    #[test]
    fn test_double_flip_reclassified() {
        let mut changed = row("2", (Some(5.0), Some(-5.0), Some(-5.0)));
        changed.typology_2018 = Some("Urban Suburbs".into());
        let rows = vec![row("1", (Some(5.0), Some(-5.0), Some(-5.0))), changed.clone()];
        let subsets = flip_subsets(&rows);

        assert_eq!(subsets.double_flip.len(), 2);
        assert_eq!(subsets.double_flip_reclassified, vec![changed]);
    }

    #[test]
    fn test_presidential_view_dedups_year_dimension() {
        let rows = vec![
            derived("01001", Some(2016)),
            derived("01001", Some(2018)),
            derived("01001", Some(2020)),
            derived("01003", Some(2016)),
        ];
        let view = presidential_view(&rows);

        assert_eq!(view.len(), 2);
        assert_eq!(view[0].fips, "01001");
        assert_eq!(view[1].fips, "01003");
    }

    #[test]
    fn test_urbanicity_view_keeps_2016_only() {
        let rows = vec![
            derived("01001", Some(2016)),
            derived("01001", Some(2020)),
            derived("01003", None),
        ];
        let view = urbanicity_view(&rows);

        assert_eq!(view.len(), 1);
        assert_eq!(view[0].turnout_pct, Some(64.0));
    }

    #[test]
    fn test_reclassification_view_requires_both_labels() {
        let mut missing = derived("01005", Some(2016));
        missing.typology_2018 = None;
        let mut same = derived("01007", Some(2016));
        same.typology_2018 = Some("Exurbs".into());
        let rows = vec![derived("01001", Some(2016)), missing, same];
        let view = reclassification_view(&rows);

        assert_eq!(view.len(), 1);
        assert_eq!(view[0].fips, "01001");
        assert_eq!(view[0].year, Some(2016));
    }

    #[test]
    fn test_typology_subsets_split_by_2020_lean() {
        let mut suburb = row("3", (None, None, Some(12.0)));
        suburb.typology_2023 = Some("Urban Suburbs".into());
        let rows = vec![
            row("1", (None, None, Some(-20.0))),
            row("2", (None, None, Some(0.0))),
            suburb.clone(),
        ];
        let subsets = typology_subsets(&rows);

        assert_eq!(subsets.exurbs_republican.len(), 1);
        assert!(subsets.exurbs_democratic.is_empty());
        assert_eq!(subsets.suburbs_democratic, vec![suburb]);
        assert!(subsets.suburbs_republican.is_empty());
    }
}
