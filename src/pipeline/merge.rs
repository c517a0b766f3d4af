use crate::pipeline::types::{
    ConnectivityAverage, CountyBaseline, CountyRecord, Fips, Keyed, TurnoutObservation, Urbanicity,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// All normalized, typed inputs to the merge, in join order.
#[derive(Debug, Clone, Default)]
pub struct MergeInputs {
    pub baseline: Keyed<CountyBaseline>,
    pub urbanicity: Keyed<Urbanicity>,
    pub turnout: Keyed<TurnoutObservation>,
    pub connectivity_2010: Keyed<ConnectivityAverage>,
    pub connectivity_2020: Keyed<ConnectivityAverage>,
}

impl MergeInputs {
    /// Union of the keys of every input.
    pub fn key_union(&self) -> BTreeSet<Fips> {
        fn keys<T>(rows: &Keyed<T>) -> impl Iterator<Item = Fips> + '_ {
            rows.iter().map(|(f, _)| f.clone())
        }
        keys(&self.baseline)
            .chain(keys(&self.urbanicity))
            .chain(keys(&self.turnout))
            .chain(keys(&self.connectivity_2010))
            .chain(keys(&self.connectivity_2020))
            .collect()
    }
}

/// Full outer join of merged rows with one more keyed source.
///
/// A key with `k` left rows and `m` right rows produces `k * m` rows. Keys
/// on one side only keep their rows, with the other side's section left
/// empty. Output is ordered by key, then left order, then right order.
pub fn outer_join<T: Clone>(
    left: Vec<CountyRecord>,
    right: Keyed<T>,
    attach: impl Fn(&mut CountyRecord, T),
) -> Vec<CountyRecord> {
    let mut left_groups: BTreeMap<Fips, Vec<CountyRecord>> = BTreeMap::new();
    for record in left {
        left_groups.entry(record.fips.clone()).or_default().push(record);
    }

    let mut right_groups: BTreeMap<Fips, Vec<T>> = BTreeMap::new();
    for (fips, value) in right {
        right_groups.entry(fips).or_default().push(value);
    }

    let keys: BTreeSet<Fips> = left_groups
        .keys()
        .chain(right_groups.keys())
        .cloned()
        .collect();

    let mut merged = Vec::with_capacity(keys.len());
    for key in keys {
        let lefts = left_groups
            .remove(&key)
            .unwrap_or_else(|| vec![CountyRecord::new(key.clone())]);

        match right_groups.remove(&key) {
            Some(rights) => {
                for l in &lefts {
                    for r in &rights {
                        let mut row = l.clone();
                        attach(&mut row, r.clone());
                        merged.push(row);
                    }
                }
            }
            None => merged.extend(lefts),
        }
    }
    merged
}

/// Joins every source on `Fips`: baseline, urbanicity, turnout,
/// connectivity 2010, connectivity 2020.
#[tracing::instrument(skip_all)]
pub fn merge_sources(inputs: MergeInputs) -> Vec<CountyRecord> {
    let MergeInputs {
        baseline,
        urbanicity,
        turnout,
        connectivity_2010,
        connectivity_2020,
    } = inputs;

    let merged = outer_join(Vec::new(), baseline, |row, b| row.baseline = Some(b));
    debug!(rows = merged.len(), "Joined baseline");
    let merged = outer_join(merged, urbanicity, |row, u| row.urbanicity = Some(u));
    debug!(rows = merged.len(), "Joined urbanicity");
    let merged = outer_join(merged, turnout, |row, t| row.turnout = Some(t));
    debug!(rows = merged.len(), "Joined turnout");
    let merged = outer_join(merged, connectivity_2010, |row, c| {
        row.connectivity_2010 = Some(c)
    });
    debug!(rows = merged.len(), "Joined connectivity 2010");
    let merged = outer_join(merged, connectivity_2020, |row, c| {
        row.connectivity_2020 = Some(c)
    });

    let malformed = merged.iter().filter(|r| !r.fips.is_well_formed()).count();
    info!(rows = merged.len(), malformed, "Sources merged");
    merged
}
