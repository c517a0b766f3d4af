//! Descriptive statistics over the numeric columns of an analysis view.

use crate::pipeline::types::{PresidentialRow, ReclassifiedRow, UrbanicityRow};
use crate::pipeline::utility::{mean, stddev};
use serde::Serialize;

/// Rows that expose named numeric columns.
pub trait NumericColumns {
    fn numeric_columns(&self) -> Vec<(&'static str, Option<f64>)>;
}

impl NumericColumns for PresidentialRow {
    fn numeric_columns(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("pop_change_pct", self.pop_change_pct),
            ("margin_2012", self.margin_2012),
            ("margin_2016", self.margin_2016),
            ("margin_2020", self.margin_2020),
        ]
    }
}

impl NumericColumns for UrbanicityRow {
    fn numeric_columns(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("urban_pct", self.urban_pct),
            ("rural_pct", self.rural_pct),
            ("node_count_2010", self.node_count_2010),
            ("network_density_2010", self.network_density_2010),
            ("connected_node_ratio_2010", self.connected_node_ratio_2010),
            ("block_density_2010", self.block_density_2010),
            ("node_count_2020", self.node_count_2020),
            ("network_density_2020", self.network_density_2020),
            ("connected_node_ratio_2020", self.connected_node_ratio_2020),
            ("block_density_2020", self.block_density_2020),
            ("turnout_2016_pct", self.turnout_pct),
        ]
    }
}

impl NumericColumns for ReclassifiedRow {
    fn numeric_columns(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![("registered_turnout_pct", self.registered_turnout_pct)]
    }
}

/// Summary of one column. Statistics are over present values only and are
/// missing when no value is present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub view: String,
    pub column: String,
    pub count: usize,
    pub missing: usize,
    pub mean: Option<f64>,
    pub stddev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Summarizes every numeric column of `rows`, in column order.
pub fn describe<T: NumericColumns>(view: &str, rows: &[T]) -> Vec<ColumnSummary> {
    let mut columns: Vec<(&'static str, Vec<f64>, usize)> = Vec::new();

    for row in rows {
        for (i, (name, value)) in row.numeric_columns().into_iter().enumerate() {
            if columns.len() <= i {
                columns.push((name, Vec::new(), 0));
            }
            match value {
                Some(v) => columns[i].1.push(v),
                None => columns[i].2 += 1,
            }
        }
    }

    columns
        .into_iter()
        .map(|(name, values, missing)| {
            let present = !values.is_empty();
            let avg = mean(&values);
            ColumnSummary {
                view: view.to_string(),
                column: name.to_string(),
                count: values.len(),
                missing,
                mean: present.then_some(avg),
                stddev: present.then(|| stddev(&values, avg)),
                min: values.iter().copied().reduce(f64::min),
                max: values.iter().copied().reduce(f64::max),
            }
        })
        .collect()
}
