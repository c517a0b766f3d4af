use crate::pipeline::types::{ConnectivityAverage, Fips, Keyed, TractConnectivity};
use crate::pipeline::utility::mean_present;
use std::collections::BTreeMap;
use tracing::debug;

/// Collects each metric's tract values for one county.
#[derive(Default)]
struct MetricSeries {
    node_count: Vec<Option<f64>>,
    network_density: Vec<Option<f64>>,
    connected_node_ratio: Vec<Option<f64>>,
    block_density: Vec<Option<f64>>,
}

/// Averages tract-level connectivity metrics up to the county for one year.
///
/// Missing tract values are excluded from both the sum and the count; a
/// county whose values for a metric are all missing gets a missing average.
/// Output is ordered by `Fips` and holds exactly the distinct input keys.
pub fn aggregate_connectivity(
    tracts: &[TractConnectivity],
    year: u16,
) -> Keyed<ConnectivityAverage> {
    let mut series: BTreeMap<&Fips, MetricSeries> = BTreeMap::new();

    for tract in tracts {
        let entry = series.entry(&tract.fips).or_default();
        entry.node_count.push(tract.node_count);
        entry.network_density.push(tract.network_density);
        entry.connected_node_ratio.push(tract.connected_node_ratio);
        entry.block_density.push(tract.block_density);
    }

    let averages: Keyed<ConnectivityAverage> = series
        .into_iter()
        .map(|(fips, s)| {
            let average = ConnectivityAverage {
                year,
                node_count: mean_present(&s.node_count),
                network_density: mean_present(&s.network_density),
                connected_node_ratio: mean_present(&s.connected_node_ratio),
                block_density: mean_present(&s.block_density),
            };
            (fips.clone(), average)
        })
        .collect();

    debug!(year, tracts = tracts.len(), counties = averages.len(), "Connectivity aggregated");
    averages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tract(fips: &str, node_count: Option<f64>) -> TractConnectivity {
        TractConnectivity {
            fips: Fips::from_county(fips),
            node_count,
            network_density: Some(1.0),
            connected_node_ratio: None,
            block_density: Some(2.0),
        }
    }

    #[test]
    fn test_missing_values_excluded_from_mean() {
        let tracts = vec![
            tract("01001", Some(10.0)),
            tract("01001", None),
            tract("01001", Some(20.0)),
        ];
        let averages = aggregate_connectivity(&tracts, 2010);

        assert_eq!(averages.len(), 1);
        assert_eq!(averages[0].1.node_count, Some(15.0));
        assert_eq!(averages[0].1.year, 2010);
    }

    #[test]
    fn test_all_missing_metric_stays_missing() {
        let tracts = vec![tract("01001", None), tract("01001", None)];
        let averages = aggregate_connectivity(&tracts, 2020);

        assert_eq!(averages[0].1.node_count, None);
        assert_eq!(averages[0].1.connected_node_ratio, None);
        assert_eq!(averages[0].1.network_density, Some(1.0));
    }

    #[test]
    fn test_output_keys_are_distinct_input_keys() {
        let tracts = vec![
            tract("53033", Some(1.0)),
            tract("01001", Some(2.0)),
            tract("53033", Some(3.0)),
        ];
        let averages = aggregate_connectivity(&tracts, 2010);

        let keys: Vec<_> = averages.iter().map(|(f, _)| f.as_str()).collect();
        assert_eq!(keys, vec!["01001", "53033"]);
        assert_eq!(averages[1].1.node_count, Some(2.0));
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate_connectivity(&[], 2010).is_empty());
    }
}
