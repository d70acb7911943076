use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::freq::{Count, FrequencyTable, Reading};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatsError {
    /// Mean/median over zero observations is undefined; callers must handle
    /// this instead of getting a default-valued summary back.
    #[error("no observations recorded")]
    EmptyInput,
}

/// Summary of one frequency table.
///
/// `low_values`/`high_values` are the distinct readings tied for the
/// lowest/highest observation frequency, sorted ascending. Ties are kept as
/// whole groups, never broken arbitrarily.
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub average: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub low_values: Vec<f64>,
    pub low_count: Count,
    pub high_values: Vec<f64>,
    pub high_count: Count,
}

/// Computes all metrics from one table snapshot.
///
/// Average and median are defined over the expanded multiset (each distinct
/// value repeated by its count), but computed in weighted form so memory
/// stays proportional to the number of distinct values.
pub fn compute_metrics(table: &FrequencyTable) -> Result<Metrics, StatsError> {
    let entries = table.sorted_entries();
    let n: Count = entries.iter().map(|&(_, c)| c).sum();
    if n == 0 {
        return Err(StatsError::EmptyInput);
    }

    let sum: f64 = entries
        .iter()
        .map(|&(v, c)| v.into_inner() * c as f64)
        .sum();
    let average = sum / n as f64;

    // standard multiset median: even N averages the two central elements
    let median = if n % 2 == 0 {
        (nth(&entries, n / 2 - 1) + nth(&entries, n / 2)) / 2.0
    } else {
        nth(&entries, n / 2)
    };

    let min = entries[0].0.into_inner();
    let max = entries[entries.len() - 1].0.into_inner();

    let (low_values, low_count, high_values, high_count) = frequency_extremes(&entries);

    Ok(Metrics {
        average,
        median,
        min,
        max,
        low_values,
        low_count,
        high_values,
        high_count,
    })
}

/// Element at `index` (0-based) of the sorted expanded multiset, found by
/// walking cumulative counts instead of materializing the expansion.
fn nth(entries: &[(Reading, Count)], index: Count) -> f64 {
    let mut seen = 0;
    for &(value, count) in entries {
        seen += count;
        if index < seen {
            return value.into_inner();
        }
    }
    panic!("rank {index} past the end of the expansion");
}

/// Groups distinct readings by their observation count and returns the
/// least- and most-frequent groups with their frequencies. Expects `entries`
/// sorted ascending and non-empty; the group vectors then come out already
/// sorted because values are pushed in ascending order.
fn frequency_extremes(entries: &[(Reading, Count)]) -> (Vec<f64>, Count, Vec<f64>, Count) {
    let mut groups: FxHashMap<Count, Vec<f64>> = FxHashMap::default();
    let mut low = Count::MAX;
    let mut high = 0;
    for &(value, count) in entries {
        groups.entry(count).or_default().push(value.into_inner());
        low = low.min(count);
        high = high.max(count);
    }

    let low_values = groups.remove(&low).unwrap_or_default();
    let high_values = if high == low {
        // uniform distribution: both extremes are the same group
        low_values.clone()
    } else {
        groups.remove(&high).unwrap_or_default()
    };
    (low_values, low, high_values, high)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(f64, Count)]) -> FrequencyTable {
        let mut t = FrequencyTable::default();
        for &(value, count) in pairs {
            for _ in 0..count {
                t.increment(Reading::new(value).unwrap());
            }
        }
        t
    }

    #[test]
    fn test_uniform_distribution() {
        let m = compute_metrics(&table(&[(1.0, 1), (2.0, 1), (3.0, 1)])).unwrap();
        assert_eq!(m.average, 2.0);
        assert_eq!(m.median, 2.0);
        assert_eq!(m.min, 1.0);
        assert_eq!(m.max, 3.0);
        // low and high groups coincide when every value appears once
        assert_eq!(m.low_values, vec![1.0, 2.0, 3.0]);
        assert_eq!(m.low_count, 1);
        assert_eq!(m.high_values, vec![1.0, 2.0, 3.0]);
        assert_eq!(m.high_count, 1);
    }

    #[test]
    fn test_even_n_median() {
        let m = compute_metrics(&table(&[(1.0, 1), (2.0, 1)])).unwrap();
        assert_eq!(m.median, 1.5);
    }

    #[test]
    fn test_median_counts_duplicates_individually() {
        // expansion is [1, 1, 1, 9] so the median is (1 + 1) / 2
        let m = compute_metrics(&table(&[(1.0, 3), (9.0, 1)])).unwrap();
        assert_eq!(m.median, 1.0);
        // expansion is [1, 1, 8, 9, 9]
        let m = compute_metrics(&table(&[(1.0, 2), (8.0, 1), (9.0, 2)])).unwrap();
        assert_eq!(m.median, 8.0);
    }

    #[test]
    fn test_frequency_tie() {
        let m = compute_metrics(&table(&[(5.0, 3), (7.0, 3), (9.0, 1)])).unwrap();
        assert_eq!(m.high_values, vec![5.0, 7.0]);
        assert_eq!(m.high_count, 3);
        assert_eq!(m.low_values, vec![9.0]);
        assert_eq!(m.low_count, 1);
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(
            compute_metrics(&FrequencyTable::default()),
            Err(StatsError::EmptyInput)
        );
    }

    #[test]
    fn test_average_matches_weighted_sum() {
        let pairs = [(36.5, 4), (29.97, 2), (-3.25, 3)];
        let m = compute_metrics(&table(&pairs)).unwrap();
        let n: Count = pairs.iter().map(|&(_, c)| c).sum();
        let sum: f64 = pairs.iter().map(|&(v, c)| v * c as f64).sum();
        assert!((m.average * n as f64 - sum).abs() < 1e-9);
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let forward = table(&[(1.5, 2), (2.5, 1), (3.5, 4)]);
        let mut reverse = FrequencyTable::default();
        for &(value, count) in &[(3.5, 4), (2.5, 1), (1.5, 2)] {
            for _ in 0..count {
                reverse.increment(Reading::new(value).unwrap());
            }
        }
        assert_eq!(
            compute_metrics(&forward).unwrap(),
            compute_metrics(&reverse).unwrap()
        );
    }

    #[test]
    fn test_idempotent() {
        let t = table(&[(1.0, 2), (4.0, 5), (-2.0, 1)]);
        assert_eq!(compute_metrics(&t).unwrap(), compute_metrics(&t).unwrap());
    }

    #[test]
    fn test_min_max_bound_all_keys() {
        let t = table(&[(0.25, 1), (-17.0, 2), (99.5, 3), (4.0, 1)]);
        let m = compute_metrics(&t).unwrap();
        assert_eq!(m.min, -17.0);
        assert_eq!(m.max, 99.5);
        for (v, _) in t.sorted_entries() {
            assert!(m.min <= v.into_inner() && v.into_inner() <= m.max);
        }
    }

    #[test]
    fn test_single_value() {
        let m = compute_metrics(&table(&[(29.97, 7)])).unwrap();
        assert_eq!(m.average, 29.97);
        assert_eq!(m.median, 29.97);
        assert_eq!(m.min, 29.97);
        assert_eq!(m.max, 29.97);
        assert_eq!(m.low_values, vec![29.97]);
        assert_eq!(m.high_values, vec![29.97]);
        assert_eq!(m.low_count, 7);
        assert_eq!(m.high_count, 7);
    }
}
