use ordered_float::NotNan;
use rustc_hash::FxHashMap;

/// A single numeric observation. `NotNan` keeps the key type totally ordered
/// and hashable, so NaN can never reach a table in the first place.
pub type Reading = NotNan<f64>;
pub type Count = u64;

/// Observation counts per distinct reading value, filled during the single
/// ingest pass and read-only afterwards.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FrequencyTable {
    counts: FxHashMap<Reading, Count>,
}

impl FrequencyTable {
    /// Records one more observation of `value`.
    #[inline]
    pub fn increment(&mut self, value: Reading) {
        *self.counts.entry(value).or_insert(0) += 1;
    }

    /// Folds another table in by summing counts per key. Summation is
    /// associative and commutative, so per-worker tables can be merged in
    /// any order.
    pub fn merge(&mut self, other: FrequencyTable) {
        for (value, count) in other.counts {
            *self.counts.entry(value).or_insert(0) += count;
        }
    }

    /// Number of distinct reading values.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total observation count, i.e. the size of the expanded multiset.
    pub fn total(&self) -> Count {
        self.counts.values().sum()
    }

    /// Entries sorted ascending by reading value.
    pub fn sorted_entries(&self) -> Vec<(Reading, Count)> {
        let mut entries: Vec<_> = self.counts.iter().map(|(&v, &c)| (v, c)).collect();
        entries.sort_unstable_by_key(|&(v, _)| v);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(v: f64) -> Reading {
        Reading::new(v).unwrap()
    }

    #[test]
    fn test_increment() {
        let mut table = FrequencyTable::default();
        assert!(table.is_empty());

        table.increment(r(36.5));
        table.increment(r(36.5));
        table.increment(r(29.97));

        assert_eq!(table.len(), 2);
        assert_eq!(table.total(), 3);
        assert_eq!(
            table.sorted_entries(),
            vec![(r(29.97), 1), (r(36.5), 2)]
        );
    }

    #[test]
    fn test_merge_sums_counts() {
        let mut a = FrequencyTable::default();
        a.increment(r(1.0));
        a.increment(r(2.0));
        a.increment(r(2.0));

        let mut b = FrequencyTable::default();
        b.increment(r(2.0));
        b.increment(r(3.0));

        a.merge(b);
        assert_eq!(
            a.sorted_entries(),
            vec![(r(1.0), 1), (r(2.0), 3), (r(3.0), 1)]
        );
        assert_eq!(a.total(), 5);
    }

    #[test]
    fn test_merge_is_commutative() {
        let mut a = FrequencyTable::default();
        a.increment(r(4.4));
        a.increment(r(-57.8));

        let mut b = FrequencyTable::default();
        b.increment(r(4.4));
        b.increment(r(5.2));

        let mut ab = a.clone();
        ab.merge(b.clone());
        let mut ba = b;
        ba.merge(a);
        assert_eq!(ab, ba);
    }
}
