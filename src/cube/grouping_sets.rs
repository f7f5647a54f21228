//! Grouping-set enumeration.
//!
//! A grouping set is the list of dimension indices kept at full granularity;
//! every other dimension is rewritten to `Total`. For `n` dimensions the
//! subtotal sets are all combinations of size `1..n` (`2^n - 2` of them),
//! which leaves out both the base level (size `n`) and the grand total
//! (size `0`).

use crate::domain::{AggregateRow, DimensionSet, GroupKey, GroupValue, Metrics};
use crate::error::{CubeError, CubeResult};

/// All `k`-sized subsets of `0..n`, each in ascending index order, in
/// lexicographic order.
pub fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    if k > n {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.clone());

        // Find the rightmost position that can still move forward.
        let Some(pos) = (0..k).rev().find(|&i| idx[i] < n - k + i) else {
            return out;
        };
        idx[pos] += 1;
        for j in pos + 1..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

/// Retained-index subsets for every proper, non-empty subtotal level,
/// smallest subsets first.
///
/// Returns nothing for `n <= 1`: with a single dimension the only proper
/// subset is the empty one, which is the grand total.
pub fn subtotal_index_sets(n: usize) -> Vec<Vec<usize>> {
    if n <= 1 {
        return Vec::new();
    }
    (1..n).flat_map(|k| combinations(n, k)).collect()
}

/// One grouping level of the cube.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingSet {
    retained: Vec<usize>,
    mask: Vec<bool>,
}

impl GroupingSet {
    /// Checked constructor: `retained` must be strictly increasing and
    /// below `dimension_count`.
    pub fn try_new(dimension_count: usize, retained: Vec<usize>) -> CubeResult<Self> {
        if let Some(&i) = retained.iter().find(|&&i| i >= dimension_count) {
            return Err(CubeError::InvalidDimensions(format!(
                "retained index {i} is out of range for {dimension_count} dimensions"
            )));
        }
        if retained.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CubeError::InvalidDimensions(format!(
                "retained indices {retained:?} are not strictly increasing"
            )));
        }
        Ok(Self::new(dimension_count, retained))
    }

    pub(crate) fn new(dimension_count: usize, retained: Vec<usize>) -> Self {
        let mut mask = vec![false; dimension_count];
        for &i in &retained {
            mask[i] = true;
        }
        Self { retained, mask }
    }

    /// The level that keeps every dimension.
    pub fn base(dimension_count: usize) -> Self {
        Self::new(dimension_count, (0..dimension_count).collect())
    }

    pub fn retained(&self) -> &[usize] {
        &self.retained
    }

    /// `true` at every retained dimension position.
    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn is_base(&self) -> bool {
        self.retained.len() == self.mask.len()
    }

    pub fn collapsed_count(&self) -> usize {
        self.mask.len() - self.retained.len()
    }

    /// Keep retained positions, replace the rest with `Total`.
    pub fn rewrite(&self, key: &GroupKey) -> GroupKey {
        GroupKey::new(
            key.values()
                .iter()
                .zip(&self.mask)
                .map(|(value, &keep)| if keep { value.clone() } else { GroupValue::Total })
                .collect(),
        )
    }

    /// Human-readable label, e.g. `legal_entity,tier`.
    pub fn label(&self, dimensions: &DimensionSet) -> String {
        self.retained
            .iter()
            .map(|&i| dimensions.names()[i].as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Relabels base rows onto every subtotal grouping set.
///
/// This stage never combines metrics; it only produces
/// `(rewritten key, base contribution)` pairs for the combiner.
#[derive(Debug, Clone)]
pub struct GroupingSetExpander {
    dimension_count: usize,
    sets: Vec<GroupingSet>,
}

impl GroupingSetExpander {
    pub fn new(dimensions: &DimensionSet) -> Self {
        let n = dimensions.len();
        let sets = subtotal_index_sets(n)
            .into_iter()
            .map(|retained| GroupingSet::new(n, retained))
            .collect();
        Self {
            dimension_count: n,
            sets,
        }
    }

    /// Subtotal sets in canonical enumeration order.
    pub fn grouping_sets(&self) -> &[GroupingSet] {
        &self.sets
    }

    pub fn dimension_count(&self) -> usize {
        self.dimension_count
    }

    /// Rewritten keys for a single base key, one per grouping set.
    pub fn rewrite_all(&self, key: &GroupKey) -> Vec<GroupKey> {
        self.sets.iter().map(|set| set.rewrite(key)).collect()
    }

    /// Expand base rows into subtotal contributions.
    pub fn expand(&self, base: &[AggregateRow]) -> CubeResult<Vec<(GroupKey, Metrics)>> {
        let mut out = Vec::with_capacity(base.len() * self.sets.len());
        for row in base {
            if row.key.len() != self.dimension_count {
                return Err(CubeError::KeyArity {
                    key: row.key.to_string(),
                    expected: self.dimension_count,
                    actual: row.key.len(),
                });
            }
            for set in &self.sets {
                out.push((set.rewrite(&row.key), row.metrics));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn dims(n: usize) -> DimensionSet {
        DimensionSet::try_new((0..n).map(|i| format!("d{i}"))).unwrap()
    }

    #[test]
    fn combinations_are_lexicographic() {
        assert_eq!(
            combinations(4, 2),
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3],
            ]
        );
        assert_eq!(combinations(3, 0), vec![Vec::<usize>::new()]);
        assert_eq!(combinations(3, 3), vec![vec![0, 1, 2]]);
        assert!(combinations(2, 3).is_empty());
    }

    #[test]
    fn subtotal_sets_for_three_dimensions() {
        assert_eq!(
            subtotal_index_sets(3),
            vec![
                vec![0],
                vec![1],
                vec![2],
                vec![0, 1],
                vec![0, 2],
                vec![1, 2],
            ]
        );
    }

    #[test]
    fn subtotal_set_count_is_two_pow_n_minus_two() {
        for n in 2..=8 {
            let sets = subtotal_index_sets(n);
            assert_eq!(sets.len(), (1usize << n) - 2, "n={n}");
            let unique: HashSet<_> = sets.iter().collect();
            assert_eq!(unique.len(), sets.len());
        }
    }

    #[test]
    fn single_dimension_has_no_subtotals() {
        assert!(subtotal_index_sets(1).is_empty());
        assert!(subtotal_index_sets(0).is_empty());

        let expander = GroupingSetExpander::new(&dims(1));
        assert!(expander.grouping_sets().is_empty());
        let base = vec![AggregateRow {
            key: GroupKey::from_values(["A"]),
            metrics: Metrics::default(),
        }];
        assert!(expander.expand(&base).unwrap().is_empty());
    }

    #[test]
    fn rewrite_never_produces_base_or_grand_total() {
        let expander = GroupingSetExpander::new(&dims(4));
        let key = GroupKey::from_values(["a", "b", "c", "d"]);
        let rewritten = expander.rewrite_all(&key);
        assert_eq!(rewritten.len(), 14);
        let unique: HashSet<_> = rewritten.iter().collect();
        assert_eq!(unique.len(), 14);
        for k in &rewritten {
            assert!(!k.is_base());
            assert!(!k.is_grand_total());
        }
    }

    #[test]
    fn rewrite_keeps_retained_positions() {
        let set = GroupingSet::new(3, vec![0, 2]);
        let key = GroupKey::from_values(["A", "X", "T1"]);
        assert_eq!(set.rewrite(&key).to_string(), "(A, Total, T1)");
        assert_eq!(set.collapsed_count(), 1);
        assert_eq!(set.label(&dims(3)), "d0,d2");
    }

    #[test]
    fn checked_constructor_validates_indices() {
        assert_eq!(
            GroupingSet::try_new(3, vec![0, 2]).unwrap(),
            GroupingSet::new(3, vec![0, 2])
        );
        assert!(matches!(
            GroupingSet::try_new(3, vec![0, 3]),
            Err(CubeError::InvalidDimensions(_))
        ));
        assert!(GroupingSet::try_new(3, vec![2, 1]).is_err());
        assert!(GroupingSet::try_new(3, vec![1, 1]).is_err());
    }

    #[test]
    fn expand_rejects_wrong_arity() {
        let expander = GroupingSetExpander::new(&dims(3));
        let base = vec![AggregateRow {
            key: GroupKey::from_values(["A", "X"]),
            metrics: Metrics::default(),
        }];
        assert!(expander.expand(&base).is_err());
    }
}
