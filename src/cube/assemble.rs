//! Cube assembly: split combined rows into levels and order them.
//!
//! Output order is deterministic for a given input regardless of thread
//! count:
//!
//! 1. base level
//! 2. subtotal levels by increasing number of collapsed dimensions, ties
//!    broken by grouping-set enumeration order
//! 3. rows within a level by key

use std::collections::HashMap;

use crate::cube::grouping_sets::{GroupingSet, GroupingSetExpander};
use crate::domain::{AggregateRow, DimensionSet};
use crate::error::{CubeError, CubeResult};

/// All rows of one grouping set.
#[derive(Debug, Clone)]
pub struct CubeLevel {
    pub grouping: GroupingSet,
    pub rows: Vec<AggregateRow>,
}

/// The assembled cube: every level, in output order.
#[derive(Debug, Clone)]
pub struct Cube {
    dimensions: DimensionSet,
    levels: Vec<CubeLevel>,
}

impl Cube {
    pub fn dimensions(&self) -> &DimensionSet {
        &self.dimensions
    }

    pub fn levels(&self) -> &[CubeLevel] {
        &self.levels
    }

    pub fn base(&self) -> &CubeLevel {
        &self.levels[0]
    }

    /// Every row, level after level.
    pub fn rows(&self) -> impl Iterator<Item = &AggregateRow> {
        self.levels.iter().flat_map(|level| level.rows.iter())
    }

    pub fn row_count(&self) -> usize {
        self.levels.iter().map(|level| level.rows.len()).sum()
    }
}

/// Level order: base, then subtotal sets by collapsed count (stable, so
/// enumeration order is kept within a count).
fn ordered_levels(expander: &GroupingSetExpander) -> Vec<GroupingSet> {
    let mut subtotals = expander.grouping_sets().to_vec();
    subtotals.sort_by_key(GroupingSet::collapsed_count);

    let mut levels = Vec::with_capacity(subtotals.len() + 1);
    levels.push(GroupingSet::base(expander.dimension_count()));
    levels.extend(subtotals);
    levels
}

pub fn assemble(
    dimensions: &DimensionSet,
    expander: &GroupingSetExpander,
    combined: Vec<AggregateRow>,
) -> CubeResult<Cube> {
    let mut levels: Vec<CubeLevel> = ordered_levels(expander)
        .into_iter()
        .map(|grouping| CubeLevel {
            grouping,
            rows: Vec::new(),
        })
        .collect();

    let by_mask: HashMap<Vec<bool>, usize> = levels
        .iter()
        .enumerate()
        .map(|(idx, level)| (level.grouping.mask().to_vec(), idx))
        .collect();

    for row in combined {
        dimensions.check_key(&row.key)?;
        if row.key.is_grand_total() {
            return Err(CubeError::GrandTotal {
                key: row.key.to_string(),
            });
        }
        let Some(&idx) = by_mask.get(&row.key.retained_mask()) else {
            return Err(CubeError::UnknownLevel {
                key: row.key.to_string(),
            });
        };
        levels[idx].rows.push(row);
    }

    for level in &mut levels {
        level.rows.sort_by(|a, b| a.key.cmp(&b.key));
        log::debug!(
            "level [{}]: {} rows",
            level.grouping.label(dimensions),
            level.rows.len()
        );
    }

    Ok(Cube {
        dimensions: dimensions.clone(),
        levels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GroupKey, GroupValue, Metrics};

    fn dims() -> DimensionSet {
        DimensionSet::try_new(["a", "b", "c"]).unwrap()
    }

    fn row(values: [Option<&str>; 3]) -> AggregateRow {
        AggregateRow {
            key: GroupKey::new(
                values
                    .iter()
                    .map(|v| match v {
                        Some(s) => GroupValue::Value(s.to_string()),
                        None => GroupValue::Total,
                    })
                    .collect(),
            ),
            metrics: Metrics::default(),
        }
    }

    #[test]
    fn levels_are_ordered_by_collapsed_count() {
        let expander = GroupingSetExpander::new(&dims());
        let retained: Vec<Vec<usize>> = ordered_levels(&expander)
            .iter()
            .map(|g| g.retained().to_vec())
            .collect();
        assert_eq!(
            retained,
            vec![
                vec![0, 1, 2],
                vec![0, 1],
                vec![0, 2],
                vec![1, 2],
                vec![0],
                vec![1],
                vec![2],
            ]
        );
    }

    #[test]
    fn rows_are_routed_and_sorted() {
        let expander = GroupingSetExpander::new(&dims());
        let combined = vec![
            row([None, None, Some("t")]),
            row([Some("B"), Some("x"), Some("t")]),
            row([Some("A"), None, Some("t")]),
            row([Some("A"), Some("x"), Some("t")]),
        ];
        let cube = assemble(&dims(), &expander, combined).unwrap();

        assert_eq!(cube.levels().len(), 7);
        assert_eq!(cube.row_count(), 4);
        let keys: Vec<String> = cube.rows().map(|r| r.key.to_string()).collect();
        assert_eq!(
            keys,
            vec!["(A, x, t)", "(B, x, t)", "(A, Total, t)", "(Total, Total, t)"]
        );
        assert_eq!(cube.base().rows.len(), 2);
    }

    #[test]
    fn grand_total_is_rejected() {
        let expander = GroupingSetExpander::new(&dims());
        let err = assemble(&dims(), &expander, vec![row([None, None, None])]).unwrap_err();
        assert!(matches!(err, CubeError::GrandTotal { .. }));
    }
}
