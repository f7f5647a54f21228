//! Cube construction.
//!
//! Responsibilities:
//!
//! - aggregate fact rows per full key (`base`)
//! - enumerate subtotal grouping sets and relabel base rows (`grouping_sets`)
//! - re-aggregate base rows per key with associative metric ops (`combine`)
//! - order the result into levels (`assemble`)

pub mod assemble;
pub mod base;
pub mod combine;
pub mod grouping_sets;

pub use assemble::*;
pub use base::*;
pub use combine::*;
pub use grouping_sets::*;

use crate::domain::{DimensionSet, FactRow, MetricKind};
use crate::error::CubeResult;

/// Build the full cube from validated fact rows.
///
/// Subtotals are derived from base rows only; fact rows are read once.
pub fn build_cube(dimensions: &DimensionSet, facts: &[FactRow]) -> CubeResult<Cube> {
    for kind in MetricKind::ALL {
        log::debug!("{} combines with {}", kind.column_name(), kind.combine_op().name());
    }
    let base = aggregate_facts(dimensions, facts)?;

    let expander = GroupingSetExpander::new(dimensions);
    log::info!(
        "{} dimensions -> {} subtotal grouping sets",
        dimensions.len(),
        expander.grouping_sets().len()
    );

    let subtotals = expander.expand(&base)?;
    let combined = combine_levels(&base, subtotals)?;
    assemble(dimensions, &expander, combined)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::domain::{AggregateRow, GroupKey, GroupValue, Metrics, Status};

    fn fact(values: &[&str], rating: i64, status: &str, value: i64) -> FactRow {
        FactRow {
            key: GroupKey::from_values(values.iter().copied()),
            rating,
            value,
            status: Status::parse(status),
        }
    }

    fn three_dims() -> DimensionSet {
        DimensionSet::try_new(["legal_entity", "counter_party", "tier"]).unwrap()
    }

    fn sample_facts() -> Vec<FactRow> {
        vec![
            fact(&["A", "X", "T1"], 5, "ARAP", 100),
            fact(&["A", "X", "T1"], 7, "ACCR", 50),
            fact(&["A", "Y", "T1"], 9, "ARAP", 20),
            fact(&["A", "Z", "T2"], 3, "ACCR", 30),
            fact(&["B", "X", "T1"], 1, "ARAP", -5),
            fact(&["B", "W", "T3"], 4, "OPEN", 999),
        ]
    }

    fn find<'a>(cube: &'a Cube, key: &[Option<&str>]) -> &'a AggregateRow {
        let key = GroupKey::new(
            key.iter()
                .map(|v| match v {
                    Some(s) => GroupValue::Value(s.to_string()),
                    None => GroupValue::Total,
                })
                .collect(),
        );
        cube.rows()
            .find(|r| r.key == key)
            .unwrap_or_else(|| panic!("missing row {key}"))
    }

    #[test]
    fn worked_example_from_two_facts() {
        let facts = vec![
            fact(&["A", "X", "T1"], 5, "ARAP", 100),
            fact(&["A", "X", "T1"], 7, "ACCR", 50),
        ];
        let cube = build_cube(&three_dims(), &facts).unwrap();

        let base = find(&cube, &[Some("A"), Some("X"), Some("T1")]);
        assert_eq!(
            base.metrics,
            Metrics {
                max_rating: 7,
                arap_total_value: 100,
                accr_total_value: 50,
            }
        );
        // One base row, six subtotal rows, no grand total.
        assert_eq!(cube.row_count(), 7);
    }

    #[test]
    fn subtotal_covers_the_wider_set() {
        let cube = build_cube(&three_dims(), &sample_facts()).unwrap();

        // (A, Total, T1): counter_party collapsed; X and Y roll in, Z (T2) does not.
        let row = find(&cube, &[Some("A"), None, Some("T1")]);
        assert_eq!(row.metrics.max_rating, 9);
        assert_eq!(row.metrics.arap_total_value, 120);
        assert_eq!(row.metrics.accr_total_value, 50);

        // (Total, X, Total): both legal entities trading with X.
        let row = find(&cube, &[None, Some("X"), None]);
        assert_eq!(row.metrics.max_rating, 7);
        assert_eq!(row.metrics.arap_total_value, 95);
        assert_eq!(row.metrics.accr_total_value, 50);

        // Unknown status rolls into max_rating only.
        let row = find(&cube, &[Some("B"), None, None]);
        assert_eq!(row.metrics.max_rating, 4);
        assert_eq!(row.metrics.arap_total_value, -5);
        assert_eq!(row.metrics.accr_total_value, 0);
    }

    #[test]
    fn rollup_identity_holds_for_every_subtotal_row() {
        let cube = build_cube(&three_dims(), &sample_facts()).unwrap();
        let base = &cube.base().rows;

        for level in &cube.levels()[1..] {
            for row in &level.rows {
                let matching: Vec<&AggregateRow> = base
                    .iter()
                    .filter(|b| {
                        row.key
                            .values()
                            .iter()
                            .zip(b.key.values())
                            .all(|(s, v)| s.is_total() || s == v)
                    })
                    .collect();
                assert!(!matching.is_empty());
                let max = matching.iter().map(|b| b.metrics.max_rating).max().unwrap();
                let arap: i64 = matching.iter().map(|b| b.metrics.arap_total_value).sum();
                let accr: i64 = matching.iter().map(|b| b.metrics.accr_total_value).sum();
                assert_eq!(row.metrics.max_rating, max, "{}", row.key);
                assert_eq!(row.metrics.arap_total_value, arap, "{}", row.key);
                assert_eq!(row.metrics.accr_total_value, accr, "{}", row.key);
            }
        }
    }

    #[test]
    fn no_grand_total_and_no_key_collisions() {
        let cube = build_cube(&three_dims(), &sample_facts()).unwrap();
        let mut seen = HashSet::new();
        for row in cube.rows() {
            assert!(!row.key.is_grand_total());
            assert!(seen.insert(row.key.clone()), "duplicate {}", row.key);
        }
        assert_eq!(cube.levels().len(), 7);
    }

    #[test]
    fn single_dimension_cube_is_base_only() {
        let dims = DimensionSet::try_new(["legal_entity"]).unwrap();
        let facts = vec![fact(&["A"], 1, "ARAP", 10), fact(&["B"], 2, "ACCR", 3)];
        let cube = build_cube(&dims, &facts).unwrap();
        assert_eq!(cube.levels().len(), 1);
        assert_eq!(cube.row_count(), 2);
    }

    #[test]
    fn four_dimensions_produce_fourteen_subtotal_levels() {
        let dims = DimensionSet::try_new(["a", "b", "c", "d"]).unwrap();
        let facts = vec![fact(&["1", "2", "3", "4"], 1, "ARAP", 1)];
        let cube = build_cube(&dims, &facts).unwrap();
        assert_eq!(cube.levels().len(), 15);
        assert_eq!(cube.row_count(), 15);
    }

    #[test]
    fn output_order_is_stable_across_thread_counts() {
        let facts = sample_facts();
        let keys = |threads: usize| -> Vec<String> {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap();
            pool.install(|| build_cube(&three_dims(), &facts))
                .unwrap()
                .rows()
                .map(|r| r.key.to_string())
                .collect()
        };
        assert_eq!(keys(1), keys(4));
    }

    #[test]
    fn large_totals_are_the_same_at_every_thread_count() {
        // Partial sums over the subtotal exceed i64 in some orders only.
        let facts = vec![
            fact(&["A", "X", "T1"], 1, "ARAP", i64::MAX),
            fact(&["A", "Y", "T1"], 1, "ARAP", 5),
            fact(&["A", "Z", "T1"], 1, "ARAP", -5),
        ];
        let totals = |threads: usize| -> i64 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap();
            let cube = pool.install(|| build_cube(&three_dims(), &facts)).unwrap();
            find(&cube, &[Some("A"), None, Some("T1")]).metrics.arap_total_value
        };
        assert_eq!(totals(1), i64::MAX);
        assert_eq!(totals(4), i64::MAX);
    }
}
