//! Base-level aggregation: raw fact rows grouped by their full key.

use rayon::prelude::*;

use crate::cube::combine::{combine_group, finish_all, reduce_by_key};
use crate::domain::{AggregateRow, DimensionSet, FactRow, GroupKey, Metrics};
use crate::error::{CubeError, CubeResult};

/// One row per distinct full key, in no particular order.
pub fn aggregate_facts(dimensions: &DimensionSet, rows: &[FactRow]) -> CubeResult<Vec<AggregateRow>> {
    for row in rows {
        dimensions.check_key(&row.key)?;
        if !row.key.is_base() {
            return Err(CubeError::NotBaseKey {
                key: row.key.to_string(),
            });
        }
    }

    let contributions = rows
        .par_iter()
        .map(|row| (row.key.clone(), Metrics::from_fact(row)));
    let accumulators = reduce_by_key(contributions);
    log::info!(
        "base aggregation: {} fact rows -> {} keys",
        rows.len(),
        accumulators.len()
    );
    finish_all(accumulators)
}

/// Aggregate an explicit group of rows that all share `key`.
///
/// Fails with `EmptyGroup` when `rows` is empty.
pub fn aggregate_group(key: &GroupKey, rows: &[FactRow]) -> CubeResult<AggregateRow> {
    let contributions: Vec<Metrics> = rows.iter().map(Metrics::from_fact).collect();
    combine_group(key, &contributions)
}
