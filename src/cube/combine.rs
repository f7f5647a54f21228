//! Metric combination.
//!
//! Each metric has a named associative, commutative binary operation. The
//! same keyed reduction serves both stages of the cube:
//!
//! - fact contributions -> base rows
//! - base rows (identity + relabelled) -> every level
//!
//! Because `max` of maxes and `sum` of sums equal the metric over the whole
//! set, the reduction can run per worker and merge in any order.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use rayon::prelude::*;

use crate::domain::{AggregateRow, GroupKey, MetricKind, Metrics};
use crate::error::{CubeError, CubeResult};

/// Associative combine function for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineOp {
    Max,
    Sum,
}

impl CombineOp {
    pub fn name(self) -> &'static str {
        match self {
            CombineOp::Max => "max",
            CombineOp::Sum => "sum",
        }
    }

    /// Operates on the widened running value. An i128 sum of i64 inputs
    /// cannot saturate before 2^64 contributions.
    pub fn apply(self, a: i128, b: i128) -> i128 {
        match self {
            CombineOp::Max => a.max(b),
            CombineOp::Sum => a.saturating_add(b),
        }
    }
}

impl MetricKind {
    pub fn combine_op(self) -> CombineOp {
        match self {
            MetricKind::MaxRating => CombineOp::Max,
            MetricKind::ArapTotalValue | MetricKind::AccrTotalValue => CombineOp::Sum,
        }
    }

    fn slot(self) -> usize {
        match self {
            MetricKind::MaxRating => 0,
            MetricKind::ArapTotalValue => 1,
            MetricKind::AccrTotalValue => 2,
        }
    }
}

/// Running metrics in i128, so intermediate sums never overflow and the
/// result does not depend on combination order. Narrowed back to i64 once,
/// when the group is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialMetrics {
    values: [i128; 3],
}

impl PartialMetrics {
    pub fn combine(&self, other: &PartialMetrics) -> PartialMetrics {
        let mut out = *self;
        for kind in MetricKind::ALL {
            let i = kind.slot();
            out.values[i] = kind.combine_op().apply(self.values[i], other.values[i]);
        }
        out
    }

    /// Narrow to i64. On overflow returns the offending metric.
    pub fn narrow(&self) -> Result<Metrics, MetricKind> {
        let mut out = Metrics::default();
        for kind in MetricKind::ALL {
            let v = i64::try_from(self.values[kind.slot()]).map_err(|_| kind)?;
            out.set(kind, v);
        }
        Ok(out)
    }
}

impl From<Metrics> for PartialMetrics {
    fn from(m: Metrics) -> Self {
        let mut values = [0i128; 3];
        for kind in MetricKind::ALL {
            values[kind.slot()] = i128::from(m.get(kind));
        }
        Self { values }
    }
}

impl Metrics {
    /// Combine metric by metric. On overflow returns the offending metric.
    pub fn combine(&self, other: &Metrics) -> Result<Metrics, MetricKind> {
        PartialMetrics::from(*self)
            .combine(&PartialMetrics::from(*other))
            .narrow()
    }
}

/// Running state for one key.
///
/// Starts empty; finishing an accumulator that never received a
/// contribution is an internal error, never a zero row.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    contributions: usize,
    partial: Option<PartialMetrics>,
}

impl Accumulator {
    pub fn push(&mut self, m: Metrics) {
        self.absorb(PartialMetrics::from(m));
        self.contributions += 1;
    }

    pub fn merge(&mut self, other: Accumulator) {
        if let Some(p) = other.partial {
            self.absorb(p);
        }
        self.contributions += other.contributions;
    }

    fn absorb(&mut self, p: PartialMetrics) {
        self.partial = Some(match &self.partial {
            Some(current) => current.combine(&p),
            None => p,
        });
    }

    pub fn contributions(&self) -> usize {
        self.contributions
    }

    /// Fails with `EmptyGroup` when nothing was pushed, `Overflow` when a
    /// total does not fit in i64.
    pub fn finish(&self, key: &GroupKey) -> CubeResult<Metrics> {
        let partial = self.partial.ok_or_else(|| CubeError::EmptyGroup {
            key: key.to_string(),
        })?;
        partial.narrow().map_err(|metric| CubeError::Overflow {
            metric: metric.column_name(),
            key: key.to_string(),
        })
    }
}

pub type KeyedAccumulators = HashMap<GroupKey, Accumulator>;

/// Parallel keyed reduction: each rayon worker folds into its own map,
/// then the maps are merged pairwise.
pub fn reduce_by_key<I>(contributions: I) -> KeyedAccumulators
where
    I: IntoParallelIterator<Item = (GroupKey, Metrics)>,
{
    contributions
        .into_par_iter()
        .fold(KeyedAccumulators::new, |mut map, (key, m)| {
            map.entry(key).or_default().push(m);
            map
        })
        .reduce(KeyedAccumulators::new, |mut left, right| {
            for (key, acc) in right {
                match left.entry(key) {
                    Entry::Occupied(mut slot) => slot.get_mut().merge(acc),
                    Entry::Vacant(slot) => {
                        slot.insert(acc);
                    }
                }
            }
            left
        })
}

/// Turn finished accumulators into rows (unordered).
pub fn finish_all(accumulators: KeyedAccumulators) -> CubeResult<Vec<AggregateRow>> {
    accumulators
        .into_iter()
        .map(|(key, acc)| {
            let metrics = acc.finish(&key)?;
            Ok(AggregateRow { key, metrics })
        })
        .collect()
}

/// Combine every contribution for a single key, in order.
///
/// Fails with `EmptyGroup` when `contributions` is empty.
pub fn combine_group(key: &GroupKey, contributions: &[Metrics]) -> CubeResult<AggregateRow> {
    let mut acc = Accumulator::default();
    for m in contributions {
        acc.push(*m);
    }
    Ok(AggregateRow {
        key: key.clone(),
        metrics: acc.finish(key)?,
    })
}

/// Re-aggregate already-aggregated rows under the keys they map to.
///
/// `base` passes through under its own key; `subtotals` carries the
/// relabelled contributions from the expander.
pub fn combine_levels(
    base: &[AggregateRow],
    subtotals: Vec<(GroupKey, Metrics)>,
) -> CubeResult<Vec<AggregateRow>> {
    let identity = base.par_iter().map(|row| (row.key.clone(), row.metrics));
    let accumulators = reduce_by_key(identity.chain(subtotals.into_par_iter()));
    log::debug!("combined {} keys across all levels", accumulators.len());
    finish_all(accumulators)
}
