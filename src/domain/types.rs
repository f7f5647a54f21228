//! Shared domain types.
//!
//! These types are the fixed-shape records that flow between the pipeline
//! stages:
//!
//! - group keys and the dimension list they are ordered by
//! - raw fact rows (validated once at ingest)
//! - aggregated rows carrying the three metrics
//! - run configuration enums

use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{CubeError, CubeResult};

/// Literal written in place of a collapsed dimension.
pub const TOTAL: &str = "Total";

/// One position of a group key.
///
/// `Total` sorts after every actual value so collapsed positions never
/// interleave with real categories when a level is ordered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupValue {
    Value(String),
    Total,
}

impl GroupValue {
    pub fn as_str(&self) -> &str {
        match self {
            GroupValue::Value(v) => v,
            GroupValue::Total => TOTAL,
        }
    }

    pub fn is_total(&self) -> bool {
        matches!(self, GroupValue::Total)
    }
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered tuple of values, one per dimension, in dimension-list order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey(Vec<GroupValue>);

impl GroupKey {
    pub fn new(values: Vec<GroupValue>) -> Self {
        Self(values)
    }

    /// Build a base-level key from actual category values.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(values.into_iter().map(|v| GroupValue::Value(v.into())).collect())
    }

    pub fn values(&self) -> &[GroupValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// No dimension collapsed.
    pub fn is_base(&self) -> bool {
        self.0.iter().all(|v| !v.is_total())
    }

    /// Every dimension collapsed.
    pub fn is_grand_total(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(GroupValue::is_total)
    }

    pub fn collapsed_count(&self) -> usize {
        self.0.iter().filter(|v| v.is_total()).count()
    }

    /// `true` at every retained position.
    pub fn retained_mask(&self) -> Vec<bool> {
        self.0.iter().map(|v| !v.is_total()).collect()
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (idx, value) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str(")")
    }
}

/// The ordered dimension list for a run.
///
/// Immutable once built; every stage takes it by reference so the
/// position of a dimension never depends on input column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DimensionSet {
    names: Vec<String>,
}

impl DimensionSet {
    pub fn try_new<I, S>(names: I) -> CubeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(CubeError::InvalidDimensions(
                "at least one dimension is required".to_string(),
            ));
        }
        for (idx, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(CubeError::InvalidDimensions(format!(
                    "dimension #{} has an empty name",
                    idx + 1
                )));
            }
            if names[..idx].contains(name) {
                return Err(CubeError::InvalidDimensions(format!(
                    "dimension `{name}` is listed more than once"
                )));
            }
        }
        Ok(Self { names })
    }

    pub fn from_fields(fields: &[DimensionField]) -> CubeResult<Self> {
        Self::try_new(fields.iter().map(|f| f.column_name()))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Reject keys that don't have exactly one value per dimension.
    pub fn check_key(&self, key: &GroupKey) -> CubeResult<()> {
        if key.len() != self.names.len() {
            return Err(CubeError::KeyArity {
                key: key.to_string(),
                expected: self.names.len(),
                actual: key.len(),
            });
        }
        Ok(())
    }
}

/// Fact-row status. Anything other than `ARAP` / `ACCR` is kept verbatim
/// and contributes to neither value total.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    Arap,
    Accr,
    Other(String),
}

impl Status {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "ARAP" => Status::Arap,
            "ACCR" => Status::Accr,
            other => Status::Other(other.to_string()),
        }
    }
}

/// A validated, joined input record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactRow {
    pub key: GroupKey,
    pub rating: i64,
    pub value: i64,
    pub status: Status,
}

/// The three cube metrics, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    MaxRating,
    ArapTotalValue,
    AccrTotalValue,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [
        MetricKind::MaxRating,
        MetricKind::ArapTotalValue,
        MetricKind::AccrTotalValue,
    ];

    pub fn column_name(self) -> &'static str {
        match self {
            MetricKind::MaxRating => "max_rating",
            MetricKind::ArapTotalValue => "ARAP_total_value",
            MetricKind::AccrTotalValue => "ACCR_total_value",
        }
    }
}

/// Metric values for one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Metrics {
    pub max_rating: i64,
    pub arap_total_value: i64,
    pub accr_total_value: i64,
}

impl Metrics {
    /// Contribution of a single fact row. The status filter is applied
    /// here, once; later stages only see already-filtered totals.
    pub fn from_fact(row: &FactRow) -> Self {
        let (arap, accr) = match row.status {
            Status::Arap => (row.value, 0),
            Status::Accr => (0, row.value),
            Status::Other(_) => (0, 0),
        };
        Self {
            max_rating: row.rating,
            arap_total_value: arap,
            accr_total_value: accr,
        }
    }

    pub fn get(&self, kind: MetricKind) -> i64 {
        match kind {
            MetricKind::MaxRating => self.max_rating,
            MetricKind::ArapTotalValue => self.arap_total_value,
            MetricKind::AccrTotalValue => self.accr_total_value,
        }
    }

    pub fn set(&mut self, kind: MetricKind, value: i64) {
        match kind {
            MetricKind::MaxRating => self.max_rating = value,
            MetricKind::ArapTotalValue => self.arap_total_value = value,
            MetricKind::AccrTotalValue => self.accr_total_value = value,
        }
    }
}

/// A group key plus its combined metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateRow {
    pub key: GroupKey,
    pub metrics: Metrics,
}

/// Input columns that may serve as a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum DimensionField {
    LegalEntity,
    CounterParty,
    Tier,
}

impl DimensionField {
    pub const DEFAULT_ORDER: [DimensionField; 3] = [
        DimensionField::LegalEntity,
        DimensionField::CounterParty,
        DimensionField::Tier,
    ];

    pub fn column_name(self) -> &'static str {
        match self {
            DimensionField::LegalEntity => "legal_entity",
            DimensionField::CounterParty => "counter_party",
            DimensionField::Tier => "tier",
        }
    }
}

/// What to do with an input row that fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RowPolicy {
    /// Fail the whole run at the first bad row.
    #[default]
    Reject,
    /// Drop the row, log it, and keep going.
    Skip,
}

/// How to join a counter_party that appears with more than one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TierConflict {
    /// Fail the run.
    #[default]
    Reject,
    /// Keep the first tier seen in the tier file.
    First,
    /// Emit one joined row per tier.
    FanOut,
}

/// Resolved run configuration.
#[derive(Debug, Clone)]
pub struct CubeConfig {
    pub facts: PathBuf,
    pub tiers: PathBuf,
    pub output: Option<PathBuf>,
    pub summary_json: Option<PathBuf>,
    pub dimensions: Vec<DimensionField>,
    pub row_policy: RowPolicy,
    pub tier_conflict: TierConflict,
    pub delimiter: u8,
    pub threads: Option<usize>,
    pub quiet: bool,
}

impl Default for CubeConfig {
    fn default() -> Self {
        Self {
            facts: PathBuf::from("dataset1.csv"),
            tiers: PathBuf::from("dataset2.csv"),
            output: None,
            summary_json: None,
            dimensions: DimensionField::DEFAULT_ORDER.to_vec(),
            row_policy: RowPolicy::default(),
            tier_conflict: TierConflict::default(),
            delimiter: b',',
            threads: None,
            quiet: false,
        }
    }
}
