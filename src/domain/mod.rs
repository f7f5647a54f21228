//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - group keys and the run's ordered dimension list (`GroupKey`, `DimensionSet`)
//! - validated input rows (`FactRow`, `Status`)
//! - aggregated output rows (`AggregateRow`, `Metrics`, `MetricKind`)
//! - configuration (`CubeConfig`, `RowPolicy`, `TierConflict`)

pub mod types;

pub use types::*;
