//! Shared cube pipeline used by the binary and the integration tests.
//!
//! fact ingest + tier ingest -> inner join -> base aggregation ->
//! grouping-set expansion -> combine -> assemble

use crate::cube::{Cube, build_cube};
use crate::domain::{CubeConfig, DimensionSet};
use crate::error::AppError;
use crate::io::ingest::{RowError, load_facts, load_tiers};
use crate::io::join::{join_tiers, to_fact_rows};
use crate::report::{InputCounts, RunSummary};

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub cube: Cube,
    pub summary: RunSummary,
    /// Rows dropped under `RowPolicy::Skip`, facts first.
    pub row_errors: Vec<RowError>,
}

/// Execute the full pipeline; exports are left to the caller.
pub fn run_cube(config: &CubeConfig) -> Result<RunOutput, AppError> {
    // Validate the dimension list before touching any file.
    let dimensions = DimensionSet::from_fields(&config.dimensions)?;

    let facts = load_facts(&config.facts, config.delimiter, config.row_policy).map_err(|e| {
        with_path_context(e.into(), "facts", &config.facts)
    })?;
    let tiers = load_tiers(&config.tiers, config.delimiter, config.row_policy).map_err(|e| {
        with_path_context(e.into(), "tiers", &config.tiers)
    })?;

    let facts_read = facts.rows_read;
    let facts_skipped = facts.row_errors.len();
    let joined = join_tiers(facts.rows, &tiers.rows, config.tier_conflict)?;

    if joined.rows.is_empty() {
        return Err(AppError::new(
            3,
            "No rows remain after validation and the tier join.",
        ));
    }

    let fact_rows = to_fact_rows(&joined.rows, &config.dimensions);
    let cube = build_cube(&dimensions, &fact_rows)?;

    let inputs = InputCounts {
        facts_read,
        facts_skipped,
        tiers_read: tiers.rows_read,
        tiers_skipped: tiers.row_errors.len(),
        unmatched_facts: joined.unmatched,
        joined_rows: joined.rows.len(),
    };
    let summary = RunSummary::new(&cube, inputs, config.row_policy, config.tier_conflict);

    let mut row_errors = facts.row_errors;
    row_errors.extend(tiers.row_errors);

    Ok(RunOutput {
        cube,
        summary,
        row_errors,
    })
}

fn with_path_context(err: AppError, label: &str, path: &std::path::Path) -> AppError {
    AppError::new(
        err.exit_code(),
        format!("Failed to read {label} '{}': {err}", path.display()),
    )
}
