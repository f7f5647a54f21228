//! Run summary: what went in, what came out.
//!
//! The same `RunSummary` is printed to the terminal and, optionally,
//! exported as JSON.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::cube::Cube;
use crate::domain::{RowPolicy, TierConflict};

#[derive(Debug, Clone, Serialize)]
pub struct InputCounts {
    pub facts_read: usize,
    pub facts_skipped: usize,
    pub tiers_read: usize,
    pub tiers_skipped: usize,
    pub unmatched_facts: usize,
    pub joined_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelSummary {
    /// Retained dimensions, comma separated.
    pub grouping: String,
    pub collapsed: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub tool: String,
    pub generated_at: DateTime<Local>,
    pub dimensions: Vec<String>,
    pub row_policy: RowPolicy,
    pub tier_conflict: TierConflict,
    pub inputs: InputCounts,
    pub levels: Vec<LevelSummary>,
    pub total_rows: usize,
}

impl RunSummary {
    pub fn new(
        cube: &Cube,
        inputs: InputCounts,
        row_policy: RowPolicy,
        tier_conflict: TierConflict,
    ) -> Self {
        let levels = cube
            .levels()
            .iter()
            .map(|level| LevelSummary {
                grouping: level.grouping.label(cube.dimensions()),
                collapsed: level.grouping.collapsed_count(),
                rows: level.rows.len(),
            })
            .collect();

        Self {
            tool: "cube".to_string(),
            generated_at: Local::now(),
            dimensions: cube.dimensions().names().to_vec(),
            row_policy,
            tier_conflict,
            inputs,
            levels,
            total_rows: cube.row_count(),
        }
    }
}

/// Plain-text summary for the terminal.
pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    let inputs = &summary.inputs;

    out.push_str("=== cube - grouping-set rollup ===\n");
    out.push_str(&format!("Dimensions: {}\n", summary.dimensions.join(", ")));
    out.push_str(&format!(
        "Facts: {} read, {} skipped, {} without tier\n",
        inputs.facts_read, inputs.facts_skipped, inputs.unmatched_facts
    ));
    out.push_str(&format!(
        "Tiers: {} read, {} skipped\n",
        inputs.tiers_read, inputs.tiers_skipped
    ));
    out.push_str(&format!("Joined rows: {}\n", inputs.joined_rows));
    out.push_str("\nLevels:\n");

    let width = summary
        .levels
        .iter()
        .map(|l| l.grouping.len())
        .max()
        .unwrap_or(0);
    for level in &summary.levels {
        out.push_str(&format!(
            "  {:<width$}  collapsed={}  rows={}\n",
            level.grouping, level.collapsed, level.rows
        ));
    }
    out.push_str(&format!("Total rows: {}", summary.total_rows));
    out
}
