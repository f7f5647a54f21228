//! Command-line parsing for the cube rollup tool.
//!
//! The goal of this module is to keep **argument parsing** separate from
//! ingest and aggregation; `app` turns the parsed args into a `CubeConfig`.

use std::path::PathBuf;

use clap::Parser;

use crate::domain::{DimensionField, RowPolicy, TierConflict};

/// Top-level CLI.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "cube",
    version,
    about = "Grouping-set cube rollup over a fact file joined with a tier file"
)]
pub struct Cli {
    /// Fact file with `legal_entity`, `counter_party`, `rating`, `status`, `value`.
    #[arg(long, value_name = "CSV")]
    pub facts: PathBuf,

    /// Tier file with `counter_party`, `tier`.
    #[arg(long, value_name = "CSV")]
    pub tiers: PathBuf,

    /// Write cube rows here instead of stdout.
    #[arg(short, long, value_name = "CSV")]
    pub output: Option<PathBuf>,

    /// Export the run summary as JSON.
    #[arg(long = "summary-json", value_name = "JSON")]
    pub summary_json: Option<PathBuf>,

    /// Dimensions to roll up, in output column order.
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = DimensionField::DEFAULT_ORDER.to_vec()
    )]
    pub dimensions: Vec<DimensionField>,

    /// What to do with rows that fail validation.
    #[arg(long, value_enum, default_value_t = RowPolicy::Reject)]
    pub row_policy: RowPolicy,

    /// How to join a counter_party listed with several tiers.
    #[arg(long, value_enum, default_value_t = TierConflict::Reject)]
    pub tier_conflict: TierConflict,

    /// Field delimiter for input and output (single ASCII character, or `tab`).
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    pub delimiter: u8,

    /// Worker threads for aggregation (defaults to one per core).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Don't print the run summary.
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_delimiter(raw: &str) -> Result<u8, String> {
    match raw {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        s if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        s => Err(format!("delimiter must be one ASCII character, got '{s}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["cube", "--facts", "f.csv", "--tiers", "t.csv"]).unwrap();
        assert_eq!(cli.dimensions, DimensionField::DEFAULT_ORDER.to_vec());
        assert_eq!(cli.row_policy, RowPolicy::Reject);
        assert_eq!(cli.tier_conflict, TierConflict::Reject);
        assert_eq!(cli.delimiter, b',');
        assert!(cli.output.is_none());
    }

    #[test]
    fn parses_dimension_list_and_policies() {
        let cli = Cli::try_parse_from([
            "cube",
            "--facts",
            "f.csv",
            "--tiers",
            "t.csv",
            "--dimensions",
            "tier,legal_entity",
            "--row-policy",
            "skip",
            "--tier-conflict",
            "fan-out",
            "--delimiter",
            "tab",
        ])
        .unwrap();
        assert_eq!(
            cli.dimensions,
            vec![DimensionField::Tier, DimensionField::LegalEntity]
        );
        assert_eq!(cli.row_policy, RowPolicy::Skip);
        assert_eq!(cli.tier_conflict, TierConflict::FanOut);
        assert_eq!(cli.delimiter, b'\t');
    }

    #[test]
    fn rejects_multi_character_delimiter() {
        let res = Cli::try_parse_from([
            "cube", "--facts", "f", "--tiers", "t", "--delimiter", ";;",
        ]);
        assert!(res.is_err());
    }
}
