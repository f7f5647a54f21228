//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - sets up logging
//! - parses CLI arguments
//! - runs ingest -> join -> cube on a rayon pool
//! - prints the run summary
//! - writes the cube and optional summary exports

use clap::Parser;

use crate::cli::Cli;
use crate::domain::CubeConfig;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `cube` binary.
pub fn run() -> Result<(), AppError> {
    // A local `.env` may set RUST_LOG.
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cube_config_from_args(&cli);
    let run = run_on_pool(&config)?;

    crate::io::export::write_cube(config.output.as_deref(), &run.cube, config.delimiter)?;
    if let Some(path) = &config.summary_json {
        crate::io::export::write_summary_json(path, &run.summary)?;
    }

    if !config.quiet {
        let text = crate::report::format_run_summary(&run.summary);
        // Keep stdout clean when it carries the cube itself.
        if config.output.is_some() {
            println!("{text}");
        } else {
            eprintln!("{text}");
        }
    }

    Ok(())
}

pub fn cube_config_from_args(cli: &Cli) -> CubeConfig {
    CubeConfig {
        facts: cli.facts.clone(),
        tiers: cli.tiers.clone(),
        output: cli.output.clone(),
        summary_json: cli.summary_json.clone(),
        dimensions: cli.dimensions.clone(),
        row_policy: cli.row_policy,
        tier_conflict: cli.tier_conflict,
        delimiter: cli.delimiter,
        threads: cli.threads,
        quiet: cli.quiet,
    }
}

fn run_on_pool(config: &CubeConfig) -> Result<pipeline::RunOutput, AppError> {
    let Some(threads) = config.threads else {
        return pipeline::run_cube(config);
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| AppError::new(2, format!("Failed to start {threads} worker threads: {e}")))?;
    log::debug!("running on a dedicated pool of {threads} threads");
    pool.install(|| pipeline::run_cube(config))
}
