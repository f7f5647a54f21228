//! `cube-rollup` library crate.
//!
//! The binary (`cube`) is a thin wrapper around this library so that:
//!
//! - the cube core is testable without files or processes
//! - ingest/export adapters can be swapped without touching the core

pub mod app;
pub mod cli;
pub mod cube;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
