//! Input/output adapters around the cube core.
//!
//! - delimited fact/tier ingest + validation (`ingest`)
//! - tier join on `counter_party` (`join`)
//! - cube rows and run summary exports (`export`)

pub mod export;
pub mod ingest;
pub mod join;

pub use export::*;
pub use ingest::*;
pub use join::*;
