//! Cube rows to delimited text; run summary to JSON.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::cube::Cube;
use crate::domain::MetricKind;
use crate::error::CubeResult;
use crate::report::RunSummary;

/// Header: dimensions in configured order, then the metrics.
pub fn output_header(cube: &Cube) -> Vec<String> {
    cube.dimensions()
        .names()
        .iter()
        .cloned()
        .chain(MetricKind::ALL.iter().map(|m| m.column_name().to_string()))
        .collect()
}

/// Write every cube row in level order.
pub fn write_cube_csv<W: Write>(writer: W, cube: &Cube, delimiter: u8) -> CubeResult<()> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    out.write_record(output_header(cube))?;
    for row in cube.rows() {
        let mut record: Vec<String> = row.key.values().iter().map(|v| v.to_string()).collect();
        for kind in MetricKind::ALL {
            record.push(row.metrics.get(kind).to_string());
        }
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}

/// Write to `path`, or stdout when no path is given.
pub fn write_cube(path: Option<&Path>, cube: &Cube, delimiter: u8) -> CubeResult<()> {
    match path {
        Some(path) => {
            let file = File::create(path)?;
            write_cube_csv(file, cube, delimiter)?;
            log::info!("wrote {} rows to {}", cube.row_count(), path.display());
        }
        None => {
            let stdout = std::io::stdout();
            write_cube_csv(stdout.lock(), cube, delimiter)?;
        }
    }
    Ok(())
}

pub fn write_summary_json(path: &Path, summary: &RunSummary) -> CubeResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, summary)?;
    log::info!("wrote run summary to {}", path.display());
    Ok(())
}
