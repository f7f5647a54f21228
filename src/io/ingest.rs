//! Delimited-text ingest.
//!
//! Turns the fact file and the tier file into typed records. Required
//! columns are checked once against the header; every value is validated
//! here so later stages never see a half-parsed row.
//!
//! Row failures follow `RowPolicy`: `reject` aborts the run at the first
//! bad row, `skip` drops it and records a `RowError`.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{RowPolicy, Status, TOTAL};
use crate::error::{CubeError, CubeResult};

pub const FACT_COLUMNS: [&str; 5] = ["legal_entity", "counter_party", "rating", "status", "value"];
pub const TIER_COLUMNS: [&str; 2] = ["counter_party", "tier"];

/// A fact row before the tier join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFact {
    pub line: usize,
    pub legal_entity: String,
    pub counter_party: String,
    pub rating: i64,
    pub status: Status,
    pub value: i64,
}

/// One `counter_party -> tier` mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierRecord {
    pub line: usize,
    pub counter_party: String,
    pub tier: String,
}

/// A row dropped under `RowPolicy::Skip`.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: parsed rows plus anything that was skipped.
#[derive(Debug, Clone)]
pub struct Ingested<T> {
    pub rows: Vec<T>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

pub fn load_facts(path: &Path, delimiter: u8, policy: RowPolicy) -> CubeResult<Ingested<RawFact>> {
    let file = File::open(path)?;
    read_facts(file, &path.display().to_string(), delimiter, policy)
}

pub fn load_tiers(path: &Path, delimiter: u8, policy: RowPolicy) -> CubeResult<Ingested<TierRecord>> {
    let file = File::open(path)?;
    read_tiers(file, &path.display().to_string(), delimiter, policy)
}

pub fn read_facts<R: Read>(
    reader: R,
    source_name: &str,
    delimiter: u8,
    policy: RowPolicy,
) -> CubeResult<Ingested<RawFact>> {
    read_records(reader, source_name, delimiter, policy, &FACT_COLUMNS, |row| {
        Ok(RawFact {
            line: row.line,
            legal_entity: row.dimension("legal_entity")?,
            counter_party: row.dimension("counter_party")?,
            rating: row.integer("rating")?,
            status: Status::parse(row.required("status")?),
            value: row.integer("value")?,
        })
    })
}

pub fn read_tiers<R: Read>(
    reader: R,
    source_name: &str,
    delimiter: u8,
    policy: RowPolicy,
) -> CubeResult<Ingested<TierRecord>> {
    read_records(reader, source_name, delimiter, policy, &TIER_COLUMNS, |row| {
        Ok(TierRecord {
            line: row.line,
            counter_party: row.dimension("counter_party")?,
            tier: row.dimension("tier")?,
        })
    })
}

/// Borrowed view of one record with header lookup.
struct RowView<'a> {
    source_name: &'a str,
    line: usize,
    record: &'a StringRecord,
    header_map: &'a HashMap<String, usize>,
}

impl RowView<'_> {
    fn required(&self, name: &str) -> CubeResult<&str> {
        self.header_map
            .get(name)
            .and_then(|&idx| self.record.get(idx))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CubeError::MalformedRow {
                source_name: self.source_name.to_string(),
                line: self.line,
                field: name.to_string(),
            })
    }

    fn dimension(&self, name: &str) -> CubeResult<String> {
        let value = self.required(name)?;
        if value == TOTAL {
            return Err(CubeError::ReservedValue {
                source_name: self.source_name.to_string(),
                line: self.line,
                field: name.to_string(),
            });
        }
        Ok(value.to_string())
    }

    fn integer(&self, name: &str) -> CubeResult<i64> {
        let raw = self.required(name)?;
        raw.parse::<i64>().map_err(|_| CubeError::NonNumericField {
            source_name: self.source_name.to_string(),
            line: self.line,
            field: name.to_string(),
            value: raw.to_string(),
        })
    }
}

fn read_records<R, T, F>(
    mut reader: R,
    source_name: &str,
    delimiter: u8,
    policy: RowPolicy,
    required_columns: &[&str],
    parse: F,
) -> CubeResult<Ingested<T>>
where
    R: Read,
    F: Fn(&RowView<'_>) -> CubeResult<T>,
{
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    let lines = LineIndex::new(&data);

    // The default terminator accepts `\n`, `\r\n` and a bare `\r`.
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data.as_slice());

    let headers = reader.headers()?.clone();
    let header_map = build_header_map(&headers);
    for column in required_columns {
        if !header_map.contains_key(*column) {
            return Err(CubeError::MissingColumn {
                source_name: source_name.to_string(),
                column: column.to_string(),
            });
        }
    }

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    let mut line = 1usize;
    for result in reader.records() {
        rows_read += 1;
        let position = match &result {
            Ok(record) => record.position(),
            Err(err) => err.position(),
        };
        line = match position {
            Some(pos) => lines.line_of(pos.byte()),
            None => line + 1,
        };
        let parsed = result.map_err(CubeError::from).and_then(|record| {
            parse(&RowView {
                source_name,
                line,
                record: &record,
                header_map: &header_map,
            })
        });

        match parsed {
            Ok(row) => rows.push(row),
            Err(err) => match policy {
                RowPolicy::Reject => return Err(err),
                RowPolicy::Skip => {
                    log::warn!("skipping row: {err}");
                    row_errors.push(RowError {
                        line,
                        message: err.to_string(),
                    });
                }
            },
        }
    }

    log::info!(
        "{source_name}: read {rows_read} rows, kept {}, skipped {}",
        rows.len(),
        row_errors.len()
    );

    Ok(Ingested {
        rows,
        row_errors,
        rows_read,
    })
}

/// Byte offset to 1-based line number. `\n`, `\r\n` and a bare `\r`
/// each end one line.
///
/// csv positions point at the end of the previous record, before any blank
/// lines it skipped, and count `\n` only.
struct LineIndex<'a> {
    data: &'a [u8],
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(data: &'a [u8]) -> Self {
        let mut starts = vec![0];
        for (i, &b) in data.iter().enumerate() {
            let ends_line = match b {
                b'\n' => true,
                b'\r' => data.get(i + 1) != Some(&b'\n'),
                _ => false,
            };
            if ends_line {
                starts.push(i + 1);
            }
        }
        Self { data, starts }
    }

    fn line_of(&self, byte: u64) -> usize {
        let mut offset = usize::try_from(byte).unwrap_or(self.data.len());
        while matches!(self.data.get(offset), Some(b'\r' | b'\n')) {
            offset += 1;
        }
        self.starts.partition_point(|&start| start <= offset)
    }
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}
