//! Error types.
//!
//! `CubeError` is the library-level taxonomy. `AppError` is what the binary
//! sees: a message plus the process exit code.

use thiserror::Error;

/// Everything that can go wrong while building a cube.
#[derive(Debug, Error)]
pub enum CubeError {
    #[error("{source_name} line {line}: missing required value `{field}`")]
    MalformedRow {
        source_name: String,
        line: usize,
        field: String,
    },

    #[error("{source_name} line {line}: `{field}` is not an integer: '{value}'")]
    NonNumericField {
        source_name: String,
        line: usize,
        field: String,
        value: String,
    },

    #[error("{source_name}: missing required column `{column}`")]
    MissingColumn { source_name: String, column: String },

    #[error("{source_name} line {line}: `{field}` uses the reserved value 'Total'")]
    ReservedValue {
        source_name: String,
        line: usize,
        field: String,
    },

    #[error("counter_party '{counter_party}' maps to several tiers: {tiers:?}")]
    TierConflict {
        counter_party: String,
        tiers: Vec<String>,
    },

    #[error("invalid dimension list: {0}")]
    InvalidDimensions(String),

    #[error("group key {key} has {actual} values, expected {expected}")]
    KeyArity {
        key: String,
        expected: usize,
        actual: usize,
    },

    #[error("fact row key {key} contains a collapsed dimension")]
    NotBaseKey { key: String },

    #[error("internal error: group {key} has no contributing rows")]
    EmptyGroup { key: String },

    #[error("internal error: grand total key {key} reached the cube")]
    GrandTotal { key: String },

    #[error("internal error: key {key} matches no grouping level")]
    UnknownLevel { key: String },

    #[error("`{metric}` overflowed while combining group {key}")]
    Overflow { metric: &'static str, key: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CubeResult<T> = Result<T, CubeError>;

impl CubeError {
    /// True for errors that indicate a bug rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            CubeError::EmptyGroup { .. }
                | CubeError::GrandTotal { .. }
                | CubeError::KeyArity { .. }
                | CubeError::NotBaseKey { .. }
                | CubeError::UnknownLevel { .. }
                | CubeError::Overflow { .. }
        )
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<CubeError> for AppError {
    fn from(err: CubeError) -> Self {
        let exit_code = if err.is_internal() { 4 } else { 2 };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_map_to_exit_code_4() {
        let err: AppError = CubeError::EmptyGroup {
            key: "(A, Total)".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn input_errors_map_to_exit_code_2() {
        let err: AppError = CubeError::NonNumericField {
            source_name: "facts".to_string(),
            line: 3,
            field: "rating".to_string(),
            value: "x".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("line 3"));
    }
}
