use thiserror::Error;

/// Structural failures that abort a pipeline run.
///
/// Value-level problems (unparseable numbers, zero denominators, malformed
/// FIPS codes) never surface here; they become missing values instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("table '{table}' has no column '{column}'")]
    SchemaMismatch { table: String, column: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("workbook '{path}' has no worksheet")]
    EmptyWorkbook { path: String },

    #[error("delimiter '{delimiter}' for '{file}' is not a single ASCII character")]
    InvalidDelimiter { file: String, delimiter: char },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
