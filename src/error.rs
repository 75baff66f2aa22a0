//! Error types for the store, the renderers and value parsing.

use std::path::PathBuf;

/// A string did not name a known variant (template, format, activity type, ...).
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseError {
    pub fn unknown(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed records in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV line {line}: {reason}")]
    InvalidRow { line: u64, reason: String },
}

/// Failure while building a report document. Nothing is saved when one occurs.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("workbook rendering failed: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),
}

/// Message shown to the person who asked for the export, whatever went wrong.
pub const REPORT_FAILURE_MESSAGE: &str = "Error generating report, please try again";
