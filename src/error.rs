use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Why an opened file could not become the session workbook.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported file type `.{extension}` (expected xlsx, xls, ods, json, csv or parquet)")]
    UnsupportedFormat { extension: String },

    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a valid spreadsheet: {message}")]
    InvalidWorkbook { path: PathBuf, message: String },

    #[error("{path} contains no sheets")]
    Empty { path: PathBuf },
}

/// A user-visible condition attached to one page section.
///
/// None of these stop the page: the section that raised it renders the
/// notice instead of its chart and the rest of the page carries on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A sheet or column the section needs is absent.
    Info(String),
    /// The user has not selected enough, or the selection yields nothing.
    Warning(String),
    /// The current selection cannot produce a chart at all.
    Error(String),
}

impl Notice {
    pub fn missing_column(sheet: &str, column: &str) -> Self {
        Notice::Info(format!(
            "The {sheet} sheet does not contain a '{column}' column for this visualization."
        ))
    }

    pub fn missing_sheet(sheet: &str) -> Self {
        Notice::Info(format!(
            "The workbook has no '{sheet}' sheet, so this visualization is disabled."
        ))
    }

    pub fn message(&self) -> &str {
        match self {
            Notice::Info(m) | Notice::Warning(m) | Notice::Error(m) => m,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
