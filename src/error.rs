//! Error types for report generation.
//!
//! Data-quality problems (missing denominators, empty groups) never become
//! errors; they degrade to empty values and are logged. Only caller-contract
//! violations and I/O failures surface here.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable error codes, also used as process exit codes by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorCode {
    /// Requested group title does not exist
    UnknownGroup = 10,
    /// Selection resolved to no groups
    NoGroupsSelected = 11,
    /// Dictionary file lacks required columns
    MissingDictionaryColumns = 12,
    /// Layer sheet not found in the layer dictionary workbook
    MissingLayer = 13,
    /// Invalid configuration or CLI arguments
    InvalidConfig = 14,
    /// File I/O error
    IoError = 20,
    /// CSV parse or write error
    CsvError = 21,
    /// Spreadsheet read or write error
    XlsxError = 22,
    /// Template rendering failed
    TemplateError = 23,
    /// Document export failed
    ExportError = 24,
}

impl ErrorCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::UnknownGroup | ErrorCode::NoGroupsSelected | ErrorCode::InvalidConfig => {
                "client_error"
            }
            ErrorCode::MissingDictionaryColumns | ErrorCode::MissingLayer => "resource_not_found",
            ErrorCode::IoError => "io_error",
            ErrorCode::CsvError
            | ErrorCode::XlsxError
            | ErrorCode::TemplateError
            | ErrorCode::ExportError => "subsystem_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("group '{title}' does not exist (available: {})", available.join(", "))]
    UnknownGroup {
        title: String,
        available: Vec<String>,
    },

    #[error("no groups selected")]
    NoGroupsSelected,

    #[error("dictionary is missing required columns: {}", missing.join(", "))]
    MissingDictionaryColumns { missing: Vec<String> },

    #[error("layer '{layer}' not found in layer dictionary")]
    MissingLayer { layer: String },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("spreadsheet error: {message}")]
    Xlsx { message: String },

    #[error(transparent)]
    Template(#[from] tera::Error),

    #[error("{format} export failed: {message}")]
    Export { format: String, message: String },
}

impl ReportError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ReportError::UnknownGroup { .. } => ErrorCode::UnknownGroup,
            ReportError::NoGroupsSelected => ErrorCode::NoGroupsSelected,
            ReportError::MissingDictionaryColumns { .. } => ErrorCode::MissingDictionaryColumns,
            ReportError::MissingLayer { .. } => ErrorCode::MissingLayer,
            ReportError::InvalidConfig { .. } => ErrorCode::InvalidConfig,
            ReportError::Io(_) => ErrorCode::IoError,
            ReportError::Csv(_) => ErrorCode::CsvError,
            ReportError::Xlsx { .. } => ErrorCode::XlsxError,
            ReportError::Template(_) => ErrorCode::TemplateError,
            ReportError::Export { .. } => ErrorCode::ExportError,
        }
    }

    /// Short hints printed alongside the error by the CLI.
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            ReportError::UnknownGroup { .. } => {
                vec!["Run the `groups` subcommand to list available group titles"]
            }
            ReportError::NoGroupsSelected => {
                vec!["Check that the dataset has indicator columns with the configured prefix"]
            }
            ReportError::MissingDictionaryColumns { .. } => vec![
                "Expected headers: Tema, Subtema, Variable_Codigo, Descripcion_Etiqueta, Valores_Codigos_y_Detalle",
            ],
            ReportError::MissingLayer { .. } => {
                vec!["Sheet names in the layer dictionary must match the layer name"]
            }
            _ => Vec::new(),
        }
    }

    pub fn xlsx(message: impl fmt::Display) -> Self {
        ReportError::Xlsx {
            message: message.to_string(),
        }
    }
}

pub type ReportResult<T> = Result<T, ReportError>;
