//! Load pipeline error types
//!
//! Every failure of the load pipeline ends up as one of these variants. The
//! pipeline never lets a raw fault escape: decoding and I/O problems are wrapped
//! here too and reported as blocking outcomes.
//!
//! # Examples
//!
//! ```rust
//! use signalement::errors::LoadError;
//!
//! let err = LoadError::MissingDateColumn {
//!     available: vec!["Heure".to_string(), "Message".to_string()],
//! };
//! assert!(err.writes_diagnostic());
//! assert_eq!(err.error_code(), "MISSING_DATE_COLUMN");
//! ```

use thiserror::Error;

/// Errors raised while loading and enriching an uploaded file
#[derive(Error, Debug)]
pub enum LoadError {
    /// File extension is not one of the supported formats
    #[error("Unsupported file type: {0}. Use a .csv, .xlsx or .ods file")]
    UnsupportedFileType(String),

    /// No column resolves to the date role
    #[error("Column 'Date' not found (case-insensitive). Available columns: {available:?}")]
    MissingDateColumn { available: Vec<String> },

    /// Every record was dropped during temporal normalisation
    #[error("No valid data after date processing")]
    NoValidData,

    /// Nothing left to use as a header row
    #[error("Empty source: {0}")]
    EmptySource(String),

    /// Spreadsheet could not be opened or decoded
    #[error("Invalid spreadsheet: {0}")]
    InvalidSpreadsheet(String),

    /// CSV parsing error
    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// Errors caused by the input itself rather than by decoding or I/O
    pub fn is_fatal_input(&self) -> bool {
        matches!(
            self,
            LoadError::UnsupportedFileType(_)
                | LoadError::MissingDateColumn { .. }
                | LoadError::NoValidData
        )
    }

    /// Failures that are not part of the expected taxonomy
    pub fn is_unexpected(&self) -> bool {
        !self.is_fatal_input()
    }

    /// Whether this failure is recorded in the diagnostic log
    pub fn writes_diagnostic(&self) -> bool {
        matches!(self, LoadError::MissingDateColumn { .. }) || self.is_unexpected()
    }

    /// Stable code for machine consumers
    pub fn error_code(&self) -> &'static str {
        match self {
            LoadError::UnsupportedFileType(_) => "UNSUPPORTED_FILE_TYPE",
            LoadError::MissingDateColumn { .. } => "MISSING_DATE_COLUMN",
            LoadError::NoValidData => "NO_VALID_DATA",
            LoadError::EmptySource(_) => "EMPTY_SOURCE",
            LoadError::InvalidSpreadsheet(_) => "INVALID_SPREADSHEET",
            LoadError::CsvError(_) => "CSV_ERROR",
            LoadError::Io(_) => "IO_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_file_type_names_file() {
        let err = LoadError::UnsupportedFileType("export.pdf".to_string());
        assert!(err.to_string().contains("export.pdf"));
        assert!(err.is_fatal_input());
        assert!(!err.writes_diagnostic());
    }

    #[test]
    fn test_missing_date_column_is_logged() {
        let err = LoadError::MissingDateColumn {
            available: vec!["Jour".to_string()],
        };
        assert!(err.to_string().contains("Jour"));
        assert!(err.is_fatal_input());
        assert!(err.writes_diagnostic());
    }

    #[test]
    fn test_no_valid_data() {
        let err = LoadError::NoValidData;
        assert_eq!(err.to_string(), "No valid data after date processing");
        assert!(!err.writes_diagnostic());
        assert_eq!(err.error_code(), "NO_VALID_DATA");
    }

    #[test]
    fn test_io_error_is_unexpected() {
        let err: LoadError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.is_unexpected());
        assert!(err.writes_diagnostic());
        assert_eq!(err.error_code(), "IO_ERROR");
    }
}
