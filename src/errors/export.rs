//! Export error types

use thiserror::Error;

/// Errors raised while rendering the dataset or the report
#[derive(Error, Debug)]
pub enum ExportError {
    /// CSV writing error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Template could not be read, registered or rendered
    #[error("Template rendering failed: {0}")]
    TemplateError(String),

    /// Rendered output was not valid UTF-8
    #[error("Encoding error: {0}")]
    EncodingError(#[from] std::string::FromUtf8Error),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<handlebars::RenderError> for ExportError {
    fn from(err: handlebars::RenderError) -> Self {
        ExportError::TemplateError(err.to_string())
    }
}

impl From<handlebars::TemplateError> for ExportError {
    fn from(err: handlebars::TemplateError) -> Self {
        ExportError::TemplateError(err.to_string())
    }
}

impl From<csv::IntoInnerError<csv::Writer<Vec<u8>>>> for ExportError {
    fn from(err: csv::IntoInnerError<csv::Writer<Vec<u8>>>) -> Self {
        ExportError::Io(std::io::Error::other(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_error_message() {
        let err = ExportError::TemplateError("unknown helper".to_string());
        assert_eq!(err.to_string(), "Template rendering failed: unknown helper");
    }
}
