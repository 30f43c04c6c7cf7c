//! Domain-specific error types for the signalement tool
//!
//! # Error Categories
//!
//! - **LoadError**: everything that stops the load pipeline (file type, schema,
//!   temporal normalisation, decoding)
//! - **ExportError**: rendering the enriched dataset or the report
//!
//! Application glue (plan execution, CLI) works with `anyhow::Result` and wraps
//! these errors with context.
//!
//! # Examples
//!
//! ```rust
//! use signalement::errors::LoadError;
//!
//! let err = LoadError::UnsupportedFileType("report.pdf".to_string());
//! assert!(err.is_fatal_input());
//! assert!(!err.writes_diagnostic());
//! ```

pub mod export;
pub mod load;

pub use export::ExportError;
pub use load::LoadError;

/// Result type alias for load operations
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type alias for export operations
pub type ExportResult<T> = Result<T, ExportError>;
