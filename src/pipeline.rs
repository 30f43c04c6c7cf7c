//! Load pipeline: raw file → schema resolution → temporal normalisation →
//! classification → immutable [`EnrichedDataset`].
//!
//! The pipeline is the error boundary. Whatever goes wrong comes back as a
//! [`LoadError`]; the unexpected kinds, and a missing date column, are also
//! written to the diagnostic log, which is overwritten on each event.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::classifier::KeywordClassifier;
use crate::data_loader::{self, SourceFormat, DEFAULT_SEPARATOR};
use crate::errors::LoadError;
use crate::record::{EnrichedDataset, EnrichedRecord, RawValue, UNDEFINED_LABEL};
use crate::schema::{self, ColumnAliases, ColumnRole};
use crate::temporal::{self, TemporalFeatures};

/// Default location of the diagnostic log
pub const DEFAULT_DIAGNOSTIC_LOG: &str = "erreur_log.txt";

/// Non-fatal conditions the analyst should know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    MissingColumn(ColumnRole),
    DroppedRows(usize),
}

impl Display for LoadWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadWarning::MissingColumn(ColumnRole::Nature) => write!(
                f,
                "Column 'Nature' or 'Catégorie' not found, filled with '{}'",
                UNDEFINED_LABEL
            ),
            LoadWarning::MissingColumn(ColumnRole::Perimeter) => write!(
                f,
                "Column 'Périmètre' not found, filled with '{}'",
                UNDEFINED_LABEL
            ),
            LoadWarning::MissingColumn(ColumnRole::Message) => write!(
                f,
                "Column 'Message' not found, subcategory analysis cannot be performed"
            ),
            LoadWarning::MissingColumn(ColumnRole::Time) => {
                write!(f, "Column 'Heure' not found, using the date alone")
            }
            LoadWarning::MissingColumn(role) => write!(f, "Column '{}' not found", role),
            LoadWarning::DroppedRows(count) => write!(
                f,
                "{} row(s) dropped because no valid date/time could be derived",
                count
            ),
        }
    }
}

/// Successful load: the dataset and the warnings raised while building it.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub dataset: Arc<EnrichedDataset>,
    pub warnings: Vec<LoadWarning>,
}

pub struct LoadPipeline {
    aliases: ColumnAliases,
    classifier: KeywordClassifier,
    separator: u8,
    diagnostic_log: Option<PathBuf>,
}

impl LoadPipeline {
    pub fn new(aliases: ColumnAliases, classifier: KeywordClassifier) -> Self {
        Self {
            aliases,
            classifier,
            separator: DEFAULT_SEPARATOR,
            diagnostic_log: Some(PathBuf::from(DEFAULT_DIAGNOSTIC_LOG)),
        }
    }

    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    /// `None` disables the diagnostic log.
    pub fn with_diagnostic_log(mut self, path: Option<PathBuf>) -> Self {
        self.diagnostic_log = path;
        self
    }

    /// Reads `path` and loads it.
    pub fn load_file(&self, path: &Path, skip_rows: usize) -> Result<LoadOutcome, LoadError> {
        let file_name = path.to_string_lossy();
        match std::fs::read(path) {
            Ok(content) => self.load(&file_name, &content, skip_rows),
            Err(err) => {
                let err = LoadError::Io(err);
                self.report_failure(&file_name, &err);
                Err(err)
            }
        }
    }

    /// Loads an uploaded file. `file_name` only selects the reader.
    pub fn load(
        &self,
        file_name: &str,
        content: &[u8],
        skip_rows: usize,
    ) -> Result<LoadOutcome, LoadError> {
        let result = self.try_load(file_name, content, skip_rows);
        if let Err(err) = &result {
            self.report_failure(file_name, err);
        }
        result
    }

    fn try_load(
        &self,
        file_name: &str,
        content: &[u8],
        skip_rows: usize,
    ) -> Result<LoadOutcome, LoadError> {
        let format = SourceFormat::from_file_name(file_name)?;
        let table = data_loader::read_table(format, content, skip_rows, self.separator)?;
        let resolved = schema::resolve_columns(&table.columns, &self.aliases)?;

        let mut warnings: Vec<LoadWarning> = resolved
            .missing_optional()
            .into_iter()
            .map(LoadWarning::MissingColumn)
            .collect();

        let timestamps = temporal::normalize(&table, &resolved);
        let with_time = resolved.time.is_some();
        let total_rows = table.len();
        let columns = table.columns;

        let mut records = Vec::with_capacity(total_rows);
        for (values, timestamp) in table.rows.into_iter().zip(timestamps) {
            let Some(timestamp) = timestamp else {
                continue;
            };
            let features = TemporalFeatures::new(timestamp, with_time);
            let nature = clean_label(resolved.nature.map(|i| &values[i]));
            let perimeter = clean_label(resolved.perimeter.map(|i| &values[i]));
            let message = resolved.message.map(|i| values[i].to_text());
            let subcategory = self.classifier.classify(message.as_deref(), &nature);

            records.push(EnrichedRecord {
                values,
                nature,
                perimeter,
                timestamp: features.timestamp,
                weekday_index: features.weekday_index,
                weekday_name: features.weekday_name,
                date: features.date,
                hour: features.hour,
                subcategory,
            });
        }

        if records.is_empty() {
            return Err(LoadError::NoValidData);
        }

        let dropped = total_rows - records.len();
        if dropped > 0 {
            warnings.push(LoadWarning::DroppedRows(dropped));
        }
        for warning in &warnings {
            warn!("{}", warning);
        }
        info!(
            "Loaded {} records from {} ({} dropped)",
            records.len(),
            file_name,
            dropped
        );

        Ok(LoadOutcome {
            dataset: Arc::new(EnrichedDataset {
                columns,
                resolved,
                records,
            }),
            warnings,
        })
    }

    fn report_failure(&self, file_name: &str, err: &LoadError) {
        error!("Failed to load {}: {}", file_name, err);
        if !err.writes_diagnostic() {
            return;
        }
        let Some(path) = &self.diagnostic_log else {
            return;
        };
        if let Err(write_err) = std::fs::write(path, diagnostic_report(file_name, err)) {
            warn!(
                "Could not write diagnostic log {}: {}",
                path.display(),
                write_err
            );
        }
    }
}

/// Trimmed label, or the undefined sentinel for absent columns and blank cells.
fn clean_label(value: Option<&RawValue>) -> String {
    match value {
        Some(value) if !value.is_empty() => value.to_text().trim().to_string(),
        _ => UNDEFINED_LABEL.to_string(),
    }
}

/// Plain-text body of the diagnostic log for `err`.
pub fn diagnostic_report(file_name: &str, err: &LoadError) -> String {
    let rule = "=".repeat(50);
    let mut report = String::new();
    match err {
        LoadError::MissingDateColumn { available } => {
            report.push_str("FATAL ERROR: column 'Date' not found (case-insensitive search).\n");
            report.push_str(&format!("File: {}\n", file_name));
            report.push_str(&format!("Available columns: {:?}\n", available));
        }
        _ => {
            report.push_str(&format!("{}\n", rule));
            report.push_str("UNEXPECTED ERROR WHILE LOADING DATA:\n");
            report.push_str(&format!("File: {}\n", file_name));
            report.push_str(&format!("Error [{}]: {}\n", err.error_code(), err));
            report.push_str(&format!("Details: {:?}\n", err));
            let mut source = err.source();
            while let Some(cause) = source {
                report.push_str(&format!("Caused by: {}\n", cause));
                source = cause.source();
            }
            report.push_str(&format!("{}\n", rule));
        }
    }
    report
}
