use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::aggregation::DEFAULT_TOP_NATURES;
use crate::classifier::ClassifierConfig;
use crate::data_loader::{DEFAULT_SEPARATOR, DEFAULT_SKIP_ROWS};
use crate::pipeline::DEFAULT_DIAGNOSTIC_LOG;
use crate::schema::ColumnAliases;

/// ## Structure
/// This module contains the data structures for the plan file.
///
/// ```text
/// Plan
///   ├── meta: Option<Meta>
///   │   └── name: Option<String>
///   ├── import: ImportConfig
///   │   ├── filename: String
///   │   ├── skiprows: Option<usize>
///   │   ├── separator: Option<char>
///   │   └── diagnostic_log: Option<String>
///   ├── schema: ColumnAliases
///   ├── classification: ClassifierConfig
///   ├── report: ReportConfig
///   │   ├── start: Option<NaiveDate>
///   │   ├── end: Option<NaiveDate>
///   │   └── top_natures: Option<usize>
///   └── export: ExportProfile
///       └── profiles: Vec<ExportProfileItem>
///           ├── filename: String
///           └── exporter: ExportFileType
///               ├── EnrichedCsv
///               ├── ReportJson
///               ├── Markdown
///               └── Custom(CustomExportProfile)
/// ```

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Meta {
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Plan {
    pub meta: Option<Meta>,
    pub import: ImportConfig,
    #[serde(default)]
    pub schema: ColumnAliases,
    #[serde(default)]
    pub classification: ClassifierConfig,
    #[serde(default)]
    pub report: ReportConfig,
    pub export: ExportProfile,
}

//
// Import configuration
//

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ImportConfig {
    pub filename: String,
    pub skiprows: Option<usize>,
    pub separator: Option<char>,
    pub diagnostic_log: Option<String>,
}

impl ImportConfig {
    pub fn skip_rows(&self) -> usize {
        self.skiprows.unwrap_or(DEFAULT_SKIP_ROWS)
    }

    pub fn separator(&self) -> Result<u8> {
        match self.separator {
            None => Ok(DEFAULT_SEPARATOR),
            Some(c) if c.is_ascii() => Ok(c as u8),
            Some(c) => Err(anyhow!("Separator '{}' is not a single-byte character", c)),
        }
    }

    pub fn diagnostic_log(&self) -> &str {
        self.diagnostic_log
            .as_deref()
            .unwrap_or(DEFAULT_DIAGNOSTIC_LOG)
    }
}

//
// Report configuration
//

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ReportConfig {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub top_natures: Option<usize>,
}

impl ReportConfig {
    pub fn top_natures(&self) -> usize {
        self.top_natures.unwrap_or(DEFAULT_TOP_NATURES)
    }
}

//
// Export configuration
//

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ExportProfile {
    pub profiles: Vec<ExportProfileItem>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ExportProfileItem {
    pub filename: String,
    pub exporter: ExportFileType,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CustomExportProfile {
    pub template: String,
    pub partials: Option<HashMap<String, String>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ExportFileType {
    EnrichedCsv,
    ReportJson,
    Markdown,
    Custom(CustomExportProfile),
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            meta: Some(Meta {
                name: Some("Signalements".to_string()),
            }),
            import: ImportConfig {
                filename: "signalements.csv".to_string(),
                skiprows: Some(DEFAULT_SKIP_ROWS),
                separator: Some(DEFAULT_SEPARATOR as char),
                diagnostic_log: Some(DEFAULT_DIAGNOSTIC_LOG.to_string()),
            },
            schema: ColumnAliases::default(),
            classification: ClassifierConfig::default(),
            report: ReportConfig::default(),
            export: ExportProfile {
                profiles: vec![
                    ExportProfileItem {
                        filename: "out/signalements_enrichis.csv".to_string(),
                        exporter: ExportFileType::EnrichedCsv,
                    },
                    ExportProfileItem {
                        filename: "out/rapport.json".to_string(),
                        exporter: ExportFileType::ReportJson,
                    },
                    ExportProfileItem {
                        filename: "out/rapport.md".to_string(),
                        exporter: ExportFileType::Markdown,
                    },
                ],
            },
        }
    }
}
