//! Column discovery.
//!
//! Matches trimmed header names, case-insensitively, against a list of accepted
//! spellings per role. When several columns match a role the leftmost wins.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use tracing::debug;

use crate::errors::LoadError;

/// Semantic role a column can play in a signalement file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    Date,
    Time,
    Nature,
    Perimeter,
    Message,
}

impl Display for ColumnRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColumnRole::Date => "Date",
            ColumnRole::Time => "Heure",
            ColumnRole::Nature => "Nature/Catégorie",
            ColumnRole::Perimeter => "Périmètre",
            ColumnRole::Message => "Message",
        };
        write!(f, "{}", name)
    }
}

/// Accepted header spellings for each role.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ColumnAliases {
    pub date: Vec<String>,
    pub time: Vec<String>,
    pub nature: Vec<String>,
    pub perimeter: Vec<String>,
    pub message: Vec<String>,
}

impl Default for ColumnAliases {
    fn default() -> Self {
        fn names(values: &[&str]) -> Vec<String> {
            values.iter().map(|v| v.to_string()).collect()
        }
        Self {
            date: names(&["date"]),
            time: names(&["heure"]),
            nature: names(&["nature", "catégorie"]),
            perimeter: names(&["périmètre", "perimetre"]),
            message: names(&["message"]),
        }
    }
}

impl ColumnAliases {
    fn for_role(&self, role: ColumnRole) -> &[String] {
        match role {
            ColumnRole::Date => &self.date,
            ColumnRole::Time => &self.time,
            ColumnRole::Nature => &self.nature,
            ColumnRole::Perimeter => &self.perimeter,
            ColumnRole::Message => &self.message,
        }
    }
}

/// Column index per role. Only `date` is guaranteed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub date: usize,
    pub time: Option<usize>,
    pub nature: Option<usize>,
    pub perimeter: Option<usize>,
    pub message: Option<usize>,
}

impl ResolvedColumns {
    pub fn get(&self, role: ColumnRole) -> Option<usize> {
        match role {
            ColumnRole::Date => Some(self.date),
            ColumnRole::Time => self.time,
            ColumnRole::Nature => self.nature,
            ColumnRole::Perimeter => self.perimeter,
            ColumnRole::Message => self.message,
        }
    }

    /// Optional roles that did not resolve, in a fixed order.
    pub fn missing_optional(&self) -> Vec<ColumnRole> {
        [
            ColumnRole::Nature,
            ColumnRole::Perimeter,
            ColumnRole::Message,
            ColumnRole::Time,
        ]
        .into_iter()
        .filter(|role| self.get(*role).is_none())
        .collect()
    }
}

fn find_column(headers: &[String], aliases: &[String]) -> Option<usize> {
    let wanted: Vec<String> = aliases.iter().map(|a| a.trim().to_lowercase()).collect();
    headers
        .iter()
        .position(|header| wanted.contains(&header.trim().to_lowercase()))
}

/// Resolves every role against `headers`. A missing date column is fatal.
pub fn resolve_columns(
    headers: &[String],
    aliases: &ColumnAliases,
) -> Result<ResolvedColumns, LoadError> {
    let lookup = |role: ColumnRole| find_column(headers, aliases.for_role(role));

    let date = lookup(ColumnRole::Date).ok_or_else(|| LoadError::MissingDateColumn {
        available: headers.iter().map(|h| h.trim().to_string()).collect(),
    })?;

    let resolved = ResolvedColumns {
        date,
        time: lookup(ColumnRole::Time),
        nature: lookup(ColumnRole::Nature),
        perimeter: lookup(ColumnRole::Perimeter),
        message: lookup(ColumnRole::Message),
    };
    debug!("Resolved columns: {:?}", resolved);
    Ok(resolved)
}
