//! Reads an uploaded file into a [`RawTable`].
//!
//! Delimited text goes through `csv`; `xlsx` and `ods` workbooks go through
//! `calamine` and only their first sheet is used. In both cases the first
//! `skip_rows` rows are banner lines and the next row is the header.

use calamine::{open_workbook_from_rs, Data, Ods, OdsError, Range, Reader, Xlsx, XlsxError};
use chrono::{NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

use crate::errors::LoadError;
use crate::record::{RawTable, RawValue};

/// Default number of banner rows above the header row
pub const DEFAULT_SKIP_ROWS: usize = 3;

/// Default field separator for delimited files
pub const DEFAULT_SEPARATOR: u8 = b';';

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// ODS time cells, e.g. `PT08H15M00S`
static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)(?:[.,]\d+)?S)?$")
        .expect("Invalid regex pattern for ISO durations")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Csv,
    Xlsx,
    Ods,
}

impl SourceFormat {
    /// Picks the reader from the file extension, case-insensitively.
    pub fn from_file_name(file_name: &str) -> Result<Self, LoadError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(SourceFormat::Csv),
            Some("xlsx") => Ok(SourceFormat::Xlsx),
            Some("ods") => Ok(SourceFormat::Ods),
            _ => Err(LoadError::UnsupportedFileType(file_name.to_string())),
        }
    }
}

impl Display for SourceFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SourceFormat::Csv => "csv",
            SourceFormat::Xlsx => "xlsx",
            SourceFormat::Ods => "ods",
        };
        write!(f, "{}", name)
    }
}

/// Reads `content` into a raw table, skipping `skip_rows` leading rows before
/// the header row.
pub fn read_table(
    format: SourceFormat,
    content: &[u8],
    skip_rows: usize,
    separator: u8,
) -> Result<RawTable, LoadError> {
    let table = match format {
        SourceFormat::Csv => read_delimited(content, skip_rows, separator)?,
        SourceFormat::Xlsx => {
            let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(content))
                .map_err(|e: XlsxError| LoadError::InvalidSpreadsheet(e.to_string()))?;
            let range = workbook
                .worksheet_range_at(0)
                .ok_or_else(|| LoadError::EmptySource("workbook has no sheet".to_string()))?
                .map_err(|e| LoadError::InvalidSpreadsheet(e.to_string()))?;
            read_range(&range, skip_rows)?
        }
        SourceFormat::Ods => {
            let mut workbook: Ods<_> = open_workbook_from_rs(Cursor::new(content))
                .map_err(|e: OdsError| LoadError::InvalidSpreadsheet(e.to_string()))?;
            let range = workbook
                .worksheet_range_at(0)
                .ok_or_else(|| LoadError::EmptySource("workbook has no sheet".to_string()))?
                .map_err(|e| LoadError::InvalidSpreadsheet(e.to_string()))?;
            read_range(&range, skip_rows)?
        }
    };

    info!(
        "Read {} rows with headers {:?} from {} input",
        table.len(),
        table.columns,
        format
    );
    Ok(table)
}

/// Byte offset just past the first `lines` line breaks.
fn skip_lines(content: &[u8], lines: usize) -> usize {
    let mut offset = 0;
    for _ in 0..lines {
        match content[offset..].iter().position(|b| *b == b'\n') {
            Some(pos) => offset += pos + 1,
            None => return content.len(),
        }
    }
    offset
}

fn read_delimited(content: &[u8], skip_rows: usize, separator: u8) -> Result<RawTable, LoadError> {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
    let body = &content[skip_lines(content, skip_rows)..];

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(false)
        .flexible(true)
        .from_reader(body);

    let mut records = reader.records();
    let header = records.next().transpose()?.ok_or_else(|| {
        LoadError::EmptySource(format!("no header row after skipping {} rows", skip_rows))
    })?;

    let mut table = RawTable::new(header.iter().map(|h| h.trim().to_string()).collect());
    for record in records {
        let record = record?;
        if record.len() > table.columns.len() {
            debug!(
                "Row has {} fields for {} columns, extra fields ignored",
                record.len(),
                table.columns.len()
            );
        }
        table.push_row(record.iter().map(RawValue::from_text).collect());
    }
    Ok(table)
}

/// Time of day of an ISO 8601 duration below 24 hours.
fn parse_iso_duration(value: &str) -> Option<NaiveTime> {
    let caps = ISO_DURATION.captures(value.trim())?;
    let part = |i: usize| -> Option<u32> {
        caps.get(i).map_or(Some(0), |m| m.as_str().parse().ok())
    };
    NaiveTime::from_hms_opt(part(1)?, part(2)?, part(3)?)
}

fn cell_value(cell: &Data) -> RawValue {
    match cell {
        Data::Empty | Data::Error(_) => RawValue::Empty,
        Data::String(s) => RawValue::from_text(s),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%dT%H:%M:%S%.f")
            .map(RawValue::DateTime)
            .unwrap_or_else(|_| RawValue::from_text(s)),
        Data::DurationIso(s) => parse_iso_duration(s)
            .map(RawValue::Time)
            .unwrap_or_else(|| RawValue::from_text(s)),
        Data::Int(i) => RawValue::Int(*i),
        Data::Float(f) => RawValue::Float(*f),
        Data::Bool(b) => RawValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            // serials below one day carry no calendar date
            Some(value) if dt.as_f64() < 1.0 => RawValue::Time(value.time()),
            Some(value) => RawValue::DateTime(value),
            None => RawValue::Float(dt.as_f64()),
        },
    }
}

fn read_range(range: &Range<Data>, skip_rows: usize) -> Result<RawTable, LoadError> {
    // Ranges start at the first used cell; skip rows count from the top of the sheet
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut rows = range
        .rows()
        .enumerate()
        .filter(|(i, _)| first_row + i >= skip_rows)
        .map(|(_, row)| row);

    let header = rows.next().ok_or_else(|| {
        LoadError::EmptySource(format!("no header row after skipping {} rows", skip_rows))
    })?;

    let mut table = RawTable::new(
        header
            .iter()
            .map(|cell| cell_value(cell).to_text().trim().to_string())
            .collect(),
    );
    for row in rows {
        table.push_row(row.iter().map(cell_value).collect());
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(SourceFormat::from_file_name("a.csv").unwrap(), SourceFormat::Csv);
        assert_eq!(SourceFormat::from_file_name("A.XLSX").unwrap(), SourceFormat::Xlsx);
        assert_eq!(SourceFormat::from_file_name("b.ods").unwrap(), SourceFormat::Ods);
        let err = SourceFormat::from_file_name("rapport.pdf").unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFileType(ref name) if name == "rapport.pdf"));
        assert!(SourceFormat::from_file_name("sans_extension").is_err());
    }

    #[test]
    fn test_skip_lines() {
        let content = b"a\nb\r\nc\n";
        assert_eq!(skip_lines(content, 0), 0);
        assert_eq!(skip_lines(content, 2), 5);
        assert_eq!(skip_lines(content, 10), content.len());
    }

    #[test]
    fn test_read_delimited_with_bom_and_banner() {
        let content = "\u{feff}Export signalements\nGénéré le 06/01/2024\n\n Date ;Heure;Message\n05/01/2024;08:15;Un incident\n06/01/2024;;\n";
        let table = read_table(SourceFormat::Csv, content.as_bytes(), 3, b';').unwrap();
        assert_eq!(table.columns, vec!["Date", "Heure", "Message"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][2], RawValue::Text("Un incident".to_string()));
        assert_eq!(table.rows[1][1], RawValue::Empty);
        assert_eq!(table.rows[1][2], RawValue::Empty);
    }

    #[test]
    fn test_read_delimited_without_rows_left() {
        let err = read_table(SourceFormat::Csv, b"a\nb\n", 3, b';').unwrap_err();
        assert!(matches!(err, LoadError::EmptySource(_)));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = read_table(SourceFormat::Csv, b"Date;Nature\n05/01/2024\n", 0, b';').unwrap();
        assert_eq!(table.rows[0], vec![RawValue::Text("05/01/2024".to_string()), RawValue::Empty]);
    }

    #[test]
    fn test_iso_duration_cells() {
        let time = |h, m, s| RawValue::Time(NaiveTime::from_hms_opt(h, m, s).unwrap());
        assert_eq!(cell_value(&Data::DurationIso("PT08H15M00S".to_string())), time(8, 15, 0));
        assert_eq!(cell_value(&Data::DurationIso("PT23H05M".to_string())), time(23, 5, 0));
        assert_eq!(cell_value(&Data::DurationIso("PT7H30M12.5S".to_string())), time(7, 30, 12));
        // a day or more is not a time of day
        assert_eq!(
            cell_value(&Data::DurationIso("PT36H00M00S".to_string())),
            RawValue::Text("PT36H00M00S".to_string())
        );
    }

    #[test]
    fn test_iso_datetime_cells() {
        let value = cell_value(&Data::DateTimeIso("2024-01-05T08:15:00".to_string()));
        assert_eq!(value.to_text(), "2024-01-05 08:15:00");
        // date-only values stay text and are parsed as year-first dates
        assert_eq!(
            cell_value(&Data::DateTimeIso("2024-01-05".to_string())),
            RawValue::Text("2024-01-05".to_string())
        );
    }

    #[test]
    fn test_invalid_spreadsheet() {
        let err = read_table(SourceFormat::Xlsx, b"not a zip", 0, b';').unwrap_err();
        assert!(matches!(err, LoadError::InvalidSpreadsheet(_)));
    }
}
