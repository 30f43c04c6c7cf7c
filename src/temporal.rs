//! Date and time reconstruction.
//!
//! Dates are read day-first. Times are read as `HH:MM:SS`, and only when that
//! fails for every row of the column is the column re-read as `HH:MM`. A row
//! whose date or time cannot be read has no timestamp and is dropped by the
//! pipeline.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::record::{RawTable, RawValue};
use crate::schema::ResolvedColumns;

static DAY_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4}|\d{2})(?:[ T]\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?)?$")
        .expect("Invalid regex pattern for day-first dates")
});

static YEAR_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})[/.\-](\d{1,2})[/.\-](\d{1,2})(?:[ T]\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?)?$")
        .expect("Invalid regex pattern for year-first dates")
});

/// Format tried for the time column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    HourMinuteSecond,
    HourMinute,
}

impl TimeFormat {
    pub fn pattern(&self) -> &'static str {
        match self {
            TimeFormat::HourMinuteSecond => "%H:%M:%S",
            TimeFormat::HourMinute => "%H:%M",
        }
    }
}

/// Derived calendar features of a surviving record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalFeatures {
    pub timestamp: NaiveDateTime,
    pub weekday_index: u32,
    pub weekday_name: &'static str,
    pub date: NaiveDate,
    pub hour: u32,
}

impl TemporalFeatures {
    /// `hour` is only meaningful when a time column exists; callers pass
    /// `with_time = false` to pin it to 0.
    pub fn new(timestamp: NaiveDateTime, with_time: bool) -> Self {
        let weekday = timestamp.weekday();
        Self {
            timestamp,
            weekday_index: weekday.num_days_from_monday(),
            weekday_name: weekday_name(weekday),
            date: timestamp.date(),
            hour: if with_time { timestamp.hour() } else { 0 },
        }
    }
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn expand_year(year: &str) -> Option<i32> {
    let value: i32 = year.parse().ok()?;
    if year.len() == 2 {
        // Same pivot as strptime's %y
        Some(if value < 69 { 2000 + value } else { 1900 + value })
    } else {
        Some(value)
    }
}

/// Parses a date cell, preferring day-before-month ordering.
pub fn parse_date(value: &RawValue) -> Option<NaiveDate> {
    match value {
        RawValue::DateTime(dt) => Some(dt.date()),
        RawValue::Text(text) => parse_date_text(text.trim()),
        _ => None,
    }
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    if let Some(caps) = DAY_FIRST.captures(text) {
        let first: u32 = caps[1].parse().ok()?;
        let second: u32 = caps[2].parse().ok()?;
        let year = expand_year(&caps[3])?;
        return NaiveDate::from_ymd_opt(year, second, first)
            .or_else(|| NaiveDate::from_ymd_opt(year, first, second));
    }
    if let Some(caps) = YEAR_FIRST.captures(text) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    None
}

fn parse_time(value: &RawValue, format: TimeFormat) -> Option<NaiveTime> {
    match value {
        RawValue::Time(time) => Some(*time),
        RawValue::DateTime(dt) => Some(dt.time()),
        RawValue::Text(text) => NaiveTime::parse_from_str(text.trim(), format.pattern()).ok(),
        _ => None,
    }
}

/// Parses a whole time column with the all-or-nothing `HH:MM` fallback.
pub fn parse_time_column<'a, I>(values: I) -> (Vec<Option<NaiveTime>>, TimeFormat)
where
    I: IntoIterator<Item = &'a RawValue>,
{
    let values: Vec<&RawValue> = values.into_iter().collect();
    let parsed: Vec<Option<NaiveTime>> = values
        .iter()
        .map(|v| parse_time(v, TimeFormat::HourMinuteSecond))
        .collect();
    if parsed.iter().any(Option::is_some) {
        return (parsed, TimeFormat::HourMinuteSecond);
    }

    debug!("No value matched HH:MM:SS, retrying the time column as HH:MM");
    let parsed = values
        .iter()
        .map(|v| parse_time(v, TimeFormat::HourMinute))
        .collect();
    (parsed, TimeFormat::HourMinute)
}

/// One optional timestamp per row of `table`.
pub fn normalize(table: &RawTable, resolved: &ResolvedColumns) -> Vec<Option<NaiveDateTime>> {
    let dates: Vec<Option<NaiveDate>> = table.column(resolved.date).map(parse_date).collect();

    match resolved.time {
        Some(time_index) => {
            let (times, format) = parse_time_column(table.column(time_index));
            info!("Time column parsed as {}", format.pattern());
            dates
                .into_iter()
                .zip(times)
                .map(|(date, time)| Some(date?.and_time(time?)))
                .collect()
        }
        None => dates
            .into_iter()
            .map(|date| date.and_then(|d| d.and_hms_opt(0, 0, 0)))
            .collect(),
    }
}
