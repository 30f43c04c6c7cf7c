//! Read-only reductions over an enriched dataset restricted to a date window.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::record::{EnrichedDataset, EnrichedRecord, UNDEFINED_LABEL};

/// Number of natures kept for the nature chart and the nature × perimeter matrix
pub const DEFAULT_TOP_NATURES: usize = 10;

/// Inclusive calendar window; `end` covers its whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self::new(day, day)
    }

    /// `[start 00:00, end + 1 day 00:00)`
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        let lower = self.start.and_time(NaiveTime::MIN);
        match self.end.checked_add_days(Days::new(1)) {
            Some(next) => timestamp >= lower && timestamp < next.and_time(NaiveTime::MIN),
            None => timestamp >= lower,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Count {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossCount {
    pub nature: String,
    pub perimeter: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekdayCount {
    pub index: u32,
    pub name: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourlyCount {
    pub hour: u32,
    pub count: usize,
}

/// Everything the presentation layer needs for one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub range: DateRange,
    pub total: usize,
    pub dominant_nature: Option<String>,
    pub dominant_perimeter: Option<String>,
    pub top_natures: Vec<Count>,
    pub perimeters: Vec<Count>,
    pub nature_perimeter: Vec<CrossCount>,
    pub classified_total: usize,
    pub subcategories: Vec<Count>,
    pub daily: Vec<DailyCount>,
    pub weekdays: Vec<WeekdayCount>,
    pub hours: Vec<HourlyCount>,
}

/// Descending count, ties broken by ascending label.
fn frequency<'a, I>(labels: I) -> Vec<Count>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }
    let mut result: Vec<Count> = counts
        .into_iter()
        .map(|(label, count)| Count {
            label: label.to_string(),
            count,
        })
        .collect();
    // stable sort keeps the label order from the BTreeMap among equal counts
    result.sort_by(|a, b| b.count.cmp(&a.count));
    result
}

/// Upper-cases the first letter of every word and lower-cases the rest. Any
/// non-alphabetic character starts a new word.
fn title_case(label: &str) -> String {
    let mut result = String::with_capacity(label.len());
    let mut word_start = true;
    for c in label.chars() {
        if c.is_alphabetic() {
            if word_start {
                result.extend(c.to_uppercase());
            } else {
                result.extend(c.to_lowercase());
            }
            word_start = false;
        } else {
            result.push(c);
            word_start = true;
        }
    }
    result
}

/// Records of a dataset that fall inside a [`DateRange`].
pub struct FilteredView<'a> {
    dataset: &'a EnrichedDataset,
    range: DateRange,
    records: Vec<&'a EnrichedRecord>,
}

impl<'a> FilteredView<'a> {
    pub fn new(dataset: &'a EnrichedDataset, range: DateRange) -> Self {
        let records = dataset
            .records
            .iter()
            .filter(|r| range.contains(r.timestamp))
            .collect();
        Self {
            dataset,
            range,
            records,
        }
    }

    /// Whole dataset, or `None` when it is empty.
    pub fn full(dataset: &'a EnrichedDataset) -> Option<Self> {
        let (start, end) = dataset.date_bounds()?;
        Some(Self::new(dataset, DateRange::new(start, end)))
    }

    pub fn dataset(&self) -> &'a EnrichedDataset {
        self.dataset
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn records(&self) -> &[&'a EnrichedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn nature_counts(&self) -> Vec<Count> {
        frequency(self.records.iter().map(|r| r.nature.as_str()))
    }

    pub fn top_natures(&self, n: usize) -> Vec<Count> {
        let mut counts = self.nature_counts();
        counts.truncate(n);
        counts
    }

    /// Perimeter frequencies in title case, without the undefined sentinel.
    /// Labels differing only in case are counted together.
    pub fn perimeter_counts(&self) -> Vec<Count> {
        let labels: Vec<String> = self
            .records
            .iter()
            .map(|r| r.perimeter.as_str())
            .filter(|p| *p != UNDEFINED_LABEL)
            .map(title_case)
            .collect();
        frequency(labels.iter().map(String::as_str))
    }

    /// Counts per (nature, perimeter) for the `top_n` most frequent natures and
    /// defined perimeters. Natures keep their rank order, perimeters are sorted.
    pub fn nature_perimeter_matrix(&self, top_n: usize) -> Vec<CrossCount> {
        let mut matrix: IndexMap<String, BTreeMap<&str, usize>> = self
            .top_natures(top_n)
            .into_iter()
            .map(|c| (c.label, BTreeMap::new()))
            .collect();

        for record in &self.records {
            if record.perimeter == UNDEFINED_LABEL {
                continue;
            }
            if let Some(row) = matrix.get_mut(&record.nature) {
                *row.entry(record.perimeter.as_str()).or_default() += 1;
            }
        }

        matrix
            .into_iter()
            .flat_map(|(nature, row)| {
                row.into_iter().map(move |(perimeter, count)| CrossCount {
                    nature: nature.clone(),
                    perimeter: perimeter.to_string(),
                    count,
                })
            })
            .collect()
    }

    /// Subcategory frequencies of records that were actually classified.
    pub fn subcategory_counts(&self) -> Vec<Count> {
        frequency(
            self.records
                .iter()
                .filter(|r| r.subcategory.is_classified())
                .map(|r| r.subcategory.label()),
        )
    }

    pub fn daily_counts(&self) -> Vec<DailyCount> {
        let mut days: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for record in &self.records {
            *days.entry(record.date).or_default() += 1;
        }
        days.into_iter()
            .map(|(date, count)| DailyCount { date, count })
            .collect()
    }

    pub fn weekday_counts(&self) -> Vec<WeekdayCount> {
        let mut days: BTreeMap<u32, (&'static str, usize)> = BTreeMap::new();
        for record in &self.records {
            days.entry(record.weekday_index)
                .or_insert((record.weekday_name, 0))
                .1 += 1;
        }
        days.into_iter()
            .map(|(index, (name, count))| WeekdayCount { index, name, count })
            .collect()
    }

    pub fn hourly_counts(&self) -> Vec<HourlyCount> {
        let mut hours: HashMap<u32, usize> = HashMap::new();
        for record in &self.records {
            *hours.entry(record.hour).or_default() += 1;
        }
        let mut result: Vec<HourlyCount> = hours
            .into_iter()
            .map(|(hour, count)| HourlyCount { hour, count })
            .collect();
        result.sort_by_key(|h| h.hour);
        result
    }

    /// Most frequent nature; ties go to the smallest label.
    pub fn dominant_nature(&self) -> Option<String> {
        self.nature_counts().into_iter().next().map(|c| c.label)
    }

    /// Most frequent perimeter, the undefined sentinel included.
    pub fn dominant_perimeter(&self) -> Option<String> {
        frequency(self.records.iter().map(|r| r.perimeter.as_str()))
            .into_iter()
            .next()
            .map(|c| c.label)
    }

    pub fn summarize(&self, top_n: usize) -> Report {
        let subcategories = self.subcategory_counts();
        Report {
            range: self.range,
            total: self.len(),
            dominant_nature: self.dominant_nature(),
            dominant_perimeter: self.dominant_perimeter(),
            top_natures: self.top_natures(top_n),
            perimeters: self.perimeter_counts(),
            nature_perimeter: self.nature_perimeter_matrix(top_n),
            classified_total: subcategories.iter().map(|c| c.count).sum(),
            subcategories,
            daily: self.daily_counts(),
            weekdays: self.weekday_counts(),
            hours: self.hourly_counts(),
        }
    }
}
