//! Read-side folds over the event log: on-time/late tallies per person.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::event::{AttendanceEvent, Timeliness};
use crate::policy::date_range_bounds;
use crate::types::ScanCode;

/// Name reported for events whose code no longer resolves.
pub const UNKNOWN_PERSON: &str = "Unknown";

/// On-time and late counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub on_time: u32,
    pub late: u32,
}

impl Tally {
    pub const fn total(&self) -> u32 {
        self.on_time + self.late
    }

    fn count(&mut self, status: Timeliness) {
        match status {
            Timeliness::OnTime => self.on_time += 1,
            Timeliness::Late => self.late += 1,
        }
    }
}

/// Counts on-time and late events.
pub fn tally<'a, I>(events: I) -> Tally
where
    I: IntoIterator<Item = &'a AttendanceEvent>,
{
    let mut tally = Tally::default();
    for event in events {
        tally.count(event.status);
    }
    tally
}

/// Counts events per resolved person name.
///
/// `name_of` maps a scan code to a display name; codes it cannot resolve
/// are grouped under [`UNKNOWN_PERSON`].
pub fn tally_by_person<'a, I, F>(events: I, name_of: F) -> BTreeMap<String, Tally>
where
    I: IntoIterator<Item = &'a AttendanceEvent>,
    F: Fn(&ScanCode) -> Option<String>,
{
    let mut by_person: BTreeMap<String, Tally> = BTreeMap::new();
    for event in events {
        let name = name_of(&event.code).unwrap_or_else(|| UNKNOWN_PERSON.to_string());
        by_person.entry(name).or_default().count(event.status);
    }
    by_person
}

/// Recap windows, each ending on the reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecapPeriod {
    /// The reference date only.
    Day,
    /// First of the month through the reference date.
    Month,
    /// January 1st through the reference date.
    Year,
}

impl RecapPeriod {
    pub const ALL: [Self; 3] = [Self::Day, Self::Month, Self::Year];

    /// First and last date (inclusive) of the window.
    #[must_use]
    pub fn date_range(self, reference: NaiveDate) -> (NaiveDate, NaiveDate) {
        let first = match self {
            Self::Day => reference,
            Self::Month => reference.with_day(1).unwrap_or(reference),
            Self::Year => reference.with_ordinal(1).unwrap_or(reference),
        };
        (first, reference)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Day => "Today",
            Self::Month => "Month to date",
            Self::Year => "Year to date",
        }
    }
}

/// Per-person tallies for one recap window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecapSection {
    pub period: RecapPeriod,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub people: BTreeMap<String, Tally>,
}

/// Builds day, month-to-date, and year-to-date sections from `events`.
///
/// `events` must cover at least the year-to-date window; anything outside a
/// section's window is ignored by that section.
pub fn recap<F>(events: &[AttendanceEvent], reference: NaiveDate, name_of: F) -> Vec<RecapSection>
where
    F: Fn(&ScanCode) -> Option<String>,
{
    RecapPeriod::ALL
        .into_iter()
        .map(|period| {
            let (start, end) = period.date_range(reference);
            let (from, to) = date_range_bounds(start, end);
            let in_window = events
                .iter()
                .filter(|e| from <= e.timestamp && e.timestamp <= to);
            RecapSection {
                period,
                start,
                end,
                people: tally_by_person(in_window, &name_of),
            }
        })
        .collect()
}
