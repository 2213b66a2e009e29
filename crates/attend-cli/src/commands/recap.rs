//! Recap command: per-person on-time and late counts for the day, month to
//! date, and year to date.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;

use attend_core::{AttendanceEvent, RecapPeriod, RecapSection, ScanCode, date_range_bounds, recap};
use attend_db::Database;

use super::util::parse_date;

#[derive(Debug, Args)]
pub struct RecapArgs {
    /// Reference day (YYYY-MM-DD, defaults to today).
    #[arg(long)]
    pub date: Option<String>,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct RecapData {
    pub date: NaiveDate,
    pub sections: Vec<RecapSection>,
}

/// Loads the year-to-date events and folds them into recap sections.
pub fn generate_recap(db: &Database, reference: NaiveDate) -> Result<RecapData> {
    let (year_start, _) = RecapPeriod::Year.date_range(reference);
    let (start, end) = date_range_bounds(year_start, reference);
    let events: Vec<AttendanceEvent> = db
        .list_events_between(start, end)?
        .into_iter()
        .map(|stored| stored.event)
        .collect();
    let people = db.people_by_code()?;
    tracing::debug!(events = events.len(), %reference, "building recap");

    let name_of = |code: &ScanCode| people.get(code).map(|p| p.name.clone());
    Ok(RecapData {
        date: reference,
        sections: recap(&events, reference, name_of),
    })
}

fn format_section_range(section: &RecapSection) -> String {
    if section.start == section.end {
        section.start.to_string()
    } else {
        format!("{} to {}", section.start, section.end)
    }
}

/// Formats the human-readable recap.
pub fn format_recap(data: &RecapData) -> String {
    let mut output = String::new();
    writeln!(output, "ATTENDANCE RECAP: {}", data.date.format("%A, %b %-d, %Y")).unwrap();

    for section in &data.sections {
        writeln!(output).unwrap();
        writeln!(
            output,
            "{} ({})",
            section.period.label(),
            format_section_range(section)
        )
        .unwrap();

        if section.people.is_empty() {
            writeln!(output, "  No events.").unwrap();
            continue;
        }

        writeln!(output, "  {:<24}  {:>7}  {:>4}", "Name", "On time", "Late").unwrap();
        for (name, tally) in &section.people {
            writeln!(output, "  {:<24}  {:>7}  {:>4}", name, tally.on_time, tally.late).unwrap();
        }
    }

    output
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    args: &RecapArgs,
    today: NaiveDate,
) -> Result<()> {
    let reference = args.date.as_deref().map(parse_date).transpose()?.unwrap_or(today);
    let data = generate_recap(db, reference)?;

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&data)?)?;
    } else {
        write!(writer, "{}", format_recap(&data))?;
    }
    Ok(())
}
