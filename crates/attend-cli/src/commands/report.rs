//! Report command for listing recorded attendance events.
//!
//! This module implements `attend report` over an inclusive date range with
//! human-readable and JSON output. Events whose code no longer resolves are
//! shown under "Unknown".

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::Args;
use serde::Serialize;

use attend_core::{
    EventKind, Person, PersonCategory, ScanCode, Tally, Timeliness, UNKNOWN_PERSON,
    date_range_bounds, tally,
};
use attend_db::{Database, StoredEvent};

use super::util::parse_date;

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// First day to include (YYYY-MM-DD, defaults to --to).
    #[arg(long)]
    pub from: Option<String>,
    /// Last day to include (YYYY-MM-DD, defaults to today).
    #[arg(long)]
    pub to: Option<String>,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// One event with its resolved person.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub id: i64,
    pub person_name: String,
    pub person_category: Option<PersonCategory>,
    pub code: ScanCode,
    pub kind: EventKind,
    pub timestamp: NaiveDateTime,
    pub status: Timeliness,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Computed report data.
#[derive(Debug)]
pub struct ReportData {
    pub generated_at: DateTime<Utc>,
    pub timezone: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub rows: Vec<ReportRow>,
    pub totals: Tally,
}

// ========== Report Generation ==========

/// Resolves the inclusive date range from the command arguments.
pub fn resolve_range(args: &ReportArgs, today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let to = args.to.as_deref().map(parse_date).transpose()?.unwrap_or(today);
    let from = args.from.as_deref().map(parse_date).transpose()?.unwrap_or(to);
    if from > to {
        bail!("--from ({from}) must not be after --to ({to})");
    }
    Ok((from, to))
}

/// Generates report data from the database.
pub fn generate_report_data(
    db: &Database,
    from: NaiveDate,
    to: NaiveDate,
    generated_at: DateTime<Utc>,
) -> Result<ReportData> {
    let (start, end) = date_range_bounds(from, to);
    let events = db.list_events_between(start, end)?;
    let people = db.people_by_code()?;
    let timezone = iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string());

    let totals = tally(events.iter().map(|stored| &stored.event));
    let rows = events
        .into_iter()
        .map(|stored| report_row(stored, &people))
        .collect();

    Ok(ReportData {
        generated_at,
        timezone,
        from,
        to,
        rows,
        totals,
    })
}

fn report_row(stored: StoredEvent, people: &HashMap<ScanCode, Person>) -> ReportRow {
    let person = people.get(&stored.event.code);
    let event = stored.event;
    ReportRow {
        id: stored.id,
        person_name: person.map_or_else(|| UNKNOWN_PERSON.to_string(), |p| p.name.clone()),
        person_category: person.map(|p| p.category),
        code: event.code,
        kind: event.kind,
        timestamp: event.timestamp,
        status: event.status,
        location: event.location,
        note: event.note,
    }
}

// ========== Human-Readable Output ==========

fn format_range(from: NaiveDate, to: NaiveDate) -> String {
    if from == to {
        from.format("%A, %b %-d, %Y").to_string()
    } else {
        format!("{} to {}", from.format("%b %-d, %Y"), to.format("%b %-d, %Y"))
    }
}

/// Truncates by characters, not bytes, to avoid panics on multi-byte UTF-8.
fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() > width {
        format!("{}...", value.chars().take(width - 3).collect::<String>())
    } else {
        value.to_string()
    }
}

/// Formats the human-readable report output.
pub fn format_report(data: &ReportData) -> String {
    let mut output = String::new();

    writeln!(output, "ATTENDANCE REPORT: {}", format_range(data.from, data.to)).unwrap();
    writeln!(output).unwrap();

    if data.rows.is_empty() {
        writeln!(output, "No events recorded.").unwrap();
        return output;
    }

    writeln!(
        output,
        "{:<19}  {:<20}  {:<8}  {:<9}  {:<7}  Location",
        "Time", "Name", "Category", "Kind", "Status"
    )
    .unwrap();
    for row in &data.rows {
        let category = row.person_category.map_or("-", |c| c.label());
        writeln!(
            output,
            "{:<19}  {:<20}  {:<8}  {:<9}  {:<7}  {}",
            row.timestamp.format("%Y-%m-%d %H:%M:%S"),
            truncate(&row.person_name, 20),
            category,
            row.kind.as_str(),
            row.status.label(),
            row.location
        )
        .unwrap();
    }

    writeln!(output).unwrap();
    writeln!(
        output,
        "Total: {} events, {} on time, {} late",
        data.totals.total(),
        data.totals.on_time,
        data.totals.late
    )
    .unwrap();

    output
}

// ========== JSON Output ==========

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    timezone: &'a str,
    period: JsonPeriod,
    events: &'a [ReportRow],
    totals: JsonTotals,
}

#[derive(Debug, Serialize)]
struct JsonPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Debug, Serialize)]
struct JsonTotals {
    on_time: u32,
    late: u32,
    total: u32,
}

/// Formats report data as JSON.
pub fn format_report_json(data: &ReportData) -> Result<String> {
    let report = JsonReport {
        generated_at: data.generated_at.to_rfc3339(),
        timezone: &data.timezone,
        period: JsonPeriod {
            start: data.from,
            end: data.to,
        },
        events: &data.rows,
        totals: JsonTotals {
            on_time: data.totals.on_time,
            late: data.totals.late,
            total: data.totals.total(),
        },
    };

    Ok(serde_json::to_string_pretty(&report)?)
}

// ========== Public Interface ==========

/// Runs the report command.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    args: &ReportArgs,
    today: NaiveDate,
) -> Result<()> {
    let (from, to) = resolve_range(args, today)?;
    let data = generate_report_data(db, from, to, Utc::now())?;

    if args.json {
        writeln!(writer, "{}", format_report_json(&data)?)?;
    } else {
        write!(writer, "{}", format_report(&data))?;
    }

    Ok(())
}
