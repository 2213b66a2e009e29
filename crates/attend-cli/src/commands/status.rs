//! Status command for showing registry size and today's activity.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;

use attend_core::{DayBucket, PersonCategory};
use attend_db::Database;

use crate::Config;

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    today: NaiveDate,
) -> Result<()> {
    let bucket = DayBucket::for_date(today);
    let staff = db.count_people(PersonCategory::Staff)?;
    let students = db.count_people(PersonCategory::Student)?;
    let events_today = db.count_events_between(bucket.start, bucket.end)?;

    writeln!(writer, "Attendance tracker status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Default location: {}", config.default_location)?;
    writeln!(writer, "Staff: {staff}")?;
    writeln!(writer, "Students: {students}")?;
    writeln!(writer, "Events today ({today}): {events_today}")?;

    Ok(())
}
