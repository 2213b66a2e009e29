//! Policy commands for viewing and changing the attendance time boundaries.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Result, bail};
use clap::{Args, Subcommand};

use attend_core::AttendancePolicy;
use attend_db::Database;

use super::util::parse_time_of_day;

#[derive(Debug, Subcommand)]
pub enum PolicyAction {
    /// Show the current policy.
    Show {
        /// Print the policy as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Change one or more policy settings.
    Set(SetArgs),
}

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Official opening time (HH:MM).
    #[arg(long)]
    pub opens: Option<String>,
    /// Arrivals after this time are late (HH:MM).
    #[arg(long)]
    pub arrival_end: Option<String>,
    /// Departures after this time are flagged late (HH:MM).
    #[arg(long)]
    pub departure_end: Option<String>,
    /// Whether a departure needs a same-day arrival first.
    #[arg(long)]
    pub require_arrival: Option<bool>,
}

impl SetArgs {
    const fn is_empty(&self) -> bool {
        self.opens.is_none()
            && self.arrival_end.is_none()
            && self.departure_end.is_none()
            && self.require_arrival.is_none()
    }
}

pub fn run<W: Write>(writer: &mut W, db: &mut Database, action: &PolicyAction) -> Result<()> {
    match action {
        PolicyAction::Show { json } => {
            let policy = db.load_or_init_policy()?;
            if *json {
                writeln!(writer, "{}", serde_json::to_string_pretty(&policy)?)?;
            } else {
                write!(writer, "{}", format_policy(&policy))?;
            }
        }
        PolicyAction::Set(args) => {
            if args.is_empty() {
                bail!("nothing to change; pass at least one policy flag");
            }

            let mut policy = db.load_or_init_policy()?;
            if let Some(opens) = &args.opens {
                policy.arrival_window_start = parse_time_of_day(opens)?;
            }
            if let Some(arrival_end) = &args.arrival_end {
                policy.arrival_window_end = parse_time_of_day(arrival_end)?;
            }
            if let Some(departure_end) = &args.departure_end {
                policy.departure_window_end = parse_time_of_day(departure_end)?;
            }
            if let Some(require) = args.require_arrival {
                policy.require_arrival_before_departure = require;
            }
            if policy.arrival_window_start > policy.arrival_window_end {
                tracing::warn!(
                    opens = %policy.arrival_window_start,
                    arrival_end = %policy.arrival_window_end,
                    "opening time is after the arrival boundary"
                );
            }

            db.update_policy(&policy)?;
            writeln!(writer, "Policy updated.")?;
            write!(writer, "{}", format_policy(&policy))?;
        }
    }
    Ok(())
}

/// Formats the policy for display.
pub fn format_policy(policy: &AttendancePolicy) -> String {
    let mut output = String::new();
    let yes_no = if policy.require_arrival_before_departure {
        "yes"
    } else {
        "no"
    };
    let rows = [
        ("Opens:", policy.arrival_window_start.to_string()),
        ("Late arrival after:", policy.arrival_window_end.to_string()),
        ("Late departure after:", policy.departure_window_end.to_string()),
        ("Arrival before departure:", yes_no.to_string()),
    ];
    for (label, value) in rows {
        writeln!(output, "{label:<26}{value}").unwrap();
    }
    output
}
