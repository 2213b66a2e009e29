//! Scan command: classify a scanned code and record the event.

use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::NaiveDateTime;
use clap::Args;

use attend_core::{Rejection, ScanCode, ScanError, ScanOutcome, ScanRequest, ValidationError};
use attend_db::Database;

use super::util::parse_local_datetime;
use crate::Config;

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Scanned barcode value.
    pub code: String,
    /// Where the scanner is installed (defaults to the configured location).
    #[arg(short, long)]
    pub location: Option<String>,
    /// Scan time, e.g. "2025-03-03T07:00" or "2 hours ago" (defaults to now).
    #[arg(long)]
    pub at: Option<String>,
    /// Note stored with the event.
    #[arg(long)]
    pub note: Option<String>,
    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Formats a recorded scan as a one-line confirmation.
pub fn format_outcome(outcome: &ScanOutcome) -> String {
    format!(
        "{} {} - {} {} at {} on {} ({})",
        outcome.person.category.label(),
        outcome.person.name,
        outcome.kind.as_str(),
        outcome.status.label(),
        outcome.at.format("%H:%M:%S"),
        outcome.at.format("%Y-%m-%d"),
        outcome.location,
    )
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    args: &ScanArgs,
    config: &Config,
    now: NaiveDateTime,
) -> Result<()> {
    let at = match &args.at {
        Some(at) => parse_local_datetime(at, now)?,
        None => now,
    };
    let result = match ScanCode::new(args.code.as_str()) {
        Ok(code) => {
            let location = args.location.as_deref().unwrap_or(&config.default_location);
            let request = ScanRequest::new(code, at)
                .with_location(location)
                .with_note(args.note.as_deref());
            db.record_scan(request)
        }
        // No registered code contains whitespace, so a non-blank code that
        // fails validation is simply unknown.
        Err(ValidationError::Whitespace { .. }) => {
            tracing::warn!(code = %args.code, "rejected scan for unknown code");
            Err(Rejection::UnknownCode.into())
        }
        Err(err) => return Err(err).context("invalid scan code"),
    };

    match result {
        Ok(outcome) => {
            if args.json {
                writeln!(writer, "{}", serde_json::to_string_pretty(&outcome.receipt())?)?;
            } else {
                writeln!(writer, "{}", format_outcome(&outcome))?;
            }
            Ok(())
        }
        Err(ScanError::Rejected(rejection)) => {
            if args.json {
                writeln!(
                    writer,
                    "{}",
                    serde_json::to_string_pretty(&rejection.receipt())?
                )?;
            }
            bail!("scan rejected: {rejection}")
        }
        Err(err @ ScanError::Store(_)) => Err(err).context("failed to record scan"),
    }
}
