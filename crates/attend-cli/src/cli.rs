//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::people::PeopleAction;
use crate::commands::policy::PolicyAction;
use crate::commands::recap::RecapArgs;
use crate::commands::report::ReportArgs;
use crate::commands::scan::ScanArgs;
use crate::commands::whois::WhoisArgs;

/// Barcode attendance tracker.
///
/// Records arrivals and departures for staff and students from scanned
/// codes and flags each one as on time or late.
#[derive(Debug, Parser)]
#[command(name = "attend", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Record a scanned code as an arrival or departure.
    Scan(ScanArgs),

    /// Show who holds a scan code.
    Whois(WhoisArgs),

    /// Manage registered staff and students.
    #[command(subcommand)]
    People(PeopleAction),

    /// Show or change the attendance policy.
    #[command(subcommand)]
    Policy(PolicyAction),

    /// List recorded events for a date range.
    Report(ReportArgs),

    /// Summarize on-time and late counts per person.
    Recap(RecapArgs),

    /// Show database location and today's activity.
    Status,
}
