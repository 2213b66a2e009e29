//! Whois command: resolve a scan code without recording anything.

use std::io::Write;

use anyhow::{Context, Result, bail};
use clap::Args;

use attend_core::{ScanCode, resolve};
use attend_db::Database;

use super::people::format_person;

#[derive(Debug, Args)]
pub struct WhoisArgs {
    /// Scan code to look up.
    pub code: String,
    /// Print the person as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, db: &Database, args: &WhoisArgs) -> Result<()> {
    let code = ScanCode::new(args.code.as_str()).context("invalid scan code")?;
    let Some(person) = resolve(db, &code)? else {
        bail!("scan code not registered: {code}");
    };

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&person)?)?;
    } else {
        write!(writer, "{}", format_person(&person))?;
    }
    Ok(())
}
