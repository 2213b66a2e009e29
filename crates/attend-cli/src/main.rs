use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use attend_cli::commands::util::now_local;
use attend_cli::commands::{people, policy, recap, report, scan, status, whois};
use attend_cli::{Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(attend_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = attend_db::Database::open(&config.database_path).with_context(|| {
        format!("failed to open {}", config.database_path.display())
    })?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut db, config) = open_database(cli.config.as_deref())?;
    let now = now_local();
    let mut stdout = std::io::stdout().lock();

    match command {
        Commands::Scan(args) => scan::run(&mut stdout, &mut db, args, &config, now)?,
        Commands::Whois(args) => whois::run(&mut stdout, &db, args)?,
        Commands::People(action) => people::run(&mut stdout, &mut db, action)?,
        Commands::Policy(action) => policy::run(&mut stdout, &mut db, action)?,
        Commands::Report(args) => report::run(&mut stdout, &db, args, now.date())?,
        Commands::Recap(args) => recap::run(&mut stdout, &db, args, now.date())?,
        Commands::Status => status::run(&mut stdout, &db, &config, now.date())?,
    }

    Ok(())
}
