//! CLI subcommand implementations.

pub mod people;
pub mod policy;
pub mod recap;
pub mod report;
pub mod scan;
pub mod status;
pub mod util;
pub mod whois;
