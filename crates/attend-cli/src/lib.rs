//! Attendance tracker CLI library.
//!
//! This crate provides the CLI interface for recording barcode scans and
//! managing the people, policy, and reports behind them.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
