//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{CellsCommand, HistoryCommand, ListCommand, RunCommand, ValidateCommand};

/// Matrix-aware CI workflow executor
#[derive(Debug, Parser, Clone)]
#[command(name = "gantry")]
#[command(author = "Gantry Contributors")]
#[command(version = "0.1.0")]
#[command(about = "A matrix-aware CI workflow executor", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a workflow
    Run(RunCommand),

    /// Validate a workflow definition
    Validate(ValidateCommand),

    /// Show the expanded matrix cells of a workflow's jobs
    Cells(CellsCommand),

    /// Show run history
    History(HistoryCommand),

    /// List workflows with recorded runs
    List(ListCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

use std::ffi::OsString;
