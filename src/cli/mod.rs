//! CLI module for catalog-migrate.
//!
//! Subcommands:
//! - `list`: Show the registered migration steps
//! - `run`: Run named steps (or all of them) against the configured store

mod list;
mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// catalog-migrate - Catalog data migrations
#[derive(Parser)]
#[command(name = "catalog-migrate")]
#[command(about = "Bulk document migrations for the data catalog")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file layered over the user and project configs
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the migration steps in registration order
    List,

    /// Run migration steps in the order given
    Run {
        /// Step ids, e.g. m001_file_job_id_defaults
        #[arg(required_unless_present = "all")]
        steps: Vec<String>,

        /// Run every step in registration order
        #[arg(long, conflicts_with = "steps")]
        all: bool,

        /// Compute and count updates without writing them
        #[arg(long)]
        dry_run: bool,
    },
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> color_eyre::Result<()> {
        match self.command {
            Command::List => self.run_list(),
            Command::Run {
                ref steps,
                all,
                dry_run,
            } => self.run_migration(steps, all, dry_run).await,
        }
    }
}
