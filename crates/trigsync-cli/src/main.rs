//! trigsync command-line interface.
//!
//! Binds declared triggers (a JSON declarations file) to a SQLite database
//! and exposes the install/uninstall/status surface plus the `sync`
//! migration flow.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Keep declared database triggers in sync with the live catalog.
#[derive(Parser, Debug)]
#[command(name = "trigsync")]
#[command(version, about = "Declarative trigger management for SQLite")]
pub struct Args {
    /// Path to the SQLite database.
    #[arg(short, long)]
    pub db: PathBuf,

    /// Path to the trigger declarations file (JSON).
    #[arg(short = 'D', long)]
    pub declarations: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install every declared trigger.
    Install,
    /// Uninstall every declared trigger.
    Uninstall,
    /// Print the installation status of every declared trigger.
    Ls,
    /// Drop orphaned triggers that are tagged as ours but no longer declared.
    Prune,
    /// Synthesize operations against the recorded state, apply them, and
    /// record the new state.
    Sync {
        /// Path to the recorded-state file (created if absent).
        #[arg(short, long)]
        state: PathBuf,

        /// Synthesize and record only; run no DDL.
        #[arg(long)]
        no_install: bool,

        /// Bypass migration tracking and install the declared set directly.
        #[arg(long)]
        no_migrations: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trigsync=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = commands::run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
