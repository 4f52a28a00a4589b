//! rowlog CLI
//!
//! Command-line tools for stored history logs.
//!
//! # Commands
//!
//! - `inspect` - Display log statistics
//! - `verify` - Check that a log decodes and replays
//! - `show` - Print the record as of a version or timestamp
//! - `diff` - Print the changes between two versions
//! - `compact` - Apply a retention policy to a log

mod commands;
mod json;

use clap::{ArgGroup, Parser, Subcommand};
use commands::compact::CompactOptions;
use rowlog_core::VersionSelector;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// rowlog command-line history tools.
#[derive(Parser)]
#[command(name = "rowlog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the stored log file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display log statistics
    Inspect {
        /// List every retained entry
        #[arg(short, long)]
        entries: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check that the log decodes, re-encodes and replays
    Verify {
        /// Live record (JSON) to compare with the newest state
        #[arg(long)]
        current: Option<PathBuf>,
    },

    /// Print the record as of a version or timestamp
    #[command(group(ArgGroup::new("target").required(true).args(["number", "at"])))]
    Show {
        /// Version number
        #[arg(long = "version", value_name = "N")]
        number: Option<u64>,

        /// Timestamp in milliseconds since the Unix epoch
        #[arg(long)]
        at: Option<i64>,

        /// Live record (JSON), used for the current version
        #[arg(long)]
        current: Option<PathBuf>,
    },

    /// Print the changes between two versions
    Diff {
        /// Starting version
        #[arg(long)]
        from: u64,

        /// Ending version
        #[arg(long)]
        to: u64,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Apply a retention policy to the log
    Compact {
        /// Keep at most this many entries
        #[arg(long)]
        max_entries: Option<u32>,

        /// Drop entries older than this, relative to the newest entry
        #[arg(long)]
        max_age_secs: Option<u64>,

        /// Drop old entries while the log is larger than this
        #[arg(long)]
        max_bytes: Option<usize>,

        /// Redact the value at this path (repeatable)
        #[arg(long)]
        redact: Vec<String>,

        /// Discard the baseline instead of folding dropped entries into it
        #[arg(long)]
        drop_baseline: bool,

        /// Dry run - show what would be done
        #[arg(short, long)]
        dry_run: bool,

        /// Write the result here instead of replacing the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { entries, format } => {
            let path = cli.path.ok_or("Log path required for inspect")?;
            commands::inspect::run(&path, entries, &format)?;
        }
        Commands::Verify { current } => {
            let path = cli.path.ok_or("Log path required for verify")?;
            commands::verify::run(&path, current.as_deref())?;
        }
        Commands::Show {
            number,
            at,
            current,
        } => {
            let path = cli.path.ok_or("Log path required for show")?;
            let selector = match (number, at) {
                (Some(number), _) => VersionSelector::ByVersion(number),
                (None, Some(at)) => VersionSelector::ByTimestamp(at),
                (None, None) => return Err("either --version or --at is required".into()),
            };
            commands::show::run(&path, selector, current.as_deref())?;
        }
        Commands::Diff { from, to, format } => {
            let path = cli.path.ok_or("Log path required for diff")?;
            commands::diff::run(&path, from, to, &format)?;
        }
        Commands::Compact {
            max_entries,
            max_age_secs,
            max_bytes,
            redact,
            drop_baseline,
            dry_run,
            output,
        } => {
            let path = cli.path.ok_or("Log path required for compact")?;
            let options = CompactOptions {
                max_entries,
                max_age_secs,
                max_bytes,
                redact,
                drop_baseline,
            };
            commands::compact::run(&path, &options, dry_run, output.as_deref())?;
        }
        Commands::Version => {
            println!("rowlog CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("rowlog core v{}", rowlog_core::VERSION);
        }
    }

    Ok(())
}
