//! attachsync CLI Library
//!
//! Copies file attachments from records in one record-management instance to
//! the matching records in another.
//!
//! # Overview
//!
//! Source and target records are linked by a business key: the value of a
//! match field on each side. For every source record the tool finds the one
//! target record with the same key, copies each internally stored file of the
//! mapped attachment fields, and optionally flags the source record as
//! processed so a re-run skips it.
//!
//! - **Transfer**: run a configured transfer (`attachsync run`)
//! - **Validation**: check match and flag fields before a run (`attachsync validate`)
//! - **Planning**: estimate the API requests a run will make (`attachsync estimate`)

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod sync;

// Re-export commonly used types
pub use config::{RunOptions, TransferConfig};
pub use error::{CliError, Result};

use attachsync_common::logging::LogLevel;
use clap::{Args, Parser, Subcommand};
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// attachsync - attachment transfer between record-management instances
#[derive(Parser, Debug)]
#[command(name = "attachsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose console output (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimum level of console log output
    #[arg(long, global = true, env = "ATTACHSYNC_LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Directory receiving the `<yyyyMMddHHmm>-output/log.json` run log
    /// [default: `LOG_DIR`, else the working directory]
    #[arg(long, global = true, env = "ATTACHSYNC_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Print the CLI reference as markdown
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transfer attachments from source records to matching target records
    Run(RunArgs),

    /// Check a configuration file against the source and target instances
    Validate {
        /// Path to the configuration file (JSON, or YAML by extension)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Estimate the number of API requests a run will make
    Estimate(EstimateArgs),
}

/// Options for `attachsync run`
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the configuration file (JSON, or YAML by extension)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Source records fetched per page
    #[arg(long, default_value_t = config::DEFAULT_PAGE_SIZE,
          value_parser = clap::value_parser!(u32).range(1..=config::MAX_PAGE_SIZE as i64))]
    pub page_size: u32,

    /// Stop after this many pages
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub page_limit: Option<u32>,

    /// Process records, fields and files concurrently
    #[arg(short, long)]
    pub parallel: bool,

    /// Bound concurrent work at each level (implies --parallel)
    #[arg(long)]
    pub max_concurrency: Option<NonZeroUsize>,

    /// Base delay before retrying a failed page fetch, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub retry_delay_ms: u64,
}

impl RunArgs {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            page_size: self.page_size,
            page_limit: self.page_limit,
            dispatch: sync::DispatchPolicy::from_flags(self.parallel, self.max_concurrency),
            retry: sync::RetryPolicy::with_base_delay(std::time::Duration::from_millis(
                self.retry_delay_ms,
            )),
        }
    }
}

/// Options for `attachsync estimate`
#[derive(Args, Debug)]
pub struct EstimateArgs {
    /// Number of source records to transfer
    #[arg(long)]
    pub records: u64,

    /// Mapped attachment fields per record
    #[arg(long, default_value_t = 1)]
    pub fields: u64,

    /// Files per attachment field
    #[arg(long, default_value_t = 1)]
    pub files_per_field: u64,

    /// Source records fetched per page
    #[arg(long, default_value_t = config::DEFAULT_PAGE_SIZE as u64,
          value_parser = clap::value_parser!(u64).range(1..=config::MAX_PAGE_SIZE as u64))]
    pub page_size: u64,

    /// Include flag field validation and per-record flag updates
    #[arg(long)]
    pub checkpoint: bool,
}

impl From<&EstimateArgs> for commands::estimate::EstimateInput {
    fn from(args: &EstimateArgs) -> Self {
        Self {
            records: args.records,
            fields_per_record: args.fields,
            files_per_field: args.files_per_field,
            page_size: args.page_size,
            checkpoint: args.checkpoint,
        }
    }
}
