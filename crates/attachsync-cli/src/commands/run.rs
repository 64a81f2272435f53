//! `attachsync run` command implementation
//!
//! Validates the configuration, then transfers attachments page by page.

use crate::commands::{connect, validate::print_report};
use crate::config::{RunOptions, TransferConfig};
use crate::error::{CliError, Result};
use crate::sync::{self, RunContext, RunSummary, validate_run};
use colored::Colorize;
use std::path::Path;
use tracing::Dispatch;

/// Run a transfer, sending the run's events to `log`
pub async fn run(config_path: &Path, options: RunOptions, log: Dispatch) -> Result<RunSummary> {
    let config = TransferConfig::load(config_path)?;
    let (source, target) = connect(&config)?;

    println!("{} Validating configuration...", "→".cyan());
    let report = validate_run(&config, source.as_ref(), target.as_ref()).await?;
    print_report(&config, &report);

    let ctx = RunContext::new(config, source, target, options)
        .with_checkpoint(report.checkpoint)
        .with_log(log);

    println!(
        "{} Transferring attachments ({}, page size {})...",
        "→".cyan(),
        ctx.options.dispatch,
        ctx.options.page_size
    );

    let summary = sync::run(&ctx).await;
    print_summary(&summary);

    if summary.is_aborted() {
        return Err(CliError::RunAborted {
            page_number: summary.last_page,
            attempts: ctx.options.retry.max_consecutive_failures,
        });
    }

    Ok(summary)
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("{}", "Summary:".cyan().bold());
    println!("  Pages processed:    {}", summary.pages_processed);
    println!("  Records seen:       {}", summary.records_seen);
    println!("  Records processed:  {}", summary.records_processed);

    if summary.records_skipped() > 0 {
        println!(
            "  Records skipped:    {} (no match value: {}, no match: {}, ambiguous: {}, lookup failed: {})",
            summary.records_skipped().to_string().yellow(),
            summary.skipped_no_match_value,
            summary.skipped_no_match,
            summary.skipped_ambiguous,
            summary.skipped_match_failed
        );
    }

    println!("  Files transferred:  {}", summary.files_transferred.to_string().green());

    if summary.files_failed > 0 {
        println!("  Files failed:       {}", summary.files_failed.to_string().red());
    }

    if summary.checkpoint_failures > 0 {
        println!(
            "  Flag updates failed: {}",
            summary.checkpoint_failures.to_string().yellow()
        );
    }
}
