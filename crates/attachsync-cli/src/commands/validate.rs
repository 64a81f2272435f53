//! `attachsync validate` command implementation
//!
//! Checks a configuration file against the live instances without
//! transferring anything.

use crate::commands::connect;
use crate::config::TransferConfig;
use crate::error::Result;
use crate::sync::{validate_run, ValidationReport};
use colored::Colorize;
use std::path::Path;

/// Validate the configuration at `config_path`
pub async fn run(config_path: &Path) -> Result<ValidationReport> {
    println!("{} Loading {}...", "→".cyan(), config_path.display());
    let config = TransferConfig::load(config_path)?;
    println!(
        "{} Configuration parsed ({} field mapping(s))",
        "✓".green(),
        config.mappings.len()
    );

    let (source, target) = connect(&config)?;
    let report = validate_run(&config, source.as_ref(), target.as_ref()).await?;

    print_report(&config, &report);
    Ok(report)
}

pub(crate) fn print_report(config: &TransferConfig, report: &ValidationReport) {
    println!(
        "{} Source match field: {} ({}) in app {}",
        "✓".green(),
        report.source_match_field.name.bold(),
        report.source_match_field.field_type,
        config.source_app_id
    );
    println!(
        "{} Target match field: {} ({}) in app {}",
        "✓".green(),
        report.target_match_field.name.bold(),
        report.target_match_field.field_type,
        config.target_app_id
    );

    match &report.checkpoint {
        Some(checkpoint) => {
            println!(
                "{} Flag field {}: process = {}, processed = {}",
                "✓".green(),
                checkpoint.flag_field_id,
                checkpoint.process_value_id,
                checkpoint.processed_value_id
            );
        },
        None => {
            println!(
                "{} No flag field configured; every source record will be processed",
                "!".yellow()
            );
        },
    }

    for mapping in config.mappings.iter() {
        println!("  Field {} → {}", mapping.source, mapping.target);
    }
}
