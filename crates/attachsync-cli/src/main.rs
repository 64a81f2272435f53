//! attachsync CLI - Main entry point

use attachsync_cli::error::{EXIT_INVALID_CONFIG, EXIT_SUCCESS};
use attachsync_cli::{commands, Cli, Commands};
use attachsync_common::logging::{run_output_dir, LogConfig, LogLevel, LogOutput, LogSink};
use clap::error::ErrorKind;
use clap::Parser;
use colored::Colorize;
use std::process;
use tracing::instrument::WithSubscriber;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Pick up API keys and log settings from a local .env file
    let _ = dotenvy::dotenv();

    // Parse command-line arguments; usage errors are configuration errors
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                process::exit(EXIT_INVALID_CONFIG);
            },
        },
    };

    // Handle markdown help generation
    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    // Ensure a command is provided
    let Some(command) = cli.command.as_ref() else {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        process::exit(EXIT_INVALID_CONFIG);
    };

    // Estimates touch no instance and write no run log
    if let Commands::Estimate(args) = command {
        commands::estimate::run(args.into());
        return;
    }

    let sink = match build_log_sink(&cli) {
        Ok(sink) => sink,
        Err(e) => {
            eprintln!("{} Failed to set up logging: {:#}", "✗".red(), e);
            process::exit(EXIT_INVALID_CONFIG);
        },
    };

    let code = execute_command(command, &sink)
        .with_subscriber(sink.dispatch().clone())
        .await;

    if let Some(path) = sink.log_path() {
        println!("Log written to {}", path.display());
    }

    // Flush the file log before exiting
    drop(sink);
    process::exit(code);
}

fn build_log_sink(cli: &Cli) -> anyhow::Result<LogSink> {
    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        cli.log_level
    };

    let config = LogConfig::builder()
        .level(level)
        .file_level(LogLevel::Debug)
        .output(LogOutput::Both)
        .filter_directives("hyper=warn,reqwest=warn")
        .build()
        .merge_env()?;

    // --log-dir wins over LOG_DIR; either way the run gets its own directory
    let base = cli.log_dir.as_deref().unwrap_or(&config.log_dir);
    let log_dir = run_output_dir(base, chrono::Local::now());
    let config = LogConfig { log_dir, ..config };

    LogSink::new(&config)
}

/// Execute the CLI command, returning the process exit status
async fn execute_command(command: &Commands, sink: &LogSink) -> i32 {
    let result = match command {
        Commands::Run(args) => {
            info!(config = %args.config.display(), "attachsync run started");
            commands::run::run(&args.config, args.run_options(), sink.dispatch().clone())
                .await
                .map(|_| ())
        },
        Commands::Validate { config } => commands::validate::run(config).await.map(|_| ()),
        Commands::Estimate(args) => {
            commands::estimate::run(args.into());
            Ok(())
        },
    };

    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            error!(error = %e, exit_code = e.exit_code(), "Command failed");
            eprintln!("{} {}", "Error:".red().bold(), e);
            e.exit_code()
        },
    }
}
