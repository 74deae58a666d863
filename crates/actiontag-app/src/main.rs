//! `actiontag` binary - composition root.
//!
//! 1. Load configuration from TOML
//! 2. Build the parser from the `[parser]` section
//! 3. Parse model output from a file or stdin
//! 4. Print actions, or dispatch them to staged handlers and print results
//!
//! Logs go to stderr; stdout carries only JSON or the tag listing.

mod cli;
mod dry_run;

use std::io::Read;
use std::path::Path;

use clap::Parser;

use actiontag_core::config::ActionTagConfig;
use actiontag_executor::Executor;
use actiontag_parser::ActionParser;

use cli::{CliArgs, Command};

fn read_input(file: Option<&Path>) -> std::io::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let config_file = args.resolve_config_path();

    // Loaded before tracing so the file's log level can seed the filter.
    let loaded = if config_file.exists() {
        Some(ActionTagConfig::load(&config_file))
    } else {
        None
    };
    let config = match &loaded {
        Some(Ok(config)) => config.clone(),
        _ => ActionTagConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(args.resolve_log_filter(&config.general.log_level))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match loaded {
        Some(Ok(_)) => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(Err(e)) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
        None => tracing::debug!(path = %config_file.display(), "No config file, using defaults"),
    }

    let parser = ActionParser::from_settings(&config.parser);

    match args.command {
        Command::Parse { file } => {
            let input = read_input(file.as_deref())?;
            let actions = parser.parse(&input);
            tracing::info!(count = actions.len(), "Parsed actions");
            println!("{}", serde_json::to_string_pretty(&actions)?);
        }
        Command::Run { file, all } => {
            let input = read_input(file.as_deref())?;
            let actions = parser.parse(&input);

            let mut executor_config = config.executor.clone();
            if all {
                executor_config.one_at_a_time = false;
            }
            let executor = Executor::new(executor_config);
            let results = executor.run(&actions, &dry_run::staged_handlers()).await;
            tracing::info!(
                parsed = actions.len(),
                executed = results.len(),
                "Dry run complete"
            );
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Command::Tags => {
            for config in parser.registry().configs() {
                let phase = if config.pre_strip { "content" } else { "structural" };
                for tag in config.canonical_tags() {
                    println!("{}\t{}", tag, phase);
                }
            }
        }
    }

    Ok(())
}
