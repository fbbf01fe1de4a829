// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sharesync - inspection and maintenance of the sync engine stores.
//!
//! This is the binary entry point. It loads the layered configuration,
//! opens the engine database and runs one command against it.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod clean;
mod doctor;
mod graph;
mod status;
mod stores;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sharesync_config::SharesyncConfig;

use crate::clean::CleanCommand;
use crate::graph::GraphCommand;

/// Sharesync - inspect and maintain the sync engine stores.
#[derive(Parser, Debug)]
#[command(name = "sharesync", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration and print the effective values.
    Config {
        /// Print as JSON instead of TOML.
        #[arg(long)]
        json: bool,
    },
    /// Check the account and the engine database.
    Doctor {
        /// Also run the SQLite integrity check.
        #[arg(long)]
        deep: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Show queue sizes and blacklisted users.
    Status {
        #[arg(long)]
        json: bool,
        #[arg(long)]
        plain: bool,
    },
    /// Query the share graph.
    Graph {
        #[arg(long, global = true)]
        json: bool,
        #[command(subcommand)]
        command: GraphCommand,
    },
    /// Clear persisted state.
    Clean {
        #[command(subcommand)]
        command: CleanCommand,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => sharesync_config::load_and_validate_path(path),
        None => sharesync_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            sharesync_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.engine.log_level);

    let result = match cli.command {
        Some(Commands::Config { json }) => print_config(&config, json),
        Some(Commands::Doctor { deep, plain }) => doctor::run_doctor(&config, deep, plain).await,
        Some(Commands::Status { json, plain }) => status::run_status(&config, json, plain).await,
        Some(Commands::Graph { json, command }) => graph::run_graph(&config, &command, json).await,
        Some(Commands::Clean { command }) => clean::run_clean(&config, command).await,
        None => {
            println!("sharesync: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn print_config(config: &SharesyncConfig, json: bool) -> Result<(), sharesync_core::SyncError> {
    let rendered = if json {
        serde_json::to_string_pretty(config).map_err(|e| e.to_string())
    } else {
        toml::to_string_pretty(config).map_err(|e| e.to_string())
    };
    let rendered = rendered.map_err(|e| {
        sharesync_core::SyncError::Internal(format!("failed to render configuration: {e}"))
    })?;
    println!("{rendered}");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sharesync={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = sharesync_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.engine.log_level, "info");
        assert_eq!(config.download.failed_attempts_threshold, 6);
    }

    #[test]
    fn cli_parses_graph_query() {
        let cli = Cli::try_parse_from([
            "sharesync",
            "graph",
            "shared-by",
            "alice",
            "--with",
            "bob",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Graph { json, command }) => {
                assert!(json);
                assert_eq!(
                    command,
                    GraphCommand::SharedBy {
                        users: vec!["alice".into()],
                        with: vec!["bob".into()],
                        confirmed: false,
                    }
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_queue_name() {
        let cli = Cli::try_parse_from(["sharesync", "clean", "queue", "failed_share"]).unwrap();
        match cli.command {
            Some(Commands::Clean { command }) => assert_eq!(
                command,
                CleanCommand::Queue {
                    kind: sharesync_core::QueueKind::FailedShare
                }
            ),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_unknown_queue() {
        assert!(Cli::try_parse_from(["sharesync", "clean", "queue", "outbox"]).is_err());
    }

    #[test]
    fn config_renders_as_toml() {
        let config = SharesyncConfig::default();
        assert!(print_config(&config, false).is_ok());
        assert!(print_config(&config, true).is_ok());
    }
}
