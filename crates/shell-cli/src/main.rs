//! Studio Shell CLI
//!
//! Installs extension packages, inspects installed extensions and
//! instruments, and runs headless window-coordinator sessions.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Control log verbosity (default: `studio_shell=info`)
//! - `STUDIO_SHELL_CONFIG`: Configuration file path

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command else {
        println!("{} Studio Shell CLI", "studio-shell".green().bold());
        println!();
        println!("Run {} for available commands.", "studio-shell --help".cyan());
        return Ok(());
    };

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(execute_command(command, cli.config.as_deref()))
}

/// Logs go to stderr so JSON output on stdout stays clean.
fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "studio_shell={level},shell_core={level},shell_extensions={level},shell_window={level}"
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
    tracing::debug!("Verbose mode enabled");
}

async fn execute_command(command: Commands, config: Option<&std::path::Path>) -> Result<()> {
    match command {
        Commands::Install {
            packages,
            target,
            replace_same,
            json,
        } => {
            let config = commands::load_config(config)?;
            commands::run_install(config, packages, target, replace_same, json).await
        }
        Commands::List { target, json } => {
            let config = commands::load_config(config)?;
            commands::run_list(&config, target, json).await
        }
        Commands::Instruments { json } => {
            let config = commands::load_config(config)?;
            commands::run_instruments(&config, json).await
        }
        Commands::Compare { a, b } => commands::run_compare(&a, &b),
        Commands::Config { default } => {
            if default {
                commands::run_config(&shell_core::ShellConfig::default())
            } else {
                commands::run_config(&commands::load_config(config)?)
            }
        }
        Commands::Session { script } => {
            let config = commands::load_config(config)?;
            commands::run_session(&config, script.as_deref()).await
        }
    }
}
