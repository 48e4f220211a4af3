//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Studio Shell - extension installation and window session tooling
#[derive(Parser, Debug)]
#[command(name = "studio-shell")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "STUDIO_SHELL_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Install every extension package found in the packages directory
    ///
    /// Examples:
    ///   studio-shell install
    ///   studio-shell install --packages ./dist/extensions --target ./installed
    Install {
        /// Directory of extension packages
        #[arg(long)]
        packages: Option<PathBuf>,

        /// Directory extensions are installed into
        #[arg(long)]
        target: Option<PathBuf>,

        /// Reinstall packages whose version is already installed
        #[arg(long)]
        replace_same: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// List installed extensions
    List {
        /// Directory extensions are installed into
        #[arg(long)]
        target: Option<PathBuf>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// List provisioned instruments
    Instruments {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Compare two extension versions
    Compare {
        /// Left-hand version
        a: String,
        /// Right-hand version
        b: String,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Print the built-in defaults instead
        #[arg(long)]
        default: bool,
    },

    /// Drive a headless window coordinator from JSON-lines commands
    ///
    /// Each line is one command, e.g.
    ///   {"command": "open", "locator": "home"}
    ///   {"command": "host-close", "window": 1}
    ///   {"command": "content", "window": 1, "message": {"type": "ready-to-close"}}
    Session {
        /// Script file; reads stdin when omitted
        #[arg(long)]
        script: Option<PathBuf>,
    },
}
