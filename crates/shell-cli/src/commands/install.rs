//! Extension command implementations.
//!
//! `install` runs the installation engine over the packages directory,
//! `list` shows what is installed and `instruments` shows the instrument
//! ledger.

use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use shell_core::ShellConfig;
use shell_extensions::{
    DirectoryInstallTarget, DirectoryPackageStore, InstallEngine, InstallOutcome, InstallStatus,
    InstallTarget, InstrumentLedger, InstrumentProvision, InstrumentRegistry,
};

use crate::error::{CliError, Result};

/// Handle `studio-shell install`
///
/// Exits with an error when any package failed, after reporting every
/// outcome.
pub async fn run_install(
    mut config: ShellConfig,
    packages: Option<PathBuf>,
    target: Option<PathBuf>,
    replace_same: bool,
    json: bool,
) -> Result<()> {
    if let Some(packages) = packages {
        config.extensions.packages_dir = packages;
    }
    if let Some(target) = target {
        config.extensions.install_dir = target;
    }
    let mut policy = config.conflict_policy();
    policy.replace_same |= replace_same;

    let store = DirectoryPackageStore::new(&config.extensions.packages_dir);
    let engine = InstallEngine::new(
        Arc::new(DirectoryInstallTarget::new(&config.extensions.install_dir)),
        Arc::new(InstrumentLedger::new(&config.extensions.instruments_file)),
    )
    .with_max_concurrency(config.extensions.max_concurrency);

    let report = engine.install_from_store(&store, &policy).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} Installing from {}",
            "=>".blue().bold(),
            config.extensions.packages_dir.display().to_string().cyan()
        );
        for outcome in &report.outcomes {
            print_outcome(outcome);
        }
        println!(
            "   {} installed, {} skipped, {} failed",
            report.installed().count().to_string().green(),
            report.skipped().count().to_string().yellow(),
            report.failed().count().to_string().red()
        );
    }

    match report.failed().count() {
        0 => Ok(()),
        n => Err(CliError::user(format!("{n} package(s) failed to install"))),
    }
}

fn print_outcome(outcome: &InstallOutcome) {
    let version = outcome.version.as_deref().unwrap_or("?");
    let status = match &outcome.status {
        InstallStatus::Installed => "installed".green().to_string(),
        InstallStatus::Replaced { previous } => format!("{} {previous}", "replaced".green()),
        InstallStatus::SkippedOlder { installed } => {
            format!("{} (installed {installed} is newer)", "skipped".yellow())
        }
        InstallStatus::SkippedSame => format!("{} (already installed)", "skipped".yellow()),
        InstallStatus::SkippedNewer { installed } => {
            format!("{} (installed {installed} is older)", "skipped".yellow())
        }
        InstallStatus::Failed(failure) => format!("{} {}", "failed:".red(), failure.message),
    };
    println!("   {} {} {}", outcome.id.cyan(), version.dimmed(), status);

    match &outcome.instrument {
        Some(InstrumentProvision::Created(id)) => {
            println!("     {} {}", "instrument created".dimmed(), id);
        }
        Some(InstrumentProvision::Failed(reason)) => {
            println!("     {} {}", "instrument not provisioned:".yellow(), reason);
        }
        Some(InstrumentProvision::Existing(_)) | None => {}
    }
}

/// Handle `studio-shell list`
pub async fn run_list(config: &ShellConfig, target: Option<PathBuf>, json: bool) -> Result<()> {
    let root = target.unwrap_or_else(|| config.extensions.install_dir.clone());
    let installed = DirectoryInstallTarget::new(&root).list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&installed)?);
        return Ok(());
    }

    if installed.is_empty() {
        println!("No extensions installed in {}", root.display());
        return Ok(());
    }
    for extension in &installed {
        println!(
            "{} {} {}",
            extension.id().cyan(),
            extension.version(),
            format!("({})", extension.manifest.extension_type).dimmed()
        );
    }
    Ok(())
}

/// Handle `studio-shell instruments`
pub async fn run_instruments(config: &ShellConfig, json: bool) -> Result<()> {
    let ledger = InstrumentLedger::new(&config.extensions.instruments_file);
    let instruments = ledger.list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&instruments)?);
        return Ok(());
    }

    if instruments.is_empty() {
        println!("No instruments provisioned");
        return Ok(());
    }
    for record in &instruments {
        println!(
            "{} {} {}",
            record.id.to_string().cyan(),
            record.name,
            format!("[{}]", record.extension_id).dimmed()
        );
    }
    Ok(())
}
