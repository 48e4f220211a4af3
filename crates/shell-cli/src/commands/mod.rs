//! Command implementations for studio-shell

pub mod compare;
pub mod config;
pub mod install;
pub mod session;

use std::path::Path;

use shell_core::ShellConfig;

use crate::error::Result;

pub use compare::run_compare;
pub use config::run_config;
pub use install::{run_install, run_instruments, run_list};
pub use session::run_session;

/// Resolve the configuration for a command.
///
/// An explicit path must exist. Otherwise the platform config file is used
/// when present, falling back to the defaults resolved against the current
/// directory.
pub fn load_config(path: Option<&Path>) -> Result<ShellConfig> {
    if let Some(path) = path {
        return Ok(ShellConfig::load(path)?);
    }
    if let Some(default) = ShellConfig::default_path()
        && default.is_file()
    {
        return Ok(ShellConfig::load(&default)?);
    }
    let cwd = std::env::current_dir()?;
    Ok(ShellConfig::default().with_base_dir(&cwd))
}
