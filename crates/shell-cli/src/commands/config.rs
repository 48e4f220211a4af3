//! `studio-shell config`

use shell_core::ShellConfig;

use crate::error::Result;

pub fn run_config(config: &ShellConfig) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
