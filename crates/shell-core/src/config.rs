//! Shell configuration parsed from `studio-shell.toml`
//!
//! Every section and key is optional; an empty file yields the defaults.
//! Relative paths in `[extensions]` are resolved against the directory of
//! the configuration file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shell_extensions::{DEFAULT_MAX_CONCURRENCY, FixedPolicy};
use shell_window::{CoordinatorConfig, OpenPolicy};

use crate::{Error, Result};

/// Canonical configuration file name.
pub const CONFIG_FILENAME: &str = "studio-shell.toml";

/// Window settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSection {
    /// Locator of the window opened at startup
    pub home_locator: String,
    pub width: u32,
    pub height: u32,
    pub open_policy: OpenPolicy,
    /// Force-close windows that ignore `before-close` after this many
    /// milliseconds. 0 waits indefinitely.
    pub close_grace_period_ms: u64,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            home_locator: "standalone/index.html".to_string(),
            width: 900,
            height: 600,
            open_policy: OpenPolicy::FocusExisting,
            close_grace_period_ms: 0,
        }
    }
}

/// Extension installation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionsSection {
    /// Directory holding one sub-directory per available package
    pub packages_dir: PathBuf,
    /// Directory extensions are installed into
    pub install_dir: PathBuf,
    /// Instrument ledger file
    pub instruments_file: PathBuf,
    pub max_concurrency: usize,
    pub replace_newer: bool,
    pub replace_older: bool,
    pub replace_same: bool,
}

impl Default for ExtensionsSection {
    fn default() -> Self {
        let policy = FixedPolicy::default();
        Self {
            packages_dir: PathBuf::from("resources/extensions"),
            install_dir: PathBuf::from("extensions"),
            instruments_file: PathBuf::from("instruments.toml"),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            replace_newer: policy.replace_newer,
            replace_older: policy.replace_older,
            replace_same: policy.replace_same,
        }
    }
}

/// Complete shell configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Development mode shows the application menu
    pub development: bool,
    pub window: WindowSection,
    pub extensions: ExtensionsSection,
}

impl ShellConfig {
    /// Parse a configuration from TOML content
    ///
    /// # Example
    ///
    /// ```
    /// use shell_core::config::ShellConfig;
    ///
    /// let config = ShellConfig::from_toml(r#"
    /// [window]
    /// open_policy = "always-create"
    ///
    /// [extensions]
    /// replace_same = true
    /// "#).unwrap();
    ///
    /// assert_eq!(config.window.width, 900);
    /// assert!(config.extensions.replace_same);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ShellConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load a configuration file, resolving relative paths against its
    /// directory.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(match path.parent() {
            Some(base) => config.with_base_dir(base),
            None => config,
        })
    }

    /// Like [`ShellConfig::load`], but a missing file yields the defaults
    /// resolved against the file's directory.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(Error::ConfigNotFound { .. }) => {
                tracing::debug!(path = %path.display(), "no configuration file, using defaults");
                let config = Self::default();
                Ok(match path.parent() {
                    Some(base) => config.with_base_dir(base),
                    None => config,
                })
            }
            other => other,
        }
    }

    /// Platform configuration path, e.g. `~/.config/studio-shell/studio-shell.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("studio-shell").join(CONFIG_FILENAME))
    }

    /// Resolve relative extension paths against `base`.
    pub fn with_base_dir(mut self, base: &Path) -> Self {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.extensions.packages_dir);
        resolve(&mut self.extensions.install_dir);
        resolve(&mut self.extensions.instruments_file);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(Error::InvalidConfig {
                reason: "window width and height must be positive".to_string(),
            });
        }
        if self.window.home_locator.trim().is_empty() {
            return Err(Error::InvalidConfig {
                reason: "window.home_locator must not be empty".to_string(),
            });
        }
        if self.extensions.max_concurrency == 0 {
            return Err(Error::InvalidConfig {
                reason: "extensions.max_concurrency must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        let grace = self.window.close_grace_period_ms;
        CoordinatorConfig {
            open_policy: self.window.open_policy,
            default_width: self.window.width,
            default_height: self.window.height,
            close_grace_period: (grace > 0).then(|| Duration::from_millis(grace)),
        }
    }

    pub fn conflict_policy(&self) -> FixedPolicy {
        FixedPolicy {
            replace_newer: self.extensions.replace_newer,
            replace_older: self.extensions.replace_older,
            replace_same: self.extensions.replace_same,
        }
    }
}
