//! Error types for shell-core

use std::path::PathBuf;

/// Result type for shell-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in shell-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration file not found at expected path
    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parsed but holds unusable values
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // Transparent wrappers for underlying crate errors
    /// Window coordination error from shell-window
    #[error(transparent)]
    Window(#[from] shell_window::Error),

    /// Extension error from shell-extensions
    #[error(transparent)]
    Extensions(#[from] shell_extensions::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}
