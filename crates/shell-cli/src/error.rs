//! Error types for shell-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from shell-core
    #[error(transparent)]
    Core(#[from] shell_core::Error),

    /// Error from shell-extensions
    #[error(transparent)]
    Extensions(#[from] shell_extensions::Error),

    /// Error from shell-window
    #[error(transparent)]
    Window(#[from] shell_window::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
