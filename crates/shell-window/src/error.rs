/// Errors raised by the window coordinator.
///
/// Operations on an unknown window id are logged no-ops, reported through
/// [`CloseDecision::Unknown`](crate::CloseDecision) or a `false` return.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The window host could not create a surface.
    #[error("failed to create window for '{locator}': {reason}")]
    HostCreationFailed { locator: String, reason: String },

    /// The last window was closed and the process is terminating.
    #[error("the shell is terminating")]
    Terminated,

    /// The coordinator command loop is no longer running.
    #[error("coordinator service has stopped")]
    ServiceStopped,

    /// A content message could not be decoded.
    #[error("invalid content message: {0}")]
    InvalidMessage(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
