use std::path::PathBuf;

/// Errors that can occur in the extension system.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Manifest could not be parsed or failed validation.
    #[error("malformed extension manifest ({origin}): {reason}")]
    MalformedManifest { origin: String, reason: String },

    /// Version string is not a dotted numeric version.
    #[error("malformed version '{version}': {reason}")]
    MalformedVersion { version: String, reason: String },

    /// No manifest file in a package directory.
    #[error("extension manifest not found in {0}")]
    ManifestNotFound(PathBuf),

    /// Copying or swapping the package into place failed.
    #[error("staging failed for extension '{id}': {reason}")]
    StagingFailed { id: String, reason: String },

    /// Two discovered packages declare the same id.
    #[error("duplicate package for extension '{id}': kept {kept}, skipped {skipped}")]
    DuplicateCandidate {
        id: String,
        kept: PathBuf,
        skipped: PathBuf,
    },

    /// The instrument registry refused to create an instrument.
    #[error("instrument provisioning failed for extension '{id}': {reason}")]
    InstrumentProvisioning { id: String, reason: String },

    /// Instrument ledger file is unreadable or corrupt.
    #[error("instrument ledger error at {path}: {reason}")]
    Ledger { path: PathBuf, reason: String },

    /// Filesystem helper error.
    #[error(transparent)]
    Fs(#[from] shell_fs::Error),

    /// I/O error reading or writing extension files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedManifest {
            origin: origin.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn staging(id: &str, reason: impl ToString) -> Self {
        Self::StagingFailed {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
