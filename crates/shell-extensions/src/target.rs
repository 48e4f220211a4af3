//! Where installed extensions live.
//!
//! Installation is two-phase: [`InstallTarget::stage`] prepares a complete
//! copy of the package next to the installed extensions, and
//! [`InstallTarget::commit`] swaps it into place. The previously installed
//! package is never touched before staging succeeded.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::manifest::ExtensionManifest;
use crate::store::ExtensionCandidate;

/// Install receipt written into every installed extension directory.
pub const RECEIPT_FILENAME: &str = ".install.toml";

/// Staging area below the install root.
const STAGING_DIR: &str = ".staging";

/// An extension currently installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledExtension {
    pub manifest: ExtensionManifest,
    pub location: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl InstalledExtension {
    pub fn id(&self) -> &str {
        &self.manifest.id
    }

    pub fn version(&self) -> &str {
        &self.manifest.version
    }
}

/// A fully prepared package awaiting [`InstallTarget::commit`].
#[derive(Debug, Clone)]
pub struct StagedPackage {
    pub candidate: ExtensionCandidate,
    pub staging_path: PathBuf,
}

/// Storage for installed extensions.
#[async_trait]
pub trait InstallTarget: Send + Sync {
    /// Installed extension with this id, if any.
    async fn installed(&self, id: &str) -> Result<Option<InstalledExtension>>;

    /// All installed extensions, sorted by id.
    async fn list(&self) -> Result<Vec<InstalledExtension>>;

    /// Copy the candidate into a private staging location.
    async fn stage(&self, candidate: &ExtensionCandidate) -> Result<StagedPackage>;

    /// Make a staged package the installed one, replacing any previous
    /// installation of the same id.
    async fn commit(&self, staged: StagedPackage) -> Result<InstalledExtension>;

    /// Throw away a staged package.
    async fn discard(&self, staged: StagedPackage) -> Result<()>;
}

/// On-disk receipt contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Receipt {
    extension: ExtensionManifest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    checksum: Option<String>,
    source: PathBuf,
}

/// Install target storing each extension at `<root>/<id>/`.
#[derive(Debug, Clone)]
pub struct DirectoryInstallTarget {
    root: PathBuf,
}

impl DirectoryInstallTarget {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn location_for(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    fn read_installed(location: &Path) -> Result<Option<InstalledExtension>> {
        if !location.is_dir() {
            return Ok(None);
        }

        let receipt_path = location.join(RECEIPT_FILENAME);
        if receipt_path.is_file() {
            let content = shell_fs::io::read_text(&receipt_path)?;
            let receipt: Receipt = toml::from_str(&content).map_err(|e| {
                Error::malformed(receipt_path.display().to_string(), e.message())
            })?;
            return Ok(Some(InstalledExtension {
                manifest: receipt.extension,
                location: location.to_path_buf(),
                checksum: receipt.checksum,
            }));
        }

        // Placed by hand, without a receipt.
        let manifest = ExtensionManifest::from_package(location)?;
        Ok(Some(InstalledExtension {
            manifest,
            location: location.to_path_buf(),
            checksum: None,
        }))
    }

    fn stage_blocking(root: &Path, candidate: &ExtensionCandidate) -> Result<StagedPackage> {
        let id = candidate.id();
        let staging_path = root
            .join(STAGING_DIR)
            .join(format!("{}-{}", id, uuid::Uuid::new_v4()));

        let staged = StagedPackage {
            candidate: candidate.clone(),
            staging_path: staging_path.clone(),
        };
        if let Err(e) = Self::fill_staging(&staging_path, candidate) {
            let _ = shell_fs::dir::remove_dir_if_exists(&staging_path);
            return Err(e);
        }
        Ok(staged)
    }

    fn fill_staging(staging_path: &Path, candidate: &ExtensionCandidate) -> Result<()> {
        let id = candidate.id();
        shell_fs::dir::copy_dir_all(&candidate.source_path, staging_path)
            .map_err(|e| Error::staging(id, e))?;

        let staged_manifest =
            ExtensionManifest::from_package(staging_path).map_err(|e| Error::staging(id, e))?;
        if staged_manifest.id != id || staged_manifest.version != candidate.manifest.version {
            return Err(Error::staging(
                id,
                format!(
                    "package changed while staging: found {} {}",
                    staged_manifest.id, staged_manifest.version
                ),
            ));
        }

        if let Some(expected) = &candidate.checksum {
            let actual = shell_fs::checksum::compute_dir_checksum(staging_path, &[RECEIPT_FILENAME])
                .map_err(|e| Error::staging(id, e))?;
            if &actual != expected {
                return Err(Error::staging(
                    id,
                    format!("checksum mismatch: expected {expected}, staged {actual}"),
                ));
            }
        }

        let receipt = Receipt {
            extension: candidate.manifest.clone(),
            checksum: candidate.checksum.clone(),
            source: candidate.source_path.clone(),
        };
        let content = toml::to_string_pretty(&receipt).map_err(|e| Error::staging(id, e))?;
        shell_fs::io::write_text(&staging_path.join(RECEIPT_FILENAME), &content)
            .map_err(|e| Error::staging(id, e))?;
        Ok(())
    }
}

#[async_trait]
impl InstallTarget for DirectoryInstallTarget {
    async fn installed(&self, id: &str) -> Result<Option<InstalledExtension>> {
        let location = self.location_for(id);
        run_blocking(move || Self::read_installed(&location)).await
    }

    async fn list(&self) -> Result<Vec<InstalledExtension>> {
        let root = self.root.clone();
        run_blocking(move || {
            if !root.exists() {
                return Ok(Vec::new());
            }
            let mut installed = Vec::new();
            for entry in fs::read_dir(&root)? {
                let entry = entry?;
                if entry.file_name().to_string_lossy().starts_with('.') {
                    continue;
                }
                match Self::read_installed(&entry.path()) {
                    Ok(Some(extension)) => installed.push(extension),
                    Ok(None) => {}
                    Err(error) => {
                        tracing::warn!(path = %entry.path().display(), %error, "unreadable installed extension");
                    }
                }
            }
            installed.sort_by(|a, b| a.manifest.id.cmp(&b.manifest.id));
            Ok(installed)
        })
        .await
    }

    async fn stage(&self, candidate: &ExtensionCandidate) -> Result<StagedPackage> {
        let root = self.root.clone();
        let candidate = candidate.clone();
        run_blocking(move || Self::stage_blocking(&root, &candidate)).await
    }

    async fn commit(&self, staged: StagedPackage) -> Result<InstalledExtension> {
        let location = self.location_for(staged.candidate.id());
        run_blocking(move || {
            let id = staged.candidate.id();
            shell_fs::dir::swap_dir(&staged.staging_path, &location)
                .map_err(|e| Error::staging(id, e))?;
            tracing::debug!(id, location = %location.display(), "committed staged package");
            Ok(InstalledExtension {
                manifest: staged.candidate.manifest.clone(),
                location,
                checksum: staged.candidate.checksum.clone(),
            })
        })
        .await
    }

    async fn discard(&self, staged: StagedPackage) -> Result<()> {
        run_blocking(move || {
            shell_fs::dir::remove_dir_if_exists(&staged.staging_path)?;
            Ok(())
        })
        .await
    }
}

pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?
}
