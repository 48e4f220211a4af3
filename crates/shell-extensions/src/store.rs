//! Package discovery.
//!
//! A [`PackageStore`] enumerates package paths and reads their manifests.
//! [`discover`] turns a store into a list of [`ExtensionCandidate`]s with
//! unique ids, reporting every package it had to skip.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::manifest::ExtensionManifest;
use crate::target::RECEIPT_FILENAME;

/// A discovered, not-yet-installed package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionCandidate {
    pub manifest: ExtensionManifest,
    pub source_path: PathBuf,
    /// Integrity fingerprint of the package contents, when the store can
    /// compute one.
    pub checksum: Option<String>,
}

impl ExtensionCandidate {
    pub fn new(manifest: ExtensionManifest, source_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest,
            source_path: source_path.into(),
            checksum: None,
        }
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.manifest.id
    }
}

/// Source of extension packages.
pub trait PackageStore: Send + Sync {
    /// List package paths, in a stable order.
    fn list_packages(&self) -> Result<Vec<PathBuf>>;

    /// Read a package's manifest without loading the package.
    fn read_manifest(&self, package: &Path) -> Result<ExtensionManifest>;

    /// Integrity fingerprint of a package, if supported.
    fn fingerprint(&self, _package: &Path) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Package store backed by a directory whose sub-directories are packages.
#[derive(Debug, Clone)]
pub struct DirectoryPackageStore {
    root: PathBuf,
}

impl DirectoryPackageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PackageStore for DirectoryPackageStore {
    fn list_packages(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            tracing::debug!(root = %self.root.display(), "package directory does not exist");
            return Ok(Vec::new());
        }

        let mut packages = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if !hidden && entry.path().is_dir() {
                packages.push(entry.path());
            }
        }
        packages.sort();
        Ok(packages)
    }

    fn read_manifest(&self, package: &Path) -> Result<ExtensionManifest> {
        ExtensionManifest::from_package(package)
    }

    fn fingerprint(&self, package: &Path) -> Result<Option<String>> {
        let checksum = shell_fs::checksum::compute_dir_checksum(package, &[RECEIPT_FILENAME])?;
        Ok(Some(checksum))
    }
}

/// A package that could not become a candidate.
#[derive(Debug)]
pub struct DiscoveryFailure {
    pub path: PathBuf,
    pub error: Error,
}

/// Result of scanning a [`PackageStore`].
#[derive(Debug, Default)]
pub struct Discovery {
    /// Candidates with pairwise distinct ids, in package order.
    pub candidates: Vec<ExtensionCandidate>,
    pub failures: Vec<DiscoveryFailure>,
}

/// Scan a store and build candidates.
///
/// Unreadable manifests are reported and skipped. When several packages
/// share an id the highest version is kept (the earlier package on ties) and
/// the others are reported as [`Error::DuplicateCandidate`].
pub fn discover(store: &dyn PackageStore) -> Result<Discovery> {
    let mut discovery = Discovery::default();
    let mut by_id: HashMap<String, usize> = HashMap::new();

    for path in store.list_packages()? {
        let candidate = match read_candidate(store, &path) {
            Ok(candidate) => candidate,
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "skipping package");
                discovery.failures.push(DiscoveryFailure { path, error });
                continue;
            }
        };

        let existing = by_id.get(candidate.id()).copied();
        match existing {
            None => {
                by_id.insert(candidate.id().to_string(), discovery.candidates.len());
                discovery.candidates.push(candidate);
            }
            Some(index) => {
                let kept = &mut discovery.candidates[index];
                // Both versions were validated by read_candidate.
                let replace = candidate.manifest.parsed_version()? > kept.manifest.parsed_version()?;
                let (winner, loser) = if replace {
                    let loser = std::mem::replace(kept, candidate);
                    (kept.source_path.clone(), loser.source_path)
                } else {
                    (kept.source_path.clone(), candidate.source_path)
                };
                tracing::warn!(
                    id = %kept.manifest.id,
                    kept = %winner.display(),
                    skipped = %loser.display(),
                    "duplicate extension package"
                );
                discovery.failures.push(DiscoveryFailure {
                    path: loser.clone(),
                    error: Error::DuplicateCandidate {
                        id: kept.manifest.id.clone(),
                        kept: winner,
                        skipped: loser,
                    },
                });
            }
        }
    }

    tracing::debug!(
        candidates = discovery.candidates.len(),
        failures = discovery.failures.len(),
        "package discovery finished"
    );
    Ok(discovery)
}

fn read_candidate(store: &dyn PackageStore, path: &Path) -> Result<ExtensionCandidate> {
    let manifest = store.read_manifest(path)?;
    manifest.parsed_version()?;
    let mut candidate = ExtensionCandidate::new(manifest, path);
    candidate.checksum = store.fingerprint(path)?;
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::MANIFEST_FILENAME;
    use pretty_assertions::assert_eq;

    fn write_package(root: &Path, dir: &str, id: &str, version: &str) -> PathBuf {
        let path = root.join(dir);
        fs::create_dir_all(&path).unwrap();
        fs::write(
            path.join(MANIFEST_FILENAME),
            format!("[extension]\nid = \"{id}\"\nversion = \"{version}\"\ntype = \"instrument\"\n"),
        )
        .unwrap();
        path
    }

    #[test]
    fn test_missing_root_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryPackageStore::new(dir.path().join("absent"));
        assert!(store.list_packages().unwrap().is_empty());
    }

    #[test]
    fn test_lists_sorted_visible_directories() {
        let dir = tempfile::tempdir().unwrap();
        write_package(dir.path(), "b", "b", "1");
        write_package(dir.path(), "a", "a", "1");
        write_package(dir.path(), ".staging", "c", "1");
        fs::write(dir.path().join("notes.txt"), "not a package").unwrap();

        let store = DirectoryPackageStore::new(dir.path());
        let names: Vec<String> = store
            .list_packages()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_discover_reports_bad_packages_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        write_package(dir.path(), "good", "drv.good", "1.0");
        write_package(dir.path(), "badver", "drv.bad", "1.x");
        fs::create_dir_all(dir.path().join("empty")).unwrap();

        let discovery = discover(&DirectoryPackageStore::new(dir.path())).unwrap();

        assert_eq!(discovery.candidates.len(), 1);
        assert_eq!(discovery.candidates[0].id(), "drv.good");
        assert!(discovery.candidates[0].checksum.is_some());
        assert_eq!(discovery.failures.len(), 2);
        assert!(discovery
            .failures
            .iter()
            .any(|f| matches!(f.error, Error::MalformedVersion { .. })));
        assert!(discovery
            .failures
            .iter()
            .any(|f| matches!(f.error, Error::ManifestNotFound(_))));
    }

    #[test]
    fn test_discover_keeps_highest_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        write_package(dir.path(), "a-old", "drv.x", "1.5");
        let newer = write_package(dir.path(), "b-new", "drv.x", "2.0");
        write_package(dir.path(), "c-older", "drv.x", "1.0");

        let discovery = discover(&DirectoryPackageStore::new(dir.path())).unwrap();

        assert_eq!(discovery.candidates.len(), 1);
        assert_eq!(discovery.candidates[0].source_path, newer);
        assert_eq!(discovery.failures.len(), 2);
        assert!(discovery
            .failures
            .iter()
            .all(|f| matches!(f.error, Error::DuplicateCandidate { .. })));
    }
}
