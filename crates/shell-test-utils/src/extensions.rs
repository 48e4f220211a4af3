//! In-memory collaborators for the installation engine.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use shell_extensions::{
    Error, ExtensionCandidate, ExtensionManifest, InstallTarget, InstalledExtension, InstrumentId,
    InstrumentRecord, InstrumentRegistry, PackageStore, Result, StagedPackage,
};

/// Install target keeping installed extensions in a map.
#[derive(Debug, Default)]
pub struct MemoryInstallTarget {
    installed: Mutex<BTreeMap<String, InstalledExtension>>,
    fail_staging: Mutex<HashSet<String>>,
    fail_commit: Mutex<HashSet<String>>,
    commits: AtomicUsize,
    discards: AtomicUsize,
}

impl MemoryInstallTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend `manifest` is already installed.
    pub fn with_installed(self, manifest: ExtensionManifest) -> Self {
        let extension = InstalledExtension {
            location: PathBuf::from(format!("memory://installed/{}", manifest.id)),
            manifest,
            checksum: None,
        };
        self.installed
            .lock()
            .unwrap()
            .insert(extension.manifest.id.clone(), extension);
        self
    }

    pub fn fail_staging_for(&self, id: &str) {
        self.fail_staging.lock().unwrap().insert(id.to_string());
    }

    pub fn fail_commit_for(&self, id: &str) {
        self.fail_commit.lock().unwrap().insert(id.to_string());
    }

    /// Installed `(id, version)` pairs, sorted by id.
    pub fn versions(&self) -> Vec<(String, String)> {
        self.installed
            .lock()
            .unwrap()
            .values()
            .map(|e| (e.manifest.id.clone(), e.manifest.version.clone()))
            .collect()
    }

    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn discard_count(&self) -> usize {
        self.discards.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InstallTarget for MemoryInstallTarget {
    async fn installed(&self, id: &str) -> Result<Option<InstalledExtension>> {
        Ok(self.installed.lock().unwrap().get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<InstalledExtension>> {
        Ok(self.installed.lock().unwrap().values().cloned().collect())
    }

    async fn stage(&self, candidate: &ExtensionCandidate) -> Result<StagedPackage> {
        if self.fail_staging.lock().unwrap().contains(candidate.id()) {
            return Err(Error::StagingFailed {
                id: candidate.id().to_string(),
                reason: "injected staging failure".to_string(),
            });
        }
        Ok(StagedPackage {
            candidate: candidate.clone(),
            staging_path: PathBuf::from(format!("memory://staging/{}", candidate.id())),
        })
    }

    async fn commit(&self, staged: StagedPackage) -> Result<InstalledExtension> {
        let id = staged.candidate.id().to_string();
        if self.fail_commit.lock().unwrap().contains(&id) {
            return Err(Error::Io(std::io::Error::other("injected commit failure")));
        }
        let extension = InstalledExtension {
            location: PathBuf::from(format!("memory://installed/{id}")),
            manifest: staged.candidate.manifest,
            checksum: staged.candidate.checksum,
        };
        self.installed.lock().unwrap().insert(id, extension.clone());
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(extension)
    }

    async fn discard(&self, _staged: StagedPackage) -> Result<()> {
        self.discards.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Instrument registry keeping records in a vector.
#[derive(Debug, Default)]
pub struct MemoryInstrumentRegistry {
    records: Mutex<Vec<InstrumentRecord>>,
    created: AtomicUsize,
    fail_create: AtomicBool,
}

impl MemoryInstrumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend an instrument is already bound to `extension_id`.
    pub fn with_instrument(self, extension_id: &str, instrument: &str) -> Self {
        self.records.lock().unwrap().push(InstrumentRecord {
            id: InstrumentId::new(instrument),
            extension_id: extension_id.to_string(),
            name: extension_id.to_string(),
        });
        self
    }

    pub fn fail_creates(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    /// Number of `create_instrument` calls that succeeded.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn bound_to(&self, extension_id: &str) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.extension_id == extension_id)
            .count()
    }
}

#[async_trait]
impl InstrumentRegistry for MemoryInstrumentRegistry {
    async fn find_by_extension(&self, extension_id: &str) -> Result<Option<InstrumentId>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.extension_id == extension_id)
            .map(|r| r.id.clone()))
    }

    async fn create_instrument(&self, manifest: &ExtensionManifest) -> Result<InstrumentId> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Error::InstrumentProvisioning {
                id: manifest.id.clone(),
                reason: "injected failure".to_string(),
            });
        }
        let mut records = self.records.lock().unwrap();
        let id = InstrumentId::new(format!("instrument-{}", records.len() + 1));
        records.push(InstrumentRecord {
            id: id.clone(),
            extension_id: manifest.id.clone(),
            name: manifest.display_name().to_string(),
        });
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<InstrumentRecord>> {
        Ok(self.records.lock().unwrap().clone())
    }
}

/// Package store serving manifests from memory.
///
/// A package registered with [`MemoryPackageStore::broken`] fails to read.
#[derive(Debug, Default)]
pub struct MemoryPackageStore {
    packages: Vec<PathBuf>,
    manifests: HashMap<PathBuf, std::result::Result<ExtensionManifest, String>>,
}

impl MemoryPackageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn package(mut self, path: &str, manifest: ExtensionManifest) -> Self {
        self.packages.push(PathBuf::from(path));
        self.manifests.insert(PathBuf::from(path), Ok(manifest));
        self
    }

    pub fn broken(mut self, path: &str, reason: &str) -> Self {
        self.packages.push(PathBuf::from(path));
        self.manifests
            .insert(PathBuf::from(path), Err(reason.to_string()));
        self
    }
}

impl PackageStore for MemoryPackageStore {
    fn list_packages(&self) -> Result<Vec<PathBuf>> {
        Ok(self.packages.clone())
    }

    fn read_manifest(&self, package: &Path) -> Result<ExtensionManifest> {
        match self.manifests.get(package) {
            Some(Ok(manifest)) => Ok(manifest.clone()),
            Some(Err(reason)) => Err(Error::MalformedManifest {
                origin: package.display().to_string(),
                reason: reason.clone(),
            }),
            None => Err(Error::ManifestNotFound(package.to_path_buf())),
        }
    }
}
