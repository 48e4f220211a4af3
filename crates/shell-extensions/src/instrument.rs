//! Instrument provisioning for instrument-type extensions.
//!
//! The shell keeps one instrument object per instrument extension. The
//! [`InstrumentRegistry`] trait is the boundary to whatever owns instrument
//! objects; [`InstrumentLedger`] is a file-backed implementation.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::manifest::ExtensionManifest;
use crate::target::run_blocking;

/// Identifier of an instrument object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentId(String);

impl InstrumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An instrument bound to an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub id: InstrumentId,
    pub extension_id: String,
    pub name: String,
}

/// Owner of instrument objects.
#[async_trait]
pub trait InstrumentRegistry: Send + Sync {
    /// Instrument bound to `extension_id`, if any.
    async fn find_by_extension(&self, extension_id: &str) -> Result<Option<InstrumentId>>;

    /// Create a new instrument for an instrument extension.
    async fn create_instrument(&self, manifest: &ExtensionManifest) -> Result<InstrumentId>;

    /// All instruments.
    async fn list(&self) -> Result<Vec<InstrumentRecord>>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    version: String,
    #[serde(default)]
    instruments: Vec<InstrumentRecord>,
}

/// Instrument registry persisted as a TOML file.
///
/// Reads take a shared file lock; writes go through a locked
/// temp-then-rename. File access runs on the blocking pool. An in-process
/// mutex serializes read-modify-write cycles.
#[derive(Debug)]
pub struct InstrumentLedger {
    path: PathBuf,
    guard: Mutex<()>,
}

impl InstrumentLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<LedgerFile> {
        if !path.exists() {
            return Ok(LedgerFile {
                version: "1".to_string(),
                instruments: Vec::new(),
            });
        }
        let content = shell_fs::io::read_text_locked(path)?;
        toml::from_str(&content).map_err(|e| Error::Ledger {
            path: path.to_path_buf(),
            reason: e.message().to_string(),
        })
    }

    fn save(path: &Path, ledger: &LedgerFile) -> Result<()> {
        let content = toml::to_string_pretty(ledger).map_err(|e| Error::Ledger {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        shell_fs::io::write_text(path, &content)?;
        Ok(())
    }

    async fn read(&self) -> Result<LedgerFile> {
        let path = self.path.clone();
        run_blocking(move || Self::load(&path)).await
    }
}

#[async_trait]
impl InstrumentRegistry for InstrumentLedger {
    async fn find_by_extension(&self, extension_id: &str) -> Result<Option<InstrumentId>> {
        let _guard = self.guard.lock().await;
        let ledger = self.read().await?;
        Ok(ledger
            .instruments
            .into_iter()
            .find(|record| record.extension_id == extension_id)
            .map(|record| record.id))
    }

    async fn create_instrument(&self, manifest: &ExtensionManifest) -> Result<InstrumentId> {
        if !manifest.extension_type.is_instrument() {
            return Err(Error::InstrumentProvisioning {
                id: manifest.id.clone(),
                reason: format!("extension type '{}' is not an instrument", manifest.extension_type),
            });
        }

        let record = InstrumentRecord {
            id: InstrumentId::generate(),
            extension_id: manifest.id.clone(),
            name: manifest.display_name().to_string(),
        };
        let id = record.id.clone();

        let _guard = self.guard.lock().await;
        let path = self.path.clone();
        run_blocking(move || {
            let mut ledger = Self::load(&path)?;
            ledger.instruments.push(record);
            Self::save(&path, &ledger)
        })
        .await?;

        tracing::info!(extension = %manifest.id, instrument = %id, "created instrument");
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<InstrumentRecord>> {
        let _guard = self.guard.lock().await;
        Ok(self.read().await?.instruments)
    }
}
