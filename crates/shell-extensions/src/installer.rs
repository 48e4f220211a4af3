//! The extension installation engine.
//!
//! [`InstallEngine::install_all`] resolves each candidate against the
//! installed extensions, asks the [`ConflictPolicy`] where versions clash,
//! installs through the [`InstallTarget`] and provisions instruments for
//! instrument extensions. Candidates are evaluated concurrently; a failure
//! only ever affects its own candidate.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::instrument::{InstrumentId, InstrumentRegistry};
use crate::policy::{decide, ConflictDecision, ConflictPolicy};
use crate::store::{discover, DiscoveryFailure, ExtensionCandidate, PackageStore};
use crate::target::{InstallTarget, InstalledExtension};

/// Default number of candidates evaluated at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Classification of a failed candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    MalformedManifest,
    MalformedVersion,
    ManifestNotFound,
    DuplicateCandidate,
    StagingFailed,
    Other,
}

/// Why a candidate was not installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&Error> for InstallFailure {
    fn from(error: &Error) -> Self {
        let kind = match error {
            Error::MalformedManifest { .. } => FailureKind::MalformedManifest,
            Error::MalformedVersion { .. } => FailureKind::MalformedVersion,
            Error::ManifestNotFound(_) => FailureKind::ManifestNotFound,
            Error::DuplicateCandidate { .. } => FailureKind::DuplicateCandidate,
            Error::StagingFailed { .. } => FailureKind::StagingFailed,
            _ => FailureKind::Other,
        };
        Self {
            kind,
            message: error.to_string(),
        }
    }
}

/// Final state of one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum InstallStatus {
    /// Nothing was installed under this id before.
    Installed,
    /// An installed version was replaced.
    Replaced { previous: String },
    SkippedOlder { installed: String },
    SkippedSame,
    SkippedNewer { installed: String },
    Failed(InstallFailure),
}

impl InstallStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, InstallStatus::Installed | InstallStatus::Replaced { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            InstallStatus::SkippedOlder { .. }
                | InstallStatus::SkippedSame
                | InstallStatus::SkippedNewer { .. }
        )
    }
}

/// What happened on the instrument side after an install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "instrument", content = "value", rename_all = "kebab-case")]
pub enum InstrumentProvision {
    Created(InstrumentId),
    Existing(InstrumentId),
    Failed(String),
}

/// Outcome for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallOutcome {
    pub id: String,
    pub version: Option<String>,
    pub source_path: PathBuf,
    pub status: InstallStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument: Option<InstrumentProvision>,
}

impl InstallOutcome {
    fn new(candidate: &ExtensionCandidate, status: InstallStatus) -> Self {
        Self {
            id: candidate.manifest.id.clone(),
            version: Some(candidate.manifest.version.clone()),
            source_path: candidate.source_path.clone(),
            status,
            instrument: None,
        }
    }

    fn failed(candidate: &ExtensionCandidate, error: &Error) -> Self {
        Self::new(candidate, InstallStatus::Failed(error.into()))
    }

    fn from_discovery(failure: &DiscoveryFailure) -> Self {
        let id = match &failure.error {
            Error::DuplicateCandidate { id, .. } => id.clone(),
            _ => failure
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        Self {
            id,
            version: None,
            source_path: failure.path.clone(),
            status: InstallStatus::Failed((&failure.error).into()),
            instrument: None,
        }
    }
}

/// All outcomes of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    /// Discovery failures first, then candidates in input order.
    pub outcomes: Vec<InstallOutcome>,
}

impl InstallReport {
    pub fn installed(&self) -> impl Iterator<Item = &InstallOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_success())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &InstallOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_skipped())
    }

    pub fn failed(&self) -> impl Iterator<Item = &InstallOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, InstallStatus::Failed(_)))
    }

    /// Outcome for an extension id.
    pub fn get(&self, id: &str) -> Option<&InstallOutcome> {
        self.outcomes.iter().find(|o| o.id == id)
    }

    /// Instruments created during the run.
    pub fn created_instruments(&self) -> Vec<&InstrumentId> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.instrument {
                Some(InstrumentProvision::Created(id)) => Some(id),
                _ => None,
            })
            .collect()
    }
}

/// Installs extension candidates.
pub struct InstallEngine {
    target: Arc<dyn InstallTarget>,
    instruments: Arc<dyn InstrumentRegistry>,
    max_concurrency: usize,
    /// One async lock per extension id; held across decide + apply.
    id_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl InstallEngine {
    pub fn new(target: Arc<dyn InstallTarget>, instruments: Arc<dyn InstrumentRegistry>) -> Self {
        Self {
            target,
            instruments,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            id_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Bound the number of candidates evaluated at once (minimum 1).
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn target(&self) -> &Arc<dyn InstallTarget> {
        &self.target
    }

    /// Discover packages in `store` and install them.
    pub async fn install_from_store(
        &self,
        store: &dyn PackageStore,
        policy: &dyn ConflictPolicy,
    ) -> Result<InstallReport> {
        let discovery = discover(store)?;
        let mut report = InstallReport {
            outcomes: discovery
                .failures
                .iter()
                .map(InstallOutcome::from_discovery)
                .collect(),
        };
        let installed = self.install_all(discovery.candidates, policy).await;
        report.outcomes.extend(installed.outcomes);
        Ok(report)
    }

    /// Install every candidate, evaluating up to `max_concurrency` at once.
    ///
    /// Outcomes are reported in candidate order.
    pub async fn install_all(
        &self,
        candidates: Vec<ExtensionCandidate>,
        policy: &dyn ConflictPolicy,
    ) -> InstallReport {
        tracing::info!(
            candidates = candidates.len(),
            concurrency = self.max_concurrency,
            "installing extensions"
        );

        // Unordered so a suspended decision never holds back later candidates.
        let mut indexed: Vec<(usize, InstallOutcome)> =
            stream::iter(candidates.into_iter().enumerate())
                .map(|(index, candidate)| async move {
                    (index, self.install_one(candidate, policy).await)
                })
                .buffer_unordered(self.max_concurrency)
                .collect()
                .await;
        indexed.sort_by_key(|(index, _)| *index);

        let report = InstallReport {
            outcomes: indexed.into_iter().map(|(_, outcome)| outcome).collect(),
        };
        tracing::info!(
            installed = report.installed().count(),
            skipped = report.skipped().count(),
            failed = report.failed().count(),
            "extension installation finished"
        );
        report
    }

    async fn install_one(
        &self,
        candidate: ExtensionCandidate,
        policy: &dyn ConflictPolicy,
    ) -> InstallOutcome {
        let lock = self.lock_for(candidate.id());
        let _guard = lock.lock().await;

        match self.resolve_and_apply(&candidate, policy).await {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::warn!(id = %candidate.id(), %error, "extension not installed");
                InstallOutcome::failed(&candidate, &error)
            }
        }
    }

    async fn resolve_and_apply(
        &self,
        candidate: &ExtensionCandidate,
        policy: &dyn ConflictPolicy,
    ) -> Result<InstallOutcome> {
        let existing = self.target.installed(candidate.id()).await?;
        let decision = decide(policy, candidate, existing.as_ref()).await?;
        tracing::debug!(id = %candidate.id(), ?decision, "resolved conflict");

        let status = match (decision, existing) {
            (ConflictDecision::NotFound, _) => {
                self.apply(candidate).await?;
                InstallStatus::Installed
            }
            (ConflictDecision::Proceed, Some(existing)) => {
                self.apply(candidate).await?;
                InstallStatus::Replaced {
                    previous: existing.manifest.version,
                }
            }
            // decide() only proceeds against an existing installation
            (ConflictDecision::Proceed, None) => {
                self.apply(candidate).await?;
                InstallStatus::Installed
            }
            (ConflictDecision::SkipSame, _) => InstallStatus::SkippedSame,
            (ConflictDecision::SkipOlder, existing) => InstallStatus::SkippedOlder {
                installed: installed_version(existing),
            },
            (ConflictDecision::SkipNewer, existing) => InstallStatus::SkippedNewer {
                installed: installed_version(existing),
            },
        };

        let mut outcome = InstallOutcome::new(candidate, status);
        if outcome.status.is_success() && candidate.manifest.extension_type.is_instrument() {
            outcome.instrument = Some(self.provision_instrument(candidate).await);
        }

        match &outcome.status {
            InstallStatus::Installed => {
                tracing::info!(id = %outcome.id, version = %candidate.manifest.version, "installed extension")
            }
            InstallStatus::Replaced { previous } => tracing::info!(
                id = %outcome.id,
                version = %candidate.manifest.version,
                previous = %previous,
                "replaced extension"
            ),
            status => tracing::debug!(id = %outcome.id, ?status, "skipped extension"),
        }
        Ok(outcome)
    }

    /// Stage then commit; the installed package stays intact on failure.
    async fn apply(&self, candidate: &ExtensionCandidate) -> Result<InstalledExtension> {
        let staged = self
            .target
            .stage(candidate)
            .await
            .map_err(|e| as_staging_error(candidate, e))?;

        let discard = staged.clone();
        match self.target.commit(staged).await {
            Ok(installed) => Ok(installed),
            Err(error) => {
                if let Err(discard_error) = self.target.discard(discard).await {
                    tracing::warn!(id = %candidate.id(), error = %discard_error, "failed to discard staged package");
                }
                Err(as_staging_error(candidate, error))
            }
        }
    }

    async fn provision_instrument(&self, candidate: &ExtensionCandidate) -> InstrumentProvision {
        let id = candidate.id();
        let result = async {
            if let Some(existing) = self.instruments.find_by_extension(id).await? {
                return Ok(InstrumentProvision::Existing(existing));
            }
            let created = self.instruments.create_instrument(&candidate.manifest).await?;
            Ok::<_, Error>(InstrumentProvision::Created(created))
        }
        .await;

        result.unwrap_or_else(|error| {
            tracing::warn!(id, %error, "instrument provisioning failed");
            InstrumentProvision::Failed(error.to_string())
        })
    }

    fn lock_for(&self, id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.id_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id.to_string()).or_default())
    }
}

fn installed_version(existing: Option<InstalledExtension>) -> String {
    existing
        .map(|e| e.manifest.version)
        .unwrap_or_default()
}

fn as_staging_error(candidate: &ExtensionCandidate, error: Error) -> Error {
    match error {
        Error::StagingFailed { .. } => error,
        other => Error::StagingFailed {
            id: candidate.id().to_string(),
            reason: other.to_string(),
        },
    }
}
