//! Conflict resolution between a candidate and an installed extension.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::ExtensionCandidate;
use crate::target::InstalledExtension;
use crate::version::Version;

/// Caller-supplied decisions taken while installing.
///
/// Every method may suspend, e.g. to wait for a user confirmation. The
/// provided defaults replace newer and older installations and leave an
/// equal version alone.
#[async_trait]
pub trait ConflictPolicy: Send + Sync {
    /// No extension with the candidate's id is installed.
    async fn on_not_found(&self, _candidate: &ExtensionCandidate) {}

    async fn confirm_replace_newer(
        &self,
        _candidate: &ExtensionCandidate,
        _existing: &InstalledExtension,
    ) -> bool {
        true
    }

    async fn confirm_replace_older(
        &self,
        _candidate: &ExtensionCandidate,
        _existing: &InstalledExtension,
    ) -> bool {
        true
    }

    async fn confirm_replace_same(
        &self,
        _candidate: &ExtensionCandidate,
        _existing: &InstalledExtension,
    ) -> bool {
        false
    }
}

/// The default answers of [`ConflictPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl ConflictPolicy for DefaultPolicy {}

/// A policy answering every question with a fixed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedPolicy {
    pub replace_newer: bool,
    pub replace_older: bool,
    pub replace_same: bool,
}

impl Default for FixedPolicy {
    fn default() -> Self {
        Self {
            replace_newer: true,
            replace_older: true,
            replace_same: false,
        }
    }
}

impl FixedPolicy {
    /// Replace whatever is installed, including equal versions.
    pub fn always_replace() -> Self {
        Self {
            replace_newer: true,
            replace_older: true,
            replace_same: true,
        }
    }

    /// Never replace an installed extension.
    pub fn never_replace() -> Self {
        Self {
            replace_newer: false,
            replace_older: false,
            replace_same: false,
        }
    }
}

#[async_trait]
impl ConflictPolicy for FixedPolicy {
    async fn confirm_replace_newer(&self, _: &ExtensionCandidate, _: &InstalledExtension) -> bool {
        self.replace_newer
    }

    async fn confirm_replace_older(&self, _: &ExtensionCandidate, _: &InstalledExtension) -> bool {
        self.replace_older
    }

    async fn confirm_replace_same(&self, _: &ExtensionCandidate, _: &InstalledExtension) -> bool {
        self.replace_same
    }
}

/// What to do with a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictDecision {
    /// Nothing installed under this id; install directly.
    NotFound,
    /// Replace the installed extension.
    Proceed,
    /// Candidate is older and the policy declined.
    SkipOlder,
    /// Same version and the policy declined.
    SkipSame,
    /// Candidate is newer and the policy declined.
    SkipNewer,
}

impl ConflictDecision {
    pub fn proceeds(self) -> bool {
        matches!(self, ConflictDecision::NotFound | ConflictDecision::Proceed)
    }
}

/// Compare versions and consult the policy.
///
/// Fails with [`crate::Error::MalformedVersion`] when either version does
/// not parse; the policy is not consulted in that case.
pub async fn decide(
    policy: &dyn ConflictPolicy,
    candidate: &ExtensionCandidate,
    existing: Option<&InstalledExtension>,
) -> Result<ConflictDecision> {
    let candidate_version = Version::parse(&candidate.manifest.version)?;

    let Some(existing) = existing else {
        policy.on_not_found(candidate).await;
        return Ok(ConflictDecision::NotFound);
    };
    let existing_version = Version::parse(existing.version())?;

    let decision = match candidate_version.cmp(&existing_version) {
        Ordering::Greater => {
            if policy.confirm_replace_newer(candidate, existing).await {
                ConflictDecision::Proceed
            } else {
                ConflictDecision::SkipNewer
            }
        }
        Ordering::Less => {
            if policy.confirm_replace_older(candidate, existing).await {
                ConflictDecision::Proceed
            } else {
                ConflictDecision::SkipOlder
            }
        }
        Ordering::Equal => {
            if policy.confirm_replace_same(candidate, existing).await {
                ConflictDecision::Proceed
            } else {
                ConflictDecision::SkipSame
            }
        }
    };
    Ok(decision)
}
