//! Extension installation for Studio Shell.
//!
//! This crate discovers extension packages, compares their versions with
//! what is installed, installs them two-phase (stage then swap) and
//! provisions an instrument object for every instrument extension.

pub mod error;
pub mod installer;
pub mod instrument;
pub mod manifest;
pub mod policy;
pub mod store;
pub mod target;
pub mod version;

pub use error::{Error, Result};
pub use installer::{
    DEFAULT_MAX_CONCURRENCY, FailureKind, InstallEngine, InstallFailure, InstallOutcome,
    InstallReport, InstallStatus, InstrumentProvision,
};
pub use instrument::{InstrumentId, InstrumentLedger, InstrumentRecord, InstrumentRegistry};
pub use manifest::{ExtensionManifest, ExtensionType, MANIFEST_FILENAME, PACKAGE_JSON_FILENAME};
pub use policy::{ConflictDecision, ConflictPolicy, DefaultPolicy, FixedPolicy, decide};
pub use store::{
    Discovery, DiscoveryFailure, DirectoryPackageStore, ExtensionCandidate, PackageStore, discover,
};
pub use target::{
    DirectoryInstallTarget, InstallTarget, InstalledExtension, RECEIPT_FILENAME, StagedPackage,
};
pub use version::{Version, compare};
