//! Shared test utilities for the Studio Shell workspace.
//!
//! A dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`host`]: [`RecordingHost`], a window host that records every call
//! - [`extensions`]: in-memory install target, instrument registry and
//!   package store
//! - [`fixtures`]: [`PackageDir`], extension packages written to a temp dir

pub mod extensions;
pub mod fixtures;
pub mod host;

pub use extensions::{MemoryInstallTarget, MemoryInstrumentRegistry, MemoryPackageStore};
pub use fixtures::PackageDir;
pub use host::{HostEvent, RecordingHost};
