//! Window lifecycle coordination for Studio Shell.
//!
//! [`WindowCoordinator`] keeps the registry of open windows, tracks which
//! one is focused and runs the negotiated-close protocol with each window's
//! content. [`CoordinatorService`] feeds it host events and content messages
//! from a single channel. The windowing system itself sits behind the
//! [`WindowHost`] trait.

pub mod coordinator;
pub mod error;
pub mod host;
pub mod message;
pub mod record;
pub mod service;

pub use coordinator::{CloseDecision, CoordinatorConfig, OpenPolicy, WindowCoordinator};
pub use error::{Error, Result};
pub use host::{HostError, HostHandle, PowerSaveBlockerId, WindowHost, WindowOptions};
pub use message::{ContentMessage, OutboundMessage};
pub use record::{EditState, TabKind, WindowId, WindowRecord, WindowSnapshot, WindowState};
pub use service::{CoordinatorCommand, CoordinatorSender, CoordinatorService};
