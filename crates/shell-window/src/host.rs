//! The boundary to the windowing system.

use serde::{Deserialize, Serialize};

use crate::message::OutboundMessage;

/// Owned reference to a host surface.
///
/// Not `Clone`: a handle belongs to exactly one [`crate::WindowRecord`] and
/// is consumed by [`WindowHost::destroy`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct HostHandle(u64);

impl HostHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

/// Identifier of a running power-save blocker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PowerSaveBlockerId(pub u64);

/// Options a window is opened with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowOptions {
    /// Initial width; the configured default when unset.
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Hide instead of closing when the user closes the window.
    pub hide_on_close: bool,
    pub show_menu: bool,
}

impl WindowOptions {
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// Failure reported by [`WindowHost::create`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct HostError(pub String);

/// A windowing system able to show content for a locator.
///
/// Every call is fire-and-forget from the coordinator's point of view.
/// Implementations must not call back into the coordinator synchronously;
/// host events are delivered later through the coordinator service.
pub trait WindowHost: Send + Sync {
    /// Create and show a surface for `locator`.
    fn create(&self, locator: &str, options: &WindowOptions) -> Result<HostHandle, HostError>;

    fn destroy(&self, handle: HostHandle);

    fn focus(&self, handle: &HostHandle);

    fn is_maximized(&self, handle: &HostHandle) -> bool;

    fn set_size(&self, handle: &HostHandle, width: u32, height: u32);

    /// Post a message to the window content.
    fn send(&self, handle: &HostHandle, message: &OutboundMessage);

    fn reload(&self, handle: &HostHandle);

    fn clear_history(&self, handle: &HostHandle);

    fn start_power_save_blocker(&self) -> PowerSaveBlockerId;

    fn stop_power_save_blocker(&self, id: PowerSaveBlockerId);

    /// Terminate the process.
    fn quit(&self);
}
