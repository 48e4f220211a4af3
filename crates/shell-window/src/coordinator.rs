//! The window registry and the negotiated-close protocol.
//!
//! Closing a window takes two phases. A close attempt on a window whose
//! content has not acknowledged is vetoed and the content receives
//! `before-close`. Once the content answers `ready-to-close` the coordinator
//! closes the window itself, and this time the close is allowed. When the
//! last window is gone the host is told to quit, exactly once.
//!
//! All registry mutations happen under one mutex, so focus flags and
//! lifecycle transitions never interleave.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::host::{PowerSaveBlockerId, WindowHost, WindowOptions};
use crate::message::{ContentMessage, OutboundMessage};
use crate::record::{EditState, TabKind, WindowId, WindowRecord, WindowSnapshot, WindowState};

/// What [`WindowCoordinator::open`] does when the locator is already open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpenPolicy {
    /// Focus the existing window instead of creating a second one.
    #[default]
    FocusExisting,
    AlwaysCreate,
}

/// Coordinator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub open_policy: OpenPolicy,
    pub default_width: u32,
    pub default_height: u32,
    /// Force-close windows that do not acknowledge `before-close` within
    /// this period. `None` waits indefinitely.
    pub close_grace_period: Option<Duration>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            open_policy: OpenPolicy::FocusExisting,
            default_width: 900,
            default_height: 600,
            close_grace_period: None,
        }
    }
}

/// Answer to a host-level close attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseDecision {
    /// The content was asked to prepare; the window stays open.
    Veto,
    /// The window was destroyed. Carries its final state.
    Allow(WindowSnapshot),
    /// No such window.
    Unknown,
}

#[derive(Debug, Default)]
struct Registry {
    /// In open order.
    windows: Vec<WindowRecord>,
    last_id: u64,
    power_save: Option<PowerSaveBlockerId>,
    terminated: bool,
}

impl Registry {
    fn position(&self, id: WindowId) -> Option<usize> {
        self.windows.iter().position(|w| w.id == id)
    }

    fn get_mut(&mut self, id: WindowId) -> Option<&mut WindowRecord> {
        self.windows.iter_mut().find(|w| w.id == id)
    }

    fn position_by_locator(&self, locator: &str) -> Option<usize> {
        self.windows.iter().position(|w| w.locator == locator)
    }

    /// Like [`Self::position_by_locator`], skipping windows that are closing.
    fn position_open_by_locator(&self, locator: &str) -> Option<usize> {
        self.windows.iter().position(|w| {
            w.locator == locator
                && !matches!(
                    w.lifecycle,
                    WindowState::CloseRequested | WindowState::ReadyToClose | WindowState::Closed
                )
        })
    }

    /// Give focus to the window at `index` and take it from all others.
    fn set_focus(&mut self, index: usize) {
        for (i, window) in self.windows.iter_mut().enumerate() {
            window.focused = i == index;
        }
    }
}

/// Process-wide registry of open windows.
pub struct WindowCoordinator {
    host: Arc<dyn WindowHost>,
    config: CoordinatorConfig,
    registry: Mutex<Registry>,
}

impl WindowCoordinator {
    pub fn new(host: Arc<dyn WindowHost>, config: CoordinatorConfig) -> Self {
        Self {
            host,
            config,
            registry: Mutex::new(Registry::default()),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a window for `locator`.
    ///
    /// Under [`OpenPolicy::FocusExisting`] an already open locator is focused
    /// and returned; a window that is closing does not count. Otherwise a new
    /// host window is created; if the host fails the registry is left
    /// unchanged.
    pub fn open(&self, locator: &str, options: WindowOptions) -> Result<WindowSnapshot> {
        let mut registry = self.registry();
        if registry.terminated {
            return Err(Error::Terminated);
        }

        if self.config.open_policy == OpenPolicy::FocusExisting {
            if let Some(index) = registry.position_open_by_locator(locator) {
                tracing::debug!(locator, window = %registry.windows[index].id, "focusing existing window");
                registry.set_focus(index);
                let window = &registry.windows[index];
                self.host.focus(&window.handle);
                return Ok(window.snapshot());
            }
        }

        let options = WindowOptions {
            width: options.width.or(Some(self.config.default_width)),
            height: options.height.or(Some(self.config.default_height)),
            ..options
        };
        let handle = self
            .host
            .create(locator, &options)
            .map_err(|e| Error::HostCreationFailed {
                locator: locator.to_string(),
                reason: e.to_string(),
            })?;

        registry.last_id += 1;
        let id = WindowId::new(registry.last_id);
        let mut record = WindowRecord::new(id, locator.to_string(), handle, options);
        record.lifecycle = WindowState::Open;
        registry.windows.push(record);

        // A freshly shown window has focus.
        let index = registry.windows.len() - 1;
        registry.set_focus(index);

        tracing::info!(window = %id, locator, "opened window");
        Ok(registry.windows[index].snapshot())
    }

    /// Focus the first window opened for `locator`.
    ///
    /// Returns whether such a window exists.
    pub fn request_focus(&self, locator: &str) -> bool {
        let mut registry = self.registry();
        let Some(index) = registry.position_by_locator(locator) else {
            tracing::debug!(locator, "focus requested for a locator that is not open");
            return false;
        };
        if !registry.windows[index].focused {
            registry.set_focus(index);
        }
        self.host.focus(&registry.windows[index].handle);
        true
    }

    /// The host reports that `id` gained focus.
    pub fn host_focus_changed(&self, id: WindowId) -> bool {
        let mut registry = self.registry();
        match registry.position(id) {
            Some(index) => {
                registry.set_focus(index);
                true
            }
            None => {
                tracing::debug!(window = %id, "focus change for unknown window ignored");
                false
            }
        }
    }

    /// The host is about to close `id` (user or system initiated).
    pub fn handle_close_attempt(&self, id: WindowId) -> CloseDecision {
        let mut registry = self.registry();
        self.close_locked(&mut registry, id)
    }

    /// Content of `id` has finished its unsaved-state handling.
    ///
    /// Marks the window ready and closes it.
    pub fn acknowledge_ready_to_close(&self, id: WindowId) -> CloseDecision {
        let mut registry = self.registry();
        let Some(window) = registry.get_mut(id) else {
            tracing::warn!(window = %id, "ready-to-close from unknown window ignored");
            return CloseDecision::Unknown;
        };
        window.ready_to_close = true;
        window.lifecycle = WindowState::ReadyToClose;
        self.close_locked(&mut registry, id)
    }

    fn close_locked(&self, registry: &mut Registry, id: WindowId) -> CloseDecision {
        let Some(index) = registry.position(id) else {
            tracing::warn!(window = %id, "close attempt on unknown window ignored");
            return CloseDecision::Unknown;
        };

        let window = &mut registry.windows[index];
        if !window.ready_to_close {
            self.host.send(&window.handle, &OutboundMessage::BeforeClose);
            window.lifecycle = WindowState::CloseRequested;
            window.close_requested_at = Some(Instant::now());
            tracing::debug!(window = %id, "close vetoed, waiting for content");
            return CloseDecision::Veto;
        }

        let mut record = registry.windows.remove(index);
        record.lifecycle = WindowState::Closed;
        record.focused = false;
        let snapshot = record.snapshot();
        self.host.destroy(record.handle);
        tracing::info!(window = %id, locator = %snapshot.locator, "closed window");

        if registry.windows.is_empty() && !registry.terminated {
            registry.terminated = true;
            if let Some(blocker) = registry.power_save.take() {
                self.host.stop_power_save_blocker(blocker);
            }
            tracing::info!("last window closed, terminating");
            self.host.quit();
        }
        CloseDecision::Allow(snapshot)
    }

    /// Reload the content of `id` and clear its navigation history.
    pub fn reload(&self, id: WindowId) -> bool {
        let registry = self.registry();
        let Some(index) = registry.position(id) else {
            tracing::debug!(window = %id, "reload of unknown window ignored");
            return false;
        };
        let handle = &registry.windows[index].handle;
        self.host.reload(handle);
        self.host.clear_history(handle);
        true
    }

    /// Ask the content of `id` to prepare for a reload.
    pub fn request_reload(&self, id: WindowId) -> bool {
        let registry = self.registry();
        match registry.position(id) {
            Some(index) => {
                self.host
                    .send(&registry.windows[index].handle, &OutboundMessage::Reload);
                true
            }
            None => {
                tracing::debug!(window = %id, "reload request for unknown window ignored");
                false
            }
        }
    }

    /// Advisory resize from content. Returns whether it was forwarded.
    pub fn resize_request(&self, id: WindowId, width: u32, height: u32) -> bool {
        let registry = self.registry();
        let Some(index) = registry.position(id) else {
            return false;
        };
        let handle = &registry.windows[index].handle;
        if self.host.is_maximized(handle) {
            tracing::debug!(window = %id, "resize ignored while maximized");
            return false;
        }
        self.host.set_size(handle, width, height);
        true
    }

    pub fn update_edit_state(&self, id: WindowId, state: EditState) -> bool {
        self.with_window(id, |window| window.edit_state = state)
    }

    pub fn update_active_tab(&self, id: WindowId, tab: Option<TabKind>) -> bool {
        self.with_window(id, |window| window.active_tab = tab)
    }

    /// Keep the system awake while any window asks for it.
    pub fn set_prevent_suspension(&self, on: bool) {
        let mut registry = self.registry();
        match (on, registry.power_save) {
            (true, None) => {
                registry.power_save = Some(self.host.start_power_save_blocker());
                tracing::debug!("power save blocker started");
            }
            (false, Some(blocker)) => {
                self.host.stop_power_save_blocker(blocker);
                registry.power_save = None;
                tracing::debug!("power save blocker stopped");
            }
            _ => {}
        }
    }

    pub fn is_suspension_prevented(&self) -> bool {
        self.registry().power_save.is_some()
    }

    /// Force-close windows whose `before-close` went unanswered for longer
    /// than the grace period. Does nothing without a grace period.
    pub fn expire_close_requests(&self, now: Instant) -> Vec<WindowId> {
        let Some(grace) = self.config.close_grace_period else {
            return Vec::new();
        };

        let mut registry = self.registry();
        let expired: Vec<WindowId> = registry
            .windows
            .iter()
            .filter(|w| w.lifecycle == WindowState::CloseRequested)
            .filter(|w| {
                w.close_requested_at
                    .is_some_and(|at| now.saturating_duration_since(at) >= grace)
            })
            .map(|w| w.id)
            .collect();

        for &id in &expired {
            tracing::warn!(window = %id, ?grace, "window did not acknowledge close in time");
            if let Some(window) = registry.get_mut(id) {
                window.ready_to_close = true;
                window.lifecycle = WindowState::ReadyToClose;
            }
            self.close_locked(&mut registry, id);
        }
        expired
    }

    /// Dispatch a message received from the content of `id`.
    pub fn handle_content_message(&self, id: WindowId, message: ContentMessage) {
        tracing::trace!(window = %id, ?message, "content message");
        match message {
            ContentMessage::ReadyToClose => {
                self.acknowledge_ready_to_close(id);
            }
            ContentMessage::Reload => {
                self.reload(id);
            }
            ContentMessage::ResizeRequest { width, height } => {
                self.resize_request(id, width, height);
            }
            ContentMessage::SetWindowState(state) => {
                self.update_edit_state(id, state);
            }
            ContentMessage::SetActiveTab { tab } => {
                self.update_active_tab(id, tab);
            }
            ContentMessage::PreventAppSuspension { on } => self.set_prevent_suspension(on),
        }
    }

    fn with_window(&self, id: WindowId, f: impl FnOnce(&mut WindowRecord)) -> bool {
        let mut registry = self.registry();
        match registry.get_mut(id) {
            Some(window) => {
                f(window);
                true
            }
            None => {
                tracing::debug!(window = %id, "update for unknown window ignored");
                false
            }
        }
    }

    /// All open windows in open order.
    pub fn snapshot(&self) -> Vec<WindowSnapshot> {
        self.registry().windows.iter().map(WindowRecord::snapshot).collect()
    }

    pub fn get(&self, id: WindowId) -> Option<WindowSnapshot> {
        let registry = self.registry();
        registry.windows.iter().find(|w| w.id == id).map(WindowRecord::snapshot)
    }

    pub fn find(&self, locator: &str) -> Option<WindowSnapshot> {
        let registry = self.registry();
        registry
            .position_by_locator(locator)
            .map(|index| registry.windows[index].snapshot())
    }

    pub fn focused(&self) -> Option<WindowSnapshot> {
        let registry = self.registry();
        registry.windows.iter().find(|w| w.focused).map(WindowRecord::snapshot)
    }

    pub fn len(&self) -> usize {
        self.registry().windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the last window was closed and the host told to quit.
    pub fn is_terminated(&self) -> bool {
        self.registry().terminated
    }
}
