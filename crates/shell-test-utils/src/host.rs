//! [`RecordingHost`]: a [`WindowHost`] that records every call.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use shell_window::{
    HostError, HostHandle, OutboundMessage, PowerSaveBlockerId, WindowHost, WindowOptions,
};

/// One call made on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Created {
        handle: u64,
        locator: String,
        options: WindowOptions,
    },
    Destroyed(u64),
    Focused(u64),
    Resized { handle: u64, width: u32, height: u32 },
    Sent { handle: u64, message: OutboundMessage },
    Reloaded(u64),
    HistoryCleared(u64),
    PowerSaveStarted(u64),
    PowerSaveStopped(u64),
    Quit,
}

#[derive(Debug, Default)]
struct State {
    events: Vec<HostEvent>,
    last_handle: u64,
    last_blocker: u64,
    live: HashSet<u64>,
    maximized: HashSet<u64>,
    fail_create: Option<String>,
}

/// Window host fake for coordinator tests.
///
/// Handles are numbered from 1 in creation order.
#[derive(Debug, Default)]
pub struct RecordingHost {
    state: Mutex<State>,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Make every following `create` fail with `reason`.
    pub fn fail_creates(&self, reason: &str) {
        self.state().fail_create = Some(reason.to_string());
    }

    pub fn allow_creates(&self) {
        self.state().fail_create = None;
    }

    pub fn set_maximized(&self, handle: u64, maximized: bool) {
        let mut state = self.state();
        if maximized {
            state.maximized.insert(handle);
        } else {
            state.maximized.remove(&handle);
        }
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.state().events.clone()
    }

    /// Handle of the most recently created window.
    pub fn last_handle(&self) -> u64 {
        self.state().last_handle
    }

    /// Handles created and not yet destroyed.
    pub fn live_handles(&self) -> usize {
        self.state().live.len()
    }

    /// Messages sent to the content of `handle`, in order.
    pub fn sent_to(&self, handle: u64) -> Vec<OutboundMessage> {
        self.state()
            .events
            .iter()
            .filter_map(|event| match event {
                HostEvent::Sent { handle: h, message } if *h == handle => Some(*message),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&HostEvent) -> bool) -> usize {
        self.state().events.iter().filter(|e| predicate(e)).count()
    }

    pub fn created_count(&self) -> usize {
        self.count(|e| matches!(e, HostEvent::Created { .. }))
    }

    pub fn destroyed(&self) -> Vec<u64> {
        self.state()
            .events
            .iter()
            .filter_map(|e| match e {
                HostEvent::Destroyed(handle) => Some(*handle),
                _ => None,
            })
            .collect()
    }

    pub fn quit_count(&self) -> usize {
        self.count(|e| matches!(e, HostEvent::Quit))
    }

    fn record(&self, event: HostEvent) {
        self.state().events.push(event);
    }
}

impl WindowHost for RecordingHost {
    fn create(&self, locator: &str, options: &WindowOptions) -> Result<HostHandle, HostError> {
        let mut state = self.state();
        if let Some(reason) = &state.fail_create {
            return Err(HostError(reason.clone()));
        }
        state.last_handle += 1;
        let handle = state.last_handle;
        state.live.insert(handle);
        state.events.push(HostEvent::Created {
            handle,
            locator: locator.to_string(),
            options: options.clone(),
        });
        Ok(HostHandle::new(handle))
    }

    fn destroy(&self, handle: HostHandle) {
        let mut state = self.state();
        assert!(
            state.live.remove(&handle.raw()),
            "handle {} destroyed twice",
            handle.raw()
        );
        state.events.push(HostEvent::Destroyed(handle.raw()));
    }

    fn focus(&self, handle: &HostHandle) {
        self.record(HostEvent::Focused(handle.raw()));
    }

    fn is_maximized(&self, handle: &HostHandle) -> bool {
        self.state().maximized.contains(&handle.raw())
    }

    fn set_size(&self, handle: &HostHandle, width: u32, height: u32) {
        self.record(HostEvent::Resized {
            handle: handle.raw(),
            width,
            height,
        });
    }

    fn send(&self, handle: &HostHandle, message: &OutboundMessage) {
        self.record(HostEvent::Sent {
            handle: handle.raw(),
            message: *message,
        });
    }

    fn reload(&self, handle: &HostHandle) {
        self.record(HostEvent::Reloaded(handle.raw()));
    }

    fn clear_history(&self, handle: &HostHandle) {
        self.record(HostEvent::HistoryCleared(handle.raw()));
    }

    fn start_power_save_blocker(&self) -> PowerSaveBlockerId {
        let mut state = self.state();
        state.last_blocker += 1;
        let id = state.last_blocker;
        state.events.push(HostEvent::PowerSaveStarted(id));
        PowerSaveBlockerId(id)
    }

    fn stop_power_save_blocker(&self, id: PowerSaveBlockerId) {
        self.record(HostEvent::PowerSaveStopped(id.0));
    }

    fn quit(&self) {
        self.record(HostEvent::Quit);
    }
}
