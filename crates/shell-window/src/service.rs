//! Command loop in front of a [`WindowCoordinator`].
//!
//! Host events and content messages arrive on one multiplexed channel and
//! are applied sequentially, so the running shell has a single writer:
//!
//! ```text
//! host events ─────┐
//!                  ├──► mpsc::Sender<CoordinatorCommand> ──► CoordinatorService
//! content msgs ────┘                                              │
//!                                                                 ▼
//!                                                  WindowCoordinator (sequential apply)
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};

use crate::coordinator::WindowCoordinator;
use crate::error::{Error, Result};
use crate::host::WindowOptions;
use crate::message::ContentMessage;
use crate::record::{WindowId, WindowSnapshot};

const COMMAND_BUFFER_SIZE: usize = 64;

/// Shortest interval between grace period checks.
const MIN_EXPIRY_TICK: Duration = Duration::from_millis(10);

/// Commands understood by [`CoordinatorService`].
#[derive(Debug)]
pub enum CoordinatorCommand {
    OpenWindow {
        locator: String,
        options: WindowOptions,
        reply: oneshot::Sender<Result<WindowSnapshot>>,
    },
    /// Replies whether a window with the locator exists.
    FocusWindow {
        locator: String,
        reply: oneshot::Sender<bool>,
    },
    /// The host is about to close a window.
    HostClose { window: WindowId },
    /// The host reports a window gained focus.
    HostFocus { window: WindowId },
    /// Ask a window's content to prepare for a reload. Replies whether the
    /// window exists.
    RequestReload {
        window: WindowId,
        reply: oneshot::Sender<bool>,
    },
    /// A message from a window's content.
    Content {
        window: WindowId,
        message: ContentMessage,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<WindowSnapshot>>,
    },
    Shutdown,
}

/// Cloneable handle for sending commands to a running service.
#[derive(Debug, Clone)]
pub struct CoordinatorSender {
    tx: mpsc::Sender<CoordinatorCommand>,
}

impl CoordinatorSender {
    pub async fn send(&self, command: CoordinatorCommand) -> Result<()> {
        self.tx.send(command).await.map_err(|_| Error::ServiceStopped)
    }

    pub async fn open_window(
        &self,
        locator: impl Into<String>,
        options: WindowOptions,
    ) -> Result<WindowSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(CoordinatorCommand::OpenWindow {
            locator: locator.into(),
            options,
            reply,
        })
        .await?;
        rx.await.map_err(|_| Error::ServiceStopped)?
    }

    pub async fn focus_window(&self, locator: impl Into<String>) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(CoordinatorCommand::FocusWindow {
            locator: locator.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| Error::ServiceStopped)
    }

    pub async fn host_close(&self, window: WindowId) -> Result<()> {
        self.send(CoordinatorCommand::HostClose { window }).await
    }

    pub async fn host_focus(&self, window: WindowId) -> Result<()> {
        self.send(CoordinatorCommand::HostFocus { window }).await
    }

    pub async fn request_reload(&self, window: WindowId) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(CoordinatorCommand::RequestReload { window, reply })
            .await?;
        rx.await.map_err(|_| Error::ServiceStopped)
    }

    pub async fn content(&self, window: WindowId, message: ContentMessage) -> Result<()> {
        self.send(CoordinatorCommand::Content { window, message }).await
    }

    pub async fn snapshot(&self) -> Result<Vec<WindowSnapshot>> {
        let (reply, rx) = oneshot::channel();
        self.send(CoordinatorCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| Error::ServiceStopped)
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(CoordinatorCommand::Shutdown).await
    }
}

/// Applies [`CoordinatorCommand`]s to a coordinator one at a time.
pub struct CoordinatorService {
    coordinator: Arc<WindowCoordinator>,
    command_rx: mpsc::Receiver<CoordinatorCommand>,
}

enum Next {
    Command(Option<CoordinatorCommand>),
    Tick,
}

impl CoordinatorService {
    #[must_use]
    pub fn new(coordinator: Arc<WindowCoordinator>) -> (Self, CoordinatorSender) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        let service = Self {
            coordinator,
            command_rx: rx,
        };
        (service, CoordinatorSender { tx })
    }

    pub fn coordinator(&self) -> Arc<WindowCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Run until a `Shutdown` command, until every sender is dropped, or
    /// until the last window was closed.
    pub async fn run(mut self) {
        tracing::info!("coordinator service started");

        let mut expiry = self.coordinator.config().close_grace_period.map(|grace| {
            let mut ticker = tokio::time::interval((grace / 4).max(MIN_EXPIRY_TICK));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            let next = match expiry.as_mut() {
                Some(ticker) => tokio::select! {
                    command = self.command_rx.recv() => Next::Command(command),
                    _ = ticker.tick() => Next::Tick,
                },
                None => Next::Command(self.command_rx.recv().await),
            };

            match next {
                Next::Tick => {
                    self.coordinator.expire_close_requests(Instant::now());
                }
                Next::Command(None) => {
                    tracing::debug!("all coordinator senders dropped");
                    break;
                }
                Next::Command(Some(CoordinatorCommand::Shutdown)) => {
                    tracing::info!("coordinator service received shutdown");
                    break;
                }
                Next::Command(Some(command)) => self.apply_command(command),
            }

            if self.coordinator.is_terminated() {
                break;
            }
        }

        tracing::info!("coordinator service stopped");
    }

    fn apply_command(&self, command: CoordinatorCommand) {
        match command {
            CoordinatorCommand::OpenWindow {
                locator,
                options,
                reply,
            } => {
                let result = self.coordinator.open(&locator, options);
                if let Err(error) = &result {
                    tracing::warn!(locator = %locator, %error, "open window failed");
                }
                let _ = reply.send(result);
            }
            CoordinatorCommand::FocusWindow { locator, reply } => {
                let _ = reply.send(self.coordinator.request_focus(&locator));
            }
            CoordinatorCommand::HostClose { window } => {
                let decision = self.coordinator.handle_close_attempt(window);
                tracing::debug!(%window, ?decision, "host close handled");
            }
            CoordinatorCommand::HostFocus { window } => {
                self.coordinator.host_focus_changed(window);
            }
            CoordinatorCommand::RequestReload { window, reply } => {
                let _ = reply.send(self.coordinator.request_reload(window));
            }
            CoordinatorCommand::Content { window, message } => {
                self.coordinator.handle_content_message(window, message);
            }
            CoordinatorCommand::Snapshot { reply } => {
                let _ = reply.send(self.coordinator.snapshot());
            }
            CoordinatorCommand::Shutdown => {
                // Handled in run()
            }
        }
    }
}
