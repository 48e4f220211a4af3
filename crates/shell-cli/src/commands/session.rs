//! `studio-shell session`: a headless window coordinator driven by a
//! JSON-lines script.
//!
//! Every host call is printed as one JSON line on stdout, so a script can
//! be checked against the exact host traffic it causes:
//!
//! ```text
//! {"command": "open", "locator": "home"}
//! {"command": "host-close", "window": 1}
//! {"command": "content", "window": 1, "message": {"type": "ready-to-close"}}
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use serde_json::{Value, json};
use shell_core::ShellConfig;
use shell_window::{
    ContentMessage, CoordinatorSender, CoordinatorService, HostError, HostHandle,
    OutboundMessage, PowerSaveBlockerId, WindowCoordinator, WindowHost, WindowId, WindowOptions,
};

use crate::error::{CliError, Result};

/// One line of a session script.
#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
enum SessionCommand {
    Open {
        locator: String,
        #[serde(default)]
        options: WindowOptions,
    },
    Focus {
        locator: String,
    },
    HostClose {
        window: WindowId,
    },
    HostFocus {
        window: WindowId,
    },
    RequestReload {
        window: WindowId,
    },
    Content {
        window: WindowId,
        message: ContentMessage,
    },
    Snapshot,
    Shutdown,
}

/// Host without a display. Reports every call on stdout.
#[derive(Debug, Default)]
struct LoggingHost {
    next_handle: AtomicU64,
    next_blocker: AtomicU64,
}

impl LoggingHost {
    fn emit(&self, event: Value) {
        tracing::debug!(%event, "host call");
        println!("{event}");
    }
}

impl WindowHost for LoggingHost {
    fn create(
        &self,
        locator: &str,
        options: &WindowOptions,
    ) -> std::result::Result<HostHandle, HostError> {
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed) + 1;
        self.emit(json!({
            "host": "create",
            "handle": handle,
            "locator": locator,
            "width": options.width,
            "height": options.height,
        }));
        Ok(HostHandle::new(handle))
    }

    fn destroy(&self, handle: HostHandle) {
        self.emit(json!({"host": "destroy", "handle": handle.raw()}));
    }

    fn focus(&self, handle: &HostHandle) {
        self.emit(json!({"host": "focus", "handle": handle.raw()}));
    }

    fn is_maximized(&self, _handle: &HostHandle) -> bool {
        false
    }

    fn set_size(&self, handle: &HostHandle, width: u32, height: u32) {
        self.emit(json!({"host": "set-size", "handle": handle.raw(), "width": width, "height": height}));
    }

    fn send(&self, handle: &HostHandle, message: &OutboundMessage) {
        self.emit(json!({"host": "send", "handle": handle.raw(), "message": message}));
    }

    fn reload(&self, handle: &HostHandle) {
        self.emit(json!({"host": "reload", "handle": handle.raw()}));
    }

    fn clear_history(&self, handle: &HostHandle) {
        self.emit(json!({"host": "clear-history", "handle": handle.raw()}));
    }

    fn start_power_save_blocker(&self) -> PowerSaveBlockerId {
        let id = self.next_blocker.fetch_add(1, Ordering::Relaxed) + 1;
        self.emit(json!({"host": "power-save-start", "blocker": id}));
        PowerSaveBlockerId(id)
    }

    fn stop_power_save_blocker(&self, id: PowerSaveBlockerId) {
        self.emit(json!({"host": "power-save-stop", "blocker": id.0}));
    }

    fn quit(&self) {
        self.emit(json!({"host": "quit"}));
    }
}

/// Handle `studio-shell session [--script FILE]`
pub async fn run_session(config: &ShellConfig, script: Option<&Path>) -> Result<()> {
    let script = match script {
        Some(path) => std::fs::read_to_string(path)?,
        None => std::io::read_to_string(std::io::stdin())?,
    };

    let coordinator = Arc::new(WindowCoordinator::new(
        Arc::new(LoggingHost::default()),
        config.coordinator_config(),
    ));
    let (service, tx) = CoordinatorService::new(Arc::clone(&coordinator));
    let task = tokio::spawn(service.run());

    let result = drive(&tx, &script).await;
    drop(tx);
    if let Err(error) = task.await {
        tracing::error!(%error, "coordinator service panicked");
    }
    result?;

    println!(
        "{}",
        json!({
            "session": "ended",
            "windows": coordinator.len(),
            "terminated": coordinator.is_terminated(),
        })
    );
    Ok(())
}

async fn drive(tx: &CoordinatorSender, script: &str) -> Result<()> {
    for (index, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let command: SessionCommand = serde_json::from_str(line)
            .map_err(|e| CliError::user(format!("line {}: {e}", index + 1)))?;

        match apply(tx, command).await {
            Ok(()) => {}
            Err(shell_window::Error::ServiceStopped) => {
                tracing::warn!(line = index + 1, "coordinator stopped, ignoring remaining commands");
                break;
            }
            Err(error) => return Err(error.into()),
        }
    }
    Ok(())
}

async fn apply(tx: &CoordinatorSender, command: SessionCommand) -> shell_window::Result<()> {
    match command {
        SessionCommand::Open { locator, options } => match tx.open_window(locator, options).await {
            Ok(window) => println!("{}", json!({"opened": window})),
            Err(shell_window::Error::ServiceStopped) => return Err(shell_window::Error::ServiceStopped),
            Err(error) => println!("{}", json!({"error": error.to_string()})),
        },
        SessionCommand::Focus { locator } => {
            let found = tx.focus_window(locator).await?;
            println!("{}", json!({"focused": found}));
        }
        SessionCommand::HostClose { window } => tx.host_close(window).await?,
        SessionCommand::HostFocus { window } => tx.host_focus(window).await?,
        SessionCommand::RequestReload { window } => {
            let found = tx.request_reload(window).await?;
            println!("{}", json!({"reload-requested": found}));
        }
        SessionCommand::Content { window, message } => tx.content(window, message).await?,
        SessionCommand::Snapshot => {
            let windows = tx.snapshot().await?;
            println!("{}", json!({"windows": windows}));
        }
        SessionCommand::Shutdown => tx.shutdown().await?,
    }
    Ok(())
}
