//! Messages exchanged with window content.
//!
//! Both directions use a JSON object tagged by `type`:
//!
//! ```json
//! {"type": "resize-request", "width": 800, "height": 600}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::record::{EditState, TabKind};

/// Sent by window content to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentMessage {
    /// Content finished its unsaved-state handling.
    ReadyToClose,
    /// Content asks the host to reload it.
    Reload,
    /// Advisory; ignored while the window is maximized.
    ResizeRequest { width: u32, height: u32 },
    SetWindowState(EditState),
    SetActiveTab {
        #[serde(default)]
        tab: Option<TabKind>,
    },
    PreventAppSuspension { on: bool },
}

impl ContentMessage {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Sent by the coordinator to window content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutboundMessage {
    /// Flush edits and answer with [`ContentMessage::ReadyToClose`].
    BeforeClose,
    /// Prepare for a reload and answer with [`ContentMessage::Reload`].
    Reload,
}
