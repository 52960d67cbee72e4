//! IPC protocol types for communication with the host application.
//!
//! Events use `{"event": "<name>", "data": {...}}` format (Rust -> host).
//! Commands use `{"command": "<name>", ...}` format (host -> Rust).

pub mod bridge;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::tools::HostAction;
use crate::transcript::TranscriptEvent;

// ---------------------------------------------------------------------------
// Events: Rust -> host (stdout)
// ---------------------------------------------------------------------------

/// All events emitted to the host via stdout as JSON lines.
///
/// Serialized as `{"event": "<variant>", "data": {...}}`.
#[derive(Debug, Serialize)]
#[serde(tag = "event", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum HostEvent {
    Starting {},
    Ready {},
    StateChange { state: crate::session::SessionState },
    /// Microphone level for the UI meter, ~12 per second.
    Volume { level: f32 },
    Transcript(TranscriptEvent),
    /// A tool side effect the host must perform (play a video, open
    /// settings, and so on).
    ToolCommand(HostAction),
    Error { kind: ErrorKind, message: String },
    Disconnected {},
    AudioDevices {
        input: Vec<String>,
        output: Vec<String>,
    },
    Pong {},
    Stopping {},
}

// ---------------------------------------------------------------------------
// Commands: host -> Rust (stdin)
// ---------------------------------------------------------------------------

/// All commands received from the host via stdin as JSON lines.
///
/// Deserialized from `{"command": "<variant>", ...}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command")]
#[serde(rename_all = "snake_case")]
pub enum HostCommand {
    /// Start a session. Configuration comes from session_config.json;
    /// fields given here override it.
    Connect {
        #[serde(default)]
        fast_response: Option<bool>,
        #[serde(default)]
        input_device: Option<String>,
    },
    Disconnect {},
    /// Capture gain multiplier, applied immediately.
    SetSensitivity { gain: f32 },
    /// Latency preference for subsequent sessions. Takes effect at the
    /// next connect; the setup message is sent once per session.
    SetFastResponse { enabled: bool },
    ListAudioDevices {},
    Ping {},
    Stop {},
}
