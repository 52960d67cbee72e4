//! Wire protocol types and the transport handle.
//!
//! Messages use `{"type": "<name>", ...}` framing on both directions.
//! The session owns the handle's lifecycle exclusively; everything else
//! only enqueues outbound messages through it.

pub mod ws;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::tools::ToolResult;

/// Inbound messages from the remote service.
///
/// Delivered on a single ordered channel; the session relies on that
/// ordering for barge-in atomicity (no audio chunk of an interrupted turn
/// can be observed after its `interrupted` marker).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    AudioChunk {
        encoded_audio: String,
    },
    Interrupted {},
    InputTranscriptDelta {
        text: String,
    },
    OutputTranscriptDelta {
        text: String,
    },
    TurnComplete {},
    ToolCall {
        id: String,
        name: String,
        #[serde(default)]
        args: Value,
    },
    Closed {},
    Error {
        message: String,
    },
}

/// Outbound messages to the remote service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Sent once after connect: model selection and latency preference.
    Setup {
        model: String,
        fast_response: bool,
    },
    /// One conditioned, resampled, wire-encoded microphone frame.
    AudioChunk {
        mime_type: String,
        encoded_audio: String,
    },
    ToolResult {
        id: String,
        name: String,
        result: Value,
    },
}

impl ClientMessage {
    pub fn tool_result(result: ToolResult) -> Self {
        Self::ToolResult {
            id: result.id,
            name: result.name,
            result: result.result,
        }
    }
}

/// What the writer task drains.
#[derive(Debug)]
pub enum Outbound {
    Message(ClientMessage),
    Close,
}

/// Send-only handle to the transport writer.
///
/// Sends are fire-and-forget: a failed send of one ~85 ms frame is
/// dropped, never retried, so capture timing stays aligned.
#[derive(Clone)]
pub struct TransportHandle {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl TransportHandle {
    /// Create a handle plus the receiver the writer task (or a test)
    /// drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, msg: ClientMessage) {
        let _ = self.tx.send(Outbound::Message(msg));
    }

    pub fn close(&self) {
        let _ = self.tx.send(Outbound::Close);
    }
}
