//! Session error types.
//!
//! Every failure in the pipeline carries an `ErrorKind` so the host can
//! pick a remediation path without parsing message strings. Device and
//! transport kinds are fatal to the session; codec and tool-validation
//! kinds are recovered locally.

use thiserror::Error;

/// Classification of session failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Microphone denied or missing. Fatal, never auto-retried.
    DeviceUnavailable,
    /// Invalid or expired credential. Fatal; cached credential is cleared.
    TransportAuth,
    /// Remote endpoint or model unavailable. Fatal.
    TransportNotFound,
    /// Connectivity failure. Fatal for the current session.
    TransportNetwork,
    /// Inbound audio chunk failed to decode. Chunk dropped, session lives.
    MalformedAudio,
    /// Tool arguments failed local validation. Returned to the model as a
    /// structured ToolResult error, never surfaced to the user.
    ToolValidation,
}

impl ErrorKind {
    /// Whether this kind terminates the session.
    pub fn is_fatal(self) -> bool {
        !matches!(self, Self::MalformedAudio | Self::ToolValidation)
    }

    /// Short human-readable class for UI display, independent of the raw
    /// transport error text.
    pub fn user_message(self) -> &'static str {
        match self {
            Self::DeviceUnavailable => "Microphone unavailable",
            Self::TransportAuth => "Invalid or expired API credential",
            Self::TransportNotFound => "Voice model or endpoint not found",
            Self::TransportNetwork => "Connection to voice service lost",
            Self::MalformedAudio => "Received malformed audio",
            Self::ToolValidation => "Tool arguments rejected",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::DeviceUnavailable => "device_unavailable",
            Self::TransportAuth => "transport_auth",
            Self::TransportNotFound => "transport_not_found",
            Self::TransportNetwork => "transport_network",
            Self::MalformedAudio => "malformed_audio",
            Self::ToolValidation => "tool_validation",
        };
        write!(f, "{s}")
    }
}

/// Error type carried through the session pipeline.
#[derive(Error, Debug, Clone)]
#[error("{kind}: {message}")]
pub struct SessionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SessionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn malformed_audio(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedAudio, message)
    }

    pub fn device(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DeviceUnavailable, message)
    }
}
