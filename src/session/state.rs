//! Session state tracking.
//!
//! `AtomicU8`-backed cell so the state can be read from IPC handlers
//! without locking the session loop.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle states of one session.
///
/// `Closed` is terminal: a new session object is constructed to
/// reconnect, state is never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SessionState {
    /// No session. Also the landing state after a failed connect.
    Idle = 0,
    /// Transport handshake in flight.
    Connecting = 1,
    /// Streaming microphone audio, no model turn in progress.
    Listening = 2,
    /// Model audio is being scheduled or played.
    Speaking = 3,
    /// UI hint: the model is working a tool call. Not structurally
    /// required by the protocol.
    Thinking = 4,
    /// Terminal.
    Closed = 5,
}

impl SessionState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Connecting,
            2 => Self::Listening,
            3 => Self::Speaking,
            4 => Self::Thinking,
            5 => Self::Closed,
            _ => Self::Idle,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Listening => write!(f, "listening"),
            Self::Speaking => write!(f, "speaking"),
            Self::Thinking => write!(f, "thinking"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Thread-safe state cell.
#[derive(Debug)]
pub struct StateCell {
    state: AtomicU8,
}

impl StateCell {
    pub fn new(initial: SessionState) -> Self {
        Self {
            state: AtomicU8::new(initial as u8),
        }
    }

    pub fn get(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Transition to `next`. Returns `true` if the state changed.
    /// Transitions out of `Closed` are refused.
    pub fn set(&self, next: SessionState) -> bool {
        let current = self.get();
        if current == next || current == SessionState::Closed {
            return false;
        }
        self.state.store(next as u8, Ordering::Release);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_reports_changes_only() {
        let cell = StateCell::new(SessionState::Idle);
        assert!(cell.set(SessionState::Connecting));
        assert!(!cell.set(SessionState::Connecting));
        assert_eq!(cell.get(), SessionState::Connecting);
    }

    #[test]
    fn closed_is_terminal() {
        let cell = StateCell::new(SessionState::Listening);
        assert!(cell.set(SessionState::Closed));
        assert!(!cell.set(SessionState::Listening));
        assert_eq!(cell.get(), SessionState::Closed);
    }
}
