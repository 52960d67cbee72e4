//! Transcript aggregation.
//!
//! The remote service streams text deltas per speaker; this module
//! accumulates them into per-turn buffers, emitting growing non-final
//! events for live subtitles and exactly one final event per (role, turn)
//! when the turn completes.

use serde::Serialize;

/// Who produced a piece of transcript text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
}

/// A transcript update surfaced to the host.
///
/// Non-final events carry the full accumulated prefix for the turn so far;
/// the final event carries the complete turn text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEvent {
    pub role: Role,
    pub text: String,
    pub is_final: bool,
}

/// Per-turn accumulators for both roles.
#[derive(Default)]
pub struct TranscriptAggregator {
    user: String,
    model: String,
}

impl TranscriptAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta to the role's buffer and return the non-final event
    /// with the text accumulated so far.
    pub fn append_delta(&mut self, role: Role, fragment: &str) -> TranscriptEvent {
        let buf = match role {
            Role::User => &mut self.user,
            Role::Model => &mut self.model,
        };
        buf.push_str(fragment);
        TranscriptEvent {
            role,
            text: buf.clone(),
            is_final: false,
        }
    }

    /// Finalize the current turn: one final event per non-empty buffer,
    /// buffers cleared. Calling again without new deltas emits nothing.
    pub fn finalize_turn(&mut self) -> Vec<TranscriptEvent> {
        let mut events = Vec::new();
        if !self.user.is_empty() {
            events.push(TranscriptEvent {
                role: Role::User,
                text: std::mem::take(&mut self.user),
                is_final: true,
            });
        }
        if !self.model.is_empty() {
            events.push(TranscriptEvent {
                role: Role::Model,
                text: std::mem::take(&mut self.model),
                is_final: true,
            });
        }
        events
    }

    /// Drop the model's buffer without emitting a final event. Used on
    /// barge-in: the interrupted utterance is not a completed turn.
    pub fn discard_model_turn(&mut self) {
        self.model.clear();
    }
}
