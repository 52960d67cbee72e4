//! Tool-call dispatch.
//!
//! The remote model issues structured function calls; each one is routed
//! by name, validated locally, and answered with exactly one result for
//! its id. Side effects (opening the settings panel, starting the video
//! overlay, display standby) are delegated to the host through a
//! `HostAction` — the dispatcher itself stays pure.
//!
//! Validation failures are never swallowed: the result sent back to the
//! model names the received value and the required format so the model
//! can retry with a corrected call instead of hallucinating around a
//! silent drop.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Inbound function-call request from the remote model.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

/// Result returned to the remote model. Exactly one per ToolCall id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub id: String,
    pub name: String,
    pub result: Value,
}

/// A side effect for the host application to perform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostAction {
    pub name: String,
    pub args: Value,
}

/// Outcome of dispatching one call: the result to send back, plus the
/// host side effect when validation passed.
pub struct DispatchOutcome {
    pub result: ToolResult,
    pub action: Option<HostAction>,
}

/// Length of an externally-verifiable media identifier.
const VIDEO_ID_LEN: usize = 11;
const VIDEO_ID_FORMAT: &str = "exactly 11 characters from [A-Za-z0-9_-]";

fn is_valid_video_id(id: &str) -> bool {
    id.len() == VIDEO_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Routes tool calls to their handlers.
#[derive(Default)]
pub struct ToolCallDispatcher;

impl ToolCallDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Dispatch one call. Infallible: every path produces a result.
    pub fn dispatch(&self, call: ToolCall) -> DispatchOutcome {
        debug!(id = %call.id, name = %call.name, "tool call");
        let (result, action) = match call.name.as_str() {
            "play_video" => self.play_video(&call.args),
            "stop_video" => Self::delegate(&call.name, json!({})),
            "open_settings" => Self::delegate(&call.name, json!({})),
            "standby" => Self::delegate(&call.name, json!({})),
            "wake" => Self::delegate(&call.name, json!({})),
            other => {
                warn!(name = %other, "unknown tool");
                (
                    json!({
                        "error": "unknown_tool",
                        "message": format!("no tool named '{other}' is available"),
                    }),
                    None,
                )
            }
        };
        DispatchOutcome {
            result: ToolResult {
                id: call.id,
                name: call.name,
                result,
            },
            action,
        }
    }

    /// Argument-free tool: acknowledge and hand the side effect to the host.
    fn delegate(name: &str, args: Value) -> (Value, Option<HostAction>) {
        (
            json!({ "ok": true }),
            Some(HostAction {
                name: name.to_string(),
                args,
            }),
        )
    }

    /// `play_video` requires a strict 11-character media identifier. On
    /// validation failure the side effect is skipped and the error result
    /// tells the model what it sent and what is required.
    fn play_video(&self, args: &Value) -> (Value, Option<HostAction>) {
        let video_id = args.get("video_id").and_then(Value::as_str).unwrap_or("");
        if !is_valid_video_id(video_id) {
            warn!(received = %video_id, "play_video rejected: invalid video id");
            return (
                json!({
                    "error": "invalid_video_id",
                    "received": video_id,
                    "expected": VIDEO_ID_FORMAT,
                    "message": format!(
                        "'{video_id}' is not a valid video id; provide {VIDEO_ID_FORMAT}"
                    ),
                }),
                None,
            );
        }
        (
            json!({ "ok": true, "video_id": video_id }),
            Some(HostAction {
                name: "play_video".to_string(),
                args: json!({ "video_id": video_id }),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Value) -> ToolCall {
        ToolCall {
            id: "call-1".into(),
            name: name.into(),
            args,
        }
    }

    #[test]
    fn valid_video_id_triggers_host_action() {
        let d = ToolCallDispatcher::new();
        let out = d.dispatch(call("play_video", json!({ "video_id": "dQw4w9WgXcQ" })));
        assert_eq!(out.result.id, "call-1");
        assert_eq!(out.result.result["ok"], true);
        let action = out.action.expect("side effect");
        assert_eq!(action.name, "play_video");
        assert_eq!(action.args["video_id"], "dQw4w9WgXcQ");
    }

    #[test]
    fn invalid_video_id_feeds_back_without_side_effect() {
        let d = ToolCallDispatcher::new();
        for bad in ["short", "waaaay-too-long-id", "bad id 1234", ""] {
            let out = d.dispatch(call("play_video", json!({ "video_id": bad })));
            assert!(out.action.is_none(), "no side effect for {bad:?}");
            assert_eq!(out.result.result["error"], "invalid_video_id");
            assert_eq!(out.result.result["received"], bad);
            assert_eq!(out.result.result["expected"], VIDEO_ID_FORMAT);
        }
    }

    #[test]
    fn missing_video_id_argument_is_a_validation_error() {
        let d = ToolCallDispatcher::new();
        let out = d.dispatch(call("play_video", json!({})));
        assert!(out.action.is_none());
        assert_eq!(out.result.result["error"], "invalid_video_id");
    }

    #[test]
    fn unknown_tool_gets_structured_error_result() {
        let d = ToolCallDispatcher::new();
        let out = d.dispatch(call("reboot_house", json!({})));
        assert!(out.action.is_none());
        assert_eq!(out.result.result["error"], "unknown_tool");
        assert_eq!(out.result.name, "reboot_house");
    }

    #[test]
    fn argument_free_tools_delegate_to_host() {
        let d = ToolCallDispatcher::new();
        for name in ["stop_video", "open_settings", "standby", "wake"] {
            let out = d.dispatch(call(name, json!({})));
            assert_eq!(out.result.result["ok"], true);
            assert_eq!(out.action.unwrap().name, name);
        }
    }

    #[test]
    fn video_id_character_set_is_strict() {
        assert!(is_valid_video_id("abc-DEF_123"));
        assert!(!is_valid_video_id("abc-DEF_12!"));
        assert!(!is_valid_video_id("abc-DEF_12"));
        assert!(!is_valid_video_id("abc-DEF_1234"));
    }
}
