//! Session configuration.
//!
//! `session_config.json` lives in the data directory and is written by the
//! host settings panel. Reads are tolerant: a missing or unparsable file
//! yields defaults. The credential is never logged.

pub mod paths;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use paths::get_data_dir;

/// Default wire endpoint when the host configures none.
const DEFAULT_ENDPOINT: &str = "wss://localhost:8765/v1/live";

/// Default model identifier sent in the setup message.
const DEFAULT_MODEL: &str = "duplex-voice-1";

/// session_config.json shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Capture gain / sensitivity multiplier.
    #[serde(default)]
    pub gain: Option<f32>,
    /// Request the remote service's reduced-latency mode.
    #[serde(default)]
    pub fast_response: Option<bool>,
    /// Optional raw 16-bit PCM file sent as identity context at session
    /// start.
    #[serde(default)]
    pub reference_audio: Option<PathBuf>,
    /// Named input device; `None` uses the system default.
    #[serde(default)]
    pub input_device: Option<String>,
}

impl SessionConfig {
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn gain(&self) -> f32 {
        self.gain.unwrap_or(crate::audio::filters::DEFAULT_GAIN)
    }

    pub fn fast_response(&self) -> bool {
        self.fast_response.unwrap_or(false)
    }
}

/// Path to session_config.json.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("session_config.json")
}

/// Read session_config.json from the data directory.
pub fn read_session_config() -> SessionConfig {
    read_json_file(&get_config_path()).unwrap_or_default()
}

/// Remove the cached credential. Called when the transport rejects it, so
/// the host re-prompts instead of retrying a dead key.
pub fn clear_api_key() {
    let path = get_config_path();
    let mut cfg: SessionConfig = match read_json_file(&path) {
        Some(c) => c,
        None => return,
    };
    if cfg.api_key.take().is_none() {
        return;
    }
    match serde_json::to_string_pretty(&cfg) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&path, json) {
                warn!("failed to rewrite {}: {e}", path.display());
            }
        }
        Err(e) => warn!("failed to serialize config: {e}"),
    }
}

/// Generic helper: read a JSON file and deserialize it.
fn read_json_file<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Option<T> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(val) => Some(val),
            Err(e) => {
                warn!("failed to parse {}: {e}", path.display());
                None
            }
        },
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to read {}: {e}", path.display());
            }
            None
        }
    }
}
