//! Microphone capture graph.
//!
//! Opens the input device via cpal, down-mixes to mono, and assembles
//! fixed 4096-sample blocks on a dedicated conditioning thread. Each block
//! runs through the filter chain and noise gate before being handed to the
//! session as a `CapturedFrame`.
//!
//! The cpal stream is confined to the capture thread (cpal streams are not
//! `Send`); the thread owns it from construction to `stop`.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::filters::{FrameConditioner, GateContext, DEFAULT_GAIN};
use super::ring_buffer::sample_ring;
use super::FRAME_SAMPLES;
use crate::error::SessionError;

/// One conditioned block of microphone audio at the device's native rate.
pub struct CapturedFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// UI volume metric (RMS x 100), independent of the gate decision.
    pub volume: f32,
    pub gated: bool,
}

/// Control surface shared between the session and the capture thread.
///
/// The session flips `assistant_speaking` from playback activity; the
/// capture thread reads it once per frame and passes the resulting
/// `GateContext` into the conditioner explicitly.
pub struct CaptureControls {
    gain: AtomicU32,
    assistant_speaking: AtomicBool,
}

impl CaptureControls {
    pub fn new(gain: f32) -> Arc<Self> {
        Arc::new(Self {
            gain: AtomicU32::new(gain.to_bits()),
            assistant_speaking: AtomicBool::new(false),
        })
    }

    pub fn set_gain(&self, gain: f32) {
        self.gain.store(gain.to_bits(), Ordering::Release);
    }

    pub fn gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Acquire))
    }

    pub fn set_assistant_speaking(&self, speaking: bool) {
        self.assistant_speaking.store(speaking, Ordering::Release);
    }

    pub fn gate_context(&self) -> GateContext {
        if self.assistant_speaking.load(Ordering::Acquire) {
            GateContext::AssistantSpeaking
        } else {
            GateContext::Quiet
        }
    }
}

impl Default for CaptureControls {
    fn default() -> Self {
        Self {
            gain: AtomicU32::new(DEFAULT_GAIN.to_bits()),
            assistant_speaking: AtomicBool::new(false),
        }
    }
}

/// List available input device names.
pub fn list_devices() -> Vec<String> {
    let host = cpal::default_host();
    let mut names = Vec::new();
    if let Ok(devices) = host.input_devices() {
        for dev in devices {
            if let Ok(name) = dev.name() {
                names.push(name);
            }
        }
    }
    names
}

/// List available output device names.
pub fn list_output_devices() -> Vec<String> {
    let host = cpal::default_host();
    let mut names = Vec::new();
    if let Ok(devices) = host.output_devices() {
        for dev in devices {
            if let Ok(name) = dev.name() {
                names.push(name);
            }
        }
    }
    names
}

struct ResolvedInput {
    device: cpal::Device,
    stream_config: StreamConfig,
    native_rate: u32,
}

/// Find and configure the input device. `None` uses the system default.
fn resolve_device(device_name: Option<&str>) -> Result<ResolvedInput, String> {
    let host = cpal::default_host();

    let device = if let Some(name) = device_name {
        host.input_devices()
            .map_err(|e| format!("failed to enumerate input devices: {e}"))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| format!("input device not found: {name}"))?
    } else {
        host.default_input_device()
            .ok_or_else(|| "no default input device available".to_string())?
    };

    let dev_name = device.name().unwrap_or_else(|_| "unknown".into());

    let default_config = device
        .default_input_config()
        .map_err(|e| format!("failed to get default input config: {e}"))?;
    let native_rate = default_config.sample_rate().0;
    let channels = default_config.channels();

    info!(device = %dev_name, native_rate, channels, "selected input device");

    Ok(ResolvedInput {
        device,
        stream_config: StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(native_rate),
            buffer_size: cpal::BufferSize::Default,
        },
        native_rate,
    })
}

/// Down-mix multi-channel audio to mono by averaging channels.
fn to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let ch = channels as usize;
    samples
        .chunks_exact(ch)
        .map(|frame| frame.iter().sum::<f32>() / ch as f32)
        .collect()
}

/// Running capture graph. Dropping it (or calling `stop`) releases the
/// microphone; acquisition is scoped to the session, never the process.
pub struct CaptureGraph {
    stop: Arc<AtomicBool>,
    join: Option<std::thread::JoinHandle<()>>,
    native_rate: u32,
}

impl CaptureGraph {
    /// Acquire the microphone and start producing frames on `frame_tx`.
    ///
    /// Fails with `DeviceUnavailable` if the device cannot be acquired;
    /// the session treats that as terminal and never retries.
    pub fn start(
        device_name: Option<String>,
        controls: Arc<CaptureControls>,
        frame_tx: mpsc::UnboundedSender<CapturedFrame>,
    ) -> Result<Self, SessionError> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<u32, String>>();

        let join = std::thread::Builder::new()
            .name("capture".into())
            .spawn(move || {
                capture_thread(device_name.as_deref(), controls, frame_tx, stop_flag, ready_tx);
            })
            .map_err(|e| SessionError::device(format!("capture thread: {e}")))?;

        let native_rate = ready_rx
            .recv()
            .map_err(|_| SessionError::device("capture thread exited during startup"))?
            .map_err(SessionError::device)?;

        Ok(Self {
            stop,
            join: Some(join),
            native_rate,
        })
    }

    /// Native sample rate of the acquired device.
    pub fn native_rate(&self) -> u32 {
        self.native_rate
    }

    /// Stop the stream and release the device. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
        debug!("capture stopped");
    }
}

impl Drop for CaptureGraph {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_thread(
    device_name: Option<&str>,
    controls: Arc<CaptureControls>,
    frame_tx: mpsc::UnboundedSender<CapturedFrame>,
    stop: Arc<AtomicBool>,
    ready_tx: std_mpsc::Sender<Result<u32, String>>,
) {
    let resolved = match resolve_device(device_name) {
        Ok(r) => r,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };
    let native_rate = resolved.native_rate;
    let channels = resolved.stream_config.channels;

    let (mut producer, mut consumer) = sample_ring(None);

    let stream = resolved.device.build_input_stream(
        &resolved.stream_config,
        move |data: &[f32], _info: &cpal::InputCallbackInfo| {
            let mono = to_mono(data, channels);
            // A full ring drops the tail; the conditioning loop catches up.
            producer.push_slice(&mono);
        },
        move |err| {
            error!("input stream error: {err}");
        },
        None,
    );
    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(format!("failed to build input stream: {e}")));
            return;
        }
    };
    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(format!("failed to start input stream: {e}")));
        return;
    }
    let _ = ready_tx.send(Ok(native_rate));
    info!(native_rate, "capture started");

    let mut conditioner = FrameConditioner::new(native_rate, controls.gain());
    while !stop.load(Ordering::Acquire) {
        match consumer.pop_block(FRAME_SAMPLES) {
            Some(block) => {
                conditioner.set_gain(controls.gain());
                let out = conditioner.process(&block, controls.gate_context());
                let frame = CapturedFrame {
                    samples: out.samples,
                    sample_rate: native_rate,
                    volume: out.volume,
                    gated: out.gated,
                };
                if frame_tx.send(frame).is_err() {
                    break; // Session gone.
                }
            }
            None => std::thread::sleep(Duration::from_millis(5)),
        }
    }
    drop(stream);
    debug!("capture thread exiting");
}
