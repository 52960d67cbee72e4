//! Audio pipeline: wire codec, resampling, conditioning, capture, playback.

pub mod capture;
pub mod codec;
pub mod filters;
pub mod playback;
pub mod resample;
pub mod ring_buffer;

/// Fixed capture block size in samples. One block becomes one outbound frame.
pub const FRAME_SAMPLES: usize = 4096;

/// Sample rate of outbound microphone audio on the wire.
pub const SEND_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of inbound synthesized audio from the remote service.
pub const PLAYBACK_SAMPLE_RATE: u32 = 24_000;

/// MIME type attached to outbound audio chunks.
pub fn send_mime_type() -> String {
    format!("audio/pcm;rate={SEND_SAMPLE_RATE}")
}
