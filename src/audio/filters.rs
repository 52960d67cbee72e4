//! Microphone conditioning: filter chain, noise gate, volume metric.
//!
//! The chain runs in a fixed order — high-pass (rumble), low-pass (hiss),
//! gain — followed by an RMS noise gate that zeroes whole frames below a
//! context-dependent threshold.

use std::f32::consts::PI;

/// High-pass corner frequency. Removes desk thumps and HVAC rumble.
const HIGH_PASS_HZ: f32 = 150.0;

/// Low-pass corner frequency. Removes hiss above the speech band.
const LOW_PASS_HZ: f32 = 6_000.0;

/// Default capture gain (host-adjustable sensitivity).
pub const DEFAULT_GAIN: f32 = 1.5;

/// Gate threshold while the assistant is silent.
const GATE_THRESHOLD_QUIET: f32 = 0.01;

/// Gate threshold while the assistant is playing audio. Higher, to reject
/// speaker-to-mic echo bleed.
const GATE_THRESHOLD_ECHO: f32 = 0.03;

/// EMA coefficient for the UI volume metric; settles in a few ~85 ms
/// frames. The gate decision uses the instantaneous level, not the EMA.
const VOLUME_SMOOTHING: f32 = 0.4;

/// Whether the assistant is currently producing audible output.
///
/// Passed explicitly per frame by the caller; the conditioner never reads
/// playback state itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateContext {
    Quiet,
    AssistantSpeaking,
}

impl GateContext {
    fn threshold(self) -> f32 {
        match self {
            Self::Quiet => GATE_THRESHOLD_QUIET,
            Self::AssistantSpeaking => GATE_THRESHOLD_ECHO,
        }
    }
}

/// Root-mean-square of a sample block.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// First-order high-pass filter.
struct HighPass {
    alpha: f32,
    prev_in: f32,
    prev_out: f32,
}

impl HighPass {
    fn new(corner_hz: f32, sample_rate: u32) -> Self {
        let rc = 1.0 / (2.0 * PI * corner_hz);
        let dt = 1.0 / sample_rate as f32;
        Self {
            alpha: rc / (rc + dt),
            prev_in: 0.0,
            prev_out: 0.0,
        }
    }

    fn process(&mut self, x: f32) -> f32 {
        let y = self.alpha * (self.prev_out + x - self.prev_in);
        self.prev_in = x;
        self.prev_out = y;
        y
    }
}

/// First-order low-pass filter.
struct LowPass {
    alpha: f32,
    prev_out: f32,
}

impl LowPass {
    fn new(corner_hz: f32, sample_rate: u32) -> Self {
        let rc = 1.0 / (2.0 * PI * corner_hz);
        let dt = 1.0 / sample_rate as f32;
        Self {
            alpha: dt / (rc + dt),
            prev_out: 0.0,
        }
    }

    fn process(&mut self, x: f32) -> f32 {
        let y = self.prev_out + self.alpha * (x - self.prev_out);
        self.prev_out = y;
        y
    }
}

/// Result of conditioning one frame.
pub struct ConditionedFrame {
    pub samples: Vec<f32>,
    /// Smoothed UI volume metric (EMA of RMS, x 100), fed from the
    /// pre-gate level so the meter still moves while the gate holds.
    pub volume: f32,
    pub gated: bool,
}

/// Stateful per-stream conditioner. Filter state carries across frames so
/// there are no discontinuities at block boundaries.
pub struct FrameConditioner {
    high_pass: HighPass,
    low_pass: LowPass,
    gain: f32,
    volume_ema: f32,
}

impl FrameConditioner {
    pub fn new(sample_rate: u32, gain: f32) -> Self {
        Self {
            high_pass: HighPass::new(HIGH_PASS_HZ, sample_rate),
            low_pass: LowPass::new(LOW_PASS_HZ, sample_rate),
            gain,
            volume_ema: 0.0,
        }
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    /// Run the filter chain and the noise gate over one frame.
    pub fn process(&mut self, frame: &[f32], context: GateContext) -> ConditionedFrame {
        let mut out: Vec<f32> = frame
            .iter()
            .map(|&s| {
                let s = self.high_pass.process(s);
                let s = self.low_pass.process(s);
                s * self.gain
            })
            .collect();

        let level = rms(&out);
        let gated = level < context.threshold();
        if gated {
            out.iter_mut().for_each(|s| *s = 0.0);
        }
        self.volume_ema += VOLUME_SMOOTHING * (level - self.volume_ema);

        ConditionedFrame {
            samples: out,
            volume: self.volume_ema * 100.0,
            gated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, sample_rate: u32, len: usize, amp: f32) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin() * amp)
            .collect()
    }

    #[test]
    fn rms_of_known_signals() {
        assert_eq!(rms(&[]), 0.0);
        assert_eq!(rms(&vec![0.0; 64]), 0.0);
        let constant = vec![0.5f32; 256];
        assert!((rms(&constant) - 0.5).abs() < 1e-4);
        let sine = tone(440.0, 48_000, 4800, 1.0);
        assert!((rms(&sine) - 0.707).abs() < 0.01);
    }

    #[test]
    fn gate_zeroes_quiet_frames() {
        let mut cond = FrameConditioner::new(48_000, 1.0);
        let quiet = tone(440.0, 48_000, 4096, 0.001);
        let out = cond.process(&quiet, GateContext::Quiet);
        assert!(out.gated);
        assert!(out.samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn gate_passes_speech_level_frames() {
        let mut cond = FrameConditioner::new(48_000, 1.0);
        let speech = tone(440.0, 48_000, 4096, 0.2);
        let out = cond.process(&speech, GateContext::Quiet);
        assert!(!out.gated);
        assert!(out.samples.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn echo_context_raises_threshold() {
        // A level between the two thresholds passes when the assistant is
        // quiet but is gated while it is speaking.
        let mut cond = FrameConditioner::new(48_000, 1.0);
        let bleed = tone(440.0, 48_000, 4096, 0.025);
        let passed = cond.process(&bleed, GateContext::Quiet);
        assert!(!passed.gated);

        let mut cond = FrameConditioner::new(48_000, 1.0);
        let gated = cond.process(&bleed, GateContext::AssistantSpeaking);
        assert!(gated.gated);
    }

    #[test]
    fn volume_metric_smooths_across_frames() {
        let mut cond = FrameConditioner::new(48_000, 1.0);
        let loud = tone(440.0, 48_000, 4096, 0.5);
        let first = cond.process(&loud, GateContext::Quiet);
        // The meter decays over a silent frame instead of snapping to zero.
        let second = cond.process(&vec![0.0f32; 4096], GateContext::Quiet);
        assert!(second.volume > 0.0);
        assert!(second.volume < first.volume);
    }

    #[test]
    fn volume_reported_even_when_gated() {
        let mut cond = FrameConditioner::new(48_000, 1.0);
        let quiet = tone(440.0, 48_000, 4096, 0.001);
        let out = cond.process(&quiet, GateContext::Quiet);
        assert!(out.gated);
        assert!(out.volume > 0.0);
    }

    #[test]
    fn gain_scales_output() {
        let mut unity = FrameConditioner::new(48_000, 1.0);
        let mut doubled = FrameConditioner::new(48_000, 2.0);
        let input = tone(440.0, 48_000, 4096, 0.2);
        let a = unity.process(&input, GateContext::Quiet);
        let b = doubled.process(&input, GateContext::Quiet);
        assert!((rms(&b.samples) / rms(&a.samples) - 2.0).abs() < 0.01);
    }

    #[test]
    fn high_pass_attenuates_rumble() {
        let mut cond = FrameConditioner::new(48_000, 1.0);
        // 30 Hz rumble, well below the 150 Hz corner. Skip the first frame
        // so the filters settle.
        let rumble = tone(30.0, 48_000, 48_000, 0.5);
        let _ = cond.process(&rumble[..4096], GateContext::Quiet);
        let out = cond.process(&rumble[4096..8192], GateContext::Quiet);
        assert!(rms(&out.samples) < 0.5 * rms(&rumble[4096..8192]));
    }
}
