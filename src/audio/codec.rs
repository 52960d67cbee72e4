//! Wire codec for audio frames.
//!
//! Converts between normalized f32 samples, 16-bit fixed-point PCM, and the
//! base64 text encoding the transport carries. Stateless and deterministic;
//! lossless up to 16-bit quantization.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;

use crate::error::{ErrorKind, SessionError};

/// Encode normalized samples as base64 little-endian PCM16.
///
/// Each sample is clamped to [-1, 1]. Negative values scale by 32768,
/// non-negative by 32767, so both rails map onto the full i16 range
/// without overflow.
pub fn encode_for_wire(samples: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let clamped = s.clamp(-1.0, 1.0);
        let scaled = if clamped < 0.0 {
            clamped * 32768.0
        } else {
            clamped * 32767.0
        };
        bytes.extend_from_slice(&(scaled as i16).to_le_bytes());
    }
    B64.encode(&bytes)
}

/// Decode base64 little-endian PCM16 back into normalized samples.
///
/// Empty or odd-length payloads are rejected with `MalformedAudio`; the
/// caller drops the chunk and keeps the session alive.
pub fn decode_from_wire(data: &str) -> Result<Vec<f32>, SessionError> {
    let bytes = B64
        .decode(data)
        .map_err(|e| SessionError::new(ErrorKind::MalformedAudio, format!("bad base64: {e}")))?;
    if bytes.is_empty() {
        return Err(SessionError::malformed_audio("empty audio payload"));
    }
    if bytes.len() % 2 != 0 {
        return Err(SessionError::malformed_audio(format!(
            "misaligned PCM16 payload: {} bytes",
            bytes.len()
        )));
    }
    let samples = bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32 / 32768.0)
        .collect();
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_within_quantization_error() {
        let samples: Vec<f32> = (0..1000)
            .map(|i| (2.0 * std::f32::consts::PI * i as f32 / 100.0).sin() * 0.8)
            .collect();
        let decoded = decode_from_wire(&encode_for_wire(&samples)).unwrap();
        assert_eq!(decoded.len(), samples.len());
        for (a, b) in samples.iter().zip(&decoded) {
            assert!((a - b).abs() <= 1.0 / 32768.0, "{a} vs {b}");
        }
    }

    #[test]
    fn clamps_out_of_range_input() {
        let decoded = decode_from_wire(&encode_for_wire(&[2.0, -2.0])).unwrap();
        assert!((decoded[0] - 32767.0 / 32768.0).abs() < 1e-6);
        assert!((decoded[1] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn rails_do_not_overflow() {
        let decoded = decode_from_wire(&encode_for_wire(&[1.0, -1.0, 0.0])).unwrap();
        assert!(decoded[0] > 0.999);
        assert_eq!(decoded[1], -1.0);
        assert_eq!(decoded[2], 0.0);
    }

    #[test]
    fn rejects_empty_payload() {
        let err = decode_from_wire("").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedAudio);
    }

    #[test]
    fn rejects_misaligned_payload() {
        // Three bytes is not a whole number of 16-bit samples.
        let data = B64.encode([1u8, 2, 3]);
        let err = decode_from_wire(&data).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedAudio);
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = decode_from_wire("not base64!!!").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedAudio);
    }

    #[test]
    fn frame_sizing_matches_wire_contract() {
        // 1365 samples encode to 2730 PCM bytes before base64.
        let samples = vec![0.25f32; 1365];
        let encoded = encode_for_wire(&samples);
        let bytes = B64.decode(&encoded).unwrap();
        assert_eq!(bytes.len(), 2730);
    }
}
