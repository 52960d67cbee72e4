//! Decimation-based sample-rate conversion.
//!
//! Nearest-previous decimation, no anti-aliasing filter. This is a
//! deliberate trade of audio fidelity for CPU cost: the content is
//! speech-band and the capture path has a hard latency budget, so each
//! output sample is simply the source sample at `floor(i * ratio)`.
//! Do not replace with an averaging or FFT resampler without revisiting
//! that budget.

/// Downsample `input` from `in_rate` to `out_rate`.
///
/// Identity when the rates are equal. Output length is
/// `floor(len * out_rate / in_rate)`.
pub fn downsample(input: &[f32], in_rate: u32, out_rate: u32) -> Vec<f32> {
    if in_rate == out_rate {
        return input.to_vec();
    }
    let ratio = in_rate as f64 / out_rate as f64;
    let out_len = (input.len() as f64 / ratio).floor() as usize;
    let mut output = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src = (i as f64 * ratio).floor() as usize;
        output.push(input[src]);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_when_rates_equal() {
        let input = vec![0.1, 0.2, 0.3];
        assert_eq!(downsample(&input, 16_000, 16_000), input);
    }

    #[test]
    fn output_length_is_floored_ratio() {
        let input = vec![0.0f32; 4096];
        let out = downsample(&input, 48_000, 16_000);
        assert_eq!(out.len(), 1365);

        let out = downsample(&vec![0.0f32; 1000], 44_100, 16_000);
        assert_eq!(out.len(), (1000.0f64 * 16_000.0 / 44_100.0).floor() as usize);
    }

    #[test]
    fn picks_nearest_previous_sample() {
        // 3:1 ratio keeps every third sample, starting at index 0.
        let input: Vec<f32> = (0..9).map(|i| i as f32).collect();
        let out = downsample(&input, 48_000, 16_000);
        assert_eq!(out, vec![0.0, 3.0, 6.0]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(downsample(&[], 48_000, 16_000).is_empty());
    }
}
