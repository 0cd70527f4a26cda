//! Test tones and level metering for mono f32 sample blocks.

use std::f32::consts::TAU;

/// `frames` samples of a sine at `freq_hz` with peak `amplitude`.
pub fn sine_block(freq_hz: f32, amplitude: f32, sample_rate: u32, frames: usize) -> Vec<f32> {
    sine_block_from(freq_hz, amplitude, sample_rate, 0, frames)
}

/// Like [`sine_block`], starting at sample index `offset` so consecutive
/// blocks join without a phase jump.
pub fn sine_block_from(
    freq_hz: f32,
    amplitude: f32,
    sample_rate: u32,
    offset: u64,
    frames: usize,
) -> Vec<f32> {
    if sample_rate == 0 {
        return vec![0.0; frames];
    }
    let period = sample_rate as f64 / freq_hz.max(f32::MIN_POSITIVE) as f64;
    (0..frames)
        .map(|i| {
            let n = offset + i as u64;
            let phase = (n as f64 % period) / period;
            amplitude * (TAU * phase as f32).sin()
        })
        .collect()
}

/// Largest absolute sample value.
pub fn peak_amplitude(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
}

/// Root-mean-square level.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|s| (*s as f64) * (*s as f64)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_sine_peaks_at_one() {
        let block = sine_block(480.0, 1.0, 48_000, 1000);
        assert!((peak_amplitude(&block) - 1.0).abs() < 1e-3);
        assert!((rms(&block) - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-2);
    }

    #[test]
    fn consecutive_blocks_are_continuous() {
        let whole = sine_block(440.0, 1.0, 48_000, 200);
        let mut joined = sine_block_from(440.0, 1.0, 48_000, 0, 100);
        joined.extend(sine_block_from(440.0, 1.0, 48_000, 100, 100));
        for (a, b) in whole.iter().zip(&joined) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn empty_block_is_silent() {
        assert_eq!(rms(&[]), 0.0);
        assert_eq!(peak_amplitude(&[]), 0.0);
    }
}
