//! Render analysis helpers: per-channel RMS and a lightweight LUFS
//! estimate.
//!
//! These operate on finished renders (or slices of them) for trend
//! dashboards and diagnostics. They never feed back into processing.

use crate::buffer::AudioBuffer;
use crate::dsp::biquad::Biquad;

/// Root-mean-square amplitude for each channel.
pub fn rms_per_channel(buffer: &AudioBuffer) -> Vec<f32> {
    let channels = buffer.channels();
    if buffer.is_empty() {
        return vec![0.0; channels];
    }
    let frames = buffer.frames();
    (0..channels)
        .map(|channel| {
            let sum_sq: f32 = (0..frames)
                .map(|frame| {
                    let s = buffer.sample(frame, channel);
                    s * s
                })
                .sum();
            (sum_sq / frames as f32).sqrt()
        })
        .collect()
}

/// Per-channel RMS in dBFS relative to `reference` amplitude.
pub fn rms_dbfs(buffer: &AudioBuffer, reference: f32) -> Vec<f32> {
    let reference = reference.max(1e-9);
    rms_per_channel(buffer)
        .into_iter()
        .map(|rms| 20.0 * (rms.max(1e-9) / reference).log10())
        .collect()
}

/// Simplified BS.1770 integrated loudness estimate.
///
/// Applies the K-weighting pre-filter and RLB high-pass, then averages
/// power across channels: `-0.691 + 10·log10(mean power)`. The filter
/// constants are derived for 48 kHz; at other rates a flat √2 power
/// scaling keeps the result deterministic. Returns `-inf` for silence
/// or an empty buffer.
pub fn integrated_lufs(buffer: &AudioBuffer, sample_rate: u32) -> f64 {
    if buffer.is_empty() {
        return f64::NEG_INFINITY;
    }

    let weighted = apply_k_weighting(buffer, sample_rate);
    let frames = weighted.frames();
    let channels = weighted.channels();
    let mut mean_power = 0.0_f64;
    for channel in 0..channels {
        let mut sum_sq = 0.0_f64;
        for frame in 0..frames {
            let s = weighted.sample(frame, channel) as f64;
            sum_sq += s * s;
        }
        mean_power += sum_sq / frames as f64;
    }
    mean_power /= channels as f64;

    if mean_power <= 0.0 {
        return f64::NEG_INFINITY;
    }
    -0.691 + 10.0 * mean_power.log10()
}

/// BS.1770 pre-filter (high shelf) and RLB weighting (high-pass).
fn apply_k_weighting(buffer: &AudioBuffer, sample_rate: u32) -> AudioBuffer {
    if sample_rate != 48_000 {
        let mut scaled = buffer.clone();
        scaled.scale(2.0_f32.sqrt());
        return scaled;
    }
    let channels = buffer.channels();

    let mut prefilter = Biquad::new(
        [1.535_124_859_586_97, -2.691_696_189_406_38, 1.198_392_810_852_85],
        [1.0, -1.690_659_293_182_41, 0.732_480_774_215_85],
        channels,
    );
    let mut rlb = Biquad::new(
        [1.0, -2.0, 1.0],
        [1.0, -1.990_047_454_833_98, 0.990_072_250_366_21],
        channels,
    );

    let mut weighted = buffer.clone();
    prefilter.process(&mut weighted);
    rlb.process(&mut weighted);
    weighted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_constant_signal_is_its_magnitude() {
        let buffer = AudioBuffer::from_fn(4_800, 2, |_, _| 0.5);
        let rms = rms_per_channel(&buffer);
        assert_eq!(rms.len(), 2);
        assert!((rms[0] - 0.5).abs() < 1e-6);
        assert!((rms[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn rms_of_empty_buffer_is_zero() {
        let buffer = AudioBuffer::new(0, 2);
        assert_eq!(rms_per_channel(&buffer), vec![0.0, 0.0]);
    }

    #[test]
    fn dbfs_references_full_scale() {
        let buffer = AudioBuffer::from_fn(4_800, 2, |_, _| 1.0);
        let db = rms_dbfs(&buffer, 1.0);
        assert!(db[0].abs() < 1e-4);

        let half = AudioBuffer::from_fn(4_800, 2, |_, _| 0.5);
        let db = rms_dbfs(&half, 1.0);
        assert!((db[0] + 6.0206).abs() < 0.01);
    }

    #[test]
    fn lufs_of_silence_is_negative_infinity() {
        let silent = AudioBuffer::new(48_000, 2);
        assert_eq!(integrated_lufs(&silent, 48_000), f64::NEG_INFINITY);
        let empty = AudioBuffer::new(0, 2);
        assert_eq!(integrated_lufs(&empty, 48_000), f64::NEG_INFINITY);
    }

    #[test]
    fn lufs_tracks_level_changes() {
        let make = |amp: f32| {
            AudioBuffer::from_fn(48_000, 2, |frame, _| {
                amp * (std::f32::consts::TAU * 997.0 * frame as f32 / 48_000.0).sin()
            })
        };
        let loud = integrated_lufs(&make(0.5), 48_000);
        let quiet = integrated_lufs(&make(0.05), 48_000);
        // A 20 dB amplitude drop should read ~20 LU lower.
        assert!((loud - quiet - 20.0).abs() < 0.5, "got {} vs {}", loud, quiet);
    }

    #[test]
    fn other_sample_rates_use_the_flat_fallback() {
        let buffer = AudioBuffer::from_fn(44_100, 2, |_, _| 0.25);
        let lufs = integrated_lufs(&buffer, 44_100);
        // sqrt(2) power scaling of a DC 0.25 signal: mean power = 0.125,
        // so -0.691 + 10*log10(0.125).
        let expected = -0.691 + 10.0 * 0.125_f64.log10();
        assert!((lufs - expected).abs() < 0.01, "got {}", lufs);
    }
}
