//! Soft-knee feed-forward compressor insert.
//!
//! The detector is the peak absolute sample across all channels for a
//! frame, so stereo material is not pumped channel against channel. Two
//! one-pole smoothers run in cascade: the envelope follower, then the
//! computed gain itself. Smoothing the gain as well as the envelope
//! keeps the static curve's knee transitions from stepping audibly.
//!
//! Time constants use `coeff = exp(-1 / (seconds * sample_rate))`; a
//! zero time means instantaneous (coefficient 0).

use crate::buffer::AudioBuffer;
use crate::dsp::InsertProcessor;
use crate::engine::config::EngineConfig;
use crate::error::EngineResult;
use crate::level::db_to_linear;

/// Threshold, ratio, timing, knee, and makeup gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorSettings {
    /// Level above which gain reduction starts, in dB.
    pub threshold_db: f32,
    /// Compression ratio; values below 1 are treated as 1 (no change).
    pub ratio: f32,
    /// Attack time in milliseconds; 0 is instantaneous.
    pub attack_ms: f32,
    /// Release time in milliseconds; 0 is instantaneous.
    pub release_ms: f32,
    /// Width of the soft knee in dB, centred on the threshold.
    pub knee_db: f32,
    /// Gain added after reduction, in dB.
    pub makeup_gain_db: f32,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            threshold_db: -18.0,
            ratio: 3.0,
            attack_ms: 10.0,
            release_ms: 120.0,
            knee_db: 6.0,
            makeup_gain_db: 3.0,
        }
    }
}

/// Feed-forward dynamics processor for insert chains.
pub struct SoftKneeCompressor {
    sample_rate: u32,
    settings: CompressorSettings,
    envelope: f32,
    gain_db: f32,
}

impl SoftKneeCompressor {
    /// Create a compressor at the configured sample rate.
    pub fn new(config: EngineConfig, settings: CompressorSettings) -> Self {
        Self {
            sample_rate: config.sample_rate,
            settings,
            envelope: 0.0,
            gain_db: 0.0,
        }
    }

    /// Current settings.
    pub fn settings(&self) -> CompressorSettings {
        self.settings
    }

    /// Replace the settings; envelope and gain state carry over.
    pub fn set_settings(&mut self, settings: CompressorSettings) {
        self.settings = settings;
    }

    fn time_to_coeff(&self, time_ms: f32) -> f32 {
        if time_ms <= 0.0 {
            return 0.0;
        }
        let seconds = time_ms / 1_000.0;
        (-1.0 / (seconds * self.sample_rate as f32)).exp()
    }

    /// Static gain curve: dB of gain change for a detector level in dB.
    fn compute_gain_db(&self, level_db: f32) -> f32 {
        let threshold = self.settings.threshold_db;
        let ratio = self.settings.ratio.max(1.0);
        let knee = self.settings.knee_db.max(0.0);
        if level_db < threshold - knee / 2.0 {
            return 0.0;
        }
        if knee > 0.0 && level_db <= threshold + knee / 2.0 {
            let delta = level_db - (threshold - knee / 2.0);
            return (1.0 / ratio - 1.0) * delta * delta / (2.0 * knee);
        }
        let compressed = threshold + (level_db - threshold) / ratio;
        compressed - level_db
    }

    fn level_db(envelope: f32) -> f32 {
        // Floor the detector so a silent envelope reads a very low level
        // instead of -inf, which would stall the gain smoother.
        20.0 * envelope.max(1e-12).log10()
    }
}

impl InsertProcessor for SoftKneeCompressor {
    fn process(&mut self, buffer: &mut AudioBuffer) -> EngineResult<()> {
        let attack_coeff = self.time_to_coeff(self.settings.attack_ms);
        let release_coeff = self.time_to_coeff(self.settings.release_ms);
        let makeup = self.settings.makeup_gain_db;

        for frame in buffer.frames_iter_mut() {
            let detector = frame.iter().fold(0.0_f32, |acc, &x| acc.max(x.abs()));
            let coeff = if detector > self.envelope {
                attack_coeff
            } else {
                release_coeff
            };
            self.envelope += (detector - self.envelope) * (1.0 - coeff);

            let target_gain_db = self.compute_gain_db(Self::level_db(self.envelope));
            self.gain_db += (target_gain_db - self.gain_db) * (1.0 - coeff);

            let linear_gain = db_to_linear(self.gain_db + makeup);
            for sample in frame.iter_mut() {
                *sample *= linear_gain;
            }
        }
        Ok(())
    }
}
