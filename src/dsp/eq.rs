//! Three-band parametric EQ insert.

use crate::buffer::AudioBuffer;
use crate::dsp::biquad::{design_high_shelf, design_low_shelf, design_peak, Biquad};
use crate::dsp::InsertProcessor;
use crate::engine::config::EngineConfig;
use crate::error::EngineResult;

/// Band gains, corners, and the mid-band Q.
///
/// Gains are in dB, frequencies in Hz. A band at 0 dB costs nothing at
/// all: its biquad stage is never built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqSettings {
    pub low_gain_db: f64,
    pub low_freq: f64,
    pub mid_gain_db: f64,
    pub mid_freq: f64,
    pub mid_q: f64,
    pub high_gain_db: f64,
    pub high_freq: f64,
}

impl Default for EqSettings {
    fn default() -> Self {
        Self {
            low_gain_db: 0.0,
            low_freq: 160.0,
            mid_gain_db: 0.0,
            mid_freq: 1_200.0,
            mid_q: 1.0,
            high_gain_db: 0.0,
            high_freq: 6_000.0,
        }
    }
}

/// Low shelf, peaking mid, and high shelf in series.
///
/// Per-channel filter state persists across blocks so the EQ can sit in
/// a channel's insert chain without zipper noise.
pub struct ThreeBandEq {
    config: EngineConfig,
    settings: EqSettings,
    low: Option<Biquad>,
    mid: Option<Biquad>,
    high: Option<Biquad>,
}

impl ThreeBandEq {
    /// Build the EQ, designing only the stages with non-flat gain.
    pub fn new(config: EngineConfig, settings: EqSettings) -> Self {
        let mut eq = Self {
            config,
            settings,
            low: None,
            mid: None,
            high: None,
        };
        eq.rebuild();
        eq
    }

    /// Current settings.
    pub fn settings(&self) -> EqSettings {
        self.settings
    }

    /// Replace the settings and redesign all stages.
    ///
    /// Filter state restarts from silence; this models a configuration
    /// edit, not a modulation path.
    pub fn set_settings(&mut self, settings: EqSettings) {
        self.settings = settings;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let channels = self.config.channels;
        let rate = self.config.sample_rate;
        let s = &self.settings;
        self.low = design_low_shelf(rate, s.low_freq, s.low_gain_db, channels);
        self.mid = design_peak(rate, s.mid_freq, s.mid_gain_db, s.mid_q.max(0.1), channels);
        self.high = design_high_shelf(rate, s.high_freq, s.high_gain_db, channels);
    }
}

impl InsertProcessor for ThreeBandEq {
    fn process(&mut self, buffer: &mut AudioBuffer) -> EngineResult<()> {
        if let Some(low) = &mut self.low {
            low.process(buffer);
        }
        if let Some(mid) = &mut self.mid {
            mid.process(buffer);
        }
        if let Some(high) = &mut self.high {
            high.process(buffer);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn flat_settings_are_bit_exact_bypass() {
        let mut eq = ThreeBandEq::new(config(), EqSettings::default());
        let input = AudioBuffer::from_fn(256, 2, |frame, channel| {
            ((frame * 7 + channel * 3) % 13) as f32 / 13.0 - 0.5
        });
        let mut buffer = input.clone();
        eq.process(&mut buffer).unwrap();
        assert_eq!(buffer, input, "flat EQ must not touch the signal");
    }

    #[test]
    fn tiny_gain_still_bypasses() {
        let settings = EqSettings {
            mid_gain_db: 5e-7,
            ..EqSettings::default()
        };
        let mut eq = ThreeBandEq::new(config(), settings);
        let input = AudioBuffer::from_fn(64, 2, |frame, _| (frame as f32 * 0.01).sin());
        let mut buffer = input.clone();
        eq.process(&mut buffer).unwrap();
        assert_eq!(buffer, input);
    }

    #[test]
    fn low_boost_raises_dc_level() {
        let settings = EqSettings {
            low_gain_db: 6.0,
            ..EqSettings::default()
        };
        let mut eq = ThreeBandEq::new(config(), settings);
        let mut buffer = AudioBuffer::from_fn(48_000, 2, |_, _| 0.25);
        eq.process(&mut buffer).unwrap();
        let settled = buffer.sample(buffer.frames() - 1, 0);
        assert!(settled > 0.4, "expected boosted DC, got {}", settled);
    }

    #[test]
    fn set_settings_rebuilds_stages() {
        let mut eq = ThreeBandEq::new(config(), EqSettings::default());
        let input = AudioBuffer::from_fn(128, 2, |_, _| 0.25);

        let mut flat = input.clone();
        eq.process(&mut flat).unwrap();
        assert_eq!(flat, input);

        eq.set_settings(EqSettings {
            low_gain_db: -12.0,
            ..EqSettings::default()
        });
        let mut cut = input.clone();
        eq.process(&mut cut).unwrap();
        assert_ne!(cut, input, "rebuilt EQ should now filter");
    }
}
