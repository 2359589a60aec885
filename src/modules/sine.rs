//! Sine oscillator source.

use std::f64::consts::TAU;

use crate::buffer::AudioBuffer;
use crate::engine::config::EngineConfig;
use crate::engine::module::AudioModule;
use crate::engine::params::{ParamSet, ParameterSpec};
use crate::error::EngineResult;

/// Sine oscillator with amplitude and pitch controls.
///
/// Phase is carried across blocks, so back-to-back `process` calls
/// produce one continuous tone. The same signal is written to every
/// configured channel.
pub struct SineOscillator {
    name: String,
    config: EngineConfig,
    params: ParamSet,
    phase: f64,
}

impl SineOscillator {
    /// Create an oscillator at 440 Hz and a conservative level.
    pub fn new(name: impl Into<String>, config: EngineConfig) -> Self {
        let params = ParamSet::new(vec![
            ParameterSpec::new("amplitude", "Loudness", 0.25, 0.0, 1.0)
                .with_description("Overall output level scaled for headroom.")
                .with_context("dynamics"),
            ParameterSpec::new("frequency_hz", "Pitch", 440.0, 20.0, 20_000.0)
                .with_unit("Hz")
                .with_description("Fundamental frequency of the oscillator.")
                .with_context("pitch"),
        ]);
        Self {
            name: name.into(),
            config,
            params,
            phase: 0.0,
        }
    }
}

impl AudioModule for SineOscillator {
    fn name(&self) -> &str {
        &self.name
    }

    fn describe_parameters(&self) -> Vec<ParameterSpec> {
        self.params.specs().to_vec()
    }

    fn get_parameter(&self, name: &str) -> EngineResult<Option<f32>> {
        self.params.get(&self.name, name)
    }

    fn set_parameter(&mut self, name: &str, value: Option<f32>) -> EngineResult<()> {
        self.params.set(&self.name, name, value)
    }

    fn process(&mut self, frames: usize) -> EngineResult<AudioBuffer> {
        let amplitude = self.params.get_required(&self.name, "amplitude")?;
        let frequency = self.params.get_required(&self.name, "frequency_hz")?;
        let increment = TAU * frequency as f64 / self.config.sample_rate as f64;

        let mut buffer = AudioBuffer::new(frames, self.config.channels);
        for frame in 0..frames {
            let sample = (self.phase.sin() * amplitude as f64) as f32;
            for channel in 0..self.config.channels {
                buffer.set_sample(frame, channel, sample);
            }
            self.phase = (self.phase + increment) % TAU;
        }
        Ok(buffer)
    }
}
