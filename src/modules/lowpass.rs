//! One-pole low-pass filter wrapping another module.

use std::f32::consts::TAU;

use crate::buffer::AudioBuffer;
use crate::engine::config::EngineConfig;
use crate::engine::module::AudioModule;
use crate::engine::params::{ParamSet, ParameterSpec};
use crate::error::EngineResult;

/// Simple low-pass tuned for smooth tone-shaping gestures.
///
/// `state += alpha * (input - state)` per channel, with
/// `alpha = 1 - exp(-2π * cutoff / sample_rate)`. The `mix` parameter
/// blends raw and filtered signal.
pub struct OnePoleLowPass {
    name: String,
    config: EngineConfig,
    params: ParamSet,
    source: Box<dyn AudioModule>,
    state: Vec<f32>,
}

impl OnePoleLowPass {
    /// Wrap `source` with a low-pass stage.
    pub fn new(
        name: impl Into<String>,
        config: EngineConfig,
        source: Box<dyn AudioModule>,
        cutoff_hz: f32,
        mix: f32,
    ) -> Self {
        let max_cutoff = 20_000.0_f32.min(config.nyquist());
        let params = ParamSet::new(vec![
            ParameterSpec::new("cutoff_hz", "Cutoff", cutoff_hz, 20.0, max_cutoff)
                .with_unit("Hz")
                .with_description("Frequency where highs start to roll off.")
                .with_context("tone"),
            ParameterSpec::new("mix", "Wet Mix", mix, 0.0, 1.0)
                .with_description("Blend between raw tone (0) and filtered sound (1).")
                .with_context("tone"),
        ]);
        Self {
            name: name.into(),
            config,
            params,
            source,
            state: vec![0.0; config.channels],
        }
    }
}

impl AudioModule for OnePoleLowPass {
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
        let dry = self.source.process(frames)?;
        if frames == 0 {
            return Ok(dry);
        }

        let cutoff = self.params.get_required(&self.name, "cutoff_hz")?;
        let mix = self.params.get_required(&self.name, "mix")?;
        let alpha = 1.0 - (-TAU * cutoff / self.config.sample_rate as f32).exp();

        let channels = dry.channels().min(self.state.len());
        let mut output = dry.clone();
        for frame in 0..frames {
            for channel in 0..channels {
                let input = dry.sample(frame, channel);
                self.state[channel] += alpha * (input - self.state[channel]);
                output.set_sample(
                    frame,
                    channel,
                    input * (1.0 - mix) + self.state[channel] * mix,
                );
            }
        }
        Ok(output)
    }
}
