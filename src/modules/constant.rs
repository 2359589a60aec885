//! A source that emits a fixed sample value on every channel.

use crate::buffer::AudioBuffer;
use crate::engine::config::EngineConfig;
use crate::engine::module::AudioModule;
use crate::engine::params::{ParamSet, ParameterSpec};
use crate::error::EngineResult;

/// Emits `value` on every frame and channel.
///
/// Mostly useful for gain-staging checks and tests, where a known input
/// level makes fader and send math directly observable.
pub struct ConstantSource {
    name: String,
    config: EngineConfig,
    params: ParamSet,
}

impl ConstantSource {
    /// Create a source emitting `value`.
    pub fn new(name: impl Into<String>, config: EngineConfig, value: f32) -> Self {
        let params = ParamSet::new(vec![ParameterSpec::new(
            "value",
            "Level",
            value,
            -1.0,
            1.0,
        )
        .with_description("Sample value emitted on every channel.")]);
        Self {
            name: name.into(),
            config,
            params,
        }
    }
}

impl AudioModule for ConstantSource {
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
        let value = self.params.get_required(&self.name, "value")?;
        let mut buffer = AudioBuffer::new(frames, self.config.channels);
        buffer.fill(value);
        Ok(buffer)
    }
}
