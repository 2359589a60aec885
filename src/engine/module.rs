//! Core trait shared by every audio-producing or transforming module.

use crate::buffer::AudioBuffer;
use crate::engine::params::ParameterSpec;
use crate::error::EngineResult;

/// Capability interface for sources and processors hosted by the engine.
///
/// Concrete DSP units and domain sources all implement this; there is no
/// inheritance hierarchy beyond it. Implementations carry mutable state
/// across `process` calls (oscillator phase, filter memories), so a
/// module instance must never be shared between two hosts.
pub trait AudioModule: Send {
    /// Stable module name, unique within its host.
    fn name(&self) -> &str;

    /// The parameters this module declares.
    fn describe_parameters(&self) -> Vec<ParameterSpec>;

    /// Current value of a declared parameter.
    fn get_parameter(&self, name: &str) -> EngineResult<Option<f32>>;

    /// Clamp and store a new value for a declared parameter.
    fn set_parameter(&mut self, name: &str, value: Option<f32>) -> EngineResult<()>;

    /// Produce the next `frames` frames of audio.
    ///
    /// The returned buffer must have exactly the configured channel
    /// count; callers treat a mismatch as fatal.
    fn process(&mut self, frames: usize) -> EngineResult<AudioBuffer>;
}

/// Allow boxed modules to be used directly (for dynamic dispatch).
impl AudioModule for Box<dyn AudioModule> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn describe_parameters(&self) -> Vec<ParameterSpec> {
        (**self).describe_parameters()
    }

    fn get_parameter(&self, name: &str) -> EngineResult<Option<f32>> {
        (**self).get_parameter(name)
    }

    fn set_parameter(&mut self, name: &str, value: Option<f32>) -> EngineResult<()> {
        (**self).set_parameter(name, value)
    }

    fn process(&mut self, frames: usize) -> EngineResult<AudioBuffer> {
        (**self).process(frames)
    }
}
