//! Gate envelope wrapping another module.

use crate::buffer::AudioBuffer;
use crate::engine::config::EngineConfig;
use crate::engine::module::AudioModule;
use crate::engine::params::{ParamSet, ParameterSpec};
use crate::error::EngineResult;

/// One-knob gate with musical attack/release smoothing.
///
/// The envelope chases the `gate` target with a one-pole smoother whose
/// coefficient is `exp(-1 / (seconds * sample_rate))`; a time of 0 ms
/// snaps instantly. The smoothed level multiplies every channel of the
/// wrapped source.
pub struct AmplitudeEnvelope {
    name: String,
    config: EngineConfig,
    params: ParamSet,
    source: Box<dyn AudioModule>,
    level: f32,
}

impl AmplitudeEnvelope {
    /// Wrap `source` with a gate envelope.
    pub fn new(
        name: impl Into<String>,
        config: EngineConfig,
        source: Box<dyn AudioModule>,
        attack_ms: f32,
        release_ms: f32,
    ) -> Self {
        let params = ParamSet::new(vec![
            ParameterSpec::new("gate", "Gate", 1.0, 0.0, 1.0)
                .with_description("Target loudness for the envelope (0 = silent, 1 = full level).")
                .with_context("dynamics"),
            ParameterSpec::new("attack_ms", "Attack", attack_ms, 0.0, 5_000.0)
                .with_unit("ms")
                .with_description("How quickly the sound opens after a cue.")
                .with_context("articulation"),
            ParameterSpec::new("release_ms", "Release", release_ms, 0.0, 5_000.0)
                .with_unit("ms")
                .with_description("How gently the sound fades after the gate closes.")
                .with_context("articulation"),
        ]);
        let level = params.get("envelope", "gate").ok().flatten().unwrap_or(1.0);
        Self {
            name: name.into(),
            config,
            params,
            source,
            level,
        }
    }

    fn time_to_coefficient(&self, time_ms: f32) -> f32 {
        if time_ms <= 0.0 {
            return 0.0;
        }
        let seconds = time_ms / 1_000.0;
        (-1.0 / (seconds * self.config.sample_rate as f32)).exp()
    }
}

impl AudioModule for AmplitudeEnvelope {
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
        let mut buffer = self.source.process(frames)?;
        if frames == 0 {
            return Ok(buffer);
        }

        let gate = self.params.get_required(&self.name, "gate")?;
        let attack_coeff = self.time_to_coefficient(self.params.get_required(&self.name, "attack_ms")?);
        let release_coeff =
            self.time_to_coefficient(self.params.get_required(&self.name, "release_ms")?);

        let mut level = self.level;
        for frame in buffer.frames_iter_mut() {
            let coeff = if gate > level {
                attack_coeff
            } else {
                release_coeff
            };
            level = gate + (level - gate) * coeff;
            for sample in frame.iter_mut() {
                *sample *= level;
            }
        }
        self.level = level;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::ConstantSource;

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    fn wrapped(attack_ms: f32, release_ms: f32) -> AmplitudeEnvelope {
        let cfg = config();
        AmplitudeEnvelope::new(
            "env",
            cfg,
            Box::new(ConstantSource::new("dc", cfg, 1.0)),
            attack_ms,
            release_ms,
        )
    }

    #[test]
    fn open_gate_passes_the_source() {
        let mut env = wrapped(0.0, 0.0);
        let out = env.process(16).unwrap();
        assert!(out.samples().iter().all(|&s| s == 1.0));
    }

    #[test]
    fn closing_the_gate_fades_towards_silence() {
        let mut env = wrapped(0.0, 50.0);
        env.process(16).unwrap();

        env.set_parameter("gate", Some(0.0)).unwrap();
        let fading = env.process(4_800).unwrap();
        assert!(fading.sample(0, 0) < 1.0);
        assert!(fading.sample(4_799, 0) < 0.2, "release should decay the level");
        assert!(
            fading.sample(0, 0) > fading.sample(4_799, 0),
            "decay must be monotonic for a constant source"
        );
    }

    #[test]
    fn zero_release_snaps_shut() {
        let mut env = wrapped(0.0, 0.0);
        env.process(16).unwrap();
        env.set_parameter("gate", Some(0.0)).unwrap();
        let out = env.process(16).unwrap();
        assert!(out.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn level_carries_across_blocks() {
        let mut env = wrapped(0.0, 200.0);
        env.process(16).unwrap();
        env.set_parameter("gate", Some(0.0)).unwrap();
        let first = env.process(480).unwrap();
        let second = env.process(480).unwrap();
        assert!(
            second.sample(0, 0) < first.sample(479, 0),
            "the release must continue where the previous block stopped"
        );
    }
}
