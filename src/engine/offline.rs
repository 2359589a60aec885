//! Offline block-render loop over registered modules.

use log::trace;

use crate::automation::{AutomationEvent, AutomationTimeline};
use crate::buffer::AudioBuffer;
use crate::engine::config::EngineConfig;
use crate::engine::module::AudioModule;
use crate::error::{EngineError, EngineResult};
use crate::sequencing::TempoMap;

/// When a scheduled change fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum At {
    /// Absolute time in seconds.
    Seconds(f64),
    /// Beat position, converted through the engine's tempo map.
    Beats(f64),
}

/// Block-based offline renderer driven by scheduled automation.
///
/// The engine owns a registry of named modules and pulls audio from
/// whichever one is designated as output; that module may itself be a
/// whole [`MixerGraph`](crate::mixer::MixerGraph). Rendering is
/// single-threaded and deterministic: the same modules, control calls,
/// and schedule always produce bit-identical output.
pub struct OfflineEngine {
    config: EngineConfig,
    tempo: TempoMap,
    timeline: AutomationTimeline,
    modules: Vec<Box<dyn AudioModule>>,
    output: Option<usize>,
}

impl OfflineEngine {
    /// Create an engine with the default tempo map.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            tempo: TempoMap::default(),
            timeline: AutomationTimeline::new(),
            modules: Vec::new(),
            output: None,
        }
    }

    /// Builder form of [`set_tempo`](Self::set_tempo).
    pub fn with_tempo(mut self, tempo: TempoMap) -> Self {
        self.tempo = tempo;
        self
    }

    /// The engine configuration.
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// The tempo map used for beat-based scheduling.
    pub fn tempo(&self) -> TempoMap {
        self.tempo
    }

    /// Replace the tempo map.
    pub fn set_tempo(&mut self, tempo: TempoMap) {
        self.tempo = tempo;
    }

    /// Register a module.
    ///
    /// The first registered module becomes the output until another is
    /// designated with `as_output` or [`set_output`](Self::set_output).
    pub fn add_module(&mut self, module: Box<dyn AudioModule>, as_output: bool) -> EngineResult<()> {
        if self.module_index(module.name()).is_some() {
            return Err(EngineError::DuplicateRegistration {
                kind: "module",
                name: module.name().to_string(),
            });
        }
        self.modules.push(module);
        if as_output || self.output.is_none() {
            self.output = Some(self.modules.len() - 1);
        }
        Ok(())
    }

    /// Designate a registered module as the render output.
    pub fn set_output(&mut self, name: &str) -> EngineResult<()> {
        let index = self
            .module_index(name)
            .ok_or_else(|| EngineError::UnknownTarget {
                kind: "module",
                name: name.to_string(),
            })?;
        self.output = Some(index);
        Ok(())
    }

    fn module_index(&self, name: &str) -> Option<usize> {
        self.modules.iter().position(|m| m.name() == name)
    }

    /// A registered module by name.
    pub fn module(&self, name: &str) -> Option<&dyn AudioModule> {
        self.modules
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.as_ref())
    }

    /// A registered module by name, mutably.
    pub fn module_mut(&mut self, name: &str) -> Option<&mut Box<dyn AudioModule>> {
        self.modules.iter_mut().find(|m| m.name() == name)
    }

    /// Queue a parameter change for a registered module.
    ///
    /// The module must exist at schedule time; the parameter is resolved
    /// when the event fires, and an unknown name fails that render.
    pub fn schedule_parameter_change(
        &mut self,
        module: &str,
        parameter: &str,
        value: Option<f32>,
        at: At,
        source: &str,
    ) -> EngineResult<()> {
        if self.module_index(module).is_none() {
            return Err(EngineError::UnknownTarget {
                kind: "module",
                name: module.to_string(),
            });
        }
        match at {
            At::Beats(beats) => {
                self.timeline
                    .schedule_in_beats(module, parameter, beats, value, &self.tempo, source);
            }
            At::Seconds(time_seconds) => {
                self.timeline.schedule(AutomationEvent {
                    time_seconds,
                    target: module.to_string(),
                    parameter: parameter.to_string(),
                    value,
                    source: source.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Number of queued automation events.
    pub fn pending_automation(&self) -> usize {
        self.timeline.len()
    }

    /// Render `duration_seconds` of audio from the output module.
    ///
    /// Each chunk first applies the automation events whose time falls
    /// within the chunk's interval (quantized to the chunk start), then
    /// pulls frames from the output module. A channel-count mismatch
    /// from the output module is fatal.
    pub fn render(&mut self, duration_seconds: f64) -> EngineResult<AudioBuffer> {
        let output_index = self.output.ok_or(EngineError::NoOutput)?;
        let rate = self.config.sample_rate as f64;
        let total_frames = (duration_seconds * rate).round() as usize;
        let mut output = AudioBuffer::new(total_frames, self.config.channels);

        let mut frame_start = 0;
        while frame_start < total_frames {
            let block_frames = self.config.block_size.min(total_frames - frame_start);
            let block_start = frame_start as f64 / rate;
            let horizon = block_start + block_frames.saturating_sub(1) as f64 / rate;

            let due: Vec<AutomationEvent> = self.timeline.pop_events_up_to(horizon).collect();
            if !due.is_empty() {
                trace!(
                    "engine block at {:.6}s applying {} automation event(s)",
                    block_start,
                    due.len()
                );
            }
            for event in due {
                let target = self
                    .module_mut(&event.target)
                    .ok_or_else(|| EngineError::UnknownTarget {
                        kind: "module",
                        name: event.target.clone(),
                    })?;
                target.set_parameter(&event.parameter, event.value)?;
            }

            let rendered = self.modules[output_index].process(block_frames)?;
            if rendered.channels() != self.config.channels {
                return Err(EngineError::ChannelMismatch {
                    module: self.modules[output_index].name().to_string(),
                    got: rendered.channels(),
                    expected: self.config.channels,
                });
            }
            output.write_block(frame_start, &rendered);
            frame_start += block_frames;
        }
        Ok(output)
    }
}
