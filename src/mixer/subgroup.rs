//! Subgroup bus: processes the sum of its assigned channels.

use crate::buffer::AudioBuffer;
use crate::dsp::InsertProcessor;
use crate::engine::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::level::db_to_linear;
use crate::mixer::meter::MeterReading;

/// Applies an insert chain and fader to an accumulated inbound sum.
///
/// Inbound edges are implicit: whatever channels or child subgroups the
/// graph currently assigns to this subgroup. The subgroup meters its own
/// output each block.
pub struct MixerSubgroup {
    name: String,
    config: EngineConfig,
    inserts: Vec<Box<dyn InsertProcessor>>,
    fader_db: f32,
    fader_gain: f32,
    muted: bool,
    solo: bool,
    last_meter: MeterReading,
}

impl MixerSubgroup {
    /// Create a subgroup at unity fader with no inserts.
    pub fn new(name: impl Into<String>, config: EngineConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inserts: Vec::new(),
            fader_db: 0.0,
            fader_gain: 1.0,
            muted: false,
            solo: false,
            last_meter: MeterReading::SILENCE,
        }
    }

    /// Builder form of [`set_fader_db`](Self::set_fader_db).
    pub fn with_fader_db(mut self, value: f32) -> Self {
        self.set_fader_db(value);
        self
    }

    /// Builder form of [`add_insert`](Self::add_insert).
    pub fn with_insert(mut self, insert: Box<dyn InsertProcessor>) -> Self {
        self.add_insert(insert);
        self
    }

    /// Subgroup name, unique within its graph.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append an insert processor to the chain.
    pub fn add_insert(&mut self, insert: Box<dyn InsertProcessor>) {
        self.inserts.push(insert);
    }

    /// Fader level in dB.
    pub fn fader_db(&self) -> f32 {
        self.fader_db
    }

    /// Update the fader level and its derived linear gain.
    pub fn set_fader_db(&mut self, value: f32) {
        self.fader_db = value;
        self.fader_gain = db_to_linear(value);
    }

    /// Mute state.
    pub fn muted(&self) -> bool {
        self.muted
    }

    /// Set the mute flag.
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Solo state.
    pub fn solo(&self) -> bool {
        self.solo
    }

    /// Set the solo flag.
    pub fn set_solo(&mut self, solo: bool) {
        self.solo = solo;
    }

    /// Meter for the most recently processed block.
    pub fn last_meter(&self) -> MeterReading {
        self.last_meter
    }

    /// Process the accumulated inbound sum for one block.
    pub fn process(&mut self, mut buffer: AudioBuffer) -> EngineResult<AudioBuffer> {
        for (index, insert) in self.inserts.iter_mut().enumerate() {
            insert.process(&mut buffer)?;
            if buffer.channels() != self.config.channels {
                return Err(EngineError::ChannelMismatch {
                    module: format!("subgroup '{}' insert {}", self.name, index),
                    got: buffer.channels(),
                    expected: self.config.channels,
                });
            }
        }
        if self.muted {
            buffer.fill(0.0);
        } else {
            buffer.scale(self.fader_gain);
        }
        self.last_meter = MeterReading::from_buffer(&buffer);
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EngineConfig {
        EngineConfig {
            sample_rate: 48_000,
            block_size: 8,
            channels: 2,
        }
    }

    fn constant_block(value: f32) -> AudioBuffer {
        AudioBuffer::from_fn(8, 2, |_, _| value)
    }

    #[test]
    fn fader_scales_the_sum() {
        let mut subgroup = MixerSubgroup::new("drums", config()).with_fader_db(-6.0);
        let out = subgroup.process(constant_block(0.5)).unwrap();
        let expected = 0.5 * db_to_linear(-6.0);
        assert!((out.sample(0, 0) - expected).abs() < 1e-6);
    }

    #[test]
    fn mute_zeroes_the_output_and_meter() {
        let mut subgroup = MixerSubgroup::new("drums", config());
        subgroup.set_muted(true);
        let out = subgroup.process(constant_block(0.5)).unwrap();
        assert!(out.samples().iter().all(|&s| s == 0.0));
        assert_eq!(subgroup.last_meter().peak_db, f32::NEG_INFINITY);
    }

    #[test]
    fn inserts_run_before_the_fader() {
        let mut subgroup = MixerSubgroup::new("drums", config())
            .with_insert(Box::new(|buffer: &mut AudioBuffer| -> EngineResult<()> {
                buffer.scale(2.0);
                Ok(())
            }))
            .with_fader_db(-6.0);
        let out = subgroup.process(constant_block(0.25)).unwrap();
        let expected = 0.25 * 2.0 * db_to_linear(-6.0);
        assert!((out.sample(0, 0) - expected).abs() < 1e-6);
    }

    #[test]
    fn meter_tracks_the_processed_block() {
        let mut subgroup = MixerSubgroup::new("drums", config());
        subgroup.process(constant_block(1.0)).unwrap();
        assert!(subgroup.last_meter().peak_db.abs() < 1e-4);
    }

    #[test]
    fn insert_changing_channel_count_is_fatal() {
        let mut subgroup =
            MixerSubgroup::new("drums", config()).with_insert(Box::new(
                |buffer: &mut AudioBuffer| -> EngineResult<()> {
                    *buffer = AudioBuffer::new(buffer.frames(), 3);
                    Ok(())
                },
            ));
        assert!(matches!(
            subgroup.process(constant_block(0.5)),
            Err(EngineError::ChannelMismatch { .. })
        ));
    }
}
