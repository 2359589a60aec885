//! A track channel: source, insert chain, pan, fader, mute/solo, sends.

use crate::buffer::AudioBuffer;
use crate::dsp::InsertProcessor;
use crate::engine::config::EngineConfig;
use crate::engine::module::AudioModule;
use crate::error::{EngineError, EngineResult};
use crate::level::db_to_linear;
use crate::mixer::send::MixerSendConfig;

/// One mixer strip wrapping an owned audio source.
///
/// Processing order per block: source, inserts in order, pre-fader tap,
/// pan, fader (zero when muted), sends. Sends are keyed by bus name;
/// registering a send for a bus that already has one replaces it.
pub struct MixerChannel {
    name: String,
    config: EngineConfig,
    source: Box<dyn AudioModule>,
    inserts: Vec<Box<dyn InsertProcessor>>,
    pan: f32,
    fader_db: f32,
    fader_gain: f32,
    muted: bool,
    solo: bool,
    sends: Vec<MixerSendConfig>,
}

impl MixerChannel {
    /// Create a channel at unity fader, centre pan, no inserts or sends.
    pub fn new(
        name: impl Into<String>,
        source: Box<dyn AudioModule>,
        config: EngineConfig,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            source,
            inserts: Vec::new(),
            pan: 0.0,
            fader_db: 0.0,
            fader_gain: 1.0,
            muted: false,
            solo: false,
            sends: Vec::new(),
        }
    }

    /// Builder form of [`set_fader_db`](Self::set_fader_db).
    pub fn with_fader_db(mut self, value: f32) -> Self {
        self.set_fader_db(value);
        self
    }

    /// Builder form of [`set_pan`](Self::set_pan).
    pub fn with_pan(mut self, value: f32) -> Self {
        self.set_pan(value);
        self
    }

    /// Builder form of [`add_insert`](Self::add_insert).
    pub fn with_insert(mut self, insert: Box<dyn InsertProcessor>) -> Self {
        self.add_insert(insert);
        self
    }

    /// Builder form of [`set_send`](Self::set_send).
    pub fn with_send(mut self, send: MixerSendConfig) -> Self {
        self.set_send(send);
        self
    }

    /// Channel name, unique within its graph.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stereo pan, `-1` = left, `0` = centre, `1` = right.
    pub fn pan(&self) -> f32 {
        self.pan
    }

    /// Update the pan, clamped to `[-1, 1]`.
    pub fn set_pan(&mut self, value: f32) {
        self.pan = value.clamp(-1.0, 1.0);
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

    /// Append an insert processor to the chain.
    pub fn add_insert(&mut self, insert: Box<dyn InsertProcessor>) {
        self.inserts.push(insert);
    }

    /// Number of inserts in the chain.
    pub fn insert_count(&self) -> usize {
        self.inserts.len()
    }

    /// Reorder inserts, supporting drag-and-drop style gestures.
    ///
    /// The source index must be in range; the target index is clamped.
    pub fn move_insert(&mut self, from: usize, to: usize) -> EngineResult<()> {
        if from >= self.inserts.len() {
            return Err(EngineError::InsertIndex {
                index: from,
                len: self.inserts.len(),
            });
        }
        let to = to.min(self.inserts.len() - 1);
        let insert = self.inserts.remove(from);
        self.inserts.insert(to, insert);
        Ok(())
    }

    /// Register or replace an auxiliary send.
    pub fn set_send(&mut self, send: MixerSendConfig) {
        if let Some(existing) = self.sends.iter_mut().find(|s| s.bus == send.bus) {
            *existing = send;
        } else {
            self.sends.push(send);
        }
    }

    /// Update the level for a send, creating a post-fader send if absent.
    pub fn set_send_level_db(&mut self, bus: &str, level_db: f32) {
        if let Some(existing) = self.sends.iter_mut().find(|s| s.bus == bus) {
            existing.level_db = level_db;
        } else {
            self.sends
                .push(MixerSendConfig::new(bus).with_level_db(level_db));
        }
    }

    /// Configured level for `bus`, `-inf` when no send exists.
    pub fn get_send_level_db(&self, bus: &str) -> f32 {
        self.sends
            .iter()
            .find(|s| s.bus == bus)
            .map(|s| s.level_db)
            .unwrap_or(f32::NEG_INFINITY)
    }

    /// Remove a configured send if present.
    pub fn remove_send(&mut self, bus: &str) {
        self.sends.retain(|s| s.bus != bus);
    }

    /// Bus names this channel sends to, in registration order.
    pub fn send_buses(&self) -> impl Iterator<Item = &str> {
        self.sends.iter().map(|s| s.bus.as_str())
    }

    /// Constant-sum pan: pan only touches the first two channels, and
    /// centre pan is a no-op short-circuit.
    fn apply_pan(&self, buffer: &mut AudioBuffer) {
        if self.pan == 0.0 || buffer.channels() < 2 {
            return;
        }
        let left_gain = 1.0 - self.pan.max(0.0);
        let right_gain = 1.0 + self.pan.min(0.0);
        for frame in buffer.frames_iter_mut() {
            frame[0] *= left_gain;
            frame[1] *= right_gain;
        }
    }

    /// Process `frames` samples, returning the post-fader signal and the
    /// per-bus send signals.
    pub fn process(
        &mut self,
        frames: usize,
    ) -> EngineResult<(AudioBuffer, Vec<(String, AudioBuffer)>)> {
        let mut block = self.source.process(frames)?;
        if block.channels() != self.config.channels {
            return Err(EngineError::ChannelMismatch {
                module: self.source.name().to_string(),
                got: block.channels(),
                expected: self.config.channels,
            });
        }

        for (index, insert) in self.inserts.iter_mut().enumerate() {
            insert.process(&mut block)?;
            if block.channels() != self.config.channels {
                return Err(EngineError::ChannelMismatch {
                    module: format!("channel '{}' insert {}", self.name, index),
                    got: block.channels(),
                    expected: self.config.channels,
                });
            }
        }

        let pre_fader = block.clone();
        self.apply_pan(&mut block);
        block.scale(if self.muted { 0.0 } else { self.fader_gain });
        let post_fader = block;

        let mut sends = Vec::new();
        for send in &self.sends {
            let gain = send.linear_gain();
            if gain == 0.0 {
                continue;
            }
            let tap = if send.pre_fader { &pre_fader } else { &post_fader };
            let mut signal = tap.clone();
            signal.scale(gain);
            sends.push((send.bus.clone(), signal));
        }
        Ok((post_fader, sends))
    }
}
