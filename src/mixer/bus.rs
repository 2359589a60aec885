//! Return bus: aggregates sends and applies one optional processor.

use crate::buffer::AudioBuffer;
use crate::dsp::InsertProcessor;
use crate::error::EngineResult;
use crate::level::db_to_linear;

/// A named aggregation point for auxiliary sends.
///
/// The graph sums all send taps targeting this bus, runs the optional
/// processor over the sum, and scales by the bus level. A level of
/// `-inf` dB silences the bus exactly.
pub struct MixerReturnBus {
    name: String,
    processor: Option<Box<dyn InsertProcessor>>,
    level_db: f32,
    gain: f32,
}

impl MixerReturnBus {
    /// Create a return bus at unity level with no processor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            processor: None,
            level_db: 0.0,
            gain: 1.0,
        }
    }

    /// Attach the bus's processor.
    pub fn with_processor(mut self, processor: Box<dyn InsertProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Builder form of [`set_level_db`](Self::set_level_db).
    pub fn with_level_db(mut self, value: f32) -> Self {
        self.set_level_db(value);
        self
    }

    /// Bus name, unique within its graph.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bus level in dB.
    pub fn level_db(&self) -> f32 {
        self.level_db
    }

    /// Update the bus level and its derived linear gain.
    pub fn set_level_db(&mut self, value: f32) {
        self.level_db = value;
        self.gain = db_to_linear(value);
    }

    /// Process the accumulated send sum for one block.
    pub fn process(&mut self, mut buffer: AudioBuffer) -> EngineResult<AudioBuffer> {
        if let Some(processor) = &mut self.processor {
            processor.process(&mut buffer)?;
        }
        buffer.scale(self.gain);
        Ok(buffer)
    }
}
