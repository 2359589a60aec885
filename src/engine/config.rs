//! Global audio configuration shared across modules.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Sample rate, block size, and channel count shared by every module in
/// a render.
///
/// Every buffer that flows through the graph has exactly `channels`
/// columns; producers and processors that violate this fail the block.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Frames rendered per `process` call.
    pub block_size: usize,
    /// Channels per frame.
    pub channels: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 512,
            channels: 2,
        }
    }
}

impl EngineConfig {
    /// Create a validated configuration.
    pub fn new(sample_rate: u32, block_size: usize, channels: usize) -> EngineResult<Self> {
        let config = Self {
            sample_rate,
            block_size,
            channels,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the `> 0` invariants on all three fields.
    pub fn validate(&self) -> EngineResult<()> {
        if self.sample_rate == 0 {
            return Err(EngineError::InvalidConfig("sample_rate must be > 0".into()));
        }
        if self.block_size == 0 {
            return Err(EngineError::InvalidConfig("block_size must be > 0".into()));
        }
        if self.channels == 0 {
            return Err(EngineError::InvalidConfig("channels must be > 0".into()));
        }
        Ok(())
    }

    /// Half the sample rate, in Hz.
    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }
}
