//! Tempo map for converting musical position to absolute time.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Converts beats and bars to seconds for a fixed tempo and bar length.
///
/// Pure and stateless; the only failure mode is a non-positive tempo at
/// construction.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoMap {
    /// Tempo in beats per minute.
    pub tempo_bpm: f64,
    /// Beats per bar (the bar signature numerator).
    pub beats_per_bar: u32,
}

impl Default for TempoMap {
    fn default() -> Self {
        Self {
            tempo_bpm: 120.0,
            beats_per_bar: 4,
        }
    }
}

impl TempoMap {
    /// Create a tempo map, rejecting non-positive tempos.
    pub fn new(tempo_bpm: f64, beats_per_bar: u32) -> EngineResult<Self> {
        if tempo_bpm <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "tempo must be > 0 bpm, got {}",
                tempo_bpm
            )));
        }
        Ok(Self {
            tempo_bpm,
            beats_per_bar,
        })
    }

    /// Seconds spanned by `beats` beats.
    pub fn beats_to_seconds(&self, beats: f64) -> f64 {
        (60.0 / self.tempo_bpm) * beats
    }

    /// Seconds spanned by `bars` bars.
    pub fn bars_to_seconds(&self, bars: f64) -> f64 {
        self.beats_to_seconds(bars * self.beats_per_bar as f64)
    }
}
