//! Peak/RMS level snapshots.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::buffer::AudioBuffer;
use crate::level::linear_to_db;

/// A snapshot of signal level in decibels.
///
/// Valid only for the most recently processed block; read-only for
/// meters and diagnostics, never fed back into processing.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterReading {
    /// Peak level, `20·log10(max|sample|)`, `-inf` for silence.
    pub peak_db: f32,
    /// RMS level, `20·log10(rms)`, `-inf` for silence.
    pub rms_db: f32,
}

impl Default for MeterReading {
    fn default() -> Self {
        Self::SILENCE
    }
}

impl MeterReading {
    /// The reading for an all-silent buffer.
    pub const SILENCE: MeterReading = MeterReading {
        peak_db: f32::NEG_INFINITY,
        rms_db: f32::NEG_INFINITY,
    };

    /// Measure a block.
    pub fn from_buffer(buffer: &AudioBuffer) -> Self {
        Self {
            peak_db: linear_to_db(buffer.peak()),
            rms_db: linear_to_db(buffer.rms()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_reads_negative_infinity() {
        let reading = MeterReading::from_buffer(&AudioBuffer::new(64, 2));
        assert_eq!(reading.peak_db, f32::NEG_INFINITY);
        assert_eq!(reading.rms_db, f32::NEG_INFINITY);
    }

    #[test]
    fn full_scale_constant_reads_zero_db() {
        let buffer = AudioBuffer::from_fn(64, 2, |_, _| 1.0);
        let reading = MeterReading::from_buffer(&buffer);
        assert!(reading.peak_db.abs() < 1e-5);
        assert!(reading.rms_db.abs() < 1e-4);
    }

    #[test]
    fn peak_sits_above_rms_for_transients() {
        let mut buffer = AudioBuffer::new(64, 1);
        buffer.set_sample(0, 0, 1.0);
        let reading = MeterReading::from_buffer(&buffer);
        assert!(reading.peak_db > reading.rms_db);
    }
}
