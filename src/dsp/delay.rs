//! Stereo feedback delay insert.

use crate::buffer::AudioBuffer;
use crate::dsp::InsertProcessor;
use crate::engine::config::EngineConfig;
use crate::error::EngineResult;

/// Feedback delay tuned for return buses.
///
/// Delay time is in milliseconds, feedback is a linear amount clamped to
/// [0, 0.95], and `mix` blends the dry input with the delayed tail. The
/// circular delay line spans all configured channels, so an impulse fed
/// in one call keeps emitting echoes in later calls with no input.
pub struct FeedbackDelay {
    line: AudioBuffer,
    index: usize,
    feedback: f32,
    mix: f32,
}

impl FeedbackDelay {
    /// Create a delay line of `delay_ms` (at least one sample).
    pub fn new(config: EngineConfig, delay_ms: f32, feedback: f32, mix: f32) -> Self {
        let delay_samples =
            ((delay_ms * config.sample_rate as f32 / 1_000.0).round() as usize).max(1);
        Self {
            line: AudioBuffer::new(delay_samples, config.channels),
            index: 0,
            feedback: feedback.clamp(0.0, 0.95),
            mix: mix.clamp(0.0, 1.0),
        }
    }

    /// Length of the delay line in samples.
    pub fn delay_samples(&self) -> usize {
        self.line.frames()
    }

    /// Clear the delay line.
    pub fn reset(&mut self) {
        self.line.fill(0.0);
        self.index = 0;
    }
}

impl InsertProcessor for FeedbackDelay {
    fn process(&mut self, buffer: &mut AudioBuffer) -> EngineResult<()> {
        if buffer.is_empty() {
            return Ok(());
        }
        let frames = buffer.frames();
        let channels = buffer.channels().min(self.line.channels());
        let dry_gain = 1.0 - self.mix;
        let wet_gain = self.mix;
        let len = self.line.frames();

        for frame in 0..frames {
            for channel in 0..channels {
                let delayed = self.line.sample(self.index, channel);
                let dry = buffer.sample(frame, channel);
                self.line
                    .set_sample(self.index, channel, dry + delayed * self.feedback);
                buffer.set_sample(frame, channel, dry * dry_gain + delayed * wet_gain);
            }
            self.index = (self.index + 1) % len;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EngineConfig {
        EngineConfig {
            sample_rate: 48_000,
            block_size: 128,
            channels: 2,
        }
    }

    #[test]
    fn delay_time_converts_to_samples() {
        let delay = FeedbackDelay::new(config(), 1.0, 0.4, 0.5);
        assert_eq!(delay.delay_samples(), 48);
    }

    #[test]
    fn zero_delay_time_still_allocates_one_sample() {
        let delay = FeedbackDelay::new(config(), 0.0, 0.4, 0.5);
        assert_eq!(delay.delay_samples(), 1);
    }

    #[test]
    fn impulse_echoes_at_the_delay_offset() {
        let mut delay = FeedbackDelay::new(config(), 1.0, 0.4, 1.0);
        let mut buffer = AudioBuffer::new(128, 2);
        buffer.set_sample(0, 0, 1.0);
        delay.process(&mut buffer).unwrap();

        // First echo 48 samples in, second at 96 scaled by the feedback.
        assert!((buffer.sample(48, 0) - 1.0).abs() < 1e-6);
        assert!((buffer.sample(96, 0) - 0.4).abs() < 1e-6);
        assert_eq!(buffer.sample(48, 1), 0.0, "channels must not bleed");
    }

    #[test]
    fn tail_continues_into_a_silent_call() {
        let mut delay = FeedbackDelay::new(config(), 1.0, 0.4, 1.0);
        let mut first = AudioBuffer::new(128, 2);
        first.set_sample(0, 0, 1.0);
        delay.process(&mut first).unwrap();

        let mut second = AudioBuffer::new(128, 2);
        delay.process(&mut second).unwrap();
        // Echo at global sample 144 lands at local sample 16.
        assert!(
            second.sample(16, 0).abs() > 0.1,
            "expected a continuing tail, got {}",
            second.sample(16, 0)
        );
    }

    #[test]
    fn mix_blends_dry_and_wet() {
        let mut delay = FeedbackDelay::new(config(), 1.0, 0.0, 0.25);
        let mut buffer = AudioBuffer::from_fn(64, 2, |frame, _| if frame == 0 { 1.0 } else { 0.0 });
        delay.process(&mut buffer).unwrap();
        // Dry impulse passes at 75%, echo arrives at 25%.
        assert!((buffer.sample(0, 0) - 0.75).abs() < 1e-6);
        assert!((buffer.sample(48, 0) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn reset_silences_the_line() {
        let mut delay = FeedbackDelay::new(config(), 1.0, 0.5, 1.0);
        let mut buffer = AudioBuffer::from_fn(64, 2, |_, _| 0.5);
        delay.process(&mut buffer).unwrap();

        delay.reset();
        let mut silence = AudioBuffer::new(64, 2);
        delay.process(&mut silence).unwrap();
        assert!(silence.samples().iter().all(|&s| s == 0.0));
    }
}
