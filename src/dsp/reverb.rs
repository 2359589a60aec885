//! Plate-style reverb insert.
//!
//! A compact diffused delay network in the Schroeder tradition: four
//! parallel feedback delay lines with mutually prime-ish lengths, each
//! with a one-pole low-pass inside its feedback loop for damping, summed
//! and averaged. A short pre-delay separates the dry signal from the
//! onset of the tail.
//!
//! ```text
//! in ─→ [pre-delay] ─┬─→ [line 43ms ⟲ damp] ─┐
//!                    ├─→ [line 57ms ⟲ damp] ─┤
//!                    ├─→ [line 71ms ⟲ damp] ─┼─→ (avg) ─→ wet
//!                    └─→ [line 89ms ⟲ damp] ─┘
//! ```

use crate::buffer::AudioBuffer;
use crate::dsp::InsertProcessor;
use crate::engine::config::EngineConfig;
use crate::error::EngineResult;

/// Line lengths chosen to stay musical at common tempos while keeping
/// the network cheap.
const NETWORK_DELAYS_MS: [f32; 4] = [43.0, 57.0, 71.0, 89.0];

/// Pre-delay, wet mix, decay, and damping for the reverb.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbSettings {
    /// Silence before the tail starts, in milliseconds.
    pub pre_delay_ms: f32,
    /// Dry/wet blend in [0, 1].
    pub mix: f32,
    /// Feedback inside the network, clamped to [0, 0.95].
    pub decay: f32,
    /// High-frequency absorption in [0, 0.99].
    pub damping: f32,
}

impl Default for ReverbSettings {
    fn default() -> Self {
        Self {
            pre_delay_ms: 20.0,
            mix: 0.35,
            decay: 0.75,
            damping: 0.35,
        }
    }
}

/// One feedback delay line with a one-pole low-pass in its loop.
struct DampedLine {
    line: AudioBuffer,
    index: usize,
    filter_state: Vec<f32>,
}

impl DampedLine {
    fn new(delay_samples: usize, channels: usize) -> Self {
        Self {
            line: AudioBuffer::new(delay_samples.max(1), channels),
            index: 0,
            filter_state: vec![0.0; channels],
        }
    }
}

/// Return-bus reverb over a four-line diffused delay network.
pub struct PlateReverb {
    pre_delay: Option<AudioBuffer>,
    pre_index: usize,
    network: Vec<DampedLine>,
    feedback: f32,
    damping: f32,
    mix: f32,
}

impl PlateReverb {
    /// Build the reverb for the configured rate and channel count.
    pub fn new(config: EngineConfig, settings: ReverbSettings) -> Self {
        let sample_rate = config.sample_rate as f32;
        let channels = config.channels;

        let pre_delay = if settings.pre_delay_ms > 0.0 {
            let samples =
                ((settings.pre_delay_ms * sample_rate / 1_000.0).round() as usize).max(1);
            Some(AudioBuffer::new(samples, channels))
        } else {
            None
        };

        let network = NETWORK_DELAYS_MS
            .iter()
            .map(|&delay_ms| {
                let samples = ((delay_ms * sample_rate / 1_000.0).round() as usize).max(1);
                DampedLine::new(samples, channels)
            })
            .collect();

        Self {
            pre_delay,
            pre_index: 0,
            network,
            feedback: settings.decay.clamp(0.0, 0.95),
            damping: settings.damping.clamp(0.0, 0.99),
            mix: settings.mix.clamp(0.0, 1.0),
        }
    }

    /// Clear every delay line and filter state.
    pub fn reset(&mut self) {
        if let Some(pre) = &mut self.pre_delay {
            pre.fill(0.0);
        }
        self.pre_index = 0;
        for line in &mut self.network {
            line.line.fill(0.0);
            line.index = 0;
            line.filter_state.fill(0.0);
        }
    }

    /// Run the pre-delay line in place over `buffer`.
    fn apply_pre_delay(&mut self, buffer: &AudioBuffer) -> AudioBuffer {
        let Some(pre) = &mut self.pre_delay else {
            return buffer.clone();
        };
        let mut delayed = AudioBuffer::new(buffer.frames(), buffer.channels());
        let len = pre.frames();
        let channels = buffer.channels().min(pre.channels());
        for frame in 0..buffer.frames() {
            for channel in 0..channels {
                delayed.set_sample(frame, channel, pre.sample(self.pre_index, channel));
                pre.set_sample(self.pre_index, channel, buffer.sample(frame, channel));
            }
            self.pre_index = (self.pre_index + 1) % len;
        }
        delayed
    }

    /// Push one block of excitation through the network.
    fn process_network(&mut self, excitation: &AudioBuffer) -> AudioBuffer {
        let frames = excitation.frames();
        let channels = excitation.channels();
        let mut wet = AudioBuffer::new(frames, channels);
        let line_norm = 1.0 / self.network.len().max(1) as f32;

        for frame in 0..frames {
            for line in &mut self.network {
                let pointer = line.index;
                let len = line.line.frames();
                for channel in 0..channels {
                    let delayed = line.line.sample(pointer, channel);
                    let state = (1.0 - self.damping) * delayed
                        + self.damping * line.filter_state[channel];
                    line.filter_state[channel] = state;
                    line.line.set_sample(
                        pointer,
                        channel,
                        excitation.sample(frame, channel) + state * self.feedback,
                    );
                    let accumulated = wet.sample(frame, channel) + state;
                    wet.set_sample(frame, channel, accumulated);
                }
                line.index = (pointer + 1) % len;
            }
        }
        wet.scale(line_norm);
        wet
    }
}

impl InsertProcessor for PlateReverb {
    fn process(&mut self, buffer: &mut AudioBuffer) -> EngineResult<()> {
        if buffer.is_empty() {
            return Ok(());
        }
        let pre_delayed = self.apply_pre_delay(buffer);
        let wet = self.process_network(&pre_delayed);

        let dry_gain = 1.0 - self.mix;
        let wet_gain = self.mix;
        for frame in 0..buffer.frames() {
            for channel in 0..buffer.channels() {
                let blended =
                    buffer.sample(frame, channel) * dry_gain + wet.sample(frame, channel) * wet_gain;
                buffer.set_sample(frame, channel, blended);
            }
        }
        Ok(())
    }
}
