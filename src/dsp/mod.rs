//! Stateful insert processors for mixer channels and buses.
//!
//! Inserts carry per-channel runtime state (filter memories, delay
//! lines) sized to the configured channel count at construction, so
//! channel 0 and channel 1 never share state. An insert instance belongs
//! to exactly one channel or bus; a channel-count change means
//! reconstruction, not resizing.

/// Direct-form biquad primitive and shelving/peaking designers.
pub mod biquad;
/// Soft-knee feed-forward dynamics compressor.
pub mod compressor;
/// Stereo feedback delay.
pub mod delay;
/// Three-band parametric EQ built from cascaded biquads.
pub mod eq;
/// Plate-style reverb over a diffused delay network.
pub mod reverb;

use crate::buffer::AudioBuffer;
use crate::error::EngineResult;

/// An in-line signal processor placed in a channel's or bus's chain.
///
/// Processing is in place on a whole block. Implementations must
/// preserve the buffer's channel count; the hosting channel checks and
/// fails the block otherwise.
pub trait InsertProcessor: Send {
    /// Process one block in place.
    fn process(&mut self, buffer: &mut AudioBuffer) -> EngineResult<()>;
}

/// Closures over a buffer act as inserts, which keeps test fixtures and
/// one-off bus processors lightweight.
impl<F> InsertProcessor for F
where
    F: FnMut(&mut AudioBuffer) -> EngineResult<()> + Send,
{
    fn process(&mut self, buffer: &mut AudioBuffer) -> EngineResult<()> {
        self(buffer)
    }
}
