//! Auxiliary send configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::level::db_to_linear;

/// How a channel feeds a named return bus.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct MixerSendConfig {
    /// Name of the target return bus.
    pub bus: String,
    /// Send level in dB; defaults to `-inf` (silent).
    pub level_db: f32,
    /// Tap the signal before the fader instead of after it.
    pub pre_fader: bool,
}

impl MixerSendConfig {
    /// A silent post-fader send to `bus`.
    pub fn new(bus: impl Into<String>) -> Self {
        Self {
            bus: bus.into(),
            level_db: f32::NEG_INFINITY,
            pre_fader: false,
        }
    }

    /// Set the send level in dB.
    pub fn with_level_db(mut self, level_db: f32) -> Self {
        self.level_db = level_db;
        self
    }

    /// Tap pre-fader.
    pub fn pre_fader(mut self) -> Self {
        self.pre_fader = true;
        self
    }

    /// The send level as a linear multiplier; `-inf` dB is exactly zero.
    pub fn linear_gain(&self) -> f32 {
        db_to_linear(self.level_db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_send_is_exactly_silent() {
        let send = MixerSendConfig::new("fx");
        assert_eq!(send.level_db, f32::NEG_INFINITY);
        assert_eq!(send.linear_gain(), 0.0);
        assert!(!send.pre_fader);
    }

    #[test]
    fn level_converts_to_linear() {
        let send = MixerSendConfig::new("fx").with_level_db(-6.0);
        assert!((send.linear_gain() - 0.501187).abs() < 1e-5);
    }

    #[test]
    fn builder_sets_pre_fader() {
        let send = MixerSendConfig::new("fx").with_level_db(0.0).pre_fader();
        assert!(send.pre_fader);
    }
}
