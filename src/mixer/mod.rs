//! Signal routing: channels, subgroups, return buses, and the graph
//! that sums them into a master output.
//!
//! Channels expose faders in decibels, linear pan values, and an insert
//! chain that mirrors tracker expectations. Sends target named return
//! buses so auxiliary effects can be layered without hard-coding any
//! particular processing order.

/// Automation address grammar and its parsed form.
pub mod address;
/// Return buses aggregating auxiliary sends.
pub mod bus;
/// Track channels with inserts, pan, fader, and sends.
pub mod channel;
/// The routing graph and block processing pass.
pub mod graph;
/// Peak/RMS meter snapshots.
pub mod meter;
/// Send configuration.
pub mod send;
/// Subgroup buses for processing grouped channels.
pub mod subgroup;

pub use bus::MixerReturnBus;
pub use channel::MixerChannel;
pub use graph::MixerGraph;
pub use meter::MeterReading;
pub use send::MixerSendConfig;
pub use subgroup::MixerSubgroup;
