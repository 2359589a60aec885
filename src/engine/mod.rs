//! Engine scaffolding: configuration, the parameter contract, the
//! module capability interface, and the offline render loop.

/// Shared sample rate / block size / channel count.
pub mod config;
/// The module capability interface.
pub mod module;
/// The offline block renderer.
pub mod offline;
/// Parameter specs and validated storage.
pub mod params;

pub use config::EngineConfig;
pub use module::AudioModule;
pub use offline::{At, OfflineEngine};
pub use params::{ParamSet, ParameterSpec};
