//! Error types shared across the engine.

use thiserror::Error;

/// Errors raised by the mixing core.
///
/// Every variant is fatal to the block or operation that raised it. The
/// engine never retries or partially applies work; callers surface these
/// as configuration errors.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid engine configuration value
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// Null supplied to a parameter that does not accept it
    #[error("parameter '{0}' does not accept null values")]
    NullParameter(String),

    /// Parameter name not declared by the target module
    #[error("unknown parameter '{parameter}' for '{module}'")]
    UnknownParameter { module: String, parameter: String },

    /// A source, insert, or module produced the wrong channel count
    #[error("'{module}' produced {got} channels; expected {expected}")]
    ChannelMismatch {
        module: String,
        got: usize,
        expected: usize,
    },

    /// A channel, subgroup, return bus, or module name was reused
    #[error("{kind} '{name}' already registered")]
    DuplicateRegistration { kind: &'static str, name: String },

    /// A send, automation event, or group assignment references a
    /// non-existent entity
    #[error("unknown {kind} '{name}'")]
    UnknownTarget { kind: &'static str, name: String },

    /// Subgroup nesting forms a cycle
    #[error("subgroup routing contains a cycle through '{0}'")]
    RoutingCycle(String),

    /// Automation target string does not match the address grammar
    #[error("malformed automation address '{0}'")]
    MalformedAddress(String),

    /// Render was requested with no output module configured
    #[error("no output module configured")]
    NoOutput,

    /// Insert reorder index out of range
    #[error("insert index {index} out of range ({len} inserts)")]
    InsertIndex { index: usize, len: usize },
}

/// Result alias used throughout the crate.
pub type EngineResult<T> = Result<T, EngineError>;
