//! Automation address grammar for mixer targets.
//!
//! The external wire format is stringly typed for compatibility with
//! pattern editors and saved projects:
//!
//! ```text
//! channel:<name>    params: fader_db | pan | mute | send:<bus>
//! subgroup:<name>   params: fader_db | mute
//! return:<name>     params: level_db
//! ```
//!
//! Addresses are parsed into tagged variants the moment an event is
//! scheduled, so malformed strings are rejected up front instead of deep
//! inside the routing pass.

use crate::error::{EngineError, EngineResult};

/// A fully parsed mixer automation destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedAddress {
    /// A channel parameter.
    Channel { name: String, param: ChannelParam },
    /// A subgroup parameter.
    Subgroup { name: String, param: SubgroupParam },
    /// A return bus parameter.
    Return { name: String, param: ReturnParam },
}

/// Automatable channel parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelParam {
    FaderDb,
    Pan,
    Mute,
    /// Level of the send feeding the named bus.
    Send(String),
}

/// Automatable subgroup parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubgroupParam {
    FaderDb,
    Mute,
}

/// Automatable return bus parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnParam {
    LevelDb,
}

/// Parse a `(target, parameter)` pair against the address grammar.
pub fn parse(target: &str, parameter: &str) -> EngineResult<ParsedAddress> {
    let (scope, name) = target
        .split_once(':')
        .ok_or_else(|| EngineError::MalformedAddress(target.to_string()))?;
    if name.is_empty() {
        return Err(EngineError::MalformedAddress(target.to_string()));
    }

    let unknown_parameter = || EngineError::UnknownParameter {
        module: target.to_string(),
        parameter: parameter.to_string(),
    };

    match scope {
        "channel" => {
            let param = if let Some(bus) = parameter.strip_prefix("send:") {
                if bus.is_empty() {
                    return Err(unknown_parameter());
                }
                ChannelParam::Send(bus.to_string())
            } else {
                match parameter {
                    "fader_db" => ChannelParam::FaderDb,
                    "pan" => ChannelParam::Pan,
                    "mute" => ChannelParam::Mute,
                    _ => return Err(unknown_parameter()),
                }
            };
            Ok(ParsedAddress::Channel {
                name: name.to_string(),
                param,
            })
        }
        "subgroup" => {
            let param = match parameter {
                "fader_db" => SubgroupParam::FaderDb,
                "mute" => SubgroupParam::Mute,
                _ => return Err(unknown_parameter()),
            };
            Ok(ParsedAddress::Subgroup {
                name: name.to_string(),
                param,
            })
        }
        "return" => {
            let param = match parameter {
                "level_db" => ReturnParam::LevelDb,
                _ => return Err(unknown_parameter()),
            };
            Ok(ParsedAddress::Return {
                name: name.to_string(),
                param,
            })
        }
        _ => Err(EngineError::MalformedAddress(target.to_string())),
    }
}
