//! Parameter declarations and validated storage.
//!
//! Modules declare their controls as [`ParameterSpec`]s at construction
//! and store current values in a [`ParamSet`]. All writes go through the
//! spec's clamp, so a stored value is always inside its declared bounds
//! and never null unless the spec allows it.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Describes one named, bounded, optionally nullable parameter.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    /// Stable identifier used by automation and the module contract.
    pub name: String,
    /// Musician-facing label.
    pub display_name: String,
    /// Initial value; `None` is only meaningful with `allow_none`.
    pub default: Option<f32>,
    /// Lower bound, inclusive.
    pub minimum: f32,
    /// Upper bound, inclusive.
    pub maximum: f32,
    /// Unit label, e.g. "Hz", "dB", "ms".
    pub unit: String,
    /// Longer description for tooling.
    pub description: String,
    /// Musical grouping hint (e.g. "dynamics", "tone", "pitch").
    pub musical_context: Option<String>,
    /// Whether a null value is accepted.
    pub allow_none: bool,
}

impl ParameterSpec {
    /// Create a spec with a non-null default and no extra metadata.
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        default: f32,
        minimum: f32,
        maximum: f32,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            default: Some(default),
            minimum,
            maximum,
            unit: String::new(),
            description: String::new(),
            musical_context: None,
            allow_none: false,
        }
    }

    /// Set the unit label.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the musical context hint.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.musical_context = Some(context.into());
        self
    }

    /// Allow null values for this parameter.
    pub fn nullable(mut self) -> Self {
        self.allow_none = true;
        self
    }

    /// Clamp `value` into the declared bounds.
    ///
    /// Null passes through when `allow_none` is set and errors otherwise.
    pub fn clamp(&self, value: Option<f32>) -> EngineResult<Option<f32>> {
        match value {
            None => {
                if self.allow_none {
                    Ok(None)
                } else {
                    Err(EngineError::NullParameter(self.name.clone()))
                }
            }
            Some(v) => Ok(Some(v.clamp(self.minimum, self.maximum))),
        }
    }
}

/// Name-addressed parameter storage backing a module's get/set contract.
#[derive(Debug, Clone)]
pub struct ParamSet {
    specs: Vec<ParameterSpec>,
    values: Vec<Option<f32>>,
}

impl ParamSet {
    /// Build storage with every parameter at its declared default.
    pub fn new(specs: Vec<ParameterSpec>) -> Self {
        let values = specs.iter().map(|spec| spec.default).collect();
        Self { specs, values }
    }

    /// The declared specs, in declaration order.
    pub fn specs(&self) -> &[ParameterSpec] {
        &self.specs
    }

    fn index(&self, name: &str) -> Option<usize> {
        self.specs.iter().position(|spec| spec.name == name)
    }

    /// Current value of `name`, or an unknown-parameter error.
    ///
    /// `module` only provides error context.
    pub fn get(&self, module: &str, name: &str) -> EngineResult<Option<f32>> {
        let index = self.index(name).ok_or_else(|| EngineError::UnknownParameter {
            module: module.to_string(),
            parameter: name.to_string(),
        })?;
        Ok(self.values[index])
    }

    /// Current value of `name`, requiring it to be non-null.
    pub fn get_required(&self, module: &str, name: &str) -> EngineResult<f32> {
        self.get(module, name)?
            .ok_or_else(|| EngineError::NullParameter(name.to_string()))
    }

    /// Clamp and store a new value for `name`.
    pub fn set(&mut self, module: &str, name: &str, value: Option<f32>) -> EngineResult<()> {
        let index = self.index(name).ok_or_else(|| EngineError::UnknownParameter {
            module: module.to_string(),
            parameter: name.to_string(),
        })?;
        self.values[index] = self.specs[index].clamp(value)?;
        Ok(())
    }
}
