use crate::error::{JointError, JointResult};
use crate::state::ContactState;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Dimensionality a model has been initialized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dim {
    Two,
    Three,
}

impl Dim {
    pub const fn shear_components(&self) -> usize {
        match self {
            Dim::Two => 1,
            Dim::Three => 2,
        }
    }
}

/// Dynamically typed property value exchanged through reflection.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Double(f64),
    Str(String),
}

impl PropertyValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Double(value) => Some(*value),
            PropertyValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Double(_) => None,
            PropertyValue::Str(value) => Some(value),
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Double(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Str(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Str(value)
    }
}

/// The lifecycle contract every joint constitutive law satisfies.
///
/// A host creates one instance per contact (usually with [`clone_model`]
/// followed by [`copy_from`]), calls [`initialize`] when the contact becomes
/// active and [`run`] once per cycle. Properties and energies are addressed
/// by 1-based ordinals matching the order of the comma-delimited name lists.
///
/// [`clone_model`]: ConstitutiveModel::clone_model
/// [`copy_from`]: ConstitutiveModel::copy_from
/// [`initialize`]: ConstitutiveModel::initialize
/// [`run`]: ConstitutiveModel::run
pub trait ConstitutiveModel {
    fn name(&self) -> &'static str;

    fn full_name(&self) -> &'static str;

    fn minor_version(&self) -> u32;

    fn properties(&self) -> String;

    fn get_property(&self, index: usize) -> JointResult<PropertyValue>;

    /// Sets a property and invalidates the model so that the next `run`
    /// re-derives its constants. A non-zero `restore_version` marks values
    /// coming from a save file.
    fn set_property(
        &mut self,
        index: usize,
        value: PropertyValue,
        restore_version: u32,
    ) -> JointResult<()>;

    fn clone_model(&self) -> Self
    where
        Self: Sized;

    fn copy_from(&mut self, other: &Self) -> JointResult<()>
    where
        Self: Sized;

    fn initialize(&mut self, dim: Dim, state: &mut ContactState) -> JointResult<()>;

    /// Advances the contact by one cycle, initializing first if the model is
    /// not valid for `dim`.
    fn run(&mut self, dim: Dim, state: &mut ContactState) -> JointResult<()>;

    fn is_valid(&self, dim: Dim) -> bool;

    fn save(&self, out: &mut dyn Write) -> JointResult<()>;

    fn restore(&mut self, input: &mut dyn Read, version: u32) -> JointResult<()>;

    fn energies(&self) -> String;

    fn get_energy(&self, index: usize) -> JointResult<f64>;

    fn set_energy(&mut self, index: usize, value: f64) -> JointResult<()>;

    fn get_energy_accumulate(&self, index: usize) -> JointResult<bool>;

    fn activate_energy(&mut self);

    fn supports_property_scaling(&self) -> bool {
        false
    }

    fn scale_properties(&mut self, _factor: f64) -> JointResult<()> {
        Err(JointError::unsupported("scale_properties", self.name()))
    }

    fn supports_stress_strength_ratio(&self) -> bool {
        false
    }

    fn stress_strength_ratio(&self, _state: &ContactState) -> JointResult<f64> {
        Err(JointError::unsupported("stress_strength_ratio", self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_value_conversions() {
        let value = PropertyValue::from(2.5);
        assert_eq!(value.as_f64(), Some(2.5));
        assert_eq!(value.as_str(), None);

        let value = PropertyValue::from("dt_table");
        assert_eq!(value.as_str(), Some("dt_table"));
        assert_eq!(value.as_f64(), None);
    }

    #[test]
    fn test_shear_components() {
        assert_eq!(Dim::Two.shear_components(), 1);
        assert_eq!(Dim::Three.shear_components(), 2);
    }
}
