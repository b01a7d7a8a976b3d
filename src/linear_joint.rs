use crate::energy::{self, EnergyKind, JointEnergies};
use crate::error::{JointError, JointResult};
use crate::interfaces::{ConstitutiveModel, Dim, PropertyValue};
use crate::state::ContactState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::str::FromStr;
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{EnumCount as EnumCountMacro, EnumIter, EnumString, FromRepr, IntoStaticStr};

pub const MODEL_NAME: &str = "linear";
pub const FULL_NAME: &str = "Linear elastic joint";
pub const MAJOR_VERSION: u32 = 1;
pub const MINOR_VERSION: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumCountMacro, EnumString, FromRepr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[repr(usize)]
pub enum LinearProperty {
    StiffnessNormal = 1,
    StiffnessShear,
}

impl LinearProperty {
    pub fn from_index(index: usize) -> JointResult<Self> {
        Self::from_repr(index).ok_or(JointError::PropertyIndex {
            index,
            count: Self::COUNT,
        })
    }

    pub fn from_name(name: &str) -> JointResult<Self> {
        Self::from_str(name).map_err(|_| JointError::UnknownProperty(name.to_string()))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Snapshot {
    energies: Option<JointEnergies>,
}

/// Joint with constant normal and shear stiffness (per unit area) and no
/// failure.
#[derive(Debug, Clone, Default)]
pub struct LinearJoint {
    stiffness_normal: f64,
    stiffness_shear: f64,
    dim: Option<Dim>,
    energies: Option<JointEnergies>,
}

impl LinearJoint {
    pub fn new(stiffness_normal: f64, stiffness_shear: f64) -> Self {
        Self {
            stiffness_normal,
            stiffness_shear,
            ..Default::default()
        }
    }

    pub fn from_hash_map(parameters: &HashMap<String, PropertyValue>) -> JointResult<Self> {
        let mut joint = Self::default();
        for (name, value) in parameters {
            let property = LinearProperty::from_name(name)?;
            joint.set_property(property as usize, value.clone(), 0)?;
        }
        Ok(joint)
    }

    pub fn stiffness_normal(&self) -> f64 {
        self.stiffness_normal
    }

    pub fn stiffness_shear(&self) -> f64 {
        self.stiffness_shear
    }
}

impl ConstitutiveModel for LinearJoint {
    fn name(&self) -> &'static str {
        MODEL_NAME
    }

    fn full_name(&self) -> &'static str {
        FULL_NAME
    }

    fn minor_version(&self) -> u32 {
        MINOR_VERSION
    }

    fn properties(&self) -> String {
        LinearProperty::iter()
            .map(<&'static str>::from)
            .collect::<Vec<_>>()
            .join(",")
    }

    fn get_property(&self, index: usize) -> JointResult<PropertyValue> {
        Ok(PropertyValue::Double(match LinearProperty::from_index(index)? {
            LinearProperty::StiffnessNormal => self.stiffness_normal,
            LinearProperty::StiffnessShear => self.stiffness_shear,
        }))
    }

    fn set_property(
        &mut self,
        index: usize,
        value: PropertyValue,
        restore_version: u32,
    ) -> JointResult<()> {
        let property = LinearProperty::from_index(index)?;
        let Some(number) = value.as_f64() else {
            let name: &'static str = property.into();
            if restore_version > 0 {
                tracing::warn!(name, restore_version, "ignoring mistyped restored property");
                return Ok(());
            }
            return Err(JointError::PropertyType {
                name,
                expected: "numeric",
            });
        };
        match property {
            LinearProperty::StiffnessNormal => self.stiffness_normal = number,
            LinearProperty::StiffnessShear => self.stiffness_shear = number,
        }
        self.dim = None;
        Ok(())
    }

    fn clone_model(&self) -> Self {
        Self::new(self.stiffness_normal, self.stiffness_shear)
    }

    fn copy_from(&mut self, other: &Self) -> JointResult<()> {
        self.clone_from(other);
        Ok(())
    }

    fn initialize(&mut self, dim: Dim, _state: &mut ContactState) -> JointResult<()> {
        if !(self.stiffness_normal >= 0.0 && self.stiffness_shear >= 0.0) {
            self.dim = None;
            return Err(JointError::configuration(
                MODEL_NAME,
                "stiffnesses must not be negative",
            ));
        }
        self.dim = Some(dim);
        Ok(())
    }

    fn run(&mut self, dim: Dim, state: &mut ContactState) -> JointResult<()> {
        if !self.is_valid(dim) {
            self.initialize(dim, state)?;
        }
        state.begin_cycle();
        if state.track_energy() {
            self.activate_energy();
        }
        let mut shear_disp_inc = state.shear_disp_inc;
        let mut shear_0 = state.shear_force;
        if dim == Dim::Two {
            shear_disp_inc.y = 0.0;
            shear_0.y = 0.0;
        }
        let normal_0 = state.normal_force;
        state.normal_force_inc = self.stiffness_normal * state.area * state.normal_disp_inc;
        state.shear_force_inc = shear_disp_inc * (self.stiffness_shear * state.area);
        state.normal_force = normal_0 + state.normal_force_inc;
        state.shear_force = shear_0 + state.shear_force_inc;
        state.dnop = 0.0;
        if !state.normal_force.is_finite() || !state.shear_force.iter().all(|v| v.is_finite()) {
            tracing::error!(normal = state.normal_force, "non-finite joint force");
            return Err(JointError::NonFiniteForce {
                normal: state.normal_force,
                shear_x: state.shear_force.x,
                shear_y: state.shear_force.y,
            });
        }
        if let Some(energies) = self.energies.as_mut() {
            energies.accumulate(
                normal_0,
                state.normal_force,
                state.normal_disp_inc,
                &shear_0,
                &state.shear_force,
                &shear_disp_inc,
            );
        }
        Ok(())
    }

    fn is_valid(&self, dim: Dim) -> bool {
        self.dim == Some(dim)
    }

    fn save(&self, out: &mut dyn Write) -> JointResult<()> {
        let snapshot = Snapshot {
            energies: self.energies,
        };
        serde_cbor::to_writer(out, &snapshot)?;
        Ok(())
    }

    fn restore(&mut self, input: &mut dyn Read, _version: u32) -> JointResult<()> {
        let mut de = serde_cbor::Deserializer::from_reader(input);
        let snapshot = Snapshot::deserialize(&mut de)?;
        self.energies = snapshot.energies;
        self.dim = None;
        Ok(())
    }

    fn energies(&self) -> String {
        EnergyKind::names()
    }

    fn get_energy(&self, index: usize) -> JointResult<f64> {
        energy::get_energy(&self.energies, index)
    }

    fn set_energy(&mut self, index: usize, value: f64) -> JointResult<()> {
        energy::set_energy(&mut self.energies, index, value)
    }

    fn get_energy_accumulate(&self, index: usize) -> JointResult<bool> {
        Ok(EnergyKind::from_index(index)?.accumulates())
    }

    fn activate_energy(&mut self) {
        self.energies.get_or_insert_with(JointEnergies::default);
    }

    fn supports_property_scaling(&self) -> bool {
        true
    }

    fn scale_properties(&mut self, factor: f64) -> JointResult<()> {
        self.stiffness_normal *= factor;
        self.stiffness_shear *= factor;
        self.dim = None;
        Ok(())
    }
}
