//! Closed set of joint laws behind one type.

use crate::error::{JointError, JointResult};
use crate::interfaces::{ConstitutiveModel, Dim, PropertyValue};
use crate::linear_joint::LinearJoint;
use crate::state::ContactState;
use crate::yopi::YopiJoint;
use std::io::{Read, Write};

#[derive(Debug, Clone)]
pub enum JointModel {
    Linear(LinearJoint),
    Yopi(YopiJoint),
}

macro_rules! delegate {
    ($self:expr, $model:ident => $body:expr) => {
        match $self {
            JointModel::Linear($model) => $body,
            JointModel::Yopi($model) => $body,
        }
    };
}

impl From<LinearJoint> for JointModel {
    fn from(model: LinearJoint) -> Self {
        JointModel::Linear(model)
    }
}

impl From<YopiJoint> for JointModel {
    fn from(model: YopiJoint) -> Self {
        JointModel::Yopi(model)
    }
}

impl JointModel {
    pub fn as_yopi(&self) -> Option<&YopiJoint> {
        match self {
            JointModel::Yopi(model) => Some(model),
            JointModel::Linear(_) => None,
        }
    }

    pub fn as_linear(&self) -> Option<&LinearJoint> {
        match self {
            JointModel::Linear(model) => Some(model),
            JointModel::Yopi(_) => None,
        }
    }
}

impl ConstitutiveModel for JointModel {
    fn name(&self) -> &'static str {
        delegate!(self, m => m.name())
    }

    fn full_name(&self) -> &'static str {
        delegate!(self, m => m.full_name())
    }

    fn minor_version(&self) -> u32 {
        delegate!(self, m => m.minor_version())
    }

    fn properties(&self) -> String {
        delegate!(self, m => m.properties())
    }

    fn get_property(&self, index: usize) -> JointResult<PropertyValue> {
        delegate!(self, m => m.get_property(index))
    }

    fn set_property(
        &mut self,
        index: usize,
        value: PropertyValue,
        restore_version: u32,
    ) -> JointResult<()> {
        delegate!(self, m => m.set_property(index, value, restore_version))
    }

    fn clone_model(&self) -> Self {
        match self {
            JointModel::Linear(m) => JointModel::Linear(m.clone_model()),
            JointModel::Yopi(m) => JointModel::Yopi(m.clone_model()),
        }
    }

    fn copy_from(&mut self, other: &Self) -> JointResult<()> {
        match (self, other) {
            (JointModel::Linear(m), JointModel::Linear(o)) => m.copy_from(o),
            (JointModel::Yopi(m), JointModel::Yopi(o)) => m.copy_from(o),
            (m, o) => Err(JointError::ModelMismatch {
                expected: m.name(),
                found: o.name(),
            }),
        }
    }

    fn initialize(&mut self, dim: Dim, state: &mut ContactState) -> JointResult<()> {
        delegate!(self, m => m.initialize(dim, state))
    }

    fn run(&mut self, dim: Dim, state: &mut ContactState) -> JointResult<()> {
        delegate!(self, m => m.run(dim, state))
    }

    fn is_valid(&self, dim: Dim) -> bool {
        delegate!(self, m => m.is_valid(dim))
    }

    fn save(&self, out: &mut dyn Write) -> JointResult<()> {
        delegate!(self, m => m.save(out))
    }

    fn restore(&mut self, input: &mut dyn Read, version: u32) -> JointResult<()> {
        delegate!(self, m => m.restore(input, version))
    }

    fn energies(&self) -> String {
        delegate!(self, m => m.energies())
    }

    fn get_energy(&self, index: usize) -> JointResult<f64> {
        delegate!(self, m => m.get_energy(index))
    }

    fn set_energy(&mut self, index: usize, value: f64) -> JointResult<()> {
        delegate!(self, m => m.set_energy(index, value))
    }

    fn get_energy_accumulate(&self, index: usize) -> JointResult<bool> {
        delegate!(self, m => m.get_energy_accumulate(index))
    }

    fn activate_energy(&mut self) {
        delegate!(self, m => m.activate_energy())
    }

    fn supports_property_scaling(&self) -> bool {
        delegate!(self, m => m.supports_property_scaling())
    }

    fn scale_properties(&mut self, factor: f64) -> JointResult<()> {
        delegate!(self, m => m.scale_properties(factor))
    }

    fn supports_stress_strength_ratio(&self) -> bool {
        delegate!(self, m => m.supports_stress_strength_ratio())
    }

    fn stress_strength_ratio(&self, state: &ContactState) -> JointResult<f64> {
        delegate!(self, m => m.stress_strength_ratio(state))
    }
}
