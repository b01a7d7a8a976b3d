use crate::error::{JointError, JointResult};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{EnumCount as EnumCountMacro, EnumIter, FromRepr, IntoStaticStr};

/// Dissipated-energy bins, with 1-based ordinals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCountMacro, FromRepr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[repr(usize)]
pub enum EnergyKind {
    Tension = 1,
    Compression = 2,
    Shear = 3,
}

impl EnergyKind {
    pub fn from_index(index: usize) -> JointResult<Self> {
        Self::from_repr(index).ok_or(JointError::EnergyIndex {
            index,
            count: Self::COUNT,
        })
    }

    pub fn names() -> String {
        Self::iter()
            .map(<&'static str>::from)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub const fn accumulates(&self) -> bool {
        true
    }
}

/// Energy totals of one contact; allocated only once energy tracking is
/// activated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointEnergies {
    pub tension: f64,
    pub compression: f64,
    pub shear: f64,
}

impl JointEnergies {
    pub fn get(&self, kind: EnergyKind) -> f64 {
        match kind {
            EnergyKind::Tension => self.tension,
            EnergyKind::Compression => self.compression,
            EnergyKind::Shear => self.shear,
        }
    }

    pub fn set(&mut self, kind: EnergyKind, value: f64) {
        match kind {
            EnergyKind::Tension => self.tension = value,
            EnergyKind::Compression => self.compression = value,
            EnergyKind::Shear => self.shear = value,
        }
    }

    /// Adds the work of one cycle using the mean of the forces before and
    /// after the step. Normal work goes to the compression bin when the mean
    /// normal force is compressive, otherwise to the tension bin.
    pub fn accumulate(
        &mut self,
        normal_force_0: f64,
        normal_force_1: f64,
        normal_disp_inc: f64,
        shear_force_0: &Vector2<f64>,
        shear_force_1: &Vector2<f64>,
        shear_disp_inc: &Vector2<f64>,
    ) {
        let normal_mid = 0.5 * (normal_force_0 + normal_force_1);
        let normal_work = normal_mid * normal_disp_inc;
        if normal_mid > 0.0 {
            self.compression += normal_work;
        } else {
            self.tension += normal_work;
        }
        let shear_mid = 0.5 * (shear_force_0 + shear_force_1);
        self.shear += shear_mid.dot(shear_disp_inc);
    }
}

/// Shared 1-based energy reflection for models that store an optional
/// accumulator.
pub(crate) fn get_energy(energies: &Option<JointEnergies>, index: usize) -> JointResult<f64> {
    let kind = EnergyKind::from_index(index)?;
    Ok(energies.map_or(0.0, |e| e.get(kind)))
}

pub(crate) fn set_energy(
    energies: &mut Option<JointEnergies>,
    index: usize,
    value: f64,
) -> JointResult<()> {
    let kind = EnergyKind::from_index(index)?;
    energies.get_or_insert_with(JointEnergies::default).set(kind, value);
    Ok(())
}
