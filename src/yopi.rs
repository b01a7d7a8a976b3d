//! The Yopi joint: tension, hysteretic compression, Coulomb shear with
//! dilation, three coupled damage variables and an elliptical
//! compression–shear cap.
//!
//! Parameters are shared between contacts through an [`Arc`]; each contact
//! owns its [`YopiHistory`]. One cycle runs in a fixed order: normal
//! response, shear response (slip, shear damage, dilation), cap correction,
//! a final shear projection, then flags, outputs and energy.

pub(crate) mod cap;
pub mod derived;
pub mod history;
pub(crate) mod normal;
pub(crate) mod shear;

pub use derived::{DamageMode, YopiDerived};
pub use history::{NormalBranch, YopiHistory};

use crate::energy::{self, EnergyKind, JointEnergies};
use crate::error::{JointError, JointResult};
use crate::interfaces::{ConstitutiveModel, Dim, PropertyValue};
use crate::properties::{YopiParameters, YopiProperty};
use crate::state::{ContactFlags, ContactState, DQC, DQS, DQT, DSLIP};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;

pub const MODEL_NAME: &str = "yopi";
pub const FULL_NAME: &str = "Yopi tension-compression-shear damage joint";
pub const MAJOR_VERSION: u32 = 1;
pub const MINOR_VERSION: u32 = 1;
pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Snapshot {
    version: u32,
    history: YopiHistory,
    energies: Option<JointEnergies>,
}

/// Advances one contact by one cycle. `d` must have been derived from `p`
/// for the dimension the contact runs in.
pub(crate) fn run_cycle(
    p: &YopiParameters,
    d: &YopiDerived,
    h: &mut YopiHistory,
    energies: &mut Option<JointEnergies>,
    state: &mut ContactState,
) -> JointResult<()> {
    h.bind(d.dim);
    state.begin_cycle();
    if state.track_energy() && energies.is_none() {
        *energies = Some(JointEnergies::default());
    }

    let area = state.area;
    if !(area > 0.0) || !area.is_finite() {
        tracing::trace!(area, "degenerate contact area, forces cleared");
        state.normal_force = 0.0;
        state.shear_force = Vector2::zeros();
        state.normal_force_inc = 0.0;
        state.shear_force_inc = Vector2::zeros();
        state.dnop = 0.0;
        return Ok(());
    }

    let mut shear_disp_inc = state.shear_disp_inc;
    let mut shear_0 = state.shear_force;
    if d.dim.shear_components() == 1 {
        shear_disp_inc.y = 0.0;
        shear_0.y = 0.0;
    }
    let normal_0 = state.normal_force;
    let (dt_0, ds_0, dc_0) = (h.dt, h.ds, h.dc);
    let branch_0 = h.branch;
    let mut flags = ContactFlags::empty();

    let normal = normal::update(p, d, h, state, state.normal_disp_inc, normal_0)?;
    let mut normal_force = normal.force;
    if normal.tension_now {
        flags |= ContactFlags::TENSION_NOW;
    }
    if h.branch != branch_0 {
        tracing::trace!(from = ?branch_0, to = ?h.branch, "normal branch change");
    }

    let limit = shear::strength(p, d, h.d_ts, normal_force, area);
    let trial = shear::update(p, area, &shear_disp_inc, &shear_0, limit);
    let mut shear_force = trial.force;
    if trial.slipping {
        flags |= ContactFlags::SLIP_NOW;
        h.slip += trial.slip_inc;
        let ds = shear::shear_damage(p, d, state, h.slip)?;
        h.update_ds(ds);
        if normal_force > 0.0 && h.dc == 0.0 {
            normal_force += shear::dilation_increment(p, d, h.d_ts, area, trial.slip_inc);
        }
    }

    let comp = cap::capacity(p, h, area);
    if cap::correct(p, comp, &mut normal_force, &mut shear_force) {
        flags |= ContactFlags::COMPRESSION_NOW;
    }
    // the envelope moved with the damage, dilation and cap of this cycle
    let limit = shear::strength(p, d, h.d_ts, normal_force, area);
    if shear::project(&mut shear_force, limit) {
        flags |= ContactFlags::SLIP_NOW;
    }

    if !normal_force.is_finite() || !shear_force.iter().all(|v| v.is_finite()) {
        tracing::error!(
            normal = normal_force,
            shear_x = shear_force.x,
            shear_y = shear_force.y,
            branch = ?h.branch,
            "non-finite joint force"
        );
        return Err(JointError::NonFiniteForce {
            normal: normal_force,
            shear_x: shear_force.x,
            shear_y: shear_force.y,
        });
    }

    state.flags |= flags;
    state.working[DQT] = h.dt - dt_0;
    state.working[DQS] = h.ds - ds_0;
    state.working[DQC] = h.dc - dc_0;
    state.working[DSLIP] = trial.slip_inc;
    state.normal_force_inc = normal_force - normal_0;
    state.shear_force_inc = shear_force - shear_0;
    state.normal_force = normal_force;
    state.shear_force = shear_force;
    state.dnop = normal.dnop;
    if let Some(energies) = energies.as_mut() {
        energies.accumulate(
            normal_0,
            normal_force,
            state.normal_disp_inc,
            &shear_0,
            &shear_force,
            &shear_disp_inc,
        );
    }
    Ok(())
}

/// One Yopi contact: shared parameters plus its own history.
#[derive(Debug, Clone)]
pub struct YopiJoint {
    params: Arc<YopiParameters>,
    derived: Option<YopiDerived>,
    history: YopiHistory,
    energies: Option<JointEnergies>,
}

impl Default for YopiJoint {
    fn default() -> Self {
        Self::new(YopiParameters::default())
    }
}

impl YopiJoint {
    pub fn new(params: YopiParameters) -> Self {
        Self::from_shared(Arc::new(params))
    }

    pub fn from_shared(params: Arc<YopiParameters>) -> Self {
        Self {
            params,
            derived: None,
            history: YopiHistory::default(),
            energies: None,
        }
    }

    pub fn from_hash_map(parameters: &HashMap<String, PropertyValue>) -> JointResult<Self> {
        let mut joint = Self::default();
        for (name, value) in parameters {
            let property = YopiProperty::from_name(name)?;
            joint.set_property(property.index(), value.clone(), 0)?;
        }
        Ok(joint)
    }

    pub fn parameters(&self) -> &YopiParameters {
        &self.params
    }

    pub fn shared_parameters(&self) -> &Arc<YopiParameters> {
        &self.params
    }

    /// Mutable parameters, detached from any other contact sharing them.
    /// The joint re-derives its constants on the next run.
    pub fn parameters_mut(&mut self) -> &mut YopiParameters {
        self.derived = None;
        Arc::make_mut(&mut self.params)
    }

    pub fn history(&self) -> &YopiHistory {
        &self.history
    }

    pub fn derived(&self) -> Option<&YopiDerived> {
        self.derived.as_ref()
    }

    pub fn energy_totals(&self) -> Option<&JointEnergies> {
        self.energies.as_ref()
    }

    /// Cap function value for the forces currently held by `state`.
    pub fn cap_value(&self, state: &ContactState) -> f64 {
        let comp = cap::capacity(&self.params, &self.history, state.area);
        cap::yield_value(&self.params, state.normal_force, &state.shear_force, comp)
    }

    /// Current shear strength for the normal force held by `state`.
    pub fn shear_strength(&self, state: &ContactState) -> JointResult<f64> {
        let derived = self.derived.as_ref().ok_or_else(|| {
            JointError::configuration(MODEL_NAME, "joint has not been initialized")
        })?;
        Ok(shear::strength(
            &self.params,
            derived,
            self.history.d_ts,
            state.normal_force,
            state.area,
        ))
    }

    fn history_value(&self, property: YopiProperty) -> Option<f64> {
        match property {
            YopiProperty::DamageTension => Some(self.history.dt),
            YopiProperty::DamageShear => Some(self.history.ds),
            YopiProperty::DamageCompression => Some(self.history.dc),
            _ => None,
        }
    }

    fn set_history_value(&mut self, property: YopiProperty, value: f64) {
        match property {
            YopiProperty::DamageTension => {
                self.history.update_dt(value);
            }
            YopiProperty::DamageShear => {
                self.history.update_ds(value);
            }
            YopiProperty::DamageCompression => {
                self.history.update_dc(value);
            }
            _ => {}
        }
    }
}

impl ConstitutiveModel for YopiJoint {
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
        YopiProperty::names()
    }

    fn get_property(&self, index: usize) -> JointResult<PropertyValue> {
        let property = YopiProperty::from_index(index)?;
        if let Some(value) = self.history_value(property) {
            return Ok(PropertyValue::Double(value));
        }
        self.params
            .get(property)
            .ok_or_else(|| JointError::UnknownProperty(property.name().to_string()))
    }

    fn set_property(
        &mut self,
        index: usize,
        value: PropertyValue,
        restore_version: u32,
    ) -> JointResult<()> {
        let property = YopiProperty::from_index(index)?;
        if property.is_history() {
            let number = value.as_f64().ok_or(JointError::PropertyType {
                name: property.name(),
                expected: "numeric",
            })?;
            self.set_history_value(property, number);
            return Ok(());
        }
        if self.params.get(property).as_ref() == Some(&value) {
            return Ok(());
        }
        match self.parameters_mut().set(property, value) {
            Err(JointError::PropertyType { name, expected }) if restore_version > 0 => {
                tracing::warn!(name, expected, restore_version, "ignoring mistyped restored property");
                Ok(())
            }
            result => result,
        }
    }

    fn clone_model(&self) -> Self {
        Self::from_shared(Arc::clone(&self.params))
    }

    fn copy_from(&mut self, other: &Self) -> JointResult<()> {
        self.params = Arc::clone(&other.params);
        self.derived = other.derived.clone();
        self.history = other.history.clone();
        self.energies = other.energies;
        Ok(())
    }

    fn initialize(&mut self, dim: Dim, state: &mut ContactState) -> JointResult<()> {
        self.derived = None;
        let derived = YopiDerived::new(&self.params, dim, state)?;
        self.history.bind(dim);
        self.derived = Some(derived);
        Ok(())
    }

    fn run(&mut self, dim: Dim, state: &mut ContactState) -> JointResult<()> {
        if !self.is_valid(dim) {
            self.initialize(dim, state)?;
        }
        let derived = self.derived.as_ref().ok_or_else(|| {
            JointError::configuration(MODEL_NAME, "joint has not been initialized")
        })?;
        run_cycle(
            &self.params,
            derived,
            &mut self.history,
            &mut self.energies,
            state,
        )
    }

    fn is_valid(&self, dim: Dim) -> bool {
        self.derived.as_ref().is_some_and(|d| d.dim == dim)
    }

    fn save(&self, out: &mut dyn Write) -> JointResult<()> {
        let snapshot = Snapshot {
            version: SAVE_VERSION,
            history: self.history.clone(),
            energies: self.energies,
        };
        serde_cbor::to_writer(out, &snapshot)?;
        Ok(())
    }

    fn restore(&mut self, input: &mut dyn Read, version: u32) -> JointResult<()> {
        let mut de = serde_cbor::Deserializer::from_reader(input);
        let snapshot = Snapshot::deserialize(&mut de)?;
        if snapshot.version > SAVE_VERSION {
            tracing::warn!(
                found = snapshot.version,
                supported = SAVE_VERSION,
                restore_version = version,
                "restoring a newer yopi snapshot, unknown fields dropped"
            );
        }
        self.history = snapshot.history;
        self.energies = snapshot.energies;
        self.derived = None;
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

    fn supports_stress_strength_ratio(&self) -> bool {
        true
    }

    /// Shear force over shear strength; 0 for an unloaded contact without
    /// strength.
    fn stress_strength_ratio(&self, state: &ContactState) -> JointResult<f64> {
        let strength = self.shear_strength(state)?;
        let shear = state.shear_force.norm();
        if strength > 0.0 {
            Ok(shear / strength)
        } else if shear > 0.0 {
            Ok(f64::INFINITY)
        } else {
            Ok(0.0)
        }
    }
}
