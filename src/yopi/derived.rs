use super::MODEL_NAME;
use crate::error::{JointError, JointResult};
use crate::interfaces::Dim;
use crate::properties::YopiParameters;
use crate::state::ContactState;
use crate::table::TableHandle;
use std::f64::consts::FRAC_PI_4;

/// How a damage variable evolves once its strength is exceeded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageMode {
    /// User table of damage against displacement normalized by the elastic limit.
    Table(TableHandle),
    /// Exponential softening dissipating the given fracture energy.
    Energy(f64),
    /// Full damage as soon as the strength is exceeded.
    Brittle,
}

/// Constants derived from [`YopiParameters`] at initialization. They are per
/// unit area, so one set serves contacts of any size.
#[derive(Debug, Clone, PartialEq)]
pub struct YopiDerived {
    pub dim: Dim,
    pub friction: f64,
    pub friction_residual: f64,
    pub dilation: f64,
    pub tan_friction_dilation: f64,
    pub tan_dilation: f64,
    /// Stress at the end of the linear compressive range.
    pub stress_elastic: f64,
    /// Compressive displacement at the elastic limit.
    pub u_cel: f64,
    /// Ultimate-to-elastic displacement ratio `m`.
    pub ratio_ultimate: f64,
    /// Compressive displacement at peak strength.
    pub u_cul: f64,
    pub u_tel: f64,
    /// Shear displacement at the cohesive strength.
    pub u_sel: f64,
    /// Residual compressive strength as a fraction of the peak.
    pub residual_compression: f64,
    pub tension_mode: DamageMode,
    pub shear_mode: DamageMode,
}

fn config(details: impl Into<String>) -> JointError {
    JointError::configuration(MODEL_NAME, details)
}

fn damage_mode(
    energy: f64,
    table: &str,
    energy_name: &str,
    table_name: &str,
    state: &ContactState,
) -> JointResult<DamageMode> {
    match (energy > 0.0, table.is_empty()) {
        (true, false) => Err(config(format!(
            "{energy_name} and {table_name} are mutually exclusive"
        ))),
        (true, true) => Ok(DamageMode::Energy(energy)),
        (false, false) => Ok(DamageMode::Table(state.table_index_from_id(table)?)),
        (false, true) => Ok(DamageMode::Brittle),
    }
}

impl YopiDerived {
    pub fn new(p: &YopiParameters, dim: Dim, state: &ContactState) -> JointResult<Self> {
        let tension_mode = damage_mode(
            p.fracture_energy_tension,
            &p.table_tension,
            "fracture_energy_tension",
            "table_tension",
            state,
        )?;
        let shear_mode = damage_mode(
            p.fracture_energy_shear,
            &p.table_shear,
            "fracture_energy_shear",
            "table_shear",
            state,
        )?;
        if !(p.fracture_energy_compression > 0.0) {
            return Err(config("fracture_energy_compression must be set"));
        }
        if !(p.ratio_elastic >= 1.0) {
            return Err(config(format!(
                "ratio_elastic must be at least 1, got {}",
                p.ratio_elastic
            )));
        }
        if !(p.stiffness_normal > 0.0) {
            return Err(config("stiffness_normal must be positive"));
        }
        if !(p.stiffness_shear >= 0.0) {
            return Err(config("stiffness_shear must not be negative"));
        }
        if !(p.compression > 0.0) {
            return Err(config("compression must be positive"));
        }
        if p.tension < 0.0 || p.cohesion < 0.0 {
            return Err(config("tension and cohesion must not be negative"));
        }
        if !(p.cap_normal >= 0.0 && p.cap_shear >= 0.0) {
            return Err(config("cap_normal and cap_shear must not be negative"));
        }
        if !(p.friction + p.dilation < 90.0) || !(p.friction_residual < 90.0) {
            return Err(config("friction plus dilation must stay below 90 degrees"));
        }

        let stress_elastic = p.compression / p.ratio_elastic;
        let u_cel = stress_elastic / p.stiffness_normal;
        let elastic_energy = 0.5 * stress_elastic * u_cel;
        if p.fracture_energy_compression <= elastic_energy {
            return Err(config(format!(
                "fracture_energy_compression {} does not exceed the elastic energy {}",
                p.fracture_energy_compression, elastic_energy
            )));
        }
        // area under the envelope: elastic triangle plus the quarter-ellipse cap
        let envelope_height = stress_elastic + (p.compression - stress_elastic) * FRAC_PI_4;
        let ratio_ultimate =
            1.0 + (p.fracture_energy_compression - elastic_energy) / (u_cel * envelope_height);

        let friction = p.friction.to_radians();
        let dilation = p.dilation.to_radians();
        // no residual angle means friction does not degrade
        let friction_residual = if p.friction_residual > 0.0 {
            p.friction_residual.to_radians()
        } else {
            friction
        };
        let derived = Self {
            dim,
            friction,
            friction_residual,
            dilation,
            tan_friction_dilation: (friction + dilation).tan(),
            tan_dilation: dilation.tan(),
            stress_elastic,
            u_cel,
            ratio_ultimate,
            u_cul: ratio_ultimate * u_cel,
            u_tel: p.tension / p.stiffness_normal,
            u_sel: if p.stiffness_shear > 0.0 {
                p.cohesion / p.stiffness_shear
            } else {
                0.0
            },
            residual_compression: (p.compression_residual / p.compression).clamp(0.0, 1.0),
            tension_mode,
            shear_mode,
        };
        tracing::debug!(
            ?dim,
            u_cel = derived.u_cel,
            u_cul = derived.u_cul,
            ratio_ultimate = derived.ratio_ultimate,
            tension_mode = ?derived.tension_mode,
            shear_mode = ?derived.shear_mode,
            "yopi joint initialized"
        );
        Ok(derived)
    }
}
