//! Shear response: Coulomb envelope with degrading cohesion and friction,
//! radial return, slip-driven shear damage and dilation.

use super::derived::{DamageMode, YopiDerived};
use crate::error::JointResult;
use crate::numerics::safe_div;
use crate::properties::YopiParameters;
use crate::state::ContactState;
use nalgebra::Vector2;

/// Relative tolerance on the envelope so that a force sitting exactly on it
/// does not count as yielding.
const YIELD_TOLERANCE: f64 = 1.0e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ShearUpdate {
    pub force: Vector2<f64>,
    pub slip_inc: f64,
    pub slipping: bool,
}

/// Shear strength `cc·A + tan(φ + ψ)·Fn` for the current combined damage.
pub(crate) fn strength(
    p: &YopiParameters,
    d: &YopiDerived,
    d_ts: f64,
    normal_force: f64,
    area: f64,
) -> f64 {
    let intact = 1.0 - d_ts;
    let cohesion = p.cohesion_residual + (p.cohesion - p.cohesion_residual) * intact;
    let tan_angle = if d_ts == 0.0 {
        d.tan_friction_dilation
    } else {
        let friction = d.friction_residual + (d.friction - d.friction_residual) * intact;
        (friction + d.dilation * intact).tan()
    };
    (cohesion * area + tan_angle * normal_force).max(0.0)
}

/// Elastic trial followed by a radial return onto `limit`. The unconsumed
/// part of the trial force is discarded as plastic slip.
pub(crate) fn update(
    p: &YopiParameters,
    area: f64,
    shear_disp_inc: &Vector2<f64>,
    force_0: &Vector2<f64>,
    limit: f64,
) -> ShearUpdate {
    let stiffness = p.stiffness_shear * area;
    let mut force = force_0 + shear_disp_inc * stiffness;
    let trial = force.norm();
    if trial <= limit * (1.0 + YIELD_TOLERANCE) {
        return ShearUpdate {
            force,
            slip_inc: 0.0,
            slipping: false,
        };
    }
    force *= limit / trial;
    let slip_inc = if stiffness > 0.0 {
        (trial - limit) / stiffness
    } else {
        shear_disp_inc.norm()
    };
    ShearUpdate {
        force,
        slip_inc,
        slipping: true,
    }
}

/// Scales `force` back onto `limit` without recording slip. Returns whether
/// it had to.
pub(crate) fn project(force: &mut Vector2<f64>, limit: f64) -> bool {
    let norm = force.norm();
    if norm <= limit * (1.0 + YIELD_TOLERANCE) {
        return false;
    }
    if norm.is_finite() && norm > 0.0 {
        *force *= limit / norm;
    } else {
        *force = Vector2::zeros();
    }
    true
}

/// Shear damage for the accumulated plastic `slip`, before ratcheting.
///
/// Without a shear fracture energy or table the damage is brittle: the first
/// slip sets `ds = 1`, which also drives the combined `d_ts` to 1 and removes
/// the tensile stiffness and the cohesion of the contact.
pub(crate) fn shear_damage(
    p: &YopiParameters,
    d: &YopiDerived,
    state: &ContactState,
    slip: f64,
) -> JointResult<f64> {
    if slip <= 0.0 {
        return Ok(0.0);
    }
    match d.shear_mode {
        DamageMode::Table(handle) => {
            let x = if d.u_sel > 0.0 { slip / d.u_sel } else { slip };
            state.y_from_x(handle, x)
        }
        DamageMode::Energy(energy) => Ok(1.0 - (-safe_div(p.cohesion, energy) * slip).exp()),
        DamageMode::Brittle => Ok(1.0),
    }
}

/// Normal force added by dilation over a slip increment.
pub(crate) fn dilation_increment(
    p: &YopiParameters,
    d: &YopiDerived,
    d_ts: f64,
    area: f64,
    slip_inc: f64,
) -> f64 {
    if d.dilation == 0.0 {
        return 0.0;
    }
    let tan_dilation = if d_ts == 0.0 {
        d.tan_dilation
    } else {
        (d.dilation * (1.0 - d_ts)).tan()
    };
    p.stiffness_normal * area * tan_dilation * slip_inc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::Dim;
    use crate::table::{Table, TableArena};
    use approx::assert_relative_eq;

    fn setup() -> (YopiParameters, YopiDerived) {
        let p = YopiParameters {
            stiffness_normal: 1.0e10,
            stiffness_shear: 1.0e9,
            cohesion: 1.0e6,
            cohesion_residual: 2.0e5,
            friction: 30.0,
            friction_residual: 20.0,
            dilation: 5.0,
            compression: 1.0e7,
            fracture_energy_compression: 1.0e4,
            fracture_energy_shear: 200.0,
            ..Default::default()
        };
        let d = YopiDerived::new(&p, Dim::Three, &ContactState::new(1.0)).unwrap();
        (p, d)
    }

    #[test]
    fn test_strength_degrades_to_residual() {
        let (p, d) = setup();
        let intact = strength(&p, &d, 0.0, 1.0e6, 2.0);
        assert_relative_eq!(intact, 2.0e6 + 35f64.to_radians().tan() * 1.0e6, max_relative = 1.0e-12);
        let broken = strength(&p, &d, 1.0, 1.0e6, 2.0);
        assert_relative_eq!(broken, 4.0e5 + 20f64.to_radians().tan() * 1.0e6, max_relative = 1.0e-12);
        assert!(broken < intact);
        // tension eats into cohesion but never below zero
        assert_eq!(strength(&p, &d, 0.0, -1.0e8, 1.0), 0.0);
    }

    #[test]
    fn test_elastic_trial_below_envelope() {
        let (p, _) = setup();
        let result = update(&p, 1.0, &Vector2::new(1.0e-4, 0.0), &Vector2::zeros(), 1.0e6);
        assert!(!result.slipping);
        assert_eq!(result.slip_inc, 0.0);
        assert_relative_eq!(result.force.x, 1.0e5);
    }

    #[test]
    fn test_radial_return_keeps_direction() {
        let (p, _) = setup();
        let inc = Vector2::new(3.0e-3, 4.0e-3);
        let result = update(&p, 1.0, &inc, &Vector2::zeros(), 1.0e6);
        assert!(result.slipping);
        assert_relative_eq!(result.force.norm(), 1.0e6, max_relative = 1.0e-12);
        assert_relative_eq!(result.force.x / result.force.y, 0.75, max_relative = 1.0e-12);
        // trial norm 5e6 against a limit of 1e6
        assert_relative_eq!(result.slip_inc, 4.0e6 / 1.0e9, max_relative = 1.0e-12);
    }

    #[test]
    fn test_projection_only_scales() {
        let mut force = Vector2::new(0.0, -2.0);
        assert!(project(&mut force, 1.0));
        assert_relative_eq!(force.y, -1.0);
        assert!(!project(&mut force, 1.0));
        let mut force = Vector2::new(f64::NAN, 0.0);
        assert!(project(&mut force, 1.0));
        assert_eq!(force, Vector2::zeros());
    }

    #[test]
    fn test_shear_damage_modes() {
        let (p, d) = setup();
        let state = ContactState::new(1.0);
        let ds = shear_damage(&p, &d, &state, 2.0e-4).unwrap();
        assert_relative_eq!(ds, 1.0 - (-1.0e6 / 200.0 * 2.0e-4f64).exp(), max_relative = 1.0e-12);
        assert_eq!(shear_damage(&p, &d, &state, 0.0).unwrap(), 0.0);

        let mut arena = TableArena::new();
        arena.insert(Table::new("ds", vec![(0.0, 0.0), (4.0, 1.0)]).unwrap());
        let state = ContactState::new(1.0).with_tables(&arena);
        let mut p = p;
        p.fracture_energy_shear = 0.0;
        p.table_shear = "ds".to_string();
        let d = YopiDerived::new(&p, Dim::Three, &state).unwrap();
        // u_sel = 1e-3, so slip 2e-3 sits halfway up the table
        assert_relative_eq!(shear_damage(&p, &d, &state, 2.0e-3).unwrap(), 0.5);
    }

    #[test]
    fn test_brittle_slip_breaks_the_whole_contact() {
        let (mut p, _) = setup();
        p.fracture_energy_shear = 0.0;
        let state = ContactState::new(1.0);
        let d = YopiDerived::new(&p, Dim::Three, &state).unwrap();
        assert_eq!(d.shear_mode, DamageMode::Brittle);
        let ds = shear_damage(&p, &d, &state, 1.0e-9).unwrap();
        assert_eq!(ds, 1.0);

        let mut h = crate::yopi::YopiHistory::default();
        h.update_ds(ds);
        assert_eq!(h.d_ts, 1.0);
        assert_relative_eq!(strength(&p, &d, h.d_ts, 0.0, 1.0), p.cohesion_residual);
    }

    #[test]
    fn test_dilation_fades_with_damage() {
        let (p, d) = setup();
        let fresh = dilation_increment(&p, &d, 0.0, 1.0, 1.0e-4);
        assert_relative_eq!(fresh, 1.0e10 * 5f64.to_radians().tan() * 1.0e-4, max_relative = 1.0e-12);
        assert_eq!(dilation_increment(&p, &d, 1.0, 1.0, 1.0e-4), 0.0);
    }
}
