//! Normal response: tension with softening and the hysteretic compressive
//! backbone with unloading and reloading paths.

use super::derived::{DamageMode, YopiDerived};
use super::history::{NormalBranch, YopiHistory};
use crate::error::JointResult;
use crate::numerics::{safe_div, EPS};
use crate::properties::YopiParameters;
use crate::state::ContactState;

/// Strength loss of the reloading target at a full pre-peak excursion.
const RELOAD_SOFTENING: f64 = 0.1;
/// Normalized post-peak displacement where the compressive damage switches
/// from the quadratic to the exponential branch.
const DAMAGE_KNEE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct NormalUpdate {
    pub force: f64,
    pub tension_now: bool,
    pub dnop: f64,
}

/// Compressive damage beyond the ultimate displacement, before ratcheting.
pub(crate) fn compressive_damage(d: &YopiDerived, u: f64) -> f64 {
    if u <= d.u_cul {
        return 0.0;
    }
    let z = (u - d.u_cul) / d.u_cul;
    let span = 1.0 - d.residual_compression;
    if z <= DAMAGE_KNEE {
        span * 2.0 * z * z
    } else {
        span * (1.0 - 0.5 * (-4.0 * (z - DAMAGE_KNEE)).exp())
    }
}

/// Monotonic compressive force at displacement `u`.
pub(crate) fn envelope(p: &YopiParameters, d: &YopiDerived, area: f64, u: f64) -> f64 {
    if u <= d.u_cel {
        p.stiffness_normal * area * u
    } else if u <= d.u_cul {
        let x = (u - d.u_cel) / (d.u_cul - d.u_cel);
        let shape = (2.0 * x - x * x).max(0.0).sqrt();
        area * (d.stress_elastic + (p.compression - d.stress_elastic) * shape)
    } else {
        area * p.compression * (1.0 - compressive_damage(d, u))
    }
}

/// Residual displacement left after unloading from the largest excursion.
///
/// It stays below the intercept of the initial-stiffness line through the
/// peak, so the unloading curve is always softer than elastic unloading, and
/// vanishes as the peak approaches the elastic limit.
pub(crate) fn plastic_displacement(d: &YopiDerived, h: &YopiHistory, stiffness: f64) -> f64 {
    let u_peak = h.un_hist_comp;
    if u_peak <= d.u_cel {
        return 0.0;
    }
    let elastic_intercept = (u_peak - safe_div(h.peak_normal, stiffness)).max(0.0);
    elastic_intercept * (1.0 - d.u_cel / u_peak)
}

/// Xeta unloading curve from the anchor `(u_a, f_a)` down to `(u_pl, 0)`.
///
/// With `y` the position between the two points, `f = f_a·y/(ξ + η·y)` where
/// `ξ` is the initial-to-secant stiffness ratio and `η = 1 − ξ`, so the curve
/// leaves the anchor with the initial stiffness and flattens towards `u_pl`.
/// Ill-conditioned input unloads linearly with the initial stiffness.
pub(crate) fn xeta_unloading(
    stiffness: f64,
    u_a: f64,
    f_a: f64,
    u_pl: f64,
    u: f64,
    force_0: f64,
    du: f64,
) -> f64 {
    let linear = (force_0 + stiffness * du).max(0.0);
    let span = u_a - u_pl;
    if f_a <= 0.0 || span <= EPS {
        return linear;
    }
    let xi = stiffness / (f_a / span);
    if !xi.is_finite() || xi <= 0.0 {
        return linear;
    }
    let eta = 1.0 - xi;
    let y = ((u - u_pl) / span).clamp(0.0, 1.0);
    let force = f_a * y / (xi + eta * y).max(EPS);
    if force.is_finite() {
        force
    } else {
        linear
    }
}

fn tensile_damage(
    p: &YopiParameters,
    d: &YopiDerived,
    state: &ContactState,
    opening: f64,
) -> JointResult<f64> {
    match d.tension_mode {
        DamageMode::Table(handle) => state.y_from_x(handle, safe_div(opening, d.u_tel)),
        DamageMode::Energy(energy) => Ok(1.0 - (-p.tension / energy * (opening - d.u_tel)).exp()),
        DamageMode::Brittle => Ok(1.0),
    }
}

fn tension(
    p: &YopiParameters,
    d: &YopiDerived,
    h: &mut YopiHistory,
    state: &ContactState,
    u_0: f64,
    u_1: f64,
    force_0: f64,
) -> JointResult<(f64, bool)> {
    let opening = -u_1;
    if opening > h.un_hist_ten {
        h.un_hist_ten = opening;
        if opening > d.u_tel {
            let dt = tensile_damage(p, d, state, opening)?;
            h.update_dt(dt);
        }
    }
    let stiffness = p.stiffness_normal * state.area * (1.0 - h.d_ts);
    // only the part of the increment below zero loads in tension
    let (start, du) = if u_0 >= 0.0 {
        (0.0, u_1)
    } else {
        (force_0.min(0.0), u_1 - u_0)
    };
    let mut force = (start + stiffness * du).min(0.0);
    let strength = state.area * (p.tension_residual + (p.tension - p.tension_residual) * (1.0 - h.dt));
    let tension_now = force < -strength;
    if tension_now {
        force = -strength;
    }
    h.branch = if h.dt > 0.0 {
        NormalBranch::TensionDamaged
    } else {
        NormalBranch::TensionLoading
    };
    Ok((force, tension_now))
}

fn reload_target(p: &YopiParameters, d: &YopiDerived, h: &YopiHistory, area: f64) -> f64 {
    let u_peak = h.un_hist_comp;
    let beta = ((u_peak - d.u_cel) / (d.u_cul - d.u_cel)).clamp(0.0, 1.0);
    let reference = if h.dc > 0.0 {
        area * p.compression * (1.0 - h.dc)
    } else {
        envelope(p, d, area, u_peak)
    };
    (1.0 - RELOAD_SOFTENING * beta) * h.peak_normal.min(reference)
}

fn compression(
    p: &YopiParameters,
    d: &YopiDerived,
    h: &mut YopiHistory,
    area: f64,
    u_0: f64,
    u_1: f64,
    force_0: f64,
) -> f64 {
    let stiffness = p.stiffness_normal * area;
    let force_0 = force_0.max(0.0);
    let du = u_1 - u_0;
    // incremental, so dilation and cap changes to the force persist
    let elastic = force_0 + stiffness * (u_1 - u_0.max(0.0));

    let force = if u_1 > h.un_hist_comp {
        let force = if u_1 <= d.u_cel {
            h.branch = NormalBranch::CompressionElastic;
            elastic
        } else {
            if u_1 > d.u_cul {
                h.update_dc(compressive_damage(d, u_1));
            }
            let backbone = if h.dc > 0.0 {
                area * p.compression * (1.0 - h.dc)
            } else {
                envelope(p, d, area, u_1)
            };
            h.branch = NormalBranch::CompressionEnvelope;
            // the incremental tangent never exceeds the initial stiffness
            backbone.min(elastic)
        };
        h.un_hist_comp = u_1;
        h.peak_normal = force;
        h.reload_flag = false;
        force
    } else if h.un_hist_comp <= d.u_cel {
        h.branch = NormalBranch::CompressionElastic;
        h.reload_flag = false;
        elastic
    } else if du < 0.0 {
        if h.branch != NormalBranch::CompressionUnloading {
            h.un_ul = u_0;
            h.fm_ul = force_0;
            h.reload_flag = false;
            tracing::trace!(u = u_0, force = force_0, "unloading anchor");
        }
        h.branch = NormalBranch::CompressionUnloading;
        let u_pl = plastic_displacement(d, h, stiffness);
        xeta_unloading(stiffness, h.un_ul, h.fm_ul, u_pl, u_1, force_0, du)
    } else {
        if !h.reload_flag {
            h.un_ro = u_0.max(0.0);
            h.fm_ro = force_0;
            h.reload_flag = true;
            tracing::trace!(u = h.un_ro, force = force_0, "reloading anchor");
        }
        h.branch = NormalBranch::CompressionReloading;
        let u_pl = plastic_displacement(d, h, stiffness);
        let target = reload_target(p, d, h, area).max(h.fm_ro);
        let u_start = if h.fm_ro <= 0.0 {
            h.un_ro.max(u_pl)
        } else {
            h.un_ro
        };
        if u_1 <= u_start {
            h.fm_ro
        } else {
            let slope = safe_div(target - h.fm_ro, h.un_hist_comp - u_start);
            (h.fm_ro + slope * (u_1 - u_start)).min(target)
        }
    };
    force.max(0.0)
}

/// Advances the normal response by `du` (positive closing). A zero
/// increment leaves both the force and the history untouched.
pub(crate) fn update(
    p: &YopiParameters,
    d: &YopiDerived,
    h: &mut YopiHistory,
    state: &ContactState,
    du: f64,
    force_0: f64,
) -> JointResult<NormalUpdate> {
    if du == 0.0 {
        return Ok(NormalUpdate {
            force: force_0,
            tension_now: false,
            dnop: 0.0,
        });
    }
    let u_0 = h.un;
    let u_1 = u_0 + du;
    h.un = u_1;
    let dnop = if u_0 >= 0.0 && u_1 < 0.0 {
        u_0 / (u_0 - u_1)
    } else {
        0.0
    };
    if u_1 < 0.0 {
        let (force, tension_now) = tension(p, d, h, state, u_0, u_1, force_0)?;
        return Ok(NormalUpdate {
            force,
            tension_now,
            dnop,
        });
    }
    Ok(NormalUpdate {
        force: compression(p, d, h, state.area, u_0, u_1, force_0),
        tension_now: false,
        dnop,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::Dim;
    use approx::assert_relative_eq;

    fn setup() -> (YopiParameters, YopiDerived) {
        let p = YopiParameters {
            stiffness_normal: 1.0e10,
            stiffness_shear: 1.0e10,
            tension: 1.0e5,
            fracture_energy_tension: 50.0,
            compression: 1.0e7,
            compression_residual: 2.0e6,
            ratio_elastic: 2.0,
            fracture_energy_compression: 1.0e4,
            ..Default::default()
        };
        let d = YopiDerived::new(&p, Dim::Three, &ContactState::new(1.0)).unwrap();
        (p, d)
    }

    /// Drives the normal response through a list of increments and returns
    /// the force after each one.
    fn drive(p: &YopiParameters, d: &YopiDerived, h: &mut YopiHistory, steps: &[f64]) -> Vec<f64> {
        let state = ContactState::new(1.0);
        let mut force = 0.0;
        steps
            .iter()
            .map(|&du| {
                force = update(p, d, h, &state, du, force).unwrap().force;
                force
            })
            .collect()
    }

    #[test]
    fn test_envelope_is_continuous_and_peaks_at_ultimate() {
        let (p, d) = setup();
        let below = envelope(&p, &d, 1.0, d.u_cel * (1.0 - 1.0e-9));
        let above = envelope(&p, &d, 1.0, d.u_cel * (1.0 + 1.0e-9));
        assert_relative_eq!(below, above, max_relative = 1.0e-3);
        assert_relative_eq!(envelope(&p, &d, 1.0, d.u_cul), p.compression, max_relative = 1.0e-12);
        let mut previous = 0.0;
        for i in 1..=100 {
            let f = envelope(&p, &d, 1.0, d.u_cul * i as f64 / 100.0);
            assert!(f >= previous);
            previous = f;
        }
    }

    #[test]
    fn test_compressive_damage_is_smooth_and_bounded() {
        let (_, d) = setup();
        let knee = d.u_cul * (1.0 + DAMAGE_KNEE);
        let left = compressive_damage(&d, knee * (1.0 - 1.0e-9));
        let right = compressive_damage(&d, knee * (1.0 + 1.0e-9));
        assert_relative_eq!(left, right, max_relative = 1.0e-6);
        let far = compressive_damage(&d, 100.0 * d.u_cul);
        assert_relative_eq!(far, 1.0 - d.residual_compression, max_relative = 1.0e-9);
        assert_eq!(compressive_damage(&d, d.u_cul), 0.0);
    }

    #[test]
    fn test_elastic_compression_is_reversible() {
        let (p, d) = setup();
        let mut h = YopiHistory::default();
        let du = 0.25 * d.u_cel;
        let forces = drive(&p, &d, &mut h, &[du, du, -du, du]);
        assert_relative_eq!(forces[1], p.stiffness_normal * 2.0 * du, max_relative = 1.0e-12);
        assert_relative_eq!(forces[2], p.stiffness_normal * du, max_relative = 1.0e-12);
        assert_relative_eq!(forces[3], forces[1], max_relative = 1.0e-12);
        assert_eq!(h.branch, NormalBranch::CompressionElastic);
    }

    #[test]
    fn test_elastic_steps_keep_an_offset_force() {
        let (p, d) = setup();
        let mut h = YopiHistory::default();
        let du = 0.1 * d.u_cel;
        drive(&p, &d, &mut h, &[du]);
        // a force raised outside the normal update, as dilation does
        let offset = 3.0e5;
        let raised = p.stiffness_normal * du + offset;
        let forces = drive_from(&p, &d, &mut h, raised, &[du, -0.5 * du]);
        assert_relative_eq!(forces[0], raised + p.stiffness_normal * du, max_relative = 1.0e-12);
        assert_relative_eq!(forces[1], raised + 0.5 * p.stiffness_normal * du, max_relative = 1.0e-12);
        assert_eq!(h.branch, NormalBranch::CompressionElastic);
    }

    #[test]
    fn test_unloading_leaves_plastic_displacement() {
        let (p, d) = setup();
        let mut h = YopiHistory::default();
        let steps: Vec<f64> = std::iter::repeat(d.u_cul / 50.0).take(50).collect();
        let forces = drive(&p, &d, &mut h, &steps);
        let peak = *forces.last().unwrap();
        assert!(peak > d.stress_elastic);
        assert_eq!(h.branch, NormalBranch::CompressionEnvelope);

        let unload: Vec<f64> = std::iter::repeat(-d.u_cul / 50.0).take(49).collect();
        let forces = drive_from(&p, &d, &mut h, peak, &unload);
        assert_eq!(h.branch, NormalBranch::CompressionUnloading);
        assert!(forces.windows(2).all(|w| w[1] <= w[0]));
        let u_pl = plastic_displacement(&d, &h, p.stiffness_normal);
        assert!(u_pl > 0.0);
        assert_eq!(*forces.last().unwrap(), 0.0);
    }

    fn drive_from(
        p: &YopiParameters,
        d: &YopiDerived,
        h: &mut YopiHistory,
        mut force: f64,
        steps: &[f64],
    ) -> Vec<f64> {
        let state = ContactState::new(1.0);
        steps
            .iter()
            .map(|&du| {
                force = update(p, d, h, &state, du, force).unwrap().force;
                force
            })
            .collect()
    }

    #[test]
    fn test_reloading_stays_below_previous_peak() {
        let (p, d) = setup();
        let mut h = YopiHistory::default();
        let n = 40;
        let load: Vec<f64> = std::iter::repeat(d.u_cul / n as f64).take(n).collect();
        let forces = drive(&p, &d, &mut h, &load);
        let peak = *forces.last().unwrap();
        let unload: Vec<f64> = std::iter::repeat(-d.u_cul / (2 * n) as f64).take(n / 2).collect();
        let forces = drive_from(&p, &d, &mut h, peak, &unload);
        let reload: Vec<f64> = std::iter::repeat(d.u_cul / (2 * n) as f64).take(n / 2 - 1).collect();
        let forces = drive_from(&p, &d, &mut h, *forces.last().unwrap(), &reload);
        assert_eq!(h.branch, NormalBranch::CompressionReloading);
        assert!(h.reload_flag);
        let back_at_peak = *forces.last().unwrap();
        assert!(back_at_peak < peak);
        assert!(back_at_peak > 0.8 * peak);
        assert!(forces.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_post_peak_softening_ratchets_damage() {
        let (p, d) = setup();
        let mut h = YopiHistory::default();
        let steps: Vec<f64> = std::iter::repeat(d.u_cul / 20.0).take(60).collect();
        let forces = drive(&p, &d, &mut h, &steps);
        assert!(h.dc > 0.0);
        assert!(h.dc <= 1.0 - d.residual_compression + 1.0e-12);
        assert_relative_eq!(
            *forces.last().unwrap(),
            p.compression * (1.0 - h.dc),
            max_relative = 1.0e-9
        );
        let dc = h.dc;
        drive_from(&p, &d, &mut h, *forces.last().unwrap(), &[-d.u_cul]);
        assert_eq!(h.dc, dc);
    }

    #[test]
    fn test_tension_softens_towards_residual() {
        let (mut p, _) = setup();
        p.tension_residual = 1.0e4;
        let d = YopiDerived::new(&p, Dim::Three, &ContactState::new(1.0)).unwrap();
        let mut h = YopiHistory::default();
        let steps: Vec<f64> = std::iter::repeat(-1.0e-5).take(400).collect();
        let forces = drive(&p, &d, &mut h, &steps);
        assert!(forces.iter().all(|&f| f <= 0.0 && f >= -p.tension));
        assert!(h.dt > 0.99);
        assert_eq!(h.branch, NormalBranch::TensionDamaged);
        assert_relative_eq!(*forces.last().unwrap(), -p.tension_residual, max_relative = 0.05);
    }

    #[test]
    fn test_separation_fraction() {
        let (p, d) = setup();
        let mut h = YopiHistory::default();
        let state = ContactState::new(1.0);
        let first = update(&p, &d, &mut h, &state, 1.0e-6, 0.0).unwrap();
        assert_eq!(first.dnop, 0.0);
        let second = update(&p, &d, &mut h, &state, -4.0e-6, first.force).unwrap();
        assert_relative_eq!(second.dnop, 0.25);
        assert!(second.force < 0.0);
    }

    #[test]
    fn test_zero_increment_changes_nothing() {
        let (p, d) = setup();
        let mut h = YopiHistory::default();
        drive(&p, &d, &mut h, &[d.u_cul * 0.7]);
        let before = h.clone();
        let state = ContactState::new(1.0);
        let update = update(&p, &d, &mut h, &state, 0.0, 123.0).unwrap();
        assert_eq!(update.force, 123.0);
        assert_eq!(h, before);
    }

    #[test]
    fn test_xeta_curve_endpoints_and_fallback() {
        let f = xeta_unloading(1.0e10, 2.0e-3, 1.0e7, 1.0e-3, 2.0e-3, 1.0e7, 0.0);
        assert_relative_eq!(f, 1.0e7);
        let f = xeta_unloading(1.0e10, 2.0e-3, 1.0e7, 1.0e-3, 1.0e-3, 1.0e7, 0.0);
        assert_eq!(f, 0.0);
        // anchor on the plastic displacement degenerates to linear unloading
        let f = xeta_unloading(1.0e10, 1.0e-3, 1.0e7, 1.0e-3, 0.9e-3, 1.0e6, -1.0e-5);
        assert_relative_eq!(f, 1.0e6 - 1.0e5);
    }
}
