//! Elliptical compression–shear cap
//! `f3 = Cnn·Fn² + Css·|Fs|² + Cn·Fn − comp²`.

use super::history::YopiHistory;
use crate::numerics::{unit_scale_factor, EPS};
use crate::properties::YopiParameters;
use nalgebra::Vector2;

/// Damage-reduced compressive capacity `comp` of the contact.
pub(crate) fn capacity(p: &YopiParameters, h: &YopiHistory, area: f64) -> f64 {
    p.compression * area * (1.0 - h.dc)
}

pub(crate) fn yield_value(p: &YopiParameters, normal: f64, shear: &Vector2<f64>, comp: f64) -> f64 {
    p.cap_normal * normal * normal + p.cap_shear * shear.norm_squared() + p.cap_linear * normal
        - comp * comp
}

/// Pulls a compressive force point outside the cap back onto it along the
/// ray through the origin. Returns whether a correction was applied.
pub(crate) fn correct(
    p: &YopiParameters,
    comp: f64,
    normal: &mut f64,
    shear: &mut Vector2<f64>,
) -> bool {
    if *normal <= 0.0 || yield_value(p, *normal, shear, comp) <= EPS * comp * comp {
        return false;
    }
    // (λ·Fn, λ·Fs) on f3 = 0
    let a = p.cap_normal * *normal * *normal + p.cap_shear * shear.norm_squared();
    let b = p.cap_linear * *normal;
    let lambda = unit_scale_factor(a, b, -comp * comp);
    tracing::trace!(normal = *normal, shear = shear.norm(), comp, lambda, "cap correction");
    *normal *= lambda;
    *shear *= lambda;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> YopiParameters {
        YopiParameters {
            compression: 1.0e7,
            cap_normal: 1.0,
            cap_shear: 9.0,
            cap_linear: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_inside_point_is_untouched() {
        let p = params();
        let mut normal = 5.0e6;
        let mut shear = Vector2::new(1.0e6, 0.0);
        assert!(!correct(&p, 1.0e7, &mut normal, &mut shear));
        assert_eq!(normal, 5.0e6);
    }

    #[test]
    fn test_outside_point_lands_on_cap() {
        let p = params();
        let comp = 1.0e7;
        let mut normal = 2.0e7;
        let mut shear = Vector2::new(3.0e6, 4.0e6);
        assert!(correct(&p, comp, &mut normal, &mut shear));
        assert_relative_eq!(yield_value(&p, normal, &shear, comp) / (comp * comp), 0.0, epsilon = 1.0e-10);
        assert_relative_eq!(shear.x / shear.y, 0.75, max_relative = 1.0e-12);
        assert!(normal < 2.0e7);
    }

    #[test]
    fn test_linear_term_shifts_the_cap() {
        let p = YopiParameters {
            cap_linear: 5.0e6,
            ..params()
        };
        let comp = 1.0e7;
        let mut normal = 1.0e7;
        let mut shear = Vector2::zeros();
        assert!(correct(&p, comp, &mut normal, &mut shear));
        // Fn² + 5e6·Fn − 1e14 = 0
        let expected = 0.5 * (-5.0e6 + (2.5e13f64 + 4.0e14).sqrt());
        assert_relative_eq!(normal, expected, max_relative = 1.0e-10);
    }

    #[test]
    fn test_tension_is_never_capped() {
        let p = params();
        let mut normal = -5.0e7;
        let mut shear = Vector2::new(5.0e7, 0.0);
        assert!(!correct(&p, 1.0e7, &mut normal, &mut shear));
    }

    #[test]
    fn test_fully_crushed_contact_collapses() {
        let p = params();
        let mut h = YopiHistory::default();
        h.dc = 1.0;
        let comp = capacity(&p, &h, 1.0);
        assert_eq!(comp, 0.0);
        let mut normal = 1.0e6;
        let mut shear = Vector2::new(1.0e5, 0.0);
        assert!(correct(&p, comp, &mut normal, &mut shear));
        assert_eq!(normal, 0.0);
        assert_eq!(shear, Vector2::zeros());
    }
}
