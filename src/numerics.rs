//! Small numerical helpers shared by the joint models.

/// Floor used for denominators that may approach zero.
pub const EPS: f64 = 1.0e-12;

/// Division with the denominator floor-clamped to `EPS` (keeping its sign).
pub fn safe_div(num: f64, den: f64) -> f64 {
    if den.abs() < EPS {
        num / EPS.copysign(den)
    } else {
        num / den
    }
}

pub fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Ratchets a damage value: the result is the larger of the clamped new
/// value and the high-water mark, and becomes the new high-water mark.
pub fn ratchet(new: f64, high_water: &mut f64) -> f64 {
    let value = clamp_unit(new).max(*high_water);
    *high_water = value;
    value
}

/// Real roots of `a·x² + b·x + c = 0` in ascending order.
///
/// The coefficients are scale-normalized first and the roots are formed with
/// the q-formula, so neither tiny leading coefficients nor nearly equal terms
/// lose precision. A vanishing leading coefficient reduces to the linear
/// equation, which yields a double root.
pub fn quadratic_roots(a: f64, b: f64, c: f64) -> Option<(f64, f64)> {
    let scale = a.abs().max(b.abs()).max(c.abs());
    if !scale.is_finite() || scale == 0.0 {
        return None;
    }
    let (a, b, c) = (a / scale, b / scale, c / scale);
    if a.abs() < 1.0e-14 {
        if b.abs() < 1.0e-14 {
            return None;
        }
        let x = -c / b;
        return x.is_finite().then_some((x, x));
    }
    let mut disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        if disc > -1.0e-12 {
            disc = 0.0;
        } else {
            return None;
        }
    }
    let q = -0.5 * (b + disc.sqrt().copysign(b));
    let (r1, r2) = if q == 0.0 {
        // b == 0 and c == 0
        (0.0, 0.0)
    } else {
        (q / a, c / q)
    };
    if !r1.is_finite() || !r2.is_finite() {
        return None;
    }
    Some((r1.min(r2), r1.max(r2)))
}

/// Larger real root of `a·λ² + b·λ + c = 0` clamped to `[0, 1]`, or 0 when
/// there is no finite real root.
pub fn unit_scale_factor(a: f64, b: f64, c: f64) -> f64 {
    match quadratic_roots(a, b, c) {
        Some((_, larger)) => clamp_unit(larger),
        None => {
            tracing::warn!(a, b, c, "no real scale factor, collapsing to zero");
            0.0
        }
    }
}
