//! Closed-form distribution of a combined aptitude + synergy score.
//!
//! Aptitude and synergy are independent draws from Uniform[0, A] and
//! Uniform[0, W]; their sum follows a trapezoidal (triangular when A = W)
//! distribution on [0, A + W].

use crate::numbers::clamp_unit;

/// P(U_A + U_W <= x) for independent `U_A ~ Uniform[0, aptitude_scale]` and
/// `U_W ~ Uniform[0, synergy_scale]`.
///
/// A zero scale collapses that term to a point mass at 0: with one zero scale
/// the sum is uniform on the other, with both zero it is a point mass and the
/// result is a step at 0. A single zero scale therefore yields `x / hi`
/// rather than a bare 0 or 1, since the sum is still a continuous uniform.
/// The output is always within `[0, 1]`.
#[must_use]
pub fn combined_score_cdf(x: f64, aptitude_scale: f64, synergy_scale: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    let lo = aptitude_scale.min(synergy_scale).max(0.0);
    let hi = aptitude_scale.max(synergy_scale).max(0.0);

    if hi <= 0.0 {
        return if x >= 0.0 { 1.0 } else { 0.0 };
    }
    if x <= 0.0 {
        return 0.0;
    }
    if x >= lo + hi {
        return 1.0;
    }
    if lo <= 0.0 {
        return clamp_unit(x / hi);
    }

    let value = if x < lo {
        x * x / (2.0 * lo * hi)
    } else if x < hi {
        (2.0 * x - lo) / (2.0 * hi)
    } else {
        let gap = lo + hi - x;
        1.0 - gap * gap / (2.0 * lo * hi)
    };
    clamp_unit(value)
}
