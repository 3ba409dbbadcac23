use crate::Real;

/// DPD weight function w(r) = 1 - r/r_c for r < r_c.
///
/// Callers gate on the cutoff; this does not clamp to zero beyond it.
#[inline]
pub fn weight(dist: Real, cutoff: Real) -> Real {
    1.0 - dist / cutoff
}

/// Conservative soft-repulsion magnitude a(ij)·w(r), directed along r̂.
#[inline]
pub fn conservative_force(a: Real, weight: Real) -> Real {
    a * weight
}

/// Pair potential of the conservative force:
/// U(r) = (a·r_c/2)·(1 - r/r_c)² for r < r_c.
#[inline]
pub fn pair_potential(a: Real, dist: Real, cutoff: Real) -> Real {
    let w = weight(dist, cutoff);
    0.5 * a * cutoff * w * w
}

/// Dissipative (friction) magnitude -γ·w(r)²·(v_ij·r̂), directed along r̂.
#[inline]
pub fn dissipative_force(gamma: Real, weight: Real, v_along_r: Real) -> Real {
    -gamma * weight * weight * v_along_r
}

/// Random (thermal) magnitude σ·w(r)·θ/√dt, directed along r̂.
///
/// θ must be a zero-mean, unit-variance sample; one sample per pair per
/// evaluation pass.
#[inline]
pub fn random_force(sigma: Real, weight: Real, theta: Real, inv_sqrt_dt: Real) -> Real {
    sigma * weight * theta * inv_sqrt_dt
}

/// σ from the fluctuation-dissipation theorem: σ² = 2·γ·k_BT.
#[inline]
pub fn sigma_from_gamma(gamma: Real, k_b_t: Real) -> Real {
    (2.0 * gamma * k_b_t).sqrt()
}
