//! Nose-Hoover-like feedback on top of the self-consistent scheme.
//!
//! A single scalar ξ tracks how far the instantaneous temperature sits from
//! the target and scales the effective friction, γ_eff = γ(1 + ξ): too hot
//! and the drag strengthens, too cold and it weakens. ξ integrates a
//! relaxation equation with characteristic time τ.

use crate::Real;

/// Effective friction for the current ξ, floored at zero so feedback never
/// turns the drag into a pump.
pub(crate) fn effective_gamma(gamma: Real, xi: Real) -> Real {
    (gamma * (1.0 + xi)).max(0.0)
}

/// Advances ξ by one step: dξ/dt = (T_inst / T_target − 1) / τ².
///
/// The kinetic energy must come from a serial reduction; feeding an
/// accumulation-order-dependent sum here would leak non-determinism into
/// the trajectory.
pub(crate) fn advance_xi(
    xi: Real,
    dt: Real,
    kinetic: f64,
    particle_count: usize,
    target_temperature: Real,
    coupling_time: Real,
) -> Real {
    if target_temperature <= 0.0 || particle_count == 0 {
        return xi;
    }
    let instantaneous = 2.0 * kinetic as Real / (3.0 * particle_count as Real);
    xi + dt * (instantaneous / target_temperature - 1.0) / (coupling_time * coupling_time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hot_system_strengthens_the_friction() {
        // T_inst = 2 at target 1: ξ grows, γ_eff exceeds γ.
        let kinetic = 3.0; // 2K/(3N) = 2 for N = 1.
        let xi = advance_xi(0.0, 0.1, kinetic, 1, 1.0, 1.0);
        assert!(xi > 0.0);
        assert!(effective_gamma(4.5, xi) > 4.5);
    }

    #[test]
    fn cold_system_weakens_the_friction() {
        let xi = advance_xi(0.0, 0.1, 0.0, 1, 1.0, 1.0);
        assert!(xi < 0.0);
        assert!(effective_gamma(4.5, xi) < 4.5);
    }

    #[test]
    fn feedback_never_reverses_the_drag() {
        assert_eq!(effective_gamma(4.5, -2.0), 0.0);
    }

    #[test]
    fn on_target_temperature_leaves_xi_unchanged() {
        // 2K/(3N) = 1 at N = 2, K = 3.
        let xi = advance_xi(0.25, 0.1, 3.0, 2, 1.0, 1.0);
        assert!((xi - 0.25).abs() < 1e-12);
    }
}
