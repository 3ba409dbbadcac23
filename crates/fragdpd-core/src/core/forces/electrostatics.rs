use crate::Real;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ElectrostaticsError {
    #[error("Effective exponent must be greater than 1, got {0}")]
    ExponentTooSmall(Real),
    #[error("Damping distance must be non-negative, got {0}")]
    NegativeDamping(Real),
    #[error("Maximum force must be positive, got {0}")]
    NonPositiveMaxForce(Real),
    #[error("Electrostatics cutoff must be positive, got {0}")]
    NonPositiveCutoff(Real),
}

/// Parameters of the damped, force-clamped Coulomb-like interaction.
///
/// The unclamped force is F(r) = k·q_i·q_j/(r + d)^n: the damping distance d
/// keeps it finite at contact, and this particular damping form admits a
/// closed-form potential, so the clamped region can be made exactly
/// energy/force consistent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElectrostaticsParams {
    /// Coupling constant k (charge² to energy·distance conversion).
    pub coupling: Real,
    /// Effective exponent n, commonly 2. Must exceed 1.
    pub exponent: Real,
    /// Damping distance d added to the separation.
    pub damping: Real,
    /// Upper bound on the force magnitude.
    pub max_force: Real,
    /// Interaction cutoff; may exceed the DPD cutoff.
    pub cutoff: Real,
}

impl ElectrostaticsParams {
    pub fn validate(&self) -> Result<(), ElectrostaticsError> {
        if !(self.exponent > 1.0) {
            return Err(ElectrostaticsError::ExponentTooSmall(self.exponent));
        }
        if self.damping < 0.0 {
            return Err(ElectrostaticsError::NegativeDamping(self.damping));
        }
        if !(self.max_force > 0.0) {
            return Err(ElectrostaticsError::NonPositiveMaxForce(self.max_force));
        }
        if !(self.cutoff > 0.0) {
            return Err(ElectrostaticsError::NonPositiveCutoff(self.cutoff));
        }
        Ok(())
    }

    /// Separation below which the unclamped force would exceed `max_force`
    /// for the given charge product. Negative when no clamping occurs.
    #[inline]
    pub fn clamp_radius(&self, charge_product: Real) -> Real {
        let strength = (self.coupling * charge_product).abs();
        if strength == 0.0 {
            return Real::NEG_INFINITY;
        }
        (strength / self.max_force).powf(1.0 / self.exponent) - self.damping
    }

    /// Unclamped potential, shifted so that it vanishes at the cutoff:
    /// U(r) = k·q_i·q_j/((n-1)·(r + d)^(n-1)) - U_cut.
    #[inline]
    fn unclamped_potential(&self, dist: Real, charge_product: Real) -> Real {
        let strength = self.coupling * charge_product;
        let n1 = self.exponent - 1.0;
        let at = |r: Real| strength / (n1 * (r + self.damping).powf(n1));
        at(dist) - at(self.cutoff)
    }
}

/// Signed electrostatic force magnitude along r̂ (positive = repulsive),
/// clamped to `max_force`.
#[inline]
pub fn force(dist: Real, charge_product: Real, params: &ElectrostaticsParams) -> Real {
    let raw =
        params.coupling * charge_product / (dist + params.damping).powf(params.exponent);
    raw.clamp(-params.max_force, params.max_force)
}

/// Electrostatic pair potential, consistent with the clamped force.
///
/// Inside the clamp radius the energy continues linearly with the clamped
/// slope, U(r) = U(r*) + F_clamped·(r* - r), rather than following the
/// unclamped law the force no longer obeys.
#[inline]
pub fn potential(dist: Real, charge_product: Real, params: &ElectrostaticsParams) -> Real {
    let clamp_radius = params.clamp_radius(charge_product);
    if dist >= clamp_radius {
        params.unclamped_potential(dist, charge_product)
    } else {
        let sign = (params.coupling * charge_product).signum();
        params.unclamped_potential(clamp_radius, charge_product)
            + sign * params.max_force * (clamp_radius - dist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ElectrostaticsParams {
        ElectrostaticsParams {
            coupling: 10.0,
            exponent: 2.0,
            damping: 0.1,
            max_force: 50.0,
            cutoff: 3.0,
        }
    }

    #[test]
    fn validation_rejects_bad_parameters() {
        let mut p = params();
        p.exponent = 1.0;
        assert!(p.validate().is_err());
        let mut p = params();
        p.damping = -0.1;
        assert!(p.validate().is_err());
        let mut p = params();
        p.max_force = 0.0;
        assert!(p.validate().is_err());
        assert!(params().validate().is_ok());
    }

    #[test]
    fn force_is_clamped_at_small_separations() {
        let p = params();
        // Unclamped force at contact would be 10/(0.1)^2 = 1000.
        assert_eq!(force(0.0, 1.0, &p), 50.0);
        assert_eq!(force(0.0, -1.0, &p), -50.0);
    }

    #[test]
    fn force_is_continuous_at_the_clamp_radius() {
        let p = params();
        let r_star = p.clamp_radius(1.0);
        assert!(r_star > 0.0);
        let inside = force(r_star - 1e-9, 1.0, &p);
        let outside = force(r_star + 1e-9, 1.0, &p);
        assert!((inside - outside).abs() < 1e-5);
    }

    #[test]
    fn potential_is_negative_derivative_of_force_everywhere() {
        // Finite-difference check on both sides of the clamp radius.
        let p = params();
        let h = 1e-6;
        for &r in &[0.05, 0.2, p.clamp_radius(1.0) + 0.1, 1.5] {
            let numeric = -(potential(r + h, 1.0, &p) - potential(r - h, 1.0, &p)) / (2.0 * h);
            let analytic = force(r, 1.0, &p);
            assert!(
                (numeric - analytic).abs() < 1e-4,
                "mismatch at r = {r}: {numeric} vs {analytic}"
            );
        }
    }

    #[test]
    fn potential_vanishes_at_the_cutoff() {
        let p = params();
        assert!(potential(p.cutoff, 1.0, &p).abs() < 1e-12);
    }

    #[test]
    fn opposite_charges_attract() {
        let p = params();
        assert!(force(1.0, -1.0, &p) < 0.0);
        assert!(potential(1.0, -1.0, &p) < 0.0);
    }
}
