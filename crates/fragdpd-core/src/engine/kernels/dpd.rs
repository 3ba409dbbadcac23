use super::MIN_PAIR_DISTANCE;
use crate::Real;
use crate::core::forces::dpd;
use crate::core::models::types::InteractionMatrix;
use crate::engine::error::EngineError;
use crate::engine::pairs::{PairKernel, PairScratch};

/// The full DPD pair force: conservative plus, when enabled, dissipative
/// and random terms.
///
/// The velocity slices are passed in explicitly because integrators differ
/// in which velocity estimate the dissipative term sees (current, predicted
/// or an iteration candidate).
pub struct DpdForceKernel<'a> {
    pub type_index: &'a [usize],
    pub interactions: &'a InteractionMatrix,
    pub vx: &'a [Real],
    pub vy: &'a [Real],
    pub vz: &'a [Real],
    pub gamma: Real,
    pub sigma: Real,
    pub cutoff: Real,
    pub inv_sqrt_dt: Real,
    pub include_dissipative: bool,
    pub include_random: bool,
}

impl PairKernel for DpdForceKernel<'_> {
    fn cutoff(&self) -> Real {
        self.cutoff
    }

    fn interact(
        &self,
        scratch: &mut PairScratch<'_>,
        i: usize,
        j: usize,
        delta: [Real; 3],
        dist: Real,
    ) -> Result<(), EngineError> {
        if dist < MIN_PAIR_DISTANCE {
            return Ok(());
        }

        let weight = dpd::weight(dist, self.cutoff);
        let a = self.interactions.a(self.type_index[i], self.type_index[j]);
        let mut force = dpd::conservative_force(a, weight);

        let inv_dist = 1.0 / dist;
        let unit = [delta[0] * inv_dist, delta[1] * inv_dist, delta[2] * inv_dist];

        if self.include_dissipative {
            let v_along_r = (self.vx[i] - self.vx[j]) * unit[0]
                + (self.vy[i] - self.vy[j]) * unit[1]
                + (self.vz[i] - self.vz[j]) * unit[2];
            force += dpd::dissipative_force(self.gamma, weight, v_along_r);
        }
        if self.include_random {
            force += dpd::random_force(
                self.sigma,
                weight,
                scratch.rng.unit_sample(),
                self.inv_sqrt_dt,
            );
        }

        let f = [force * unit[0], force * unit[1], force * unit[2]];
        unsafe {
            scratch.forces.add(i, f[0], f[1], f[2]);
            scratch.forces.add(j, -f[0], -f[1], -f[2]);
        }
        Ok(())
    }
}

/// Dissipative term alone, replayed over cached pair geometry while a
/// self-consistent iteration refines the velocity estimate.
pub struct DissipativeKernel<'a> {
    pub vx: &'a [Real],
    pub vy: &'a [Real],
    pub vz: &'a [Real],
    pub gamma: Real,
    pub cutoff: Real,
}

impl PairKernel for DissipativeKernel<'_> {
    fn cutoff(&self) -> Real {
        self.cutoff
    }

    fn interact(
        &self,
        scratch: &mut PairScratch<'_>,
        i: usize,
        j: usize,
        delta: [Real; 3],
        dist: Real,
    ) -> Result<(), EngineError> {
        if dist < MIN_PAIR_DISTANCE {
            return Ok(());
        }

        let weight = dpd::weight(dist, self.cutoff);
        let inv_dist = 1.0 / dist;
        let unit = [delta[0] * inv_dist, delta[1] * inv_dist, delta[2] * inv_dist];
        let v_along_r = (self.vx[i] - self.vx[j]) * unit[0]
            + (self.vy[i] - self.vy[j]) * unit[1]
            + (self.vz[i] - self.vz[j]) * unit[2];
        let force = dpd::dissipative_force(self.gamma, weight, v_along_r);

        let f = [force * unit[0], force * unit[1], force * unit[2]];
        unsafe {
            scratch.forces.add(i, f[0], f[1], f[2]);
            scratch.forces.add(j, -f[0], -f[1], -f[2]);
        }
        Ok(())
    }
}

/// Conservative pair potential and virial, accumulated into the adders.
pub struct DpdPotentialKernel<'a> {
    pub type_index: &'a [usize],
    pub interactions: &'a InteractionMatrix,
    pub cutoff: Real,
}

impl PairKernel for DpdPotentialKernel<'_> {
    fn cutoff(&self) -> Real {
        self.cutoff
    }

    fn interact(
        &self,
        scratch: &mut PairScratch<'_>,
        i: usize,
        j: usize,
        delta: [Real; 3],
        dist: Real,
    ) -> Result<(), EngineError> {
        if dist < MIN_PAIR_DISTANCE {
            return Ok(());
        }

        let a = self.interactions.a(self.type_index[i], self.type_index[j]);
        scratch
            .adders
            .potential
            .add(dpd::pair_potential(a, dist, self.cutoff) as f64);

        let force = dpd::conservative_force(a, dpd::weight(dist, self.cutoff));
        let force_over_dist = force / dist;
        scratch.adders.add_virial(
            (force_over_dist * delta[0] * delta[0]) as f64,
            (force_over_dist * delta[1] * delta[1]) as f64,
            (force_over_dist * delta[2] * delta[2]) as f64,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::accumulator::AdderGroup;
    use crate::engine::pairs::SharedForces;
    use crate::engine::random::RandomSource;

    fn approx_equal(a: Real, b: Real, tolerance: Real) -> bool {
        (a - b).abs() < tolerance
    }

    struct Harness {
        fx: Vec<Real>,
        fy: Vec<Real>,
        fz: Vec<Real>,
        adders: AdderGroup,
    }

    impl Harness {
        fn new(n: usize) -> Self {
            Self {
                fx: vec![0.0; n],
                fy: vec![0.0; n],
                fz: vec![0.0; n],
                adders: AdderGroup::new(),
            }
        }

        fn run<K: PairKernel>(&mut self, kernel: &K, delta: [Real; 3], dist: Real) {
            let forces = SharedForces::new(&mut self.fx, &mut self.fy, &mut self.fz);
            let source = RandomSource::new(Default::default(), 99);
            let mut scratch = PairScratch {
                rng: source.pair_stream(0, 0),
                adders: &self.adders,
                forces: &forces,
            };
            kernel.interact(&mut scratch, 0, 1, delta, dist).unwrap();
        }
    }

    #[test]
    fn conservative_force_is_equal_and_opposite() {
        let interactions = InteractionMatrix::uniform(1, 25.0).unwrap();
        let zeros = vec![0.0; 2];
        let kernel = DpdForceKernel {
            type_index: &[0, 0],
            interactions: &interactions,
            vx: &zeros,
            vy: &zeros,
            vz: &zeros,
            gamma: 4.5,
            sigma: 3.0,
            cutoff: 1.0,
            inv_sqrt_dt: 1.0,
            include_dissipative: false,
            include_random: false,
        };
        let mut harness = Harness::new(2);
        harness.run(&kernel, [0.5, 0.0, 0.0], 0.5);

        // a(1 - r/rc) = 25 * 0.5 along +x on particle i.
        assert!(approx_equal(harness.fx[0], 12.5, 1e-12));
        assert!(approx_equal(harness.fx[1], -12.5, 1e-12));
        assert!(approx_equal(harness.fy[0], 0.0, 1e-12));
        assert!(approx_equal(harness.fz[0], 0.0, 1e-12));
    }

    #[test]
    fn dissipative_term_opposes_relative_motion() {
        let interactions = InteractionMatrix::uniform(1, 0.0).unwrap();
        let vx = vec![1.0, -1.0];
        let zeros = vec![0.0; 2];
        let kernel = DpdForceKernel {
            type_index: &[0, 0],
            interactions: &interactions,
            vx: &vx,
            vy: &zeros,
            vz: &zeros,
            gamma: 4.5,
            sigma: 0.0,
            cutoff: 1.0,
            inv_sqrt_dt: 1.0,
            include_dissipative: true,
            include_random: false,
        };
        let mut harness = Harness::new(2);
        harness.run(&kernel, [0.5, 0.0, 0.0], 0.5);

        // The pair separates along +x at rate 2, so the drag pulls i
        // back: -gamma * w^2 * 2 = -4.5 * 0.25 * 2.
        assert!(approx_equal(harness.fx[0], -2.25, 1e-12));
        assert!(approx_equal(harness.fx[1], 2.25, 1e-12));
    }

    #[test]
    fn overlapping_pair_is_skipped() {
        let interactions = InteractionMatrix::uniform(1, 25.0).unwrap();
        let zeros = vec![0.0; 2];
        let kernel = DpdForceKernel {
            type_index: &[0, 0],
            interactions: &interactions,
            vx: &zeros,
            vy: &zeros,
            vz: &zeros,
            gamma: 4.5,
            sigma: 3.0,
            cutoff: 1.0,
            inv_sqrt_dt: 1.0,
            include_dissipative: true,
            include_random: true,
        };
        let mut harness = Harness::new(2);
        harness.run(&kernel, [0.0, 0.0, 0.0], 0.0);
        assert_eq!(harness.fx[0], 0.0);
        assert_eq!(harness.fx[1], 0.0);
    }

    #[test]
    fn potential_kernel_accumulates_energy_and_virial_without_forces() {
        let interactions = InteractionMatrix::uniform(1, 25.0).unwrap();
        let kernel = DpdPotentialKernel {
            type_index: &[0, 0],
            interactions: &interactions,
            cutoff: 1.0,
        };
        let mut harness = Harness::new(2);
        harness.run(&kernel, [0.3, 0.4, 0.0], 0.5);

        // u = 0.5 * 25 * 1 * (1 - 0.5)^2 = 3.125.
        assert!(approx_equal(harness.adders.potential.sum() as Real, 3.125, 1e-12));
        // f/r * dx^2 with f = 12.5: 25 * 0.09 and 25 * 0.16.
        assert!(approx_equal(harness.adders.pressure_x.sum() as Real, 2.25, 1e-12));
        assert!(approx_equal(harness.adders.pressure_y.sum() as Real, 4.0, 1e-12));
        assert!(approx_equal(harness.adders.pressure_z.sum() as Real, 0.0, 1e-12));
        assert_eq!(harness.fx[0], 0.0);
    }
}
