//! Per-particle update rules of the modified velocity-Verlet family.
//!
//! These are pure array sweeps; the force evaluations between them are
//! orchestrated by [`crate::engine::simulation::Simulation`], which also
//! owns the bounded self-consistency iteration the SCMVV and PNHLN
//! variants share.

pub(crate) mod gwmvv;
pub(crate) mod pnhln;
pub(crate) mod scmvv;

/// Outcome of one self-consistent velocity correction.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StepReport {
    pub iterations: usize,
    pub converged: bool,
}

impl StepReport {
    pub(crate) fn single_pass() -> Self {
        Self {
            iterations: 1,
            converged: true,
        }
    }
}
