//! Pair-interaction kernels plugged into the cell-pair driver.
//!
//! Force kernels write into the shared force view and keep the adders
//! untouched; potential kernels accumulate energy and virial sums and
//! write no forces. Pressure and potential are therefore measured by a
//! dedicated pass instead of being entangled with force evaluation.

mod dpd;
mod electrostatics;

pub use dpd::{DissipativeKernel, DpdForceKernel, DpdPotentialKernel};
pub use electrostatics::{ElectrostaticForceKernel, ElectrostaticPotentialKernel};

use crate::Real;

/// Pairs closer than this are skipped: the pair direction is numerically
/// undefined and DPD conservative forces stay finite anyway.
pub(crate) const MIN_PAIR_DISTANCE: Real = 1e-12;
