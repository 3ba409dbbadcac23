//! # Pair Interaction Mathematics
//!
//! Pure, stateless forms of the pairwise interactions: the soft-repulsive
//! DPD triple (conservative, dissipative, random), the harmonic bond, and
//! the damped, force-clamped electrostatic interaction.
//!
//! All functions here take scalar pair quantities and return scalar force
//! magnitudes (along the unit separation vector) or potential energies; the
//! engine layer owns vectors, accumulation, and parallel dispatch.

pub mod bond;
pub mod dpd;
pub mod electrostatics;
