//! # Data Model Module
//!
//! The struct-of-arrays particle state ([`particles::ParticleSet`]), the
//! particle-type and conservative-coefficient tables ([`types`]), the
//! harmonic bond table with its race-free chunk partition ([`bonds`]), the
//! molecule-level constraint table ([`constraints`]), and the [`topology`]
//! bundle tying them to a box.
//!
//! Particle indices are the primary key of the whole kernel: every
//! per-particle array shares one length and one indexing, and an index is
//! stable for the lifetime of a run.

pub mod bonds;
pub mod constraints;
pub mod particles;
pub mod topology;
pub mod types;
