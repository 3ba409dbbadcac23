//! # Core Module
//!
//! Stateless foundations of the simulation kernel: box geometry and periodic
//! boundary handling, the struct-of-arrays particle data model with its type
//! and bond tables, and the pure mathematical forms of the DPD, harmonic
//! bond, and electrostatic pair interactions.
//!
//! Nothing in this layer owns threads, random state, or accumulators; every
//! function here is a pure computation over value types, which is what makes
//! the engine layer above it testable against naive reference
//! implementations.

pub mod forces;
pub mod geometry;
pub mod models;
