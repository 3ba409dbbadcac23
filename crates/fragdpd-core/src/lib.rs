//! # fragdpd Core Library
//!
//! A high-performance simulation kernel for molecular fragment Dissipative
//! Particle Dynamics (DPD): pairwise conservative, random, and dissipative
//! forces with optional harmonic bonds and short-ranged electrostatics,
//! integrated inside a rectangular periodic (or bounded) box.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a
//! clear separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains stateless value types
//!   (`BoxSize`, `ParticleSet`, bond tables) and the pure mathematical forms
//!   of the pair interactions (`forces`).
//!
//! - **[`engine`]: The Logic Core.** This stateful layer orchestrates the
//!   simulation: the cell-linked-list spatial partition and its race-free
//!   chunk decomposition, the parallel pair-interaction driver and its
//!   per-kind kernels, lock-free accumulators, and the velocity-Verlet
//!   integrator family with self-consistent velocity correction.
//!
//! - **[`workflows`]: The Public API.** The highest-level, user-facing layer:
//!   it ties the `engine` and `core` together to execute a complete
//!   simulation run with progress reporting and cooperative cancellation.
//!
//! ## Precision
//!
//! All particle state and pair math use the crate-level [`Real`] scalar:
//! `f64` by default, `f32` when the `single-precision` feature is enabled.
//! Scalar accumulators always sum in `f64` regardless of the build.

pub mod core;
pub mod engine;
pub mod workflows;

/// Floating-point scalar used for particle state and pair math.
#[cfg(not(feature = "single-precision"))]
pub type Real = f64;

/// Floating-point scalar used for particle state and pair math.
#[cfg(feature = "single-precision")]
pub type Real = f32;
