//! # Engine Module
//!
//! The stateful logic core of the simulation kernel. It owns the spatial
//! acceleration structure and the machinery that turns an inherently
//! race-prone pairwise computation into a deterministic parallel one.
//!
//! ## Architecture
//!
//! - **Spatial partition** ([`cells`]) - the cell-linked-list grid, its
//!   periodic neighbor-pair enumeration, and the partition of all cell pairs
//!   into race-free "safe chunks"
//! - **Pair driver** ([`pairs`]) - the single neighbor-iteration loop that
//!   dispatches every in-cutoff particle pair to a pluggable
//!   [`pairs::PairKernel`], in whole-box parallel or cached-replay mode
//! - **Interaction kernels** ([`kernels`]) - the per-physical-kind callbacks:
//!   DPD force, DPD potential/pressure, dissipative replay, electrostatics
//! - **Bonded interactions** ([`bonded`]) - harmonic bond evaluation over the
//!   chunked bond table
//! - **Constraint application** ([`constraints`]) - frozen axes, imposed
//!   velocities, reflecting regions, external accelerations
//! - **Accumulators** ([`accumulator`]) - lock-free scalar adders collecting
//!   potential energy and pressure contributions across worker threads
//! - **Random provision** ([`random`]) - deterministic per-pair generator
//!   streams derived from a master seed
//! - **Integrators** ([`integrators`], [`simulation`]) - the velocity-Verlet
//!   family (GWMVV, SCMVV, PNHLN) with bounded self-consistent velocity
//!   correction, and the phase state machine driving them
//! - **Collaborator seams** ([`output`], [`monitor`]) - snapshot sink,
//!   progress reporting, and cooperative cancellation
//! - **Configuration** ([`config`]) and **error taxonomy** ([`error`])
//!
//! ## The central invariant
//!
//! Within one safe chunk, no cell appears in two cell pairs, so concurrent
//! workers of a chunk own disjoint particle index sets and may write force
//! array slots without locks. Chunks are processed strictly one after
//! another with a join in between. Everything else in this module is built
//! around preserving that invariant.

pub mod accumulator;
pub(crate) mod bonded;
pub mod cells;
pub mod config;
pub(crate) mod constraints;
pub mod error;
pub(crate) mod integrators;
pub(crate) mod kernels;
pub mod monitor;
pub mod output;
pub mod pairs;
pub mod random;
pub mod observables;
pub mod simulation;
