//! # Workflows Module
//!
//! The public entry point of the crate: [`run::run`] executes a complete
//! simulation (pre-processing, optional minimization, time-step
//! integration, post-processing) against caller-supplied topology, state,
//! output sink, progress reporter, and stop signal.

pub mod run;

pub use run::{SimulationSummary, run};
