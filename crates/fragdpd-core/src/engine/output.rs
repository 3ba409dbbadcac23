//! The snapshot sink seam between the integration loop and whatever
//! persists trajectories.
//!
//! The engine never touches files; it hands borrowed snapshots to an
//! [`OutputSink`] and treats any sink error as fatal for the run.

use super::observables::PressureDiagonal;
use crate::Real;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O failure in output sink: {0}")]
    Io(#[from] std::io::Error),
    #[error("Output sink rejected data: {0}")]
    Sink(String),
}

/// Run-constant facts a sink may want before the first snapshot.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub particle_count: usize,
    pub particle_type_names: Vec<String>,
    pub time_step_length: Real,
    pub total_steps: u64,
}

/// Per-kind potential energy totals of one measurement pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PotentialBreakdown {
    pub dpd: f64,
    pub bond: f64,
    pub electrostatic: f64,
}

impl PotentialBreakdown {
    pub fn total(&self) -> f64 {
        self.dpd + self.bond + self.electrostatic
    }
}

/// One output-step snapshot. Position and velocity slices borrow straight
/// from the particle arrays; sinks copy what they keep.
#[derive(Debug)]
pub struct StepSnapshot<'a> {
    pub step: u64,
    pub time: Real,
    pub temperature: f64,
    pub potential: PotentialBreakdown,
    pub kinetic_energy: f64,
    pub total_energy: f64,
    pub pressure: PressureDiagonal,
    pub surface_tension: f64,
    /// Mean radius of gyration per molecule type, when measured.
    pub radius_of_gyration: Option<&'a [f64]>,
    /// Per-particle type indices into [`RunInfo::particle_type_names`].
    pub type_index: &'a [usize],
    pub x: &'a [Real],
    pub y: &'a [Real],
    pub z: &'a [Real],
    pub vx: &'a [Real],
    pub vy: &'a [Real],
    pub vz: &'a [Real],
}

/// Consumer of simulation output.
pub trait OutputSink {
    fn begin(&mut self, info: &RunInfo) -> Result<(), OutputError>;

    fn write_step(&mut self, snapshot: &StepSnapshot<'_>) -> Result<(), OutputError>;

    /// Called once after the minimization phase, with the relaxed
    /// configuration. Sinks that only record the trajectory ignore it.
    fn write_minimized(&mut self, _snapshot: &StepSnapshot<'_>) -> Result<(), OutputError> {
        Ok(())
    }

    fn finish(&mut self) -> Result<(), OutputError>;
}

/// Discards everything. Useful for equilibration runs and tests.
#[derive(Debug, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn begin(&mut self, _info: &RunInfo) -> Result<(), OutputError> {
        Ok(())
    }

    fn write_step(&mut self, _snapshot: &StepSnapshot<'_>) -> Result<(), OutputError> {
        Ok(())
    }

    fn finish(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}
