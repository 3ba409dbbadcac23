use thiserror::Error;

use super::config::ConfigError;
use super::output::OutputError;
use crate::Real;
use crate::core::forces::electrostatics::ElectrostaticsError;
use crate::core::models::bonds::BondError;
use crate::core::models::topology::TopologyError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(
        "Cutoff {cutoff} exceeds half the box length ({half_length}) on periodic axis {axis}; \
         the minimum-image convention would be ambiguous"
    )]
    CutoffExceedsHalfBox {
        axis: usize,
        cutoff: Real,
        half_length: Real,
    },

    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Electrostatics parameters invalid: {source}")]
    Electrostatics {
        #[from]
        source: ElectrostaticsError,
    },

    #[error("Bond table invalid: {source}")]
    Bonds {
        #[from]
        source: BondError,
    },

    #[error("Topology inconsistent with particle set: {source}")]
    Topology {
        #[from]
        source: TopologyError,
    },

    #[error("Failed to build worker thread pool: {0}")]
    ThreadPool(String),

    #[error("Output sink rejected snapshot at step {step}: {source}")]
    Output { step: u64, source: OutputError },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
