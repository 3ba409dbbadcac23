use super::random::RandomSourceKind;
use crate::Real;
use crate::core::forces::electrostatics::ElectrostaticsParams;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Unknown integrator identifier: {0:?}")]
    UnknownIntegrator(String),
    #[error("Unknown random source identifier: {0:?}")]
    UnknownRandomSource(String),
}

/// Integration scheme and its scheme-specific parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum IntegratorKind {
    /// Groot-Warren modified velocity-Verlet with a λ velocity predictor.
    Gwmvv { lambda: Real },
    /// Self-consistent modified velocity-Verlet: the velocity-dependent
    /// dissipative force is iterated to a fixed point each step.
    Scmvv {
        max_iterations: usize,
        tolerance: Real,
    },
    /// SCMVV self-consistency plus a Nose-Hoover-like feedback variable
    /// steering the effective friction toward the target temperature.
    Pnhln {
        max_iterations: usize,
        tolerance: Real,
        coupling_time: Real,
    },
}

impl IntegratorKind {
    pub const DEFAULT_LAMBDA: Real = 0.65;
    pub const DEFAULT_MAX_ITERATIONS: usize = 5;
    pub const DEFAULT_TOLERANCE: Real = 1e-10;
    pub const DEFAULT_COUPLING_TIME: Real = 1.0;

    pub fn gwmvv() -> Self {
        Self::Gwmvv {
            lambda: Self::DEFAULT_LAMBDA,
        }
    }

    pub fn scmvv() -> Self {
        Self::Scmvv {
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            tolerance: Self::DEFAULT_TOLERANCE,
        }
    }

    pub fn pnhln() -> Self {
        Self::Pnhln {
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            tolerance: Self::DEFAULT_TOLERANCE,
            coupling_time: Self::DEFAULT_COUPLING_TIME,
        }
    }
}

impl FromStr for IntegratorKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GWMVV" => Ok(Self::gwmvv()),
            "SCMVV" => Ok(Self::scmvv()),
            "PNHLN" => Ok(Self::pnhln()),
            _ => Err(ConfigError::UnknownIntegrator(s.to_string())),
        }
    }
}

/// Settings of the optional potential-energy minimization phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinimizationConfig {
    /// Number of minimization steps.
    pub steps: u64,
    /// Initial displacement per unit force.
    pub step_size: Real,
    /// Clamp on the displacement norm of a single step.
    pub max_displacement: Real,
    /// Restrict the force evaluation to the conservative DPD contribution
    /// (random and dissipative terms disabled).
    pub dpd_force_only: bool,
}

impl Default for MinimizationConfig {
    fn default() -> Self {
        Self {
            steps: 100,
            step_size: 1e-3,
            max_displacement: 0.1,
            dpd_force_only: true,
        }
    }
}

/// Restart state handed in and out at the workflow boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RestartInfo {
    /// Steps already completed by the previous run; step numbering and the
    /// warm-up window continue from here.
    pub completed_steps: u64,
    /// Steps to perform in this run.
    pub additional_steps: u64,
    /// Draw fresh Maxwell velocities before integrating.
    pub reinitialize_velocities: bool,
}

/// Validated, effectively-immutable-per-run simulation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub time_step_count: u64,
    pub time_step_length: Real,
    pub output_frequency: u64,
    pub integrator: IntegratorKind,
    pub random_source: RandomSourceKind,
    pub random_seed: u64,
    /// Target temperature in k_BT units.
    pub temperature: Real,
    /// DPD friction coefficient γ.
    pub gamma: Real,
    /// DPD interaction cutoff r_c.
    pub cutoff: Real,
    /// Warm-up window (in steps) with per-step velocity scaling toward the
    /// target temperature. Zero disables scaling.
    pub velocity_scaling_steps: u64,
    /// Worker threads for the pair dispatch; `None` lets the pool pick.
    pub threads: Option<usize>,
    pub minimization: Option<MinimizationConfig>,
    pub electrostatics: Option<ElectrostaticsParams>,
    /// Compute per-molecule-type radius of gyration at output steps.
    pub measure_radius_of_gyration: bool,
    pub restart: Option<RestartInfo>,
}

#[derive(Debug, Default)]
pub struct SimulationConfigBuilder {
    time_step_count: Option<u64>,
    time_step_length: Option<Real>,
    output_frequency: Option<u64>,
    integrator: Option<IntegratorKind>,
    random_source: Option<RandomSourceKind>,
    random_seed: Option<u64>,
    temperature: Option<Real>,
    gamma: Option<Real>,
    cutoff: Option<Real>,
    velocity_scaling_steps: Option<u64>,
    threads: Option<usize>,
    minimization: Option<MinimizationConfig>,
    electrostatics: Option<ElectrostaticsParams>,
    measure_radius_of_gyration: bool,
    restart: Option<RestartInfo>,
}

impl SimulationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time_step_count(mut self, count: u64) -> Self {
        self.time_step_count = Some(count);
        self
    }
    pub fn time_step_length(mut self, length: Real) -> Self {
        self.time_step_length = Some(length);
        self
    }
    pub fn output_frequency(mut self, frequency: u64) -> Self {
        self.output_frequency = Some(frequency);
        self
    }
    pub fn integrator(mut self, kind: IntegratorKind) -> Self {
        self.integrator = Some(kind);
        self
    }
    pub fn random_source(mut self, kind: RandomSourceKind) -> Self {
        self.random_source = Some(kind);
        self
    }
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }
    pub fn temperature(mut self, k_b_t: Real) -> Self {
        self.temperature = Some(k_b_t);
        self
    }
    pub fn gamma(mut self, gamma: Real) -> Self {
        self.gamma = Some(gamma);
        self
    }
    pub fn cutoff(mut self, cutoff: Real) -> Self {
        self.cutoff = Some(cutoff);
        self
    }
    pub fn velocity_scaling_steps(mut self, steps: u64) -> Self {
        self.velocity_scaling_steps = Some(steps);
        self
    }
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }
    pub fn minimization(mut self, minimization: MinimizationConfig) -> Self {
        self.minimization = Some(minimization);
        self
    }
    pub fn electrostatics(mut self, params: ElectrostaticsParams) -> Self {
        self.electrostatics = Some(params);
        self
    }
    pub fn measure_radius_of_gyration(mut self, enabled: bool) -> Self {
        self.measure_radius_of_gyration = enabled;
        self
    }
    pub fn restart(mut self, restart: RestartInfo) -> Self {
        self.restart = Some(restart);
        self
    }

    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let config = SimulationConfig {
            time_step_count: self
                .time_step_count
                .ok_or(ConfigError::MissingParameter("time_step_count"))?,
            time_step_length: self
                .time_step_length
                .ok_or(ConfigError::MissingParameter("time_step_length"))?,
            output_frequency: self.output_frequency.unwrap_or(100),
            integrator: self.integrator.unwrap_or_else(IntegratorKind::gwmvv),
            random_source: self.random_source.unwrap_or_default(),
            random_seed: self
                .random_seed
                .ok_or(ConfigError::MissingParameter("random_seed"))?,
            temperature: self
                .temperature
                .ok_or(ConfigError::MissingParameter("temperature"))?,
            gamma: self.gamma.ok_or(ConfigError::MissingParameter("gamma"))?,
            cutoff: self.cutoff.unwrap_or(1.0),
            velocity_scaling_steps: self.velocity_scaling_steps.unwrap_or(0),
            threads: self.threads,
            minimization: self.minimization,
            electrostatics: self.electrostatics,
            measure_radius_of_gyration: self.measure_radius_of_gyration,
            restart: self.restart,
        };

        if !(config.time_step_length > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "time_step_length",
                reason: format!("must be positive, got {}", config.time_step_length),
            });
        }
        if !(config.cutoff > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "cutoff",
                reason: format!("must be positive, got {}", config.cutoff),
            });
        }
        if config.temperature < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "temperature",
                reason: format!("must be non-negative, got {}", config.temperature),
            });
        }
        if config.gamma < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "gamma",
                reason: format!("must be non-negative, got {}", config.gamma),
            });
        }
        if config.output_frequency == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "output_frequency",
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(minimization) = &config.minimization {
            if !(minimization.step_size > 0.0) || !(minimization.max_displacement > 0.0) {
                return Err(ConfigError::InvalidParameter {
                    name: "minimization",
                    reason: "step_size and max_displacement must be positive".to_string(),
                });
            }
        }

        Ok(config)
    }
}
