//! Scenario files: the TOML description of a complete simulation.
//!
//! A scenario names the box, the particle types and their conservative
//! repulsion coefficients, the particle groups that fill the box (free beads
//! and linear chains), and the run settings. [`Scenario::build`] turns it
//! into the engine-level [`Topology`], [`ParticleSet`], and
//! [`SimulationConfig`].

use crate::error::{CliError, Result};
use fragdpd::Real;
use fragdpd::core::forces::electrostatics::ElectrostaticsParams;
use fragdpd::core::geometry::{BoxSize, PeriodicBoundaries};
use fragdpd::core::models::bonds::{BondBehavior, BondChunks, HarmonicBond};
use fragdpd::core::models::constraints::{
    AxisMask, ConstraintTable, MoleculeConstraints, ReflectingRegion,
};
use fragdpd::core::models::particles::{ParticleInit, ParticleSet, ParticleSetBuilder};
use fragdpd::core::models::topology::Topology;
use fragdpd::core::models::types::{InteractionMatrix, ParticleTypeTable};
use fragdpd::engine::config::{
    IntegratorKind, MinimizationConfig, RestartInfo, SimulationConfig, SimulationConfigBuilder,
};
use fragdpd::engine::random::RandomSourceKind;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileBox {
    /// Box edge lengths; `edge` is shorthand for a cube.
    pub lengths: Option<[Real; 3]>,
    pub edge: Option<Real>,
    /// Periodic flags per axis; defaults to fully periodic.
    pub periodic: Option<[bool; 3]>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileInteractions {
    /// One repulsion coefficient for every type pair.
    pub uniform: Option<Real>,
    /// Full symmetric coefficient matrix, row per type.
    pub rows: Option<Vec<Vec<Real>>>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConstraints {
    /// Axes the group never moves on, e.g. ["x", "z"].
    #[serde(default)]
    pub frozen: Vec<String>,
    pub fixed_velocity: Option<[Real; 3]>,
    pub reflection_min: Option<[Real; 3]>,
    pub reflection_max: Option<[Real; 3]>,
    #[serde(default)]
    pub acceleration: [Real; 3],
}

impl FileConstraints {
    fn to_core(&self) -> Result<MoleculeConstraints> {
        let mut frozen = AxisMask::NONE;
        for axis in &self.frozen {
            match axis.as_str() {
                "x" => frozen.x = true,
                "y" => frozen.y = true,
                "z" => frozen.z = true,
                other => {
                    return Err(CliError::ScenarioContent(format!(
                        "unknown frozen axis {other:?}, expected \"x\", \"y\", or \"z\""
                    )));
                }
            }
        }
        let reflection = match (self.reflection_min, self.reflection_max) {
            (Some(min), Some(max)) => Some(ReflectingRegion { min, max }),
            (None, None) => None,
            _ => {
                return Err(CliError::ScenarioContent(
                    "reflection-min and reflection-max must be given together".to_string(),
                ));
            }
        };
        Ok(MoleculeConstraints {
            frozen,
            fixed_velocity: self.fixed_velocity,
            reflection,
            acceleration: self.acceleration,
        })
    }
}

/// A population of free (unbonded) beads of one particle type.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSpecies {
    /// Particle type name, matching an entry of `types`.
    pub r#type: String,
    pub count: usize,
    #[serde(default)]
    pub charge: Real,
    pub mass: Option<Real>,
    pub molar_mass: Option<Real>,
    pub constraints: Option<FileConstraints>,
}

/// A population of linear chain molecules with harmonic bonds.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileChain {
    /// Particle type names along the chain, one per bead.
    pub beads: Vec<String>,
    pub count: usize,
    pub bond_length: Real,
    pub bond_constant: Real,
    /// "always", "stretched-only", or "compressed-only".
    pub bond_behavior: Option<String>,
    #[serde(default)]
    pub charges: Vec<Real>,
    pub mass: Option<Real>,
    pub molar_mass: Option<Real>,
    pub constraints: Option<FileConstraints>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileMinimization {
    pub steps: Option<u64>,
    pub step_size: Option<Real>,
    pub max_displacement: Option<Real>,
    pub dpd_force_only: Option<bool>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileElectrostatics {
    pub coupling: Real,
    pub exponent: Real,
    pub damping: Real,
    pub max_force: Real,
    pub cutoff: Real,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileRestart {
    pub completed_steps: u64,
    pub additional_steps: u64,
    #[serde(default)]
    pub reinitialize_velocities: bool,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSimulation {
    pub steps: u64,
    pub time_step: Real,
    pub temperature: Real,
    pub gamma: Real,
    pub cutoff: Option<Real>,
    pub seed: u64,
    pub output_frequency: Option<u64>,
    /// "gwmvv", "scmvv", or "pnhln".
    pub integrator: Option<String>,
    /// "gaussian" or "uniform".
    pub random_source: Option<String>,
    pub velocity_scaling_steps: Option<u64>,
    #[serde(default)]
    pub measure_radius_of_gyration: bool,
    pub minimization: Option<FileMinimization>,
    pub electrostatics: Option<FileElectrostatics>,
    pub restart: Option<FileRestart>,
}

/// The whole scenario file.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Scenario {
    #[serde(rename = "box")]
    pub box_spec: FileBox,
    /// Particle type names; indices follow file order.
    pub types: Vec<String>,
    pub interactions: FileInteractions,
    /// Gravity applied to every non-frozen particle.
    #[serde(default)]
    pub gravity: [Real; 3],
    #[serde(default)]
    pub species: Vec<FileSpecies>,
    #[serde(default)]
    pub chains: Vec<FileChain>,
    pub simulation: FileSimulation,
}

/// Everything `run` needs, built from one scenario.
pub struct BuiltScenario {
    pub topology: Topology,
    pub particles: ParticleSet,
    pub config: SimulationConfig,
}

impl Scenario {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CliError::Scenario {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        let scenario: Scenario = toml::from_str(&content).map_err(|e| CliError::Scenario {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        debug!(
            types = scenario.types.len(),
            species = scenario.species.len(),
            chains = scenario.chains.len(),
            "Parsed scenario file"
        );
        Ok(scenario)
    }

    /// Resolves the scenario into engine-level inputs. Placement is
    /// deterministic for a given scenario and seed.
    pub fn build(&self) -> Result<BuiltScenario> {
        let box_size = self.box_size()?;
        let periodic = match self.box_spec.periodic {
            Some([x, y, z]) => PeriodicBoundaries::new(x, y, z),
            None => PeriodicBoundaries::all(),
        };

        let types = ParticleTypeTable::new(self.types.clone())
            .map_err(|e| CliError::ScenarioContent(e.to_string()))?;
        let interactions = self.interactions(types.len())?;

        // Salted so placement never shares a stream with the engine's
        // pairwise noise for the same master seed.
        let mut placement =
            Xoshiro256PlusPlus::seed_from_u64(self.simulation.seed ^ 0x9e37_79b9_7f4a_7c15);
        let mut builder = ParticleSetBuilder::new();
        let mut bonds = Vec::new();
        let mut per_type_constraints = Vec::new();

        // Species and chains each become one molecule type, in file order.
        let mut molecule_type = 0;
        for species in &self.species {
            let type_index = self.type_index(&species.r#type)?;
            for instance in 0..species.count {
                builder.push(ParticleInit {
                    position: random_position(&mut placement, &box_size),
                    type_index,
                    molecule_type,
                    molecule_instance: instance,
                    charge: species.charge,
                    dpd_mass: species.mass.unwrap_or(1.0),
                    molar_mass: species.molar_mass.unwrap_or(1.0),
                    ..ParticleInit::default()
                });
            }
            per_type_constraints.push(match &species.constraints {
                Some(c) => c.to_core()?,
                None => MoleculeConstraints::UNCONSTRAINED,
            });
            molecule_type += 1;
        }

        let mut next_index = builder_len(&self.species);
        for chain in &self.chains {
            if chain.beads.is_empty() {
                return Err(CliError::ScenarioContent(
                    "a chain must name at least one bead".to_string(),
                ));
            }
            if !chain.charges.is_empty() && chain.charges.len() != chain.beads.len() {
                return Err(CliError::ScenarioContent(format!(
                    "chain lists {} charges for {} beads",
                    chain.charges.len(),
                    chain.beads.len()
                )));
            }
            let behavior = bond_behavior(chain.bond_behavior.as_deref())?;
            let bead_types = chain
                .beads
                .iter()
                .map(|name| self.type_index(name))
                .collect::<Result<Vec<_>>>()?;
            let extent = chain.bond_length * (chain.beads.len() - 1) as Real;
            for axis in 0..3 {
                if !periodic.is_periodic(axis) && extent >= box_size.length(axis) {
                    return Err(CliError::ScenarioContent(format!(
                        "chain extent {extent} cannot fit the box on non-periodic axis {axis}"
                    )));
                }
            }

            for instance in 0..chain.count {
                // Beads of one chain start bond-length apart along a random
                // direction so the first force evaluation is already sane.
                // Non-periodic axes have no image to wrap into, so the
                // placement is re-drawn until the far end stays in-box.
                let (origin, direction) = loop {
                    let origin = random_position(&mut placement, &box_size);
                    let direction = random_unit_vector(&mut placement);
                    let fits = (0..3).all(|axis| {
                        periodic.is_periodic(axis) || {
                            let end = origin[axis] + direction[axis] * extent;
                            end >= 0.0 && end <= box_size.length(axis)
                        }
                    });
                    if fits {
                        break (origin, direction);
                    }
                };
                for (bead, &type_index) in bead_types.iter().enumerate() {
                    let offset = chain.bond_length * bead as Real;
                    builder.push(ParticleInit {
                        position: [
                            origin[0] + direction[0] * offset,
                            origin[1] + direction[1] * offset,
                            origin[2] + direction[2] * offset,
                        ],
                        type_index,
                        molecule_type,
                        molecule_instance: instance,
                        charge: chain.charges.get(bead).copied().unwrap_or(0.0),
                        dpd_mass: chain.mass.unwrap_or(1.0),
                        molar_mass: chain.molar_mass.unwrap_or(1.0),
                        ..ParticleInit::default()
                    });
                }
                for bead in 1..chain.beads.len() {
                    bonds.push(HarmonicBond {
                        a: next_index + bead - 1,
                        b: next_index + bead,
                        length: chain.bond_length,
                        force_constant: chain.bond_constant,
                        behavior,
                    });
                }
                next_index += chain.beads.len();
            }
            per_type_constraints.push(match &chain.constraints {
                Some(c) => c.to_core()?,
                None => MoleculeConstraints::UNCONSTRAINED,
            });
            molecule_type += 1;
        }

        let particles = builder
            .build()
            .map_err(|e| CliError::ScenarioContent(e.to_string()))?;
        let bonds = BondChunks::build(bonds, particles.len())
            .map_err(|e| CliError::ScenarioContent(e.to_string()))?;
        let constraints = ConstraintTable::new(per_type_constraints, self.gravity);

        let topology = Topology {
            box_size,
            periodic,
            types,
            interactions,
            bonds,
            constraints,
        };
        let config = self.config()?;

        Ok(BuiltScenario {
            topology,
            particles,
            config,
        })
    }

    fn box_size(&self) -> Result<BoxSize> {
        let result = match (self.box_spec.lengths, self.box_spec.edge) {
            (Some([x, y, z]), None) => BoxSize::new(x, y, z),
            (None, Some(edge)) => BoxSize::cubic(edge),
            _ => {
                return Err(CliError::ScenarioContent(
                    "box needs exactly one of `lengths` or `edge`".to_string(),
                ));
            }
        };
        result.map_err(|e| CliError::ScenarioContent(e.to_string()))
    }

    fn interactions(&self, n_types: usize) -> Result<InteractionMatrix> {
        let result = match (&self.interactions.uniform, &self.interactions.rows) {
            (Some(a), None) => InteractionMatrix::uniform(n_types, *a),
            (None, Some(rows)) => {
                if rows.len() != n_types {
                    return Err(CliError::ScenarioContent(format!(
                        "interaction matrix has {} rows for {} types",
                        rows.len(),
                        n_types
                    )));
                }
                InteractionMatrix::new(rows.clone())
            }
            _ => {
                return Err(CliError::ScenarioContent(
                    "interactions needs exactly one of `uniform` or `rows`".to_string(),
                ));
            }
        };
        result.map_err(|e| CliError::ScenarioContent(e.to_string()))
    }

    fn type_index(&self, name: &str) -> Result<usize> {
        self.types
            .iter()
            .position(|t| t == name)
            .ok_or_else(|| CliError::ScenarioContent(format!("unknown particle type {name:?}")))
    }

    fn config(&self) -> Result<SimulationConfig> {
        let sim = &self.simulation;
        let mut builder = SimulationConfigBuilder::new()
            .time_step_count(sim.steps)
            .time_step_length(sim.time_step)
            .temperature(sim.temperature)
            .gamma(sim.gamma)
            .random_seed(sim.seed)
            .measure_radius_of_gyration(sim.measure_radius_of_gyration);

        if let Some(cutoff) = sim.cutoff {
            builder = builder.cutoff(cutoff);
        }
        if let Some(frequency) = sim.output_frequency {
            builder = builder.output_frequency(frequency);
        }
        if let Some(name) = &sim.integrator {
            builder = builder.integrator(
                IntegratorKind::from_str(name)
                    .map_err(|e| CliError::ScenarioContent(e.to_string()))?,
            );
        }
        if let Some(name) = &sim.random_source {
            builder = builder.random_source(
                RandomSourceKind::from_str(name)
                    .map_err(|e| CliError::ScenarioContent(e.to_string()))?,
            );
        }
        if let Some(steps) = sim.velocity_scaling_steps {
            builder = builder.velocity_scaling_steps(steps);
        }
        if let Some(minimization) = &sim.minimization {
            let defaults = MinimizationConfig::default();
            builder = builder.minimization(MinimizationConfig {
                steps: minimization.steps.unwrap_or(defaults.steps),
                step_size: minimization.step_size.unwrap_or(defaults.step_size),
                max_displacement: minimization
                    .max_displacement
                    .unwrap_or(defaults.max_displacement),
                dpd_force_only: minimization.dpd_force_only.unwrap_or(defaults.dpd_force_only),
            });
        }
        if let Some(elec) = &sim.electrostatics {
            builder = builder.electrostatics(ElectrostaticsParams {
                coupling: elec.coupling,
                exponent: elec.exponent,
                damping: elec.damping,
                max_force: elec.max_force,
                cutoff: elec.cutoff,
            });
        }
        if let Some(restart) = &sim.restart {
            builder = builder.restart(RestartInfo {
                completed_steps: restart.completed_steps,
                additional_steps: restart.additional_steps,
                reinitialize_velocities: restart.reinitialize_velocities,
            });
        }

        builder
            .build()
            .map_err(|e| CliError::ScenarioContent(e.to_string()))
    }
}

fn builder_len(species: &[FileSpecies]) -> usize {
    species.iter().map(|s| s.count).sum()
}

fn bond_behavior(name: Option<&str>) -> Result<BondBehavior> {
    match name {
        None | Some("always") => Ok(BondBehavior::Always),
        Some("stretched-only") => Ok(BondBehavior::StretchedOnly),
        Some("compressed-only") => Ok(BondBehavior::CompressedOnly),
        Some(other) => Err(CliError::ScenarioContent(format!(
            "unknown bond behavior {other:?}"
        ))),
    }
}

fn random_position(rng: &mut Xoshiro256PlusPlus, box_size: &BoxSize) -> [Real; 3] {
    let mut component = |axis: usize| {
        let u: Real = rng.sample(rand::distributions::Standard);
        u * box_size.length(axis)
    };
    [component(0), component(1), component(2)]
}

fn random_unit_vector(rng: &mut Xoshiro256PlusPlus) -> [Real; 3] {
    loop {
        let mut component = || {
            let u: Real = rng.sample(rand::distributions::Standard);
            2.0 * u - 1.0
        };
        let v = [component(), component(), component()];
        let norm_sq = v[0] * v[0] + v[1] * v[1] + v[2] * v[2];
        if norm_sq > 1e-4 && norm_sq <= 1.0 {
            let inv = norm_sq.sqrt().recip();
            return [v[0] * inv, v[1] * inv, v[2] * inv];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        types = ["W"]

        [box]
        edge = 10.0

        [interactions]
        uniform = 25.0

        [[species]]
        type = "W"
        count = 100

        [simulation]
        steps = 1000
        time-step = 0.04
        temperature = 1.0
        gamma = 4.5
        seed = 42
    "#;

    const CHAINS: &str = r#"
        types = ["H", "T"]

        [box]
        lengths = [8.0, 8.0, 16.0]
        periodic = [true, true, false]

        [interactions]
        rows = [[25.0, 40.0], [40.0, 25.0]]

        [[chains]]
        beads = ["H", "T", "T"]
        count = 10
        bond-length = 0.5
        bond-constant = 4.0
        bond-behavior = "stretched-only"

        [simulation]
        steps = 100
        time-step = 0.02
        temperature = 1.0
        gamma = 4.5
        seed = 7
        integrator = "pnhln"
        measure-radius-of-gyration = true
    "#;

    #[test]
    fn minimal_scenario_builds() {
        let scenario: Scenario = toml::from_str(MINIMAL).unwrap();
        let built = scenario.build().unwrap();

        assert_eq!(built.particles.len(), 100);
        assert!(built.topology.bonds.is_empty());
        assert_eq!(built.config.time_step_count, 1000);
        assert_eq!(built.config.cutoff, 1.0);
        assert_eq!(built.config.integrator, IntegratorKind::gwmvv());
        built
            .topology
            .validate_against(&built.particles)
            .unwrap();
    }

    #[test]
    fn chain_scenario_places_beads_and_bonds() {
        let scenario: Scenario = toml::from_str(CHAINS).unwrap();
        let built = scenario.build().unwrap();

        assert_eq!(built.particles.len(), 30);
        assert_eq!(built.topology.bonds.bonds().len(), 20);
        assert!(!built.topology.periodic.is_periodic(2));
        assert_eq!(built.config.integrator, IntegratorKind::pnhln());
        assert!(built.config.measure_radius_of_gyration);

        // Adjacent beads of a chain sit one bond length apart.
        let p = &built.particles;
        let dx = p.x[1] - p.x[0];
        let dy = p.y[1] - p.y[0];
        let dz = p.z[1] - p.z[0];
        let dist = (dx * dx + dy * dy + dz * dz).sqrt();
        assert!((dist - 0.5).abs() < 1e-9);

        built
            .topology
            .validate_against(&built.particles)
            .unwrap();
    }

    #[test]
    fn chain_beads_stay_in_box_on_non_periodic_axes() {
        const WALLED: &str = r#"
            types = ["P"]

            [box]
            lengths = [6.0, 6.0, 4.0]
            periodic = [true, true, false]

            [interactions]
            uniform = 25.0

            [[chains]]
            beads = ["P", "P", "P", "P", "P"]
            count = 50
            bond-length = 0.6
            bond-constant = 4.0

            [simulation]
            steps = 10
            time-step = 0.02
            temperature = 1.0
            gamma = 4.5
            seed = 3
        "#;
        let scenario: Scenario = toml::from_str(WALLED).unwrap();
        let built = scenario.build().unwrap();

        assert_eq!(built.particles.len(), 250);
        for &z in &built.particles.z {
            assert!((0.0..=4.0).contains(&z), "bead at z = {z}");
        }
    }

    #[test]
    fn chain_longer_than_a_walled_axis_is_rejected() {
        const TOO_LONG: &str = r#"
            types = ["P"]

            [box]
            lengths = [6.0, 6.0, 2.0]
            periodic = [true, true, false]

            [interactions]
            uniform = 25.0

            [[chains]]
            beads = ["P", "P", "P", "P", "P"]
            count = 1
            bond-length = 0.6
            bond-constant = 4.0

            [simulation]
            steps = 10
            time-step = 0.02
            temperature = 1.0
            gamma = 4.5
            seed = 3
        "#;
        let scenario: Scenario = toml::from_str(TOO_LONG).unwrap();
        assert!(matches!(
            scenario.build(),
            Err(CliError::ScenarioContent(_))
        ));
    }

    #[test]
    fn same_seed_places_identically() {
        let a: Scenario = toml::from_str(MINIMAL).unwrap();
        let b: Scenario = toml::from_str(MINIMAL).unwrap();
        assert_eq!(a.build().unwrap().particles.x, b.build().unwrap().particles.x);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut scenario: Scenario = toml::from_str(MINIMAL).unwrap();
        scenario.species[0].r#type = "X".to_string();
        assert!(matches!(
            scenario.build(),
            Err(CliError::ScenarioContent(_))
        ));
    }

    #[test]
    fn box_needs_one_size_spec() {
        let mut scenario: Scenario = toml::from_str(MINIMAL).unwrap();
        scenario.box_spec.lengths = Some([4.0, 4.0, 4.0]);
        assert!(matches!(
            scenario.build(),
            Err(CliError::ScenarioContent(_))
        ));
    }
}
