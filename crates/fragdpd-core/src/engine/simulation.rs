//! The stateful driver of one simulation: spatial structures, force
//! passes, integration steps, minimization, and measurement.
//!
//! [`Simulation`] owns everything that persists across steps (grid, cell
//! assignments, pair cache, worker pool, random source, integrator
//! scratch); the particle arrays stay outside and are threaded through
//! every call, which keeps ownership honest and the hot state compact.

use super::accumulator::AdderGroup;
use super::bonded::{self, BondedPass};
use super::cells::{CellAssignment, CellGrid};
use super::config::{IntegratorKind, MinimizationConfig, SimulationConfig};
use super::constraints;
use super::error::EngineError;
use super::integrators::{StepReport, gwmvv, pnhln, scmvv};
use super::kernels::{
    DissipativeKernel, DpdForceKernel, DpdPotentialKernel, ElectrostaticForceKernel,
    ElectrostaticPotentialKernel,
};
use super::observables::{self, PressureDiagonal};
use super::output::PotentialBreakdown;
use super::pairs::{self, CalculationMode, PairCache, PairPass, SharedForces, WorkerPool};
use super::random::RandomSource;
use crate::Real;
use crate::core::forces::dpd;
use crate::core::geometry::wrap_component;
use crate::core::models::particles::ParticleSet;
use crate::core::models::topology::Topology;
use tracing::{debug, instrument, warn};

/// Step-halving attempts before a minimization step gives up and keeps the
/// previous configuration.
const MAX_BACKTRACKS: usize = 12;

/// Quantities measured at an output step.
#[derive(Debug, Clone)]
pub struct StepMeasurements {
    pub potential: PotentialBreakdown,
    pub kinetic_energy: f64,
    pub temperature: f64,
    pub pressure: PressureDiagonal,
    pub surface_tension: f64,
    pub radius_of_gyration: Option<Vec<f64>>,
}

#[cfg(feature = "parallel")]
fn build_pool(threads: Option<usize>) -> Result<Option<WorkerPool>, EngineError> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = threads {
        builder = builder.num_threads(threads);
    }
    builder
        .build()
        .map(Some)
        .map_err(|source| EngineError::ThreadPool(source.to_string()))
}

#[cfg(not(feature = "parallel"))]
fn build_pool(_threads: Option<usize>) -> Result<Option<WorkerPool>, EngineError> {
    Ok(None)
}

/// One prepared simulation over a fixed topology and configuration.
pub struct Simulation<'a> {
    topology: &'a Topology,
    config: &'a SimulationConfig,
    grid: CellGrid,
    assignment: CellAssignment,
    /// Assignment over the charged compaction, present only when
    /// electrostatics is configured and charges exist.
    charged_assignment: Option<CellAssignment>,
    adders: AdderGroup,
    cache: PairCache,
    pool: Option<WorkerPool>,
    random: RandomSource,
    /// Evaluation-pass counter feeding the stream derivation; one tick per
    /// pair pass.
    pass_index: u64,
    sigma: Real,
    inv_sqrt_dt: Real,
    old_fx: Vec<Real>,
    old_fy: Vec<Real>,
    old_fz: Vec<Real>,
    /// PNHLN feedback variable.
    xi: Real,
    minimization_step_size: Real,
    molecule_type_count: usize,
}

impl<'a> Simulation<'a> {
    #[instrument(skip_all)]
    pub fn new(
        topology: &'a Topology,
        set: &ParticleSet,
        config: &'a SimulationConfig,
    ) -> Result<Self, EngineError> {
        topology.validate_against(set)?;
        if let Some(params) = &config.electrostatics {
            params.validate()?;
        }

        // One grid serves both interactions; the kernels gate on their own
        // cutoffs.
        let mut pair_cutoff = config.cutoff;
        if let Some(params) = &config.electrostatics {
            pair_cutoff = pair_cutoff.max(params.cutoff);
        }
        let grid = CellGrid::new(topology.box_size, topology.periodic, pair_cutoff)?;
        let assignment = CellAssignment::new(&grid);
        let charged_assignment = (config.electrostatics.is_some()
            && !set.charged_indices().is_empty())
        .then(|| CellAssignment::new(&grid));

        let molecule_type_count = set
            .molecule_type
            .iter()
            .copied()
            .max()
            .map_or(0, |highest| highest + 1);

        debug!(
            particles = set.len(),
            charged = set.charged_indices().len(),
            cells = grid.cell_count(),
            "Prepared simulation state"
        );

        Ok(Self {
            topology,
            config,
            grid,
            assignment,
            charged_assignment,
            adders: AdderGroup::new(),
            cache: PairCache::new(),
            pool: build_pool(config.threads)?,
            random: RandomSource::new(config.random_source, config.random_seed),
            pass_index: 0,
            sigma: dpd::sigma_from_gamma(config.gamma, config.temperature),
            inv_sqrt_dt: 1.0 / config.time_step_length.sqrt(),
            old_fx: vec![0.0; set.len()],
            old_fy: vec![0.0; set.len()],
            old_fz: vec![0.0; set.len()],
            xi: 0.0,
            minimization_step_size: config
                .minimization
                .as_ref()
                .map_or(0.0, |minimization| minimization.step_size),
            molecule_type_count,
        })
    }

    fn wrap_positions(&self, set: &mut ParticleSet) {
        let box_size = self.grid.box_size();
        let periodic = self.grid.periodic();
        for (axis, coords) in [&mut set.x, &mut set.y, &mut set.z].into_iter().enumerate() {
            if !periodic.is_periodic(axis) {
                continue;
            }
            let length = box_size.length(axis);
            for coord in coords.iter_mut() {
                *coord = wrap_component(*coord, length);
            }
        }
    }

    fn rebuild_assignments(&mut self, set: &ParticleSet) {
        self.assignment.rebuild(&self.grid, &set.x, &set.y, &set.z, None);
        if let Some(charged) = &mut self.charged_assignment {
            charged.rebuild(
                &self.grid,
                &set.x,
                &set.y,
                &set.z,
                Some(set.charged_indices()),
            );
        }
    }

    /// One DPD force pass over the whole box. `gamma` is passed explicitly
    /// so the thermostatted integrator can feed its effective friction.
    fn dpd_force_pass(
        &mut self,
        set: &mut ParticleSet,
        use_candidate_velocities: bool,
        include_dissipative: bool,
        include_random: bool,
        gamma: Real,
        fill_cache: bool,
    ) -> Result<(), EngineError> {
        let ParticleSet {
            x,
            y,
            z,
            vx,
            vy,
            vz,
            new_vx,
            new_vy,
            new_vz,
            fx,
            fy,
            fz,
            type_index,
            ..
        } = set;
        let forces = SharedForces::new(fx, fy, fz);
        let (kernel_vx, kernel_vy, kernel_vz) = if use_candidate_velocities {
            (new_vx, new_vy, new_vz)
        } else {
            (vx, vy, vz)
        };
        let kernel = DpdForceKernel {
            type_index: type_index.as_slice(),
            interactions: &self.topology.interactions,
            vx: kernel_vx.as_slice(),
            vy: kernel_vy.as_slice(),
            vz: kernel_vz.as_slice(),
            gamma,
            sigma: self.sigma,
            cutoff: self.config.cutoff,
            inv_sqrt_dt: self.inv_sqrt_dt,
            include_dissipative,
            include_random,
        };
        let pass = PairPass {
            grid: &self.grid,
            assignment: &self.assignment,
            x: x.as_slice(),
            y: y.as_slice(),
            z: z.as_slice(),
            adders: &self.adders,
            random: &self.random,
            pass_index: self.pass_index,
        };
        let mode = CalculationMode::CellBasedParallel {
            fill_cache: fill_cache.then_some(&mut self.cache),
        };
        pairs::calculate(&pass, &kernel, &forces, self.pool.as_ref(), mode)?;
        self.pass_index += 1;
        Ok(())
    }

    /// Replays the cached pair geometry with the dissipative kernel only,
    /// on top of the velocity-independent forces restored by the caller.
    fn dissipative_replay(&mut self, set: &mut ParticleSet, gamma: Real) -> Result<(), EngineError> {
        let ParticleSet {
            x,
            y,
            z,
            new_vx,
            new_vy,
            new_vz,
            fx,
            fy,
            fz,
            ..
        } = set;
        let forces = SharedForces::new(fx, fy, fz);
        let kernel = DissipativeKernel {
            vx: new_vx.as_slice(),
            vy: new_vy.as_slice(),
            vz: new_vz.as_slice(),
            gamma,
            cutoff: self.config.cutoff,
        };
        let pass = PairPass {
            grid: &self.grid,
            assignment: &self.assignment,
            x: x.as_slice(),
            y: y.as_slice(),
            z: z.as_slice(),
            adders: &self.adders,
            random: &self.random,
            pass_index: self.pass_index,
        };
        pairs::calculate(
            &pass,
            &kernel,
            &forces,
            self.pool.as_ref(),
            CalculationMode::CachedPairs { cache: &self.cache },
        )?;
        self.pass_index += 1;
        Ok(())
    }

    fn electrostatic_force_pass(&mut self, set: &mut ParticleSet) -> Result<(), EngineError> {
        let (Some(params), Some(charged)) = (
            self.config.electrostatics.as_ref(),
            self.charged_assignment.as_ref(),
        ) else {
            return Ok(());
        };
        let ParticleSet {
            x, y, z, fx, fy, fz, charge, ..
        } = set;
        let forces = SharedForces::new(fx, fy, fz);
        let kernel = ElectrostaticForceKernel {
            charge: charge.as_slice(),
            params,
        };
        let pass = PairPass {
            grid: &self.grid,
            assignment: charged,
            x: x.as_slice(),
            y: y.as_slice(),
            z: z.as_slice(),
            adders: &self.adders,
            random: &self.random,
            pass_index: self.pass_index,
        };
        pairs::calculate(
            &pass,
            &kernel,
            &forces,
            self.pool.as_ref(),
            CalculationMode::CellBasedParallel { fill_cache: None },
        )?;
        self.pass_index += 1;
        Ok(())
    }

    fn bond_force_pass(&mut self, set: &mut ParticleSet) -> Result<(), EngineError> {
        if self.topology.bonds.is_empty() {
            return Ok(());
        }
        let ParticleSet {
            x, y, z, fx, fy, fz, ..
        } = set;
        let forces = SharedForces::new(fx, fy, fz);
        let pass = BondedPass {
            bonds: &self.topology.bonds,
            box_size: self.grid.box_size(),
            periodic: self.grid.periodic(),
            x: x.as_slice(),
            y: y.as_slice(),
            z: z.as_slice(),
        };
        bonded::accumulate_forces(&pass, &forces, self.pool.as_ref())
    }

    /// Evaluates velocity-independent forces (conservative DPD + random +
    /// bonds + electrostatics + constraint accelerations) into the force
    /// arrays, recording pair geometry for later dissipative replay.
    fn velocity_independent_forces(&mut self, set: &mut ParticleSet) -> Result<(), EngineError> {
        set.zero_forces();
        self.dpd_force_pass(set, false, false, true, self.config.gamma, true)?;
        self.bond_force_pass(set)?;
        self.electrostatic_force_pass(set)?;
        constraints::apply_to_forces(&self.topology.constraints, set);
        set.save_velocity_independent_forces();
        Ok(())
    }

    /// Full force evaluation for the single-pass integrator: all DPD terms
    /// with the predictor velocities, bonds, electrostatics, constraints.
    fn full_forces(
        &mut self,
        set: &mut ParticleSet,
        use_candidate_velocities: bool,
    ) -> Result<(), EngineError> {
        set.zero_forces();
        self.dpd_force_pass(
            set,
            use_candidate_velocities,
            true,
            true,
            self.config.gamma,
            false,
        )?;
        self.bond_force_pass(set)?;
        self.electrostatic_force_pass(set)?;
        constraints::apply_to_forces(&self.topology.constraints, set);
        Ok(())
    }

    /// Establishes valid forces for the step loop's first iteration.
    pub fn prepare(&mut self, set: &mut ParticleSet) -> Result<(), EngineError> {
        self.wrap_positions(set);
        self.rebuild_assignments(set);
        self.full_forces(set, false)
    }

    /// Advances the system by one step. `step` is 1-based within the run.
    pub fn time_step(&mut self, set: &mut ParticleSet, step: u64) -> Result<StepReport, EngineError> {
        let dt = self.config.time_step_length;
        let report = match self.config.integrator {
            IntegratorKind::Gwmvv { lambda } => {
                self.old_fx.copy_from_slice(&set.fx);
                self.old_fy.copy_from_slice(&set.fy);
                self.old_fz.copy_from_slice(&set.fz);
                gwmvv::predict(set, dt, lambda);
                self.wrap_positions(set);
                self.rebuild_assignments(set);
                self.full_forces(set, true)?;
                gwmvv::correct(set, &self.old_fx, &self.old_fy, &self.old_fz, dt);
                StepReport::single_pass()
            }
            IntegratorKind::Scmvv {
                max_iterations,
                tolerance,
            } => self.self_consistent_step(set, step, max_iterations, tolerance, self.config.gamma)?,
            IntegratorKind::Pnhln {
                max_iterations,
                tolerance,
                coupling_time,
            } => {
                let gamma = pnhln::effective_gamma(self.config.gamma, self.xi);
                let report =
                    self.self_consistent_step(set, step, max_iterations, tolerance, gamma)?;
                self.xi = pnhln::advance_xi(
                    self.xi,
                    dt,
                    observables::kinetic_energy(set),
                    set.len(),
                    self.config.temperature,
                    coupling_time,
                );
                report
            }
        };

        constraints::apply_to_velocities(&self.topology.constraints, set);
        constraints::apply_reflection(&self.topology.constraints, set);
        if step <= self.config.velocity_scaling_steps {
            scale_velocities(set, self.config.temperature);
        }
        Ok(report)
    }

    fn self_consistent_step(
        &mut self,
        set: &mut ParticleSet,
        step: u64,
        max_iterations: usize,
        tolerance: Real,
        gamma: Real,
    ) -> Result<StepReport, EngineError> {
        scmvv::half_kick_and_drift(set, self.config.time_step_length);
        self.wrap_positions(set);
        self.rebuild_assignments(set);
        self.velocity_independent_forces(set)?;

        let mut iterations = 0;
        let mut converged = false;
        while iterations < max_iterations {
            set.restore_velocity_independent_forces();
            self.dissipative_replay(set, gamma)?;
            iterations += 1;
            let change = scmvv::correct_candidate(set, self.config.time_step_length);
            if change < tolerance {
                converged = true;
                break;
            }
        }
        if !converged {
            warn!(
                step,
                max_iterations, "Velocity correction did not converge; continuing"
            );
        }
        scmvv::adopt_candidate(set);
        Ok(StepReport {
            iterations,
            converged,
        })
    }

    /// One steepest-descent minimization step with potential backtracking.
    /// Returns the potential energy after the step; never above the
    /// potential before it.
    pub fn minimization_step(
        &mut self,
        set: &mut ParticleSet,
        minimization: &MinimizationConfig,
    ) -> Result<f64, EngineError> {
        self.wrap_positions(set);
        self.rebuild_assignments(set);
        let before = self.conservative_potential(set, minimization)?;

        set.zero_forces();
        self.dpd_force_pass(set, false, false, false, self.config.gamma, false)?;
        if !minimization.dpd_force_only {
            self.bond_force_pass(set)?;
            self.electrostatic_force_pass(set)?;
        }
        constraints::apply_to_forces(&self.topology.constraints, set);

        set.save_positions();
        let mut step_size = self.minimization_step_size;
        for _ in 0..MAX_BACKTRACKS {
            descend(set, step_size, minimization.max_displacement);
            self.wrap_positions(set);
            self.rebuild_assignments(set);
            let after = self.conservative_potential(set, minimization)?;
            if after <= before {
                self.minimization_step_size = step_size;
                return Ok(after);
            }
            set.restore_positions();
            step_size *= 0.5;
        }

        // No downhill move found; keep the configuration as it was.
        self.minimization_step_size = step_size;
        self.rebuild_assignments(set);
        Ok(before)
    }

    fn conservative_potential(
        &mut self,
        set: &mut ParticleSet,
        minimization: &MinimizationConfig,
    ) -> Result<f64, EngineError> {
        self.adders.reset();
        self.dpd_potential_pass(set)?;
        let mut total = self.adders.potential.sum();
        if !minimization.dpd_force_only {
            self.bond_potential_pass(set);
            self.electrostatic_potential_pass(set)?;
            total = self.adders.potential.sum();
        }
        Ok(total)
    }

    fn dpd_potential_pass(&mut self, set: &mut ParticleSet) -> Result<(), EngineError> {
        let ParticleSet {
            x,
            y,
            z,
            fx,
            fy,
            fz,
            type_index,
            ..
        } = set;
        let forces = SharedForces::new(fx, fy, fz);
        let kernel = DpdPotentialKernel {
            type_index: type_index.as_slice(),
            interactions: &self.topology.interactions,
            cutoff: self.config.cutoff,
        };
        let pass = PairPass {
            grid: &self.grid,
            assignment: &self.assignment,
            x: x.as_slice(),
            y: y.as_slice(),
            z: z.as_slice(),
            adders: &self.adders,
            random: &self.random,
            pass_index: self.pass_index,
        };
        pairs::calculate(
            &pass,
            &kernel,
            &forces,
            self.pool.as_ref(),
            CalculationMode::CellBasedParallel { fill_cache: None },
        )?;
        self.pass_index += 1;
        Ok(())
    }

    fn bond_potential_pass(&mut self, set: &ParticleSet) {
        if self.topology.bonds.is_empty() {
            return;
        }
        let pass = BondedPass {
            bonds: &self.topology.bonds,
            box_size: self.grid.box_size(),
            periodic: self.grid.periodic(),
            x: &set.x,
            y: &set.y,
            z: &set.z,
        };
        bonded::accumulate_potential(&pass, &self.adders, self.pool.as_ref());
    }

    fn electrostatic_potential_pass(&mut self, set: &mut ParticleSet) -> Result<(), EngineError> {
        let (Some(params), Some(charged)) = (
            self.config.electrostatics.as_ref(),
            self.charged_assignment.as_ref(),
        ) else {
            return Ok(());
        };
        let ParticleSet {
            x, y, z, fx, fy, fz, charge, ..
        } = set;
        let forces = SharedForces::new(fx, fy, fz);
        let kernel = ElectrostaticPotentialKernel {
            charge: charge.as_slice(),
            params,
        };
        let pass = PairPass {
            grid: &self.grid,
            assignment: charged,
            x: x.as_slice(),
            y: y.as_slice(),
            z: z.as_slice(),
            adders: &self.adders,
            random: &self.random,
            pass_index: self.pass_index,
        };
        pairs::calculate(
            &pass,
            &kernel,
            &forces,
            self.pool.as_ref(),
            CalculationMode::CellBasedParallel { fill_cache: None },
        )?;
        self.pass_index += 1;
        Ok(())
    }

    /// Measures energies, pressure, and optional radii of gyration for the
    /// current configuration.
    ///
    /// Rebuilds the cell assignments first: constraint reflection moves
    /// positions after the step's force-pass rebuild, so the assignments
    /// are not guaranteed current on entry.
    pub fn measure(&mut self, set: &mut ParticleSet) -> Result<StepMeasurements, EngineError> {
        self.rebuild_assignments(set);
        self.adders.reset();
        self.dpd_potential_pass(set)?;
        let dpd = self.adders.potential.sum();
        self.bond_potential_pass(set);
        let with_bonds = self.adders.potential.sum();
        self.electrostatic_potential_pass(set)?;
        let with_electrostatics = self.adders.potential.sum();

        let potential = PotentialBreakdown {
            dpd,
            bond: with_bonds - dpd,
            electrostatic: with_electrostatics - with_bonds,
        };
        let kinetic_energy = observables::kinetic_energy(set);
        let temperature = observables::temperature(kinetic_energy, set.len());
        let pressure = observables::pressure_diagonal(
            set,
            self.adders.virial(),
            self.grid.box_size(),
        );
        let surface_tension =
            observables::surface_tension(&pressure, self.grid.box_size().length(2));
        let radius_of_gyration = self.config.measure_radius_of_gyration.then(|| {
            observables::radius_of_gyration(
                set,
                self.grid.box_size(),
                self.grid.periodic(),
                self.molecule_type_count,
            )
        });

        Ok(StepMeasurements {
            potential,
            kinetic_energy,
            temperature,
            pressure,
            surface_tension,
            radius_of_gyration,
        })
    }

    /// Draws fresh Maxwell-Boltzmann velocities at the target temperature,
    /// removes the net momentum, and rescales to the target exactly.
    pub fn initialize_velocities(&self, set: &mut ParticleSet) {
        let mut stream = self.random.scalar_stream(0);
        for i in 0..set.len() {
            let scale = (self.config.temperature / set.dpd_mass[i]).sqrt();
            set.vx[i] = scale * stream.gaussian();
            set.vy[i] = scale * stream.gaussian();
            set.vz[i] = scale * stream.gaussian();
        }

        let total_mass: Real = set.dpd_mass.iter().sum();
        if total_mass > 0.0 {
            let mut momentum = [0.0 as Real; 3];
            for i in 0..set.len() {
                momentum[0] += set.dpd_mass[i] * set.vx[i];
                momentum[1] += set.dpd_mass[i] * set.vy[i];
                momentum[2] += set.dpd_mass[i] * set.vz[i];
            }
            for i in 0..set.len() {
                set.vx[i] -= momentum[0] / total_mass;
                set.vy[i] -= momentum[1] / total_mass;
                set.vz[i] -= momentum[2] / total_mass;
            }
        }

        scale_velocities(set, self.config.temperature);
    }
}

/// Rescales all velocities so the instantaneous temperature matches the
/// target. A cold start (zero kinetic energy) is left alone.
fn scale_velocities(set: &mut ParticleSet, target_temperature: Real) {
    let kinetic = observables::kinetic_energy(set);
    let current = observables::temperature(kinetic, set.len());
    if current <= 0.0 || target_temperature <= 0.0 {
        return;
    }
    let factor = ((target_temperature as f64 / current).sqrt()) as Real;
    for i in 0..set.len() {
        set.vx[i] *= factor;
        set.vy[i] *= factor;
        set.vz[i] *= factor;
    }
}

/// Moves every particle along its force, the displacement norm clamped.
fn descend(set: &mut ParticleSet, step_size: Real, max_displacement: Real) {
    for i in 0..set.len() {
        let mut dx = step_size * set.fx[i];
        let mut dy = step_size * set.fy[i];
        let mut dz = step_size * set.fz[i];
        let norm = (dx * dx + dy * dy + dz * dz).sqrt();
        if norm > max_displacement {
            let shrink = max_displacement / norm;
            dx *= shrink;
            dy *= shrink;
            dz *= shrink;
        }
        set.x[i] += dx;
        set.y[i] += dy;
        set.z[i] += dz;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{BoxSize, PeriodicBoundaries, minimum_image};
    use crate::core::models::bonds::BondChunks;
    use crate::core::models::constraints::ConstraintTable;
    use crate::core::models::particles::{ParticleInit, ParticleSetBuilder};
    use crate::core::models::types::{InteractionMatrix, ParticleTypeTable};
    use crate::engine::config::SimulationConfigBuilder;
    use rand::Rng;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    const EDGE: Real = 5.0;

    fn topology() -> Topology {
        Topology {
            box_size: BoxSize::cubic(EDGE).unwrap(),
            periodic: PeriodicBoundaries::all(),
            types: ParticleTypeTable::new(vec!["A".into()]).unwrap(),
            interactions: InteractionMatrix::uniform(1, 25.0).unwrap(),
            bonds: BondChunks::build(Vec::new(), 0).unwrap(),
            constraints: ConstraintTable::unconstrained(),
        }
    }

    fn random_set(n: usize, seed: u64) -> ParticleSet {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let mut builder = ParticleSetBuilder::with_capacity(n);
        for _ in 0..n {
            let mut coord = || {
                let u: Real = rng.sample(rand::distributions::Standard);
                u * EDGE
            };
            builder.push(ParticleInit {
                position: [coord(), coord(), coord()],
                ..ParticleInit::default()
            });
        }
        builder.build().unwrap()
    }

    fn config(threads: usize) -> SimulationConfig {
        SimulationConfigBuilder::new()
            .time_step_count(10)
            .time_step_length(0.04)
            .temperature(1.0)
            .gamma(4.5)
            .random_seed(2024)
            .threads(threads)
            .build()
            .unwrap()
    }

    #[test]
    fn total_force_vanishes_by_newtons_third_law() {
        let topology = topology();
        let mut set = random_set(50, 11);
        let config = config(1);
        let mut simulation = Simulation::new(&topology, &set, &config).unwrap();
        simulation.initialize_velocities(&mut set);
        simulation.prepare(&mut set).unwrap();

        let sum_x: Real = set.fx.iter().sum();
        let sum_y: Real = set.fy.iter().sum();
        let sum_z: Real = set.fz.iter().sum();
        assert!(sum_x.abs() < 1e-9, "net x force {sum_x}");
        assert!(sum_y.abs() < 1e-9, "net y force {sum_y}");
        assert!(sum_z.abs() < 1e-9, "net z force {sum_z}");
    }

    #[test]
    fn cell_list_potential_and_virial_match_the_quadratic_oracle() {
        let topology = topology();
        let mut set = random_set(50, 23);
        let config = config(1);
        let mut simulation = Simulation::new(&topology, &set, &config).unwrap();
        simulation.prepare(&mut set).unwrap();
        let measurements = simulation.measure(&mut set).unwrap();

        let mut potential = 0.0f64;
        let mut virial = [0.0f64; 3];
        for i in 0..set.len() {
            for j in (i + 1)..set.len() {
                let delta = minimum_image(
                    [
                        set.x[i] - set.x[j],
                        set.y[i] - set.y[j],
                        set.z[i] - set.z[j],
                    ],
                    &topology.box_size,
                    &topology.periodic,
                );
                let dist_sq =
                    delta[0] * delta[0] + delta[1] * delta[1] + delta[2] * delta[2];
                if dist_sq >= 1.0 {
                    continue;
                }
                let dist = dist_sq.sqrt();
                potential += dpd::pair_potential(25.0, dist, 1.0) as f64;
                let force = dpd::conservative_force(25.0, dpd::weight(dist, 1.0));
                for axis in 0..3 {
                    virial[axis] += (force / dist * delta[axis] * delta[axis]) as f64;
                }
            }
        }

        let relative = |a: f64, b: f64| (a - b).abs() / b.abs().max(1e-300);
        assert!(relative(measurements.potential.dpd, potential) < 1e-10);
        let volume = topology.box_size.volume() as f64;
        // Zero velocities leave only the virial term in the pressure.
        assert!(relative(measurements.pressure.x, virial[0] / volume) < 1e-10);
        assert!(relative(measurements.pressure.y, virial[1] / volume) < 1e-10);
        assert!(relative(measurements.pressure.z, virial[2] / volume) < 1e-10);
    }

    fn trajectory(threads: usize, integrator: IntegratorKind) -> (Vec<Real>, Vec<Real>) {
        let topology = topology();
        let mut set = random_set(50, 37);
        let config = SimulationConfigBuilder::new()
            .time_step_count(10)
            .time_step_length(0.04)
            .temperature(1.0)
            .gamma(4.5)
            .random_seed(2024)
            .threads(threads)
            .integrator(integrator)
            .build()
            .unwrap();
        let mut simulation = Simulation::new(&topology, &set, &config).unwrap();
        simulation.initialize_velocities(&mut set);
        simulation.prepare(&mut set).unwrap();
        for step in 1..=10 {
            simulation.time_step(&mut set, step).unwrap();
        }
        (set.x, set.vx)
    }

    #[test]
    fn same_seed_gives_bit_identical_trajectories() {
        for integrator in [
            IntegratorKind::gwmvv(),
            IntegratorKind::scmvv(),
            IntegratorKind::pnhln(),
        ] {
            let (x_a, vx_a) = trajectory(1, integrator);
            let (x_b, vx_b) = trajectory(1, integrator);
            assert_eq!(x_a, x_b);
            assert_eq!(vx_a, vx_b);
        }
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn thread_count_does_not_change_the_trajectory() {
        for integrator in [IntegratorKind::gwmvv(), IntegratorKind::scmvv()] {
            let (x_serial, vx_serial) = trajectory(1, integrator);
            let (x_parallel, vx_parallel) = trajectory(4, integrator);
            assert_eq!(x_serial, x_parallel);
            assert_eq!(vx_serial, vx_parallel);
        }
    }

    #[test]
    fn measure_after_large_position_change_matches_the_oracle() {
        // Reflection can move particles after the last assignment rebuild
        // of a step; measurement must not trust stale cell assignments.
        let topology = topology();
        let mut set = random_set(50, 29);
        let config = config(1);
        let mut simulation = Simulation::new(&topology, &set, &config).unwrap();
        simulation.prepare(&mut set).unwrap();

        // Teleport a particle across the box, past any adjacent cell.
        set.x[0] = (set.x[0] + 2.4) % EDGE;
        set.y[0] = (set.y[0] + 2.4) % EDGE;
        let measurements = simulation.measure(&mut set).unwrap();

        let mut potential = 0.0f64;
        for i in 0..set.len() {
            for j in (i + 1)..set.len() {
                let delta = minimum_image(
                    [
                        set.x[i] - set.x[j],
                        set.y[i] - set.y[j],
                        set.z[i] - set.z[j],
                    ],
                    &topology.box_size,
                    &topology.periodic,
                );
                let dist_sq =
                    delta[0] * delta[0] + delta[1] * delta[1] + delta[2] * delta[2];
                if dist_sq >= 1.0 {
                    continue;
                }
                potential += dpd::pair_potential(25.0, dist_sq.sqrt(), 1.0) as f64;
            }
        }
        let relative = (measurements.potential.dpd - potential).abs() / potential.abs();
        assert!(relative < 1e-10, "{} vs {potential}", measurements.potential.dpd);
    }

    #[test]
    fn electrostatic_forces_match_the_quadratic_oracle() {
        use crate::core::forces::electrostatics::{self, ElectrostaticsParams};

        let params = ElectrostaticsParams {
            coupling: 10.0,
            exponent: 2.0,
            damping: 0.1,
            max_force: 50.0,
            // Larger than the DPD cutoff so the shared grid is sized by
            // the electrostatic range.
            cutoff: 2.0,
        };
        let topology = topology();
        let mut set = {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(31);
            let mut builder = ParticleSetBuilder::with_capacity(40);
            for index in 0..40 {
                let mut coord = || {
                    let u: Real = rng.sample(rand::distributions::Standard);
                    u * EDGE
                };
                // Alternate +1 / -1 charges on even indices, neutral odd.
                let charge = match index % 4 {
                    0 => 1.0,
                    2 => -1.0,
                    _ => 0.0,
                };
                builder.push(ParticleInit {
                    position: [coord(), coord(), coord()],
                    charge,
                    ..ParticleInit::default()
                });
            }
            builder.build().unwrap()
        };
        let config = SimulationConfigBuilder::new()
            .time_step_count(1)
            .time_step_length(0.04)
            .temperature(1.0)
            .gamma(4.5)
            .random_seed(2024)
            .threads(1)
            .electrostatics(params)
            .build()
            .unwrap();
        let mut simulation = Simulation::new(&topology, &set, &config).unwrap();

        set.zero_forces();
        simulation.rebuild_assignments(&set);
        simulation.electrostatic_force_pass(&mut set).unwrap();

        let mut expected = vec![[0.0 as Real; 3]; set.len()];
        for i in 0..set.len() {
            for j in (i + 1)..set.len() {
                if set.charge[i] == 0.0 || set.charge[j] == 0.0 {
                    continue;
                }
                let delta = minimum_image(
                    [
                        set.x[i] - set.x[j],
                        set.y[i] - set.y[j],
                        set.z[i] - set.z[j],
                    ],
                    &topology.box_size,
                    &topology.periodic,
                );
                let dist_sq =
                    delta[0] * delta[0] + delta[1] * delta[1] + delta[2] * delta[2];
                if dist_sq >= params.cutoff * params.cutoff {
                    continue;
                }
                let dist = dist_sq.sqrt();
                let force =
                    electrostatics::force(dist, set.charge[i] * set.charge[j], &params) / dist;
                for axis in 0..3 {
                    expected[i][axis] += force * delta[axis];
                    expected[j][axis] -= force * delta[axis];
                }
            }
        }

        for i in 0..set.len() {
            if set.charge[i] == 0.0 {
                // Neutral particles never enter the charged compaction.
                assert_eq!(set.fx[i], 0.0);
                assert_eq!(set.fy[i], 0.0);
                assert_eq!(set.fz[i], 0.0);
                continue;
            }
            assert!((set.fx[i] - expected[i][0]).abs() < 1e-10, "fx at {i}");
            assert!((set.fy[i] - expected[i][1]).abs() < 1e-10, "fy at {i}");
            assert!((set.fz[i] - expected[i][2]).abs() < 1e-10, "fz at {i}");
        }
    }

    #[test]
    fn minimization_monotonically_decreases_the_potential() {
        let topology = topology();
        let mut set = random_set(80, 41);
        let minimization = MinimizationConfig::default();
        let config = SimulationConfigBuilder::new()
            .time_step_count(1)
            .time_step_length(0.04)
            .temperature(1.0)
            .gamma(4.5)
            .random_seed(7)
            .threads(1)
            .minimization(minimization)
            .build()
            .unwrap();
        let mut simulation = Simulation::new(&topology, &set, &config).unwrap();
        set.zero_velocities();

        let mut previous = f64::INFINITY;
        for _ in 0..50 {
            let potential = simulation
                .minimization_step(&mut set, &minimization)
                .unwrap();
            assert!(potential <= previous + 1e-9, "{potential} > {previous}");
            previous = potential;
        }
    }
}
