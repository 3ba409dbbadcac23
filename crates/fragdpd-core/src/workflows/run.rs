use crate::Real;
use crate::core::models::particles::ParticleSet;
use crate::core::models::topology::Topology;
use crate::engine::config::SimulationConfig;
use crate::engine::error::EngineError;
use crate::engine::monitor::{Progress, ProgressReporter, SimulationPhase, StopSignal};
use crate::engine::output::{OutputSink, RunInfo, StepSnapshot};
use crate::engine::simulation::{Simulation, StepMeasurements};
use tracing::{info, instrument};

/// What a finished (or cleanly stopped) run reports back.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    /// Steps completed over the whole trajectory, including any restarted
    /// prefix.
    pub completed_steps: u64,
    pub stopped_early: bool,
    pub final_measurements: StepMeasurements,
}

fn snapshot<'a>(
    set: &'a ParticleSet,
    measurements: &'a StepMeasurements,
    step: u64,
    time: Real,
) -> StepSnapshot<'a> {
    StepSnapshot {
        step,
        time,
        temperature: measurements.temperature,
        potential: measurements.potential,
        kinetic_energy: measurements.kinetic_energy,
        total_energy: measurements.kinetic_energy + measurements.potential.total(),
        pressure: measurements.pressure,
        surface_tension: measurements.surface_tension,
        radius_of_gyration: measurements.radius_of_gyration.as_deref(),
        type_index: &set.type_index,
        x: &set.x,
        y: &set.y,
        z: &set.z,
        vx: &set.vx,
        vy: &set.vy,
        vz: &set.vz,
    }
}

/// Executes a complete simulation run.
///
/// Output-sink failures abort the run with [`EngineError::Output`];
/// cancellation through `stop` ends it cleanly with `stopped_early` set.
#[instrument(skip_all, name = "simulation_run")]
pub fn run(
    topology: &Topology,
    set: &mut ParticleSet,
    config: &SimulationConfig,
    sink: &mut dyn OutputSink,
    reporter: &ProgressReporter<'_>,
    stop: &StopSignal,
) -> Result<SimulationSummary, EngineError> {
    // === Phase 1: Pre-processing ===
    reporter.report(Progress::PhaseStart {
        phase: SimulationPhase::PreProcessing,
    });

    let mut simulation = Simulation::new(topology, set, config)?;

    let (first_step, last_step) = match &config.restart {
        Some(restart) => (
            restart.completed_steps + 1,
            restart.completed_steps + restart.additional_steps,
        ),
        None => (1, config.time_step_count),
    };
    info!(first_step, last_step, "Starting simulation run");

    sink.begin(&RunInfo {
        particle_count: set.len(),
        particle_type_names: topology.types.names().to_vec(),
        time_step_length: config.time_step_length,
        total_steps: last_step,
    })
    .map_err(|source| EngineError::Output { step: 0, source })?;

    reporter.report(Progress::PhaseFinish {
        phase: SimulationPhase::PreProcessing,
    });

    // === Phase 2: Minimization (fresh runs only) ===
    if let (Some(minimization), None) = (&config.minimization, &config.restart) {
        reporter.report(Progress::PhaseStart {
            phase: SimulationPhase::Minimization,
        });
        set.zero_velocities();
        reporter.report(Progress::TaskStart {
            total_steps: minimization.steps,
        });
        let mut potential = f64::INFINITY;
        for _ in 0..minimization.steps {
            if stop.is_stop_requested() {
                break;
            }
            potential = simulation.minimization_step(set, minimization)?;
            reporter.report(Progress::TaskIncrement);
        }
        reporter.report(Progress::TaskFinish);
        info!(potential, "Minimization finished");

        // Positions are wrapped and measure rebuilds its own assignments;
        // the single force-establishing prepare happens before the step
        // loop below.
        let measurements = simulation.measure(set)?;
        sink.write_minimized(&snapshot(set, &measurements, 0, 0.0))
            .map_err(|source| EngineError::Output { step: 0, source })?;
        reporter.report(Progress::PhaseFinish {
            phase: SimulationPhase::Minimization,
        });
    }

    // Fresh runs draw thermal velocities (minimization leaves them zeroed);
    // restarts keep them unless asked otherwise.
    let reinitialize = match &config.restart {
        Some(restart) => restart.reinitialize_velocities,
        None => true,
    };
    if reinitialize && config.temperature > 0.0 {
        simulation.initialize_velocities(set);
    }

    // === Phase 3: Time-step integration ===
    reporter.report(Progress::PhaseStart {
        phase: SimulationPhase::TimeStepIntegration,
    });
    simulation.prepare(set)?;

    let mut completed_steps = first_step.saturating_sub(1);
    let mut stopped_early = false;
    reporter.report(Progress::TaskStart {
        total_steps: last_step.saturating_sub(completed_steps),
    });
    for step in first_step..=last_step {
        if stop.is_stop_requested() {
            info!(step, "Stop requested; ending run early");
            stopped_early = true;
            break;
        }
        simulation.time_step(set, step)?;
        completed_steps = step;
        reporter.report(Progress::TaskIncrement);

        if step % config.output_frequency == 0 {
            let measurements = simulation.measure(set)?;
            let time = step as Real * config.time_step_length;
            sink.write_step(&snapshot(set, &measurements, step, time))
                .map_err(|source| EngineError::Output { step, source })?;
        }
    }
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish {
        phase: SimulationPhase::TimeStepIntegration,
    });

    // === Phase 4: Post-processing ===
    reporter.report(Progress::PhaseStart {
        phase: SimulationPhase::PostProcessing,
    });
    let final_measurements = simulation.measure(set)?;
    sink.finish().map_err(|source| EngineError::Output {
        step: completed_steps,
        source,
    })?;
    reporter.report(Progress::PhaseFinish {
        phase: SimulationPhase::PostProcessing,
    });
    info!(
        completed_steps,
        stopped_early,
        temperature = final_measurements.temperature,
        "Simulation run finished"
    );

    Ok(SimulationSummary {
        completed_steps,
        stopped_early,
        final_measurements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{BoxSize, PeriodicBoundaries};
    use crate::core::models::bonds::BondChunks;
    use crate::core::models::constraints::ConstraintTable;
    use crate::core::models::particles::{ParticleInit, ParticleSetBuilder};
    use crate::core::models::types::{InteractionMatrix, ParticleTypeTable};
    use crate::engine::config::SimulationConfigBuilder;
    use crate::engine::output::{NullSink, OutputError};
    use rand::Rng;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;
    use std::sync::Mutex;

    fn topology() -> Topology {
        Topology {
            box_size: BoxSize::cubic(4.0).unwrap(),
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
                u * 4.0
            };
            builder.push(ParticleInit {
                position: [coord(), coord(), coord()],
                ..ParticleInit::default()
            });
        }
        builder.build().unwrap()
    }

    fn config(steps: u64, output_frequency: u64) -> SimulationConfig {
        SimulationConfigBuilder::new()
            .time_step_count(steps)
            .time_step_length(0.04)
            .output_frequency(output_frequency)
            .temperature(1.0)
            .gamma(4.5)
            .random_seed(99)
            .threads(1)
            .build()
            .unwrap()
    }

    /// Records lifecycle calls and snapshot step numbers.
    #[derive(Default)]
    struct RecordingSink {
        begun: bool,
        finished: bool,
        steps: Vec<u64>,
        minimized_frames: usize,
    }

    impl OutputSink for RecordingSink {
        fn begin(&mut self, info: &RunInfo) -> Result<(), OutputError> {
            assert!(info.particle_count > 0);
            self.begun = true;
            Ok(())
        }

        fn write_step(&mut self, snapshot: &StepSnapshot<'_>) -> Result<(), OutputError> {
            self.steps.push(snapshot.step);
            Ok(())
        }

        fn write_minimized(&mut self, _snapshot: &StepSnapshot<'_>) -> Result<(), OutputError> {
            self.minimized_frames += 1;
            Ok(())
        }

        fn finish(&mut self) -> Result<(), OutputError> {
            self.finished = true;
            Ok(())
        }
    }

    struct FailingSink;

    impl OutputSink for FailingSink {
        fn begin(&mut self, _info: &RunInfo) -> Result<(), OutputError> {
            Ok(())
        }

        fn write_step(&mut self, _snapshot: &StepSnapshot<'_>) -> Result<(), OutputError> {
            Err(OutputError::Sink("disk full".to_string()))
        }

        fn finish(&mut self) -> Result<(), OutputError> {
            Ok(())
        }
    }

    #[test]
    fn completed_run_reports_every_output_step() {
        let topology = topology();
        let mut set = random_set(30, 1);
        let config = config(10, 5);
        let mut sink = RecordingSink::default();
        let summary = run(
            &topology,
            &mut set,
            &config,
            &mut sink,
            &ProgressReporter::new(),
            &StopSignal::new(),
        )
        .unwrap();

        assert_eq!(summary.completed_steps, 10);
        assert!(!summary.stopped_early);
        assert!(sink.begun);
        assert!(sink.finished);
        assert_eq!(sink.steps, vec![5, 10]);
        assert!(summary.final_measurements.kinetic_energy > 0.0);
    }

    #[test]
    fn stop_signal_ends_the_run_cleanly() {
        let topology = topology();
        let mut set = random_set(30, 2);
        let config = config(1000, 10);
        let stop = StopSignal::new();
        stop.request_stop();
        let mut sink = RecordingSink::default();
        let summary = run(
            &topology,
            &mut set,
            &config,
            &mut sink,
            &ProgressReporter::new(),
            &stop,
        )
        .unwrap();

        assert!(summary.stopped_early);
        assert_eq!(summary.completed_steps, 0);
        // The sink is still flushed on a cancelled run.
        assert!(sink.finished);
    }

    #[test]
    fn sink_failure_is_fatal_with_the_failing_step() {
        let topology = topology();
        let mut set = random_set(30, 3);
        let config = config(10, 5);
        let result = run(
            &topology,
            &mut set,
            &config,
            &mut FailingSink,
            &ProgressReporter::new(),
            &StopSignal::new(),
        );
        assert!(matches!(
            result,
            Err(EngineError::Output { step: 5, .. })
        ));
    }

    #[test]
    fn progress_reports_follow_the_run_phases() {
        let topology = topology();
        let mut set = random_set(30, 4);
        let config = config(4, 2);
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::PhaseStart { phase } = event {
                events.lock().unwrap().push(phase);
            }
        }));
        run(
            &topology,
            &mut set,
            &config,
            &mut NullSink,
            &reporter,
            &StopSignal::new(),
        )
        .unwrap();
        drop(reporter);

        assert_eq!(
            events.into_inner().unwrap(),
            vec![
                SimulationPhase::PreProcessing,
                SimulationPhase::TimeStepIntegration,
                SimulationPhase::PostProcessing,
            ]
        );
    }

    #[test]
    fn minimization_writes_one_relaxed_frame_before_integration() {
        use crate::engine::config::MinimizationConfig;

        let topology = topology();
        let mut set = random_set(30, 5);
        let config = SimulationConfigBuilder::new()
            .time_step_count(4)
            .time_step_length(0.04)
            .output_frequency(2)
            .temperature(1.0)
            .gamma(4.5)
            .random_seed(99)
            .threads(1)
            .minimization(MinimizationConfig {
                steps: 10,
                ..MinimizationConfig::default()
            })
            .build()
            .unwrap();
        let mut sink = RecordingSink::default();
        let summary = run(
            &topology,
            &mut set,
            &config,
            &mut sink,
            &ProgressReporter::new(),
            &StopSignal::new(),
        )
        .unwrap();

        assert_eq!(sink.minimized_frames, 1);
        assert_eq!(sink.steps, vec![2, 4]);
        assert_eq!(summary.completed_steps, 4);
        // Thermal velocities are drawn after minimization zeroes them.
        assert!(summary.final_measurements.kinetic_energy > 0.0);
    }

    #[test]
    fn restart_continues_the_step_numbering() {
        use crate::engine::config::RestartInfo;

        let topology = topology();
        let mut set = random_set(30, 5);
        let config = SimulationConfigBuilder::new()
            .time_step_count(10)
            .time_step_length(0.04)
            .output_frequency(5)
            .temperature(1.0)
            .gamma(4.5)
            .random_seed(99)
            .threads(1)
            .restart(RestartInfo {
                completed_steps: 20,
                additional_steps: 10,
                reinitialize_velocities: false,
            })
            .build()
            .unwrap();
        let mut sink = RecordingSink::default();
        let summary = run(
            &topology,
            &mut set,
            &config,
            &mut sink,
            &ProgressReporter::new(),
            &StopSignal::new(),
        )
        .unwrap();

        assert_eq!(summary.completed_steps, 30);
        assert_eq!(sink.steps, vec![25, 30]);
    }
}
