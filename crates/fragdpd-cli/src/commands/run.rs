use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use crate::output::FileOutput;
use crate::progress::CliProgressHandler;
use crate::scenario::Scenario;
use fragdpd::engine::config::{IntegratorKind, SimulationConfig};
use fragdpd::engine::monitor::{ProgressReporter, StopSignal};
use fragdpd::workflows;
use std::str::FromStr;
use tracing::info;

pub fn run(args: RunArgs) -> Result<()> {
    let scenario = Scenario::from_file(&args.scenario)?;
    let mut built = scenario.build()?;
    apply_overrides(&mut built.config, &args)?;

    info!(
        particles = built.particles.len(),
        steps = built.config.time_step_count,
        "Loaded scenario from {:?}",
        &args.scenario
    );

    let mut sink = FileOutput::create(&args.output, args.trajectory.as_deref())
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to open output files: {e}")))?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let stop = StopSignal::new();

    println!("Starting DPD simulation...");
    let summary = workflows::run(
        &built.topology,
        &mut built.particles,
        &built.config,
        &mut sink,
        &reporter,
        &stop,
    )?;

    println!(
        "✓ Completed {} step(s). Final temperature: {:.4}, total energy: {:.4}",
        summary.completed_steps,
        summary.final_measurements.temperature,
        summary.final_measurements.kinetic_energy + summary.final_measurements.potential.total(),
    );
    println!("  Observables written to: {}", args.output.display());
    if let Some(trajectory) = &args.trajectory {
        println!("  Trajectory written to:  {}", trajectory.display());
    }

    Ok(())
}

fn apply_overrides(config: &mut SimulationConfig, args: &RunArgs) -> Result<()> {
    if let Some(steps) = args.steps {
        if steps == 0 {
            return Err(CliError::Argument("--steps must be positive".to_string()));
        }
        config.time_step_count = steps;
    }
    if let Some(seed) = args.seed {
        config.random_seed = seed;
    }
    if let Some(name) = &args.integrator {
        config.integrator = IntegratorKind::from_str(name)
            .map_err(|e| CliError::Argument(e.to_string()))?;
    }
    if let Some(frequency) = args.output_frequency {
        if frequency == 0 {
            return Err(CliError::Argument(
                "--output-frequency must be positive".to_string(),
            ));
        }
        config.output_frequency = frequency;
    }
    if args.threads.is_some() {
        config.threads = args.threads;
    }
    Ok(())
}
