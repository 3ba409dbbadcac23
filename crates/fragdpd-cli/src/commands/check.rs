use crate::cli::CheckArgs;
use crate::error::Result;
use crate::scenario::Scenario;
use fragdpd::engine::simulation::Simulation;
use tracing::info;

pub fn run(args: CheckArgs) -> Result<()> {
    let scenario = Scenario::from_file(&args.scenario)?;
    let built = scenario.build()?;

    // Constructing the engine exercises the full validation chain: topology
    // cross-references, cutoff against the box, electrostatics parameters,
    // thread pool.
    Simulation::new(&built.topology, &built.particles, &built.config)?;

    info!("Scenario validated");
    println!("✓ Scenario is valid.");
    println!("  Particles:  {}", built.particles.len());
    println!("  Types:      {}", built.topology.types.len());
    println!("  Bonds:      {}", built.topology.bonds.bonds().len());
    println!("  Steps:      {}", built.config.time_step_count);
    println!(
        "  Box:        {:?} (volume {:.3})",
        built.topology.box_size.lengths(),
        built.topology.box_size.volume()
    );

    Ok(())
}
