//! File-backed output sinks for the `run` command.
//!
//! Observables land in a CSV file, one row per output step; the optional
//! trajectory is plain multi-frame XYZ with the particle type name as the
//! element column.

use fragdpd::engine::output::{OutputError, OutputSink, RunInfo, StepSnapshot};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

pub struct FileOutput {
    observables: csv::Writer<File>,
    trajectory: Option<BufWriter<File>>,
    type_names: Vec<String>,
    header_written: bool,
}

impl FileOutput {
    pub fn create(
        observables_path: &Path,
        trajectory_path: Option<&Path>,
    ) -> Result<Self, OutputError> {
        let observables = csv::Writer::from_writer(File::create(observables_path)?);
        let trajectory = match trajectory_path {
            Some(path) => Some(BufWriter::new(File::create(path)?)),
            None => None,
        };
        Ok(Self {
            observables,
            trajectory,
            type_names: Vec::new(),
            header_written: false,
        })
    }

    fn write_header(&mut self, snapshot: &StepSnapshot<'_>) -> Result<(), OutputError> {
        let mut header = vec![
            "step".to_string(),
            "time".to_string(),
            "temperature".to_string(),
            "potential_dpd".to_string(),
            "potential_bond".to_string(),
            "potential_electrostatic".to_string(),
            "kinetic_energy".to_string(),
            "total_energy".to_string(),
            "pressure_x".to_string(),
            "pressure_y".to_string(),
            "pressure_z".to_string(),
            "surface_tension".to_string(),
        ];
        if let Some(rg) = snapshot.radius_of_gyration {
            for group in 0..rg.len() {
                header.push(format!("radius_of_gyration_{group}"));
            }
        }
        self.observables
            .write_record(&header)
            .map_err(|e| OutputError::Sink(e.to_string()))?;
        self.header_written = true;
        Ok(())
    }

    fn write_row(&mut self, snapshot: &StepSnapshot<'_>) -> Result<(), OutputError> {
        if !self.header_written {
            self.write_header(snapshot)?;
        }
        let mut row = vec![
            snapshot.step.to_string(),
            format!("{:.6}", snapshot.time),
            format!("{:.8}", snapshot.temperature),
            format!("{:.8}", snapshot.potential.dpd),
            format!("{:.8}", snapshot.potential.bond),
            format!("{:.8}", snapshot.potential.electrostatic),
            format!("{:.8}", snapshot.kinetic_energy),
            format!("{:.8}", snapshot.total_energy),
            format!("{:.8}", snapshot.pressure.x),
            format!("{:.8}", snapshot.pressure.y),
            format!("{:.8}", snapshot.pressure.z),
            format!("{:.8}", snapshot.surface_tension),
        ];
        if let Some(rg) = snapshot.radius_of_gyration {
            for value in rg {
                row.push(format!("{value:.8}"));
            }
        }
        self.observables
            .write_record(&row)
            .map_err(|e| OutputError::Sink(e.to_string()))
    }

    fn write_frame(&mut self, snapshot: &StepSnapshot<'_>) -> Result<(), OutputError> {
        let Some(trajectory) = &mut self.trajectory else {
            return Ok(());
        };
        writeln!(trajectory, "{}", snapshot.x.len())?;
        writeln!(trajectory, "step={} time={:.6}", snapshot.step, snapshot.time)?;
        for i in 0..snapshot.x.len() {
            let name = self
                .type_names
                .get(snapshot.type_index[i])
                .map_or("X", String::as_str);
            writeln!(
                trajectory,
                "{} {:.6} {:.6} {:.6}",
                name, snapshot.x[i], snapshot.y[i], snapshot.z[i]
            )?;
        }
        Ok(())
    }
}

impl OutputSink for FileOutput {
    fn begin(&mut self, info: &RunInfo) -> Result<(), OutputError> {
        self.type_names = info.particle_type_names.clone();
        info!(
            particles = info.particle_count,
            total_steps = info.total_steps,
            "Opened output files"
        );
        Ok(())
    }

    fn write_step(&mut self, snapshot: &StepSnapshot<'_>) -> Result<(), OutputError> {
        self.write_row(snapshot)?;
        self.write_frame(snapshot)
    }

    fn write_minimized(&mut self, snapshot: &StepSnapshot<'_>) -> Result<(), OutputError> {
        // The relaxed configuration opens the trajectory; it stays out of
        // the observables table, which only holds integration steps.
        self.write_frame(snapshot)
    }

    fn finish(&mut self) -> Result<(), OutputError> {
        self.observables
            .flush()
            .map_err(|e| OutputError::Sink(e.to_string()))?;
        if let Some(trajectory) = &mut self.trajectory {
            trajectory.flush()?;
        }
        Ok(())
    }
}
