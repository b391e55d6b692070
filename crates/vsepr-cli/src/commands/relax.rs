use crate::cli::{MoleculeSource, RelaxArgs};
use crate::config::{AppConfig, PartialRelaxConfig};
use crate::error::{CliError, Result};
use crate::utils::parser::{AxeNotation, parse_axe};
use crate::utils::progress::CliProgressHandler;
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};
use vsepr::core::models::bond::BondOrder;
use vsepr::core::models::molecule::Molecule;
use vsepr::core::models::real_shape::{self, RealMoleculeShape};
use vsepr::engine::builder::MoleculeBuilder;
use vsepr::engine::config::SimulationConfig;
use vsepr::engine::progress::ProgressReporter;
use vsepr::workflows::relax::{self, RelaxationReport};

/// One row of the trajectory CSV: a group's position after a frame.
#[derive(Debug, Serialize)]
struct TrajectoryRow {
    frame: usize,
    group: usize,
    kind: &'static str,
    x: f64,
    y: f64,
    z: f64,
}

pub fn run(args: RelaxArgs, quiet: bool) -> Result<()> {
    let config = PartialRelaxConfig::for_args(&args)?.merge_with_cli(&args)?;
    debug!("Resolved configuration: {:?}", config);

    let mut molecule = build_molecule(&args.source, args.seed, &config)?;
    info!(
        "Molecule ready with {} group(s) and {} bond(s).",
        molecule.group_count(),
        molecule.bonds().len()
    );

    let progress_handler = if quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let report = match &args.trajectory {
        Some(path) => relax_with_trajectory(&mut molecule, &config, &reporter, path)?,
        None => relax::run(&mut molecule, &config.relaxation, &reporter)?,
    };

    print_report(&report);
    if let Some(path) = &args.report {
        write_report(&report, path)?;
        println!("Report written to: {}", path.display());
    }
    Ok(())
}

fn build_molecule(
    source: &MoleculeSource,
    seed: Option<u64>,
    config: &AppConfig,
) -> Result<Molecule> {
    if let Some(notation) = &source.axe {
        let axe = parse_axe(notation).map_err(|e| CliError::Argument(e.to_string()))?;
        let seed = seed.unwrap_or_else(rand::random);
        info!("Building {} with random directions (seed {}).", notation.trim(), seed);
        return build_axe_molecule(axe, seed, config.simulation.clone());
    }

    let shape = if let Some(name) = &source.preset {
        real_shape::preset(name).ok_or_else(|| {
            CliError::Argument(format!(
                "Unknown preset '{}'. Run 'vsepr presets' to list the available molecules.",
                name
            ))
        })?
    } else if let Some(path) = &source.shape {
        RealMoleculeShape::load(path)?
    } else {
        return Err(CliError::Argument(
            "One of --axe, --preset or --shape is required.".to_string(),
        ));
    };

    if seed.is_some() {
        warn!(
            "--seed only affects AXE molecules; '{}' starts from its measured shape.",
            shape.name
        );
    }
    info!("Building real molecule '{}'.", shape.name);
    Ok(Molecule::from_real_shape(&shape, config.simulation.clone())?)
}

fn build_axe_molecule(axe: AxeNotation, seed: u64, config: SimulationConfig) -> Result<Molecule> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut builder = MoleculeBuilder::vsepr(config);
    builder.central_atom(None);
    for _ in 0..axe.lone_pairs {
        builder.lone_pair(random_direction(&mut rng));
    }
    for _ in 0..axe.bonded_atoms {
        builder.atom(random_direction(&mut rng), None, BondOrder::Single, None);
    }
    Ok(builder.build()?)
}

/// A uniformly distributed unit vector, by rejection sampling in the unit ball.
fn random_direction(rng: &mut impl Rng) -> Vector3<f64> {
    loop {
        let candidate = Vector3::new(
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
        );
        let norm = candidate.norm();
        if norm > 1e-3 && norm <= 1.0 {
            return candidate / norm;
        }
    }
}

fn relax_with_trajectory(
    molecule: &mut Molecule,
    config: &AppConfig,
    reporter: &ProgressReporter,
    path: &Path,
) -> Result<RelaxationReport> {
    info!("Recording trajectory to {:?}", path);
    let mut writer = csv::Writer::from_writer(File::create(path)?);
    let mut write_error = None;

    write_frame(&mut writer, 0, molecule)?;
    let report = relax::run_with_hook(molecule, &config.relaxation, reporter, |frame, molecule| {
        if write_error.is_none() {
            if let Err(e) = write_frame(&mut writer, frame, molecule) {
                write_error = Some(e);
            }
        }
    })?;

    if let Some(e) = write_error {
        return Err(e.into());
    }
    writer.flush()?;
    Ok(report)
}

fn write_frame<W: std::io::Write>(
    writer: &mut csv::Writer<W>,
    frame: usize,
    molecule: &Molecule,
) -> csv::Result<()> {
    for (index, (_, group)) in molecule.groups().enumerate() {
        let kind = if group.is_central_atom() {
            "central"
        } else if group.is_lone_pair() {
            "lone-pair"
        } else {
            "atom"
        };
        let position = group.position();
        writer.serialize(TrajectoryRow {
            frame,
            group: index,
            kind,
            x: position.x,
            y: position.y,
            z: position.z,
        })?;
    }
    Ok(())
}

fn print_report(report: &RelaxationReport) {
    let status = if report.converged { "settled" } else { "did not settle" };
    println!("Configuration: {}", report.configuration);
    println!(
        "Relaxation {} after {} frame(s); final error {:.3e}.",
        status, report.frames, report.final_error
    );
    if report.radial_angles.is_empty() {
        return;
    }
    let angles: Vec<String> = report.radial_angles.iter().map(|a| format!("{a:.2}°")).collect();
    println!("Bond angles: {}", angles.join(", "));
    let ideal: Vec<String> = report.ideal_bond_angles.iter().map(|a| format!("{a:.2}°")).collect();
    if !ideal.is_empty() {
        println!("Ideal angles: {}", ideal.join(", "));
    }
}

fn write_report(report: &RelaxationReport, path: &Path) -> Result<()> {
    let content = toml::to_string(report).map_err(|e| CliError::Other(e.into()))?;
    std::fs::write(path, content)?;
    Ok(())
}
