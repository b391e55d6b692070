use crate::core::geometry::VseprConfiguration;
use crate::core::models::molecule::{Molecule, MoleculeError};
use crate::engine::config::RelaxationConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// Outcome of a relaxation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelaxationReport {
    pub frames: usize,
    pub converged: bool,
    /// Fit error of the central atom's neighborhood after the last frame.
    pub final_error: f64,
    /// Angles in degrees between radial atoms, in insertion order.
    pub radial_angles: Vec<f64>,
    pub ideal_bond_angles: Vec<f64>,
    pub configuration: VseprConfiguration,
}

/// Advances `molecule` until it settles or the frame budget runs out.
#[instrument(skip_all, name = "relaxation_workflow")]
pub fn run(
    molecule: &mut Molecule,
    config: &RelaxationConfig,
    reporter: &ProgressReporter,
) -> Result<RelaxationReport, EngineError> {
    run_with_hook(molecule, config, reporter, |_, _| {})
}

/// Like [`run`], calling `on_frame` with the 1-based frame number after every frame.
#[instrument(skip_all, name = "relaxation_workflow")]
pub fn run_with_hook(
    molecule: &mut Molecule,
    config: &RelaxationConfig,
    reporter: &ProgressReporter,
    mut on_frame: impl FnMut(usize, &Molecule),
) -> Result<RelaxationReport, EngineError> {
    // === Phase 1: Preparation ===
    reporter.report(Progress::PhaseStart { name: "Preparation" });
    if molecule.central_atom().is_none() {
        return Err(MoleculeError::MissingCentralAtom.into());
    }
    let initial = molecule.central_vsepr_configuration()?;
    info!(
        configuration = %initial,
        groups = molecule.group_count(),
        max_frames = config.max_frames,
        "Starting relaxation."
    );
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Frame loop ===
    reporter.report(Progress::PhaseStart { name: "Relaxation" });
    reporter.report(Progress::FramesStart {
        total_frames: config.max_frames as u64,
    });

    let mut frames = 0;
    let mut settled_frames = 0;
    let mut converged = false;
    while frames < config.max_frames {
        molecule.update(config.time_step)?;
        frames += 1;
        on_frame(frames, molecule);

        let error = molecule.attraction_error().unwrap_or(0.0);
        reporter.report(Progress::FrameAdvanced {
            frame: frames as u64,
            error,
        });

        if is_settled(molecule, error, config) {
            settled_frames += 1;
            if settled_frames >= config.patience_frames {
                converged = true;
                break;
            }
        } else {
            settled_frames = 0;
        }
    }

    reporter.report(Progress::FramesFinish { converged });
    reporter.report(Progress::PhaseFinish);

    if converged {
        debug!(frames, "Molecule settled before the frame budget ran out.");
    } else {
        warn!(
            frames,
            error = molecule.attraction_error(),
            "Frame budget exhausted before the molecule settled."
        );
    }

    // === Phase 3: Report ===
    let report = RelaxationReport {
        frames,
        converged,
        final_error: molecule.attraction_error().unwrap_or(0.0),
        radial_angles: molecule.radial_angles(),
        ideal_bond_angles: molecule.ideal_bond_angles()?,
        configuration: molecule.central_vsepr_configuration()?,
    };
    reporter.report(Progress::Message(format!(
        "{} after {} frames",
        report.configuration, report.frames
    )));
    info!(
        frames = report.frames,
        converged = report.converged,
        final_error = report.final_error,
        "Relaxation finished."
    );
    Ok(report)
}

fn is_settled(molecule: &Molecule, error: f64, config: &RelaxationConfig) -> bool {
    error < config.convergence_threshold && molecule.max_speed() < config.speed_threshold
}
