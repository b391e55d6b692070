use super::error::EngineError;
use crate::core::models::ids::PairGroupId;
use crate::core::models::molecule::{Molecule, MoleculeError};
use itertools::Itertools;
use nalgebra::Vector3;
use tracing::trace;

impl Molecule {
    /// Advances the simulation by one frame of length `dt`.
    ///
    /// Every non-central group first integrates its own motion and relaxes
    /// toward its bond length. Then each atom with more than one neighbor
    /// attracts its neighborhood toward the ideal shape: VSEPR molecules add
    /// pseudo-Coulomb repulsion between radial groups around the central atom,
    /// while real molecules rely on angle attraction/repulsion alone.
    ///
    /// Frames longer than [`max_time_step`](crate::engine::config::SimulationConfig::max_time_step)
    /// are clamped. A molecule without a central atom is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NonFiniteState`] as soon as any group acquires a
    /// non-finite position or velocity; the frame is abandoned at that point.
    pub fn update(&mut self, dt: f64) -> Result<(), EngineError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(EngineError::InvalidTimeStep { dt });
        }
        let dt = dt.min(self.config().max_time_step);
        let Some(central) = self.central_atom() else {
            return Ok(());
        };

        self.relax_bond_distances(dt, central)?;
        self.ensure_finite("distance relaxation")?;

        if self.is_real() {
            self.apply_real_forces(dt, central)?;
        } else {
            self.apply_vsepr_forces(dt, central)?;
        }
        self.ensure_finite("shape forces")
    }

    fn relax_bond_distances(&mut self, dt: f64, central: PairGroupId) -> Result<(), EngineError> {
        for id in self.group_ids().to_vec() {
            if id == central {
                continue;
            }
            let bond = *self.parent_bond(id).ok_or(MoleculeError::MissingParentBond(id))?;
            let parent = bond.other(id).ok_or(MoleculeError::MissingParentBond(id))?;
            let parent_position = self
                .group(parent)
                .map(|group| group.position())
                .ok_or(MoleculeError::GroupNotFound(parent))?;

            let group = self.group_mut(id).ok_or(MoleculeError::GroupNotFound(id))?;
            let old_distance = (group.position() - parent_position).norm();
            group.step_forward(dt);
            group.attract_to_ideal_distance(dt, old_distance, &bond, parent_position);
        }
        Ok(())
    }

    fn apply_vsepr_forces(&mut self, dt: f64, central: PairGroupId) -> Result<(), EngineError> {
        let mut central_error = None;
        for atom in self.atoms().to_vec() {
            if self.neighbor_count(atom) <= 1 {
                continue;
            }
            let shape = self.local_shape(atom)?;
            if atom == central {
                let error = shape.apply_attraction(self, dt)?;
                let true_lengths_ratio = ((error + 1.0).ln() - 0.5).clamp(0.0, 1.0);
                trace!(error, true_lengths_ratio, "Central attraction applied");
                self.repulse_radial_groups(dt, true_lengths_ratio);
                central_error = Some(error);
            } else {
                shape.apply_angle_attraction_repulsion(self, dt)?;
            }
        }
        self.set_attraction_error(central_error);
        Ok(())
    }

    fn apply_real_forces(&mut self, dt: f64, central: PairGroupId) -> Result<(), EngineError> {
        let mut central_error = None;
        for atom in self.atoms().to_vec() {
            if self.neighbor_count(atom) <= 1 {
                continue;
            }
            let error = self
                .local_shape(atom)?
                .apply_angle_attraction_repulsion(self, dt)?;
            if atom == central {
                central_error = Some(error);
            }
        }
        self.set_attraction_error(central_error);
        Ok(())
    }

    /// Applies the pairwise pseudo-Coulomb impulse to every ordered pair of radial groups.
    fn repulse_radial_groups(&mut self, dt: f64, true_lengths_ratio: f64) {
        let impulses: Vec<(PairGroupId, Vector3<f64>)> = self
            .radial_groups()
            .iter()
            .copied()
            .permutations(2)
            .filter_map(|pair| {
                let (target, source) = (pair[0], pair[1]);
                let impulse = self
                    .group(target)?
                    .repulsion_impulse(self.group(source)?, dt, true_lengths_ratio);
                Some((target, impulse))
            })
            .collect();

        for (id, impulse) in impulses {
            if let Some(group) = self.group_mut(id) {
                group.add_velocity(impulse);
            }
        }
    }

    fn ensure_finite(&self, phase: &'static str) -> Result<(), EngineError> {
        match self.groups().find(|(_, group)| !group.is_finite()) {
            Some((group, _)) => Err(EngineError::NonFiniteState { group, phase }),
            None => Ok(()),
        }
    }
}
