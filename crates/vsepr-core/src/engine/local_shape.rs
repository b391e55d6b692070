use super::attractor::{
    ForceRequest, MatchingOptions, ResultMapping, apply_attractor_forces,
    find_closest_matching_configuration,
};
use super::error::EngineError;
use crate::core::geometry::VseprConfiguration;
use crate::core::math::permutation::{Permutation, restricted_permutations};
use crate::core::models::element::Element;
use crate::core::models::ids::PairGroupId;
use crate::core::models::molecule::{Molecule, MoleculeError, MoleculeKind};
use crate::core::models::pair_group::PairGroup;
use nalgebra::Vector3;
use tracing::trace;

/// The neighborhood of one atom together with the shape it should take.
///
/// `groups[i]` is matched against `ideal_orientations` through the allowed
/// permutations. Lone pairs always come first in `groups`.
#[derive(Debug, Clone)]
pub struct LocalShape {
    pub center: PairGroupId,
    pub groups: Vec<PairGroupId>,
    pub ideal_orientations: Vec<Vector3<f64>>,
    pub allowed_permutations: Vec<Permutation>,
}

impl LocalShape {
    /// Lone pairs may swap with lone pairs and atoms with atoms.
    pub fn vsepr_permutations(groups: &[&PairGroup]) -> Vec<Permutation> {
        let (lone_pairs, atoms) = partition_positions(groups, |group| group.is_lone_pair());
        restricted_permutations(groups.len(), &[lone_pairs, atoms])
    }

    /// Lone pairs may swap with lone pairs, and atoms only with atoms of the same element.
    pub fn real_permutations(groups: &[&PairGroup]) -> Vec<Permutation> {
        let (lone_pairs, _) = partition_positions(groups, |group| group.is_lone_pair());

        let mut element_classes: Vec<(Option<Element>, Vec<usize>)> = Vec::new();
        for (index, group) in groups.iter().enumerate().filter(|(_, g)| !g.is_lone_pair()) {
            match element_classes.iter_mut().find(|(element, _)| *element == group.element()) {
                Some((_, positions)) => positions.push(index),
                None => element_classes.push((group.element(), vec![index])),
            }
        }

        let mut interchangeable = vec![lone_pairs];
        interchangeable.extend(element_classes.into_iter().map(|(_, positions)| positions));
        restricted_permutations(groups.len(), &interchangeable)
    }

    /// Best fit of the current neighborhood, without moving anything.
    pub fn attraction_mapping(&self, molecule: &Molecule) -> Result<ResultMapping, EngineError> {
        let center = position_of(molecule, self.center)?;
        let current = self
            .groups
            .iter()
            .map(|&id| -> Result<Vector3<f64>, EngineError> {
                let group = molecule.group(id).ok_or(MoleculeError::GroupNotFound(id))?;
                Ok((group.position() - center)
                    .try_normalize(1e-12)
                    .unwrap_or_else(|| group.orientation()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        find_closest_matching_configuration(
            &current,
            &self.ideal_orientations,
            &self.allowed_permutations,
            self.usable_last_permutation(molecule),
            matching_options(molecule),
        )
    }

    /// Attracts the groups toward the ideal shape. Returns the fit error.
    pub fn apply_attraction(&self, molecule: &mut Molecule, dt: f64) -> Result<f64, EngineError> {
        self.apply(molecule, dt, false)
    }

    /// Attracts the groups and also pushes each pair toward its ideal angle.
    pub fn apply_angle_attraction_repulsion(
        &self,
        molecule: &mut Molecule,
        dt: f64,
    ) -> Result<f64, EngineError> {
        self.apply(molecule, dt, true)
    }

    fn apply(
        &self,
        molecule: &mut Molecule,
        dt: f64,
        angle_repulsion: bool,
    ) -> Result<f64, EngineError> {
        let center = position_of(molecule, self.center)?;
        let mut working = self
            .groups
            .iter()
            .map(|&id| {
                molecule
                    .group(id)
                    .cloned()
                    .ok_or(EngineError::from(MoleculeError::GroupNotFound(id)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let last = self.usable_last_permutation(molecule).cloned();
        let outcome = apply_attractor_forces(
            &mut working,
            &self.ideal_orientations,
            &self.allowed_permutations,
            &ForceRequest {
                dt,
                center,
                angle_repulsion,
                last_permutation: last.as_ref(),
                options: matching_options(molecule),
            },
        )?;

        if last.as_ref() != Some(&outcome.mapping.permutation) {
            trace!(
                center = ?self.center,
                permutation = %outcome.mapping.permutation,
                "New best-fit permutation"
            );
        }
        molecule.store_groups(&self.groups, working);
        molecule.remember_permutation(self.center, outcome.mapping.permutation);
        Ok(outcome.error)
    }

    /// The previous frame's permutation, if it is still allowed for these groups.
    fn usable_last_permutation<'m>(&self, molecule: &'m Molecule) -> Option<&'m Permutation> {
        molecule
            .last_permutation(self.center)
            .filter(|p| self.allowed_permutations.contains(p))
    }
}

fn partition_positions(
    groups: &[&PairGroup],
    predicate: impl Fn(&PairGroup) -> bool,
) -> (Vec<usize>, Vec<usize>) {
    (0..groups.len()).partition(|&i| predicate(groups[i]))
}

fn position_of(molecule: &Molecule, id: PairGroupId) -> Result<Vector3<f64>, EngineError> {
    molecule
        .group(id)
        .map(PairGroup::position)
        .ok_or_else(|| MoleculeError::GroupNotFound(id).into())
}

fn matching_options(molecule: &Molecule) -> MatchingOptions {
    MatchingOptions {
        jacobi_iterations: molecule.config().jacobi_iterations,
        prune: molecule.config().prune_permutations,
    }
}

impl Molecule {
    /// Neighbors of `atom` with lone pairs first, each kind in bonding order.
    pub fn ordered_neighbors(&self, atom: PairGroupId) -> Vec<PairGroupId> {
        let is_lone_pair = |id: &PairGroupId| self.group(*id).is_some_and(PairGroup::is_lone_pair);
        let (mut ordered, atoms): (Vec<_>, Vec<_>) =
            self.neighbors(atom).iter().copied().partition(is_lone_pair);
        ordered.extend(atoms);
        ordered
    }

    /// The shape `atom`'s neighborhood is attracted toward.
    ///
    /// The central atom of a real molecule uses its measured orientations when
    /// every neighbor has one; all other cases use the VSEPR template.
    pub fn local_shape(&self, atom: PairGroupId) -> Result<LocalShape, EngineError> {
        if let MoleculeKind::Real(data) = self.kind() {
            if Some(atom) == self.central_atom() {
                let groups = self.ordered_neighbors(atom);
                let measured: Option<Vec<_>> =
                    groups.iter().map(|&id| data.ideal_orientation(id)).collect();
                if let Some(ideal_orientations) = measured {
                    let members = self.groups_for(&groups)?;
                    return Ok(LocalShape {
                        center: atom,
                        allowed_permutations: LocalShape::real_permutations(&members),
                        groups,
                        ideal_orientations,
                    });
                }
                trace!(?atom, "Missing measured orientation, using VSEPR template");
            }
        }
        self.vsepr_local_shape(atom)
    }

    fn vsepr_local_shape(&self, atom: PairGroupId) -> Result<LocalShape, EngineError> {
        let groups = self.ordered_neighbors(atom);
        let members = self.groups_for(&groups)?;
        let lone_pairs = members.iter().filter(|g| g.is_lone_pair()).count();
        let configuration = VseprConfiguration::new(groups.len() - lone_pairs, lone_pairs)?;

        Ok(LocalShape {
            center: atom,
            allowed_permutations: LocalShape::vsepr_permutations(&members),
            ideal_orientations: configuration.ideal_unit_vectors(),
            groups,
        })
    }

    fn groups_for(&self, ids: &[PairGroupId]) -> Result<Vec<&PairGroup>, EngineError> {
        ids.iter()
            .map(|&id| {
                self.group(id)
                    .ok_or_else(|| MoleculeError::GroupNotFound(id).into())
            })
            .collect()
    }
}
