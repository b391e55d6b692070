use super::attractor::{MatchingOptions, find_closest_matching_configuration};
use super::config::SimulationConfig;
use super::error::EngineError;
use crate::core::geometry::VseprConfiguration;
use crate::core::math::permutation::Permutation;
use crate::core::models::bond::BondOrder;
use crate::core::models::element::Element;
use crate::core::models::ids::PairGroupId;
use crate::core::models::molecule::{Molecule, MoleculeError, MoleculeKind, RealShapeData};
use crate::core::models::pair_group::{LONE_PAIR_DISTANCE, PairGroup};
use crate::core::models::real_shape::{RealMoleculeShape, RealShapeError};
use nalgebra::Vector3;
use tracing::{debug, info};

const DIRECTION_EPSILON: f64 = 1e-9;

/// Incremental construction of a molecule around a single central atom.
///
/// Every method records the first failure and turns the remaining calls into
/// no-ops; [`build`](Self::build) reports it.
pub struct MoleculeBuilder {
    molecule: Molecule,
    last_atom: Option<PairGroupId>,
    error: Option<EngineError>,
}

impl Default for MoleculeBuilder {
    fn default() -> Self {
        Self::vsepr(SimulationConfig::default())
    }
}

impl MoleculeBuilder {
    pub fn new(kind: MoleculeKind, config: SimulationConfig) -> Self {
        Self {
            molecule: Molecule::new(kind, config),
            last_atom: None,
            error: None,
        }
    }

    pub fn vsepr(config: SimulationConfig) -> Self {
        Self::new(MoleculeKind::Vsepr, config)
    }

    pub fn central_atom(&mut self, element: Option<Element>) -> &mut Self {
        self.attempt(|molecule| {
            molecule.add_central_atom(PairGroup::central_atom(element))?;
            Ok(None)
        })
    }

    /// Adds a radial atom along `direction` at the bond's resting length.
    pub fn atom(
        &mut self,
        direction: Vector3<f64>,
        element: Option<Element>,
        order: BondOrder,
        length: Option<f64>,
    ) -> &mut Self {
        self.attempt(|molecule| {
            let length = length.unwrap_or_else(|| order.default_length());
            let unit = unit_direction(direction)?;
            let id = attach(molecule, PairGroup::atom(unit * length, element), order, length)?;
            Ok(Some(id))
        })
    }

    /// Adds a lone pair on the central atom along `direction`.
    pub fn lone_pair(&mut self, direction: Vector3<f64>) -> &mut Self {
        self.attempt(|molecule| {
            let unit = unit_direction(direction)?;
            attach(
                molecule,
                PairGroup::lone_pair(unit * LONE_PAIR_DISTANCE),
                BondOrder::LonePair,
                LONE_PAIR_DISTANCE,
            )?;
            Ok(None)
        })
    }

    /// Gives the most recently added atom `quantity` lone pairs of its own.
    pub fn terminal_lone_pairs(&mut self, quantity: usize) -> &mut Self {
        let last_atom = self.last_atom;
        self.attempt(|molecule| {
            let atom = last_atom.ok_or_else(|| {
                EngineError::Internal("no atom to attach lone pairs to".to_string())
            })?;
            molecule.add_terminal_lone_pairs(atom, quantity)?;
            Ok(last_atom)
        })
    }

    /// Records the measured orientation of the most recently added radial group.
    fn measured(&mut self, orientation: Vector3<f64>) -> &mut Self {
        let last = self.molecule.radial_groups().last().copied();
        self.attempt(|molecule| {
            let id = last.ok_or_else(|| EngineError::Internal("no group to measure".to_string()))?;
            let data = molecule.real_data_mut().ok_or_else(|| {
                EngineError::Internal("measured orientations need a real molecule".to_string())
            })?;
            data.record(id, orientation);
            Ok(None)
        })
    }

    pub fn build(self) -> Result<Molecule, EngineError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.molecule),
        }
    }

    fn attempt(
        &mut self,
        step: impl FnOnce(&mut Molecule) -> Result<Option<PairGroupId>, EngineError>,
    ) -> &mut Self {
        if self.error.is_none() {
            match step(&mut self.molecule) {
                Ok(Some(atom)) => self.last_atom = Some(atom),
                Ok(None) => {}
                Err(error) => self.error = Some(error),
            }
        }
        self
    }
}

fn unit_direction(direction: Vector3<f64>) -> Result<Vector3<f64>, EngineError> {
    direction
        .try_normalize(DIRECTION_EPSILON)
        .filter(|unit| unit.iter().all(|v| v.is_finite()))
        .ok_or_else(|| {
            EngineError::Internal(format!("direction {direction:?} cannot be normalized"))
        })
}

fn attach(
    molecule: &mut Molecule,
    group: PairGroup,
    order: BondOrder,
    length: f64,
) -> Result<PairGroupId, EngineError> {
    let central = molecule.central_atom().ok_or(MoleculeError::MissingCentralAtom)?;
    Ok(molecule.add_group_and_bond(group, central, order, Some(length))?)
}

impl Molecule {
    /// Builds a real molecule whose central shape is the measured geometry of `shape`.
    pub fn from_real_shape(
        shape: &RealMoleculeShape,
        config: SimulationConfig,
    ) -> Result<Self, EngineError> {
        shape.validate().map_err(|e| match e {
            RealShapeError::Invalid { name, reason } => EngineError::InvalidShape { name, reason },
            other => EngineError::InvalidShape {
                name: shape.name.clone(),
                reason: other.to_string(),
            },
        })?;

        let kind = MoleculeKind::Real(RealShapeData::new(&shape.name));
        let mut builder = MoleculeBuilder::new(kind, config);
        builder.central_atom(Some(shape.central_element));
        for ligand in &shape.ligands {
            let invalid = || EngineError::InvalidShape {
                name: shape.name.clone(),
                reason: format!("ligand {ligand:?} is not usable"),
            };
            let direction = ligand.unit_direction().ok_or_else(invalid)?;
            let order = ligand.order().ok_or_else(invalid)?;

            if ligand.is_lone_pair() {
                builder.lone_pair(direction);
            } else {
                builder
                    .atom(direction, ligand.element, order, Some(ligand.model_length()))
                    .terminal_lone_pairs(ligand.terminal_lone_pairs);
            }
            builder.measured(direction);
        }

        let molecule = builder.build()?;
        info!(
            name = %shape.name,
            groups = molecule.group_count(),
            "Real molecule built"
        );
        Ok(molecule)
    }

    /// Places `quantity` lone pairs around a radial atom, opposite its bond to the center.
    ///
    /// The lone pairs take the free slots of the `AX₁E_q` template, rotated so
    /// that the template's bond slot points back along the bond.
    ///
    /// # Errors
    ///
    /// Fails for the central atom and for lone pairs, and when `quantity + 1`
    /// exceeds the largest template.
    pub fn add_terminal_lone_pairs(
        &mut self,
        atom: PairGroupId,
        quantity: usize,
    ) -> Result<Vec<PairGroupId>, EngineError> {
        let group = self.group(atom).ok_or(MoleculeError::GroupNotFound(atom))?;
        if group.is_central_atom() || group.is_lone_pair() {
            return Err(MoleculeError::NotATerminalAtom(atom).into());
        }
        if quantity == 0 {
            return Ok(Vec::new());
        }
        let atom_position = group.position();
        let parent = self.parent_of(atom).ok_or(MoleculeError::MissingParentBond(atom))?;
        let parent_position = self
            .group(parent)
            .map(PairGroup::position)
            .ok_or(MoleculeError::GroupNotFound(parent))?;
        let outward = (atom_position - parent_position)
            .try_normalize(DIRECTION_EPSILON)
            .unwrap_or_else(|| group.orientation());

        let template = VseprConfiguration::new(1, quantity)?.ideal_unit_vectors();
        let (lone_pair_slots, bond_slot) = template.split_at(quantity);
        let mapping = find_closest_matching_configuration(
            &[outward],
            &[-bond_slot[0]],
            &[Permutation::identity(1)],
            None,
            MatchingOptions {
                jacobi_iterations: self.config().jacobi_iterations,
                ..MatchingOptions::default()
            },
        )?;

        let mut added = Vec::with_capacity(quantity);
        for slot in lone_pair_slots {
            let position = atom_position + mapping.rotate_vector(slot) * LONE_PAIR_DISTANCE;
            let id = self.add_group_and_bond(
                PairGroup::lone_pair(position),
                atom,
                BondOrder::LonePair,
                Some(LONE_PAIR_DISTANCE),
            )?;
            added.push(id);
        }
        debug!(?atom, quantity, "Terminal lone pairs added");
        Ok(added)
    }
}
