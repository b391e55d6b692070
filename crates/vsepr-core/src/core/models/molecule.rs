use super::bond::{Bond, BondOrder};
use super::events::{EventDispatcher, MoleculeEvent, MoleculeObserver};
use super::ids::PairGroupId;
use super::pair_group::{BONDED_PAIR_DISTANCE, PairGroup};
use crate::core::geometry::{GeometryError, VseprConfiguration};
use crate::core::math::permutation::Permutation;
use crate::engine::config::SimulationConfig;
use itertools::Itertools;
use nalgebra::Vector3;
use slotmap::{SecondaryMap, SlotMap};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MoleculeError {
    #[error("The molecule has no central atom yet")]
    MissingCentralAtom,
    #[error("A central atom ({existing:?}) is already present")]
    CentralAtomAlreadySet { existing: PairGroupId },
    #[error("The central atom cannot be removed")]
    CannotRemoveCentralAtom,
    #[error("The central atom is pinned and cannot be moved")]
    CentralAtomPinned,
    #[error("Pair group {0:?} not found in molecule")]
    GroupNotFound(PairGroupId),
    #[error("Pair group {0:?} has no bond toward the central atom")]
    MissingParentBond(PairGroupId),
    #[error("The central atom already holds the maximum of {max} radial groups")]
    TooManyRadialGroups { max: usize },
    #[error("Bond order '{order}' cannot attach a {kind}")]
    InvalidBondOrder { order: BondOrder, kind: &'static str },
    #[error("Only the first atom added can be the central atom")]
    UnexpectedCentralGroup,
    #[error("Pair group {0:?} is not a radial atom that can carry lone pairs")]
    NotATerminalAtom(PairGroupId),
    #[error("Bond length must be finite and positive, got {0}")]
    InvalidBondLength(f64),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Measured ideal orientations for a molecule built from experimental data.
#[derive(Debug, Clone, Default)]
pub struct RealShapeData {
    pub name: String,
    ideal_orientations: SecondaryMap<PairGroupId, Vector3<f64>>,
}

impl RealShapeData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ideal_orientations: SecondaryMap::new(),
        }
    }

    pub fn ideal_orientation(&self, id: PairGroupId) -> Option<Vector3<f64>> {
        self.ideal_orientations.get(id).copied()
    }

    pub(crate) fn record(&mut self, id: PairGroupId, orientation: Vector3<f64>) {
        self.ideal_orientations.insert(id, orientation);
    }

    fn forget(&mut self, id: PairGroupId) {
        self.ideal_orientations.remove(id);
    }
}

/// How the central atom's ideal shape is obtained.
#[derive(Debug, Clone)]
pub enum MoleculeKind {
    /// Ideal shape from the VSEPR template for the central atom's `AXₓEₑ` count.
    Vsepr,
    /// Ideal shape from measured orientations recorded per radial group.
    Real(RealShapeData),
}

/// A central atom with radial pair groups and, optionally, lone pairs on those
/// radial atoms.
///
/// Groups live in a slot-map arena keyed by [`PairGroupId`]. Every list the
/// molecule exposes (atoms, lone pairs, radial groups) follows insertion order.
#[derive(Debug)]
pub struct Molecule {
    groups: SlotMap<PairGroupId, PairGroup>,
    group_order: Vec<PairGroupId>,
    bonds: Vec<Bond>,
    adjacency: SecondaryMap<PairGroupId, Vec<PairGroupId>>,
    parents: SecondaryMap<PairGroupId, PairGroupId>,
    central_atom: Option<PairGroupId>,
    atoms: Vec<PairGroupId>,
    lone_pairs: Vec<PairGroupId>,
    radial_groups: Vec<PairGroupId>,
    kind: MoleculeKind,
    config: SimulationConfig,
    last_permutations: SecondaryMap<PairGroupId, Permutation>,
    attraction_error: Option<f64>,
    events: EventDispatcher,
}

impl Molecule {
    /// Creates an empty molecule.
    ///
    /// # Arguments
    ///
    /// * `kind` - Whether the central shape comes from VSEPR templates or measured data.
    /// * `config` - Simulation settings, including the radial group limit.
    pub fn new(kind: MoleculeKind, config: SimulationConfig) -> Self {
        Self {
            groups: SlotMap::with_key(),
            group_order: Vec::new(),
            bonds: Vec::new(),
            adjacency: SecondaryMap::new(),
            parents: SecondaryMap::new(),
            central_atom: None,
            atoms: Vec::new(),
            lone_pairs: Vec::new(),
            radial_groups: Vec::new(),
            kind,
            config,
            last_permutations: SecondaryMap::new(),
            attraction_error: None,
            events: EventDispatcher::default(),
        }
    }

    /// An empty VSEPR molecule with default simulation settings.
    pub fn vsepr() -> Self {
        Self::new(MoleculeKind::Vsepr, SimulationConfig::default())
    }

    pub fn kind(&self) -> &MoleculeKind {
        &self.kind
    }

    pub fn is_real(&self) -> bool {
        matches!(self.kind, MoleculeKind::Real(_))
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub(crate) fn real_data_mut(&mut self) -> Option<&mut RealShapeData> {
        match &mut self.kind {
            MoleculeKind::Real(data) => Some(data),
            MoleculeKind::Vsepr => None,
        }
    }

    /// Registers an observer that is called synchronously for every structural change.
    pub fn subscribe(&mut self, observer: MoleculeObserver) {
        self.events.subscribe(observer);
    }

    // --- Construction ---

    /// Adds the central atom. It is pinned at its position for the lifetime of the molecule.
    ///
    /// # Errors
    ///
    /// Returns [`MoleculeError::CentralAtomAlreadySet`] on a second call and
    /// [`MoleculeError::InvalidBondOrder`] if `group` is a lone pair.
    pub fn add_central_atom(&mut self, mut group: PairGroup) -> Result<PairGroupId, MoleculeError> {
        if let Some(existing) = self.central_atom {
            return Err(MoleculeError::CentralAtomAlreadySet { existing });
        }
        if group.is_lone_pair() {
            return Err(MoleculeError::InvalidBondOrder {
                order: BondOrder::LonePair,
                kind: "central atom",
            });
        }
        group.mark_central();
        let id = self.insert_group(group);
        self.central_atom = Some(id);
        debug!(?id, "Central atom added");
        Ok(id)
    }

    /// Adds `group` and bonds it to `parent`.
    ///
    /// # Arguments
    ///
    /// * `group` - The new atom or lone pair.
    /// * `parent` - The central atom for radial groups, or a radial atom for terminal lone pairs.
    /// * `order` - Must be [`BondOrder::LonePair`] exactly when `group` is a lone pair.
    /// * `length` - Resting bond length; defaults to [`BondOrder::default_length`].
    ///
    /// # Return
    ///
    /// The id of the new group.
    pub fn add_group_and_bond(
        &mut self,
        group: PairGroup,
        parent: PairGroupId,
        order: BondOrder,
        length: Option<f64>,
    ) -> Result<PairGroupId, MoleculeError> {
        let central = self.central_atom.ok_or(MoleculeError::MissingCentralAtom)?;
        if !self.groups.contains_key(parent) {
            return Err(MoleculeError::GroupNotFound(parent));
        }
        if group.is_central_atom() {
            return Err(MoleculeError::UnexpectedCentralGroup);
        }
        if group.is_lone_pair() != order.is_lone_pair() {
            let kind = if group.is_lone_pair() { "lone pair" } else { "bonded atom" };
            return Err(MoleculeError::InvalidBondOrder { order, kind });
        }
        if parent == central && self.radial_groups.len() >= self.config.max_radial_groups {
            return Err(MoleculeError::TooManyRadialGroups {
                max: self.config.max_radial_groups,
            });
        }
        let length = length.unwrap_or_else(|| order.default_length());
        if !(length.is_finite() && length > 0.0) {
            return Err(MoleculeError::InvalidBondLength(length));
        }

        let id = self.insert_group(group);
        self.parents.insert(id, parent);
        if parent == central {
            self.radial_groups.push(id);
        }
        self.add_bond(Bond::new(parent, id, order, length));
        self.last_permutations.remove(parent);
        Ok(id)
    }

    fn insert_group(&mut self, group: PairGroup) -> PairGroupId {
        let is_lone_pair = group.is_lone_pair();
        let id = self.groups.insert(group);
        self.group_order.push(id);
        self.adjacency.insert(id, Vec::new());
        if is_lone_pair {
            self.lone_pairs.push(id);
        } else {
            self.atoms.push(id);
        }
        self.events.dispatch(MoleculeEvent::GroupAdded(id));
        id
    }

    fn add_bond(&mut self, bond: Bond) {
        if let Some(neighbors) = self.adjacency.get_mut(bond.a) {
            neighbors.push(bond.b);
        }
        if let Some(neighbors) = self.adjacency.get_mut(bond.b) {
            neighbors.push(bond.a);
        }
        self.bonds.push(bond);
        self.events.dispatch(MoleculeEvent::BondAdded(bond));
    }

    // --- Removal ---

    /// Removes a group together with every group hanging off it (terminal lone pairs).
    ///
    /// # Errors
    ///
    /// Removing the central atom is rejected with [`MoleculeError::CannotRemoveCentralAtom`].
    pub fn remove_group(&mut self, id: PairGroupId) -> Result<PairGroup, MoleculeError> {
        if Some(id) == self.central_atom {
            return Err(MoleculeError::CannotRemoveCentralAtom);
        }
        if !self.groups.contains_key(id) {
            return Err(MoleculeError::GroupNotFound(id));
        }

        let children: Vec<PairGroupId> = self
            .group_order
            .iter()
            .copied()
            .filter(|&child| self.parents.get(child) == Some(&id))
            .collect();
        for child in children {
            self.remove_group(child)?;
        }

        let (removed_bonds, kept_bonds): (Vec<Bond>, Vec<Bond>) =
            self.bonds.drain(..).partition(|bond| bond.contains(id));
        self.bonds = kept_bonds;
        for bond in removed_bonds {
            if let Some(other) = bond.other(id) {
                if let Some(neighbors) = self.adjacency.get_mut(other) {
                    neighbors.retain(|&n| n != id);
                }
            }
            self.events.dispatch(MoleculeEvent::BondRemoved(bond));
        }

        self.adjacency.remove(id);
        if let Some(parent) = self.parents.remove(id) {
            self.last_permutations.remove(parent);
        }
        self.last_permutations.remove(id);
        self.group_order.retain(|&g| g != id);
        self.atoms.retain(|&g| g != id);
        self.lone_pairs.retain(|&g| g != id);
        self.radial_groups.retain(|&g| g != id);
        if let MoleculeKind::Real(data) = &mut self.kind {
            data.forget(id);
        }

        let group = self.groups.remove(id).ok_or(MoleculeError::GroupNotFound(id))?;
        self.events.dispatch(MoleculeEvent::GroupRemoved(id));
        debug!(?id, lone_pair = group.is_lone_pair(), "Pair group removed");
        Ok(group)
    }

    /// Removes every group except the central atom.
    pub fn remove_all_groups(&mut self) {
        for id in self.radial_groups.clone() {
            if let Err(err) = self.remove_group(id) {
                trace!(?id, %err, "Skipping group during bulk removal");
            }
        }
        self.last_permutations.clear();
    }

    // --- Queries ---

    pub fn central_atom(&self) -> Option<PairGroupId> {
        self.central_atom
    }

    pub fn group(&self, id: PairGroupId) -> Option<&PairGroup> {
        self.groups.get(id)
    }

    pub(crate) fn group_mut(&mut self, id: PairGroupId) -> Option<&mut PairGroup> {
        self.groups.get_mut(id)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// All group ids, in insertion order.
    pub fn group_ids(&self) -> &[PairGroupId] {
        &self.group_order
    }

    /// Iterates `(id, group)` pairs in insertion order.
    pub fn groups(&self) -> impl Iterator<Item = (PairGroupId, &PairGroup)> + '_ {
        self.group_order
            .iter()
            .filter_map(|&id| self.groups.get(id).map(|group| (id, group)))
    }

    /// Every non-lone-pair group, the central atom included.
    pub fn atoms(&self) -> &[PairGroupId] {
        &self.atoms
    }

    pub fn lone_pairs(&self) -> &[PairGroupId] {
        &self.lone_pairs
    }

    /// Groups bonded directly to the central atom.
    pub fn radial_groups(&self) -> &[PairGroupId] {
        &self.radial_groups
    }

    pub fn radial_atoms(&self) -> Vec<PairGroupId> {
        self.radial_filtered(false)
    }

    pub fn radial_lone_pairs(&self) -> Vec<PairGroupId> {
        self.radial_filtered(true)
    }

    fn radial_filtered(&self, lone_pairs: bool) -> Vec<PairGroupId> {
        self.radial_groups
            .iter()
            .copied()
            .filter(|&id| self.groups.get(id).is_some_and(|g| g.is_lone_pair() == lone_pairs))
            .collect()
    }

    /// Lone pairs that belong to radial atoms rather than to the central atom.
    pub fn distant_lone_pairs(&self) -> Vec<PairGroupId> {
        self.lone_pairs
            .iter()
            .copied()
            .filter(|id| !self.radial_groups.contains(id))
            .collect()
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn bond_between(&self, a: PairGroupId, b: PairGroupId) -> Option<&Bond> {
        self.bonds.iter().find(|bond| bond.connects(a, b))
    }

    /// Directly bonded groups, in bonding order.
    pub fn neighbors(&self, id: PairGroupId) -> &[PairGroupId] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn neighbor_count(&self, id: PairGroupId) -> usize {
        self.neighbors(id).len()
    }

    /// The group this one was attached to, which is one step closer to the central atom.
    pub fn parent_of(&self, id: PairGroupId) -> Option<PairGroupId> {
        self.parents.get(id).copied()
    }

    /// The bond leading from `id` toward the central atom.
    pub fn parent_bond(&self, id: PairGroupId) -> Option<&Bond> {
        let parent = self.parent_of(id)?;
        self.bond_between(id, parent)
    }

    /// Whether the central atom has room for another radial group of any bond order.
    pub fn has_room_for_radial_group(&self) -> bool {
        self.radial_groups.len() < self.config.max_radial_groups
    }

    /// The longest resting bond length among radial atoms.
    ///
    /// VSEPR molecules always report [`BONDED_PAIR_DISTANCE`].
    pub fn maximum_bond_length(&self) -> f64 {
        match &self.kind {
            MoleculeKind::Vsepr => BONDED_PAIR_DISTANCE,
            MoleculeKind::Real(_) => self
                .bonds
                .iter()
                .filter(|bond| !bond.order.is_lone_pair())
                .map(|bond| bond.length)
                .fold(0.0, f64::max),
        }
    }

    /// The `AXₓEₑ` classification of the central atom.
    pub fn central_vsepr_configuration(&self) -> Result<VseprConfiguration, MoleculeError> {
        if self.central_atom.is_none() {
            return Err(MoleculeError::MissingCentralAtom);
        }
        let lone_pairs = self.radial_lone_pairs().len();
        let atoms = self.radial_groups.len() - lone_pairs;
        Ok(VseprConfiguration::new(atoms, lone_pairs)?)
    }

    /// Distinct ideal bond angles in degrees for the central atom's current classification.
    pub fn ideal_bond_angles(&self) -> Result<Vec<f64>, MoleculeError> {
        Ok(self.central_vsepr_configuration()?.ideal_bond_angles())
    }

    /// Angles in degrees between every pair of radial atoms, in insertion order.
    pub fn radial_angles(&self) -> Vec<f64> {
        self.radial_atoms()
            .iter()
            .filter_map(|&id| self.groups.get(id).map(PairGroup::orientation))
            .tuple_combinations()
            .map(|(a, b)| a.dot(&b).clamp(-1.0, 1.0).acos().to_degrees())
            .collect()
    }

    /// Largest speed of any group around its parent, ignoring motion along the bond.
    ///
    /// Radial velocity is discarded at the start of every frame, so it does not
    /// count as movement of the shape.
    pub fn max_speed(&self) -> f64 {
        self.group_order
            .iter()
            .filter_map(|&id| {
                let group = self.groups.get(id)?;
                let parent = self.parents.get(id).and_then(|&p| self.groups.get(p))?;
                let velocity = group.velocity();
                let tangential = match (group.position() - parent.position()).try_normalize(1e-12) {
                    Some(axis) => velocity - axis * velocity.dot(&axis),
                    None => velocity,
                };
                Some(tangential.norm())
            })
            .fold(0.0, f64::max)
    }

    // --- User interaction ---

    pub fn begin_drag(&mut self, id: PairGroupId) -> Result<(), MoleculeError> {
        self.set_user_controlled(id, true)
    }

    pub fn drag_group(
        &mut self,
        id: PairGroupId,
        position: Vector3<f64>,
    ) -> Result<(), MoleculeError> {
        if Some(id) == self.central_atom {
            return Err(MoleculeError::CentralAtomPinned);
        }
        let group = self.groups.get_mut(id).ok_or(MoleculeError::GroupNotFound(id))?;
        group.drag_to_position(position);
        Ok(())
    }

    pub fn end_drag(&mut self, id: PairGroupId) -> Result<(), MoleculeError> {
        self.set_user_controlled(id, false)
    }

    fn set_user_controlled(&mut self, id: PairGroupId, value: bool) -> Result<(), MoleculeError> {
        let group = self.groups.get_mut(id).ok_or(MoleculeError::GroupNotFound(id))?;
        group.set_user_controlled(value);
        Ok(())
    }

    // --- Engine bookkeeping ---

    /// The permutation chosen for `center` on the previous frame.
    pub fn last_permutation(&self, center: PairGroupId) -> Option<&Permutation> {
        self.last_permutations.get(center)
    }

    pub(crate) fn remember_permutation(&mut self, center: PairGroupId, permutation: Permutation) {
        self.last_permutations.insert(center, permutation);
    }

    /// Fit error of the central atom's shape on the most recent update.
    pub fn attraction_error(&self) -> Option<f64> {
        self.attraction_error
    }

    pub(crate) fn set_attraction_error(&mut self, error: Option<f64>) {
        self.attraction_error = error;
    }

    /// Copies updated working groups back into the arena.
    pub(crate) fn store_groups(&mut self, ids: &[PairGroupId], groups: Vec<PairGroup>) {
        for (&id, group) in ids.iter().zip(groups) {
            if let Some(slot) = self.groups.get_mut(id) {
                *slot = group;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::MoleculeGeometry;
    use crate::core::models::pair_group::LONE_PAIR_DISTANCE;
    use std::sync::{Arc, Mutex};

    fn molecule_with_center() -> (Molecule, PairGroupId) {
        let mut molecule = Molecule::vsepr();
        let center = molecule.add_central_atom(PairGroup::central_atom(None)).unwrap();
        (molecule, center)
    }

    fn add_atom(
        molecule: &mut Molecule,
        parent: PairGroupId,
        position: Vector3<f64>,
    ) -> PairGroupId {
        molecule
            .add_group_and_bond(PairGroup::atom(position, None), parent, BondOrder::Single, None)
            .unwrap()
    }

    fn add_lone_pair(
        molecule: &mut Molecule,
        parent: PairGroupId,
        position: Vector3<f64>,
    ) -> PairGroupId {
        molecule
            .add_group_and_bond(PairGroup::lone_pair(position), parent, BondOrder::LonePair, None)
            .unwrap()
    }

    #[test]
    fn groups_cannot_be_added_before_the_central_atom() {
        let mut molecule = Molecule::vsepr();
        let mut other = SlotMap::<PairGroupId, ()>::with_key();
        let stray = other.insert(());
        let result = molecule.add_group_and_bond(
            PairGroup::atom(Vector3::x(), None),
            stray,
            BondOrder::Single,
            None,
        );
        assert_eq!(result, Err(MoleculeError::MissingCentralAtom));
    }

    #[test]
    fn second_central_atom_is_rejected() {
        let (mut molecule, center) = molecule_with_center();
        assert_eq!(
            molecule.add_central_atom(PairGroup::central_atom(None)),
            Err(MoleculeError::CentralAtomAlreadySet { existing: center })
        );
    }

    #[test]
    fn derived_lists_track_insertion_order() {
        let (mut molecule, center) = molecule_with_center();
        let a = add_atom(&mut molecule, center, Vector3::x() * 10.0);
        let lp = add_lone_pair(&mut molecule, center, Vector3::y() * 7.0);
        let b = add_atom(&mut molecule, center, -Vector3::x() * 10.0);
        let terminal = add_lone_pair(&mut molecule, a, Vector3::new(15.0, 5.0, 0.0));

        assert_eq!(molecule.atoms(), &[center, a, b]);
        assert_eq!(molecule.lone_pairs(), &[lp, terminal]);
        assert_eq!(molecule.radial_groups(), &[a, lp, b]);
        assert_eq!(molecule.radial_atoms(), vec![a, b]);
        assert_eq!(molecule.radial_lone_pairs(), vec![lp]);
        assert_eq!(molecule.distant_lone_pairs(), vec![terminal]);
        assert_eq!(molecule.neighbors(center), &[a, lp, b]);
        assert_eq!(molecule.neighbor_count(a), 2);
        assert_eq!(molecule.parent_of(terminal), Some(a));
        assert_eq!(molecule.parent_bond(lp).unwrap().length, LONE_PAIR_DISTANCE);
        assert_eq!(molecule.bond_between(b, center).unwrap().length, BONDED_PAIR_DISTANCE);
    }

    #[test]
    fn neighbor_changes_discard_the_remembered_permutation() {
        let (mut molecule, center) = molecule_with_center();
        let a = add_atom(&mut molecule, center, Vector3::x() * 10.0);
        add_atom(&mut molecule, center, -Vector3::x() * 10.0);

        molecule.remember_permutation(center, Permutation::identity(2));
        let lp = add_lone_pair(&mut molecule, center, Vector3::y() * 7.0);
        assert_eq!(molecule.last_permutation(center), None);

        molecule.remember_permutation(center, Permutation::identity(3));
        molecule.remember_permutation(a, Permutation::identity(1));
        let terminal = add_lone_pair(&mut molecule, a, Vector3::new(15.0, 5.0, 0.0));
        assert_eq!(molecule.last_permutation(a), None);
        assert!(molecule.last_permutation(center).is_some());

        molecule.remember_permutation(a, Permutation::identity(2));
        molecule.remove_group(terminal).unwrap();
        assert_eq!(molecule.last_permutation(a), None);
        assert!(molecule.last_permutation(center).is_some());

        molecule.remove_group(lp).unwrap();
        assert_eq!(molecule.last_permutation(center), None);
    }

    #[test]
    fn bond_order_must_match_group_kind() {
        let (mut molecule, center) = molecule_with_center();
        let result = molecule.add_group_and_bond(
            PairGroup::lone_pair(Vector3::x()),
            center,
            BondOrder::Single,
            None,
        );
        assert!(matches!(result, Err(MoleculeError::InvalidBondOrder { .. })));
    }

    #[test]
    fn radial_group_limit_is_enforced() {
        let (mut molecule, center) = molecule_with_center();
        let mut last = None;
        for i in 0..6 {
            assert!(molecule.has_room_for_radial_group());
            let angle = i as f64;
            let direction = Vector3::new(angle.cos(), angle.sin(), 0.1);
            last = Some(add_atom(&mut molecule, center, direction * 10.0));
        }
        assert!(!molecule.has_room_for_radial_group());
        let result = molecule.add_group_and_bond(
            PairGroup::atom(Vector3::z(), None),
            center,
            BondOrder::Single,
            None,
        );
        assert_eq!(result, Err(MoleculeError::TooManyRadialGroups { max: 6 }));

        molecule.remove_group(last.unwrap()).unwrap();
        assert!(molecule.has_room_for_radial_group());
    }

    #[test]
    fn removing_an_atom_removes_its_terminal_lone_pairs() {
        let (mut molecule, center) = molecule_with_center();
        let a = add_atom(&mut molecule, center, Vector3::x() * 10.0);
        let terminal = add_lone_pair(&mut molecule, a, Vector3::new(17.0, 0.0, 0.0));

        molecule.remove_group(a).unwrap();

        assert!(molecule.group(terminal).is_none());
        assert_eq!(molecule.group_count(), 1);
        assert!(molecule.bonds().is_empty());
        assert!(molecule.neighbors(center).is_empty());
        assert!(molecule.lone_pairs().is_empty());
    }

    #[test]
    fn central_atom_cannot_be_removed() {
        let (mut molecule, center) = molecule_with_center();
        assert_eq!(
            molecule.remove_group(center),
            Err(MoleculeError::CannotRemoveCentralAtom)
        );
    }

    #[test]
    fn remove_all_groups_keeps_only_the_central_atom() {
        let (mut molecule, center) = molecule_with_center();
        let a = add_atom(&mut molecule, center, Vector3::x() * 10.0);
        add_lone_pair(&mut molecule, a, Vector3::new(17.0, 0.0, 0.0));
        add_lone_pair(&mut molecule, center, Vector3::y() * 7.0);

        molecule.remove_all_groups();

        assert_eq!(molecule.group_ids(), &[center]);
        assert!(molecule.radial_groups().is_empty());
        assert!(molecule.bonds().is_empty());
    }

    #[test]
    fn observers_see_structural_then_aggregate_events() {
        let (mut molecule, center) = molecule_with_center();
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        molecule.subscribe(Box::new(move |event| sink.lock().unwrap().push(event.clone())));

        let a = add_atom(&mut molecule, center, Vector3::x() * 10.0);
        let bond = *molecule.bond_between(center, a).unwrap();
        molecule.remove_group(a).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                MoleculeEvent::GroupAdded(a),
                MoleculeEvent::GroupsChanged,
                MoleculeEvent::BondAdded(bond),
                MoleculeEvent::BondsChanged,
                MoleculeEvent::BondRemoved(bond),
                MoleculeEvent::BondsChanged,
                MoleculeEvent::GroupRemoved(a),
                MoleculeEvent::GroupsChanged,
            ]
        );
    }

    #[test]
    fn central_configuration_counts_radial_domains() {
        let (mut molecule, center) = molecule_with_center();
        add_atom(&mut molecule, center, Vector3::x() * 10.0);
        add_atom(&mut molecule, center, Vector3::y() * 10.0);
        add_lone_pair(&mut molecule, center, Vector3::z() * 7.0);

        let configuration = molecule.central_vsepr_configuration().unwrap();
        assert_eq!((configuration.x, configuration.e), (2, 1));
        assert_eq!(configuration.molecule_geometry, MoleculeGeometry::Bent);

        let angles = molecule.radial_angles();
        assert_eq!(angles.len(), 1);
        assert!((angles[0] - 90.0).abs() < 1e-9);
    }

    #[test]
    fn dragging_pins_the_group_until_released() {
        let (mut molecule, center) = molecule_with_center();
        let a = add_atom(&mut molecule, center, Vector3::x() * 10.0);

        molecule.begin_drag(a).unwrap();
        molecule.drag_group(a, Vector3::y() * 10.0).unwrap();
        let group = molecule.group(a).unwrap();
        assert!(group.is_user_controlled());
        assert_eq!(group.position(), Vector3::y() * 10.0);

        molecule.end_drag(a).unwrap();
        assert!(!molecule.group(a).unwrap().is_user_controlled());
        assert!(molecule.drag_group(center, Vector3::x()).is_err());
    }

    #[test]
    fn maximum_bond_length_depends_on_kind() {
        let (molecule, _) = molecule_with_center();
        assert_eq!(molecule.maximum_bond_length(), BONDED_PAIR_DISTANCE);

        let mut real = Molecule::new(
            MoleculeKind::Real(RealShapeData::new("test")),
            SimulationConfig::default(),
        );
        let center = real.add_central_atom(PairGroup::central_atom(None)).unwrap();
        let single = PairGroup::atom(Vector3::x() * 6.0, None);
        real.add_group_and_bond(single, center, BondOrder::Single, Some(6.0))
            .unwrap();
        let double = PairGroup::atom(Vector3::y() * 8.5, None);
        real.add_group_and_bond(double, center, BondOrder::Double, Some(8.5))
            .unwrap();
        assert_eq!(real.maximum_bond_length(), 8.5);
    }

    #[test]
    fn max_speed_ignores_motion_along_the_bond() {
        let (mut molecule, center) = molecule_with_center();
        let a = add_atom(&mut molecule, center, Vector3::x() * 10.0);
        molecule.group_mut(a).unwrap().add_velocity(Vector3::new(5.0, 0.0, 0.0));
        assert_eq!(molecule.max_speed(), 0.0);

        molecule.group_mut(a).unwrap().add_velocity(Vector3::new(0.0, 3.0, 4.0));
        assert!((molecule.max_speed() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn ideal_bond_angles_follow_the_classification() {
        let (mut molecule, center) = molecule_with_center();
        add_atom(&mut molecule, center, Vector3::x() * 10.0);
        add_atom(&mut molecule, center, Vector3::y() * 10.0);
        add_lone_pair(&mut molecule, center, Vector3::z() * 7.0);

        let angles = molecule.ideal_bond_angles().unwrap();
        assert_eq!(angles.len(), 1);
        assert!((angles[0] - 120.0).abs() < 1e-9);
        assert!(Molecule::vsepr().ideal_bond_angles().is_err());
    }
}
