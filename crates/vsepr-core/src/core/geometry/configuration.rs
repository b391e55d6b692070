use std::fmt;

use itertools::Itertools;
use nalgebra::Vector3;
use serde::Serialize;

use super::GeometryError;
use super::templates::ElectronGeometry;

const DISTINCT_ANGLE_EPSILON: f64 = 1e-6;

/// Shape named after the positions of the bonded atoms only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoleculeGeometry {
    Empty,
    Linear,
    Bent,
    TrigonalPlanar,
    TrigonalPyramidal,
    TShaped,
    Tetrahedral,
    Seesaw,
    SquarePlanar,
    TrigonalBipyramidal,
    SquarePyramidal,
    Octahedral,
}

impl MoleculeGeometry {
    pub fn name(self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::Linear => "Linear",
            Self::Bent => "Bent",
            Self::TrigonalPlanar => "Trigonal Planar",
            Self::TrigonalPyramidal => "Trigonal Pyramidal",
            Self::TShaped => "T-shaped",
            Self::Tetrahedral => "Tetrahedral",
            Self::Seesaw => "Seesaw",
            Self::SquarePlanar => "Square Planar",
            Self::TrigonalBipyramidal => "Trigonal Bipyramidal",
            Self::SquarePyramidal => "Square Pyramidal",
            Self::Octahedral => "Octahedral",
        }
    }

    fn classify(bonded: usize, lone_pairs: usize) -> Self {
        match (bonded, lone_pairs) {
            (0, _) => Self::Empty,
            (1, _) => Self::Linear,
            (2, 1 | 2) => Self::Bent,
            (2, _) => Self::Linear,
            (3, 0) => Self::TrigonalPlanar,
            (3, 1) => Self::TrigonalPyramidal,
            (3, _) => Self::TShaped,
            (4, 0) => Self::Tetrahedral,
            (4, 1) => Self::Seesaw,
            (4, _) => Self::SquarePlanar,
            (5, 0) => Self::TrigonalBipyramidal,
            (5, _) => Self::SquarePyramidal,
            _ => Self::Octahedral,
        }
    }
}

impl fmt::Display for MoleculeGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An `AXₓEₑ` description of a center: `x` bonded neighbors and `e` lone pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct VseprConfiguration {
    pub x: usize,
    pub e: usize,
    pub electron_geometry: ElectronGeometry,
    pub molecule_geometry: MoleculeGeometry,
}

impl VseprConfiguration {
    pub fn new(x: usize, e: usize) -> Result<Self, GeometryError> {
        let electron_geometry = ElectronGeometry::from_pair_count(x + e)
            .map_err(|_| GeometryError::UnsupportedConfiguration { x, e })?;
        Ok(Self {
            x,
            e,
            electron_geometry,
            molecule_geometry: MoleculeGeometry::classify(x, e),
        })
    }

    /// Template orientations with the `e` lone-pair slots first.
    pub fn ideal_unit_vectors(&self) -> Vec<Vector3<f64>> {
        self.electron_geometry.unit_vectors()
    }

    /// Orientations of the slots that bonded atoms occupy.
    pub fn ideal_bonded_unit_vectors(&self) -> Vec<Vector3<f64>> {
        self.ideal_unit_vectors().split_off(self.e)
    }

    /// The distinct angles, in degrees and ascending, between any two bonded slots.
    pub fn ideal_bond_angles(&self) -> Vec<f64> {
        let bonded = self.ideal_bonded_unit_vectors();
        let mut angles: Vec<f64> = bonded
            .iter()
            .tuple_combinations()
            .map(|(a, b)| a.dot(b).clamp(-1.0, 1.0).acos().to_degrees())
            .collect();
        angles.sort_by(f64::total_cmp);
        angles.dedup_by(|a, b| (*a - *b).abs() < DISTINCT_ANGLE_EPSILON);
        angles
    }

    /// The `AXₓEₑ` notation, omitting the `E` term when there are no lone pairs.
    pub fn notation(&self) -> String {
        match (self.x, self.e) {
            (x, 0) => format!("AX{x}"),
            (x, e) => format!("AX{x}E{e}"),
        }
    }
}

impl fmt::Display for VseprConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} / {})",
            self.notation(),
            self.electron_geometry,
            self.molecule_geometry
        )
    }
}
