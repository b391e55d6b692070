use std::fmt;

use nalgebra::Vector3;
use serde::Serialize;

use super::GeometryError;

const FRAC_1_3: f64 = 1.0 / 3.0;
/// `2√2 / 3`
const TETRA_X: f64 = 0.942_809_041_582_063_4;
/// `√2 / 3`
const TETRA_HALF_X: f64 = 0.471_404_520_791_031_7;
/// `√(2/3)`
const TETRA_Y: f64 = 0.816_496_580_927_726;
/// `√3 / 2`
const SIN_120: f64 = 0.866_025_403_784_438_6;

const EMPTY: &[[f64; 3]] = &[];
const DIATOMIC: &[[f64; 3]] = &[[1.0, 0.0, 0.0]];
const LINEAR: &[[f64; 3]] = &[[1.0, 0.0, 0.0], [-1.0, 0.0, 0.0]];
const TRIGONAL_PLANAR: &[[f64; 3]] = &[
    [1.0, 0.0, 0.0],
    [-0.5, SIN_120, 0.0],
    [-0.5, -SIN_120, 0.0],
];
const TETRAHEDRAL: &[[f64; 3]] = &[
    [0.0, 0.0, 1.0],
    [TETRA_X, 0.0, -FRAC_1_3],
    [-TETRA_HALF_X, TETRA_Y, -FRAC_1_3],
    [-TETRA_HALF_X, -TETRA_Y, -FRAC_1_3],
];
// Equatorial slots come first so lone pairs land there.
const TRIGONAL_BIPYRAMIDAL: &[[f64; 3]] = &[
    [1.0, 0.0, 0.0],
    [-0.5, SIN_120, 0.0],
    [-0.5, -SIN_120, 0.0],
    [0.0, 0.0, 1.0],
    [0.0, 0.0, -1.0],
];
// The first two slots are opposite, so two lone pairs give a square plane.
const OCTAHEDRAL: &[[f64; 3]] = &[
    [0.0, 0.0, 1.0],
    [0.0, 0.0, -1.0],
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [-1.0, 0.0, 0.0],
    [0.0, -1.0, 0.0],
];

/// Arrangement of all electron domains around a center, ignoring which of them
/// are lone pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElectronGeometry {
    Empty,
    Diatomic,
    Linear,
    TrigonalPlanar,
    Tetrahedral,
    TrigonalBipyramidal,
    Octahedral,
}

impl ElectronGeometry {
    pub const ALL: [ElectronGeometry; 7] = [
        Self::Empty,
        Self::Diatomic,
        Self::Linear,
        Self::TrigonalPlanar,
        Self::Tetrahedral,
        Self::TrigonalBipyramidal,
        Self::Octahedral,
    ];

    pub fn from_pair_count(pair_count: usize) -> Result<Self, GeometryError> {
        Self::ALL
            .get(pair_count)
            .copied()
            .ok_or(GeometryError::UnsupportedPairCount(pair_count))
    }

    pub fn pair_count(self) -> usize {
        self.raw_slots().len()
    }

    /// Unit vectors of the ideal slots. Lone pairs are assigned the leading slots.
    pub fn unit_vectors(self) -> Vec<Vector3<f64>> {
        self.raw_slots()
            .iter()
            .map(|&[x, y, z]| Vector3::new(x, y, z).normalize())
            .collect()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::Diatomic => "Diatomic",
            Self::Linear => "Linear",
            Self::TrigonalPlanar => "Trigonal Planar",
            Self::Tetrahedral => "Tetrahedral",
            Self::TrigonalBipyramidal => "Trigonal Bipyramidal",
            Self::Octahedral => "Octahedral",
        }
    }

    fn raw_slots(self) -> &'static [[f64; 3]] {
        match self {
            Self::Empty => EMPTY,
            Self::Diatomic => DIATOMIC,
            Self::Linear => LINEAR,
            Self::TrigonalPlanar => TRIGONAL_PLANAR,
            Self::Tetrahedral => TETRAHEDRAL,
            Self::TrigonalBipyramidal => TRIGONAL_BIPYRAMIDAL,
            Self::Octahedral => OCTAHEDRAL,
        }
    }
}

impl fmt::Display for ElectronGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
