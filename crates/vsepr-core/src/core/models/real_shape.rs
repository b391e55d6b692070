use super::bond::BondOrder;
use super::element::Element;
use super::pair_group::LONE_PAIR_DISTANCE;
use crate::core::geometry::{GeometryError, VseprConfiguration};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::Path;
use thiserror::Error;

/// Conversion from measured bond lengths in Ångström to model units.
pub const ANGSTROM_TO_MODEL_UNITS: f64 = 7.0;

const MAX_LIGANDS: usize = 6;
const MAX_TERMINAL_LONE_PAIRS: usize = 5;

#[derive(Debug, Error)]
pub enum RealShapeError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error: {source}")]
    Toml {
        #[from]
        source: toml::de::Error,
    },
    #[error("Invalid molecule shape '{name}': {reason}")]
    Invalid { name: String, reason: String },
}

fn default_bond_order() -> u8 {
    1
}

/// One radial group of a measured molecule: a bonded atom or a lone pair on the center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RealLigand {
    /// `None` marks a lone pair on the central atom.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<Element>,
    pub direction: [f64; 3],
    #[serde(default = "default_bond_order")]
    pub bond_order: u8,
    /// Measured length in Ångström. Ignored for lone pairs.
    #[serde(default)]
    pub bond_length: f64,
    #[serde(default)]
    pub terminal_lone_pairs: usize,
}

impl RealLigand {
    pub fn atom(
        element: Element,
        direction: Vector3<f64>,
        bond_order: u8,
        bond_length: f64,
    ) -> Self {
        Self {
            element: Some(element),
            direction: direction.into(),
            bond_order,
            bond_length,
            terminal_lone_pairs: 0,
        }
    }

    pub fn lone_pair(direction: Vector3<f64>) -> Self {
        Self {
            element: None,
            direction: direction.into(),
            bond_order: 0,
            bond_length: 0.0,
            terminal_lone_pairs: 0,
        }
    }

    pub fn with_terminal_lone_pairs(mut self, quantity: usize) -> Self {
        self.terminal_lone_pairs = quantity;
        self
    }

    #[inline]
    pub fn is_lone_pair(&self) -> bool {
        self.element.is_none()
    }

    /// The measured direction normalized, or `None` if it has no usable length.
    pub fn unit_direction(&self) -> Option<Vector3<f64>> {
        Vector3::from(self.direction).try_normalize(1e-9)
    }

    pub fn order(&self) -> Option<BondOrder> {
        if self.is_lone_pair() {
            Some(BondOrder::LonePair)
        } else {
            BondOrder::try_from(self.bond_order)
                .ok()
                .filter(|order| !order.is_lone_pair())
        }
    }

    /// Resting distance from the central atom in model units.
    pub fn model_length(&self) -> f64 {
        if self.is_lone_pair() {
            LONE_PAIR_DISTANCE
        } else {
            self.bond_length * ANGSTROM_TO_MODEL_UNITS
        }
    }
}

/// Experimentally measured geometry around a central atom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RealMoleculeShape {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    pub central_element: Element,
    pub ligands: Vec<RealLigand>,
}

impl RealMoleculeShape {
    pub fn load(path: &Path) -> Result<Self, RealShapeError> {
        let content = std::fs::read_to_string(path).map_err(|e| RealShapeError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates a shape description.
    pub fn from_toml_str(content: &str) -> Result<Self, RealShapeError> {
        let shape: Self = toml::from_str(content)?;
        shape.validate()?;
        Ok(shape)
    }

    pub fn validate(&self) -> Result<(), RealShapeError> {
        let invalid = |reason: String| RealShapeError::Invalid {
            name: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("the name is empty".to_string()));
        }
        if self.ligands.len() > MAX_LIGANDS {
            return Err(invalid(format!(
                "{} radial groups exceed the maximum of {MAX_LIGANDS}",
                self.ligands.len()
            )));
        }
        for (index, ligand) in self.ligands.iter().enumerate() {
            if ligand.unit_direction().is_none() {
                return Err(invalid(format!("ligand {index} has a zero or non-finite direction")));
            }
            if ligand.is_lone_pair() {
                if ligand.terminal_lone_pairs > 0 {
                    return Err(invalid(format!("lone pair {index} cannot carry lone pairs")));
                }
                continue;
            }
            if ligand.order().is_none() {
                return Err(invalid(format!(
                    "ligand {index} has bond order {}, expected 1 to 3",
                    ligand.bond_order
                )));
            }
            if !(ligand.bond_length.is_finite() && ligand.bond_length > 0.0) {
                return Err(invalid(format!(
                    "ligand {index} has bond length {}",
                    ligand.bond_length
                )));
            }
            if ligand.terminal_lone_pairs > MAX_TERMINAL_LONE_PAIRS {
                return Err(invalid(format!(
                    "ligand {index} carries {} lone pairs, at most {MAX_TERMINAL_LONE_PAIRS} fit",
                    ligand.terminal_lone_pairs
                )));
            }
        }
        Ok(())
    }

    pub fn atom_count(&self) -> usize {
        self.ligands.iter().filter(|l| !l.is_lone_pair()).count()
    }

    pub fn lone_pair_count(&self) -> usize {
        self.ligands.iter().filter(|l| l.is_lone_pair()).count()
    }

    pub fn vsepr_configuration(&self) -> Result<VseprConfiguration, GeometryError> {
        VseprConfiguration::new(self.atom_count(), self.lone_pair_count())
    }

    fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        self.name.eq_ignore_ascii_case(query)
            || self
                .formula
                .as_deref()
                .is_some_and(|formula| formula.eq_ignore_ascii_case(query))
    }
}

fn shape(
    name: &str,
    formula: &str,
    central_element: Element,
    ligands: Vec<RealLigand>,
) -> RealMoleculeShape {
    RealMoleculeShape {
        name: name.to_string(),
        formula: Some(formula.to_string()),
        central_element,
        ligands,
    }
}

fn water() -> RealMoleculeShape {
    let half = (104.45_f64 / 2.0).to_radians();
    let lone_half = (109.47_f64 / 2.0).to_radians();
    shape(
        "water",
        "H2O",
        Element::O,
        vec![
            RealLigand::lone_pair(Vector3::new(0.0, lone_half.cos(), lone_half.sin())),
            RealLigand::lone_pair(Vector3::new(0.0, lone_half.cos(), -lone_half.sin())),
            RealLigand::atom(Element::H, Vector3::new(half.sin(), -half.cos(), 0.0), 1, 0.9584),
            RealLigand::atom(Element::H, Vector3::new(-half.sin(), -half.cos(), 0.0), 1, 0.9584),
        ],
    )
}

fn ammonia() -> RealMoleculeShape {
    // Three bonds at equal pairwise angle θ around -y: cos²β = (cos θ + 1/2) / (3/2).
    let bond_angle = 106.7_f64.to_radians();
    let beta = ((bond_angle.cos() + 0.5) / 1.5).sqrt().acos();
    let mut ligands = vec![RealLigand::lone_pair(Vector3::y())];
    for k in 0..3 {
        let phi = 2.0 * PI * k as f64 / 3.0;
        let direction = Vector3::new(beta.sin() * phi.cos(), -beta.cos(), beta.sin() * phi.sin());
        ligands.push(RealLigand::atom(Element::H, direction, 1, 1.012));
    }
    shape("ammonia", "NH3", Element::N, ligands)
}

fn methane() -> RealMoleculeShape {
    let ligands = [
        Vector3::new(1.0, 1.0, 1.0),
        Vector3::new(1.0, -1.0, -1.0),
        Vector3::new(-1.0, 1.0, -1.0),
        Vector3::new(-1.0, -1.0, 1.0),
    ]
    .into_iter()
    .map(|direction| RealLigand::atom(Element::H, direction, 1, 1.087))
    .collect();
    shape("methane", "CH4", Element::C, ligands)
}

fn carbon_dioxide() -> RealMoleculeShape {
    shape(
        "carbon-dioxide",
        "CO2",
        Element::C,
        vec![
            RealLigand::atom(Element::O, Vector3::x(), 2, 1.16).with_terminal_lone_pairs(2),
            RealLigand::atom(Element::O, -Vector3::x(), 2, 1.16).with_terminal_lone_pairs(2),
        ],
    )
}

fn sulfur_tetrafluoride() -> RealMoleculeShape {
    let axial_tilt = ((180.0 - 173.1_f64) / 2.0).to_radians();
    let equatorial_half = (101.6_f64 / 2.0).to_radians();
    let mut ligands = vec![RealLigand::lone_pair(Vector3::x())];
    for sign in [1.0, -1.0] {
        let direction = Vector3::new(-axial_tilt.sin(), 0.0, sign * axial_tilt.cos());
        ligands.push(RealLigand::atom(Element::F, direction, 1, 1.646));
    }
    for sign in [1.0, -1.0] {
        let direction = Vector3::new(-equatorial_half.cos(), sign * equatorial_half.sin(), 0.0);
        ligands.push(RealLigand::atom(Element::F, direction, 1, 1.545));
    }
    shape("sulfur-tetrafluoride", "SF4", Element::S, ligands)
}

fn xenon_tetrafluoride() -> RealMoleculeShape {
    let mut ligands = vec![
        RealLigand::lone_pair(Vector3::z()),
        RealLigand::lone_pair(-Vector3::z()),
    ];
    for direction in [Vector3::x(), Vector3::y(), -Vector3::x(), -Vector3::y()] {
        ligands.push(RealLigand::atom(Element::F, direction, 1, 1.94));
    }
    shape("xenon-tetrafluoride", "XeF4", Element::Xe, ligands)
}

/// Built-in measured molecules.
pub fn presets() -> Vec<RealMoleculeShape> {
    vec![
        water(),
        ammonia(),
        methane(),
        carbon_dioxide(),
        sulfur_tetrafluoride(),
        xenon_tetrafluoride(),
    ]
}

/// Looks up a preset by name (`"water"`) or formula (`"H2O"`), ignoring case.
pub fn preset(query: &str) -> Option<RealMoleculeShape> {
    presets().into_iter().find(|shape| shape.matches(query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::MoleculeGeometry;
    use itertools::Itertools;
    use std::io::Write;

    fn bond_angles(shape: &RealMoleculeShape) -> Vec<f64> {
        shape
            .ligands
            .iter()
            .filter(|l| !l.is_lone_pair())
            .filter_map(RealLigand::unit_direction)
            .tuple_combinations()
            .map(|(a, b)| a.angle(&b).to_degrees())
            .collect()
    }

    #[test]
    fn every_preset_is_valid_and_classifies() {
        let expected = [
            ("water", MoleculeGeometry::Bent),
            ("ammonia", MoleculeGeometry::TrigonalPyramidal),
            ("methane", MoleculeGeometry::Tetrahedral),
            ("carbon-dioxide", MoleculeGeometry::Linear),
            ("sulfur-tetrafluoride", MoleculeGeometry::Seesaw),
            ("xenon-tetrafluoride", MoleculeGeometry::SquarePlanar),
        ];
        let presets = presets();
        assert_eq!(presets.len(), expected.len());
        for (shape, (name, geometry)) in presets.iter().zip(expected) {
            shape.validate().unwrap();
            assert_eq!(shape.name, name);
            assert_eq!(shape.vsepr_configuration().unwrap().molecule_geometry, geometry);
        }
    }

    #[test]
    fn preset_bond_angles_match_measurements() {
        let water = preset("water").unwrap();
        assert!((bond_angles(&water)[0] - 104.45).abs() < 1e-9);

        for angle in bond_angles(&preset("NH3").unwrap()) {
            assert!((angle - 106.7).abs() < 1e-9, "angle was {angle}");
        }

        let sf4 = preset("sf4").unwrap();
        let angles = bond_angles(&sf4);
        assert!((angles[0] - 173.1).abs() < 1e-9);
        assert!((angles[5] - 101.6).abs() < 1e-9);
    }

    #[test]
    fn preset_lookup_accepts_names_and_formulas() {
        assert_eq!(preset("  Methane ").unwrap().formula.as_deref(), Some("CH4"));
        assert_eq!(preset("xef4").unwrap().central_element, Element::Xe);
        assert!(preset("benzene").is_none());
    }

    #[test]
    fn model_lengths_scale_atoms_and_fix_lone_pairs() {
        let water = water();
        assert_eq!(water.ligands[0].model_length(), LONE_PAIR_DISTANCE);
        assert!((water.ligands[2].model_length() - 0.9584 * ANGSTROM_TO_MODEL_UNITS).abs() < 1e-12);
        assert_eq!(water.ligands[2].order(), Some(BondOrder::Single));
        assert_eq!(water.ligands[0].order(), Some(BondOrder::LonePair));
    }

    #[test]
    fn toml_shapes_parse_with_defaults() {
        let content = r#"
name = "hydrogen fluoride"
central-element = "f"

[[ligands]]
element = "H"
direction = [1.0, 0.0, 0.0]
bond-length = 0.917

[[ligands]]
direction = [-1.0, 0.0, 0.0]
"#;
        let shape = RealMoleculeShape::from_toml_str(content).unwrap();
        assert_eq!(shape.central_element, Element::F);
        assert_eq!(shape.ligands[0].bond_order, 1);
        assert_eq!(shape.ligands[0].terminal_lone_pairs, 0);
        assert!(shape.ligands[1].is_lone_pair());
        assert_eq!(shape.formula, None);
    }

    #[test]
    fn unknown_fields_and_elements_are_rejected() {
        let unknown_field = r#"
name = "x"
central-element = "C"
color = "red"
ligands = []
"#;
        assert!(matches!(
            RealMoleculeShape::from_toml_str(unknown_field),
            Err(RealShapeError::Toml { .. })
        ));

        let unknown_element = r#"
name = "x"
central-element = "Zz"
ligands = []
"#;
        assert!(RealMoleculeShape::from_toml_str(unknown_element).is_err());
    }

    #[test]
    fn validation_reports_bad_ligands() {
        let mut shape = methane();
        shape.ligands[1].direction = [0.0, 0.0, 0.0];
        assert!(matches!(shape.validate(), Err(RealShapeError::Invalid { .. })));

        let mut shape = methane();
        shape.ligands[0].bond_order = 4;
        assert!(shape.validate().is_err());

        let mut shape = methane();
        shape.ligands[2].bond_length = -1.0;
        assert!(shape.validate().is_err());

        let mut shape = water();
        shape.ligands[0].terminal_lone_pairs = 1;
        assert!(shape.validate().is_err());

        let mut shape = methane();
        shape.ligands.extend(methane().ligands);
        assert!(shape.validate().is_err());
    }

    #[test]
    fn shapes_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let content = toml::to_string(&ammonia()).unwrap();
        file.write_all(content.as_bytes()).unwrap();

        let loaded = RealMoleculeShape::load(file.path()).unwrap();
        assert_eq!(loaded.name, "ammonia");
        assert_eq!(loaded.central_element, Element::N);
        assert_eq!(loaded.ligands.len(), 4);

        let missing = RealMoleculeShape::load(Path::new("/definitely/not/here.toml"));
        assert!(matches!(missing, Err(RealShapeError::Io { .. })));
    }
}
