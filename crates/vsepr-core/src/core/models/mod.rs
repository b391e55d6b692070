//! # Core Models Module
//!
//! Data structures describing a molecule as a central atom surrounded by electron
//! domains.
//!
//! ## Key Components
//!
//! - [`pair_group`] - An electron domain (bonded atom or lone pair) with position,
//!   velocity and the single-group physics primitives
//! - [`bond`] - Bond orders and the bonds connecting groups to their parents
//! - [`molecule`] - The star-shaped molecule graph, its derived lists and drag handling
//! - [`events`] - Structural change notifications for observers
//! - [`element`] - Chemical elements and symbol parsing
//! - [`real_shape`] - Measured geometries of real molecules, with built-in presets
//! - [`ids`] - Arena keys for pair groups
//!
//! ## Usage
//!
//! ```ignore
//! use vsepr::core::models::{bond::BondOrder, molecule::Molecule, pair_group::PairGroup};
//!
//! let mut molecule = Molecule::vsepr();
//! let center = molecule.add_central_atom(PairGroup::central_atom(None))?;
//! let atom = PairGroup::atom(Vector3::x() * 10.0, None);
//! molecule.add_group_and_bond(atom, center, BondOrder::Single, None)?;
//! let lone_pair = PairGroup::lone_pair(Vector3::y() * 7.0);
//! molecule.add_group_and_bond(lone_pair, center, BondOrder::LonePair, None)?;
//! ```

pub mod bond;
pub mod element;
pub mod events;
pub mod ids;
pub mod molecule;
pub mod pair_group;
pub mod real_shape;
