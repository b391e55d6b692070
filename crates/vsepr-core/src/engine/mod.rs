//! # Engine Module
//!
//! The stateful simulation layer: everything that moves pair groups from one frame
//! to the next.
//!
//! ## Overview
//!
//! Each frame, every atom with more than one neighbor compares its neighborhood with
//! an ideal shape. The best rotation and slot assignment are found by a pruned
//! permutation search over Kabsch fits ([`attractor`]), and the groups are nudged
//! toward that target. VSEPR molecules add pseudo-Coulomb repulsion between the
//! central atom's radial groups; real molecules use angle-based attraction and
//! repulsion instead ([`dynamics`]).
//!
//! ## Architecture
//!
//! - **Shape Matching** ([`attractor`]) - Optimal rotations, permutation search and
//!   attractor forces
//! - **Neighborhoods** ([`local_shape`]) - Ideal orientations and allowed permutations per atom
//! - **Time Stepping** ([`dynamics`]) - `Molecule::update`, the per-frame integration
//! - **Construction** ([`builder`]) - Fluent molecule building, terminal lone pairs, real molecules
//! - **Configuration** ([`config`]) - Simulation and relaxation settings with validating builders
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - Frame-level errors wrapping the model and geometry errors

pub mod attractor;
pub mod builder;
pub mod config;
pub mod dynamics;
pub mod error;
pub mod local_shape;
pub mod progress;
