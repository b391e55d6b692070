//! # VSEPR Core Library
//!
//! An interactive molecular-geometry engine built on Valence Shell Electron Pair
//! Repulsion theory. Electron domains (bonded atoms and lone pairs) arranged around
//! a central atom are continuously fitted onto ideal templates and relaxed with a
//! damped, stable particle integrator.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture, keeping pure data and
//! mathematics apart from the stateful simulation and from the user-facing procedures.
//!
//! - **[`core`]: The Foundation.** Stateless building blocks: the signed 3×3 SVD and
//!   permutation enumeration (`math`), ideal templates and `AXₓEₑ` classification
//!   (`geometry`), and the molecule graph with its pair groups, bonds and events (`models`).
//!
//! - **[`engine`]: The Logic Core.** The shape matcher (`attractor`), per-atom
//!   neighborhoods (`local_shape`), the per-frame update (`dynamics`), molecule
//!   construction, configuration, errors and progress reporting.
//!
//! - **[`workflows`]: The Public API.** Complete procedures, such as relaxing a molecule
//!   until it settles, that tie `engine` and `core` together behind a single call.

pub mod core;
pub mod engine;
pub mod workflows;
