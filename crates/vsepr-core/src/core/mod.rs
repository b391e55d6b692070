//! # Core Module
//!
//! Stateless foundations of the VSEPR engine.
//!
//! ## Architecture
//!
//! - **Linear Algebra** ([`math`]) - Givens rotations, the signed 3×3 SVD used for optimal
//!   rotations, and permutation enumeration restricted to interchangeable groups
//! - **Ideal Shapes** ([`geometry`]) - Unit-vector templates for two to six electron domains
//!   and the mapping from `AXₓEₑ` counts to molecular geometry names
//! - **Molecular Representation** ([`models`]) - Pair groups, bonds, elements, the molecule
//!   graph and measured real-molecule shapes
//!
//! Nothing in this layer advances time; the per-frame physics lives in
//! [`engine`](crate::engine).

pub mod geometry;
pub mod math;
pub mod models;
