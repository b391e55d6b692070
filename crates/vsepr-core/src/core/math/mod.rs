//! Small, allocation-light linear algebra used by the shape matcher.
//!
//! [`matrix3`] holds the fixed-size 3×3 kernel (Givens rotations, the signed
//! SVD) and [`permutation`] enumerates the slot assignments tried when fitting a
//! set of pair-group orientations onto an ideal template.

pub mod matrix3;
pub mod permutation;
