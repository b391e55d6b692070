//! # Workflows Module
//!
//! Top-level entry points that drive a molecule through a complete procedure.
//!
//! - **Relaxation Workflow** ([`relax`]) - Steps a molecule until its shape settles or the
//!   frame budget runs out, reporting progress and returning the resulting geometry.

pub mod relax;
