use thiserror::Error;

use super::config::ConfigError;
use crate::core::geometry::GeometryError;
use crate::core::models::ids::PairGroupId;
use crate::core::models::molecule::MoleculeError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Molecule structure error: {source}")]
    Molecule {
        #[from]
        source: MoleculeError,
    },

    #[error("Geometry lookup failed: {source}")]
    Geometry {
        #[from]
        source: GeometryError,
    },

    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Time step {dt} is not a finite positive number")]
    InvalidTimeStep { dt: f64 },

    #[error("Pair group {group:?} left the finite domain during '{phase}'")]
    NonFiniteState {
        group: PairGroupId,
        phase: &'static str,
    },

    #[error("Shape matching failed: {0}")]
    Matching(String),

    #[error("Invalid molecule shape '{name}': {reason}")]
    InvalidShape { name: String, reason: String },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
