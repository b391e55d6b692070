//! # Geometry Templates
//!
//! Static knowledge about ideal VSEPR shapes.
//!
//! - [`templates`] - unit-vector layouts per electron-domain count ([`ElectronGeometry`])
//! - [`configuration`] - `AXₓEₑ` classification into named molecular shapes
//!   ([`MoleculeGeometry`])
//!
//! Template slot order matters: lower indices are reserved for the
//! higher-repulsion domains, so lone pairs always take the leading slots.

use thiserror::Error;

pub mod configuration;
pub mod templates;

pub use configuration::{MoleculeGeometry, VseprConfiguration};
pub use templates::ElectronGeometry;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[error("No ideal template exists for {0} electron domains (supported: 0-6)")]
    UnsupportedPairCount(usize),
    #[error("Configuration AX{x}E{e} exceeds the six supported electron domains")]
    UnsupportedConfiguration { x: usize, e: usize },
}
