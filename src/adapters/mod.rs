//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the integration with files and libraries:
//! - `forest`: random forest classifier over an exported tree ensemble
//! - `artifacts`: model directory loading and integrity checks
//! - `sanitize`: sequence filtering for logs

pub mod artifacts;
pub mod forest;
pub mod sanitize;

pub use artifacts::ArtifactError;
