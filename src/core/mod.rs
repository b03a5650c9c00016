// src/core/mod.rs

//! Core data structures and types

// Declare modules within core
pub mod error;
pub mod occupation;
pub mod gram;
pub mod input;
pub mod interferometer;
pub mod measurement;
pub mod random;

// Re-export public types for convenient access via `bosim::core::TypeName`
pub use error::BosonError;
pub use occupation::{ModeOccupation, OccupationIter, Partition, Subset};
pub use gram::{GramMatrix, GramModel};
pub use input::{Distinguishability, Input};
pub use interferometer::{GeneralLoss, Interferometer, LossModel, ModeLoss, UniformLoss, unitary_dilation};
pub use measurement::OutputMeasurement;

pub mod constants;
pub use constants::bosim_constants::{GRAM_TOLERANCE, NORMALIZATION_TOLERANCE, UNITARITY_TOLERANCE}; // Re-export
