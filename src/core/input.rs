// src/core/input.rs

use super::error::BosonError;
use super::gram::GramMatrix;
use super::occupation::ModeOccupation;
use std::fmt;

/// Distinguishability model of the photons entering the interferometer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Distinguishability {
    /// Fully indistinguishable photons.
    Bosonic,
    /// Partially distinguishable photons described by a Gram matrix.
    PartDist,
    /// Fully distinguishable photons (classical particles).
    Distinguishable,
}

impl fmt::Display for Distinguishability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distinguishability::Bosonic => write!(f, "Bosonic"),
            Distinguishability::PartDist => write!(f, "PartDist"),
            Distinguishability::Distinguishable => write!(f, "Distinguishable"),
        }
    }
}

/// A photon configuration tagged with its distinguishability model.
///
/// Immutable once built; [`to_lossy`](Self::to_lossy) returns a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    occupation: ModeOccupation,
    distinguishability: Distinguishability,
    gram: GramMatrix,
}

impl Input {
    /// Indistinguishable photons; the Gram matrix is all ones.
    pub fn bosonic(occupation: ModeOccupation) -> Self {
        let gram = GramMatrix::bosonic(occupation.n());
        Self { occupation, distinguishability: Distinguishability::Bosonic, gram }
    }

    /// Distinguishable photons; the Gram matrix is the identity.
    pub fn distinguishable(occupation: ModeOccupation) -> Self {
        let gram = GramMatrix::distinguishable(occupation.n());
        Self { occupation, distinguishability: Distinguishability::Distinguishable, gram }
    }

    /// Partially distinguishable photons with an explicit Gram matrix.
    ///
    /// # Errors
    /// `BosonError::InvalidGramMatrix` if the Gram matrix is not `n×n` for the `n` photons.
    pub fn part_dist(occupation: ModeOccupation, gram: GramMatrix) -> Result<Self, BosonError> {
        if gram.n() != occupation.n() {
            return Err(BosonError::gram(format!(
                "Gram matrix is {}x{} but the input holds {} photons",
                gram.n(),
                gram.n(),
                occupation.n()
            )));
        }
        Ok(Self { occupation, distinguishability: Distinguishability::PartDist, gram })
    }

    /// The photon configuration.
    pub fn occupation(&self) -> &ModeOccupation {
        &self.occupation
    }

    /// The distinguishability tag.
    pub fn distinguishability(&self) -> Distinguishability {
        self.distinguishability
    }

    /// The photons' Gram matrix.
    pub fn gram(&self) -> &GramMatrix {
        &self.gram
    }

    /// Number of modes.
    pub fn m(&self) -> usize {
        self.occupation.m()
    }

    /// Number of photons.
    pub fn n(&self) -> usize {
        self.occupation.n()
    }

    /// The same photons over `2m` modes, environment modes empty.
    ///
    /// # Errors
    /// `BosonError::InvalidOperation` if the input is already lossy.
    pub fn to_lossy(&self) -> Result<Input, BosonError> {
        Ok(Input {
            occupation: self.occupation.to_lossy()?,
            distinguishability: self.distinguishability,
            gram: self.gram.clone(),
        })
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Input[{} {}]", self.distinguishability, self.occupation)
    }
}
