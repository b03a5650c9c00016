// src/operations/mod.rs

//! Elementary linear optical elements.
//!
//! Each element acts on a few modes and is the identity on the rest. Its
//! [`matrix`](OpticalElement::matrix) on `m` modes is unitary for the mixing
//! and phase elements and a diagonal contraction for a lossy line; a
//! [`Circuit`](crate::circuits::Circuit) multiplies them in order.

use crate::core::BosonError;
use crate::core::interferometer::beam_splitter_matrix;
use crate::validation::check_unitarity;
use nalgebra::DMatrix;
use num_complex::Complex;

/// Represents a defined element of an optical circuit.
#[derive(Debug, Clone, PartialEq)]
pub enum OpticalElement {
    /// Two-mode beam splitter `[[t, r], [r, −t]]`, `r = √(1 − t²)`.
    ///
    /// Analogy: the Hadamard of linear optics when `t = 1/√2`.
    BeamSplitter {
        /// The two modes it mixes, in matrix order.
        modes: (usize, usize),
        /// Transmission amplitude `t ∈ [0, 1]`.
        transmission_amplitude: f64,
    },

    /// Multiplies the amplitude of one mode by `e^(iφ)`.
    PhaseShift {
        /// The mode acquiring the phase.
        mode: usize,
        /// Phase in radians.
        phase: f64,
    },

    /// Attenuates a single mode by amplitude `η` without mixing it with others.
    /// Any circuit containing one is embedded as a lossy interferometer.
    LossyLine {
        /// The attenuated mode.
        mode: usize,
        /// Transmission amplitude `η ∈ [0, 1]` (intensity `η²`).
        transmission_amplitude: f64,
    },

    /// An arbitrary unitary on the listed modes.
    Unitary {
        /// Modes the matrix acts on; row/column `k` of `matrix` is `modes[k]`.
        modes: Vec<usize>,
        /// A `modes.len() × modes.len()` unitary.
        matrix: DMatrix<Complex<f64>>,
    },
}

impl OpticalElement {
    /// Returns the modes this element acts on.
    pub fn involved_modes(&self) -> Vec<usize> {
        match self {
            OpticalElement::BeamSplitter { modes, .. } => vec![modes.0, modes.1],
            OpticalElement::PhaseShift { mode, .. } | OpticalElement::LossyLine { mode, .. } => vec![*mode],
            OpticalElement::Unitary { modes, .. } => modes.clone(),
        }
    }

    /// `true` for an attenuating element (a lossy line with `η < 1`).
    pub fn is_lossy(&self) -> bool {
        matches!(self, OpticalElement::LossyLine { transmission_amplitude, .. } if *transmission_amplitude < 1.0)
    }

    /// Short symbol used when drawing circuits.
    pub fn symbol(&self) -> &'static str {
        match self {
            OpticalElement::BeamSplitter { .. } => "BS",
            OpticalElement::PhaseShift { .. } => "φ",
            OpticalElement::LossyLine { .. } => "η",
            OpticalElement::Unitary { .. } => "U",
        }
    }

    /// The element's `m×m` matrix (identity outside its modes).
    ///
    /// # Errors
    /// * `BosonError::DimensionMismatch` if a mode index is `≥ m`, or an
    ///   explicit unitary's size differs from its mode list.
    /// * `BosonError::InvalidInterferometer` for repeated modes, amplitudes
    ///   outside `[0, 1]` or a non-unitary explicit matrix.
    pub fn matrix(&self, m: usize) -> Result<DMatrix<Complex<f64>>, BosonError> {
        let modes = self.involved_modes();
        if let Some(out_of_range) = modes.iter().find(|&&mode| mode >= m) {
            return Err(BosonError::dimension(format!(
                "{} acts on mode {} of a {}-mode circuit",
                self.symbol(),
                out_of_range,
                m
            )));
        }
        if (1..modes.len()).any(|k| modes[..k].contains(&modes[k])) {
            return Err(BosonError::interferometer(format!("{} lists a mode twice: {:?}", self.symbol(), modes)));
        }

        let local = match self {
            OpticalElement::BeamSplitter { transmission_amplitude, .. } => {
                beam_splitter_matrix(*transmission_amplitude)?
            }
            OpticalElement::PhaseShift { phase, .. } => {
                DMatrix::from_element(1, 1, Complex::from_polar(1.0, *phase))
            }
            OpticalElement::LossyLine { transmission_amplitude, .. } => {
                if !(0.0..=1.0).contains(transmission_amplitude) {
                    return Err(BosonError::interferometer(format!(
                        "transmission amplitude {} outside [0, 1]",
                        transmission_amplitude
                    )));
                }
                DMatrix::from_element(1, 1, Complex::new(*transmission_amplitude, 0.0))
            }
            OpticalElement::Unitary { matrix, .. } => {
                if matrix.nrows() != modes.len() || matrix.ncols() != modes.len() {
                    return Err(BosonError::dimension(format!(
                        "unitary is {}x{} but acts on {} modes",
                        matrix.nrows(),
                        matrix.ncols(),
                        modes.len()
                    )));
                }
                check_unitarity(matrix, None)?;
                matrix.clone()
            }
        };

        let mut full = DMatrix::identity(m, m);
        for (a, &row) in modes.iter().enumerate() {
            for (b, &col) in modes.iter().enumerate() {
                full[(row, col)] = local[(a, b)];
            }
        }
        Ok(full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_1_SQRT_2, PI};

    #[test]
    fn test_beam_splitter_on_distant_modes() -> Result<(), BosonError> {
        let bs = OpticalElement::BeamSplitter { modes: (2, 0), transmission_amplitude: FRAC_1_SQRT_2 };
        let m = bs.matrix(3)?;
        assert!((m[(2, 2)].re - FRAC_1_SQRT_2).abs() < 1e-12);
        assert!((m[(2, 0)].re - FRAC_1_SQRT_2).abs() < 1e-12);
        assert!((m[(0, 0)].re + FRAC_1_SQRT_2).abs() < 1e-12);
        assert_eq!(m[(1, 1)], Complex::new(1.0, 0.0));
        check_unitarity(&m, None)?;
        Ok(())
    }

    #[test]
    fn test_phase_and_loss_elements() -> Result<(), BosonError> {
        let phase = OpticalElement::PhaseShift { mode: 1, phase: PI }.matrix(2)?;
        assert!((phase[(1, 1)] + Complex::new(1.0, 0.0)).norm() < 1e-12);
        let line = OpticalElement::LossyLine { mode: 0, transmission_amplitude: 0.5 };
        assert!(line.is_lossy());
        assert_eq!(line.matrix(2)?[(0, 0)], Complex::new(0.5, 0.0));
        assert!(!OpticalElement::LossyLine { mode: 0, transmission_amplitude: 1.0 }.is_lossy());
        Ok(())
    }

    #[test]
    fn test_invalid_elements() {
        let out_of_range = OpticalElement::PhaseShift { mode: 3, phase: 0.0 };
        assert!(matches!(out_of_range.matrix(2), Err(BosonError::DimensionMismatch { .. })));
        let same_mode = OpticalElement::BeamSplitter { modes: (1, 1), transmission_amplitude: 0.5 };
        assert!(matches!(same_mode.matrix(2), Err(BosonError::InvalidInterferometer { .. })));
        let not_unitary = OpticalElement::Unitary { modes: vec![0, 1], matrix: DMatrix::from_element(2, 2, Complex::new(1.0, 0.0)) };
        assert!(matches!(not_unitary.matrix(2), Err(BosonError::InvalidInterferometer { .. })));
    }
}
