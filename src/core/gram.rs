// src/core/gram.rs

use super::error::BosonError;
use super::random::complex_normal;
use crate::validation::check_gram_matrix;
use nalgebra::DMatrix;
use num_complex::Complex;
use num_traits::{One, Zero};
use rand::rngs::StdRng;
use std::fmt;

/// How a [`GramMatrix`] was produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GramModel {
    /// All entries 1: fully indistinguishable photons.
    Bosonic,
    /// Identity: fully distinguishable photons.
    Distinguishable,
    /// Every off-diagonal entry equals the given overlap `x ∈ [0, 1]`.
    OneParameter(f64),
    /// Normalised `A A†` for a complex Gaussian `A`.
    Random,
    /// Supplied by the caller and validated.
    Custom,
}

/// Pairwise overlaps of the photons' internal states, `S[i][j] = <φ_i|φ_j>`.
///
/// An `n×n` Hermitian, unit-diagonal, positive semidefinite matrix indexed by
/// photon (photons are ordered by input mode, see
/// [`ModeOccupation::mode_list`](crate::core::ModeOccupation::mode_list)).
#[derive(Debug, Clone, PartialEq)]
pub struct GramMatrix {
    matrix: DMatrix<Complex<f64>>,
    model: GramModel,
}

impl GramMatrix {
    /// All-ones matrix (full coherence).
    pub fn bosonic(n: usize) -> Self {
        Self { matrix: DMatrix::from_element(n, n, Complex::one()), model: GramModel::Bosonic }
    }

    /// Identity matrix (no coherence).
    pub fn distinguishable(n: usize) -> Self {
        Self { matrix: DMatrix::identity(n, n), model: GramModel::Distinguishable }
    }

    /// Interpolates between the two extremes: every off-diagonal entry is `x`.
    ///
    /// # Errors
    /// `BosonError::InvalidGramMatrix` unless `0 ≤ x ≤ 1`.
    pub fn one_parameter(n: usize, x: f64) -> Result<Self, BosonError> {
        if !(0.0..=1.0).contains(&x) {
            return Err(BosonError::gram(format!("interpolation parameter must lie in [0, 1], got {}", x)));
        }
        let matrix = DMatrix::from_fn(n, n, |i, j| if i == j { Complex::one() } else { Complex::new(x, 0.0) });
        Ok(Self { matrix, model: GramModel::OneParameter(x) })
    }

    /// Random Gram matrix: `A A†` for a complex Gaussian `A`, rescaled to unit diagonal.
    ///
    /// # Errors
    /// `BosonError::InvalidGramMatrix` if the draw fails the positivity check
    /// (only possible through round-off on degenerate draws).
    pub fn random(n: usize, rng: &mut StdRng) -> Result<Self, BosonError> {
        let a = DMatrix::from_fn(n, n, |_, _| complex_normal(rng));
        let product = &a * a.adjoint();
        let scale: Vec<f64> = (0..n).map(|i| product[(i, i)].re.sqrt()).collect();
        if scale.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(BosonError::gram("random draw produced a zero row"));
        }
        let mut matrix = DMatrix::from_fn(n, n, |i, j| product[(i, j)] / (scale[i] * scale[j]));
        // exact unit diagonal, exact Hermiticity
        for i in 0..n {
            matrix[(i, i)] = Complex::one();
            for j in 0..i {
                matrix[(i, j)] = matrix[(j, i)].conj();
            }
        }
        check_gram_matrix(&matrix, None)?;
        Ok(Self { matrix, model: GramModel::Random })
    }

    /// Validates and wraps a caller-supplied matrix.
    ///
    /// # Errors
    /// `BosonError::InvalidGramMatrix` if it is not Hermitian, unit-diagonal and
    /// positive semidefinite within `tolerance`.
    pub fn from_matrix(matrix: DMatrix<Complex<f64>>, tolerance: Option<f64>) -> Result<Self, BosonError> {
        check_gram_matrix(&matrix, tolerance)?;
        Ok(Self { matrix, model: GramModel::Custom })
    }

    /// Number of photons.
    pub fn n(&self) -> usize {
        self.matrix.nrows()
    }

    /// The overlap matrix.
    pub fn matrix(&self) -> &DMatrix<Complex<f64>> {
        &self.matrix
    }

    /// The construction model.
    pub fn model(&self) -> GramModel {
        self.model
    }

    /// Overlap `<φ_i|φ_j>`.
    pub fn overlap(&self, i: usize, j: usize) -> Complex<f64> {
        self.matrix[(i, j)]
    }

    /// `true` if every entry is 1 within `tolerance`.
    pub fn is_bosonic(&self, tolerance: f64) -> bool {
        self.matrix.iter().all(|z| (z - Complex::one()).norm() <= tolerance)
    }

    /// `true` if the matrix is the identity within `tolerance`.
    pub fn is_distinguishable(&self, tolerance: f64) -> bool {
        self.matrix.iter().enumerate().all(|(k, z)| {
            let (i, j) = (k % self.n(), k / self.n());
            let target = if i == j { Complex::one() } else { Complex::zero() };
            (z - target).norm() <= tolerance
        })
    }
}

impl fmt::Display for GramMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "GramMatrix[{:?}, n = {}]", self.model, self.n())?;
        for i in 0..self.n() {
            write!(f, "  ")?;
            for j in 0..self.n() {
                write!(f, "{}{:.4}", if j > 0 { ", " } else { "" }, self.matrix[(i, j)])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::rng_from_seed;

    #[test]
    fn test_extremes() {
        let b = GramMatrix::bosonic(3);
        let d = GramMatrix::distinguishable(3);
        assert!(b.is_bosonic(0.0));
        assert!(!b.is_distinguishable(0.0));
        assert!(d.is_distinguishable(0.0));
        assert!(check_gram_matrix(b.matrix(), None).is_ok());
        assert!(check_gram_matrix(d.matrix(), None).is_ok());
    }

    #[test]
    fn test_one_parameter_interpolates() -> Result<(), BosonError> {
        assert!(GramMatrix::one_parameter(3, 1.0)?.is_bosonic(1e-15));
        assert!(GramMatrix::one_parameter(3, 0.0)?.is_distinguishable(1e-15));
        let g = GramMatrix::one_parameter(3, 0.4)?;
        assert_eq!(g.overlap(0, 2), Complex::new(0.4, 0.0));
        assert!(matches!(GramMatrix::one_parameter(3, 1.2), Err(BosonError::InvalidGramMatrix { .. })));
        Ok(())
    }

    #[test]
    fn test_random_is_valid() -> Result<(), BosonError> {
        let mut rng = rng_from_seed(Some(11));
        for n in 1..6 {
            let g = GramMatrix::random(n, &mut rng)?;
            assert_eq!(g.n(), n);
            assert_eq!(g.model(), GramModel::Random);
            check_gram_matrix(g.matrix(), Some(1e-10))?;
        }
        Ok(())
    }

    #[test]
    fn test_from_matrix_rejects_invalid() {
        let bad = DMatrix::from_element(2, 2, Complex::new(2.0, 0.0));
        assert!(matches!(GramMatrix::from_matrix(bad, None), Err(BosonError::InvalidGramMatrix { .. })));
    }
}
