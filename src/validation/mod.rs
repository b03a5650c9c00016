// src/validation/mod.rs

//! Numerical checks shared by the constructors and the probability engine:
//! unitarity of interferometers, admissibility of Gram matrices and
//! normalisation of probability distributions.
//!
//! Near-violations inside the tolerance are accepted (and logged), never errors.

use crate::core::BosonError;
use crate::core::constants::bosim_constants::{GRAM_TOLERANCE, NORMALIZATION_TOLERANCE, UNITARITY_TOLERANCE};
use nalgebra::{DMatrix, SymmetricEigen};
use num_complex::Complex;
use tracing::warn;

// --- Helper Functions ---

/// Largest entrywise modulus of `a - b`. (Internal to this module)
fn max_deviation(a: &DMatrix<Complex<f64>>, b: &DMatrix<Complex<f64>>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).norm()).fold(0.0_f64, f64::max)
}

/// Smallest eigenvalue of a Hermitian matrix.
pub(crate) fn min_hermitian_eigenvalue(matrix: &DMatrix<Complex<f64>>) -> f64 {
    if matrix.is_empty() {
        return 0.0;
    }
    let eigen = SymmetricEigen::new(matrix.clone());
    eigen.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min)
}

// --- Public Validation Functions ---

/// Checks that `matrix` is square and `U†U ≈ I` entrywise.
///
/// # Arguments
/// * `matrix` - candidate unitary.
/// * `tolerance` - accepted entrywise deviation (defaults to 1e-8).
///
/// # Returns
/// * `Ok(deviation)` with the measured `max |U†U − I|`.
/// * `Err(BosonError::InvalidInterferometer)` if the matrix is not square or deviates too much.
pub fn check_unitarity(matrix: &DMatrix<Complex<f64>>, tolerance: Option<f64>) -> Result<f64, BosonError> {
    let tol = tolerance.unwrap_or(UNITARITY_TOLERANCE);
    if matrix.nrows() != matrix.ncols() {
        return Err(BosonError::interferometer(format!(
            "matrix must be square, got {}x{}",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    let n = matrix.nrows();
    let deviation = max_deviation(&(matrix.adjoint() * matrix), &DMatrix::identity(n, n));
    if !deviation.is_finite() || deviation > tol {
        return Err(BosonError::interferometer(format!(
            "matrix is not unitary (max |U†U − I| = {:.3e} > {:.1e})",
            deviation, tol
        )));
    }
    if deviation > tol * 1e-3 {
        warn!(deviation, tolerance = tol, "unitarity holds only approximately");
    }
    Ok(deviation)
}

/// Checks that `matrix` is a valid Gram matrix: square, Hermitian, unit
/// diagonal and positive semidefinite, each within `tolerance`.
///
/// # Returns
/// * `Ok(())` if every check passes.
/// * `Err(BosonError::InvalidGramMatrix)` naming the first failed check.
pub fn check_gram_matrix(matrix: &DMatrix<Complex<f64>>, tolerance: Option<f64>) -> Result<(), BosonError> {
    let tol = tolerance.unwrap_or(GRAM_TOLERANCE);
    if matrix.nrows() != matrix.ncols() {
        return Err(BosonError::gram(format!("matrix must be square, got {}x{}", matrix.nrows(), matrix.ncols())));
    }
    let hermitian_gap = max_deviation(matrix, &matrix.adjoint());
    if !hermitian_gap.is_finite() || hermitian_gap > tol {
        return Err(BosonError::gram(format!("matrix is not Hermitian (max |S − S†| = {:.3e})", hermitian_gap)));
    }
    let diagonal = matrix.diagonal();
    let one = Complex::new(1.0, 0.0);
    if let Some((i, d)) = diagonal.iter().enumerate().find(|(_, d)| (**d - one).norm() > tol) {
        return Err(BosonError::gram(format!("diagonal entry {} is {}, expected 1", i, d)));
    }
    let min_eigenvalue = min_hermitian_eigenvalue(matrix);
    if min_eigenvalue < -tol {
        return Err(BosonError::gram(format!(
            "matrix is not positive semidefinite (smallest eigenvalue {:.3e})",
            min_eigenvalue
        )));
    }
    if min_eigenvalue < 0.0 {
        warn!(min_eigenvalue, tolerance = tol, "Gram matrix is positive semidefinite only within tolerance");
    }
    Ok(())
}

/// Checks that probabilities sum to one.
///
/// # Returns
/// * `Ok(total)` if `|Σp − 1| ≤ tolerance` (default 1e-6).
/// * `Err(BosonError::InvalidOperation)` otherwise.
pub fn check_normalization<'a, I>(probabilities: I, tolerance: Option<f64>) -> Result<f64, BosonError>
where
    I: IntoIterator<Item = &'a f64>,
{
    let tol = tolerance.unwrap_or(NORMALIZATION_TOLERANCE);
    let total: f64 = probabilities.into_iter().sum();
    if (total - 1.0).abs() > tol {
        Err(BosonError::invalid(format!(
            "probabilities sum to {} (deviation > {})",
            total, tol
        )))
    } else {
        Ok(total)
    }
}

/// Checks that a detector probability lies in `[0, 1]`.
pub fn check_probability(name: &str, p: f64) -> Result<(), BosonError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(BosonError::invalid(format!("{} must lie in [0, 1], got {}", name, p)))
    }
}
